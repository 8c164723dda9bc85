//! X.509 certificate inspection.

use chrono::{DateTime, Utc};
use x509_parser::prelude::*;

use crate::error::{CryptoError, CryptoResult};

/// Human-readable facts about a certificate, for startup logging.
#[derive(Debug, Clone)]
pub struct CertificateSummary {
    /// Subject distinguished name.
    pub subject: String,
    /// End of the validity period.
    pub not_after: Option<DateTime<Utc>>,
}

/// Returns the certificate's RSA public key as a PKCS#1 `RSAPublicKey`.
///
/// # Errors
///
/// Returns an error if the certificate cannot be parsed.
pub fn certificate_public_key(cert_der: &[u8]) -> CryptoResult<Vec<u8>> {
    let (_, cert) = X509Certificate::from_der(cert_der)
        .map_err(|e| CryptoError::InvalidCertificate(format!("failed to parse certificate: {e}")))?;

    Ok(cert.public_key().subject_public_key.data.to_vec())
}

/// Summarizes a certificate.
///
/// # Errors
///
/// Returns an error if the certificate cannot be parsed.
pub fn certificate_summary(cert_der: &[u8]) -> CryptoResult<CertificateSummary> {
    let (_, cert) = X509Certificate::from_der(cert_der)
        .map_err(|e| CryptoError::InvalidCertificate(format!("failed to parse certificate: {e}")))?;

    Ok(CertificateSummary {
        subject: cert.subject().to_string(),
        not_after: DateTime::from_timestamp(cert.validity().not_after.timestamp(), 0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate_der_from_pem;

    const CERT_PEM: &str = include_str!("../../../tests/fixtures/proxy-cert.pem");

    #[test]
    fn summary_reads_subject_and_expiry() {
        let der = certificate_der_from_pem(CERT_PEM).unwrap();
        let summary = certificate_summary(&der).unwrap();

        assert!(summary.subject.contains("proxy.test.example"));
        assert!(summary.not_after.unwrap() > Utc::now());
    }

    #[test]
    fn public_key_is_extracted() {
        let der = certificate_der_from_pem(CERT_PEM).unwrap();
        let key = certificate_public_key(&der).unwrap();
        // DER SEQUENCE
        assert_eq!(key[0], 0x30);
    }

    #[test]
    fn garbage_certificate_is_rejected() {
        assert!(matches!(
            certificate_public_key(b"garbage"),
            Err(CryptoError::InvalidCertificate(_))
        ));
    }
}
