//! Validation of responses returned by a university identity provider.
//!
//! The proxy only accepts SP-initiated responses to requests it issued
//! itself, signed by a certificate from the IdP's metadata.

use chrono::{DateTime, Duration, Utc};

use crate::error::{SamlError, SamlResult};
use crate::signature::XmlSignatureValidator;
use crate::types::{Assertion, Response, SubjectConfirmation};
use crate::xml::XmlElement;

/// Default tolerance for clock differences between proxy and IdP.
pub const DEFAULT_CLOCK_SKEW_SECS: i64 = 90;

/// Default maximum age of a response's `IssueInstant`.
pub const DEFAULT_MAX_ISSUE_DELAY_SECS: i64 = 300;

/// Checks a `samlp:Response` from an upstream IdP.
#[derive(Debug, Clone)]
pub struct ResponseValidator {
    sp_entity_id: String,
    acs_url: String,
    idp_entity_id: String,
    signatures: XmlSignatureValidator,
    accepted_request_ids: Vec<String>,
    max_issue_delay: Duration,
    clock_skew: Duration,
}

impl ResponseValidator {
    /// Creates a validator for responses from `idp_entity_id` to the proxy's
    /// SP role.
    #[must_use]
    pub fn new(
        sp_entity_id: impl Into<String>,
        acs_url: impl Into<String>,
        idp_entity_id: impl Into<String>,
        trusted_certificates: Vec<Vec<u8>>,
    ) -> Self {
        Self {
            sp_entity_id: sp_entity_id.into(),
            acs_url: acs_url.into(),
            idp_entity_id: idp_entity_id.into(),
            signatures: XmlSignatureValidator::new(trusted_certificates),
            accepted_request_ids: Vec::new(),
            max_issue_delay: Duration::seconds(DEFAULT_MAX_ISSUE_DELAY_SECS),
            clock_skew: Duration::seconds(DEFAULT_CLOCK_SKEW_SECS),
        }
    }

    /// Accepts responses to the given request ID.
    #[must_use]
    pub fn accept_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.accepted_request_ids.push(request_id.into());
        self
    }

    /// Sets the maximum age of a response.
    #[must_use]
    pub const fn with_max_issue_delay(mut self, delay: Duration) -> Self {
        self.max_issue_delay = delay;
        self
    }

    /// Sets the clock skew tolerance.
    #[must_use]
    pub const fn with_clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew = skew;
        self
    }

    /// Accepts SHA-1 signatures from older IdPs.
    #[must_use]
    pub fn allow_sha1(mut self, allow: bool) -> Self {
        self.signatures = self.signatures.allow_sha1(allow);
        self
    }

    /// Validates a response document and returns its assertion.
    pub fn validate(&self, xml: &str) -> SamlResult<Assertion> {
        self.validate_at(xml, Utc::now())
    }

    /// Validates a response document as of `now`.
    pub fn validate_at(&self, xml: &str, now: DateTime<Utc>) -> SamlResult<Assertion> {
        let root = XmlElement::parse(xml)?;
        let response = Response::from_element(&root)?;

        if !response.is_success() {
            let mut reason = response.status.status_code.value.clone();
            if let Some(sub) = response.status.status_code.sub_status_value() {
                reason = format!("{reason} / {sub}");
            }
            if let Some(message) = &response.status.status_message {
                reason = format!("{reason}: {message}");
            }
            return Err(SamlError::InvalidResponse(format!(
                "IdP returned an error status: {reason}"
            )));
        }

        match response.in_response_to.as_deref() {
            Some(id) if self.is_accepted(id) => {}
            Some(id) => {
                return Err(SamlError::InvalidResponse(format!(
                    "InResponseTo '{id}' does not match an outstanding request"
                )));
            }
            None => {
                return Err(SamlError::InvalidResponse(
                    "unsolicited responses are not accepted".to_string(),
                ));
            }
        }

        if response.issue_instant > now + self.clock_skew {
            return Err(SamlError::InvalidResponse(
                "response was issued in the future".to_string(),
            ));
        }
        if response.issue_instant + self.max_issue_delay + self.clock_skew < now {
            return Err(SamlError::InvalidResponse(
                "response was issued too long ago".to_string(),
            ));
        }

        if let Some(destination) = &response.destination {
            if destination != &self.acs_url {
                return Err(SamlError::InvalidDestination {
                    expected: self.acs_url.clone(),
                    actual: destination.clone(),
                });
            }
        }

        if let Some(issuer) = &response.issuer {
            self.check_issuer(issuer)?;
        }

        let assertion_element = root
            .child("Assertion")
            .ok_or_else(|| SamlError::MissingElement("Assertion".to_string()))?;

        let verified = self.signatures.verified_elements(&root)?;
        let covered = |element: &XmlElement| verified.iter().any(|v| std::ptr::eq(*v, element));
        if !covered(&root) && !covered(assertion_element) {
            return Err(SamlError::SignatureInvalid(
                "neither the response nor the assertion is signed by the IdP".to_string(),
            ));
        }
        let assertion = Assertion::from_element(assertion_element)?;

        self.check_issuer(&assertion.issuer)?;
        self.check_conditions(&assertion, now)?;
        self.check_subject_confirmation(&assertion, now)?;

        tracing::debug!(
            idp = %self.idp_entity_id,
            assertion_id = %assertion.id,
            "upstream response accepted"
        );

        Ok(assertion)
    }

    fn is_accepted(&self, request_id: &str) -> bool {
        self.accepted_request_ids.iter().any(|id| id == request_id)
    }

    fn check_issuer(&self, issuer: &str) -> SamlResult<()> {
        if issuer == self.idp_entity_id {
            Ok(())
        } else {
            Err(SamlError::InvalidIssuer {
                expected: self.idp_entity_id.clone(),
                actual: issuer.to_string(),
            })
        }
    }

    fn check_conditions(&self, assertion: &Assertion, now: DateTime<Utc>) -> SamlResult<()> {
        let conditions = assertion.conditions.as_ref().ok_or_else(|| {
            SamlError::ConditionsNotMet("assertion carries no Conditions".to_string())
        })?;

        if let Some(not_before) = conditions.not_before {
            if now + self.clock_skew < not_before {
                return Err(SamlError::AssertionNotYetValid);
            }
        }
        if let Some(not_on_or_after) = conditions.not_on_or_after {
            if now - self.clock_skew >= not_on_or_after {
                return Err(SamlError::AssertionExpired);
            }
        }

        if !conditions.allows_audience(&self.sp_entity_id) {
            let actual = conditions
                .audience_restrictions
                .iter()
                .flat_map(|ar| ar.audiences.iter().map(String::as_str))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(SamlError::InvalidAudience {
                expected: self.sp_entity_id.clone(),
                actual,
            });
        }
        Ok(())
    }

    fn check_subject_confirmation(
        &self,
        assertion: &Assertion,
        now: DateTime<Utc>,
    ) -> SamlResult<()> {
        let confirmations = assertion
            .subject
            .as_ref()
            .map(|subject| subject.subject_confirmations.as_slice())
            .unwrap_or_default();

        if confirmations
            .iter()
            .filter(|c| c.is_bearer())
            .any(|c| self.bearer_confirms(c, now))
        {
            Ok(())
        } else {
            Err(SamlError::InvalidAssertion(
                "no bearer subject confirmation matches this request".to_string(),
            ))
        }
    }

    fn bearer_confirms(&self, confirmation: &SubjectConfirmation, now: DateTime<Utc>) -> bool {
        let Some(data) = &confirmation.subject_confirmation_data else {
            return false;
        };
        let recipient_ok = data.recipient.as_deref() == Some(self.acs_url.as_str());
        let request_ok = data
            .in_response_to
            .as_deref()
            .is_some_and(|id| self.is_accepted(id));
        let fresh = data
            .not_on_or_after
            .map_or(true, |deadline| now - self.clock_skew < deadline);
        recipient_ok && request_ok && fresh
    }
}
