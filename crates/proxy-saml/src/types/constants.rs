//! Namespace, binding, format and algorithm URIs.

/// SAML 2.0 assertion namespace.
pub const SAML_NS: &str = "urn:oasis:names:tc:SAML:2.0:assertion";
/// SAML 2.0 protocol namespace.
pub const SAMLP_NS: &str = "urn:oasis:names:tc:SAML:2.0:protocol";
/// SAML 2.0 metadata namespace.
pub const MD_NS: &str = "urn:oasis:names:tc:SAML:2.0:metadata";
/// XML-DSig namespace.
pub const XMLDSIG_NS: &str = "http://www.w3.org/2000/09/xmldsig#";

/// SAML protocol version emitted and accepted.
pub const SAML_VERSION: &str = "2.0";

/// Format for SAML `dateTime` values.
pub const SAML_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Declares a closed set of URIs as an enum with `uri`/`from_uri`.
macro_rules! uri_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $uri:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// The URI naming this value on the wire.
            #[must_use]
            pub const fn uri(&self) -> &'static str {
                match self {
                    $( Self::$variant => $uri, )+
                }
            }

            /// Looks a value up by URI.
            #[must_use]
            pub fn from_uri(uri: &str) -> Option<Self> {
                match uri {
                    $( $uri => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }
    };
}

uri_enum! {
    /// Protocol bindings the proxy speaks.
    SamlBinding {
        /// HTTP-POST.
        HttpPost => "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST",
        /// HTTP-Redirect.
        HttpRedirect => "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect",
    }
}

uri_enum! {
    /// `NameID` formats.
    NameIdFormat {
        /// No particular format.
        Unspecified => "urn:oasis:names:tc:SAML:1.1:nameid-format:unspecified",
        /// Opaque, stable per SP.
        Persistent => "urn:oasis:names:tc:SAML:2.0:nameid-format:persistent",
        /// Opaque, one-time.
        Transient => "urn:oasis:names:tc:SAML:2.0:nameid-format:transient",
    }
}

impl Default for NameIdFormat {
    fn default() -> Self {
        Self::Unspecified
    }
}

uri_enum! {
    /// `AuthnContextClassRef` values the proxy emits itself.
    AuthnContextClass {
        /// Nothing claimed.
        Unspecified => "urn:oasis:names:tc:SAML:2.0:ac:classes:unspecified",
        /// Password over TLS.
        PasswordProtectedTransport =>
            "urn:oasis:names:tc:SAML:2.0:ac:classes:PasswordProtectedTransport",
    }
}

impl Default for AuthnContextClass {
    fn default() -> Self {
        Self::Unspecified
    }
}

/// `StatusCode` values.
pub mod status_codes {
    /// Success.
    pub const SUCCESS: &str = "urn:oasis:names:tc:SAML:2.0:status:Success";
    /// The requester got something wrong.
    pub const REQUESTER: &str = "urn:oasis:names:tc:SAML:2.0:status:Requester";
    /// The responder failed.
    pub const RESPONDER: &str = "urn:oasis:names:tc:SAML:2.0:status:Responder";
}

/// Second-level `StatusCode` values.
pub mod sub_status_codes {
    /// The user could not be authenticated.
    pub const AUTHN_FAILED: &str = "urn:oasis:names:tc:SAML:2.0:status:AuthnFailed";
}

/// XML-DSig `SignatureMethod` URIs.
pub mod signature_algorithms {
    /// RSA PKCS#1 v1.5 with SHA-256.
    pub const RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";
    /// RSA PKCS#1 v1.5 with SHA-384.
    pub const RSA_SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha384";
    /// RSA PKCS#1 v1.5 with SHA-512.
    pub const RSA_SHA512: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha512";
    /// RSA PKCS#1 v1.5 with SHA-1. Accepted only when explicitly allowed.
    pub const RSA_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#rsa-sha1";
}

/// XML-DSig `DigestMethod` URIs.
pub mod digest_algorithms {
    /// SHA-256.
    pub const SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
    /// SHA-384.
    pub const SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#sha384";
    /// SHA-512.
    pub const SHA512: &str = "http://www.w3.org/2001/04/xmlenc#sha512";
    /// SHA-1.
    pub const SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";
}

/// Canonicalization method URIs.
pub mod canonicalization_algorithms {
    /// Exclusive c14n.
    pub const EXCLUSIVE_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
    /// Exclusive c14n, comments kept.
    pub const EXCLUSIVE_C14N_WITH_COMMENTS: &str =
        "http://www.w3.org/2001/10/xml-exc-c14n#WithComments";
    /// Inclusive c14n 1.0.
    pub const C14N: &str = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315";
    /// Inclusive c14n 1.0, comments kept.
    pub const C14N_WITH_COMMENTS: &str =
        "http://www.w3.org/TR/2001/REC-xml-c14n-20010315#WithComments";
}

/// Reference transform URIs.
pub mod transform_algorithms {
    /// Enveloped signature.
    pub const ENVELOPED_SIGNATURE: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";
}
