//! eduPerson attribute release.
//!
//! Only a fixed set of attributes is passed from the university to the SP.
//! OIDs are from eduPerson (202208) and inetOrgPerson.

use proxy_saml::{Assertion, Attribute, AttributeStatement};

/// eduPersonPrincipalName.
pub const EDU_PERSON_PRINCIPAL_NAME: &str = "urn:oid:1.3.6.1.4.1.5923.1.1.1.6";
/// eduPersonScopedAffiliation.
pub const EDU_PERSON_SCOPED_AFFILIATION: &str = "urn:oid:1.3.6.1.4.1.5923.1.1.1.9";
/// eduPersonAffiliation.
pub const EDU_PERSON_AFFILIATION: &str = "urn:oid:1.3.6.1.4.1.5923.1.1.1.1";
/// mail.
pub const MAIL: &str = "urn:oid:0.9.2342.19200300.100.1.3";
/// displayName.
pub const DISPLAY_NAME: &str = "urn:oid:2.16.840.1.113730.3.1.241";
/// givenName.
pub const GIVEN_NAME: &str = "urn:oid:2.5.4.42";
/// sn.
pub const SURNAME: &str = "urn:oid:2.5.4.4";

const RELEASED_ATTRIBUTES: &[(&str, &str)] = &[
    (EDU_PERSON_PRINCIPAL_NAME, "eduPersonPrincipalName"),
    (EDU_PERSON_SCOPED_AFFILIATION, "eduPersonScopedAffiliation"),
    (EDU_PERSON_AFFILIATION, "eduPersonAffiliation"),
    (MAIL, "mail"),
    (DISPLAY_NAME, "displayName"),
    (GIVEN_NAME, "givenName"),
    (SURNAME, "sn"),
];

/// Friendly name for a released attribute OID.
#[must_use]
pub fn friendly_name(oid: &str) -> Option<&'static str> {
    RELEASED_ATTRIBUTES
        .iter()
        .find(|(known, _)| *known == oid)
        .map(|(_, friendly)| *friendly)
}

/// Picks the released attributes out of an assertion as `(oid, value)`.
///
/// Keeps the first value of each, skips attributes without one, and
/// preserves the order the university sent them in.
#[must_use]
pub fn extract_attributes(assertion: &Assertion) -> Vec<(String, String)> {
    let mut released: Vec<(String, String)> = Vec::new();
    for attribute in assertion.attributes() {
        if friendly_name(&attribute.name).is_none()
            || released.iter().any(|(name, _)| *name == attribute.name)
        {
            continue;
        }
        if let Some(value) = attribute.values.first() {
            released.push((attribute.name.clone(), value.clone()));
        }
    }
    released
}

/// Builds the outbound statement, or `None` when nothing is released.
#[must_use]
pub fn attribute_statement(attributes: &[(String, String)]) -> Option<AttributeStatement> {
    if attributes.is_empty() {
        return None;
    }
    let statement = attributes
        .iter()
        .fold(AttributeStatement::new(), |statement, (oid, value)| {
            let mut attribute =
                Attribute::single(oid.as_str(), value.as_str()).with_format(Attribute::NAME_FORMAT_URI);
            if let Some(friendly) = friendly_name(oid) {
                attribute = attribute.with_friendly_name(friendly);
            }
            statement.with_attribute(attribute)
        });
    Some(statement)
}
