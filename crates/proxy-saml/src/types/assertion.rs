//! `saml:Assertion` and the statements it carries.

use chrono::{DateTime, Duration, Utc};

use crate::error::{SamlError, SamlResult};
use crate::xml::{escape_attr, escape_text, XmlElement};

use super::{
    format_instant, generate_id, instant_attr, issuer_of, issuer_xml, push_attr,
    AuthnContextClass, NameId, SAML_NS, SAML_VERSION,
};

fn push_instant(xml: &mut String, name: &str, instant: Option<&DateTime<Utc>>) {
    push_attr(xml, name, instant.map(format_instant).as_deref());
}

/// Wraps `content` in `<saml:{tag}>`, escaping it as text.
fn text_element(tag: &str, content: &str) -> String {
    format!("<saml:{tag}>{}</saml:{tag}>", escape_text(content))
}

fn invalid(message: &str) -> SamlError {
    SamlError::InvalidAssertion(message.to_string())
}

/// An assertion issued by an identity provider.
///
/// Parsing keeps the first `AuthnStatement` and merges every
/// `AttributeStatement` into one.
#[derive(Debug, Clone)]
pub struct Assertion {
    /// Assertion ID, the reference of its signature.
    pub id: String,
    /// Protocol version.
    pub version: String,
    /// `IssueInstant`.
    pub issue_instant: DateTime<Utc>,
    /// Asserting party; required.
    pub issuer: String,
    /// Who the statements are about.
    pub subject: Option<Subject>,
    /// Validity window and audiences.
    pub conditions: Option<Conditions>,
    /// First `AuthnStatement`.
    pub authn_statement: Option<AuthnStatement>,
    /// All attribute statements merged.
    pub attribute_statement: Option<AttributeStatement>,
}

impl Assertion {
    /// An empty assertion from `issuer` with a generated ID.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            version: SAML_VERSION.to_string(),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            subject: None,
            conditions: None,
            authn_statement: None,
            attribute_statement: None,
        }
    }

    /// Sets the subject.
    #[must_use]
    pub fn with_subject(self, subject: Subject) -> Self {
        Self {
            subject: Some(subject),
            ..self
        }
    }

    /// Sets the conditions.
    #[must_use]
    pub fn with_conditions(self, conditions: Conditions) -> Self {
        Self {
            conditions: Some(conditions),
            ..self
        }
    }

    /// Sets the authentication statement.
    #[must_use]
    pub fn with_authn_statement(self, statement: AuthnStatement) -> Self {
        Self {
            authn_statement: Some(statement),
            ..self
        }
    }

    /// Sets the attribute statement.
    #[must_use]
    pub fn with_attribute_statement(self, statement: AttributeStatement) -> Self {
        Self {
            attribute_statement: Some(statement),
            ..self
        }
    }

    /// The subject's `NameID`.
    #[must_use]
    pub fn name_id(&self) -> Option<&NameId> {
        self.subject.as_ref()?.name_id.as_ref()
    }

    /// Every attribute, in document order.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attribute_statement
            .iter()
            .flat_map(|statement| &statement.attributes)
    }

    /// Reads an `Assertion` element. `ID`, `IssueInstant` and `Issuer` are
    /// required.
    pub fn from_element(element: &XmlElement) -> SamlResult<Self> {
        let id = element
            .attr("ID")
            .ok_or_else(|| invalid("assertion has no ID"))?
            .to_string();
        let issue_instant = instant_attr(element, "IssueInstant")?
            .ok_or_else(|| invalid("assertion has no IssueInstant"))?;
        let issuer = issuer_of(element).ok_or_else(|| invalid("assertion has no Issuer"))?;

        let attribute_statement = element.child("AttributeStatement").map(|_| {
            AttributeStatement {
                attributes: element
                    .children_named("AttributeStatement")
                    .flat_map(|statement| statement.children_named("Attribute"))
                    .map(Attribute::from_element)
                    .collect(),
            }
        });

        Ok(Self {
            version: element.attr("Version").unwrap_or(SAML_VERSION).to_string(),
            subject: element.child("Subject").map(Subject::from_element).transpose()?,
            conditions: element
                .child("Conditions")
                .map(Conditions::from_element)
                .transpose()?,
            authn_statement: element
                .child("AuthnStatement")
                .map(AuthnStatement::from_element)
                .transpose()?,
            id,
            issue_instant,
            issuer,
            attribute_statement,
        })
    }

    /// Renders the element with its own `xmlns:saml`, so it can be signed
    /// and verified on its own. An empty attribute statement is left out.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut xml = format!(
            r#"<saml:Assertion xmlns:saml="{SAML_NS}" ID="{}" Version="{}" IssueInstant="{}">"#,
            escape_attr(&self.id),
            escape_attr(&self.version),
            format_instant(&self.issue_instant),
        );
        xml.push_str(&issuer_xml(&self.issuer));
        if let Some(subject) = &self.subject {
            xml.push_str(&subject.to_xml());
        }
        if let Some(conditions) = &self.conditions {
            xml.push_str(&conditions.to_xml());
        }
        if let Some(statement) = &self.authn_statement {
            xml.push_str(&statement.to_xml());
        }
        if let Some(statement) = self
            .attribute_statement
            .as_ref()
            .filter(|statement| !statement.attributes.is_empty())
        {
            xml.push_str(&statement.to_xml());
        }
        xml.push_str("</saml:Assertion>");
        xml
    }
}

/// `saml:Subject`.
#[derive(Debug, Clone)]
pub struct Subject {
    /// The principal's identifier.
    pub name_id: Option<NameId>,
    /// How a presenter may prove it is the subject.
    pub subject_confirmations: Vec<SubjectConfirmation>,
}

impl Subject {
    /// A subject with no confirmations yet.
    #[must_use]
    pub fn new(name_id: NameId) -> Self {
        Self {
            name_id: Some(name_id),
            subject_confirmations: Vec::new(),
        }
    }

    /// Adds a confirmation.
    #[must_use]
    pub fn with_confirmation(mut self, confirmation: SubjectConfirmation) -> Self {
        self.subject_confirmations.push(confirmation);
        self
    }

    fn from_element(element: &XmlElement) -> SamlResult<Self> {
        let subject_confirmations = element
            .children_named("SubjectConfirmation")
            .map(SubjectConfirmation::from_element)
            .collect::<SamlResult<_>>()?;
        Ok(Self {
            name_id: element.child("NameID").map(NameId::from_element),
            subject_confirmations,
        })
    }

    fn to_xml(&self) -> String {
        let mut xml = String::from("<saml:Subject>");
        if let Some(name_id) = &self.name_id {
            xml.push_str(&name_id.to_xml());
        }
        xml.extend(self.subject_confirmations.iter().map(SubjectConfirmation::to_xml));
        xml.push_str("</saml:Subject>");
        xml
    }
}

/// `saml:SubjectConfirmation`.
#[derive(Debug, Clone)]
pub struct SubjectConfirmation {
    /// Confirmation method URI.
    pub method: String,
    /// Delivery constraints.
    pub subject_confirmation_data: Option<SubjectConfirmationData>,
}

impl SubjectConfirmation {
    /// The bearer method.
    pub const BEARER: &'static str = "urn:oasis:names:tc:SAML:2.0:cm:bearer";

    /// A bearer confirmation without data.
    #[must_use]
    pub fn bearer() -> Self {
        Self {
            method: Self::BEARER.to_string(),
            subject_confirmation_data: None,
        }
    }

    /// Attaches confirmation data.
    #[must_use]
    pub fn with_data(self, data: SubjectConfirmationData) -> Self {
        Self {
            subject_confirmation_data: Some(data),
            ..self
        }
    }

    /// True for the bearer method.
    #[must_use]
    pub fn is_bearer(&self) -> bool {
        self.method == Self::BEARER
    }

    fn from_element(element: &XmlElement) -> SamlResult<Self> {
        let subject_confirmation_data = element
            .child("SubjectConfirmationData")
            .map(SubjectConfirmationData::from_element)
            .transpose()?;
        Ok(Self {
            method: element.attr("Method").unwrap_or_default().to_string(),
            subject_confirmation_data,
        })
    }

    fn to_xml(&self) -> String {
        let mut xml = String::from("<saml:SubjectConfirmation");
        push_attr(&mut xml, "Method", Some(&self.method));
        match &self.subject_confirmation_data {
            Some(data) => {
                xml.push('>');
                xml.push_str(&data.to_xml());
                xml.push_str("</saml:SubjectConfirmation>");
            }
            None => xml.push_str("/>"),
        }
        xml
    }
}

/// Bearer confirmation details: which request this answers, where it may be
/// delivered and until when.
#[derive(Debug, Clone, Default)]
pub struct SubjectConfirmationData {
    /// Request the assertion answers.
    pub in_response_to: Option<String>,
    /// End of the delivery window.
    pub not_on_or_after: Option<DateTime<Utc>>,
    /// Start of the delivery window.
    pub not_before: Option<DateTime<Utc>>,
    /// ACS the assertion may be presented to.
    pub recipient: Option<String>,
}

impl SubjectConfirmationData {
    /// Confirmation data answering `request_id`, deliverable to `recipient`
    /// for the next five minutes.
    #[must_use]
    pub fn for_request(request_id: impl Into<String>, recipient: impl Into<String>) -> Self {
        Self {
            in_response_to: Some(request_id.into()),
            recipient: Some(recipient.into()),
            not_on_or_after: Some(Utc::now() + Duration::minutes(5)),
            not_before: None,
        }
    }

    fn from_element(element: &XmlElement) -> SamlResult<Self> {
        Ok(Self {
            not_on_or_after: instant_attr(element, "NotOnOrAfter")?,
            not_before: instant_attr(element, "NotBefore")?,
            in_response_to: element.attr("InResponseTo").map(String::from),
            recipient: element.attr("Recipient").map(String::from),
        })
    }

    fn to_xml(&self) -> String {
        let mut xml = String::from("<saml:SubjectConfirmationData");
        push_attr(&mut xml, "InResponseTo", self.in_response_to.as_deref());
        push_instant(&mut xml, "NotBefore", self.not_before.as_ref());
        push_instant(&mut xml, "NotOnOrAfter", self.not_on_or_after.as_ref());
        push_attr(&mut xml, "Recipient", self.recipient.as_deref());
        xml.push_str("/>");
        xml
    }
}

/// Validity window and audience restrictions.
#[derive(Debug, Clone, Default)]
pub struct Conditions {
    /// Not valid before this instant.
    pub not_before: Option<DateTime<Utc>>,
    /// Not valid from this instant on.
    pub not_on_or_after: Option<DateTime<Utc>>,
    /// Every restriction must admit the relying party.
    pub audience_restrictions: Vec<AudienceRestriction>,
}

impl Conditions {
    /// Valid from now for `validity_minutes`, with no audience yet.
    #[must_use]
    pub fn with_validity(validity_minutes: i64) -> Self {
        let now = Utc::now();
        Self {
            not_before: Some(now),
            not_on_or_after: Some(now + Duration::minutes(validity_minutes)),
            audience_restrictions: Vec::new(),
        }
    }

    /// Adds a restriction naming only `audience`.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience_restrictions.push(AudienceRestriction {
            audiences: vec![audience.into()],
        });
        self
    }

    /// True when some restriction lists `audience`.
    #[must_use]
    pub fn allows_audience(&self, audience: &str) -> bool {
        self.audience_restrictions
            .iter()
            .flat_map(|restriction| &restriction.audiences)
            .any(|candidate| candidate == audience)
    }

    fn from_element(element: &XmlElement) -> SamlResult<Self> {
        let audience_restrictions = element
            .children_named("AudienceRestriction")
            .map(|restriction| AudienceRestriction {
                audiences: restriction
                    .children_named("Audience")
                    .map(XmlElement::text)
                    .collect(),
            })
            .collect();
        Ok(Self {
            not_before: instant_attr(element, "NotBefore")?,
            not_on_or_after: instant_attr(element, "NotOnOrAfter")?,
            audience_restrictions,
        })
    }

    fn to_xml(&self) -> String {
        let mut xml = String::from("<saml:Conditions");
        push_instant(&mut xml, "NotBefore", self.not_before.as_ref());
        push_instant(&mut xml, "NotOnOrAfter", self.not_on_or_after.as_ref());
        xml.push('>');
        for restriction in &self.audience_restrictions {
            xml.push_str("<saml:AudienceRestriction>");
            xml.extend(
                restriction
                    .audiences
                    .iter()
                    .map(|audience| text_element("Audience", audience)),
            );
            xml.push_str("</saml:AudienceRestriction>");
        }
        xml.push_str("</saml:Conditions>");
        xml
    }
}

/// `saml:AudienceRestriction`.
#[derive(Debug, Clone, Default)]
pub struct AudienceRestriction {
    /// Entity IDs admitted by this restriction.
    pub audiences: Vec<String>,
}

/// When and how the subject authenticated.
#[derive(Debug, Clone)]
pub struct AuthnStatement {
    /// `AuthnInstant`; required.
    pub authn_instant: DateTime<Utc>,
    /// IdP session handle.
    pub session_index: Option<String>,
    /// `AuthnContextClassRef` URI.
    pub authn_context_class_ref: Option<String>,
}

impl AuthnStatement {
    /// A statement dated now with a fresh session index.
    #[must_use]
    pub fn new(context_class: AuthnContextClass) -> Self {
        Self {
            authn_instant: Utc::now(),
            session_index: Some(format!("_session{}", uuid::Uuid::new_v4())),
            authn_context_class_ref: Some(context_class.uri().to_string()),
        }
    }

    /// Overrides the class reference, e.g. with one reported upstream.
    #[must_use]
    pub fn with_class_ref(self, class_ref: impl Into<String>) -> Self {
        Self {
            authn_context_class_ref: Some(class_ref.into()),
            ..self
        }
    }

    fn from_element(element: &XmlElement) -> SamlResult<Self> {
        let authn_instant = instant_attr(element, "AuthnInstant")?
            .ok_or_else(|| invalid("AuthnStatement has no AuthnInstant"))?;
        Ok(Self {
            authn_instant,
            session_index: element.attr("SessionIndex").map(String::from),
            authn_context_class_ref: element
                .descendant("AuthnContextClassRef")
                .map(XmlElement::text),
        })
    }

    fn to_xml(&self) -> String {
        let mut xml = String::from("<saml:AuthnStatement");
        push_instant(&mut xml, "AuthnInstant", Some(&self.authn_instant));
        push_attr(&mut xml, "SessionIndex", self.session_index.as_deref());
        xml.push_str("><saml:AuthnContext>");
        if let Some(class_ref) = &self.authn_context_class_ref {
            xml.push_str(&text_element("AuthnContextClassRef", class_ref));
        }
        xml.push_str("</saml:AuthnContext></saml:AuthnStatement>");
        xml
    }
}

/// `saml:AttributeStatement`.
#[derive(Debug, Clone, Default)]
pub struct AttributeStatement {
    /// Attributes in document order.
    pub attributes: Vec<Attribute>,
}

impl AttributeStatement {
    /// An empty statement.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            attributes: Vec::new(),
        }
    }

    /// Appends an attribute.
    #[must_use]
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    fn to_xml(&self) -> String {
        let mut xml = String::from("<saml:AttributeStatement>");
        xml.extend(self.attributes.iter().map(Attribute::to_xml));
        xml.push_str("</saml:AttributeStatement>");
        xml
    }
}

/// A released attribute. Values are kept as plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Usually a `urn:oid:` URI.
    pub name: String,
    /// `NameFormat` URI.
    pub name_format: Option<String>,
    /// `FriendlyName`, e.g. `mail`.
    pub friendly_name: Option<String>,
    /// `AttributeValue` texts.
    pub values: Vec<String>,
}

impl Attribute {
    /// The `uri` name format used for OID-named attributes.
    pub const NAME_FORMAT_URI: &'static str = "urn:oasis:names:tc:SAML:2.0:attrname-format:uri";

    /// A one-valued attribute.
    #[must_use]
    pub fn single(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::multi(name, vec![value.into()])
    }

    /// An attribute with `values`.
    #[must_use]
    pub fn multi(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            name_format: None,
            friendly_name: None,
            values,
        }
    }

    /// Sets `FriendlyName`.
    #[must_use]
    pub fn with_friendly_name(self, name: impl Into<String>) -> Self {
        Self {
            friendly_name: Some(name.into()),
            ..self
        }
    }

    /// Sets `NameFormat`.
    #[must_use]
    pub fn with_format(self, format: impl Into<String>) -> Self {
        Self {
            name_format: Some(format.into()),
            ..self
        }
    }

    fn from_element(element: &XmlElement) -> Self {
        Self {
            name: element.attr("Name").unwrap_or_default().to_string(),
            name_format: element.attr("NameFormat").map(String::from),
            friendly_name: element.attr("FriendlyName").map(String::from),
            values: element
                .children_named("AttributeValue")
                .map(XmlElement::text)
                .collect(),
        }
    }

    fn to_xml(&self) -> String {
        let mut xml = String::from("<saml:Attribute");
        push_attr(&mut xml, "Name", Some(&self.name));
        push_attr(&mut xml, "NameFormat", self.name_format.as_deref());
        push_attr(&mut xml, "FriendlyName", self.friendly_name.as_deref());
        xml.push('>');
        xml.extend(
            self.values
                .iter()
                .map(|value| text_element("AttributeValue", value)),
        );
        xml.push_str("</saml:Attribute>");
        xml
    }
}
