//! Minimal XML element tree.
//!
//! SAML processing needs three things from XML: lookups by local name,
//! attribute access, and an exact view of the document for canonicalization.
//! [`XmlElement`] keeps qualified names, namespace declarations and text
//! nodes exactly as written. Comments, processing instructions and the XML
//! declaration are dropped.

use std::collections::BTreeMap;

use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{SamlError, SamlResult};

/// In-scope namespace declarations, keyed by prefix (`""` for the default
/// namespace).
pub type NamespaceScope = BTreeMap<String, String>;

/// Namespace bound to the reserved `xml` prefix.
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// A node in the element tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    /// A child element.
    Element(XmlElement),
    /// Character data, unescaped.
    Text(String),
}

/// An XML element with its attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    /// Qualified name as written (`saml:Issuer`).
    pub name: String,
    /// Attributes in document order, including `xmlns` declarations.
    pub attributes: Vec<(String, String)>,
    /// Child nodes in document order.
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Parses a document and returns its root element.
    pub fn parse(xml: &str) -> SamlResult<Self> {
        // XML end-of-line handling
        let normalized = xml.replace("\r\n", "\n").replace('\r', "\n");

        let mut reader = Reader::from_str(&normalized);
        reader.config_mut().trim_text(false);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => stack.push(Self::from_start(&start)?),
                Event::Empty(start) => {
                    let element = Self::from_start(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| SamlError::XmlParse("unbalanced end tag".to_string()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    if let Some(parent) = stack.last_mut() {
                        let value = text
                            .unescape()
                            .map_err(|e| SamlError::XmlParse(e.to_string()))?;
                        parent.push_text(&value);
                    }
                }
                Event::CData(cdata) => {
                    if let Some(parent) = stack.last_mut() {
                        let value = String::from_utf8(cdata.into_inner().into_owned())
                            .map_err(|e| SamlError::XmlParse(e.to_string()))?;
                        parent.push_text(&value);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(SamlError::XmlParse("unexpected end of document".to_string()));
        }

        root.ok_or_else(|| SamlError::XmlParse("document has no root element".to_string()))
    }

    fn from_start(start: &BytesStart<'_>) -> SamlResult<Self> {
        let name = std::str::from_utf8(start.name().as_ref())
            .map_err(|e| SamlError::XmlParse(e.to_string()))?
            .to_string();

        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| SamlError::XmlParse(e.to_string()))?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| SamlError::XmlParse(e.to_string()))?
                .to_string();
            let raw = std::str::from_utf8(&attr.value)
                .map_err(|e| SamlError::XmlParse(e.to_string()))?;
            // Literal whitespace becomes a space; character references
            // such as `&#xA;` keep their value.
            let normalized = raw.replace(['\t', '\n', '\r'], " ");
            let value = unescape(&normalized)
                .map_err(|e| SamlError::XmlParse(e.to_string()))?
                .into_owned();
            attributes.push((key, value));
        }

        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
        })
    }

    fn push_text(&mut self, value: &str) {
        if let Some(XmlNode::Text(existing)) = self.children.last_mut() {
            existing.push_str(value);
        } else {
            self.children.push(XmlNode::Text(value.to_string()));
        }
    }

    /// Returns the namespace prefix, if any.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Returns the local part of the element name.
    #[must_use]
    pub fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }

    /// Returns an attribute value by qualified name.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns the `ID` (or `Id`) attribute.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.attr("ID").or_else(|| self.attr("Id"))
    }

    /// Returns the namespace declarations made on this element.
    pub fn namespace_declarations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().filter_map(|(key, value)| {
            if key == "xmlns" {
                Some(("", value.as_str()))
            } else {
                key.strip_prefix("xmlns:")
                    .map(|prefix| (prefix, value.as_str()))
            }
        })
    }

    /// Returns the scope seen by this element's children.
    #[must_use]
    pub fn scope_for_children(&self, inherited: &NamespaceScope) -> NamespaceScope {
        let mut scope = inherited.clone();
        for (prefix, uri) in self.namespace_declarations() {
            scope.insert(prefix.to_string(), uri.to_string());
        }
        scope
    }

    /// Resolves the namespace URI of this element.
    #[must_use]
    pub fn namespace_uri(&self, inherited: &NamespaceScope) -> Option<String> {
        let prefix = self.prefix().unwrap_or("");
        self.scope_for_children(inherited)
            .get(prefix)
            .filter(|uri| !uri.is_empty())
            .cloned()
    }

    /// Iterates over child elements.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// Returns the first child element with the given local name.
    #[must_use]
    pub fn child(&self, local_name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.local_name() == local_name)
    }

    /// Iterates over child elements with the given local name.
    pub fn children_named<'a>(
        &'a self,
        local_name: &'a str,
    ) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.elements().filter(move |e| e.local_name() == local_name)
    }

    /// Returns the first descendant (depth-first) with the given local name.
    #[must_use]
    pub fn descendant(&self, local_name: &str) -> Option<&XmlElement> {
        for child in self.elements() {
            if child.local_name() == local_name {
                return Some(child);
            }
            if let Some(found) = child.descendant(local_name) {
                return Some(found);
            }
        }
        None
    }

    /// Returns every descendant with the given local name, in document order.
    #[must_use]
    pub fn descendants_named(&self, local_name: &str) -> Vec<&XmlElement> {
        let mut found = Vec::new();
        self.collect_named(local_name, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, local_name: &str, found: &mut Vec<&'a XmlElement>) {
        for child in self.elements() {
            if child.local_name() == local_name {
                found.push(child);
            }
            child.collect_named(local_name, found);
        }
    }

    /// Returns the concatenated text content, trimmed.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out.trim().to_string()
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                XmlNode::Text(text) => out.push_str(text),
                XmlNode::Element(element) => element.collect_text(out),
            }
        }
    }

    /// Visits this element and every descendant in document order.
    ///
    /// The visitor receives each element with the scope inherited from its
    /// ancestors (excluding the element's own declarations).
    pub fn walk<'a>(
        &'a self,
        inherited: &NamespaceScope,
        visit: &mut dyn FnMut(&'a XmlElement, &NamespaceScope),
    ) {
        visit(self, inherited);
        let scope = self.scope_for_children(inherited);
        for child in self.elements() {
            child.walk(&scope, visit);
        }
    }

    /// Finds the element carrying the given `ID`, with its inherited scope.
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<(&XmlElement, NamespaceScope)> {
        let mut found = None;
        self.walk(&NamespaceScope::new(), &mut |element, scope| {
            if found.is_none() && element.id() == Some(id) {
                found = Some((element, scope.clone()));
            }
        });
        found
    }
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> SamlResult<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(XmlNode::Element(element));
        Ok(())
    } else if root.is_none() {
        *root = Some(element);
        Ok(())
    } else {
        Err(SamlError::XmlParse("multiple root elements".to_string()))
    }
}

/// Escapes character data for string-built XML.
#[must_use]
pub fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escapes an attribute value for string-built XML.
#[must_use]
pub fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}
