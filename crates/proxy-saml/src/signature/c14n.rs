//! Exclusive XML canonicalization (without comments).
//!
//! Implements the subset of `http://www.w3.org/2001/10/xml-exc-c14n#` that
//! SAML signatures rely on: visibly utilized namespace rendering, sorted
//! namespace declarations and attributes, expanded empty elements and
//! C14N character escaping. Prefixes named in an `InclusiveNamespaces`
//! `PrefixList` are rendered wherever they are in scope.

use std::collections::BTreeSet;

use crate::xml::{NamespaceScope, XmlElement, XmlNode, XML_NS};

/// Canonicalizes an element subtree.
///
/// `inherited` is the namespace scope the element sees from its ancestors.
/// Child elements for which `exclude` returns true are omitted, which is how
/// the enveloped-signature transform drops the `Signature` element.
#[must_use]
pub fn canonicalize(
    element: &XmlElement,
    inherited: &NamespaceScope,
    exclude: &dyn Fn(&XmlElement) -> bool,
) -> String {
    canonicalize_with_prefixes(element, inherited, &[], exclude)
}

/// Canonicalizes an element subtree with an inclusive prefix list.
///
/// `#default` in `inclusive_prefixes` stands for the default namespace.
#[must_use]
pub fn canonicalize_with_prefixes(
    element: &XmlElement,
    inherited: &NamespaceScope,
    inclusive_prefixes: &[&str],
    exclude: &dyn Fn(&XmlElement) -> bool,
) -> String {
    let inclusive: Vec<&str> = inclusive_prefixes
        .iter()
        .map(|p| if *p == "#default" { "" } else { *p })
        .collect();
    let mut out = String::new();
    write_element(
        &mut out,
        element,
        inherited,
        &NamespaceScope::new(),
        &inclusive,
        exclude,
    );
    out
}

fn write_element(
    out: &mut String,
    element: &XmlElement,
    inherited: &NamespaceScope,
    rendered: &NamespaceScope,
    inclusive: &[&str],
    exclude: &dyn Fn(&XmlElement) -> bool,
) {
    let scope = element.scope_for_children(inherited);

    let mut visible: BTreeSet<&str> = inclusive.iter().copied().collect();
    visible.insert(element.prefix().unwrap_or(""));
    for (name, _) in plain_attributes(element) {
        if let Some((prefix, _)) = name.split_once(':') {
            if prefix != "xml" {
                visible.insert(prefix);
            }
        }
    }

    let mut rendered_here = rendered.clone();
    let mut declarations = Vec::new();
    for prefix in visible {
        let uri = scope.get(prefix).map_or("", String::as_str);
        let current = rendered.get(prefix).map_or("", String::as_str);
        if uri != current {
            declarations.push((prefix, uri));
            rendered_here.insert(prefix.to_string(), uri.to_string());
        }
    }

    let mut attributes: Vec<(&str, &str, &str, &str)> = plain_attributes(element)
        .map(|(name, value)| {
            let (namespace, local) = match name.split_once(':') {
                Some(("xml", local)) => (XML_NS, local),
                Some((prefix, local)) => (scope.get(prefix).map_or("", String::as_str), local),
                None => ("", name),
            };
            (namespace, local, name, value)
        })
        .collect();
    attributes.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    out.push('<');
    out.push_str(&element.name);
    for (prefix, uri) in declarations {
        if prefix.is_empty() {
            out.push_str(" xmlns=\"");
        } else {
            out.push_str(" xmlns:");
            out.push_str(prefix);
            out.push_str("=\"");
        }
        out.push_str(&escape_attr(uri));
        out.push('"');
    }
    for (_, _, name, value) in attributes {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape_attr(value));
        out.push('"');
    }
    out.push('>');

    for child in &element.children {
        match child {
            XmlNode::Text(text) => out.push_str(&escape_text(text)),
            XmlNode::Element(child) => {
                if !exclude(child) {
                    write_element(out, child, &scope, &rendered_here, inclusive, exclude);
                }
            }
        }
    }

    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

fn plain_attributes(element: &XmlElement) -> impl Iterator<Item = (&str, &str)> {
    element
        .attributes
        .iter()
        .filter(|(name, _)| name != "xmlns" && !name.starts_with("xmlns:"))
        .map(|(name, value)| (name.as_str(), value.as_str()))
}

fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
    out
}
