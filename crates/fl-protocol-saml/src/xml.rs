//! Minimal XML element tree.
//!
//! Only what the SAML message types need: element local names, attributes,
//! text content and children. Namespace prefixes are dropped on read; the
//! writers in [`crate::types`] emit the standard `saml`/`samlp` prefixes.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{SamlError, SamlResult};

/// A parsed XML element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Local name, without namespace prefix.
    pub name: String,
    /// Attributes keyed by local name, in document order.
    pub attributes: Vec<(String, String)>,
    /// Child elements in document order.
    pub children: Vec<Element>,
    /// Concatenated, trimmed text content.
    pub text: String,
}

impl Element {
    /// Returns the value of attribute `name`.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns the first direct child named `name`.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Returns every direct child named `name`.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Returns the first descendant named `name`, depth first.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Element> {
        for child in &self.children {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.find(name) {
                return Some(found);
            }
        }
        None
    }

    /// Returns the text of the first direct child named `name`.
    #[must_use]
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str())
    }
}

fn local_name(raw: &[u8]) -> SamlResult<String> {
    let name = std::str::from_utf8(raw).map_err(|e| SamlError::XmlParse(e.to_string()))?;
    Ok(name.rsplit(':').next().unwrap_or(name).to_string())
}

fn element_from_start(start: &BytesStart<'_>) -> SamlResult<Element> {
    let mut element = Element {
        name: local_name(start.local_name().as_ref())?,
        ..Element::default()
    };

    for attr in start.attributes() {
        let attr = attr.map_err(|e| SamlError::XmlParse(e.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| SamlError::XmlParse(e.to_string()))?;
        if key == "xmlns" || key.starts_with("xmlns:") {
            continue;
        }
        let value = attr.unescape_value()?;
        element
            .attributes
            .push((local_name(attr.key.local_name().as_ref())?, value.into_owned()));
    }

    Ok(element)
}

/// Parses a document and returns its root element.
///
/// # Errors
///
/// Returns [`SamlError::XmlParse`] for malformed or empty documents.
pub fn parse(xml: &str) -> SamlResult<Element> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(element_from_start(&start)?),
            Event::Empty(start) => {
                let element = element_from_start(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| SamlError::XmlParse("unbalanced end tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(text.unescape()?.trim());
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    let data = std::str::from_utf8(&data)
                        .map_err(|e| SamlError::XmlParse(e.to_string()))?;
                    current.text.push_str(data);
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

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> SamlResult<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(SamlError::XmlParse(
                "document has more than one root element".to_string(),
            ))
        }
    }
    Ok(())
}

/// Escapes text or attribute content.
#[must_use]
pub fn escape(s: &str) -> String {
    quick_xml::escape::escape(s).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_prefixed_document() {
        let xml = r#"<?xml version="1.0"?>
<samlp:LogoutRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" ID="_abc" Version="2.0">
    <saml:Issuer xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion">https://sp.example.com</saml:Issuer>
    <saml:NameID>alice &amp; co</saml:NameID>
    <samlp:SessionIndex/>
</samlp:LogoutRequest>"#;

        let root = parse(xml).unwrap();
        assert_eq!(root.name, "LogoutRequest");
        assert_eq!(root.attr("ID"), Some("_abc"));
        assert_eq!(root.attr("xmlns:samlp"), None);
        assert_eq!(root.child_text("Issuer"), Some("https://sp.example.com"));
        assert_eq!(root.child_text("NameID"), Some("alice & co"));
        assert!(root.child("SessionIndex").is_some());
    }

    #[test]
    fn find_searches_descendants() {
        let root = parse("<a><b><c x=\"1\"/></b><c x=\"2\"/></a>").unwrap();
        assert_eq!(root.find("c").and_then(|c| c.attr("x")), Some("1"));
        assert_eq!(root.children_named("c").count(), 1);
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(parse("").is_err());
        assert!(parse("<a><b></a>").is_err());
        assert!(parse("<a>").is_err());
        assert!(parse("<a/><b/>").is_err());
        assert!(parse("not xml").is_err());
    }

    #[test]
    fn escape_special_characters() {
        assert_eq!(escape("a<b&\"c\""), "a&lt;b&amp;&quot;c&quot;");
    }
}
