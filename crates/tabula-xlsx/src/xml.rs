//! A small XML tree for package metadata parts
//!
//! Content types, relationships, the workbook part and document properties
//! are small documents whose child order matters to consumers. They are
//! parsed into and built as [`XmlDocument`] trees; worksheet parts are
//! streamed instead (see `worksheet_part`).

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};

/// Declaration written at the top of every generated part
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// An element with attributes, text and ordered children
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlNode {
    /// Qualified name as written (`dc:creator`)
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without its namespace prefix
    pub fn local_name(&self) -> &str {
        self.name
            .rsplit_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }

    /// Matches a qualified name exactly, or an unprefixed name by local name
    pub fn is_named(&self, name: &str) -> bool {
        self.name == name || (!name.contains(':') && self.local_name() == name)
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attribute(key).is_some()
    }

    /// Set an attribute, replacing an existing value with the same key
    pub fn add_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
        self
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = text.into();
        self
    }

    /// Append a new child element and return it
    pub fn add_child(&mut self, name: impl Into<String>) -> &mut XmlNode {
        self.children.push(XmlNode::new(name));
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    pub fn push_child(&mut self, child: XmlNode) {
        self.children.push(child);
    }

    /// First child with the given name
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.is_named(name))
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut XmlNode> {
        self.children.iter_mut().find(|c| c.is_named(name))
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.child(name).is_some()
    }

    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    /// Children with the given name, in document order
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |c| c.is_named(name))
    }

    fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push_str(&format!(" {}=\"{}\"", key, escape_xml(value)));
        }

        if self.text.is_empty() && self.children.is_empty() {
            out.push_str("/>");
            return;
        }

        out.push('>');
        out.push_str(&escape_text(&self.text));
        for child in &self.children {
            child.write_to(out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

/// A parsed or generated XML part
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    /// Namespace declarations on the root, `("", uri)` for the default namespace
    namespaces: Vec<(String, String)>,
    root: XmlNode,
}

impl XmlDocument {
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            namespaces: Vec::new(),
            root: XmlNode::new(root_name),
        }
    }

    /// Declare a namespace on the root element (`""` declares the default namespace)
    pub fn add_namespace(&mut self, prefix: &str, uri: &str) -> &mut Self {
        match self.namespaces.iter_mut().find(|(p, _)| p == prefix) {
            Some(slot) => slot.1 = uri.to_string(),
            None => self.namespaces.push((prefix.to_string(), uri.to_string())),
        }
        self
    }

    pub fn namespace(&self, prefix: &str) -> Option<&str> {
        self.namespaces
            .iter()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    /// Namespace bound to `prefix` at `scope` (innermost element first),
    /// falling back to the root declarations
    pub fn resolve_prefix<'a>(&'a self, scope: &[&'a XmlNode], prefix: &str) -> Option<&'a str> {
        let key = format!("xmlns:{}", prefix);
        scope
            .iter()
            .find_map(|node| node.attribute(&key))
            .or_else(|| self.namespace(prefix))
    }

    pub fn root(&self) -> &XmlNode {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut XmlNode {
        &mut self.root
    }

    /// Parse a complete document.
    ///
    /// Whitespace-only text between child elements is dropped; text of leaf
    /// elements is kept as written.
    pub fn parse(bytes: &[u8]) -> XlsxResult<Self> {
        let mut xml_reader = Reader::from_reader(bytes);
        xml_reader.trim_text(false);

        let mut buf = Vec::new();
        let mut namespaces = Vec::new();
        let mut stack: Vec<XmlNode> = Vec::new();
        let mut root: Option<XmlNode> = None;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let is_root = stack.is_empty() && root.is_none();
                    let node = Self::node_from_start(&e, is_root, &mut namespaces)?;
                    stack.push(node);
                }
                Ok(Event::Empty(e)) => {
                    let is_root = stack.is_empty() && root.is_none();
                    let node = Self::node_from_start(&e, is_root, &mut namespaces)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => root = Some(node),
                    }
                }
                Ok(Event::End(_)) => {
                    if let Some(mut node) = stack.pop() {
                        if !node.children.is_empty() && node.text.trim().is_empty() {
                            node.text.clear();
                        }
                        match stack.last_mut() {
                            Some(parent) => parent.children.push(node),
                            None => root = Some(node),
                        }
                    }
                }
                Ok(Event::Text(e)) => {
                    if let Some(node) = stack.last_mut() {
                        node.text.push_str(&e.unescape()?);
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(node) = stack.last_mut() {
                        node.text.push_str(&String::from_utf8_lossy(&e));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        let root =
            root.ok_or_else(|| XlsxError::InvalidFormat("XML part has no root element".into()))?;

        Ok(Self { namespaces, root })
    }

    fn node_from_start(
        e: &BytesStart<'_>,
        is_root: bool,
        namespaces: &mut Vec<(String, String)>,
    ) -> XlsxResult<XmlNode> {
        let mut node = XmlNode::new(String::from_utf8_lossy(e.name().as_ref()));

        for attr in e.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();

            if is_root {
                if key == "xmlns" {
                    namespaces.push((String::new(), value));
                    continue;
                }
                if let Some(prefix) = key.strip_prefix("xmlns:") {
                    namespaces.push((prefix.to_string(), value));
                    continue;
                }
            }
            node.attributes.push((key, value));
        }

        Ok(node)
    }

    /// Serialize with the standard declaration; child order is preserved
    pub fn to_xml_string(&self) -> String {
        let mut out = String::with_capacity(512);
        out.push_str(XML_DECLARATION);
        out.push('\n');

        let mut root = self.root.clone();
        let mut declared: Vec<(String, String)> = self
            .namespaces
            .iter()
            .map(|(prefix, uri)| {
                let key = if prefix.is_empty() {
                    "xmlns".to_string()
                } else {
                    format!("xmlns:{}", prefix)
                };
                (key, uri.clone())
            })
            .collect();
        declared.append(&mut root.attributes);
        root.attributes = declared;

        root.write_to(&mut out);
        out
    }
}

/// Escape element content; quotes are left as written
pub fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape text for use in element content and attribute values
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_and_serialize() {
        let mut doc = XmlDocument::new("Types");
        doc.add_namespace("", "urn:test");
        doc.root_mut()
            .add_child("Default")
            .add_attribute("Extension", "xml")
            .add_attribute("ContentType", "a&b");
        doc.root_mut().add_child("Note").set_text("<hi>");

        assert_eq!(
            doc.to_xml_string(),
            format!(
                "{}\n<Types xmlns=\"urn:test\"><Default Extension=\"xml\" ContentType=\"a&amp;b\"/><Note>&lt;hi&gt;</Note></Types>",
                XML_DECLARATION
            )
        );
    }

    #[test]
    fn test_parse_keeps_order_and_namespaces() {
        let xml = br#"<?xml version="1.0"?>
<cp:coreProperties xmlns:cp="urn:cp" xmlns:dc="urn:dc">
    <dc:creator> Ada </dc:creator>
    <cp:lastModifiedBy/>
    <dc:title>A &amp; B</dc:title>
</cp:coreProperties>"#;

        let doc = XmlDocument::parse(xml).unwrap();
        assert_eq!(doc.namespace("dc"), Some("urn:dc"));

        let root = doc.root();
        assert_eq!(root.name(), "cp:coreProperties");
        assert_eq!(root.text(), "");
        let names: Vec<_> = root.children().iter().map(XmlNode::name).collect();
        assert_eq!(names, ["dc:creator", "cp:lastModifiedBy", "dc:title"]);

        assert_eq!(root.child("dc:creator").unwrap().text(), " Ada ");
        assert_eq!(root.child("title").unwrap().text(), "A & B");
        assert!(root.child("dc:subject").is_none());
    }

    #[test]
    fn test_reparse_roundtrip() {
        let mut doc = XmlDocument::new("x:root");
        doc.add_namespace("x", "urn:x");
        let child = doc.root_mut().add_child("x:item");
        child.add_attribute("name", "\"quoted\"");
        child.set_text("text");

        let parsed = XmlDocument::parse(doc.to_xml_string().as_bytes()).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_text_keeps_quotes() {
        let mut node = XmlNode::new("definedName");
        node.add_attribute("comment", "it's");
        node.set_text("'My Data'!$A$1");

        let mut out = String::new();
        node.write_to(&mut out);
        assert_eq!(
            out,
            "<definedName comment=\"it&apos;s\">'My Data'!$A$1</definedName>"
        );
    }

    #[test]
    fn test_empty_document_is_invalid() {
        assert!(matches!(
            XmlDocument::parse(b"<?xml version=\"1.0\"?>"),
            Err(XlsxError::InvalidFormat(_))
        ));
    }
}
