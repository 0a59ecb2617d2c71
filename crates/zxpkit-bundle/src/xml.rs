//! Minimal attributed XML tree used by the manifest.
//!
//! Only what the manifest needs: elements, ordered attributes, child elements
//! and a single verbatim text value per element. Comments, processing
//! instructions and declarations are dropped when parsing; text and CDATA
//! sections are merged. Element text is always written back as CDATA so it
//! survives a round trip without being re-escaped.

use crate::{BundleError, BundleResult};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, Event};

/// One element of an attributed tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: Option<String>,
}

impl XmlElement {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.push((key.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(child);
    }

    /// Value of the first attribute named `key`.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value of a required attribute.
    pub fn required_attribute(&self, key: &str) -> BundleResult<&str> {
        self.attribute(key)
            .ok_or_else(|| BundleError::missing_attribute(&self.name, key))
    }

    /// First direct child named `name`.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children named `name`, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }
}

/// Parse a document into its root element.
pub fn parse(document: &str) -> BundleResult<XmlElement> {
    let mut reader = Reader::from_str(document);
    let mut stack: Vec<(XmlElement, Option<String>)> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let element = open_element(&start)?;
                stack.push((element, None));
            }
            Event::Empty(start) => {
                let element = open_element(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let (mut element, text) = stack
                    .pop()
                    .ok_or_else(|| BundleError::Xml("unbalanced end tag".to_string()))?;
                element.text = finish_text(&element, text);
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some((_, buffer)) = stack.last_mut() {
                    let raw = std::str::from_utf8(&text)
                        .map_err(|e| BundleError::Xml(e.to_string()))?;
                    let unescaped = quick_xml::escape::unescape(raw)
                        .map_err(|e| BundleError::Xml(e.to_string()))?;
                    buffer.get_or_insert_with(String::new).push_str(&unescaped);
                }
            }
            Event::CData(cdata) => {
                if let Some((_, buffer)) = stack.last_mut() {
                    let raw = std::str::from_utf8(&cdata)
                        .map_err(|e| BundleError::Xml(e.to_string()))?;
                    buffer.get_or_insert_with(String::new).push_str(raw);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(BundleError::Xml("unexpected end of document".to_string()));
    }

    root.ok_or_else(|| BundleError::Xml("document has no root element".to_string()))
}

/// Serialize a tree to a UTF-8 document with an XML declaration.
pub fn to_string(root: &XmlElement) -> BundleResult<String> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write_element(&mut writer, root)?;

    String::from_utf8(writer.into_inner()).map_err(|e| BundleError::Xml(e.to_string()))
}

fn open_element(start: &BytesStart<'_>) -> BundleResult<XmlElement> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| BundleError::Xml(e.to_string()))?
        .to_string();
    let mut element = XmlElement::new(&name);

    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| BundleError::Xml(e.to_string()))?;
        let key = std::str::from_utf8(attribute.key.as_ref())
            .map_err(|e| BundleError::Xml(e.to_string()))?;
        let raw = std::str::from_utf8(&attribute.value)
            .map_err(|e| BundleError::Xml(e.to_string()))?;
        let value =
            quick_xml::escape::unescape(raw).map_err(|e| BundleError::Xml(e.to_string()))?;
        element.attributes.push((key.to_string(), value.into_owned()));
    }

    Ok(element)
}

fn attach(
    stack: &mut [(XmlElement, Option<String>)],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> BundleResult<()> {
    if let Some((parent, _)) = stack.last_mut() {
        parent.push(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(BundleError::Xml(format!(
            "unexpected second root element <{}>",
            element.name
        )));
    }
    *root = Some(element);
    Ok(())
}

// Whitespace between child elements is layout, not content. Only valid for
// element-only containers: a whitespace run in mixed content would be lost.
fn finish_text(element: &XmlElement, text: Option<String>) -> Option<String> {
    text.filter(|t| element.children.is_empty() || !t.trim().is_empty())
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> BundleResult<()> {
    let start = BytesStart::new(element.name.as_str()).with_attributes(
        element
            .attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str())),
    );

    if element.children.is_empty() && element.text.is_none() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if let Some(text) = &element.text {
        write_cdata(writer, text)?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

/// Write `text` as one or more CDATA sections.
///
/// A literal `]]>` cannot appear inside a section, so it is split between two
/// adjacent sections; readers concatenate them back into the original text.
fn write_cdata(writer: &mut Writer<Vec<u8>>, text: &str) -> BundleResult<()> {
    let parts: Vec<&str> = text.split("]]>").collect();
    let last = parts.len() - 1;

    for (i, part) in parts.iter().enumerate() {
        let mut section = String::new();
        if i > 0 {
            section.push('>');
        }
        section.push_str(part);
        if i < last {
            section.push_str("]]");
        }
        writer.write_event(Event::CData(BytesCData::new(section)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    #[test]
    fn parse___reads_attributes_and_children() {
        let doc = r#"<?xml version="1.0"?>
<root a="1" b="x &amp; y">
  <!-- ignored -->
  <item name="first"/>
  <item name="second"></item>
</root>"#;

        let root = parse(doc).unwrap();

        assert_eq!(root.name, "root");
        assert_eq!(root.attribute("a"), Some("1"));
        assert_eq!(root.attribute("b"), Some("x & y"));
        assert_eq!(root.children_named("item").count(), 2);
        assert_eq!(root.text, None);
    }

    #[test]
    fn parse___merges_text_and_cdata() {
        let doc = "<root><note>a &lt; b <![CDATA[<raw> & ]]>c</note></root>";

        let root = parse(doc).unwrap();

        assert_eq!(
            root.child("note").unwrap().text.as_deref(),
            Some("a < b <raw> & c")
        );
    }

    #[test]
    fn parse___missing_text___is_none() {
        let root = parse("<root><note/></root>").unwrap();

        assert_eq!(root.child("note").unwrap().text, None);
    }

    #[test]
    fn parse___whitespace_only_text___kept_in_leaf_dropped_in_container() {
        let doc = "<root>\n  <note>  </note>\n</root>";

        let root = parse(doc).unwrap();

        assert_eq!(root.text, None);
        assert_eq!(root.child("note").unwrap().text.as_deref(), Some("  "));
    }

    #[test]
    fn parse___not_xml___returns_error() {
        let result = parse("<root><unclosed></root>");

        assert!(matches!(result, Err(BundleError::Xml(_))));
    }

    #[test]
    fn parse___empty_document___returns_error() {
        let result = parse("   ");

        assert!(matches!(result, Err(BundleError::Xml(_))));
    }

    #[test]
    fn required_attribute___missing___names_element_and_attribute() {
        let element = XmlElement::new("product");

        let err = element.required_attribute("version").unwrap_err();

        assert!(matches!(
            err,
            BundleError::MissingAttribute { ref element, ref attribute }
                if element == "product" && attribute == "version"
        ));
    }

    #[test]
    fn to_string___emits_declaration() {
        let doc = to_string(&XmlElement::new("root")).unwrap();

        assert!(doc.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(doc.contains("<root/>"));
    }

    #[test]
    fn to_string___text_with_cdata_terminator___roundtrips_verbatim() {
        let text = "if (a[b[0]]>1) { x = \"]]>\"; } & <done>";
        let mut root = XmlElement::new("root");
        root.push(XmlElement::new("script").with_text(text));

        let doc = to_string(&root).unwrap();
        let parsed = parse(&doc).unwrap();

        assert_eq!(parsed.child("script").unwrap().text.as_deref(), Some(text));
    }

    #[test]
    fn to_string___escapes_attribute_values() {
        let root = XmlElement::new("root").with_attribute("name", "\"A\" & <B>");

        let doc = to_string(&root).unwrap();
        let parsed = parse(&doc).unwrap();

        assert_eq!(parsed.attribute("name"), Some("\"A\" & <B>"));
    }
}
