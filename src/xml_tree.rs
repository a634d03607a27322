// Minimal element tree built on quick-xml, enough for Chargify's attribute-bag documents
use std::io::{self, Write};

use quick_xml::escape::{escape, unescape};
use quick_xml::events::{BytesDecl, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::Writer;

use crate::encoding::to_char_refs;
use crate::marshal::MarshalError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    // Concatenation of the element's direct text nodes
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(child);
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    // Pre-order walk over this element and everything below it
    fn collect_named<'a>(&'a self, name: &str, out: &mut Vec<&'a XmlElement>) {
        if self.name == name {
            out.push(self);
        }
        for child in &self.children {
            child.collect_named(name, out);
        }
    }

    pub fn write<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        let mut element = writer.create_element(self.name.as_str());
        for (key, value) in &self.attributes {
            element = element.with_attribute((key.as_str(), value.as_str()));
        }
        if self.children.is_empty() {
            if self.text.is_empty() {
                element.write_empty()?;
            } else {
                let escaped = escape(self.text.as_str());
                let text = to_char_refs(&escaped).into_owned();
                element.write_text_content(BytesText::from_escaped(text))?;
            }
        } else {
            element.write_inner_content(|w| {
                for child in &self.children {
                    child.write(w)?;
                }
                Ok(())
            })?;
        }
        Ok(())
    }

    /// Serializes the element as a standalone document with an XML declaration.
    pub fn to_document(&self) -> Result<String, MarshalError> {
        let mut buf = Vec::with_capacity(256);
        let mut writer = Writer::new(&mut buf);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| MarshalError::Write(e.to_string()))?;
        self.write(&mut writer)
            .map_err(|e| MarshalError::Write(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| MarshalError::Write(e.to_string()))
    }
}

/// All elements named `name` in document order, searching every depth.
pub fn find_all<'a>(roots: &'a [XmlElement], name: &str) -> Vec<&'a XmlElement> {
    let mut out = Vec::new();
    for root in roots {
        root.collect_named(name, &mut out);
    }
    out
}

// Parses a document or fragment into its top-level elements
pub fn parse_fragment(xml: &str) -> Result<Vec<XmlElement>, MarshalError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut roots = Vec::new();

    loop {
        let event = reader.read_event().map_err(|e| {
            MarshalError::Xml(format!("at position {}: {}", reader.error_position(), e))
        })?;
        match event {
            Event::Start(e) => stack.push(element_from_start(&e)?),
            Event::Empty(e) => {
                let element = element_from_start(&e)?;
                attach(&mut stack, &mut roots, element);
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| MarshalError::Xml("unbalanced end tag".to_string()))?;
                attach(&mut stack, &mut roots, element);
            }
            Event::Text(e) => {
                if let Some(top) = stack.last_mut() {
                    let decoded = e.decode().map_err(|err| MarshalError::Xml(err.to_string()))?;
                    let text = unescape(&decoded).map_err(|err| MarshalError::Xml(err.to_string()))?;
                    top.text.push_str(&text);
                }
            }
            Event::CData(e) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::GeneralRef(e) => {
                if let Some(top) = stack.last_mut() {
                    let name = e.decode().map_err(|err| MarshalError::Xml(err.to_string()))?;
                    let reference = format!("&{};", name);
                    let text =
                        unescape(&reference).map_err(|err| MarshalError::Xml(err.to_string()))?;
                    top.text.push_str(&text);
                }
            }
            Event::Eof => break,
            _ => (), // declarations, comments, processing instructions
        }
    }

    if let Some(open) = stack.last() {
        return Err(MarshalError::Xml(format!("unclosed element <{}>", open.name)));
    }
    Ok(roots)
}

fn attach(stack: &mut [XmlElement], roots: &mut Vec<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => roots.push(element),
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<XmlElement, MarshalError> {
    let mut element = XmlElement::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(|e| MarshalError::Xml(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value);
        let value = unescape(&raw).map_err(|e| MarshalError::Xml(e.to_string()))?;
        element.attributes.push((key, value.into_owned()));
    }
    Ok(element)
}
