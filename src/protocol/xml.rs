//! Minimal owned element tree over quick-xml events.
//!
//! Receiver responses are small and have a fixed nesting depth, so a tree is
//! easier to walk than a streaming reader and keeps the tag dispatch tables in
//! the adapter simple.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{ReceiverError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(start)) => stack.push(Self::open(&start)?),
                Ok(Event::Empty(start)) => {
                    let element = Self::open(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::End(_)) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| malformed("closing tag without opening tag"))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::Text(text)) => {
                    let text = text.unescape().map_err(malformed)?;
                    match stack.last_mut() {
                        Some(top) => top.text.push_str(&text),
                        None => return Err(malformed("text outside of the root element")),
                    }
                }
                Ok(Event::CData(data)) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Ok(Event::Eof) => break,
                // Declaration, comments, processing instructions, doctype
                Ok(_) => {}
                Err(e) => return Err(malformed(e)),
            }
        }

        if let Some(open) = stack.last() {
            return Err(malformed(format!("unclosed element <{}>", open.tag)));
        }
        root.ok_or_else(|| malformed("empty document"))
    }

    fn open(start: &BytesStart<'_>) -> Result<Self> {
        let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(malformed)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(malformed)?.into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            tag,
            attributes,
            ..Default::default()
        })
    }

    /// First direct child with the given tag.
    pub fn child(&self, tag: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// Walk nested children, e.g. `path(&["Freq", "Current", "Val"])`.
    pub fn path(&self, tags: &[&str]) -> Option<&XmlElement> {
        tags.iter().try_fold(self, |node, tag| node.child(tag))
    }

    pub fn child_text(&self, tag: &str) -> Option<&str> {
        self.child(tag).map(XmlElement::text)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// The `root[0][0]` element every receiver response is addressed by
    /// (envelope, then zone or source, then the status block).
    pub fn payload(&self) -> Option<&XmlElement> {
        self.children.first()?.children.first()
    }

    /// Like [`payload`](Self::payload) but a missing block is a malformed
    /// response.
    pub fn require_payload(&self) -> Result<&XmlElement> {
        self.payload()
            .ok_or_else(|| malformed(format!("<{}> has no status block", self.tag)))
    }
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(malformed("more than one root element")),
    }
    Ok(())
}

fn malformed(e: impl ToString) -> ReceiverError {
    ReceiverError::MalformedResponse(e.to_string())
}
