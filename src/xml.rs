//! Decodes the XML members (`Track.xml`, `Events.xml`) into a loose tree.
//!
//! The tree is deliberately untyped. Elements and attributes land in the
//! same namespace, so `<track name="Day 1"/>` and
//! `<track><name>Day 1</name></track>` read the same way.
//! Every element or attribute name can repeat,
//! so each key maps to a list of nodes, in document order.
//!
//! # Key case
//!
//! The .skiz writer isn't consistent about case (`includeinseason` next to
//! `syncIdentifier`). All keys are folded with [`normalize_key()`] when the
//! tree is built _and_ when it's queried, so lookups are case-insensitive
//! and mappers can spell keys however reads best.

use std::collections::BTreeMap;

use log::*;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::result::*;

/// Folds an element or attribute name to the one casing the tree uses.
pub fn normalize_key(key: &str) -> String {
    key.to_lowercase()
}

/// An element, attribute, or the document itself
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct XmlNode {
    text: Option<String>,
    children: BTreeMap<String, Vec<XmlNode>>,
}

impl XmlNode {
    fn leaf(text: String) -> Self {
        Self {
            text: Some(text),
            children: BTreeMap::new(),
        }
    }

    fn insert(&mut self, key: &str, node: XmlNode) {
        self.children
            .entry(normalize_key(key))
            .or_default()
            .push(node);
    }

    fn append_text(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        match &mut self.text {
            Some(existing) => existing.push_str(text),
            None => self.text = Some(text.to_owned()),
        }
    }

    /// An element with neither text nor children reads as an empty string,
    /// the same as an empty attribute.
    fn close(mut self) -> Self {
        if self.text.is_none() && self.children.is_empty() {
            self.text = Some(String::new());
        }
        self
    }

    /// The node's own text content (or attribute value), trimmed
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Every child element or attribute named `key`, in document order.
    ///
    /// One match is still a list of one, and no matches is an empty list.
    pub fn children(&self, key: &str) -> &[XmlNode] {
        self.children
            .get(&normalize_key(key))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The first child element or attribute named `key`
    pub fn child(&self, key: &str) -> Option<&XmlNode> {
        self.children(key).first()
    }

    /// Shorthand for the text of the first child named `key`
    pub fn value(&self, key: &str) -> Option<&str> {
        self.child(key).and_then(XmlNode::text)
    }
}

/// Decodes a complete XML document.
///
/// The returned node is the document; its single child is the root element.
pub fn decode(document: &[u8]) -> DecodeResult<XmlNode> {
    let mut reader = Reader::from_reader(document);
    reader.config_mut().trim_text(true);

    // The document, then each open element under it
    let mut stack: Vec<(String, XmlNode)> = vec![(String::new(), XmlNode::default())];
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) => {
                let element = open_element(&start)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let (name, node) = open_element(&start)?;
                top(&mut stack).insert(&name, node.close());
            }
            Event::End(end) => {
                let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                if stack.len() < 2 {
                    return Err(DecodeError::Unbalanced(name));
                }
                if let Some((name, node)) = stack.pop() {
                    top(&mut stack).insert(&name, node.close());
                }
            }
            Event::Text(text) => {
                let text = text.unescape()?;
                top(&mut stack).append_text(&text);
            }
            Event::CData(data) => {
                let data = data.into_inner();
                top(&mut stack).append_text(&String::from_utf8_lossy(&data));
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctypes
            _ => {}
        }
        buf.clear();
    }

    if stack.len() > 1 {
        let (unclosed, _) = stack.swap_remove(1);
        return Err(DecodeError::Unbalanced(unclosed));
    }
    let (_, document) = stack.pop().unwrap_or_default();
    trace!("Decoded {:?}", document);
    Ok(document)
}

/// Returns the innermost open node.
fn top(stack: &mut [(String, XmlNode)]) -> &mut XmlNode {
    // The document node is never popped.
    &mut stack[stack.len() - 1].1
}

/// Builds the node for a start tag, with its attributes as leaf children.
fn open_element(start: &BytesStart) -> DecodeResult<(String, XmlNode)> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut node = XmlNode::default();
    for attribute in start.attributes() {
        let attribute = attribute?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value()?;
        node.insert(&key, XmlNode::leaf(value.trim().to_owned()));
    }
    Ok((name, node))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn attributes_and_elements_share_keys() {
        let doc = decode(
            br#"<?xml version="1.0" encoding="UTF-8"?>
            <track name="Day 15 - 2020/2021" includeInSeason="true">
                <metrics>
                    <maxSpeed>21.5</maxSpeed>
                </metrics>
                <activity>skiing</activity>
            </track>"#,
        )
        .unwrap();

        let track = doc.child("track").unwrap();
        assert_eq!(track.value("name"), Some("Day 15 - 2020/2021"));
        assert_eq!(track.value("activity"), Some("skiing"));
        assert_eq!(track.value("includeinseason"), Some("true"));
        assert_eq!(track.value("INCLUDEINSEASON"), Some("true"));
        assert_eq!(
            track.child("metrics").unwrap().value("maxspeed"),
            Some("21.5")
        );
        assert_eq!(track.value("nope"), None);
    }

    #[test]
    fn siblings_are_always_lists() {
        let one = decode(br#"<events><event type="pause"/></events>"#).unwrap();
        let events = one.child("events").unwrap().children("event");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].value("type"), Some("pause"));

        let many = decode(
            br#"<events>
                <event type="pause"/>
                <event type="lift"></event>
                <event><type>pause</type></event>
            </events>"#,
        )
        .unwrap();
        let types: Vec<_> = many
            .child("events")
            .unwrap()
            .children("event")
            .iter()
            .map(|e| e.value("type"))
            .collect();
        assert_eq!(types, vec![Some("pause"), Some("lift"), Some("pause")]);

        let none = decode(b"<events/>").unwrap();
        assert!(none.child("events").unwrap().children("event").is_empty());
    }

    #[test]
    fn empty_elements_match_empty_attributes() {
        let doc = decode(
            br#"<segment comment="">
                <name></name>
                <link/>
                <category>   </category>
                <uuid id="2b3c"/>
                <metrics><time>300</time></metrics>
            </segment>"#,
        )
        .unwrap();
        let segment = doc.child("segment").unwrap();
        assert_eq!(segment.value("comment"), Some(""));
        assert_eq!(segment.value("name"), Some(""));
        assert_eq!(segment.value("link"), Some(""));
        assert_eq!(segment.value("category"), Some(""));
        // Elements with children or attributes aren't text.
        assert_eq!(segment.value("uuid"), None);
        assert_eq!(segment.value("metrics"), None);
        assert_eq!(segment.value("nope"), None);
    }

    #[test]
    fn entities_and_cdata() {
        let doc = decode(b"<track><name>Fish &amp; Chips</name><description><![CDATA[<3]]></description></track>").unwrap();
        let track = doc.child("track").unwrap();
        assert_eq!(track.value("name"), Some("Fish & Chips"));
        assert_eq!(track.value("description"), Some("<3"));
    }

    #[test]
    fn malformed_documents() {
        assert!(decode(b"<track><name>Day</nom></track>").is_err());
        assert!(decode(b"<track><name>Day</name>").is_err());
        assert!(decode(br#"<track name="Day></track>"#).is_err());
    }

    #[test]
    fn empty_document() {
        let doc = decode(b"").unwrap();
        assert!(doc.child("track").is_none());
    }
}
