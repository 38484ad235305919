//! Streaming XML → canonical tree conversion.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, trace, warn};

use crate::error::ParseError;
use crate::models::canonical::{CanonicalValue, Field, ATTRIBUTES_KEY, TEXT_KEY};

use super::Result;

/// Remove a namespace qualifier from an element or attribute name.
///
/// Handles both Clark notation (`{uri}local`) and prefixed names
/// (`prefix:local`).
pub fn strip_namespace(name: &str) -> &str {
    let name = name.rsplit_once('}').map_or(name, |(_, local)| local);
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

/// Canonicalize an XML document, starting from its root element.
pub fn canonicalize(xml: &str) -> Result<CanonicalValue> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<CanonicalValue> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                if stack.is_empty() && root.is_some() {
                    return Err(ParseError::MultipleRoots);
                }
                stack.push(Frame::open(&start)?);
            }
            Event::Empty(start) => {
                if stack.is_empty() && root.is_some() {
                    return Err(ParseError::MultipleRoots);
                }
                let frame = Frame::open(&start)?;
                close(frame, &mut stack, &mut root);
            }
            Event::End(_) => {
                // The reader already verified the end tag matches the open element.
                if let Some(frame) = stack.pop() {
                    close(frame, &mut stack, &mut root);
                }
            }
            Event::Text(text) => {
                let text = text.unescape()?;
                push_text(&mut stack, &text)?;
            }
            Event::CData(data) => {
                let data = data.into_inner();
                push_text(&mut stack, &String::from_utf8_lossy(&data))?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(frame) = stack.pop() {
        return Err(ParseError::UnclosedElement(frame.name));
    }

    let root = root.ok_or(ParseError::NoRootElement)?;
    debug!("Canonicalized document with {} top-level fields", root.fields().len());
    Ok(root)
}

fn push_text(stack: &mut [Frame], text: &str) -> Result<()> {
    match stack.last_mut() {
        Some(frame) => frame.push_text(text),
        None if !text.trim().is_empty() => return Err(ParseError::TextOutsideRoot),
        None => {}
    }
    Ok(())
}

/// Finish an element and hand its value to the parent, or make it the root.
fn close(frame: Frame, stack: &mut [Frame], root: &mut Option<CanonicalValue>) {
    let (name, value) = frame.finish();
    match stack.last_mut() {
        Some(parent) => parent.push_child(name, value),
        None => *root = Some(value),
    }
}

/// An element whose end tag has not been read yet.
struct Frame {
    name: String,
    fields: Vec<(String, Field)>,
    attributes: Vec<(String, Field)>,
    text: String,
    has_children: bool,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self> {
        let raw_name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes: Vec<(String, Field)> = Vec::new();

        for attr in start.attributes() {
            let attr = attr?;
            // Namespace declarations are not attributes of the document.
            if attr.key.as_namespace_binding().is_some() {
                continue;
            }

            let key = String::from_utf8_lossy(attr.key.as_ref());
            let key = strip_namespace(&key).to_string();
            let value = CanonicalValue::Leaf(attr.unescape_value()?.into_owned());

            // Two prefixed attributes can share a local name; the later one wins.
            match attributes.iter_mut().find(|(k, _)| *k == key) {
                Some((_, existing)) => *existing = Field::Single(value),
                None => attributes.push((key, Field::Single(value))),
            }
        }

        Ok(Self {
            name: strip_namespace(&raw_name).to_string(),
            fields: Vec::new(),
            attributes,
            text: String::new(),
            has_children: false,
        })
    }

    /// Only text before the first child element belongs to this element.
    fn push_text(&mut self, text: &str) {
        if !self.has_children {
            self.text.push_str(text);
        }
    }

    fn push_child(&mut self, name: String, value: CanonicalValue) {
        self.has_children = true;
        match self.fields.iter_mut().find(|(key, _)| *key == name) {
            Some((_, field)) => field.push(value),
            None => self.fields.push((name, Field::Single(value))),
        }
    }

    fn finish(self) -> (String, CanonicalValue) {
        let Frame {
            name,
            mut fields,
            attributes,
            text,
            ..
        } = self;

        if !attributes.is_empty() {
            insert_reserved(&mut fields, &name, ATTRIBUTES_KEY, CanonicalValue::Node(attributes));
        }

        let text = text.trim();
        if !text.is_empty() {
            if fields.is_empty() {
                trace!("<{}> collapsed to leaf", name);
                return (name, CanonicalValue::Leaf(text.to_string()));
            }
            insert_reserved(&mut fields, &name, TEXT_KEY, CanonicalValue::Leaf(text.to_string()));
        }

        if fields.is_empty() {
            (name, CanonicalValue::Absent)
        } else {
            (name, CanonicalValue::Node(fields))
        }
    }
}

/// Insert a reserved key; a child element already stored under it is dropped.
fn insert_reserved(
    fields: &mut Vec<(String, Field)>,
    element: &str,
    key: &str,
    value: CanonicalValue,
) {
    if let Some(pos) = fields.iter().position(|(k, _)| k == key) {
        warn!("<{}> has a child element named {}, replaced by the reserved field", element, key);
        fields.remove(pos);
    }
    fields.push((key.to_string(), Field::Single(value)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn leaf(text: &str) -> CanonicalValue {
        CanonicalValue::Leaf(text.to_string())
    }

    fn single(name: &str, value: CanonicalValue) -> (String, Field) {
        (name.to_string(), Field::Single(value))
    }

    #[test]
    fn test_strip_namespace() {
        assert_eq!(strip_namespace("{http://www.portalfiscal.inf.br/nfe}infNFe"), "infNFe");
        assert_eq!(strip_namespace("nfe:infNFe"), "infNFe");
        assert_eq!(strip_namespace("infNFe"), "infNFe");
        assert_eq!(strip_namespace("{urn:a}{urn:b}x"), "x");
    }

    #[test]
    fn test_empty_element_is_absent() {
        assert_eq!(canonicalize("<a></a>").unwrap(), CanonicalValue::Absent);
        assert_eq!(canonicalize("<a/>").unwrap(), CanonicalValue::Absent);
        assert_eq!(canonicalize("<a>  \n\t </a>").unwrap(), CanonicalValue::Absent);
    }

    #[test]
    fn test_text_only_element_is_leaf() {
        assert_eq!(canonicalize("<CFOP> 6101 </CFOP>").unwrap(), leaf("6101"));
    }

    #[test]
    fn test_repeated_children_become_list() {
        let tree = canonicalize("<r><det>1</det><det>2</det></r>").unwrap();
        assert_eq!(
            tree,
            CanonicalValue::Node(vec![(
                "det".to_string(),
                Field::Repeated(vec![leaf("1"), leaf("2")]),
            )])
        );
    }

    #[test]
    fn test_repeat_merges_by_name_only() {
        let tree = canonicalize(
            r#"<r><det nItem="1"><prod>a</prod></det><x/><det>b</det><det/></r>"#,
        )
        .unwrap();

        let det = tree.get("det").unwrap();
        assert_eq!(det.values().len(), 3);
        assert_eq!(det.values()[1], leaf("b"));
        assert_eq!(det.values()[2], CanonicalValue::Absent);
        assert_eq!(tree.fields()[1].0, "x");
    }

    #[test]
    fn test_attributes_follow_children() {
        let tree = canonicalize(r#"<infNFe Id="NFe123" versao="4.00"><ide/></infNFe>"#).unwrap();
        assert_eq!(
            tree,
            CanonicalValue::Node(vec![
                single("ide", CanonicalValue::Absent),
                single(
                    ATTRIBUTES_KEY,
                    CanonicalValue::Node(vec![single("Id", leaf("NFe123")), single("versao", leaf("4.00"))]),
                ),
            ])
        );
    }

    #[test]
    fn test_namespaces_are_stripped() {
        let xml = r#"<nfe:NFe xmlns:nfe="http://www.portalfiscal.inf.br/nfe" xmlns:xsi="urn:x">
            <nfe:infNFe xsi:Id="A"><nfe:nNF>10</nfe:nNF></nfe:infNFe>
        </nfe:NFe>"#;
        let tree = canonicalize(xml).unwrap();

        // xmlns declarations do not make the root a node of its own
        assert_eq!(tree.fields().len(), 1);
        let inf = tree.get("infNFe").unwrap().single().unwrap();
        assert_eq!(inf.get("nNF").unwrap().single(), Some(&leaf("10")));
        let attrs = inf.get(ATTRIBUTES_KEY).unwrap().single().unwrap();
        assert_eq!(attrs.get("Id").unwrap().single(), Some(&leaf("A")));
    }

    #[test]
    fn test_text_alongside_structure() {
        let tree = canonicalize(r#"<a unit="kg"> 12 </a>"#).unwrap();
        assert_eq!(
            tree,
            CanonicalValue::Node(vec![
                single(ATTRIBUTES_KEY, CanonicalValue::Node(vec![single("unit", leaf("kg"))])),
                single(TEXT_KEY, leaf("12")),
            ])
        );

        // text after the first child is that child's tail and is not kept
        let tree = canonicalize("<a>head<b>1</b>tail</a>").unwrap();
        assert_eq!(
            tree,
            CanonicalValue::Node(vec![single("b", leaf("1")), single(TEXT_KEY, leaf("head"))])
        );
    }

    #[test]
    fn test_reserved_text_replaces_colliding_child() {
        let tree = canonicalize("<a>t<#text>3</#text></a>").unwrap();
        assert_eq!(tree, CanonicalValue::Node(vec![single(TEXT_KEY, leaf("t"))]));
    }

    #[test]
    fn test_reserved_attributes_replace_colliding_child() {
        let mut fields = vec![
            single(ATTRIBUTES_KEY, leaf("child")),
            single("b", leaf("1")),
        ];
        let attributes = CanonicalValue::Node(vec![single("x", leaf("1"))]);
        insert_reserved(&mut fields, "a", ATTRIBUTES_KEY, attributes.clone());

        assert_eq!(fields, vec![single("b", leaf("1")), single(ATTRIBUTES_KEY, attributes)]);
        assert_eq!(fields.iter().filter(|(k, _)| k == ATTRIBUTES_KEY).count(), 1);
    }

    #[test]
    fn test_escapes_and_cdata() {
        assert_eq!(canonicalize("<a>R&amp;D</a>").unwrap(), leaf("R&D"));
        assert_eq!(canonicalize("<a><![CDATA[1 < 2]]></a>").unwrap(), leaf("1 < 2"));
        assert_eq!(canonicalize(r#"<a b="x &amp; y"/>"#).unwrap().fields().len(), 1);
    }

    #[test]
    fn test_prolog_and_comments_ignored() {
        let xml = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!-- note -->\n<a><!-- c --><b>1</b></a>\n";
        assert_eq!(
            canonicalize(xml).unwrap(),
            CanonicalValue::Node(vec![single("b", leaf("1"))])
        );
    }

    #[test]
    fn test_deterministic() {
        let xml = r#"<r a="1"><x>1</x><y><z/><z>2</z></y><x>3</x></r>"#;
        assert_eq!(canonicalize(xml).unwrap(), canonicalize(xml).unwrap());
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(canonicalize("<a><b></a>"), Err(ParseError::Xml(_))));
        assert!(canonicalize("<a><b>1</b>").is_err());
        assert!(matches!(canonicalize(""), Err(ParseError::NoRootElement)));
        assert!(matches!(canonicalize("<a/><b/>"), Err(ParseError::MultipleRoots)));
        assert!(matches!(canonicalize("hello"), Err(ParseError::TextOutsideRoot)));
        assert!(canonicalize("<a>&bogus;</a>").is_err());
    }
}
