//! A mutable HTML document tree.
//!
//! [`Document`] wraps an [`RcDom`] produced by `html5ever` and exposes the
//! operations the renderer needs once repeater blocks are expanded: finding
//! elements by tag name, reading and writing attributes, and serializing the
//! result.

use std::rc::Rc;

use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{parse_document, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};
use mailmerge_core::error::{MergeError, MergeResult};

/// A parsed HTML document.
pub struct Document {
    dom: RcDom,
}

impl Document {
    /// Parses a complete HTML document.
    ///
    /// HTML parsing recovers from almost any malformed input. With `strict`
    /// set, any error the parser had to recover from is reported as a
    /// `TemplateSyntaxError` instead.
    pub fn parse(html: &str, strict: bool) -> MergeResult<Self> {
        let dom = parse_document(RcDom::default(), ParseOpts::default())
            .from_utf8()
            .read_from(&mut html.as_bytes())
            .map_err(|e| MergeError::TemplateSyntaxError(e.to_string()))?;

        if !dom.errors.is_empty() {
            if strict {
                return Err(MergeError::TemplateSyntaxError(dom.errors.join("; ")));
            }
            tracing::debug!(errors = dom.errors.len(), "recovered from HTML parse errors");
        }

        Ok(Self { dom })
    }

    /// Returns the document node.
    pub fn root(&self) -> &Handle {
        &self.dom.document
    }

    /// Serializes the whole document back to markup.
    pub fn to_html(&self) -> MergeResult<String> {
        serialize_children(&self.dom.document)
    }
}

/// Returns `true` if an element's local name matches `tag`, ignoring any
/// namespace prefix and ASCII case (`sg:repeater` matches `repeater`).
pub fn tag_matches(local: &str, tag: &str) -> bool {
    let unprefixed = local.rsplit_once(':').map_or(local, |(_, name)| name);
    unprefixed.eq_ignore_ascii_case(tag)
}

/// Finds every element below `root` whose tag matches `tag`, in document order.
///
/// The search does not descend into a matching element, so a match nested
/// inside another match is not returned separately.
pub fn find_elements(root: &Handle, tag: &str) -> Vec<Handle> {
    let mut found = Vec::new();
    collect_elements(root, tag, &mut found);
    found
}

fn collect_elements(node: &Handle, tag: &str, found: &mut Vec<Handle>) {
    for child in node.children.borrow().iter() {
        if let NodeData::Element { name, .. } = &child.data {
            if tag_matches(name.local.as_ref(), tag) {
                found.push(Rc::clone(child));
                continue;
            }
        }
        collect_elements(child, tag, found);
    }
}

/// Reads an attribute value. Attribute names compare ignoring ASCII case.
pub fn attribute(node: &Handle, name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| attr.name.local.as_ref().eq_ignore_ascii_case(name))
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// Overwrites an existing attribute value. Returns `false` if the node is not
/// an element or has no such attribute.
pub fn set_attribute(node: &Handle, name: &str, value: &str) -> bool {
    let NodeData::Element { attrs, .. } = &node.data else {
        return false;
    };
    let mut attrs = attrs.borrow_mut();
    match attrs
        .iter_mut()
        .find(|attr| attr.name.local.as_ref().eq_ignore_ascii_case(name))
    {
        Some(attr) => {
            attr.value = StrTendril::from_slice(value);
            true
        }
        None => false,
    }
}

fn serialize_children(node: &Handle) -> MergeResult<String> {
    let mut bytes = Vec::new();
    let serializable: SerializableHandle = Rc::clone(node).into();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::ChildrenOnly(None),
        ..SerializeOpts::default()
    };
    serialize(&mut bytes, &serializable, opts)
        .map_err(|e| MergeError::SerializationError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| MergeError::SerializationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_matches_ignores_prefix_and_case() {
        assert!(tag_matches("sg:repeater", "repeater"));
        assert!(tag_matches("repeater", "repeater"));
        assert!(tag_matches("x:y:repeater", "Repeater"));
        assert!(!tag_matches("sg:repeateritem", "repeater"));
        assert!(!tag_matches("repeater", "repeateritem"));
    }

    #[test]
    fn test_parse_and_serialize_roundtrip() {
        let html = "<!DOCTYPE html><html><head></head><body><p class=\"a\">Hi</p></body></html>";
        let doc = Document::parse(html, false).unwrap();
        assert_eq!(doc.to_html().unwrap(), html);
    }

    #[test]
    fn test_parse_wraps_bare_fragment() {
        let doc = Document::parse("<p>x</p>", false).unwrap();
        assert_eq!(
            doc.to_html().unwrap(),
            "<html><head></head><body><p>x</p></body></html>"
        );
    }

    #[test]
    fn test_strict_parse_rejects_recovered_errors() {
        let result = Document::parse("<p>unbalanced</div>", true);
        assert!(matches!(result, Err(MergeError::TemplateSyntaxError(_))));
    }

    #[test]
    fn test_strict_parse_accepts_clean_document() {
        let html = "<!DOCTYPE html><html><head><title>t</title></head><body><p>ok</p></body></html>";
        assert!(Document::parse(html, true).is_ok());
    }

    #[test]
    fn test_find_elements_document_order() {
        let doc = Document::parse(
            "<div><img src=\"a\"><p><img src=\"b\"></p></div><img src=\"c\">",
            false,
        )
        .unwrap();
        let images = find_elements(doc.root(), "img");
        let sources: Vec<_> = images
            .iter()
            .map(|img| attribute(img, "src").unwrap())
            .collect();
        assert_eq!(sources, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_find_elements_does_not_descend_into_match() {
        let doc = Document::parse("<div id=\"o\"><div id=\"i\"></div></div>", false).unwrap();
        let divs = find_elements(doc.root(), "div");
        assert_eq!(divs.len(), 1);
        assert_eq!(attribute(&divs[0], "id").as_deref(), Some("o"));
    }

    #[test]
    fn test_attribute_get_and_set() {
        let doc = Document::parse("<img src=\"old.png\" alt=\"x\">", false).unwrap();
        let img = find_elements(doc.root(), "img").remove(0);
        assert_eq!(attribute(&img, "SRC").as_deref(), Some("old.png"));
        assert_eq!(attribute(&img, "title"), None);

        assert!(set_attribute(&img, "src", "new.png"));
        assert!(!set_attribute(&img, "title", "t"));
        assert_eq!(attribute(&img, "src").as_deref(), Some("new.png"));
        assert!(doc.to_html().unwrap().contains("<img src=\"new.png\" alt=\"x\">"));
    }
}
