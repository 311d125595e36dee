//! Locating elements in template source text.
//!
//! Repeater blocks are found and expanded in the raw template before it is
//! handed to the HTML parser. HTML tree construction moves table rows out of
//! unknown elements and closes paragraphs around block content, which would
//! separate a repeater from its items.
//!
//! The scanner only understands what it needs to pair start and end tags:
//! tag names, quoted attribute values, comments, and other `<!`/`<?`
//! constructs. Everything else is opaque text.

use std::ops::Range;

use crate::dom::tag_matches;

/// An element located in source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceElement<'a> {
    /// Byte range of the whole element, start tag through end tag.
    pub span: Range<usize>,
    /// The text between the start and end tags, exactly as written.
    pub content: &'a str,
    attributes: &'a str,
}

impl<'a> SourceElement<'a> {
    /// Reads an attribute of the start tag, without entity decoding.
    /// Attribute names compare ignoring ASCII case.
    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        find_attribute(self.attributes, name)
    }
}

#[derive(Debug, Clone, Copy)]
struct Tag<'a> {
    start: usize,
    end: usize,
    name: &'a str,
    closing: bool,
    self_closing: bool,
    attributes: &'a str,
}

/// Finds every element whose tag matches `tag`, in source order.
///
/// Matching ignores namespace prefixes and ASCII case, as
/// [`tag_matches`] does. Same-named elements nested inside a match are part
/// of its content and are not returned separately. An element that is never
/// closed runs to the end of the source; a stray end tag is ignored.
///
/// ```
/// use mailmerge_template::markup::find_elements;
///
/// let source = "<tbody><sg:repeater dataselection=\"p\"><tr></tr></sg:repeater></tbody>";
/// let blocks = find_elements(source, "repeater");
/// assert_eq!(blocks.len(), 1);
/// assert_eq!(blocks[0].content, "<tr></tr>");
/// assert_eq!(blocks[0].attribute("dataSelection"), Some("p"));
/// assert_eq!(&source[blocks[0].span.clone()], "<sg:repeater dataselection=\"p\"><tr></tr></sg:repeater>");
/// ```
pub fn find_elements<'a>(source: &'a str, tag: &str) -> Vec<SourceElement<'a>> {
    let mut found = Vec::new();
    let mut open: Option<Tag<'a>> = None;
    let mut depth = 0_usize;
    let mut pos = 0;

    while let Some(current) = next_tag(source, pos) {
        pos = current.end;
        if !tag_matches(current.name, tag) {
            continue;
        }

        if current.closing {
            if depth == 0 {
                continue;
            }
            depth -= 1;
            if depth == 0 {
                if let Some(start) = open.take() {
                    found.push(SourceElement {
                        span: start.start..current.end,
                        content: &source[start.end..current.start],
                        attributes: start.attributes,
                    });
                }
            }
        } else if current.self_closing {
            if depth == 0 {
                found.push(SourceElement {
                    span: current.start..current.end,
                    content: "",
                    attributes: current.attributes,
                });
            }
        } else {
            if depth == 0 {
                open = Some(current);
            }
            depth += 1;
        }
    }

    if let Some(start) = open {
        found.push(SourceElement {
            span: start.start..source.len(),
            content: &source[start.end..],
            attributes: start.attributes,
        });
    }

    found
}

/// Replaces each span with the matching replacement text. Spans must be in
/// source order and must not overlap.
pub fn splice<S: AsRef<str>>(source: &str, edits: &[(Range<usize>, S)]) -> String {
    let mut output = String::with_capacity(source.len());
    let mut cursor = 0;
    for (span, replacement) in edits {
        output.push_str(&source[cursor..span.start]);
        output.push_str(replacement.as_ref());
        cursor = span.end;
    }
    output.push_str(&source[cursor..]);
    output
}

fn next_tag(source: &str, from: usize) -> Option<Tag<'_>> {
    let mut pos = from;
    loop {
        let start = pos + source.get(pos..)?.find('<')?;
        let rest = &source[start..];

        if rest.starts_with("<!--") {
            pos = start + 4 + rest[4..].find("-->")? + 3;
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            pos = start + rest.find('>')? + 1;
            continue;
        }

        let (closing, name_start) = if rest.starts_with("</") {
            (true, start + 2)
        } else {
            (false, start + 1)
        };
        if !source[name_start..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
        {
            pos = start + 1;
            continue;
        }

        let after_name = &source[name_start..];
        let name_len = after_name
            .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
            .unwrap_or(after_name.len());
        let attributes_start = name_start + name_len;
        let close = tag_close(&source[attributes_start..])?;
        let attributes = &source[attributes_start..attributes_start + close];

        return Some(Tag {
            start,
            end: attributes_start + close + 1,
            name: &after_name[..name_len],
            closing,
            self_closing: attributes.trim_end().ends_with('/'),
            attributes,
        });
    }
}

/// Offset of the `>` that ends a tag, skipping quoted attribute values.
fn tag_close(text: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (None, '>') => return Some(i),
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), _) if q == c => quote = None,
            _ => {}
        }
    }
    None
}

fn find_attribute<'a>(attributes: &'a str, name: &str) -> Option<&'a str> {
    let mut rest = attributes;
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '/');
        if rest.is_empty() {
            return None;
        }

        let name_len = rest
            .find(|c: char| c.is_whitespace() || c == '=' || c == '/')
            .unwrap_or(rest.len());
        let attr_name = &rest[..name_len];
        rest = rest[name_len..].trim_start();

        let value = match rest.strip_prefix('=') {
            Some(after_eq) => {
                let after_eq = after_eq.trim_start();
                let (value, remaining) = match after_eq.chars().next() {
                    Some(q @ ('"' | '\'')) => {
                        let quoted = &after_eq[1..];
                        quoted
                            .find(q)
                            .map_or((quoted, ""), |i| (&quoted[..i], &quoted[i + 1..]))
                    }
                    _ => {
                        let end = after_eq.find(char::is_whitespace).unwrap_or(after_eq.len());
                        after_eq.split_at(end)
                    }
                };
                rest = remaining;
                value
            }
            None => "",
        };

        if !attr_name.is_empty() && attr_name.eq_ignore_ascii_case(name) {
            return Some(value);
        }
    }
}
