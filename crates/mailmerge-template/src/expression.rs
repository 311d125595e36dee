//! Expression markers and their evaluation.
//!
//! Template text may embed expressions between `[%` and `%]`. Two call forms
//! are recognized:
//!
//! - `itemValue('field')`: the value of `field` in the current row;
//! - `resource('path')`: the base URL followed by `path`.
//!
//! Any other expression body evaluates to the empty string. Text outside
//! markers is copied through unchanged, and substituted values are never
//! scanned again.

use crate::dataset::Row;

/// Opening marker of an expression.
pub const START_MARKER: &str = "[%";
/// Closing marker of an expression.
pub const END_MARKER: &str = "%]";

const ITEM_VALUE_PREFIX: &str = "itemValue('";
const RESOURCE_PREFIX: &str = "resource('";
const CALL_SUFFIX: &str = "')";

/// A piece of scanned template text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Literal text, copied verbatim. An unterminated `[%` and everything
    /// after it ends up here too.
    Text(&'a str),
    /// The body between a `[%` and the next `%]`, markers excluded.
    Expression(&'a str),
}

/// A recognized function call inside an expression body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call<'a> {
    /// `itemValue('field')`
    ItemValue(&'a str),
    /// `resource('path')`
    Resource(&'a str),
}

impl<'a> Call<'a> {
    /// Parses an expression body into a call.
    ///
    /// Surrounding whitespace is ignored, but the call itself must make up the
    /// whole body. The quoted argument may not contain a single quote.
    ///
    /// ```
    /// use mailmerge_template::expression::Call;
    ///
    /// assert_eq!(Call::parse(" itemValue('name') "), Some(Call::ItemValue("name")));
    /// assert_eq!(Call::parse("resource('/a.png')"), Some(Call::Resource("/a.png")));
    /// assert_eq!(Call::parse("x itemValue('name')"), None);
    /// ```
    pub fn parse(body: &'a str) -> Option<Self> {
        let body = body.trim();
        if let Some(field) = quoted_argument(body, ITEM_VALUE_PREFIX) {
            return Some(Self::ItemValue(field));
        }
        quoted_argument(body, RESOURCE_PREFIX).map(Self::Resource)
    }

    /// Evaluates the call against a base URL and an optional row.
    pub fn evaluate(self, base_url: &str, row: Option<&Row>) -> String {
        match self {
            Self::ItemValue(field) => row.and_then(|r| r.text(field)).unwrap_or_default(),
            Self::Resource(path) => format!("{base_url}{path}"),
        }
    }
}

fn quoted_argument<'a>(body: &'a str, prefix: &str) -> Option<&'a str> {
    body.strip_prefix(prefix)
        .and_then(|rest| rest.strip_suffix(CALL_SUFFIX))
        .filter(|arg| !arg.contains('\''))
}

/// Splits text into literal and expression segments.
///
/// ```
/// use mailmerge_template::expression::{tokenize, Segment};
///
/// assert_eq!(
///     tokenize("a [% b %] c [% d"),
///     vec![
///         Segment::Text("a "),
///         Segment::Expression(" b "),
///         Segment::Text(" c "),
///         Segment::Text("[% d"),
///     ]
/// );
/// ```
pub fn tokenize(content: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut remaining = content;

    while !remaining.is_empty() {
        let Some(start) = remaining.find(START_MARKER) else {
            segments.push(Segment::Text(remaining));
            break;
        };

        let after_open = &remaining[start + START_MARKER.len()..];
        let Some(end) = after_open.find(END_MARKER) else {
            // Unterminated marker: pass the rest through untouched.
            if start > 0 {
                segments.push(Segment::Text(&remaining[..start]));
            }
            segments.push(Segment::Text(&remaining[start..]));
            break;
        };

        if start > 0 {
            segments.push(Segment::Text(&remaining[..start]));
        }
        segments.push(Segment::Expression(&after_open[..end]));
        remaining = &after_open[end + END_MARKER.len()..];
    }

    segments
}

/// Evaluates a single expression body. Unrecognized bodies yield `""`.
pub fn evaluate(body: &str, base_url: &str, row: Option<&Row>) -> String {
    Call::parse(body).map_or_else(String::new, |call| call.evaluate(base_url, row))
}

/// Replaces every `[% ... %]` marker in `content` with its evaluated result.
///
/// # Examples
///
/// ```
/// use mailmerge_template::dataset::Row;
/// use mailmerge_template::expression::render_expressions;
///
/// let row = Row::new().with("name", "Ann");
/// assert_eq!(
///     render_expressions("Hi [% itemValue('name') %]!", "", Some(&row)),
///     "Hi Ann!"
/// );
/// assert_eq!(
///     render_expressions("[% resource('/logo.png') %]", "https://cdn.example.com", None),
///     "https://cdn.example.com/logo.png"
/// );
/// ```
pub fn render_expressions(content: &str, base_url: &str, row: Option<&Row>) -> String {
    if !content.contains(START_MARKER) {
        return content.to_string();
    }

    let mut output = String::with_capacity(content.len());
    for segment in tokenize(content) {
        match segment {
            Segment::Text(text) => output.push_str(text),
            Segment::Expression(body) => output.push_str(&evaluate(body, base_url, row)),
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Value;

    fn ann() -> Row {
        Row::new().with("name", "Ann").with("score", 9.5).with("vip", true)
    }

    // ── Scanning ────────────────────────────────────────────────────

    #[test]
    fn test_tokenize_plain_text() {
        assert_eq!(tokenize("Hello world"), vec![Segment::Text("Hello world")]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_tokenize_adjacent_expressions() {
        assert_eq!(
            tokenize("[%a%][%b%]"),
            vec![Segment::Expression("a"), Segment::Expression("b")]
        );
    }

    #[test]
    fn test_tokenize_end_marker_must_follow_start() {
        // "%]" before the first "[%" is literal text.
        assert_eq!(
            tokenize("%] x [%y%]"),
            vec![Segment::Text("%] x "), Segment::Expression("y")]
        );
        // "[%]" does not close itself.
        assert_eq!(tokenize("[%]"), vec![Segment::Text("[%]")]);
    }

    #[test]
    fn test_tokenize_unterminated_after_expression() {
        assert_eq!(
            tokenize("[%a%] tail [% open"),
            vec![
                Segment::Expression("a"),
                Segment::Text(" tail "),
                Segment::Text("[% open"),
            ]
        );
    }

    // ── Call parsing ────────────────────────────────────────────────

    #[test]
    fn test_call_parse_whole_body_only() {
        assert_eq!(Call::parse("itemValue('a')"), Some(Call::ItemValue("a")));
        assert_eq!(Call::parse("itemValue('a') extra"), None);
        assert_eq!(Call::parse("myitemValue('a')"), None);
        assert_eq!(Call::parse("itemValue(\"a\")"), None);
        assert_eq!(Call::parse("itemValue('a'b')"), None);
        assert_eq!(Call::parse("itemValue(')"), None);
        assert_eq!(Call::parse("unknown('a')"), None);
        assert_eq!(Call::parse(""), None);
    }

    #[test]
    fn test_call_parse_resource() {
        assert_eq!(
            Call::parse("\tresource('img/a b.png')\n"),
            Some(Call::Resource("img/a b.png"))
        );
        assert_eq!(Call::parse("resource('')"), Some(Call::Resource("")));
    }

    // ── Rendering ───────────────────────────────────────────────────

    #[test]
    fn test_no_markers_unchanged() {
        let text = "<p>Plain & simple % text [ with brackets ]</p>";
        assert_eq!(render_expressions(text, "https://x", Some(&ann())), text);
        assert_eq!(render_expressions("", "https://x", None), "");
    }

    #[test]
    fn test_unterminated_marker_passes_through() {
        assert_eq!(render_expressions("a [% b", "https://x", None), "a [% b");
        assert_eq!(
            render_expressions("[% itemValue('name') %] [% b", "", Some(&ann())),
            "Ann [% b"
        );
    }

    #[test]
    fn test_item_value_substitution() {
        assert_eq!(
            render_expressions("Hi [% itemValue('name') %]!", "", Some(&ann())),
            "Hi Ann!"
        );
    }

    #[test]
    fn test_item_value_scalars() {
        let row = ann();
        assert_eq!(render_expressions("[%itemValue('score')%]", "", Some(&row)), "9.5");
        assert_eq!(render_expressions("[%itemValue('vip')%]", "", Some(&row)), "true");
    }

    #[test]
    fn test_missing_field_yields_empty() {
        assert_eq!(
            render_expressions("[% itemValue('age') %]", "", Some(&ann())),
            ""
        );
    }

    #[test]
    fn test_null_field_yields_empty() {
        let row = Row::new().with("age", Value::Null);
        assert_eq!(render_expressions("<[% itemValue('age') %]>", "", Some(&row)), "<>");
    }

    #[test]
    fn test_item_value_without_row() {
        assert_eq!(render_expressions("[% itemValue('name') %]", "u", None), "");
    }

    #[test]
    fn test_resource_resolution() {
        assert_eq!(
            render_expressions(
                "[% resource('/logo.png') %]",
                "https://cdn.example.com",
                None
            ),
            "https://cdn.example.com/logo.png"
        );
    }

    #[test]
    fn test_resource_is_verbatim_concatenation() {
        assert_eq!(
            render_expressions("[% resource('logo.png') %]", "https://cdn/", None),
            "https://cdn/logo.png"
        );
        assert_eq!(
            render_expressions("[% resource('//x') %]", "https://cdn/", None),
            "https://cdn///x"
        );
        assert_eq!(render_expressions("[% resource('/a') %]", "", None), "/a");
    }

    #[test]
    fn test_unrecognized_expression_dropped() {
        assert_eq!(
            render_expressions("a[% upper('x') %]b[% 1 + 2 %]c", "", Some(&ann())),
            "abc"
        );
    }

    #[test]
    fn test_substituted_values_not_rescanned() {
        let row = Row::new().with("tricky", "[% itemValue('tricky') %]");
        assert_eq!(
            render_expressions("[% itemValue('tricky') %]", "", Some(&row)),
            "[% itemValue('tricky') %]"
        );
    }

    #[test]
    fn test_multiple_expressions_in_order() {
        let row = Row::new().with("first", "Ann").with("last", "Lee");
        assert_eq!(
            render_expressions(
                "<a href=\"[% resource('/u') %]\">[% itemValue('first') %] [% itemValue('last') %]</a>",
                "https://x",
                Some(&row)
            ),
            "<a href=\"https://x/u\">Ann Lee</a>"
        );
    }

    #[test]
    fn test_multibyte_text_around_markers() {
        let row = Row::new().with("city", "Zürich");
        assert_eq!(
            render_expressions("→ [% itemValue('city') %] ←", "", Some(&row)),
            "→ Zürich ←"
        );
    }
}
