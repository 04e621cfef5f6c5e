//! Selector scoping.
//!
//! Every selector is rewritten to live under a class, so `.title` inside block
//! 7 becomes `.codesite-block-7 .title`. The input is split into top-level
//! segments with a brace-depth scanner; plain rules are scoped, grouping
//! at-rules (`@media`, `@supports`, `@container`, `@layer`, `@document`) are
//! scoped recursively, and every other at-rule is copied through unchanged.

use super::{string_end, strip_comments};

/// At-rules whose bodies contain ordinary style rules.
const GROUPING_AT_RULES: &[&str] = &["media", "supports", "container", "layer", "document"];

/// A top-level piece of a stylesheet.
#[derive(Debug, PartialEq)]
enum Segment<'a> {
    /// Text up to and including a `}` that closes depth 1.
    Block(&'a str),
    /// Text up to and including a `;` at depth 0.
    Statement(&'a str),
    /// Trailing text whose block never closes.
    Unterminated(&'a str),
    /// Trailing text with no braces at all.
    Tail(&'a str),
}

fn segments(css: &str) -> Vec<Segment<'_>> {
    let bytes = css.as_bytes();
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = string_end(bytes, i);
                continue;
            }
            b'{' => depth += 1,
            b'}' if depth > 1 => depth -= 1,
            b'}' => {
                // A stray `}` at depth 0 ends a malformed segment too.
                depth = 0;
                out.push(Segment::Block(&css[start..=i]));
                start = i + 1;
            }
            b';' if depth == 0 => {
                out.push(Segment::Statement(&css[start..=i]));
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    let rest = &css[start..];
    if !rest.trim().is_empty() {
        out.push(if depth > 0 {
            Segment::Unterminated(rest)
        } else {
            Segment::Tail(rest)
        });
    }
    out
}

/// Scopes every selector in `css` under the class `prefix`.
///
/// A leading `.` on the prefix is optional. Comments are removed; rules are
/// emitted one per line as `selectors{body}`.
///
/// ```
/// use codesite_render::css::scope;
///
/// assert_eq!(scope(".a{color:red}", "p"), ".p .a{color:red}");
/// assert_eq!(scope(".a,.b{x:1}", "p"), ".p .a, .p .b{x:1}");
/// assert_eq!(scope(":root{--c:1}", "p"), ".p{--c:1}");
/// ```
pub fn scope(css: &str, prefix: &str) -> String {
    let prefix = prefix.trim().trim_start_matches('.');
    scope_stripped(&strip_comments(css), prefix)
}

fn scope_stripped(css: &str, prefix: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    for segment in segments(css) {
        let (text, closed) = match segment {
            Segment::Block(text) | Segment::Statement(text) => (text, true),
            Segment::Unterminated(text) | Segment::Tail(text) => (text, false),
        };
        let trimmed = text.trim();
        if trimmed.starts_with('@') {
            if let Some(emitted) = at_rule(trimmed, prefix, closed) {
                out.push(emitted);
            }
        } else if let Some(rule) = plain_rule(trimmed, prefix) {
            out.push(rule);
        }
    }
    out.join("\n")
}

fn at_rule(text: &str, prefix: &str, closed: bool) -> Option<String> {
    let Some(open) = text.find('{') else {
        // Statement form: @import, @charset, @layer a, b;
        return Some(text.to_string());
    };
    if !closed {
        return None;
    }
    if !is_grouping(text) {
        return Some(text.to_string());
    }
    let prelude = text[..open].trim();
    let body = text[open + 1..].strip_suffix('}').unwrap_or(&text[open + 1..]);
    let scoped = scope_stripped(body, prefix);
    if scoped.is_empty() {
        return None;
    }
    Some(format!("{}{{\n{}\n}}", prelude, scoped))
}

fn is_grouping(text: &str) -> bool {
    let name: String = text[1..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect::<String>()
        .to_ascii_lowercase();
    // Vendor prefixes: @-moz-document
    let name = match name.strip_prefix('-') {
        Some(rest) => rest.split_once('-').map_or(rest, |(_, n)| n).to_string(),
        None => name,
    };
    GROUPING_AT_RULES.contains(&name.as_str())
}

fn plain_rule(text: &str, prefix: &str) -> Option<String> {
    let (selectors, rest) = text.split_once('{')?;
    let body = rest.strip_suffix('}').unwrap_or(rest).trim();
    if body.is_empty() {
        return None;
    }
    let scoped = scope_selectors(selectors, prefix);
    if scoped.is_empty() {
        return None;
    }
    Some(format!("{}{{{}}}", scoped, body))
}

/// Scopes a comma-separated selector list.
///
/// Members starting with `@` or containing `%` are left alone, a leading
/// `:root` becomes the scope class itself, and everything else is prefixed
/// with `.prefix `. Commas nested in parentheses, brackets or strings do not
/// split the list.
///
/// ```
/// use codesite_render::css::scope_selectors;
///
/// assert_eq!(scope_selectors("a:is(.x, .y), :root .z", "p"), ".p a:is(.x, .y), .p .z");
/// ```
pub fn scope_selectors(selectors: &str, prefix: &str) -> String {
    let prefix = prefix.trim().trim_start_matches('.');
    split_selector_list(selectors)
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|selector| scope_one(selector, prefix))
        .collect::<Vec<_>>()
        .join(", ")
}

fn scope_one(selector: &str, prefix: &str) -> String {
    if selector.starts_with('@') || selector.contains('%') {
        selector.to_string()
    } else if let Some(rest) = selector.strip_prefix(":root") {
        format!(".{}{}", prefix, rest)
    } else {
        format!(".{} {}", prefix, selector)
    }
}

fn split_selector_list(selectors: &str) -> Vec<&str> {
    let bytes = selectors.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = string_end(bytes, i);
                continue;
            }
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                parts.push(&selectors[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(&selectors[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scopes_single_rule() {
        assert_eq!(scope(".a{color:red}", "p"), ".p .a{color:red}");
        assert_eq!(scope(".a { color: red; }", ".p"), ".p .a{color: red;}");
    }

    #[test]
    fn scopes_selector_lists() {
        assert_eq!(scope(".a,.b{x:1}", "p"), ".p .a, .p .b{x:1}");
        assert_eq!(scope(" h1 , , h2 {x:1}", "p"), ".p h1, .p h2{x:1}");
    }

    #[test]
    fn root_becomes_scope_class() {
        assert_eq!(scope(":root{--c:1}", "p"), ".p{--c:1}");
        assert_eq!(scope(":root .x{--c:1}", "p"), ".p .x{--c:1}");
    }

    #[test]
    fn percent_and_at_selectors_are_left_alone() {
        assert_eq!(scope_selectors("50%", "p"), "50%");
        assert_eq!(scope_selectors("@page", "p"), "@page");
    }

    #[test]
    fn multiple_rules_join_with_newlines() {
        assert_eq!(
            scope(".a{x:1}\n\n.b{y:2}", "p"),
            ".p .a{x:1}\n.p .b{y:2}"
        );
    }

    #[test]
    fn drops_malformed_and_empty_rules() {
        assert_eq!(scope("garbage", "p"), "");
        assert_eq!(scope(".a{}", "p"), "");
        assert_eq!(scope("{x:1}", "p"), "");
        assert_eq!(scope(".a{x:1} stray; .b{y:2}", "p"), ".p .a{x:1}\n.p .b{y:2}");
    }

    #[test]
    fn removes_comments() {
        assert_eq!(scope("/* hi */.a{/* c */x:1}", "p"), ".p .a{x:1}");
    }

    #[test]
    fn media_rules_are_scoped_recursively() {
        let css = "@media (max-width: 600px) { .a { x: 1 } .b { y: 2 } }";
        assert_eq!(
            scope(css, "p"),
            "@media (max-width: 600px){\n.p .a{x: 1}\n.p .b{y: 2}\n}"
        );
    }

    #[test]
    fn nested_grouping_rules() {
        let css = "@supports (display:grid){@media print{.a{x:1}}}";
        assert_eq!(
            scope(css, "p"),
            "@supports (display:grid){\n@media print{\n.p .a{x:1}\n}\n}"
        );
    }

    #[test]
    fn keyframes_pass_through_untouched() {
        let css = "@keyframes spin { from { transform: rotate(0) } 50% { opacity: .5 } to { transform: rotate(360deg) } }";
        assert_eq!(scope(css, "p"), css);
        let vendor = "@-webkit-keyframes fade{0%{opacity:0}100%{opacity:1}}";
        assert_eq!(scope(vendor, "p"), vendor);
    }

    #[test]
    fn keyframes_and_media_siblings() {
        let css = "@keyframes k{from{a:1}to{a:2}}\n@media screen{.x{b:1}}\n.y{c:1}";
        assert_eq!(
            scope(css, "p"),
            "@keyframes k{from{a:1}to{a:2}}\n@media screen{\n.p .x{b:1}\n}\n.p .y{c:1}"
        );
    }

    #[test]
    fn font_face_and_statements_pass_through() {
        let css = "@import url(\"a.css\");@font-face{font-family:X;src:url(x.woff)}.a{x:1}";
        assert_eq!(
            scope(css, "p"),
            "@import url(\"a.css\");\n@font-face{font-family:X;src:url(x.woff)}\n.p .a{x:1}"
        );
        assert_eq!(scope("@layer base, theme;", "p"), "@layer base, theme;");
    }

    #[test]
    fn layer_blocks_and_vendor_document_are_grouping() {
        assert_eq!(scope("@layer base{.a{x:1}}", "p"), "@layer base{\n.p .a{x:1}\n}");
        assert_eq!(
            scope("@-moz-document url-prefix(){.a{x:1}}", "p"),
            "@-moz-document url-prefix(){\n.p .a{x:1}\n}"
        );
    }

    #[test]
    fn unterminated_at_rule_is_dropped() {
        assert_eq!(scope(".a{x:1}@media print{.b{y:2}", "p"), ".p .a{x:1}");
    }

    #[test]
    fn braces_inside_strings_do_not_split() {
        assert_eq!(
            scope(r#".a::after{content:"}{"}"#, "p"),
            r#".p .a::after{content:"}{"}"#
        );
    }

    #[test]
    fn commas_inside_functions_do_not_split() {
        assert_eq!(
            scope(".a:not(.b, .c), [data-x=\"1,2\"]{x:1}", "p"),
            ".p .a:not(.b, .c), .p [data-x=\"1,2\"]{x:1}"
        );
    }
}
