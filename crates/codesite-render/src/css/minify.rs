use super::{string_end, strip_comments};

/// Minifies CSS.
///
/// Comments are removed, whitespace runs collapse to one space, spaces
/// around `{ } : ; , > + ~` are dropped, and a `;` right before `}` goes
/// too. String literals are copied untouched. Inside parentheses the spaces
/// around `+` are kept so `calc(1px + 2px)` stays valid, and a space before
/// a `:` that starts a pseudo-class in a selector is kept so
/// `.a :hover` keeps its meaning.
///
/// ```
/// use codesite_render::css::minify;
///
/// assert_eq!(minify(".a {\n  color : red ;\n}\n/* x */"), ".a{color:red}");
/// assert_eq!(minify(".a{width: calc(1px + 2px)}"), ".a{width:calc(1px + 2px)}");
/// ```
pub fn minify(css: &str) -> String {
    let css = strip_comments(css);
    let bytes = css.as_bytes();
    let mut out = String::with_capacity(css.len());
    let mut pending_space = false;
    let mut after_punct = false;
    let mut parens = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'"' | b'\'' => {
                flush_space(&mut out, &mut pending_space, after_punct);
                let end = string_end(bytes, i);
                out.push_str(&css[i..end]);
                after_punct = false;
                i = end;
                continue;
            }
            b if b.is_ascii_whitespace() => pending_space = true,
            b'{' | b'}' | b':' | b';' | b',' | b'>' | b'+' | b'~' => {
                let keep_spaces = (b == b'+' && parens > 0)
                    || (b == b':' && pending_space && parens == 0 && starts_selector(bytes, i));
                if keep_spaces {
                    flush_space(&mut out, &mut pending_space, after_punct);
                    out.push(b as char);
                    after_punct = false;
                } else {
                    pending_space = false;
                    if b == b'}' && out.ends_with(';') {
                        out.pop();
                    }
                    out.push(b as char);
                    after_punct = true;
                }
            }
            _ => {
                flush_space(&mut out, &mut pending_space, after_punct);
                if b == b'(' {
                    parens += 1;
                } else if b == b')' {
                    parens = parens.saturating_sub(1);
                }
                // Copy the whole UTF-8 sequence.
                let len = utf8_len(b);
                out.push_str(&css[i..(i + len).min(bytes.len())]);
                after_punct = false;
                i += len;
                continue;
            }
        }
        i += 1;
    }
    out.trim().to_string()
}

fn flush_space(out: &mut String, pending: &mut bool, after_punct: bool) {
    if *pending && !after_punct && !out.is_empty() {
        out.push(' ');
    }
    *pending = false;
}

/// True when the next `{`, `;` or `}` after `at` is a `{`, meaning the colon
/// belongs to a selector or at-rule prelude rather than a declaration.
fn starts_selector(bytes: &[u8], at: usize) -> bool {
    let mut i = at + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = string_end(bytes, i);
                continue;
            }
            b'{' => return true,
            b';' | b'}' => return false,
            _ => {}
        }
        i += 1;
    }
    false
}

fn utf8_len(first: u8) -> usize {
    match first {
        0xF0..=0xFF => 4,
        0xE0..=0xEF => 3,
        0xC0..=0xDF => 2,
        _ => 1,
    }
}
