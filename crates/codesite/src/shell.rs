//! The HTML document a full-page render is placed in.

use codesite_render::dynamic::escape_html;
use codesite_render::{RenderedPage, RequestEnvironment};

/// Wraps a rendered page in a minimal document.
///
/// Head CSS goes before `</head>` and footer JS before `</body>`; both are
/// rendered before the shell is assembled, so the body has already filled
/// the collections.
pub fn page(rendered: &RenderedPage, env: &RequestEnvironment) -> String {
    let mut doc = String::with_capacity(rendered.html.len() + rendered.css.len() + 256);
    doc.push_str("<!DOCTYPE html>\n");
    doc.push_str(&format!(
        "<html lang=\"{}\">\n",
        escape_html(&env.site.language)
    ));
    doc.push_str("<head>\n<meta charset=\"utf-8\">\n");
    doc.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    doc.push_str(&format!("<title>{}</title>\n", escape_html(&title(env))));
    push_section(&mut doc, &rendered.css);
    doc.push_str("</head>\n<body>\n");
    push_section(&mut doc, &rendered.html);
    push_section(&mut doc, &rendered.js);
    doc.push_str("</body>\n</html>\n");
    doc
}

fn push_section(doc: &mut String, markup: &str) {
    let markup = markup.trim_end();
    if !markup.is_empty() {
        doc.push_str(markup);
        doc.push('\n');
    }
}

fn title(env: &RequestEnvironment) -> String {
    match (&env.post, env.is_singular()) {
        (Some(post), true) if !post.title.is_empty() => {
            if env.site.name.is_empty() {
                post.title.clone()
            } else {
                format!("{} - {}", post.title, env.site.name)
            }
        }
        _ => env.site.name.clone(),
    }
}
