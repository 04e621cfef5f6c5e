//! Content for requests with neither a template nor a default main layout.

use crate::environment::{RequestEnvironment, RequestKind};

const NOT_FOUND: &str = "<div class=\"codesite-404\"><h1>Page Not Found</h1>\
<p>The page you are looking for could not be found.</p></div>";

/// Renders the main region when nothing else is configured.
///
/// Closures `Fn(&RequestEnvironment) -> String` implement this trait.
pub trait DefaultContent: Send + Sync {
    fn render(&self, env: &RequestEnvironment) -> String;
}

impl<F> DefaultContent for F
where
    F: Fn(&RequestEnvironment) -> String + Send + Sync,
{
    fn render(&self, env: &RequestEnvironment) -> String {
        (self)(env)
    }
}

/// One article per loop post, or a not-found message.
///
/// The loop is `env.posts`; when it is empty the queried post stands in.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostLoop;

impl DefaultContent for PostLoop {
    fn render(&self, env: &RequestEnvironment) -> String {
        let posts: Vec<_> = if env.posts.is_empty() {
            env.post.iter().collect()
        } else {
            env.posts.iter().collect()
        };
        if posts.is_empty() {
            return match env.kind {
                RequestKind::NotFound => NOT_FOUND.to_string(),
                _ => String::new(),
            };
        }
        posts
            .into_iter()
            .map(|post| {
                format!(
                    "<article class=\"codesite-post\"><h1 class=\"codesite-post-title\">{}</h1>\
                     <div class=\"codesite-post-content\">{}</div></article>",
                    post.title, post.content
                )
            })
            .collect()
    }
}
