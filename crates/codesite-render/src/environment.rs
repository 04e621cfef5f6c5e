//! The request being rendered: what was queried, by whom, on which site.
//!
//! [`RequestEnvironment`] is plain data so it can be loaded from a fixture.
//! It feeds three consumers: the [`RequestClassifier`] that turns it into a
//! template type, the rule evaluator through [`Facts`], and the built-in
//! field resolvers of the dynamic-content engine.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use codesite_rules::{Facts, Value};

use crate::error::Result;

/// What kind of query the request is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    FrontPage,
    #[default]
    Home,
    /// A single post of any type other than `page`.
    Single,
    Page,
    Category,
    Tag,
    /// Archive of a custom post type.
    PostTypeArchive,
    Author,
    Date,
    Archive,
    Search,
    NotFound,
    /// Anything no template type exists for (feeds, embeds, ...).
    Other,
}

impl RequestKind {
    /// Single posts and pages.
    pub fn is_singular(self) -> bool {
        matches!(self, RequestKind::Single | RequestKind::Page)
    }
}

/// A taxonomy term attached to a post.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Term {
    pub slug: String,
    pub name: String,
    pub url: String,
}

/// A post author.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Author {
    pub login: String,
    pub display_name: String,
    pub avatar_url: String,
    pub bio: String,
}

/// A post as the renderer sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostRecord {
    pub id: u64,
    pub title: String,
    pub content: String,
    /// Hand-written excerpt; empty means "derive from content".
    pub excerpt: String,
    pub date: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub author: Author,
    pub thumbnail_url: String,
    pub categories: Vec<Term>,
    pub tags: Vec<Term>,
    pub url: String,
    pub post_type: String,
    pub status: String,
    pub comment_count: u64,
    /// Post format; `None` is the standard format.
    pub format: Option<String>,
    pub meta: BTreeMap<String, String>,
    /// Custom field values exposed as `{{acf:<name>}}`.
    pub custom_fields: BTreeMap<String, serde_json::Value>,
}

impl Default for PostRecord {
    fn default() -> Self {
        PostRecord {
            id: 0,
            title: String::new(),
            content: String::new(),
            excerpt: String::new(),
            date: None,
            modified: None,
            author: Author::default(),
            thumbnail_url: String::new(),
            categories: Vec::new(),
            tags: Vec::new(),
            url: String::new(),
            post_type: "post".to_string(),
            status: "publish".to_string(),
            comment_count: 0,
            format: None,
            meta: BTreeMap::new(),
            custom_fields: BTreeMap::new(),
        }
    }
}

impl PostRecord {
    fn category_slugs(&self) -> Vec<&str> {
        self.categories.iter().map(|t| t.slug.as_str()).collect()
    }

    fn tag_slugs(&self) -> Vec<&str> {
        self.tags.iter().map(|t| t.slug.as_str()).collect()
    }
}

/// The logged-in visitor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRecord {
    pub id: u64,
    pub login: String,
    pub display_name: String,
    pub email: String,
    pub avatar_url: String,
    pub bio: String,
    pub url: String,
    pub roles: Vec<String>,
}

/// Site identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteInfo {
    pub name: String,
    pub description: String,
    pub url: String,
    pub logo_url: String,
    pub admin_email: String,
    pub language: String,
    /// PHP-style date format used by `{{current_date}}` and the `date` filter.
    pub date_format: String,
}

impl Default for SiteInfo {
    fn default() -> Self {
        SiteInfo {
            name: String::new(),
            description: String::new(),
            url: String::new(),
            logo_url: String::new(),
            admin_email: String::new(),
            language: "en-US".to_string(),
            date_format: "F j, Y".to_string(),
        }
    }
}

/// Everything the pipeline knows about the current request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestEnvironment {
    pub kind: RequestKind,
    /// The queried post on singular requests.
    pub post: Option<PostRecord>,
    /// The main loop, for archives and the default content renderer.
    pub posts: Vec<PostRecord>,
    /// `None` for anonymous visitors.
    pub user: Option<UserRecord>,
    pub site: SiteInfo,
    /// Post type of a custom post type archive.
    pub archive_post_type: Option<String>,
    /// Rendered menu markup by location.
    pub menus: BTreeMap<String, String>,
    /// Rendered widget-area markup by sidebar id.
    pub widget_areas: BTreeMap<String, String>,
    pub now: DateTime<Utc>,
}

impl Default for RequestEnvironment {
    fn default() -> Self {
        RequestEnvironment {
            kind: RequestKind::default(),
            post: None,
            posts: Vec::new(),
            user: None,
            site: SiteInfo::default(),
            archive_post_type: None,
            menus: BTreeMap::new(),
            widget_areas: BTreeMap::new(),
            now: Utc::now(),
        }
    }
}

impl RequestEnvironment {
    /// Creates an environment for a request of the given kind.
    pub fn new(kind: RequestKind) -> Self {
        RequestEnvironment {
            kind,
            ..RequestEnvironment::default()
        }
    }

    /// Sets the queried post.
    pub fn with_post(mut self, post: PostRecord) -> Self {
        self.post = Some(post);
        self
    }

    /// Sets the logged-in user.
    pub fn with_user(mut self, user: UserRecord) -> Self {
        self.user = Some(user);
        self
    }

    /// Parses an environment from YAML (JSON is accepted too).
    pub fn from_yaml(source: &str) -> Result<Self> {
        if source.trim().is_empty() {
            return Ok(RequestEnvironment::default());
        }
        Ok(serde_yaml::from_str(source)?)
    }

    /// Returns `true` on singular requests. A front page that queries a post
    /// (a static front page) counts as singular.
    pub fn is_singular(&self) -> bool {
        match self.kind {
            RequestKind::FrontPage => self.post.is_some(),
            kind => kind.is_singular(),
        }
    }

    /// Id of the queried post, if any.
    pub fn post_id(&self) -> Option<u64> {
        self.post.as_ref().map(|p| p.id)
    }

    /// Finds a post by id among the queried post and the loop.
    pub fn find_post(&self, id: u64) -> Option<&PostRecord> {
        self.post
            .iter()
            .chain(self.posts.iter())
            .find(|post| post.id == id)
    }
}

impl Facts for RequestEnvironment {
    fn fact(&self, field: &str) -> Option<Value<'_>> {
        let post = self.post.as_ref();
        if let Some(key) = field.strip_prefix("meta:") {
            return Some(Value::Text(
                post.and_then(|p| p.meta.get(key)).map_or("", String::as_str),
            ));
        }
        let value = match field {
            "category" => Value::List(post.map(PostRecord::category_slugs).unwrap_or_default()),
            "tag" => Value::List(post.map(PostRecord::tag_slugs).unwrap_or_default()),
            "post_format" => Value::Text(
                post.and_then(|p| p.format.as_deref())
                    .filter(|f| !f.is_empty())
                    .unwrap_or("standard"),
            ),
            "author" => post
                .map(|p| Value::Text(&p.author.login))
                .unwrap_or(Value::None),
            "post_type" => post
                .map(|p| Value::Text(&p.post_type))
                .unwrap_or(Value::None),
            "logged_in" => Value::Bool(self.user.is_some()),
            "user_role" => match &self.user {
                Some(user) => Value::list(&user.roles),
                None => Value::List(Vec::new()),
            },
            _ => return None,
        };
        Some(value)
    }
}

/// Maps a request to the template type key templates are stored under.
pub trait RequestClassifier: Send + Sync {
    /// Returns the template type, or `None` when no template type applies.
    fn classify(&self, env: &RequestEnvironment) -> Option<String>;
}

/// Classifies by [`RequestKind`], the way the host's query flags do.
///
/// | kind | template type |
/// |------|---------------|
/// | front page | `front-page` |
/// | home | `home` |
/// | single `post` | `single-post` |
/// | page | `page` |
/// | single of another type | `single-<type>` |
/// | category / tag | `archive-category` / `archive-tag` |
/// | post type archive | `archive-<type>` |
/// | author / date | `archive-author` / `archive-date` |
/// | other archive | `archive` |
/// | search | `search` |
/// | not found | `404` |
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryClassifier;

impl RequestClassifier for QueryClassifier {
    fn classify(&self, env: &RequestEnvironment) -> Option<String> {
        let kind = match env.kind {
            RequestKind::FrontPage => "front-page".to_string(),
            RequestKind::Home => "home".to_string(),
            RequestKind::Single => {
                let post_type = env.post.as_ref().map_or("post", |p| p.post_type.as_str());
                format!("single-{}", post_type)
            }
            RequestKind::Page => "page".to_string(),
            RequestKind::Category => "archive-category".to_string(),
            RequestKind::Tag => "archive-tag".to_string(),
            RequestKind::PostTypeArchive => match env.archive_post_type.as_deref() {
                Some(post_type) => format!("archive-{}", post_type),
                None => "archive".to_string(),
            },
            RequestKind::Author => "archive-author".to_string(),
            RequestKind::Date => "archive-date".to_string(),
            RequestKind::Archive => "archive".to_string(),
            RequestKind::Search => "search".to_string(),
            RequestKind::NotFound => "404".to_string(),
            RequestKind::Other => return None,
        };
        Some(kind)
    }
}

impl<F> RequestClassifier for F
where
    F: Fn(&RequestEnvironment) -> Option<String> + Send + Sync,
{
    fn classify(&self, env: &RequestEnvironment) -> Option<String> {
        (self)(env)
    }
}
