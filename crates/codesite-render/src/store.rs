//! Entity storage.
//!
//! The pipeline only reads entities, by id or by template type. Persistence
//! lives elsewhere; [`MemoryStore`] is the in-process implementation used by
//! the CLI and the tests, loaded from a YAML or JSON site fixture:
//!
//! ```yaml
//! settings:
//!   theme_override: true
//! blocks:
//!   - id: 7
//!     html: '<div class="box">{{post_title}}</div>'
//!     css: '.box{color:blue}'
//! templates:
//!   - id: 1
//!     template_type: single-post
//!     content_blocks: [7]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::model::{Block, Layout, Override, Template};
use crate::settings::Settings;

/// Read access to stored entities.
pub trait EntityStore {
    /// Returns the block with `id`, whatever its status.
    fn block(&self, id: u64) -> Option<Block>;

    /// Returns the layout with `id`, whatever its status.
    fn layout(&self, id: u64) -> Option<Layout>;

    /// Returns the active templates of one type, ordered by priority then id.
    fn templates_by_type(&self, template_type: &str) -> Vec<Template>;

    /// Returns the override for a post, if one exists.
    fn override_for(&self, post_id: u64) -> Option<Override>;

    /// Returns the current settings.
    fn settings(&self) -> Settings;
}

impl<S: EntityStore + ?Sized> EntityStore for &S {
    fn block(&self, id: u64) -> Option<Block> {
        (**self).block(id)
    }

    fn layout(&self, id: u64) -> Option<Layout> {
        (**self).layout(id)
    }

    fn templates_by_type(&self, template_type: &str) -> Vec<Template> {
        (**self).templates_by_type(template_type)
    }

    fn override_for(&self, post_id: u64) -> Option<Override> {
        (**self).override_for(post_id)
    }

    fn settings(&self) -> Settings {
        (**self).settings()
    }
}

/// On-disk shape of a site: settings plus every entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteFixture {
    pub settings: Settings,
    pub blocks: Vec<Block>,
    pub layouts: Vec<Layout>,
    pub templates: Vec<Template>,
    pub overrides: Vec<Override>,
}

/// An [`EntityStore`] held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    settings: Settings,
    blocks: BTreeMap<u64, Block>,
    layouts: BTreeMap<u64, Layout>,
    templates: BTreeMap<u64, Template>,
    overrides: BTreeMap<u64, Override>,
}

impl MemoryStore {
    /// Creates an empty store with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a decoded fixture.
    pub fn from_fixture(fixture: SiteFixture) -> Self {
        let mut store = MemoryStore::new().with_settings(fixture.settings);
        for block in fixture.blocks {
            store.insert_block(block);
        }
        for layout in fixture.layouts {
            store.insert_layout(layout);
        }
        for template in fixture.templates {
            store.insert_template(template);
        }
        for ov in fixture.overrides {
            store.insert_override(ov);
        }
        store
    }

    /// Parses a fixture from YAML (JSON is accepted too).
    pub fn from_yaml(source: &str) -> Result<Self> {
        let fixture: SiteFixture = if source.trim().is_empty() {
            SiteFixture::default()
        } else {
            serde_yaml::from_str(source)?
        };
        Ok(Self::from_fixture(fixture))
    }

    /// Reads and parses a fixture file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading site fixture");
        let source = std::fs::read_to_string(path)?;
        Self::from_yaml(&source)
    }

    /// Replaces the settings.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Returns a mutable reference to the settings.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Inserts or replaces a block.
    pub fn insert_block(&mut self, block: Block) {
        self.blocks.insert(block.id, block);
    }

    /// Inserts or replaces a layout.
    pub fn insert_layout(&mut self, layout: Layout) {
        self.layouts.insert(layout.id, layout);
    }

    /// Inserts or replaces a template.
    pub fn insert_template(&mut self, template: Template) {
        self.templates.insert(template.id, template);
    }

    /// Inserts an override, replacing any existing one for the same post.
    pub fn insert_override(&mut self, ov: Override) {
        if let Some(previous) = self.overrides.insert(ov.post_id, ov) {
            debug!(post_id = previous.post_id, "replaced existing override");
        }
    }

    /// Removes a block; layouts and templates that reference it keep the
    /// dangling id.
    pub fn remove_block(&mut self, id: u64) -> Option<Block> {
        self.blocks.remove(&id)
    }

    /// Looks a block up by slug.
    pub fn block_by_slug(&self, slug: &str) -> Option<&Block> {
        self.blocks.values().find(|b| b.slug == slug)
    }

    /// Looks a layout up by slug.
    pub fn layout_by_slug(&self, slug: &str) -> Option<&Layout> {
        self.layouts.values().find(|l| l.slug == slug)
    }
}

impl EntityStore for MemoryStore {
    fn block(&self, id: u64) -> Option<Block> {
        self.blocks.get(&id).cloned()
    }

    fn layout(&self, id: u64) -> Option<Layout> {
        self.layouts.get(&id).cloned()
    }

    fn templates_by_type(&self, template_type: &str) -> Vec<Template> {
        let mut templates: Vec<Template> = self
            .templates
            .values()
            .filter(|t| t.template_type == template_type && t.status.is_active())
            .cloned()
            .collect();
        templates.sort_by_key(|t| (t.priority, t.id));
        templates
    }

    fn override_for(&self, post_id: u64) -> Option<Override> {
        self.overrides.get(&post_id).cloned()
    }

    fn settings(&self) -> Settings {
        self.settings.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContentItem, OverrideType, Status};
    use std::io::Write;

    const FIXTURE: &str = r#"
settings:
  theme_override: true
blocks:
  - id: 7
    slug: hero
    html: '<div class="box">{{post_title}}</div>'
    css: '.box{color:blue}'
templates:
  - id: 1
    template_type: single-post
    priority: 20
  - id: 2
    template_type: single-post
    priority: 5
  - id: 3
    template_type: single-post
    status: draft
  - id: 4
    template_type: page
    content_blocks: "[7]"
overrides:
  - id: 1
    post_id: 12
    override_type: header
  - id: 2
    post_id: 12
    override_type: footer
"#;

    #[test]
    fn loads_fixture() {
        let store = MemoryStore::from_yaml(FIXTURE).unwrap();
        assert!(store.settings().theme_override);
        assert_eq!(store.block(7).unwrap().slug, "hero");
        assert_eq!(store.block_by_slug("hero").map(|b| b.id), Some(7));
        assert!(store.block(8).is_none());
        assert_eq!(
            store.templates_by_type("page")[0].content_blocks,
            vec![ContentItem::Block(7)]
        );
    }

    #[test]
    fn templates_by_type_sorts_and_filters() {
        let store = MemoryStore::from_yaml(FIXTURE).unwrap();
        let ids: Vec<u64> = store
            .templates_by_type("single-post")
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![2, 1]);
        assert!(store.templates_by_type("search").is_empty());
    }

    #[test]
    fn overrides_upsert_by_post() {
        let store = MemoryStore::from_yaml(FIXTURE).unwrap();
        let ov = store.override_for(12).unwrap();
        assert_eq!(ov.id, 2);
        assert_eq!(ov.override_type, OverrideType::Footer);
    }

    #[test]
    fn removing_a_block_leaves_references() {
        let mut store = MemoryStore::from_yaml(FIXTURE).unwrap();
        assert!(store.remove_block(7).is_some());
        assert!(store.block(7).is_none());
        assert_eq!(store.templates_by_type("page").len(), 1);
    }

    #[test]
    fn loads_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();
        let store = MemoryStore::from_path(file.path()).unwrap();
        assert_eq!(store.block(7).unwrap().status, Status::Active);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = MemoryStore::from_path("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, crate::error::RenderError::Io(_)));
    }

    #[test]
    fn json_fixture() {
        let store = MemoryStore::from_yaml(r#"{"blocks": [{"id": 1, "html": "x"}]}"#).unwrap();
        assert_eq!(store.block(1).unwrap().html, "x");
    }
}
