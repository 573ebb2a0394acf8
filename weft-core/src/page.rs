//! Pages and their rendering configuration.

use crate::graph::{PageHandle, WebGraph};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Stable identifier of a page, assigned once at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(u64);

impl PageId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PageId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Role of a page in the mock site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    /// Links outward to many other pages.
    Hub,
    /// Leaf-like content page, mostly a link target.
    Authority,
}

impl PageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageKind::Hub => "hub",
            PageKind::Authority => "authority",
        }
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type PathFn = Arc<dyn Fn(&WebGraph, PageHandle) -> String + Send + Sync>;

/// How a page derives its URL path.
#[derive(Clone, Default)]
pub enum PathStrategy {
    /// Parent path joined with the page id; the root maps to its prefix or `/`.
    #[default]
    Ident,
    /// Caller-supplied derivation.
    Custom(PathFn),
}

impl PathStrategy {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&WebGraph, PageHandle) -> String + Send + Sync + 'static,
    {
        PathStrategy::Custom(Arc::new(f))
    }
}

impl fmt::Debug for PathStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStrategy::Ident => f.write_str("Ident"),
            PathStrategy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Page layout used when a page is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageTemplate {
    /// Heading followed by a bulleted list of links.
    Directory,
    /// Body text with links inline in a paragraph.
    Article,
}

/// Template choice per page kind, with an optional override for all kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageTemplates {
    pub hub: PageTemplate,
    pub authority: PageTemplate,
    pub custom: Option<PageTemplate>,
}

impl Default for PageTemplates {
    fn default() -> Self {
        Self {
            hub: PageTemplate::Directory,
            authority: PageTemplate::Article,
            custom: None,
        }
    }
}

impl PageTemplates {
    pub fn for_kind(&self, kind: PageKind) -> PageTemplate {
        self.custom.unwrap_or(match kind {
            PageKind::Hub => self.hub,
            PageKind::Authority => self.authority,
        })
    }
}

/// Rendering configuration inherited by every child a page creates.
#[derive(Debug, Clone, Default)]
pub struct RenderConfig {
    pub path_prefix: String,
    pub path_strategy: PathStrategy,
    pub templates: PageTemplates,
}

impl RenderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the path prefix. A trailing `/` is dropped.
    pub fn with_path_prefix(mut self, prefix: &str) -> Self {
        self.path_prefix = prefix.trim_end_matches('/').to_string();
        self
    }

    pub fn with_path_strategy(mut self, strategy: PathStrategy) -> Self {
        self.path_strategy = strategy;
        self
    }

    pub fn with_templates(mut self, templates: PageTemplates) -> Self {
        self.templates = templates;
        self
    }

    /// Renders every kind with `template`.
    pub fn with_custom_template(mut self, template: PageTemplate) -> Self {
        self.templates.custom = Some(template);
        self
    }
}

/// A node of the page graph.
#[derive(Debug, Clone)]
pub struct Page {
    pub id: PageId,
    pub kind: PageKind,
    pub config: RenderConfig,
}

impl Page {
    pub fn new(id: PageId, kind: PageKind, config: RenderConfig) -> Self {
        Self { id, kind, config }
    }

    /// A page with the same configuration but a new id and kind.
    pub fn derive(&self, id: PageId, kind: PageKind) -> Self {
        Self {
            id,
            kind,
            config: self.config.clone(),
        }
    }

    pub fn is_hub(&self) -> bool {
        self.kind == PageKind::Hub
    }

    pub fn template(&self) -> PageTemplate {
        self.config.templates.for_kind(self.kind)
    }
}

/// Serializable summary of a page for export and update events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub id: PageId,
    pub kind: PageKind,
    pub path: String,
    pub parent: Option<PageId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_id_round_trips_through_str() {
        let id = PageId::new(18446744073709551615);
        let parsed: PageId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("nope".parse::<PageId>().is_err());
    }

    #[test]
    fn test_prefix_trailing_slash_trimmed() {
        let config = RenderConfig::new().with_path_prefix("/site/");
        assert_eq!(config.path_prefix, "/site");
    }

    #[test]
    fn test_derive_keeps_config() {
        let page = Page::new(
            PageId::new(1),
            PageKind::Hub,
            RenderConfig::new().with_path_prefix("/a"),
        );
        let child = page.derive(PageId::new(2), PageKind::Authority);
        assert_eq!(child.config.path_prefix, "/a");
        assert_eq!(child.kind, PageKind::Authority);
        assert!(!child.is_hub());
    }

    #[test]
    fn test_template_follows_kind_unless_overridden() {
        let page = Page::new(PageId::new(1), PageKind::Hub, RenderConfig::new());
        assert_eq!(page.template(), PageTemplate::Directory);
        let child = page.derive(PageId::new(2), PageKind::Authority);
        assert_eq!(child.template(), PageTemplate::Article);

        let config = RenderConfig::new().with_custom_template(PageTemplate::Article);
        let page = Page::new(PageId::new(3), PageKind::Hub, config);
        assert_eq!(page.template(), PageTemplate::Article);
        assert_eq!(
            page.derive(PageId::new(4), PageKind::Hub).template(),
            PageTemplate::Article
        );
    }
}
