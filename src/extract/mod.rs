//! Article content extraction
//!
//! Turns an article page into its useful parts:
//! - Strips wiki chrome (navigation, footers, license boxes, scripts)
//! - Renders the `page-content` region as Markdown
//! - Collects page tags and image references

mod images;
mod markdown;
mod types;

pub use images::{normalize_image_path, ImageLocator, ImagePolicy};
pub use markdown::{ContentConverter, MarkdownConverter, MarkdownOptions};
pub use types::*;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

/// Boilerplate removed from every page before the content region is read
pub const DENYLIST: &[&str] = &[
    "script",
    "style",
    "nav",
    ".top-bar",
    ".mobile-top-bar",
    ".side-block",
    ".footer",
    ".licensebox",
    "#licensebox",
    ".footnotes-footer",
    ".footer-wikiwalk-nav",
    "iframe",
    ".collapsible-block",
];

/// Id of the `div` holding the article body
const CONTENT_REGION_ID: &str = "page-content";
/// Class of the `div` holding tag links
const TAGS_CLASS: &str = "page-tags";

/// Content extractor
pub struct ContentExtractor<C = MarkdownConverter> {
    converter: C,
    locator: ImageLocator,
    /// Pre-compiled boilerplate selectors
    denylist: Vec<Selector>,
}

impl ContentExtractor<MarkdownConverter> {
    /// Create an extractor that renders with [`MarkdownConverter`]
    pub fn new(config: ExtractorConfig) -> Self {
        let converter = MarkdownConverter::new(config.markdown.clone());
        Self::with_converter(config, converter)
    }
}

impl Default for ContentExtractor<MarkdownConverter> {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

impl<C: ContentConverter> ContentExtractor<C> {
    pub fn with_converter(config: ExtractorConfig, converter: C) -> Self {
        let mut denylist: Vec<Selector> = DENYLIST
            .iter()
            .filter_map(|s| Selector::parse(s).ok())
            .collect();

        for extra in &config.extra_denylist {
            match Selector::parse(extra) {
                Ok(selector) => denylist.push(selector),
                Err(e) => warn!("Ignoring invalid denylist selector '{}': {}", extra, e),
            }
        }

        Self {
            converter,
            locator: ImageLocator::new(config.image_policy),
            denylist,
        }
    }

    /// Extract the content region, tags and image references from a page
    pub fn extract(&self, html: &str) -> Result<ExtractedContent, ExtractError> {
        let mut document = Html::parse_document(html);

        let removed = self.strip_boilerplate(&mut document);
        if removed > 0 {
            debug!("Removed {} boilerplate elements", removed);
        }

        let region = find_content_region(&document).ok_or(ExtractError::ContentRegionMissing)?;

        let markdown = self.converter.convert(region);
        let image_references = self.locator.locate(region);
        let raw_region_markup = region.html();
        let tags = extract_tags(&document);

        debug!(
            "Extracted {} chars of markdown, {} tags, {} images",
            markdown.len(),
            tags.len(),
            image_references.len()
        );

        Ok(ExtractedContent {
            raw_region_markup,
            markdown,
            tags,
            image_references,
        })
    }

    /// Detach every element matching the denylist. Returns the number of
    /// matches, counting nested matches separately.
    fn strip_boilerplate(&self, document: &mut Html) -> usize {
        let doc: &Html = document;
        let ids: Vec<_> = self
            .denylist
            .iter()
            .flat_map(move |selector| doc.select(selector).map(|el| el.id()))
            .collect();

        for id in &ids {
            if let Some(mut node) = document.tree.get_mut(*id) {
                node.detach();
            }
        }

        ids.len()
    }
}

/// First `div` whose id is `page-content`
fn find_content_region(document: &Html) -> Option<ElementRef<'_>> {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "div" && el.value().id() == Some(CONTENT_REGION_ID))
}

/// Text of each link in the first `page-tags` div, as `#tag`
fn extract_tags(document: &Html) -> Vec<String> {
    let container = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "div" && el.value().classes().any(|c| c == TAGS_CLASS));

    let Some(container) = container else {
        debug!("No tags container found");
        return Vec::new();
    };

    container
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "a")
        .map(|a| a.text().map(str::trim).collect::<String>())
        .filter(|tag| !tag.is_empty())
        .map(|tag| format!("#{}", tag))
        .collect()
}
