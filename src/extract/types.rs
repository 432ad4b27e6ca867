use super::images::ImagePolicy;
use super::markdown::MarkdownOptions;
use thiserror::Error;

/// Content extraction errors
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Content region not found")]
    ContentRegionMissing,
}

/// Content pulled out of one article page
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    /// Serialized markup of the content region, after boilerplate removal
    pub raw_region_markup: String,
    /// Markdown rendering of the content region
    pub markdown: String,
    /// Tags as `#tag`, in document order
    pub tags: Vec<String>,
    /// Normalized image paths, in document order
    pub image_references: Vec<String>,
}

impl ExtractedContent {
    /// Markdown artifact: the body, then the tag line when there are tags
    pub fn to_artifact(&self) -> String {
        let mut artifact = self.markdown.clone();
        if !self.tags.is_empty() {
            artifact.push_str("\n\n\n");
            artifact.push_str(&self.tags.join(" "));
        }
        artifact.push('\n');
        artifact
    }
}

/// Extractor configuration
#[derive(Debug, Clone, Default)]
pub struct ExtractorConfig {
    /// Which images to collect from the content region
    pub image_policy: ImagePolicy,
    /// Markdown rendering options
    pub markdown: MarkdownOptions,
    /// CSS selectors removed in addition to the built-in boilerplate list
    pub extra_denylist: Vec<String>,
}
