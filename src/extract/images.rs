//! Image reference discovery

use scraper::ElementRef;
use serde::{Deserialize, Serialize};

/// Which image references to collect from a content region
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImagePolicy {
    /// Stop after the first `img` element in document order
    #[default]
    FirstOnly,
    /// Collect every `img` element
    All,
}

/// Finds image sources inside a content region
#[derive(Debug, Clone, Default)]
pub struct ImageLocator {
    policy: ImagePolicy,
}

impl ImageLocator {
    pub fn new(policy: ImagePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ImagePolicy {
        self.policy
    }

    /// Collect normalized image paths in document order.
    ///
    /// Under [`ImagePolicy::FirstOnly`] only the first `img` element is
    /// inspected; if it has no usable `src` nothing is returned.
    pub fn locate(&self, region: ElementRef<'_>) -> Vec<String> {
        let mut sources = Vec::new();

        let images = region
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == "img");

        for img in images {
            if let Some(src) = img.value().attr("src") {
                let src = src.trim();
                if !src.is_empty() {
                    sources.push(normalize_image_path(src).to_string());
                }
            }

            if self.policy == ImagePolicy::FirstOnly {
                break;
            }
        }

        sources
    }
}

/// Strip one leading `../` or `./` from an image source
pub fn normalize_image_path(src: &str) -> &str {
    src.strip_prefix("../")
        .or_else(|| src.strip_prefix("./"))
        .unwrap_or(src)
}
