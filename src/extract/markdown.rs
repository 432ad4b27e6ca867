//! HTML to Markdown conversion

use htmd::options::{HeadingStyle, Options};
use htmd::{Element, HtmlToMarkdown};
use scraper::ElementRef;
use tracing::warn;

/// Converts a parsed content region into Markdown text
pub trait ContentConverter {
    fn convert(&self, region: ElementRef<'_>) -> String;
}

/// Options for [`MarkdownConverter`]
#[derive(Debug, Clone)]
pub struct MarkdownOptions {
    /// Emit `<br>` elements as a literal `<br>` marker instead of a Markdown
    /// hard break
    pub keep_line_breaks: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            keep_line_breaks: true,
        }
    }
}

/// `htmd`-backed converter with ATX headings
pub struct MarkdownConverter {
    inner: HtmlToMarkdown,
}

impl MarkdownConverter {
    pub fn new(options: MarkdownOptions) -> Self {
        let mut builder = HtmlToMarkdown::builder()
            .options(Options {
                heading_style: HeadingStyle::Atx,
                ..Default::default()
            })
            .skip_tags(vec!["script", "style"]);

        if options.keep_line_breaks {
            builder = builder.add_handler(vec!["br"], |_: Element| Some("<br>".to_string()));
        }

        Self {
            inner: builder.build(),
        }
    }
}

impl Default for MarkdownConverter {
    fn default() -> Self {
        Self::new(MarkdownOptions::default())
    }
}

impl ContentConverter for MarkdownConverter {
    fn convert(&self, region: ElementRef<'_>) -> String {
        match self.inner.convert(&region.html()) {
            Ok(markdown) => markdown.trim().to_string(),
            Err(e) => {
                warn!("Markdown conversion failed, keeping plain text: {}", e);
                region
                    .text()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
    }
}
