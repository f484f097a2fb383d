//! Book renderers
//!
//! Turn an assembled [`Book`] into bytes. Page layout lives behind this trait.

use crate::book::Book;
use crate::error::{LazywriteError, Result};

pub trait BookRenderer: Send + Sync {
    /// MIME type of the rendered output
    fn content_type(&self) -> &'static str;

    /// File extension without the dot
    fn extension(&self) -> &'static str;

    fn render(&self, book: &Book) -> Result<Vec<u8>>;
}

/// The whole book as JSON
#[derive(Debug, Clone, Default)]
pub struct JsonRenderer {
    pub pretty: bool,
}

impl BookRenderer for JsonRenderer {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    fn render(&self, book: &Book) -> Result<Vec<u8>> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(book)
        } else {
            serde_json::to_vec(book)
        };
        bytes.map_err(|e| LazywriteError::Internal(format!("Failed to render book: {}", e)))
    }
}

/// Title page, contents and chapters as Markdown; images are linked by URL
/// or embedded as data URIs
#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer;

impl BookRenderer for MarkdownRenderer {
    fn content_type(&self) -> &'static str {
        "text/markdown"
    }

    fn extension(&self) -> &'static str {
        "md"
    }

    fn render(&self, book: &Book) -> Result<Vec<u8>> {
        use crate::api::GeneratedImage;
        use crate::book::Illustration;

        let mut out = format!("# {}\n\n_{}_\n\n## Contents\n\n", book.title, book.subtitle);
        for line in book.contents() {
            out.push_str(&format!("- {}\n", line));
        }

        for chapter in &book.chapters {
            out.push_str(&format!(
                "\n## Chapter {}: {}\n\n",
                chapter.number, chapter.title
            ));
            match &chapter.illustration {
                Illustration::Image {
                    image: GeneratedImage::Url { image_url },
                } => out.push_str(&format!("![{}]({})\n\n", chapter.title, image_url)),
                Illustration::Image {
                    image: GeneratedImage::Base64 { image_base64 },
                } => out.push_str(&format!(
                    "![{}](data:image/png;base64,{})\n\n",
                    chapter.title, image_base64
                )),
                Illustration::Placeholder { .. } => out.push_str("_[Illustration unavailable]_\n\n"),
            }
            out.push_str(chapter.body.trim());
            out.push('\n');
        }

        Ok(out.into_bytes())
    }
}
