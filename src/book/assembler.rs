//! Book assembly
//!
//! One text call for the manuscript, then one image call per chapter. A failed
//! text call fails the book; a failed image call leaves a placeholder.

use crate::book::manuscript::{
    book_prompt, book_title, chapter_title, illustration_prompt, split_chapters, Book, Chapter,
    Illustration, SUBTITLE,
};
use crate::error::{LazywriteError, Result};
use crate::CallOrchestrator;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;

pub struct BookAssembler {
    orchestrator: Arc<CallOrchestrator>,
    image_concurrency: usize,
}

impl BookAssembler {
    pub fn new(orchestrator: Arc<CallOrchestrator>, image_concurrency: usize) -> Self {
        Self {
            orchestrator,
            image_concurrency: image_concurrency.max(1),
        }
    }

    pub async fn assemble(&self, topic: &str) -> Result<Book> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(LazywriteError::EmptyPrompt);
        }

        tracing::info!(topic = %topic, "Generating book text");
        let manuscript = self.orchestrator.generate_text(&book_prompt(topic)).await?;
        let bodies = split_chapters(&manuscript.text);
        if bodies.is_empty() {
            return Err(LazywriteError::Fatal {
                provider: "text".to_string(),
                message: "Generated text contained no chapters".to_string(),
                network: false,
            });
        }
        tracing::info!(chapters = bodies.len(), "Generating illustrations");

        // Results come back in chapter order regardless of completion order
        let illustrations: Vec<Illustration> = stream::iter(bodies.iter().enumerate())
            .map(|(index, body)| self.illustrate(index + 1, body))
            .buffered(self.image_concurrency)
            .collect()
            .await;

        let chapters = bodies
            .into_iter()
            .zip(illustrations)
            .enumerate()
            .map(|(index, (body, illustration))| Chapter {
                number: index + 1,
                title: chapter_title(&body),
                body,
                illustration,
            })
            .collect();

        let book = Book {
            title: book_title(topic),
            subtitle: SUBTITLE.to_string(),
            topic: topic.to_string(),
            chapters,
            generated_at: Utc::now(),
        };

        tracing::info!(
            title = %book.title,
            chapters = book.chapters.len(),
            placeholders = book.placeholder_count(),
            "Book assembled"
        );
        Ok(book)
    }

    async fn illustrate(&self, number: usize, body: &str) -> Illustration {
        match self
            .orchestrator
            .generate_image(&illustration_prompt(body))
            .await
        {
            Ok(image) => Illustration::Image { image },
            Err(e) => {
                tracing::warn!(chapter = number, error = %e, "Image generation failed");
                Illustration::Placeholder {
                    reason: e.to_string(),
                }
            }
        }
    }
}
