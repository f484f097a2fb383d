//! Manuscript
//!
//! Prompt construction, chapter splitting and the assembled book model.

use crate::api::GeneratedImage;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

pub const SUBTITLE: &str = "An Educational Journey";

const CHAPTER_TITLE_MAX: usize = 40;
const BOOK_TITLE_MAX: usize = 50;
const ILLUSTRATION_SUBJECT_CHARS: usize = 150;

/// Instruction prompt for the full book text
pub fn book_prompt(topic: &str) -> String {
    format!(
        "Create a highly professional educational children's book about {} with:
      - A beautiful title page with an engaging title and subtitle
      - A well-structured table of contents with page numbers
      - 4-5 chapters with compelling, engaging titles
      - Important vocabulary words defined in margins (marked as \"Word to Know:\")
      - \"Let's Think!\" discussion questions in colored boxes at strategic points
      - \"Try This!\" hands-on activities that reinforce learning
      - \"Did You Know?\" fun facts in the margins to add depth and interest
      - Detailed scene descriptions for beautiful illustrations
      - Child-friendly language (grades 4-6 level) that is clear but not condescending
      - Rich educational content with deep subject matter expertise
      - Thoughtful moral lessons woven naturally into the narrative
      - A memorable conclusion that reinforces key learnings
      Write in a warm, encouraging tone like a favorite teacher, with clean paragraph \
         breaks and clear section formatting.",
        topic
    )
}

/// Image prompt built from the opening of a chapter
pub fn illustration_prompt(chapter_body: &str) -> String {
    let subject: String = chapter_body
        .chars()
        .take(ILLUSTRATION_SUBJECT_CHARS)
        .collect();
    format!(
        "Award-winning educational textbook illustration, vibrant watercolor style with \
         detailed linework, professional lighting, rich natural colors, child-friendly but \
         sophisticated educational scene. Subject: {}. Style similar to modern children's \
         educational publishers like Scholastic, with clean composition, educational value, \
         and emotional appeal.",
        subject
    )
}

fn chapter_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"(?i)Chapter [0-9]+:").unwrap())
}

/// Split generated text on `Chapter <n>:` markers
///
/// Text before the first marker is kept as its own piece. Blank pieces are dropped.
pub fn split_chapters(text: &str) -> Vec<String> {
    chapter_marker()
        .split(text)
        .filter(|piece| !piece.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// First line of a chapter, shortened to fit a heading
pub fn chapter_title(chapter_body: &str) -> String {
    let first_line = chapter_body.lines().next().unwrap_or_default().trim();
    truncate(first_line, CHAPTER_TITLE_MAX)
}

/// Book title taken from the requested topic
pub fn book_title(topic: &str) -> String {
    truncate(topic.trim(), BOOK_TITLE_MAX)
}

/// Cut to `max - 3` characters plus an ellipsis when longer than `max`
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let kept: String = text.chars().take(max - 3).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}

/// Picture attached to a chapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Illustration {
    Image {
        #[serde(flatten)]
        image: GeneratedImage,
    },

    /// Image generation failed for this chapter
    Placeholder { reason: String },
}

impl Illustration {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Illustration::Placeholder { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chapter {
    /// 1-based
    pub number: usize,
    pub title: String,
    pub body: String,
    pub illustration: Illustration,
}

/// A fully assembled book, ready for a renderer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub title: String,
    pub subtitle: String,
    pub topic: String,
    pub chapters: Vec<Chapter>,
    pub generated_at: DateTime<Utc>,
}

impl Book {
    /// Table of contents lines (`Chapter 1: Title`)
    pub fn contents(&self) -> Vec<String> {
        self.chapters
            .iter()
            .map(|c| format!("Chapter {}: {}", c.number, c.title))
            .collect()
    }

    pub fn placeholder_count(&self) -> usize {
        self.chapters
            .iter()
            .filter(|c| c.illustration.is_placeholder())
            .count()
    }
}
