//! Book Module
//!
//! Illustrated book assembly on top of the text and image operations.

pub mod assembler;
pub mod manuscript;
pub mod render;

pub use assembler::BookAssembler;
pub use manuscript::{
    book_prompt, book_title, chapter_title, illustration_prompt, split_chapters, Book, Chapter,
    Illustration, SUBTITLE,
};
pub use render::{BookRenderer, JsonRenderer, MarkdownRenderer};
