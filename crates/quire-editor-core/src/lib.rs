//! quire-editor-core: Pure Rust rich-text editing without framework dependencies.
//!
//! This crate provides:
//! - `Document` - a block tree of paragraphs, headings, lists, quotes, code and tables
//! - `Editor` - a document plus selection and bounded undo history
//! - Formatting commands, HTML markup serialization and parsing, text statistics

pub mod document;
pub mod editor;
pub mod format;
pub mod image;
pub mod markup;
pub mod node;
pub mod stats;
pub mod structure;
pub mod types;
pub mod undo;

pub use document::{Document, Position};
pub use editor::Editor;
pub use format::normalize_link;
pub use image::ImageSource;
pub use markup::{MarkupWriter, parse, serialize};
pub use node::{Block, Inline, Marks, Table, TextBlock};
pub use smol_str::SmolStr;
pub use structure::LeafRole;
pub use types::{Align, FormatKind, HeadingLevel, ListKind, MarkKind, Selection};
pub use undo::{History, UndoManager};
