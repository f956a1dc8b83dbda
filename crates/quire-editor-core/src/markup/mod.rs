//! HTML markup: the serialized form of a document, as stored in a blog's
//! `content` field.

mod parser;
mod writer;

pub use parser::parse;
pub use writer::MarkupWriter;

use markdown_weaver_escape::FmtWriter;

use crate::document::Document;

/// Serialize a document to canonical markup.
pub fn serialize(doc: &Document) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = MarkupWriter::new(doc, FmtWriter(&mut out)).run();
    out
}
