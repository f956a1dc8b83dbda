//! Formatting commands: marks, block conversions, alignment, links, images
//! and tables.

use crate::document::Document;
use crate::image::ImageSource;
use crate::node::Inline;
use crate::structure::LeafRole;
use crate::types::{FormatKind, ListKind, Selection};

/// Normalize a link target. Blank input yields `None`; anything without a
/// scheme separator past the first character gets `http://`.
pub fn normalize_link(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    if url.find("://").is_some_and(|i| i > 0) {
        Some(url.to_string())
    } else {
        Some(format!("http://{url}"))
    }
}

/// Role a block-level format converts leaves into.
pub(crate) fn block_role(kind: &FormatKind) -> Option<LeafRole> {
    match kind {
        FormatKind::Heading(level) => Some(LeafRole::Heading(*level)),
        FormatKind::BulletList => Some(LeafRole::Item(ListKind::Bullet)),
        FormatKind::OrderedList => Some(LeafRole::Item(ListKind::Ordered)),
        FormatKind::Blockquote => Some(LeafRole::Quote),
        FormatKind::CodeBlock => Some(LeafRole::Code),
        _ => None,
    }
}

/// Apply `kind` over `selection`. Returns the selection to keep afterwards,
/// or `None` when nothing applied.
pub(crate) fn apply(doc: &mut Document, selection: Selection, kind: &FormatKind) -> Option<Selection> {
    let selection = selection.clamped(doc.len());
    if let Some(mark) = kind.mark() {
        let range = if selection.is_collapsed() {
            doc.word_at(selection.head)
        } else {
            selection.to_range()
        };
        return doc.toggle_mark(range, mark).then_some(selection);
    }
    if let Some(role) = block_role(kind) {
        return doc
            .toggle_role(selection.to_range(), role)
            .then_some(selection);
    }
    match kind {
        FormatKind::Align(align) => doc
            .toggle_align(selection.to_range(), *align)
            .then_some(selection),
        FormatKind::Link(url) => toggle_link(doc, selection, url),
        FormatKind::Image(source) => insert_image(doc, selection, source, ""),
        FormatKind::Table => doc.toggle_table(selection.head).then_some(selection),
        _ => None,
    }
}

/// Link the selected text. A blank URL removes links instead.
pub(crate) fn set_link(doc: &mut Document, selection: Selection, url: &str) -> Option<Selection> {
    if selection.is_collapsed() {
        return None;
    }
    let href = normalize_link(url);
    doc.set_link_mark(selection.to_range(), href.as_deref())
        .then_some(selection)
}

pub(crate) fn unset_link(doc: &mut Document, selection: Selection) -> Option<Selection> {
    if selection.is_collapsed() {
        return None;
    }
    doc.set_link_mark(selection.to_range(), None)
        .then_some(selection)
}

fn toggle_link(doc: &mut Document, selection: Selection, url: &str) -> Option<Selection> {
    if selection.is_collapsed() {
        return None;
    }
    let href = normalize_link(url);
    let current = doc.link_in(selection.to_range());
    if href.is_some() && current.as_deref() == href.as_deref() {
        unset_link(doc, selection)
    } else {
        set_link(doc, selection, url)
    }
}

/// Insert an image at the selection start, replacing selected content. The
/// cursor lands after the image.
pub(crate) fn insert_image(
    doc: &mut Document,
    selection: Selection,
    source: &ImageSource,
    alt: &str,
) -> Option<Selection> {
    if source.is_empty() {
        return None;
    }
    let start = selection.start();
    if !selection.is_collapsed() {
        doc.delete(selection.to_range());
    }
    let image = Inline::Image {
        src: source.to_src(),
        alt: alt.to_string(),
    };
    doc.insert_inline(start, image)
        .then(|| Selection::collapsed(start + 1))
}

/// Whether `kind` is in effect over `selection`, for toolbar state.
pub(crate) fn is_active(doc: &Document, selection: Selection, kind: &FormatKind) -> bool {
    let selection = selection.clamped(doc.len());
    if let Some(mark) = kind.mark() {
        let range = if selection.is_collapsed() {
            doc.word_at(selection.head)
        } else {
            selection.to_range()
        };
        return doc.has_mark(range, mark);
    }
    let roles = doc.roles();
    let touched = doc.touched(selection.to_range());
    if let Some(role) = block_role(kind) {
        return touched.iter().all(|(i, _)| roles[*i] == role);
    }
    match kind {
        FormatKind::Align(align) => touched
            .iter()
            .filter(|(i, _)| roles[*i].alignable())
            .all(|(i, _)| doc.leaf(*i).map(|leaf| leaf.align) == Some(*align)),
        FormatKind::Link(_) => doc.link_in(selection.to_range()).is_some(),
        FormatKind::Table => touched.iter().all(|(i, _)| roles[*i] == LeafRole::Cell),
        _ => false,
    }
}
