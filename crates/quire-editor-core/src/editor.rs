//! The editor: a document, a selection and an undo history.
//!
//! Every mutating call goes through [`Editor::mutate`], which snapshots the
//! document before the edit and records the snapshot when the document
//! actually changed.

use tracing::trace;

use crate::document::Document;
use crate::format;
use crate::image::ImageSource;
use crate::markup;
use crate::stats;
use crate::types::{FormatKind, Selection};
use crate::undo::{DEFAULT_MAX_STEPS, History, UndoManager};

#[derive(Clone, Debug, PartialEq)]
struct Snapshot {
    doc: Document,
    selection: Selection,
}

/// A rich-text editing buffer.
#[derive(Clone, Debug)]
pub struct Editor {
    doc: Document,
    selection: Selection,
    history: History<Snapshot>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    pub fn new() -> Self {
        Self::from_document(Document::new())
    }

    pub fn from_document(doc: Document) -> Self {
        Self {
            doc,
            selection: Selection::default(),
            history: History::new(DEFAULT_MAX_STEPS),
        }
    }

    /// Open an editor over serialized markup.
    pub fn from_markup(markup: &str) -> Self {
        Self::from_document(markup::parse(markup))
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection.clamped(self.doc.len());
    }

    /// Select the whole document.
    pub fn select_all(&mut self) {
        self.selection = Selection::new(0, self.doc.len());
    }

    /// Total length in positions.
    pub fn len(&self) -> usize {
        self.doc.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc.is_empty()
    }

    fn mutate(
        &mut self,
        edit: impl FnOnce(&mut Document, Selection) -> Option<Selection>,
    ) -> bool {
        let before = Snapshot {
            doc: self.doc.clone(),
            selection: self.selection,
        };
        match edit(&mut self.doc, self.selection) {
            Some(selection) if self.doc != before.doc => {
                self.selection = selection.clamped(self.doc.len());
                self.history.record(before);
                true
            }
            _ => {
                self.doc = before.doc;
                false
            }
        }
    }

    /// Apply a toolbar format over `selection`. The editor selection follows.
    pub fn apply_format(&mut self, selection: Selection, kind: &FormatKind) -> bool {
        self.selection = selection.clamped(self.doc.len());
        let applied = self.mutate(|doc, selection| format::apply(doc, selection, kind));
        trace!(?kind, applied, "apply format");
        applied
    }

    /// Whether `kind` is active over the current selection.
    pub fn is_active(&self, kind: &FormatKind) -> bool {
        format::is_active(&self.doc, self.selection, kind)
    }

    /// Insert an image at the cursor, replacing any selected content.
    pub fn insert_image(&mut self, source: &ImageSource) -> bool {
        self.insert_image_with_alt(source, "")
    }

    pub fn insert_image_with_alt(&mut self, source: &ImageSource, alt: &str) -> bool {
        self.mutate(|doc, selection| format::insert_image(doc, selection, source, alt))
    }

    /// Link the selected text. Requires a non-empty selection; a blank URL
    /// removes links instead.
    pub fn set_link(&mut self, url: &str) -> bool {
        self.mutate(|doc, selection| format::set_link(doc, selection, url))
    }

    /// Remove links from the selected text, leaving text and other marks.
    pub fn unset_link(&mut self) -> bool {
        self.mutate(format::unset_link)
    }

    /// Replace `selection` with `text`. The cursor lands after the insertion.
    pub fn insert_text(&mut self, selection: Selection, text: &str) -> bool {
        self.selection = selection.clamped(self.doc.len());
        self.mutate(|doc, selection| {
            let cursor = doc.insert_text(selection.to_range(), text);
            Some(Selection::collapsed(cursor))
        })
    }

    /// Remove `selection`, merging the leaves at its ends.
    pub fn delete(&mut self, selection: Selection) -> bool {
        self.selection = selection.clamped(self.doc.len());
        self.mutate(|doc, selection| {
            doc.delete(selection.to_range())
                .then(|| Selection::collapsed(selection.start()))
        })
    }

    /// Delete the selection, or the position before a collapsed cursor.
    pub fn backspace(&mut self) -> bool {
        let selection = self.selection;
        if selection.is_collapsed() {
            match selection.head.checked_sub(1) {
                Some(start) => self.delete(Selection::new(start, selection.head)),
                None => false,
            }
        } else {
            self.delete(selection)
        }
    }

    /// Canonical markup for the document.
    pub fn serialize(&self) -> String {
        markup::serialize(&self.doc)
    }

    pub fn plain_text(&self) -> String {
        self.doc.plain_text()
    }

    pub fn word_count(&self) -> usize {
        stats::word_count(&self.doc.plain_text())
    }

    pub fn estimated_reading_minutes(&self) -> usize {
        stats::reading_minutes(self.word_count())
    }

    /// Card excerpt over the plain text, leaves joined by spaces.
    pub fn excerpt(&self, max_chars: usize) -> String {
        let text = self.doc.plain_text().replace('\n', " ");
        stats::excerpt(&text, max_chars)
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.doc = snapshot.doc;
        self.selection = snapshot.selection.clamped(self.doc.len());
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            doc: self.doc.clone(),
            selection: self.selection,
        }
    }
}

impl UndoManager for Editor {
    fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn undo(&mut self) -> bool {
        match self.history.undo(self.snapshot()) {
            Ok(previous) => {
                self.restore(previous);
                true
            }
            Err(_) => false,
        }
    }

    fn redo(&mut self) -> bool {
        match self.history.redo(self.snapshot()) {
            Ok(next) => {
                self.restore(next);
                true
            }
            Err(_) => false,
        }
    }

    fn clear_history(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::node::{Block, Inline, TextBlock};
    use crate::types::{Align, HeadingLevel};

    fn editor(markup: &str) -> Editor {
        Editor::from_markup(markup)
    }

    fn assert_stable(editor: &Editor) {
        let first = editor.serialize();
        assert_eq!(Editor::from_markup(&first).serialize(), first);
    }

    #[test]
    fn test_bold_toggles_over_selection() {
        let mut ed = editor("<p>hello world</p>");
        assert!(ed.apply_format(Selection::new(0, 5), &FormatKind::Bold));
        insta::assert_snapshot!(ed.serialize(), @"<p><strong>hello</strong> world</p>");
        assert!(ed.is_active(&FormatKind::Bold));

        assert!(ed.apply_format(Selection::new(0, 5), &FormatKind::Bold));
        assert_eq!(ed.serialize(), "<p>hello world</p>");
    }

    #[test]
    fn test_partial_mark_extends_to_whole_range() {
        let mut ed = editor("<p><em>ab</em>cd</p>");
        assert!(ed.apply_format(Selection::new(0, 4), &FormatKind::Italic));
        assert_eq!(ed.serialize(), "<p><em>abcd</em></p>");
    }

    #[test]
    fn test_collapsed_mark_expands_to_word() {
        let mut ed = editor("<p>one two three</p>");
        assert!(ed.apply_format(Selection::collapsed(5), &FormatKind::Underline));
        assert_eq!(ed.serialize(), "<p>one <u>two</u> three</p>");
    }

    #[test]
    fn test_heading_toggle_reverts_to_paragraph() {
        let mut ed = editor("<p>title</p>");
        let h1 = FormatKind::Heading(HeadingLevel::H1);
        assert!(ed.apply_format(Selection::collapsed(2), &h1));
        assert_eq!(ed.serialize(), "<h1>title</h1>");
        assert!(ed.apply_format(Selection::collapsed(2), &h1));
        assert_eq!(ed.serialize(), "<p>title</p>");
    }

    #[test]
    fn test_list_conversion_groups_touched_leaves() {
        let mut ed = editor("<p>a</p><p>b</p><p>c</p>");
        // "a" 0..1, "b" 2..3, "c" 4..5
        assert!(ed.apply_format(Selection::new(0, 3), &FormatKind::BulletList));
        insta::assert_snapshot!(ed.serialize(), @"<ul><li><p>a</p></li><li><p>b</p></li></ul><p>c</p>");
        assert!(ed.apply_format(Selection::new(4, 5), &FormatKind::BulletList));
        assert_eq!(ed.document().blocks().len(), 1);
    }

    #[test]
    fn test_code_block_strips_marks() {
        let mut ed = editor("<p><strong>let</strong> x</p>");
        assert!(ed.apply_format(Selection::collapsed(0), &FormatKind::CodeBlock));
        assert_eq!(ed.serialize(), "<pre><code>let x</code></pre>");
    }

    #[test]
    fn test_align_reapply_resets() {
        let mut ed = editor("<p>x</p>");
        let center = FormatKind::Align(Align::Center);
        assert!(ed.apply_format(Selection::collapsed(0), &center));
        assert_eq!(ed.serialize(), r#"<p style="text-align: center">x</p>"#);
        assert!(ed.apply_format(Selection::collapsed(0), &center));
        assert_eq!(ed.serialize(), "<p>x</p>");
    }

    #[test]
    fn test_set_link_requires_selection() {
        let mut ed = editor("<p>site</p>");
        ed.set_selection(Selection::collapsed(2));
        assert!(!ed.set_link("example.com"));

        ed.set_selection(Selection::new(0, 4));
        assert!(ed.set_link("  example.com "));
        assert_eq!(
            ed.serialize(),
            r#"<p><a href="http://example.com" target="_blank" rel="noopener noreferrer nofollow">site</a></p>"#
        );
    }

    #[test]
    fn test_unset_link_keeps_other_marks() {
        let mut ed = editor(r#"<p><a href="https://x.io"><strong>bold</strong> plain</a></p>"#);
        ed.set_selection(Selection::new(0, 10));
        assert!(ed.unset_link());
        assert_eq!(ed.serialize(), "<p><strong>bold</strong> plain</p>");
    }

    #[test]
    fn test_empty_url_unsets() {
        let mut ed = editor(r#"<p><a href="https://x.io">go</a></p>"#);
        ed.set_selection(Selection::new(0, 2));
        assert!(ed.set_link(""));
        assert_eq!(ed.serialize(), "<p>go</p>");
    }

    #[test]
    fn test_link_format_toggles_identical_href() {
        let mut ed = editor("<p>go</p>");
        let link = FormatKind::Link("https://x.io".into());
        assert!(ed.apply_format(Selection::new(0, 2), &link));
        assert!(ed.is_active(&link));
        assert!(ed.apply_format(Selection::new(0, 2), &link));
        assert_eq!(ed.serialize(), "<p>go</p>");
    }

    #[test]
    fn test_insert_image_replaces_selection() {
        let mut ed = editor("<p>abc</p>");
        ed.set_selection(Selection::new(1, 2));
        assert!(ed.insert_image(&ImageSource::url("https://x.io/a.png")));
        assert_eq!(
            ed.serialize(),
            r#"<p>a<img src="https://x.io/a.png" alt="">c</p>"#
        );
        assert_eq!(ed.selection(), Selection::collapsed(2));
    }

    #[test]
    fn test_embedded_image_becomes_data_url() {
        let mut ed = Editor::new();
        let source = ImageSource::Embedded {
            data: Bytes::from_static(b"hi"),
            mime: Some("image/gif".into()),
        };
        assert!(ed.insert_image(&source));
        assert_eq!(ed.serialize(), r#"<p><img src="data:image/gif;base64,aGk=" alt=""></p>"#);
    }

    #[test]
    fn test_table_insert_and_remove() {
        let mut ed = editor("<p>intro</p>");
        assert!(ed.apply_format(Selection::collapsed(0), &FormatKind::Table));
        assert!(ed.document().blocks()[1].is_table());
        assert_eq!(ed.document().leaf_count(), 10);

        // Cursor in the first header cell.
        assert!(ed.apply_format(Selection::collapsed(6), &FormatKind::Table));
        assert_eq!(ed.serialize(), "<p>intro</p>");
    }

    #[test]
    fn test_table_cells_are_not_converted() {
        let mut ed = editor("<table><tbody><tr><th><p>h</p></th></tr></tbody></table>");
        assert!(!ed.apply_format(Selection::collapsed(0), &FormatKind::BulletList));
        assert!(!ed.can_undo());
    }

    #[test]
    fn test_undo_redo_formats() {
        let mut ed = editor("<p>hello</p>");
        ed.apply_format(Selection::new(0, 5), &FormatKind::Bold);
        ed.insert_text(Selection::collapsed(5), "!");
        assert_eq!(ed.serialize(), "<p><strong>hello!</strong></p>");

        assert!(ed.undo());
        assert_eq!(ed.serialize(), "<p><strong>hello</strong></p>");
        assert!(ed.undo());
        assert_eq!(ed.serialize(), "<p>hello</p>");
        assert!(!ed.undo());

        assert!(ed.redo());
        assert!(ed.redo());
        assert_eq!(ed.serialize(), "<p><strong>hello!</strong></p>");
    }

    #[test]
    fn test_noop_does_not_record() {
        let mut ed = Editor::new();
        assert!(!ed.apply_format(Selection::collapsed(0), &FormatKind::Bold));
        assert!(!ed.delete(Selection::collapsed(0)));
        assert!(!ed.can_undo());
    }

    #[test]
    fn test_backspace_joins_paragraphs() {
        let mut ed = editor("<p>ab</p><p>cd</p>");
        ed.set_selection(Selection::collapsed(3));
        assert!(ed.backspace());
        assert_eq!(ed.serialize(), "<p>abcd</p>");
        assert_eq!(ed.selection(), Selection::collapsed(2));
    }

    #[test]
    fn test_counts() {
        let ed = editor("<h1>Two words</h1><p>and three more</p>");
        assert_eq!(ed.word_count(), 5);
        assert_eq!(ed.estimated_reading_minutes(), 1);
        assert_eq!(Editor::new().estimated_reading_minutes(), 0);
        assert_eq!(ed.excerpt(12), "Two words an...");
    }

    #[test]
    fn test_format_sequence_round_trips() {
        let mut ed = editor("<p>The quick brown fox</p><p>jumps over</p><p>the lazy dog</p>");
        let steps = [
            (Selection::new(4, 9), FormatKind::Bold),
            (Selection::new(6, 15), FormatKind::Italic),
            (Selection::collapsed(21), FormatKind::Heading(HeadingLevel::H3)),
            (Selection::new(0, 31), FormatKind::Blockquote),
            (Selection::new(10, 12), FormatKind::Link("fox.example".into())),
            (Selection::collapsed(32), FormatKind::OrderedList),
            (Selection::collapsed(1), FormatKind::Align(Align::Right)),
            (Selection::collapsed(33), FormatKind::Table),
            (Selection::new(2, 3), FormatKind::Strike),
            (Selection::collapsed(0), FormatKind::CodeBlock),
        ];
        for (selection, kind) in &steps {
            ed.apply_format(*selection, kind);
            assert_stable(&ed);
        }
        ed.insert_text(Selection::collapsed(3), "\nnew line");
        assert_stable(&ed);
        ed.delete(Selection::new(2, 20));
        assert_stable(&ed);
    }

    #[test]
    fn test_tabs_and_carriage_returns_survive_reparse() {
        let mut ed = Editor::new();
        ed.insert_text(Selection::collapsed(0), "a\tb");
        assert_eq!(ed.serialize(), "<p>a b</p>");
        assert_stable(&ed);

        let mut ed = Editor::new();
        ed.insert_text(Selection::collapsed(0), "a\r\nb\rc");
        assert_eq!(ed.serialize(), "<p>a</p><p>b</p><p>c</p>");
        assert_stable(&ed);
    }

    #[test]
    fn test_document_structure_from_editing() {
        let mut ed = Editor::new();
        ed.insert_text(Selection::collapsed(0), "Title\nBody");
        ed.apply_format(Selection::collapsed(0), &FormatKind::Heading(HeadingLevel::H2));
        assert_eq!(
            ed.document().blocks(),
            &[
                Block::Heading {
                    level: HeadingLevel::H2,
                    text: TextBlock::plain("Title"),
                },
                Block::Paragraph(TextBlock {
                    align: Align::Left,
                    inlines: vec![Inline::text("Body")],
                }),
            ]
        );
    }
}
