//! Document node tree: blocks, leaf text blocks, inline runs and marks.
//!
//! Every `TextBlock` is a *leaf*: the unit that holds inline content and the unit
//! positions are measured against. Containers (lists, quotes, code blocks,
//! tables) own their leaves directly and never nest further.

use std::ops::Range;

use smol_str::SmolStr;

use crate::types::{Align, HeadingLevel, ListKind, MarkKind};

/// Inline marks carried by a text run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Marks {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    /// Link target, already normalized.
    pub link: Option<SmolStr>,
}

impl Marks {
    pub fn has(&self, kind: MarkKind) -> bool {
        match kind {
            MarkKind::Bold => self.bold,
            MarkKind::Italic => self.italic,
            MarkKind::Underline => self.underline,
            MarkKind::Strike => self.strike,
        }
    }

    pub fn set(&mut self, kind: MarkKind, on: bool) {
        match kind {
            MarkKind::Bold => self.bold = on,
            MarkKind::Italic => self.italic = on,
            MarkKind::Underline => self.underline = on,
            MarkKind::Strike => self.strike = on,
        }
    }

    pub fn is_plain(&self) -> bool {
        *self == Marks::default()
    }
}

/// Inline content of a leaf.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inline {
    Text { text: String, marks: Marks },
    /// An inline image. Occupies one position.
    Image { src: String, alt: String },
}

impl Inline {
    pub fn text(text: impl Into<String>) -> Self {
        Inline::Text {
            text: text.into(),
            marks: Marks::default(),
        }
    }

    pub fn styled(text: impl Into<String>, marks: Marks) -> Self {
        Inline::Text {
            text: text.into(),
            marks,
        }
    }

    /// Length in positions.
    pub fn len(&self) -> usize {
        match self {
            Inline::Text { text, .. } => text.chars().count(),
            Inline::Image { .. } => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A leaf holding inline content.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextBlock {
    pub align: Align,
    pub inlines: Vec<Inline>,
}

impl TextBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plain(text: impl Into<String>) -> Self {
        let text = text.into();
        let inlines = if text.is_empty() {
            Vec::new()
        } else {
            vec![Inline::text(text)]
        };
        Self {
            align: Align::Left,
            inlines,
        }
    }

    pub fn with_align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    /// Length in positions.
    pub fn len(&self) -> usize {
        self.inlines.iter().map(Inline::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Text content with images dropped.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for inline in &self.inlines {
            if let Inline::Text { text, .. } = inline {
                out.push_str(text);
            }
        }
        out
    }

    /// Merge adjacent text runs with identical marks and drop empty runs.
    pub fn normalize(&mut self) {
        let mut merged: Vec<Inline> = Vec::with_capacity(self.inlines.len());
        for inline in self.inlines.drain(..) {
            match inline {
                Inline::Text { text, .. } if text.is_empty() => {}
                Inline::Text { text, marks } => match merged.last_mut() {
                    Some(Inline::Text {
                        text: prev,
                        marks: prev_marks,
                    }) if *prev_marks == marks => prev.push_str(&text),
                    _ => merged.push(Inline::Text { text, marks }),
                },
                image => merged.push(image),
            }
        }
        self.inlines = merged;
    }

    /// Ensure an inline boundary exists at `offset`, returning the index of the
    /// first inline at or after it.
    pub(crate) fn split_at(&mut self, offset: usize) -> usize {
        let mut pos = 0;
        for i in 0..self.inlines.len() {
            if pos == offset {
                return i;
            }
            let len = self.inlines[i].len();
            if offset < pos + len {
                if let Inline::Text { text, marks } = &mut self.inlines[i] {
                    let at = byte_index(text, offset - pos);
                    let tail = text.split_off(at);
                    let marks = marks.clone();
                    self.inlines.insert(i + 1, Inline::Text { text: tail, marks });
                }
                return i + 1;
            }
            pos += len;
        }
        self.inlines.len()
    }

    /// Split inlines so that `range` maps to a whole number of inlines, and
    /// return their index range.
    pub(crate) fn isolate(&mut self, range: Range<usize>) -> Range<usize> {
        let start = self.split_at(range.start);
        let end = self.split_at(range.end);
        start..end
    }

    /// Cut everything from `offset` on into a new leaf with the same alignment.
    pub fn split_off(&mut self, offset: usize) -> TextBlock {
        let idx = self.split_at(offset.min(self.len()));
        let tail = self.inlines.split_off(idx);
        self.normalize();
        let mut block = TextBlock {
            align: self.align,
            inlines: tail,
        };
        block.normalize();
        block
    }

    /// Append another leaf's content.
    pub fn append(&mut self, other: TextBlock) {
        self.inlines.extend(other.inlines);
        self.normalize();
    }

    /// Remove a local range.
    pub fn remove_range(&mut self, range: Range<usize>) {
        let len = self.len();
        let range = range.start.min(len)..range.end.min(len);
        if range.start >= range.end {
            return;
        }
        let span = self.isolate(range);
        self.inlines.drain(span);
        self.normalize();
    }

    /// Insert plain text at `offset`. The new text takes the marks of the run
    /// before it, or of the run after it at the start of the leaf.
    pub fn insert_text(&mut self, offset: usize, text: &str) {
        if text.is_empty() {
            return;
        }
        let offset = offset.min(self.len());
        let idx = self.split_at(offset);
        let marks = self.inherited_marks(idx);
        self.inlines.insert(idx, Inline::styled(text, marks));
        self.normalize();
    }

    /// Insert an inline node at `offset`.
    pub fn insert_inline(&mut self, offset: usize, inline: Inline) {
        let offset = offset.min(self.len());
        let idx = self.split_at(offset);
        self.inlines.insert(idx, inline);
        self.normalize();
    }

    fn inherited_marks(&self, idx: usize) -> Marks {
        let before = idx.checked_sub(1).and_then(|i| self.inlines.get(i));
        match (before, self.inlines.get(idx)) {
            (Some(Inline::Text { marks, .. }), _) => marks.clone(),
            (None, Some(Inline::Text { marks, .. })) => marks.clone(),
            _ => Marks::default(),
        }
    }

    /// Marks of every text run intersecting `range`.
    pub fn marks_in(&self, range: Range<usize>) -> Vec<&Marks> {
        let mut out = Vec::new();
        let mut pos = 0;
        for inline in &self.inlines {
            let len = inline.len();
            if let Inline::Text { marks, .. } = inline {
                if len > 0 && pos < range.end && pos + len > range.start {
                    out.push(marks);
                }
            }
            pos += len;
        }
        out
    }

    /// Apply `f` to the marks of every text run inside `range`.
    pub(crate) fn update_marks(&mut self, range: Range<usize>, mut f: impl FnMut(&mut Marks)) {
        let len = self.len();
        let range = range.start.min(len)..range.end.min(len);
        if range.start >= range.end {
            return;
        }
        let span = self.isolate(range);
        for inline in &mut self.inlines[span] {
            if let Inline::Text { marks, .. } = inline {
                f(marks);
            }
        }
        self.normalize();
    }

    /// Drop marks and images, keeping only text. Used for code lines.
    pub(crate) fn strip_to_plain(&mut self) {
        let text = self.plain_text();
        self.inlines = if text.is_empty() {
            Vec::new()
        } else {
            vec![Inline::text(text)]
        };
        self.align = Align::Left;
    }
}

/// A table; the first row renders as header cells.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<Vec<TextBlock>>,
}

impl Table {
    pub fn empty(rows: usize, cols: usize) -> Self {
        Self {
            rows: (0..rows)
                .map(|_| (0..cols).map(|_| TextBlock::new()).collect())
                .collect(),
        }
    }

    pub fn cell_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }
}

/// Top-level document block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    Paragraph(TextBlock),
    Heading { level: HeadingLevel, text: TextBlock },
    List { kind: ListKind, items: Vec<TextBlock> },
    Blockquote(Vec<TextBlock>),
    /// One leaf per code line. Code leaves carry no marks.
    CodeBlock(Vec<TextBlock>),
    Table(Table),
}

impl Block {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Block::Paragraph(TextBlock::plain(text))
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            Block::Paragraph(_) | Block::Heading { .. } => 1,
            Block::List { items, .. } => items.len(),
            Block::Blockquote(items) | Block::CodeBlock(items) => items.len(),
            Block::Table(table) => table.cell_count(),
        }
    }

    pub fn leaves(&self) -> Box<dyn Iterator<Item = &TextBlock> + '_> {
        match self {
            Block::Paragraph(text) | Block::Heading { text, .. } => {
                Box::new(std::iter::once(text))
            }
            Block::List { items, .. } | Block::Blockquote(items) | Block::CodeBlock(items) => {
                Box::new(items.iter())
            }
            Block::Table(table) => Box::new(table.rows.iter().flat_map(|row| row.iter())),
        }
    }

    pub fn leaves_mut(&mut self) -> Box<dyn Iterator<Item = &mut TextBlock> + '_> {
        match self {
            Block::Paragraph(text) | Block::Heading { text, .. } => {
                Box::new(std::iter::once(text))
            }
            Block::List { items, .. } | Block::Blockquote(items) | Block::CodeBlock(items) => {
                Box::new(items.iter_mut())
            }
            Block::Table(table) => {
                Box::new(table.rows.iter_mut().flat_map(|row| row.iter_mut()))
            }
        }
    }

    pub fn is_code(&self) -> bool {
        matches!(self, Block::CodeBlock(_))
    }

    pub fn is_table(&self) -> bool {
        matches!(self, Block::Table(_))
    }
}

/// Byte index of the `char_offset`-th char, or the string length past the end.
pub(crate) fn byte_index(s: &str, char_offset: usize) -> usize {
    s.char_indices()
        .nth(char_offset)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bold() -> Marks {
        Marks {
            bold: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_split_at_inside_run() {
        let mut block = TextBlock::plain("héllo");
        let idx = block.split_at(2);
        assert_eq!(idx, 1);
        assert_eq!(block.inlines, vec![Inline::text("hé"), Inline::text("llo")]);
    }

    #[test]
    fn test_normalize_merges_equal_marks() {
        let mut block = TextBlock {
            align: Align::Left,
            inlines: vec![
                Inline::styled("a", bold()),
                Inline::styled("", Marks::default()),
                Inline::styled("b", bold()),
                Inline::text("c"),
            ],
        };
        block.normalize();
        assert_eq!(
            block.inlines,
            vec![Inline::styled("ab", bold()), Inline::text("c")]
        );
    }

    #[test]
    fn test_insert_text_inherits_previous_marks() {
        let mut block = TextBlock {
            align: Align::Left,
            inlines: vec![Inline::styled("bold", bold()), Inline::text(" plain")],
        };
        block.insert_text(4, "er");
        assert_eq!(block.inlines[0], Inline::styled("bolder", bold()));
        assert_eq!(block.plain_text(), "bolder plain");
    }

    #[test]
    fn test_remove_range_across_runs() {
        let mut block = TextBlock {
            align: Align::Left,
            inlines: vec![Inline::styled("abc", bold()), Inline::text("def")],
        };
        block.remove_range(2..4);
        assert_eq!(
            block.inlines,
            vec![Inline::styled("ab", bold()), Inline::text("ef")]
        );
    }

    #[test]
    fn test_image_counts_one_position() {
        let mut block = TextBlock::plain("ab");
        block.insert_inline(
            1,
            Inline::Image {
                src: "x.png".into(),
                alt: String::new(),
            },
        );
        assert_eq!(block.len(), 3);
        assert_eq!(block.plain_text(), "ab");
    }

    #[test]
    fn test_split_off_keeps_align() {
        let mut block = TextBlock::plain("hello world").with_align(Align::Center);
        let tail = block.split_off(5);
        assert_eq!(block.plain_text(), "hello");
        assert_eq!(tail.plain_text(), " world");
        assert_eq!(tail.align, Align::Center);
    }
}
