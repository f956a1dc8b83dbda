//! The editing document: a block tree addressed through flat positions.
//!
//! Leaf `k` covers positions `start_k ..= start_k + len_k`, where
//! `start_{k+1} = start_k + len_k + 1`. The extra position between two leaves
//! is the virtual separator.

use std::ops::Range;

use smol_str::SmolStr;

use crate::node::{Block, Inline, Table, TextBlock};
use crate::structure::{self, LeafRole, Segment};
use crate::types::{Align, MarkKind};

/// Stand-in character for inline images when scanning for word boundaries.
const OBJECT_REPLACEMENT: char = '\u{FFFC}';

/// A position resolved to a leaf and an offset inside it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Position {
    pub leaf: usize,
    pub offset: usize,
}

/// A rich-text document. Always holds at least one leaf.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    blocks: Vec<Block>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// A document with one empty paragraph.
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::Paragraph(TextBlock::new())],
        }
    }

    /// Build a document from blocks, merging adjacent containers and
    /// dropping empty ones.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        let mut doc = Self { blocks };
        doc.normalize();
        doc
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn leaves(&self) -> impl Iterator<Item = &TextBlock> + '_ {
        self.blocks.iter().flat_map(|block| block.leaves())
    }

    pub fn leaf_count(&self) -> usize {
        self.blocks.iter().map(Block::leaf_count).sum()
    }

    pub fn leaf(&self, index: usize) -> Option<&TextBlock> {
        self.leaves().nth(index)
    }

    pub(crate) fn leaf_mut(&mut self, index: usize) -> Option<&mut TextBlock> {
        self.blocks
            .iter_mut()
            .flat_map(|block| block.leaves_mut())
            .nth(index)
    }

    /// Role of each leaf in document order.
    pub fn roles(&self) -> Vec<LeafRole> {
        structure::leaf_roles(&self.blocks)
    }

    /// Total length in positions, separators included.
    pub fn len(&self) -> usize {
        let (chars, leaves) = self
            .leaves()
            .fold((0usize, 0usize), |(chars, leaves), leaf| (chars + leaf.len(), leaves + 1));
        chars + leaves.saturating_sub(1)
    }

    /// True when no leaf holds any content.
    pub fn is_empty(&self) -> bool {
        self.leaves().all(TextBlock::is_empty)
    }

    /// First position of leaf `index`.
    pub fn leaf_start(&self, index: usize) -> usize {
        self.leaves().take(index).map(|leaf| leaf.len() + 1).sum()
    }

    /// Resolve a flat position. Positions past the end clamp to the end of
    /// the last leaf.
    pub fn resolve(&self, offset: usize) -> Position {
        let mut start = 0;
        let mut last = Position { leaf: 0, offset: 0 };
        for (i, leaf) in self.leaves().enumerate() {
            let len = leaf.len();
            if offset <= start + len {
                return Position {
                    leaf: i,
                    offset: offset - start,
                };
            }
            last = Position {
                leaf: i,
                offset: len,
            };
            start += len + 1;
        }
        last
    }

    /// Every leaf touched by `range`, with the local range inside it.
    pub fn touched(&self, range: Range<usize>) -> Vec<(usize, Range<usize>)> {
        let from = self.resolve(range.start);
        let to = self.resolve(range.end.max(range.start));
        self.leaves()
            .enumerate()
            .skip(from.leaf)
            .take(to.leaf + 1 - from.leaf)
            .map(|(i, leaf)| {
                let start = if i == from.leaf { from.offset } else { 0 };
                let end = if i == to.leaf { to.offset } else { leaf.len() };
                (i, start..end)
            })
            .collect()
    }

    /// Index of the top-level block holding leaf `leaf`.
    pub fn top_block_of(&self, leaf: usize) -> Option<usize> {
        let mut seen = 0;
        for (i, block) in self.blocks.iter().enumerate() {
            seen += block.leaf_count();
            if leaf < seen {
                return Some(i);
            }
        }
        None
    }

    /// Leaves joined by newlines, images dropped.
    pub fn plain_text(&self) -> String {
        self.leaves()
            .map(TextBlock::plain_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Expand `offset` to the whitespace-delimited word around it, staying
    /// inside its leaf.
    pub fn word_at(&self, offset: usize) -> Range<usize> {
        let at = self.resolve(offset);
        let base = self.leaf_start(at.leaf);
        let Some(leaf) = self.leaf(at.leaf) else {
            return offset..offset;
        };
        let chars: Vec<char> = leaf
            .inlines
            .iter()
            .flat_map(|inline| match inline {
                Inline::Text { text, .. } => text.chars().collect::<Vec<_>>(),
                Inline::Image { .. } => vec![OBJECT_REPLACEMENT],
            })
            .collect();
        let is_boundary = |c: char| c.is_whitespace() || c == OBJECT_REPLACEMENT;

        let mut start = 0;
        for i in (0..at.offset).rev() {
            if is_boundary(chars[i]) {
                start = i + 1;
                break;
            }
        }
        let mut end = chars.len();
        for (i, c) in chars.iter().enumerate().skip(at.offset) {
            if is_boundary(*c) {
                end = i;
                break;
            }
        }
        base + start..base + end
    }

    /// Replace `range` with `text` and return the cursor after the insertion.
    ///
    /// A `\n` splits the leaf. Inside table cells it becomes a space.
    /// `\r\n` and `\r` count as `\n`; a tab becomes a space.
    pub fn insert_text(&mut self, range: Range<usize>, text: &str) -> usize {
        let start = range.start.min(self.len());
        if range.end > start {
            self.delete(start..range.end);
        }
        if text.is_empty() {
            return start;
        }
        let text = text.replace("\r\n", "\n").replace('\r', "\n").replace('\t', " ");
        let text = text.as_str();
        let inserted = text.chars().count();
        let at = self.resolve(start);
        let role = self
            .roles()
            .get(at.leaf)
            .copied()
            .unwrap_or(LeafRole::Paragraph);

        if role == LeafRole::Cell || !text.contains('\n') {
            let flat = text.replace('\n', " ");
            if let Some(leaf) = self.leaf_mut(at.leaf) {
                leaf.insert_text(at.offset, &flat);
            }
            return start + inserted;
        }

        let parts: Vec<usize> = text.split('\n').map(|part| part.chars().count()).collect();
        let joined: String = text.split('\n').collect();
        self.restructure(|segments| {
            let Some((seg, _)) = structure::locate(segments, at.leaf) else {
                return;
            };
            let Segment::Leaf(role, leaf) = &mut segments[seg] else {
                return;
            };
            let role = *role;
            let at_end = at.offset == leaf.len();
            leaf.insert_text(at.offset, &joined);

            let mut rest = leaf.split_off(at.offset + parts[0]);
            let mut tails = Vec::with_capacity(parts.len() - 1);
            for len in &parts[1..parts.len() - 1] {
                let next = rest.split_off(*len);
                tails.push(rest);
                rest = next;
            }
            tails.push(rest);

            // Enter at the end of a heading continues with a paragraph.
            let tail_role = match role {
                LeafRole::Heading(_) if at_end => LeafRole::Paragraph,
                other => other,
            };
            segments.splice(
                seg + 1..seg + 1,
                tails.into_iter().map(|tail| Segment::Leaf(tail_role, tail)),
            );
        });
        start + inserted
    }

    /// Remove `range`, merging the boundary leaves. Ranges that touch a table
    /// only clear content and never merge cells.
    pub fn delete(&mut self, range: Range<usize>) -> bool {
        let len = self.len();
        let range = range.start.min(len)..range.end.min(len);
        if range.start >= range.end {
            return false;
        }
        let from = self.resolve(range.start);
        let to = self.resolve(range.end);
        if from.leaf == to.leaf {
            if let Some(leaf) = self.leaf_mut(from.leaf) {
                leaf.remove_range(from.offset..to.offset);
            }
            return true;
        }

        let roles = self.roles();
        if roles[from.leaf..=to.leaf].contains(&LeafRole::Cell) {
            for (i, local) in self.touched(range) {
                if let Some(leaf) = self.leaf_mut(i) {
                    leaf.remove_range(local);
                }
            }
            return true;
        }

        self.restructure(|segments| {
            let Some((first, _)) = structure::locate(segments, from.leaf) else {
                return;
            };
            let last = first + (to.leaf - from.leaf);
            let mut removed: Vec<Segment> = segments.drain(first + 1..=last).collect();
            let tail = match removed.pop() {
                Some(Segment::Leaf(_, mut leaf)) => leaf.split_off(to.offset),
                _ => TextBlock::new(),
            };
            if let Segment::Leaf(_, leaf) = &mut segments[first] {
                let end = leaf.len();
                leaf.remove_range(from.offset..end);
                leaf.append(tail);
            }
        });
        true
    }

    /// Insert an inline node. Code lines refuse images.
    pub(crate) fn insert_inline(&mut self, offset: usize, inline: Inline) -> bool {
        let at = self.resolve(offset);
        if self.roles().get(at.leaf) == Some(&LeafRole::Code) {
            return false;
        }
        match self.leaf_mut(at.leaf) {
            Some(leaf) => {
                leaf.insert_inline(at.offset, inline);
                true
            }
            None => false,
        }
    }

    /// Flip `kind` over the text in `range`: removed when every run already
    /// has it, added otherwise. Code lines are skipped.
    pub(crate) fn toggle_mark(&mut self, range: Range<usize>, kind: MarkKind) -> bool {
        let targets = self.text_targets(range);
        let mut any = false;
        let mut all = true;
        for (i, local) in &targets {
            if let Some(leaf) = self.leaf(*i) {
                for marks in leaf.marks_in(local.clone()) {
                    any = true;
                    all &= marks.has(kind);
                }
            }
        }
        if !any {
            return false;
        }
        let on = !all;
        for (i, local) in targets {
            if let Some(leaf) = self.leaf_mut(i) {
                leaf.update_marks(local, |marks| marks.set(kind, on));
            }
        }
        true
    }

    /// Set or clear the link mark over `range`. Other marks are untouched.
    pub(crate) fn set_link_mark(&mut self, range: Range<usize>, href: Option<&str>) -> bool {
        let targets = self.text_targets(range);
        if targets.is_empty() {
            return false;
        }
        let href = href.map(SmolStr::new);
        for (i, local) in targets {
            if let Some(leaf) = self.leaf_mut(i) {
                leaf.update_marks(local, |marks| marks.link = href.clone());
            }
        }
        true
    }

    /// The link shared by every text run in `range`, if there is one.
    pub fn link_in(&self, range: Range<usize>) -> Option<SmolStr> {
        let mut shared: Option<&SmolStr> = None;
        for (i, local) in self.text_targets(range) {
            let leaf = self.leaf(i)?;
            for marks in leaf.marks_in(local) {
                let link = marks.link.as_ref()?;
                match shared {
                    Some(prev) if prev != link => return None,
                    _ => shared = Some(link),
                }
            }
        }
        shared.cloned()
    }

    /// Whether every text run in `range` carries `kind`.
    pub fn has_mark(&self, range: Range<usize>, kind: MarkKind) -> bool {
        let mut any = false;
        for (i, local) in self.text_targets(range) {
            let Some(leaf) = self.leaf(i) else {
                return false;
            };
            for marks in leaf.marks_in(local) {
                if !marks.has(kind) {
                    return false;
                }
                any = true;
            }
        }
        any
    }

    fn text_targets(&self, range: Range<usize>) -> Vec<(usize, Range<usize>)> {
        let roles = self.roles();
        self.touched(range)
            .into_iter()
            .filter(|(i, local)| roles[*i] != LeafRole::Code && local.start < local.end)
            .collect()
    }

    /// Convert every leaf touched by `range` to `role`, or back to paragraphs
    /// when they all have it already. Table cells are left alone.
    pub(crate) fn toggle_role(&mut self, range: Range<usize>, role: LeafRole) -> bool {
        let roles = self.roles();
        let targets: Vec<usize> = self
            .touched(range)
            .into_iter()
            .map(|(i, _)| i)
            .filter(|i| roles[*i] != LeafRole::Cell)
            .collect();
        if targets.is_empty() {
            return false;
        }
        let target = if targets.iter().all(|i| roles[*i] == role) {
            LeafRole::Paragraph
        } else {
            role
        };
        self.restructure(|segments| {
            for leaf in &targets {
                if let Some((seg, _)) = structure::locate(segments, *leaf) {
                    if let Segment::Leaf(current, _) = &mut segments[seg] {
                        *current = target;
                    }
                }
            }
        });
        true
    }

    /// Set alignment on touched paragraphs and headings. Reapplying the
    /// alignment they all have resets them to left.
    pub(crate) fn toggle_align(&mut self, range: Range<usize>, align: Align) -> bool {
        let roles = self.roles();
        let targets: Vec<usize> = self
            .touched(range)
            .into_iter()
            .map(|(i, _)| i)
            .filter(|i| roles[*i].alignable())
            .collect();
        if targets.is_empty() {
            return false;
        }
        let all_set = targets
            .iter()
            .all(|i| self.leaf(*i).map(|leaf| leaf.align) == Some(align));
        let next = if all_set { Align::Left } else { align };
        for i in targets {
            if let Some(leaf) = self.leaf_mut(i) {
                leaf.align = next;
            }
        }
        true
    }

    /// Insert a 3x3 table after the block holding `cursor`, or delete the
    /// table when the cursor is inside one.
    pub(crate) fn toggle_table(&mut self, cursor: usize) -> bool {
        let at = self.resolve(cursor);
        let Some(top) = self.top_block_of(at.leaf) else {
            return false;
        };
        if self.blocks[top].is_table() {
            self.blocks.remove(top);
        } else {
            self.blocks
                .insert(top + 1, Block::Table(Table::empty(3, 3)));
        }
        self.normalize();
        true
    }

    fn restructure(&mut self, edit: impl FnOnce(&mut Vec<Segment>)) {
        let mut segments = structure::flatten(std::mem::take(&mut self.blocks));
        edit(&mut segments);
        self.blocks = structure::regroup(segments);
        self.normalize();
    }

    fn normalize(&mut self) {
        self.blocks = structure::regroup(structure::flatten(std::mem::take(&mut self.blocks)));
        for block in &mut self.blocks {
            for leaf in block.leaves_mut() {
                leaf.normalize();
            }
        }
        if self.blocks.is_empty() {
            self.blocks.push(Block::Paragraph(TextBlock::new()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HeadingLevel, ListKind};

    fn paragraphs(texts: &[&str]) -> Document {
        Document::from_blocks(texts.iter().map(|t| Block::paragraph(*t)).collect())
    }

    fn texts(doc: &Document) -> Vec<String> {
        doc.leaves().map(TextBlock::plain_text).collect()
    }

    #[test]
    fn test_empty_document_has_one_paragraph() {
        let doc = Document::from_blocks(Vec::new());
        assert_eq!(doc.blocks(), &[Block::Paragraph(TextBlock::new())]);
        assert_eq!(doc.len(), 0);
        assert!(doc.is_empty());
    }

    #[test]
    fn test_resolve_positions() {
        let doc = paragraphs(&["ab", "cde"]);
        assert_eq!(doc.len(), 6);
        assert_eq!(doc.resolve(2), Position { leaf: 0, offset: 2 });
        assert_eq!(doc.resolve(3), Position { leaf: 1, offset: 0 });
        assert_eq!(doc.resolve(6), Position { leaf: 1, offset: 3 });
        assert_eq!(doc.resolve(99), Position { leaf: 1, offset: 3 });
        assert_eq!(doc.leaf_start(1), 3);
    }

    #[test]
    fn test_word_at_expands_cursor() {
        let doc = paragraphs(&["hello brave world"]);
        assert_eq!(doc.word_at(8), 6..11);
        assert_eq!(doc.word_at(0), 0..5);
        assert_eq!(doc.word_at(17), 12..17);
    }

    #[test]
    fn test_enter_splits_paragraph() {
        let mut doc = paragraphs(&["hello world"]);
        let cursor = doc.insert_text(5..5, "\n");
        assert_eq!(cursor, 6);
        assert_eq!(texts(&doc), vec!["hello", " world"]);
    }

    #[test]
    fn test_enter_at_heading_end_starts_paragraph() {
        let mut doc = Document::from_blocks(vec![Block::Heading {
            level: HeadingLevel::H1,
            text: TextBlock::plain("Title"),
        }]);
        let cursor = doc.insert_text(5..5, "\nbody");
        assert_eq!(cursor, 10);
        assert!(matches!(doc.blocks()[0], Block::Heading { .. }));
        assert_eq!(doc.blocks()[1], Block::paragraph("body"));
    }

    #[test]
    fn test_enter_inside_list_adds_item() {
        let mut doc = Document::from_blocks(vec![Block::List {
            kind: ListKind::Bullet,
            items: vec![TextBlock::plain("onetwo")],
        }]);
        doc.insert_text(3..3, "\n");
        assert_eq!(doc.blocks().len(), 1);
        assert_eq!(texts(&doc), vec!["one", "two"]);
    }

    #[test]
    fn test_insert_replaces_selection() {
        let mut doc = paragraphs(&["hello world"]);
        let cursor = doc.insert_text(6..11, "there");
        assert_eq!(cursor, 11);
        assert_eq!(doc.plain_text(), "hello there");
    }

    #[test]
    fn test_delete_merges_leaves() {
        let mut doc = paragraphs(&["hello", "world"]);
        assert!(doc.delete(3..8));
        assert_eq!(texts(&doc), vec!["helrld"]);
    }

    #[test]
    fn test_delete_separator_joins_item_into_paragraph() {
        let mut doc = Document::from_blocks(vec![
            Block::paragraph("a"),
            Block::List {
                kind: ListKind::Ordered,
                items: vec![TextBlock::plain("b")],
            },
        ]);
        assert!(doc.delete(1..2));
        assert_eq!(doc.blocks(), &[Block::paragraph("ab")]);
    }

    #[test]
    fn test_delete_across_table_only_clears() {
        let cell = |t: &str| TextBlock::plain(t);
        let mut doc = Document::from_blocks(vec![
            Block::paragraph("a"),
            Block::Table(Table {
                rows: vec![vec![cell("x"), cell("y")], vec![cell("z"), cell("w")]],
            }),
        ]);
        assert!(doc.delete(3..7));
        assert_eq!(texts(&doc), vec!["a", "x", "", "", "w"]);
        assert_eq!(doc.leaf_count(), 5);
    }

    #[test]
    fn test_collapsed_delete_is_noop() {
        let mut doc = paragraphs(&["abc"]);
        assert!(!doc.delete(2..2));
        assert!(!doc.delete(10..12));
    }

    #[test]
    fn test_newline_in_cell_becomes_space() {
        let mut doc = Document::from_blocks(vec![Block::Table(Table::empty(1, 1))]);
        doc.insert_text(0..0, "a\nb");
        assert_eq!(texts(&doc), vec!["a b"]);
    }
}
