//! Block restructuring.
//!
//! Block-level edits (turning paragraphs into list items, splitting a leaf on
//! Enter, merging leaves on delete) all run through the same two steps: flatten
//! the block tree into one segment per leaf, edit the segments, then regroup
//! adjacent leaves of the same container kind back into containers. Tables are
//! carried through as a single opaque segment.

use crate::node::{Block, Table, TextBlock};
use crate::types::{Align, HeadingLevel, ListKind};

/// What kind of block a leaf belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeafRole {
    Paragraph,
    Heading(HeadingLevel),
    Item(ListKind),
    Quote,
    Code,
    /// Table cell. Never produced by a conversion.
    Cell,
}

impl LeafRole {
    /// Whether this leaf can carry an alignment.
    pub fn alignable(self) -> bool {
        matches!(self, LeafRole::Paragraph | LeafRole::Heading(_))
    }
}

pub(crate) enum Segment {
    Leaf(LeafRole, TextBlock),
    Table(Table),
}

impl Segment {
    fn leaf_count(&self) -> usize {
        match self {
            Segment::Leaf(..) => 1,
            Segment::Table(table) => table.cell_count(),
        }
    }
}

/// Role of every leaf, in document order.
pub fn leaf_roles(blocks: &[Block]) -> Vec<LeafRole> {
    let mut roles = Vec::new();
    for block in blocks {
        let role = match block {
            Block::Paragraph(_) => LeafRole::Paragraph,
            Block::Heading { level, .. } => LeafRole::Heading(*level),
            Block::List { kind, .. } => LeafRole::Item(*kind),
            Block::Blockquote(_) => LeafRole::Quote,
            Block::CodeBlock(_) => LeafRole::Code,
            Block::Table(_) => LeafRole::Cell,
        };
        roles.extend(std::iter::repeat_n(role, block.leaf_count()));
    }
    roles
}

pub(crate) fn flatten(blocks: Vec<Block>) -> Vec<Segment> {
    let mut segments = Vec::new();
    for block in blocks {
        match block {
            Block::Paragraph(text) => segments.push(Segment::Leaf(LeafRole::Paragraph, text)),
            Block::Heading { level, text } => {
                segments.push(Segment::Leaf(LeafRole::Heading(level), text))
            }
            Block::List { kind, items } => segments.extend(
                items
                    .into_iter()
                    .map(|item| Segment::Leaf(LeafRole::Item(kind), item)),
            ),
            Block::Blockquote(items) => segments.extend(
                items
                    .into_iter()
                    .map(|item| Segment::Leaf(LeafRole::Quote, item)),
            ),
            Block::CodeBlock(lines) => segments.extend(
                lines
                    .into_iter()
                    .map(|line| Segment::Leaf(LeafRole::Code, line)),
            ),
            Block::Table(table) => segments.push(Segment::Table(table)),
        }
    }
    segments
}

pub(crate) fn regroup(segments: Vec<Segment>) -> Vec<Block> {
    let mut out: Vec<Block> = Vec::with_capacity(segments.len());
    for segment in segments {
        let (role, mut leaf) = match segment {
            Segment::Table(mut table) => {
                table.rows.retain(|row| !row.is_empty());
                if table.cell_count() > 0 {
                    out.push(Block::Table(table));
                }
                continue;
            }
            Segment::Leaf(role, leaf) => (role, leaf),
        };
        if !role.alignable() {
            leaf.align = Align::Left;
        }
        match role {
            LeafRole::Paragraph | LeafRole::Cell => out.push(Block::Paragraph(leaf)),
            LeafRole::Heading(level) => out.push(Block::Heading { level, text: leaf }),
            LeafRole::Item(kind) => match out.last_mut() {
                Some(Block::List { kind: last, items }) if *last == kind => items.push(leaf),
                _ => out.push(Block::List {
                    kind,
                    items: vec![leaf],
                }),
            },
            LeafRole::Quote => match out.last_mut() {
                Some(Block::Blockquote(items)) => items.push(leaf),
                _ => out.push(Block::Blockquote(vec![leaf])),
            },
            LeafRole::Code => {
                leaf.strip_to_plain();
                match out.last_mut() {
                    Some(Block::CodeBlock(lines)) => lines.push(leaf),
                    _ => out.push(Block::CodeBlock(vec![leaf])),
                }
            }
        }
    }
    out
}

/// Index of the segment holding leaf `leaf`, plus the leaf's offset inside a
/// table segment.
pub(crate) fn locate(segments: &[Segment], leaf: usize) -> Option<(usize, usize)> {
    let mut seen = 0;
    for (i, segment) in segments.iter().enumerate() {
        let count = segment.leaf_count();
        if leaf < seen + count {
            return Some((i, leaf - seen));
        }
        seen += count;
    }
    None
}
