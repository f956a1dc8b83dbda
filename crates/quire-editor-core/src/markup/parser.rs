//! HTML markup to document.
//!
//! A small tolerant tokenizer feeds a minimal element tree, which is then
//! lowered into blocks. Unknown elements are transparent, unmatched end tags
//! are dropped, and unclosed elements close at end of input.

use crate::document::Document;
use crate::node::{Block, Inline, Marks, Table, TextBlock};
use crate::types::{Align, HeadingLevel, ListKind};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "wbr",
];

const BLOCK_ELEMENTS: &[&str] = &[
    "p",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "ul",
    "ol",
    "blockquote",
    "pre",
    "table",
    "div",
    "section",
    "article",
    "header",
    "footer",
    "main",
    "hr",
];

/// Parse markup into a document.
///
/// Input without any tags is treated as plain text: one paragraph per
/// non-blank line.
pub fn parse(markup: &str) -> Document {
    if !looks_like_markup(markup) {
        return Document::from_blocks(
            markup
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(Block::paragraph)
                .collect(),
        );
    }
    let nodes = build_tree(Tokenizer::new(markup));
    Document::from_blocks(lower_blocks(&nodes))
}

fn looks_like_markup(input: &str) -> bool {
    input.match_indices('<').any(|(i, _)| {
        input[i + 1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '/' || c == '!')
    })
}

#[derive(Debug, PartialEq)]
enum Token {
    Start {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    End(String),
    Text(String),
}

struct Tokenizer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_past(&mut self, pattern: &str) {
        match self.rest().find(pattern) {
            Some(i) => self.pos += i + pattern.len(),
            None => self.pos = self.src.len(),
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn take_while(&mut self, mut pred: impl FnMut(char) -> bool) -> &'a str {
        let rest = self.rest();
        let end = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += end;
        &rest[..end]
    }

    fn tag_name(&mut self) -> String {
        self.take_while(|c| c.is_ascii_alphanumeric() || c == '-' || c == ':')
            .to_ascii_lowercase()
    }

    fn start_tag(&mut self) -> Token {
        self.pos += 1;
        let name = self.tag_name();
        let mut attrs = Vec::new();
        let mut self_closing = false;
        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                break;
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                self_closing = true;
                break;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break;
            }
            if rest.starts_with('/') {
                self.pos += 1;
                continue;
            }
            let attr = self
                .take_while(|c| !c.is_whitespace() && c != '=' && c != '>' && c != '/')
                .to_ascii_lowercase();
            if attr.is_empty() {
                // Stray character, e.g. a quote. Skip it.
                self.pos += rest.chars().next().map_or(1, char::len_utf8);
                continue;
            }
            self.skip_whitespace();
            let mut value = String::new();
            if self.rest().starts_with('=') {
                self.pos += 1;
                self.skip_whitespace();
                value = match self.rest().chars().next() {
                    Some(quote @ ('"' | '\'')) => {
                        self.pos += 1;
                        let raw = self.take_while(|c| c != quote);
                        self.pos = (self.pos + 1).min(self.src.len());
                        decode_entities(raw)
                    }
                    _ => decode_entities(self.take_while(|c| !c.is_whitespace() && c != '>')),
                };
            }
            attrs.push((attr, value));
        }
        Token::Start {
            name,
            attrs,
            self_closing,
        }
    }

    fn end_tag(&mut self) -> Token {
        self.pos += 2;
        let name = self.tag_name();
        self.skip_past(">");
        Token::End(name)
    }

    fn text(&mut self) -> Token {
        let rest = self.rest();
        // Always consume at least the first char so a stray `<` makes progress.
        let first = rest.chars().next().map_or(0, char::len_utf8);
        let end = rest[first..]
            .find('<')
            .map_or(rest.len(), |i| i + first);
        self.pos += end;
        Token::Text(decode_entities(&rest[..end]))
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            let rest = self.rest();
            if rest.is_empty() {
                return None;
            }
            if rest.starts_with("<!--") {
                self.skip_past("-->");
                continue;
            }
            if rest.starts_with("<!") || rest.starts_with("<?") {
                self.skip_past(">");
                continue;
            }
            let mut chars = rest.chars().skip(1);
            let token = match (rest.starts_with('<'), chars.next(), chars.next()) {
                (true, Some('/'), Some(c)) if c.is_ascii_alphabetic() => self.end_tag(),
                (true, Some(c), _) if c.is_ascii_alphabetic() => self.start_tag(),
                _ => self.text(),
            };
            return Some(token);
        }
    }
}

/// Decode the character references an editor emits, plus numeric ones.
/// Unknown references are left as written.
pub(crate) fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(i) = rest.find('&') {
        out.push_str(&rest[..i]);
        rest = &rest[i..];
        let decoded = rest
            .find(';')
            .filter(|end| *end <= 12)
            .and_then(|end| entity(&rest[1..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[derive(Debug, Default)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn has_block_child(&self) -> bool {
        self.children.iter().any(|child| match child {
            Node::Element(el) => is_block(&el.name),
            Node::Text(_) => false,
        })
    }
}

#[derive(Debug)]
enum Node {
    Element(Element),
    Text(String),
}

fn is_block(name: &str) -> bool {
    BLOCK_ELEMENTS.contains(&name)
}

fn build_tree(tokens: impl Iterator<Item = Token>) -> Vec<Node> {
    let mut stack = vec![Element::default()];
    for token in tokens {
        match token {
            Token::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    top.children.push(Node::Text(text));
                }
            }
            Token::Start {
                name,
                attrs,
                self_closing,
            } => {
                // A block start implicitly closes an open paragraph, and a new
                // item closes the previous one.
                let closes_top = stack.last().is_some_and(|top| {
                    (top.name == "p" && is_block(&name)) || (top.name == "li" && name == "li")
                });
                if closes_top && stack.len() > 1 {
                    close_top(&mut stack);
                }
                let element = Element {
                    name,
                    attrs,
                    children: Vec::new(),
                };
                if self_closing || VOID_ELEMENTS.contains(&element.name.as_str()) {
                    if let Some(top) = stack.last_mut() {
                        top.children.push(Node::Element(element));
                    }
                } else {
                    stack.push(element);
                }
            }
            Token::End(name) => {
                let open = stack.iter().skip(1).rposition(|el| el.name == name);
                if let Some(depth) = open {
                    while stack.len() > depth + 1 {
                        close_top(&mut stack);
                    }
                }
            }
        }
    }
    while stack.len() > 1 {
        close_top(&mut stack);
    }
    stack.pop().map(|root| root.children).unwrap_or_default()
}

fn close_top(stack: &mut Vec<Element>) {
    if let Some(element) = stack.pop() {
        if let Some(parent) = stack.last_mut() {
            parent.children.push(Node::Element(element));
        }
    }
}

fn lower_blocks(nodes: &[Node]) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut pending = TextBlock::new();
    for node in nodes {
        match node {
            Node::Text(text) if text.trim().is_empty() && pending.is_empty() => {}
            Node::Element(el) if is_block(&el.name) => {
                flush_pending(&mut blocks, &mut pending);
                lower_block(el, &mut blocks);
            }
            _ => collect_inline(node, &Marks::default(), &mut pending, false),
        }
    }
    flush_pending(&mut blocks, &mut pending);
    blocks
}

fn flush_pending(blocks: &mut Vec<Block>, pending: &mut TextBlock) {
    let leaf = std::mem::take(pending);
    if !leaf.plain_text().trim().is_empty() || leaf.inlines.iter().any(is_image) {
        blocks.push(Block::Paragraph(leaf));
    }
}

fn is_image(inline: &Inline) -> bool {
    matches!(inline, Inline::Image { .. })
}

fn lower_block(el: &Element, blocks: &mut Vec<Block>) {
    match el.name.as_str() {
        "p" => blocks.push(Block::Paragraph(leaf_from(el))),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = el.name[1..]
                .parse()
                .ok()
                .and_then(HeadingLevel::new)
                .unwrap_or(HeadingLevel::H1);
            blocks.push(Block::Heading {
                level,
                text: leaf_from(el),
            });
        }
        "ul" | "ol" => {
            let kind = if el.name == "ol" {
                ListKind::Ordered
            } else {
                ListKind::Bullet
            };
            let mut items = Vec::new();
            list_items(el, &mut items);
            blocks.push(Block::List { kind, items });
        }
        "blockquote" => {
            let items = lower_blocks(&el.children)
                .into_iter()
                .flat_map(|block| block.leaves().cloned().collect::<Vec<_>>())
                .collect();
            blocks.push(Block::Blockquote(items));
        }
        "pre" => {
            let mut raw = String::new();
            raw_text(&el.children, &mut raw);
            let lines = raw
                .replace("\r\n", "\n")
                .split('\n')
                .map(TextBlock::plain)
                .collect();
            blocks.push(Block::CodeBlock(lines));
        }
        "table" => blocks.push(Block::Table(table_from(el))),
        "hr" => {}
        _ => blocks.extend(lower_blocks(&el.children)),
    }
}

/// Items of a list. Nested lists are flattened into the same list.
fn list_items(list: &Element, items: &mut Vec<TextBlock>) {
    for child in &list.children {
        let Node::Element(li) = child else {
            continue;
        };
        if li.name != "li" {
            continue;
        }
        let nested = li
            .children
            .iter()
            .any(|node| matches!(node, Node::Element(el) if el.name == "ul" || el.name == "ol"));
        let mut leaf = TextBlock::new();
        let skip_blank = li.has_block_child();
        let mut sublists = Vec::new();
        for node in &li.children {
            match node {
                Node::Element(el) if el.name == "ul" || el.name == "ol" => sublists.push(el),
                _ => collect_inline(node, &Marks::default(), &mut leaf, skip_blank),
            }
        }
        leaf.align = align_of(li).unwrap_or_default();
        if !leaf.is_empty() || !nested {
            items.push(leaf);
        }
        for sublist in sublists {
            list_items(sublist, items);
        }
    }
}

fn table_from(table: &Element) -> Table {
    let mut rows = Vec::new();
    collect_rows(table, &mut rows);
    Table { rows }
}

fn collect_rows(el: &Element, rows: &mut Vec<Vec<TextBlock>>) {
    for child in &el.children {
        let Node::Element(child) = child else {
            continue;
        };
        match child.name.as_str() {
            "tr" => {
                let cells = child
                    .children
                    .iter()
                    .filter_map(|node| match node {
                        Node::Element(cell) if cell.name == "th" || cell.name == "td" => {
                            Some(leaf_from(cell))
                        }
                        _ => None,
                    })
                    .collect();
                rows.push(cells);
            }
            "thead" | "tbody" | "tfoot" => collect_rows(child, rows),
            _ => {}
        }
    }
}

/// The inline content of an element as one leaf. Nested paragraphs are
/// transparent.
fn leaf_from(el: &Element) -> TextBlock {
    let mut leaf = TextBlock::new();
    let skip_blank = el.has_block_child();
    for child in &el.children {
        collect_inline(child, &Marks::default(), &mut leaf, skip_blank);
    }
    leaf.align = align_of(el)
        .or_else(|| {
            // `<li><p style=..>` and `<td><p style=..>` carry alignment on the inner p.
            el.children.iter().find_map(|child| match child {
                Node::Element(inner) if inner.name == "p" => align_of(inner),
                _ => None,
            })
        })
        .unwrap_or_default();
    leaf.normalize();
    leaf
}

fn align_of(el: &Element) -> Option<Align> {
    let style = el.attr("style")?;
    style.split(';').find_map(|decl| {
        let (prop, value) = decl.split_once(':')?;
        if prop.trim().eq_ignore_ascii_case("text-align") {
            Align::parse(value)
        } else {
            None
        }
    })
}

fn collect_inline(node: &Node, marks: &Marks, leaf: &mut TextBlock, skip_blank: bool) {
    match node {
        Node::Text(text) => {
            if skip_blank && text.trim().is_empty() {
                return;
            }
            let text = text.replace("\r\n", " ").replace(['\n', '\r', '\t'], " ");
            leaf.inlines.push(Inline::styled(text, marks.clone()));
        }
        Node::Element(el) => {
            let mut marks = marks.clone();
            match el.name.as_str() {
                "br" => {
                    leaf.inlines.push(Inline::styled(" ", marks));
                    return;
                }
                "img" => {
                    if let Some(src) = el.attr("src").filter(|src| !src.trim().is_empty()) {
                        leaf.inlines.push(Inline::Image {
                            src: src.to_string(),
                            alt: el.attr("alt").unwrap_or_default().to_string(),
                        });
                    }
                    return;
                }
                "script" | "style" => return,
                "strong" | "b" => marks.bold = true,
                "em" | "i" => marks.italic = true,
                "u" => marks.underline = true,
                "s" | "strike" | "del" => marks.strike = true,
                "a" => {
                    if let Some(href) = el.attr("href").filter(|href| !href.trim().is_empty()) {
                        marks.link = Some(href.into());
                    }
                }
                _ => {}
            }
            let skip_blank = el.has_block_child();
            for child in &el.children {
                collect_inline(child, &marks, leaf, skip_blank);
            }
        }
    }
}

fn raw_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if el.name == "br" => out.push('\n'),
            Node::Element(el) => raw_text(&el.children, out),
        }
    }
}
