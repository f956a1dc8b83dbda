use markdown_weaver_escape::{StrWrite, escape_href, escape_html, escape_html_body_text};

use crate::document::Document;
use crate::node::{Block, Inline, Marks, Table, TextBlock};
use crate::types::Align;

const LINK_ATTRS: &str = r#" target="_blank" rel="noopener noreferrer nofollow""#;

/// Writes a document as HTML markup.
///
/// Output is canonical: adjacent runs with equal marks are already merged by
/// the document, and marks always nest in the same order (link, bold, italic,
/// underline, strike).
pub struct MarkupWriter<'a, W> {
    doc: &'a Document,
    writer: W,
}

impl<'a, W> MarkupWriter<'a, W>
where
    W: StrWrite,
{
    pub fn new(doc: &'a Document, writer: W) -> Self {
        Self { doc, writer }
    }

    pub fn run(mut self) -> Result<(), W::Error> {
        let doc = self.doc;
        for block in doc.blocks() {
            self.write_block(block)?;
        }
        Ok(())
    }

    #[inline]
    fn write(&mut self, s: &str) -> Result<(), W::Error> {
        self.writer.write_str(s)
    }

    fn write_block(&mut self, block: &Block) -> Result<(), W::Error> {
        match block {
            Block::Paragraph(text) => self.write_leaf("p", text),
            Block::Heading { level, text } => self.write_leaf(level.tag(), text),
            Block::List { kind, items } => {
                self.write("<")?;
                self.write(kind.tag())?;
                self.write(">")?;
                for item in items {
                    self.write("<li>")?;
                    self.write_leaf("p", item)?;
                    self.write("</li>")?;
                }
                self.write("</")?;
                self.write(kind.tag())?;
                self.write(">")
            }
            Block::Blockquote(items) => {
                self.write("<blockquote>")?;
                for item in items {
                    self.write_leaf("p", item)?;
                }
                self.write("</blockquote>")
            }
            Block::CodeBlock(lines) => {
                self.write("<pre><code>")?;
                for (i, line) in lines.iter().enumerate() {
                    if i > 0 {
                        self.write("\n")?;
                    }
                    escape_html_body_text(&mut self.writer, &line.plain_text())?;
                }
                self.write("</code></pre>")
            }
            Block::Table(table) => self.write_table(table),
        }
    }

    fn write_table(&mut self, table: &Table) -> Result<(), W::Error> {
        self.write("<table><tbody>")?;
        for (row_index, row) in table.rows.iter().enumerate() {
            let cell_tag = if row_index == 0 { "th" } else { "td" };
            self.write("<tr>")?;
            for cell in row {
                self.write("<")?;
                self.write(cell_tag)?;
                self.write(">")?;
                self.write_leaf("p", cell)?;
                self.write("</")?;
                self.write(cell_tag)?;
                self.write(">")?;
            }
            self.write("</tr>")?;
        }
        self.write("</tbody></table>")
    }

    fn write_leaf(&mut self, tag: &str, text: &TextBlock) -> Result<(), W::Error> {
        self.write("<")?;
        self.write(tag)?;
        if text.align != Align::Left {
            self.write(" style=\"text-align: ")?;
            self.write(text.align.as_str())?;
            self.write("\"")?;
        }
        self.write(">")?;
        for inline in &text.inlines {
            match inline {
                Inline::Text { text, marks } => self.write_run(text, marks)?,
                Inline::Image { src, alt } => {
                    self.write("<img src=\"")?;
                    escape_html(&mut self.writer, src)?;
                    self.write("\" alt=\"")?;
                    escape_html(&mut self.writer, alt)?;
                    self.write("\">")?;
                }
            }
        }
        self.write("</")?;
        self.write(tag)?;
        self.write(">")
    }

    fn write_run(&mut self, text: &str, marks: &Marks) -> Result<(), W::Error> {
        if let Some(href) = &marks.link {
            self.write("<a href=\"")?;
            escape_href(&mut self.writer, href)?;
            self.write("\"")?;
            self.write(LINK_ATTRS)?;
            self.write(">")?;
        }
        let tags = [
            (marks.bold, "strong"),
            (marks.italic, "em"),
            (marks.underline, "u"),
            (marks.strike, "s"),
        ];
        for (on, tag) in tags {
            if on {
                self.write("<")?;
                self.write(tag)?;
                self.write(">")?;
            }
        }
        escape_html_body_text(&mut self.writer, text)?;
        for (on, tag) in tags.iter().rev() {
            if *on {
                self.write("</")?;
                self.write(tag)?;
                self.write(">")?;
            }
        }
        if marks.link.is_some() {
            self.write("</a>")?;
        }
        Ok(())
    }
}
