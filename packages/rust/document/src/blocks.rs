//! Native-order block traversal over a parsed `.docx` tree.

use docx_rs::{
    DocumentChild, Docx, Paragraph, ParagraphChild, Run, RunChild, Table, TableCell,
    TableCellContent, TableChild, TableRow, TableRowChild,
};

use serde::Deserialize;

use docmine_shared::{DocmineError, Result};

use crate::RawBlock;

/// A node a [`BlockStream`] may be opened over.
///
/// Only the document root, table cells and table rows hold blocks; the other
/// variants exist so callers can hand over any node and get a typed error.
#[derive(Debug, Clone, Copy)]
pub enum Container<'a> {
    Document(&'a Docx),
    Cell(&'a TableCell),
    Row(&'a TableRow),
    Table(&'a Table),
    Paragraph(&'a Paragraph),
}

impl Container<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Self::Document(_) => "document",
            Self::Cell(_) => "cell",
            Self::Row(_) => "row",
            Self::Table(_) => "table",
            Self::Paragraph(_) => "paragraph",
        }
    }
}

/// One structural element of a document.
#[derive(Debug, Clone, Copy)]
pub enum Block<'a> {
    Paragraph(&'a Paragraph),
    Table(&'a Table),
}

impl Block<'_> {
    /// Paragraph text with tabs removed and surrounding whitespace trimmed.
    pub fn text(&self) -> Option<String> {
        match self {
            Self::Paragraph(paragraph) => Some(clean_paragraph(&paragraph_text(paragraph))),
            Self::Table(_) => None,
        }
    }

    /// Normalized cell grid of a table, row by row.
    pub fn grid(&self) -> Option<Vec<Vec<String>>> {
        match self {
            Self::Table(table) => Some(table_grid(table)),
            Self::Paragraph(_) => None,
        }
    }

    /// Detach the block from the document tree.
    pub fn to_raw(&self) -> RawBlock {
        match self.grid() {
            Some(grid) => RawBlock::Table(grid),
            None => RawBlock::Text(self.text().unwrap_or_default()),
        }
    }
}

/// Lazy, single-pass, ordered stream of the blocks inside a container.
pub struct BlockStream<'a> {
    inner: Box<dyn Iterator<Item = Block<'a>> + 'a>,
}

impl<'a> BlockStream<'a> {
    /// Open a stream over `container`.
    ///
    /// Rows yield the blocks of each of their cells in cell order. Tables and
    /// paragraphs are not containers and fail with `UnsupportedContainer`.
    pub fn new(container: Container<'a>) -> Result<Self> {
        let inner: Box<dyn Iterator<Item = Block<'a>> + 'a> = match container {
            Container::Document(docx) => return Ok(Self::document(docx)),
            Container::Cell(cell) => Box::new(cell.children.iter().filter_map(cell_block)),
            Container::Row(row) => Box::new(
                row.cells
                    .iter()
                    .flat_map(|child| match child {
                        TableRowChild::TableCell(cell) => cell.children.iter(),
                    })
                    .filter_map(cell_block),
            ),
            other => {
                return Err(DocmineError::UnsupportedContainer { kind: other.kind() });
            }
        };
        Ok(Self { inner })
    }

    /// Stream over the document root, which is always a container.
    pub fn document(docx: &'a Docx) -> Self {
        Self {
            inner: Box::new(docx.document.children.iter().filter_map(document_block)),
        }
    }
}

impl<'a> Iterator for BlockStream<'a> {
    type Item = Block<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

fn document_block(child: &DocumentChild) -> Option<Block<'_>> {
    match child {
        DocumentChild::Paragraph(paragraph) => Some(Block::Paragraph(paragraph)),
        DocumentChild::Table(table) => Some(Block::Table(table)),
        _ => None,
    }
}

fn cell_block(content: &TableCellContent) -> Option<Block<'_>> {
    match content {
        TableCellContent::Paragraph(paragraph) => Some(Block::Paragraph(paragraph)),
        TableCellContent::Table(table) => Some(Block::Table(table)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Text extraction
// ---------------------------------------------------------------------------

/// Concatenated run text of a paragraph, hyperlinks included.
pub(crate) fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    push_children_text(&paragraph.children, &mut text);
    text
}

fn push_children_text(children: &[ParagraphChild], out: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => push_run_text(run, out),
            ParagraphChild::Hyperlink(link) => push_children_text(&link.children, out),
            _ => {}
        }
    }
}

fn push_run_text(run: &Run, out: &mut String) {
    for child in &run.children {
        match child {
            RunChild::Text(text) => out.push_str(&text.text),
            RunChild::Tab(_) => out.push('\t'),
            RunChild::Break(_) => out.push('\n'),
            _ => {}
        }
    }
}

/// Strip tabs and surrounding whitespace from paragraph text.
pub fn clean_paragraph(raw: &str) -> String {
    raw.replace('\t', "").trim().to_string()
}

/// Normalize one table cell: control characters (CR, LF, BEL, ...) removed,
/// trimmed and lower-cased.
pub fn normalize_cell(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_lowercase()
}

/// Text of one cell: its paragraphs joined by newlines (nested tables are
/// not read), then normalized.
fn cell_text(cell: &TableCell) -> String {
    let paragraphs: Vec<String> = cell
        .children
        .iter()
        .filter_map(|content| match content {
            TableCellContent::Paragraph(paragraph) => Some(paragraph_text(paragraph)),
            _ => None,
        })
        .collect();
    normalize_cell(&paragraphs.join("\n"))
}

/// Merge markers of one cell, read from its serialized properties.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CellMerge {
    grid_span: Option<usize>,
    vertical_merge: Option<String>,
}

impl CellMerge {
    fn of(cell: &TableCell) -> Self {
        serde_json::to_value(&cell.property)
            .and_then(serde_json::from_value)
            .unwrap_or_default()
    }

    /// Grid columns the cell covers (at least one).
    fn span(&self) -> usize {
        self.grid_span.unwrap_or(1).max(1)
    }

    /// Continuation of a vertical merge started in a row above.
    fn continues(&self) -> bool {
        self.vertical_merge.as_deref() == Some("continue")
    }
}

/// Read the top-level grid of a table.
///
/// A horizontally merged cell repeats its text in every grid column it
/// covers; a vertical-merge continuation repeats the text above it.
pub(crate) fn table_grid(table: &Table) -> Vec<Vec<String>> {
    let mut grid: Vec<Vec<String>> = Vec::with_capacity(table.rows.len());
    for child in &table.rows {
        let TableChild::TableRow(row) = child;
        let mut cells: Vec<String> = Vec::new();
        for child in &row.cells {
            let TableRowChild::TableCell(cell) = child;
            let merge = CellMerge::of(cell);
            let text = if merge.continues() {
                grid.last()
                    .and_then(|above| above.get(cells.len()))
                    .cloned()
                    .unwrap_or_default()
            } else {
                cell_text(cell)
            };
            cells.extend(std::iter::repeat_n(text, merge.span()));
        }
        grid.push(cells);
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{BreakType, Docx, VMergeType};

    fn para(text: &str) -> Paragraph {
        Paragraph::new().add_run(Run::new().add_text(text))
    }

    fn cell(text: &str) -> TableCell {
        TableCell::new().add_paragraph(para(text))
    }

    fn sample_docx() -> Docx {
        Docx::new()
            .add_paragraph(para("Quarterly report"))
            .add_paragraph(para("Sales by region, see below:"))
            .add_table(Table::new(vec![
                TableRow::new(vec![cell("Region"), cell("Sales")]),
                TableRow::new(vec![cell("North"), cell("10")]),
            ]))
            .add_paragraph(para("As above, north leads."))
    }

    #[test]
    fn document_stream_preserves_native_order() {
        let docx = sample_docx();
        let kinds: Vec<&str> = BlockStream::new(Container::Document(&docx))
            .expect("document is a container")
            .map(|block| match block {
                Block::Paragraph(_) => "p",
                Block::Table(_) => "t",
            })
            .collect();
        assert_eq!(kinds, ["p", "p", "t", "p"]);
    }

    #[test]
    fn table_grid_is_normalized() {
        let docx = sample_docx();
        let table = BlockStream::new(Container::Document(&docx))
            .unwrap()
            .find_map(|block| block.grid())
            .expect("a table block");
        assert_eq!(
            table,
            vec![vec!["region", "sales"], vec!["north", "10"]]
        );
    }

    #[test]
    fn paragraph_text_strips_tabs_and_keeps_case() {
        let paragraph = Paragraph::new().add_run(
            Run::new()
                .add_tab()
                .add_text("Net Revenue")
                .add_tab()
                .add_text(" rose "),
        );
        let block = Block::Paragraph(&paragraph);
        assert_eq!(block.text().as_deref(), Some("Net Revenue rose"));
    }

    #[test]
    fn cell_text_joins_paragraphs_and_drops_breaks() {
        let table = Table::new(vec![TableRow::new(vec![
            TableCell::new()
                .add_paragraph(para("  Total "))
                .add_paragraph(
                    Paragraph::new().add_run(
                        Run::new()
                            .add_text("Sales")
                            .add_break(BreakType::TextWrapping)
                            .add_text("\u{7}"),
                    ),
                ),
        ])]);
        assert_eq!(table_grid(&table), vec![vec!["total sales"]]);
    }

    #[test]
    fn row_stream_walks_cells_in_order() {
        let row = TableRow::new(vec![cell("first"), cell("second")]);
        let texts: Vec<String> = BlockStream::new(Container::Row(&row))
            .unwrap()
            .filter_map(|block| block.text())
            .collect();
        assert_eq!(texts, ["first", "second"]);
    }

    #[test]
    fn cell_stream_yields_nested_table() {
        let inner = Table::new(vec![TableRow::new(vec![cell("x")])]);
        let outer = TableCell::new().add_paragraph(para("caption")).add_table(inner);
        let blocks: Vec<Block<'_>> = BlockStream::new(Container::Cell(&outer)).unwrap().collect();
        assert_eq!(blocks.len(), 2);
        assert!(matches!(blocks[1], Block::Table(_)));
    }

    #[test]
    fn non_containers_are_rejected() {
        let table = Table::new(vec![]);
        let err = BlockStream::new(Container::Table(&table)).err().expect("table is rejected");
        assert!(matches!(err, DocmineError::UnsupportedContainer { kind: "table" }));

        let paragraph = para("x");
        assert!(BlockStream::new(Container::Paragraph(&paragraph)).is_err());
    }

    #[test]
    fn merged_cells_fill_every_grid_column() {
        let table = Table::new(vec![
            TableRow::new(vec![cell("a"), cell("b"), cell("c")]),
            TableRow::new(vec![cell("Total").grid_span(2), cell("30")]),
        ]);
        assert_eq!(
            table_grid(&table),
            vec![vec!["a", "b", "c"], vec!["total", "total", "30"]]
        );
    }

    #[test]
    fn vertical_merge_repeats_the_cell_above() {
        let table = Table::new(vec![
            TableRow::new(vec![cell("region"), cell("sales")]),
            TableRow::new(vec![
                cell("North").vertical_merge(VMergeType::Restart),
                cell("10"),
            ]),
            TableRow::new(vec![
                TableCell::new().vertical_merge(VMergeType::Continue),
                cell("12"),
            ]),
        ]);
        assert_eq!(table_grid(&table)[2], ["north", "12"]);
    }

    #[test]
    fn to_raw_detaches_both_kinds() {
        let paragraph = para("\tIntro ");
        assert_eq!(
            Block::Paragraph(&paragraph).to_raw(),
            RawBlock::Text("Intro".into())
        );
        let table = Table::new(vec![TableRow::new(vec![cell("X")])]);
        assert_eq!(
            Block::Table(&table).to_raw(),
            RawBlock::Table(vec![vec!["x".to_string()]])
        );
    }

    #[test]
    fn normalize_cell_examples() {
        assert_eq!(normalize_cell("  Gross\r\nMargin\u{7} "), "grossmargin");
        assert_eq!(normalize_cell("ÉTÉ"), "été");
        assert_eq!(normalize_cell(""), "");
    }
}
