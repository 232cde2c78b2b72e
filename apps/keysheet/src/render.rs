//! Renderer — walks the packed row groups and emits HTML cell-by-cell.
//!
//! One `<tr>` per height-unit of each row group, left to right, top to
//! bottom. Every emitted row sums to exactly the table width in colspan
//! units (a rowspan carried over from the previous row counts toward the
//! total). Gaps — column slots past the end of a stack, residual width
//! inside a column, and the stretch from the last column to the table
//! edge — are closed with blank cells.
//!
//! Data patterns per block kind:
//! - plain text: one cell per character, single data row
//! - grid10: the cyclic digit row `0 1 … 9` on every data row
//! - grid36: a 37-cell row cycling `0-9A-Z`; every 5th offset is a
//!   separator row (band-number cell + one wide blank)
//! - key identifier: `0x` label cell + 16 hex cells on one row, or split
//!   8/8 across two rows in compact form with the label spanning both

use crate::errors::SheetError;
use crate::layout::block::{Block, BlockKind};
use crate::layout::engine::{BlockArena, Column, RowGroup};

/// Symbol alphabet for the 36-grid. Cell `i` of a symbol row shows
/// `GRID36_ALPHABET[i % 36]`.
const GRID36_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Label cell literal for key-identifier rows.
const KEY_ID_LABEL: &str = "0x";
const KEY_ID_LABEL_SPAN: usize = 2;

// ────────────────────────────────────────────────────────────────────────────
// Cell model
// ────────────────────────────────────────────────────────────────────────────

/// One emitted table cell. `text` is raw; escaping happens at serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Cell {
    pub text: String,
    pub span: usize,
    pub rows: usize,
    pub blank: bool,
}

impl Cell {
    fn text(text: impl Into<String>, span: usize) -> Self {
        Cell {
            text: text.into(),
            span,
            rows: 1,
            blank: false,
        }
    }

    fn blank(span: usize) -> Self {
        Cell {
            text: String::new(),
            span,
            rows: 1,
            blank: true,
        }
    }

    fn ch(c: char) -> Self {
        Cell::text(c.to_string(), 1)
    }
}

/// One emitted table row. `carried_span` is width covered by a rowspan
/// opened on an earlier row; it counts toward the row's width total but
/// emits no cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Row {
    pub cells: Vec<Cell>,
    pub carried_span: usize,
    pub header: bool,
}

fn span_total(cells: &[Cell]) -> usize {
    cells.iter().map(|c| c.span).sum()
}

// ────────────────────────────────────────────────────────────────────────────
// Block data patterns
// ────────────────────────────────────────────────────────────────────────────

/// Emits the cells for one block at a block-local row offset (0 = header
/// row). Returns the cells plus the span carried into this row by a
/// rowspan from the row above (compact key identifiers only).
fn block_row(block: &Block, local: usize) -> Result<(Vec<Cell>, usize), SheetError> {
    let mut cells = Vec::new();
    let mut carried = 0;

    if block.margin_left > 0 {
        cells.push(Cell::blank(block.margin_left));
    }

    if local == 0 {
        cells.push(Cell::text(block.header.as_str(), block.width));
    } else {
        match block.kind {
            BlockKind::Text => {
                if local != 1 {
                    return Err(SheetError::internal(format!(
                        "plain text block '{}' has no data row at offset {local}",
                        block.key
                    )));
                }
                cells.extend(block.data.chars().map(Cell::ch));
            }

            BlockKind::Grid10 => {
                cells.extend(('0'..='9').map(Cell::ch));
            }

            BlockKind::Grid36 => {
                if local % 5 == 4 {
                    // Separator row: band number + one wide blank.
                    let band = local / 5 + 1;
                    cells.push(Cell::text(band.to_string(), 1));
                    cells.push(Cell::blank(block.width - 1));
                } else {
                    cells.extend(
                        (0..block.width)
                            .map(|i| Cell::ch(GRID36_ALPHABET[i % GRID36_ALPHABET.len()] as char)),
                    );
                }
            }

            BlockKind::KeyId => {
                let digits = block.key_id.as_deref().ok_or_else(|| {
                    SheetError::internal(format!(
                        "key-identifier block '{}' carries no parsed payload",
                        block.key
                    ))
                })?;
                match (block.compact, local) {
                    (false, 1) => {
                        cells.push(Cell::text(KEY_ID_LABEL, KEY_ID_LABEL_SPAN));
                        cells.extend(digits.chars().map(Cell::ch));
                    }
                    (true, 1) => {
                        let mut label = Cell::text(KEY_ID_LABEL, KEY_ID_LABEL_SPAN);
                        label.rows = 2;
                        cells.push(label);
                        cells.extend(digits.chars().take(8).map(Cell::ch));
                    }
                    (true, 2) => {
                        // The label's rowspan covers the first 2 units.
                        carried = KEY_ID_LABEL_SPAN;
                        cells.extend(digits.chars().skip(8).map(Cell::ch));
                    }
                    _ => {
                        return Err(SheetError::internal(format!(
                            "key-identifier block '{}' has no data row at offset {local}",
                            block.key
                        )));
                    }
                }
            }
        }
    }

    if block.margin_right > 0 {
        cells.push(Cell::blank(block.margin_right));
    }

    Ok((cells, carried))
}

// ────────────────────────────────────────────────────────────────────────────
// Row assembly
// ────────────────────────────────────────────────────────────────────────────

/// Emits one column's cells at a group-global row offset, padded to the
/// column width. An offset past the end of the stack is all blank.
fn column_row(
    arena: &BlockArena,
    col: &Column,
    offset: usize,
) -> Result<(Vec<Cell>, usize), SheetError> {
    let mut y = 0;
    for &id in col.blocks() {
        let block = arena.get(id);
        if offset < y + block.height {
            let (mut cells, carried) = block_row(block, offset - y)?;
            let filled = span_total(&cells) + carried;
            if filled < col.width() {
                cells.push(Cell::blank(col.width() - filled));
            }
            return Ok((cells, carried));
        }
        y += block.height;
    }
    Ok((vec![Cell::blank(col.width())], 0))
}

/// True when some column's block has its header (row-0) slot at this offset.
fn is_header_offset(arena: &BlockArena, group: &RowGroup, offset: usize) -> bool {
    group.columns().iter().any(|col| {
        let mut y = 0;
        for &id in col.blocks() {
            if y == offset {
                return true;
            }
            y += arena.get(id).height;
        }
        false
    })
}

/// Assembles every row of the sheet, padded to exactly the table width.
pub(crate) fn sheet_rows(
    groups: &[RowGroup],
    arena: &BlockArena,
    table_width: usize,
) -> Result<Vec<Row>, SheetError> {
    let mut rows = Vec::new();
    for group in groups {
        for offset in 0..group.height() {
            let mut cells = Vec::new();
            let mut carried_span = 0;
            for col in group.columns() {
                let (col_cells, carried) = column_row(arena, col, offset)?;
                cells.extend(col_cells);
                carried_span += carried;
            }

            let total = span_total(&cells) + carried_span;
            if total > table_width {
                return Err(SheetError::internal(format!(
                    "row at offset {offset} spans {total} units, table is {table_width}"
                )));
            }
            if total < table_width {
                cells.push(Cell::blank(table_width - total));
            }

            rows.push(Row {
                cells,
                carried_span,
                header: is_header_offset(arena, group, offset),
            });
        }
    }
    Ok(rows)
}

// ────────────────────────────────────────────────────────────────────────────
// HTML emission
// ────────────────────────────────────────────────────────────────────────────

/// Escapes the markup's reserved characters in free text.
fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn push_cell(out: &mut String, cell: &Cell) {
    out.push_str("<td");
    if cell.span > 1 {
        out.push_str(&format!(" colspan=\"{}\"", cell.span));
    }
    if cell.rows > 1 {
        out.push_str(&format!(" rowspan=\"{}\"", cell.rows));
    }
    if cell.blank {
        out.push_str(" class=\"blank\"");
    }
    out.push('>');
    out.push_str(&escape_html(&cell.text));
    out.push_str("</td>");
}

fn push_row(out: &mut String, row: &Row, row_classes: bool) {
    if row_classes {
        out.push_str(if row.header {
            "<tr class=\"header\">"
        } else {
            "<tr class=\"data\">"
        });
    } else {
        out.push_str("<tr>");
    }
    for cell in &row.cells {
        push_cell(out, cell);
    }
    out.push_str("</tr>\n");
}

/// Renders one sheet: title block plus the packed table.
pub fn render_sheet(
    title_left: &str,
    title_right: &str,
    groups: &[RowGroup],
    arena: &BlockArena,
    table_width: usize,
    row_classes: bool,
) -> Result<String, SheetError> {
    let rows = sheet_rows(groups, arena, table_width)?;

    let mut out = String::new();
    out.push_str("<div class=\"sheet\">\n");
    out.push_str(&format!(
        "<div class=\"title\"><span class=\"title-left\">{}</span><span class=\"title-right\">{}</span></div>\n",
        escape_html(title_left),
        escape_html(title_right)
    ));
    out.push_str("<table>\n");
    for row in &rows {
        push_row(&mut out, row, row_classes);
    }
    out.push_str("</table>\n</div>\n");
    Ok(out)
}

const STYLE: &str = "\
body { font-family: monospace; font-size: 10pt; }
.sheet { page-break-after: always; }
.title { display: flex; justify-content: space-between; font-weight: bold; margin-bottom: 0.5em; }
table { border-collapse: collapse; table-layout: fixed; width: 100%; }
td { border: 1px solid #888; height: 1.4em; text-align: center; overflow: hidden; }
td.blank { border: none; }
";

/// Wraps rendered sheets into a complete HTML document.
pub fn render_document(sheets: &[String]) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\n");
    out.push_str(STYLE);
    out.push_str("</style>\n</head>\n<body>\n");
    for sheet in sheets {
        out.push_str(sheet);
    }
    out.push_str("</body>\n</html>\n");
    out
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
