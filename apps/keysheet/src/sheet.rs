//! Per-sheet orchestration: specs → arena → packed row groups → HTML.
//!
//! Each sheet gets its own [`BlockArena`], constructed and discarded inside
//! [`build_sheet`] — no layout state crosses sheet boundaries. Any failure
//! aborts the whole run; a sheet is either rendered completely or not at
//! all.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::Config;
use crate::errors::SheetError;
use crate::input::{self, SheetDoc};
use crate::layout::{pack, Block, BlockArena};
use crate::render;

/// Lays out and renders one sheet.
pub fn build_sheet(doc: &SheetDoc, config: &Config) -> Result<String, SheetError> {
    let mut arena = BlockArena::new();
    for spec in &doc.blocks {
        arena.insert(Block::from_spec(spec, doc.table_width)?);
    }

    let groups = pack(&mut arena, doc.table_width)?;
    info!(
        sheet = %doc.title_left,
        blocks = arena.len(),
        row_groups = groups.len(),
        "packed sheet"
    );

    render::render_sheet(
        &doc.title_left,
        &doc.title_right,
        &groups,
        &arena,
        doc.table_width,
        config.row_classes,
    )
}

/// Parses, lays out, and renders every sheet of an input document.
pub fn run_document(text: &str, config: &Config) -> Result<String, SheetError> {
    let sheets = input::parse_document(text)?;
    let mut rendered = Vec::with_capacity(sheets.len());
    for doc in &sheets {
        rendered.push(build_sheet(doc, config)?);
    }
    Ok(render::render_document(&rendered))
}

/// Full file pipeline: reads `<basename>.json`, writes `<basename>.html`.
/// Returns the output path. The input file is checked before any layout
/// work begins.
pub fn generate_file(basename: &str, config: &Config) -> Result<PathBuf, SheetError> {
    let input_path = PathBuf::from(format!("{basename}.json"));
    let output_path = PathBuf::from(format!("{basename}.html"));

    if !input_path.exists() {
        return Err(SheetError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("expected input file {} does not exist", input_path.display()),
        )));
    }

    let text = read_input(&input_path)?;
    let html = run_document(&text, config)?;
    std::fs::write(&output_path, html)?;
    info!("wrote {}", output_path.display());
    Ok(output_path)
}

fn read_input(path: &Path) -> Result<String, SheetError> {
    info!("reading {}", path.display());
    Ok(std::fs::read_to_string(path)?)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
