//! Block Model — derives a block's placement geometry from its raw spec.
//!
//! A block's data string decides its shape: the `grid36`/`grid10` tokens
//! select fixed character grids, the distinguished `keyid` key selects the
//! key-identifier rendering, and anything else is plain text laid out one
//! cell per character. Geometry is fixed at construction; the only mutation
//! a block ever sees afterwards is the layout engine's key-identifier
//! compaction, which is reversible.

use serde::{Deserialize, Serialize};

use crate::errors::SheetError;

// ────────────────────────────────────────────────────────────────────────────
// Geometry constants
// ────────────────────────────────────────────────────────────────────────────

/// The block key that selects key-identifier rendering.
pub const KEY_ID_KEY: &str = "keyid";

const GRID36_TOKEN: &str = "grid36";
const GRID10_TOKEN: &str = "grid10";

pub const GRID36_WIDTH: usize = 37;
pub const GRID36_HEIGHT: usize = 30;
pub const GRID10_WIDTH: usize = 10;
pub const GRID10_HEIGHT: usize = 9;
/// Plain text blocks: one header row plus one data row.
const TEXT_HEIGHT: usize = 2;

/// Non-compact key identifier: `0x` label cell (2 wide) + 16 hex cells.
pub const KEY_ID_WIDTH: usize = 18;
pub const KEY_ID_HEIGHT: usize = 2;
/// Compact form: the 16 digits split 8/8 across two data rows.
pub const KEY_ID_COMPACT_WIDTH: usize = 10;
pub const KEY_ID_COMPACT_HEIGHT: usize = 3;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// Raw block specification, as parsed from the input document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSpec {
    pub key: String,
    pub header: String,
    pub data: String,
    pub margin_left: usize,
    pub margin_right: usize,
}

/// Content kind, derived once from the key and data string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    /// One cell per character of the data string.
    Text,
    /// Fixed 10-wide cyclic digit grid.
    Grid10,
    /// Fixed 37-wide alphanumeric grid with separator rows.
    Grid36,
    /// 16-hex-digit key identifier with a `0x` label cell.
    KeyId,
}

/// A sized block ready for packing.
///
/// `width` is the content width, excluding margins; `total_width()` includes
/// them. `compact` is false at construction and flips only through the
/// engine's [`Block::compact`]/[`Block::restore`] pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub key: String,
    pub header: String,
    pub data: String,
    pub kind: BlockKind,
    pub width: usize,
    pub height: usize,
    pub margin_left: usize,
    pub margin_right: usize,
    /// The 16 hex digits (lowercased, `0x` prefix stripped), key-id blocks only.
    pub key_id: Option<String>,
    pub compact: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Construction
// ────────────────────────────────────────────────────────────────────────────

impl Block {
    /// Derives a block's geometry from its spec.
    ///
    /// Fails with a validation error if the key-identifier payload is not
    /// 16 hex digits, if the data string is empty, or if the block's total
    /// width exceeds the table width.
    pub fn from_spec(spec: &BlockSpec, table_width: usize) -> Result<Block, SheetError> {
        let (kind, key_id) = if spec.key == KEY_ID_KEY {
            (BlockKind::KeyId, Some(parse_key_id(&spec.key, &spec.data)?))
        } else if spec.data == GRID36_TOKEN {
            (BlockKind::Grid36, None)
        } else if spec.data == GRID10_TOKEN {
            (BlockKind::Grid10, None)
        } else {
            if spec.data.is_empty() {
                return Err(SheetError::validation(format!(
                    "block '{}' has empty data",
                    spec.key
                )));
            }
            (BlockKind::Text, None)
        };

        let (width, height) = match kind {
            BlockKind::Text => (spec.data.chars().count(), TEXT_HEIGHT),
            BlockKind::Grid10 => (GRID10_WIDTH, GRID10_HEIGHT),
            BlockKind::Grid36 => (GRID36_WIDTH, GRID36_HEIGHT),
            BlockKind::KeyId => (KEY_ID_WIDTH, KEY_ID_HEIGHT),
        };

        let block = Block {
            key: spec.key.clone(),
            header: spec.header.clone(),
            data: spec.data.clone(),
            kind,
            width,
            height,
            margin_left: spec.margin_left,
            margin_right: spec.margin_right,
            key_id,
            compact: false,
        };

        if block.total_width() > table_width {
            return Err(SheetError::validation(format!(
                "block '{}' has width {} > table width {}",
                block.key,
                block.total_width(),
                table_width
            )));
        }

        Ok(block)
    }

    /// Content width plus both margins — the horizontal space the block claims.
    pub fn total_width(&self) -> usize {
        self.width + self.margin_left + self.margin_right
    }

    pub fn is_key_id(&self) -> bool {
        self.kind == BlockKind::KeyId
    }

    /// Switches a key-identifier block to its compact two-row rendering.
    /// Only the layout engine calls this, and only transactionally.
    pub(crate) fn compact(&mut self) {
        debug_assert!(self.is_key_id() && !self.compact);
        self.width = KEY_ID_COMPACT_WIDTH;
        self.height = KEY_ID_COMPACT_HEIGHT;
        self.compact = true;
    }

    /// Rolls back [`Block::compact`].
    pub(crate) fn restore(&mut self) {
        debug_assert!(self.is_key_id() && self.compact);
        self.width = KEY_ID_WIDTH;
        self.height = KEY_ID_HEIGHT;
        self.compact = false;
    }
}

/// Validates and normalizes a key-identifier payload: 16 hex digits,
/// optionally `0x`-prefixed. Returns the digits lowercased.
fn parse_key_id(key: &str, data: &str) -> Result<String, SheetError> {
    let digits = data.strip_prefix("0x").unwrap_or(data);
    if digits.len() != 16 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(SheetError::validation(format!(
            "block '{key}' key identifier must be 16 hex digits (optionally 0x-prefixed), got '{data}'"
        )));
    }
    Ok(digits.to_ascii_lowercase())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn make_spec(key: &str, data: &str, left: usize, right: usize) -> BlockSpec {
        BlockSpec {
            key: key.to_string(),
            header: key.to_uppercase(),
            data: data.to_string(),
            margin_left: left,
            margin_right: right,
        }
    }

    // ── geometry derivation ─────────────────────────────────────────────────

    #[test]
    fn test_text_block_geometry() {
        let block = Block::from_spec(&make_spec("greeting", "HELLO", 2, 2), 40).unwrap();
        assert_eq!(block.kind, BlockKind::Text);
        assert_eq!(block.width, 5);
        assert_eq!(block.height, 2);
        assert_eq!(block.total_width(), 9);
        assert!(block.key_id.is_none());
    }

    #[test]
    fn test_grid36_geometry() {
        let block = Block::from_spec(&make_spec("alphabet", "grid36", 0, 0), 40).unwrap();
        assert_eq!(block.kind, BlockKind::Grid36);
        assert_eq!(block.width, GRID36_WIDTH);
        assert_eq!(block.height, GRID36_HEIGHT);
    }

    #[test]
    fn test_grid10_geometry() {
        let block = Block::from_spec(&make_spec("digits", "grid10", 1, 0), 40).unwrap();
        assert_eq!(block.kind, BlockKind::Grid10);
        assert_eq!(block.width, GRID10_WIDTH);
        assert_eq!(block.height, GRID10_HEIGHT);
        assert_eq!(block.total_width(), 11);
    }

    #[test]
    fn test_text_counts_chars_not_bytes() {
        let block = Block::from_spec(&make_spec("word", "héllo", 0, 0), 40).unwrap();
        assert_eq!(block.width, 5, "width should count characters, not bytes");
    }

    // ── key identifier ──────────────────────────────────────────────────────

    #[test]
    fn test_key_id_geometry_overrides_text_rule() {
        let block = Block::from_spec(&make_spec("keyid", "0123456789ABCDEF", 0, 0), 40).unwrap();
        assert_eq!(block.kind, BlockKind::KeyId);
        assert_eq!(block.width, KEY_ID_WIDTH, "fixed width, not char count");
        assert_eq!(block.height, KEY_ID_HEIGHT);
        assert!(!block.compact);
        assert_eq!(block.key_id.as_deref(), Some("0123456789abcdef"));
    }

    #[test]
    fn test_key_id_accepts_0x_prefix() {
        let block = Block::from_spec(&make_spec("keyid", "0xDEADBEEF01234567", 0, 0), 40).unwrap();
        assert_eq!(block.key_id.as_deref(), Some("deadbeef01234567"));
    }

    #[test]
    fn test_key_id_rejects_bad_hex_naming_the_key() {
        let err = Block::from_spec(&make_spec("keyid", "0xZZZZZZZZZZZZZZZZ", 0, 0), 40).unwrap_err();
        match err {
            SheetError::Validation(msg) => {
                assert!(msg.contains("keyid"), "error should name the block key: {msg}");
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_key_id_rejects_wrong_length() {
        assert!(Block::from_spec(&make_spec("keyid", "0123", 0, 0), 40).is_err());
        assert!(Block::from_spec(&make_spec("keyid", "0123456789abcdef0", 0, 0), 40).is_err());
    }

    #[test]
    fn test_compact_and_restore_round_trip() {
        let mut block = Block::from_spec(&make_spec("keyid", "0123456789abcdef", 0, 0), 40).unwrap();
        let original = block.clone();

        block.compact();
        assert_eq!(block.width, KEY_ID_COMPACT_WIDTH);
        assert_eq!(block.height, KEY_ID_COMPACT_HEIGHT);
        assert_eq!(original.width - block.width, 8, "compaction shrinks width by exactly 8");
        assert!(block.compact);

        block.restore();
        assert_eq!(block, original, "restore must undo compaction exactly");
    }

    // ── validation ──────────────────────────────────────────────────────────

    #[test]
    fn test_block_wider_than_table_rejected() {
        let err = Block::from_spec(&make_spec("wide", "grid36", 2, 2), 40).unwrap_err();
        match err {
            SheetError::Validation(msg) => {
                assert!(msg.contains("wide") && msg.contains("41"), "got: {msg}");
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_block_exactly_table_width_accepted() {
        let block = Block::from_spec(&make_spec("snug", "grid36", 2, 1), 40).unwrap();
        assert_eq!(block.total_width(), 40);
    }

    #[test]
    fn test_empty_data_rejected() {
        assert!(Block::from_spec(&make_spec("empty", "", 0, 0), 40).is_err());
    }
}
