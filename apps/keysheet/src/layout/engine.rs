//! Layout Engine — packs an ordered sequence of blocks into row groups.
//!
//! This is a greedy, single-pass shelf packer with column stacking: row
//! groups are horizontal bands sharing one height, and each column inside a
//! band is a vertical sub-shelf. Blocks are consumed strictly in insertion
//! order and never reordered. The two irregular cases are:
//!
//! - **Height growth**: a block taller than the current row group rebuilds
//!   the group from scratch at the new height and replays its members.
//! - **Key-identifier compaction**: when nothing else fits, a key-identifier
//!   block sitting alone in the right-most column may be shrunk into its
//!   compact form to make room. The mutation is transactional — it is kept
//!   only if the whole group rebuilds successfully, and rolled back
//!   otherwise.
//!
//! Blocks live in a [`BlockArena`] scoped to one sheet's layout call;
//! columns and row groups hold [`BlockId`]s into it, never copies, so the
//! compaction mutation is visible everywhere the block is referenced.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::SheetError;
use crate::layout::block::Block;

// ────────────────────────────────────────────────────────────────────────────
// Arena
// ────────────────────────────────────────────────────────────────────────────

/// Stable handle to a block: its insertion order within one arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId(pub usize);

/// Owns every block of one sheet for the duration of packing.
///
/// Ids are minted by [`BlockArena::insert`] and are valid for the arena's
/// whole lifetime, so plain indexing is safe here.
#[derive(Debug, Default)]
pub struct BlockArena {
    blocks: Vec<Block>,
}

impl BlockArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, block: Block) -> BlockId {
        self.blocks.push(block);
        BlockId(self.blocks.len() - 1)
    }

    pub fn get(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    pub fn get_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.0]
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Columns and row groups
// ────────────────────────────────────────────────────────────────────────────

/// An ordered, top-to-bottom stack of blocks sharing one horizontal slot.
/// Width is the widest member (margins included); height is the sum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    blocks: Vec<BlockId>,
    width: usize,
    height: usize,
}

impl Column {
    fn of(id: BlockId, block: &Block) -> Self {
        Column {
            blocks: vec![id],
            width: block.total_width(),
            height: block.height,
        }
    }

    fn push(&mut self, id: BlockId, block: &Block) {
        self.blocks.push(id);
        self.width = self.width.max(block.total_width());
        self.height += block.height;
    }

    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }
}

/// An ordered left-to-right sequence of columns sharing one height.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowGroup {
    columns: Vec<Column>,
    height: usize,
}

impl RowGroup {
    fn new() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Sum of column widths — never exceeds the table width.
    pub fn width(&self) -> usize {
        self.columns.iter().map(|c| c.width).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Member ids in left-to-right, top-to-bottom order — the replay order
    /// for height growth and compaction rebuilds.
    pub(crate) fn block_ids(&self) -> Vec<BlockId> {
        self.columns
            .iter()
            .flat_map(|c| c.blocks.iter().copied())
            .collect()
    }

    /// Tries to place a block into this row group. Returns false (leaving
    /// the group untouched) if the block does not fit.
    ///
    /// Priority order: first block fixes the height; a taller block grows
    /// the group via a full rebuild; otherwise stack on the last column,
    /// then open a new column.
    fn add(&mut self, arena: &BlockArena, id: BlockId, table_width: usize) -> bool {
        let block = arena.get(id);

        if self.columns.is_empty() {
            if block.total_width() > table_width {
                return false;
            }
            self.height = block.height;
            self.columns.push(Column::of(id, block));
            return true;
        }

        if block.height > self.height {
            let mut ids = self.block_ids();
            ids.push(id);
            return match rebuild(arena, &ids, block.height, table_width) {
                Some(grown) => {
                    debug!(
                        block = %block.key,
                        from = self.height,
                        to = block.height,
                        "row group grown to fit taller block"
                    );
                    *self = grown;
                    true
                }
                None => false,
            };
        }

        self.add_fixed(arena, id, table_width)
    }

    /// Fixed-height placement: stack on the last column or open a new one.
    /// Never grows the group — this is the replay rule used by [`rebuild`].
    fn add_fixed(&mut self, arena: &BlockArena, id: BlockId, table_width: usize) -> bool {
        let block = arena.get(id);
        if block.height > self.height {
            return false;
        }

        // Stack on the last column when both the column height and the
        // group width (with the column possibly widening) still fit.
        let stacks = match self.columns.last() {
            Some(last) => {
                last.height + block.height <= self.height
                    && self.width() - last.width + last.width.max(block.total_width())
                        <= table_width
            }
            None => false,
        };
        if stacks {
            if let Some(last) = self.columns.last_mut() {
                last.push(id, block);
            }
            return true;
        }

        if self.width() + block.total_width() <= table_width {
            self.columns.push(Column::of(id, block));
            return true;
        }

        false
    }
}

/// Builds a fresh row group at a preset height by replaying `ids` through
/// the fixed-height placement rule. Pure: the caller's state is untouched;
/// `None` means some block did not fit.
fn rebuild(
    arena: &BlockArena,
    ids: &[BlockId],
    height: usize,
    table_width: usize,
) -> Option<RowGroup> {
    let mut group = RowGroup {
        columns: Vec::new(),
        height,
    };
    for &id in ids {
        if !group.add_fixed(arena, id, table_width) {
            return None;
        }
    }
    Some(group)
}

// ────────────────────────────────────────────────────────────────────────────
// Packing
// ────────────────────────────────────────────────────────────────────────────

/// Packs every block of the arena, in insertion order, into row groups.
///
/// Each block is placed exactly once. A block that fits neither the current
/// row group nor its compacted variant finalizes the group and starts a new
/// one; failing to enter a fresh group is an internal fault, since block
/// width was already validated against the table width at construction.
pub fn pack(arena: &mut BlockArena, table_width: usize) -> Result<Vec<RowGroup>, SheetError> {
    let mut groups = Vec::new();
    let mut current = RowGroup::new();

    for idx in 0..arena.len() {
        let id = BlockId(idx);

        if current.add(arena, id, table_width) {
            continue;
        }

        // Compaction only answers a fixed-height misfit; a taller block
        // whose growth attempt failed goes straight to a fresh row group.
        if arena.get(id).height <= current.height() {
            if let Some(rebuilt) = try_compact_fallback(&current, arena, id, table_width) {
                debug!(block = %arena.get(id).key, "key-identifier compaction made room");
                current = rebuilt;
                continue;
            }
        }

        if !current.is_empty() {
            groups.push(std::mem::take(&mut current));
        }
        if !current.add(arena, id, table_width) {
            let block = arena.get(id);
            return Err(SheetError::internal(format!(
                "block '{}' (width {}) rejected by an empty row group at table width {}",
                block.key,
                block.total_width(),
                table_width
            )));
        }
    }

    if !current.is_empty() {
        groups.push(current);
    }
    Ok(groups)
}

/// Last-resort fallback when a block does not fit the current row group:
/// if the group's right-most column holds exactly one block that is a
/// non-compact key identifier filling its column, compact it and rebuild
/// the whole group (normal placement rule, growth allowed) followed by the
/// new block.
///
/// Transactional: on any rebuild failure the key identifier is restored to
/// its non-compact form and `None` is returned — a partially-mutated block
/// must never escape.
fn try_compact_fallback(
    group: &RowGroup,
    arena: &mut BlockArena,
    id: BlockId,
    table_width: usize,
) -> Option<RowGroup> {
    let last = group.columns.last()?;
    if last.blocks.len() != 1 {
        return None;
    }
    let candidate_id = last.blocks[0];
    {
        let candidate = arena.get(candidate_id);
        if !candidate.is_key_id() || candidate.compact || candidate.total_width() != last.width {
            return None;
        }
    }

    arena.get_mut(candidate_id).compact();

    let mut ids = group.block_ids();
    ids.push(id);
    let mut rebuilt = RowGroup::new();
    for &bid in &ids {
        if !rebuilt.add(arena, bid, table_width) {
            arena.get_mut(candidate_id).restore();
            return None;
        }
    }
    Some(rebuilt)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
