// Block packing: the block model derives geometry, the engine packs blocks
// into row groups under the table-width budget. All state is scoped to one
// sheet's layout call via the arena.

pub mod block;
pub mod engine;

pub use block::{Block, BlockSpec};
pub use engine::{pack, BlockArena, RowGroup};
