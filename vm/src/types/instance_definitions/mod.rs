//! Per-builtin cell layouts and the builtin ratios each layout enables.

pub mod builtins_instance_def;

pub(crate) const CELLS_PER_HASH: u32 = 3;
pub(crate) const INPUT_CELLS_PER_HASH: u32 = 2;

pub(crate) const CELLS_PER_RANGE_CHECK: u32 = 1;

pub(crate) const CELLS_PER_SIGNATURE: u32 = 2;
pub(crate) const INPUTCELLS_PER_SIGNATURE: u32 = 2;

pub(crate) const CELLS_PER_BITWISE: u32 = 5;
pub(crate) const INPUT_CELLS_PER_BITWISE: u32 = 2;

pub(crate) const CELLS_PER_EC_OP: u32 = 7;
pub(crate) const INPUT_CELLS_PER_EC_OP: u32 = 5;
pub(crate) const EC_OP_SCALAR_HEIGHT: u32 = 256;

pub(crate) const CELLS_PER_POSEIDON: u32 = 6;
pub(crate) const INPUT_CELLS_PER_POSEIDON: u32 = 3;

pub(crate) const CELLS_PER_SEGMENT_ARENA: u32 = 3;
