use crate::types::builtin_name::BuiltinName;
use crate::types::instance_definitions::{CELLS_PER_BITWISE, INPUT_CELLS_PER_BITWISE};
use crate::types::relocatable::{MaybeRelocatable, Relocatable};
use crate::vm::errors::runner_errors::RunnerError;
use crate::vm::vm_memory::memory::Memory;
use crate::vm::vm_memory::memory_segments::MemorySegmentManager;
use crate::Felt252;

use super::BuiltinRunnerCapabilities;

/// Inputs must fit in this many bits.
pub const TOTAL_N_BITS: u32 = 251;

// Bits of the top limb above bit 250.
const LEADING_BITS: u64 = 0xf800000000000000;

#[derive(Debug, Clone)]
pub struct BitwiseBuiltinRunner {
    ratio: Option<u32>,
    pub base: usize,
    pub(crate) stop_ptr: Option<usize>,
    pub(crate) included: bool,
}

impl BitwiseBuiltinRunner {
    pub fn new(ratio: Option<u32>, included: bool) -> Self {
        BitwiseBuiltinRunner {
            base: 0,
            ratio,
            stop_ptr: None,
            included,
        }
    }
}

fn input_limbs(address: Relocatable, value: &Felt252) -> Result<[u64; 4], RunnerError> {
    let limbs = value.to_le_digits();
    if limbs[3] & LEADING_BITS != 0 {
        return Err(RunnerError::IntegerBiggerThanPowerOfTwo(Box::new((
            address,
            TOTAL_N_BITS,
            *value,
        ))));
    }
    Ok(limbs)
}

impl BuiltinRunnerCapabilities for BitwiseBuiltinRunner {
    fn name(&self) -> BuiltinName {
        BuiltinName::bitwise
    }

    fn base(&self) -> usize {
        self.base
    }

    fn included(&self) -> bool {
        self.included
    }

    fn ratio(&self) -> Option<u32> {
        self.ratio
    }

    fn cells_per_instance(&self) -> u32 {
        CELLS_PER_BITWISE
    }

    fn n_input_cells(&self) -> u32 {
        INPUT_CELLS_PER_BITWISE
    }

    fn stop_ptr(&self) -> Option<usize> {
        self.stop_ptr
    }

    fn set_stop_ptr(&mut self, stop_ptr: usize) {
        self.stop_ptr = Some(stop_ptr)
    }

    fn initialize_segments(&mut self, segments: &mut MemorySegmentManager) {
        self.base = segments.add().segment_index as usize
    }

    /// Cells 2, 3 and 4 of an instance hold `x & y`, `x ^ y` and `x | y`.
    fn deduce_memory_cell(
        &self,
        address: Relocatable,
        memory: &Memory,
    ) -> Result<Option<MaybeRelocatable>, RunnerError> {
        let index = address.offset % CELLS_PER_BITWISE as usize;
        let op: fn(u64, u64) -> u64 = match index {
            2 => |x, y| x & y,
            3 => |x, y| x ^ y,
            4 => |x, y| x | y,
            _ => return Ok(None),
        };
        let x_addr = (address - index)?;
        let y_addr = (x_addr + 1_usize)?;
        let (Ok(x), Ok(y)) = (memory.get_integer(x_addr), memory.get_integer(y_addr)) else {
            return Ok(None);
        };
        let (x, y) = (input_limbs(x_addr, &x)?, input_limbs(y_addr, &y)?);

        let bytes: Vec<u8> = x
            .iter()
            .zip(y.iter())
            .flat_map(|(x, y)| op(*x, *y).to_le_bytes())
            .collect();
        Ok(Some(Felt252::from_bytes_le_slice(&bytes).into()))
    }
}
