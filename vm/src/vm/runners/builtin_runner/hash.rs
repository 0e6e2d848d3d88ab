use std::cell::RefCell;

use num_integer::Integer;
use starknet_types_core::hash::{Pedersen, StarkHash};

use crate::types::builtin_name::BuiltinName;
use crate::types::instance_definitions::{CELLS_PER_HASH, INPUT_CELLS_PER_HASH};
use crate::types::relocatable::{MaybeRelocatable, Relocatable};
use crate::vm::errors::runner_errors::RunnerError;
use crate::vm::vm_memory::memory::Memory;
use crate::vm::vm_memory::memory_segments::MemorySegmentManager;

use super::BuiltinRunnerCapabilities;

#[derive(Debug, Clone)]
pub struct HashBuiltinRunner {
    pub base: usize,
    ratio: Option<u32>,
    pub(crate) stop_ptr: Option<usize>,
    pub(crate) included: bool,
    // Offsets whose hash was already handed out; each output is deduced once.
    verified_addresses: RefCell<Vec<bool>>,
}

impl HashBuiltinRunner {
    pub fn new(ratio: Option<u32>, included: bool) -> Self {
        HashBuiltinRunner {
            base: 0,
            ratio,
            stop_ptr: None,
            included,
            verified_addresses: RefCell::new(Vec::new()),
        }
    }

    /// Output addresses deduced so far.
    pub fn verified_addresses(&self) -> Vec<Relocatable> {
        self.verified_addresses
            .borrow()
            .iter()
            .enumerate()
            .filter(|(_, verified)| **verified)
            .map(|(offset, _)| Relocatable::from((self.base as isize, offset)))
            .collect()
    }
}

impl BuiltinRunnerCapabilities for HashBuiltinRunner {
    fn name(&self) -> BuiltinName {
        BuiltinName::pedersen
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
        CELLS_PER_HASH
    }

    fn n_input_cells(&self) -> u32 {
        INPUT_CELLS_PER_HASH
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

    fn deduce_memory_cell(
        &self,
        address: Relocatable,
        memory: &Memory,
    ) -> Result<Option<MaybeRelocatable>, RunnerError> {
        if address.offset.mod_floor(&(CELLS_PER_HASH as usize)) != 2
            || *self
                .verified_addresses
                .borrow()
                .get(address.offset)
                .unwrap_or(&false)
        {
            return Ok(None);
        }

        let num_a = memory.get(&Relocatable::from((
            address.segment_index,
            address.offset - 2,
        )));
        let num_b = memory.get(&Relocatable::from((
            address.segment_index,
            address.offset - 1,
        )));
        let (Some(MaybeRelocatable::Int(num_a)), Some(MaybeRelocatable::Int(num_b))) = (
            num_a.as_ref().map(|x| x.as_ref()),
            num_b.as_ref().map(|x| x.as_ref()),
        ) else {
            return Ok(None);
        };

        let mut verified_addresses = self.verified_addresses.borrow_mut();
        if verified_addresses.len() <= address.offset {
            verified_addresses.resize(address.offset + 1, false);
        }
        verified_addresses[address.offset] = true;
        Ok(Some(Pedersen::hash(num_a, num_b).into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relocatable;
    use crate::utils::test_utils::*;
    use crate::vm::runners::builtin_runner::BuiltinRunner;
    use crate::Felt252;

    #[test]
    fn deduce_memory_cell_pedersen_for_preset_memory_valid() {
        let memory = memory![((0, 3), 32), ((0, 4), 72), ((0, 5), 0)];
        let builtin = HashBuiltinRunner::new(Some(8), true);
        let result = builtin.deduce_memory_cell(relocatable!(0, 5), &memory);
        assert_eq!(
            result,
            Ok(Some(MaybeRelocatable::from(
                Felt252::from_hex(
                    "0x73b3ec210cccbb970f80c6826fb1c40ae9f487617696234ff147451405c339f"
                )
                .unwrap()
            )))
        );
        assert_eq!(builtin.verified_addresses(), vec![relocatable!(0, 5)]);
    }

    #[test]
    fn deduce_memory_cell_pedersen_for_preset_memory_incorrect_offset() {
        let memory = memory![((0, 4), 32), ((0, 5), 72), ((0, 6), 0)];
        let builtin = HashBuiltinRunner::new(Some(8), true);
        assert_eq!(builtin.deduce_memory_cell(relocatable!(0, 6), &memory), Ok(None));
    }

    #[test]
    fn deduce_memory_cell_pedersen_for_preset_memory_no_values_to_hash() {
        let memory = memory![((0, 4), 72), ((0, 5), 0)];
        let builtin = HashBuiltinRunner::new(Some(8), true);
        assert_eq!(builtin.deduce_memory_cell(relocatable!(0, 5), &memory), Ok(None));
    }

    #[test]
    fn deduce_memory_cell_pedersen_for_pointer_input() {
        let memory = memory![((0, 3), (1, 0)), ((0, 4), 72)];
        let builtin = HashBuiltinRunner::new(Some(8), true);
        assert_eq!(builtin.deduce_memory_cell(relocatable!(0, 5), &memory), Ok(None));
    }

    #[test]
    fn deduce_memory_cell_pedersen_already_computed() {
        let memory = memory![((0, 3), 32), ((0, 4), 72), ((0, 5), 0)];
        let builtin = HashBuiltinRunner::new(Some(8), true);
        assert!(builtin
            .deduce_memory_cell(relocatable!(0, 5), &memory)
            .unwrap()
            .is_some());
        assert_eq!(builtin.deduce_memory_cell(relocatable!(0, 5), &memory), Ok(None));
    }

    #[test]
    fn get_used_instances_rounds_up() {
        let builtin = HashBuiltinRunner::new(Some(10), true);
        let mut vm = vm!();
        vm.segments.segment_used_sizes = Some(vec![4]);
        assert_eq!(builtin.get_used_instances(&vm.segments), Ok(2));
    }

    #[test]
    fn final_stack() {
        let mut builtin: BuiltinRunner = HashBuiltinRunner::new(Some(10), true).into();
        let mut vm = vm!();
        vm.segments = segments![
            ((0, 0), (0, 0)),
            ((0, 1), (0, 1)),
            ((2, 0), (0, 0)),
            ((2, 1), (0, 0))
        ];
        vm.segments.segment_used_sizes = Some(vec![0]);
        assert_eq!(
            builtin.final_stack(&vm.segments, relocatable!(2, 2)),
            Ok(relocatable!(2, 1))
        );
    }

    #[test]
    fn initial_stack_not_included() {
        let builtin = HashBuiltinRunner::new(Some(8), false);
        assert!(builtin.initial_stack().is_empty());
        assert_eq!(builtin.name(), BuiltinName::pedersen);
    }
}
