use std::cell::RefCell;
use std::collections::HashMap;

use starknet_types_core::hash::Poseidon;

use crate::types::builtin_name::BuiltinName;
use crate::types::instance_definitions::{CELLS_PER_POSEIDON, INPUT_CELLS_PER_POSEIDON};
use crate::types::relocatable::{MaybeRelocatable, Relocatable};
use crate::vm::errors::runner_errors::RunnerError;
use crate::vm::vm_memory::memory::Memory;
use crate::vm::vm_memory::memory_segments::MemorySegmentManager;
use crate::Felt252;

use super::BuiltinRunnerCapabilities;

#[derive(Debug, Clone)]
pub struct PoseidonBuiltinRunner {
    pub base: usize,
    ratio: Option<u32>,
    pub(crate) stop_ptr: Option<usize>,
    pub(crate) included: bool,
    cache: RefCell<HashMap<Relocatable, Felt252>>,
}

impl PoseidonBuiltinRunner {
    pub fn new(ratio: Option<u32>, included: bool) -> Self {
        PoseidonBuiltinRunner {
            base: 0,
            ratio,
            stop_ptr: None,
            included,
            cache: RefCell::new(HashMap::new()),
        }
    }
}

impl BuiltinRunnerCapabilities for PoseidonBuiltinRunner {
    fn name(&self) -> BuiltinName {
        BuiltinName::poseidon
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
        CELLS_PER_POSEIDON
    }

    fn n_input_cells(&self) -> u32 {
        INPUT_CELLS_PER_POSEIDON
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

    /// Cells 3..6 of an instance hold the Hades permutation of cells 0..3.
    fn deduce_memory_cell(
        &self,
        address: Relocatable,
        memory: &Memory,
    ) -> Result<Option<MaybeRelocatable>, RunnerError> {
        let index = address.offset % CELLS_PER_POSEIDON as usize;
        if index < INPUT_CELLS_PER_POSEIDON as usize {
            return Ok(None);
        }
        if let Some(felt) = self.cache.borrow().get(&address) {
            return Ok(Some(felt.into()));
        }
        let first_input_addr = (address - index)?;
        let first_output_addr = (first_input_addr + INPUT_CELLS_PER_POSEIDON as usize)?;

        let mut state = [Felt252::ZERO; INPUT_CELLS_PER_POSEIDON as usize];
        for (i, slot) in state.iter_mut().enumerate() {
            let input_addr = (first_input_addr + i)?;
            let Some(value) = memory.get(&input_addr) else {
                return Ok(None);
            };
            *slot = value.get_int().ok_or_else(|| {
                RunnerError::BuiltinExpectedInteger(Box::new((BuiltinName::poseidon, input_addr)))
            })?;
        }
        Poseidon::hades_permutation(&mut state);

        let mut cache = self.cache.borrow_mut();
        for (i, elem) in state.into_iter().enumerate() {
            cache.insert((first_output_addr + i)?, elem);
        }
        Ok(cache.get(&address).map(MaybeRelocatable::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relocatable;
    use crate::utils::test_utils::*;
    use crate::vm::runners::builtin_runner::BuiltinRunner;

    fn permuted(inputs: [u64; 3]) -> [Felt252; 3] {
        let mut state = inputs.map(Felt252::from);
        Poseidon::hades_permutation(&mut state);
        state
    }

    #[test]
    fn deduce_every_output_cell() {
        let memory = memory![((0, 6), 1), ((0, 7), 2), ((0, 8), 3)];
        let builtin = PoseidonBuiltinRunner::new(Some(32), true);
        let expected = permuted([1, 2, 3]);
        for (i, value) in expected.iter().enumerate() {
            assert_eq!(
                builtin.deduce_memory_cell(relocatable!(0, 9 + i), &memory),
                Ok(Some(MaybeRelocatable::from(*value)))
            );
        }
    }

    #[test]
    fn deduce_input_cell() {
        let memory = memory![((0, 0), 1), ((0, 1), 2), ((0, 2), 3)];
        let builtin = PoseidonBuiltinRunner::new(Some(32), true);
        assert_eq!(builtin.deduce_memory_cell(relocatable!(0, 2), &memory), Ok(None));
    }

    #[test]
    fn deduce_missing_input() {
        let memory = memory![((0, 0), 1), ((0, 2), 3)];
        let builtin = PoseidonBuiltinRunner::new(Some(32), true);
        assert_eq!(builtin.deduce_memory_cell(relocatable!(0, 3), &memory), Ok(None));
    }

    #[test]
    fn deduce_pointer_input() {
        let memory = memory![((0, 0), 1), ((0, 1), (1, 0)), ((0, 2), 3)];
        let builtin = PoseidonBuiltinRunner::new(Some(32), true);
        assert_eq!(
            builtin.deduce_memory_cell(relocatable!(0, 4), &memory),
            Err(RunnerError::BuiltinExpectedInteger(Box::new((
                BuiltinName::poseidon,
                relocatable!(0, 1)
            ))))
        );
    }

    #[test]
    fn permutation_changes_state() {
        assert_ne!(permuted([0, 0, 0]), [Felt252::ZERO; 3]);
    }

    #[test]
    fn get_used_instances() {
        let builtin: BuiltinRunner = PoseidonBuiltinRunner::new(Some(32), true).into();
        let mut vm = vm!();
        vm.segments.segment_used_sizes = Some(vec![13]);
        assert_eq!(builtin.get_used_instances(&vm.segments), Ok(3));
    }

    #[test]
    fn initial_stack_not_included() {
        let builtin = PoseidonBuiltinRunner::new(Some(32), false);
        assert!(builtin.initial_stack().is_empty());
    }
}
