use crate::types::builtin_name::BuiltinName;
use crate::types::instance_definitions::CELLS_PER_RANGE_CHECK;
use crate::types::relocatable::Relocatable;
use crate::vm::errors::memory_errors::MemoryError;
use crate::vm::vm_memory::memory::{Memory, ValidationRule};
use crate::vm::vm_memory::memory_segments::MemorySegmentManager;
use crate::Felt252;

use super::BuiltinRunnerCapabilities;

/// Values stored in the segment must fit in this many bits.
pub const RANGE_CHECK_BITS: u64 = 128;

#[derive(Debug, Clone)]
pub struct RangeCheckBuiltinRunner {
    ratio: Option<u32>,
    base: usize,
    pub(crate) stop_ptr: Option<usize>,
    pub(crate) included: bool,
}

impl RangeCheckBuiltinRunner {
    pub fn new(ratio: Option<u32>, included: bool) -> RangeCheckBuiltinRunner {
        RangeCheckBuiltinRunner {
            ratio,
            base: 0,
            stop_ptr: None,
            included,
        }
    }

    /// Largest value accepted by the segment.
    pub fn bound(&self) -> Felt252 {
        Felt252::from(u128::MAX)
    }
}

impl BuiltinRunnerCapabilities for RangeCheckBuiltinRunner {
    fn name(&self) -> BuiltinName {
        BuiltinName::range_check
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
        CELLS_PER_RANGE_CHECK
    }

    fn n_input_cells(&self) -> u32 {
        CELLS_PER_RANGE_CHECK
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

    fn add_validation_rule(&self, memory: &mut Memory) {
        let rule = ValidationRule(Box::new(
            |memory: &Memory, address: Relocatable| -> Result<Vec<Relocatable>, MemoryError> {
                let num = memory
                    .get_integer(address)
                    .map_err(|_| MemoryError::RangeCheckFoundNonInt(Box::new(address)))?;
                if num.bits() as u64 <= RANGE_CHECK_BITS {
                    Ok(vec![address])
                } else {
                    Err(MemoryError::RangeCheckNumOutOfBounds(Box::new((
                        num.into_owned(),
                        Felt252::from(u128::MAX),
                    ))))
                }
            },
        ));
        memory.add_validation_rule(self.base, rule);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relocatable;
    use crate::utils::test_utils::*;
    use crate::vm::errors::runner_errors::RunnerError;
    use crate::vm::runners::builtin_runner::BuiltinRunner;
    use assert_matches::assert_matches;

    fn validated_memory() -> Memory {
        let mut memory = Memory::new();
        memory.data.push(Vec::new());
        RangeCheckBuiltinRunner::new(Some(8), true).add_validation_rule(&mut memory);
        memory
    }

    #[test]
    fn get_used_instances() {
        let builtin = RangeCheckBuiltinRunner::new(Some(10), true);
        let mut vm = vm!();
        vm.segments.segment_used_sizes = Some(vec![1]);
        assert_eq!(builtin.get_used_instances(&vm.segments), Ok(1));
    }

    #[test]
    fn final_stack() {
        let mut builtin: BuiltinRunner = RangeCheckBuiltinRunner::new(Some(10), true).into();
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
    fn final_stack_error_non_relocatable() {
        let mut builtin: BuiltinRunner = RangeCheckBuiltinRunner::new(Some(10), true).into();
        let mut vm = vm!();
        vm.segments = segments![((0, 0), (0, 0)), ((2, 0), 2)];
        vm.segments.segment_used_sizes = Some(vec![0]);
        assert_eq!(
            builtin.final_stack(&vm.segments, relocatable!(2, 1)),
            Err(RunnerError::NoStopPointer(Box::new(BuiltinName::range_check)))
        );
    }

    #[test]
    fn initialize_segments_and_initial_stack() {
        let mut builtin = RangeCheckBuiltinRunner::new(Some(8), true);
        let mut segments = MemorySegmentManager::new();
        segments.add();
        builtin.initialize_segments(&mut segments);
        assert_eq!(builtin.base(), 1);
        assert_eq!(builtin.initial_stack(), vec![mayberelocatable!(1, 0)]);
        assert_eq!(builtin.ratio(), Some(8));
    }

    #[test]
    fn get_used_cells_missing_segment_used_sizes() {
        let builtin = RangeCheckBuiltinRunner::new(Some(256), true);
        let vm = vm!();
        assert_eq!(
            builtin.get_used_cells(&vm.segments),
            Err(MemoryError::MissingSegmentUsedSizes)
        );
    }

    #[test]
    fn accepts_largest_value() {
        let mut memory = validated_memory();
        assert_eq!(
            memory.insert(relocatable!(0, 0), Felt252::from(u128::MAX)),
            Ok(())
        );
        assert_eq!(memory.insert(relocatable!(0, 1), Felt252::ZERO), Ok(()));
    }

    #[test]
    fn rejects_two_to_the_128() {
        let mut memory = validated_memory();
        let value = Felt252::from(u128::MAX) + Felt252::ONE;
        assert_eq!(
            memory.insert(relocatable!(0, 0), value),
            Err(MemoryError::RangeCheckNumOutOfBounds(Box::new((
                value,
                Felt252::from(u128::MAX)
            ))))
        );
    }

    #[test]
    fn rejects_negative_values() {
        let mut memory = validated_memory();
        assert_matches!(
            memory.insert(relocatable!(0, 0), Felt252::from(-1)),
            Err(MemoryError::RangeCheckNumOutOfBounds(_))
        );
    }

    #[test]
    fn rejects_pointers() {
        let mut memory = validated_memory();
        assert_eq!(
            memory.insert(relocatable!(0, 0), relocatable!(0, 4)),
            Err(MemoryError::RangeCheckFoundNonInt(Box::new(relocatable!(
                0, 0
            ))))
        );
    }

    #[test]
    fn out_of_bounds_message() {
        let err = MemoryError::RangeCheckNumOutOfBounds(Box::new((
            Felt252::from(-1),
            RangeCheckBuiltinRunner::new(None, true).bound(),
        )));
        assert!(err
            .to_string()
            .ends_with("is out of valid range [0, 340282366920938463463374607431768211455]"));
    }

    #[test]
    fn deduces_nothing() {
        let builtin = RangeCheckBuiltinRunner::new(Some(8), true);
        let memory = memory![((0, 0), 5)];
        assert_eq!(builtin.deduce_memory_cell(relocatable!(0, 0), &memory), Ok(None));
    }
}
