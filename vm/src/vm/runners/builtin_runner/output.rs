use crate::types::builtin_name::BuiltinName;
use crate::vm::vm_memory::memory_segments::MemorySegmentManager;

use super::BuiltinRunnerCapabilities;

/// The program's public output. Cells are written by the program and
/// printed after the run; nothing is validated or deduced.
#[derive(Debug, Clone)]
pub struct OutputBuiltinRunner {
    base: usize,
    pub(crate) stop_ptr: Option<usize>,
    pub(crate) included: bool,
}

impl OutputBuiltinRunner {
    pub fn new(included: bool) -> OutputBuiltinRunner {
        OutputBuiltinRunner {
            base: 0,
            stop_ptr: None,
            included,
        }
    }
}

impl BuiltinRunnerCapabilities for OutputBuiltinRunner {
    fn name(&self) -> BuiltinName {
        BuiltinName::output
    }

    fn base(&self) -> usize {
        self.base
    }

    fn included(&self) -> bool {
        self.included
    }

    fn cells_per_instance(&self) -> u32 {
        1
    }

    fn n_input_cells(&self) -> u32 {
        1
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
}

impl Default for OutputBuiltinRunner {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relocatable;
    use crate::types::relocatable::MaybeRelocatable;
    use crate::utils::test_utils::*;
    use crate::vm::errors::memory_errors::MemoryError;
    use crate::vm::errors::runner_errors::RunnerError;
    use crate::vm::runners::builtin_runner::BuiltinRunner;

    #[test]
    fn get_used_instances() {
        let builtin = OutputBuiltinRunner::new(true);
        let mut vm = vm!();
        vm.segments.segment_used_sizes = Some(vec![1]);
        assert_eq!(builtin.get_used_instances(&vm.segments), Ok(1));
    }

    #[test]
    fn final_stack() {
        let mut builtin: BuiltinRunner = OutputBuiltinRunner::new(true).into();
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
    fn final_stack_error_stop_pointer() {
        let mut builtin: BuiltinRunner = OutputBuiltinRunner::new(true).into();
        let mut vm = vm!();
        vm.segments = segments![
            ((0, 0), (0, 0)),
            ((0, 1), (0, 1)),
            ((2, 0), (0, 0)),
            ((2, 1), (0, 0))
        ];
        vm.segments.segment_used_sizes = Some(vec![998]);
        assert_eq!(
            builtin.final_stack(&vm.segments, relocatable!(2, 2)),
            Err(RunnerError::InvalidStopPointer(Box::new((
                BuiltinName::output,
                relocatable!(0, 998),
                relocatable!(0, 0)
            ))))
        );
    }

    #[test]
    fn final_stack_error_non_relocatable() {
        let mut builtin: BuiltinRunner = OutputBuiltinRunner::new(true).into();
        let mut vm = vm!();
        vm.segments = segments![((0, 0), (0, 0)), ((2, 0), 2)];
        vm.segments.segment_used_sizes = Some(vec![0]);
        assert_eq!(
            builtin.final_stack(&vm.segments, relocatable!(2, 1)),
            Err(RunnerError::NoStopPointer(Box::new(BuiltinName::output)))
        );
    }

    #[test]
    fn get_used_cells_and_allocated_size() {
        let builtin: BuiltinRunner = OutputBuiltinRunner::new(true).into();
        let mut vm = vm!();
        vm.segments.segment_used_sizes = Some(vec![4]);
        assert_eq!(builtin.get_used_cells_and_allocated_size(&vm), Ok((4, 4)));
    }

    #[test]
    fn get_used_cells_missing_segment_used_sizes() {
        let builtin = OutputBuiltinRunner::new(true);
        let vm = vm!();
        assert_eq!(
            builtin.get_used_cells(&vm.segments),
            Err(MemoryError::MissingSegmentUsedSizes)
        );
    }

    #[test]
    fn initialize_segments_and_initial_stack() {
        let mut builtin = OutputBuiltinRunner::default();
        let mut segments = MemorySegmentManager::new();
        segments.add();
        builtin.initialize_segments(&mut segments);
        assert_eq!(builtin.base(), 1);
        assert_eq!(
            builtin.initial_stack(),
            vec![MaybeRelocatable::from((1, 0))]
        );
        assert_eq!(builtin.ratio(), None);
    }
}
