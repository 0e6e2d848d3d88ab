use num_integer::{div_ceil, div_floor};

use crate::types::builtin_name::BuiltinName;
use crate::types::relocatable::{MaybeRelocatable, Relocatable};
use crate::vm::errors::memory_errors::{InsufficientAllocatedCellsError, MemoryError};
use crate::vm::errors::runner_errors::RunnerError;
use crate::vm::errors::vm_errors::VirtualMachineError;
use crate::vm::vm_core::VirtualMachine;
use crate::vm::vm_memory::memory::Memory;
use crate::vm::vm_memory::memory_segments::MemorySegmentManager;

mod bitwise;
mod ec_op;
mod hash;
mod output;
mod poseidon;
mod range_check;
mod segment_arena;
mod signature;

pub use bitwise::BitwiseBuiltinRunner;
pub use ec_op::EcOpBuiltinRunner;
pub use hash::HashBuiltinRunner;
pub use output::OutputBuiltinRunner;
pub use poseidon::PoseidonBuiltinRunner;
pub use range_check::RangeCheckBuiltinRunner;
pub use segment_arena::{squash_dict_accesses, DictAccess, SegmentArenaBuiltinRunner};
pub use signature::SignatureBuiltinRunner;

/// What every builtin can do with its own segment.
///
/// Only the accessors are mandatory; builtins that neither validate nor
/// deduce cells keep the default no-ops.
pub trait BuiltinRunnerCapabilities {
    fn name(&self) -> BuiltinName;

    /// Index of the builtin's segment.
    fn base(&self) -> usize;

    /// Whether the program declares the builtin (and so receives a pointer).
    fn included(&self) -> bool;

    /// Steps per instance in the layout, `None` when unbounded.
    fn ratio(&self) -> Option<u32> {
        None
    }

    fn cells_per_instance(&self) -> u32;

    fn n_input_cells(&self) -> u32;

    fn stop_ptr(&self) -> Option<usize>;

    fn set_stop_ptr(&mut self, stop_ptr: usize);

    fn initialize_segments(&mut self, segments: &mut MemorySegmentManager);

    /// Pointers pushed on the entry stack for the program to use.
    fn initial_stack(&self) -> Vec<MaybeRelocatable> {
        if self.included() {
            vec![Relocatable::from((self.base() as isize, 0)).into()]
        } else {
            vec![]
        }
    }

    /// Registers the per-write validation of the builtin's cells, if any.
    fn add_validation_rule(&self, _memory: &mut Memory) {}

    /// Computes an output cell from the instance's inputs. `Ok(None)` means
    /// the cell can't be deduced (input cell or inputs missing).
    fn deduce_memory_cell(
        &self,
        _address: Relocatable,
        _memory: &Memory,
    ) -> Result<Option<MaybeRelocatable>, RunnerError> {
        Ok(None)
    }

    /// Consistency check over the whole segment, run once after execution.
    fn final_check(&self, _segments: &MemorySegmentManager) -> Result<(), RunnerError> {
        Ok(())
    }

    fn get_used_cells(&self, segments: &MemorySegmentManager) -> Result<usize, MemoryError> {
        segments
            .get_segment_used_size(self.base())
            .ok_or(MemoryError::MissingSegmentUsedSizes)
    }

    fn get_used_instances(&self, segments: &MemorySegmentManager) -> Result<usize, MemoryError> {
        Ok(div_ceil(
            self.get_used_cells(segments)?,
            self.cells_per_instance() as usize,
        ))
    }

    /// Offset the program's returned pointer must have once the run ends.
    fn expected_stop_offset(&self, segments: &MemorySegmentManager) -> Result<usize, MemoryError> {
        Ok(self.get_used_instances(segments)? * self.cells_per_instance() as usize)
    }
}

/// Every builtin a run can hold. Dispatch goes through
/// [`BuiltinRunner::capabilities`], so adding a builtin means adding a
/// variant and one match arm there.
#[derive(Debug, Clone)]
pub enum BuiltinRunner {
    Output(OutputBuiltinRunner),
    Hash(HashBuiltinRunner),
    RangeCheck(RangeCheckBuiltinRunner),
    Signature(SignatureBuiltinRunner),
    Bitwise(BitwiseBuiltinRunner),
    EcOp(EcOpBuiltinRunner),
    Poseidon(PoseidonBuiltinRunner),
    SegmentArena(SegmentArenaBuiltinRunner),
}

impl BuiltinRunner {
    /// Builds the runner for `name` with the given ratio.
    pub fn new(name: BuiltinName, ratio: Option<u32>, included: bool) -> BuiltinRunner {
        match name {
            BuiltinName::output => OutputBuiltinRunner::new(included).into(),
            BuiltinName::pedersen => HashBuiltinRunner::new(ratio, included).into(),
            BuiltinName::range_check => RangeCheckBuiltinRunner::new(ratio, included).into(),
            BuiltinName::ecdsa => SignatureBuiltinRunner::new(ratio, included).into(),
            BuiltinName::bitwise => BitwiseBuiltinRunner::new(ratio, included).into(),
            BuiltinName::ec_op => EcOpBuiltinRunner::new(ratio, included).into(),
            BuiltinName::poseidon => PoseidonBuiltinRunner::new(ratio, included).into(),
            BuiltinName::segment_arena => SegmentArenaBuiltinRunner::new(included).into(),
        }
    }

    pub fn capabilities(&self) -> &dyn BuiltinRunnerCapabilities {
        match self {
            BuiltinRunner::Output(b) => b,
            BuiltinRunner::Hash(b) => b,
            BuiltinRunner::RangeCheck(b) => b,
            BuiltinRunner::Signature(b) => b,
            BuiltinRunner::Bitwise(b) => b,
            BuiltinRunner::EcOp(b) => b,
            BuiltinRunner::Poseidon(b) => b,
            BuiltinRunner::SegmentArena(b) => b,
        }
    }

    pub fn capabilities_mut(&mut self) -> &mut dyn BuiltinRunnerCapabilities {
        match self {
            BuiltinRunner::Output(b) => b,
            BuiltinRunner::Hash(b) => b,
            BuiltinRunner::RangeCheck(b) => b,
            BuiltinRunner::Signature(b) => b,
            BuiltinRunner::Bitwise(b) => b,
            BuiltinRunner::EcOp(b) => b,
            BuiltinRunner::Poseidon(b) => b,
            BuiltinRunner::SegmentArena(b) => b,
        }
    }

    pub fn name(&self) -> BuiltinName {
        self.capabilities().name()
    }

    pub fn base(&self) -> usize {
        self.capabilities().base()
    }

    pub fn included(&self) -> bool {
        self.capabilities().included()
    }

    pub fn ratio(&self) -> Option<u32> {
        self.capabilities().ratio()
    }

    pub fn initialize_segments(&mut self, segments: &mut MemorySegmentManager) {
        self.capabilities_mut().initialize_segments(segments)
    }

    pub fn initial_stack(&self) -> Vec<MaybeRelocatable> {
        self.capabilities().initial_stack()
    }

    pub fn add_validation_rule(&self, memory: &mut Memory) {
        self.capabilities().add_validation_rule(memory)
    }

    pub fn deduce_memory_cell(
        &self,
        address: Relocatable,
        memory: &Memory,
    ) -> Result<Option<MaybeRelocatable>, RunnerError> {
        self.capabilities().deduce_memory_cell(address, memory)
    }

    pub fn final_check(&self, segments: &MemorySegmentManager) -> Result<(), RunnerError> {
        self.capabilities().final_check(segments)
    }

    pub fn get_used_cells(&self, segments: &MemorySegmentManager) -> Result<usize, MemoryError> {
        self.capabilities().get_used_cells(segments)
    }

    pub fn get_used_instances(
        &self,
        segments: &MemorySegmentManager,
    ) -> Result<usize, MemoryError> {
        self.capabilities().get_used_instances(segments)
    }

    pub fn get_memory_segment_addresses(&self) -> (usize, Option<usize>) {
        (self.base(), self.capabilities().stop_ptr())
    }

    /// Checks the pointer the program returned for this builtin and returns
    /// the address of the next builtin's pointer on the stack.
    ///
    /// `pointer` is one past this builtin's stop pointer. Builtins the
    /// program doesn't declare have nothing on the stack.
    pub fn final_stack(
        &mut self,
        segments: &MemorySegmentManager,
        pointer: Relocatable,
    ) -> Result<Relocatable, RunnerError> {
        if !self.included() {
            self.capabilities_mut().set_stop_ptr(0);
            return Ok(pointer);
        }
        let name = self.name();
        let stop_pointer_addr =
            (pointer - 1).map_err(|_| RunnerError::NoStopPointer(Box::new(name)))?;
        let stop_pointer = segments
            .memory
            .get_relocatable(stop_pointer_addr)
            .map_err(|_| RunnerError::NoStopPointer(Box::new(name)))?;
        if self.base() as isize != stop_pointer.segment_index {
            return Err(RunnerError::InvalidStopPointerIndex(Box::new((
                name,
                stop_pointer,
                self.base(),
            ))));
        }
        let expected = self.capabilities().expected_stop_offset(segments)?;
        if stop_pointer.offset != expected {
            return Err(RunnerError::InvalidStopPointer(Box::new((
                name,
                Relocatable::from((self.base() as isize, expected)),
                stop_pointer,
            ))));
        }
        self.capabilities_mut().set_stop_ptr(stop_pointer.offset);
        Ok(stop_pointer_addr)
    }

    /// Instances the layout reserves for `vm.current_step` steps.
    pub fn get_allocated_instances(&self, vm: &VirtualMachine) -> Result<usize, MemoryError> {
        match self.ratio() {
            None => Ok(self.get_used_instances(&vm.segments)?),
            Some(0) => Ok(0),
            Some(ratio) => {
                let min_step = ratio as usize;
                if vm.current_step < min_step {
                    return Err(InsufficientAllocatedCellsError::MinStepNotReached(Box::new((
                        min_step,
                        self.name().to_str(),
                    )))
                    .into());
                }
                Ok(div_floor(vm.current_step, ratio as usize))
            }
        }
    }

    /// Used cells and the cells the layout allocates; fails when the first
    /// exceeds the second.
    pub fn get_used_cells_and_allocated_size(
        &self,
        vm: &VirtualMachine,
    ) -> Result<(usize, usize), MemoryError> {
        let used = self.get_used_cells(&vm.segments)?;
        if matches!(self, BuiltinRunner::Output(_) | BuiltinRunner::SegmentArena(_)) {
            return Ok((used, used));
        }
        let size =
            self.get_allocated_instances(vm)? * self.capabilities().cells_per_instance() as usize;
        if used > size {
            return Err(InsufficientAllocatedCellsError::BuiltinCells(Box::new((
                self.name().to_str(),
                used,
                size,
            )))
            .into());
        }
        Ok((used, size))
    }

    /// Checks that every instance in the segment has all its input cells
    /// and that its unwritten output cells can be deduced.
    pub fn run_security_checks(&self, vm: &VirtualMachine) -> Result<(), VirtualMachineError> {
        if matches!(self, BuiltinRunner::Output(_) | BuiltinRunner::SegmentArena(_)) {
            return Ok(());
        }
        let cells_per_instance = self.capabilities().cells_per_instance() as usize;
        let n_input_cells = self.capabilities().n_input_cells() as usize;
        let base = self.base();
        let segment = match vm.segments.memory.data.get(base) {
            Some(segment) if !segment.is_empty() => segment,
            _ => return Ok(()),
        };
        let written = segment.iter().filter(|cell| cell.is_some()).count();
        let n_instances = div_floor(segment.len() - 1, cells_per_instance) + 1;
        if n_instances > div_floor(written, n_input_cells) {
            return Err(
                MemoryError::MissingMemoryCells(Box::new(self.name().to_str_with_suffix())).into(),
            );
        }

        let is_missing = |offset: usize| segment.get(offset).map_or(true, Option::is_none);
        let missing_offsets: Vec<usize> = (0..n_instances)
            .flat_map(|i| (0..n_input_cells).map(move |j| i * cells_per_instance + j))
            .filter(|offset| is_missing(*offset))
            .collect();
        if !missing_offsets.is_empty() {
            return Err(MemoryError::MissingMemoryCellsWithOffsets(Box::new((
                self.name().to_str_with_suffix(),
                missing_offsets,
            )))
            .into());
        }

        // Written outputs are covered by verify_auto_deductions.
        for i in 0..n_instances {
            for j in n_input_cells..cells_per_instance {
                let offset = i * cells_per_instance + j;
                if is_missing(offset) {
                    vm.verify_auto_deductions_for_addr(
                        Relocatable::from((base as isize, offset)),
                        self,
                    )?;
                }
            }
        }
        Ok(())
    }
}

impl From<OutputBuiltinRunner> for BuiltinRunner {
    fn from(runner: OutputBuiltinRunner) -> Self {
        BuiltinRunner::Output(runner)
    }
}

impl From<HashBuiltinRunner> for BuiltinRunner {
    fn from(runner: HashBuiltinRunner) -> Self {
        BuiltinRunner::Hash(runner)
    }
}

impl From<RangeCheckBuiltinRunner> for BuiltinRunner {
    fn from(runner: RangeCheckBuiltinRunner) -> Self {
        BuiltinRunner::RangeCheck(runner)
    }
}

impl From<SignatureBuiltinRunner> for BuiltinRunner {
    fn from(runner: SignatureBuiltinRunner) -> Self {
        BuiltinRunner::Signature(runner)
    }
}

impl From<BitwiseBuiltinRunner> for BuiltinRunner {
    fn from(runner: BitwiseBuiltinRunner) -> Self {
        BuiltinRunner::Bitwise(runner)
    }
}

impl From<EcOpBuiltinRunner> for BuiltinRunner {
    fn from(runner: EcOpBuiltinRunner) -> Self {
        BuiltinRunner::EcOp(runner)
    }
}

impl From<PoseidonBuiltinRunner> for BuiltinRunner {
    fn from(runner: PoseidonBuiltinRunner) -> Self {
        BuiltinRunner::Poseidon(runner)
    }
}

impl From<SegmentArenaBuiltinRunner> for BuiltinRunner {
    fn from(runner: SegmentArenaBuiltinRunner) -> Self {
        BuiltinRunner::SegmentArena(runner)
    }
}
