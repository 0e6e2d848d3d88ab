use std::{
    collections::{HashMap, HashSet},
    fmt, io,
    path::Path,
};

use num_traits::Zero;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    cairo_run::{write_encoded_memory, write_encoded_trace, FileWriter},
    hint_processor::hint_processor_definition::{HintData, HintProcessor},
    types::{
        builtin_name::{BuiltinName, BUILTIN_ORDER},
        errors::program_errors::ProgramError,
        exec_scope::ExecutionScopes,
        layout::CairoLayout,
        program::Program,
        relocatable::{MaybeRelocatable, Relocatable},
    },
    utils::is_subsequence,
    vm::{
        errors::{
            cairo_run_errors::CairoRunError, memory_errors::MemoryError,
            runner_errors::RunnerError, trace_errors::TraceError, vm_errors::VirtualMachineError,
            vm_exception::VmException,
        },
        runners::builtin_runner::BuiltinRunner,
        security::verify_secure_runner,
        trace::trace_entry::RelocatedTraceEntry,
        vm_core::VirtualMachine,
    },
    Felt252,
};

/// A value the host passes to a Cairo function.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CairoArg {
    Single(MaybeRelocatable),
    Array(Vec<MaybeRelocatable>),
    Composed(Vec<CairoArg>),
}

impl From<MaybeRelocatable> for CairoArg {
    fn from(other: MaybeRelocatable) -> Self {
        CairoArg::Single(other)
    }
}

impl From<Vec<MaybeRelocatable>> for CairoArg {
    fn from(other: Vec<MaybeRelocatable>) -> Self {
        CairoArg::Array(other)
    }
}

// ================
//   RunResources
// ================

/// Step budget of a run. `None` means unbounded.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct RunResources {
    n_steps: Option<usize>,
}

/// Oversees the steps a run may still execute.
///
/// The default implementation ignores resource tracking altogether; hint
/// processors that carry a [`RunResources`] forward to it.
pub trait ResourceTracker {
    /// Returns true if there are no more steps left to run
    fn consumed(&self) -> bool {
        false
    }
    /// Subtracts 1 step from the available steps
    fn consume_step(&mut self) {}
    /// Returns the available steps for the run
    fn get_n_steps(&self) -> Option<usize> {
        None
    }
    /// Returns a reference to the available resources
    fn run_resources(&self) -> &RunResources {
        &RunResources { n_steps: None }
    }
}

impl RunResources {
    pub fn new(n_steps: usize) -> Self {
        Self {
            n_steps: Some(n_steps),
        }
    }
}

impl ResourceTracker for RunResources {
    fn consumed(&self) -> bool {
        self.n_steps == Some(0)
    }

    fn consume_step(&mut self) {
        if let Some(n_steps) = self.n_steps {
            self.n_steps = Some(n_steps.saturating_sub(1));
        }
    }

    fn get_n_steps(&self) -> Option<usize> {
        self.n_steps
    }

    fn run_resources(&self) -> &RunResources {
        self
    }
}

/// Lifecycle of a [`CairoRunner`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunnerState {
    Created,
    Initialized,
    Running,
    Finished,
    Failed,
}

/// Drives one program through initialization, execution, finalization and
/// relocation.
pub struct CairoRunner {
    pub vm: VirtualMachine,
    pub(crate) program: Program,
    layout: CairoLayout,
    proof_mode: bool,
    state: RunnerState,
    final_pc: Option<Relocatable>,
    pub program_base: Option<Relocatable>,
    execution_base: Option<Relocatable>,
    entrypoint: Option<usize>,
    initial_ap: Option<Relocatable>,
    initial_fp: Option<Relocatable>,
    initial_pc: Option<Relocatable>,
    segments_finalized: bool,
    execution_public_memory: Option<Vec<usize>>,
    // base of the hash builtin added by `add_additional_hash_builtin`
    additional_hash_builtin: Option<usize>,
    run_resources: RunResources,
    pub relocated_memory: Vec<Option<Felt252>>,
    pub relocated_trace: Option<Vec<RelocatedTraceEntry>>,
    pub exec_scopes: ExecutionScopes,
}

impl fmt::Debug for CairoRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CairoRunner")
            .field("layout", &self.layout.name)
            .field("proof_mode", &self.proof_mode)
            .field("state", &self.state)
            .field("pc", &self.vm.get_pc())
            .field("current_step", &self.vm.get_current_step())
            .finish_non_exhaustive()
    }
}

impl CairoRunner {
    /// Builds a runner with tracing enabled.
    pub fn new(program: &Program, layout: &str, proof_mode: bool) -> Result<CairoRunner, RunnerError> {
        Self::new_with_trace(program, layout, proof_mode, true)
    }

    pub fn new_with_trace(
        program: &Program,
        layout: &str,
        proof_mode: bool,
        trace_enabled: bool,
    ) -> Result<CairoRunner, RunnerError> {
        let layout = CairoLayout::from_name(layout)?;
        Ok(CairoRunner {
            vm: VirtualMachine::new(trace_enabled),
            program: program.clone(),
            layout,
            proof_mode,
            state: RunnerState::Created,
            final_pc: None,
            program_base: None,
            execution_base: None,
            entrypoint: program.shared_program_data.main,
            initial_ap: None,
            initial_fp: None,
            initial_pc: None,
            segments_finalized: false,
            execution_public_memory: proof_mode.then(Vec::new),
            additional_hash_builtin: None,
            run_resources: RunResources::default(),
            relocated_memory: Vec::new(),
            relocated_trace: None,
            exec_scopes: ExecutionScopes::new(),
        })
    }

    /// Parses `program_bytes` and builds a runner for it. The entrypoint
    /// defaults to `main` and the layout to `plain`.
    pub fn new_runner(
        program_bytes: &[u8],
        entrypoint: Option<&str>,
        layout: Option<&str>,
        proof_mode: bool,
    ) -> Result<CairoRunner, CairoRunError> {
        let program = Program::from_bytes(program_bytes, Some(entrypoint.unwrap_or("main")))?;
        Ok(CairoRunner::new(
            &program,
            layout.unwrap_or("plain"),
            proof_mode,
        )?)
    }

    pub fn from_file(
        path: &Path,
        entrypoint: Option<&str>,
        layout: Option<&str>,
        proof_mode: bool,
    ) -> Result<CairoRunner, CairoRunError> {
        let program_bytes = std::fs::read(path).map_err(ProgramError::from)?;
        Self::new_runner(&program_bytes, entrypoint, layout, proof_mode)
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn layout(&self) -> &CairoLayout {
        &self.layout
    }

    pub fn set_run_resources(&mut self, run_resources: RunResources) {
        self.run_resources = run_resources;
    }

    /// Builtins, segments, main entrypoint and registers, in that order.
    /// Returns the pc at which the run ends.
    pub fn initialize(&mut self) -> Result<Relocatable, RunnerError> {
        self.initialize_builtins()?;
        self.initialize_segments(None);
        let end = self.initialize_main_entrypoint()?;
        self.initialize_vm()?;
        debug!(
            layout = self.layout.name(),
            proof_mode = self.proof_mode,
            end = %end,
            "runner initialized"
        );
        Ok(end)
    }

    /// Creates the builtin runners the program needs from the layout.
    ///
    /// In proof mode every builtin of the layout gets a runner and only the
    /// ones the program declares are included. A declared builtin the
    /// layout lacks is an error.
    pub fn initialize_builtins(&mut self) -> Result<(), RunnerError> {
        if !is_subsequence(&self.program.builtins, &BUILTIN_ORDER) {
            return Err(RunnerError::DisorderedBuiltins);
        }
        let mut program_builtins: HashSet<BuiltinName> =
            self.program.builtins.iter().copied().collect();

        let layout = &self.layout.builtins;
        // Outer None: not in the layout. Inner value: the ratio.
        let layout_builtins = [
            (BuiltinName::output, layout.output.then_some(None)),
            (BuiltinName::pedersen, layout.pedersen.map(Some)),
            (BuiltinName::range_check, layout.range_check.map(Some)),
            (BuiltinName::ecdsa, layout.ecdsa.map(Some)),
            (BuiltinName::bitwise, layout.bitwise.map(Some)),
            (BuiltinName::ec_op, layout.ec_op.map(Some)),
            (BuiltinName::poseidon, layout.poseidon.map(Some)),
            // The arena has no ratio and is available everywhere.
            (BuiltinName::segment_arena, Some(None)),
        ];
        for (name, ratio) in layout_builtins {
            let Some(ratio) = ratio else {
                continue;
            };
            let included = program_builtins.remove(&name);
            if included || (self.proof_mode && name != BuiltinName::segment_arena) {
                self.vm
                    .builtin_runners
                    .push(BuiltinRunner::new(name, ratio, included));
            }
        }

        if !program_builtins.is_empty() {
            return Err(RunnerError::NoBuiltinForInstance(Box::new((
                program_builtins,
                self.layout.name().to_string(),
            ))));
        }
        Ok(())
    }

    /// Creates a runner for every builtin the program declares, in
    /// declaration order, ignoring the layout.
    pub fn initialize_program_builtins(&mut self) -> Result<(), RunnerError> {
        if !is_subsequence(&self.program.builtins, &BUILTIN_ORDER) {
            return Err(RunnerError::DisorderedBuiltins);
        }
        for name in self.program.builtins.iter() {
            let ratio = match name {
                BuiltinName::pedersen => Some(32),
                BuiltinName::output | BuiltinName::segment_arena => None,
                _ => Some(1),
            };
            self.vm
                .builtin_runners
                .push(BuiltinRunner::new(*name, ratio, true));
        }
        Ok(())
    }

    /// Allocates the program segment (unless `program_base` is given), the
    /// execution segment and one segment per builtin.
    pub fn initialize_segments(&mut self, program_base: Option<Relocatable>) {
        self.program_base = match program_base {
            Some(base) => Some(base),
            None => Some(self.vm.add_memory_segment()),
        };
        self.execution_base = Some(self.vm.add_memory_segment());
        for builtin_runner in self.vm.builtin_runners.iter_mut() {
            builtin_runner.initialize_segments(&mut self.vm.segments);
        }
    }

    fn initialize_state(
        &mut self,
        entrypoint: usize,
        stack: Vec<MaybeRelocatable>,
    ) -> Result<(), RunnerError> {
        let prog_base = self.program_base.ok_or(RunnerError::NoProgBase)?;
        let exec_base = self.execution_base.ok_or(RunnerError::NoExecBase)?;
        self.initial_pc = Some((prog_base + entrypoint)?);
        self.vm
            .load_data(prog_base, &self.program.shared_program_data.data)
            .map_err(RunnerError::MemoryInitializationError)?;

        // The whole program segment counts as accessed.
        for i in 0..self.program.shared_program_data.data.len() {
            self.vm.segments.memory.mark_as_accessed((prog_base + i)?);
        }
        self.vm
            .segments
            .load_data(exec_base, &stack)
            .map_err(RunnerError::MemoryInitializationError)?;
        Ok(())
    }

    /// Prepares a call to the function at `entrypoint` with `stack` as its
    /// arguments. Returns the pc the function returns to.
    pub fn initialize_function_entrypoint(
        &mut self,
        entrypoint: usize,
        mut stack: Vec<MaybeRelocatable>,
        return_fp: MaybeRelocatable,
    ) -> Result<Relocatable, RunnerError> {
        let end = self.vm.add_memory_segment();
        stack.extend([return_fp, end.into()]);
        let exec_base = self.execution_base.ok_or(RunnerError::NoExecBase)?;
        self.initial_fp = Some((exec_base + stack.len())?);
        self.initial_ap = self.initial_fp;
        self.initialize_state(entrypoint, stack)?;
        self.final_pc = Some(end);
        Ok(end)
    }

    /// Prepares the call to `main` (or to `__start__` in proof mode) with the
    /// builtin pointers as arguments. Returns the end pc.
    pub fn initialize_main_entrypoint(&mut self) -> Result<Relocatable, RunnerError> {
        let mut stack = Vec::new();
        for builtin_name in self.program.builtins.iter() {
            match self
                .vm
                .builtin_runners
                .iter()
                .find(|runner| runner.name() == *builtin_name)
            {
                Some(runner) => stack.extend(runner.initial_stack()),
                None => stack.push(Felt252::ZERO.into()),
            }
        }

        if self.proof_mode {
            let exec_base = self.execution_base.ok_or(RunnerError::NoExecBase)?;
            // [fp - 2] = fp, so the verifier can check the dummy frame.
            let target_offset: usize = 2;
            let mut stack_prefix: Vec<MaybeRelocatable> =
                vec![(exec_base + target_offset)?.into(), Felt252::ZERO.into()];
            stack_prefix.extend(stack);
            self.execution_public_memory = Some((0..stack_prefix.len()).collect());

            let start = self
                .program
                .shared_program_data
                .start
                .ok_or(RunnerError::NoProgramStart)?;
            self.initialize_state(start, stack_prefix)?;
            self.initial_fp = Some((exec_base + target_offset)?);
            self.initial_ap = self.initial_fp;

            let end = self
                .program
                .shared_program_data
                .end
                .ok_or(RunnerError::NoProgramEnd)?;
            return Ok((self.program_base.ok_or(RunnerError::NoProgBase)? + end)?);
        }

        let return_fp = self.vm.add_memory_segment();
        let main = self.entrypoint.ok_or(RunnerError::MissingMain)?;
        self.initialize_function_entrypoint(main, stack, return_fp.into())
    }

    /// Sets the registers and validates the memory written so far against
    /// the builtins' rules.
    pub fn initialize_vm(&mut self) -> Result<(), RunnerError> {
        self.vm.run_context.pc = self.initial_pc.ok_or(RunnerError::NoPC)?;
        self.vm.run_context.ap = self.initial_ap.ok_or(RunnerError::NoAP)?;
        self.vm.run_context.fp = self.initial_fp.ok_or(RunnerError::NoFP)?;
        for builtin in self.vm.builtin_runners.iter() {
            builtin.add_validation_rule(&mut self.vm.segments.memory);
        }

        self.vm
            .segments
            .memory
            .validate_existing_memory()
            .map_err(RunnerError::MemoryValidationError)?;
        self.state = RunnerState::Initialized;
        Ok(())
    }

    /// Allocates the program's builtins (in declaration order) and segments,
    /// for hosts that call functions with [`Self::run_from_entrypoint`].
    pub fn initialize_function_runner(&mut self) -> Result<(), RunnerError> {
        self.initialize_program_builtins()?;
        self.initialize_segments(self.program_base);
        Ok(())
    }

    pub fn initial_fp(&self) -> Option<Relocatable> {
        self.initial_fp
    }

    pub fn get_constants(&self) -> &HashMap<String, Felt252> {
        &self.program.constants
    }

    pub fn get_program(&self) -> &Program {
        &self.program
    }

    pub fn get_program_builtins(&self) -> &Vec<BuiltinName> {
        &self.program.builtins
    }

    /// Compiles every hint of the program, grouped by program offset.
    pub fn get_hint_data(
        &self,
        hint_processor: &dyn HintProcessor,
    ) -> Result<HashMap<usize, Vec<HintData>>, VirtualMachineError> {
        let references = &self.program.shared_program_data.reference_manager;
        self.program
            .shared_program_data
            .hints
            .iter()
            .map(|(pc, hints)| {
                let compiled = hints
                    .iter()
                    .enumerate()
                    .map(|(index, hint)| {
                        hint_processor
                            .compile_hint(
                                &hint.code,
                                &hint.flow_tracking_data.ap_tracking,
                                &hint.flow_tracking_data.reference_ids,
                                references,
                            )
                            .map_err(|err| VirtualMachineError::Hint(Box::new((index, err))))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((*pc, compiled))
            })
            .collect()
    }

    fn check_can_run(&self) -> Result<(), RunnerError> {
        match self.state {
            RunnerState::Initialized | RunnerState::Running => Ok(()),
            state => Err(RunnerError::InvalidState(Box::new((state, "run")))),
        }
    }

    fn step_with_hints(
        &mut self,
        hint_data: &HashMap<usize, Vec<HintData>>,
        hint_processor: &mut dyn HintProcessor,
    ) -> Result<(), VirtualMachineError> {
        let hints = hints_at(hint_data, self.program_base, self.vm.get_pc());
        self.vm
            .step(hint_processor, &mut self.exec_scopes, hints, &self.program.constants)
    }

    fn record_failure<T>(
        &mut self,
        result: Result<T, VirtualMachineError>,
    ) -> Result<T, VirtualMachineError> {
        if let Err(error) = &result {
            self.state = RunnerState::Failed;
            warn!(pc = %self.vm.get_pc(), step = self.vm.current_step, %error, "run failed");
        }
        result
    }

    /// Steps until pc reaches `address`. Stops with `StepsLimit` once the
    /// hint processor or the runner runs out of steps.
    pub fn run_until_pc(
        &mut self,
        address: Relocatable,
        hint_processor: &mut dyn HintProcessor,
    ) -> Result<(), VirtualMachineError> {
        self.check_can_run()?;
        let hint_data = self.get_hint_data(hint_processor)?;
        self.state = RunnerState::Running;
        let result = self.run_until_pc_with_hints(address, &hint_data, hint_processor);
        self.record_failure(result)
    }

    fn run_until_pc_with_hints(
        &mut self,
        address: Relocatable,
        hint_data: &HashMap<usize, Vec<HintData>>,
        hint_processor: &mut dyn HintProcessor,
    ) -> Result<(), VirtualMachineError> {
        while self.vm.get_pc() != address {
            if hint_processor.consumed() || self.run_resources.consumed() {
                return Err(VirtualMachineError::StepsLimit(
                    self.vm.current_step as u64,
                ));
            }
            self.step_with_hints(hint_data, hint_processor)?;
            hint_processor.consume_step();
            self.run_resources.consume_step();
        }
        Ok(())
    }

    /// Execute an exact number of steps on the program from the actual position.
    pub fn run_for_steps(
        &mut self,
        steps: usize,
        hint_processor: &mut dyn HintProcessor,
    ) -> Result<(), VirtualMachineError> {
        self.check_can_run()?;
        let hint_data = self.get_hint_data(hint_processor)?;
        self.state = RunnerState::Running;
        let mut result = Ok(());
        for remaining_steps in (1..=steps).rev() {
            if self.final_pc == Some(self.vm.get_pc()) {
                result = Err(VirtualMachineError::EndOfProgram(remaining_steps));
                break;
            }
            result = self.step_with_hints(&hint_data, hint_processor);
            if result.is_err() {
                break;
            }
        }
        self.record_failure(result)
    }

    /// Execute steps until a number of steps since the start of the program is reached.
    pub fn run_until_steps(
        &mut self,
        steps: usize,
        hint_processor: &mut dyn HintProcessor,
    ) -> Result<(), VirtualMachineError> {
        self.run_for_steps(steps.saturating_sub(self.vm.current_step), hint_processor)
    }

    /// Execute steps until the step counter reaches a power of two.
    pub fn run_until_next_power_of_2(
        &mut self,
        hint_processor: &mut dyn HintProcessor,
    ) -> Result<(), VirtualMachineError> {
        self.run_until_steps(self.vm.current_step.next_power_of_two(), hint_processor)
    }

    /// Ok when every builtin fits in the cells its ratio allocates for the
    /// steps run so far.
    pub fn check_used_cells(&self) -> Result<(), VirtualMachineError> {
        for builtin_runner in self.vm.builtin_runners.iter() {
            builtin_runner.get_used_cells_and_allocated_size(&self.vm)?;
        }
        Ok(())
    }

    /// Relocates temporary segments, checks the VM's final state and
    /// computes the segment sizes. In proof mode the run is padded until
    /// the step count is a power of two large enough for every builtin.
    pub fn end_run(
        &mut self,
        disable_trace_padding: bool,
        hint_processor: &mut dyn HintProcessor,
    ) -> Result<(), VirtualMachineError> {
        if self.state == RunnerState::Finished {
            return Err(RunnerError::EndRunCalledTwice.into());
        }

        self.vm.segments.memory.relocate_memory()?;
        self.vm.end_run(&self.exec_scopes)?;
        self.vm.segments.compute_effective_sizes();

        if self.proof_mode && !disable_trace_padding {
            self.run_until_next_power_of_2(hint_processor)?;
            loop {
                match self.check_used_cells() {
                    Ok(()) => break,
                    Err(VirtualMachineError::Memory(MemoryError::InsufficientAllocatedCells(
                        _,
                    ))) => {}
                    Err(error) => return Err(error),
                }
                self.run_for_steps(1, hint_processor)?;
                self.run_until_next_power_of_2(hint_processor)?;
            }
        }

        self.state = RunnerState::Finished;
        debug!(steps = self.vm.current_step, "run ended");
        Ok(())
    }

    /// Walks the builtin pointers `main` returned (in reverse declaration
    /// order, ending at ap) and records each builtin's stop pointer.
    pub fn read_return_values(&mut self) -> Result<(), RunnerError> {
        if self.state != RunnerState::Finished {
            return Err(RunnerError::ReadReturnValuesNoEndRun);
        }
        let mut pointer = self.vm.get_ap();
        for builtin_name in self.program.builtins.iter().rev() {
            let builtin_runner = self
                .vm
                .builtin_runners
                .iter_mut()
                .find(|b| b.name() == *builtin_name)
                .ok_or(RunnerError::MissingBuiltin(*builtin_name))?;
            pointer = builtin_runner.final_stack(&self.vm.segments, pointer)?;
        }
        // Builtins only present for the layout return nothing.
        for builtin_runner in self.vm.builtin_runners.iter_mut() {
            if !builtin_runner.included() {
                builtin_runner.final_stack(&self.vm.segments, pointer)?;
            }
        }
        if self.segments_finalized {
            return Err(RunnerError::FailedAddingReturnValues);
        }
        if self.proof_mode {
            let exec_base = self.execution_base.ok_or(RunnerError::NoExecBase)?;
            let begin = pointer.offset - exec_base.offset;
            let end = self.vm.get_ap().offset - exec_base.offset;
            self.execution_public_memory
                .as_mut()
                .ok_or(RunnerError::NoExecPublicMemory)?
                .extend(begin..end);
        }
        Ok(())
    }

    /// Calls `final_stack` on the program's builtins, last to first, starting
    /// from `stack_ptr`. Returns the pointer below the first builtin's.
    pub fn get_builtins_final_stack(
        &mut self,
        stack_ptr: Relocatable,
    ) -> Result<Relocatable, RunnerError> {
        let mut stack_ptr = stack_ptr;
        let program_builtins = &self.program.builtins;
        for runner in self
            .vm
            .builtin_runners
            .iter_mut()
            .rev()
            .filter(|runner| program_builtins.contains(&runner.name()))
        {
            stack_ptr = runner.final_stack(&self.vm.segments, stack_ptr)?
        }
        Ok(stack_ptr)
    }

    /// Initial stack of every builtin runner the program declares, in
    /// runner order. Empty until the builtins are created.
    pub fn get_program_builtins_initial_stack(&self) -> Vec<MaybeRelocatable> {
        self.vm
            .builtin_runners
            .iter()
            .filter(|runner| self.program.builtins.contains(&runner.name()))
            .flat_map(|runner| runner.initial_stack())
            .collect()
    }

    pub fn get_builtins_initial_stack(&self) -> Vec<Vec<MaybeRelocatable>> {
        self.vm
            .builtin_runners
            .iter()
            .map(|runner| runner.initial_stack())
            .collect()
    }

    /// Fixes the sizes and public memory of the program, execution and
    /// builtin segments. Proof mode only; call `read_return_values` first.
    pub fn finalize_segments(&mut self) -> Result<(), RunnerError> {
        if self.segments_finalized {
            return Ok(());
        }
        if self.state != RunnerState::Finished {
            return Err(RunnerError::FinalizeNoEndRun);
        }
        let size = self.program.shared_program_data.data.len();
        let public_memory: Vec<(usize, usize)> = (0..size).map(|i| (i, 0)).collect();
        let program_base = self.program_base.ok_or(RunnerError::NoProgBase)?;
        self.vm.segments.finalize(
            Some(size),
            program_base.segment_index as usize,
            Some(&public_memory),
        );

        let exec_base = self.execution_base.ok_or(RunnerError::NoExecBase)?;
        let public_memory: Vec<(usize, usize)> = self
            .execution_public_memory
            .as_ref()
            .ok_or(RunnerError::FinalizeSegmentsNoProofMode)?
            .iter()
            .map(|offset| (offset + exec_base.offset, 0))
            .collect();
        self.vm
            .segments
            .finalize(None, exec_base.segment_index as usize, Some(&public_memory));

        for builtin_runner in self.vm.builtin_runners.iter() {
            let (used, size) = builtin_runner
                .get_used_cells_and_allocated_size(&self.vm)
                .map_err(RunnerError::FinalizeSegements)?;
            let public_memory: Option<Vec<(usize, usize)>> =
                matches!(builtin_runner, BuiltinRunner::Output(_))
                    .then(|| (0..used).map(|i| (i, 0)).collect());
            self.vm
                .segments
                .finalize(Some(size), builtin_runner.base(), public_memory.as_ref());
        }
        self.segments_finalized = true;
        Ok(())
    }

    /// `final_check` of every builtin over its segment.
    pub fn run_final_checks(&self) -> Result<(), RunnerError> {
        for builtin_runner in self.vm.builtin_runners.iter() {
            builtin_runner.final_check(&self.vm.segments)?;
        }
        Ok(())
    }

    /// Segment index and stop pointer of every builtin.
    pub fn get_builtin_segments_info(&self) -> Result<Vec<(usize, usize)>, RunnerError> {
        self.vm
            .builtin_runners
            .iter()
            .map(|builtin| {
                let (index, stop_ptr) = builtin.get_memory_segment_addresses();
                let stop_ptr =
                    stop_ptr.ok_or_else(|| RunnerError::NoStopPointer(Box::new(builtin.name())))?;
                Ok((index, stop_ptr))
            })
            .collect()
    }

    /// Count the number of holes present in the segments.
    pub fn get_memory_holes(&self) -> Result<usize, MemoryError> {
        // The output builtin's cells are written by the program and count.
        let builtin_segment_indexes: HashSet<usize> = self
            .vm
            .builtin_runners
            .iter()
            .filter(|b| b.name() != BuiltinName::output)
            .map(|b| b.base())
            .collect();

        self.vm.segments.get_memory_holes(&builtin_segment_indexes)
    }

    pub fn get_execution_resources(&self) -> Result<ExecutionResources, RunnerError> {
        let n_steps = self
            .vm
            .trace
            .as_ref()
            .map(Vec::len)
            .unwrap_or(self.vm.current_step);
        let n_memory_holes = self.get_memory_holes()?;

        let mut builtin_instance_counter = HashMap::new();
        for builtin_runner in self.vm.builtin_runners.iter() {
            builtin_instance_counter.insert(
                builtin_runner.name(),
                builtin_runner.get_used_instances(&self.vm.segments)?,
            );
        }

        Ok(ExecutionResources {
            n_steps,
            n_memory_holes,
            builtin_instance_counter,
        })
    }

    /// Relocates the VM's trace, turning relocatable registers into flat addresses.
    pub fn relocate_trace(&mut self, relocation_table: &[usize]) -> Result<(), TraceError> {
        if self.relocated_trace.is_some() {
            return Err(TraceError::AlreadyRelocated);
        }
        let trace = self.vm.trace.as_ref().ok_or(TraceError::TraceNotEnabled)?;
        let relocated_trace = trace
            .iter()
            .map(|entry| entry.relocate(relocation_table))
            .collect::<Result<Vec<_>, _>>()?;
        self.relocated_trace = Some(relocated_trace);
        Ok(())
    }

    fn relocate_memory(&mut self, relocation_table: &[usize]) -> Result<(), MemoryError> {
        if !self.relocated_memory.is_empty() {
            return Err(MemoryError::Relocation);
        }
        self.relocated_memory = self.vm.segments.relocate_memory(relocation_table)?;
        Ok(())
    }

    /// Flattens the memory (when `relocate_mem`) and the trace (when enabled)
    /// into address space starting at 1.
    pub fn relocate(&mut self, relocate_mem: bool) -> Result<(), TraceError> {
        self.vm.segments.compute_effective_sizes();
        if !relocate_mem && self.vm.trace.is_none() {
            return Ok(());
        }
        let relocation_table = self.vm.segments.relocate_segments()?;
        if relocate_mem {
            self.relocate_memory(&relocation_table)?;
        }
        if self.vm.trace.is_some() {
            self.relocate_trace(&relocation_table)?;
        }
        debug!(segments = relocation_table.len(), "relocated run");
        Ok(())
    }

    /// Runs the function at program offset `entrypoint` with `args`. The
    /// runner must have been prepared with
    /// [`Self::initialize_function_runner`].
    pub fn run_from_entrypoint(
        &mut self,
        entrypoint: usize,
        args: &[&CairoArg],
        verify_secure: bool,
        program_segment_size: Option<usize>,
        hint_processor: &mut dyn HintProcessor,
    ) -> Result<(), CairoRunError> {
        let stack = args
            .iter()
            .map(|arg| self.vm.segments.gen_arg(arg))
            .collect::<Result<Vec<MaybeRelocatable>, MemoryError>>()?;
        let return_fp = MaybeRelocatable::from(0);
        let end = self.initialize_function_entrypoint(entrypoint, stack, return_fp)?;
        self.initialize_vm()?;

        self.run_until_pc(end, hint_processor)
            .map_err(|err| VmException::from_vm_error(self, err))?;
        self.end_run(true, hint_processor)?;

        if verify_secure {
            verify_secure_runner(self, false, program_segment_size)?;
        }
        Ok(())
    }

    /// Overrides the entrypoint with `__main__.{new_entrypoint}`, `main`
    /// when `None`.
    pub fn set_entrypoint(&mut self, new_entrypoint: Option<&str>) -> Result<(), ProgramError> {
        let new_entrypoint = new_entrypoint.unwrap_or("main");
        self.entrypoint = Some(
            self.program
                .get_identifier(&format!("__main__.{new_entrypoint}"))
                .and_then(|identifier| identifier.pc)
                .ok_or_else(|| ProgramError::EntrypointNotFound(new_entrypoint.to_string()))?,
        );
        Ok(())
    }

    /// Full run of `main` on this runner: initialize, run, end, read the
    /// return values, check and relocate. Then optionally prints the output
    /// and writes the trace and memory files.
    pub fn cairo_run(
        &mut self,
        print_output: bool,
        trace_path: Option<&Path>,
        memory_path: Option<&Path>,
        hint_processor: &mut dyn HintProcessor,
    ) -> Result<(), CairoRunError> {
        if trace_path.is_none() {
            self.vm.trace = None;
        }
        let end = self.initialize()?;
        self.run_until_pc(end, hint_processor)
            .map_err(|err| VmException::from_vm_error(self, err))?;
        self.end_run(false, hint_processor)?;
        self.vm.verify_auto_deductions()?;
        self.read_return_values()?;
        self.run_final_checks()?;
        if !self.proof_mode {
            verify_secure_runner(self, true, None)?;
        }
        self.relocate(true)?;

        if print_output {
            let mut output = String::new();
            self.write_output(&mut output)?;
            println!("Program Output:\n{output}");
        }

        if let Some(trace_path) = trace_path {
            let relocated_trace = self
                .relocated_trace
                .as_ref()
                .ok_or(TraceError::TraceNotRelocated)?;
            let mut trace_writer = FileWriter::new(io::BufWriter::new(std::fs::File::create(
                trace_path,
            )?));
            write_encoded_trace(relocated_trace, &mut trace_writer)?;
            trace_writer.flush()?;
        }

        if let Some(memory_path) = memory_path {
            let mut memory_writer = FileWriter::new(io::BufWriter::new(std::fs::File::create(
                memory_path,
            )?));
            write_encoded_memory(&self.relocated_memory, &mut memory_writer)?;
            memory_writer.flush()?;
        }
        Ok(())
    }

    /// Adds a pedersen runner outside the program's builtins, replacing the
    /// one added by a previous call. Returns the base of its segment.
    pub fn add_additional_hash_builtin(&mut self) -> Relocatable {
        if let Some(previous_base) = self.additional_hash_builtin.take() {
            self.vm.builtin_runners.retain(|runner| {
                !(runner.name() == BuiltinName::pedersen && runner.base() == previous_base)
            });
        }
        let mut builtin = BuiltinRunner::new(BuiltinName::pedersen, Some(32), true);
        builtin.initialize_segments(&mut self.vm.segments);
        let base = builtin.base();
        self.vm.builtin_runners.push(builtin);
        self.additional_hash_builtin = Some(base);
        Relocatable::from((base as isize, 0))
    }

    pub fn add_segment(&mut self) -> Relocatable {
        self.vm.add_memory_segment()
    }

    pub fn insert(
        &mut self,
        key: Relocatable,
        value: impl Into<MaybeRelocatable>,
    ) -> Result<(), MemoryError> {
        self.vm.insert_value(key, value)
    }

    pub fn get(&self, key: Relocatable) -> Option<MaybeRelocatable> {
        self.vm.get_maybe(&key)
    }

    /// `size` consecutive values from `key`; fails on a hole.
    pub fn get_range(
        &self,
        key: Relocatable,
        size: usize,
    ) -> Result<Vec<MaybeRelocatable>, MemoryError> {
        self.vm.get_continuous_range(key, size)
    }

    pub fn gen_arg(&mut self, arg: &CairoArg) -> Result<MaybeRelocatable, MemoryError> {
        self.vm.gen_arg(arg)
    }

    pub fn write_arg(
        &mut self,
        ptr: Relocatable,
        values: &[MaybeRelocatable],
    ) -> Result<MaybeRelocatable, MemoryError> {
        self.vm.write_arg(ptr, values)
    }

    pub fn write_output(&mut self, writer: &mut String) -> Result<(), VirtualMachineError> {
        self.vm.write_output(writer)
    }

    pub fn get_return_values(&self, n_ret: usize) -> Result<Vec<MaybeRelocatable>, MemoryError> {
        self.vm.get_return_values(n_ret)
    }

    pub fn get_segment_used_size(&self, index: usize) -> Option<usize> {
        self.vm.get_segment_used_size(index)
    }

    pub fn get_ap(&self) -> Relocatable {
        self.vm.get_ap()
    }

    /// Marks `size` cells from `address` as accessed. Only valid once the
    /// run has ended.
    pub fn mark_as_accessed(
        &mut self,
        address: Relocatable,
        size: usize,
    ) -> Result<(), VirtualMachineError> {
        self.vm.mark_address_range_as_accessed(address, size)
    }
}

// Hints are keyed by program offset; code outside the program segment has none.
fn hints_at(
    hint_data: &HashMap<usize, Vec<HintData>>,
    program_base: Option<Relocatable>,
    pc: Relocatable,
) -> &[HintData] {
    program_base
        .filter(|base| base.segment_index == pc.segment_index)
        .and_then(|base| pc.offset.checked_sub(base.offset))
        .and_then(|offset| hint_data.get(&offset))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ExecutionResources {
    pub n_steps: usize,
    pub n_memory_holes: usize,
    pub builtin_instance_counter: HashMap<BuiltinName, usize>,
}

impl ExecutionResources {
    /// Drops the builtins that were never used.
    pub fn filter_unused_builtins(&self) -> ExecutionResources {
        ExecutionResources {
            n_steps: self.n_steps,
            n_memory_holes: self.n_memory_holes,
            builtin_instance_counter: self
                .builtin_instance_counter
                .iter()
                .filter(|(_, count)| !count.is_zero())
                .map(|(name, count)| (*name, *count))
                .collect(),
        }
    }
}
