use super::{
    errors::{runner_errors::RunnerError, vm_errors::VirtualMachineError},
    runners::cairo_runner::CairoRunner,
};
use crate::types::relocatable::MaybeRelocatable;

/// Verify that the completed run in a runner is safe to be relocated and be
/// used by other Cairo programs.
///
/// Checks include:
///   - (Only if `verify_builtins` is set) no builtin segment holds cells past
///     the builtin's stop pointer.
///   - No access to the program segment outside the program data, or outside
///     `program_segment_size` cells when given.
///   - Every address left in memory is real (not temporary).
///
/// Note: each builtin checks its own segment's data.
pub fn verify_secure_runner(
    runner: &CairoRunner,
    verify_builtins: bool,
    program_segment_size: Option<usize>,
) -> Result<(), VirtualMachineError> {
    let vm = &runner.vm;
    let builtins_segment_info = match verify_builtins {
        true => runner.get_builtin_segments_info()?,
        false => Vec::new(),
    };
    for (index, stop_ptr) in builtins_segment_info {
        let current_size = vm
            .segments
            .memory
            .data
            .get(index)
            .map(|segment| segment.len());
        // The last valid offset is stop_ptr - 1.
        if current_size >= Some(stop_ptr + 1) {
            return Err(VirtualMachineError::OutOfBoundsBuiltinSegmentAccess);
        }
    }

    let program_segment_index = runner
        .program_base
        .and_then(|base| usize::try_from(base.segment_index).ok())
        .ok_or(RunnerError::NoProgBase)?;
    let program_segment_size =
        program_segment_size.unwrap_or(runner.program.shared_program_data.data.len());
    let program_length = vm
        .segments
        .memory
        .data
        .get(program_segment_index)
        .map(|segment| segment.len());
    if program_length >= Some(program_segment_size + 1) {
        return Err(VirtualMachineError::OutOfBoundsProgramSegmentAccess);
    }

    // Without temporary segments no temporary address could have been written.
    if !vm.segments.memory.temp_data.is_empty() {
        for value in vm.segments.memory.data.iter().flatten() {
            match value.as_ref().map(|cell| cell.get_value()) {
                Some(MaybeRelocatable::RelocatableValue(addr)) if addr.segment_index < 0 => {
                    return Err(VirtualMachineError::InvalidMemoryValueTemporaryAddress(
                        Box::new(*addr),
                    ))
                }
                _ => {}
            }
        }
    }
    for builtin in vm.builtin_runners.iter() {
        builtin.run_security_checks(vm)?;
    }

    Ok(())
}
