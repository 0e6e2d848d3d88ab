use std::io::{self, Write};

use bincode::enc::write::Writer;
use thiserror::Error;
use tracing::debug;

use crate::{
    hint_processor::hint_processor_definition::HintProcessor,
    types::program::Program,
    vm::{
        errors::{cairo_run_errors::CairoRunError, vm_exception::VmException},
        runners::cairo_runner::{CairoRunner, RunResources},
        security::verify_secure_runner,
        trace::trace_entry::RelocatedTraceEntry,
    },
    Felt252,
};

pub struct CairoRunConfig<'a> {
    pub entrypoint: &'a str,
    pub trace_enabled: bool,
    pub relocate_mem: bool,
    pub layout: &'a str,
    pub proof_mode: bool,
    /// Defaults to `!proof_mode`.
    pub secure_run: Option<bool>,
    /// Step ceiling for the run; unbounded when `None`.
    pub max_steps: Option<usize>,
}

impl<'a> Default for CairoRunConfig<'a> {
    fn default() -> Self {
        CairoRunConfig {
            entrypoint: "main",
            trace_enabled: false,
            relocate_mem: false,
            layout: "plain",
            proof_mode: false,
            secure_run: None,
            max_steps: None,
        }
    }
}

/// Loads `program_content` and runs its entrypoint to completion: run,
/// end, return values, (proof mode) segment finalization, final and secure
/// checks, relocation.
pub fn cairo_run(
    program_content: &[u8],
    cairo_run_config: &CairoRunConfig,
    hint_executor: &mut dyn HintProcessor,
) -> Result<CairoRunner, CairoRunError> {
    let program = Program::from_bytes(program_content, Some(cairo_run_config.entrypoint))?;

    let secure_run = cairo_run_config
        .secure_run
        .unwrap_or(!cairo_run_config.proof_mode);

    let mut cairo_runner = CairoRunner::new_with_trace(
        &program,
        cairo_run_config.layout,
        cairo_run_config.proof_mode,
        cairo_run_config.trace_enabled,
    )?;
    if let Some(max_steps) = cairo_run_config.max_steps {
        cairo_runner.set_run_resources(RunResources::new(max_steps));
    }

    let end = cairo_runner.initialize()?;
    cairo_runner
        .run_until_pc(end, hint_executor)
        .map_err(|err| VmException::from_vm_error(&cairo_runner, err))?;
    cairo_runner.end_run(false, hint_executor)?;

    cairo_runner.vm.verify_auto_deductions()?;
    cairo_runner.read_return_values()?;
    if cairo_run_config.proof_mode {
        cairo_runner.finalize_segments()?;
    }
    cairo_runner.run_final_checks()?;
    if secure_run {
        verify_secure_runner(&cairo_runner, true, None)?;
    }
    cairo_runner.relocate(cairo_run_config.relocate_mem)?;

    debug!(
        entrypoint = cairo_run_config.entrypoint,
        steps = cairo_runner.vm.get_current_step(),
        "cairo run finished"
    );
    Ok(cairo_runner)
}

#[derive(Debug, Error)]
#[error("Failed to encode trace at position {0}, serialize error: {1}")]
pub struct EncodeTraceError(usize, bincode::error::EncodeError);

/// Writes the trace binary representation.
///
/// Bincode encodes to little endian by default and each trace entry is composed of
/// 3 usize values that are padded to always reach 64 bit size.
pub fn write_encoded_trace(
    relocated_trace: &[RelocatedTraceEntry],
    dest: &mut impl Writer,
) -> Result<(), EncodeTraceError> {
    for (i, entry) in relocated_trace.iter().enumerate() {
        dest.write(&((entry.ap as u64).to_le_bytes()))
            .map_err(|e| EncodeTraceError(i, e))?;
        dest.write(&((entry.fp as u64).to_le_bytes()))
            .map_err(|e| EncodeTraceError(i, e))?;
        dest.write(&((entry.pc as u64).to_le_bytes()))
            .map_err(|e| EncodeTraceError(i, e))?;
    }

    Ok(())
}

/// Writes a binary representation of the relocated memory.
///
/// The memory pairs (address, value) are encoded and concatenated:
/// * address -> 8-byte encoded
/// * value -> 32-byte encoded
pub fn write_encoded_memory(
    relocated_memory: &[Option<Felt252>],
    dest: &mut impl Writer,
) -> Result<(), EncodeTraceError> {
    for (i, memory_cell) in relocated_memory.iter().enumerate() {
        let Some(value) = memory_cell else {
            continue;
        };
        dest.write(&(i as u64).to_le_bytes())
            .map_err(|e| EncodeTraceError(i, e))?;
        dest.write(&value.to_bytes_le())
            .map_err(|e| EncodeTraceError(i, e))?;
    }

    Ok(())
}

/// A bincode [`Writer`] over a buffered file.
pub struct FileWriter {
    buf_writer: io::BufWriter<std::fs::File>,
    bytes_written: usize,
}

impl Writer for FileWriter {
    fn write(&mut self, bytes: &[u8]) -> Result<(), bincode::error::EncodeError> {
        self.buf_writer
            .write_all(bytes)
            .map_err(|e| bincode::error::EncodeError::Io {
                inner: e,
                index: self.bytes_written,
            })?;

        self.bytes_written += bytes.len();

        Ok(())
    }
}

impl FileWriter {
    pub fn new(buf_writer: io::BufWriter<std::fs::File>) -> Self {
        Self {
            buf_writer,
            bytes_written: 0,
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.buf_writer.flush()
    }
}
