#![deny(warnings)]
#![forbid(unsafe_code)]
use cairo_rs_vm::cairo_run::{self, EncodeTraceError, FileWriter};
use cairo_rs_vm::hint_processor::builtin_hint_processor::builtin_hint_processor_definition::BuiltinHintProcessor;
use cairo_rs_vm::vm::errors::cairo_run_errors::CairoRunError;
use cairo_rs_vm::vm::errors::trace_errors::TraceError;
use cairo_rs_vm::vm::errors::vm_errors::VirtualMachineError;
use clap::{Parser, ValueHint};
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(value_parser, value_hint=ValueHint::FilePath)]
    filename: PathBuf,
    #[clap(long = "trace_file", value_parser)]
    trace_file: Option<PathBuf>,
    #[clap(long = "print_output")]
    print_output: bool,
    #[clap(long = "entrypoint", default_value = "main")]
    entrypoint: String,
    #[clap(long = "memory_file")]
    memory_file: Option<PathBuf>,
    #[clap(long = "layout", default_value = "plain")]
    layout: String,
    #[clap(long = "proof_mode")]
    proof_mode: bool,
    #[clap(long = "secure_run")]
    secure_run: Option<bool>,
    #[clap(long = "max_steps")]
    max_steps: Option<usize>,
    /// A `tracing` filter directive, e.g. `debug` or `cairo_rs_vm=trace`.
    #[clap(long = "log_level", default_value = "warn")]
    log_level: String,
}

#[derive(Debug, Error)]
enum Error {
    #[error("Invalid arguments")]
    Cli(#[from] clap::Error),
    #[error("Invalid log level")]
    LogLevel(#[from] tracing_subscriber::filter::ParseError),
    #[error("Failed to interact with the file system")]
    IO(#[from] std::io::Error),
    #[error("The cairo program execution failed")]
    Runner(#[from] CairoRunError),
    #[error(transparent)]
    EncodeTrace(#[from] EncodeTraceError),
    #[error(transparent)]
    VirtualMachine(#[from] VirtualMachineError),
    #[error(transparent)]
    Trace(#[from] TraceError),
}

fn init_logging(log_level: &str) -> Result<(), Error> {
    let filter = EnvFilter::try_new(log_level)?;
    // A subscriber may already be installed when running more than once.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
    Ok(())
}

fn run(args: impl Iterator<Item = String>) -> Result<(), Error> {
    let args = Args::try_parse_from(args)?;
    init_logging(&args.log_level)?;

    let cairo_run_config = cairo_run::CairoRunConfig {
        entrypoint: &args.entrypoint,
        trace_enabled: args.trace_file.is_some(),
        relocate_mem: args.memory_file.is_some(),
        layout: &args.layout,
        proof_mode: args.proof_mode,
        secure_run: args.secure_run,
        max_steps: args.max_steps,
    };

    let program_content = std::fs::read(&args.filename).map_err(Error::IO)?;
    let mut hint_processor = BuiltinHintProcessor::new_empty();
    let mut cairo_runner =
        match cairo_run::cairo_run(&program_content, &cairo_run_config, &mut hint_processor) {
            Ok(runner) => runner,
            Err(error) => {
                eprintln!("{error}");
                return Err(Error::Runner(error));
            }
        };
    info!(
        program = %args.filename.display(),
        steps = cairo_runner.vm.get_current_step(),
        "program executed"
    );

    if args.print_output {
        let mut output_buffer = "Program Output:\n".to_string();
        cairo_runner.write_output(&mut output_buffer)?;
        print!("{output_buffer}");
    }

    if let Some(ref trace_path) = args.trace_file {
        let relocated_trace = cairo_runner
            .relocated_trace
            .as_ref()
            .ok_or(Error::Trace(TraceError::TraceNotRelocated))?;

        let trace_file = std::fs::File::create(trace_path)?;
        let mut trace_writer =
            FileWriter::new(io::BufWriter::with_capacity(3 * 1024 * 1024, trace_file));

        cairo_run::write_encoded_trace(relocated_trace, &mut trace_writer)?;
        trace_writer.flush()?;
    }

    if let Some(ref memory_path) = args.memory_file {
        let memory_file = std::fs::File::create(memory_path)?;
        let mut memory_writer =
            FileWriter::new(io::BufWriter::with_capacity(5 * 1024 * 1024, memory_file));

        cairo_run::write_encoded_memory(&cairo_runner.relocated_memory, &mut memory_writer)?;
        memory_writer.flush()?;
    }

    Ok(())
}

fn main() -> Result<(), Error> {
    #[cfg(test)]
    return Ok(());

    #[cfg(not(test))]
    match run(std::env::args()) {
        Err(Error::Cli(err)) => err.exit(),
        other => other,
    }
}
