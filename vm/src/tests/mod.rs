use serde_json::{json, Value};

use crate::{
    cairo_run::{cairo_run, CairoRunConfig},
    hint_processor::{
        builtin_hint_processor::builtin_hint_processor_definition::BuiltinHintProcessor,
        hint_processor_definition::HintProcessor,
    },
    vm::{
        errors::cairo_run_errors::CairoRunError, runners::cairo_runner::CairoRunner,
        trace::trace_entry::RelocatedTraceEntry,
    },
};


const PRIME: &str = "0x800000000000011000000000000000000000000000000000000000000000001";

/// A compiled program artifact with the given bytecode. `extra` fields
/// (hints, identifiers, attributes, ...) override the empty defaults.
fn program_json(builtins: &[&str], data: &[&str], main: usize, extra: Value) -> Vec<u8> {
    let mut program = json!({
        "prime": PRIME,
        "builtins": builtins,
        "data": data,
        "identifiers": {"__main__.main": {"pc": main, "type": "function"}},
        "hints": {},
        "reference_manager": {"references": []},
        "attributes": [],
        "debug_info": null
    });
    if let (Some(program), Value::Object(extra)) = (program.as_object_mut(), extra) {
        program.extend(extra);
    }
    serde_json::to_vec(&program).unwrap()
}

fn run(
    program: &[u8],
    layout: &str,
    hint_processor: &mut dyn HintProcessor,
) -> Result<CairoRunner, CairoRunError> {
    let config = CairoRunConfig {
        layout,
        relocate_mem: true,
        trace_enabled: true,
        ..Default::default()
    };
    cairo_run(program, &config, hint_processor)
}

/// Runs to completion and checks the relocated trace as (pc, ap, fp).
fn run_program_with_trace(program: &[u8], layout: &str, trace: &[(usize, usize, usize)]) {
    let mut hint_processor = BuiltinHintProcessor::new_empty();
    let runner = run(program, layout, &mut hint_processor).unwrap();
    let expected: Vec<_> = trace
        .iter()
        .map(|&(pc, ap, fp)| RelocatedTraceEntry { pc, ap, fp })
        .collect();
    assert_eq!(runner.relocated_trace, Some(expected));
}

/// Runs expecting a failure whose rendering contains `error`.
fn run_program_with_error(program: &[u8], layout: &str, error: &str) {
    let mut hint_processor = BuiltinHintProcessor::new_empty();
    let message = match run(program, layout, &mut hint_processor) {
        Ok(_) => panic!("run succeeded, expected: {error}"),
        Err(err) => err.to_string(),
    };
    assert!(message.contains(error), "{message}");
}
