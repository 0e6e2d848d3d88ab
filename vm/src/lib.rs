//! # A Cairo bytecode virtual machine
//!
//! Executes compiled Cairo 0 programs (the JSON artifacts emitted by `cairo-compile`):
//! - [`types::program::Program`] loads the bytecode, hints, references and attributes;
//! - [`vm::vm_core::VirtualMachine`] runs the fetch/decode/execute loop over segmented,
//!   write-once memory;
//! - [`vm::runners::builtin_runner::BuiltinRunner`] validates and deduces builtin cells;
//! - [`hint_processor`] runs the hints attached to a pc before its instruction;
//! - [`vm::runners::cairo_runner::CairoRunner`] and [`cairo_run::cairo_run`] orchestrate a run.

#![forbid(unsafe_code)]

pub mod cairo_run;
pub mod hint_processor;
pub mod math_utils;
pub mod serde;
pub mod types;
pub mod utils;
pub mod vm;

pub use starknet_types_core::felt::Felt as Felt252;

#[cfg(test)]
mod tests;
