pub mod cairo_run_errors;
pub mod exec_scope_errors;
pub mod hint_errors;
pub mod memory_errors;
pub mod runner_errors;
pub mod squash_dict_errors;
pub mod trace_errors;
pub mod vm_errors;
pub mod vm_exception;
