use serde::Serialize;

use super::instance_definitions::builtins_instance_def::BuiltinsInstanceDef;
use crate::vm::errors::runner_errors::RunnerError;

/// A named set of builtins (with their ratios) a run may use.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CairoLayout {
    pub(crate) name: &'static str,
    pub(crate) rc_units: u32,
    pub(crate) builtins: BuiltinsInstanceDef,
    pub(crate) public_memory_fraction: u32,
}

impl CairoLayout {
    pub(crate) fn plain_instance() -> CairoLayout {
        CairoLayout {
            name: "plain",
            rc_units: 16,
            builtins: BuiltinsInstanceDef::plain(),
            public_memory_fraction: 4,
        }
    }

    pub(crate) fn small_instance() -> CairoLayout {
        CairoLayout {
            name: "small",
            rc_units: 16,
            builtins: BuiltinsInstanceDef::small(),
            public_memory_fraction: 4,
        }
    }

    pub(crate) fn dex_instance() -> CairoLayout {
        CairoLayout {
            name: "dex",
            rc_units: 4,
            builtins: BuiltinsInstanceDef::dex(),
            public_memory_fraction: 4,
        }
    }

    pub(crate) fn recursive_instance() -> CairoLayout {
        CairoLayout {
            name: "recursive",
            rc_units: 4,
            builtins: BuiltinsInstanceDef::recursive(),
            public_memory_fraction: 8,
        }
    }

    pub(crate) fn starknet_instance() -> CairoLayout {
        CairoLayout {
            name: "starknet",
            rc_units: 4,
            builtins: BuiltinsInstanceDef::starknet(),
            public_memory_fraction: 8,
        }
    }

    pub(crate) fn all_cairo_instance() -> CairoLayout {
        CairoLayout {
            name: "all_cairo",
            rc_units: 4,
            builtins: BuiltinsInstanceDef::all_cairo(),
            public_memory_fraction: 8,
        }
    }

    /// Looks a layout up by name. `all` is accepted as a shorthand for `all_cairo`.
    pub fn from_name(name: &str) -> Result<CairoLayout, RunnerError> {
        Ok(match name {
            "plain" => Self::plain_instance(),
            "small" => Self::small_instance(),
            "dex" => Self::dex_instance(),
            "recursive" => Self::recursive_instance(),
            "starknet" => Self::starknet_instance(),
            "all_cairo" | "all" => Self::all_cairo_instance(),
            _ => return Err(RunnerError::UnknownLayout(name.into())),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
