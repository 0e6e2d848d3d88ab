use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of a cairo builtin, spelled as it appears in compiled programs.
#[derive(Serialize, Deserialize, Debug, PartialEq, Copy, Clone, Eq, Hash, PartialOrd, Ord)]
#[allow(non_camel_case_types)]
pub enum BuiltinName {
    output,
    pedersen,
    range_check,
    ecdsa,
    bitwise,
    ec_op,
    poseidon,
    segment_arena,
}

const SUFFIX: &str = "_builtin";

/// The canonical builtin order. A program's `builtins` must be a subsequence of it.
pub const BUILTIN_ORDER: [BuiltinName; 8] = [
    BuiltinName::output,
    BuiltinName::pedersen,
    BuiltinName::range_check,
    BuiltinName::ecdsa,
    BuiltinName::bitwise,
    BuiltinName::ec_op,
    BuiltinName::poseidon,
    BuiltinName::segment_arena,
];

impl BuiltinName {
    /// ```
    /// # use cairo_rs_vm::types::builtin_name::BuiltinName;
    /// assert_eq!(BuiltinName::poseidon.to_str(), "poseidon");
    /// ```
    pub fn to_str(self) -> &'static str {
        match self {
            BuiltinName::output => "output",
            BuiltinName::pedersen => "pedersen",
            BuiltinName::range_check => "range_check",
            BuiltinName::ecdsa => "ecdsa",
            BuiltinName::bitwise => "bitwise",
            BuiltinName::ec_op => "ec_op",
            BuiltinName::poseidon => "poseidon",
            BuiltinName::segment_arena => "segment_arena",
        }
    }

    /// The name with a `_builtin` suffix, as used by hint variables
    /// (`range_check_builtin`, `ecdsa_builtin`).
    pub fn to_str_with_suffix(self) -> &'static str {
        match self {
            BuiltinName::output => "output_builtin",
            BuiltinName::pedersen => "pedersen_builtin",
            BuiltinName::range_check => "range_check_builtin",
            BuiltinName::ecdsa => "ecdsa_builtin",
            BuiltinName::bitwise => "bitwise_builtin",
            BuiltinName::ec_op => "ec_op_builtin",
            BuiltinName::poseidon => "poseidon_builtin",
            BuiltinName::segment_arena => "segment_arena_builtin",
        }
    }

    // `Display` prints the suffixed form, so this stays an inherent method.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(name: &str) -> Option<Self> {
        BUILTIN_ORDER
            .iter()
            .copied()
            .find(|builtin| builtin.to_str() == name)
    }

    /// ```
    /// # use cairo_rs_vm::types::builtin_name::BuiltinName;
    /// assert_eq!(BuiltinName::from_str_with_suffix("ec_op_builtin"), Some(BuiltinName::ec_op));
    /// assert_eq!(BuiltinName::from_str_with_suffix("ec_op"), None);
    /// ```
    pub fn from_str_with_suffix(suffixed: &str) -> Option<Self> {
        suffixed
            .strip_suffix(SUFFIX)
            .and_then(BuiltinName::from_str)
    }
}

impl fmt::Display for BuiltinName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_str_with_suffix().fmt(f)
    }
}
