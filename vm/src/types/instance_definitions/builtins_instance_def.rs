use serde::Serialize;

/// Ratio (steps per builtin instance) of every builtin a layout supports.
/// `None` in a field means the layout lacks that builtin.
#[derive(Serialize, Debug, PartialEq, Clone)]
pub(crate) struct BuiltinsInstanceDef {
    pub(crate) output: bool,
    pub(crate) pedersen: Option<u32>,
    pub(crate) range_check: Option<u32>,
    pub(crate) ecdsa: Option<u32>,
    pub(crate) bitwise: Option<u32>,
    pub(crate) ec_op: Option<u32>,
    pub(crate) poseidon: Option<u32>,
}

pub(crate) const DEFAULT_PEDERSEN_RATIO: u32 = 8;
pub(crate) const DEFAULT_RANGE_CHECK_RATIO: u32 = 8;
pub(crate) const DEFAULT_ECDSA_RATIO: u32 = 512;
pub(crate) const DEFAULT_BITWISE_RATIO: u32 = 256;
pub(crate) const DEFAULT_EC_OP_RATIO: u32 = 256;
pub(crate) const DEFAULT_POSEIDON_RATIO: u32 = 32;

impl BuiltinsInstanceDef {
    pub(crate) fn plain() -> BuiltinsInstanceDef {
        BuiltinsInstanceDef {
            output: false,
            pedersen: None,
            range_check: None,
            ecdsa: None,
            bitwise: None,
            ec_op: None,
            poseidon: None,
        }
    }

    pub(crate) fn small() -> BuiltinsInstanceDef {
        BuiltinsInstanceDef {
            output: true,
            pedersen: Some(DEFAULT_PEDERSEN_RATIO),
            range_check: Some(DEFAULT_RANGE_CHECK_RATIO),
            ecdsa: Some(DEFAULT_ECDSA_RATIO),
            ..Self::plain()
        }
    }

    pub(crate) fn dex() -> BuiltinsInstanceDef {
        Self::small()
    }

    pub(crate) fn recursive() -> BuiltinsInstanceDef {
        BuiltinsInstanceDef {
            output: true,
            pedersen: Some(128),
            range_check: Some(DEFAULT_RANGE_CHECK_RATIO),
            bitwise: Some(8),
            ..Self::plain()
        }
    }

    pub(crate) fn starknet() -> BuiltinsInstanceDef {
        BuiltinsInstanceDef {
            output: true,
            pedersen: Some(32),
            range_check: Some(16),
            ecdsa: Some(2048),
            bitwise: Some(64),
            ec_op: Some(1024),
            poseidon: Some(DEFAULT_POSEIDON_RATIO),
        }
    }

    pub(crate) fn all_cairo() -> BuiltinsInstanceDef {
        BuiltinsInstanceDef {
            output: true,
            pedersen: Some(256),
            range_check: Some(DEFAULT_RANGE_CHECK_RATIO),
            ecdsa: Some(2048),
            bitwise: Some(16),
            ec_op: Some(1024),
            poseidon: Some(256),
        }
    }
}
