//! # Program deserialization
//!
//! The JSON layout produced by `cairo-compile`, and its conversion into a
//! [`Program`]. To load a program use [`Program::from_bytes()`] or
//! [`Program::from_file()`].

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use num_bigint::BigUint;
use num_traits::Num;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Number;

use crate::{
    serde::deserialize_utils,
    types::{
        builtin_name::BuiltinName,
        errors::program_errors::ProgramError,
        instruction::Register,
        program::{Program, SharedProgramData},
        relocatable::MaybeRelocatable,
    },
    utils::{CAIRO_PRIME, PRIME_STR},
    Felt252,
};

#[derive(Deserialize, Debug)]
pub struct ProgramJson {
    pub prime: String,
    pub builtins: Vec<BuiltinName>,
    #[serde(deserialize_with = "deserialize_array_of_felt_hex")]
    pub data: Vec<MaybeRelocatable>,
    pub identifiers: HashMap<String, Identifier>,
    pub hints: BTreeMap<usize, Vec<HintParams>>,
    pub reference_manager: ReferenceManager,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    pub debug_info: Option<DebugInfo>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HintParams {
    pub code: String,
    pub accessible_scopes: Vec<String>,
    pub flow_tracking_data: FlowTrackingData,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FlowTrackingData {
    pub ap_tracking: ApTracking,
    pub reference_ids: HashMap<String, usize>,
}

/// Position of `ap` relative to the start of its tracking group, as known by
/// the compiler at some pc.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApTracking {
    pub group: usize,
    pub offset: usize,
}

impl ApTracking {
    pub fn new() -> ApTracking {
        ApTracking::default()
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Identifier {
    pub pc: Option<usize>,
    #[serde(rename(deserialize = "type"))]
    pub type_: Option<String>,
    #[serde(default)]
    #[serde(deserialize_with = "felt_from_number")]
    pub value: Option<Felt252>,

    pub full_name: Option<String>,
    pub members: Option<HashMap<String, Member>>,
    pub cairo_type: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Member {
    pub cairo_type: String,
    pub offset: usize,
}

/// A program attribute covering the pcs in `[start_pc, end_pc)`. Only
/// `error_message` attributes are kept.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub start_pc: usize,
    pub end_pc: usize,
    pub value: String,
    pub flow_tracking_data: Option<FlowTrackingData>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub end_line: u32,
    pub end_col: u32,
    pub input_file: InputFile,
    pub parent_location: Option<(Box<Location>, String)>,
    pub start_line: u32,
    pub start_col: u32,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct DebugInfo {
    pub(crate) instruction_locations: HashMap<usize, InstructionLocation>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct InstructionLocation {
    pub inst: Location,
    pub hints: Vec<HintLocation>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct InputFile {
    pub filename: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct HintLocation {
    pub location: Location,
    pub n_prefix_newlines: u32,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
pub struct ReferenceManager {
    pub references: Vec<Reference>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Reference {
    pub ap_tracking_data: ApTracking,
    pub pc: Option<usize>,
    #[serde(deserialize_with = "deserialize_value_address")]
    #[serde(rename(deserialize = "value"))]
    pub value_address: ValueAddress,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub enum OffsetValue {
    Immediate(Felt252),
    Value(i32),
    Reference(Register, i32, bool),
}

/// A parsed reference expression: `[offset1 + offset2]` when `dereference`
/// is set, `offset1 + offset2` otherwise.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct ValueAddress {
    pub offset1: OffsetValue,
    pub offset2: OffsetValue,
    pub dereference: bool,
    pub value_type: String,
}

impl ValueAddress {
    /// Stand-in for reference expressions the parser does not understand.
    /// Hints never use those, and resolving one reports an unknown identifier.
    pub fn no_hint_reference_default() -> ValueAddress {
        ValueAddress {
            offset1: OffsetValue::Value(99),
            offset2: OffsetValue::Value(99),
            dereference: false,
            value_type: String::from("felt"),
        }
    }
}

fn parse_felt_hex(hex: &str) -> Result<Felt252, String> {
    Felt252::from_hex(&deserialize_utils::maybe_add_padding(hex)).map_err(|e| e.to_string())
}

pub fn deserialize_felt_hex<'de, D: Deserializer<'de>>(d: D) -> Result<Felt252, D::Error> {
    let hex = String::deserialize(d)?;
    parse_felt_hex(&hex).map_err(de::Error::custom)
}

pub fn deserialize_array_of_felt_hex<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Vec<MaybeRelocatable>, D::Error> {
    Vec::<String>::deserialize(d)?
        .iter()
        .map(|hex| {
            parse_felt_hex(hex)
                .map(MaybeRelocatable::Int)
                .map_err(de::Error::custom)
        })
        .collect()
}

pub fn deserialize_value_address<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<ValueAddress, D::Error> {
    let expr = String::deserialize(d)?;
    Ok(deserialize_utils::parse_value(&expr)
        .map(|(_, value)| value)
        .unwrap_or_else(|_| ValueAddress::no_hint_reference_default()))
}

/// Constants may be written as plain integers or in scientific notation
/// (`1e27`, `1.5e3`); both are reduced modulo the field prime.
fn felt_from_number<'de, D>(deserializer: D) -> Result<Option<Felt252>, D::Error>
where
    D: Deserializer<'de>,
{
    let n = Number::deserialize(deserializer)?;
    parse_decimal(&n.to_string())
        .map(Some)
        .ok_or_else(|| de::Error::custom(format!("felt_from_number parse error: {n}")))
}

fn parse_decimal(number: &str) -> Option<Felt252> {
    let (mantissa, exponent) = match number.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => (
            mantissa,
            exponent.trim_start_matches('+').parse::<i64>().ok()?,
        ),
        None => (number, 0),
    };
    let (negative, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, mantissa),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let exponent = exponent - frac_part.len() as i64;
    let mut digits = format!("{int_part}{frac_part}");
    if exponent < 0 {
        // Only integral values are accepted.
        let cut = digits.len().checked_sub(exponent.unsigned_abs() as usize)?;
        if digits[cut..].bytes().any(|b| b != b'0') {
            return None;
        }
        digits.truncate(cut);
    }
    if digits.is_empty() {
        digits.push('0');
    }
    let base = BigUint::from_str_radix(&digits, 10).ok()? % &*CAIRO_PRIME;
    let mut felt = Felt252::from(base);
    if exponent > 0 {
        felt = felt * Felt252::from(10).pow(exponent as u128);
    }
    Some(if negative { -felt } else { felt })
}

pub fn deserialize_program_json(reader: &[u8]) -> Result<ProgramJson, ProgramError> {
    let program_json = serde_json::from_slice(reader)?;
    Ok(program_json)
}

pub fn deserialize_and_parse_program(
    reader: &[u8],
    entrypoint: Option<&str>,
) -> Result<Program, ProgramError> {
    let program_json: ProgramJson = deserialize_program_json(reader)?;
    parse_program_json(program_json, entrypoint)
}

fn label_pc(program_json: &ProgramJson, label: &str) -> Option<usize> {
    program_json
        .identifiers
        .get(label)
        .and_then(|identifier| identifier.pc)
}

pub fn parse_program_json(
    program_json: ProgramJson,
    entrypoint: Option<&str>,
) -> Result<Program, ProgramError> {
    if PRIME_STR != program_json.prime {
        return Err(ProgramError::PrimeDiffers(program_json.prime));
    }

    let main = match entrypoint {
        Some(entrypoint) => match program_json
            .identifiers
            .get(&format!("__main__.{entrypoint}"))
        {
            Some(identifier) => identifier.pc,
            None => return Err(ProgramError::EntrypointNotFound(entrypoint.to_string())),
        },
        None => None,
    };

    let start = label_pc(&program_json, "__main__.__start__");
    let end = label_pc(&program_json, "__main__.__end__");

    let constants = Program::extract_constants(&program_json.identifiers)?;

    let program_len = program_json.data.len();
    if let Some((&max_pc, _)) = program_json
        .hints
        .iter()
        .filter(|(_, hints)| !hints.is_empty())
        .last()
    {
        if max_pc >= program_len {
            return Err(ProgramError::InvalidHintPc(max_pc, program_len));
        }
    }

    let shared_program_data = SharedProgramData {
        data: program_json.data,
        hints: program_json
            .hints
            .into_iter()
            .filter(|(_, hints)| !hints.is_empty())
            .collect(),
        main,
        start,
        end,
        error_message_attributes: program_json
            .attributes
            .into_iter()
            .filter(|attr| attr.name == "error_message")
            .collect(),
        instruction_locations: program_json
            .debug_info
            .map(|debug_info| debug_info.instruction_locations),
        identifiers: program_json.identifiers,
        reference_manager: Program::get_reference_list(&program_json.reference_manager),
    };
    Ok(Program {
        shared_program_data: Arc::new(shared_program_data),
        constants,
        builtins: program_json.builtins,
    })
}
