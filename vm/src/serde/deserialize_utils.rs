//! Parser for the reference expressions the compiler stores in
//! `reference_manager`, e.g. `[cast(fp + (-3), felt*)]` or
//! `cast([ap + (-1)] + 2, felt)`.
//!
//! A reference evaluates to `offset1 + offset2`, optionally dereferenced once
//! more when the whole expression is wrapped in brackets.

use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1, space0},
    combinator::{map, map_res, opt, recognize, value},
    error::{Error, ErrorKind},
    sequence::{delimited, pair, preceded},
    Err, IResult,
};

use crate::{
    serde::deserialize_program::{OffsetValue, ValueAddress},
    types::instruction::Register,
    Felt252,
};

/// Prepends a `0` to odd-length hex strings.
pub(crate) fn maybe_add_padding(hex: &str) -> String {
    let digits = hex.strip_prefix("0x").unwrap_or(hex);
    if digits.len() % 2 == 1 {
        format!("0x0{digits}")
    } else {
        format!("0x{digits}")
    }
}

/// Splits `input` right before the first `close` that is not matched by an
/// earlier `open`.
fn balanced(open: char, close: char) -> impl Fn(&str) -> IResult<&str, &str> {
    move |input: &str| {
        let mut depth = 0_usize;
        for (idx, c) in input.char_indices() {
            if c == open {
                depth += 1;
            } else if c == close {
                if depth == 0 {
                    return Ok((&input[idx..], &input[..idx]));
                }
                depth -= 1;
            }
        }
        Err(Err::Error(Error::new(input, ErrorKind::TakeUntil)))
    }
}

fn register(input: &str) -> IResult<&str, Register> {
    alt((
        value(Register::AP, tag("ap")),
        value(Register::FP, tag("fp")),
    ))(input)
}

/// `3`, `(3)` or `(-3)`.
fn number(input: &str) -> IResult<&str, i32> {
    alt((
        map_res(digit1, i32::from_str),
        delimited(
            char('('),
            map_res(recognize(pair(opt(char('-')), digit1)), i32::from_str),
            char(')'),
        ),
    ))(input)
}

fn sign(input: &str) -> IResult<&str, i32> {
    delimited(
        space0,
        alt((value(1, char('+')), value(-1, char('-')))),
        space0,
    )(input)
}

/// `reg`, `reg + off`, `reg - off`.
fn register_with_offset(input: &str) -> IResult<&str, (Register, i32)> {
    let (rest, reg) = register(input)?;
    let (rest, off) = opt(pair(sign, number))(rest)?;
    Ok((rest, (reg, off.map(|(s, n)| s * n).unwrap_or(0))))
}

/// One summand of a reference.
fn term(input: &str) -> IResult<&str, OffsetValue> {
    alt((
        map(
            delimited(char('['), register_with_offset, char(']')),
            |(reg, off)| OffsetValue::Reference(reg, off, true),
        ),
        map(register_with_offset, |(reg, off)| {
            OffsetValue::Reference(reg, off, false)
        }),
        map(number, OffsetValue::Value),
    ))(input)
}

fn negate(offset: OffsetValue) -> OffsetValue {
    match offset {
        OffsetValue::Value(v) => OffsetValue::Value(-v),
        OffsetValue::Immediate(imm) => OffsetValue::Immediate(-imm),
        reference => reference,
    }
}

fn expression(input: &str) -> IResult<&str, (OffsetValue, OffsetValue)> {
    let (rest, (first, second)) = pair(term, opt(pair(sign, term)))(input)?;
    let second = match second {
        Some((-1, t)) => negate(t),
        Some((_, t)) => t,
        None => OffsetValue::Value(0),
    };
    Ok((rest, (first, second)))
}

/// `cast(<expression>, <type>)`
fn cast(input: &str) -> IResult<&str, (&str, &str)> {
    let (rest, args) = preceded(tag("cast"), delimited(char('('), balanced('(', ')'), char(')')))(
        input,
    )?;
    match args.rsplit_once(',') {
        Some((expr, cairo_type)) => Ok((rest, (expr.trim(), cairo_type.trim()))),
        None => Err(Err::Error(Error::new(args, ErrorKind::Char))),
    }
}

fn to_immediate(offset: OffsetValue) -> OffsetValue {
    match offset {
        OffsetValue::Value(v) => OffsetValue::Immediate(Felt252::from(v as i128)),
        other => other,
    }
}

pub(crate) fn parse_value(input: &str) -> IResult<&str, ValueAddress> {
    let (rest, (outer, dereference)) = alt((
        map(delimited(char('['), cast, char(']')), |c| (c, true)),
        map(cast, |c| (c, false)),
    ))(input.trim())?;
    let (expr, cairo_type) = outer;

    let (_, (offset1, offset2)) = expression(expr)?;

    // Plain felt constants are carried as field elements, not offsets.
    let (offset1, offset2) = if cairo_type == "felt" {
        (to_immediate(offset1), to_immediate(offset2))
    } else {
        (offset1, offset2)
    };

    Ok((
        rest,
        ValueAddress {
            offset1,
            offset2,
            dereference,
            value_type: cairo_type.to_string(),
        },
    ))
}
