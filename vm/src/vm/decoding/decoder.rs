use crate::{
    types::instruction::{
        ApUpdate, FpUpdate, Instruction, Op1Addr, Opcode, PcUpdate, Register, Res,
    },
    vm::errors::vm_errors::VirtualMachineError,
};

// Word layout, low to high:
//   bits  0..16  off0 (dst), biased by 2^15
//   bits 16..32  off1 (op0), biased by 2^15
//   bits 32..48  off2 (op1), biased by 2^15
//   bits 48..63  flags
//
// Flags, low to high:
//  0|  opcode|ap_update|pc_update|res_logic|op1_src|op0_reg|dst_reg
// 15|14 13 12|    11 10|  9  8  7|     6  5|4  3  2|      1|      0

const HIGH_BIT: u64 = 1 << 63;
const FLAGS_OFFSET: u64 = 48;
const OFFSET_MASK: u64 = 0xFFFF;
const OFFSET_BIAS: i64 = 1 << 15;

/// `(mask, shift)` of each flag group inside the 16 flag bits.
const DST_REG: (u64, u64) = (0x0001, 0);
const OP0_REG: (u64, u64) = (0x0002, 1);
const OP1_SRC: (u64, u64) = (0x001C, 2);
const RES_LOGIC: (u64, u64) = (0x0060, 5);
const PC_UPDATE: (u64, u64) = (0x0380, 7);
const AP_UPDATE: (u64, u64) = (0x0C00, 10);
const OPCODE: (u64, u64) = (0x7000, 12);

fn flag(flags: u64, (mask, shift): (u64, u64)) -> u64 {
    (flags & mask) >> shift
}

fn register(bit: u64) -> Register {
    if bit == 1 {
        Register::FP
    } else {
        Register::AP
    }
}

/// Decodes a 64 bit instruction word. Reserved flag combinations are rejected.
pub fn decode_instruction(encoded_instr: u64) -> Result<Instruction, VirtualMachineError> {
    if encoded_instr & HIGH_BIT != 0 {
        return Err(VirtualMachineError::InstructionNonZeroHighBit);
    }

    let off0 = decode_offset(encoded_instr);
    let off1 = decode_offset(encoded_instr >> 16);
    let off2 = decode_offset(encoded_instr >> 32);

    let flags = encoded_instr >> FLAGS_OFFSET;

    let op1_addr = match flag(flags, OP1_SRC) {
        0 => Op1Addr::Op0,
        1 => Op1Addr::Imm,
        2 => Op1Addr::FP,
        4 => Op1Addr::AP,
        n => return Err(VirtualMachineError::InvalidOp1Reg(n)),
    };

    let pc_update = match flag(flags, PC_UPDATE) {
        0 => PcUpdate::Regular,
        1 => PcUpdate::Jump,
        2 => PcUpdate::JumpRel,
        4 => PcUpdate::Jnz,
        n => return Err(VirtualMachineError::InvalidPcUpdate(n)),
    };

    // `jnz` leaves res unconstrained when no logic is selected.
    let res = match flag(flags, RES_LOGIC) {
        0 if pc_update == PcUpdate::Jnz => Res::Unconstrained,
        0 => Res::Op1,
        1 => Res::Add,
        2 => Res::Mul,
        n => return Err(VirtualMachineError::InvalidRes(n)),
    };

    let opcode = match flag(flags, OPCODE) {
        0 => Opcode::NOp,
        1 => Opcode::Call,
        2 => Opcode::Ret,
        4 => Opcode::AssertEq,
        n => return Err(VirtualMachineError::InvalidOpcode(n)),
    };

    // `call` always pushes two words.
    let ap_update = match flag(flags, AP_UPDATE) {
        0 if opcode == Opcode::Call => ApUpdate::Add2,
        0 => ApUpdate::Regular,
        1 => ApUpdate::Add,
        2 => ApUpdate::Add1,
        n => return Err(VirtualMachineError::InvalidApUpdate(n)),
    };

    let fp_update = match opcode {
        Opcode::Call => FpUpdate::APPlus2,
        Opcode::Ret => FpUpdate::Dst,
        _ => FpUpdate::Regular,
    };

    Ok(Instruction {
        off0,
        off1,
        off2,
        dst_register: register(flag(flags, DST_REG)),
        op0_register: register(flag(flags, OP0_REG)),
        op1_addr,
        res,
        pc_update,
        ap_update,
        fp_update,
        opcode,
    })
}

/// Takes the low 16 bits of `word` and removes the 2^15 bias.
fn decode_offset(word: u64) -> isize {
    ((word & OFFSET_MASK) as i64 - OFFSET_BIAS) as isize
}
