//! Constant propagation over a single block.
//!
//! Each instruction is visited once, in program order. Immediate-only
//! computations are folded into immediates, commutative operands are
//! normalized so the immediate sits on the right, and algebraic identities
//! collapse instructions onto their inputs. Instructions are never removed:
//! rewrites go through [`Block::replace_uses_with`], so later consumers (and
//! later folding steps) transparently observe the replacement.

use crate::ir::{Block, Imm, InstRef, Opcode, Value};

fn imm_value(is_32_bit: bool, value: u64) -> Value {
    if is_32_bit {
        Value::Imm(Imm::U32(value as u32))
    } else {
        Value::Imm(Imm::U64(value))
    }
}

fn replace_uses_with(block: &mut Block, inst: InstRef, is_32_bit: bool, value: u64) {
    block.replace_uses_with(inst, imm_value(is_32_bit, value));
}

/// Shared front half of the commutative folds (AND/OR/EOR/MUL).
///
/// Folds the imm/imm case outright and returns `false` (no identity step is
/// needed). Otherwise normalizes the immediate into the right-hand slot and
/// collapses one level of `(x op k') op k` chains into `x op (k op k')`,
/// then returns `true` so the caller can apply its per-operator identities.
fn fold_commutative(
    block: &mut Block,
    inst: InstRef,
    is_32_bit: bool,
    imm_fn: impl Fn(u64, u64) -> u64,
) -> bool {
    let lhs = block.arg(inst, 0);
    let rhs = block.arg(inst, 1);

    let is_lhs_immediate = lhs.is_immediate();
    let is_rhs_immediate = rhs.is_immediate();

    if is_lhs_immediate && is_rhs_immediate {
        let result = imm_fn(lhs.as_u64(), rhs.as_u64());
        replace_uses_with(block, inst, is_32_bit, result);
        return false;
    }

    if is_lhs_immediate && !is_rhs_immediate {
        let rhs_inst = rhs.inst();
        if block.opcode(rhs_inst) == block.opcode(inst) && block.arg(rhs_inst, 1).is_immediate() {
            let combined = imm_fn(lhs.as_u64(), block.arg(rhs_inst, 1).as_u64());
            block.set_arg(inst, 0, block.arg(rhs_inst, 0));
            block.set_arg(inst, 1, imm_value(is_32_bit, combined));
        } else {
            // Normalize.
            block.set_arg(inst, 0, rhs);
            block.set_arg(inst, 1, lhs);
        }
    }

    if !is_lhs_immediate && is_rhs_immediate {
        let lhs_inst = lhs.inst();
        if block.opcode(lhs_inst) == block.opcode(inst) && block.arg(lhs_inst, 1).is_immediate() {
            let combined = imm_fn(rhs.as_u64(), block.arg(lhs_inst, 1).as_u64());
            block.set_arg(inst, 0, block.arg(lhs_inst, 0));
            block.set_arg(inst, 1, imm_value(is_32_bit, combined));
        }
    }

    true
}

// x & 0 -> 0, x & all_ones -> x, plus the commutative machinery.
fn fold_and(block: &mut Block, inst: InstRef, is_32_bit: bool) {
    if fold_commutative(block, inst, is_32_bit, |a, b| a & b) {
        let rhs = block.arg(inst, 1);
        if rhs.is_zero() {
            replace_uses_with(block, inst, is_32_bit, 0);
        } else if rhs.has_all_bits_set() {
            let lhs = block.arg(inst, 0);
            block.replace_uses_with(inst, lhs);
        }
    }
}

// x | 0 -> x.
fn fold_or(block: &mut Block, inst: InstRef, is_32_bit: bool) {
    if fold_commutative(block, inst, is_32_bit, |a, b| a | b) {
        let rhs = block.arg(inst, 1);
        if rhs.is_zero() {
            let lhs = block.arg(inst, 0);
            block.replace_uses_with(inst, lhs);
        }
    }
}

// x ^ 0 -> x.
fn fold_eor(block: &mut Block, inst: InstRef, is_32_bit: bool) {
    if fold_commutative(block, inst, is_32_bit, |a, b| a ^ b) {
        let rhs = block.arg(inst, 1);
        if rhs.is_zero() {
            let lhs = block.arg(inst, 0);
            block.replace_uses_with(inst, lhs);
        }
    }
}

// x * 0 -> 0, x * 1 -> x.
fn fold_multiply(block: &mut Block, inst: InstRef, is_32_bit: bool) {
    if fold_commutative(block, inst, is_32_bit, |a, b| a.wrapping_mul(b)) {
        let rhs = block.arg(inst, 1);
        if rhs.is_zero() {
            replace_uses_with(block, inst, is_32_bit, 0);
        } else if rhs.is_unsigned_immediate(1) {
            let lhs = block.arg(inst, 0);
            block.replace_uses_with(inst, lhs);
        }
    }
}

fn fold_not(block: &mut Block, inst: InstRef, is_32_bit: bool) {
    let operand = block.arg(inst, 0);
    if !operand.is_immediate() {
        return;
    }
    replace_uses_with(block, inst, is_32_bit, !operand.as_u64());
}

// Division by an immediate zero yields zero: the guest architecture defines
// integer division by zero to produce zero rather than trap.
fn fold_divide(block: &mut Block, inst: InstRef, is_32_bit: bool, is_signed: bool) {
    let rhs = block.arg(inst, 1);

    if rhs.is_zero() {
        replace_uses_with(block, inst, is_32_bit, 0);
        return;
    }

    let lhs = block.arg(inst, 0);
    if lhs.is_immediate() && rhs.is_immediate() {
        if is_signed {
            let result = lhs.as_s64().wrapping_div(rhs.as_s64());
            replace_uses_with(block, inst, is_32_bit, result as u64);
        } else {
            let result = lhs.as_u64() / rhs.as_u64();
            replace_uses_with(block, inst, is_32_bit, result);
        }
    } else if rhs.is_unsigned_immediate(1) {
        block.replace_uses_with(inst, lhs);
    }
}

// A zero shift amount passes the input (and carry-in) straight through. When
// no pseudo-op reads the produced carry, the carry-in argument of the 32-bit
// variants is dead and can be pinned to false.
fn fold_shifts(block: &mut Block, inst: InstRef) {
    let carry_inst = block.carry_pseudo_op(inst);

    // The 32-bit variants carry 3 arguments, the 64-bit variants only 2.
    if block.num_args(inst) == 3 && carry_inst.is_none() {
        block.set_arg(inst, 2, Value::Imm(Imm::U1(false)));
    }

    let shift_amount = block.arg(inst, 1);
    if !shift_amount.is_zero() {
        return;
    }

    if let Some(carry) = carry_inst {
        let carry_in = block.arg(inst, 2);
        block.replace_uses_with(carry, carry_in);
    }
    let operand = block.arg(inst, 0);
    block.replace_uses_with(inst, operand);
}

fn fold_least_significant_byte(block: &mut Block, inst: InstRef) {
    if !block.all_args_immediate(inst) {
        return;
    }
    let operand = block.arg(inst, 0);
    block.replace_uses_with(inst, Value::Imm(Imm::U8(operand.as_u64() as u8)));
}

fn fold_least_significant_half(block: &mut Block, inst: InstRef) {
    if !block.all_args_immediate(inst) {
        return;
    }
    let operand = block.arg(inst, 0);
    block.replace_uses_with(inst, Value::Imm(Imm::U16(operand.as_u64() as u16)));
}

fn fold_least_significant_word(block: &mut Block, inst: InstRef) {
    if !block.all_args_immediate(inst) {
        return;
    }
    let operand = block.arg(inst, 0);
    block.replace_uses_with(inst, Value::Imm(Imm::U32(operand.as_u64() as u32)));
}

fn fold_most_significant_bit(block: &mut Block, inst: InstRef) {
    if !block.all_args_immediate(inst) {
        return;
    }
    let operand = block.arg(inst, 0);
    block.replace_uses_with(inst, Value::Imm(Imm::U1((operand.as_u64() >> 31) != 0)));
}

fn fold_most_significant_word(block: &mut Block, inst: InstRef) {
    let carry_inst = block.carry_pseudo_op(inst);

    if !block.all_args_immediate(inst) {
        return;
    }

    let operand = block.arg(inst, 0);
    if let Some(carry) = carry_inst {
        // The carry out of the upper half is bit 31 of the full input.
        let bit31 = (operand.as_u64() >> 31) & 1 != 0;
        block.replace_uses_with(carry, Value::Imm(Imm::U1(bit31)));
    }
    block.replace_uses_with(inst, Value::Imm(Imm::U32((operand.as_u64() >> 32) as u32)));
}

fn fold_sign_extend_to_word(block: &mut Block, inst: InstRef) {
    if !block.all_args_immediate(inst) {
        return;
    }
    let value = block.arg(inst, 0).as_s64();
    block.replace_uses_with(inst, Value::Imm(Imm::U32(value as u32)));
}

fn fold_sign_extend_to_long(block: &mut Block, inst: InstRef) {
    if !block.all_args_immediate(inst) {
        return;
    }
    let value = block.arg(inst, 0).as_s64();
    block.replace_uses_with(inst, Value::Imm(Imm::U64(value as u64)));
}

fn fold_zero_extend_to_word(block: &mut Block, inst: InstRef) {
    if !block.all_args_immediate(inst) {
        return;
    }
    let value = block.arg(inst, 0).as_u64();
    block.replace_uses_with(inst, Value::Imm(Imm::U32(value as u32)));
}

fn fold_zero_extend_to_long(block: &mut Block, inst: InstRef) {
    if !block.all_args_immediate(inst) {
        return;
    }
    let value = block.arg(inst, 0).as_u64();
    block.replace_uses_with(inst, Value::Imm(Imm::U64(value)));
}

fn fold_byte_reverse(block: &mut Block, inst: InstRef, op: Opcode) {
    let operand = block.arg(inst, 0);
    if !operand.is_immediate() {
        return;
    }

    let replacement = match op {
        Opcode::ByteReverseHalf => Value::Imm(Imm::U16((operand.as_u64() as u16).swap_bytes())),
        Opcode::ByteReverseWord => Value::Imm(Imm::U32((operand.as_u64() as u32).swap_bytes())),
        Opcode::ByteReverseDual => Value::Imm(Imm::U64(operand.as_u64().swap_bytes())),
        _ => unreachable!("not a byte-reverse opcode: {op:?}"),
    };
    block.replace_uses_with(inst, replacement);
}

/// Run constant propagation over `block`.
pub fn constant_propagation(block: &mut Block) {
    use Opcode as Op;

    for index in 0..block.len() {
        let inst = InstRef(index as u32);
        let opcode = block.opcode(inst);
        match opcode {
            Op::LeastSignificantWord => fold_least_significant_word(block, inst),
            Op::MostSignificantWord => fold_most_significant_word(block, inst),
            Op::LeastSignificantHalf => fold_least_significant_half(block, inst),
            Op::LeastSignificantByte => fold_least_significant_byte(block, inst),
            Op::MostSignificantBit => fold_most_significant_bit(block, inst),
            Op::LogicalShiftLeft32
            | Op::LogicalShiftLeft64
            | Op::LogicalShiftRight32
            | Op::LogicalShiftRight64
            | Op::ArithmeticShiftRight32
            | Op::ArithmeticShiftRight64
            | Op::RotateRight32
            | Op::RotateRight64 => fold_shifts(block, inst),
            Op::Mul32 | Op::Mul64 => fold_multiply(block, inst, opcode == Op::Mul32),
            Op::SignedDiv32 | Op::SignedDiv64 => {
                fold_divide(block, inst, opcode == Op::SignedDiv32, true)
            }
            Op::UnsignedDiv32 | Op::UnsignedDiv64 => {
                fold_divide(block, inst, opcode == Op::UnsignedDiv32, false)
            }
            Op::And32 | Op::And64 => fold_and(block, inst, opcode == Op::And32),
            Op::Eor32 | Op::Eor64 => fold_eor(block, inst, opcode == Op::Eor32),
            Op::Or32 | Op::Or64 => fold_or(block, inst, opcode == Op::Or32),
            Op::Not32 | Op::Not64 => fold_not(block, inst, opcode == Op::Not32),
            Op::SignExtendByteToWord | Op::SignExtendHalfToWord => {
                fold_sign_extend_to_word(block, inst)
            }
            Op::SignExtendByteToLong | Op::SignExtendHalfToLong | Op::SignExtendWordToLong => {
                fold_sign_extend_to_long(block, inst)
            }
            Op::ZeroExtendByteToWord | Op::ZeroExtendHalfToWord => {
                fold_zero_extend_to_word(block, inst)
            }
            Op::ZeroExtendByteToLong | Op::ZeroExtendHalfToLong | Op::ZeroExtendWordToLong => {
                fold_zero_extend_to_long(block, inst)
            }
            Op::ByteReverseWord | Op::ByteReverseHalf | Op::ByteReverseDual => {
                fold_byte_reverse(block, inst, opcode)
            }
            _ => {}
        }
    }

    let folded = block
        .inst_refs()
        .filter(|&inst| block.replacement(inst).is_some())
        .count();
    tracing::trace!(insts = block.len(), folded, "constant propagation done");
}
