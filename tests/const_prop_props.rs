use proptest::prelude::*;

use dbt_backend::{constant_propagation, Block, Imm, InstRef, Opcode, Value};

fn reg(index: u8) -> Value {
    Value::Imm(Imm::U8(index))
}

fn imm_at(is_32_bit: bool, v: u64) -> Value {
    if is_32_bit {
        Value::Imm(Imm::U32(v as u32))
    } else {
        Value::Imm(Imm::U64(v))
    }
}

/// Fold a single two-operand instruction with immediate arguments and return
/// what its consumer observes.
fn fold_binary(op: Opcode, is_32_bit: bool, a: u64, b: u64) -> Value {
    let mut block = Block::new();
    let inst = block.push(op, &[imm_at(is_32_bit, a), imm_at(is_32_bit, b)]);
    let sink = block.push(Opcode::SetRegister, &[reg(0), Value::Inst(inst)]);
    constant_propagation(&mut block);
    block.arg(sink, 1)
}

fn fold_unary(op: Opcode, arg: Value) -> Value {
    let mut block = Block::new();
    let inst = block.push(op, &[arg]);
    let sink = block.push(Opcode::SetRegister, &[reg(0), Value::Inst(inst)]);
    constant_propagation(&mut block);
    block.arg(sink, 1)
}

proptest! {
    // Immediate-only commutative ops fold to the operator's result,
    // truncated to the opcode's width.
    #[test]
    fn binary_folding_preserves_semantics(a in any::<u64>(), b in any::<u64>()) {
        let cases: [(Opcode, Opcode, fn(u64, u64) -> u64); 4] = [
            (Opcode::And32, Opcode::And64, |x, y| x & y),
            (Opcode::Or32, Opcode::Or64, |x, y| x | y),
            (Opcode::Eor32, Opcode::Eor64, |x, y| x ^ y),
            (Opcode::Mul32, Opcode::Mul64, u64::wrapping_mul),
        ];
        for (op32, op64, f) in cases {
            prop_assert_eq!(
                fold_binary(op32, true, a, b),
                Value::Imm(Imm::U32(f(a as u32 as u64, b as u32 as u64) as u32))
            );
            prop_assert_eq!(fold_binary(op64, false, a, b), Value::Imm(Imm::U64(f(a, b))));
        }
    }

    #[test]
    fn division_folding_preserves_guest_semantics(a in any::<u32>(), b in any::<u32>()) {
        let unsigned = fold_binary(Opcode::UnsignedDiv32, true, u64::from(a), u64::from(b));
        let expected_unsigned = if b == 0 { 0 } else { a / b };
        prop_assert_eq!(unsigned, Value::Imm(Imm::U32(expected_unsigned)));

        let signed = fold_binary(Opcode::SignedDiv32, true, u64::from(a), u64::from(b));
        let expected_signed = if b == 0 {
            0
        } else {
            (i64::from(a as i32).wrapping_div(i64::from(b as i32))) as u32
        };
        prop_assert_eq!(signed, Value::Imm(Imm::U32(expected_signed)));
    }

    #[test]
    fn not_folding_preserves_semantics(v in any::<u64>()) {
        prop_assert_eq!(
            fold_unary(Opcode::Not32, Value::Imm(Imm::U32(v as u32))),
            Value::Imm(Imm::U32(!(v as u32)))
        );
        prop_assert_eq!(
            fold_unary(Opcode::Not64, Value::Imm(Imm::U64(v))),
            Value::Imm(Imm::U64(!v))
        );
    }

    #[test]
    fn extraction_and_extension_folding(v in any::<u64>()) {
        prop_assert_eq!(
            fold_unary(Opcode::LeastSignificantByte, Value::Imm(Imm::U64(v))),
            Value::Imm(Imm::U8(v as u8))
        );
        prop_assert_eq!(
            fold_unary(Opcode::LeastSignificantHalf, Value::Imm(Imm::U64(v))),
            Value::Imm(Imm::U16(v as u16))
        );
        prop_assert_eq!(
            fold_unary(Opcode::LeastSignificantWord, Value::Imm(Imm::U64(v))),
            Value::Imm(Imm::U32(v as u32))
        );
        prop_assert_eq!(
            fold_unary(Opcode::MostSignificantBit, Value::Imm(Imm::U32(v as u32))),
            Value::Imm(Imm::U1((v as u32) >> 31 != 0))
        );
        prop_assert_eq!(
            fold_unary(Opcode::MostSignificantWord, Value::Imm(Imm::U64(v))),
            Value::Imm(Imm::U32((v >> 32) as u32))
        );
        prop_assert_eq!(
            fold_unary(Opcode::SignExtendByteToLong, Value::Imm(Imm::U8(v as u8))),
            Value::Imm(Imm::U64(v as u8 as i8 as i64 as u64))
        );
        prop_assert_eq!(
            fold_unary(Opcode::SignExtendHalfToWord, Value::Imm(Imm::U16(v as u16))),
            Value::Imm(Imm::U32(v as u16 as i16 as i32 as u32))
        );
        prop_assert_eq!(
            fold_unary(Opcode::ZeroExtendByteToLong, Value::Imm(Imm::U8(v as u8))),
            Value::Imm(Imm::U64(u64::from(v as u8)))
        );
        prop_assert_eq!(
            fold_unary(Opcode::ZeroExtendWordToLong, Value::Imm(Imm::U32(v as u32))),
            Value::Imm(Imm::U64(u64::from(v as u32)))
        );
    }

    #[test]
    fn byte_reverse_folding(v in any::<u64>()) {
        prop_assert_eq!(
            fold_unary(Opcode::ByteReverseHalf, Value::Imm(Imm::U16(v as u16))),
            Value::Imm(Imm::U16((v as u16).swap_bytes()))
        );
        prop_assert_eq!(
            fold_unary(Opcode::ByteReverseWord, Value::Imm(Imm::U32(v as u32))),
            Value::Imm(Imm::U32((v as u32).swap_bytes()))
        );
        prop_assert_eq!(
            fold_unary(Opcode::ByteReverseDual, Value::Imm(Imm::U64(v))),
            Value::Imm(Imm::U64(v.swap_bytes()))
        );
    }

    // `(x op k1) op k2` collapses to `x op (k1 op k2)`, and the collapse is
    // value-preserving for every concrete `x`.
    #[test]
    fn reassociation_is_value_preserving(
        k1 in any::<u32>(),
        k2 in any::<u32>(),
        x0 in any::<u32>(),
    ) {
        // k1 == 0 collapses the inner AND/MUL to an immediate outright,
        // which folds the outer instruction away before reassociation can
        // be observed.
        prop_assume!(k1 != 0);
        let cases: [(Opcode, fn(u32, u32) -> u32); 4] = [
            (Opcode::And32, |x, y| x & y),
            (Opcode::Or32, |x, y| x | y),
            (Opcode::Eor32, |x, y| x ^ y),
            (Opcode::Mul32, u32::wrapping_mul),
        ];
        for (op, f) in cases {
            let mut block = Block::new();
            let x = block.push(Opcode::GetRegister, &[reg(0)]);
            let inner = block.push(op, &[Value::Inst(x), Value::Imm(Imm::U32(k1))]);
            let outer = block.push(op, &[Value::Inst(inner), Value::Imm(Imm::U32(k2))]);
            block.push(Opcode::SetRegister, &[reg(1), Value::Inst(outer)]);

            constant_propagation(&mut block);

            prop_assert_eq!(block.arg(outer, 0), Value::Inst(x));
            prop_assert_eq!(block.arg(outer, 1), Value::Imm(Imm::U32(f(k1, k2))));
            // The rewritten form computes the same function of x.
            prop_assert_eq!(f(f(x0, k1), k2), f(x0, f(k1, k2)));
        }
    }

    // After the pass, any surviving commutative instruction with an
    // immediate operand has it in the right-hand slot.
    #[test]
    fn surviving_commutative_immediates_sit_on_the_right(v in any::<u32>(), lhs_imm in any::<bool>()) {
        for op in [Opcode::And32, Opcode::Or32, Opcode::Eor32, Opcode::Mul32] {
            let mut block = Block::new();
            let x = block.push(Opcode::GetRegister, &[reg(0)]);
            let args = if lhs_imm {
                [Value::Imm(Imm::U32(v)), Value::Inst(x)]
            } else {
                [Value::Inst(x), Value::Imm(Imm::U32(v))]
            };
            let inst = block.push(op, &args);
            block.push(Opcode::SetRegister, &[reg(1), Value::Inst(inst)]);

            constant_propagation(&mut block);

            if block.replacement(inst).is_none() {
                prop_assert!(!block.arg(inst, 0).is_immediate());
                prop_assert!(block.arg(inst, 1).is_immediate());
            }
        }
    }

    // No instruction is ever physically removed, and replaced instructions
    // end the pass with zero remaining uses.
    #[test]
    fn replaced_insts_are_dead_but_present(a in any::<u32>(), b in any::<u32>()) {
        let mut block = Block::new();
        let and = block.push(Opcode::And32, &[Value::Imm(Imm::U32(a)), Value::Imm(Imm::U32(b))]);
        let or = block.push(Opcode::Or32, &[Value::Inst(and), Value::Imm(Imm::U32(0))]);
        block.push(Opcode::SetRegister, &[reg(0), Value::Inst(or)]);
        let len_before = block.len();

        constant_propagation(&mut block);

        prop_assert_eq!(block.len(), len_before);
        for inst in [and, or] {
            if block.replacement(inst).is_some() {
                prop_assert_eq!(block.remaining_uses(inst), 0);
            }
        }
    }
}

#[test]
fn shift_carry_rewrites_compose_with_folding() {
    // The shifted value folds to an immediate first; the zero-amount shift
    // then forwards it, and the carry pseudo-op picks up the carry-in.
    let mut block = Block::new();
    let folded = block.push(
        Opcode::Or32,
        &[Value::Imm(Imm::U32(0x10)), Value::Imm(Imm::U32(0x01))],
    );
    let shift = block.push(
        Opcode::RotateRight32,
        &[
            Value::Inst(folded),
            Value::Imm(Imm::U8(0)),
            Value::Imm(Imm::U1(true)),
        ],
    );
    let carry = block.push(Opcode::GetCarryFromOp, &[Value::Inst(shift)]);
    let s0 = block.push(Opcode::SetRegister, &[reg(0), Value::Inst(shift)]);
    let s1 = block.push(Opcode::SetRegister, &[reg(1), Value::Inst(carry)]);

    constant_propagation(&mut block);

    assert_eq!(block.arg(s0, 1), Value::Imm(Imm::U32(0x11)));
    assert_eq!(block.arg(s1, 1), Value::Imm(Imm::U1(true)));
}

// Keep `InstRef` in the public test surface honest: indices are stable
// across the pass because nothing is removed.
#[test]
fn inst_refs_remain_valid_after_the_pass() {
    let mut block = Block::new();
    let a = block.push(Opcode::And32, &[Value::Imm(Imm::U32(1)), Value::Imm(Imm::U32(3))]);
    constant_propagation(&mut block);
    assert_eq!(a, InstRef(0));
    assert_eq!(block.replacement(a), Some(Value::Imm(Imm::U32(1))));
}
