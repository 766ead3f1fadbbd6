/// Opcodes of the block IR.
///
/// Width-suffixed opcodes operate on 32- or 64-bit values; the 32-bit shift
/// variants carry a third carry-in argument. `GetCarryFromOp` is a pseudo-op
/// that extracts the carry-out of its primary instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Guest register file accessors (opaque to optimization).
    GetRegister,
    SetRegister,

    And32,
    And64,
    Or32,
    Or64,
    Eor32,
    Eor64,
    Not32,
    Not64,
    Mul32,
    Mul64,
    SignedDiv32,
    SignedDiv64,
    UnsignedDiv32,
    UnsignedDiv64,

    LogicalShiftLeft32,
    LogicalShiftLeft64,
    LogicalShiftRight32,
    LogicalShiftRight64,
    ArithmeticShiftRight32,
    ArithmeticShiftRight64,
    RotateRight32,
    RotateRight64,

    LeastSignificantByte,
    LeastSignificantHalf,
    LeastSignificantWord,
    MostSignificantBit,
    MostSignificantWord,

    SignExtendByteToWord,
    SignExtendHalfToWord,
    SignExtendByteToLong,
    SignExtendHalfToLong,
    SignExtendWordToLong,
    ZeroExtendByteToWord,
    ZeroExtendHalfToWord,
    ZeroExtendByteToLong,
    ZeroExtendHalfToLong,
    ZeroExtendWordToLong,

    ByteReverseHalf,
    ByteReverseWord,
    ByteReverseDual,

    GetCarryFromOp,
}
