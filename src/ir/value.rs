use super::InstRef;

/// Width of an immediate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    U1,
    U8,
    U16,
    U32,
    U64,
}

impl Type {
    /// Number of meaningful bits.
    #[must_use]
    pub fn bits(self) -> u32 {
        match self {
            Type::U1 => 1,
            Type::U8 => 8,
            Type::U16 => 16,
            Type::U32 => 32,
            Type::U64 => 64,
        }
    }
}

/// A width-tagged immediate. The carrier is always wide enough for the tag;
/// accessors extend from the tag's width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Imm {
    U1(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
}

impl Imm {
    #[must_use]
    pub fn ty(self) -> Type {
        match self {
            Imm::U1(_) => Type::U1,
            Imm::U8(_) => Type::U8,
            Imm::U16(_) => Type::U16,
            Imm::U32(_) => Type::U32,
            Imm::U64(_) => Type::U64,
        }
    }

    /// Zero-extended view.
    #[must_use]
    pub fn as_u64(self) -> u64 {
        match self {
            Imm::U1(b) => u64::from(b),
            Imm::U8(v) => u64::from(v),
            Imm::U16(v) => u64::from(v),
            Imm::U32(v) => u64::from(v),
            Imm::U64(v) => v,
        }
    }

    /// Sign-extended view (from the tag's width).
    #[must_use]
    pub fn as_s64(self) -> i64 {
        match self {
            Imm::U1(b) => i64::from(b),
            Imm::U8(v) => i64::from(v as i8),
            Imm::U16(v) => i64::from(v as i16),
            Imm::U32(v) => i64::from(v as i32),
            Imm::U64(v) => v as i64,
        }
    }

    #[must_use]
    pub fn is_zero(self) -> bool {
        self.as_u64() == 0
    }

    /// True when every bit within the tag's width is set.
    #[must_use]
    pub fn has_all_bits_set(self) -> bool {
        match self {
            Imm::U1(b) => b,
            Imm::U8(v) => v == u8::MAX,
            Imm::U16(v) => v == u16::MAX,
            Imm::U32(v) => v == u32::MAX,
            Imm::U64(v) => v == u64::MAX,
        }
    }
}

/// An instruction argument: absent, an immediate, or a reference to an
/// instruction defined earlier in the same block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Value {
    Empty,
    Imm(Imm),
    Inst(InstRef),
}

impl Value {
    #[must_use]
    pub fn is_empty(self) -> bool {
        matches!(self, Value::Empty)
    }

    #[must_use]
    pub fn is_immediate(self) -> bool {
        matches!(self, Value::Imm(_))
    }

    /// Immediate with value zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        matches!(self, Value::Imm(imm) if imm.is_zero())
    }

    /// Immediate with all defined bits set.
    #[must_use]
    pub fn has_all_bits_set(self) -> bool {
        matches!(self, Value::Imm(imm) if imm.has_all_bits_set())
    }

    /// Immediate equal to `k` under the unsigned view.
    #[must_use]
    pub fn is_unsigned_immediate(self, k: u64) -> bool {
        matches!(self, Value::Imm(imm) if imm.as_u64() == k)
    }

    /// Unsigned view of an immediate. Panics on non-immediates.
    #[must_use]
    pub fn as_u64(self) -> u64 {
        match self {
            Value::Imm(imm) => imm.as_u64(),
            _ => panic!("as_u64 on a non-immediate value: {self:?}"),
        }
    }

    /// Signed view of an immediate. Panics on non-immediates.
    #[must_use]
    pub fn as_s64(self) -> i64 {
        match self {
            Value::Imm(imm) => imm.as_s64(),
            _ => panic!("as_s64 on a non-immediate value: {self:?}"),
        }
    }

    /// The referenced instruction. Panics unless this is an `Inst` value.
    #[must_use]
    pub fn inst(self) -> InstRef {
        match self {
            Value::Inst(inst) => inst,
            _ => panic!("inst() on a non-instruction value: {self:?}"),
        }
    }

    #[must_use]
    pub fn as_inst(self) -> Option<InstRef> {
        match self {
            Value::Inst(inst) => Some(inst),
            _ => None,
        }
    }
}

impl From<Imm> for Value {
    fn from(imm: Imm) -> Self {
        Value::Imm(imm)
    }
}
