//! The code sink the allocator drives.

use super::hostloc::HostLoc;

/// An operand the emitter can read: a host register, or a spill slot as a
/// memory operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpArg {
    Reg(HostLoc),
    Mem(HostLoc),
}

impl OpArg {
    /// The register, if this operand is one. Panics on memory operands.
    #[must_use]
    pub fn reg(self) -> HostLoc {
        match self {
            OpArg::Reg(loc) => loc,
            OpArg::Mem(loc) => panic!("expected a register operand, got spill {loc:?}"),
        }
    }

    #[must_use]
    pub fn is_reg(self) -> bool {
        matches!(self, OpArg::Reg(_))
    }
}

/// Primitive move/exchange operations the allocator asks the host-code
/// emitter to issue. All writes to the code buffer are infallible; there is
/// no back-channel.
pub trait CodeEmitter {
    fn mov_reg_reg(&mut self, to: HostLoc, from: HostLoc);
    fn mov_reg_spill(&mut self, to: HostLoc, slot: usize);
    fn mov_spill_reg(&mut self, slot: usize, from: HostLoc);
    fn mov_xmm_xmm(&mut self, to: HostLoc, from: HostLoc);
    fn mov_xmm_spill(&mut self, to: HostLoc, slot: usize);
    fn mov_spill_xmm(&mut self, slot: usize, from: HostLoc);
    fn xchg_reg_reg(&mut self, a: HostLoc, b: HostLoc);
    /// Load a 64-bit immediate into a GPR.
    fn mov_imm(&mut self, to: HostLoc, imm: u64);
    /// Zero a GPR (the `xor reg, reg` idiom).
    fn zero_reg(&mut self, to: HostLoc);
}
