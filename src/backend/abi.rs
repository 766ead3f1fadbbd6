//! Host ABI description consumed by the register allocator.

use super::hostloc::HostLoc;

pub const RAX: HostLoc = HostLoc::Gpr(0);
pub const RCX: HostLoc = HostLoc::Gpr(1);
pub const RDX: HostLoc = HostLoc::Gpr(2);
pub const RBX: HostLoc = HostLoc::Gpr(3);
pub const RSP: HostLoc = HostLoc::Gpr(4);
pub const RBP: HostLoc = HostLoc::Gpr(5);
pub const RSI: HostLoc = HostLoc::Gpr(6);
pub const RDI: HostLoc = HostLoc::Gpr(7);
pub const R8: HostLoc = HostLoc::Gpr(8);
pub const R9: HostLoc = HostLoc::Gpr(9);
pub const R10: HostLoc = HostLoc::Gpr(10);
pub const R11: HostLoc = HostLoc::Gpr(11);
pub const R12: HostLoc = HostLoc::Gpr(12);
pub const R13: HostLoc = HostLoc::Gpr(13);
pub const R14: HostLoc = HostLoc::Gpr(14);
/// Reserved: holds the JIT state pointer for the lifetime of compiled code.
pub const R15: HostLoc = HostLoc::Gpr(15);

/// Register-file description: preference orders and calling convention.
///
/// Preference order is a crude locality heuristic (callee-saved registers
/// first, volatiles after), consumed front-to-back by
/// [`RegAlloc`](super::RegAlloc). Reserved registers (the
/// stack pointer, the JIT state pointer) must simply never appear in any
/// order or desired set.
#[derive(Clone, Debug)]
pub struct HostAbi {
    /// GPRs the allocator may hand out, most preferred first.
    pub gpr_order: Vec<HostLoc>,
    /// Vector registers the allocator may hand out, most preferred first.
    pub xmm_order: Vec<HostLoc>,
    /// Integer argument registers for host calls, in argument order.
    pub param_regs: [HostLoc; 4],
    /// Register holding a host call's return value.
    pub return_reg: HostLoc,
    /// Registers a host call may clobber; live values bound to these are
    /// spilled before the call.
    pub caller_saved: Vec<HostLoc>,
}

impl HostAbi {
    /// The System V x86-64 convention, with RSP and R15 reserved.
    #[must_use]
    pub fn sysv_x64() -> Self {
        let gpr_order = vec![
            RBX, RBP, R12, R13, R14, // callee-saved
            RAX, RCX, RDX, RSI, RDI, R8, R9, R10, R11, // volatile
        ];
        let xmm_order = (6..16).chain(0..6).map(HostLoc::Xmm).collect();
        let mut caller_saved = vec![RAX, RCX, RDX, RSI, RDI, R8, R9, R10, R11];
        caller_saved.extend((0..16).map(HostLoc::Xmm));
        Self {
            gpr_order,
            xmm_order,
            param_regs: [RDI, RSI, RDX, RCX],
            return_reg: RAX,
            caller_saved,
        }
    }
}

impl Default for HostAbi {
    fn default() -> Self {
        Self::sysv_x64()
    }
}
