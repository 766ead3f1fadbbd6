//! Backend core for a dynamic binary translator.
//!
//! Guest basic blocks arrive as a typed SSA IR ([`ir::Block`]). Two passes run
//! over each block, in order:
//!
//! - [`opt::constant_propagation`] folds immediate-only computations and
//!   applies algebraic identities in place, rewriting consumers through
//!   per-instruction replacements.
//! - [`backend::RegAlloc`] satisfies the emitter's per-instruction register
//!   requests against a bounded pool of host GPRs, vector registers, and
//!   spill slots, recording the required moves through a [`backend::CodeEmitter`].
//!
//! IR construction, opcode decoding, terminator handling, and the actual
//! instruction encoder live outside this crate; the allocator only sees an
//! abstract code sink.

pub mod backend;
pub mod ir;
pub mod opt;

pub use backend::{CodeEmitter, HostAbi, HostLoc, OpArg, RegAlloc};
pub use ir::{Block, Imm, Inst, InstRef, Opcode, Type, Value};
pub use opt::constant_propagation;
