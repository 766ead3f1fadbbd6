//! Host-side backend: location model, ABI description, and the register
//! allocator that drives an abstract code sink.

pub mod abi;
mod emitter;
mod hostloc;
mod reg_alloc;

pub use abi::HostAbi;
pub use emitter::{CodeEmitter, OpArg};
pub use hostloc::{HostLoc, LocInfo, GPR_COUNT, HOST_LOC_COUNT, SPILL_COUNT, XMM_COUNT};
pub use reg_alloc::RegAlloc;
