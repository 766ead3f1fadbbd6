//! Block-local optimization passes.

mod const_prop;

pub use const_prop::constant_propagation;
