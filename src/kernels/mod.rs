//! The blocked contraction machine: packing, the register-level microkernel,
//! and the five-loop macrokernel around it.

mod loops;
mod microkernel;
mod pack;

pub use microkernel::GemmKernel;

pub(crate) use loops::{NestContext, thread_main};
pub(crate) use pack::{PackBuffer, group_offsets};
