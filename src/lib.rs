//! Dynamic binary translation of 6502 machine code to x86-64.
//!
//! Target code is translated a block at a time into a reserved region of executable memory and
//! run natively. Memory accesses that leave generated code go through [`memory::TargetMemory`],
//! which routes each byte to ROM, RAM or a device [`memory::Handler`].

#[cfg(not(all(unix, target_arch = "x86_64")))]
compile_error!("jit6502 generates x86-64 code and requires a unix host");

pub mod compiler;
pub mod cpu_state;
pub mod devices;
mod error;
pub mod executor;
pub mod memory;
mod vm;

pub use cpu_state::CpuState;
pub use error::Error;
pub use vm::{Vm, VmOptions, RESET_VECTOR};
