//! Architecture description for x86/32-bit Linux.
//!
//! This module carries everything the pipeline needs to know about the target
//! architecture without decoding instruction bytes itself:
//!
//! - [`Register`] / [`ArchSpec`] - the register set and the ABI facts
//!   (frame-base and stack-pointer registers, word width, argument-area
//!   displacement floors) handed to every pipeline component
//! - [`Mnemonic`] / [`Operand`] / [`Instruction`] - the decoded-instruction
//!   shape the external decoder produces and the tagger enriches
//! - [`InstructionTags`] - the closed set of control-flow and ABI hints
//! - [`syscall_name`] - the fixed system-call-number table
//!
//! # Example
//!
//! ```rust
//! use elfscope::arch::{ArchSpec, Instruction, Mnemonic, Operand, Register};
//!
//! let arch = ArchSpec::X86_LINUX;
//! let push = Instruction::new(
//!     Some(0x8048000),
//!     1,
//!     Mnemonic::Push,
//!     vec![Operand::Register(arch.frame_base)],
//! );
//! assert_eq!(push.end_address(), Some(0x8048001));
//! ```

mod instruction;
mod registers;
mod syscalls;

pub use instruction::{
    BaseRef, CallKind, Condition, Instruction, InstructionTags, MemoryRef, Mnemonic, Operand,
    Target,
};
pub use registers::{ArchSpec, Register};
pub use syscalls::syscall_name;
