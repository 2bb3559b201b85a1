//! Semantic-tagging pipeline over decoded code.
//!
//! Three stages, each strictly enriching what the previous one attached,
//! none revisiting raw bytes:
//!
//! 1. [`InstructionTagger`] - a single forward pass over a freshly decoded
//!    instruction sequence, attaching control-flow and stack-usage hints
//!    from mnemonics, operands and the symbol index
//! 2. [`BlockRefiner`] - semantic confirmation over a basic block, once the
//!    external symbolic engine has computed its aggregate state
//! 3. [`FunctionFinalizer`] - identity and classification of a whole
//!    function, once its CFG and aggregate map are final
//!
//! The stages share no mutable state beyond the instruction/block/function
//! metadata being processed, so independent functions (or images) can be
//! processed by separate pipeline instances concurrently as long as the
//! caller partitions the metadata.
//!
//! Anomalies never abort the pipeline; they are collected in
//! [`Diagnostics`].
//!
//! # Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//! use elfscope::analysis::{BasicBlock, BlockRefiner, InstructionTagger};
//! use elfscope::arch::{ArchSpec, Instruction, Mnemonic, Operand, Register};
//! use elfscope::image::Symbol;
//! use elfscope::symbolic::SymbolicState;
//!
//! let arch = ArchSpec::X86_LINUX;
//! let symbols: BTreeMap<u64, Arc<Symbol>> = BTreeMap::new();
//!
//! // stage 1: tag the decoded sequence
//! let tagger = InstructionTagger::new(arch, &symbols);
//! let tagged = tagger.tag_sequence(vec![
//!     Instruction::new(Some(0x1000), 1, Mnemonic::Push,
//!         vec![Operand::Register(Register::Ebp)]),
//! ]);
//!
//! // stage 2: refine the block once its symbolic state exists
//! let mut block = BasicBlock::from_instructions(tagged);
//! let state = SymbolicState::new();
//! BlockRefiner::new(arch).refine(&mut block, &state);
//! ```

mod block;
mod diagnostics;
mod function;
mod tagger;

pub use block::{BasicBlock, BlockRefiner, BlockTags};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use function::{CfgNode, Function, FunctionFinalizer, FunctionGraph, FunctionTags};
pub use tagger::InstructionTagger;
