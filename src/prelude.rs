//! # elfscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the elfscope library. Import this module to get quick access to the essential
//! types for loading and analyzing x86/Linux ELF executables.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all elfscope operations
pub use crate::Error;

/// The result type used throughout elfscope
pub use crate::Result;

// ================================================================================================
// Architecture Description
// ================================================================================================

/// Architecture facts handed to every pipeline component
pub use crate::arch::{ArchSpec, Register};

/// Decoded-instruction shape and the closed tag structure
pub use crate::arch::{
    BaseRef, CallKind, Condition, Instruction, InstructionTags, MemoryRef, Mnemonic, Operand,
    Target,
};

/// Linux x86 system-call-number table
pub use crate::arch::syscall_name;

// ================================================================================================
// Binary Image
// ================================================================================================

/// ELF container adapter and its query surface
pub use crate::image::{
    ElfImage, LoadSegment, Section, SegmentFlags, Symbol, SymbolKind, SymbolLookup,
};

// ================================================================================================
// Address Space and Loading
// ================================================================================================

/// The modeled virtual address space
pub use crate::memory::{AddressSpace, ExternalRef, Zone, PAGE_SIZE};

/// Image materialization
pub use crate::loader::Loader;

// ================================================================================================
// Symbolic State
// ================================================================================================

/// Symbolic-state vocabulary shared with the execution engine
pub use crate::symbolic::{Location, MemLoc, SymbolicState, SymbolicValue};

// ================================================================================================
// Analysis Pipeline
// ================================================================================================

/// The three tagging stages
pub use crate::analysis::{BlockRefiner, FunctionFinalizer, InstructionTagger};

/// Units the stages operate on
pub use crate::analysis::{BasicBlock, BlockTags, CfgNode, Function, FunctionGraph, FunctionTags};

/// Non-fatal diagnostics stream
pub use crate::analysis::{Diagnostic, Diagnostics, Severity};

// ================================================================================================
// Environment Emulation
// ================================================================================================

/// Library-entry stub handlers
pub use crate::runtime::StubRegistry;
