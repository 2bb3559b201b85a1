//! Instruction representation consumed and enriched by the tagging pipeline.
//!
//! The decoder (an external component) produces [`Instruction`] values with a
//! normalized [`Mnemonic`] class and a list of [`Operand`]s; the pipeline
//! fills in [`InstructionTags`]. The tag vocabulary is closed and known at
//! design time, so it is a plain struct of named fields rather than an open
//! key-value map — a consumer can pattern-match on it exhaustively and the
//! compiler tracks every producer.

use std::sync::Arc;

use crate::image::Symbol;

use super::registers::Register;

/// Normalized opcode class of a decoded instruction.
///
/// The tagger only distinguishes the classes that carry control-flow or
/// stack-discipline meaning; everything else decodes to [`Mnemonic::Other`]
/// and is only subject to operand scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    /// Return from procedure (RET, RETN, RETF)
    Ret,
    /// Push onto the stack
    Push,
    /// Pop from the stack
    Pop,
    /// Build a stack frame (ENTER)
    Enter,
    /// Tear down a stack frame (LEAVE)
    Leave,
    /// Procedure call
    Call,
    /// Unconditional jump
    Jmp,
    /// Conditional jump (any Jcc form)
    Jcc,
    /// Any instruction without control-flow or stack-discipline meaning
    Other,
}

/// Condition codes for conditional jumps (Jcc instructions).
///
/// Each condition has a logical negation accessible via
/// [`Condition::negate`], which downstream CFG construction uses to label the
/// fall-through edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    /// Equal (ZF=1)
    E,
    /// Not equal (ZF=0)
    Ne,
    /// Less than, signed (SF!=OF)
    L,
    /// Greater than or equal, signed (SF=OF)
    Ge,
    /// Less than or equal, signed (ZF=1 or SF!=OF)
    Le,
    /// Greater than, signed (ZF=0 and SF=OF)
    G,
    /// Below, unsigned (CF=1)
    B,
    /// Above or equal, unsigned (CF=0)
    Ae,
    /// Below or equal, unsigned (CF=1 or ZF=1)
    Be,
    /// Above, unsigned (CF=0 and ZF=0)
    A,
    /// Sign (SF=1)
    S,
    /// Not sign (SF=0)
    Ns,
    /// Overflow (OF=1)
    O,
    /// Not overflow (OF=0)
    No,
    /// Parity even (PF=1)
    P,
    /// Parity odd (PF=0)
    Np,
}

impl Condition {
    /// Returns the negation of this condition.
    pub fn negate(&self) -> Self {
        match self {
            Condition::E => Condition::Ne,
            Condition::Ne => Condition::E,
            Condition::L => Condition::Ge,
            Condition::Ge => Condition::L,
            Condition::Le => Condition::G,
            Condition::G => Condition::Le,
            Condition::B => Condition::Ae,
            Condition::Ae => Condition::B,
            Condition::Be => Condition::A,
            Condition::A => Condition::Be,
            Condition::S => Condition::Ns,
            Condition::Ns => Condition::S,
            Condition::O => Condition::No,
            Condition::No => Condition::O,
            Condition::P => Condition::Np,
            Condition::Np => Condition::P,
        }
    }
}

/// Base of a memory operand.
///
/// Starts out as a register or a constant from the decoder; the tagger may
/// replace a constant base with the [`Symbol`] it resolves to (see
/// [`MemoryRef::canonicalized`]).
#[derive(Debug, Clone, PartialEq)]
pub enum BaseRef {
    /// Base held in a register (e.g. `[ebp-4]`)
    Register(Register),
    /// Absolute constant base (e.g. `[0x8049ff4]`)
    Constant(u64),
    /// Constant base resolved to a known symbol
    Symbol(Arc<Symbol>),
}

/// Memory operand: `[base + displacement]`.
///
/// # Example
///
/// ```rust
/// use elfscope::arch::{MemoryRef, Register};
///
/// // [ebp+8] — first stack argument under the standard frame layout
/// let arg = MemoryRef::base_disp(Register::Ebp, 8, 4);
/// assert_eq!(arg.displacement, 8);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRef {
    /// Base of the effective address.
    pub base: BaseRef,
    /// Signed displacement added to the base.
    pub displacement: i64,
    /// Size of the memory access in bytes.
    pub size: u8,
}

impl MemoryRef {
    /// Creates a `[register + displacement]` memory operand.
    pub fn base_disp(base: Register, displacement: i64, size: u8) -> Self {
        Self {
            base: BaseRef::Register(base),
            displacement,
            size,
        }
    }

    /// Creates a `[constant + displacement]` memory operand.
    pub fn absolute(base: u64, displacement: i64, size: u8) -> Self {
        Self {
            base: BaseRef::Constant(base),
            displacement,
            size,
        }
    }

    /// Returns a new operand with the base replaced by the resolved symbol and
    /// the displacement folded to zero.
    ///
    /// This is a one-time canonicalization: applying it to an already-symbolic
    /// operand produces an identical value.
    pub fn canonicalized(&self, symbol: Arc<Symbol>) -> Self {
        Self {
            base: BaseRef::Symbol(symbol),
            displacement: 0,
            size: self.size,
        }
    }
}

/// Operand of a decoded instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Register operand (e.g. `eax`)
    Register(Register),
    /// Immediate constant, sign-extended by the decoder
    Immediate(i64),
    /// Memory operand (e.g. `[ebp-4]`, `[0x8049ff4]`)
    Memory(MemoryRef),
}

impl Operand {
    /// Returns the register if this is a register operand.
    pub fn as_register(&self) -> Option<Register> {
        match self {
            Operand::Register(r) => Some(*r),
            _ => None,
        }
    }

    /// Returns the immediate value if this is an immediate operand.
    pub fn as_immediate(&self) -> Option<i64> {
        match self {
            Operand::Immediate(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a reference to the memory operand if this is a memory operand.
    pub fn as_memory(&self) -> Option<&MemoryRef> {
        match self {
            Operand::Memory(m) => Some(m),
            _ => None,
        }
    }
}

/// Resolved destination of a control transfer.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Computed absolute address with no matching symbol
    Address(u64),
    /// Address resolved to a known symbol
    Symbol(Arc<Symbol>),
}

impl Target {
    /// The absolute address of the target, whether or not it resolved.
    pub fn address(&self) -> u64 {
        match self {
            Target::Address(a) => *a,
            Target::Symbol(s) => s.address,
        }
    }
}

/// Classification of a CALL instruction.
///
/// A call whose resolved target equals its own fall-through address does not
/// invoke anything — it pushes an address for position-independent code to
/// pick up. Such calls keep their target metadata but are marked
/// [`CallKind::Fake`] so CFG construction can decide whether to draw the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Ordinary call that transfers control to a callee
    Genuine,
    /// CALL used only to push its return address
    Fake,
}

/// Control-flow and ABI hints attached to one instruction by the tagging
/// pipeline.
///
/// All fields start unset ([`Default`]); the tagger fills them in a single
/// forward pass and re-tagging an already-tagged instruction reproduces the
/// same values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstructionTags {
    /// Instruction begins a function (frame-establishing push, PLT thunk)
    pub func_start: bool,
    /// Instruction ends a function (return, frame-releasing pop, PLT thunk)
    pub func_end: bool,
    /// Instruction grows the stack
    pub func_stack: bool,
    /// Instruction shrinks the stack
    pub func_unstack: bool,
    /// Instruction is a call, and whether it is genuine or fake
    pub call: Option<CallKind>,
    /// Instruction is a jump
    pub goto: bool,
    /// Condition code of a conditional jump
    pub condition: Option<Condition>,
    /// Fall-through address of a call, used to detect fake calls
    pub return_to: Option<u64>,
    /// Resolved destination of a call or jump
    pub target: Option<Target>,
    /// Instruction touches the argument area of the current frame
    pub uses_argument: bool,
    /// Instruction touches a local variable of the current frame
    pub uses_variable: bool,
    /// Immediate operand that resolved to a known symbol (address-of-global idiom)
    pub imm_ref: Option<Arc<Symbol>>,
}

/// One decoded instruction.
///
/// Created by the external decoder; the tagging pipeline takes ownership of
/// the sequence, enriches [`tags`](Self::tags) (and may canonicalize memory
/// operands), and hands the same sequence back. The decoder's own buffers are
/// never aliased.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Virtual address, when known.
    ///
    /// `None` for instructions materialized from dynamically computed
    /// locations; address-relative classification is skipped for those.
    pub address: Option<u64>,
    /// Length of the encoded instruction in bytes (1-15 for x86).
    pub length: usize,
    /// Normalized opcode class.
    pub mnemonic: Mnemonic,
    /// Condition code, present on conditional jumps.
    pub condition: Option<Condition>,
    /// Ordered operand list.
    pub operands: Vec<Operand>,
    /// Hints attached by the tagging pipeline.
    pub tags: InstructionTags,
}

impl Instruction {
    /// Creates an untagged instruction.
    pub fn new(
        address: Option<u64>,
        length: usize,
        mnemonic: Mnemonic,
        operands: Vec<Operand>,
    ) -> Self {
        Self {
            address,
            length,
            mnemonic,
            condition: None,
            operands,
            tags: InstructionTags::default(),
        }
    }

    /// Attaches the condition code of a conditional jump.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Returns the address immediately after this instruction, when the
    /// address is known.
    ///
    /// For calls this is the return address pushed onto the stack.
    #[inline]
    pub fn end_address(&self) -> Option<u64> {
        self.address.map(|a| a + self.length as u64)
    }
}
