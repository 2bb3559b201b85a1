//! Second tagging stage: semantic confirmation over a basic block.
//!
//! Pattern-matching on mnemonics cannot prove what a block *does* — an
//! obfuscated prologue may establish a frame without ever executing
//! `push ebp`. Once the external symbolic engine has executed a block and
//! produced its aggregate [`SymbolicState`], the [`BlockRefiner`] checks the
//! state for three canonical idioms and tags the block accordingly:
//!
//! - the cell one word below the frame base holds the frame base's entry
//!   value — the frame pointer was saved, this block starts a function;
//! - the instruction pointer equals the cell one word below the stack
//!   pointer — control returned through a popped address, this block ends a
//!   function;
//! - the cell at the stack pointer holds the block's own end address — a
//!   call pushed its return address.
//!
//! Block-level tags are kept separate from the instruction-level tags of the
//! first stage. The two kinds of evidence can disagree (and do, on
//! obfuscated code); downstream consumers weigh them, this stage never
//! merges them.

use crate::{
    arch::{ArchSpec, Instruction},
    symbolic::{Location, MemLoc, SymbolicState, SymbolicValue},
};

/// Semantic tags attached to a basic block by the refiner.
///
/// Deliberately parallel to the instruction-level tags but owned by the
/// block, so structural (syntax) and semantic (state) evidence stay
/// distinguishable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockTags {
    /// Executing the block establishes a stack frame
    pub func_start: bool,
    /// Executing the block returns to the caller
    pub func_end: bool,
    /// Executing the block pushes its own end address (a call)
    pub func_call: bool,
}

/// A maximal straight-line instruction run.
///
/// Owned by the control-flow graph; the pipeline only enriches its tags.
/// The `support` interval `[start, end)` covers the addresses the block's
/// instructions occupy.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    /// First address of the block.
    pub start: u64,
    /// Address one past the last instruction.
    pub end: u64,
    /// Decoded (and tagged) instructions of the block.
    pub instructions: Vec<Instruction>,
    /// Semantic tags attached by the refiner.
    pub tags: BlockTags,
}

impl BasicBlock {
    /// Creates an empty block covering `[start, end)`.
    pub fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            end,
            instructions: Vec::new(),
            tags: BlockTags::default(),
        }
    }

    /// Builds a block from tagged instructions, deriving the support
    /// interval from the first and last addresses.
    ///
    /// Instructions without a known address contribute nothing to the
    /// interval; an all-unresolved sequence yields an empty support.
    pub fn from_instructions(instructions: Vec<Instruction>) -> Self {
        let start = instructions
            .iter()
            .find_map(|i| i.address)
            .unwrap_or_default();
        let end = instructions
            .iter()
            .rev()
            .find_map(|i| i.end_address())
            .unwrap_or(start);
        Self {
            start,
            end,
            instructions,
            tags: BlockTags::default(),
        }
    }

    /// The support interval `[start, end)`.
    #[inline]
    pub fn support(&self) -> (u64, u64) {
        (self.start, self.end)
    }
}

/// Confirms function-entry/exit/call hypotheses from a block's computed
/// symbolic state.
pub struct BlockRefiner {
    arch: ArchSpec,
}

impl BlockRefiner {
    /// Creates a refiner for the given architecture.
    pub fn new(arch: ArchSpec) -> Self {
        Self { arch }
    }

    /// Adds semantic tags to the block based on its aggregate state.
    ///
    /// Runs once per block, after the external symbolic engine has computed
    /// the state; calling it again with the same state is harmless.
    pub fn refine(&self, block: &mut BasicBlock, state: &SymbolicState) {
        let word = i64::from(self.arch.word_bytes);
        let width = self.arch.word_bits();

        // saved frame pointer: [frame_base - word] == entry frame_base
        let saved_slot = MemLoc::new(self.arch.frame_base, -word, self.arch.word_bytes);
        if state.peek(Location::Memory(saved_slot)) == SymbolicValue::reg(self.arch.frame_base) {
            block.tags.func_start = true;
        }

        // return via popped address: ip == [stack_pointer - word]
        let popped_slot = MemLoc::new(self.arch.stack_pointer, -word, self.arch.word_bytes);
        if state.register(self.arch.instruction_pointer) == SymbolicValue::mem(popped_slot) {
            block.tags.func_end = true;
        }

        // call pushed its return address: [stack_pointer] == block end
        let top_slot = MemLoc::new(self.arch.stack_pointer, 0, self.arch.word_bytes);
        if state.peek(Location::Memory(top_slot))
            == SymbolicValue::cst(block.end & self.arch.word_mask(), width)
        {
            block.tags.func_call = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::{Mnemonic, Operand, Register};

    fn refiner() -> BlockRefiner {
        BlockRefiner::new(ArchSpec::X86_LINUX)
    }

    #[test]
    fn test_saved_frame_pointer_marks_start() {
        let mut block = BasicBlock::new(0x1000, 0x1003);
        let mut state = SymbolicState::new();
        // the prologue stored the entry ebp one word below ebp
        state.write(
            Location::Memory(MemLoc::new(Register::Ebp, -4, 4)),
            SymbolicValue::reg(Register::Ebp),
        );

        refiner().refine(&mut block, &state);
        assert!(block.tags.func_start);
        assert!(!block.tags.func_end);
        assert!(!block.tags.func_call);
    }

    #[test]
    fn test_popped_return_address_marks_end() {
        let mut block = BasicBlock::new(0x1000, 0x1001);
        let mut state = SymbolicState::new();
        state.write(
            Location::Register(Register::Eip),
            SymbolicValue::mem(MemLoc::new(Register::Esp, -4, 4)),
        );

        refiner().refine(&mut block, &state);
        assert!(block.tags.func_end);
        assert!(!block.tags.func_start);
    }

    #[test]
    fn test_pushed_return_address_marks_call() {
        let mut block = BasicBlock::new(0x1000, 0x1005);
        let mut state = SymbolicState::new();
        state.write(
            Location::Memory(MemLoc::new(Register::Esp, 0, 4)),
            SymbolicValue::cst(0x1005, 32),
        );

        refiner().refine(&mut block, &state);
        assert!(block.tags.func_call);
    }

    #[test]
    fn test_other_end_address_is_not_a_call() {
        let mut block = BasicBlock::new(0x1000, 0x1005);
        let mut state = SymbolicState::new();
        state.write(
            Location::Memory(MemLoc::new(Register::Esp, 0, 4)),
            SymbolicValue::cst(0x2000, 32),
        );

        refiner().refine(&mut block, &state);
        assert!(!block.tags.func_call);
    }

    #[test]
    fn test_untouched_state_adds_no_tags() {
        let mut block = BasicBlock::new(0x1000, 0x1002);
        let state = SymbolicState::new();

        refiner().refine(&mut block, &state);
        assert_eq!(block.tags, BlockTags::default());
    }

    #[test]
    fn test_support_from_instructions() {
        let block = BasicBlock::from_instructions(vec![
            Instruction::new(
                Some(0x1000),
                1,
                Mnemonic::Push,
                vec![Operand::Register(Register::Ebp)],
            ),
            Instruction::new(Some(0x1001), 2, Mnemonic::Other, vec![]),
            Instruction::new(Some(0x1003), 1, Mnemonic::Ret, vec![]),
        ]);
        assert_eq!(block.support(), (0x1000, 0x1004));
    }
}
