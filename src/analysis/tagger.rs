//! First tagging stage: a single forward pass over a decoded sequence.
//!
//! The [`InstructionTagger`] annotates each instruction with control-flow and
//! stack-usage hints derived from its mnemonic class, its operands, and the
//! image's symbol index. It never looks at raw bytes, never backtracks, and
//! visits each instruction exactly once; re-running it over the same sequence
//! reproduces the same tags.
//!
//! Classification is ordered by specificity and the first matching rule wins:
//! returns, then frame pushes/pops, then control transfers, then a generic
//! operand scan. An instruction therefore never receives contradictory
//! frame-start/frame-end tags from this pass.
//!
//! # Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//! use elfscope::analysis::InstructionTagger;
//! use elfscope::arch::{ArchSpec, Instruction, Mnemonic, Operand, Register};
//! use elfscope::image::Symbol;
//!
//! let symbols: BTreeMap<u64, Arc<Symbol>> = BTreeMap::new();
//! let tagger = InstructionTagger::new(ArchSpec::X86_LINUX, &symbols);
//!
//! let sequence = vec![
//!     Instruction::new(Some(0x8048100), 1, Mnemonic::Push,
//!         vec![Operand::Register(Register::Ebp)]),
//!     Instruction::new(Some(0x8048108), 1, Mnemonic::Ret, vec![]),
//! ];
//! let tagged = tagger.tag_sequence(sequence);
//!
//! assert!(tagged[0].tags.func_start);
//! assert!(tagged[1].tags.func_end);
//! ```

use crate::{
    arch::{ArchSpec, BaseRef, CallKind, Instruction, Mnemonic, Operand, Target},
    image::SymbolLookup,
};

/// Annotates decoded instruction sequences with control-flow and ABI hints.
///
/// Holds the architecture description and a borrowed symbol query; the
/// tagger itself is stateless across instructions, so one instance can tag
/// any number of sequences from the same image.
pub struct InstructionTagger<'a> {
    arch: ArchSpec,
    symbols: &'a dyn SymbolLookup,
}

impl<'a> InstructionTagger<'a> {
    /// Creates a tagger resolving addresses through the given symbol query.
    pub fn new(arch: ArchSpec, symbols: &'a dyn SymbolLookup) -> Self {
        Self { arch, symbols }
    }

    /// Tags every instruction of the sequence in order and returns it.
    ///
    /// The sequence is consumed and handed back so canonicalized operands
    /// never alias the decoder's buffers.
    pub fn tag_sequence(&self, mut sequence: Vec<Instruction>) -> Vec<Instruction> {
        for instruction in &mut sequence {
            self.tag_instruction(instruction);
        }
        sequence
    }

    /// Classifies one instruction in place.
    pub fn tag_instruction(&self, i: &mut Instruction) {
        match i.mnemonic {
            Mnemonic::Ret => {
                i.tags.func_end = true;
                return;
            }
            Mnemonic::Push | Mnemonic::Enter => {
                i.tags.func_stack = true;
                if i.operands.first().and_then(Operand::as_register) == Some(self.arch.frame_base)
                {
                    i.tags.func_start = true;
                    return;
                }
            }
            Mnemonic::Pop | Mnemonic::Leave => {
                i.tags.func_unstack = true;
                if i.operands.first().and_then(Operand::as_register) == Some(self.arch.frame_base)
                {
                    i.tags.func_end = true;
                    return;
                }
            }
            Mnemonic::Call | Mnemonic::Jmp | Mnemonic::Jcc => {
                if i.mnemonic == Mnemonic::Call {
                    i.tags.call = Some(CallKind::Genuine);
                    i.tags.return_to = i.end_address();
                } else {
                    i.tags.goto = true;
                    if i.mnemonic == Mnemonic::Jcc {
                        i.tags.condition = i.condition;
                    }
                }
                if self.tag_relative_target(i) {
                    return;
                }
            }
            Mnemonic::Other => {}
        }

        self.scan_operands(i);
    }

    /// Resolves an instruction-relative immediate target, records it, and
    /// flags fake calls. Returns true when a target was recorded, which ends
    /// classification for the instruction.
    fn tag_relative_target(&self, i: &mut Instruction) -> bool {
        let (Some(address), Some(&Operand::Immediate(displacement))) =
            (i.address, i.operands.first())
        else {
            return false;
        };

        let target = (address as i64)
            .wrapping_add(displacement)
            .wrapping_add(i.length as i64) as u64
            & self.arch.word_mask();

        if i.tags.call.is_some() && i.tags.return_to == Some(target) {
            // CALL to its own fall-through: pushes an address, invokes nothing
            i.tags.call = Some(CallKind::Fake);
        }

        i.tags.target = Some(match self.symbols.lookup(target) {
            Some(symbol) => Target::Symbol(symbol),
            None => Target::Address(target),
        });
        true
    }

    /// Generic operand scan: frame-relative accesses, resolvable constant
    /// bases (GOT slots, globals), and address-of-global immediates.
    fn scan_operands(&self, i: &mut Instruction) {
        for index in 0..i.operands.len() {
            match i.operands[index].clone() {
                Operand::Memory(mem) => match &mem.base {
                    BaseRef::Register(reg) if *reg == self.arch.frame_base => {
                        if mem.displacement < 0 {
                            i.tags.uses_variable = true;
                        } else if mem.displacement >= self.arch.frame_arg_floor {
                            i.tags.uses_argument = true;
                        }
                    }
                    BaseRef::Constant(base) => {
                        let address =
                            (*base as i64).wrapping_add(mem.displacement) as u64
                                & self.arch.word_mask();
                        if let Some(symbol) = self.symbols.lookup(address) {
                            i.operands[index] = Operand::Memory(mem.canonicalized(symbol));
                            if i.mnemonic == Mnemonic::Jmp {
                                // single-instruction thunk through a resolved slot:
                                // its own entry and its own exit
                                i.tags.func_start = true;
                                i.tags.func_end = true;
                            }
                        }
                    }
                    BaseRef::Symbol(_) => {
                        // already canonical; keep thunk tags stable on re-tagging
                        if i.mnemonic == Mnemonic::Jmp {
                            i.tags.func_start = true;
                            i.tags.func_end = true;
                        }
                    }
                    BaseRef::Register(_) => {}
                },
                Operand::Immediate(value) => {
                    let address = value as u64 & self.arch.word_mask();
                    if let Some(symbol) = self.symbols.lookup(address) {
                        i.tags.imm_ref = Some(symbol);
                    }
                }
                Operand::Register(_) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use super::*;
    use crate::arch::{Condition, InstructionTags, MemoryRef, Register};
    use crate::image::{Symbol, SymbolKind};

    fn symbol(name: &str, address: u64) -> Arc<Symbol> {
        Arc::new(Symbol {
            name: name.to_string(),
            address,
            kind: SymbolKind::Function,
        })
    }

    fn symbol_map(entries: &[(&str, u64)]) -> BTreeMap<u64, Arc<Symbol>> {
        entries
            .iter()
            .map(|(name, addr)| (*addr, symbol(name, *addr)))
            .collect()
    }

    fn tag_one(symbols: &BTreeMap<u64, Arc<Symbol>>, i: Instruction) -> Instruction {
        let tagger = InstructionTagger::new(ArchSpec::X86_LINUX, symbols);
        let mut tagged = tagger.tag_sequence(vec![i]);
        tagged.pop().unwrap()
    }

    #[test]
    fn test_ret_is_function_end() {
        let symbols = BTreeMap::new();
        let ret = tag_one(
            &symbols,
            Instruction::new(Some(0x1000), 1, Mnemonic::Ret, vec![]),
        );
        assert!(ret.tags.func_end);
        assert_eq!(
            ret.tags,
            InstructionTags {
                func_end: true,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_push_frame_base_starts_function() {
        let symbols = BTreeMap::new();
        let push = tag_one(
            &symbols,
            Instruction::new(
                Some(0x1000),
                1,
                Mnemonic::Push,
                vec![Operand::Register(Register::Ebp)],
            ),
        );
        assert!(push.tags.func_stack);
        assert!(push.tags.func_start);
        assert!(!push.tags.func_end);
    }

    #[test]
    fn test_pop_frame_base_ends_function() {
        let symbols = BTreeMap::new();
        let pop = tag_one(
            &symbols,
            Instruction::new(
                Some(0x1000),
                1,
                Mnemonic::Pop,
                vec![Operand::Register(Register::Ebp)],
            ),
        );
        assert!(pop.tags.func_unstack);
        assert!(pop.tags.func_end);
        assert!(!pop.tags.func_start);
    }

    #[test]
    fn test_push_other_register_only_grows_stack() {
        let symbols = BTreeMap::new();
        let push = tag_one(
            &symbols,
            Instruction::new(
                Some(0x1000),
                1,
                Mnemonic::Push,
                vec![Operand::Register(Register::Esi)],
            ),
        );
        assert!(push.tags.func_stack);
        assert!(!push.tags.func_start);
    }

    #[test]
    fn test_leave_tags_unstack() {
        let symbols = BTreeMap::new();
        let leave = tag_one(
            &symbols,
            Instruction::new(Some(0x1000), 1, Mnemonic::Leave, vec![]),
        );
        assert!(leave.tags.func_unstack);
        assert!(!leave.tags.func_end);
    }

    #[test]
    fn test_call_records_return_address_and_target() {
        let symbols = symbol_map(&[("helper", 0x1100)]);
        // call rel32 at 0x1000, length 5, displacement 0xFB -> target 0x1100
        let call = tag_one(
            &symbols,
            Instruction::new(
                Some(0x1000),
                5,
                Mnemonic::Call,
                vec![Operand::Immediate(0xFB)],
            ),
        );
        assert_eq!(call.tags.call, Some(CallKind::Genuine));
        assert_eq!(call.tags.return_to, Some(0x1005));
        match call.tags.target {
            Some(Target::Symbol(ref s)) => assert_eq!(s.name, "helper"),
            ref other => panic!("expected resolved target, got {other:?}"),
        }
    }

    #[test]
    fn test_call_unresolved_target_keeps_raw_address() {
        let symbols = BTreeMap::new();
        let call = tag_one(
            &symbols,
            Instruction::new(
                Some(0x1000),
                5,
                Mnemonic::Call,
                vec![Operand::Immediate(0xFB)],
            ),
        );
        assert_eq!(call.tags.target, Some(Target::Address(0x1100)));
    }

    #[test]
    fn test_call_to_own_fall_through_is_fake() {
        let symbols = BTreeMap::new();
        // call rel32 with displacement 0: target == return address (0x1005)
        let call = tag_one(
            &symbols,
            Instruction::new(
                Some(0x1000),
                5,
                Mnemonic::Call,
                vec![Operand::Immediate(0)],
            ),
        );
        assert_eq!(call.tags.call, Some(CallKind::Fake));
        // target and return address stay recorded for downstream consumers
        assert_eq!(call.tags.target, Some(Target::Address(0x1005)));
        assert_eq!(call.tags.return_to, Some(0x1005));
    }

    #[test]
    fn test_backward_jump_with_negative_displacement() {
        let symbols = BTreeMap::new();
        let jmp = tag_one(
            &symbols,
            Instruction::new(
                Some(0x1000),
                2,
                Mnemonic::Jmp,
                vec![Operand::Immediate(-0x12)],
            ),
        );
        assert!(jmp.tags.goto);
        assert_eq!(jmp.tags.target, Some(Target::Address(0xFF0)));
    }

    #[test]
    fn test_conditional_jump_records_condition() {
        let symbols = BTreeMap::new();
        let jcc = tag_one(
            &symbols,
            Instruction::new(
                Some(0x1000),
                2,
                Mnemonic::Jcc,
                vec![Operand::Immediate(0x10)],
            )
            .with_condition(Condition::Ne),
        );
        assert!(jcc.tags.goto);
        assert_eq!(jcc.tags.condition, Some(Condition::Ne));
        assert_eq!(jcc.tags.target, Some(Target::Address(0x1012)));
        assert!(jcc.tags.call.is_none());
    }

    #[test]
    fn test_unknown_address_skips_target_resolution() {
        let symbols = symbol_map(&[("helper", 0x1100)]);
        let call = tag_one(
            &symbols,
            Instruction::new(None, 5, Mnemonic::Call, vec![Operand::Immediate(0xFB)]),
        );
        assert_eq!(call.tags.call, Some(CallKind::Genuine));
        assert_eq!(call.tags.return_to, None);
        assert_eq!(call.tags.target, None);
    }

    #[test]
    fn test_frame_displacements_classify_arguments_and_variables() {
        let symbols = BTreeMap::new();

        let arg = tag_one(
            &symbols,
            Instruction::new(
                Some(0x1000),
                3,
                Mnemonic::Other,
                vec![Operand::Memory(MemoryRef::base_disp(Register::Ebp, 8, 4))],
            ),
        );
        assert!(arg.tags.uses_argument);
        assert!(!arg.tags.uses_variable);

        let var = tag_one(
            &symbols,
            Instruction::new(
                Some(0x1003),
                3,
                Mnemonic::Other,
                vec![Operand::Memory(MemoryRef::base_disp(Register::Ebp, -4, 4))],
            ),
        );
        assert!(var.tags.uses_variable);
        assert!(!var.tags.uses_argument);

        // saved frame pointer / return address slots are neither
        let saved = tag_one(
            &symbols,
            Instruction::new(
                Some(0x1006),
                3,
                Mnemonic::Other,
                vec![Operand::Memory(MemoryRef::base_disp(Register::Ebp, 4, 4))],
            ),
        );
        assert!(!saved.tags.uses_argument);
        assert!(!saved.tags.uses_variable);
    }

    #[test]
    fn test_plt_style_jump_is_thunk() {
        let symbols = symbol_map(&[("printf", 0x8049FF4)]);
        let jmp = tag_one(
            &symbols,
            Instruction::new(
                Some(0x8048300),
                6,
                Mnemonic::Jmp,
                vec![Operand::Memory(MemoryRef::absolute(0x8049FF4, 0, 4))],
            ),
        );

        assert!(jmp.tags.func_start);
        assert!(jmp.tags.func_end);
        let mem = jmp.operands[0].as_memory().unwrap();
        assert_eq!(mem.displacement, 0);
        match &mem.base {
            BaseRef::Symbol(s) => assert_eq!(s.name, "printf"),
            other => panic!("expected canonicalized base, got {other:?}"),
        }
    }

    #[test]
    fn test_constant_base_resolution_folds_displacement() {
        let symbols = symbol_map(&[("table", 0x8049F00)]);
        // base + displacement together hit the symbol
        let load = tag_one(
            &symbols,
            Instruction::new(
                Some(0x1000),
                6,
                Mnemonic::Other,
                vec![Operand::Memory(MemoryRef::absolute(0x8049EF0, 0x10, 4))],
            ),
        );
        let mem = load.operands[0].as_memory().unwrap();
        assert!(matches!(&mem.base, BaseRef::Symbol(s) if s.name == "table"));
        assert_eq!(mem.displacement, 0);
        // not a jump, so no thunk tags
        assert!(!load.tags.func_start);
        assert!(!load.tags.func_end);
    }

    #[test]
    fn test_unresolvable_constant_base_is_left_alone() {
        let symbols = BTreeMap::new();
        let load = tag_one(
            &symbols,
            Instruction::new(
                Some(0x1000),
                6,
                Mnemonic::Other,
                vec![Operand::Memory(MemoryRef::absolute(0xDEAD0000, 0, 4))],
            ),
        );
        let mem = load.operands[0].as_memory().unwrap();
        assert_eq!(mem.base, BaseRef::Constant(0xDEAD0000));
    }

    #[test]
    fn test_immediate_reference_to_global() {
        let symbols = symbol_map(&[("message", 0x8049100)]);
        let push = tag_one(
            &symbols,
            Instruction::new(
                Some(0x1000),
                5,
                Mnemonic::Push,
                vec![Operand::Immediate(0x8049100)],
            ),
        );
        assert!(push.tags.func_stack);
        assert_eq!(push.tags.imm_ref.as_ref().unwrap().name, "message");
    }

    #[test]
    fn test_tagging_is_idempotent() {
        let symbols = symbol_map(&[("printf", 0x8049FF4), ("helper", 0x1100)]);
        let sequence = vec![
            Instruction::new(
                Some(0x1000),
                1,
                Mnemonic::Push,
                vec![Operand::Register(Register::Ebp)],
            ),
            Instruction::new(
                Some(0x1001),
                5,
                Mnemonic::Call,
                vec![Operand::Immediate(0xFA)],
            ),
            Instruction::new(
                Some(0x1006),
                6,
                Mnemonic::Jmp,
                vec![Operand::Memory(MemoryRef::absolute(0x8049FF4, 0, 4))],
            ),
            Instruction::new(
                Some(0x100C),
                5,
                Mnemonic::Call,
                vec![Operand::Immediate(0)],
            ),
            Instruction::new(Some(0x1011), 1, Mnemonic::Ret, vec![]),
        ];

        let tagger = InstructionTagger::new(ArchSpec::X86_LINUX, &symbols);
        let once = tagger.tag_sequence(sequence);
        let twice = tagger.tag_sequence(once.clone());
        assert_eq!(once, twice);
    }
}
