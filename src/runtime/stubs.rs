//! Library-entry stub handlers for environment emulation.
//!
//! When symbolic execution reaches a call into unresolved library code, the
//! engine looks the entry's name up in a [`StubRegistry`] and applies the
//! matching handler to the state instead of executing library bytes it does
//! not have. Each handler's effect is fixed and small:
//!
//! | entry | effect on the state |
//! |---|---|
//! | *(default)* | `ip <- [sp]`, `sp <- sp + word` (return through the pushed address) |
//! | `__libc_start_main` | `ip <- [sp + word]` (the main argument), then push `External("exit")` |
//! | `exit`, `abort` | `ip <- Top` (execution leaves the modeled world) |
//! | `__assert`, `__assert_fail`, `_assert_perror_fail` | `ip <- Top` |
//!
//! Offsets are expressed against the register values at handler entry.

use std::collections::HashMap;

use crate::{
    arch::ArchSpec,
    symbolic::{Location, MemLoc, SymbolicState, SymbolicValue},
};

/// Effect of one library-entry stub on a symbolic state.
pub type StubFn = fn(&mut SymbolicState, &ArchSpec);

/// Registry of named library-entry handlers.
///
/// # Example
///
/// ```rust
/// use elfscope::arch::{ArchSpec, Register};
/// use elfscope::runtime::StubRegistry;
/// use elfscope::symbolic::{SymbolicState, SymbolicValue};
///
/// let arch = ArchSpec::X86_LINUX;
/// let stubs = StubRegistry::linux_x86();
///
/// let mut state = SymbolicState::new();
/// stubs.apply("exit", &mut state, &arch);
/// assert_eq!(state.register(Register::Eip), SymbolicValue::top(32));
/// ```
pub struct StubRegistry {
    handlers: HashMap<&'static str, StubFn>,
    default: StubFn,
}

impl StubRegistry {
    /// The handler set for x86/32-bit Linux C runtimes.
    pub fn linux_x86() -> Self {
        let mut handlers: HashMap<&'static str, StubFn> = HashMap::new();
        handlers.insert("__libc_start_main", libc_start_main as StubFn);
        handlers.insert("exit", halt as StubFn);
        handlers.insert("abort", halt as StubFn);
        handlers.insert("__assert", halt as StubFn);
        handlers.insert("__assert_fail", halt as StubFn);
        handlers.insert("_assert_perror_fail", halt as StubFn);
        Self {
            handlers,
            default: return_pop,
        }
    }

    /// Handler for the named entry; unknown names get the default
    /// return-through-stack handler.
    pub fn get(&self, name: &str) -> StubFn {
        self.handlers.get(name).copied().unwrap_or(self.default)
    }

    /// Looks the entry up and applies its effect to the state.
    pub fn apply(&self, name: &str, state: &mut SymbolicState, arch: &ArchSpec) {
        self.get(name)(state, arch);
    }
}

/// Default stub: the callee immediately returns through the address on the
/// stack. `ip <- [sp]`, `sp <- sp + word`.
fn return_pop(state: &mut SymbolicState, arch: &ArchSpec) {
    let word = i64::from(arch.word_bytes);
    let top = state.read(Location::Memory(MemLoc::new(
        arch.stack_pointer,
        0,
        arch.word_bytes,
    )));
    state.write(Location::Register(arch.instruction_pointer), top);
    state.write(
        Location::Register(arch.stack_pointer),
        SymbolicValue::reg_offset(arch.stack_pointer, word),
    );
}

/// `__libc_start_main`: control continues at the main routine passed as the
/// first argument, with `exit` planted as its return target.
fn libc_start_main(state: &mut SymbolicState, arch: &ArchSpec) {
    let word = i64::from(arch.word_bytes);
    let main = state.read(Location::Memory(MemLoc::new(
        arch.stack_pointer,
        word,
        arch.word_bytes,
    )));
    state.write(Location::Register(arch.instruction_pointer), main);

    // push External("exit") as the return target of main
    state.write(
        Location::Memory(MemLoc::new(arch.stack_pointer, -word, arch.word_bytes)),
        SymbolicValue::external("exit", arch.word_bits()),
    );
    state.write(
        Location::Register(arch.stack_pointer),
        SymbolicValue::reg_offset(arch.stack_pointer, -word),
    );
}

/// Terminating entries: execution leaves the modeled world, the instruction
/// pointer becomes unbounded.
fn halt(state: &mut SymbolicState, arch: &ArchSpec) {
    state.write(
        Location::Register(arch.instruction_pointer),
        SymbolicValue::top(arch.word_bits()),
    );
}
