//! x86-32 register set and architecture description.
//!
//! The [`ArchSpec`] struct is the single source of ABI facts for the pipeline:
//! which register anchors stack frames, which one is the stack pointer, how
//! wide a machine word is, and where the argument area begins relative to each
//! of them. Every pipeline component receives an `ArchSpec` instead of
//! reaching for well-known registers by name, so the classification rules stay
//! in one place.

use strum::Display;

/// x86-32 machine register referenced by the analysis core.
///
/// Only the registers the loader and taggers actually reason about are listed:
/// the eight general-purpose registers plus the instruction pointer. Segment
/// and flag registers never appear in the heuristics and are left to the
/// decoder's own representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Register {
    /// Accumulator register (EAX)
    Eax,
    /// Counter register (ECX)
    Ecx,
    /// Data register (EDX)
    Edx,
    /// Base register (EBX)
    Ebx,
    /// Stack pointer (ESP)
    Esp,
    /// Frame base pointer (EBP)
    Ebp,
    /// Source index (ESI)
    Esi,
    /// Destination index (EDI)
    Edi,
    /// Instruction pointer (EIP)
    Eip,
}

impl Register {
    /// The eight general-purpose registers, in encoding order.
    pub const GENERAL: [Register; 8] = [
        Register::Eax,
        Register::Ecx,
        Register::Edx,
        Register::Ebx,
        Register::Esp,
        Register::Ebp,
        Register::Esi,
        Register::Edi,
    ];

    /// Returns true if this is the stack pointer register.
    #[inline]
    pub fn is_stack_pointer(&self) -> bool {
        matches!(self, Register::Esp)
    }

    /// Returns true if this is the frame base pointer register.
    #[inline]
    pub fn is_frame_base(&self) -> bool {
        matches!(self, Register::Ebp)
    }
}

/// Architecture description handed to every pipeline component.
///
/// Carries the registers the calling convention gives special meaning to and
/// the displacement thresholds that separate arguments from saved state and
/// locals. The thresholds are ABI facts, not tunables:
///
/// - relative to the frame base after the prologue, `[ebp+4]` holds the return
///   address and `[ebp+0]` the saved frame pointer, so the caller's arguments
///   begin at displacement 8 ([`frame_arg_floor`](Self::frame_arg_floor));
/// - relative to the stack pointer at function entry, `[esp+0]` holds the
///   return address, so arguments begin at displacement 4
///   ([`stack_arg_floor`](Self::stack_arg_floor));
/// - locals live below the entry stack pointer, at negative displacements.
///
/// # Example
///
/// ```rust
/// use elfscope::arch::{ArchSpec, Register};
///
/// let arch = ArchSpec::X86_LINUX;
/// assert_eq!(arch.frame_base, Register::Ebp);
/// assert_eq!(arch.word_bits(), 32);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchSpec {
    /// Register conventionally holding the current stack frame's base address.
    pub frame_base: Register,
    /// Register holding the top of the stack.
    pub stack_pointer: Register,
    /// Register holding the address of the next instruction.
    pub instruction_pointer: Register,
    /// Machine word width in bytes.
    pub word_bytes: u8,
    /// Smallest frame-base-relative displacement belonging to the argument area.
    pub frame_arg_floor: i64,
    /// Smallest entry-stack-pointer-relative displacement belonging to the argument area.
    pub stack_arg_floor: i64,
}

impl ArchSpec {
    /// The x86/32-bit Linux ABI this crate ships support for.
    pub const X86_LINUX: ArchSpec = ArchSpec {
        frame_base: Register::Ebp,
        stack_pointer: Register::Esp,
        instruction_pointer: Register::Eip,
        word_bytes: 4,
        frame_arg_floor: 8,
        stack_arg_floor: 4,
    };

    /// Machine word width in bits.
    #[inline]
    pub const fn word_bits(&self) -> u8 {
        self.word_bytes * 8
    }

    /// Bit mask covering one machine word, for wrapping address arithmetic.
    #[inline]
    pub const fn word_mask(&self) -> u64 {
        u64::MAX >> (64 - self.word_bytes as u32 * 8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_predicates() {
        assert!(Register::Esp.is_stack_pointer());
        assert!(!Register::Ebp.is_stack_pointer());
        assert!(Register::Ebp.is_frame_base());
        assert!(!Register::Eax.is_frame_base());
    }

    #[test]
    fn test_register_display() {
        assert_eq!(Register::Eax.to_string(), "eax");
        assert_eq!(Register::Esp.to_string(), "esp");
        assert_eq!(Register::Eip.to_string(), "eip");
    }

    #[test]
    fn test_arch_spec_widths() {
        let arch = ArchSpec::X86_LINUX;
        assert_eq!(arch.word_bits(), 32);
        assert_eq!(arch.word_mask(), 0xFFFF_FFFF);
    }

    #[test]
    fn test_arch_spec_thresholds() {
        let arch = ArchSpec::X86_LINUX;
        assert_eq!(arch.frame_arg_floor, 8);
        assert_eq!(arch.stack_arg_floor, 4);
    }
}
