//! Binary-image abstraction consumed by the loader and the taggers.
//!
//! An image exposes exactly what the pipeline needs from the container
//! format: loadable segments, the dynamic-import table, entry points, and
//! address-keyed symbol and section lookup. [`ElfImage`] is the concrete
//! ELF32 adapter backed by the goblin parser; the rest of the crate only
//! consumes the query surface, so tests assemble images from parts without
//! going through a container at all.

use std::sync::Arc;

use bitflags::bitflags;

mod elf;

pub use elf::ElfImage;

bitflags! {
    /// Memory permissions of a loadable segment, mirroring ELF `p_flags`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SegmentFlags: u32 {
        /// Segment is executable (PF_X)
        const EXECUTE = 0x1;
        /// Segment is writable (PF_W)
        const WRITE = 0x2;
        /// Segment is readable (PF_R)
        const READ = 0x4;
    }
}

/// Kind of a symbol known to the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// Function entry point
    Function,
    /// Data object
    Object,
    /// Reference into unresolved library code
    Import,
}

/// A named address known to the image.
///
/// Symbols are shared by reference throughout the pipeline: the tagger
/// substitutes them into operands and targets, and function finalization
/// names PLT thunks after them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    /// Symbol name as found in the string table.
    pub name: String,
    /// Virtual address the symbol refers to.
    pub address: u64,
    /// Classification of what lives at that address.
    pub kind: SymbolKind,
}

/// A named section of the image, used to attribute functions to regions
/// such as `.text` or `.plt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Section name (e.g. `.text`).
    pub name: String,
    /// Virtual address where the section starts.
    pub address: u64,
    /// Size of the section in bytes.
    pub size: u64,
}

impl Section {
    /// Returns true if the address falls inside this section.
    #[inline]
    pub fn contains(&self, address: u64) -> bool {
        address >= self.address && address < self.address + self.size
    }
}

/// A loadable segment as reported by the container.
///
/// `bytes` already covers the full in-memory extent: file content followed by
/// the zero-filled tail when the memory size exceeds the file size. A segment
/// with an empty byte vector maps nothing and is skipped by the loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSegment {
    /// Destination virtual address.
    pub vaddr: u64,
    /// In-memory content of the segment.
    pub bytes: Vec<u8>,
    /// Memory permissions requested by the container.
    pub flags: SegmentFlags,
}

/// Address-to-symbol query used by the tagger to resolve control-transfer
/// targets and memory-operand bases.
///
/// Unresolvable addresses are not an error — the tagger keeps the raw value
/// and downstream consumers simply get less precision.
pub trait SymbolLookup {
    /// Resolves an absolute address to a known symbol, if any.
    fn lookup(&self, address: u64) -> Option<Arc<Symbol>>;
}

impl SymbolLookup for std::collections::BTreeMap<u64, Arc<Symbol>> {
    fn lookup(&self, address: u64) -> Option<Arc<Symbol>> {
        self.get(&address).cloned()
    }
}
