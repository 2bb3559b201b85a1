//! Materializes a binary image into a modeled address space.
//!
//! The [`Loader`] runs once per image and produces the starting point every
//! later stage builds on: segment bytes written at their page-aligned
//! destinations, external-reference placeholders at dynamic-import
//! addresses, a guarded stack zone anchored to the stack-pointer register,
//! and the initial symbolic register state of a freshly `exec`'d process.
//!
//! An image that failed to parse upstream is handed in as `None`; loading
//! degrades to a no-op and the surrounding session is responsible for
//! reporting the absence. Nothing in this stage can fail.
//!
//! # Example
//!
//! ```rust
//! use elfscope::arch::ArchSpec;
//! use elfscope::loader::Loader;
//! use elfscope::memory::AddressSpace;
//!
//! let loader = Loader::new(ArchSpec::X86_LINUX);
//! let mut space = AddressSpace::new();
//!
//! // No image: nothing mapped, empty state, no error.
//! let state = loader.load(None, &mut space);
//! assert!(state.is_empty());
//! assert_eq!(space.page_count(), 0);
//! ```

use crate::{
    arch::{ArchSpec, Register},
    image::ElfImage,
    memory::{AddressSpace, ExternalRef, PAGE_SIZE},
    symbolic::{Location, SymbolicState, SymbolicValue},
};

/// Populates an [`AddressSpace`] from an [`ElfImage`] and builds the initial
/// machine-register state.
pub struct Loader {
    arch: ArchSpec,
    page_size: u64,
}

impl Loader {
    /// Creates a loader for the given architecture.
    pub fn new(arch: ArchSpec) -> Self {
        Self {
            arch,
            page_size: PAGE_SIZE,
        }
    }

    /// Loads the image into the address space and returns the initial
    /// symbolic state.
    ///
    /// - Every loadable segment is written at its page-aligned destination;
    ///   a segment with no bytes to map is skipped.
    /// - Every dynamic-import address receives an external-reference
    ///   placeholder of machine-word width.
    /// - One guarded stack zone is allocated, anchored to the stack-pointer
    ///   register.
    /// - The instruction pointer is set to the image's first declared entry
    ///   point and the remaining general-purpose registers to zero. Entry
    ///   points after index 0 are not modeled.
    ///
    /// When `image` is `None` (upstream parsing failed) this is a complete
    /// no-op: nothing is mapped and the returned state is empty.
    pub fn load(&self, image: Option<&ElfImage>, space: &mut AddressSpace) -> SymbolicState {
        let Some(image) = image else {
            return SymbolicState::new();
        };

        for segment in image.segments() {
            if segment.bytes.is_empty() {
                continue;
            }
            let destination = segment.vaddr & !(self.page_size - 1);
            let lead = (segment.vaddr - destination) as usize;

            let mut mapped = vec![0u8; lead];
            mapped.extend_from_slice(&segment.bytes);
            let padded = mapped.len().div_ceil(self.page_size as usize) * self.page_size as usize;
            mapped.resize(padded, 0);

            space.write(destination, &mapped);
        }

        for (address, symbol) in image.dynamic_imports() {
            space.write_external(
                *address,
                ExternalRef::new(symbol.name.clone(), self.arch.word_bits()),
            );
        }

        space.allocate_guarded_region(self.arch.stack_pointer);

        self.initial_state(image)
    }

    /// Process-start register state for a freshly `exec`'d binary.
    fn initial_state(&self, image: &ElfImage) -> SymbolicState {
        let mut state = SymbolicState::new();
        let width = self.arch.word_bits();

        if let Some(&entry) = image.entry_points().first() {
            state.write(
                Location::Register(self.arch.instruction_pointer),
                SymbolicValue::cst(entry & self.arch.word_mask(), width),
            );
        }
        for reg in Register::GENERAL {
            // the stack pointer is anchored to the stack zone, not zeroed
            if reg == self.arch.stack_pointer {
                continue;
            }
            state.write(Location::Register(reg), SymbolicValue::cst(0, width));
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use super::*;
    use crate::image::{LoadSegment, SegmentFlags, Symbol, SymbolKind};

    fn single_segment_image(vaddr: u64, bytes: Vec<u8>) -> ElfImage {
        ElfImage::from_parts(
            "test",
            vec![vaddr],
            vec![LoadSegment {
                vaddr,
                bytes,
                flags: SegmentFlags::READ | SegmentFlags::EXECUTE,
            }],
            BTreeMap::new(),
            BTreeMap::new(),
            Vec::new(),
        )
    }

    #[test]
    fn test_minimal_image_maps_segment_and_stack() {
        let code = vec![0x55, 0x89, 0xE5, 0xC3];
        let image = single_segment_image(0x8048000, code.clone());

        let mut space = AddressSpace::new();
        let loader = Loader::new(ArchSpec::X86_LINUX);
        loader.load(Some(&image), &mut space);

        assert_eq!(space.read(0x8048000, code.len()), Some(code));
        assert_eq!(space.zones().len(), 1);
        assert_eq!(space.zones()[0].anchor, Register::Esp);
    }

    #[test]
    fn test_unaligned_segment_lands_page_aligned() {
        let image = single_segment_image(0x8048010, vec![0xAA, 0xBB]);

        let mut space = AddressSpace::new();
        Loader::new(ArchSpec::X86_LINUX).load(Some(&image), &mut space);

        // destination page starts at the alignment boundary, content at +0x10
        assert!(space.is_mapped(0x8048000));
        assert_eq!(space.read(0x8048010, 2), Some(vec![0xAA, 0xBB]));
        assert_eq!(space.read(0x8048000, 2), Some(vec![0, 0]));
    }

    #[test]
    fn test_empty_segment_is_skipped() {
        let image = single_segment_image(0x8048000, Vec::new());

        let mut space = AddressSpace::new();
        Loader::new(ArchSpec::X86_LINUX).load(Some(&image), &mut space);

        assert_eq!(space.page_count(), 0);
    }

    #[test]
    fn test_import_placeholders() {
        let mut imports = BTreeMap::new();
        imports.insert(
            0x8049FF4,
            Arc::new(Symbol {
                name: "printf".to_string(),
                address: 0x8049FF4,
                kind: SymbolKind::Import,
            }),
        );
        let image = ElfImage::from_parts(
            "imports",
            vec![0x8048000],
            Vec::new(),
            imports,
            BTreeMap::new(),
            Vec::new(),
        );

        let mut space = AddressSpace::new();
        Loader::new(ArchSpec::X86_LINUX).load(Some(&image), &mut space);

        let ext = space.external_at(0x8049FF4).unwrap();
        assert_eq!(ext.name, "printf");
        assert_eq!(ext.width, 32);
    }

    #[test]
    fn test_initial_register_state() {
        let image = single_segment_image(0x8048000, vec![0xC3]);

        let mut space = AddressSpace::new();
        let state = Loader::new(ArchSpec::X86_LINUX).load(Some(&image), &mut space);

        assert_eq!(
            state.register(Register::Eip),
            SymbolicValue::cst(0x8048000, 32)
        );
        for reg in [
            Register::Eax,
            Register::Ebx,
            Register::Ecx,
            Register::Edx,
            Register::Esi,
            Register::Edi,
            Register::Ebp,
        ] {
            assert_eq!(state.register(reg), SymbolicValue::cst(0, 32));
        }
        // the stack pointer stays symbolic, anchored to the stack zone
        assert_eq!(
            state.register(Register::Esp),
            SymbolicValue::reg(Register::Esp)
        );
    }

    #[test]
    fn test_absent_image_is_noop() {
        let mut space = AddressSpace::new();
        let state = Loader::new(ArchSpec::X86_LINUX).load(None, &mut space);

        assert!(state.is_empty());
        assert_eq!(space.page_count(), 0);
        assert!(space.zones().is_empty());
    }
}
