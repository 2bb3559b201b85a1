//! ELF32 image adapter for the loader and tagging pipeline.
//!
//! [`ElfImage`] parses an x86/32-bit Linux ELF binary with the `goblin` crate
//! and eagerly copies out everything the pipeline consumes: loadable
//! segments, the dynamic-import table, entry points, and an address-keyed
//! symbol/section index. Parsing happens exactly once; afterwards the image
//! is a plain owned value with no references into the original buffer.
//!
//! # Import handling
//!
//! Dynamic relocations of kind `R_386_JMP_SLOT` (PLT slots) and
//! `R_386_GLOB_DAT` (GOT data slots) are joined with the dynamic symbol
//! table to produce the import map: slot address to imported name. Import
//! symbols are also merged into the general symbol index, so resolving a
//! `jmp *[got_slot]` base through [`SymbolLookup`] lands on the imported
//! routine's name.
//!
//! # Example
//!
//! ```rust,no_run
//! use elfscope::image::ElfImage;
//! use std::path::Path;
//!
//! let image = ElfImage::from_file(Path::new("/bin/true"))?;
//! println!(
//!     "{}: entry {:#x}, {} segments, {} imports",
//!     image.name(),
//!     image.entry_points()[0],
//!     image.segments().len(),
//!     image.dynamic_imports().len(),
//! );
//! # Ok::<(), elfscope::Error>(())
//! ```

use std::{collections::BTreeMap, path::Path, sync::Arc};

use goblin::elf::{header, program_header, reloc, section_header, sym, Elf};
use memmap2::Mmap;

use crate::{
    image::{LoadSegment, Section, SegmentFlags, Symbol, SymbolKind, SymbolLookup},
    Result,
};

/// An x86/32-bit Linux ELF executable, parsed and reduced to the queries the
/// analysis pipeline needs.
///
/// Construction goes through [`from_file`](Self::from_file) /
/// [`from_bytes`](Self::from_bytes) for real binaries, or
/// [`from_parts`](Self::from_parts) when the pieces are produced by another
/// container adapter (or a test).
#[derive(Debug, Clone)]
pub struct ElfImage {
    /// Name or label identifying this image (usually the file name).
    name: String,
    /// Declared entry points; only index 0 models process start.
    entry_points: Vec<u64>,
    /// Loadable segments in file order.
    segments: Vec<LoadSegment>,
    /// Dynamic-import table: slot address to imported symbol.
    imports: BTreeMap<u64, Arc<Symbol>>,
    /// Address-keyed index over functions, objects and imports.
    symbols: BTreeMap<u64, Arc<Symbol>>,
    /// Allocated sections in file order.
    sections: Vec<Section>,
}

impl ElfImage {
    /// Parses an ELF image from a byte buffer.
    ///
    /// # Arguments
    ///
    /// * `bytes` - The raw bytes of the ELF file
    /// * `name` - A name/label for the image (used in diagnostics)
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Empty`] for an empty buffer,
    /// [`crate::Error::NotSupported`] when the binary is not 32-bit x86, a
    /// [`crate::Error::Malformed`] when a segment extends beyond the file,
    /// and [`crate::Error::GoblinErr`] for container-level parse failures.
    pub fn from_bytes(bytes: &[u8], name: impl Into<String>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(crate::Error::Empty);
        }

        let elf = Elf::parse(bytes)?;
        if elf.is_64 || elf.header.e_machine != header::EM_386 {
            return Err(crate::Error::NotSupported);
        }

        let mut segments = Vec::new();
        for ph in &elf.program_headers {
            if ph.p_type != program_header::PT_LOAD {
                continue;
            }

            let offset = ph.p_offset as usize;
            let filesz = ph.p_filesz as usize;
            let memsz = ph.p_memsz as usize;
            let end = offset.checked_add(filesz).ok_or_else(|| {
                malformed_error!("segment at {:#x} has overflowing file extent", ph.p_vaddr)
            })?;
            if end > bytes.len() {
                return Err(malformed_error!(
                    "segment at {:#x} extends beyond the file ({} > {})",
                    ph.p_vaddr,
                    end,
                    bytes.len()
                ));
            }

            let mut data = bytes[offset..end].to_vec();
            if memsz > filesz {
                // zero-filled tail (bss)
                data.resize(memsz, 0);
            }

            segments.push(LoadSegment {
                vaddr: ph.p_vaddr,
                bytes: data,
                flags: SegmentFlags::from_bits_truncate(ph.p_flags),
            });
        }

        // Merge function and object symbols into one address-keyed index.
        let mut symbols = BTreeMap::new();
        for s in elf.syms.iter() {
            if s.st_value == 0 {
                continue;
            }
            let kind = match s.st_type() {
                sym::STT_FUNC => SymbolKind::Function,
                sym::STT_OBJECT => SymbolKind::Object,
                _ => continue,
            };
            let Some(name) = elf.strtab.get_at(s.st_name) else {
                continue;
            };
            if name.is_empty() {
                continue;
            }
            symbols.insert(
                s.st_value,
                Arc::new(Symbol {
                    name: name.to_string(),
                    address: s.st_value,
                    kind,
                }),
            );
        }

        // Dynamic imports: PLT and GOT slots joined with the dynamic symbols.
        let mut imports = BTreeMap::new();
        for r in elf
            .pltrelocs
            .iter()
            .chain(elf.dynrels.iter())
            .chain(elf.dynrelas.iter())
        {
            if r.r_type != reloc::R_386_JMP_SLOT && r.r_type != reloc::R_386_GLOB_DAT {
                continue;
            }
            let Some(s) = elf.dynsyms.get(r.r_sym) else {
                continue;
            };
            let Some(name) = elf.dynstrtab.get_at(s.st_name) else {
                continue;
            };
            if name.is_empty() {
                continue;
            }
            let symbol = Arc::new(Symbol {
                name: name.to_string(),
                address: r.r_offset,
                kind: SymbolKind::Import,
            });
            imports.insert(r.r_offset, symbol.clone());
            symbols.entry(r.r_offset).or_insert(symbol);
        }

        let mut sections = Vec::new();
        for sh in &elf.section_headers {
            if sh.sh_flags & u64::from(section_header::SHF_ALLOC) == 0 {
                continue;
            }
            let Some(name) = elf.shdr_strtab.get_at(sh.sh_name) else {
                continue;
            };
            sections.push(Section {
                name: name.to_string(),
                address: sh.sh_addr,
                size: sh.sh_size,
            });
        }

        Ok(Self {
            name: name.into(),
            entry_points: vec![elf.entry],
            segments,
            imports,
            symbols,
            sections,
        })
    }

    /// Parses an ELF image from a file path.
    ///
    /// The file is memory-mapped for parsing; the resulting image owns all of
    /// its data, so the mapping is dropped before this function returns. The
    /// file name (without directory) becomes the image name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FileError`] when the file cannot be opened or
    /// mapped, plus everything [`from_bytes`](Self::from_bytes) can return.
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        Self::from_bytes(&mmap, name)
    }

    /// Assembles an image from already-extracted pieces.
    ///
    /// Useful for containers parsed elsewhere and for tests that want precise
    /// control over segments, imports, symbols and sections.
    pub fn from_parts(
        name: impl Into<String>,
        entry_points: Vec<u64>,
        segments: Vec<LoadSegment>,
        imports: BTreeMap<u64, Arc<Symbol>>,
        mut symbols: BTreeMap<u64, Arc<Symbol>>,
        sections: Vec<Section>,
    ) -> Self {
        for (addr, symbol) in &imports {
            symbols.entry(*addr).or_insert_with(|| symbol.clone());
        }
        Self {
            name: name.into(),
            entry_points,
            segments,
            imports,
            symbols,
            sections,
        }
    }

    /// Name or label identifying this image.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared entry points, in declaration order.
    ///
    /// Only index 0 models process start; additional entries are reported but
    /// not otherwise interpreted.
    pub fn entry_points(&self) -> &[u64] {
        &self.entry_points
    }

    /// Loadable segments in file order.
    pub fn segments(&self) -> &[LoadSegment] {
        &self.segments
    }

    /// Dynamic-import table: slot address to imported symbol.
    pub fn dynamic_imports(&self) -> &BTreeMap<u64, Arc<Symbol>> {
        &self.imports
    }

    /// Resolves an address to a known function, object or import symbol.
    pub fn symbol_at(&self, address: u64) -> Option<&Arc<Symbol>> {
        self.symbols.get(&address)
    }

    /// Finds the allocated section containing an address.
    pub fn section_at(&self, address: u64) -> Option<&Section> {
        self.sections.iter().find(|s| s.contains(address))
    }
}

impl SymbolLookup for ElfImage {
    fn lookup(&self, address: u64) -> Option<Arc<Symbol>> {
        self.symbol_at(address).cloned()
    }
}
