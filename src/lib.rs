// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]

//! # elfscope
//!
//! A framework for loading and analyzing x86/Linux ELF executables. `elfscope` places a
//! binary image into a modeled virtual address space, then recovers function boundaries,
//! call/jump targets, and stack-frame usage (arguments versus locals) purely from
//! instruction patterns and a lightweight symbolic view of each basic block — no
//! instruction emulation, no debug information required.
//!
//! ## Features
//!
//! - **ELF loading** - Maps loadable segments into a sparse, page-granular address space
//! - **Import modeling** - Dynamic imports become symbolic placeholders, so calls into
//!   unloaded libraries stay recognizable by name
//! - **Instruction tagging** - A single forward pass annotates decoded instructions with
//!   control-flow and calling-convention hints
//! - **Semantic confirmation** - Block-level symbolic states confirm prologue/epilogue/call
//!   idioms that syntax alone cannot prove
//! - **Function classification** - Entry discovery, PLT-thunk naming, call counting, and
//!   argument/local-variable recovery per function
//! - **Non-fatal analysis** - Structural anomalies become diagnostics, never aborts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use elfscope::prelude::*;
//! use std::path::Path;
//!
//! // Parse the binary and materialize it into an address space
//! let image = ElfImage::from_file(Path::new("target/program"))?;
//! let mut space = AddressSpace::new();
//! let loader = Loader::new(ArchSpec::X86_LINUX);
//! let state = loader.load(Some(&image), &mut space);
//!
//! println!("entry state: {:?}", state.register(Register::Eip));
//! # Ok::<(), elfscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! `elfscope` is organized as a strict pipeline; each stage enriches metadata attached by
//! the previous one and none revisits raw bytes:
//!
//! - [`image`] - ELF container adapter: segments, imports, entry points, symbols, sections
//! - [`memory`] - The modeled address space with external-reference overlay and zones
//! - [`loader`] - Image materialization and the process-start register state
//! - [`analysis`] - The three tagging stages (instruction, block, function) and the
//!   diagnostics stream
//! - [`arch`] - The x86-32 architecture description handed to every component
//! - [`symbolic`] - The symbolic-state vocabulary shared with the execution engine
//! - [`runtime`] - Library-entry stubs applied when execution would leave the image
//!
//! Analysis is single-threaded per binary image. Independent images (or independent
//! functions of one image, once their graphs are final) can be processed concurrently by
//! separate pipeline instances, provided no two instances share an address space or
//! mutate the same metadata.
//!
//! ## Error Handling
//!
//! Only container-level problems are errors; everything past loading is best-effort.
//! All fallible operations return [`Result<T, Error>`](Result):
//!
//! ```rust,no_run
//! use elfscope::{Error, image::ElfImage};
//!
//! match ElfImage::from_file(std::path::Path::new("target/program")) {
//!     Ok(image) => println!("loaded {}", image.name()),
//!     Err(Error::NotSupported) => println!("not a 32-bit x86 ELF"),
//!     Err(Error::Malformed { message, .. }) => println!("malformed: {}", message),
//!     Err(e) => println!("other error: {}", e),
//! }
//! ```

#[macro_use]
pub(crate) mod error;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use elfscope::prelude::*;
///
/// let image = ElfImage::from_file("target/program".as_ref())?;
/// # Ok::<(), elfscope::Error>(())
/// ```
pub mod prelude;

pub mod analysis;
pub mod arch;
pub mod image;
pub mod loader;
pub mod memory;
pub mod runtime;
pub mod symbolic;

pub use error::Error;

/// The result type used throughout elfscope.
pub type Result<T> = std::result::Result<T, Error>;
