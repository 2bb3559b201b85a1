use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Most of the analysis pipeline is deliberately non-fatal (structural anomalies become
/// [`crate::analysis::Diagnostics`] entries instead of errors); this enum covers the
/// conditions that genuinely prevent work from starting, which is almost always container
/// parsing.
///
/// # Error Categories
///
/// ## File Parsing Errors
/// - [`Error::Malformed`] - Corrupted or invalid file structure
/// - [`Error::NotSupported`] - Unsupported file format or architecture
/// - [`Error::Empty`] - Empty input provided
///
/// ## I/O and External Errors
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::GoblinErr`] - ELF parsing errors from the goblin crate
///
/// ## Analysis Errors
/// - [`Error::GraphError`] - Control-flow-graph construction error
///
/// # Examples
///
/// ```rust,no_run
/// use elfscope::{Error, image::ElfImage};
/// use std::path::Path;
///
/// match ElfImage::from_file(Path::new("target/program")) {
///     Ok(image) => {
///         println!("Loaded image with {} segments", image.segments().len());
///     }
///     Err(Error::NotSupported) => {
///         eprintln!("Not a 32-bit x86 ELF binary");
///     }
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed file: {} ({}:{})", message, file, line);
///     }
///     Err(e) => {
///         eprintln!("Other error: {}", e);
///     }
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The file is damaged and could not be parsed.
    ///
    /// This error indicates that the binary's structure is corrupted or does not conform
    /// to the ELF format. The error includes the source location where the malformation
    /// was detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// This file type is not supported.
    ///
    /// Indicates that the input is not an x86/32-bit Linux ELF executable. Other
    /// architectures and operating systems are handled by separate, structurally
    /// parallel loaders, not by this crate.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    ///
    /// This error occurs when an empty file or buffer is provided where actual
    /// ELF data was expected.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur during file operations such as
    /// reading from disk, permission issues, or filesystem errors.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Error from the goblin crate during ELF parsing.
    ///
    /// The goblin crate is used for low-level ELF container parsing. This error
    /// wraps any failures from that parsing layer.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),

    /// Control-flow-graph construction error.
    ///
    /// Emitted when a function graph is assembled with inconsistent node
    /// references (e.g., an edge naming a node that was never added).
    #[error("{0}")]
    GraphError(String),
}
