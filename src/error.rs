//! Error types for distribution repackaging.
//!
//! This module provides the [`Error`] enum which represents all possible
//! failure modes of a repack run, along with a convenient [`Result<T>`]
//! type alias.
//!
//! Every failure is terminal for the run: there is no partial success and no
//! automatic retry. Correcting the inputs requires re-running the whole
//! transformation.
//!
//! # Error Categories
//!
//! | Category | Variants | Typical Cause |
//! |----------|----------|---------------|
//! | I/O | [`Io`][Error::Io], [`Zip`][Error::Zip] | File system or archive container failures |
//! | Structure | [`InvalidRootEntry`][Error::InvalidRootEntry], [`InvalidRuntimeRoot`][Error::InvalidRuntimeRoot], [`ForeignEntry`][Error::ForeignEntry] | Malformed input archives |
//! | Content | [`MissingMarker`][Error::MissingMarker], [`DuplicateMarker`][Error::DuplicateMarker] | Patched file lacks or repeats a required marker |
//! | Lookup | [`NativeNotFound`][Error::NativeNotFound] | Named entry absent from the native bundle |
//! | Completeness | [`MissingEntries`][Error::MissingEntries], [`RuntimeNotFound`][Error::RuntimeNotFound] | Required work never happened; reported after the full pass |
//! | Teardown | [`ReleaseFailed`][Error::ReleaseFailed], [`Teardown`][Error::Teardown] | Resource release failures, never masking a primary error |

use std::io;

/// Helper struct for formatting MissingEntries error messages.
struct MissingEntriesDisplay<'a> {
    names: &'a [String],
    runtime_missing: bool,
}

impl std::fmt::Display for MissingEntriesDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "these files were not found: {}", self.names.join(", "))?;
        if self.runtime_missing {
            write!(f, "; additionally, no runtime directory was found")?;
        }
        Ok(())
    }
}

/// Helper struct for formatting Teardown error messages.
struct TeardownDisplay<'a> {
    primary: &'a Error,
    secondary: &'a [Error],
}

impl std::fmt::Display for TeardownDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.primary)?;
        if !self.secondary.is_empty() {
            write!(
                f,
                " ({} further error(s) while releasing resources:",
                self.secondary.len()
            )?;
            for e in self.secondary {
                write!(f, " [{}]", e)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// The main error type for repack operations.
///
/// Each variant carries enough context to name the offending entry, marker,
/// or resource in its message, so the caller learns exactly which
/// requirement was unmet.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred while reading or writing a stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The native bundle could not be read as a zip archive.
    #[error("native bundle error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The first entry of the distribution is missing or not a directory.
    ///
    /// The distribution must start with a single root directory whose name
    /// becomes the path prefix for all subsequent matching.
    #[error("invalid root entry: {}", name.as_deref().unwrap_or("<archive is empty>"))]
    InvalidRootEntry {
        /// Name of the offending first entry, or `None` for an empty archive.
        name: Option<String>,
    },

    /// The runtime bundle contains no entries at all.
    #[error("runtime bundle {bundle} is empty")]
    EmptyRuntime {
        /// Path of the runtime bundle file.
        bundle: String,
    },

    /// The runtime bundle's first entry does not define a usable root prefix.
    ///
    /// The first entry must be a directory whose name contains a `/`.
    #[error("invalid first entry in runtime bundle {bundle}: {name}")]
    InvalidRuntimeRoot {
        /// Path of the runtime bundle file.
        bundle: String,
        /// Name of the offending entry.
        name: String,
    },

    /// An archive entry falls outside the archive's root prefix.
    #[error("entry {name} in {archive} is outside its root {prefix}")]
    ForeignEntry {
        /// Display name of the archive.
        archive: String,
        /// Root prefix derived from the archive's first entry.
        prefix: String,
        /// Name of the offending entry.
        name: String,
    },

    /// A symbolic link entry carries no link target.
    #[error("symbolic link {path} has no target")]
    MissingLinkTarget {
        /// Path of the offending entry.
        path: String,
    },

    /// A link entry cannot be materialized on the file system.
    #[error("unable to handle link {path}")]
    LinkNotSupported {
        /// Path of the offending entry.
        path: String,
    },

    /// An entry matched a processor that already fired.
    ///
    /// Each processed path must occur exactly once in the distribution; a
    /// second occurrence means the input (or the processor table) is
    /// internally inconsistent.
    #[error("duplicate entry for already-processed path {path}")]
    DuplicateEntry {
        /// Path that matched twice.
        path: String,
    },

    /// A file selected for content patching is not valid UTF-8 text.
    #[error("cannot patch {path}: not valid UTF-8 text")]
    NotText {
        /// Path of the offending entry.
        path: String,
    },

    /// A required marker line was never found in a patched file.
    #[error("no marker {marker:?} found in {path}")]
    MissingMarker {
        /// Path of the patched entry.
        path: String,
        /// The marker that was expected.
        marker: String,
    },

    /// A required marker line occurred more than once in a patched file.
    #[error("duplicate marker in {path}: {line:?} on lines {first} and {second}")]
    DuplicateMarker {
        /// Path of the patched entry.
        path: String,
        /// Line number (1-based) of the first occurrence.
        first: usize,
        /// Line number (1-based) of the second occurrence.
        second: usize,
        /// The offending line.
        line: String,
    },

    /// A named entry is absent from the native bundle.
    #[error("missing {entry} in native bundle {bundle}")]
    NativeNotFound {
        /// Path of the native bundle file.
        bundle: String,
        /// Name of the entry that was looked up.
        entry: String,
    },

    /// One or more required processors never fired.
    ///
    /// Reported only after the full pass completes, so every unmet
    /// requirement is listed at once. When the runtime directory was also
    /// never observed, that axis is reported in the same message.
    #[error("{}", MissingEntriesDisplay { names: names.as_slice(), runtime_missing: *runtime_missing })]
    MissingEntries {
        /// Names of the processors that never fired, in registration order.
        names: Vec<String>,
        /// Whether the runtime directory was also never observed.
        runtime_missing: bool,
    },

    /// The runtime directory was never observed in the distribution.
    #[error("no runtime directory found in the distribution")]
    RuntimeNotFound,

    /// A single resource failed to release.
    #[error("failed to release {resource}: {source}")]
    ReleaseFailed {
        /// Label of the resource, as registered.
        resource: String,
        /// The underlying close failure.
        source: io::Error,
    },

    /// A primary failure with further errors collected during teardown.
    ///
    /// Secondary errors never mask the primary one; they are attached here
    /// so no close failure is silently discarded.
    #[error("{}", TeardownDisplay { primary: &**primary, secondary: secondary.as_slice() })]
    Teardown {
        /// The error that caused (or was promoted to) the failure.
        primary: Box<Error>,
        /// Close failures collected after the primary error.
        secondary: Vec<Error>,
    },

    /// An architecture identifier could not be parsed.
    #[error("unknown architecture: {value:?}")]
    UnknownArch {
        /// The rejected identifier.
        value: String,
    },

    /// A product identifier could not be parsed.
    #[error("unknown product: {value:?}")]
    UnknownProduct {
        /// The rejected identifier.
        value: String,
    },
}

/// A specialized `Result` type for repack operations.
pub type Result<T> = std::result::Result<T, Error>;
