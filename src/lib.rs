//! # ide-repack
//!
//! Repackages a vendor-supplied IDE distribution (a gzip-compressed tar)
//! into a customized archive for a different CPU architecture: native
//! launcher binaries are substituted from a per-architecture zip bundle,
//! the product metadata file and launcher script are patched in place, and
//! an optional Java runtime bundle is spliced into the `jbr/` subtree.
//!
//! The transformation is a single sequential pass. Each input entry is
//! routed to a processor, the runtime splice, or a verbatim copy; at end
//! of scan the engine verifies that every required processor fired exactly
//! once and the runtime directory was observed, reporting every unmet
//! requirement at once. Every opened stream is registered in a
//! [`ResourceScope`] and released in reverse order on every exit path.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ide_repack::{repack, Arch, Product, ProcessorSpec, RepackRequest, Result};
//!
//! fn main() -> Result<()> {
//!     let summary = repack(RepackRequest {
//!         distribution: "ideaIC-2024.3-aarch64.tar.gz".into(),
//!         natives: "natives-linux-riscv64.zip".into(),
//!         runtime: Some("jbr-21.0.5-linux-riscv64.tar.gz".into()),
//!         output: "ideaIC-2024.3-riscv64.tar.gz".into(),
//!         base_arch: Arch::Aarch64,
//!         target_arch: Arch::Riscv64,
//!         product: Product::Community,
//!         processors: ProcessorSpec::defaults(),
//!     })?;
//!     println!("wrote {} entries", summary.total_written());
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`], an alias for
//! `std::result::Result<T, Error>`. Failures are terminal for the run;
//! completeness failures are reported only after the full pass so the
//! caller learns of every unmet requirement at once.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli` | Yes | The `ide-repack` command-line tool |

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod arch;
pub mod entry;
pub mod error;
pub mod extract;
pub mod natives;
pub mod patch;
pub mod processor;
pub mod product;
pub mod repack;
pub mod runtime;
pub mod scope;

pub use arch::Arch;
pub use error::{Error, Result};
pub use extract::{ExtractSummary, extract};
pub use natives::NativeBundle;
pub use patch::LinePatch;
pub use processor::{ProcessorSpec, ProcessorTable, Strategy};
pub use product::Product;
pub use repack::{RepackRequest, RepackSummary, Repacker, repack};
pub use runtime::splice_runtime;
pub use scope::{Closeable, ResourceScope, Shared};
