//! The repack engine: stream setup, entry dispatch, and verification.
//!
//! A [`Repacker`] owns one set of inputs for one run. Setup opens the
//! native bundle, the distribution, and the output in that order, each
//! registered with the run's [`ResourceScope`] at its acquisition site.
//! The dispatch loop then routes every distribution entry to a processor,
//! the runtime splice, a symlink copy, or a verbatim copy; at end of scan
//! the completeness checks report every unmet requirement at once. The
//! scope releases all streams in reverse order on every exit path.

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::arch::Arch;
use crate::entry::{append_entry, append_symlink};
use crate::natives::NativeBundle;
use crate::processor::{ProcessorSpec, ProcessorTable, Strategy};
use crate::product::Product;
use crate::runtime::splice_runtime;
use crate::scope::{ResourceScope, Shared};
use crate::{Error, Result};

/// Inputs and configuration for one repack run.
#[derive(Debug, Clone)]
pub struct RepackRequest {
    /// The vendor distribution: a gzip-compressed tar whose first entry is
    /// the root directory.
    pub distribution: PathBuf,
    /// The native bundle: a zip of binaries built for the target
    /// architecture.
    pub natives: PathBuf,
    /// The runtime bundle: a gzip-compressed tar spliced under the runtime
    /// directory. Absence is legal and produces a warning.
    pub runtime: Option<PathBuf>,
    /// The output archive to create (truncated if it exists).
    pub output: PathBuf,
    /// Architecture the vendor distribution was built for.
    pub base_arch: Arch,
    /// Architecture the output is repackaged for.
    pub target_arch: Arch,
    /// Product variant; gates which processors are required.
    pub product: Product,
    /// Processor descriptors for this run; [`ProcessorSpec::defaults`] for
    /// a stock run.
    pub processors: Vec<ProcessorSpec>,
}

/// Per-run counters, reported on success.
#[must_use = "the summary reports how many entries were actually rewritten"]
#[derive(Debug, Clone, Copy, Default)]
pub struct RepackSummary {
    /// Entries copied through unchanged (symlinks included).
    pub copied: usize,
    /// Entries rewritten by a content patch.
    pub patched: usize,
    /// Entries replaced from the native bundle.
    pub replaced: usize,
    /// Entries written by the runtime splice.
    pub runtime_entries: usize,
    /// Runtime-subtree children dropped from the distribution.
    pub skipped: usize,
}

impl RepackSummary {
    /// Total number of entries written to the output.
    pub fn total_written(&self) -> usize {
        self.copied + self.patched + self.replaced + self.runtime_entries
    }
}

type InputReader = Shared<GzDecoder<Shared<File>>>;
type OutputWriter = Shared<GzEncoder<Shared<File>>>;

/// One run of the transformation engine.
///
/// Exactly one engine instance operates on one set of inputs at a time;
/// every opened handle is exclusively owned by the instance's scope.
pub struct Repacker {
    request: RepackRequest,
    scope: ResourceScope,
    natives: Shared<NativeBundle<File>>,
    input: tar::Archive<InputReader>,
    output: Shared<tar::Builder<OutputWriter>>,
}

impl Repacker {
    /// Opens all streams for the run.
    ///
    /// On failure, everything opened so far is closed in reverse order and
    /// the original error propagates with any close failures attached.
    pub fn open(request: RepackRequest) -> Result<Self> {
        let mut scope = ResourceScope::new();
        match Self::open_streams(&mut scope, &request) {
            Ok((natives, input, output)) => Ok(Repacker {
                request,
                scope,
                natives,
                input,
                output,
            }),
            Err(e) => Err(scope.abort(e)),
        }
    }

    #[allow(clippy::type_complexity)]
    fn open_streams(
        scope: &mut ResourceScope,
        request: &RepackRequest,
    ) -> Result<(
        Shared<NativeBundle<File>>,
        tar::Archive<InputReader>,
        Shared<tar::Builder<OutputWriter>>,
    )> {
        let natives = scope.register("native bundle", NativeBundle::open_path(&request.natives)?);

        let in_file = scope.register("distribution file", File::open(&request.distribution)?);
        let decoder = scope.register("distribution gzip reader", GzDecoder::new(in_file));
        let input = tar::Archive::new(decoder);

        let out_file = scope.register("output file", File::create(&request.output)?);
        let encoder = scope.register(
            "output gzip writer",
            GzEncoder::new(out_file, Compression::default()),
        );
        let output = scope.register("output tar writer", tar::Builder::new(encoder));

        Ok((natives, input, output))
    }

    /// Runs the transformation to completion and releases every resource.
    pub fn run(mut self) -> Result<RepackSummary> {
        let outcome = self.process();
        self.scope.finish(outcome)
    }

    fn process(&mut self) -> Result<RepackSummary> {
        let request = &self.request;
        let natives = self.natives.clone();
        let output = self.output.clone();

        log::info!(
            "repacking {} for {} (base {})",
            request.distribution.display(),
            request.target_arch,
            request.base_arch,
        );

        let mut entries = self.input.entries()?;

        // The root entry defines the prefix; it is consumed, not copied.
        let prefix = {
            let Some(first) = entries.next() else {
                return Err(Error::InvalidRootEntry { name: None });
            };
            let first = first?;
            let name = String::from_utf8_lossy(&first.path_bytes()).into_owned();
            if !first.header().entry_type().is_dir() {
                return Err(Error::InvalidRootEntry { name: Some(name) });
            }
            name
        };
        log::info!("processing {prefix}");

        let runtime_prefix = format!("{prefix}jbr/");
        let mut table = ProcessorTable::new(request.processors.clone(), request.product, &prefix);
        let mut summary = RepackSummary::default();
        let mut runtime_seen = false;

        for entry in entries {
            let mut entry = entry?;
            let path = String::from_utf8_lossy(&entry.path_bytes()).into_owned();

            if path.starts_with(&runtime_prefix) {
                if path == runtime_prefix {
                    if runtime_seen {
                        return Err(Error::DuplicateEntry { path });
                    }
                    runtime_seen = true;
                    match &request.runtime {
                        None => log::warn!("no runtime bundle provided"),
                        Some(bundle_path) => {
                            log::info!("copying runtime from {}", bundle_path.display());
                            let bundle_name = bundle_path
                                .file_name()
                                .map(|n| n.to_string_lossy().into_owned())
                                .unwrap_or_else(|| bundle_path.display().to_string());
                            let file = File::open(bundle_path)?;
                            let mut bundle = tar::Archive::new(GzDecoder::new(file));
                            summary.runtime_entries = splice_runtime(
                                &bundle_name,
                                &mut bundle,
                                &runtime_prefix,
                                &mut output.borrow_mut(),
                            )?;
                        }
                    }
                } else {
                    log::debug!("skip runtime entry: {path}");
                    summary.skipped += 1;
                }
            } else if let Some(spec) = table.fire(&path)? {
                log::info!("processing {path}");
                let mut header = entry.header().clone();
                match spec.strategy() {
                    Strategy::Patch(patch) => {
                        let mut content = Vec::new();
                        entry.read_to_end(&mut content)?;
                        let patched = patch.apply(&path, &content)?;
                        header.set_size(patched.len() as u64);
                        append_entry(
                            &mut output.borrow_mut(),
                            &mut header,
                            &path,
                            patched.as_slice(),
                        )?;
                        summary.patched += 1;
                    }
                    Strategy::Replace { entry: entry_name } => {
                        natives.borrow_mut().replace_entry(
                            entry_name,
                            &mut header,
                            &path,
                            &mut output.borrow_mut(),
                        )?;
                        summary.replaced += 1;
                    }
                }
            } else if entry.header().entry_type().is_symlink() {
                let target = entry
                    .link_name_bytes()
                    .map(|t| String::from_utf8_lossy(&t).into_owned())
                    .ok_or_else(|| Error::MissingLinkTarget { path: path.clone() })?;
                log::debug!("copying symbolic link {path} -> {target}");
                let mut header = entry.header().clone();
                append_symlink(&mut output.borrow_mut(), &mut header, &path, &target)?;
                summary.copied += 1;
            } else {
                log::debug!("copying {path}");
                let mut header = entry.header().clone();
                append_entry(&mut output.borrow_mut(), &mut header, &path, &mut entry)?;
                summary.copied += 1;
            }
        }

        let unfired = table.unfired();
        if !unfired.is_empty() {
            return Err(Error::MissingEntries {
                names: unfired,
                runtime_missing: !runtime_seen,
            });
        }
        if !runtime_seen {
            return Err(Error::RuntimeNotFound);
        }
        Ok(summary)
    }
}

/// Opens and runs one transformation in a single call.
pub fn repack(request: RepackRequest) -> Result<RepackSummary> {
    Repacker::open(request)?.run()
}
