//! Processor descriptors and the per-run pending set.
//!
//! A [`ProcessorSpec`] declares one required output path and the strategy
//! that produces its content. The stock table in
//! [`ProcessorSpec::defaults`] covers the entries every distribution needs
//! rewritten; callers may supply their own table instead. The
//! [`ProcessorTable`] is the run's completeness set: each descriptor must
//! fire exactly once, and whatever has not fired by end of scan is reported
//! by name.

use std::collections::HashMap;

use crate::patch::LinePatch;
use crate::product::Product;
use crate::{Error, Result};

/// Marker prefix of the product declaration line in the metadata file.
const METADATA_MARKER: &str = "  \"productCode\":";

/// Line injected into the metadata file after the marker.
const METADATA_INJECT: &str = "  \"envVarBaseName\": \"IDEA\",";

/// The VM-options continuation line in the launcher script.
const LAUNCH_MARKER: &str = "  ${VM_OPTIONS} \\";

/// Line injected into the launcher script before the marker.
const LAUNCH_INJECT: &str =
    "  -Didea.filewatcher.executable.path=${IDE_HOME}/bin/fsnotifier \\";

/// The transformation a processor applies to its entry.
#[derive(Debug, Clone)]
pub enum Strategy {
    /// Rewrite the entry's text content in memory.
    Patch(LinePatch),
    /// Replace the entry's body and header metadata from the native bundle.
    Replace {
        /// Exact name of the replacement entry inside the native bundle.
        entry: String,
    },
}

/// A processor descriptor: one required output path and its strategy.
#[derive(Debug, Clone)]
pub struct ProcessorSpec {
    name: String,
    rel_path: String,
    product: Option<Product>,
    strategy: Strategy,
}

impl ProcessorSpec {
    /// Creates a descriptor required for every product variant.
    ///
    /// `name` is the stable identifier used in completeness reports;
    /// `rel_path` is the entry path relative to the distribution prefix.
    pub fn new(
        name: impl Into<String>,
        rel_path: impl Into<String>,
        strategy: Strategy,
    ) -> Self {
        ProcessorSpec {
            name: name.into(),
            rel_path: rel_path.into(),
            product: None,
            strategy,
        }
    }

    /// Restricts the descriptor to one product variant.
    pub fn only_for(mut self, product: Product) -> Self {
        self.product = Some(product);
        self
    }

    /// Returns the descriptor's stable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the entry path relative to the distribution prefix.
    pub fn rel_path(&self) -> &str {
        &self.rel_path
    }

    /// Returns the descriptor's strategy.
    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Returns whether the descriptor is required for the given product.
    pub fn is_required_for(&self, product: Product) -> bool {
        self.product.is_none_or(|p| p == product)
    }

    /// Returns the stock descriptor table.
    ///
    /// Covers the product metadata file, the launcher script, and the three
    /// native binaries replaced per target architecture. The remote
    /// development launcher ships only in the Ultimate distribution.
    pub fn defaults() -> Vec<ProcessorSpec> {
        vec![
            ProcessorSpec::new(
                "metadata",
                "product-info.json",
                Strategy::Patch(LinePatch::after_prefix(METADATA_MARKER, METADATA_INJECT)),
            ),
            ProcessorSpec::new(
                "launch-script",
                "bin/idea.sh",
                Strategy::Patch(LinePatch::before_exact(LAUNCH_MARKER, LAUNCH_INJECT)),
            ),
            ProcessorSpec::new(
                "local-launcher",
                "bin/idea",
                Strategy::Replace {
                    entry: "xplat-launcher".to_string(),
                },
            ),
            ProcessorSpec::new(
                "remote-launcher",
                "bin/remote-dev-server",
                Strategy::Replace {
                    entry: "xplat-launcher".to_string(),
                },
            )
            .only_for(Product::Ultimate),
            ProcessorSpec::new(
                "fsnotifier",
                "bin/fsnotifier",
                Strategy::Replace {
                    entry: "fsnotifier".to_string(),
                },
            ),
        ]
    }
}

struct Slot {
    spec: ProcessorSpec,
    fired: bool,
}

/// The pending set of processors for one run.
///
/// Built at the start of the scan, once the distribution prefix is known.
/// Only the dispatch loop mutates it, via [`fire`][ProcessorTable::fire].
/// Unfired descriptors are listed in registration order, never hash order,
/// so completeness reports are deterministic.
pub struct ProcessorTable {
    slots: Vec<Slot>,
    by_path: HashMap<String, usize>,
}

impl ProcessorTable {
    /// Builds the pending set from the descriptors applicable to `product`,
    /// keying each by `prefix` + relative path.
    pub fn new(specs: Vec<ProcessorSpec>, product: Product, prefix: &str) -> Self {
        let mut slots = Vec::new();
        let mut by_path = HashMap::new();
        for spec in specs {
            if !spec.is_required_for(product) {
                continue;
            }
            by_path.insert(format!("{prefix}{}", spec.rel_path), slots.len());
            slots.push(Slot { spec, fired: false });
        }
        ProcessorTable { slots, by_path }
    }

    /// Marks the processor owning `path` as fired and returns it.
    ///
    /// Returns `Ok(None)` when no processor owns the path. A second fire
    /// for the same descriptor is [`Error::DuplicateEntry`].
    pub fn fire(&mut self, path: &str) -> Result<Option<&ProcessorSpec>> {
        let Some(&idx) = self.by_path.get(path) else {
            return Ok(None);
        };
        let slot = &mut self.slots[idx];
        if slot.fired {
            return Err(Error::DuplicateEntry {
                path: path.to_string(),
            });
        }
        slot.fired = true;
        Ok(Some(&slot.spec))
    }

    /// Names of the descriptors that have not fired, in registration order.
    pub fn unfired(&self) -> Vec<String> {
        self.slots
            .iter()
            .filter(|slot| !slot.fired)
            .map(|slot| slot.spec.name.clone())
            .collect()
    }

    /// Returns whether every descriptor has fired.
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(|slot| slot.fired)
    }
}
