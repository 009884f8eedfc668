//! Runtime bundle splicing.
//!
//! The runtime bundle is a tar stream with its own single root directory
//! (for example `jbr-21.0.5/`). Splicing rewrites every entry, the root
//! included, by substituting that source prefix with the target prefix
//! inside the distribution (`<prefix>jbr/`), so the root entry re-creates
//! the runtime directory the dispatch loop consumed as its marker.

use std::io::{Read, Write};

use crate::entry::{append_entry, append_symlink};
use crate::{Error, Result};

/// Splices `runtime` into `out` under `target_prefix`.
///
/// The bundle's first entry must be a directory whose name contains a `/`;
/// the name up to and including the first `/` becomes the source prefix.
/// Every entry must start with that prefix or the splice fails. Returns
/// the number of entries written.
///
/// `bundle_name` identifies the bundle in log and error messages.
pub fn splice_runtime<R: Read, W: Write>(
    bundle_name: &str,
    runtime: &mut tar::Archive<R>,
    target_prefix: &str,
    out: &mut tar::Builder<W>,
) -> Result<usize> {
    let mut entries = runtime.entries()?;
    let Some(first) = entries.next() else {
        return Err(Error::EmptyRuntime {
            bundle: bundle_name.to_string(),
        });
    };
    let mut entry = first?;

    let root = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
    let source_prefix = match root.find('/') {
        Some(idx) if entry.header().entry_type().is_dir() => root[..idx + 1].to_string(),
        _ => {
            return Err(Error::InvalidRuntimeRoot {
                bundle: bundle_name.to_string(),
                name: root,
            });
        }
    };

    let mut copied = 0;
    loop {
        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        let Some(rest) = name.strip_prefix(&source_prefix) else {
            return Err(Error::ForeignEntry {
                archive: bundle_name.to_string(),
                prefix: source_prefix,
                name,
            });
        };
        let new_name = format!("{target_prefix}{rest}");
        log::debug!("copying {bundle_name}/{name} to {new_name}");

        let mut header = entry.header().clone();
        if header.entry_type().is_symlink() {
            let target = entry
                .link_name_bytes()
                .map(|t| String::from_utf8_lossy(&t).into_owned())
                .ok_or_else(|| Error::MissingLinkTarget { path: name.clone() })?;
            append_symlink(out, &mut header, &new_name, &target)?;
        } else {
            append_entry(out, &mut header, &new_name, &mut entry)?;
        }
        copied += 1;

        match entries.next() {
            Some(next) => entry = next?,
            None => break,
        }
    }
    Ok(copied)
}
