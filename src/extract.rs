//! Distribution extraction to a directory.
//!
//! Unpacks a distribution tar.gz into a directory with the root prefix
//! stripped, enforcing the same structural invariants the engine relies
//! on: the first entry must be the single root directory (exactly one
//! `/` in its name), every other entry must live under it, hard links are
//! rejected, and a file entry may not occur twice. File modes and
//! modification times are restored where the platform allows, with a
//! warning rather than a failure when it does not.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use filetime::FileTime;
use flate2::read::GzDecoder;

use crate::scope::{ResourceScope, Shared};
use crate::{Error, Result};

/// Per-run counters for one extraction.
#[must_use = "the summary reports how many entries were actually extracted"]
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractSummary {
    /// Directories created.
    pub directories: usize,
    /// Regular files written.
    pub files: usize,
    /// Symbolic links recreated.
    pub symlinks: usize,
}

impl ExtractSummary {
    /// Total number of entries materialized.
    pub fn total(&self) -> usize {
        self.directories + self.files + self.symlinks
    }
}

/// Extracts the distribution at `archive` into `dest`.
///
/// The root directory entry itself is stripped: an archive rooted at
/// `app/` lands directly inside `dest`.
pub fn extract(archive: &Path, dest: &Path) -> Result<ExtractSummary> {
    let display = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| archive.display().to_string());

    let mut scope = ResourceScope::new();
    let decoder = match open_stream(&mut scope, archive) {
        Ok(decoder) => decoder,
        Err(e) => return Err(scope.abort(e)),
    };
    let mut input = tar::Archive::new(decoder);
    let outcome = extract_entries(&display, &mut input, dest);
    scope.finish(outcome)
}

fn open_stream(
    scope: &mut ResourceScope,
    archive: &Path,
) -> Result<Shared<GzDecoder<Shared<File>>>> {
    let file = scope.register("distribution file", File::open(archive)?);
    Ok(scope.register("distribution gzip reader", GzDecoder::new(file)))
}

fn extract_entries<R: Read>(
    archive_name: &str,
    input: &mut tar::Archive<R>,
    dest: &Path,
) -> Result<ExtractSummary> {
    let mut entries = input.entries()?;

    let prefix = {
        let Some(first) = entries.next() else {
            return Err(Error::InvalidRootEntry { name: None });
        };
        let first = first?;
        let name = String::from_utf8_lossy(&first.path_bytes()).into_owned();
        let single_root =
            first.header().entry_type().is_dir() && name.matches('/').count() == 1;
        if !single_root {
            return Err(Error::InvalidRootEntry { name: Some(name) });
        }
        name
    };

    std::fs::create_dir_all(dest)?;
    let mut summary = ExtractSummary::default();

    for entry in entries {
        let mut entry = entry?;
        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        let header = entry.header();
        log::debug!(
            "extracting {name} (size={} dir={} symlink={})",
            header.size()?,
            header.entry_type().is_dir(),
            header.entry_type().is_symlink(),
        );

        let Some(rel) = name.strip_prefix(&prefix) else {
            return Err(Error::ForeignEntry {
                archive: archive_name.to_string(),
                prefix,
                name,
            });
        };
        if rel.is_empty() {
            continue;
        }
        if header.entry_type().is_hard_link() {
            return Err(Error::LinkNotSupported { path: name });
        }

        let target = dest.join(rel);
        if header.entry_type().is_dir() {
            std::fs::create_dir_all(&target)?;
            summary.directories += 1;
        } else if header.entry_type().is_symlink() {
            let link = entry
                .link_name()?
                .ok_or_else(|| Error::MissingLinkTarget { path: name.clone() })?;
            make_symlink(&link, &target, &name)?;
            summary.symlinks += 1;
        } else {
            if target.exists() {
                return Err(Error::DuplicateEntry { path: name });
            }
            let mode = header.mode()?;
            let mtime = header.mtime()?;
            let mut out = File::create(&target)?;
            std::io::copy(&mut entry, &mut out)?;
            drop(out);
            restore_metadata(&target, mode, mtime);
            summary.files += 1;
        }
    }

    Ok(summary)
}

#[cfg(unix)]
fn make_symlink(link: &Path, target: &Path, _name: &str) -> Result<()> {
    std::os::unix::fs::symlink(link, target)?;
    Ok(())
}

#[cfg(not(unix))]
fn make_symlink(_link: &Path, _target: &Path, name: &str) -> Result<()> {
    Err(Error::LinkNotSupported {
        path: name.to_string(),
    })
}

/// Restores mode and mtime on an extracted file, warning on failure.
fn restore_metadata(path: &Path, mode: u32, mtime: u64) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(mode);
        if let Err(e) = std::fs::set_permissions(path, perms) {
            log::warn!("failed to set permissions on '{}': {}", path.display(), e);
        }
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mtime = FileTime::from_unix_time(mtime as i64, 0);
    if let Err(e) = filetime::set_file_mtime(path, mtime) {
        log::warn!(
            "failed to set modification time on '{}': {}",
            path.display(),
            e
        );
    }
}
