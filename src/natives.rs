//! Native bundle lookup and entry replacement.
//!
//! The native bundle is a zip archive of platform-specific binaries built
//! for the target architecture. A replacement copies the named bundle
//! entry's size and modification time onto the output header, then streams
//! its bytes verbatim into the output tar at the original entry's position.

use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;

use zip::ZipArchive;
use zip::result::ZipError;

use crate::entry::append_entry;
use crate::scope::Closeable;
use crate::{Error, Result};

/// Seconds since the Unix epoch for a civil UTC date-time.
///
/// Zip entries carry an MS-DOS date-time with no zone; it is taken as UTC.
/// Dates before 1970 (the format's floor is 1980) yield `None`.
fn unix_from_civil(
    year: i64,
    month: i64,
    day: i64,
    hour: i64,
    minute: i64,
    second: i64,
) -> Option<u64> {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let mp = if month > 2 { month - 3 } else { month + 9 };
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    let days = era * 146097 + doe - 719468;
    let secs = days * 86400 + hour * 3600 + minute * 60 + second;
    u64::try_from(secs).ok()
}

fn unix_from_zip_datetime(dt: zip::DateTime) -> Option<u64> {
    unix_from_civil(
        i64::from(dt.year()),
        i64::from(dt.month()),
        i64::from(dt.day()),
        i64::from(dt.hour()),
        i64::from(dt.minute()),
        i64::from(dt.second()),
    )
}

/// An open native bundle.
pub struct NativeBundle<R: Read + Seek> {
    name: String,
    zip: ZipArchive<R>,
}

impl NativeBundle<File> {
    /// Opens the native bundle at `path`.
    pub fn open_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let file = File::open(path)?;
        Ok(NativeBundle {
            name,
            zip: ZipArchive::new(file)?,
        })
    }
}

impl<R: Read + Seek> NativeBundle<R> {
    /// Opens a bundle over an arbitrary seekable reader.
    ///
    /// `name` identifies the bundle in lookup-failure messages.
    pub fn new(name: impl Into<String>, reader: R) -> Result<Self> {
        Ok(NativeBundle {
            name: name.into(),
            zip: ZipArchive::new(reader)?,
        })
    }

    /// Returns the bundle's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replaces one output entry from the bundle.
    ///
    /// Looks up `entry_name`, copies its declared size and modification
    /// time onto `header`, and streams its bytes into `out` at `path`.
    ///
    /// # Errors
    ///
    /// [`Error::NativeNotFound`] naming the entry when the bundle has no
    /// such member.
    pub fn replace_entry<W: Write>(
        &mut self,
        entry_name: &str,
        header: &mut tar::Header,
        path: &str,
        out: &mut tar::Builder<W>,
    ) -> Result<()> {
        let bundle = self.name.clone();
        let mut file = match self.zip.by_name(entry_name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => {
                return Err(Error::NativeNotFound {
                    bundle,
                    entry: entry_name.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        header.set_size(file.size());
        if let Some(mtime) = file.last_modified().and_then(unix_from_zip_datetime) {
            header.set_mtime(mtime);
        }
        append_entry(out, header, path, &mut file)?;
        Ok(())
    }
}

impl<R: Read + Seek> Closeable for NativeBundle<R> {
    fn close(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use zip::write::SimpleFileOptions;

    fn bundle_with(entries: &[(&str, &[u8])]) -> NativeBundle<Cursor<Vec<u8>>> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer
                .start_file(name.to_string(), SimpleFileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        }
        let cursor = writer.finish().unwrap();
        NativeBundle::new("natives-test.zip", cursor).unwrap()
    }

    #[test]
    fn test_unix_from_civil_known_dates() {
        assert_eq!(unix_from_civil(1970, 1, 1, 0, 0, 0), Some(0));
        assert_eq!(unix_from_civil(2024, 1, 1, 0, 0, 0), Some(1_704_067_200));
        assert_eq!(
            unix_from_civil(2024, 1, 1, 1, 2, 3),
            Some(1_704_067_200 + 3723)
        );
        assert_eq!(unix_from_civil(1969, 12, 31, 23, 59, 59), None);
    }

    #[test]
    fn test_replace_entry_streams_bytes_and_size() {
        let mut bundle = bundle_with(&[("xplat-launcher", b"\x7fELF launcher bytes")]);
        let mut out = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_mode(0o755);
        header.set_size(3); // stale size from the original entry

        bundle
            .replace_entry("xplat-launcher", &mut header, "app/bin/idea", &mut out)
            .unwrap();

        let bytes = out.into_inner().unwrap();
        let mut archive = tar::Archive::new(Cursor::new(bytes));
        let mut entries = archive.entries().unwrap();
        let mut entry = entries.next().unwrap().unwrap();
        assert_eq!(&*entry.path_bytes(), b"app/bin/idea");
        assert_eq!(entry.header().size().unwrap(), 19);
        assert_eq!(entry.header().mode().unwrap(), 0o755);
        let mut body = Vec::new();
        entry.read_to_end(&mut body).unwrap();
        assert_eq!(body, b"\x7fELF launcher bytes");
    }

    #[test]
    fn test_missing_entry_is_named_in_error() {
        let mut bundle = bundle_with(&[("fsnotifier", b"x")]);
        let mut out = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_gnu();
        let err = bundle
            .replace_entry("xplat-launcher", &mut header, "app/bin/idea", &mut out)
            .unwrap_err();
        match err {
            Error::NativeNotFound { bundle, entry } => {
                assert_eq!(bundle, "natives-test.zip");
                assert_eq!(entry, "xplat-launcher");
            }
            other => panic!("expected NativeNotFound, got {other}"),
        }
    }
}
