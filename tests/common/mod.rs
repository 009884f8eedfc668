//! Shared test utilities for integration tests.
//!
//! Fixture archives are built in memory and written to a temp directory;
//! output archives are read back into plain structs for assertions.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test
//! file compiles as a separate crate and may only use a subset of these
//! helpers.

#![allow(dead_code)]

use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use ide_repack::entry::{append_entry, append_symlink};
use tar::{EntryType, Header};
use zip::write::SimpleFileOptions;

/// Fixed mtime used for fixture entries, so outputs are reproducible.
pub const FIXTURE_MTIME: u64 = 1_600_000_000;

/// One entry of a fixture tar stream.
pub enum Fixture {
    /// A directory entry (name ends with `/`).
    Dir(String),
    /// A regular file with mode and content.
    File {
        /// Entry path.
        path: String,
        /// File content.
        data: Vec<u8>,
        /// Unix mode bits.
        mode: u32,
    },
    /// A symbolic link.
    Symlink {
        /// Entry path.
        path: String,
        /// Link target.
        target: String,
    },
}

/// Directory fixture.
pub fn dir(path: &str) -> Fixture {
    Fixture::Dir(path.to_string())
}

/// Regular-file fixture with mode `0o644`.
pub fn file(path: &str, data: &[u8]) -> Fixture {
    file_mode(path, data, 0o644)
}

/// Regular-file fixture with an explicit mode.
pub fn file_mode(path: &str, data: &[u8], mode: u32) -> Fixture {
    Fixture::File {
        path: path.to_string(),
        data: data.to_vec(),
        mode,
    }
}

/// Symlink fixture.
pub fn symlink(path: &str, target: &str) -> Fixture {
    Fixture::Symlink {
        path: path.to_string(),
        target: target.to_string(),
    }
}

fn append_fixture(builder: &mut tar::Builder<impl Write>, entry: &Fixture) {
    match entry {
        Fixture::Dir(path) => {
            let mut header = Header::new_gnu();
            header.set_entry_type(EntryType::Directory);
            header.set_mode(0o755);
            header.set_mtime(FIXTURE_MTIME);
            header.set_size(0);
            append_entry(builder, &mut header, path, std::io::empty()).unwrap();
        }
        Fixture::File { path, data, mode } => {
            let mut header = Header::new_gnu();
            header.set_entry_type(EntryType::Regular);
            header.set_mode(*mode);
            header.set_mtime(FIXTURE_MTIME);
            header.set_size(data.len() as u64);
            append_entry(builder, &mut header, path, data.as_slice()).unwrap();
        }
        Fixture::Symlink { path, target } => {
            let mut header = Header::new_gnu();
            header.set_entry_type(EntryType::Symlink);
            header.set_mode(0o777);
            header.set_mtime(FIXTURE_MTIME);
            header.set_size(0);
            append_symlink(builder, &mut header, path, target).unwrap();
        }
    }
}

/// Builds a gzip-compressed tar stream from fixtures.
pub fn targz(entries: &[Fixture]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for entry in entries {
        append_fixture(&mut builder, entry);
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// Builds a zip archive with a fixed per-entry modification time.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mtime = zip::DateTime::from_date_and_time(2024, 1, 1, 0, 0, 0).unwrap();
    let options = SimpleFileOptions::default().last_modified_time(mtime);
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer.start_file(name.to_string(), options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Unix timestamp of the fixed zip fixture mtime (2024-01-01 00:00:00 UTC).
pub const ZIP_FIXTURE_MTIME: u64 = 1_704_067_200;

/// A decoded output entry.
pub struct OutEntry {
    /// Entry path, trailing `/` included for directories.
    pub path: String,
    /// Entry kind.
    pub kind: EntryType,
    /// Unix mode bits.
    pub mode: u32,
    /// Modification time (seconds since epoch).
    pub mtime: u64,
    /// Link target for symlinks.
    pub link: Option<String>,
    /// File content (empty for directories and links).
    pub data: Vec<u8>,
}

/// Reads a gzip-compressed tar stream back into a list of entries.
pub fn read_targz(bytes: &[u8]) -> Vec<OutEntry> {
    let mut archive = tar::Archive::new(GzDecoder::new(Cursor::new(bytes)));
    let mut out = Vec::new();
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        let path = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        let kind = entry.header().entry_type();
        let mode = entry.header().mode().unwrap();
        let mtime = entry.header().mtime().unwrap();
        let link = entry
            .link_name()
            .unwrap()
            .map(|l| l.to_string_lossy().into_owned());
        let mut data = Vec::new();
        entry.read_to_end(&mut data).unwrap();
        out.push(OutEntry {
            path,
            kind,
            mode,
            mtime,
            link,
            data,
        });
    }
    out
}

/// Writes `bytes` to `dir/name` and returns the full path.
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Product metadata fixture with one marker line.
pub fn product_info() -> Vec<u8> {
    b"{\n  \"name\": \"IntelliJ IDEA\",\n  \"version\": \"2024.3\",\n  \"productCode\": \"IC\",\n  \"launch\": []\n}\n".to_vec()
}

/// Launcher script fixture with one marker line.
pub fn launcher_script() -> Vec<u8> {
    b"#!/bin/sh\nexec \"$JAVA_BIN\" \\\n  ${VM_OPTIONS} \\\n  -cp \"$CLASS_PATH\" com.intellij.idea.Main\n"
        .to_vec()
}

/// A community-edition distribution with every stock processor target and
/// an empty runtime marker.
pub fn standard_distribution() -> Vec<Fixture> {
    vec![
        dir("app/"),
        file("app/product-info.json", &product_info()),
        dir("app/bin/"),
        file_mode("app/bin/idea.sh", &launcher_script(), 0o755),
        file_mode("app/bin/idea", b"old aarch64 launcher", 0o755),
        file_mode("app/bin/fsnotifier", b"old aarch64 fsnotifier", 0o755),
        file("app/bin/idea.png", b"\x89PNG\r\n\x1a\nfake image bytes"),
        symlink("app/bin/format.sh", "idea.sh"),
        dir("app/jbr/"),
        dir("app/lib/"),
        file("app/lib/app.jar", b"PK\x03\x04 jar bytes"),
    ]
}

/// The stock native bundle for the standard distribution.
pub fn standard_natives() -> Vec<u8> {
    zip_bytes(&[
        ("xplat-launcher", b"new riscv64 launcher bytes"),
        ("fsnotifier", b"new riscv64 fsnotifier bytes"),
    ])
}

/// A runtime bundle rooted at `rt-1.0/`.
pub fn standard_runtime() -> Vec<Fixture> {
    vec![
        dir("rt-1.0/"),
        dir("rt-1.0/bin/"),
        file_mode("rt-1.0/bin/java", b"new java binary", 0o755),
        file("rt-1.0/release", b"JAVA_VERSION=21\n"),
    ]
}
