//! Low-level entry writing that preserves source header bytes.
//!
//! `tar::Builder::append_data` normalizes the path through
//! `Path::components()`, which drops the trailing `/` from directory names
//! and rewrites the rest of the header. The engine copies entries from a
//! vendor archive whose exact names (trailing separator included) are load
//! bearing for prefix matching, so short names are written into the raw
//! name field instead and the builder's long-name mechanism is used only
//! for paths that do not fit it.

use std::io::{self, Read, Write};
use std::path::Path;

/// Longest path that fits the header name field without an extension
/// record.
const SHORT_NAME_MAX: usize = 100;

fn set_short_name(header: &mut tar::Header, path: &str) {
    let name = &mut header.as_old_mut().name;
    name.fill(0);
    name[..path.len()].copy_from_slice(path.as_bytes());
}

/// Appends an entry with its body, keeping `header`'s metadata.
///
/// When `path` fits the short name field it is written there verbatim and
/// the header is emitted as-is (checksum recomputed); longer paths go
/// through the builder's extension-record mechanism.
pub fn append_entry<W: Write, R: Read>(
    out: &mut tar::Builder<W>,
    header: &mut tar::Header,
    path: &str,
    data: R,
) -> io::Result<()> {
    if path.len() <= SHORT_NAME_MAX {
        set_short_name(header, path);
        header.set_cksum();
        out.append(&*header, data)
    } else {
        out.append_data(header, Path::new(path), data)
    }
}

/// Appends a symbolic link entry, keeping `header`'s metadata and target.
///
/// The header must already carry the link target (it does when cloned from
/// a read entry whose target fits the short field); longer names or
/// targets go through the builder's extension-record mechanism.
pub fn append_symlink<W: Write>(
    out: &mut tar::Builder<W>,
    header: &mut tar::Header,
    path: &str,
    target: &str,
) -> io::Result<()> {
    if path.len() <= SHORT_NAME_MAX && target.len() <= SHORT_NAME_MAX {
        set_short_name(header, path);
        let link = &mut header.as_old_mut().linkname;
        link.fill(0);
        link[..target.len()].copy_from_slice(target.as_bytes());
        header.set_cksum();
        out.append(&*header, io::empty())
    } else {
        out.append_link(header, Path::new(path), Path::new(target))
    }
}
