//! Line-oriented content patches for required text entries.
//!
//! A [`LinePatch`] is a pure transformation from original content to new
//! content: it scans the entry line by line, requires exactly one marker
//! line, and injects one fixed line next to it. Content is fully buffered
//! because the new byte length must be known before the tar header is
//! written; the target files are kilobyte-scale, so this is cheap.

use crate::{Error, Result};

/// How a line is recognized as the patch marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    /// The line starts with the given prefix.
    Prefix(String),
    /// The line equals the given text exactly.
    Exact(String),
}

impl Marker {
    fn matches(&self, line: &str) -> bool {
        match self {
            Marker::Prefix(prefix) => line.starts_with(prefix.as_str()),
            Marker::Exact(text) => line == text,
        }
    }

    fn text(&self) -> &str {
        match self {
            Marker::Prefix(prefix) => prefix,
            Marker::Exact(text) => text,
        }
    }
}

/// Where the injected line goes relative to the marker line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Immediately before the marker line.
    Before,
    /// Immediately after the marker line.
    After,
}

/// A content patch that injects one fixed line at a required marker.
#[derive(Debug, Clone)]
pub struct LinePatch {
    marker: Marker,
    placement: Placement,
    inject: String,
}

impl LinePatch {
    /// Creates a patch that injects `inject` after the line starting with
    /// `prefix`.
    pub fn after_prefix(prefix: impl Into<String>, inject: impl Into<String>) -> Self {
        LinePatch {
            marker: Marker::Prefix(prefix.into()),
            placement: Placement::After,
            inject: inject.into(),
        }
    }

    /// Creates a patch that injects `inject` before the line equal to
    /// `line`.
    pub fn before_exact(line: impl Into<String>, inject: impl Into<String>) -> Self {
        LinePatch {
            marker: Marker::Exact(line.into()),
            placement: Placement::Before,
            inject: inject.into(),
        }
    }

    /// Applies the patch to `content`, returning the new content.
    ///
    /// Every line is emitted unchanged (with a terminating `\n`); the
    /// injected line is added next to the single marker line. `path` names
    /// the entry in error messages.
    ///
    /// # Errors
    ///
    /// [`Error::NotText`] if the content is not UTF-8,
    /// [`Error::DuplicateMarker`] if the marker matches twice, and
    /// [`Error::MissingMarker`] if it never matches.
    pub fn apply(&self, path: &str, content: &[u8]) -> Result<Vec<u8>> {
        let text = std::str::from_utf8(content).map_err(|_| Error::NotText {
            path: path.to_string(),
        })?;

        let mut out = String::with_capacity(text.len() + self.inject.len() + 1);
        let mut matched: Option<usize> = None;

        for (idx, line) in text.lines().enumerate() {
            if self.marker.matches(line) {
                let lineno = idx + 1;
                if let Some(first) = matched {
                    return Err(Error::DuplicateMarker {
                        path: path.to_string(),
                        first,
                        second: lineno,
                        line: line.to_string(),
                    });
                }
                matched = Some(lineno);
                if self.placement == Placement::Before {
                    out.push_str(&self.inject);
                    out.push('\n');
                }
                out.push_str(line);
                out.push('\n');
                if self.placement == Placement::After {
                    out.push_str(&self.inject);
                    out.push('\n');
                }
            } else {
                out.push_str(line);
                out.push('\n');
            }
        }

        if matched.is_none() {
            return Err(Error::MissingMarker {
                path: path.to_string(),
                marker: self.marker.text().to_string(),
            });
        }

        Ok(out.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch_after() -> LinePatch {
        LinePatch::after_prefix("  \"productCode\":", "  \"envVarBaseName\": \"IDEA\",")
    }

    #[test]
    fn test_inject_after_marker_line() {
        let input = b"{\n  \"name\": \"IDE\",\n  \"productCode\": \"IC\",\n}\n";
        let output = patch_after().apply("product-info.json", input).unwrap();
        assert_eq!(
            std::str::from_utf8(&output).unwrap(),
            "{\n  \"name\": \"IDE\",\n  \"productCode\": \"IC\",\n  \"envVarBaseName\": \"IDEA\",\n}\n"
        );
    }

    #[test]
    fn test_inject_before_marker_line() {
        let patch = LinePatch::before_exact("  ${VM_OPTIONS} \\", "  -Dextra.option=1 \\");
        let input = b"exec java \\\n  ${VM_OPTIONS} \\\n  -cp lib\n";
        let output = patch.apply("bin/idea.sh", input).unwrap();
        assert_eq!(
            std::str::from_utf8(&output).unwrap(),
            "exec java \\\n  -Dextra.option=1 \\\n  ${VM_OPTIONS} \\\n  -cp lib\n"
        );
    }

    #[test]
    fn test_missing_marker_is_an_error() {
        let input = b"{\n  \"name\": \"IDE\",\n}\n";
        let err = patch_after().apply("product-info.json", input).unwrap_err();
        assert!(matches!(err, Error::MissingMarker { path, .. } if path == "product-info.json"));
    }

    #[test]
    fn test_duplicate_marker_reports_both_line_numbers() {
        let input = b"  \"productCode\": \"IC\",\nmid\n  \"productCode\": \"IU\",\n";
        let err = patch_after().apply("product-info.json", input).unwrap_err();
        match err {
            Error::DuplicateMarker { first, second, .. } => {
                assert_eq!(first, 1);
                assert_eq!(second, 3);
            }
            other => panic!("expected DuplicateMarker, got {other}"),
        }
    }

    #[test]
    fn test_missing_trailing_newline_is_normalized() {
        let input = b"  \"productCode\": \"IC\",";
        let output = patch_after().apply("product-info.json", input).unwrap();
        assert!(output.ends_with(b",\n"));
    }

    #[test]
    fn test_binary_content_is_rejected() {
        let input = [0xff, 0xfe, 0x00, 0x01];
        let err = patch_after().apply("product-info.json", &input).unwrap_err();
        assert!(matches!(err, Error::NotText { .. }));
    }

    #[test]
    fn test_exact_marker_does_not_match_prefix() {
        let patch = LinePatch::before_exact("  ${VM_OPTIONS} \\", "x");
        let input = b"  ${VM_OPTIONS} \\ trailing\n";
        assert!(patch.apply("bin/idea.sh", input).is_err());
    }
}
