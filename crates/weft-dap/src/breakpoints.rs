//! Breakpoint registry.
//!
//! Stores canonical `(path, line)` pairs, lines in the engine
//! (1-based) convention. The table is a plain struct; it lives inside
//! the session state behind the session lock, which makes `replace`
//! atomic with respect to engine-thread matching.

use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use weft_engine::SourceLocation;

use crate::error::AdapterError;
use crate::protocol::engine_line;

/// Normalize a client- or engine-reported path to one canonical form:
/// strip a `file://` scheme, percent-decode, and resolve `.`/`..`
/// components lexically. Equal inputs always normalize equally, which
/// is what makes matching deterministic.
pub fn normalize_path(raw: &str) -> SmolStr {
    let raw = raw.strip_prefix("file://").unwrap_or(raw);
    let decoded = percent_decode_str(raw).decode_utf8_lossy();
    let mut out = PathBuf::new();
    for component in Path::new(decoded.as_ref()).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    SmolStr::new(out.to_string_lossy())
}

#[derive(Debug, Default)]
pub struct BreakpointTable {
    by_path: FxHashMap<SmolStr, Vec<u32>>,
}

impl BreakpointTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically replace all breakpoints for one source path. Lines
    /// arrive in the client (0-based) convention; the canonical
    /// (engine) lines are returned for the verification response. A
    /// line with no engine-side representation rejects the whole
    /// request and leaves the table untouched.
    pub fn replace(
        &mut self,
        client_path: &str,
        client_lines: &[u32],
    ) -> Result<Vec<u32>, AdapterError> {
        let path = normalize_path(client_path);
        let mut lines = Vec::with_capacity(client_lines.len());
        for &line in client_lines {
            let canonical = engine_line(line).ok_or_else(|| {
                AdapterError::InvalidArguments(format!("breakpoint line {line} out of range"))
            })?;
            lines.push(canonical);
        }
        if lines.is_empty() {
            self.by_path.remove(&path);
        } else {
            self.by_path.insert(path, lines.clone());
        }
        Ok(lines)
    }

    /// Exact match after path normalization; `location` is in the
    /// engine convention already.
    pub fn matches(&self, location: &SourceLocation) -> bool {
        self.by_path
            .get(&normalize_path(&location.path))
            .is_some_and(|lines| lines.contains(&location.line))
    }

    pub fn clear(&mut self) {
        self.by_path.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}
