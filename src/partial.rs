//! Partial loading and the standalone-indentation rewrite applied to a
//! partial's text before it is rendered inline.

use std::fs;
use std::path::{Path, PathBuf};

/// A partial's template text, plus the directory nested partials it
/// references should be searched in first.
pub struct LoadedPartial {
    pub text: String,
    pub dir: PathBuf,
}

/// Resolves a partial name to its template text.
///
/// Implementations are free to back this with a filesystem, an in-memory
/// map, or a network fetch; `FsPartialLoader` is the filesystem-backed
/// default the CLI uses.
pub trait PartialLoader {
    /// Load `name`, first against `search_dir` (the directory of the
    /// template that referenced it), falling back to `initial_dir` (the
    /// directory the top-level render call started from). Returns `None` if
    /// the partial cannot be found anywhere.
    fn load(&self, name: &str, search_dir: &Path, initial_dir: &Path) -> Option<LoadedPartial>;
}

/// Looks partials up as files named `name` inside `search_dir`, falling back
/// to `initial_dir` on a miss.
pub struct FsPartialLoader;

impl FsPartialLoader {
    fn read(dir: &Path, name: &str) -> Option<LoadedPartial> {
        if dir.as_os_str().is_empty() {
            return None;
        }
        let candidate = dir.join(name);
        let text = fs::read_to_string(&candidate).ok()?;
        let dir = candidate.parent().unwrap_or(dir).to_path_buf();
        Some(LoadedPartial { text, dir })
    }
}

impl PartialLoader for FsPartialLoader {
    fn load(&self, name: &str, search_dir: &Path, initial_dir: &Path) -> Option<LoadedPartial> {
        if let Some(found) = Self::read(search_dir, name) {
            return Some(found);
        }
        log::debug!("partial '{name}' not found in {search_dir:?}, trying initial directory");
        if search_dir != initial_dir {
            if let Some(found) = Self::read(initial_dir, name) {
                return Some(found);
            }
        }
        log::debug!("partial '{name}' not found in {initial_dir:?} either, expanding to nothing");
        None
    }
}

/// Rewrite `text` so that every line after the first is prefixed with
/// `indent`, preserving whatever line ending each line used.
///
/// The first line is deliberately left untouched: the caller already has
/// the original indentation preceding the partial tag sitting in the output
/// buffer, and that serves as the first line's indent. A trailing line
/// break in `text` produces a dangling `indent` at the very end of the
/// result; the renderer's standalone-whitespace trim removes it.
pub fn indent_text(text: &str, indent: &str) -> String {
    if indent.is_empty() {
        return text.to_string();
    }
    const CRLF_SENTINEL: &str = "\u{0}PARCHMENT-CRLF\u{0}";
    let text = text.replace("\r\n", CRLF_SENTINEL);
    let text = text.replace('\r', &format!("\r{indent}"));
    let text = text.replace('\n', &format!("\n{indent}"));
    text.replace(CRLF_SENTINEL, &format!("\r\n{indent}"))
}

/// The horizontal whitespace immediately preceding `tag_start` on its line.
pub fn leading_indent(template: &str, tag_start: usize) -> &str {
    let bytes = template.as_bytes();
    let mut i = tag_start;
    while i > 0 && (bytes[i - 1] == b' ' || bytes[i - 1] == b'\t') {
        i -= 1;
    }
    &template[i..tag_start]
}
