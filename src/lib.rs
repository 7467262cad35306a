//! Logic-less Mustache template rendering over a JSON-shaped data value.
//!
//! ```
//! use parchment::render_text;
//! use serde_json::json;
//!
//! let data = json!({"name": "World"});
//! assert_eq!(render_text("Hello, {{name}}!", &data).unwrap(), "Hello, World!");
//! ```

pub mod context;
pub mod error;
pub mod json;
pub mod lexer;
pub mod partial;
pub mod render;
pub mod sink;

use std::path::Path;

pub use crate::error::{RenderError, Result};
pub use crate::json::Json;
pub use crate::partial::{FsPartialLoader, LoadedPartial, PartialLoader};
pub use crate::sink::Sink;

use crate::context::ContextStack;

/// Render `template` against `data`, writing into `sink`. Partials are
/// resolved through `loader`, searched for first in `search_dir`.
pub fn render(
    template: &str,
    data: &Json,
    sink: &mut impl Sink,
    search_dir: &Path,
    loader: &dyn PartialLoader,
) -> Result<()> {
    let mut stack = ContextStack::new(data);
    render::render_compilation_unit(template, &mut stack, sink, search_dir, search_dir, loader, 0)
}

/// Render `template` against `data` into a fresh `String`, using the
/// filesystem-backed partial loader rooted at `search_dir`.
pub fn render_to_string(template: &str, data: &Json, search_dir: &Path) -> Result<String> {
    let mut out = String::new();
    render(template, data, &mut out, search_dir, &FsPartialLoader)?;
    Ok(out)
}

/// Render `template` against `data` with no partial directory (a `{{>x}}`
/// tag will simply expand to nothing).
pub fn render_text(template: &str, data: &Json) -> Result<String> {
    render_to_string(template, data, Path::new(""))
}

/// Parse `json_text` and render `template` against it.
pub fn render_from_json_text(template: &str, json_text: &str, search_dir: &Path) -> Result<String> {
    let data: Json = serde_json::from_str(json_text)?;
    render_to_string(template, &data, search_dir)
}

/// Read `json_path`, parse it, and render `template` against the result.
pub fn render_from_json_file(template: &str, json_path: &Path) -> Result<String> {
    let text = std::fs::read_to_string(json_path)?;
    let search_dir = json_path.parent().unwrap_or_else(|| Path::new(""));
    render_from_json_text(template, &text, search_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::error::Error as _;

    #[test]
    fn render_text_basic() {
        let data = json!({"name": "World"});
        assert_eq!(render_text("Hello, {{name}}!", &data).unwrap(), "Hello, World!");
    }

    #[test]
    fn render_from_json_text_parses_data() {
        let out = render_from_json_text("{{a}}-{{b}}", r#"{"a":1,"b":2}"#, Path::new("")).unwrap();
        assert_eq!(out, "1-2");
    }

    #[test]
    fn render_from_json_text_rejects_bad_json() {
        let err = render_from_json_text("{{a}}", "not json", Path::new("")).unwrap_err();
        assert_eq!(err.kind(), "Data");
    }

    #[test]
    fn render_from_json_file_reports_missing_file() {
        let err = render_from_json_file("{{a}}", Path::new("/no/such/file.json")).unwrap_err();
        assert_eq!(err.kind(), "Data");
        assert!(err.source().is_some());
    }
}
