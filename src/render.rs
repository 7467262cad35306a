//! The renderer: walks a template, resolving tags against a context stack
//! and writing output into a `Sink`.
//!
//! The main loop alternates between copying literal spans and dispatching a
//! lexed tag, carrying a breadcrumb stack of open sections so `{{/name}}`
//! can find its matching opener, rewind to repeat the section body over the
//! next array element, or close out and restore outer visibility.

use std::path::Path;

use crate::context::{ContextStack, MAX_DEPTH};
use crate::error::{RenderError, Result};
use crate::json::Json;
use crate::lexer::{next_tag, Delimiters, Tag, TagKind};
use crate::partial::{indent_text, leading_indent, PartialLoader};
use crate::sink::Sink;

/// One entry per currently-open `#`/`^` section.
struct Breadcrumb<'t> {
    key: &'t str,
    /// Byte offset of the section body's start: right after the opening
    /// tag's closing delimiter. Repeating an array section rewinds here.
    again: usize,
    entered: bool,
    /// Visibility in effect just *before* this section was opened.
    outer_visible: bool,
}

/// Render `template` against `stack`, appending output to `sink`.
///
/// `search_dir` is where `{{>partial}}` tags look first; `initial_dir` is
/// the directory the very first, top-level template was rendered from, used
/// as the fallback for partials that aren't found alongside their includer.
/// `recursion_depth` counts partial nesting and is bounded by [`MAX_DEPTH`],
/// independently of the section-nesting breadcrumb stack below.
pub fn render_compilation_unit<S: Sink>(
    template: &str,
    stack: &mut ContextStack,
    sink: &mut S,
    search_dir: &Path,
    initial_dir: &Path,
    loader: &dyn PartialLoader,
    recursion_depth: usize,
) -> Result<()> {
    let mut delims = Delimiters::default();
    let mut breadcrumbs: Vec<Breadcrumb> = Vec::new();
    let mut visible = true;
    let mut pos = 0usize;

    loop {
        let Some(tag) = next_tag(template, pos, &delims)? else {
            if visible {
                sink.append_str(&template[pos..]);
            }
            break;
        };

        if visible {
            sink.append_str(&template[pos..tag.start]);
        }

        let mut next_pos = tag.end;

        match tag.kind {
            TagKind::Comment => {}

            TagKind::SetDelimiter => {
                delims = parse_set_delimiter(tag.key, tag.start)?;
            }

            TagKind::Section | TagKind::Inverted => {
                if breadcrumbs.len() >= MAX_DEPTH {
                    return Err(RenderError::depth_exceeded(tag.start));
                }
                let entered = if visible { stack.enter(tag.key) } else { false };
                breadcrumbs.push(Breadcrumb {
                    key: tag.key,
                    again: tag.end,
                    entered,
                    outer_visible: visible,
                });
                let becomes_invisible = match tag.kind {
                    TagKind::Section => !entered,
                    TagKind::Inverted => entered,
                    _ => unreachable!(),
                };
                if becomes_invisible {
                    visible = false;
                }
            }

            TagKind::End => {
                let top = breadcrumbs.pop().ok_or_else(|| {
                    RenderError::section_mismatch(tag.start, String::new(), tag.key.to_string())
                })?;
                if top.key != tag.key {
                    return Err(RenderError::section_mismatch(
                        tag.start,
                        top.key.to_string(),
                        tag.key.to_string(),
                    ));
                }
                let repeats = visible && top.entered && stack.next();
                if repeats {
                    next_pos = top.again;
                    breadcrumbs.push(top);
                } else {
                    visible = top.outer_visible;
                    if visible && top.entered {
                        stack.leave();
                    }
                }
            }

            TagKind::Partial => {
                if visible {
                    if recursion_depth >= MAX_DEPTH {
                        return Err(RenderError::depth_exceeded(tag.start));
                    }
                    if let Some(loaded) = loader.load(tag.key, search_dir, initial_dir) {
                        let text = if tag.standalone {
                            let indent = leading_indent(template, tag.start);
                            indent_text(&loaded.text, indent)
                        } else {
                            loaded.text
                        };
                        render_compilation_unit(
                            &text,
                            stack,
                            sink,
                            &loaded.dir,
                            initial_dir,
                            loader,
                            recursion_depth + 1,
                        )?;
                    }
                }
            }

            TagKind::Raw => {
                if visible {
                    interpolate_raw(stack.find(tag.key), sink);
                }
            }

            TagKind::Escaped | TagKind::Literal => {
                if visible {
                    interpolate_escaped(stack.find(tag.key), sink);
                }
            }

            TagKind::RawJson => {
                if visible {
                    interpolate_raw_json(stack.find(tag.key), sink);
                }
            }
        }

        if tag.standalone {
            sink.trim_trailing(|c| c == ' ' || c == '\t');
            next_pos = consume_standalone_trailing(template, next_pos);
        }

        pos = next_pos;
    }

    Ok(())
}

/// Skip spaces/tabs, then a single line terminator (`\r\n`, bare `\r`, or
/// bare `\n`), starting at `pos`.
fn consume_standalone_trailing(template: &str, mut pos: usize) -> usize {
    let bytes = template.as_bytes();
    while pos < bytes.len() && (bytes[pos] == b' ' || bytes[pos] == b'\t') {
        pos += 1;
    }
    if pos < bytes.len() && bytes[pos] == b'\r' {
        pos += 1;
    }
    if pos < bytes.len() && bytes[pos] == b'\n' {
        pos += 1;
    }
    pos
}

/// Parse a `{{=op cl=}}` tag body (still carrying its leading/trailing `=`)
/// into a new delimiter pair.
///
/// Unlike the reference implementation, the opener and closer are validated
/// independently against the 16-byte cap rather than reusing the opener's
/// matched length to also bound the closer.
fn parse_set_delimiter(raw: &str, offset: usize) -> Result<Delimiters> {
    let inner = raw
        .strip_prefix('=')
        .and_then(|s| s.strip_suffix('='))
        .ok_or_else(|| RenderError::malformed_set_delimiter(offset, "body must start and end with '='"))?;

    let mut tokens = inner.split_ascii_whitespace();
    let open = tokens
        .next()
        .ok_or_else(|| RenderError::malformed_set_delimiter(offset, "missing opening delimiter"))?;
    let close = tokens
        .next()
        .ok_or_else(|| RenderError::malformed_set_delimiter(offset, "missing closing delimiter"))?;
    if tokens.next().is_some() {
        return Err(RenderError::malformed_set_delimiter(
            offset,
            "expected exactly two whitespace-separated delimiters",
        ));
    }
    const MAX_DELIM_LEN: usize = 16;
    if open.is_empty() || open.len() > MAX_DELIM_LEN {
        return Err(RenderError::malformed_set_delimiter(offset, "opening delimiter length out of bounds"));
    }
    if close.is_empty() || close.len() > MAX_DELIM_LEN {
        return Err(RenderError::malformed_set_delimiter(offset, "closing delimiter length out of bounds"));
    }

    Ok(Delimiters { open: open.to_string(), close: close.to_string() })
}

fn interpolate_raw(value: Option<&Json>, sink: &mut impl Sink) {
    match value {
        Some(Json::String(s)) => sink.append_str(s),
        Some(Json::Number(n)) => {
            if let Some(f) = n.as_f64() {
                sink.append_number(f);
            }
        }
        _ => {}
    }
}

fn interpolate_escaped(value: Option<&Json>, sink: &mut impl Sink) {
    match value {
        Some(Json::String(s)) => {
            for c in s.chars() {
                match c {
                    '&' => sink.append_str("&amp;"),
                    '<' => sink.append_str("&lt;"),
                    '>' => sink.append_str("&gt;"),
                    '"' => sink.append_str("&quot;"),
                    other => sink.append_char(other),
                }
            }
        }
        Some(Json::Number(n)) => {
            if let Some(f) = n.as_f64() {
                sink.append_number(f);
            }
        }
        _ => {}
    }
}

/// Serialize `value` as JSON and write it escaped for embedding inside a
/// double-quoted JSON string literal: backslash-escaped quotes, `\/`
/// collapsed to `/`, every other backslash passed through untouched.
fn interpolate_raw_json(value: Option<&Json>, sink: &mut impl Sink) {
    let Some(value) = value else { return };
    let serialized = serde_json::to_string(value).unwrap_or_default();
    let body = if value.is_string() && serialized.len() >= 2 {
        &serialized[1..serialized.len() - 1]
    } else {
        serialized.as_str()
    };

    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => sink.append_str("\\\""),
            '\\' if chars.peek() == Some(&'/') => {
                chars.next();
                sink.append_char('/');
            }
            other => sink.append_char(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partial::FsPartialLoader;
    use serde_json::json;
    use std::path::PathBuf;

    fn render_str(template: &str, data: &Json) -> String {
        let mut stack = ContextStack::new(data);
        let mut out = String::new();
        let dir = PathBuf::new();
        render_compilation_unit(template, &mut stack, &mut out, &dir, &dir, &FsPartialLoader, 0).unwrap();
        out
    }

    #[test]
    fn plain_interpolation_escapes_html() {
        let data = json!({"name": "<b>Bob</b> & \"friends\""});
        assert_eq!(
            render_str("{{name}}", &data),
            "&lt;b&gt;Bob&lt;/b&gt; &amp; &quot;friends&quot;"
        );
    }

    #[test]
    fn triple_mustache_is_unescaped() {
        let data = json!({"name": "<b>Bob</b>"});
        assert_eq!(render_str("{{{name}}}", &data), "<b>Bob</b>");
        assert_eq!(render_str("{{&name}}", &data), "<b>Bob</b>");
    }

    #[test]
    fn missing_key_renders_nothing() {
        let data = json!({});
        assert_eq!(render_str("[{{missing}}]", &data), "[]");
    }

    #[test]
    fn section_repeats_over_array() {
        let data = json!({"items": [{"n": 1}, {"n": 2}, {"n": 3}]});
        assert_eq!(render_str("{{#items}}{{n}}{{/items}}", &data), "123");
    }

    #[test]
    fn inverted_section_renders_when_falsy() {
        let data = json!({"items": []});
        assert_eq!(render_str("{{^items}}empty{{/items}}", &data), "empty");
        let data = json!({"items": [1]});
        assert_eq!(render_str("{{^items}}empty{{/items}}", &data), "");
    }

    #[test]
    fn standalone_section_tags_remove_their_own_lines() {
        let data = json!({"items": [{"url": "#Red", "name": "red"}, {"url": "#Green", "name": "green"}]});
        let template = "{{#items}}\n    <li><a href=\"{{url}}\">{{name}}</a></li>\n{{/items}}";
        assert_eq!(
            render_str(template, &data),
            "    <li><a href=\"#Red\">red</a></li>\n    <li><a href=\"#Green\">green</a></li>\n"
        );
    }

    #[test]
    fn standalone_comment_removes_its_line() {
        let data = json!({});
        let template = "Begin.\n{{! comment }}\nEnd.\n";
        assert_eq!(render_str(template, &data), "Begin.\nEnd.\n");
    }

    #[test]
    fn set_delimiter_round_trips_back_to_default() {
        let data = json!({"a": "A", "b": "B"});
        let template = "{{=<% %>=}}<%a%><%={{ }}=%>{{b}}";
        assert_eq!(render_str(template, &data), "AB");
    }

    #[test]
    fn literal_extension_uses_key_verbatim() {
        let data = json!({"weird&key": "val"});
        assert_eq!(render_str("{{:weird&key}}", &data), "val");
    }

    #[test]
    fn raw_json_serializes_and_escapes_quotes() {
        let data = json!({"obj": {"x": 1}});
        assert_eq!(render_str("{{$obj}}", &data), "{\\\"x\\\":1}");
    }

    #[test]
    fn raw_json_on_a_string_strips_the_outer_quotes() {
        let data = json!({"s": "plain text"});
        assert_eq!(render_str("{{$s}}", &data), "plain text");
    }

    #[test]
    fn dotted_name_broken_chain_renders_nothing() {
        let data = json!({"a": {"b": "not an object"}});
        assert_eq!(render_str("[{{a.b.c}}]", &data), "[]");
    }

    #[test]
    fn truthy_falsy_sections_from_numbers_and_strings() {
        let data = json!({"zero": 0, "one": 1, "empty": "", "text": "x"});
        assert_eq!(render_str("{{#zero}}Y{{/zero}}", &data), "");
        assert_eq!(render_str("{{#one}}Y{{/one}}", &data), "Y");
        assert_eq!(render_str("{{#empty}}Y{{/empty}}", &data), "Y");
        assert_eq!(render_str("{{#text}}Y{{/text}}", &data), "Y");
        assert_eq!(render_str("{{#missing}}Y{{/missing}}", &data), "");
    }

    #[test]
    fn mismatched_end_section_is_an_error() {
        let data = json!({"a": true});
        let err = render_str_err("{{#a}}x{{/b}}", &data);
        assert_eq!(err.kind(), "SectionMismatch");
    }

    fn render_str_err(template: &str, data: &Json) -> RenderError {
        let mut stack = ContextStack::new(data);
        let mut out = String::new();
        let dir = PathBuf::new();
        render_compilation_unit(template, &mut stack, &mut out, &dir, &dir, &FsPartialLoader, 0).unwrap_err()
    }
}
