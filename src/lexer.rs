//! The tag lexer: finds the next `{{ ... }}`-delimited tag in a template and
//! classifies it by its leading sigil.
//!
//! A flat, explicit byte-offset scan — no regex, no lookahead table, just an
//! index walked forward through the source: locate `open`, locate the
//! matching `close`, classify the sigil. Mustache tags never nest, so there's
//! no need for the depth tracking a more general markup scanner would want.

use crate::error::{RenderError, Result};

/// Section nesting key length cap; a key longer than this is a parse error.
pub const MAX_KEY_LEN: usize = 1024;

/// The current opening/closing delimiter pair. Mutable via a Set-Delimiter
/// tag; a fresh pair is used for every partial's compilation unit.
#[derive(Debug, Clone)]
pub struct Delimiters {
    pub open: String,
    pub close: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Delimiters { open: "{{".to_string(), close: "}}".to_string() }
    }
}

/// The kind of a tag, determined by its leading sigil.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    /// `{{! ... }}` — ignored entirely.
    Comment,
    /// `{{=... =}}` — rebinds the delimiter pair.
    SetDelimiter,
    /// `{{#name}}` — section open.
    Section,
    /// `{{^name}}` — inverted section open.
    Inverted,
    /// `{{/name}}` — end of the innermost open section.
    End,
    /// `{{>name}}` — partial inclusion.
    Partial,
    /// `{{{name}}}` or `{{&name}}` — unescaped interpolation.
    Raw,
    /// `{{:name}}` — interpolate `name` verbatim, escaped like a plain tag.
    Literal,
    /// `{{$name}}` — raw JSON serialization (extension).
    RawJson,
    /// `{{name}}` — HTML-escaped interpolation.
    Escaped,
}

impl TagKind {
    /// `>`, `#`, `^`, `/`, `!`, `=` tags may be standalone; interpolation
    /// tags (including the `:` and `$` extensions) may not.
    pub fn can_be_standalone(self) -> bool {
        matches!(
            self,
            TagKind::Comment
                | TagKind::SetDelimiter
                | TagKind::Section
                | TagKind::Inverted
                | TagKind::End
                | TagKind::Partial
        )
    }
}

/// A single lexed tag.
#[derive(Debug)]
pub struct Tag<'t> {
    pub kind: TagKind,
    /// For `Comment`/`SetDelimiter`, the raw tag body. For everything else,
    /// the sigil-stripped, whitespace-trimmed key text.
    pub key: &'t str,
    /// Byte offset of the opening delimiter.
    pub start: usize,
    /// Byte offset immediately after the closing delimiter (including any
    /// extra brace consumed for a triple-mustache tag).
    pub end: usize,
    pub standalone: bool,
}

/// Strip a single leading sigil character (after left-trimming) and trim
/// whitespace from both sides of what remains.
fn strip_sigil_and_trim(raw_body: &str) -> &str {
    let left_trimmed = raw_body.trim_start();
    let sigil_len = left_trimmed.chars().next().map(char::len_utf8).unwrap_or(0);
    left_trimmed[sigil_len..].trim()
}

/// Is every character from the previous line break (or start of input) up
/// to `start`, and from `end` to the next line break (or end of input),
/// a space or a tab?
fn is_standalone(template: &str, start: usize, end: usize) -> bool {
    let bytes = template.as_bytes();

    let mut i = start;
    while i > 0 && (bytes[i - 1] == b' ' || bytes[i - 1] == b'\t') {
        i -= 1;
    }
    if !(i == 0 || bytes[i - 1] == b'\n' || bytes[i - 1] == b'\r') {
        return false;
    }

    let mut j = end;
    while j < bytes.len() && (bytes[j] == b' ' || bytes[j] == b'\t') {
        j += 1;
    }
    j == bytes.len() || bytes[j] == b'\n' || bytes[j] == b'\r'
}

/// Locate and classify the next tag at or after byte offset `from`.
///
/// Returns `Ok(None)` once no further opening delimiter is found — the rest
/// of the template is plain literal text.
pub fn next_tag<'t>(template: &'t str, from: usize, delims: &Delimiters) -> Result<Option<Tag<'t>>> {
    let Some(rel) = template[from..].find(delims.open.as_str()) else {
        return Ok(None);
    };
    let start = from + rel;
    let body_start = start + delims.open.len();

    let Some(rel_close) = template[body_start..].find(delims.close.as_str()) else {
        return Err(RenderError::unterminated_tag(start));
    };
    let mut body_end = body_start + rel_close;
    let mut end = body_end + delims.close.len();

    let raw_body = &template[body_start..body_end];
    let sigil = raw_body.trim_start().chars().next();

    let (kind, key) = match sigil {
        Some('!') => (TagKind::Comment, raw_body),
        Some('=') => (TagKind::SetDelimiter, raw_body),
        Some('{') => {
            let close_is_all_braces =
                !delims.close.is_empty() && delims.close.bytes().all(|b| b == b'}');
            if close_is_all_braces {
                if template.as_bytes().get(end) != Some(&b'}') {
                    return Err(RenderError::missing_triple_close(start));
                }
                end += 1;
                (TagKind::Raw, strip_sigil_and_trim(raw_body))
            } else {
                if !raw_body.ends_with('}') {
                    return Err(RenderError::missing_triple_close(start));
                }
                body_end -= 1;
                (TagKind::Raw, strip_sigil_and_trim(&template[body_start..body_end]))
            }
        }
        Some('#') => (TagKind::Section, strip_sigil_and_trim(raw_body)),
        Some('^') => (TagKind::Inverted, strip_sigil_and_trim(raw_body)),
        Some('/') => (TagKind::End, strip_sigil_and_trim(raw_body)),
        Some('&') => (TagKind::Raw, strip_sigil_and_trim(raw_body)),
        Some('>') => (TagKind::Partial, strip_sigil_and_trim(raw_body)),
        Some(':') => (TagKind::Literal, strip_sigil_and_trim(raw_body)),
        Some('$') => (TagKind::RawJson, strip_sigil_and_trim(raw_body)),
        _ => (TagKind::Escaped, raw_body.trim()),
    };

    if !matches!(kind, TagKind::Comment | TagKind::SetDelimiter) && key.len() > MAX_KEY_LEN {
        return Err(RenderError::key_too_long(start, key.len()));
    }

    let standalone = kind.can_be_standalone() && is_standalone(template, start, end);

    Ok(Some(Tag { kind, key, start, end, standalone }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_every_sigil() {
        let t = "{{! c }}{{=<< >>=}}<<#a>><</a>><<^b>><</b>>{{&c}}{{>p}}{{:d}}{{$e}}{{f}}{{{g}}}";
        // after the set-delimiter tag, subsequent tags use << >>.
        let delims = Delimiters::default();
        let mut pos = 0;
        let mut kinds = Vec::new();
        let mut current = delims;
        while let Some(tag) = next_tag(t, pos, &current).unwrap() {
            kinds.push(tag.kind);
            if tag.kind == TagKind::SetDelimiter {
                current = Delimiters { open: "<<".into(), close: ">>".into() };
            }
            pos = tag.end;
        }
        assert_eq!(
            kinds,
            vec![
                TagKind::Comment,
                TagKind::SetDelimiter,
                TagKind::Section,
                TagKind::End,
                TagKind::Inverted,
                TagKind::End,
                TagKind::Raw,
                TagKind::Partial,
                TagKind::Literal,
                TagKind::RawJson,
                TagKind::Escaped,
                TagKind::Raw,
            ]
        );
    }

    #[test]
    fn key_is_trimmed_and_sigil_stripped() {
        let delims = Delimiters::default();
        let tag = next_tag("{{  #  items  }}", 0, &delims).unwrap().unwrap();
        assert_eq!(tag.kind, TagKind::Section);
        assert_eq!(tag.key, "items");
    }

    #[test]
    fn unterminated_tag_is_an_error() {
        let delims = Delimiters::default();
        let err = next_tag("{{name", 0, &delims).unwrap_err();
        assert_eq!(err.kind(), "UnterminatedTag");
    }

    #[test]
    fn key_too_long_is_an_error() {
        let long_key = "x".repeat(MAX_KEY_LEN + 1);
        let template = format!("{{{{{long_key}}}}}");
        let delims = Delimiters::default();
        let err = next_tag(&template, 0, &delims).unwrap_err();
        assert_eq!(err.kind(), "KeyTooLong");
    }

    #[test]
    fn triple_mustache_default_delimiters() {
        let delims = Delimiters::default();
        let tag = next_tag("{{{name}}}", 0, &delims).unwrap().unwrap();
        assert_eq!(tag.kind, TagKind::Raw);
        assert_eq!(tag.key, "name");
        assert_eq!(tag.end, 10);
    }

    #[test]
    fn triple_mustache_missing_close_is_an_error() {
        let delims = Delimiters::default();
        let err = next_tag("{{{name}}", 0, &delims).unwrap_err();
        assert_eq!(err.kind(), "MissingTripleClose");
    }

    #[test]
    fn standalone_comment_on_its_own_line() {
        let delims = Delimiters::default();
        let template = "Begin.\n{{! comment }}\nEnd.\n";
        let tag = next_tag(template, 0, &delims).unwrap().unwrap();
        assert!(tag.standalone);
    }

    #[test]
    fn non_standalone_interpolation_never_standalone() {
        let delims = Delimiters::default();
        let template = "\n{{name}}\n";
        let tag = next_tag(template, 0, &delims).unwrap().unwrap();
        assert!(!tag.standalone);
    }

    #[test]
    fn inline_tag_with_surrounding_text_is_not_standalone() {
        let delims = Delimiters::default();
        let template = "a {{! c }} b";
        let tag = next_tag(template, 0, &delims).unwrap().unwrap();
        assert!(!tag.standalone);
    }
}
