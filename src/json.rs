//! The JSON value abstraction the renderer walks.
//!
//! Parsing JSON text is out of scope for this crate — that is `serde_json`'s
//! job, an external collaborator. This module adds the handful of
//! Mustache-specific semantics that sit on top of a generic `serde_json::Value`
//! tree: truthiness for section control, and the "broken chain" dotted-path
//! lookup rule.

pub use serde_json::Value as Json;

/// Is `v` falsy for the purposes of `#`/`^` section control?
///
/// Falsy: `false`, a number equal to zero, an empty array, `null`. Everything
/// else — including an empty string and an empty object — is truthy.
pub fn is_falsy(v: &Json) -> bool {
    match v {
        Json::Null => true,
        Json::Bool(b) => !b,
        Json::Number(n) => n.as_f64().map(|f| f == 0.0).unwrap_or(false),
        Json::Array(a) => a.is_empty(),
        Json::String(_) | Json::Object(_) => false,
    }
}

/// Look up `key` as a single (non-dotted) path component of an object.
fn object_get<'a>(v: &'a Json, key: &str) -> Option<&'a Json> {
    v.as_object().and_then(|o| o.get(key))
}

/// Resolve a (possibly dotted) name against a single object value, applying
/// the "broken chain" rule: every component after the first must resolve
/// against the previous step's *object*, or the whole lookup fails.
pub fn dotted_get<'a>(v: &'a Json, name: &str) -> Option<&'a Json> {
    let mut components = name.split('.');
    let mut current = object_get(v, components.next()?)?;
    for component in components {
        current = object_get(current, component)?;
    }
    Some(current)
}

/// Does `v` (assumed to be an object) contain `name`, following dotted-path
/// semantics? Used by the context stack to decide which frame a name
/// resolves against.
pub fn dotted_has(v: &Json, name: &str) -> bool {
    v.is_object() && dotted_get(v, name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn falsy_values() {
        assert!(is_falsy(&json!(false)));
        assert!(is_falsy(&json!(0)));
        assert!(is_falsy(&json!(0.0)));
        assert!(is_falsy(&json!([])));
        assert!(is_falsy(&json!(null)));
    }

    #[test]
    fn truthy_values() {
        assert!(!is_falsy(&json!(true)));
        assert!(!is_falsy(&json!(1)));
        assert!(!is_falsy(&json!("")));
        assert!(!is_falsy(&json!({})));
        assert!(!is_falsy(&json!([1])));
    }

    #[test]
    fn dotted_lookup_arbitrary_depth() {
        let v = json!({"a": {"b": {"c": {"d": {"e": {"name": "Phil"}}}}}});
        assert_eq!(dotted_get(&v, "a.b.c.d.e.name").unwrap(), "Phil");
    }

    #[test]
    fn dotted_lookup_broken_chain() {
        let v = json!({"a": {"b": "not an object"}});
        assert!(dotted_get(&v, "a.b.c").is_none());
    }

    #[test]
    fn dotted_has_requires_object() {
        let v = json!("just a string");
        assert!(!dotted_has(&v, "anything"));
    }
}
