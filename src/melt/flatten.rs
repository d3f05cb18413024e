use serde_json::{Map, Value};

/// Separator joining nested key paths
pub const KEY_SEPARATOR: &str = "_";

/// Inline nested objects into `_`-joined key paths.
///
/// `{"a": {"b": 1, "c": {"d": 2}}}` becomes `{"a_b": 1, "a_c_d": 2}`.
/// Lists and scalars are carried over untouched.
pub fn flatten(record: Map<String, Value>) -> Map<String, Value> {
    let mut flat = Map::new();
    flatten_into(&mut flat, None, record, KEY_SEPARATOR);
    flat
}

fn flatten_into(
    flat: &mut Map<String, Value>,
    prefix: Option<&str>,
    record: Map<String, Value>,
    separator: &str,
) {
    for (key, value) in record {
        let path = match prefix {
            Some(prefix) => format!("{prefix}{separator}{key}"),
            None => key,
        };
        match value {
            Value::Object(nested) => flatten_into(flat, Some(&path), nested, separator),
            other => {
                flat.insert(path, other);
            }
        }
    }
}
