//! Sanitized diagnostic snapshots of baggage.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub(crate) const TRUNCATED: &str = "[truncated]";
pub(crate) const REDACTED: &str = "[redacted]";
pub(crate) const OMITTED: &str = "[omitted]";

fn default_max_depth() -> usize {
    6
}

fn default_max_string_len() -> usize {
    2048
}

fn default_max_array_len() -> usize {
    50
}

fn default_redacted_fields() -> Vec<String> {
    [
        "api_key",
        "apikey",
        "authorization",
        "secret",
        "password",
        "private_key",
        "access_token",
        "refresh_token",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Limits applied when producing a baggage snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotPolicy {
    /// Objects and arrays nested deeper than this are replaced.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Strings longer than this many characters are cut.
    #[serde(default = "default_max_string_len")]
    pub max_string_len: usize,
    /// Arrays longer than this keep only their head.
    #[serde(default = "default_max_array_len")]
    pub max_array_len: usize,
    /// Field names whose values are never emitted. A field matches when its
    /// lowercased name equals an entry or ends with `_<entry>`.
    #[serde(default = "default_redacted_fields")]
    pub redacted_fields: Vec<String>,
    /// Baggage slots left out of the snapshot entirely.
    #[serde(default)]
    pub omit_keys: Vec<String>,
}

impl Default for SnapshotPolicy {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_string_len: default_max_string_len(),
            max_array_len: default_max_array_len(),
            redacted_fields: default_redacted_fields(),
            omit_keys: Vec::new(),
        }
    }
}

impl SnapshotPolicy {
    /// Sets the maximum nesting depth.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Sets the maximum string length.
    #[must_use]
    pub fn with_max_string_len(mut self, len: usize) -> Self {
        self.max_string_len = len;
        self
    }

    /// Sets the maximum array length.
    #[must_use]
    pub fn with_max_array_len(mut self, len: usize) -> Self {
        self.max_array_len = len;
        self
    }

    /// Omits a baggage slot from the snapshot.
    #[must_use]
    pub fn omit(mut self, key: impl Into<String>) -> Self {
        self.omit_keys.push(key.into());
        self
    }

    pub(crate) fn is_omitted(&self, key: &str) -> bool {
        self.omit_keys.iter().any(|k| k == key)
    }

    fn is_sensitive(&self, field: &str) -> bool {
        let field = field.to_lowercase().replace('-', "_");
        self.redacted_fields.iter().any(|name| {
            field == *name
                || field
                    .strip_suffix(name.as_str())
                    .is_some_and(|head| head.ends_with('_'))
        })
    }

    pub(crate) fn sanitize(&self, value: Value) -> Value {
        self.sanitize_at(value, 0)
    }

    fn sanitize_at(&self, value: Value, depth: usize) -> Value {
        match value {
            Value::String(s) => Value::String(self.cut_string(s)),
            Value::Array(_) | Value::Object(_) if depth >= self.max_depth => {
                Value::String(TRUNCATED.to_string())
            }
            Value::Array(items) => {
                let total = items.len();
                let mut out: Vec<Value> = items
                    .into_iter()
                    .take(self.max_array_len)
                    .map(|item| self.sanitize_at(item, depth + 1))
                    .collect();
                if total > self.max_array_len {
                    out.push(Value::String(format!(
                        "{TRUNCATED} {} more",
                        total - self.max_array_len
                    )));
                }
                Value::Array(out)
            }
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| {
                        let v = if self.is_sensitive(&k) {
                            Value::String(REDACTED.to_string())
                        } else {
                            self.sanitize_at(v, depth + 1)
                        };
                        (k, v)
                    })
                    .collect(),
            ),
            other => other,
        }
    }

    fn cut_string(&self, s: String) -> String {
        if s.chars().count() <= self.max_string_len {
            return s;
        }
        let head: String = s.chars().take(self.max_string_len).collect();
        format!("{head}...{TRUNCATED}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baggage::{Baggage, Key};
    use serde::Serialize;
    use serde_json::json;

    #[derive(Serialize)]
    struct Provider {
        name: String,
        api_key: String,
        client_secret: String,
        token: String,
    }

    const PROVIDER: Key<Provider> = Key::new("provider");
    const BLOB: Key<String> = Key::new("blob");
    const TREE: Key<Value> = Key::new("tree");
    const LIST: Key<Vec<u32>> = Key::new("list");

    #[test]
    fn test_redacts_sensitive_fields() {
        let baggage = Baggage::new().with(
            &PROVIDER,
            Provider {
                name: "openai".to_string(),
                api_key: "sk-123".to_string(),
                client_secret: "shh".to_string(),
                token: "0xabc".to_string(),
            },
        );

        let snapshot = baggage.sanitized_snapshot(&SnapshotPolicy::default());
        assert_eq!(snapshot["provider"]["name"], "openai");
        assert_eq!(snapshot["provider"]["api_key"], REDACTED);
        assert_eq!(snapshot["provider"]["client_secret"], REDACTED);
        assert_eq!(snapshot["provider"]["token"], "0xabc");
    }

    #[test]
    fn test_truncates_long_strings_and_arrays() {
        let baggage = Baggage::new()
            .with(&BLOB, "x".repeat(20))
            .with(&LIST, (0..10).collect());
        let policy = SnapshotPolicy::default()
            .with_max_string_len(5)
            .with_max_array_len(3);

        let snapshot = baggage.sanitized_snapshot(&policy);
        assert_eq!(snapshot["blob"], format!("xxxxx...{TRUNCATED}"));
        assert_eq!(snapshot["list"], json!([0, 1, 2, "[truncated] 7 more"]));
    }

    #[test]
    fn test_cuts_deep_subtrees() {
        let baggage = Baggage::new().with(&TREE, json!({"a": {"b": {"c": [1]}}}));
        let snapshot = baggage.sanitized_snapshot(&SnapshotPolicy::default().with_max_depth(2));
        assert_eq!(snapshot["tree"], json!({"a": {"b": TRUNCATED}}));
    }

    #[test]
    fn test_omits_keys() {
        let baggage = Baggage::new().with(&BLOB, "visible".to_string());
        let snapshot = baggage.sanitized_snapshot(&SnapshotPolicy::default().omit("blob"));
        assert_eq!(snapshot["blob"], OMITTED);
    }
}
