//! Feed decoding at the external-interface boundary.
//!
//! The UI driver captures raw JSON (fixture snapshots, settled-event
//! notifications) and the operator maintains a rule table. Everything
//! here maps those loosely-typed documents into the fixed core types
//! once, so selection and settlement never see alternate key names.
//!
//! Record-level problems are Malformed: the record is skipped with a
//! warning and the rest of the document still decodes.

pub mod fixtures;
pub mod rules;
pub mod settled;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub use fixtures::{decode_fixture_snapshot, parse_fixture_snapshot};
pub use rules::{decode_rule_table, parse_rule_table};
pub use settled::{decode_settled_events, parse_settled_payload};

/// Render a JSON scalar as a trimmed string; numbers keep their JSON text.
/// Empty strings, null, booleans and containers yield `None`.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Serde helper for ids that arrive either as numbers or strings.
pub(crate) fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(scalar_to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_to_string() {
        assert_eq!(scalar_to_string(&json!(" 12 ")), Some("12".to_string()));
        assert_eq!(scalar_to_string(&json!(42)), Some("42".to_string()));
        assert_eq!(scalar_to_string(&json!("")), None);
        assert_eq!(scalar_to_string(&json!(null)), None);
        assert_eq!(scalar_to_string(&json!([1])), None);
    }
}
