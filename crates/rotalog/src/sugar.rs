//! Alternating key/value arguments turned into fields

use crate::field::Field;
use serde_json::{json, Value};

pub(crate) const DANGLING_KEY_MESSAGE: &str = "Ignored key without a value.";
pub(crate) const NON_STRING_KEYS_MESSAGE: &str = "Ignored key-value pairs with non-string keys.";

/// A record describing arguments that had to be dropped
#[derive(Debug)]
pub(crate) struct Problem {
    pub message: &'static str,
    pub fields: Vec<Field>,
}

#[derive(Debug, Default)]
pub(crate) struct Sweetened {
    pub fields: Vec<Field>,
    pub problems: Vec<Problem>,
}

/// Pair up `[k1, v1, k2, v2, ...]`
///
/// Keys must be strings. A trailing key without a value and pairs with
/// non-string keys are dropped and described in `problems`.
pub(crate) fn sweeten(keys_and_values: &[Value]) -> Sweetened {
    let mut sweetened = Sweetened::default();
    let mut invalid = Vec::new();

    for (pair, chunk) in keys_and_values.chunks(2).enumerate() {
        match chunk {
            [Value::String(key), value] => {
                sweetened.fields.push(Field::new(key.clone(), value.clone()));
            }
            [key, value] => invalid.push(json!({
                "position": pair * 2,
                "key": key,
                "value": value,
            })),
            [dangling] => sweetened.problems.push(Problem {
                message: DANGLING_KEY_MESSAGE,
                fields: vec![Field::new("ignored", dangling.clone())],
            }),
            _ => {}
        }
    }

    if !invalid.is_empty() {
        sweetened.problems.push(Problem {
            message: NON_STRING_KEYS_MESSAGE,
            fields: vec![Field::new("invalid", invalid)],
        });
    }

    sweetened
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs_become_fields() {
        let sweetened = sweeten(&["user".into(), "alice".into(), "attempts".into(), 3.into()]);

        assert!(sweetened.problems.is_empty());
        assert_eq!(
            sweetened.fields,
            vec![Field::str("user", "alice"), Field::int("attempts", 3)]
        );
    }

    #[test]
    fn test_dangling_key() {
        let sweetened = sweeten(&["user".into(), "alice".into(), "orphan".into()]);

        assert_eq!(sweetened.fields.len(), 1);
        assert_eq!(sweetened.problems.len(), 1);
        assert_eq!(sweetened.problems[0].message, DANGLING_KEY_MESSAGE);
        assert_eq!(sweetened.problems[0].fields[0].value, json!("orphan"));
    }

    #[test]
    fn test_non_string_keys() {
        let sweetened = sweeten(&[json!(42), json!("answer"), json!("ok"), json!(true)]);

        assert_eq!(sweetened.fields, vec![Field::bool("ok", true)]);
        assert_eq!(sweetened.problems[0].message, NON_STRING_KEYS_MESSAGE);
        assert_eq!(
            sweetened.problems[0].fields[0].value,
            json!([{"position": 0, "key": 42, "value": "answer"}])
        );
    }

    #[test]
    fn test_empty_input() {
        let sweetened = sweeten(&[]);
        assert!(sweetened.fields.is_empty());
        assert!(sweetened.problems.is_empty());
    }
}
