use super::ordering::equal;
use serde_json::Value;

/// `container @> contained` with jsonb rules:
///
/// - an object contains another when every key of the right side is present
///   and its value is contained, recursively;
/// - an array contains another when every right element is contained in some
///   left element, ignoring order and duplicates;
/// - a top-level array contains a bare scalar equal to one of its elements;
/// - scalars contain only equal scalars.
pub fn contains(container: &Value, contained: &Value) -> bool {
    contains_at(container, contained, true)
}

fn contains_at(container: &Value, contained: &Value, top_level: bool) -> bool {
    match (container, contained) {
        (Value::Object(left), Value::Object(right)) => right.iter().all(|(key, value)| {
            left.get(key)
                .is_some_and(|candidate| contains_at(candidate, value, false))
        }),
        (Value::Array(left), Value::Array(right)) => right.iter().all(|wanted| {
            left.iter().any(|candidate| match (candidate, wanted) {
                (Value::Object(_), Value::Object(_)) | (Value::Array(_), Value::Array(_)) => {
                    contains_at(candidate, wanted, false)
                }
                (Value::Object(_) | Value::Array(_), _) | (_, Value::Object(_) | Value::Array(_)) => {
                    false
                }
                _ => equal(candidate, wanted),
            })
        }),
        (Value::Array(left), scalar) if top_level && is_scalar(scalar) => {
            left.iter().any(|candidate| is_scalar(candidate) && equal(candidate, scalar))
        }
        (Value::Object(_) | Value::Array(_), _) | (_, Value::Object(_) | Value::Array(_)) => false,
        _ => equal(container, contained),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}
