use serde_json::{Map, Number, Value};
use std::cmp::Ordering;

/// jsonb equality: numbers compare by value, so `1` equals `1.0`.
pub fn equal(a: &Value, b: &Value) -> bool {
    compare(a, b) == Ordering::Equal
}

/// Total order over jsonb values.
///
/// Object > Array > Boolean > Number > String > Null. Containers with more
/// members sort after those with fewer; equal-sized objects compare keys
/// (shorter first, then bytewise) and values pairwise, arrays element-wise.
pub fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x.len().cmp(&y.len()).then_with(|| {
            x.iter()
                .zip(y)
                .map(|(l, r)| compare(l, r))
                .find(|ord| ord.is_ne())
                .unwrap_or(Ordering::Equal)
        }),
        (Value::Object(x), Value::Object(y)) => {
            x.len().cmp(&y.len()).then_with(|| compare_objects(x, y))
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::String(_) => 1,
        Value::Number(_) => 2,
        Value::Bool(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_numbers(x: &Number, y: &Number) -> Ordering {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a.cmp(&b);
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return a.cmp(&b);
    }
    let a = x.as_f64().unwrap_or(f64::NAN);
    let b = y.as_f64().unwrap_or(f64::NAN);
    a.total_cmp(&b)
}

fn compare_objects(x: &Map<String, Value>, y: &Map<String, Value>) -> Ordering {
    let left = sorted_entries(x);
    let right = sorted_entries(y);

    for ((lk, _), (rk, _)) in left.iter().zip(&right) {
        let ord = lk.len().cmp(&rk.len()).then_with(|| lk.cmp(rk));
        if ord.is_ne() {
            return ord;
        }
    }
    for ((_, lv), (_, rv)) in left.iter().zip(&right) {
        let ord = compare(lv, rv);
        if ord.is_ne() {
            return ord;
        }
    }
    Ordering::Equal
}

fn sorted_entries(map: &Map<String, Value>) -> Vec<(&String, &Value)> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_ranks() {
        let ascending = [
            json!(null),
            json!("z"),
            json!(-5),
            json!(false),
            json!([]),
            json!({}),
        ];
        for pair in ascending.windows(2) {
            assert_eq!(compare(&pair[0], &pair[1]), Ordering::Less, "{:?}", pair);
        }
    }

    #[test]
    fn test_numbers() {
        assert!(equal(&json!(1), &json!(1.0)));
        assert_eq!(compare(&json!(9), &json!(10)), Ordering::Less);
        assert_eq!(compare(&json!(2.5), &json!(2)), Ordering::Greater);
        assert_eq!(compare(&json!(u64::MAX), &json!(1)), Ordering::Greater);
    }

    #[test]
    fn test_containers() {
        assert_eq!(compare(&json!([9]), &json!([1, 2])), Ordering::Less);
        assert_eq!(compare(&json!([1, 3]), &json!([1, 2])), Ordering::Greater);
        assert!(equal(&json!({"a": 1, "b": [2]}), &json!({"b": [2.0], "a": 1})));
        assert_eq!(compare(&json!({"b": 1}), &json!({"aa": 1})), Ordering::Less);
    }
}
