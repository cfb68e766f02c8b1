use super::Predicate;
use super::predicate::TailKind;
use crate::core::Param;

/// Post-predicate transform applied in call order.
///
/// `Limit` and `Offset` render in the order they were first applied; applying
/// one again replaces its value. `OrderBy` keys accumulate and always render
/// before the limit/offset tail. No ordering is ever implied: callers that
/// paginate must supply their own sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryModifier {
    Limit(u64),
    Offset(u64),
    OrderBy { field: String, descending: bool },
}

impl QueryModifier {
    pub fn apply(&self, predicate: &mut Predicate) {
        match self {
            Self::Limit(n) => predicate.set_tail(TailKind::Limit, clamp(*n)),
            Self::Offset(n) => predicate.set_tail(TailKind::Offset, clamp(*n)),
            Self::OrderBy { field, descending } => {
                let placeholder = predicate.bind(Param::Text(field.clone()));
                let direction = if *descending { "DESC" } else { "ASC" };
                predicate.push_order(format!("attrs -> {}::text {}", placeholder, direction));
            }
        }
    }
}

fn clamp(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Cap the number of returned rows.
pub fn limit(n: u64) -> QueryModifier {
    QueryModifier::Limit(n)
}

/// Skip the first `n` rows.
pub fn offset(n: u64) -> QueryModifier {
    QueryModifier::Offset(n)
}

/// Sort ascending by a top-level attribute.
pub fn order_by(field: impl Into<String>) -> QueryModifier {
    QueryModifier::OrderBy {
        field: field.into(),
        descending: false,
    }
}

pub fn order_by_desc(field: impl Into<String>) -> QueryModifier {
    QueryModifier::OrderBy {
        field: field.into(),
        descending: true,
    }
}

impl Predicate {
    /// Apply modifiers in the order given.
    pub fn modify(mut self, modifiers: &[QueryModifier]) -> Self {
        for modifier in modifiers {
            modifier.apply(&mut self);
        }
        self
    }
}
