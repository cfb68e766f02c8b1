use super::{Filter, Predicate};
use crate::core::{DbError, Result};
use crate::plugins::ClausePluginRegistry;
use lazy_static::lazy_static;

lazy_static! {
    static ref DEFAULT_COMPILER: FilterCompiler = FilterCompiler::new();
}

pub(crate) fn default_compiler() -> &'static FilterCompiler {
    &DEFAULT_COMPILER
}

/// Compiles a [`Filter`] into a [`Predicate`].
///
/// Each constraint is routed to the first clause plugin that accepts its
/// value; the resulting clauses are joined with `AND` in filter order, and
/// placeholders are numbered in that same order. Compilation is pure.
pub struct FilterCompiler {
    registry: ClausePluginRegistry,
}

impl FilterCompiler {
    pub fn new() -> Self {
        Self {
            registry: ClausePluginRegistry::with_default_plugins(),
        }
    }

    pub fn with_plugins(registry: ClausePluginRegistry) -> Self {
        Self { registry }
    }

    pub fn compile(&self, filter: &Filter) -> Result<Predicate> {
        let mut predicate = Predicate::match_all();

        for constraint in filter {
            if constraint.field().is_empty() {
                return Err(DbError::Encoding("constraint has an empty field name".into()));
            }

            let plugin = self.registry.find_plugin(constraint.value()).ok_or_else(|| {
                DbError::Encoding(format!(
                    "no clause plugin accepts the value for field '{}'",
                    constraint.field()
                ))
            })?;

            let clause = plugin.compile(constraint, &mut predicate)?;
            predicate.push_clause(&clause);
        }

        tracing::trace!(
            clause = predicate.clause(),
            params = predicate.params().len(),
            "compiled filter"
        );
        Ok(predicate)
    }
}

impl Default for FilterCompiler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Param;
    use crate::filter::Constraint;
    use crate::plugins::ClausePlugin;
    use crate::plugins::containment::ContainmentClause;
    use serde_json::{Value, json};

    #[test]
    fn test_empty_filter_is_match_all() {
        let predicate = Filter::new().compile().unwrap();
        assert!(predicate.is_match_all());
        assert_eq!(predicate.where_clause(), "");
        assert!(predicate.params().is_empty());
    }

    #[test]
    fn test_scalar_becomes_containment() {
        let predicate = Filter::new().with("name", "tester1").compile().unwrap();

        assert_eq!(predicate.clause(), "attrs @> $1::jsonb");
        assert_eq!(predicate.params(), &[Param::Json(json!({"name": "tester1"}))]);
    }

    #[test]
    fn test_list_becomes_membership_in_input_order() {
        let predicate = Filter::new().any_of("location", ["UK", "DE"]).compile().unwrap();

        assert_eq!(predicate.clause(), "(attrs -> $1::text) IN ($2::jsonb, $3::jsonb)");
        assert_eq!(
            predicate.params(),
            &[
                Param::Text("location".into()),
                Param::Json(json!("UK")),
                Param::Json(json!("DE")),
            ]
        );
    }

    #[test]
    fn test_conjunction_is_deterministic() {
        let filter = Filter::new()
            .with("name", "tester1")
            .any_of("age", [10, 20])
            .any_of("location", ["UK", "US"]);

        let first = filter.compile().unwrap();
        let second = filter.compile().unwrap();

        assert_eq!(first, second);
        assert_eq!(
            first.clause(),
            "attrs @> $1::jsonb \
             AND (attrs -> $2::text) IN ($3::jsonb, $4::jsonb) \
             AND (attrs -> $5::text) IN ($6::jsonb, $7::jsonb)"
        );
        assert_eq!(first.params().len(), 7);
    }

    #[test]
    fn test_caller_text_never_reaches_clause() {
        let hostile = "x' OR '1'='1";
        let predicate = Filter::new()
            .with(hostile, hostile)
            .any_of(hostile, [hostile])
            .compile()
            .unwrap();

        assert!(!predicate.clause().contains(hostile));
        assert!(!predicate.clause().contains('\''));
    }

    #[test]
    fn test_mixed_list_is_rejected() {
        let err = Filter::new()
            .with("age", json!([10, "20"]))
            .compile()
            .unwrap_err();
        assert!(matches!(err, DbError::Encoding(_)));
        assert!(err.to_string().contains("age"));
    }

    #[test]
    fn test_non_scalar_list_element_is_rejected() {
        for list in [json!([{"a": 1}]), json!([[1], [2]]), json!([null])] {
            let err = Filter::new().with("k", list).compile().unwrap_err();
            assert!(matches!(err, DbError::Encoding(_)));
        }
    }

    #[test]
    fn test_int_and_float_share_a_kind() {
        let predicate = Filter::new().with("score", json!([1, 2.5])).compile().unwrap();
        assert_eq!(predicate.params().len(), 3);
    }

    #[test]
    fn test_empty_list_matches_nothing() {
        let predicate = Filter::new()
            .with("name", "a")
            .any_of("age", Vec::<i64>::new())
            .compile()
            .unwrap();
        assert_eq!(predicate.clause(), "attrs @> $1::jsonb AND FALSE");
        assert_eq!(predicate.params().len(), 1);
    }

    #[test]
    fn test_empty_field_is_rejected() {
        let err = Filter::new().with("", 1).compile().unwrap_err();
        assert!(matches!(err, DbError::Encoding(_)));
    }

    #[test]
    fn test_nested_object_is_containment() {
        let predicate = Filter::new()
            .with("address", json!({"city": "London"}))
            .compile()
            .unwrap();
        assert_eq!(
            predicate.params(),
            &[Param::Json(json!({"address": {"city": "London"}}))]
        );
    }

    struct ExistsClause;

    impl ClausePlugin for ExistsClause {
        fn name(&self) -> &'static str {
            "EXISTS"
        }

        fn can_handle(&self, value: &Value) -> bool {
            value.is_null()
        }

        fn compile(&self, constraint: &Constraint, predicate: &mut Predicate) -> Result<String> {
            let field = predicate.bind(Param::Text(constraint.field().to_string()));
            Ok(format!("NOT (attrs ? {}::text)", field))
        }
    }

    #[test]
    fn test_custom_plugin_registry() {
        let mut registry = ClausePluginRegistry::new();
        registry.register(Box::new(ExistsClause));
        registry.register(Box::new(ContainmentClause));
        assert_eq!(registry.len(), 2);

        let compiler = FilterCompiler::with_plugins(registry);
        let predicate = compiler
            .compile(&Filter::new().with("deleted", Value::Null).with("name", "a"))
            .unwrap();

        assert_eq!(predicate.clause(), "NOT (attrs ? $1::text) AND attrs @> $2::jsonb");
    }

    #[test]
    fn test_empty_registry_rejects_constraints() {
        let compiler = FilterCompiler::with_plugins(ClausePluginRegistry::new());
        assert!(compiler.compile(&Filter::new()).is_ok());
        assert!(matches!(
            compiler.compile(&Filter::new().with("a", 1)),
            Err(DbError::Encoding(_))
        ));
    }
}
