//! Property-based tests for rule evaluation using proptest.

use codesite_rules::{Facts, MatchMode, Op, Rule, RuleSet, Value};
use proptest::prelude::*;

// ============================================================================
// Test helpers
// ============================================================================

#[derive(Debug, Clone)]
struct TestRequest {
    post_type: String,
    categories: Vec<String>,
    logged_in: bool,
}

impl Facts for TestRequest {
    fn fact(&self, field: &str) -> Option<Value<'_>> {
        match field {
            "post_type" => Some(Value::Text(&self.post_type)),
            "category" => Some(Value::list(&self.categories)),
            "logged_in" => Some(Value::Bool(self.logged_in)),
            _ => None,
        }
    }
}

fn request_strategy() -> impl Strategy<Value = TestRequest> {
    (
        "[a-z]{1,6}",
        prop::collection::vec("[a-z]{1,6}", 0..5),
        any::<bool>(),
    )
        .prop_map(|(post_type, categories, logged_in)| TestRequest {
            post_type,
            categories,
            logged_in,
        })
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Is),
        Just(Op::IsNot),
        Just(Op::Contains),
        Just(Op::NotContains),
    ]
}

fn rule_strategy() -> impl Strategy<Value = Rule> {
    (
        prop_oneof![Just("post_type"), Just("category"), Just("logged_in")],
        op_strategy(),
        "[a-z]{0,6}",
    )
        .prop_map(|(field, op, value)| Rule::new(field, op, value))
}

fn negate(op: &Op) -> Op {
    match op {
        Op::Is => Op::IsNot,
        Op::IsNot => Op::Is,
        Op::Contains => Op::NotContains,
        Op::NotContains => Op::Contains,
        other => other.clone(),
    }
}

// ============================================================================
// Property tests
// ============================================================================

proptest! {
    /// A rule and its negated form always disagree.
    #[test]
    fn negation_flips_result(request in request_strategy(), rule in rule_strategy()) {
        let negated = Rule::new(rule.field.clone(), negate(&rule.operator), rule.value.clone());
        prop_assert_ne!(rule.evaluate(&request), negated.evaluate(&request));
    }

    /// An AND tree is true exactly when every rule is true.
    #[test]
    fn all_is_conjunction(
        request in request_strategy(),
        rules in prop::collection::vec(rule_strategy(), 1..6),
    ) {
        let set = RuleSet { match_mode: MatchMode::All, rules: rules.clone() };
        let expected = rules.iter().all(|r| r.evaluate(&request));
        prop_assert_eq!(set.evaluate(&request), expected);
    }

    /// An OR tree is true exactly when some rule is true.
    #[test]
    fn any_is_disjunction(
        request in request_strategy(),
        rules in prop::collection::vec(rule_strategy(), 1..6),
    ) {
        let set = RuleSet { match_mode: MatchMode::Any, rules: rules.clone() };
        let expected = rules.iter().any(|r| r.evaluate(&request));
        prop_assert_eq!(set.evaluate(&request), expected);
    }

    /// Rule trees survive a JSON round trip with the same verdict.
    #[test]
    fn json_round_trip_preserves_verdict(
        request in request_strategy(),
        rules in prop::collection::vec(rule_strategy(), 0..4),
        any_mode in any::<bool>(),
    ) {
        let set = RuleSet {
            match_mode: if any_mode { MatchMode::Any } else { MatchMode::All },
            rules,
        };
        let json = serde_json::to_string(&set).unwrap();
        let parsed = RuleSet::from_json(&json);
        prop_assert_eq!(&parsed, &set);
        prop_assert_eq!(parsed.evaluate(&request), set.evaluate(&request));
    }

    /// Arbitrary text never panics; whatever does not decode is unconditional.
    #[test]
    fn lenient_parse_never_panics(input in ".{0,64}") {
        let set = RuleSet::from_json(&input);
        let request = TestRequest {
            post_type: "post".into(),
            categories: vec![],
            logged_in: false,
        };
        if set.is_unconditional() {
            prop_assert!(set.evaluate(&request));
        }
    }
}
