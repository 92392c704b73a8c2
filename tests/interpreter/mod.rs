#![cfg(test)]

use anyhow::{bail, Result};
use jsonlogic::{apply, build, Error, Value};
use serde_json::json;

fn eval(rule: serde_json::Value, data: serde_json::Value) -> Result<Value> {
    apply(&rule, &data)
}

fn ints(values: &[i64]) -> Value {
    Value::from(values.iter().map(|i| Value::Int(*i)).collect::<Vec<_>>())
}

//
// arithmetic

#[test]
fn addition_coerces_string_operands() -> Result<()> {
    assert_eq!(eval(json!({"+": [1, "2"]}), json!({}))?, Value::Int(3));
    Ok(())
}

#[test]
fn single_operand_plus_still_numerifies() -> Result<()> {
    assert_eq!(eval(json!({"+": ["3.5"]}), json!({}))?, Value::Float(3.5));
    assert_eq!(eval(json!({"+": ["4"]}), json!({}))?, Value::Int(4));
    Ok(())
}

#[test]
fn subtraction_is_binary_or_unary() -> Result<()> {
    assert_eq!(eval(json!({"-": [2, 3]}), json!({}))?, Value::Int(-1));
    assert_eq!(eval(json!({"-": [5]}), json!({}))?, Value::Int(-5));
    Ok(())
}

#[test]
fn division_stays_integral_when_exact() -> Result<()> {
    assert_eq!(eval(json!({"/": [4, 2]}), json!({}))?, Value::Int(2));
    assert_eq!(eval(json!({"/": [5, 2]}), json!({}))?, Value::Float(2.5));
    Ok(())
}

#[test]
fn division_by_zero_is_null() -> Result<()> {
    assert_eq!(eval(json!({"/": [5, 0]}), json!({}))?, Value::Null);
    Ok(())
}

#[test]
fn modulo() -> Result<()> {
    assert_eq!(eval(json!({"%": [101, 2]}), json!({}))?, Value::Int(1));
    assert_eq!(eval(json!({"%": [5, 0]}), json!({}))?, Value::Null);
    Ok(())
}

#[test]
fn modulo_rejects_floats() {
    assert!(eval(json!({"%": [1.5, 2]}), json!({})).is_err());
}

#[test]
fn null_operand_nulls_arithmetic() -> Result<()> {
    assert_eq!(eval(json!({"+": [1, null]}), json!({}))?, Value::Null);
    assert_eq!(eval(json!({"*": [null, 3]}), json!({}))?, Value::Null);
    assert_eq!(eval(json!({"+": [1, true]}), json!({}))?, Value::Null);
    Ok(())
}

#[test]
fn non_numeric_string_is_a_type_error() {
    assert!(eval(json!({"+": [1, "pie"]}), json!({})).is_err());
}

#[test]
fn min_max_fold() -> Result<()> {
    assert_eq!(eval(json!({"min": [3, 1, 2]}), json!({}))?, Value::Int(1));
    assert_eq!(eval(json!({"max": [3, 7, 2]}), json!({}))?, Value::Int(7));
    assert_eq!(
        eval(json!({"min": [3, 1.5]}), json!({}))?,
        Value::Float(1.5)
    );
    Ok(())
}

#[test]
fn irreconcilable_integer_widths_are_a_range_error() {
    let err = eval(json!({"+": [-1, u64::MAX]}), json!({})).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::Range(_))
    ));
}

#[test]
fn reconcilable_widths_promote() -> Result<()> {
    // u64::MAX cannot narrow to i64, but 1 widens to u64
    assert_eq!(
        eval(json!({"==": [1, u64::MAX]}), json!({}))?,
        Value::Bool(false)
    );
    Ok(())
}

//
// logic and control

#[test]
fn and_returns_first_falsy_operand() -> Result<()> {
    assert_eq!(
        eval(json!({"and": [true, {"var": "x"}]}), json!({"x": 0}))?,
        Value::Int(0)
    );
    assert_eq!(
        eval(json!({"and": [1, "a", 3]}), json!({}))?,
        Value::Int(3)
    );
    Ok(())
}

#[test]
fn or_returns_first_truthy_operand() -> Result<()> {
    assert_eq!(eval(json!({"or": [0, "a"]}), json!({}))?, Value::from("a"));
    assert_eq!(eval(json!({"or": [false, 0]}), json!({}))?, Value::Int(0));
    Ok(())
}

#[test]
fn short_circuit_skips_remaining_operands() -> Result<()> {
    // the second operand would fail with a type error if evaluated
    assert_eq!(
        eval(json!({"or": [1, {"+": [1, "pie"]}]}), json!({}))?,
        Value::Int(1)
    );
    assert_eq!(
        eval(json!({"and": [0, {"+": [1, "pie"]}]}), json!({}))?,
        Value::Int(0)
    );
    Ok(())
}

#[test]
fn negation() -> Result<()> {
    assert_eq!(eval(json!({"!": [true]}), json!({}))?, Value::Bool(false));
    assert_eq!(eval(json!({"!": [0]}), json!({}))?, Value::Bool(true));
    assert_eq!(eval(json!({"!!": ["0"]}), json!({}))?, Value::Bool(true));
    assert_eq!(eval(json!({"!!": [[]]}), json!({}))?, Value::Bool(false));
    Ok(())
}

#[test]
fn if_selects_first_truthy_branch() -> Result<()> {
    let rule = json!({"if": [
        {"<": [{"var": "temp"}, 0]}, "freezing",
        {"<": [{"var": "temp"}, 100]}, "liquid",
        "gas"
    ]});

    assert_eq!(eval(rule.clone(), json!({"temp": -5}))?, Value::from("freezing"));
    assert_eq!(eval(rule.clone(), json!({"temp": 50}))?, Value::from("liquid"));
    assert_eq!(eval(rule, json!({"temp": 200}))?, Value::from("gas"));
    Ok(())
}

#[test]
fn if_degenerate_arities() -> Result<()> {
    assert_eq!(eval(json!({"if": []}), json!({}))?, Value::Null);
    assert_eq!(eval(json!({"if": [7]}), json!({}))?, Value::Int(7));
    assert_eq!(
        eval(json!({"if": [false, "then"]}), json!({}))?,
        Value::Null
    );
    Ok(())
}

//
// comparison

#[test]
fn chained_less_than() -> Result<()> {
    assert_eq!(eval(json!({"<": [1, 2, 3]}), json!({}))?, Value::Bool(true));
    assert_eq!(eval(json!({"<": [3, 2, 1]}), json!({}))?, Value::Bool(false));
    assert_eq!(eval(json!({"<": [1, 1, 2]}), json!({}))?, Value::Bool(false));
    assert_eq!(
        eval(json!({"<=": [1, 1, 2]}), json!({}))?,
        Value::Bool(true)
    );
    Ok(())
}

#[test]
fn loose_equality_coerces() -> Result<()> {
    assert_eq!(eval(json!({"==": ["2", 2]}), json!({}))?, Value::Bool(true));
    assert_eq!(eval(json!({"==": [1, true]}), json!({}))?, Value::Bool(true));
    assert_eq!(eval(json!({"==": [0, false]}), json!({}))?, Value::Bool(true));
    assert_eq!(eval(json!({"!=": [1, 2]}), json!({}))?, Value::Bool(true));
    Ok(())
}

#[test]
fn string_and_bool_are_never_equal() -> Result<()> {
    assert_eq!(
        eval(json!({"==": ["true", true]}), json!({}))?,
        Value::Bool(false)
    );
    Ok(())
}

#[test]
fn null_is_equal_only_to_null() -> Result<()> {
    assert_eq!(eval(json!({"==": [null, null]}), json!({}))?, Value::Bool(true));
    assert_eq!(eval(json!({"==": [null, 0]}), json!({}))?, Value::Bool(false));
    assert_eq!(eval(json!({"==": [null, ""]}), json!({}))?, Value::Bool(false));
    Ok(())
}

#[test]
fn scalar_equals_singleton_array_element() -> Result<()> {
    assert_eq!(eval(json!({"==": [1, [1]]}), json!({}))?, Value::Bool(true));
    assert_eq!(eval(json!({"==": [[1], 1]}), json!({}))?, Value::Bool(true));
    assert_eq!(eval(json!({"==": [1, [2]]}), json!({}))?, Value::Bool(false));
    Ok(())
}

#[test]
fn scalar_vs_empty_array_compares_as_falsy() -> Result<()> {
    assert_eq!(eval(json!({"==": [0, []]}), json!({}))?, Value::Bool(true));
    assert_eq!(eval(json!({"==": [1, []]}), json!({}))?, Value::Bool(false));
    Ok(())
}

#[test]
fn scalar_vs_longer_array_is_unequal() -> Result<()> {
    assert_eq!(
        eval(json!({"==": [1, [1, 2]]}), json!({}))?,
        Value::Bool(false)
    );
    Ok(())
}

#[test]
fn strict_equality_does_not_coerce() -> Result<()> {
    assert_eq!(eval(json!({"===": [1, 1]}), json!({}))?, Value::Bool(true));
    assert_eq!(eval(json!({"===": [1, "1"]}), json!({}))?, Value::Bool(false));
    assert_eq!(eval(json!({"===": [1, 1.0]}), json!({}))?, Value::Bool(false));
    assert_eq!(eval(json!({"!==": [1, "1"]}), json!({}))?, Value::Bool(true));
    Ok(())
}

#[test]
fn arrays_are_never_strictly_equal() -> Result<()> {
    assert_eq!(
        eval(json!({"===": [[1], [1]]}), json!({}))?,
        Value::Bool(false)
    );
    Ok(())
}

#[test]
fn array_comparison_is_reflexively_ordered() -> Result<()> {
    // c(a, a) is true for <= and >=, false for < and >
    for (op, expected) in [("<=", true), (">=", true), ("<", false), (">", false)] {
        let rule = json!({op: [[1, 2, 3], [1, 2, 3]]});
        assert_eq!(eval(rule, json!({}))?, Value::Bool(expected), "op {op}");
    }
    Ok(())
}

#[test]
fn arrays_compare_lexicographically() -> Result<()> {
    assert_eq!(
        eval(json!({"<": [[1, 2], [1, 3]]}), json!({}))?,
        Value::Bool(true)
    );
    assert_eq!(
        eval(json!({"<": [[1, 2], [1, 2]]}), json!({}))?,
        Value::Bool(false)
    );
    // equal prefix falls back to length
    assert_eq!(
        eval(json!({"<": [[1], [1, 0]]}), json!({}))?,
        Value::Bool(true)
    );
    assert_eq!(
        eval(json!({">": [[2], [1, 9]]}), json!({}))?,
        Value::Bool(true)
    );
    Ok(())
}

#[test]
fn null_orders_below_empty_string_only() -> Result<()> {
    assert_eq!(eval(json!({"<=": [null, ""]}), json!({}))?, Value::Bool(true));
    assert_eq!(eval(json!({">=": ["", null]}), json!({}))?, Value::Bool(true));
    assert_eq!(eval(json!({"<": [null, ""]}), json!({}))?, Value::Bool(false));
    assert_eq!(eval(json!({"<": [null, "a"]}), json!({}))?, Value::Bool(false));
    assert_eq!(eval(json!({"<": [null, 1]}), json!({}))?, Value::Bool(true));
    Ok(())
}

#[test]
fn strings_parse_against_the_numeric_side() -> Result<()> {
    assert_eq!(eval(json!({"<": ["1", 2]}), json!({}))?, Value::Bool(true));
    assert_eq!(eval(json!({"<": [1.5, "2.5"]}), json!({}))?, Value::Bool(true));
    assert_eq!(eval(json!({"<": ["a", "b"]}), json!({}))?, Value::Bool(true));
    Ok(())
}

//
// strings

#[test]
fn cat_concatenates_coerced_operands() -> Result<()> {
    assert_eq!(
        eval(json!({"cat": ["I love ", "pie"]}), json!({}))?,
        Value::from("I love pie")
    );
    assert_eq!(
        eval(json!({"cat": ["pi is ", 3.14]}), json!({}))?,
        Value::from("pi is 3.14")
    );
    assert_eq!(eval(json!({"cat": [1, 2]}), json!({}))?, Value::from("12"));
    assert_eq!(
        eval(json!({"cat": [true, " and ", null]}), json!({}))?,
        Value::from("true and null")
    );
    Ok(())
}

#[test]
fn substr_basic_and_negative_offsets() -> Result<()> {
    assert_eq!(
        eval(json!({"substr": ["jsonlogic", 4]}), json!({}))?,
        Value::from("logic")
    );
    assert_eq!(
        eval(json!({"substr": ["jsonlogic", -5]}), json!({}))?,
        Value::from("logic")
    );
    assert_eq!(
        eval(json!({"substr": ["jsonlogic", 1, 3]}), json!({}))?,
        Value::from("son")
    );
    assert_eq!(
        eval(json!({"substr": ["jsonlogic", 4, -2]}), json!({}))?,
        Value::from("log")
    );
    Ok(())
}

#[test]
fn substr_clamps_out_of_range_arguments() -> Result<()> {
    assert_eq!(
        eval(json!({"substr": ["jsonlogic", 50]}), json!({}))?,
        Value::from("")
    );
    assert_eq!(
        eval(json!({"substr": ["jsonlogic", -50]}), json!({}))?,
        Value::from("jsonlogic")
    );
    assert_eq!(
        eval(json!({"substr": ["jsonlogic", 0, 99]}), json!({}))?,
        Value::from("jsonlogic")
    );
    assert_eq!(
        eval(json!({"substr": ["ab", 0, -5]}), json!({}))?,
        Value::from("")
    );
    Ok(())
}

#[test]
fn substr_coerces_its_subject() -> Result<()> {
    assert_eq!(
        eval(json!({"substr": [3.14159, 4]}), json!({}))?,
        Value::from("159")
    );
    Ok(())
}

#[test]
fn in_matches_substrings_and_elements() -> Result<()> {
    assert_eq!(
        eval(json!({"in": ["Spring", "Springfield"]}), json!({}))?,
        Value::Bool(true)
    );
    assert_eq!(
        eval(json!({"in": ["field", "Spring"]}), json!({}))?,
        Value::Bool(false)
    );
    assert_eq!(
        eval(json!({"in": [2, [1, 2, 3]]}), json!({}))?,
        Value::Bool(true)
    );
    assert_eq!(
        eval(json!({"in": [4, [1, 2, 3]]}), json!({}))?,
        Value::Bool(false)
    );
    Ok(())
}

#[test]
fn in_element_test_is_strict() -> Result<()> {
    assert_eq!(
        eval(json!({"in": ["1", [1, 2]]}), json!({}))?,
        Value::Bool(false)
    );
    assert_eq!(
        eval(json!({"in": [1, "123"]}), json!({}))?,
        Value::Bool(false)
    );
    Ok(())
}

//
// sequences

#[test]
fn map_binds_the_current_element() -> Result<()> {
    assert_eq!(
        eval(
            json!({"map": [{"var": "xs"}, {"*": [{"var": ""}, 2]}]}),
            json!({"xs": [1, 2, 3]})
        )?,
        ints(&[2, 4, 6])
    );
    Ok(())
}

#[test]
fn filter_keeps_truthy_elements() -> Result<()> {
    assert_eq!(
        eval(
            json!({"filter": [{"var": "xs"}, {"%": [{"var": ""}, 2]}]}),
            json!({"xs": [1, 2, 3]})
        )?,
        ints(&[1, 3])
    );
    Ok(())
}

#[test]
fn reduce_folds_with_current_and_accumulator() -> Result<()> {
    assert_eq!(
        eval(
            json!({"reduce": [
                {"var": "xs"},
                {"+": [{"var": "current"}, {"var": "accumulator"}]},
                0
            ]}),
            json!({"xs": [1, 2, 3]})
        )?,
        Value::Int(6)
    );
    Ok(())
}

#[test]
fn reduce_over_non_array_returns_the_initial_value() -> Result<()> {
    assert_eq!(
        eval(json!({"reduce": [null, {"var": "current"}, 26]}), json!({}))?,
        Value::Int(26)
    );
    Ok(())
}

#[test]
fn quantifiers() -> Result<()> {
    let gt0 = json!({">": [{"var": ""}, 0]});
    assert_eq!(
        eval(json!({"all": [[1, 2, 3], gt0.clone()]}), json!({}))?,
        Value::Bool(true)
    );
    assert_eq!(
        eval(json!({"all": [[1, -2, 3], gt0.clone()]}), json!({}))?,
        Value::Bool(false)
    );
    assert_eq!(
        eval(json!({"none": [[-1, -2], gt0.clone()]}), json!({}))?,
        Value::Bool(true)
    );
    assert_eq!(
        eval(json!({"some": [[-1, 2], gt0]}), json!({}))?,
        Value::Bool(true)
    );
    Ok(())
}

#[test]
fn quantifier_identities_on_empty_arrays() -> Result<()> {
    let body = json!({"var": ""});
    assert_eq!(
        eval(json!({"all": [[], body.clone()]}), json!({}))?,
        Value::Bool(true)
    );
    assert_eq!(
        eval(json!({"none": [[], body.clone()]}), json!({}))?,
        Value::Bool(true)
    );
    assert_eq!(
        eval(json!({"some": [[], body]}), json!({}))?,
        Value::Bool(false)
    );
    Ok(())
}

#[test]
fn sequence_identities_on_non_arrays() -> Result<()> {
    let body = json!({"var": ""});
    assert_eq!(
        eval(json!({"map": [5, body.clone()]}), json!({}))?,
        Value::new_array()
    );
    assert_eq!(
        eval(json!({"filter": [null, body.clone()]}), json!({}))?,
        Value::new_array()
    );
    assert_eq!(
        eval(json!({"all": ["x", body.clone()]}), json!({}))?,
        Value::Bool(true)
    );
    assert_eq!(
        eval(json!({"none": [5, body.clone()]}), json!({}))?,
        Value::Bool(true)
    );
    assert_eq!(
        eval(json!({"some": [5, body]}), json!({}))?,
        Value::Bool(false)
    );
    Ok(())
}

#[test]
fn lambda_bodies_do_not_see_outer_variables() -> Result<()> {
    assert_eq!(
        eval(
            json!({"map": [[1], {"var": "outer"}]}),
            json!({"outer": 5})
        )?,
        Value::from(vec![Value::Null])
    );
    Ok(())
}

#[test]
fn merge_concatenates_and_promotes() -> Result<()> {
    assert_eq!(
        eval(json!({"merge": [[1, 2], [3, 4]]}), json!({}))?,
        ints(&[1, 2, 3, 4])
    );
    assert_eq!(
        eval(json!({"merge": [1, [2], 3]}), json!({}))?,
        ints(&[1, 2, 3])
    );
    assert_eq!(eval(json!({"merge": []}), json!({}))?, Value::new_array());
    Ok(())
}

//
// data access

#[test]
fn var_resolves_nested_paths() -> Result<()> {
    assert_eq!(
        eval(json!({"var": "a.b"}), json!({"a": {"b": 2}}))?,
        Value::Int(2)
    );
    Ok(())
}

#[test]
fn var_prefers_the_exact_key() -> Result<()> {
    assert_eq!(
        eval(json!({"var": "a.b"}), json!({"a.b": 1, "a": {"b": 2}}))?,
        Value::Int(1)
    );
    Ok(())
}

#[test]
fn var_indexes_arrays() -> Result<()> {
    assert_eq!(eval(json!({"var": 1}), json!([4, 5, 6]))?, Value::Int(5));
    assert_eq!(eval(json!({"var": "1"}), json!([4, 5, 6]))?, Value::Int(5));
    assert_eq!(
        eval(json!({"var": "xs.2"}), json!({"xs": [4, 5, 6]}))?,
        Value::Int(6)
    );
    Ok(())
}

#[test]
fn empty_name_returns_the_whole_context() -> Result<()> {
    assert_eq!(eval(json!({"var": ""}), json!(42))?, Value::Int(42));
    assert_eq!(eval(json!({"var": ""}), json!([1, 2]))?, ints(&[1, 2]));
    Ok(())
}

#[test]
fn var_default_applies_only_when_resolution_fails() -> Result<()> {
    assert_eq!(eval(json!({"var": ["z", 26]}), json!({}))?, Value::Int(26));
    assert_eq!(
        eval(json!({"var": ["z", 26]}), json!({"z": 1}))?,
        Value::Int(1)
    );
    // an explicit null is a resolved value, not a failure
    assert_eq!(
        eval(json!({"var": ["z", 26]}), json!({"z": null}))?,
        Value::Null
    );
    assert_eq!(eval(json!({"var": "z"}), json!({}))?, Value::Null);
    Ok(())
}

#[test]
fn missing_lists_absent_names() -> Result<()> {
    assert_eq!(
        eval(json!({"missing": ["a", "b", "c"]}), json!({"a": 1, "c": 3}))?,
        Value::from(vec![Value::from("b")])
    );
    assert_eq!(
        eval(json!({"missing": ["a", "b"]}), json!({"a": 1, "b": 2}))?,
        Value::new_array()
    );
    Ok(())
}

#[test]
fn missing_accepts_a_single_array_argument() -> Result<()> {
    assert_eq!(
        eval(json!({"missing": [["a", "b"]]}), json!({"a": 1}))?,
        Value::from(vec![Value::from("b")])
    );
    Ok(())
}

#[test]
fn missing_counts_null_values_as_missing() -> Result<()> {
    assert_eq!(
        eval(json!({"missing": ["a"]}), json!({"a": null}))?,
        Value::from(vec![Value::from("a")])
    );
    Ok(())
}

#[test]
fn missing_some_thresholds() -> Result<()> {
    let rule = json!({"missing_some": [1, ["a", "b", "c"]]});
    assert_eq!(eval(rule.clone(), json!({"a": 1}))?, Value::new_array());
    assert_eq!(
        eval(rule, json!({}))?,
        Value::from(vec![
            Value::from("a"),
            Value::from("b"),
            Value::from("c")
        ])
    );

    let rule = json!({"missing_some": [2, ["a", "b", "c"]]});
    assert_eq!(
        eval(rule, json!({"a": 1}))?,
        Value::from(vec![Value::from("b"), Value::from("c")])
    );
    Ok(())
}

//
// diagnostics and extensions

#[test]
fn log_passes_its_value_through() -> Result<()> {
    assert_eq!(eval(json!({"log": ["apple"]}), json!({}))?, Value::from("apple"));
    Ok(())
}

#[cfg(feature = "regex")]
#[test]
fn regex_matches_subjects() -> Result<()> {
    assert_eq!(
        eval(json!({"regex": ["^a.c$", "abc"]}), json!({}))?,
        Value::Bool(true)
    );
    assert_eq!(
        eval(json!({"regex": ["^a.c$", "abcd"]}), json!({}))?,
        Value::Bool(false)
    );
    assert!(eval(json!({"regex": ["(", "abc"]}), json!({})).is_err());
    Ok(())
}

//
// rule handle

#[test]
fn apply_without_accessor_rejects_variable_access() -> Result<()> {
    let rule = build(&json!({"var": "x"}))?;
    assert!(rule.apply().is_err());

    // a default does not save it; only resolution failures do
    let rule = build(&json!({"var": ["x", 1]}))?;
    assert!(rule.apply().is_err());
    Ok(())
}

#[test]
fn variable_free_rules_ignore_the_accessor() -> Result<()> {
    let rule = build(&json!({"+": [1, 2]}))?;
    let via_accessor = rule.apply_with(&|_name: &Value, _idx| -> Result<Value> {
        bail!(Error::VariableResolution("unused".to_string()))
    })?;

    assert_eq!(rule.apply()?, via_accessor);
    assert_eq!(rule.apply()?, Value::Int(3));
    Ok(())
}

#[test]
fn positional_evaluation_follows_the_name_table() -> Result<()> {
    let rule = build(&json!({"<": [{"var": "a"}, {"var": "b"}]}))?;
    assert!(!rule.has_computed_names());

    assert_eq!(
        rule.apply_positional(&[Value::Int(1), Value::Int(2)])?,
        Value::Bool(true)
    );
    assert_eq!(
        rule.apply_positional(&[Value::Int(2), Value::Int(1)])?,
        Value::Bool(false)
    );
    Ok(())
}

#[test]
fn positional_evaluation_requires_plain_names() -> Result<()> {
    let rule = build(&json!({"missing": ["a"]}))?;
    assert!(rule.apply_positional(&[Value::Int(1)]).is_err());
    Ok(())
}

#[test]
fn positional_accessor_plugs_into_apply_with() -> Result<()> {
    let rule = build(&json!({"cat": [{"var": "greeting"}, " ", {"var": "name"}]}))?;
    let accessor =
        jsonlogic::positional_accessor(vec![Value::from("hello"), Value::from("world")]);

    assert_eq!(rule.apply_with(&accessor)?, Value::from("hello world"));
    Ok(())
}

#[test]
fn absent_positional_values_are_not_defaulted() -> Result<()> {
    // an accessor returning the absent marker is a resolved lookup
    let rule = build(&json!({"var": ["a", 7]}))?;
    assert_eq!(
        rule.apply_positional(&[Value::Absent])?,
        Value::Absent
    );
    Ok(())
}

#[test]
fn custom_accessors_drive_defaults() -> Result<()> {
    let rule = build(&json!({"var": ["flag", "fallback"]}))?;

    let hit = rule.apply_with(&|name: &Value, _idx| -> Result<Value> {
        match name.as_str() {
            Some("flag") => Ok(Value::Bool(true)),
            _ => bail!(Error::VariableResolution(format!("{name}"))),
        }
    })?;
    assert_eq!(hit, Value::Bool(true));

    let miss = rule.apply_with(&|_name: &Value, _idx| -> Result<Value> {
        bail!(Error::VariableResolution("nope".to_string()))
    })?;
    assert_eq!(miss, Value::from("fallback"));
    Ok(())
}

#[test]
fn non_resolution_accessor_errors_are_fatal() -> Result<()> {
    let rule = build(&json!({"var": ["flag", "fallback"]}))?;
    let result = rule.apply_with(&|_name: &Value, _idx| -> Result<Value> {
        bail!(Error::Type("accessor exploded".to_string()))
    });
    assert!(result.is_err());
    Ok(())
}

#[test]
fn cloned_rules_evaluate_identically() -> Result<()> {
    let rule = build(&json!({"map": [{"var": "xs"}, {"+": [{"var": ""}, 1]}]}))?;
    let cloned = rule.clone();

    let data = json!({"xs": [1, 2, 3]});
    let accessor = jsonlogic::data_accessor(data.clone());
    let cloned_accessor = jsonlogic::data_accessor(data);

    assert_eq!(
        rule.apply_with(&accessor)?,
        cloned.apply_with(&cloned_accessor)?
    );
    Ok(())
}

#[test]
fn nested_rules_compose() -> Result<()> {
    // a small policy: grant when the user is an admin or owns more
    // than half of the listed shares
    let rule = json!({"or": [
        {"in": ["admin", {"var": "roles"}]},
        {">": [
            {"reduce": [{"var": "shares"}, {"+": [{"var": "current"}, {"var": "accumulator"}]}, 0]},
            50
        ]}
    ]});

    assert_eq!(
        eval(rule.clone(), json!({"roles": ["admin"], "shares": []}))?,
        Value::Bool(true)
    );
    assert_eq!(
        eval(rule.clone(), json!({"roles": ["user"], "shares": [30, 30]}))?,
        Value::Bool(true)
    );
    assert_eq!(
        eval(rule, json!({"roles": ["user"], "shares": [10, 20]}))?,
        Value::Bool(false)
    );
    Ok(())
}
