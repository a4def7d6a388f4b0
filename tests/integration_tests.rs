use bigdecimal::BigDecimal;
use pretty_assertions::assert_eq;
use rstest::rstest;
use sqljson_path::{
    ast::{BinaryOp, UnaryOp},
    CompiledPath, EvalError, IsoDatetimeCast, Value, cli::parse_document, output::to_json,
};
use std::{collections::HashMap, str::FromStr};

fn doc(json: &str) -> Value {
    parse_document(json).unwrap()
}

/// Runs `path` against `json` and prints the result sequence as a JSON array.
fn eval(path: &str, json: &str) -> Result<String, EvalError> {
    let compiled = CompiledPath::compile(path).unwrap();
    compiled
        .query(&doc(json))
        .map(|items| to_json(&Value::Array(items)))
}

fn eval_with(path: &str, json: &str, vars: &[(&str, &str)]) -> Result<String, EvalError> {
    let variables: HashMap<String, Value> = vars
        .iter()
        .map(|(name, value)| (name.to_string(), doc(value)))
        .collect();
    let compiled = CompiledPath::compile(path).unwrap();
    compiled
        .execute(&IsoDatetimeCast::new(2024), &doc(json), &variables)
        .map(|items| to_json(&Value::Array(items)))
}

const STORE: &str = r#"{
    "name": "corner shop",
    "items": [
        {"sku": "a1", "price": 12.50, "tags": ["food", "fresh"]},
        {"sku": "b2", "price": 3, "tags": ["food"]},
        {"sku": "c3", "price": 99.99, "tags": []}
    ],
    "owner": {"first": "Ada", "last": "Lovelace"}
}"#;

// ============================================================================
// Primaries and member access
// ============================================================================

#[test]
fn test_context_variable() {
    assert_eq!(eval("$", "[1, 2]").unwrap(), "[[1,2]]");
}

#[rstest]
#[case("$.name", r#"["corner shop"]"#)]
#[case("$.owner.first", r#"["Ada"]"#)]
#[case(r#"$."owner"."last""#, r#"["Lovelace"]"#)]
#[case("$.owner.*", r#"["Ada","Lovelace"]"#)]
#[case("$.missing", "[]")]
#[case("$.name.length", "[]")]
fn test_member_access(#[case] path: &str, #[case] expected: &str) {
    assert_eq!(eval(path, STORE).unwrap(), expected);
}

#[test]
fn test_member_access_returns_every_binding_of_a_repeated_key() {
    let document = Value::Object(vec![
        ("k".to_string(), Value::from(1)),
        ("other".to_string(), Value::Null),
        ("k".to_string(), Value::from(2)),
    ]);
    let result = CompiledPath::compile("$.k")
        .unwrap()
        .query(&document)
        .unwrap();
    assert_eq!(result, vec![Value::from(1), Value::from(2)]);
}

#[test]
fn test_lax_member_access_unwraps_arrays() {
    assert_eq!(eval("$.items.sku", STORE).unwrap(), r#"["a1","b2","c3"]"#);
    assert_eq!(eval("$.x", r#"[{"x": 1}, 2, {"y": 3}, {"x": 4}]"#).unwrap(), "[1,4]");
}

#[rstest]
#[case("strict $.missing", r#"{"a": 1}"#, EvalError::NoSuchMember("missing".to_string()))]
#[case("strict $.a.b", r#"{"a": 1}"#, EvalError::MemberAccessOnNonObject { found: "number" })]
#[case("strict $.a", r#"[{"a": 1}]"#, EvalError::MemberAccessOnNonObject { found: "array" })]
fn test_strict_member_access_errors(
    #[case] path: &str,
    #[case] json: &str,
    #[case] expected: EvalError,
) {
    assert_eq!(eval(path, json).unwrap_err(), expected);
}

#[test]
fn test_named_variables() {
    assert_eq!(
        eval_with("$.items[$i].sku", STORE, &[("i", "1")]).unwrap(),
        r#"["b2"]"#
    );
    assert_eq!(
        eval("$undefined", "{}").unwrap_err(),
        EvalError::UnknownVariable("undefined".to_string())
    );
}

// ============================================================================
// Array access
// ============================================================================

#[rstest]
#[case("$[0]", "[10]")]
#[case("$[last]", "[40]")]
#[case("$[last - 1]", "[30]")]
#[case("$[1 to 2]", "[20,30]")]
#[case("$[2, 0, 2]", "[30,10,30]")]
#[case("$[0 to 1, last]", "[10,20,40]")]
#[case("$[*]", "[10,20,30,40]")]
#[case("$[2 to 1]", "[]")]
#[case("$[-1]", "[]")]
#[case("$[10]", "[]")]
#[case("$[-5 to 1]", "[10,20]")]
#[case("$[2 to 100]", "[30,40]")]
#[case("$[1.0]", "[20]")]
fn test_lax_array_access(#[case] path: &str, #[case] expected: &str) {
    assert_eq!(eval(path, "[10, 20, 30, 40]").unwrap(), expected);
}

#[rstest]
#[case("strict $[4]", EvalError::SubscriptOutOfBounds { index: 4, size: 4 })]
#[case("strict $[-1]", EvalError::SubscriptOutOfBounds { index: -1, size: 4 })]
#[case("strict $[2 to 1]", EvalError::InvalidRange { from: 2, to: 1 })]
#[case("strict $[0 to 4]", EvalError::SubscriptOutOfBounds { index: 4, size: 4 })]
#[case("$[1.5]", EvalError::SubscriptNotSingleInteger)]
#[case("$[\"1\"]", EvalError::SubscriptNotSingleInteger)]
#[case("$[$[*]]", EvalError::SubscriptNotSingleInteger)]
fn test_array_access_errors(#[case] path: &str, #[case] expected: EvalError) {
    assert_eq!(eval(path, "[10, 20, 30, 40]").unwrap_err(), expected);
}

#[test]
fn test_lax_array_access_wraps_non_arrays() {
    assert_eq!(eval("$.name[0]", STORE).unwrap(), r#"["corner shop"]"#);
    assert_eq!(eval("$.name[*]", STORE).unwrap(), r#"["corner shop"]"#);
    assert_eq!(eval("$.name[last]", STORE).unwrap(), r#"["corner shop"]"#);
    assert_eq!(
        eval("strict $.name[0]", STORE).unwrap_err(),
        EvalError::ArrayAccessOnNonArray { found: "string" }
    );
}

#[test]
fn test_last_of_empty_array() {
    assert_eq!(eval("$[last]", "[]").unwrap(), "[]");
}

#[test]
fn test_last_refers_to_innermost_array() {
    assert_eq!(eval("$[0][last]", "[[1, 2, 3], [4]]").unwrap(), "[3]");
    assert_eq!(eval("$[$[last][0]]", "[5, 6, [1]]").unwrap(), "[6]");
}

// ============================================================================
// Arithmetic
// ============================================================================

#[rstest]
#[case("1 + 2 * 3", "[7]")]
#[case("(1 + 2) * 3", "[9]")]
#[case("10 - 4 - 3", "[3]")]
#[case("7 % 3", "[1]")]
#[case("0.1 + 0.2", "[0.3]")]
#[case("1.5 * 2", "[3.0]")]
#[case("-1", "[-1]")]
#[case("+$.items[1].price", "[3]")]
#[case("$.items[0].price * 2", "[25.00]")]
fn test_arithmetic(#[case] path: &str, #[case] expected: &str) {
    assert_eq!(eval(path, STORE).unwrap(), expected);
}

#[rstest]
#[case("$.name + 1", EvalError::LeftOperandNotNumeric(BinaryOp::Add))]
#[case("1 * $.items[*].price", EvalError::RightOperandNotNumeric(BinaryOp::Multiply))]
#[case("1 / 0", EvalError::DivisionByZero)]
#[case("1 % 0", EvalError::DivisionByZero)]
#[case("-$.name", EvalError::UnaryOperandNotNumeric(UnaryOp::Minus))]
#[case("-$.owner.missing", EvalError::UnaryOperandNotNumeric(UnaryOp::Minus))]
fn test_arithmetic_errors(#[case] path: &str, #[case] expected: EvalError) {
    assert_eq!(eval(path, STORE).unwrap_err(), expected);
}

/// The single number a path evaluates to.
fn number(path: &str, json: &str) -> BigDecimal {
    let items = CompiledPath::compile(path).unwrap().query(&doc(json)).unwrap();
    match items.as_slice() {
        [Value::Number(n)] => n.clone(),
        other => panic!("expected one number, got {other:?}"),
    }
}

fn decimal(text: &str) -> BigDecimal {
    BigDecimal::from_str(text).unwrap()
}

#[rstest]
#[case("10 / 4", "2.5")]
#[case("1 / 8", "0.125")]
#[case("-7 / 2", "-3.5")]
#[case("$.items[2].price / 3", "33.33")]
fn test_terminating_division_is_exact(#[case] path: &str, #[case] expected: &str) {
    assert_eq!(number(path, STORE), decimal(expected));
}

#[test]
fn test_non_terminating_division_keeps_a_hundred_digits() {
    let third = number("1 / 3", "null");
    let (digits, scale) = third.as_bigint_and_exponent();
    let digits = digits.to_string();
    assert_eq!(digits, "3".repeat(100));
    assert_eq!(scale, 100);

    let error = (number("2 / 3 * 3", "null") - decimal("2")).abs();
    assert!(error > decimal("0"));
    assert!(error < decimal("1e-95"));
}

#[rstest]
#[case("1e30", "1000000000000000000000000000000")]
#[case("1e30 + 1", "1000000000000000000000000000001")]
#[case("99999999999999999999999999999999 + 1", "100000000000000000000000000000000")]
#[case("79228162514264337593543950335 * 10", "792281625142643375935439503350")]
#[case("0.0000000000000000000000000000001 * 2", "0.0000000000000000000000000000002")]
#[case("1e-40 + 1e-40", "2e-40")]
fn test_numbers_are_not_limited_in_width(#[case] path: &str, #[case] expected: &str) {
    assert_eq!(number(path, "null"), decimal(expected));
}

#[test]
fn test_wide_numbers_print_every_digit() {
    assert_eq!(
        eval("$ + 1", "123456789012345678901234567890123456789").unwrap(),
        "[123456789012345678901234567890123456790]"
    );
    assert_eq!(
        eval("$.a", r#"{"a": 0.0000000000000000000000000000001}"#).unwrap(),
        "[0.0000000000000000000000000000001]"
    );
    assert_eq!(eval("$.double()", r#""1e30""#).unwrap(), "[1000000000000000000000000000000]");
}

#[test]
fn test_arithmetic_unwraps_single_element_array_in_lax_mode() {
    assert_eq!(eval("$.a + 1", r#"{"a": [41]}"#).unwrap(), "[42]");
    assert!(eval("strict $.a + 1", r#"{"a": [41]}"#).is_err());
}

// ============================================================================
// Filters
// ============================================================================

#[rstest]
#[case("$.items[*] ? (@.price > 10).sku", r#"["a1","c3"]"#)]
#[case("$.items ? (@.price < 10).sku", r#"["b2"]"#)]
#[case("$.items ? (@.tags == \"fresh\").sku", r#"["a1"]"#)]
#[case("$.items ? (exists(@.tags[*])).sku", r#"["a1","b2"]"#)]
#[case("$.items ? (!exists(@.tags[*])).sku", r#"["c3"]"#)]
#[case("$.items ? (@.sku starts with \"b\").price", "[3]")]
#[case("$.items ? (@.sku like_regex \"^[AC]\" flag \"i\").sku", r#"["a1","c3"]"#)]
#[case("$.items ? (@.price > 10 && @.price < 50).sku", r#"["a1"]"#)]
#[case("$.items ? (@.price < 5 || @.price > 50).sku", r#"["b2","c3"]"#)]
#[case("$.items ? ((@.price > 10) is unknown).sku", "[]")]
#[case("$.items ? ((@.sku > 10) is unknown).sku", r#"["a1","b2","c3"]"#)]
#[case("$.items[*].price ? (@ > $.items[1].price)", "[12.50,99.99]")]
fn test_filter(#[case] path: &str, #[case] expected: &str) {
    assert_eq!(eval(path, STORE).unwrap(), expected);
}

#[test]
fn test_nested_filter_rebinds_current_item() {
    let json = r#"[{"xs": [1, 5, 9]}, {"xs": [2]}]"#;
    assert_eq!(
        eval("$[*] ? (exists(@.xs[*] ? (@ > 4))).xs[0]", json).unwrap(),
        "[1]"
    );
}

#[test]
fn test_filter_over_range() {
    assert_eq!(eval("$[0 to last] ? (@ > 1)", "[1, 2, 3]").unwrap(), "[2,3]");
}

#[test]
fn test_starts_with_variable_prefix() {
    assert_eq!(
        eval_with("$[*] ? (@ starts with $p)", r#"["apple", "banana", "apricot"]"#, &[("p", "\"ap\"")]).unwrap(),
        r#"["apple","apricot"]"#
    );
    assert_eq!(
        eval_with("$[*] ? (@ starts with $p)", r#"["apple"]"#, &[("p", "1")]).unwrap(),
        "[]"
    );
}

#[test]
fn test_comparison_of_mixed_types() {
    let json = r#"[null, true, 1, "1", [1], {"a": 1}]"#;
    assert_eq!(eval("$[*] ? (@ == 1)", json).unwrap(), "[1,1]");
    assert_eq!(eval("strict $[*] ? (@ == 1)", json).unwrap(), "[1]");
    assert_eq!(eval("$[*] ? (@ == null)", json).unwrap(), "[null]");
    assert_eq!(
        eval("$[*] ? (@ <> null)", json).unwrap(),
        r#"[true,1,"1",1,{"a":1}]"#
    );
    assert_eq!(eval("$[*] ? (@ == true)", json).unwrap(), "[true]");
    assert_eq!(eval("$[*] ? (@ >= \"0\")", json).unwrap(), r#"["1"]"#);
}

#[test]
fn test_strict_filter_does_not_unwrap() {
    assert_eq!(eval("strict $ ? (@[0] == 1)", "[1, 2]").unwrap(), "[[1,2]]");
    assert_eq!(eval("$ ? (@ == 1)", "[1, 2]").unwrap(), "[1]");
}

#[rstest]
#[case("$ ? (@ like_regex \"ab\")", "[\"xaby\", 1, \"b\"]", r#"["xaby"]"#)]
#[case("$ ? (@ like_regex \"^a$\" flag \"m\")", "[\"b\\na\"]", r#"["b\na"]"#)]
#[case("$ ? (@ like_regex \"a b\" flag \"x\")", "[\"ab\", \"a b\"]", r#"["ab"]"#)]
fn test_like_regex_flags(#[case] path: &str, #[case] json: &str, #[case] expected: &str) {
    assert_eq!(eval(path, json).unwrap(), expected);
}

#[test]
fn test_current_item_outside_filter_is_an_error() {
    assert_eq!(eval("@", "{}").unwrap_err(), EvalError::CurrentItemOutsideFilter);
    assert_eq!(eval("@ + 1", "{}").unwrap_err(), EvalError::CurrentItemOutsideFilter);
}

#[test]
fn test_last_outside_subscript_is_an_error_even_in_a_filter() {
    assert_eq!(eval("last", "[]").unwrap_err(), EvalError::LastOutsideArrayAccessor);
    assert_eq!(
        eval("$ ? (@ == last)", "{}").unwrap_err(),
        EvalError::LastOutsideArrayAccessor
    );
}

// ============================================================================
// Item methods
// ============================================================================

#[rstest]
#[case("$.items[0].type()", r#"["object"]"#)]
#[case("$.items[0].tags.type()", r#"["string","string"]"#)]
#[case("strict $.items[0].tags.type()", r#"["array"]"#)]
#[case("$.items[*].tags.size()", "[2,1,0]")]
#[case("$.name.size()", "[1]")]
#[case("$.items.size()", "[3]")]
#[case("$.items[*].price.ceiling()", "[13,3,100]")]
#[case("$.items[*].price.floor()", "[12,3,99]")]
#[case("(-$.items[0].price).abs()", "[12.50]")]
#[case("$.items[1].price.abs()", "[3]")]
fn test_methods(#[case] path: &str, #[case] expected: &str) {
    assert_eq!(eval(path, STORE).unwrap(), expected);
}

#[rstest]
#[case("$.double()", "1.5", "[1.5]")]
#[case("$.double()", r#""1.5""#, "[1.5]")]
#[case("$.double()", r#"" 2e3 ""#, "[2000]")]
#[case("$[*].double()", r#"[1, "-2"]"#, "[1,-2]")]
#[case("$.floor()", "-1.5", "[-2]")]
#[case("$.ceiling()", "-1.5", "[-1]")]
#[case("$.type()", "null", r#"["null"]"#)]
#[case("$.type()", "true", r#"["boolean"]"#)]
fn test_scalar_methods(#[case] path: &str, #[case] json: &str, #[case] expected: &str) {
    assert_eq!(eval(path, json).unwrap(), expected);
}

#[rstest]
#[case("$.double()", r#""abc""#, EvalError::InvalidDouble("abc".to_string()))]
#[case("$.double()", r#""NaN""#, EvalError::InvalidDouble("NaN".to_string()))]
#[case("$.double()", "true", EvalError::MethodTypeMismatch { method: "double", expected: "number or string", found: "boolean" })]
#[case("$.abs()", r#""x""#, EvalError::MethodTypeMismatch { method: "abs", expected: "number", found: "string" })]
#[case("$.floor()", "{}", EvalError::MethodTypeMismatch { method: "floor", expected: "number", found: "object" })]
#[case("$.keyvalue()", "[1]", EvalError::MethodTypeMismatch { method: "keyvalue", expected: "object", found: "number" })]
fn test_method_errors(#[case] path: &str, #[case] json: &str, #[case] expected: EvalError) {
    assert_eq!(eval(path, json).unwrap_err(), expected);
}

#[test]
fn test_keyvalue() {
    assert_eq!(
        eval("$.keyvalue()", r#"{"a": 1, "b": [true]}"#).unwrap(),
        r#"[{"name":"a","value":1,"id":0},{"name":"b","value":[true],"id":0}]"#
    );
}

#[test]
fn test_keyvalue_id_is_shared_per_invocation() {
    let result = eval("$[*].keyvalue().id", r#"[{"a": 1, "b": 2}, {"c": 3}]"#).unwrap();
    assert_eq!(result, "[0,0,1]");
}

#[test]
fn test_keyvalue_filter() {
    assert_eq!(
        eval("$.keyvalue() ? (@.value > 1).name", r#"{"a": 1, "b": 2, "c": 3}"#).unwrap(),
        r#"["b","c"]"#
    );
}

// ============================================================================
// Datetime
// ============================================================================

#[rstest]
#[case("\"2024-03-01\"", "date", "2024-03-01")]
#[case("\"2024-03-01T10:20:30\"", "timestamp without time zone", "2024-03-01T10:20:30")]
#[case("\"2024-03-01 10:20:30.5+02:00\"", "timestamp with time zone", "2024-03-01T10:20:30.500+02:00")]
#[case("\"2024-03-01T10:20:30Z\"", "timestamp with time zone", "2024-03-01T10:20:30+00:00")]
#[case("\"10:20\"", "time without time zone", "10:20:00")]
#[case("\"10:20:30-05:00\"", "time with time zone", "10:20:30-05:00")]
fn test_iso_datetime(#[case] json: &str, #[case] type_name: &str, #[case] printed: &str) {
    assert_eq!(eval("$.datetime().type()", json).unwrap(), format!("[\"{type_name}\"]"));
    assert_eq!(eval("$.datetime()", json).unwrap(), format!("[\"{printed}\"]"));
}

#[rstest]
#[case("YYYY-MM-DD", "2024-03-01", "2024-03-01")]
#[case("DD/MM/YYYY", "01/03/2024", "2024-03-01")]
#[case("YYYY-DDD", "2024-061", "2024-03-01")]
#[case("YYYY-MM-DD HH24:MI:SS", "2024-03-01 13:45:07", "2024-03-01T13:45:07")]
#[case("HH12:MI P.M.", "01:15 P.M.", "13:15:00")]
#[case("HH:MI A.M.", "12:15 A.M.", "00:15:00")]
#[case("HH24:MI:SS.FF3", "08:00:00.25", "08:00:00.250")]
#[case("SSSSS", "3661", "01:01:01")]
#[case("YYYY-MM-DD TZH:TZM", "2024-03-01 +05:30", "2024-03-01T00:00:00+05:30")]
#[case("HH24:MI TZH", "10:00 -03", "10:00:00-03:00")]
fn test_datetime_template(#[case] template: &str, #[case] input: &str, #[case] printed: &str) {
    let path = format!("$.datetime(\"{template}\")");
    assert_eq!(eval(&path, &format!("\"{input}\"")).unwrap(), format!("[\"{printed}\"]"));
}

#[rstest]
#[case("DD.MM.YY", "01.03.31", "2031-03-01")]
#[case("DD.MM.Y", "01.03.7", "2027-03-01")]
#[case("DD.MM.RR", "01.03.31", "2031-03-01")]
#[case("DD.MM.RR", "01.03.99", "1999-03-01")]
fn test_short_years_use_the_provider_year(
    #[case] template: &str,
    #[case] input: &str,
    #[case] printed: &str,
) {
    let path = format!("$.datetime(\"{template}\")");
    assert_eq!(
        eval_with(&path, &format!("\"{input}\""), &[]).unwrap(),
        format!("[\"{printed}\"]")
    );
}

#[rstest]
#[case("$.datetime(\"YYYY-MM-DD\")", "\"2024-13-01\"")]
#[case("$.datetime(\"YYYY-MM-DD\")", "\"2024-03-01x\"")]
#[case("$.datetime(\"HH24:MI\")", "\"25:00\"")]
#[case("$.datetime()", "\"yesterday\"")]
fn test_invalid_datetime(#[case] path: &str, #[case] json: &str) {
    assert!(matches!(
        eval(path, json).unwrap_err(),
        EvalError::InvalidDatetime { .. }
    ));
}

#[test]
fn test_datetime_requires_string() {
    assert_eq!(
        eval("$.datetime()", "1").unwrap_err(),
        EvalError::MethodTypeMismatch {
            method: "datetime",
            expected: "string",
            found: "number"
        }
    );
}

#[test]
fn test_datetime_comparison() {
    let json = r#"[
        {"id": 1, "at": "2024-01-15"},
        {"id": 2, "at": "2024-02-20T08:00:00"},
        {"id": 3, "at": "2024-03-01"}
    ]"#;
    assert_eq!(
        eval("$[*] ? (@.at.datetime() >= \"2024-02-01\").id", json).unwrap(),
        "[2,3]"
    );
    assert_eq!(
        eval("$[*] ? (@.at.datetime() < $[2].at.datetime()).id", json).unwrap(),
        "[1,2]"
    );
    // a string that is not a datetime compares unknown
    assert_eq!(
        eval("$[*] ? ((@.at.datetime() == \"soon\") is unknown).id", json).unwrap(),
        "[1,2,3]"
    );
}

#[test]
fn test_zoned_times_compare_as_instants() {
    let json = r#"["10:00:00+02:00", "08:30:00+00:00"]"#;
    assert_eq!(
        eval("$[*] ? (@.datetime() < \"08:15:00+00:00\")", json).unwrap(),
        r#"["10:00:00+02:00"]"#
    );
}
