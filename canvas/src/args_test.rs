use serde_json::json;

use super::*;

fn schema(name: &str, arg_type: ArgType, required: bool, default: Option<ArgValue>) -> ArgumentSchema {
    ArgumentSchema { name: name.into(), arg_type, required, default, description: String::new() }
}

// =============================================================
// ArgValue serde
// =============================================================

#[test]
fn arg_value_deserializes_each_tag() {
    let v: ArgValue = serde_json::from_value(json!("10.0.0.0/16")).unwrap();
    assert_eq!(v, ArgValue::String("10.0.0.0/16".into()));
    let v: ArgValue = serde_json::from_value(json!(3)).unwrap();
    assert_eq!(v, ArgValue::Number(3.0));
    let v: ArgValue = serde_json::from_value(json!(true)).unwrap();
    assert_eq!(v, ArgValue::Bool(true));
    let v: ArgValue = serde_json::from_value(json!(["a", 1])).unwrap();
    assert_eq!(v, ArgValue::List(vec!["a".into(), ArgValue::Number(1.0)]));
    let v: ArgValue = serde_json::from_value(json!({ "Name": "web" })).unwrap();
    assert!(matches!(v, ArgValue::Map(ref m) if m.get("Name") == Some(&ArgValue::from("web"))));
}

#[test]
fn arg_value_serializes_untagged() {
    let mut args = Arguments::new();
    args.insert("enable_dns".into(), true.into());
    args.insert("cidr_block".into(), "10.0.0.0/16".into());
    let json = serde_json::to_value(&args).unwrap();
    assert_eq!(json, json!({ "cidr_block": "10.0.0.0/16", "enable_dns": true }));
}

#[test]
fn arg_value_rejects_null() {
    assert!(serde_json::from_value::<ArgValue>(json!(null)).is_err());
}

#[test]
fn arg_value_type_names() {
    assert_eq!(ArgValue::from("x").type_name(), "string");
    assert_eq!(ArgValue::from(1.0).type_name(), "number");
    assert_eq!(ArgValue::from(false).type_name(), "bool");
    assert_eq!(ArgValue::List(vec![]).type_name(), "list");
    assert_eq!(ArgValue::Map(BTreeMap::new()).type_name(), "map");
}

#[test]
fn arg_value_as_str() {
    assert_eq!(ArgValue::from("t3.micro").as_str(), Some("t3.micro"));
    assert_eq!(ArgValue::from(2.0).as_str(), None);
}

// =============================================================
// ArgType serde
// =============================================================

#[test]
fn arg_type_accepts_aliases() {
    let cases = [
        ("\"string\"", ArgType::String),
        ("\"number\"", ArgType::Number),
        ("\"bool\"", ArgType::Bool),
        ("\"boolean\"", ArgType::Bool),
        ("\"list\"", ArgType::List),
        ("\"array\"", ArgType::List),
        ("\"map\"", ArgType::Map),
        ("\"object\"", ArgType::Map),
        ("\"set(string)\"", ArgType::Any),
    ];
    for (input, expected) in cases {
        let ty: ArgType = serde_json::from_str(input).unwrap();
        assert_eq!(ty, expected, "{input}");
    }
}

#[test]
fn any_type_matches_everything() {
    assert!(ArgValue::from("x").matches(ArgType::Any));
    assert!(ArgValue::List(vec![]).matches(ArgType::Any));
}

// =============================================================
// validate_arguments
// =============================================================

#[test]
fn validate_reports_missing_required() {
    let schema = vec![schema("cidr_block", ArgType::String, true, None)];
    let issues = validate_arguments(&Arguments::new(), &schema);
    assert_eq!(issues, vec![ArgIssue::MissingRequired { name: "cidr_block".into() }]);
}

#[test]
fn validate_ignores_missing_optional() {
    let schema = vec![schema("tags", ArgType::Map, false, None)];
    assert!(validate_arguments(&Arguments::new(), &schema).is_empty());
}

#[test]
fn validate_reports_type_mismatch() {
    let schema = vec![schema("instance_count", ArgType::Number, true, None)];
    let mut args = Arguments::new();
    args.insert("instance_count".into(), "three".into());
    let issues = validate_arguments(&args, &schema);
    assert_eq!(
        issues,
        vec![ArgIssue::TypeMismatch { name: "instance_count".into(), expected: ArgType::Number, found: "string" }]
    );
}

#[test]
fn validate_reports_unknown_keys_after_schema_findings() {
    let schema = vec![schema("ami", ArgType::String, true, None)];
    let mut args = Arguments::new();
    args.insert("zzz".into(), 1.0.into());
    let issues = validate_arguments(&args, &schema);
    assert_eq!(
        issues,
        vec![ArgIssue::MissingRequired { name: "ami".into() }, ArgIssue::Unknown { name: "zzz".into() }]
    );
}

#[test]
fn arg_issue_display() {
    let issue = ArgIssue::MissingRequired { name: "ami".into() };
    assert_eq!(issue.to_string(), "missing required argument `ami`");
}

// =============================================================
// defaults_from_schema
// =============================================================

#[test]
fn defaults_only_include_declared_defaults() {
    let schema = vec![
        schema("instance_type", ArgType::String, false, Some("t3.micro".into())),
        schema("ami", ArgType::String, true, None),
    ];
    let defaults = defaults_from_schema(&schema);
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults.get("instance_type"), Some(&ArgValue::from("t3.micro")));
}

#[test]
fn schema_deserializes_registry_shape() {
    let raw = json!({
        "name": "cidr_block",
        "type": "string",
        "required": true,
        "default": null,
        "description": "Required input: cidr_block"
    });
    let parsed: ArgumentSchema = serde_json::from_value(raw).unwrap();
    assert_eq!(parsed.arg_type, ArgType::String);
    assert!(parsed.required);
    assert!(parsed.default.is_none());
}
