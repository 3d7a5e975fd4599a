use vivjson::{run, run_with_config, Config, Error, Input, Value};

fn run_json(text: &str) -> Result<Value, Error> {
    run(&[Input::Json(text.to_string())])
}

#[test]
fn json_then_script() {
    let value = run(&[
        Input::Json("{\"a\":3}".to_string()),
        Input::Code("return(a*2)".to_string()),
    ]);
    assert_eq!(value, Ok(Value::Int(6)));
}

#[test]
fn json_documents_round_trip() {
    let documents = [
        r#"{"a": 3, "b": [1, 2.5, "x"], "c": {"d": null, "e": true}}"#,
        r#"[1, [2, [3, []]], {"k": false}]"#,
        r#""plain text""#,
        "-12.25",
        "9007199254740992",
        "null",
    ];

    for document in documents {
        let value = run_json(document).expect("valid json");
        let ours: serde_json::Value = value.into();
        let theirs: serde_json::Value = serde_json::from_str(document).expect("valid json");
        assert_eq!(ours, theirs, "document: {document}");
    }
}

#[test]
fn key_order_is_preserved() {
    let value = run_json(r#"{"zebra": 1, "apple": 2, "mango": 3}"#).expect("valid json");
    let Value::Object(members) = value else {
        panic!("expected an object");
    };
    assert_eq!(
        members.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["zebra", "apple", "mango"]
    );
}

#[test]
fn repeated_keys_in_nested_objects_stay_separate() {
    let value = run_json(r#"{"b": 1, "a": {"b": 2}}"#).expect("valid json");
    let text = value.to_json_string(&Config::default());
    assert_eq!(text, r#"{"b": 1, "a": {"b": 2}}"#);
}

#[test]
fn json_mode_rejects_script_features() {
    assert!(matches!(run_json("{\"a\": 1 + 2}"), Err(Error::Parse { .. })));
    assert!(matches!(run_json("a = 3"), Err(Error::Parse { .. })));
    assert!(matches!(run_json("{\"a\": 1} extra"), Err(Error::Parse { .. })));
}

#[test]
fn only_json_config_locks_code_inputs() {
    let config = Config::new().with_only_json(true);
    let result = run_with_config(&[Input::Code("return(1)".to_string())], &config);
    assert!(matches!(result, Err(Error::Parse { .. })));
}

#[test]
fn nonfinite_spellings_parse_and_print() {
    let config = Config::new().with_infinity("Infinity").with_nan("NaN");

    let value = run_with_config(
        &[Input::Json("[Infinity, -Infinity, NaN]".to_string())],
        &config,
    )
    .expect("run failed");

    assert_eq!(
        value.to_json_string(&config),
        "[Infinity, -Infinity, NaN]"
    );

    // without a spelling the names are unknown and the output is null
    assert!(run_json("[Infinity]").is_err());
    let plain = Value::Float(f64::INFINITY).to_json_string(&Config::default());
    assert_eq!(plain, "null");
}

#[test]
fn surrogate_pair_escapes_decode() {
    let value = run_json(r#""😀""#).expect("valid json");
    assert_eq!(value, Value::Str("😀".into()));

    let lone = run_json(r#""\ud83d""#);
    assert!(matches!(lone, Err(Error::Lex { .. })));
}

#[test]
fn lex_errors_carry_the_medium() {
    let error = run(&[Input::Json("{\"a\": @}".to_string())]).expect_err("must fail");
    let location = error.location().expect("location expected");
    assert_eq!(location.medium, "1st argument");
}
