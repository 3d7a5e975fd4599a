use indexmap::IndexMap;
use vivjson::{run, run_text, Config, Error, Input, Value};

#[test]
fn sum_of_two_members() {
    assert_eq!(run_text("a:3,b:2,return(a+b)"), Ok(Value::Int(5)));
}

#[test]
fn data_and_code_as_separate_inputs() {
    let value = run(&[
        Input::Code("{a:3,b:2}".to_string()),
        Input::Code("return(a+b)".to_string()),
    ]);
    assert_eq!(value, Ok(Value::Int(5)));
}

#[test]
fn direct_value_binds_the_implicit_variable() {
    assert_eq!(run_text("3"), Ok(Value::Int(3)));

    let value = run(&[
        Input::Code("3".to_string()),
        Input::Code("2".to_string()),
    ]);
    assert_eq!(value, Ok(Value::Array(vec![Value::Int(3), Value::Int(2)])));
}

#[test]
fn implicit_variable_reads_like_any_other() {
    let value = run(&[
        Input::Code("3".to_string()),
        Input::Code("return(_ * 4)".to_string()),
    ]);
    assert_eq!(value, Ok(Value::Int(12)));
}

#[test]
fn host_value_input_pools_with_direct_values() {
    let value = run(&[
        Input::Value(Value::Int(7)),
        Input::Code("return(_ + 1)".to_string()),
    ]);
    assert_eq!(value, Ok(Value::Int(8)));
}

#[test]
fn injected_bindings_are_visible() {
    let mut bindings = IndexMap::new();
    bindings.insert("base".to_string(), Value::Int(40));

    let value = run(&[
        Input::Bindings(bindings),
        Input::Code("return(base + 2)".to_string()),
    ]);
    assert_eq!(value, Ok(Value::Int(42)));
}

#[test]
fn result_of_a_plain_program_is_its_projection() {
    let value = run_text("a: 1, _hidden: 2, b: 'x'").expect("run failed");

    let mut expected = IndexMap::new();
    expected.insert("a".to_string(), Value::Int(1));
    expected.insert("b".to_string(), Value::Str("x".into()));
    assert_eq!(value, Value::Object(expected));
}

#[test]
fn result_value_replaces_the_projection() {
    assert_eq!(run_text("a: 21, := a * 2"), Ok(Value::Int(42)));
}

#[test]
fn undefined_names_report_their_location() {
    let error = run_text("a: 1\nb: missing").expect_err("must fail");

    assert!(matches!(error, Error::Evaluate { .. }));
    assert!(error.message().contains("'missing' is undefined"));
    let location = error.location().expect("location expected");
    assert_eq!(location.line, 2);
}

#[test]
fn tag_detail_prefixes_the_stage() {
    let config = Config::new().with_tag_detail(true);
    let error = run_text("a = = 1").expect_err("must fail");
    assert!(error.render(&config).starts_with("[Parser]"));
}

#[test]
fn same_inputs_same_result() {
    let source = "z = {}, for (i = 0; i < 20; i += 1) {z[str(i)] = i * i}, return(z)";
    let first = run_text(source);
    let second = run_text(source);
    assert_eq!(first, second);
}

#[test]
fn string_escapes_survive_evaluation() {
    assert_eq!(
        run_text(r#"return("a\tbA")"#),
        Ok(Value::Str("a\tbA".into()))
    );
}
