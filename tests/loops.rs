use vivjson::{run_text, run_with_config, Config, Input, Value};

#[test]
fn for_in_collects_into_an_object() {
    let source =
        r#"z={}, for(v in [{"x":"dog","y":2},{"x":"cat","y":3}]){z[v.x]=v.y}, return(z)"#;
    let value = run_text(source).expect("run failed");

    let Value::Object(members) = value else {
        panic!("expected an object");
    };
    assert_eq!(
        members.iter().map(|(k, v)| (k.as_str(), v.clone())).collect::<Vec<_>>(),
        vec![("dog", Value::Int(2)), ("cat", Value::Int(3))]
    );
}

#[test]
fn loop_variable_survives_the_loop() {
    assert_eq!(
        run_text("for(i=0; i<5; i+=1){}; return(i)"),
        Ok(Value::Int(5))
    );
}

#[test]
fn loop_cap_stops_the_same_program() {
    let config = Config::new().with_max_loop_times(3);
    let result = run_with_config(
        &[Input::Code("for(i=0; i<5; i+=1){}; return(i)".to_string())],
        &config,
    );
    assert!(result.is_err());
}

#[test]
fn for_in_walks_object_keys_in_order() {
    let source = "src: {b: 1, a: 2, c: 3}, keys: [], for (k in src) {keys += [k]}, return(keys)";
    assert_eq!(
        run_text(source),
        Ok(Value::Array(vec![
            Value::Str("b".into()),
            Value::Str("a".into()),
            Value::Str("c".into()),
        ]))
    );
}

#[test]
fn condition_only_form_is_a_while_loop() {
    let source = "n = 0, for (n < 4) {n += 1}, return(n)";
    assert_eq!(run_text(source), Ok(Value::Int(4)));
}

#[test]
fn bare_for_runs_until_break() {
    let source = "n = 0, for {n += 1; if (n == 7) {break}}, return(n)";
    assert_eq!(run_text(source), Ok(Value::Int(7)));
}

#[test]
fn bare_for_without_break_hits_the_cap() {
    assert!(run_text("for {}").is_err());
}

#[test]
fn continue_still_runs_the_update() {
    let source = "
        odd = 0
        for (i = 0; i < 6; i += 1) {
            if (i % 2 == 0) { continue }
            odd += i
        }
        return(odd)
    ";
    assert_eq!(run_text(source), Ok(Value::Int(9)));
}

#[test]
fn break_leaves_only_the_innermost_loop() {
    let source = "
        count = 0
        for (i = 0; i < 3; i += 1) {
            for (j = 0; j < 10; j += 1) {
                if (j == 2) { break }
                count += 1
            }
        }
        return(count)
    ";
    assert_eq!(run_text(source), Ok(Value::Int(6)));
}

#[test]
fn empty_iterables_skip_the_body() {
    assert_eq!(
        run_text("n = 0, for (x in []) {n += 1}, return(n)"),
        Ok(Value::Int(0))
    );
}

#[test]
fn iterating_a_number_fails() {
    assert!(run_text("for (x in 5) {}").is_err());
}
