use vivjson::{run_text, Value};

#[test]
fn each_call_gets_its_own_captured_frame() {
    let source = "\
        function enclosure(a){x=a; function closure(y){return(x+y)}; return(closure)}; \
        z1=enclosure(100); z2=enclosure(200); return([z1(5), z2(10)])";

    assert_eq!(
        run_text(source),
        Ok(Value::Array(vec![Value::Int(105), Value::Int(210)]))
    );
}

#[test]
fn capture_is_shared_not_copied() {
    // both callables close over the same frame, so a mutation through one
    // is visible through the other even after the defining call returned
    let source = "
        function pair() {
            x = 1
            function read() { return(x) }
            function bump() { x = x + 10 }
            return([read, bump])
        }
        fns = pair()
        reader = fns[0]
        bumper = fns[1]
        before = reader()
        bumper()
        bumper()
        return([before, reader()])
    ";

    assert_eq!(
        run_text(source),
        Ok(Value::Array(vec![Value::Int(1), Value::Int(21)]))
    );
}

#[test]
fn projection_drops_function_definitions() {
    let value = run_text("k = { function fn(a){ return(a) }; y = fn }, return(k)")
        .expect("run failed");

    let Value::Object(members) = value else {
        panic!("expected an object");
    };
    assert_eq!(
        members.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["y"]
    );
}

#[test]
fn top_level_definitions_do_not_capture() {
    // a function defined outside any function resolves free names at the
    // call site
    let source = "
        function shout() { return(message) }
        message = 'ping'
        return(shout())
    ";
    assert_eq!(run_text(source), Ok(Value::Str("ping".into())));
}

#[test]
fn recursion_works_through_the_binding() {
    let source = "
        function fib(n) {
            if (n < 2) { return(n) }
            return(fib(n - 1) + fib(n - 2))
        }
        return(fib(10))
    ";
    assert_eq!(run_text(source), Ok(Value::Int(55)));
}

#[test]
fn reference_parameters_alias_the_callers_chain() {
    let source = "
        function push(reference list, value) { list[len(list)] = value }
        holder = {items: []}
        push(holder.items, 1)
        push(holder.items, 2)
        return(holder.items)
    ";
    assert_eq!(
        run_text(source),
        Ok(Value::Array(vec![Value::Int(1), Value::Int(2)]))
    );
}
