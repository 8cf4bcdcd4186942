use rproto::{
    intern, Config, Error, FallbackPolicy, Handle, Kind, OpCode, RuntimeError, Transcript, Value,
    VM,
};
use test_case::test_case;

fn numbers(vm: &VM, stack: &[Handle]) -> Vec<f64> {
    stack
        .iter()
        .map(|h| vm.heap().number(*h).expect("a number"))
        .collect()
}

fn rendered(vm: &VM, stack: &[Handle]) -> Vec<String> {
    stack.iter().map(|h| vm.render(*h)).collect()
}

const FACTORIAL: &str = r#"
"factorial" : [ @@n
  1 n [ > ] [ if [ n n [ 1- ] factorial [ * ] ] else [ 1 ] ]
] ;
"#;

#[test_case("3 5 [ - ]", 2.0; "subtract")]
#[test_case("3 5 [ + ]", 8.0; "add")]
#[test_case("4 3 [ * ]", 12.0; "multiply")]
#[test_case("2 10 [ / ]", 5.0; "divide")]
#[test_case("3 10 [ % ]", 1.0; "remainder")]
#[test_case("7 [ 1+ ]", 8.0; "increment")]
#[test_case("7 [ 1- ]", 6.0; "decrement")]
#[test_case("-1.5 0.5 [ + ]", -1.0; "fractions")]
fn arithmetic(source: &str, expected: f64) {
    let mut vm = VM::default();
    let stack = vm.interpret(source).unwrap();
    assert_eq!(numbers(&vm, &stack), vec![expected]);
}

#[test_case("3 5 [ > ]", true; "greater")]
#[test_case("3 5 [ < ]", false; "less")]
#[test_case("5 5 [ = ]", true; "equal numbers")]
#[test_case(r#""a" "b" [ = ]"#, false; "different texts")]
#[test_case(r#""a" "a" [ = ]"#, true; "equal texts")]
fn comparison(source: &str, expected: bool) {
    let mut vm = VM::default();
    let stack = vm.interpret(source).unwrap();
    assert_eq!(stack, vec![vm.library().boolean(expected)]);
}

#[test_case(r#""5" 5 [ = ]"#, "number"; "number against text")]
#[test_case("true 5 [ = ]", "number"; "number against object")]
#[test_case(r#"5 "5" [ = ]"#, "text"; "text against number")]
fn equality_rejects_other_kinds(source: &str, kind: &str) {
    let mut vm = VM::default();
    match vm.interpret(source) {
        Err(Error::Runtime(RuntimeError::TypeMismatch { expected, .. })) => {
            assert_eq!(expected, kind)
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test_case("proto dup [ me ] same?", true; "me is the receiver")]
#[test_case("proto proto same?", false; "protos are distinct")]
#[test_case("5 5 same?", false; "literals are fresh values")]
#[test_case("true true same?", true; "booleans are shared")]
#[test_case(r#"proto dup [ "self" : [ me ] ; ] dup [ self ] same?"#, true; "me inside a method")]
fn identity(source: &str, expected: bool) {
    let mut vm = VM::default();
    let stack = vm.interpret(source).unwrap();
    assert_eq!(stack.last(), Some(&vm.library().boolean(expected)));
}

#[test_case(r#"proto dup [ "size" 3 ; : [ size ] run/current ]"#; "run current sees the receiver")]
#[test_case(r#"proto dup [ "size" 3 ; : [ size ] run ]"#; "run sees the receiver")]
#[test_case(r#"proto dup [ "size" 3 ; : [ size ] [ run/current ] ]"#; "closure as receiver")]
fn closures_run_inside_objects(source: &str) {
    let mut vm = VM::default();
    let stack = vm.interpret(source).unwrap();
    assert_eq!(stack.len(), 2);
    assert!(matches!(vm.heap()[stack[0]].kind, Kind::Object));
    assert_eq!(vm.heap().number(stack[1]), Some(3.0));
}

#[test_case("true [ if [ \"A\" ] else [ \"B\" ] ]", "A"; "true picks if")]
#[test_case("false [ if [ \"A\" ] else [ \"B\" ] ]", "B"; "false picks else")]
#[test_case("true [ not ] [ as-string ]", "false"; "not")]
#[test_case("true false [ and ] [ as-string ]", "false"; "and")]
#[test_case("false true [ or ] [ as-string ]", "true"; "or")]
#[test_case("1 2 [ < ] [ as-string ]", "false"; "comparison result")]
#[test_case("2.5 [ as-string ]", "2.5"; "number as string")]
fn booleans(source: &str, expected: &str) {
    let mut vm = VM::default();
    let stack = vm.interpret(source).unwrap();
    assert_eq!(rendered(&vm, &stack), vec![expected]);
}

#[test]
fn booleans_are_plain_objects() {
    let mut vm = VM::default();
    let stack = vm.interpret("true false").unwrap();
    for b in stack {
        assert!(matches!(vm.heap()[b].kind, Kind::Object));
        assert!(vm.heap().lookup(b, intern::id("if")).is_some());
    }
}

#[test]
fn recursion_binds_on_every_activation() {
    let mut vm = VM::default();
    let stack = vm.interpret(&format!("{} 5 factorial", FACTORIAL)).unwrap();
    assert_eq!(numbers(&vm, &stack), vec![120.0]);
}

#[test]
fn definition_time_parameters_are_fixed() {
    let mut vm = VM::default();
    let src = "3 : [ @x @@y x y [ + ] ] dup 10 swap [ run/current ] swap 20 swap [ run/current ]";
    let stack = vm.interpret(src).unwrap();
    assert_eq!(numbers(&vm, &stack), vec![13.0, 23.0]);
}

#[test]
fn definition_time_parameters_reach_nested_blocks() {
    let mut vm = VM::default();
    let src = "5 3 : [ @x @@y proto [ x y [ + ] ] ] [ run/current ]";
    let stack = vm.interpret(src).unwrap();
    assert_eq!(numbers(&vm, &stack), vec![8.0]);
}

#[test_case(": [ 1 stop 2 ] run/current 3", vec![1.0, 3.0]; "stop skips the rest of the block")]
#[test_case(": [ 1 : [ 2 stop 3 ] run/current 4 ] run/current 5", vec![1.0, 2.0, 4.0, 5.0]; "stop only unwinds its own frame")]
#[test_case("1 stop 2", vec![1.0]; "stop at toplevel")]
#[test_case(": [ 1 stop ] dup run/current swap run/current", vec![1.0, 1.0]; "a stopped block runs again")]
fn stop(source: &str, expected: Vec<f64>) {
    let mut vm = VM::default();
    let stack = vm.interpret(source).unwrap();
    assert_eq!(numbers(&vm, &stack), expected);
}

#[test]
fn stop_restores_the_scope_chain() {
    let mut vm = VM::default();
    let err = vm
        .interpret(": [ false [ not ] [ if [ stop ] ] ] run/current 5 [ not ]")
        .unwrap_err();
    assert!(matches!(err, Error::Runtime(RuntimeError::NotUnderstood(m)) if m == "not"));
}

#[test]
fn run_merges_leftovers_into_the_caller() {
    let mut vm = VM::default();
    let stack = vm.interpret("1 : [ 2 3 ] run [ + ]").unwrap();
    assert_eq!(numbers(&vm, &stack), vec![1.0, 5.0]);
}

#[test]
fn run_needs_a_block() {
    let mut vm = VM::default();
    let err = vm.interpret("5 run").unwrap_err();
    assert!(matches!(
        err,
        Error::Runtime(RuntimeError::TypeMismatch {
            expected: "block",
            ..
        })
    ));
}

#[test]
fn definitions_do_not_outlive_a_run() {
    let mut vm = VM::default();
    vm.interpret(r#""seven" 7 ;"#).unwrap();
    let err = vm.interpret("seven").unwrap_err();
    assert!(matches!(err, Error::Runtime(RuntimeError::NotUnderstood(m)) if m == "seven"));
}

#[test]
fn stack_pop_is_lifo() {
    let mut vm = VM::default();
    let stack = vm
        .interpret("stack dup [ 1 push 2 push 3 push ] [ pop pop pop ]")
        .unwrap();
    assert_eq!(numbers(&vm, &stack), vec![3.0, 2.0, 1.0]);
}

#[test]
fn stack_shift_is_fifo() {
    let mut vm = VM::default();
    let stack = vm
        .interpret("stack dup [ 1 push 2 push 3 push ] [ shift shift shift ]")
        .unwrap();
    assert_eq!(numbers(&vm, &stack), vec![1.0, 2.0, 3.0]);
}

#[test]
fn stack_reports_emptiness() {
    let mut vm = VM::default();
    let src = "stack dup [ empty? ] swap dup [ 5 push ] dup [ empty? ] swap [ pop drop empty? ]";
    let stack = vm.interpret(src).unwrap();
    let (t, f) = (vm.library().boolean(true), vm.library().boolean(false));
    assert_eq!(stack, vec![t, f, t]);
}

#[test]
fn stacks_are_fresh_per_call() {
    let mut vm = VM::default();
    let stack = vm
        .interpret("stack dup [ 1 push ] drop stack [ size ]")
        .unwrap();
    assert_eq!(numbers(&vm, &stack), vec![0.0]);
}

#[test]
fn pop_all_leaves_no_reachable_node() {
    let mut vm = VM::default();
    let stack = vm
        .interpret("stack dup [ 1 push 2 push 3 push pop-all empty? ]")
        .unwrap();
    assert_eq!(stack[1], vm.library().boolean(true));

    let value = intern::id("value");
    let heap = vm.heap();
    let reachable = heap.trace(vec![stack[0]]);
    assert!(reachable
        .iter()
        .all(|h| heap.lookup(*h, value).is_none()));
}

#[test]
fn stack_survives_collections() {
    let config = Config {
        gc_threshold: 16,
        ..Config::default()
    };
    let mut vm = VM::new(config);
    let src = r#"
        "fill" : [ @@n 0 n [ > ] [ if [ dup [ n push ] n [ 1- ] fill ] ] ] ;
        stack 50 fill dup [ size ] swap [ pop ]
    "#;
    let stack = vm.interpret(src).unwrap();
    assert_eq!(numbers(&vm, &stack), vec![50.0, 1.0]);
}

#[test]
fn console_says_rendered_values() {
    let transcript = Transcript::default();
    let mut vm = VM::default().with_output(transcript.clone());
    let src = r#"console [ "hello world" say 42 say ] 0.5 console [ say ] : [ 1 ] console [ say ]"#;
    let stack = vm.interpret(src).unwrap();
    assert!(stack.is_empty());
    assert_eq!(transcript.lines(), vec!["hello world", "42", "0.5", "[ 1 ]"]);
}

#[test]
fn unknown_words_are_not_understood() {
    let mut vm = VM::default();
    let err = vm.interpret("1 2 frobnicate").unwrap_err();
    assert!(matches!(err, Error::Runtime(RuntimeError::NotUnderstood(m)) if m == "frobnicate"));
}

#[test_case("]"; "unexpected close")]
#[test_case("[ 1"; "unclosed block")]
fn malformed_sources_do_not_run(source: &str) {
    let mut vm = VM::default().with_output(Transcript::default());
    assert!(matches!(vm.interpret(source), Err(Error::Parse(_))));
}

#[test]
fn unterminated_text_is_a_scan_error() {
    let mut vm = VM::default();
    assert!(matches!(vm.interpret("\"oops"), Err(Error::Scan(_))));
}

#[test]
fn underflow_is_an_error() {
    let mut vm = VM::default();
    assert!(matches!(
        vm.interpret("drop"),
        Err(Error::Runtime(RuntimeError::StackUnderflow))
    ));
}

/// An object whose fallback hook runs `body`, ahead of a block sending it
/// `message`.
fn guarded(vm: &mut VM, body: Vec<Handle>, message: &str) -> (Handle, Vec<Handle>) {
    let heap = vm.heap_mut();
    let hook = heap.alloc(Value::block(body));
    let mut guard = Value::new(Kind::Object);
    guard.fallback = Some(hook);
    let guard = heap.alloc(guard);
    let block = vm.load(&format!("[ {} ]", message)).unwrap();
    (block, vec![guard])
}

fn catching(vm: &mut VM, message: &str) -> (Handle, Vec<Handle>) {
    let drop = vm.library().prim(OpCode::Drop);
    let caught = vm.text("caught");
    guarded(vm, vec![drop, caught], message)
}

#[test]
fn nearest_fallback_wins() {
    let mut vm = VM::default();
    let (block, stack) = catching(&mut vm, "anything");
    let stack = vm.run(block, stack).unwrap();
    assert_eq!(rendered(&vm, &stack), vec!["caught"]);
}

#[test]
fn accumulated_fallbacks_reach_the_base() {
    let config = Config {
        fallback: FallbackPolicy::Accumulate,
        ..Config::default()
    };
    let mut vm = VM::new(config);
    let (block, stack) = catching(&mut vm, "anything");
    let err = vm.run(block, stack).unwrap_err();
    assert!(matches!(err, RuntimeError::NotUnderstood(m) if m == "anything"));

    // each level got its own copy of the message, the base converted one
    let (block, stack) = catching(&mut vm, "42");
    let stack = vm.run(block, stack).unwrap();
    assert_eq!(rendered(&vm, &stack), vec!["42", "caught"]);
    assert!(vm.heap()[stack[0]].is_message());
}

#[test_case(FallbackPolicy::FirstOnly, Some(42.0); "first only converts once")]
#[test_case(FallbackPolicy::Accumulate, None; "accumulate converts twice")]
fn stacked_literal_fallbacks(policy: FallbackPolicy, expected: Option<f64>) {
    let config = Config {
        fallback: policy,
        ..Config::default()
    };
    let mut vm = VM::new(config);
    let convert = vm.library().prim(OpCode::Fallback);
    let (block, stack) = guarded(&mut vm, vec![convert], "42");
    match (vm.run(block, stack), expected) {
        (Ok(stack), Some(n)) => assert_eq!(numbers(&vm, &stack), vec![n]),
        (Err(RuntimeError::NotAMessage(found)), None) => assert_eq!(found, "42"),
        (other, _) => panic!("unexpected {:?}", other),
    }
}

#[test]
fn runs_start_from_a_given_stack() {
    let mut vm = VM::default();
    let block = vm.load(&format!("{} factorial", FACTORIAL)).unwrap();
    let four = vm.number(4.0);
    let stack = vm.run(block, vec![four]).unwrap();
    assert_eq!(numbers(&vm, &stack), vec![24.0]);
}
