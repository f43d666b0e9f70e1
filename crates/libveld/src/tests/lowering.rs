//! TIR generation tests: argument defaults, captures and tail calls.

use pretty_assertions::assert_eq;

use crate::tir::{CodeObject, InstructionKind};

use super::support::{messages, module_body, TestCompiler};

fn find_child<'a>(code: &'a CodeObject, name: &str) -> Option<&'a CodeObject> {
    if code.name == name {
        return Some(code);
    }

    code.code_objects
        .iter()
        .find_map(|child| find_child(child, name))
}

fn kinds(code: &CodeObject) -> Vec<InstructionKind> {
    code.blocks
        .iter()
        .flat_map(|block| block.instructions.iter())
        .map(InstructionKind::from)
        .collect()
}

#[test]
fn rest_arguments_default_to_an_empty_array() {
    let mut harness = TestCompiler::new();

    let main = harness.builder("main");
    let main_body = main.body(vec![
        main.array_length(),
        main.method(
            "f",
            vec![main.rest_argument("xs", Some(main.named_type("Integer")))],
            Some(main.named_type("Integer")),
            None,
            vec![main.send(Some(main.ident("xs")), "length", vec![])],
        ),
        main.method(
            "main",
            Vec::new(),
            None,
            None,
            vec![main.send(None, "f", vec![])],
        ),
    ]);
    harness.add("main", main_body);

    let compiler = harness.compile("main");

    assert_eq!(messages(&compiler), Vec::<String>::new());

    let body = module_body(&compiler, "main").expect("main lowered");
    let f = find_child(body, "f").expect("a code object for fn f");

    assert!(f.rest_argument);
    assert_eq!(f.required_arguments, 0);

    // The default-setup guard block binds xs to an empty array.
    let guard = f
        .blocks
        .iter()
        .find(|block| block.name == "xs_default")
        .expect("a default guard block for xs");
    let guard_kinds = guard
        .instructions
        .iter()
        .map(InstructionKind::from)
        .collect::<Vec<_>>();

    assert!(guard_kinds.contains(&InstructionKind::LocalExists));
    assert!(guard_kinds.contains(&InstructionKind::SetArray));
    assert!(guard_kinds.contains(&InstructionKind::SetLocal));
}

#[test]
fn closures_reading_enclosing_locals_capture() {
    let mut harness = TestCompiler::new();

    let main = harness.builder("main");
    let main_body = main.body(vec![main.method(
        "outer",
        Vec::new(),
        None,
        None,
        vec![
            main.let_local("a", main.int(1)),
            main.closure(Vec::new(), vec![main.ident("a")]),
        ],
    )]);
    harness.add("main", main_body);

    let compiler = harness.compile("main");

    assert_eq!(messages(&compiler), Vec::<String>::new());

    let body = module_body(&compiler, "main").expect("main lowered");
    let closure = find_child(body, "<closure>").expect("the closure's code object");

    assert!(closure.captures);
    assert!(kinds(closure).contains(&InstructionKind::GetParentLocal));

    let outer = find_child(body, "outer").unwrap();
    assert!(!outer.captures);
}

#[test]
fn self_recursive_methods_become_tail_calls() {
    let mut harness = TestCompiler::new();

    let main = harness.builder("main");
    let main_body = main.body(vec![main.object(
        "Counter",
        vec![main.method(
            "spin",
            Vec::new(),
            None,
            None,
            vec![main.send(None, "spin", vec![])],
        )],
    )]);
    harness.add("main", main_body);

    let compiler = harness.compile("main");

    assert_eq!(messages(&compiler), Vec::<String>::new());

    let body = module_body(&compiler, "main").expect("main lowered");
    let spin = find_child(body, "spin").expect("a code object for spin");
    let spin_kinds = kinds(spin);

    assert!(spin_kinds.contains(&InstructionKind::TailCall));
    assert!(!spin_kinds.contains(&InstructionKind::RunBlockWithReceiver));
}

#[test]
fn method_declarations_attach_blocks_to_self() {
    let mut harness = TestCompiler::new();

    let main = harness.builder("main");
    let main_body = main.body(vec![main.method(
        "answer",
        Vec::new(),
        Some(main.named_type("Integer")),
        None,
        vec![main.int(42)],
    )]);
    harness.add("main", main_body);

    let compiler = harness.compile("main");

    assert_eq!(messages(&compiler), Vec::<String>::new());

    let body = module_body(&compiler, "main").expect("main lowered");
    let body_kinds = kinds(body);

    // SetBlock materializes the method, SetAttribute attaches it to the
    // module object, SetGlobal exposes it as a module global.
    assert!(body_kinds.contains(&InstructionKind::SetBlock));
    assert!(body_kinds.contains(&InstructionKind::SetAttribute));
    assert!(body_kinds.contains(&InstructionKind::SetGlobal));
}

#[test]
fn synthesized_constructors_allocate_and_initialize() {
    let mut harness = TestCompiler::new();

    let main = harness.builder("main");
    let main_body = main.body(vec![
        main.object(
            "Point",
            vec![main.method(
                "init",
                vec![main.argument("x", Some(main.named_type("Integer")))],
                None,
                None,
                vec![],
            )],
        ),
        main.method(
            "main",
            Vec::new(),
            None,
            None,
            vec![main.send(Some(main.constant("Point")), "new", vec![main.int(1)])],
        ),
    ]);
    harness.add("main", main_body);

    let compiler = harness.compile("main");

    assert_eq!(messages(&compiler), Vec::<String>::new());

    let body = module_body(&compiler, "main").expect("main lowered");
    let new = find_child(body, "new").expect("a synthesized new");
    let new_kinds = kinds(new);

    assert!(new_kinds.contains(&InstructionKind::SetObject));
    assert!(new_kinds.contains(&InstructionKind::RunBlockWithReceiver));
    assert_eq!(new.required_arguments, 1);
}
