//! Type system integration tests: traits, closure inference and the
//! diagnostics the checker produces.

use pretty_assertions::assert_eq;

use crate::module::QualifiedName;

use super::support::{messages, TestCompiler};

#[test]
fn unimplemented_required_methods_retract_the_implementation() {
    let mut harness = TestCompiler::new();

    let main = harness.builder("main");
    let main_body = main.body(vec![
        main.trait_declaration(
            "ToString",
            vec![main.required_method("to_string", Vec::new(), Some(main.named_type("String")))],
        ),
        main.object("Point", Vec::new()),
        main.implement("ToString", "Point", Vec::new()),
    ]);
    harness.add("main", main_body);

    let compiler = harness.compile("main");

    assert!(compiler
        .state
        .diagnostics
        .iter()
        .any(|error| error.is_unimplemented_method()));

    // Point must not remain an implementer of ToString.
    let module = compiler
        .state
        .module(&QualifiedName::from_dotted("main"))
        .unwrap();
    let point = module.globals.borrow().lookup("Point").unwrap().value_type;

    assert!(!compiler.state.types.object_implements_trait(point, "ToString"));
}

#[test]
fn satisfied_trait_requirements_compile_cleanly() {
    let mut harness = TestCompiler::new();

    let main = harness.builder("main");
    let main_body = main.body(vec![
        main.trait_declaration(
            "ToString",
            vec![main.required_method("to_string", Vec::new(), Some(main.named_type("String")))],
        ),
        main.object("Point", Vec::new()),
        main.implement(
            "ToString",
            "Point",
            vec![main.method(
                "to_string",
                Vec::new(),
                Some(main.named_type("String")),
                None,
                vec![main.string("point")],
            )],
        ),
    ]);
    harness.add("main", main_body);

    let compiler = harness.compile("main");

    assert_eq!(messages(&compiler), Vec::<String>::new());

    let module = compiler
        .state
        .module(&QualifiedName::from_dotted("main"))
        .unwrap();
    let point = module.globals.borrow().lookup("Point").unwrap().value_type;

    assert!(compiler.state.types.object_implements_trait(point, "ToString"));
    assert!(compiler.state.types.responds_to_message(point, "to_string"));
}

#[test]
fn closure_arguments_are_inferred_from_the_expected_signature() {
    let mut harness = TestCompiler::new();

    let main = harness.builder("main");
    let expected = main.closure_type(
        vec![main.named_type("Integer")],
        main.named_type("Integer"),
    );

    let main_body = main.body(vec![
        main.integer_plus(),
        main.method(
            "apply",
            vec![main.argument("f", Some(expected))],
            Some(main.named_type("Integer")),
            None,
            vec![main.send(Some(main.ident("f")), "call", vec![main.int(1)])],
        ),
        main.method(
            "main",
            Vec::new(),
            None,
            None,
            vec![main.send(
                None,
                "apply",
                vec![main.closure(
                    vec![main.argument("x", None)],
                    vec![main.send(Some(main.ident("x")), "+", vec![main.int(1)])],
                )],
            )],
        ),
    ]);
    harness.add("main", main_body);

    let compiler = harness.compile("main");

    assert_eq!(messages(&compiler), Vec::<String>::new());
}

#[test]
fn reopening_a_trait_is_an_error() {
    let mut harness = TestCompiler::new();

    let main = harness.builder("main");
    let main_body = main.body(vec![
        main.trait_declaration("T", Vec::new()),
        main.reopen(
            "T",
            vec![main.method("x", Vec::new(), None, None, Vec::new())],
        ),
    ]);
    harness.add("main", main_body);

    let compiler = harness.compile("main");

    assert!(compiler
        .state
        .diagnostics
        .iter()
        .any(|error| error.is_not_an_object()));
}

#[test]
fn sending_an_unknown_message_is_reported() {
    let mut harness = TestCompiler::new();

    let main = harness.builder("main");
    let main_body = main.body(vec![main.method(
        "main",
        Vec::new(),
        None,
        None,
        vec![main.send(Some(main.int(1)), "frobnicate", vec![])],
    )]);
    harness.add("main", main_body);

    let compiler = harness.compile("main");

    assert!(compiler
        .state
        .diagnostics
        .iter()
        .any(|error| error.is_undefined_method()));
}

#[test]
fn explicit_return_types_are_checked() {
    let mut harness = TestCompiler::new();

    let main = harness.builder("main");
    let main_body = main.body(vec![main.method(
        "answer",
        Vec::new(),
        Some(main.named_type("Integer")),
        None,
        vec![main.string("forty-two")],
    )]);
    harness.add("main", main_body);

    let compiler = harness.compile("main");

    assert!(compiler
        .state
        .diagnostics
        .iter()
        .any(|error| error.is_type_mismatch()));
}

#[test]
fn argument_counts_are_checked() {
    let mut harness = TestCompiler::new();

    let main = harness.builder("main");
    let main_body = main.body(vec![
        main.method("noop", Vec::new(), None, None, Vec::new()),
        main.method(
            "main",
            Vec::new(),
            None,
            None,
            vec![main.send(None, "noop", vec![main.int(1)])],
        ),
    ]);
    harness.add("main", main_body);

    let compiler = harness.compile("main");

    assert!(compiler
        .state
        .diagnostics
        .iter()
        .any(|error| error.is_argument_count()));
}

#[test]
fn unused_locals_warn_without_failing_the_build() {
    let mut harness = TestCompiler::new();

    let main = harness.builder("main");
    let main_body = main.body(vec![main.method(
        "main",
        Vec::new(),
        None,
        None,
        vec![
            main.let_local("unused", main.int(1)),
            main.let_local("_ignored", main.int(2)),
        ],
    )]);
    harness.add("main", main_body);

    let compiler = harness.compile("main");

    let unused = compiler
        .state
        .diagnostics
        .iter()
        .filter(|error| error.is_unused_local())
        .count();

    assert_eq!(unused, 1);
    assert!(!compiler.state.has_errors());
}
