//! Errors and warnings reported by a compile session.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use uscript::prelude::*;

fn compile_one(source: &str) -> (Session, bool) {
    let mut db = database();
    compile(&mut db, &[("Test", source)])
}

fn single_error(source: &str) -> String {
    let (session, ok) = compile_one(source);
    assert!(!ok, "expected a failure");
    let errors = error_messages(&session);
    assert_eq!(errors.len(), 1, "errors: {errors:?}");
    errors[0].clone()
}

#[test]
fn duplicate_variable() {
    let error = single_error("class Test extends Object;\nvar int Health;\nvar int Health;\n");
    assert_eq!(
        error,
        "'Health' conflicts with previously defined variable 'Health'"
    );
}

#[test]
fn error_carries_class_and_line() {
    let (session, _) = compile_one("class Test extends Object;\nvar int Health;\nvar int Health;\n");
    let error = session.diagnostics().errors().next().unwrap();
    assert_eq!(error.section.as_deref(), Some("Test"));
    assert_eq!(error.row, 3);
    assert!(error.to_string().starts_with("Test:3: error: "));
}

#[test]
fn private_members_are_hidden_from_subclasses() {
    let mut db = database();
    let (session, ok) = compile(
        &mut db,
        &[
            ("Base", "class Base extends Object;\nvar private int Secret;\n"),
            (
                "Peek",
                "class Peek extends Base;\nfunction int Read() { return Secret; }\n",
            ),
        ],
    );
    assert!(!ok);
    let errors = error_messages(&session);
    assert_eq!(errors.len(), 1, "errors: {errors:?}");
    assert!(errors[0].starts_with("Can't access private variable 'Secret'"), "{}", errors[0]);
}

#[test]
fn children_of_broken_classes_are_skipped() {
    let mut db = database();
    let (session, ok) = compile(
        &mut db,
        &[
            ("Broken", "class Broken extends Object;\nvar int A;\nvar int A;\n"),
            ("Child", "class Child extends Broken;\nvar int B;\n"),
        ],
    );
    assert!(!ok);
    let errors = error_messages(&session);
    assert_eq!(errors.len(), 2, "errors: {errors:?}");
    assert!(errors[1].contains("superclass 'Broken' has errors"), "{}", errors[1]);

    let child = db.find_class("Child").unwrap();
    assert!(!db.class_flags(child).contains(ClassFlags::PARSED));
}

#[test]
fn incompatible_assignment() {
    let error = single_error(
        r#"
class Test extends Object;

function F(vector V)
{
	local int I;

	I = V;
}
"#,
    );
    assert!(error.starts_with("Type mismatch in assignment"), "{error}");
}

#[test]
fn expression_without_effect() {
    let error = single_error("class Test extends Object;\nfunction F(int A) { A; }\n");
    assert_eq!(error, "Expression has no effect");
}

#[test]
fn missing_return_value_warns() {
    let (session, ok) = compile_one("class Test extends Object;\nfunction int F() { }\n");
    assert!(ok);
    assert_eq!(
        warning_messages(&session),
        vec!["Function 'F' does not return a value".to_string()]
    );
}

#[test]
fn unreferenced_local_warns() {
    let source = "class Test extends Object;\nfunction F()\n{\n\tlocal int Unused;\n}\n";
    let (session, ok) = compile_one(source);
    assert!(ok);
    assert_eq!(
        warning_messages(&session),
        vec!["Unreferenced local variable 'Unused'".to_string()]
    );

    let mut db = database();
    let class = db.add_class("Test", source);
    let object = db.object_class();
    let mut quiet = Session::new(CompilerOptions::default().with_unreferenced_local_warnings(false));
    assert!(quiet.make(&mut db, &[object, class]));
    assert!(!quiet.diagnostics().has_warnings());
}

#[test]
fn redeclared_member_obscures_parent() {
    let mut db = database();
    let (session, ok) = compile(
        &mut db,
        &[
            ("Actor", "class Actor extends Object;\nvar float Speed;\n"),
            ("Pawn", "class Pawn extends Actor;\nvar float Speed;\n"),
        ],
    );
    assert!(ok);
    assert_eq!(
        messages(&session),
        vec!["Pawn:2: warning: 'Speed' obscures 'Speed' defined in base class 'Actor'".to_string()]
    );
}

#[test]
fn cast_to_same_type_is_rejected() {
    let error = single_error("class Test extends Object;\nfunction int F(int X) { return Int(X); }\n");
    assert_eq!(error, "No need to cast 'int' to itself");
}

#[test]
fn private_members_are_visible_in_their_own_class() {
    let (session, ok) = compile_one(
        "class Test extends Object;\nvar private int Secret;\nfunction int Read() { return Secret; }\n",
    );
    assert!(ok, "{:?}", messages(&session));
}

fn errors_of(sources: &[(&str, &str)]) -> Vec<String> {
    let mut db = database();
    let (session, ok) = compile(&mut db, sources);
    assert!(!ok, "expected a failure");
    error_messages(&session)
}

#[test]
fn goto_inside_if_is_rejected() {
    let error = single_error(
        "class Test extends Object;\nfunction F(bool B) { if (B) { goto Done; } Done: return; }\n",
    );
    assert_eq!(error, "'goto' is not allowed here");
}

#[test]
fn do_while_is_rejected() {
    let error = single_error(
        "class Test extends Object;\nfunction F(int A) { do { A++; } while (A < 3); }\n",
    );
    assert_eq!(error, "Use 'until' instead of 'while' to end a 'do' loop");
}

#[test]
fn equally_good_operators_are_ambiguous() {
    let error = single_error(
        r#"
class Test extends Object;

native(200) static final operator(22) int << ( int A, float B );
native(201) static final operator(22) int << ( float A, int B );

function int F(int A, int B)
{
	return A << B;
}
"#,
    );
    assert_eq!(
        error,
        "Operator '<<': 2 candidates are equally good matches with conversion cost 103"
    );
}

#[test]
fn private_members_are_hidden_from_unrelated_classes() {
    let errors = errors_of(&[
        ("Vault", "class Vault extends Object;\nvar private int Secret;\n"),
        (
            "Thief",
            "class Thief extends Object;\nfunction int Steal(Vault V) { return V.Secret; }\n",
        ),
    ]);
    assert_eq!(
        errors,
        vec!["Can't access private variable 'Secret' in 'Vault' from 'Thief'".to_string()]
    );
}

#[test]
fn protected_members_are_visible_to_subclasses() {
    let mut db = database();
    let (session, ok) = compile(
        &mut db,
        &[
            ("Base", "class Base extends Object;\nvar protected int Shared;\n"),
            (
                "Sub",
                "class Sub extends Base;\nfunction int Read() { return Shared; }\n",
            ),
        ],
    );
    assert!(ok, "{:?}", messages(&session));

    let errors = errors_of(&[
        ("Base", "class Base extends Object;\nvar protected int Shared;\n"),
        (
            "Other",
            "class Other extends Object;\nfunction int Read(Base V) { return V.Shared; }\n",
        ),
    ]);
    assert_eq!(
        errors,
        vec!["Can't access protected variable 'Shared' in 'Base' from 'Other'".to_string()]
    );
}

#[test]
fn oversized_context_member_is_rejected() {
    let error = single_error(
        r#"
class Test extends Object;

struct Big
{
	var int Data[70];
};

var Big Payload;

function F(Test Other)
{
	local Big B;

	B = Other.Payload;
}
"#,
    );
    assert_eq!(
        error,
        "'Payload' is too large to access through an object (280 bytes, at most 255)"
    );
}
