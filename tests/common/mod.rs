//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use uscript::prelude::*;

/// Root class source declaring `Vector`, `Rotator` and the operators the
/// tests rely on.
pub const OBJECT_SOURCE: &str = include_str!("../scripts/Object.uc");

/// A database whose `Object` class carries the fixture source.
pub fn database() -> Database {
    let mut db = Database::new();
    db.add_class("Object", OBJECT_SOURCE);
    db
}

/// Registers `sources` as `(class name, source)` pairs and compiles them
/// together with `Object`.
pub fn compile(db: &mut Database, sources: &[(&str, &str)]) -> (Session, bool) {
    let mut classes = vec![db.object_class()];
    for (name, source) in sources {
        classes.push(db.add_class(name, source));
    }
    let mut session = Session::new(CompilerOptions::default());
    let ok = session.make(db, &classes);
    (session, ok)
}

/// Compiles a single class and panics with the diagnostics on failure.
pub fn compile_ok(db: &mut Database, name: &str, source: &str) -> (Session, FieldId) {
    let (session, ok) = compile(db, &[(name, source)]);
    assert!(ok, "compile failed: {:?}", messages(&session));
    let class = db.find_class(name).expect("class registered");
    (session, class)
}

pub fn messages(session: &Session) -> Vec<String> {
    session.diagnostics().iter().map(ToString::to_string).collect()
}

pub fn error_messages(session: &Session) -> Vec<String> {
    session
        .diagnostics()
        .errors()
        .map(|d| d.message.clone())
        .collect()
}

pub fn warning_messages(session: &Session) -> Vec<String> {
    session
        .diagnostics()
        .warnings()
        .map(|d| d.message.clone())
        .collect()
}

/// The field `name` declared directly in `scope`.
pub fn child(db: &Database, scope: FieldId, name: &str) -> FieldId {
    let interned = db
        .find_name(name)
        .unwrap_or_else(|| panic!("name '{name}' was never interned"));
    db.find_child(scope, &interned)
        .unwrap_or_else(|| panic!("'{name}' not declared in scope"))
}

/// Bytecode stored on a function, state or class.
pub fn script(db: &Database, id: FieldId) -> Vec<u8> {
    db.field(id).scope().expect("field has a scope").script.clone()
}

/// Operand bytes of a field reference.
pub fn field_ref(id: FieldId) -> Vec<u8> {
    id.handle().to_le_bytes().to_vec()
}

/// `LocalVariable` access of parameter or local `name` of `function`.
pub fn local(db: &Database, function: FieldId, name: &str) -> Vec<u8> {
    let mut bytes = vec![ExprToken::LocalVariable.byte()];
    bytes.extend(field_ref(child(db, function, name)));
    bytes
}

/// `InstanceVariable` access of property `name` of `class`.
pub fn instance(db: &Database, class: FieldId, name: &str) -> Vec<u8> {
    let mut bytes = vec![ExprToken::InstanceVariable.byte()];
    bytes.extend(field_ref(child(db, class, name)));
    bytes
}

pub fn op(token: ExprToken) -> Vec<u8> {
    vec![token.byte()]
}

/// Operand bytes of an interned name.
pub fn name_ref(db: &Database, text: &str) -> Vec<u8> {
    let name = db
        .find_name(text)
        .unwrap_or_else(|| panic!("name '{text}' was never interned"));
    name.index().to_le_bytes().to_vec()
}
