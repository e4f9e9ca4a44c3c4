//! Declaration pass: class headers, property layout, signatures and states.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use uscript::prelude::*;

const THING: &str = r#"
class Thing extends Object
	native
	config(Game);

var byte Small;
var int Count;
var vector Location;
var bool bHidden;
var() float Speed[4];
"#;

#[test]
fn fixture_object_compiles() {
    let mut db = database();
    let (session, ok) = compile(&mut db, &[]);
    assert!(ok, "{:?}", messages(&session));
    let object = db.object_class();
    assert!(db.class_flags(object).contains(ClassFlags::COMPILED));
    assert!(db.vector_struct().is_some());
    assert!(db.rotator_struct().is_some());
}

#[test]
fn class_header_sets_flags_and_config() {
    let mut db = database();
    let (_, thing) = compile_ok(&mut db, "Thing", THING);
    let def = db.field(thing).as_class().unwrap();
    assert!(def.flags.contains(ClassFlags::NATIVE | ClassFlags::CONFIG));
    assert!(def.flags.contains(ClassFlags::PARSED | ClassFlags::COMPILED));
    assert_eq!(def.config_name.as_ref().map(|n| n.to_string()), Some("Game".to_string()));
    assert_eq!(db.super_field(thing), Some(db.object_class()));
}

#[test]
fn properties_are_laid_out_in_order() {
    let mut db = database();
    let (_, thing) = compile_ok(&mut db, "Thing", THING);
    let offset = |name: &str| db.field(child(&db, thing, name)).as_property().unwrap().offset;
    assert_eq!(offset("Small"), 0);
    assert_eq!(offset("Count"), 4);
    assert_eq!(offset("Location"), 8);
    assert_eq!(offset("bHidden"), 20);
    assert_eq!(offset("Speed"), 24);

    let def = db.field(thing).as_class().unwrap();
    assert_eq!(def.state.scope.properties_size, 40);
    assert_eq!(def.defaults.len(), 40);

    let speed = db.field(child(&db, thing, "Speed")).as_property().unwrap();
    assert_eq!(speed.ty.array_dim, 4);
    assert!(speed.flags().contains(PropertyFlags::EDIT));
    assert_eq!(speed.category.to_string(), "Thing");
}

#[test]
fn subclass_properties_follow_parent() {
    let mut db = database();
    let (session, ok) = compile(
        &mut db,
        &[
            ("Pawn", "class Pawn extends Actor; var int Health;"),
            ("Actor", "class Actor extends Object; var int Tag; var byte Role;"),
        ],
    );
    assert!(ok, "{:?}", messages(&session));
    let pawn = db.find_class("Pawn").unwrap();
    let health = db.field(child(&db, pawn, "Health")).as_property().unwrap();
    assert_eq!(health.offset, 8);
    assert_eq!(db.field(pawn).scope().unwrap().properties_size, 12);
}

#[test]
fn function_frames_include_return_value() {
    let mut db = database();
    let (_, calc) = compile_ok(
        &mut db,
        "Calc",
        "class Calc extends Object;\nfunction int Add(int A, int B) { return A + B; }\n",
    );
    let add = child(&db, calc, "Add");
    let def = db.field(add).as_function().unwrap();
    assert_eq!(def.num_parms, 3);
    assert_eq!(def.parms_size, 12);
    assert_eq!(def.return_value_offset, Some(8));
    assert!(def.flags.contains(FunctionFlags::DEFINED));
    assert_eq!(db.parameters(add).count(), 2);
}

#[test]
fn enums_structs_and_constants() {
    let mut db = database();
    let (_, pawn) = compile_ok(
        &mut db,
        "Pawn",
        r#"
class Pawn extends Object;

const MaxHealth = 100;

enum EPhysics
{
	PHYS_None,
	PHYS_Walking,
	PHYS_Falling,
};

struct Limb
{
	var byte Kind;
	var vector Offset;
};

var EPhysics Physics;
var Limb Limbs[EPhysics];
"#,
    );
    let physics = db.field(child(&db, pawn, "EPhysics")).as_enum().unwrap();
    assert_eq!(physics.tags.len(), 3);

    let limb = db.field(child(&db, pawn, "Limb")).as_struct().unwrap();
    assert_eq!(limb.scope.properties_size, 16);

    let limbs = db.field(child(&db, pawn, "Limbs")).as_property().unwrap();
    assert_eq!(limbs.ty.array_dim, 3);
    assert_eq!(limbs.ty.kind, PropertyKind::Struct);

    let max = db.field(child(&db, pawn, "MaxHealth")).as_const().unwrap();
    assert_eq!(max.value, "100");
}

#[test]
fn operators_are_keyed_by_signature() {
    let mut db = database();
    let (session, ok) = compile(&mut db, &[]);
    assert!(ok, "{:?}", messages(&session));
    let object = db.object_class();
    let operators: Vec<FieldId> = db
        .children(object)
        .iter()
        .copied()
        .filter(|&f| {
            db.field(f)
                .as_function()
                .is_some_and(|d| d.friendly_name.as_ref().is_some_and(|n| n.matches("==")))
        })
        .collect();
    assert_eq!(operators.len(), 6);
    let pre = child(&db, object, "pre++_int");
    let post = child(&db, object, "post++_int");
    assert!(db.field(pre).as_function().unwrap().flags.contains(FunctionFlags::PRE_OPERATOR));
    assert!(db.field(post).as_function().unwrap().flags.contains(FunctionFlags::OPERATOR));
}

#[test]
fn override_links_super_function() {
    let mut db = database();
    let (session, ok) = compile(
        &mut db,
        &[
            ("Base", "class Base extends Object;\nevent Touch(Object Other) {}\n"),
            ("Derived", "class Derived extends Base;\nfunction Touch(Object Other) {}\n"),
        ],
    );
    assert!(ok, "{:?}", messages(&session));
    let base = db.find_class("Base").unwrap();
    let derived = db.find_class("Derived").unwrap();
    let original = child(&db, base, "Touch");
    let touch = db.field(child(&db, derived, "Touch")).as_function().unwrap();
    assert_eq!(touch.scope.super_field, Some(original));
    assert!(touch.flags.contains(FunctionFlags::EVENT));
}

#[test]
fn states_collect_probe_masks() {
    let mut db = database();
    let (_, actor) = compile_ok(
        &mut db,
        "Actor",
        r#"
class Actor extends Object;

event Touch(Object Other) {}
event Timer() {}

auto state Idle
{
	ignores Touch;

	event Tick(float DeltaTime) {}
}
"#,
    );
    let touch = 1u64 << 11;
    let timer = 1u64 << 6;
    let tick = 1u64 << 33;

    let class_mask = db.field(actor).state().unwrap().probe_mask;
    assert_eq!(class_mask & (touch | timer | tick), touch | timer);

    let idle = db.field(child(&db, actor, "Idle")).state().unwrap();
    assert!(idle.flags.contains(StateFlags::AUTO));
    assert_eq!(idle.probe_mask & (touch | timer | tick), timer | tick);
}

#[test]
fn declare_pass_can_rerun() {
    let mut db = database();
    let (mut session, thing) = compile_ok(&mut db, "Thing", THING);
    let before = db.children(thing).len();
    session.compile_class(&mut db, thing, Pass::Declare).unwrap();
    session.compile_class(&mut db, thing, Pass::Declare).unwrap();
    assert_eq!(db.children(thing).len(), before);
    assert!(db.class_flags(thing).contains(ClassFlags::PARSED));
    assert!(!db.class_flags(thing).contains(ClassFlags::COMPILED));
    let count = child(&db, thing, "Count");
    assert_eq!(db.field(count).as_property().unwrap().offset, 4);
}

#[test]
fn native_size_mismatch_warns_once() {
    let mut db = database();
    let a = db.add_class("NativeA", "class NativeA extends Object native; var int X;");
    let b = db.add_class("NativeB", "class NativeB extends Object native; var int Y;");
    for class in [a, b] {
        db.field_mut(class).as_class_mut().unwrap().native_size = Some(64);
    }
    let object = db.object_class();
    let mut session = Session::new(CompilerOptions::default());
    assert!(session.make(&mut db, &[object, a, b]));
    let warnings = warning_messages(&session);
    let size_warnings = warnings.iter().filter(|w| w.contains("Native class")).count();
    assert_eq!(size_warnings, 1, "{warnings:?}");
}
