//! Generated bytecode for expressions and statements.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use uscript::prelude::*;

const NATIVE_MUL_INT: u8 = 144;
const NATIVE_ADD_INT: u8 = 146;
const NATIVE_LESS_INT: u8 = 150;
const NATIVE_EQUAL_INT: u8 = 154;
const NATIVE_ADD_ASSIGN_INT: u8 = 161;
const NATIVE_POST_INC_INT: u8 = 165;
const NATIVE_ZERO_TO: u8 = 196;
const NATIVE_LOG: u8 = 231;

fn end() -> Vec<u8> {
    op(ExprToken::EndFunctionParms)
}

fn return_nothing() -> Vec<u8> {
    vec![ExprToken::Return.byte(), ExprToken::Nothing.byte()]
}

fn compile_function(body: &str, name: &str) -> (Database, FieldId) {
    let mut db = database();
    let source = format!("class Test extends Object;\n{body}\n");
    let (session, class) = compile_ok(&mut db, "Test", &source);
    assert!(
        warning_messages(&session).is_empty(),
        "unexpected warnings: {:?}",
        messages(&session)
    );
    let function = child(&db, class, name);
    (db, function)
}

#[test]
fn return_of_binary_operator() {
    let (db, add) = compile_function("function int Add(int A, int B) { return A + B; }", "Add");
    let expected = [
        op(ExprToken::Return),
        vec![NATIVE_ADD_INT],
        local(&db, add, "A"),
        local(&db, add, "B"),
        end(),
    ]
    .concat();
    assert_eq!(script(&db, add), expected);
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let (db, f) = compile_function(
        "function int F(int A, int B, int C) { return A + B * C; }",
        "F",
    );
    let expected = [
        op(ExprToken::Return),
        vec![NATIVE_ADD_INT],
        local(&db, f, "A"),
        vec![NATIVE_MUL_INT],
        local(&db, f, "B"),
        local(&db, f, "C"),
        end(),
        end(),
    ]
    .concat();
    assert_eq!(script(&db, f), expected);

    let (db, g) = compile_function(
        "function int G(int A, int B, int C) { return A * B + C; }",
        "G",
    );
    let expected = [
        op(ExprToken::Return),
        vec![NATIVE_ADD_INT, NATIVE_MUL_INT],
        local(&db, g, "A"),
        local(&db, g, "B"),
        end(),
        local(&db, g, "C"),
        end(),
    ]
    .concat();
    assert_eq!(script(&db, g), expected);
}

#[test]
fn same_precedence_is_left_associative() {
    let (db, f) = compile_function(
        "function int F(int A, int B, int C) { return A + B + C; }",
        "F",
    );
    let expected = [
        op(ExprToken::Return),
        vec![NATIVE_ADD_INT, NATIVE_ADD_INT],
        local(&db, f, "A"),
        local(&db, f, "B"),
        end(),
        local(&db, f, "C"),
        end(),
    ]
    .concat();
    assert_eq!(script(&db, f), expected);
}

#[test]
fn if_else_patches_both_jumps() {
    let (db, pick) = compile_function(
        r#"
function int Pick(bool B)
{
	if (B)
		return 2;
	else
		return 3;
}
"#,
        "Pick",
    );
    let expected = [
        vec![ExprToken::JumpIfNot.byte(), 15, 0],
        op(ExprToken::BoolVariable),
        local(&db, pick, "B"),
        vec![ExprToken::Return.byte(), ExprToken::IntConstByte.byte(), 2],
        vec![ExprToken::Jump.byte(), 18, 0],
        vec![ExprToken::Return.byte(), ExprToken::IntConstByte.byte(), 3],
        return_nothing(),
    ]
    .concat();
    assert_eq!(script(&db, pick), expected);
}

#[test]
fn while_loop_jumps_back_to_condition() {
    let (db, count) = compile_function(
        r#"
function Count(int N)
{
	local int I;

	while (I < N)
		I++;
}
"#,
        "Count",
    );
    let expected = [
        vec![ExprToken::JumpIfNot.byte(), 25, 0],
        vec![NATIVE_LESS_INT],
        local(&db, count, "I"),
        local(&db, count, "N"),
        end(),
        vec![NATIVE_POST_INC_INT],
        local(&db, count, "I"),
        end(),
        vec![ExprToken::Jump.byte(), 0, 0],
        return_nothing(),
    ]
    .concat();
    assert_eq!(script(&db, count), expected);

    let i = db.field(child(&db, count, "I")).as_property().unwrap();
    assert_eq!(i.offset, 4);
    assert_eq!(db.field(count).scope().unwrap().properties_size, 8);
}

#[test]
fn do_without_until_loops_forever() {
    let (db, spin) = compile_function(
        r#"
function Spin()
{
	do
	{
		break;
	}
}
"#,
        "Spin",
    );
    let expected = [
        vec![ExprToken::Jump.byte(), 6, 0],
        vec![ExprToken::Jump.byte(), 0, 0],
        return_nothing(),
    ]
    .concat();
    assert_eq!(script(&db, spin), expected);
}

#[test]
fn switch_chains_cases() {
    let (db, map) = compile_function(
        r#"
function int Map(byte B)
{
	switch (B)
	{
	case 0:
		return 10;
	default:
		return 20;
	}
}
"#,
        "Map",
    );
    let expected = [
        vec![ExprToken::Switch.byte(), 1],
        local(&db, map, "B"),
        vec![ExprToken::Case.byte(), 15, 0, ExprToken::ByteConst.byte(), 0],
        vec![ExprToken::Return.byte(), ExprToken::IntConstByte.byte(), 10],
        vec![ExprToken::Case.byte(), 0xFF, 0xFF],
        vec![ExprToken::Return.byte(), ExprToken::IntConstByte.byte(), 20],
        return_nothing(),
    ]
    .concat();
    assert_eq!(script(&db, map), expected);
}

#[test]
fn bare_enum_tag_uses_assignment_type() {
    let mut db = database();
    let (_, pawn) = compile_ok(
        &mut db,
        "Pawn",
        r#"
class Pawn extends Object;

enum EPhysics
{
	PHYS_None,
	PHYS_Walking,
	PHYS_Falling
};

var EPhysics Physics;

function Fall()
{
	Physics = PHYS_Falling;
}
"#,
    );
    let fall = child(&db, pawn, "Fall");
    let expected = [
        op(ExprToken::Let),
        instance(&db, pawn, "Physics"),
        vec![ExprToken::ByteConst.byte(), 2],
        return_nothing(),
    ]
    .concat();
    assert_eq!(script(&db, fall), expected);
}

#[test]
fn optional_parameters_become_nothing() {
    let (db, hello) = compile_function("function Hello() { Log(\"Hi\"); }", "Hello");
    let expected = [
        vec![NATIVE_LOG],
        vec![ExprToken::StringConst.byte(), b'H', b'i', 0],
        op(ExprToken::Nothing),
        end(),
        return_nothing(),
    ]
    .concat();
    assert_eq!(script(&db, hello), expected);
}

#[test]
fn debug_info_precedes_statements() {
    let mut db = database();
    let class = db.add_class(
        "Test",
        "class Test extends Object;\nfunction Hello()\n{\n\tLog(\"Hi\");\n}\n",
    );
    let object = db.object_class();
    let mut session = Session::new(CompilerOptions::default().with_debug_info(true));
    assert!(session.make(&mut db, &[object, class]));
    let hello = child(&db, class, "Hello");
    let code = script(&db, hello);
    assert_eq!(&code[..3], &[ExprToken::DebugInfo.byte(), 4, 0]);
}

#[test]
fn state_code_gets_label_table() {
    let mut db = database();
    let (_, actor) = compile_ok(
        &mut db,
        "Actor",
        r#"
class Actor extends Object;

auto state Idle
{
Begin:
	Log("Idle");
	stop;
}
"#,
    );
    let idle = child(&db, actor, "Idle");
    let code = script(&db, idle);
    let table = db.field(idle).state().unwrap().label_table_offset.unwrap() as usize;

    assert_eq!(code[0], NATIVE_LOG);
    assert_eq!(code[table - 1], ExprToken::LabelTable.byte());
    assert_eq!(table % 4, 1);

    let begin = db.find_name("Begin").unwrap();
    let entry = &code[table..table + 8];
    assert_eq!(&entry[..4], &begin.index().to_le_bytes());
    assert_eq!(&entry[4..], &0u32.to_le_bytes());
    let none = db.none_name();
    assert_eq!(&code[table + 8..table + 12], &none.index().to_le_bytes());
    assert_eq!(code.len(), table + 16);
}

#[test]
fn context_expression_records_skip_and_size() {
    let mut db = database();
    let (_, pawn) = compile_ok(
        &mut db,
        "Pawn",
        r#"
class Pawn extends Object;

var int Health;

function int Peek(Pawn Other)
{
	return Other.Health;
}
"#,
    );
    let peek = child(&db, pawn, "Peek");
    let member = instance(&db, pawn, "Health");
    let expected = [
        op(ExprToken::Return),
        op(ExprToken::Context),
        local(&db, peek, "Other"),
        vec![member.len() as u8, 0, 4],
        member,
    ]
    .concat();
    assert_eq!(script(&db, peek), expected);
}

#[test]
fn truncating_cast_is_spliced_before_operand() {
    let (db, f) = compile_function("function int F(float X) { return Int(X); }", "F");
    let expected = [
        op(ExprToken::Return),
        vec![ExprToken::PrimitiveCast.byte(), 0x44],
        local(&db, f, "X"),
    ]
    .concat();
    assert_eq!(script(&db, f), expected);
}

#[test]
fn for_increment_follows_body() {
    let (db, sum) = compile_function(
        r#"
function Sum(int N)
{
	local int I, T;

	for (I = 0; I < N; I++)
		T += I;
}
"#,
        "Sum",
    );
    let expected = [
        op(ExprToken::Let),
        local(&db, sum, "I"),
        op(ExprToken::IntZero),
        // Condition at 7, exits to 44.
        vec![ExprToken::JumpIfNot.byte(), 44, 0],
        vec![NATIVE_LESS_INT],
        local(&db, sum, "I"),
        local(&db, sum, "N"),
        end(),
        vec![NATIVE_ADD_ASSIGN_INT],
        local(&db, sum, "T"),
        local(&db, sum, "I"),
        end(),
        vec![NATIVE_POST_INC_INT],
        local(&db, sum, "I"),
        end(),
        vec![ExprToken::Jump.byte(), 7, 0],
        return_nothing(),
    ]
    .concat();
    assert_eq!(script(&db, sum), expected);
}

#[test]
fn break_and_continue_target_their_loop() {
    let (db, scan) = compile_function(
        r#"
function Scan(int N)
{
	local int I;

	while (I < N)
	{
		I++;
		if (I == 3)
			continue;
		break;
	}
}
"#,
        "Scan",
    );
    let expected = [
        vec![ExprToken::JumpIfNot.byte(), 43, 0],
        vec![NATIVE_LESS_INT],
        local(&db, scan, "I"),
        local(&db, scan, "N"),
        end(),
        vec![NATIVE_POST_INC_INT],
        local(&db, scan, "I"),
        end(),
        vec![ExprToken::JumpIfNot.byte(), 37, 0],
        vec![NATIVE_EQUAL_INT],
        local(&db, scan, "I"),
        vec![ExprToken::IntConstByte.byte(), 3],
        end(),
        // continue
        vec![ExprToken::Jump.byte(), 0, 0],
        // break
        vec![ExprToken::Jump.byte(), 43, 0],
        vec![ExprToken::Jump.byte(), 0, 0],
        return_nothing(),
    ]
    .concat();
    assert_eq!(script(&db, scan), expected);
}

#[test]
fn nested_constructs_patch_every_jump() {
    let (db, mix) = compile_function(
        r#"
function int Mix(int N)
{
	local int I;

	I = 1;
	while (I < N)
	{
		if (I == 3)
		{
			break;
		}
		for (I = 0; I < N; I++)
		{
			switch (I)
			{
			case 2:
				continue;
			}
		}
	}
	return I;
}
"#,
        "Mix",
    );
    let i = || local(&db, mix, "I");
    let n = || local(&db, mix, "N");
    let expected = [
        op(ExprToken::Let),
        i(),
        op(ExprToken::IntOne),
        // while at 7
        vec![ExprToken::JumpIfNot.byte(), 90, 0],
        vec![NATIVE_LESS_INT],
        i(),
        n(),
        end(),
        // if at 22
        vec![ExprToken::JumpIfNot.byte(), 37, 0],
        vec![NATIVE_EQUAL_INT],
        i(),
        vec![ExprToken::IntConstByte.byte(), 3],
        end(),
        vec![ExprToken::Jump.byte(), 90, 0],
        // for at 37, condition at 44
        op(ExprToken::Let),
        i(),
        op(ExprToken::IntZero),
        vec![ExprToken::JumpIfNot.byte(), 87, 0],
        vec![NATIVE_LESS_INT],
        i(),
        n(),
        end(),
        // switch at 59
        vec![ExprToken::Switch.byte(), 4],
        i(),
        vec![ExprToken::Case.byte(), 74, 0, ExprToken::IntConstByte.byte(), 2],
        vec![ExprToken::Jump.byte(), 77, 0],
        vec![ExprToken::Case.byte(), 0xFF, 0xFF],
        // increment at 77
        vec![NATIVE_POST_INC_INT],
        i(),
        end(),
        vec![ExprToken::Jump.byte(), 44, 0],
        vec![ExprToken::Jump.byte(), 7, 0],
        // loop exit at 90
        op(ExprToken::Return),
        i(),
    ]
    .concat();
    assert_eq!(script(&db, mix), expected);
}

#[test]
fn foreach_pops_iterator_on_return() {
    let (db, find) = compile_function(
        r#"
function int Find(int N)
{
	local int I;

	foreach ZeroTo(N, I)
	{
		if (I == 3)
			return I;
	}
	return 0;
}
"#,
        "Find",
    );
    let expected = [
        op(ExprToken::Iterator),
        vec![NATIVE_ZERO_TO],
        local(&db, find, "N"),
        local(&db, find, "I"),
        end(),
        vec![35, 0],
        vec![ExprToken::JumpIfNot.byte(), 34, 0],
        vec![NATIVE_EQUAL_INT],
        local(&db, find, "I"),
        vec![ExprToken::IntConstByte.byte(), 3],
        end(),
        op(ExprToken::IteratorPop),
        op(ExprToken::Return),
        local(&db, find, "I"),
        // iterator next at 34, end at 35
        op(ExprToken::IteratorNext),
        op(ExprToken::IteratorPop),
        vec![ExprToken::Return.byte(), ExprToken::IntZero.byte()],
    ]
    .concat();
    assert_eq!(script(&db, find), expected);
}

#[test]
fn goto_jumps_to_function_label() {
    let (db, skip) = compile_function(
        r#"
function int Skip()
{
	goto Done;
	return 1;
Done:
	return 2;
}
"#,
        "Skip",
    );
    let expected = [
        vec![ExprToken::Jump.byte(), 6, 0],
        vec![ExprToken::Return.byte(), ExprToken::IntConstByte.byte(), 1],
        vec![ExprToken::Return.byte(), ExprToken::IntConstByte.byte(), 2],
    ]
    .concat();
    assert_eq!(script(&db, skip), expected);
}

#[test]
fn call_headers_follow_binding() {
    let mut db = database();
    let (_, ok) = compile(
        &mut db,
        &[
            ("Actor", "class Actor extends Object;\nfunction Touch(int N) { }\n"),
            (
                "Pawn",
                r#"
class Pawn extends Actor;

delegate OnHit(int N);

function Touch(int N)
{
	super.Touch(N);
	super(Actor).Touch(N);
	global.Touch(N);
	OnHit(N);
	Touch(N);
}
"#,
            ),
        ],
    );
    assert!(ok);
    let actor = db.find_class("Actor").unwrap();
    let pawn = db.find_class("Pawn").unwrap();
    let touch = child(&db, pawn, "Touch");
    let n = || local(&db, touch, "N");
    let final_call = [
        op(ExprToken::FinalFunction),
        field_ref(child(&db, actor, "Touch")),
        n(),
        end(),
    ]
    .concat();
    let expected = [
        final_call.clone(),
        final_call,
        op(ExprToken::GlobalFunction),
        name_ref(&db, "Touch"),
        n(),
        end(),
        vec![ExprToken::DelegateFunction.byte(), 0],
        field_ref(child(&db, pawn, "__OnHit__Delegate")),
        name_ref(&db, "OnHit"),
        n(),
        end(),
        vec![ExprToken::VirtualFunction.byte(), 0],
        name_ref(&db, "Touch"),
        n(),
        end(),
        return_nothing(),
    ]
    .concat();
    assert_eq!(script(&db, touch), expected);
}

#[test]
fn super_call_to_native_keeps_native_index() {
    let mut db = database();
    let (_, ok) = compile(
        &mut db,
        &[
            ("Actor", "class Actor extends Object;\nnative(300) function Fire();\n"),
            ("Pawn", "class Pawn extends Actor;\nfunction Fire() { super.Fire(); }\n"),
        ],
    );
    assert!(ok);
    let pawn = db.find_class("Pawn").unwrap();
    let fire = child(&db, pawn, "Fire");
    let expected = [vec![0x61, 0x2C], end(), return_nothing()].concat();
    assert_eq!(script(&db, fire), expected);
}

#[test]
fn outer_object_members_use_context() {
    let mut db = database();
    let (session, ok) = compile(
        &mut db,
        &[
            ("Game", "class Game extends Object;\nvar int Score;\n"),
            (
                "Rules",
                "class Rules extends Object within Game;\nfunction int Peek() { return Score; }\n",
            ),
        ],
    );
    assert!(ok, "{:?}", messages(&session));
    let game = db.find_class("Game").unwrap();
    let rules = db.find_class("Rules").unwrap();
    let member = instance(&db, game, "Score");
    let expected = [
        op(ExprToken::Return),
        vec![ExprToken::Context.byte(), ExprToken::SelfOuter.byte()],
        vec![member.len() as u8, 0, 4],
        member,
    ]
    .concat();
    assert_eq!(script(&db, child(&db, rules, "Peek")), expected);
}
