//! Layout pass run once a class has been declared.
//!
//! Assigns property offsets in structs, functions and the class itself,
//! sizes parameter frames, zero-fills default buffers and computes the
//! probe masks of the class and its states.

use uscript_core::db::{FieldId, FieldKind};
use uscript_core::{Database, PropertyFlags};

/// Functions whose dispatch a state can switch off. Bit `i` of a probe
/// mask stands for `PROBE_NAMES[i]`.
pub const PROBE_NAMES: [&str; 40] = [
    "Spawned",
    "Destroyed",
    "GainedChild",
    "LostChild",
    "Trigger",
    "UnTrigger",
    "Timer",
    "HitWall",
    "Falling",
    "Landed",
    "ZoneChange",
    "Touch",
    "UnTouch",
    "Bump",
    "BeginState",
    "EndState",
    "BaseChange",
    "Attach",
    "Detach",
    "ActorEntered",
    "ActorLeaving",
    "KillCredit",
    "AnimEnd",
    "EndedRotation",
    "InterpolateEnd",
    "EncroachingOn",
    "EncroachedBy",
    "FootZoneChange",
    "HeadZoneChange",
    "PainTimer",
    "SpeechTimer",
    "MayFall",
    "Die",
    "Tick",
    "PlayerTick",
    "Expired",
    "SeePlayer",
    "EnemyNotVisible",
    "HearNoise",
    "UpdateEyeHeight",
];

/// Bit of a probe function, if `name` is one.
pub fn probe_bit(name: &str) -> Option<u64> {
    PROBE_NAMES
        .iter()
        .position(|probe| probe.eq_ignore_ascii_case(name))
        .map(|index| 1u64 << index)
}

#[cfg_attr(feature = "profiling", profiling::function)]
pub(crate) fn post_parse(db: &mut Database, class: FieldId) {
    let children = db.children(class).to_vec();
    for &child in &children {
        match db.field(child).kind {
            FieldKind::Struct(_) => layout_struct(db, child),
            FieldKind::Function(_) => layout_function(db, child),
            FieldKind::State(_) => {
                for function in db.children(child).to_vec() {
                    if db.field(function).as_function().is_some() {
                        layout_function(db, function);
                    }
                }
            }
            _ => {}
        }
    }

    let parent = db.super_field(class);
    let start = parent
        .and_then(|p| db.field(p).scope())
        .map_or(0, |scope| scope.properties_size);
    let (end, align) = layout_properties(db, class, start);
    let size = end.next_multiple_of(4);
    let mut defaults = parent
        .and_then(|p| db.field(p).as_class())
        .map(|def| def.defaults.clone())
        .unwrap_or_default();
    defaults.resize(size as usize, 0);
    if let Some(def) = db.field_mut(class).as_class_mut() {
        def.state.scope.properties_size = size;
        def.state.scope.min_alignment = align;
        def.defaults = defaults;
    }

    let mask = probe_mask(db, class, &[class]);
    if let Some(state) = db.field_mut(class).state_mut() {
        state.probe_mask = mask;
    }
    for &child in &children {
        if matches!(db.field(child).kind, FieldKind::State(_)) {
            let mask = probe_mask(db, child, &[child, class]);
            if let Some(state) = db.field_mut(child).state_mut() {
                state.probe_mask = mask;
            }
        }
    }
}

/// Assigns offsets to the direct properties of `scope` from `start`.
/// Returns the end offset and the largest alignment seen.
fn layout_properties(db: &mut Database, scope: FieldId, start: u32) -> (u32, u32) {
    let mut offset = start;
    let mut max_align = 1;
    for child in db.children(scope).to_vec() {
        let Some(ty) = db.field(child).as_property().map(|p| p.ty) else {
            continue;
        };
        let align = ty.alignment(db);
        offset = offset.next_multiple_of(align);
        let size = ty.size(db);
        if let Some(property) = db.field_mut(child).as_property_mut() {
            property.offset = offset;
        }
        offset += size;
        max_align = max_align.max(align);
    }
    (offset, max_align)
}

fn layout_struct(db: &mut Database, id: FieldId) {
    let parent = db.super_field(id).and_then(|p| db.field(p).scope());
    let start = parent.map_or(0, |scope| scope.properties_size);
    let parent_align = parent.map_or(1, |scope| scope.min_alignment.max(1));
    let (end, align) = layout_properties(db, id, start);
    let align = align.max(parent_align);
    let size = end.next_multiple_of(align);
    if let Some(def) = db.field_mut(id).as_struct_mut() {
        def.scope.properties_size = size;
        def.scope.min_alignment = align;
        def.defaults.resize(size as usize, 0);
    }
}

/// Lays out parameters and the return value. Locals are appended to the
/// frame by the generate pass.
fn layout_function(db: &mut Database, id: FieldId) {
    let (end, align) = layout_properties(db, id, 0);
    let mut num_parms = 0u8;
    let mut return_value_offset = None;
    for &child in db.children(id) {
        let Some(property) = db.field(child).as_property() else {
            continue;
        };
        if property.flags().contains(PropertyFlags::RETURN_PARM) {
            return_value_offset = u16::try_from(property.offset).ok();
        }
        if property.flags().contains(PropertyFlags::PARM) {
            num_parms = num_parms.saturating_add(1);
        }
    }
    if let Some(def) = db.field_mut(id).as_function_mut() {
        def.scope.properties_size = end;
        def.scope.min_alignment = align;
        def.parms_size = u16::try_from(end).unwrap_or(u16::MAX);
        def.num_parms = num_parms;
        def.return_value_offset = return_value_offset;
    }
}

/// Probe functions dispatchable in `state`: those declared in `levels` or
/// their super scopes, minus the ones the state ignores.
fn probe_mask(db: &Database, state: FieldId, levels: &[FieldId]) -> u64 {
    let mut mask = 0u64;
    for &level in levels {
        for scope in db.super_chain(level) {
            for &child in db.children(scope) {
                let field = db.field(child);
                if field.as_function().is_some() {
                    mask |= probe_bit(field.name.as_str()).unwrap_or(0);
                }
            }
        }
    }
    let ignored = db.field(state).state().map_or(0, |s| {
        s.ignored
            .iter()
            .filter_map(|name| probe_bit(name.as_str()))
            .fold(0, |acc, bit| acc | bit)
    });
    mask & !ignored
}

#[cfg(test)]
mod tests {
    use super::*;
    use uscript_core::PropertyType;
    use uscript_core::db::{PropertyDef, StructDef};

    fn add_property(db: &mut Database, scope: FieldId, name: &str, ty: PropertyType) -> FieldId {
        let name = db.intern(name);
        let none = db.none_name();
        db.create_field(Some(scope), name, FieldKind::Property(PropertyDef::new(ty, none)))
    }

    #[test]
    fn probe_bits_follow_the_list() {
        assert_eq!(probe_bit("Spawned"), Some(1));
        assert_eq!(probe_bit("timer"), Some(1 << 6));
        assert_eq!(probe_bit("PostRender"), None);
    }

    #[test]
    fn class_properties_are_aligned() {
        let mut db = Database::new();
        let object = db.object_class();
        let actor = db.add_class("Actor", "");
        db.field_mut(actor).scope_mut().unwrap().super_field = Some(object);
        let b = add_property(&mut db, actor, "B", PropertyType::byte(None));
        let i = add_property(&mut db, actor, "I", PropertyType::int());
        post_parse(&mut db, actor);
        assert_eq!(db.field(b).as_property().unwrap().offset, 0);
        assert_eq!(db.field(i).as_property().unwrap().offset, 4);
        let def = db.field(actor).as_class().unwrap();
        assert_eq!(def.state.scope.properties_size, 8);
        assert_eq!(def.defaults.len(), 8);
    }

    #[test]
    fn struct_size_rounds_to_alignment() {
        let mut db = Database::new();
        let object = db.object_class();
        let name = db.intern("Pair");
        let pair = db.create_field(Some(object), name, FieldKind::Struct(StructDef::default()));
        add_property(&mut db, pair, "A", PropertyType::int());
        add_property(&mut db, pair, "B", PropertyType::byte(None));
        post_parse(&mut db, object);
        let def = db.field(pair).as_struct().unwrap();
        assert_eq!(def.scope.properties_size, 8);
        assert_eq!(def.scope.min_alignment, 4);
        assert_eq!(def.defaults, vec![0; 8]);
    }
}
