//! Conversion costs used by overload resolution and implicit coercion.
//!
//! Lower is better. Exact matches are free, upcasts and other generalizations
//! are cheap, and table conversions land in a separate band so that any
//! generalization beats any value conversion.

use uscript_core::{Database, PropertyFlags, PropertyKind, PropertyType};

use crate::bytecode::{CastEntry, get_conversion};

/// Cost constants, ordered from best to worst.
pub struct Conversion;

impl Conversion {
    pub const COST_IDENTITY: u32 = 0;
    /// Base cost of a generalized match. Object upcasts add one per hop.
    pub const COST_GENERALIZE: u32 = 1;
    /// Lossless table conversion.
    pub const COST_EXPAND: u32 = 101;
    /// Integral to float.
    pub const COST_INT_TO_FLOAT: u32 = 103;
    /// Narrowing table conversion.
    pub const COST_TRUNCATE: u32 = 104;
}

/// Cost of passing `source` where `dest` is expected, `None` when the types
/// are incompatible.
pub fn conversion_cost(dest: &PropertyType, source: &PropertyType, db: &Database) -> Option<u32> {
    if dest.matches_type(source, true, db) {
        return Some(Conversion::COST_IDENTITY);
    }
    if dest.flags.contains(PropertyFlags::OUT_PARM) {
        return None;
    }
    if dest.matches_type(source, false, db) {
        let hops = match (dest.kind, dest.class, source.class) {
            (PropertyKind::Object, Some(to), Some(from)) => db.class_distance(from, to).unwrap_or(0),
            _ => 0,
        };
        return Some(Conversion::COST_GENERALIZE + hops);
    }
    if !dest.is_scalar() || !source.is_scalar() {
        return None;
    }
    if dest.kind == PropertyKind::Byte && dest.enum_def.is_some() {
        return None;
    }
    if dest.kind == PropertyKind::Object && dest.class.is_some() {
        return None;
    }
    let entry = table_entry(dest, source)?;
    Some(if entry.is_truncating() {
        Conversion::COST_TRUNCATE
    } else if source.kind.is_integral() && dest.kind == PropertyKind::Float {
        Conversion::COST_INT_TO_FLOAT
    } else {
        Conversion::COST_EXPAND
    })
}

/// Table entry usable for an implicit conversion to `dest`.
///
/// A `coerce` parameter accepts explicit-only entries too.
fn table_entry(dest: &PropertyType, source: &PropertyType) -> Option<CastEntry> {
    let entry = get_conversion(dest.kind, source.kind)?;
    (entry.is_auto() || dest.flags.contains(PropertyFlags::COERCE_PARM)).then_some(entry)
}

/// Cast to splice in when passing `source` to `dest` after overload
/// resolution or for a final coercion. `None` when no cast is needed or none
/// applies.
pub fn implicit_cast(dest: &PropertyType, source: &PropertyType, db: &Database) -> Option<CastEntry> {
    if dest.matches_type(source, false, db) {
        return None;
    }
    if !dest.is_scalar() || !source.is_scalar() {
        return None;
    }
    if dest.kind == PropertyKind::Byte && dest.enum_def.is_some() {
        return None;
    }
    table_entry(dest, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uscript_core::db::FieldKind;

    #[test]
    fn cost_ordering() {
        let db = Database::new();
        let int = PropertyType::int();
        let byte = PropertyType::byte(None);
        let float = PropertyType::float();
        assert_eq!(conversion_cost(&int, &int, &db), Some(0));
        assert_eq!(conversion_cost(&int, &byte, &db), Some(101));
        assert_eq!(conversion_cost(&float, &int, &db), Some(103));
        assert_eq!(conversion_cost(&byte, &int, &db), Some(104));
        assert_eq!(conversion_cost(&int, &float, &db), Some(104));
    }

    #[test]
    fn explicit_entries_need_coerce() {
        let db = Database::new();
        let string = PropertyType::string();
        assert_eq!(conversion_cost(&string, &PropertyType::int(), &db), None);
        let coerced = string.with_flags(PropertyFlags::COERCE_PARM);
        assert_eq!(conversion_cost(&coerced, &PropertyType::int(), &db), Some(101));
    }

    #[test]
    fn out_parameters_need_exact_match() {
        let db = Database::new();
        let out = PropertyType::int().with_flags(PropertyFlags::OUT_PARM);
        assert_eq!(conversion_cost(&out, &PropertyType::byte(None), &db), None);
        assert_eq!(conversion_cost(&out, &PropertyType::int(), &db), Some(0));
    }

    #[test]
    fn arrays_never_convert() {
        let db = Database::new();
        let mut dest = PropertyType::float();
        dest.array_dim = 0;
        let mut source = PropertyType::int();
        source.array_dim = 0;
        assert_eq!(conversion_cost(&dest, &source, &db), None);
    }

    #[test]
    fn upcasts_count_hops() {
        let mut db = Database::new();
        let object = db.object_class();
        let actor = db.add_class("Actor", "");
        let pawn = db.add_class("Pawn", "");
        db.field_mut(actor).scope_mut().unwrap().super_field = Some(object);
        db.field_mut(pawn).scope_mut().unwrap().super_field = Some(actor);
        let to_object = PropertyType::object(Some(object));
        let to_actor = PropertyType::object(Some(actor));
        let from_pawn = PropertyType::object(Some(pawn));
        assert_eq!(conversion_cost(&to_actor, &from_pawn, &db), Some(2));
        assert_eq!(conversion_cost(&to_object, &from_pawn, &db), Some(3));
        assert_eq!(conversion_cost(&from_pawn, &to_actor, &db), None);
        assert_eq!(conversion_cost(&to_actor, &PropertyType::object(None), &db), Some(1));
    }

    #[test]
    fn enums_reject_raw_bytes() {
        let mut db = Database::new();
        let object = db.object_class();
        let name = db.intern("ETeam");
        let team = db.create_field(Some(object), name, FieldKind::Enum(Default::default()));
        let dest = PropertyType::byte(Some(team));
        assert_eq!(conversion_cost(&dest, &PropertyType::int(), &db), None);
        assert_eq!(conversion_cost(&dest, &PropertyType::byte(None), &db), None);
        assert_eq!(implicit_cast(&dest, &PropertyType::int(), &db), None);
    }
}
