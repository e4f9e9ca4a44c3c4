//! The nominal type of a declaration or expression result.

use crate::db::{Database, FieldId};
use crate::flags::PropertyFlags;

/// Primitive kind tag.
///
/// Discriminants index the conversion table. Slots 8 and 9 are reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum PropertyKind {
    #[default]
    None = 0,
    Byte = 1,
    Int = 2,
    Bool = 3,
    Float = 4,
    Object = 5,
    Name = 6,
    Delegate = 7,
    Struct = 10,
    Vector = 11,
    Rotator = 12,
    String = 13,
}

impl PropertyKind {
    /// Number of rows/columns in the conversion table.
    pub const COUNT: usize = 14;

    /// All kinds, in table order.
    pub const ALL: [PropertyKind; 12] = [
        PropertyKind::None,
        PropertyKind::Byte,
        PropertyKind::Int,
        PropertyKind::Bool,
        PropertyKind::Float,
        PropertyKind::Object,
        PropertyKind::Name,
        PropertyKind::Delegate,
        PropertyKind::Struct,
        PropertyKind::Vector,
        PropertyKind::Rotator,
        PropertyKind::String,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Vector and rotator are structs with a dedicated discriminant.
    pub fn is_struct_like(self) -> bool {
        matches!(
            self,
            PropertyKind::Struct | PropertyKind::Vector | PropertyKind::Rotator
        )
    }

    pub fn is_integral(self) -> bool {
        matches!(self, PropertyKind::Byte | PropertyKind::Int)
    }

    /// Primitive kind named by a type keyword. `button` is an input string.
    pub fn from_keyword(text: &str) -> Option<Self> {
        Some(match text.to_ascii_lowercase().as_str() {
            "byte" => PropertyKind::Byte,
            "int" => PropertyKind::Int,
            "bool" => PropertyKind::Bool,
            "float" => PropertyKind::Float,
            "name" => PropertyKind::Name,
            "string" | "button" => PropertyKind::String,
            _ => return None,
        })
    }

    /// Source keyword for the kind.
    pub fn keyword(self) -> &'static str {
        match self {
            PropertyKind::None => "none",
            PropertyKind::Byte => "byte",
            PropertyKind::Int => "int",
            PropertyKind::Bool => "bool",
            PropertyKind::Float => "float",
            PropertyKind::Object => "object",
            PropertyKind::Name => "name",
            PropertyKind::Delegate => "delegate",
            PropertyKind::Struct => "struct",
            PropertyKind::Vector => "vector",
            PropertyKind::Rotator => "rotator",
            PropertyKind::String => "string",
        }
    }
}

/// Static type of a declaration, expression result or required type.
///
/// `array_dim` is 1 for scalars, 0 for dynamic arrays and >1 for fixed arrays.
/// `enum_def` is only set for bytes, `struct_def` only for struct-like kinds,
/// `class`/`meta_class` only for object references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PropertyType {
    pub kind: PropertyKind,
    pub enum_def: Option<FieldId>,
    pub struct_def: Option<FieldId>,
    pub class: Option<FieldId>,
    pub meta_class: Option<FieldId>,
    /// Signature function of a delegate.
    pub function: Option<FieldId>,
    pub array_dim: u32,
    pub flags: PropertyFlags,
}

impl PropertyType {
    /// The "no type" used for optional expressions.
    pub fn none() -> Self {
        Self::new(PropertyKind::None)
    }

    pub fn new(kind: PropertyKind) -> Self {
        Self {
            kind,
            array_dim: 1,
            ..Default::default()
        }
    }

    pub fn byte(enum_def: Option<FieldId>) -> Self {
        Self {
            enum_def,
            ..Self::new(PropertyKind::Byte)
        }
    }

    pub fn int() -> Self {
        Self::new(PropertyKind::Int)
    }

    pub fn bool() -> Self {
        Self::new(PropertyKind::Bool)
    }

    pub fn float() -> Self {
        Self::new(PropertyKind::Float)
    }

    pub fn name() -> Self {
        Self::new(PropertyKind::Name)
    }

    pub fn string() -> Self {
        Self::new(PropertyKind::String)
    }

    /// Object reference limited to `class`. `None` is the type of the null literal.
    pub fn object(class: Option<FieldId>) -> Self {
        Self {
            class,
            ..Self::new(PropertyKind::Object)
        }
    }

    /// `class<meta>`: a reference to a class object.
    pub fn class_ref(class_class: FieldId, meta: FieldId) -> Self {
        Self {
            class: Some(class_class),
            meta_class: Some(meta),
            ..Self::new(PropertyKind::Object)
        }
    }

    /// Struct, vector or rotator.
    pub fn structure(kind: PropertyKind, struct_def: FieldId) -> Self {
        debug_assert!(kind.is_struct_like());
        Self {
            struct_def: Some(struct_def),
            ..Self::new(kind)
        }
    }

    pub fn delegate(function: Option<FieldId>) -> Self {
        Self {
            function,
            ..Self::new(PropertyKind::Delegate)
        }
    }

    pub fn with_flags(mut self, flags: PropertyFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn without_flags(mut self, flags: PropertyFlags) -> Self {
        self.flags &= !flags;
        self
    }

    pub fn is_none(&self) -> bool {
        self.kind == PropertyKind::None
    }

    pub fn is_dynamic_array(&self) -> bool {
        self.array_dim == 0
    }

    pub fn is_scalar(&self) -> bool {
        self.array_dim == 1
    }

    /// An assignable expression result.
    pub fn is_lvalue(&self) -> bool {
        self.flags.contains(PropertyFlags::OUT_PARM)
    }

    /// Type of one element of an array type.
    pub fn element(&self) -> Self {
        Self {
            array_dim: 1,
            ..*self
        }
    }

    /// Whether `source` can be used where `self` is expected without a
    /// conversion operator. With `identity` the types must be the same.
    pub fn matches_type(&self, source: &PropertyType, identity: bool, db: &Database) -> bool {
        if self.kind != source.kind || self.array_dim != source.array_dim {
            return false;
        }
        match self.kind {
            PropertyKind::Byte => {
                self.enum_def == source.enum_def || (!identity && self.enum_def.is_none())
            }
            PropertyKind::Object => {
                if identity {
                    return self.class == source.class && self.meta_class == source.meta_class;
                }
                let (Some(dest), Some(src)) = (self.class, source.class) else {
                    return true;
                };
                if !db.is_child_of(src, dest) {
                    return false;
                }
                match (self.meta_class, source.meta_class) {
                    (Some(dest_meta), Some(src_meta)) => db.is_child_of(src_meta, dest_meta),
                    (Some(_), None) => false,
                    _ => true,
                }
            }
            PropertyKind::Struct | PropertyKind::Vector | PropertyKind::Rotator => {
                if self.struct_def == source.struct_def {
                    return true;
                }
                match (identity, self.struct_def, source.struct_def) {
                    (false, Some(dest), Some(src)) => db.is_child_of(src, dest),
                    _ => false,
                }
            }
            PropertyKind::Delegate => {
                self.function == source.function
                    || (!identity && (self.function.is_none() || source.function.is_none()))
            }
            _ => true,
        }
    }

    /// Byte size of one element.
    pub fn element_size(&self, db: &Database) -> u32 {
        match self.kind {
            PropertyKind::None => 0,
            PropertyKind::Byte => 1,
            PropertyKind::Int
            | PropertyKind::Bool
            | PropertyKind::Float
            | PropertyKind::Object
            | PropertyKind::Name => 4,
            PropertyKind::Delegate => 8,
            PropertyKind::String => 12,
            PropertyKind::Vector | PropertyKind::Rotator => 12,
            PropertyKind::Struct => self
                .struct_def
                .and_then(|id| db.field(id).scope())
                .map_or(0, |scope| scope.properties_size),
        }
    }

    /// Statically known size of a value of this type.
    pub fn size(&self, db: &Database) -> u32 {
        match self.array_dim {
            0 => 12,
            dim => self.element_size(db) * dim,
        }
    }

    /// Alignment of one element.
    pub fn alignment(&self, db: &Database) -> u32 {
        match self.kind {
            PropertyKind::None | PropertyKind::Byte => 1,
            PropertyKind::Struct if !self.is_dynamic_array() => self
                .struct_def
                .and_then(|id| db.field(id).scope())
                .map_or(4, |scope| scope.min_alignment.max(1)),
            _ => 4,
        }
    }

    /// Human readable type name for diagnostics.
    pub fn describe(&self, db: &Database) -> String {
        let base = match self.kind {
            PropertyKind::Byte => match self.enum_def {
                Some(id) => db.field(id).name.to_string(),
                None => "byte".to_string(),
            },
            PropertyKind::Object => match (self.class, self.meta_class) {
                (_, Some(meta)) => format!("class<{}>", db.field(meta).name),
                (Some(class), None) => db.field(class).name.to_string(),
                (None, None) => "None".to_string(),
            },
            PropertyKind::Struct | PropertyKind::Vector | PropertyKind::Rotator => {
                match self.struct_def {
                    Some(id) => db.field(id).name.to_string(),
                    None => self.kind.keyword().to_string(),
                }
            }
            PropertyKind::Delegate => match self.function {
                Some(id) => format!("delegate<{}>", db.field(id).name),
                None => "delegate".to_string(),
            },
            kind => kind.keyword().to_string(),
        };
        match self.array_dim {
            0 => format!("array<{base}>"),
            1 => base,
            dim => format!("{base}[{dim}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(PropertyKind::from_keyword("Int"), Some(PropertyKind::Int));
        assert_eq!(PropertyKind::from_keyword("button"), Some(PropertyKind::String));
        assert_eq!(PropertyKind::from_keyword("vector"), None);
    }

    #[test]
    fn scalar_defaults() {
        let ty = PropertyType::int();
        assert!(ty.is_scalar());
        assert!(!ty.is_lvalue());
        assert!(ty.with_flags(PropertyFlags::OUT_PARM).is_lvalue());
    }

    #[test]
    fn byte_enum_matching() {
        let mut db = Database::new();
        let object = db.object_class();
        let name = db.intern("EColor");
        let color = db.create_field(
            Some(object),
            name,
            crate::db::FieldKind::Enum(crate::db::EnumDef::default()),
        );
        let plain = PropertyType::byte(None);
        let colored = PropertyType::byte(Some(color));
        assert!(plain.matches_type(&colored, false, &db));
        assert!(!plain.matches_type(&colored, true, &db));
        assert!(!colored.matches_type(&plain, false, &db));
    }

    #[test]
    fn null_object_matches_any_class() {
        let db = Database::new();
        let dest = PropertyType::object(Some(db.object_class()));
        assert!(dest.matches_type(&PropertyType::object(None), false, &db));
        assert!(!dest.matches_type(&PropertyType::object(None), true, &db));
    }

    #[test]
    fn describe_arrays() {
        let db = Database::new();
        let mut ty = PropertyType::int();
        ty.array_dim = 0;
        assert_eq!(ty.describe(&db), "array<int>");
        ty.array_dim = 4;
        assert_eq!(ty.describe(&db), "int[4]");
        assert_eq!(ty.size(&db), 16);
    }
}
