//! Field records stored in the [`Database`](super::Database).
//!
//! A field is anything with a name that lives in a scope: enums, consts,
//! properties, structs, functions, states and classes. The concrete shape is a
//! closed sum type so every dispatch site matches exhaustively.

use crate::flags::{ClassFlags, FunctionFlags, PropertyFlags, StateFlags, StructFlags};
use crate::name::Name;
use crate::types::PropertyType;

use super::FieldId;

/// A named entry in the reflection database.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: Name,
    /// Enclosing scope. `None` only for classes.
    pub outer: Option<FieldId>,
    pub kind: FieldKind,
}

/// The concrete kind of a [`Field`].
#[derive(Debug, Clone)]
pub enum FieldKind {
    Enum(EnumDef),
    Const(ConstDef),
    Property(PropertyDef),
    Struct(StructDef),
    Function(FunctionDef),
    State(StateDef),
    Class(ClassDef),
}

/// Ordered list of enum tags.
#[derive(Debug, Clone, Default)]
pub struct EnumDef {
    pub tags: Vec<Name>,
}

impl EnumDef {
    /// Index of `tag`, if it belongs to this enum.
    pub fn tag_index(&self, tag: &Name) -> Option<u8> {
        self.tags
            .iter()
            .position(|t| t == tag)
            .and_then(|i| u8::try_from(i).ok())
    }
}

/// A named constant. The literal text is re-tokenized at every use.
#[derive(Debug, Clone, Default)]
pub struct ConstDef {
    pub value: String,
    pub line: u32,
}

#[derive(Debug, Clone)]
pub struct PropertyDef {
    pub ty: PropertyType,
    /// Byte offset within the owning struct, class or function frame.
    pub offset: u32,
    pub category: Name,
    /// Offset of the replication condition in the class script.
    pub rep_offset: Option<u16>,
}

impl PropertyDef {
    pub fn new(ty: PropertyType, category: Name) -> Self {
        Self {
            ty,
            offset: 0,
            category,
            rep_offset: None,
        }
    }

    pub fn flags(&self) -> PropertyFlags {
        self.ty.flags
    }
}

/// Common part of every field that owns children and code.
#[derive(Debug, Clone, Default)]
pub struct ScopeData {
    /// Super struct, super class, overridden function or parent state.
    pub super_field: Option<FieldId>,
    /// Direct children in declaration order.
    pub children: Vec<FieldId>,
    /// Emitted bytecode.
    pub script: Vec<u8>,
    pub properties_size: u32,
    pub min_alignment: u32,
    /// Source offset of the body, used by the second pass to find it again.
    pub text_pos: usize,
    pub line: u32,
}

#[derive(Debug, Clone, Default)]
pub struct StructDef {
    pub scope: ScopeData,
    pub flags: StructFlags,
    pub defaults: Vec<u8>,
    /// Text of a `structcpptext` block.
    pub cpp_text: String,
    /// Text of a `structdefaultproperties` block.
    pub default_properties: String,
}

#[derive(Debug, Clone, Default)]
pub struct FunctionDef {
    pub scope: ScopeData,
    pub flags: FunctionFlags,
    /// Native function index, 0 when not bound to a fixed native slot.
    pub native: u16,
    /// Operator precedence, only meaningful for binary operators.
    pub precedence: u8,
    /// Name used for by-name dispatch and operator matching.
    pub friendly_name: Option<Name>,
    pub num_parms: u8,
    pub parms_size: u16,
    pub return_value_offset: Option<u16>,
    pub rep_offset: Option<u16>,
    /// Source offset of the declaration header, unique per function.
    pub decl_pos: usize,
}

impl FunctionDef {
    pub fn is_operator(&self) -> bool {
        self.flags
            .intersects(FunctionFlags::OPERATOR | FunctionFlags::PRE_OPERATOR)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StateDef {
    pub scope: ScopeData,
    pub flags: StateFlags,
    pub probe_mask: u64,
    pub ignore_mask: u64,
    pub label_table_offset: Option<u16>,
    /// Functions named in an `ignores` list.
    pub ignored: Vec<Name>,
}

#[derive(Debug, Clone, Default)]
pub struct ClassDef {
    pub state: StateDef,
    pub flags: ClassFlags,
    /// Class an instance must be contained in.
    pub within: Option<FieldId>,
    pub config_name: Option<Name>,
    pub defaults: Vec<u8>,
    pub source: std::rc::Rc<str>,
    pub default_properties: String,
    pub cpp_text: String,
    pub hide_categories: Vec<Name>,
    pub dependencies: Vec<Name>,
    /// Byte size reported by the native side, if the class is native.
    pub native_size: Option<u32>,
}

impl Field {
    /// Scope data of scope-owning kinds.
    pub fn scope(&self) -> Option<&ScopeData> {
        match &self.kind {
            FieldKind::Struct(s) => Some(&s.scope),
            FieldKind::Function(f) => Some(&f.scope),
            FieldKind::State(s) => Some(&s.scope),
            FieldKind::Class(c) => Some(&c.state.scope),
            FieldKind::Enum(_) | FieldKind::Const(_) | FieldKind::Property(_) => None,
        }
    }

    pub fn scope_mut(&mut self) -> Option<&mut ScopeData> {
        match &mut self.kind {
            FieldKind::Struct(s) => Some(&mut s.scope),
            FieldKind::Function(f) => Some(&mut f.scope),
            FieldKind::State(s) => Some(&mut s.scope),
            FieldKind::Class(c) => Some(&mut c.state.scope),
            FieldKind::Enum(_) | FieldKind::Const(_) | FieldKind::Property(_) => None,
        }
    }

    /// State data of states and classes.
    pub fn state(&self) -> Option<&StateDef> {
        match &self.kind {
            FieldKind::State(s) => Some(s),
            FieldKind::Class(c) => Some(&c.state),
            _ => None,
        }
    }

    pub fn state_mut(&mut self) -> Option<&mut StateDef> {
        match &mut self.kind {
            FieldKind::State(s) => Some(s),
            FieldKind::Class(c) => Some(&mut c.state),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumDef> {
        match &self.kind {
            FieldKind::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_const(&self) -> Option<&ConstDef> {
        match &self.kind {
            FieldKind::Const(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_property(&self) -> Option<&PropertyDef> {
        match &self.kind {
            FieldKind::Property(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_property_mut(&mut self) -> Option<&mut PropertyDef> {
        match &mut self.kind {
            FieldKind::Property(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructDef> {
        match &self.kind {
            FieldKind::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_struct_mut(&mut self) -> Option<&mut StructDef> {
        match &mut self.kind {
            FieldKind::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionDef> {
        match &self.kind {
            FieldKind::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_function_mut(&mut self) -> Option<&mut FunctionDef> {
        match &mut self.kind {
            FieldKind::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassDef> {
        match &self.kind {
            FieldKind::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_class_mut(&mut self) -> Option<&mut ClassDef> {
        match &mut self.kind {
            FieldKind::Class(c) => Some(c),
            _ => None,
        }
    }

    /// Lower-case noun for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            FieldKind::Enum(_) => "enum",
            FieldKind::Const(_) => "const",
            FieldKind::Property(_) => "variable",
            FieldKind::Struct(_) => "struct",
            FieldKind::Function(_) => "function",
            FieldKind::State(_) => "state",
            FieldKind::Class(_) => "class",
        }
    }
}
