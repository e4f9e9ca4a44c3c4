//! The reflection database the compiler reads from and writes into.
//!
//! Fields live in an id-indexed store and are never freed; resetting a class
//! detaches its children so the next declaration pass starts from a clean
//! scope. Object constants resolve through a separate asset table with an
//! optional on-demand loader.

mod field;

use std::rc::Rc;

use rustc_hash::FxHashMap;

pub use field::{
    ClassDef, ConstDef, EnumDef, Field, FieldKind, FunctionDef, PropertyDef, ScopeData,
    StateDef, StructDef,
};

use crate::flags::{ClassFlags, PropertyFlags};
use crate::name::{Name, NameTable};

/// Handle of a field in the [`Database`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(u32);

impl FieldId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Value written into bytecode when the field is referenced.
    #[inline]
    pub fn handle(self) -> u32 {
        self.0
    }
}

/// Handle of a loaded asset object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetId(u32);

/// Any object an object constant can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectRef {
    Class(FieldId),
    Asset(AssetId),
}

impl ObjectRef {
    /// Bytecode handle. Assets live in the upper half of the handle space.
    pub fn handle(self) -> u32 {
        match self {
            ObjectRef::Class(id) => id.handle(),
            ObjectRef::Asset(AssetId(id)) => 0x8000_0000 | id,
        }
    }
}

/// A non-class object known to the database.
#[derive(Debug, Clone)]
pub struct Asset {
    pub class: FieldId,
    pub path: String,
}

/// Called with `(class name, object path)` when an object constant is not
/// loaded yet. Returning `true` registers the object.
pub type AssetLoader = Box<dyn FnMut(&str, &str) -> bool>;

pub struct Database {
    names: NameTable,
    fields: Vec<Field>,
    classes: FxHashMap<Name, FieldId>,
    assets: Vec<Asset>,
    asset_lookup: FxHashMap<(FieldId, String), AssetId>,
    loader: Option<AssetLoader>,
    object: FieldId,
    class: FieldId,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("fields", &self.fields.len())
            .field("classes", &self.classes.len())
            .field("assets", &self.assets.len())
            .finish()
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl Database {
    /// Creates a database holding the root `Object` class and the intrinsic
    /// `Class` class.
    pub fn new() -> Self {
        let mut db = Self {
            names: NameTable::new(),
            fields: Vec::new(),
            classes: FxHashMap::default(),
            assets: Vec::new(),
            asset_lookup: FxHashMap::default(),
            loader: None,
            object: FieldId(0),
            class: FieldId(0),
        };
        db.object = db.add_class("Object", "");
        db.class = db.add_class("Class", "");
        let (object, class_id) = (db.object, db.class);
        // Usable before Object's own source has been compiled.
        if let Some(class) = db.field_mut(object).as_class_mut() {
            class.flags |= ClassFlags::PARSED | ClassFlags::COMPILED;
        }
        if let Some(class) = db.field_mut(class_id).as_class_mut() {
            class.state.scope.super_field = Some(object);
            class.flags |= ClassFlags::INTRINSIC | ClassFlags::PARSED | ClassFlags::COMPILED;
        }
        db
    }

    // ==========================================================================
    // Names
    // ==========================================================================

    pub fn intern(&mut self, text: &str) -> Name {
        self.names.intern(text)
    }

    pub fn find_name(&self, text: &str) -> Option<Name> {
        self.names.find(text)
    }

    pub fn none_name(&self) -> Name {
        self.names.none()
    }

    pub fn names(&self) -> &NameTable {
        &self.names
    }

    // ==========================================================================
    // Fields
    // ==========================================================================

    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[id.index()]
    }

    pub fn field_mut(&mut self, id: FieldId) -> &mut Field {
        &mut self.fields[id.index()]
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Creates a field and appends it to the children of `outer`.
    ///
    /// Name uniqueness is the caller's responsibility.
    pub fn create_field(&mut self, outer: Option<FieldId>, name: Name, kind: FieldKind) -> FieldId {
        let id = FieldId(self.fields.len() as u32);
        self.fields.push(Field { name, outer, kind });
        if let Some(scope) = outer.and_then(|o| self.field_mut(o).scope_mut()) {
            scope.children.push(id);
        }
        id
    }

    /// Direct children of a scope-owning field.
    pub fn children(&self, id: FieldId) -> &[FieldId] {
        self.field(id)
            .scope()
            .map_or(&[][..], |scope| scope.children.as_slice())
    }

    /// Finds a direct child of `scope` by name.
    pub fn find_child(&self, scope: FieldId, name: &Name) -> Option<FieldId> {
        self.children(scope)
            .iter()
            .copied()
            .find(|&child| self.field(child).name == *name)
    }

    /// Finds `name` among the children of `scope` and its super chain.
    pub fn find_member(&self, scope: FieldId, name: &Name) -> Option<FieldId> {
        self.super_chain(scope)
            .find_map(|s| self.find_child(s, name))
    }

    pub fn super_field(&self, id: FieldId) -> Option<FieldId> {
        self.field(id).scope().and_then(|s| s.super_field)
    }

    /// `id` followed by its super fields.
    pub fn super_chain(&self, id: FieldId) -> SuperChain<'_> {
        SuperChain {
            db: self,
            next: Some(id),
        }
    }

    /// Whether `child` is `parent` or derives from it.
    pub fn is_child_of(&self, child: FieldId, parent: FieldId) -> bool {
        self.super_chain(child).any(|id| id == parent)
    }

    /// Number of super hops from `child` to `parent`.
    pub fn class_distance(&self, child: FieldId, parent: FieldId) -> Option<u32> {
        self.super_chain(child)
            .position(|id| id == parent)
            .map(|hops| hops as u32)
    }

    /// The class a field is declared in. A class owns itself.
    pub fn owner_class(&self, id: FieldId) -> FieldId {
        let mut current = id;
        loop {
            let field = self.field(current);
            match (&field.kind, field.outer) {
                (FieldKind::Class(_), _) | (_, None) => return current,
                (_, Some(outer)) => current = outer,
            }
        }
    }

    /// Properties of a struct-like scope, inherited ones first.
    pub fn properties(&self, scope: FieldId) -> Vec<FieldId> {
        let mut chain: Vec<FieldId> = self.super_chain(scope).collect();
        chain.reverse();
        chain
            .into_iter()
            .flat_map(|s| self.children(s).iter().copied())
            .filter(|&child| self.field(child).as_property().is_some())
            .collect()
    }

    /// Parameters of a function in declaration order, return value excluded.
    pub fn parameters(&self, function: FieldId) -> impl Iterator<Item = FieldId> + '_ {
        self.children(function).iter().copied().filter(move |&child| {
            self.field(child).as_property().is_some_and(|p| {
                p.ty.flags.contains(PropertyFlags::PARM)
                    && !p.ty.flags.contains(PropertyFlags::RETURN_PARM)
            })
        })
    }

    pub fn return_param(&self, function: FieldId) -> Option<FieldId> {
        self.children(function).iter().copied().find(|&child| {
            self.field(child)
                .as_property()
                .is_some_and(|p| p.ty.flags.contains(PropertyFlags::RETURN_PARM))
        })
    }

    // ==========================================================================
    // Classes
    // ==========================================================================

    pub fn object_class(&self) -> FieldId {
        self.object
    }

    pub fn class_class(&self) -> FieldId {
        self.class
    }

    /// Registers a class with its source text, or replaces the source of an
    /// existing class.
    pub fn add_class(&mut self, name: &str, source: &str) -> FieldId {
        let name = self.intern(name);
        if let Some(&existing) = self.classes.get(&name) {
            if let Some(class) = self.field_mut(existing).as_class_mut() {
                class.source = Rc::from(source);
            }
            return existing;
        }
        let id = self.create_field(
            None,
            name.clone(),
            FieldKind::Class(ClassDef {
                source: Rc::from(source),
                ..Default::default()
            }),
        );
        self.classes.insert(name, id);
        id
    }

    pub fn find_class(&self, name: &str) -> Option<FieldId> {
        self.find_name(name)
            .and_then(|name| self.classes.get(&name).copied())
    }

    pub fn class_by_name(&self, name: &Name) -> Option<FieldId> {
        self.classes.get(name).copied()
    }

    pub fn class_flags(&self, class: FieldId) -> ClassFlags {
        self.field(class)
            .as_class()
            .map_or(ClassFlags::empty(), |c| c.flags)
    }

    pub fn class_within(&self, class: FieldId) -> Option<FieldId> {
        self.field(class).as_class().and_then(|c| c.within)
    }

    /// Empties a class so its declarations can be parsed again.
    ///
    /// Detached children stay in the store but become unreachable.
    pub fn reset_class(&mut self, class: FieldId) {
        if let Some(def) = self.field_mut(class).as_class_mut() {
            let source = def.source.clone();
            let super_field = def.state.scope.super_field;
            let intrinsic = def.flags & ClassFlags::INTRINSIC;
            let native_size = def.native_size;
            *def = ClassDef {
                source,
                flags: intrinsic,
                native_size,
                ..Default::default()
            };
            def.state.scope.super_field = super_field;
        }
    }

    /// The builtin `Vector` struct declared in `Object`.
    pub fn vector_struct(&self) -> Option<FieldId> {
        self.object_struct("Vector")
    }

    /// The builtin `Rotator` struct declared in `Object`.
    pub fn rotator_struct(&self) -> Option<FieldId> {
        self.object_struct("Rotator")
    }

    fn object_struct(&self, name: &str) -> Option<FieldId> {
        let name = self.find_name(name)?;
        self.find_child(self.object, &name)
            .filter(|&id| self.field(id).as_struct().is_some())
    }

    // ==========================================================================
    // Assets
    // ==========================================================================

    pub fn set_loader(&mut self, loader: AssetLoader) {
        self.loader = Some(loader);
    }

    /// Registers a non-class object.
    pub fn add_asset(&mut self, class: FieldId, path: &str) -> AssetId {
        let key = (class, path.to_ascii_lowercase());
        if let Some(&id) = self.asset_lookup.get(&key) {
            return id;
        }
        let id = AssetId(self.assets.len() as u32);
        self.assets.push(Asset {
            class,
            path: path.to_string(),
        });
        self.asset_lookup.insert(key, id);
        id
    }

    pub fn asset(&self, id: AssetId) -> &Asset {
        &self.assets[id.0 as usize]
    }

    /// Resolves `class'path'`, loading the object on demand.
    ///
    /// Class objects resolve by the last path segment.
    pub fn find_object(&mut self, class: FieldId, path: &str) -> Option<ObjectRef> {
        if self.is_child_of(class, self.class) {
            let short = path.rsplit('.').next().unwrap_or(path);
            return self.find_class(short).map(ObjectRef::Class);
        }
        let key = (class, path.to_ascii_lowercase());
        if let Some(&id) = self.asset_lookup.get(&key) {
            return Some(ObjectRef::Asset(id));
        }
        let class_name = self.field(class).name.to_string();
        let loaded = self
            .loader
            .as_mut()
            .is_some_and(|load| load(&class_name, path));
        loaded.then(|| ObjectRef::Asset(self.add_asset(class, path)))
    }
}

/// Iterator over a field and its super fields.
pub struct SuperChain<'a> {
    db: &'a Database,
    next: Option<FieldId>,
}

impl Iterator for SuperChain<'_> {
    type Item = FieldId;

    fn next(&mut self) -> Option<FieldId> {
        let current = self.next?;
        self.next = self.db.super_field(current);
        Some(current)
    }
}
