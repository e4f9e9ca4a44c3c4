//! Batch driver.
//!
//! A [`Session`] owns the options and diagnostics of one compile run. Each
//! class goes through [`Pass::Declare`] and then [`Pass::Generate`]; a class
//! that fails either pass has its flags cleared and its bytecode discarded
//! so later classes see it as broken.

use rustc_hash::{FxHashMap, FxHashSet};
use uscript_core::{ClassFlags, CompileError, Database, FieldId};

use crate::compiler::{Compiler, Pass};
use crate::diagnostics::Diagnostics;
use crate::lexer::Lexer;
use crate::options::CompilerOptions;
use crate::post_parse::post_parse;

type Result<T> = std::result::Result<T, CompileError>;

#[derive(Debug, Default)]
pub struct Session {
    options: CompilerOptions,
    diagnostics: Diagnostics,
    native_size_warned: bool,
}

impl Session {
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            options,
            diagnostics: Diagnostics::new(),
            native_size_warned: false,
        }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Hands the collected diagnostics to the caller, leaving an empty set.
    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }

    /// Runs one pass over one class.
    ///
    /// Errors are also recorded in the session diagnostics under the class
    /// name.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile_class(&mut self, db: &mut Database, class: FieldId, pass: Pass) -> Result<()> {
        let name = db.field(class).name.to_string();
        log::debug!("{name}: {pass:?} pass");
        let result = match pass {
            Pass::Declare => self.declare(db, class),
            Pass::Generate => self.generate(db, class),
        };
        if let Err(err) = &result {
            let message = if err.is_internal() {
                format!("Internal compiler error: {}", err.message())
            } else {
                err.message()
            };
            self.diagnostics.error(&name, err.line(), message);
            discard_class(db, class);
        }
        result
    }

    /// Compiles `classes` in inheritance order. Returns `true` when no
    /// class failed.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn make(&mut self, db: &mut Database, classes: &[FieldId]) -> bool {
        let order = inheritance_order(db, classes);
        log::info!("compiling {} classes", order.len());
        for &class in &order {
            let _ = self.compile_class(db, class, Pass::Declare);
        }
        for &class in &order {
            if db.class_flags(class).contains(ClassFlags::PARSED) {
                let _ = self.compile_class(db, class, Pass::Generate);
            }
        }
        if self.diagnostics.has_errors() {
            log::error!(
                "{} errors, {} warnings",
                self.diagnostics.error_count(),
                self.diagnostics.warning_count()
            );
            false
        } else {
            log::info!("success, {} warnings", self.diagnostics.warning_count());
            true
        }
    }

    fn declare(&mut self, db: &mut Database, class: FieldId) -> Result<()> {
        db.reset_class(class);
        self.run(db, class, Pass::Declare)?;
        post_parse(db, class);
        self.check_native_size(db, class);
        set_class_flags(db, class, ClassFlags::PARSED);
        Ok(())
    }

    fn generate(&mut self, db: &mut Database, class: FieldId) -> Result<()> {
        let name = db.field(class).name.to_string();
        if !db.class_flags(class).contains(ClassFlags::PARSED) {
            return Err(CompileError::Internal {
                message: format!("'{name}' has not been declared"),
                line: 0,
            });
        }
        let broken = db
            .super_chain(class)
            .skip(1)
            .find(|&parent| !db.class_flags(parent).contains(ClassFlags::COMPILED));
        if let Some(parent) = broken {
            return Err(CompileError::ParentHasErrors {
                class: name,
                parent: db.field(parent).name.to_string(),
            });
        }
        self.run(db, class, Pass::Generate)?;
        set_class_flags(db, class, ClassFlags::COMPILED);
        Ok(())
    }

    fn run(&mut self, db: &mut Database, class: FieldId, pass: Pass) -> Result<()> {
        let arena = bumpalo::Bump::new();
        let mut compiler = Compiler::new(db, &self.options, &mut self.diagnostics, &arena, class, pass);
        compiler.compile()
    }

    fn check_native_size(&mut self, db: &Database, class: FieldId) {
        if !self.options.check_native_sizes || self.native_size_warned {
            return;
        }
        let Some(def) = db.field(class).as_class() else {
            return;
        };
        let script_size = def.state.scope.properties_size;
        if let Some(native_size) = def.native_size
            && def.flags.contains(ClassFlags::NATIVE)
            && native_size != script_size
        {
            let name = db.field(class).name.to_string();
            self.diagnostics.warn(
                &name,
                def.state.scope.line,
                format!(
                    "Native class '{name}' is {native_size} bytes but its script declares {script_size} bytes"
                ),
            );
            self.native_size_warned = true;
        }
    }
}

fn set_class_flags(db: &mut Database, class: FieldId, flags: ClassFlags) {
    if let Some(def) = db.field_mut(class).as_class_mut() {
        def.flags |= flags;
    }
}

/// Marks a class as broken and drops any code generated for it.
fn discard_class(db: &mut Database, class: FieldId) {
    if let Some(def) = db.field_mut(class).as_class_mut() {
        def.flags.remove(ClassFlags::PARSED | ClassFlags::COMPILED);
    }
    let mut pending = vec![class];
    while let Some(id) = pending.pop() {
        pending.extend_from_slice(db.children(id));
        if let Some(scope) = db.field_mut(id).scope_mut() {
            scope.script.clear();
        }
    }
}

/// Name of the class `source` extends, read from its header.
fn declared_parent(source: &str) -> Option<String> {
    let mut lexer = Lexer::new(source, 1);
    loop {
        let token = lexer.get_raw_token(true).ok()?;
        if token.is_end() {
            return None;
        }
        if token.matches("class") {
            let _name = lexer.get_raw_token(true).ok()?;
            let keyword = lexer.get_raw_token(true).ok()?;
            if !keyword.matches("extends") {
                return None;
            }
            let parent = lexer.get_raw_token(true).ok()?;
            return parent.is_identifier().then_some(parent.text);
        }
    }
}

/// Orders `classes` so every class follows the classes it extends.
/// Relative order is otherwise kept.
fn inheritance_order(db: &Database, classes: &[FieldId]) -> Vec<FieldId> {
    let members: FxHashSet<FieldId> = classes.iter().copied().collect();
    let parents: FxHashMap<FieldId, FieldId> = classes
        .iter()
        .filter_map(|&class| {
            let source = db.field(class).as_class()?.source.clone();
            let parent = db.find_class(&declared_parent(&source)?)?;
            members.contains(&parent).then_some((class, parent))
        })
        .collect();

    let mut order = Vec::with_capacity(classes.len());
    let mut visited = FxHashSet::default();
    for &class in classes {
        let mut chain = Vec::new();
        let mut next = Some(class);
        while let Some(current) = next {
            if !visited.insert(current) {
                break;
            }
            chain.push(current);
            next = parents.get(&current).copied();
        }
        order.extend(chain.into_iter().rev());
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reads_parent_from_header() {
        let source = "// Pawn\n#exec OBJ LOAD FILE=Foo\nclass Pawn extends Actor\n\tnative;\n";
        assert_eq!(declared_parent(source), Some("Actor".to_string()));
        assert_eq!(declared_parent("class Object;"), None);
        assert_eq!(declared_parent("var int X;"), None);
    }

    #[test]
    fn parents_come_first() {
        let mut db = Database::new();
        let pawn = db.add_class("Pawn", "class Pawn extends Actor;");
        let actor = db.add_class("Actor", "class Actor extends Object;");
        let info = db.add_class("Info", "class Info extends Actor;");
        let order = inheritance_order(&db, &[pawn, info, actor]);
        assert_eq!(order, vec![actor, pawn, info]);
    }

    #[test]
    fn cycles_do_not_hang() {
        let mut db = Database::new();
        let a = db.add_class("A", "class A extends B;");
        let b = db.add_class("B", "class B extends A;");
        let order = inheritance_order(&db, &[a, b]);
        assert_eq!(order.len(), 2);
    }

    #[test]
    fn failed_class_is_discarded() {
        let mut db = Database::new();
        let broken = db.add_class("Broken", "class Broken extends Missing;");
        let mut session = Session::default();
        assert!(!session.make(&mut db, &[broken]));
        assert!(!db.class_flags(broken).contains(ClassFlags::PARSED));
        let error = session.diagnostics().errors().next().unwrap();
        assert_eq!(error.section.as_deref(), Some("Broken"));
    }
}
