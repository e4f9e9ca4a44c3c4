//! The nest stack: one record per open syntactic construct.
//!
//! Each record knows which statements are legal inside it and collects
//! forward jumps whose targets are only known when the construct closes.
//! Requests are emitted as zero u16 placeholders and patched on pop, either
//! from a fix-up slot set while compiling the construct or from a label.

use bitflags::bitflags;
use bumpalo::Bump;
use bumpalo::collections::Vec as BumpVec;
use uscript_core::db::FieldId;
use uscript_core::{CompileError, Name, PropertyType};

use crate::emit::CodeBuffer;

/// Maximum nesting depth, class and function included.
pub const MAX_NEST: usize = 16;

bitflags! {
    /// Statements legal at a nesting level.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AllowFlags: u32 {
        const CMD          = 1 << 0;
        const FUNCTION     = 1 << 1;
        const STATE        = 1 << 2;
        const IGNORES      = 1 << 3;
        const INSTANCE_VAR = 1 << 4;
        const VAR_DECL     = 1 << 5;
        const CASE         = 1 << 6;
        const DEFAULT      = 1 << 7;
        const RETURN       = 1 << 8;
        const BREAK        = 1 << 9;
        const CONTINUE     = 1 << 10;
        const LABEL        = 1 << 11;
        const CLASS        = 1 << 12;
        const ELSE_IF      = 1 << 13;
        const ITERATOR     = 1 << 14;
        const LATENT       = 1 << 15;
        const TYPE_DECL    = 1 << 16;
        const REPLICATION  = 1 << 17;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NestKind {
    None,
    Class,
    State,
    Function,
    If,
    Loop,
    Switch,
    For,
    ForEach,
}

impl NestKind {
    pub fn name(self) -> &'static str {
        match self {
            NestKind::None => "global scope",
            NestKind::Class => "class",
            NestKind::State => "state",
            NestKind::Function => "function",
            NestKind::If => "if",
            NestKind::Loop => "loop",
            NestKind::Switch => "switch",
            NestKind::For => "for",
            NestKind::ForEach => "foreach",
        }
    }

    /// Kinds that own a code buffer.
    pub fn owns_code(self) -> bool {
        matches!(self, NestKind::Class | NestKind::State | NestKind::Function)
    }

    fn allow(self, parent: AllowFlags) -> AllowFlags {
        let blocks = AllowFlags::VAR_DECL
            | AllowFlags::FUNCTION
            | AllowFlags::IGNORES
            | AllowFlags::CASE
            | AllowFlags::DEFAULT
            | AllowFlags::ELSE_IF;
        match self {
            NestKind::None => AllowFlags::CLASS,
            NestKind::Class => {
                AllowFlags::INSTANCE_VAR
                    | AllowFlags::FUNCTION
                    | AllowFlags::STATE
                    | AllowFlags::TYPE_DECL
                    | AllowFlags::REPLICATION
            }
            NestKind::State => {
                AllowFlags::FUNCTION
                    | AllowFlags::IGNORES
                    | AllowFlags::LABEL
                    | AllowFlags::CMD
                    | AllowFlags::LATENT
            }
            NestKind::Function => {
                AllowFlags::VAR_DECL | AllowFlags::CMD | AllowFlags::RETURN | AllowFlags::LABEL
            }
            NestKind::If => (parent - blocks - AllowFlags::LABEL) | AllowFlags::ELSE_IF,
            NestKind::Loop | NestKind::For => {
                (parent - blocks - AllowFlags::LABEL) | AllowFlags::BREAK | AllowFlags::CONTINUE
            }
            NestKind::ForEach => (parent - blocks) | AllowFlags::BREAK | AllowFlags::CONTINUE,
            NestKind::Switch => {
                (parent - blocks - AllowFlags::LABEL - AllowFlags::CMD)
                    | AllowFlags::CASE
                    | AllowFlags::DEFAULT
                    | AllowFlags::BREAK
            }
        }
    }
}

/// Targets a placeholder can be resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixupKind {
    SwitchEnd,
    IfEnd,
    LoopStart,
    LoopEnd,
    LoopPostCond,
    ForStart,
    ForInc,
    ForEnd,
    IteratorNext,
    IteratorEnd,
    /// Resolved against a label of the enclosing function or state.
    Label,
}

const SLOT_COUNT: usize = 10;

impl FixupKind {
    fn slot(self) -> Option<usize> {
        match self {
            FixupKind::Label => None,
            other => Some(other as usize),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FixupRequest {
    pub kind: FixupKind,
    /// Position of the u16 placeholder.
    pub at: usize,
    pub label: Option<Name>,
    pub line: u32,
}

/// One open construct.
#[derive(Debug)]
pub struct Nest<'a> {
    pub kind: NestKind,
    /// Class, state or function code is emitted for.
    pub node: FieldId,
    pub allow: AllowFlags,
    slots: [Option<u16>; SLOT_COUNT],
    requests: BumpVec<'a, FixupRequest>,
    labels: BumpVec<'a, (Name, u16)>,
    /// Last placeholder of a sibling chain: `case` labels or `else if` arms.
    pub chain: Option<usize>,
    /// Bytecode of a `for` increment, emitted before the jump back.
    pub for_increment: BumpVec<'a, u8>,
    /// Type of the value a `switch` dispatches on.
    pub switch_type: PropertyType,
    /// `do` loop rather than `while`.
    pub do_loop: bool,
    /// Code buffer of the enclosing code owner while this one is open.
    pub saved_code: Option<CodeBuffer>,
    /// State code has started; no more declarations.
    pub code_started: bool,
    /// The body is a `{ }` block rather than a single statement.
    pub braced: bool,
}

impl<'a> Nest<'a> {
    pub fn new(kind: NestKind, node: FieldId, parent: AllowFlags, arena: &'a Bump) -> Self {
        Self {
            kind,
            node,
            allow: kind.allow(parent),
            slots: [None; SLOT_COUNT],
            requests: BumpVec::new_in(arena),
            labels: BumpVec::new_in(arena),
            chain: None,
            for_increment: BumpVec::new_in(arena),
            switch_type: PropertyType::none(),
            do_loop: false,
            saved_code: None,
            code_started: false,
            braced: true,
        }
    }

    /// Sets a fix-up target. Each slot is written at most once.
    pub fn set_fixup(&mut self, kind: FixupKind, offset: u16) {
        if let Some(slot) = kind.slot() {
            debug_assert!(self.slots[slot].is_none(), "fixup {kind:?} set twice");
            self.slots[slot] = Some(offset);
        }
    }

    pub fn fixup(&self, kind: FixupKind) -> Option<u16> {
        kind.slot().and_then(|slot| self.slots[slot])
    }

    pub fn request(&mut self, kind: FixupKind, at: usize, label: Option<Name>, line: u32) {
        self.requests.push(FixupRequest {
            kind,
            at,
            label,
            line,
        });
    }

    pub fn pending(&self) -> usize {
        self.requests.len()
    }

    /// Records a label. Returns `false` if it already exists.
    pub fn define_label(&mut self, name: Name, offset: u16) -> bool {
        if self.find_label(&name).is_some() {
            return false;
        }
        self.labels.push((name, offset));
        true
    }

    pub fn find_label(&self, name: &Name) -> Option<u16> {
        self.labels
            .iter()
            .find(|(label, _)| label == name)
            .map(|&(_, offset)| offset)
    }

    pub fn labels(&self) -> &[(Name, u16)] {
        &self.labels
    }

    /// Patches every pending request.
    pub fn resolve(&mut self, code: &mut CodeBuffer) -> Result<(), CompileError> {
        for request in self.requests.drain(..) {
            let target = match (request.kind, &request.label) {
                (FixupKind::Label, Some(label)) => self
                    .labels
                    .iter()
                    .find(|(name, _)| name == label)
                    .map(|&(_, offset)| offset)
                    .ok_or_else(|| CompileError::Semantic {
                        message: format!("Label '{label}' not found in this {}", self.kind.name()),
                        line: request.line,
                    })?,
                (kind, _) => kind
                    .slot()
                    .and_then(|slot| self.slots[slot])
                    .ok_or_else(|| CompileError::Internal {
                        message: format!("unresolved {kind:?} fixup in {}", self.kind.name()),
                        line: request.line,
                    })?,
            };
            code.patch_u16(request.at, target);
        }
        Ok(())
    }
}

/// The bounded stack of open nests.
#[derive(Debug)]
pub struct NestStack<'a> {
    arena: &'a Bump,
    nests: Vec<Nest<'a>>,
}

impl<'a> NestStack<'a> {
    pub fn new(arena: &'a Bump) -> Self {
        Self {
            arena,
            nests: Vec::with_capacity(MAX_NEST),
        }
    }

    pub fn len(&self) -> usize {
        self.nests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nests.is_empty()
    }

    pub fn push(&mut self, kind: NestKind, node: FieldId, line: u32) -> Result<&mut Nest<'a>, CompileError> {
        if self.nests.len() >= MAX_NEST {
            return Err(CompileError::Semantic {
                message: "Maximum nesting limit exceeded".to_string(),
                line,
            });
        }
        let parent = self
            .nests
            .last()
            .map_or(AllowFlags::empty(), |nest| nest.allow);
        self.nests.push(Nest::new(kind, node, parent, self.arena));
        let index = self.nests.len() - 1;
        Ok(&mut self.nests[index])
    }

    pub fn pop(&mut self, line: u32) -> Result<Nest<'a>, CompileError> {
        self.nests.pop().ok_or(CompileError::Internal {
            message: "nest stack underflow".to_string(),
            line,
        })
    }

    pub fn top(&self) -> Option<&Nest<'a>> {
        self.nests.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut Nest<'a>> {
        self.nests.last_mut()
    }

    pub fn top_kind(&self) -> NestKind {
        self.top().map_or(NestKind::None, |nest| nest.kind)
    }

    pub fn allows(&self, flags: AllowFlags) -> bool {
        self.top().is_some_and(|nest| nest.allow.contains(flags))
    }

    /// Index of the innermost nest whose kind is in `kinds`.
    pub fn innermost(&self, kinds: &[NestKind]) -> Option<usize> {
        self.nests.iter().rposition(|nest| kinds.contains(&nest.kind))
    }

    pub fn get(&self, index: usize) -> &Nest<'a> {
        &self.nests[index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut Nest<'a> {
        &mut self.nests[index]
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Nest<'a>> {
        self.nests.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::ExprToken;
    use uscript_core::Database;

    fn node() -> FieldId {
        Database::new().object_class()
    }

    #[test]
    fn allow_flags_follow_nesting() {
        let arena = Bump::new();
        let mut stack = NestStack::new(&arena);
        stack.push(NestKind::None, node(), 1).unwrap();
        assert!(stack.allows(AllowFlags::CLASS));
        stack.push(NestKind::Class, node(), 1).unwrap();
        stack.push(NestKind::Function, node(), 1).unwrap();
        assert!(stack.allows(AllowFlags::VAR_DECL | AllowFlags::LABEL));
        stack.push(NestKind::Loop, node(), 1).unwrap();
        assert!(stack.allows(AllowFlags::BREAK | AllowFlags::CONTINUE | AllowFlags::RETURN));
        assert!(!stack.allows(AllowFlags::LABEL));
        stack.push(NestKind::Switch, node(), 1).unwrap();
        assert!(stack.allows(AllowFlags::CASE | AllowFlags::CONTINUE));
        assert!(!stack.allows(AllowFlags::CMD));
        stack.push(NestKind::If, node(), 1).unwrap();
        assert!(!stack.allows(AllowFlags::CASE));
        assert!(stack.allows(AllowFlags::ELSE_IF));
    }

    #[test]
    fn nesting_limit() {
        let arena = Bump::new();
        let mut stack = NestStack::new(&arena);
        for _ in 0..MAX_NEST {
            stack.push(NestKind::If, node(), 1).unwrap();
        }
        assert!(stack.push(NestKind::If, node(), 1).is_err());
    }

    #[test]
    fn resolves_slots_and_labels() {
        let arena = Bump::new();
        let mut db = Database::new();
        let label = db.intern("Begin");
        let mut nest = Nest::new(NestKind::Function, node(), AllowFlags::empty(), &arena);
        let mut code = CodeBuffer::new();
        code.emit_op(ExprToken::Jump);
        let first = code.emit_placeholder();
        nest.request(FixupKind::Label, first, Some(label.clone()), 1);
        code.emit_op(ExprToken::Jump);
        let second = code.emit_placeholder();
        nest.request(FixupKind::LoopEnd, second, None, 1);
        assert!(nest.define_label(label.clone(), 0x10));
        assert!(!nest.define_label(label, 0x20));
        nest.set_fixup(FixupKind::LoopEnd, 0x30);
        nest.resolve(&mut code).unwrap();
        assert_eq!(nest.pending(), 0);
        assert_eq!(code.read_u16(first), 0x10);
        assert_eq!(code.read_u16(second), 0x30);
    }

    #[test]
    fn unset_slot_is_internal_error() {
        let arena = Bump::new();
        let mut nest = Nest::new(NestKind::If, node(), AllowFlags::CMD, &arena);
        let mut code = CodeBuffer::from_vec(vec![0, 0]);
        nest.request(FixupKind::IfEnd, 0, None, 3);
        let err = nest.resolve(&mut code).unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn missing_label_is_user_error() {
        let arena = Bump::new();
        let mut db = Database::new();
        let label = db.intern("Nowhere");
        let mut nest = Nest::new(NestKind::State, node(), AllowFlags::empty(), &arena);
        let mut code = CodeBuffer::from_vec(vec![0, 0]);
        nest.request(FixupKind::Label, 0, Some(label), 3);
        let err = nest.resolve(&mut code).unwrap_err();
        assert!(!err.is_internal());
    }
}
