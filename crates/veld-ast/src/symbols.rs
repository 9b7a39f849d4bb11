//! Symbols and resolution-time capability flags.

use bitflags::bitflags;
use veld_common::interner::Atom;
use veld_types::TypeId;

/// Identifier of a resolved symbol (local, parameter, or property).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub const INVALID: Self = Self(u32::MAX);

    pub const fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }
}

bitflags! {
    /// Capability flags the resolver computes once per symbol.
    ///
    /// The flow analyses only ever read these; they never inspect
    /// declarations to re-derive them.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct SymbolFlags: u16 {
        /// Declared with `var` (reassignable). Absent means `val`.
        const MUTABLE = 1 << 0;
        /// A function or lambda parameter.
        const PARAMETER = 1 << 1;
        /// Captured by at least one closure in the body.
        const CAPTURED = 1 << 2;
        /// Captured by a closure *and* reassigned somewhere in the
        /// capturing scope. Such symbols never receive flow-sensitive
        /// narrowing anywhere in the body.
        const CAPTURED_MUTATED = 1 << 3;
        /// A property whose accessor is known simple and non-overridable;
        /// only these may participate in stable-expression keys.
        const STABLE_ACCESSOR = 1 << 4;
        /// Declared without an initializer; definite-assignment analysis
        /// must prove a write before each read.
        const LATE_INITIALIZED = 1 << 5;
    }
}

/// How a closure argument is invoked relative to the enclosing body,
/// as guaranteed by the resolver (e.g. from callee contracts).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InvocationOrder {
    /// Executes synchronously, in place, exactly where it appears.
    /// Flow facts pass through the closure body.
    InPlace,
    /// Executes at most once but possibly later. Treated like `Unknown`
    /// for fact propagation: facts are invalidated across the edge.
    AtMostOnce,
    /// No guarantee; the closure may escape and run at any time.
    Unknown,
}

impl InvocationOrder {
    /// Whether facts established before the closure may flow through it
    /// and survive after it.
    pub const fn is_in_place(self) -> bool {
        matches!(self, Self::InPlace)
    }
}

/// A resolved symbol.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: Atom,
    pub declared_ty: TypeId,
    pub flags: SymbolFlags,
}

/// Append-only symbol table for one compilation unit.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: Atom, declared_ty: TypeId, flags: SymbolFlags) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol {
            name,
            declared_ty,
            flags,
        });
        id
    }

    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.0 as usize)
    }

    /// Declared (or enhanced) type of a symbol. `Error` for invalid ids.
    pub fn declared_ty(&self, id: SymbolId) -> TypeId {
        self.get(id).map_or(TypeId::ERROR, |s| s.declared_ty)
    }

    pub fn flags(&self, id: SymbolId) -> SymbolFlags {
        self.get(id).map_or(SymbolFlags::empty(), |s| s.flags)
    }

    /// Replace a symbol's declared type. Used when the resolver installs an
    /// enhanced type over a foreign declaration's baseline type.
    pub fn set_declared_ty(&mut self, id: SymbolId, ty: TypeId) {
        if let Some(sym) = self.symbols.get_mut(id.0 as usize) {
            sym.declared_ty = ty;
        }
    }

    /// Mark a symbol as captured (and mutated, when `mutated` is set) by a
    /// closure. The resolver calls this while walking lambda bodies.
    pub fn mark_captured(&mut self, id: SymbolId, mutated: bool) {
        if let Some(sym) = self.symbols.get_mut(id.0 as usize) {
            sym.flags |= SymbolFlags::CAPTURED;
            if mutated {
                sym.flags |= SymbolFlags::CAPTURED_MUTATED;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (SymbolId(i as u32), s))
    }
}
