//! Typed accessors over one marking kind of one node.

use super::{
    BreakSet, BreakType, DeclScope, IndirectAccess, IndirectMap, IndirectScope, MarkKind, Marking,
    MarkingStore, ScopeMap, VarMap, VarScope,
};
use crate::result::Result;
use crate::tree::NodeId;
use std::marker::PhantomData;

/// Binds a marking kind to its value type.
///
/// `Value::default()` is the empty value mutation starts from, while [`MarkingKind::read_default`]
/// is what an unmarked node reports.
pub trait MarkingKind {
    const KIND: MarkKind;
    type Value: Clone + Default + PartialEq + std::fmt::Debug;

    fn read_default() -> Self::Value;
    fn wrap(value: Self::Value) -> Marking;
    fn peek(marking: &Marking) -> Option<&Self::Value>;
    fn into_value(marking: Marking) -> Option<Self::Value>;
}

macro_rules! marking_kind {
    ($(#[$meta:meta])* $name:ident, $kind:ident, $value:ty, $default:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name;

        impl MarkingKind for $name {
            const KIND: MarkKind = MarkKind::$kind;
            type Value = $value;

            fn read_default() -> $value {
                $default
            }

            fn wrap(value: $value) -> Marking {
                Marking::$kind(value)
            }

            fn peek(marking: &Marking) -> Option<&$value> {
                match marking {
                    Marking::$kind(value) => Some(value),
                    _ => None,
                }
            }

            fn into_value(marking: Marking) -> Option<$value> {
                match marking {
                    Marking::$kind(value) => Some(value),
                    _ => None,
                }
            }
        }
    };
}

marking_kind!(
    /// Whether a node has externally visible side effects.
    VisibleMark, Visible, bool, true
);
marking_kind!(
    /// Break types a node may perform; unmarked nodes can break every way.
    BreaksMark, Breaks, BreakSet, BreakSet::all()
);
marking_kind!(ReadsMark, Reads, VarMap, VarMap::new());
marking_kind!(WritesMark, Writes, VarMap, VarMap::new());
marking_kind!(IndirectMark, IndirectRw, IndirectMap, IndirectMap::new());
marking_kind!(ScopeMark, Scope, ScopeMap, ScopeMap::new());

enum Slot<'s> {
    Attached {
        store: &'s mut MarkingStore,
        node: NodeId,
    },
    Detached(Option<Marking>),
}

/// Typed view of one marking kind, either attached to a node in a store or detached.
pub struct Marker<'s, K> {
    slot: Slot<'s>,
    _kind: PhantomData<K>,
}

/// A marker holding its own snapshot instead of pointing into a store.
pub type Detached<K> = Marker<'static, K>;

impl<K: MarkingKind> Marker<'static, K> {
    /// Free-standing marker, optionally holding a value.
    pub fn detached(value: Option<K::Value>) -> Self {
        Marker {
            slot: Slot::Detached(value.map(K::wrap)),
            _kind: PhantomData,
        }
    }
}

impl<'s, K: MarkingKind> Marker<'s, K> {
    pub(super) fn attached(store: &'s mut MarkingStore, node: NodeId) -> Self {
        Self {
            slot: Slot::Attached { store, node },
            _kind: PhantomData,
        }
    }

    /// Node the marker writes to, `None` when detached.
    pub fn node(&self) -> Option<NodeId> {
        match &self.slot {
            Slot::Attached { node, .. } => Some(*node),
            Slot::Detached(_) => None,
        }
    }

    fn stored(&self) -> Option<&K::Value> {
        let marking = match &self.slot {
            Slot::Attached { store, node } => store.get_kind(*node, K::KIND),
            Slot::Detached(marking) => marking.as_ref(),
        };
        marking.and_then(K::peek)
    }

    fn take(&mut self) -> Option<K::Value> {
        let marking = match &mut self.slot {
            Slot::Attached { store, node } => store.clear(*node, K::KIND),
            Slot::Detached(marking) => marking.take(),
        };
        marking.and_then(K::into_value)
    }

    fn put(&mut self, value: K::Value) {
        match &mut self.slot {
            Slot::Attached { store, node } => store.set(*node, K::wrap(value)),
            Slot::Detached(marking) => *marking = Some(K::wrap(value)),
        }
    }

    pub fn is_marked(&self) -> bool {
        self.stored().is_some()
    }

    /// Stored value, or the kind's read default when unmarked.
    pub fn get(&self) -> K::Value {
        self.stored().cloned().unwrap_or_else(K::read_default)
    }

    /// Stored value without substituting the default.
    pub fn value(&self) -> Option<&K::Value> {
        self.stored()
    }

    pub fn set(&mut self, value: K::Value) {
        self.put(value);
    }

    pub fn clear(&mut self) -> Option<K::Value> {
        self.take()
    }

    /// Mutates the stored value in place; an unmarked node starts from the empty value.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut K::Value) -> R) -> R {
        let mut value = self.take().unwrap_or_default();
        let out = f(&mut value);
        self.put(value);
        out
    }

    /// Snapshots the current value into a detached marker.
    ///
    /// The snapshot is an owned copy: mutating it never reaches the node it came from.
    pub fn detach(self) -> Detached<K> {
        Marker::detached(self.stored().cloned())
    }

    /// Writes this marker's value onto `node`, returning a marker attached there.
    pub fn attach<'t>(self, store: &'t mut MarkingStore, node: NodeId) -> Marker<'t, K> {
        let value = self.stored().cloned();
        let mut marker = Marker::attached(store, node);
        match value {
            Some(value) => marker.put(value),
            None => {
                marker.take();
            }
        }
        marker
    }
}

impl<K: MarkingKind> Clone for Marker<'static, K> {
    fn clone(&self) -> Self {
        Marker::detached(self.stored().cloned())
    }
}

impl Marker<'_, BreaksMark> {
    /// True when the node may leave the linear flow via `kind`.
    pub fn can_break(&self, kind: BreakType) -> bool {
        self.get().contains(kind)
    }

    /// True when the node may leave the linear flow at all.
    pub fn breaks_any(&self) -> bool {
        !self.get().is_empty()
    }

    pub fn add_break(&mut self, kind: BreakType) -> bool {
        self.update(|set| set.insert(kind))
    }

    pub fn remove_break(&mut self, kind: BreakType) -> bool {
        self.update(|set| set.remove(kind))
    }

    /// [`Self::add_break`] by name, rejecting unknown break types.
    pub fn add_break_named(&mut self, kind: &str) -> Result<bool> {
        let kind = kind.parse()?;
        Ok(self.add_break(kind))
    }

    /// [`Self::remove_break`] by name, rejecting unknown break types.
    pub fn remove_break_named(&mut self, kind: &str) -> Result<bool> {
        let kind = kind.parse()?;
        Ok(self.remove_break(kind))
    }
}

macro_rules! var_marker {
    ($mark:ty) => {
        impl Marker<'_, $mark> {
            pub fn add(&mut self, name: &str, scope: VarScope) -> bool {
                self.update(|map| map.add(name, scope))
            }

            pub fn remove(&mut self, name: &str) -> bool {
                self.update(|map| map.remove(name))
            }

            pub fn contains(&self, name: &str) -> bool {
                self.stored().is_some_and(|map| map.contains(name))
            }
        }
    };
}

var_marker!(ReadsMark);
var_marker!(WritesMark);

impl Marker<'_, ScopeMark> {
    pub fn declare(&mut self, name: &str, scope: DeclScope) -> bool {
        self.update(|map| map.declare(name, scope))
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.update(|map| map.remove(name))
    }

    pub fn scope_of(&self, name: &str) -> Option<DeclScope> {
        self.stored().and_then(|map| map.scope_of(name))
    }
}

impl Marker<'_, IndirectMark> {
    pub fn mark_read(&mut self, name: &str, scope: IndirectScope, read: bool) -> bool {
        self.update(|map| map.mark_read(name, scope, read))
    }

    pub fn mark_write(&mut self, name: &str, scope: IndirectScope, write: bool) -> bool {
        self.update(|map| map.mark_write(name, scope, write))
    }

    pub fn remove(&mut self, name: &str, scope: IndirectScope) -> bool {
        self.update(|map| map.remove(name, scope))
    }

    pub fn access(&self, name: &str, scope: IndirectScope) -> IndirectAccess {
        self.get().access(name, scope)
    }
}
