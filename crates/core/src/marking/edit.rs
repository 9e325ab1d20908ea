//! Application of parsed variable-marking edits.

use super::{
    DeclScope, IndirectMark, IndirectScope, MarkKind, MarkingStore, ReadsMark, ScopeMark,
    VarScope, WritesMark,
};
use crate::ident;
use crate::result::{Error, Result};
use crate::tree::NodeId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditAction {
    Add,
    Remove,
    Read,
    NoRead,
    Write,
    NoWrite,
}

/// Scope code carried by an edit; which codes are valid depends on the marking kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeCode {
    Local,
    Nonlocal,
    Global,
    Unknown,
    Free,
}

/// One `(action, scope, name)` update to a reads, writes, scope or indirectrw marking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarEdit {
    pub action: EditAction,
    pub scope: Option<ScopeCode>,
    pub name: String,
}

impl VarEdit {
    pub fn new(action: EditAction, scope: Option<ScopeCode>, name: impl Into<String>) -> Self {
        Self {
            action,
            scope,
            name: name.into(),
        }
    }
}

fn var_scope(kind: MarkKind, code: ScopeCode) -> Result<VarScope> {
    match code {
        ScopeCode::Local => Ok(VarScope::Local),
        ScopeCode::Nonlocal => Ok(VarScope::Nonlocal),
        ScopeCode::Global => Ok(VarScope::Global),
        ScopeCode::Unknown => Ok(VarScope::Unknown),
        ScopeCode::Free => Err(invalid(kind, "scope 'free' only applies to indirectrw")),
    }
}

fn decl_scope(code: ScopeCode) -> Result<DeclScope> {
    match code {
        ScopeCode::Local => Ok(DeclScope::Local),
        ScopeCode::Nonlocal => Ok(DeclScope::Nonlocal),
        ScopeCode::Global => Ok(DeclScope::Global),
        other => Err(invalid(
            MarkKind::Scope,
            format!("scope must be local, nonlocal or global, got {other:?}"),
        )),
    }
}

fn indirect_scope(code: ScopeCode) -> Result<IndirectScope> {
    match code {
        ScopeCode::Free => Ok(IndirectScope::Free),
        ScopeCode::Nonlocal => Ok(IndirectScope::Nonlocal),
        ScopeCode::Global => Ok(IndirectScope::Global),
        other => Err(invalid(
            MarkKind::IndirectRw,
            format!("scope must be free, nonlocal or global, got {other:?}"),
        )),
    }
}

fn invalid(kind: MarkKind, reason: impl Into<String>) -> Error {
    Error::InvalidEdit {
        kind,
        reason: reason.into(),
    }
}

fn require_scope(kind: MarkKind, edit: &VarEdit) -> Result<ScopeCode> {
    edit.scope
        .ok_or_else(|| invalid(kind, format!("{:?} needs a scope", edit.action)))
}

impl MarkingStore {
    /// Applies one variable edit to the `kind` marking of `node`.
    ///
    /// Returns whether the marking changed. Invalid names and action/scope combinations the kind
    /// does not accept are rejected before anything is touched.
    pub fn apply_edit(&mut self, node: NodeId, kind: MarkKind, edit: &VarEdit) -> Result<bool> {
        let name = ident::identifier(&edit.name)?;
        match (kind, edit.action) {
            (MarkKind::Reads | MarkKind::Writes, EditAction::Add) => {
                let scope = var_scope(kind, require_scope(kind, edit)?)?;
                Ok(match kind {
                    MarkKind::Reads => self.marker::<ReadsMark>(node).add(&name, scope),
                    _ => self.marker::<WritesMark>(node).add(&name, scope),
                })
            }
            (MarkKind::Reads | MarkKind::Writes, EditAction::Remove) => {
                if edit.scope.is_some() {
                    return Err(invalid(kind, "remove takes no scope"));
                }
                Ok(match kind {
                    MarkKind::Reads => self.marker::<ReadsMark>(node).remove(&name),
                    _ => self.marker::<WritesMark>(node).remove(&name),
                })
            }
            (MarkKind::Scope, EditAction::Add) => {
                let scope = decl_scope(require_scope(kind, edit)?)?;
                Ok(self.marker::<ScopeMark>(node).declare(&name, scope))
            }
            (MarkKind::Scope, EditAction::Remove) => {
                if edit.scope.is_some() {
                    return Err(invalid(kind, "remove takes no scope"));
                }
                Ok(self.marker::<ScopeMark>(node).remove(&name))
            }
            (MarkKind::IndirectRw, action) => {
                let scope = indirect_scope(require_scope(kind, edit)?)?;
                let mut marker = self.marker::<IndirectMark>(node);
                Ok(match action {
                    EditAction::Read => marker.mark_read(&name, scope, true),
                    EditAction::NoRead => marker.mark_read(&name, scope, false),
                    EditAction::Write => marker.mark_write(&name, scope, true),
                    EditAction::NoWrite => marker.mark_write(&name, scope, false),
                    EditAction::Remove => marker.remove(&name, scope),
                    EditAction::Add => {
                        return Err(invalid(kind, "use read, noread, write or nowrite"))
                    }
                })
            }
            (MarkKind::Visible | MarkKind::Breaks, _) => {
                Err(invalid(kind, "not a variable marking"))
            }
            (_, action) => Err(invalid(kind, format!("action {action:?} does not apply"))),
        }
    }
}
