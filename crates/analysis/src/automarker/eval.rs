//! Evaluation of the rule algebra for one node.

use super::rules::{Adjust, LeafRule, Rule};
use super::{Interaction, Session, Step};
use braid_core::marking::{
    BreakType, DeclScope, IndirectMap, IndirectScope, KindSet, MarkKind, Marking,
    Markings, VarScope,
};
use braid_core::tree::NodeId;
use std::collections::BTreeSet;
use tracing::warn;

/// Field of an exception handler holding the caught type; empty for a bare `except:`.
const HANDLER_TYPE: &str = "type";

/// Kinds answered by every part, limited to `wanted`.
fn common_kinds(parts: &[Markings], wanted: &KindSet) -> KindSet {
    wanted
        .iter()
        .filter(|kind| parts.iter().all(|part| part.contains(**kind)))
        .copied()
        .collect()
}

impl<I: Interaction + ?Sized> Session<'_, I> {
    pub(super) fn eval(&mut self, rule: &Rule, node: NodeId, wanted: &KindSet) -> Step<Markings> {
        match rule {
            Rule::Leaf(leaf) => self.leaf(leaf, node, wanted),
            Rule::Rewrite(rw) => match rw.rewrite.apply(self.tree, node)? {
                Some(rewritten) => self.resolve(rewritten, wanted),
                None => match &rw.otherwise {
                    Some(otherwise) => self.eval(otherwise, node, wanted),
                    None => Ok(Markings::new()),
                },
            },
            Rule::Sequential(rules) => {
                let parts = self.eval_all(rules, node, wanted)?;
                let mut out = Markings::base(&common_kinds(&parts, wanted));
                for part in &parts {
                    out.combine(part);
                }
                Ok(out)
            }
            Rule::AllOf(rules) => {
                let parts = self.eval_all(rules, node, wanted)?;
                let mut out = Markings::new();
                for part in parts {
                    if let Some(clash) = part.kinds().into_iter().find(|k| out.contains(*k)) {
                        warn!(
                            "All-of rule for {} answers {} twice; ignoring rule",
                            self.tree.kind(node),
                            clash
                        );
                        return Ok(Markings::new());
                    }
                    out.extend_from(&part);
                }
                Ok(out)
            }
            Rule::AnyOf(rules) => {
                let parts = self.eval_all(rules, node, wanted)?;
                let Some((first, rest)) = parts.split_first() else {
                    return Ok(Markings::new());
                };
                let mut out = first.clone();
                out.restrict(&common_kinds(&parts, wanted));
                for part in rest {
                    out.merge_alternative(part);
                }
                Ok(out)
            }
        }
    }

    fn eval_all(&mut self, rules: &[Rule], node: NodeId, wanted: &KindSet) -> Step<Vec<Markings>> {
        rules
            .iter()
            .map(|rule| self.eval(rule, node, wanted))
            .collect()
    }

    fn leaf(&mut self, leaf: &LeafRule, node: NodeId, wanted: &KindSet) -> Step<Markings> {
        let Some(kinds) = leaf.answerable(wanted) else {
            warn!(
                "Rule for {} lists kinds as both known and unknown; ignoring rule",
                self.tree.kind(node)
            );
            return Ok(Markings::new());
        };
        if kinds.is_empty() {
            return Ok(Markings::new());
        }

        let mut out = Markings::base(&kinds);
        for field in &leaf.children {
            let Some(child) = self.tree.child(node, field) else {
                warn!("{} has no field '{}'; ignoring rule", self.tree.kind(node), field);
                return Ok(Markings::new());
            };
            let marks = self.resolve(child, &kinds)?;
            out.combine(&marks);
        }
        for adjust in &leaf.adjust {
            self.adjust(adjust, node, &mut out)?;
        }
        Ok(out)
    }

    fn field_str(&self, node: NodeId, field: &str) -> Option<String> {
        self.tree
            .child(node, field)
            .and_then(|child| self.tree.atom_str(child))
            .map(str::to_string)
    }

    fn adjust(&mut self, adjust: &Adjust, node: NodeId, out: &mut Markings) -> Step<()> {
        match adjust {
            Adjust::AddBreak(brk) => add_break(out, *brk),
            Adjust::RemoveBreak(brk) => {
                if let Some(Marking::Breaks(set)) = out.get_mut(MarkKind::Breaks) {
                    set.remove(*brk);
                }
            }
            Adjust::AddBreakWhen { child, kind, brk } => {
                let matches = self
                    .tree
                    .child(node, child)
                    .is_some_and(|c| self.tree.kind(c) == kind);
                if matches {
                    add_break(out, *brk);
                }
            }
            Adjust::CatchAll { handlers } => {
                let catch_all = self.tree.child_items(node, handlers).iter().any(|handler| {
                    self.tree
                        .child(*handler, HANDLER_TYPE)
                        .is_some_and(|t| self.tree.is_empty(t))
                });
                if catch_all {
                    if let Some(Marking::Breaks(set)) = out.get_mut(MarkKind::Breaks) {
                        set.remove(BreakType::Except);
                    }
                }
            }
            Adjust::NameAccess { name, context } => {
                let Some(id) = self.field_str(node, name) else {
                    return Ok(());
                };
                let ctx = self.tree.child(node, context).map(|c| self.tree.kind(c));
                let target = match ctx {
                    Some("Load" | "AugLoad") => MarkKind::Reads,
                    Some("Store" | "Del" | "AugStore" | "Param") => MarkKind::Writes,
                    _ => return Ok(()),
                };
                add_var(out, target, &id);
            }
            Adjust::Binds { name } => {
                if let Some(id) = self.field_str(node, name) {
                    add_var(out, MarkKind::Writes, &id);
                }
            }
            Adjust::BindsAlias { name, asname } => {
                let bound = self.field_str(node, asname).or_else(|| {
                    self.field_str(node, name)
                        .and_then(|full| full.split('.').next().map(str::to_string))
                });
                if let Some(id) = bound {
                    add_var(out, MarkKind::Writes, &id);
                }
            }
            Adjust::Declares { names, scope } => {
                let declared: Vec<String> = self
                    .tree
                    .child_items(node, names)
                    .into_iter()
                    .filter_map(|item| self.tree.atom_str(item).map(str::to_string))
                    .collect();
                if let Some(Marking::Scope(map)) = out.get_mut(MarkKind::Scope) {
                    for name in declared {
                        map.declare(name, *scope);
                    }
                }
            }
            Adjust::EnclosedScope { body, params } => {
                if out.contains(MarkKind::IndirectRw) {
                    let accesses = self.enclosed_scope(node, body, params)?;
                    out.insert(Marking::IndirectRw(accesses));
                }
            }
        }
        Ok(())
    }

    /// Names the code under `body` accesses outside its own scope.
    ///
    /// Reads and writes of names declared `global`/`nonlocal` keep that scope; reads of names
    /// neither bound locally nor declared are free. Accesses reported by nested scopes pass
    /// through unless they refer to a local of this scope.
    fn enclosed_scope(&mut self, node: NodeId, body: &str, params: &str) -> Step<IndirectMap> {
        let Some(body) = self.tree.child(node, body) else {
            return Ok(IndirectMap::new());
        };
        let wanted: KindSet = [
            MarkKind::Reads,
            MarkKind::Writes,
            MarkKind::Scope,
            MarkKind::IndirectRw,
        ]
        .into();
        let inner = self.resolve(body, &wanted)?;
        let declared = inner.scope().cloned().unwrap_or_default();
        let reads = inner.reads().cloned().unwrap_or_default();
        let writes = inner.writes().cloned().unwrap_or_default();

        let mut locals: BTreeSet<String> = self
            .tree
            .child(node, params)
            .map(|p| self.parameter_names(p))
            .unwrap_or_default();
        for name in writes.names() {
            if matches!(declared.scope_of(name), None | Some(DeclScope::Local)) {
                locals.insert(name.to_string());
            }
        }

        let classify = |name: &str| match declared.scope_of(name) {
            Some(DeclScope::Global) => Some(IndirectScope::Global),
            Some(DeclScope::Nonlocal) => Some(IndirectScope::Nonlocal),
            _ if locals.contains(name) => None,
            _ => Some(IndirectScope::Free),
        };

        let mut out = IndirectMap::new();
        for name in reads.names() {
            if let Some(scope) = classify(name) {
                out.mark_read(name, scope, true);
            }
        }
        for name in writes.names() {
            if let Some(scope) = classify(name) {
                out.mark_write(name, scope, true);
            }
        }
        if let Some(nested) = inner.indirect() {
            let mut passed = IndirectMap::new();
            for (var, access) in nested.iter() {
                if var.scope == IndirectScope::Global || !locals.contains(&var.name) {
                    passed.insert(var.clone(), access);
                }
            }
            out.combine(&passed);
        }
        Ok(out)
    }

    /// Identifiers of every `arg` node under `params`.
    fn parameter_names(&self, params: NodeId) -> BTreeSet<String> {
        self.tree
            .descendants(params)
            .into_iter()
            .filter(|id| self.tree.kind(*id) == "arg")
            .filter_map(|id| self.field_str(id, "arg"))
            .collect()
    }
}

fn add_break(out: &mut Markings, brk: BreakType) {
    if let Some(Marking::Breaks(set)) = out.get_mut(MarkKind::Breaks) {
        set.insert(brk);
    }
}

fn add_var(out: &mut Markings, kind: MarkKind, name: &str) {
    match out.get_mut(kind) {
        Some(Marking::Reads(map)) | Some(Marking::Writes(map)) => {
            map.add(name, VarScope::Unknown);
        }
        _ => {}
    }
}
