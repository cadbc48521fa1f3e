//! Stack and variable model.
//!
//! Frames are captured from step events on the engine thread; the
//! client inspects them through pooled references while the session
//! is paused. The variable tree is an index over values (the pool),
//! not a materialized nested structure, so cyclic or huge values cost
//! only what the client expands.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use weft_engine::{ConstructKind, EngineValue, SourceLocation, StepEvent};

use crate::pool::ObjectPool;
use crate::protocol::VariableInfo;
use crate::render;

/// Name of the implicit first variable of every frame scope.
pub const CONTEXT_NAME: &str = "(context)";

/// Snapshot of one active construct invocation.
#[derive(Debug, Clone)]
pub struct Frame {
    pub location: SourceLocation,
    pub construct: ConstructKind,
    pub context: Option<EngineValue>,
    pub parameters: IndexMap<SmolStr, EngineValue>,
    pub locals: Vec<(SmolStr, EngineValue)>,
}

impl Frame {
    pub fn from_step(step: StepEvent) -> Self {
        Self {
            location: step.location,
            construct: step.construct,
            context: step.context,
            parameters: step.parameters,
            locals: step.locals,
        }
    }

    /// Display name used in stack traces.
    pub fn label(&self) -> String {
        self.construct.to_string()
    }

    /// Top-level entries of the frame's scope: the implicit context
    /// variable first, then parameters, then locals, all in
    /// declaration order.
    pub fn entries(&self) -> Vec<(SmolStr, EngineValue)> {
        let mut entries = Vec::with_capacity(1 + self.parameters.len() + self.locals.len());
        entries.push((
            SmolStr::new(CONTEXT_NAME),
            self.context.clone().unwrap_or(EngineValue::Empty),
        ));
        for (name, value) in &self.parameters {
            entries.push((name.clone(), value.clone()));
        }
        for (name, value) in &self.locals {
            entries.push((name.clone(), value.clone()));
        }
        entries
    }
}

/// One pooled variable.
#[derive(Debug, Clone)]
pub struct VariableSlot {
    pub name: SmolStr,
    pub value: EngineValue,
}

/// Pool owner keys. `Frames` owns the per-pause frame scope ids;
/// `Children(id)` owns the variables produced by expanding `id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Owner {
    Frames,
    Children(u64),
}

/// What a pooled reference id resolves to.
#[derive(Debug, Clone)]
pub enum PoolEntry {
    /// A frame's local scope, by stack index.
    FrameScope(usize),
    Variable(VariableSlot),
}

pub type VariablePool = ObjectPool<Owner, PoolEntry>;

/// Per-pause memo of expansion results, keyed by parent reference.
/// Cleared together with the pool on resume, so repeated expansion of
/// the same reference returns the same ids within one pause episode.
pub type ChildrenMemo = FxHashMap<u64, Vec<u64>>;

/// Allocate frame scope ids for the current stack, oldest first.
/// Called lazily on the first stack query of a pause episode.
pub fn ensure_frame_refs(pool: &mut VariablePool, frame_refs: &mut Vec<u64>, stack_len: usize) {
    if frame_refs.len() == stack_len {
        return;
    }
    frame_refs.clear();
    for index in 0..stack_len {
        frame_refs.push(pool.store(Owner::Frames, PoolEntry::FrameScope(index)));
    }
}

fn info_for(id: u64, slot: &VariableSlot) -> VariableInfo {
    VariableInfo {
        name: slot.name.to_string(),
        value: render::display_string(&slot.value),
        type_label: render::type_label(&slot.value).to_string(),
        variables_reference: if render::has_children(&slot.value) {
            id
        } else {
            0
        },
    }
}

/// Resolve a reference id to its variable list: a frame scope yields
/// the frame's top-level entries, a structured variable yields its
/// children. Stale or unknown references yield an empty list (the
/// client is expected to re-fetch after a resume).
pub fn resolve_variables(
    pool: &mut VariablePool,
    memo: &mut ChildrenMemo,
    stack: &[Frame],
    reference: u64,
) -> Vec<VariableInfo> {
    if let Some(ids) = memo.get(&reference) {
        return ids
            .iter()
            .filter_map(|&id| match pool.get(id) {
                Some(PoolEntry::Variable(slot)) => Some(info_for(id, slot)),
                _ => None,
            })
            .collect();
    }

    let entries: Vec<(SmolStr, EngineValue)> = match pool.get(reference) {
        Some(PoolEntry::FrameScope(index)) => match stack.get(*index) {
            Some(frame) => frame.entries(),
            None => return Vec::new(),
        },
        Some(PoolEntry::Variable(slot)) => render::child_entries(&slot.value),
        None => return Vec::new(),
    };

    let mut ids = Vec::with_capacity(entries.len());
    let mut infos = Vec::with_capacity(entries.len());
    for (name, value) in entries {
        let slot = VariableSlot { name, value };
        let id = pool.store(Owner::Children(reference), PoolEntry::Variable(slot));
        let Some(PoolEntry::Variable(stored)) = pool.get(id) else {
            continue;
        };
        infos.push(info_for(id, stored));
        ids.push(id);
    }
    memo.insert(reference, ids);
    infos
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_engine::{NodeKind, NodeValue};

    fn frame_with_sequence() -> Frame {
        Frame::from_step(
            StepEvent::at("/work/main.xsl", 2, 1)
                .with_context(EngineValue::node(NodeValue::new(
                    NodeKind::Element,
                    "root",
                )))
                .with_parameter("mode", EngineValue::text("strict"))
                .with_local(
                    "x",
                    EngineValue::sequence(vec![
                        EngineValue::text("a"),
                        EngineValue::text("b"),
                        EngineValue::text("c"),
                    ]),
                ),
        )
    }

    #[test]
    fn frame_entries_put_context_first_in_declaration_order() {
        let names: Vec<_> = frame_with_sequence()
            .entries()
            .into_iter()
            .map(|(name, _)| name.to_string())
            .collect();
        assert_eq!(names, vec![CONTEXT_NAME, "mode", "x"]);
    }

    #[test]
    fn frame_scope_resolves_then_sequence_expands() {
        let mut pool = VariablePool::new();
        let mut memo = ChildrenMemo::default();
        let stack = vec![frame_with_sequence()];
        let mut frame_refs = Vec::new();
        ensure_frame_refs(&mut pool, &mut frame_refs, stack.len());

        let vars = resolve_variables(&mut pool, &mut memo, &stack, frame_refs[0]);
        assert_eq!(vars.len(), 3);
        let x = &vars[2];
        assert_eq!(x.name, "x");
        assert_ne!(x.variables_reference, 0, "sequence must be expandable");

        let children = resolve_variables(&mut pool, &mut memo, &stack, x.variables_reference);
        assert_eq!(children.len(), 3);
        assert!(children.iter().all(|c| c.variables_reference == 0));
    }

    #[test]
    fn repeated_expansion_returns_the_same_ids_within_one_pause() {
        let mut pool = VariablePool::new();
        let mut memo = ChildrenMemo::default();
        let stack = vec![frame_with_sequence()];
        let mut frame_refs = Vec::new();
        ensure_frame_refs(&mut pool, &mut frame_refs, stack.len());

        let first = resolve_variables(&mut pool, &mut memo, &stack, frame_refs[0]);
        let second = resolve_variables(&mut pool, &mut memo, &stack, frame_refs[0]);
        let refs = |vars: &[VariableInfo]| {
            vars.iter()
                .map(|v| (v.name.clone(), v.variables_reference))
                .collect::<Vec<_>>()
        };
        assert_eq!(refs(&first), refs(&second));
    }

    #[test]
    fn stale_reference_resolves_to_empty() {
        let mut pool = VariablePool::new();
        let mut memo = ChildrenMemo::default();
        let stack = vec![frame_with_sequence()];
        let mut frame_refs = Vec::new();
        ensure_frame_refs(&mut pool, &mut frame_refs, stack.len());
        let reference = frame_refs[0];

        pool.clear();
        memo.clear();
        let vars = resolve_variables(&mut pool, &mut memo, &stack, reference);
        assert!(vars.is_empty());
    }
}
