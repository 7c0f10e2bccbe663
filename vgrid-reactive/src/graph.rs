//! Node storage and the rank-ordered propagation pass.
//!
//! Every cell of a [`Realm`] is a [`Node`] in a slot map. Source nodes (signals and
//! streams) receive values from the host or from connected upstream nodes; derived
//! nodes run a compute function over the values of their sources.
//!
//! A pass starts from a set of writes and evaluates dirty nodes in ascending rank
//! order. A node that is dirtied again after it already ran (a feedback edge) is simply
//! queued again; cycles are expected to settle through `distinct` nodes.

use std::{any::Any, cmp::Reverse, collections::BinaryHeap, sync::Arc};

use rustc_hash::FxHashSet;
use slotmap::{SlotMap, new_key_type};
use smallvec::{SmallVec, smallvec};

use crate::{ReactiveError, Realm};

new_key_type! {
    /// Identifies a node inside a [`Realm`] graph.
    pub struct NodeId;
}

pub(crate) type Value = Arc<dyn Any + Send + Sync>;
pub(crate) type ComputeFn = Arc<dyn Fn(&EvalContext<'_>) -> Outcome + Send + Sync>;
pub(crate) type EqFn = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;
pub(crate) type ListenerFn = Arc<dyn Fn(&Realm, &(dyn Any + Send + Sync)) + Send + Sync>;

const MAX_EVALUATIONS_PER_PASS: usize = 100_000;
const UNNAMED: &str = "<unnamed>";

pub(crate) fn boxed<T: Send + Sync + 'static>(value: T) -> Value {
    Arc::new(value)
}

pub(crate) fn compute<F>(f: F) -> ComputeFn
where
    F: Fn(&EvalContext<'_>) -> Outcome + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Signal,
    Stream,
    Derived,
}

/// Result of running a compute function.
pub(crate) enum Outcome {
    /// Emit a new value.
    Emit(Value),
    /// The input was rejected; the node no longer has a current value.
    Reject,
    /// Nothing relevant changed; keep the node as it is.
    Hold,
}

impl From<Option<Value>> for Outcome {
    fn from(value: Option<Value>) -> Self {
        match value {
            Some(value) => Outcome::Emit(value),
            None => Outcome::Hold,
        }
    }
}

pub(crate) struct Listener {
    pub(crate) seq: u64,
    pub(crate) callback: ListenerFn,
    pub(crate) skip: usize,
    pub(crate) once: bool,
}

pub(crate) struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) label: Option<&'static str>,
    pub(crate) value: Option<Value>,
    /// Whether `value` reflects the latest evaluation. Rejecting filters clear it.
    pub(crate) live: bool,
    /// Whether new observers receive the current value on subscription.
    pub(crate) replay: bool,
    pub(crate) rank: u32,
    pub(crate) sources: SmallVec<[NodeId; 4]>,
    pub(crate) dependents: SmallVec<[NodeId; 4]>,
    pub(crate) compute: Option<ComputeFn>,
    pub(crate) eq: Option<EqFn>,
    pub(crate) listeners: Vec<Listener>,
    pub(crate) emitted_at: u64,
    pub(crate) evaluated_at: u64,
}

impl Node {
    fn new(kind: NodeKind, value: Option<Value>, eq: Option<EqFn>) -> Self {
        let live = value.is_some();
        Self {
            kind,
            label: None,
            value,
            live,
            replay: kind == NodeKind::Signal,
            rank: 0,
            sources: SmallVec::new(),
            dependents: SmallVec::new(),
            compute: None,
            eq,
            listeners: Vec::new(),
            emitted_at: 0,
            evaluated_at: 0,
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        self.label.unwrap_or(UNNAMED)
    }
}

/// A subscriber callback paired with the value it must be invoked with.
pub(crate) struct Effect {
    pub(crate) callback: ListenerFn,
    pub(crate) value: Value,
}

/// Read-only view of the graph handed to compute functions while a node evaluates.
///
/// Compute functions run with the graph locked, so they can only look at other cells
/// through this context and must not call back into the [`Realm`].
pub struct EvalContext<'a> {
    graph: &'a Graph,
    node: NodeId,
    initial: bool,
}

impl EvalContext<'_> {
    /// Whether `source` emitted since this node last evaluated. During the construction
    /// time evaluation every source with a current value counts as fired.
    pub(crate) fn fired(&self, source: NodeId) -> bool {
        let Some(source) = self.graph.nodes.get(source) else {
            return false;
        };
        if self.initial {
            return source.live && source.value.is_some();
        }
        let evaluated_at = self
            .graph
            .nodes
            .get(self.node)
            .map_or(0, |node| node.evaluated_at);
        source.emitted_at > evaluated_at
    }

    pub(crate) fn emitted_at(&self, source: NodeId) -> u64 {
        self.graph
            .nodes
            .get(source)
            .map_or(0, |node| node.emitted_at)
    }

    pub(crate) fn raw(&self, source: NodeId) -> Option<Value> {
        self.graph.nodes.get(source)?.value.clone()
    }

    pub(crate) fn with<T: 'static, R>(&self, source: NodeId, f: impl FnOnce(&T) -> R) -> Option<R> {
        let value = self.graph.nodes.get(source)?.value.as_ref()?;
        value.downcast_ref::<T>().map(f)
    }

    pub(crate) fn get<T: Clone + 'static>(&self, source: NodeId) -> Option<T> {
        self.with(source, T::clone)
    }
}

#[derive(Default)]
struct Pass {
    heap: BinaryHeap<Reverse<(u32, NodeId)>>,
    queued: FxHashSet<NodeId>,
    effects: Vec<Effect>,
    evaluations: usize,
}

#[derive(Default)]
pub(crate) struct Graph {
    pub(crate) nodes: SlotMap<NodeId, Node>,
    clock: u64,
    next_listener: u64,
}

impl Graph {
    pub(crate) fn insert_source(
        &mut self,
        kind: NodeKind,
        value: Option<Value>,
        eq: Option<EqFn>,
    ) -> NodeId {
        let mut node = Node::new(kind, value, eq);
        node.evaluated_at = self.clock;
        self.nodes.insert(node)
    }

    /// Inserts a derived node. When every node in `eager_from` replays, the node is
    /// evaluated right away so that it starts out with a current value.
    pub(crate) fn insert_derived(
        &mut self,
        sources: &[NodeId],
        eager_from: &[NodeId],
        compute: ComputeFn,
        eq: Option<EqFn>,
    ) -> NodeId {
        let rank = sources
            .iter()
            .filter_map(|source| self.nodes.get(*source))
            .map(|source| source.rank + 1)
            .max()
            .unwrap_or(0);
        let replay = !eager_from.is_empty()
            && eager_from
                .iter()
                .all(|source| self.nodes.get(*source).is_some_and(|node| node.replay));

        let mut node = Node::new(NodeKind::Derived, None, eq);
        node.rank = rank;
        node.replay = replay;
        node.sources = sources.iter().copied().collect();
        node.compute = Some(compute.clone());
        node.evaluated_at = self.clock;
        let id = self.nodes.insert(node);

        for source in sources {
            if let Some(source) = self.nodes.get_mut(*source) {
                if !source.dependents.contains(&id) {
                    source.dependents.push(id);
                }
            }
        }

        if replay {
            let outcome = compute(&EvalContext {
                graph: self,
                node: id,
                initial: true,
            });
            if let Outcome::Emit(value) = outcome {
                self.clock += 1;
                let clock = self.clock;
                if let Some(node) = self.nodes.get_mut(id) {
                    node.value = Some(value);
                    node.live = true;
                    node.emitted_at = clock;
                }
            }
        }
        id
    }

    /// Feeds every emission of `source` into the source cell `target`. Returns the value
    /// the target must receive right away when `source` currently holds a replayable one.
    pub(crate) fn link(
        &mut self,
        source: NodeId,
        target: NodeId,
    ) -> Result<Option<Value>, ReactiveError> {
        let target_node = self.nodes.get_mut(target).ok_or(ReactiveError::Removed)?;
        if target_node.kind == NodeKind::Derived {
            return Err(ReactiveError::NotASource {
                label: target_node.label(),
            });
        }
        if !target_node.sources.contains(&source) {
            target_node.sources.push(source);
        }

        let source_node = self.nodes.get_mut(source).ok_or(ReactiveError::Removed)?;
        if !source_node.dependents.contains(&target) {
            source_node.dependents.push(target);
        }
        let min_rank = source_node.rank + 1;
        let replayed = if source_node.replay && source_node.live {
            source_node.value.clone()
        } else {
            None
        };

        self.raise_rank(target, min_rank);
        Ok(replayed)
    }

    /// Lifts the rank of `start` and everything downstream of it. Inside a cycle ranks
    /// would grow forever, so the walk gives up once a rank exceeds the node count.
    fn raise_rank(&mut self, start: NodeId, rank: u32) {
        let limit = u32::try_from(self.nodes.len()).unwrap_or(u32::MAX);
        let mut stack: SmallVec<[(NodeId, u32); 8]> = smallvec![(start, rank)];
        while let Some((id, rank)) = stack.pop() {
            if rank > limit {
                continue;
            }
            let Some(node) = self.nodes.get_mut(id) else {
                continue;
            };
            if node.rank >= rank {
                continue;
            }
            node.rank = rank;
            stack.extend(node.dependents.iter().map(|dependent| (*dependent, rank + 1)));
        }
    }

    pub(crate) fn add_listener(
        &mut self,
        node: NodeId,
        callback: ListenerFn,
        skip: usize,
        once: bool,
    ) -> Result<u64, ReactiveError> {
        self.next_listener += 1;
        let seq = self.next_listener;
        let node = self.nodes.get_mut(node).ok_or(ReactiveError::Removed)?;
        node.listeners.push(Listener {
            seq,
            callback,
            skip,
            once,
        });
        Ok(seq)
    }

    pub(crate) fn remove_listener(&mut self, node: NodeId, seq: u64) -> bool {
        let Some(node) = self.nodes.get_mut(node) else {
            return false;
        };
        let before = node.listeners.len();
        node.listeners.retain(|listener| listener.seq != seq);
        node.listeners.len() != before
    }

    pub(crate) fn label_of(&self, id: NodeId) -> &'static str {
        self.nodes.get(id).map_or(UNNAMED, Node::label)
    }

    /// Applies `writes` and propagates them. Returns the subscriber callbacks to run once
    /// the graph is released.
    pub(crate) fn propagate(&mut self, writes: Vec<(NodeId, Value)>) -> Vec<Effect> {
        let mut pass = Pass::default();
        for (id, value) in writes {
            self.emit(id, value, &mut pass);
        }

        while let Some(Reverse((_, id))) = pass.heap.pop() {
            pass.queued.remove(&id);
            if pass.evaluations == MAX_EVALUATIONS_PER_PASS {
                let error = ReactiveError::PropagationLimit {
                    evaluations: pass.evaluations,
                };
                tracing::error!(%error, node = self.label_of(id), "reactive pass did not settle");
                break;
            }
            pass.evaluations += 1;
            self.evaluate(id, &mut pass);
        }

        tracing::trace!(
            evaluations = pass.evaluations,
            effects = pass.effects.len(),
            "propagation pass finished"
        );
        pass.effects
    }

    fn emit(&mut self, id: NodeId, value: Value, pass: &mut Pass) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        if let (Some(eq), Some(previous)) = (&node.eq, &node.value) {
            if eq(previous, &value) {
                node.live = true;
                return;
            }
        }

        self.clock += 1;
        node.value = Some(value.clone());
        node.live = true;
        node.emitted_at = self.clock;
        node.listeners.retain_mut(|listener| {
            if listener.skip > 0 {
                listener.skip -= 1;
                return true;
            }
            pass.effects.push(Effect {
                callback: listener.callback.clone(),
                value: value.clone(),
            });
            !listener.once
        });

        let dependents = node.dependents.clone();
        for dependent in dependents {
            self.enqueue(dependent, pass);
        }
    }

    fn enqueue(&self, id: NodeId, pass: &mut Pass) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        if pass.queued.insert(id) {
            pass.heap.push(Reverse((node.rank, id)));
        }
    }

    fn evaluate(&mut self, id: NodeId, pass: &mut Pass) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let outcome = match node.compute.clone() {
            Some(compute) => compute(&EvalContext {
                graph: self,
                node: id,
                initial: false,
            }),
            None => self.forwarded(id).into(),
        };

        let clock = self.clock;
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        node.evaluated_at = clock;
        match outcome {
            Outcome::Emit(value) => self.emit(id, value, pass),
            Outcome::Reject => node.live = false,
            Outcome::Hold => {}
        }
    }

    /// Value a connected source cell receives: the most recent emission among its
    /// upstream links.
    fn forwarded(&self, id: NodeId) -> Option<Value> {
        let node = self.nodes.get(id)?;
        node.sources
            .iter()
            .filter_map(|source| self.nodes.get(*source))
            .filter(|source| source.emitted_at > node.evaluated_at)
            .max_by_key(|source| source.emitted_at)
            .and_then(|source| source.value.clone())
    }
}
