//! The [`Realm`]: owner of a reactive graph.

use std::{
    any::{Any, type_name},
    collections::VecDeque,
    sync::Arc,
};

use parking_lot::Mutex;

use crate::{
    Cell, NodeId, ReactiveError, Signal, Stream,
    graph::{EqFn, Graph, ListenerFn, NodeKind, Value, boxed},
    scheduler::Scheduler,
};

/// Identifies a subscriber so it can be detached with [`Realm::unsubscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Subscription {
    node: NodeId,
    seq: u64,
}

#[derive(Default)]
struct CommitQueue {
    pending: VecDeque<Vec<(NodeId, Value)>>,
    draining: bool,
}

#[derive(Default)]
struct RealmInner {
    graph: Mutex<Graph>,
    commits: Mutex<CommitQueue>,
    scheduler: Mutex<Scheduler>,
}

/// A reactive graph together with its commit queue and scheduler.
///
/// `Realm` is a cheap, clonable handle. Cells are created through it, values are
/// published into it, and subscribers receive `&Realm` so that they can react with
/// further publishes.
///
/// Publishing is run-to-completion: a publish made while another one is propagating (for
/// example from inside a subscriber) is queued and handled after the current pass, in
/// FIFO order.
#[derive(Clone, Default)]
pub struct Realm {
    inner: Arc<RealmInner>,
}

/// Collects several writes so they propagate as a single pass.
pub struct Batch {
    writes: Vec<(NodeId, Value)>,
}

impl Batch {
    /// Queues `value` for `cell`.
    pub fn publish<C: Cell>(&mut self, cell: C, value: C::Value) {
        self.writes.push((cell.node(), boxed(value)));
    }
}

struct DrainGuard<'a> {
    realm: &'a Realm,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let mut commits = self.realm.inner.commits.lock();
            commits.pending.clear();
            commits.draining = false;
        }
    }
}

fn listener<T: 'static>(f: impl Fn(&Realm, &T) + Send + Sync + 'static) -> ListenerFn {
    Arc::new(move |realm: &Realm, value: &(dyn Any + Send + Sync)| {
        if let Some(value) = value.downcast_ref::<T>() {
            f(realm, value);
        }
    })
}

pub(crate) fn value_eq<T: PartialEq + 'static>() -> EqFn {
    Arc::new(|previous: &Value, next: &Value| {
        match (previous.downcast_ref::<T>(), next.downcast_ref::<T>()) {
            (Some(previous), Some(next)) => previous == next,
            _ => false,
        }
    })
}

impl Realm {
    /// Creates an empty realm.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_graph<R>(&self, f: impl FnOnce(&mut Graph) -> R) -> R {
        f(&mut self.inner.graph.lock())
    }

    pub(crate) fn scheduler(&self) -> &Mutex<Scheduler> {
        &self.inner.scheduler
    }

    /// Creates a signal holding `initial`. Every publish propagates, even when the value
    /// did not change.
    pub fn signal<T: Clone + Send + Sync + 'static>(&self, initial: T) -> Signal<T> {
        let node = self.with_graph(|graph| {
            graph.insert_source(NodeKind::Signal, Some(boxed(initial)), None)
        });
        Signal::from_node(node)
    }

    /// Creates a signal that ignores publishes equal to its current value.
    pub fn distinct_signal<T>(&self, initial: T) -> Signal<T>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        let node = self.with_graph(|graph| {
            graph.insert_source(NodeKind::Signal, Some(boxed(initial)), Some(value_eq::<T>()))
        });
        Signal::from_node(node)
    }

    /// Creates an event channel.
    pub fn stream<T: Clone + Send + Sync + 'static>(&self) -> Stream<T> {
        let node = self.with_graph(|graph| graph.insert_source(NodeKind::Stream, None, None));
        Stream::from_node(node)
    }

    /// Attaches a name to `cell`, used in diagnostics.
    pub fn set_label<C: Cell>(&self, cell: C, label: &'static str) {
        self.with_graph(|graph| {
            if let Some(node) = graph.nodes.get_mut(cell.node()) {
                node.label = Some(label);
            }
        });
    }

    /// Publishes `value` into `cell` and propagates it.
    ///
    /// # Errors
    ///
    /// Returns [`ReactiveError::NotASource`] when `cell` is computed by the graph.
    pub fn try_publish<C: Cell>(&self, cell: C, value: C::Value) -> Result<(), ReactiveError> {
        self.check_source(cell.node())?;
        self.commit(vec![(cell.node(), boxed(value))]);
        Ok(())
    }

    /// Publishes `value` into `cell` and propagates it. Writes into derived cells are
    /// dropped and logged.
    pub fn publish<C: Cell>(&self, cell: C, value: C::Value) {
        if let Err(error) = self.try_publish(cell, value) {
            tracing::error!(%error, "dropped publish");
        }
    }

    /// Applies every write made through the [`Batch`] in a single propagation pass.
    pub fn batch(&self, f: impl FnOnce(&mut Batch)) {
        let mut batch = Batch { writes: Vec::new() };
        f(&mut batch);
        let writes = batch
            .writes
            .into_iter()
            .filter(|(node, _)| match self.check_source(*node) {
                Ok(()) => true,
                Err(error) => {
                    tracing::error!(%error, "dropped batched publish");
                    false
                }
            })
            .collect();
        self.commit(writes);
    }

    fn check_source(&self, node: NodeId) -> Result<(), ReactiveError> {
        self.with_graph(|graph| match graph.nodes.get(node) {
            None => Err(ReactiveError::Removed),
            Some(node) if node.kind == NodeKind::Derived => Err(ReactiveError::NotASource {
                label: node.label(),
            }),
            Some(_) => Ok(()),
        })
    }

    /// Feeds every value of `source` into `target`. If `source` currently holds a
    /// stateful value, `target` receives it right away.
    pub fn connect<S, T>(&self, source: S, target: T)
    where
        S: Cell,
        T: Cell<Value = S::Value>,
    {
        self.connect_nodes(source.node(), target.node(), true);
    }

    pub(crate) fn connect_nodes(&self, source: NodeId, target: NodeId, replay: bool) {
        match self.with_graph(|graph| graph.link(source, target)) {
            Ok(Some(value)) if replay => self.commit(vec![(target, value)]),
            Ok(_) => {}
            Err(error) => tracing::error!(%error, "failed to connect cells"),
        }
    }

    /// Reads the current value of `signal`.
    ///
    /// # Errors
    ///
    /// Fails when the handle was created by another realm.
    pub fn try_value<T: Clone + Send + Sync + 'static>(
        &self,
        signal: Signal<T>,
    ) -> Result<T, ReactiveError> {
        self.with_graph(|graph| {
            let node = graph.nodes.get(signal.node()).ok_or(ReactiveError::Removed)?;
            node.value
                .as_ref()
                .and_then(|value| value.downcast_ref::<T>())
                .cloned()
                .ok_or(ReactiveError::TypeMismatch {
                    label: node.label(),
                    expected: type_name::<T>(),
                })
        })
    }

    /// Reads the current value of `signal`.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not belong to this realm.
    pub fn value<T: Clone + Send + Sync + 'static>(&self, signal: Signal<T>) -> T {
        match self.try_value(signal) {
            Ok(value) => value,
            Err(error) => panic!("failed to read {signal:?}: {error}"),
        }
    }

    /// The last value `cell` carried, if it ever carried one.
    pub fn last<C: Cell>(&self, cell: C) -> Option<C::Value> {
        self.with_graph(|graph| {
            graph
                .nodes
                .get(cell.node())?
                .value
                .as_ref()?
                .downcast_ref::<C::Value>()
                .cloned()
        })
    }

    /// Calls `f` on every value of `cell`. Stateful cells deliver their current value
    /// immediately.
    pub fn subscribe<C: Cell>(
        &self,
        cell: C,
        f: impl Fn(&Realm, &C::Value) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe_node(cell.node(), 0, false, true, listener(f))
    }

    /// Calls `f` once, on the next value `cell` carries. The current value is not
    /// replayed.
    pub fn handle_next<C: Cell>(
        &self,
        cell: C,
        f: impl Fn(&Realm, &C::Value) + Send + Sync + 'static,
    ) -> Subscription {
        self.handle_after(cell, 0, f)
    }

    /// Ignores the next `skip` values of `cell`, then calls `f` once.
    pub fn handle_after<C: Cell>(
        &self,
        cell: C,
        skip: usize,
        f: impl Fn(&Realm, &C::Value) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe_node(cell.node(), skip, true, false, listener(f))
    }

    pub(crate) fn subscribe_node(
        &self,
        node: NodeId,
        skip: usize,
        once: bool,
        replay: bool,
        callback: ListenerFn,
    ) -> Subscription {
        let (seq, current) = self.with_graph(|graph| {
            let seq = match graph.add_listener(node, callback.clone(), skip, once) {
                Ok(seq) => seq,
                Err(error) => {
                    tracing::error!(%error, "failed to subscribe");
                    0
                }
            };
            let current = graph
                .nodes
                .get(node)
                .filter(|node| replay && node.replay && node.live)
                .and_then(|node| node.value.clone());
            (seq, current)
        });
        if let Some(value) = current {
            callback(self, value.as_ref());
        }
        Subscription { node, seq }
    }

    /// Detaches a subscriber. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        self.with_graph(|graph| graph.remove_listener(subscription.node, subscription.seq))
    }

    /// Number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.with_graph(|graph| graph.nodes.len())
    }

    pub(crate) fn commit(&self, writes: Vec<(NodeId, Value)>) {
        if writes.is_empty() {
            return;
        }
        {
            let mut commits = self.inner.commits.lock();
            commits.pending.push_back(writes);
            if commits.draining {
                return;
            }
            commits.draining = true;
        }

        let _guard = DrainGuard { realm: self };
        loop {
            let next = {
                let mut commits = self.inner.commits.lock();
                let next = commits.pending.pop_front();
                if next.is_none() {
                    commits.draining = false;
                }
                next
            };
            let Some(writes) = next else {
                break;
            };
            let effects = self.inner.graph.lock().propagate(writes);
            for effect in effects {
                (effect.callback)(self, effect.value.as_ref());
            }
        }
    }
}
