//! Pipeline operators.
//!
//! A [`Pipe`] is a builder positioned on one node. Every operator inserts a new derived
//! node and moves the builder onto it. A pipeline ends in one of the terminals:
//! [`Pipe::stream`], [`Pipe::signal`], [`Pipe::connect`] or [`Pipe::subscribe`].

use std::{
    any::Any,
    marker::PhantomData,
    sync::{
        Arc,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
    time::Duration,
};

use parking_lot::Mutex;
use smallvec::{SmallVec, smallvec};

use crate::{
    Cell, EvalContext, NodeId, Realm, Signal, Stream, Subscription,
    graph::{ComputeFn, EqFn, NodeKind, Outcome, Value, boxed, compute},
    realm::value_eq,
};

/// A tuple of cells that can be read together, used by [`Realm::combine`] and
/// [`Pipe::with_latest_all`].
pub trait CellTuple {
    /// Tuple of the cells' value types.
    type Values: Clone + Send + Sync + 'static;

    /// Nodes of the cells, in tuple order.
    fn nodes(&self) -> SmallVec<[NodeId; 8]>;

    /// Reads every cell. Returns `None` until all of them carried a value.
    fn read(ctx: &EvalContext<'_>, nodes: &[NodeId]) -> Option<Self::Values>;
}

macro_rules! impl_cell_tuple {
    ($($cell:ident : $index:tt),+) => {
        impl<$($cell: Cell),+> CellTuple for ($($cell,)+) {
            type Values = ($($cell::Value,)+);

            fn nodes(&self) -> SmallVec<[NodeId; 8]> {
                smallvec![$(self.$index.node()),+]
            }

            fn read(ctx: &EvalContext<'_>, nodes: &[NodeId]) -> Option<Self::Values> {
                Some(($(ctx.get::<$cell::Value>(*nodes.get($index)?)?,)+))
            }
        }
    };
}

impl_cell_tuple!(A: 0, B: 1);
impl_cell_tuple!(A: 0, B: 1, C: 2);
impl_cell_tuple!(A: 0, B: 1, C: 2, D: 3);
impl_cell_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_cell_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_cell_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_cell_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);
impl_cell_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8);
impl_cell_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9);

/// Builder for a chain of derived nodes. See the [module documentation](self).
#[must_use = "a pipe does nothing until it ends in stream, signal, connect or subscribe"]
pub struct Pipe<'r, T> {
    realm: &'r Realm,
    node: NodeId,
    _marker: PhantomData<fn() -> T>,
}

impl Realm {
    /// Starts a pipeline reading from `cell`.
    pub fn pipe<C: Cell>(&self, cell: C) -> Pipe<'_, C::Value> {
        Pipe::new(self, cell.node())
    }

    /// Combine-latest: emits a tuple of the latest values of `cells` whenever any of
    /// them emits, once all of them carried a value.
    pub fn combine<S: CellTuple + 'static>(&self, cells: S) -> Pipe<'_, S::Values> {
        let nodes = cells.nodes();
        let inputs = nodes.clone();
        let node = self.with_graph(|graph| {
            graph.insert_derived(
                &nodes,
                &nodes,
                compute(move |ctx| {
                    if !inputs.iter().any(|input| ctx.fired(*input)) {
                        return Outcome::Hold;
                    }
                    S::read(ctx, &inputs).map(boxed).into()
                }),
                None,
            )
        });
        Pipe::new(self, node)
    }
}

impl<'r, T> Pipe<'r, T>
where
    T: Clone + Send + Sync + 'static,
{
    fn new(realm: &'r Realm, node: NodeId) -> Self {
        Self {
            realm,
            node,
            _marker: PhantomData,
        }
    }

    pub(crate) fn node(&self) -> NodeId {
        self.node
    }

    fn derive<U>(
        &self,
        sources: &[NodeId],
        eager_from: &[NodeId],
        compute: ComputeFn,
        eq: Option<EqFn>,
    ) -> Pipe<'r, U>
    where
        U: Clone + Send + Sync + 'static,
    {
        let node = self
            .realm
            .with_graph(|graph| graph.insert_derived(sources, eager_from, compute, eq));
        Pipe::new(self.realm, node)
    }

    /// Single-source node that passes the incoming value through when `keep` accepts it.
    fn gate<K>(self, keep: K, eq: Option<EqFn>) -> Pipe<'r, T>
    where
        K: Fn(&EvalContext<'_>, NodeId) -> bool + Send + Sync + 'static,
    {
        let source = self.node;
        self.derive(
            &[source],
            &[source],
            compute(move |ctx| {
                if !ctx.fired(source) {
                    return Outcome::Hold;
                }
                if !keep(ctx, source) {
                    return Outcome::Reject;
                }
                ctx.raw(source).into()
            }),
            eq,
        )
    }

    /// Transforms every value.
    pub fn map<U, F>(self, f: F) -> Pipe<'r, U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        let source = self.node;
        self.derive(
            &[source],
            &[source],
            compute(move |ctx| {
                if !ctx.fired(source) {
                    return Outcome::Hold;
                }
                ctx.with(source, |value: &T| boxed(f(value))).into()
            }),
            None,
        )
    }

    /// Replaces every value with a clone of `value`.
    pub fn map_to<U>(self, value: U) -> Pipe<'r, U>
    where
        U: Clone + Send + Sync + 'static,
    {
        self.map(move |_| value.clone())
    }

    /// Lets through the values `predicate` accepts.
    pub fn filter<F>(self, predicate: F) -> Pipe<'r, T>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.gate(
            move |ctx, source| ctx.with(source, |value: &T| predicate(value)).unwrap_or(false),
            None,
        )
    }

    /// Maps and filters in one step.
    pub fn filter_map<U, F>(self, f: F) -> Pipe<'r, U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(&T) -> Option<U> + Send + Sync + 'static,
    {
        let source = self.node;
        self.derive(
            &[source],
            &[source],
            compute(move |ctx| {
                if !ctx.fired(source) {
                    return Outcome::Hold;
                }
                match ctx.with(source, |value: &T| f(value)).flatten() {
                    Some(mapped) => Outcome::Emit(boxed(mapped)),
                    None => Outcome::Reject,
                }
            }),
            None,
        )
    }

    /// Drops values equal to the previous one.
    pub fn distinct(self) -> Pipe<'r, T>
    where
        T: PartialEq,
    {
        self.gate(|_, _| true, Some(value_eq::<T>()))
    }

    /// Drops values `same` considers equal to the previous one.
    pub fn distinct_by<F>(self, same: F) -> Pipe<'r, T>
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        let eq: EqFn = Arc::new(move |previous: &Value, next: &Value| {
            match (previous.downcast_ref::<T>(), next.downcast_ref::<T>()) {
                (Some(previous), Some(next)) => same(previous, next),
                _ => false,
            }
        });
        self.gate(|_, _| true, Some(eq))
    }

    /// Pairs every value with the latest value of `other`. Emissions of `other` alone
    /// do not trigger anything.
    pub fn with_latest<C: Cell>(self, other: C) -> Pipe<'r, (T, C::Value)> {
        let source = self.node;
        let latest = other.node();
        self.derive(
            &[source, latest],
            &[source],
            compute(move |ctx| {
                if !ctx.fired(source) {
                    return Outcome::Hold;
                }
                match (ctx.get::<T>(source), ctx.get::<C::Value>(latest)) {
                    (Some(value), Some(latest)) => Outcome::Emit(boxed((value, latest))),
                    _ => Outcome::Reject,
                }
            }),
            None,
        )
    }

    /// Like [`with_latest`](Self::with_latest) for several cells at once.
    pub fn with_latest_all<S: CellTuple + 'static>(self, others: S) -> Pipe<'r, (T, S::Values)> {
        let source = self.node;
        let latest = others.nodes();
        let mut sources: SmallVec<[NodeId; 8]> = smallvec![source];
        sources.extend(latest.iter().copied());
        self.derive(
            &sources,
            &[source],
            compute(move |ctx| {
                if !ctx.fired(source) {
                    return Outcome::Hold;
                }
                match (ctx.get::<T>(source), S::read(ctx, &latest)) {
                    (Some(value), Some(latest)) => Outcome::Emit(boxed((value, latest))),
                    _ => Outcome::Reject,
                }
            }),
            None,
        )
    }

    /// Drops the first `count` values.
    pub fn skip(self, count: usize) -> Pipe<'r, T> {
        let remaining = AtomicUsize::new(count);
        self.gate(
            move |_, _| {
                remaining
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                    .is_err()
            },
            None,
        )
    }

    /// Folds every value into an accumulator and emits the accumulator.
    pub fn scan<A, F>(self, initial: A, f: F) -> Pipe<'r, A>
    where
        A: Clone + Send + Sync + 'static,
        F: Fn(&A, &T) -> A + Send + Sync + 'static,
    {
        let source = self.node;
        let accumulator = Mutex::new(initial);
        self.derive(
            &[source],
            &[source],
            compute(move |ctx| {
                if !ctx.fired(source) {
                    return Outcome::Hold;
                }
                ctx.with(source, |value: &T| {
                    let mut accumulator = accumulator.lock();
                    let next = f(&accumulator, value);
                    *accumulator = next.clone();
                    boxed(next)
                })
                .into()
            }),
            None,
        )
    }

    /// Emits the values of both this pipe and `other`.
    pub fn merge<C>(self, other: C) -> Pipe<'r, T>
    where
        C: Cell<Value = T>,
    {
        let sources = [self.node, other.node()];
        self.derive(
            &sources,
            &[],
            compute(move |ctx| {
                sources
                    .iter()
                    .filter(|source| ctx.fired(**source))
                    .max_by_key(|source| ctx.emitted_at(**source))
                    .and_then(|source| ctx.raw(*source))
                    .into()
            }),
            None,
        )
    }

    /// Emits a value once `delay` passed without a newer one.
    pub fn debounce(self, delay: Duration) -> Pipe<'r, T> {
        let realm = self.realm;
        let output = realm.stream::<T>();
        let generation = Arc::new(AtomicU64::new(0));
        self.subscribe(move |realm, value| {
            let current = generation.fetch_add(1, Ordering::SeqCst) + 1;
            let generation = Arc::clone(&generation);
            let value = value.clone();
            realm.schedule_after(delay, move |realm| {
                if generation.load(Ordering::SeqCst) == current {
                    realm.publish(output, value);
                }
            });
        });
        Pipe::new(realm, output.node())
    }

    /// Emits at most once per `interval`: the latest value seen when the interval ends.
    pub fn throttle(self, interval: Duration) -> Pipe<'r, T> {
        self.trailing(move |realm, task| realm.schedule_after(interval, task))
    }

    /// Collapses a burst of values into the last one, emitted at the end of the current
    /// scheduling tick.
    pub fn debounce_tick(self) -> Pipe<'r, T> {
        self.trailing(|realm, task| realm.schedule_tick(task))
    }

    fn trailing<S>(self, schedule: S) -> Pipe<'r, T>
    where
        S: Fn(&Realm, Box<dyn FnOnce(&Realm) + Send>) + Send + Sync + 'static,
    {
        let realm = self.realm;
        let output = realm.stream::<T>();
        let pending: Arc<Mutex<Option<T>>> = Arc::new(Mutex::new(None));
        self.subscribe(move |realm, value| {
            let idle = pending.lock().replace(value.clone()).is_none();
            if idle {
                let pending = Arc::clone(&pending);
                schedule(
                    realm,
                    Box::new(move |realm| {
                        let value = pending.lock().take();
                        if let Some(value) = value {
                            realm.publish(output, value);
                        }
                    }),
                );
            }
        });
        Pipe::new(realm, output.node())
    }

    /// Ends the pipeline as an event channel.
    pub fn stream(self) -> Stream<T> {
        let is_stream = self.realm.with_graph(|graph| {
            graph
                .nodes
                .get(self.node)
                .is_some_and(|node| node.kind == NodeKind::Stream)
        });
        if is_stream {
            return Stream::from_node(self.node);
        }
        let output = self.realm.stream::<T>();
        self.realm.connect_nodes(self.node, output.node(), false);
        output
    }

    /// Ends the pipeline as a signal starting at `initial`, or at the pipeline's
    /// current value if it has one.
    pub fn signal(self, initial: T) -> Signal<T> {
        let output = self.realm.signal(initial);
        self.realm.connect_nodes(self.node, output.node(), true);
        output
    }

    /// Feeds the pipeline into `target`.
    pub fn connect<C>(self, target: C)
    where
        C: Cell<Value = T>,
    {
        self.realm.connect_nodes(self.node, target.node(), true);
    }

    /// Ends the pipeline in a subscriber.
    pub fn subscribe<F>(self, f: F) -> Subscription
    where
        F: Fn(&Realm, &T) + Send + Sync + 'static,
    {
        let callback = Arc::new(move |realm: &Realm, value: &(dyn Any + Send + Sync)| {
            if let Some(value) = value.downcast_ref::<T>() {
                f(realm, value);
            }
        });
        self.realm.subscribe_node(self.node, 0, false, true, callback)
    }
}
