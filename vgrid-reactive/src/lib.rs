//! A push-based reactive graph for UI state machines.
//!
//! A [`Realm`] owns a graph of cells. Source cells ([`Signal`] and [`Stream`]) receive
//! values from the host; derived cells are built with [`Pipe`] operators and
//! [`Realm::combine`]. Publishing a value runs a propagation pass that evaluates the
//! affected cells in rank order, so every derived cell reflects all the inputs of the
//! pass before any subscriber runs.
//!
//! # Signals and streams
//!
//! A signal always holds a value and hands it to new subscribers; a stream only
//! delivers occurrences published after subscribing.
//!
//! ```
//! use std::sync::{Arc, atomic::{AtomicU32, Ordering}};
//! use vgrid_reactive::Realm;
//!
//! let realm = Realm::new();
//! let width = realm.signal(320_u32);
//! let columns = realm.pipe(width).map(|width| (width / 100).max(1)).signal(1);
//!
//! let last = Arc::new(AtomicU32::new(0));
//! let sink = last.clone();
//! realm.subscribe(columns, move |_, columns| sink.store(*columns, Ordering::SeqCst));
//! assert_eq!(last.load(Ordering::SeqCst), 3);
//!
//! realm.publish(width, 640);
//! assert_eq!(realm.value(columns), 6);
//! ```
//!
//! # Time
//!
//! Nothing in the graph blocks or spawns. Operators that need time (`debounce`,
//! `throttle`, `debounce_tick`) queue work on the realm's scheduler, which the host
//! drives with [`Realm::flush_ticks`], [`Realm::advance_frame`] and
//! [`Realm::advance_time`].
#![deny(missing_docs, clippy::unwrap_used)]

mod cell;
mod error;
mod graph;
mod pipe;
mod realm;
mod scheduler;

pub use cell::{Cell, Signal, Stream};
pub use error::ReactiveError;
pub use graph::{EvalContext, NodeId};
pub use pipe::{CellTuple, Pipe};
pub use realm::{Batch, Realm, Subscription};
