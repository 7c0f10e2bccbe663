//! Typed handles to graph nodes.

use std::{fmt, marker::PhantomData};

use crate::NodeId;

/// A typed handle to a node of a [`Realm`](crate::Realm).
///
/// Handles are plain `Copy` ids. They stay valid for the lifetime of the realm that
/// created them and carry no reference to it.
pub trait Cell: Copy + Send + Sync + 'static {
    /// The type of the values the cell carries.
    type Value: Clone + Send + Sync + 'static;

    /// Returns the node this handle points to.
    fn node(&self) -> NodeId;
}

/// A stateful cell. It always holds a value, and new subscribers receive that value
/// immediately.
pub struct Signal<T> {
    node: NodeId,
    _marker: PhantomData<fn() -> T>,
}

/// An event channel. Subscribers only observe occurrences published after they
/// subscribed.
pub struct Stream<T> {
    node: NodeId,
    _marker: PhantomData<fn() -> T>,
}

macro_rules! impl_handle {
    ($handle:ident, $name:literal) => {
        impl<T> $handle<T> {
            pub(crate) fn from_node(node: NodeId) -> Self {
                Self {
                    node,
                    _marker: PhantomData,
                }
            }
        }

        impl<T> Copy for $handle<T> {}

        impl<T> Clone for $handle<T> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<T> PartialEq for $handle<T> {
            fn eq(&self, other: &Self) -> bool {
                self.node == other.node
            }
        }

        impl<T> Eq for $handle<T> {}

        impl<T> fmt::Debug for $handle<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($name, "({:?})"), self.node)
            }
        }

        impl<T> Cell for $handle<T>
        where
            T: Clone + Send + Sync + 'static,
        {
            type Value = T;

            fn node(&self) -> NodeId {
                self.node
            }
        }
    };
}

impl_handle!(Signal, "Signal");
impl_handle!(Stream, "Stream");
