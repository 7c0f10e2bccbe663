//! Virtualization state for large scrollable grids of uniformly sized items.
//!
//! The engine never touches a renderer. A host reports measurements (viewport size, the
//! size of one item, scroll position) and renders whatever [`GridState`] describes: the
//! items in the visible window plus the blank space above and below them. Everything in
//! between is a graph of cells built on [`vgrid_reactive`].
//!
//! # Usage
//!
//! ```
//! use vgrid::{Dimensions, GridProps, GridSystem, ListRange, Realm, ScrollContainerState};
//!
//! let realm = Realm::new();
//! let grid = GridSystem::<()>::new(&realm);
//! GridProps::default().total_count(100).apply(&grid).unwrap();
//!
//! // The host measured its viewport and the first rendered item.
//! realm.batch(|batch| {
//!     batch.publish(grid.viewport_dimensions, Dimensions::new(400.0, 300.0));
//!     batch.publish(grid.item_dimensions, Dimensions::new(100.0, 50.0));
//! });
//! assert_eq!(grid.state().range(), Some(ListRange { start_index: 0, end_index: 3 }));
//!
//! // Four items per row, rows 50px high: scrolling 500px down shows rows 10 to 15.
//! realm.publish(
//!     grid.dom_io.scroll_container_state,
//!     ScrollContainerState {
//!         scroll_top: 500.0,
//!         scroll_height: realm.value(grid.total_list_height),
//!         viewport_height: 300.0,
//!     },
//! );
//! assert_eq!(grid.state().range(), Some(ListRange { start_index: 40, end_index: 63 }));
//! ```
//!
//! # Subsystems
//!
//! [`GridSystem`] owns one instance of each:
//!
//! - [`DomIo`]: raw scroll and size inputs from the host, scroll commands back to it.
//! - [`SizeRange`]: the pixel range that must be rendered.
//! - [`StateFlags`]: scrolling, at-top and at-bottom flags, direction and velocity.
//! - [`ScrollSeek`]: placeholder mode while scrolling fast.
//! - [`PropsReady`]: the mount gate.
//! - [`WindowScroller`]: coordinate translation when the window scrolls.
#![deny(missing_docs, clippy::unwrap_used)]

mod config;
mod dom_io;
mod error;
mod geometry;
mod grid;
mod props_ready;
mod scroll_seek;
mod size_range;
mod state_flags;
mod types;
mod window_scroller;

pub use config::GridProps;
pub use dom_io::DomIo;
pub use error::GridError;
pub use geometry::{
    Dimensions, Gap, GridLayout, grid_layout, item_top, items_per_row, row_count, total_height,
};
pub use grid::{GridInputs, GridSystem, compute_grid_state, scroll_target};
pub use props_ready::PropsReady;
pub use scroll_seek::{ScrollSeek, ScrollSeekConfiguration, SeekCallback, SeekPredicate};
pub use size_range::{Overscan, RangeInputs, SizeRange, ViewportIncrease, compute_visible_range};
pub use state_flags::{AtBottomReason, AtBottomState, StateFlags};
pub use types::{
    Align, GridData, GridItem, GridSnapshot, GridState, IndexLocation, InitialScrollPhase,
    ListRange, ScrollBehavior, ScrollContainerState, ScrollDirection, ScrollParent,
    ScrollToOptions, TargetIndex, WindowViewportInfo,
};
pub use vgrid_reactive::Realm;

#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;

    #[test]
    fn test_snapshot_survives_json() {
        let snapshot = GridSnapshot {
            viewport: Dimensions::new(400.0, 300.0),
            item: Dimensions::new(100.0, 50.0),
            gap: Gap::new(8.0, 4.0),
            scroll_top: 1234.0,
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"scroll_top\":1234.0"));
        let restored: GridSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, snapshot);
    }
}
