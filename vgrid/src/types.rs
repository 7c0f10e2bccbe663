//! Values flowing through the grid systems.

use std::sync::Arc;

use derive_setters::Setters;

use crate::geometry::{Dimensions, Gap, GridLayout};

/// One rendered cell. The index is the identity; the payload is absent for probes and
/// when no data collection was supplied.
#[derive(Clone, Debug, PartialEq)]
pub struct GridItem<D> {
    /// Position of the item in the collection.
    pub index: usize,
    /// Payload taken from the data collection at `index`.
    pub data: Option<D>,
}

/// The rendered window together with the offsets of everything around it.
#[derive(Clone, Debug, PartialEq)]
pub struct GridState<D> {
    /// Items to render, in index order.
    pub items: Vec<GridItem<D>>,
    /// Top edge of the first rendered row.
    pub top: f64,
    /// Bottom edge of the last rendered row.
    pub bottom: f64,
    /// Extent of the unrendered content above the window.
    pub offset_top: f64,
    /// Extent of the unrendered content below the window.
    pub offset_bottom: f64,
    /// Measured item height, zero while unknown.
    pub item_height: f64,
    /// Measured item width, zero while unknown.
    pub item_width: f64,
}

impl<D> GridState<D> {
    /// Nothing rendered and every offset zero.
    pub fn initial() -> Self {
        Self::probe(Vec::new())
    }

    /// Placeholder items with no layout, rendered so the host can measure one of them.
    pub fn probe(items: Vec<GridItem<D>>) -> Self {
        Self {
            items,
            top: 0.0,
            bottom: 0.0,
            offset_top: 0.0,
            offset_bottom: 0.0,
            item_height: 0.0,
            item_width: 0.0,
        }
    }

    /// Offsets of the rendered rows.
    pub fn layout(&self) -> GridLayout {
        GridLayout {
            top: self.top,
            bottom: self.bottom,
        }
    }

    /// Indices of the first and last rendered item.
    pub fn range(&self) -> Option<ListRange> {
        Some(ListRange {
            start_index: self.items.first()?.index,
            end_index: self.items.last()?.index,
        })
    }

    /// Height of the scrollable content.
    pub fn total_height(&self) -> f64 {
        self.offset_bottom + self.bottom
    }
}

impl<D> Default for GridState<D> {
    fn default() -> Self {
        Self::initial()
    }
}

/// Shared, immutable item payloads.
///
/// Two `GridData` compare equal only when they share the same allocation, so publishing a
/// clone of the current collection counts as no change while publishing a new vector
/// always does.
#[derive(Debug)]
pub struct GridData<D>(Arc<[D]>);

impl<D> GridData<D> {
    /// Payload at `index`.
    pub fn get(&self, index: usize) -> Option<&D> {
        self.0.get(index)
    }

    /// Number of payloads.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<D> Clone for GridData<D> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<D> PartialEq for GridData<D> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<D> From<Vec<D>> for GridData<D> {
    fn from(items: Vec<D>) -> Self {
        Self(items.into())
    }
}

/// Everything needed to bring a grid back to the same scroll position.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridSnapshot {
    /// Viewport size at capture time.
    pub viewport: Dimensions,
    /// Item size at capture time.
    pub item: Dimensions,
    /// Gap at capture time.
    pub gap: Gap,
    /// Scroll offset at capture time.
    pub scroll_top: f64,
}

/// Where the target item ends up inside the viewport.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Align {
    /// Target row at the top edge.
    #[default]
    Start,
    /// Target row centered.
    Center,
    /// Target row at the bottom edge.
    End,
}

/// Animation mode of a scroll command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScrollBehavior {
    /// Whatever the platform does by default.
    #[default]
    Auto,
    /// Animated.
    Smooth,
    /// Jump.
    Instant,
}

/// Index part of an [`IndexLocation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TargetIndex {
    /// A position in the collection. Out-of-range values are clamped.
    Index(i64),
    /// The last item, whatever the count is when the location gets resolved.
    Last,
}

impl Default for TargetIndex {
    fn default() -> Self {
        Self::Index(0)
    }
}

/// Scroll target: an item, how to align it, and how to get there.
///
/// ```
/// use vgrid::{Align, IndexLocation};
///
/// let location = IndexLocation::new(50).align(Align::End).offset(8.0);
/// assert_eq!(location.resolve(20), 19);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Setters)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IndexLocation {
    /// Item to scroll to.
    pub index: TargetIndex,
    /// Alignment inside the viewport.
    pub align: Align,
    /// Animation mode.
    pub behavior: ScrollBehavior,
    /// Extra pixels added to the computed offset.
    pub offset: f64,
}

impl IndexLocation {
    /// Location of the item at `index`, start aligned.
    pub fn new(index: i64) -> Self {
        TargetIndex::Index(index).into()
    }

    /// Location of the last item, start aligned.
    pub fn last() -> Self {
        TargetIndex::Last.into()
    }

    /// Resolves the index against `total_count`, clamped into `[0, total_count - 1]`.
    pub fn resolve(&self, total_count: usize) -> usize {
        let last = total_count.saturating_sub(1);
        match self.index {
            TargetIndex::Last => last,
            TargetIndex::Index(index) => usize::try_from(index).unwrap_or(0).min(last),
        }
    }

    /// A plain request for item zero, which needs no initial scroll.
    pub fn is_origin(&self) -> bool {
        *self == Self::default()
    }
}

impl From<TargetIndex> for IndexLocation {
    fn from(index: TargetIndex) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }
}

impl From<usize> for IndexLocation {
    fn from(index: usize) -> Self {
        Self::new(i64::try_from(index).unwrap_or(i64::MAX))
    }
}

/// First and last rendered index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ListRange {
    /// First rendered index.
    pub start_index: usize,
    /// Last rendered index.
    pub end_index: usize,
}

/// Scroll command for the host. For `scroll_by`, `top` is a delta.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScrollToOptions {
    /// Target offset, or delta.
    pub top: f64,
    /// Animation mode.
    pub behavior: ScrollBehavior,
}

impl ScrollToOptions {
    /// A non-animated command.
    pub fn to(top: f64) -> Self {
        Self {
            top,
            behavior: ScrollBehavior::Auto,
        }
    }
}

/// What the scrollable element reports on scroll and resize.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollContainerState {
    /// Current scroll offset.
    pub scroll_top: f64,
    /// Height of the scrollable content.
    pub scroll_height: f64,
    /// Visible height.
    pub viewport_height: f64,
}

/// Position and visible size of the grid element when the window scrolls.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WindowViewportInfo {
    /// Offset of the element from the top of the document.
    pub offset_top: f64,
    /// Visible width.
    pub visible_width: f64,
    /// Visible height.
    pub visible_height: f64,
}

/// Direction of the latest scroll movement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScrollDirection {
    /// Towards the start.
    Up,
    /// Towards the end.
    #[default]
    Down,
    /// Scrolling stopped.
    None,
}

/// Progress of the scroll to the initial top-most item.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InitialScrollPhase {
    /// Nothing to do, or not mounted.
    #[default]
    NotStarted,
    /// Waiting for item and viewport heights.
    AwaitingDimensions,
    /// Command queued for the next frame.
    Scrolling,
    /// The scroll position caught up.
    Settled,
}

impl InitialScrollPhase {
    /// Phase for the `(scrolled_to_initial_item, scroll_scheduled)` flags.
    pub fn from_flags(scrolled_to_initial_item: bool, scroll_scheduled: bool) -> Self {
        match (scrolled_to_initial_item, scroll_scheduled) {
            (true, false) => Self::NotStarted,
            (false, false) => Self::AwaitingDimensions,
            (false, true) => Self::Scrolling,
            (true, true) => Self::Settled,
        }
    }
}

/// Opaque handle to a custom scroll ancestor owned by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScrollParent(pub u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_location_resolve_clamps() {
        assert_eq!(IndexLocation::new(-5).resolve(10), 0);
        assert_eq!(IndexLocation::new(4).resolve(10), 4);
        assert_eq!(IndexLocation::new(40).resolve(10), 9);
        assert_eq!(IndexLocation::last().resolve(10), 9);
        assert_eq!(IndexLocation::last().resolve(0), 0);
        assert_eq!(IndexLocation::new(3).resolve(0), 0);
    }

    #[test]
    fn test_only_plain_zero_is_origin() {
        assert!(IndexLocation::default().is_origin());
        assert!(IndexLocation::new(0).is_origin());
        assert!(!IndexLocation::new(0).align(Align::End).is_origin());
        assert!(!IndexLocation::new(0).offset(10.0).is_origin());
        assert!(!IndexLocation::new(3).is_origin());
        assert!(!IndexLocation::last().is_origin());
    }

    #[test]
    fn test_grid_data_compares_by_allocation() {
        let data = GridData::from(vec![1, 2, 3]);
        assert_eq!(data, data.clone());
        assert_ne!(data, GridData::from(vec![1, 2, 3]));
        assert_eq!(data.get(2), Some(&3));
        assert_eq!(data.get(3), None);
    }

    #[test]
    fn test_grid_state_range_and_height() {
        let state: GridState<()> = GridState {
            items: (8..=23).map(|index| GridItem { index, data: None }).collect(),
            top: 100.0,
            bottom: 300.0,
            offset_top: 100.0,
            offset_bottom: 950.0,
            item_height: 50.0,
            item_width: 100.0,
        };
        assert_eq!(
            state.range(),
            Some(ListRange {
                start_index: 8,
                end_index: 23
            })
        );
        assert_eq!(state.total_height(), 1250.0);
        assert_eq!(GridState::<()>::initial().range(), None);
    }

    #[test]
    fn test_initial_scroll_phase_from_flags() {
        assert_eq!(
            InitialScrollPhase::from_flags(true, false),
            InitialScrollPhase::NotStarted
        );
        assert_eq!(
            InitialScrollPhase::from_flags(false, false),
            InitialScrollPhase::AwaitingDimensions
        );
        assert_eq!(
            InitialScrollPhase::from_flags(false, true),
            InitialScrollPhase::Scrolling
        );
        assert_eq!(
            InitialScrollPhase::from_flags(true, true),
            InitialScrollPhase::Settled
        );
    }
}
