//! Raw scroll and size inputs, plus the scroll commands sent back to the host.

use vgrid_reactive::{Realm, Signal, Stream};

use crate::types::{ScrollBehavior, ScrollContainerState, ScrollToOptions};

/// Cells shared with the scroll execution layer.
#[derive(Clone, Copy, Debug)]
pub struct DomIo {
    /// Host input: reported on every scroll and resize of the scroll container.
    pub scroll_container_state: Stream<ScrollContainerState>,
    /// Scroll offset of every container report.
    pub scroll_top: Stream<f64>,
    /// Content height of every container report.
    pub scroll_height: Stream<f64>,
    /// Latest scroll offset, zero before the first report.
    pub stateful_scroll_top: Signal<f64>,
    /// Offset correction applied by the host after content above the viewport changed.
    pub deviation: Signal<f64>,
    /// Visible height of the scroll container.
    pub viewport_height: Stream<f64>,
    /// Height of the scrolling header above the items.
    pub header_height: Signal<f64>,
    /// Height of the sticky header.
    pub fixed_header_height: Signal<f64>,
    /// Command: scroll to an absolute offset.
    pub scroll_to: Stream<ScrollToOptions>,
    /// Command: scroll by a delta.
    pub scroll_by: Stream<ScrollToOptions>,
    /// Host input: an animated scroll arrived at its target.
    pub smooth_scroll_target_reached: Stream<()>,
    /// Whether an animated scroll is still running.
    pub scrolling_in_progress: Signal<bool>,
}

impl DomIo {
    /// Creates the cells in `realm`.
    #[tracing::instrument(level = "debug", skip(realm))]
    pub fn new(realm: &Realm) -> Self {
        let scroll_container_state = realm.stream::<ScrollContainerState>();
        let scroll_top = realm
            .pipe(scroll_container_state)
            .map(|state| state.scroll_top)
            .stream();
        let scroll_height = realm
            .pipe(scroll_container_state)
            .map(|state| state.scroll_height)
            .stream();
        let stateful_scroll_top = realm.pipe(scroll_top).signal(0.0);

        let scroll_to = realm.stream::<ScrollToOptions>();
        let smooth_scroll_target_reached = realm.stream::<()>();
        let arrived = realm
            .pipe(smooth_scroll_target_reached)
            .map_to(false)
            .stream();
        let scrolling_in_progress = realm
            .pipe(scroll_to)
            .filter(|options| options.behavior == ScrollBehavior::Smooth)
            .map_to(true)
            .merge(arrived)
            .distinct()
            .signal(false);

        let io = Self {
            scroll_container_state,
            scroll_top,
            scroll_height,
            stateful_scroll_top,
            deviation: realm.signal(0.0),
            viewport_height: realm.stream(),
            header_height: realm.signal(0.0),
            fixed_header_height: realm.signal(0.0),
            scroll_to,
            scroll_by: realm.stream(),
            smooth_scroll_target_reached,
            scrolling_in_progress,
        };
        realm.set_label(io.scroll_container_state, "scroll_container_state");
        realm.set_label(io.scroll_to, "scroll_to");
        io
    }
}
