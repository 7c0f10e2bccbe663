//! Adapter for grids scrolled by the window instead of their own container.

use vgrid_reactive::{Realm, Signal, Stream};

use crate::{
    dom_io::DomIo,
    types::{ScrollContainerState, ScrollParent, ScrollToOptions, WindowViewportInfo},
};

/// Window scrolling cells.
#[derive(Clone, Copy, Debug)]
pub struct WindowScroller {
    /// Host input: scroll state of the window.
    pub window_scroll_container_state: Stream<ScrollContainerState>,
    /// Host input: where the grid element sits in the window.
    pub window_viewport_rect: Stream<WindowViewportInfo>,
    /// Command: scroll the window, already shifted by the element offset.
    pub window_scroll_to: Stream<ScrollToOptions>,
    /// Whether the window is the scroll container.
    pub use_window_scroll: Signal<bool>,
    /// Scroll ancestor chosen by the host, if any.
    pub custom_scroll_parent: Signal<Option<ScrollParent>>,
}

impl WindowScroller {
    /// Translates between window and element coordinates on top of `dom_io`.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn new(realm: &Realm, dom_io: &DomIo) -> Self {
        let window_scroll_container_state = realm.stream::<ScrollContainerState>();
        let window_viewport_rect = realm.stream::<WindowViewportInfo>();
        let use_window_scroll = realm.signal(false);

        realm
            .combine((window_scroll_container_state, window_viewport_rect))
            .map(|(window, rect)| ScrollContainerState {
                scroll_top: (window.scroll_top - rect.offset_top).max(0.0),
                ..*window
            })
            .connect(dom_io.scroll_container_state);

        let window_scroll_to = realm
            .pipe(dom_io.scroll_to)
            .with_latest_all((window_viewport_rect, use_window_scroll))
            .filter(|(_, (_, enabled))| *enabled)
            .map(|(options, (rect, _))| ScrollToOptions {
                top: options.top + rect.offset_top,
                ..*options
            })
            .stream();

        Self {
            window_scroll_container_state,
            window_viewport_rect,
            window_scroll_to,
            use_window_scroll,
            custom_scroll_parent: realm.signal(None),
        }
    }
}
