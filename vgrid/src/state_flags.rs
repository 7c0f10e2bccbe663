//! Scroll lifecycle flags: scrolling, at top/bottom, direction and velocity.

use std::time::Duration;

use vgrid_reactive::{Realm, Signal, Stream};

use crate::{
    dom_io::DomIo,
    types::{ScrollContainerState, ScrollDirection},
};

const SCROLL_STOP_DELAY: Duration = Duration::from_millis(100);
const SCROLL_BY_STOP_DELAY: Duration = Duration::from_millis(200);
const EDGE_STATE_THROTTLE: Duration = Duration::from_millis(50);
const DIRECTION_RESET_DELAY: Duration = Duration::from_millis(50);
const VELOCITY_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Why the list is, or stopped being, at the bottom.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AtBottomReason {
    /// The user scrolled to the end.
    ScrolledDown,
    /// The content shrank under the viewport.
    SizeDecreased,
    /// The content grew below the viewport.
    SizeIncreased,
    /// The viewport got shorter.
    ViewportHeightDecreasing,
    /// The user scrolled away from the end.
    ScrollingUpwards,
    /// The end was never reached.
    NotFullyScrolledToLastItemBottom,
}

/// Bottom detection result for one container report.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AtBottomState {
    /// Whether the end of the content is visible.
    pub at_bottom: bool,
    /// What caused the current value.
    pub reason: AtBottomReason,
    /// The report this state was computed from.
    pub state: ScrollContainerState,
}

impl AtBottomState {
    fn initial() -> Self {
        Self {
            at_bottom: false,
            reason: AtBottomReason::NotFullyScrolledToLastItemBottom,
            state: ScrollContainerState::default(),
        }
    }

    fn next(&self, state: ScrollContainerState, viewport_height: f64, threshold: f64) -> Self {
        let ScrollContainerState {
            scroll_top,
            scroll_height,
            ..
        } = state;
        let previous = self.state;
        let state = ScrollContainerState {
            viewport_height,
            ..state
        };
        if scroll_top + viewport_height - scroll_height > -threshold {
            let reason = if scroll_top > previous.scroll_top {
                AtBottomReason::ScrolledDown
            } else {
                AtBottomReason::SizeDecreased
            };
            return Self {
                at_bottom: true,
                reason,
                state,
            };
        }
        let reason = if scroll_height > previous.scroll_height {
            AtBottomReason::SizeIncreased
        } else if viewport_height < previous.viewport_height {
            AtBottomReason::ViewportHeightDecreasing
        } else if scroll_top < previous.scroll_top {
            AtBottomReason::ScrollingUpwards
        } else {
            AtBottomReason::NotFullyScrolledToLastItemBottom
        };
        Self {
            at_bottom: false,
            reason,
            state,
        }
    }
}

/// Direction tracking state: last distinct position and the direction it implies.
#[derive(Clone, Copy, Debug, PartialEq)]
struct DirectionTrack {
    scroll_top: f64,
    direction: ScrollDirection,
}

/// Boolean and numeric flags describing the scroll lifecycle.
#[derive(Clone, Copy, Debug)]
pub struct StateFlags {
    /// Whether the scroll position changed recently.
    pub is_scrolling: Signal<bool>,
    /// Whether a `scroll_by` command was issued recently.
    pub is_scrolling_by: Signal<bool>,
    /// Whether the scroll offset is within `at_top_threshold` of zero.
    pub is_at_top: Signal<bool>,
    /// `is_at_top`, throttled.
    pub at_top_state_change: Stream<bool>,
    /// Distance from the top that still counts as at the top.
    pub at_top_threshold: Signal<f64>,
    /// Bottom detection, emitted when the at-bottom flag flips.
    pub at_bottom_state: Stream<AtBottomState>,
    /// Whether the end of the content is visible.
    pub is_at_bottom: Signal<bool>,
    /// `is_at_bottom`, throttled.
    pub at_bottom_state_change: Stream<bool>,
    /// Distance from the bottom that still counts as at the bottom.
    pub at_bottom_threshold: Signal<f64>,
    /// Direction of the latest movement.
    pub scroll_direction: Signal<ScrollDirection>,
    /// Scroll delta between velocity samples.
    pub scroll_velocity: Signal<f64>,
}

impl StateFlags {
    /// Wires the flags on top of `dom_io`.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn new(realm: &Realm, dom_io: &DomIo) -> Self {
        let moved = realm.pipe(dom_io.scroll_top).distinct().skip(1).stream();
        let is_scrolling = Self::busy_flag(realm, moved, SCROLL_STOP_DELAY);
        let is_scrolling_by = Self::busy_flag(realm, dom_io.scroll_by, SCROLL_BY_STOP_DELAY);

        let at_top_threshold = realm.signal(0.0);
        let is_at_top = realm
            .combine((dom_io.stateful_scroll_top, at_top_threshold))
            .map(|(scroll_top, threshold)| *scroll_top <= *threshold)
            .distinct()
            .signal(true);
        let at_top_state_change = realm
            .pipe(is_at_top)
            .throttle(EDGE_STATE_THROTTLE)
            .stream();

        let at_bottom_threshold = realm.signal(4.0);
        let at_bottom_state = realm
            .combine((
                dom_io.scroll_container_state,
                dom_io.viewport_height,
                at_bottom_threshold,
            ))
            .scan(
                AtBottomState::initial(),
                |current, (state, viewport_height, threshold)| {
                    current.next(*state, *viewport_height, *threshold)
                },
            )
            .distinct_by(|previous, next| previous.at_bottom == next.at_bottom)
            .stream();
        let is_at_bottom = realm
            .pipe(at_bottom_state)
            .map(|state| state.at_bottom)
            .signal(false);
        let at_bottom_state_change = realm
            .pipe(is_at_bottom)
            .throttle(EDGE_STATE_THROTTLE)
            .stream();

        let scroll_direction = realm.signal(ScrollDirection::Down);
        realm
            .pipe(dom_io.scroll_container_state)
            .with_latest(is_scrolling_by)
            .scan(
                DirectionTrack {
                    scroll_top: 0.0,
                    direction: ScrollDirection::Down,
                },
                |track, (state, scrolling_by)| {
                    if *scrolling_by || state.scroll_top == track.scroll_top {
                        return DirectionTrack {
                            scroll_top: state.scroll_top,
                            direction: track.direction,
                        };
                    }
                    let direction = if state.scroll_top < track.scroll_top {
                        ScrollDirection::Up
                    } else {
                        ScrollDirection::Down
                    };
                    DirectionTrack {
                        scroll_top: state.scroll_top,
                        direction,
                    }
                },
            )
            .map(|track| track.direction)
            .connect(scroll_direction);
        realm
            .pipe(dom_io.scroll_container_state)
            .debounce(DIRECTION_RESET_DELAY)
            .map_to(ScrollDirection::None)
            .connect(scroll_direction);

        let scroll_velocity = realm.signal(0.0);
        realm
            .pipe(dom_io.scroll_top)
            .with_latest(is_scrolling)
            .filter(|(_, scrolling)| *scrolling)
            .map(|(scroll_top, _)| *scroll_top)
            .throttle(VELOCITY_SAMPLE_INTERVAL)
            .scan((0.0_f64, None::<f64>), |(_, previous), scroll_top| {
                let velocity = previous.map_or(0.0, |previous| previous - scroll_top);
                (velocity, Some(*scroll_top))
            })
            .map(|(velocity, _)| *velocity)
            .connect(scroll_velocity);
        realm
            .pipe(is_scrolling)
            .filter(|scrolling| !scrolling)
            .map_to(0.0)
            .connect(scroll_velocity);

        Self {
            is_scrolling,
            is_scrolling_by,
            is_at_top,
            at_top_state_change,
            at_top_threshold,
            at_bottom_state,
            is_at_bottom,
            at_bottom_state_change,
            at_bottom_threshold,
            scroll_direction,
            scroll_velocity,
        }
    }

    /// True on every emission of `activity`, false once `delay` passed without one.
    fn busy_flag<T>(realm: &Realm, activity: Stream<T>, delay: Duration) -> Signal<bool>
    where
        T: Clone + Send + Sync + 'static,
    {
        let idle = realm.pipe(activity).debounce(delay).map_to(false).stream();
        realm
            .pipe(activity)
            .map_to(true)
            .merge(idle)
            .distinct()
            .signal(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScrollToOptions;

    fn setup() -> (Realm, DomIo, StateFlags) {
        let realm = Realm::new();
        let io = DomIo::new(&realm);
        let flags = StateFlags::new(&realm, &io);
        realm.publish(io.viewport_height, 300.0);
        (realm, io, flags)
    }

    fn scroll(realm: &Realm, io: &DomIo, scroll_top: f64, scroll_height: f64) {
        realm.publish(
            io.scroll_container_state,
            ScrollContainerState {
                scroll_top,
                scroll_height,
                viewport_height: 300.0,
            },
        );
    }

    #[test]
    fn test_is_scrolling_settles_after_delay() {
        let (realm, io, flags) = setup();
        scroll(&realm, &io, 0.0, 1000.0);
        assert!(!realm.value(flags.is_scrolling));

        scroll(&realm, &io, 40.0, 1000.0);
        assert!(realm.value(flags.is_scrolling));
        realm.advance_time(Duration::from_millis(60));
        scroll(&realm, &io, 80.0, 1000.0);
        realm.advance_time(Duration::from_millis(60));
        assert!(realm.value(flags.is_scrolling));

        realm.advance_time(Duration::from_millis(40));
        assert!(!realm.value(flags.is_scrolling));
    }

    #[test]
    fn test_is_scrolling_by() {
        let (realm, io, flags) = setup();
        realm.publish(io.scroll_by, ScrollToOptions::to(50.0));
        assert!(realm.value(flags.is_scrolling_by));
        realm.advance_time(Duration::from_millis(200));
        assert!(!realm.value(flags.is_scrolling_by));
    }

    #[test]
    fn test_at_top_with_threshold() {
        let (realm, io, flags) = setup();
        assert!(realm.value(flags.is_at_top));
        scroll(&realm, &io, 10.0, 1000.0);
        assert!(!realm.value(flags.is_at_top));
        realm.publish(flags.at_top_threshold, 20.0);
        assert!(realm.value(flags.is_at_top));
    }

    #[test]
    fn test_at_bottom_reasons() {
        let (realm, io, flags) = setup();
        let states = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = states.clone();
        realm.subscribe(flags.at_bottom_state, move |_, state| {
            sink.lock().push((state.at_bottom, state.reason));
        });

        scroll(&realm, &io, 0.0, 1000.0);
        scroll(&realm, &io, 698.0, 1000.0);
        scroll(&realm, &io, 698.0, 1500.0);
        scroll(&realm, &io, 400.0, 1500.0);

        assert_eq!(
            *states.lock(),
            vec![
                (false, AtBottomReason::SizeIncreased),
                (true, AtBottomReason::ScrolledDown),
                (false, AtBottomReason::SizeIncreased),
            ]
        );
        assert!(!realm.value(flags.is_at_bottom));
    }

    #[test]
    fn test_scroll_direction() {
        let (realm, io, flags) = setup();
        scroll(&realm, &io, 200.0, 1000.0);
        assert_eq!(realm.value(flags.scroll_direction), ScrollDirection::Down);
        scroll(&realm, &io, 100.0, 1000.0);
        assert_eq!(realm.value(flags.scroll_direction), ScrollDirection::Up);
        realm.advance_time(DIRECTION_RESET_DELAY);
        assert_eq!(realm.value(flags.scroll_direction), ScrollDirection::None);
    }

    #[test]
    fn test_velocity_resets_when_scrolling_stops() {
        let (realm, io, flags) = setup();
        scroll(&realm, &io, 0.0, 5000.0);
        for step in 1..=4 {
            scroll(&realm, &io, f64::from(step) * 100.0, 5000.0);
            realm.advance_time(Duration::from_millis(50));
        }
        assert_ne!(realm.value(flags.scroll_velocity), 0.0);

        realm.advance_time(Duration::from_millis(500));
        assert_eq!(realm.value(flags.scroll_velocity), 0.0);
    }
}
