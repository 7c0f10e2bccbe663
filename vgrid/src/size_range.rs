//! The visible pixel range: what part of the content has to be rendered.

use vgrid_reactive::{Realm, Signal, Stream};

use crate::dom_io::DomIo;

/// Extra pixels rendered beyond the viewport.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Overscan {
    /// Applied only at the end the list moves towards.
    Uniform(f64),
    /// `main` at the end the list moves towards, `reverse` at the opposite end.
    Directional {
        /// Leading end.
        main: f64,
        /// Trailing end.
        reverse: f64,
    },
}

impl Default for Overscan {
    fn default() -> Self {
        Self::Uniform(0.0)
    }
}

/// Pixels by which the viewport is virtually enlarged, independent of direction.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ViewportIncrease {
    /// Same amount above and below.
    Uniform(f64),
    /// Separate amounts.
    Split {
        /// Above the viewport.
        top: f64,
        /// Below the viewport.
        bottom: f64,
    },
}

impl Default for ViewportIncrease {
    fn default() -> Self {
        Self::Uniform(0.0)
    }
}

impl ViewportIncrease {
    fn top(self) -> f64 {
        match self {
            Self::Uniform(px) => px,
            Self::Split { top, .. } => top,
        }
    }

    fn bottom(self) -> f64 {
        match self {
            Self::Uniform(px) => px,
            Self::Split { bottom, .. } => bottom,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Edge {
    Top,
    Bottom,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

impl Overscan {
    fn at(self, edge: Edge, direction: Direction) -> f64 {
        let leading = matches!(
            (edge, direction),
            (Edge::Top, Direction::Up) | (Edge::Bottom, Direction::Down)
        );
        match (self, leading) {
            (Self::Uniform(px), true) => px,
            (Self::Uniform(_), false) => 0.0,
            (Self::Directional { main, .. }, true) => main,
            (Self::Directional { reverse, .. }, false) => reverse,
        }
    }
}

/// Everything the visible range depends on.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RangeInputs {
    /// Current scroll offset.
    pub scroll_top: f64,
    /// Visible height.
    pub viewport_height: f64,
    /// Height of the scrolling header.
    pub header_height: f64,
    /// Top and bottom of the rendered block, relative to the list.
    pub list_boundary: (f64, f64),
    /// Overscan policy.
    pub overscan: Overscan,
    /// Height of the items pinned above the list.
    pub top_list_height: f64,
    /// Height of the sticky header.
    pub fixed_header_height: f64,
    /// Host offset correction.
    pub deviation: f64,
    /// Virtual viewport enlargement.
    pub increase_viewport_by: ViewportIncrease,
}

/// Pixel range to render, or `None` while the rendered block still covers the viewport.
pub fn compute_visible_range(inputs: &RangeInputs) -> Option<(f64, f64)> {
    let RangeInputs {
        scroll_top,
        viewport_height,
        header_height,
        list_boundary: (boundary_top, boundary_bottom),
        overscan,
        top_list_height,
        fixed_header_height,
        deviation,
        increase_viewport_by,
    } = *inputs;

    let top = scroll_top - deviation;
    let sticky = top_list_height + fixed_header_height;
    let header_visible = (header_height - top).max(0.0);
    let top_increase = increase_viewport_by.top();
    let bottom_increase = increase_viewport_by.bottom();
    let list_top = boundary_top - deviation + header_height + fixed_header_height;
    let list_bottom = boundary_bottom - deviation + header_height + fixed_header_height;

    let mut direction = None;
    if list_top > scroll_top + sticky - top_increase {
        direction = Some(Direction::Up);
    }
    if list_bottom < scroll_top - header_visible + viewport_height + bottom_increase {
        direction = Some(Direction::Down);
    }
    let direction = direction?;

    Some((
        (top - header_height - overscan.at(Edge::Top, direction) - top_increase).max(0.0),
        top - header_visible - fixed_header_height
            + viewport_height
            + overscan.at(Edge::Bottom, direction)
            + bottom_increase,
    ))
}

/// Range and size cells.
#[derive(Clone, Copy, Debug)]
pub struct SizeRange {
    /// Rendered block reported back by the grid, in list coordinates.
    pub list_boundary: Stream<(f64, f64)>,
    /// Height of the items pinned above the list.
    pub top_list_height: Signal<f64>,
    /// Overscan policy.
    pub overscan: Signal<Overscan>,
    /// Virtual viewport enlargement.
    pub increase_viewport_by: Signal<ViewportIncrease>,
    /// Pixel range the grid has to cover.
    pub visible_range: Signal<(f64, f64)>,
}

impl SizeRange {
    /// Wires the range computation on top of `dom_io`.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn new(realm: &Realm, dom_io: &DomIo) -> Self {
        let list_boundary = realm.stream::<(f64, f64)>();
        let top_list_height = realm.signal(0.0);
        let overscan = realm.signal(Overscan::default());
        let increase_viewport_by = realm.signal(ViewportIncrease::default());

        let scroll_top = realm.pipe(dom_io.scroll_top).distinct().stream();
        let visible_range = realm
            .combine((
                scroll_top,
                dom_io.viewport_height,
                dom_io.header_height,
                list_boundary,
                overscan,
                top_list_height,
                dom_io.fixed_header_height,
                dom_io.deviation,
                increase_viewport_by,
            ))
            .filter_map(
                |(
                    scroll_top,
                    viewport_height,
                    header_height,
                    list_boundary,
                    overscan,
                    top_list_height,
                    fixed_header_height,
                    deviation,
                    increase_viewport_by,
                )| {
                    compute_visible_range(&RangeInputs {
                        scroll_top: *scroll_top,
                        viewport_height: *viewport_height,
                        header_height: *header_height,
                        list_boundary: *list_boundary,
                        overscan: *overscan,
                        top_list_height: *top_list_height,
                        fixed_header_height: *fixed_header_height,
                        deviation: *deviation,
                        increase_viewport_by: *increase_viewport_by,
                    })
                },
            )
            .distinct()
            .signal((0.0, 0.0));
        realm.set_label(visible_range, "visible_range");

        Self {
            list_boundary,
            top_list_height,
            overscan,
            increase_viewport_by,
            visible_range,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::types::ScrollContainerState;

    fn inputs(scroll_top: f64, list_boundary: (f64, f64)) -> RangeInputs {
        RangeInputs {
            scroll_top,
            viewport_height: 300.0,
            list_boundary,
            ..RangeInputs::default()
        }
    }

    #[rstest]
    #[case::covered(100.0, (0.0, 600.0), None)]
    #[case::scrolling_down(500.0, (0.0, 600.0), Some((500.0, 800.0)))]
    #[case::scrolling_up(100.0, (200.0, 600.0), Some((100.0, 400.0)))]
    #[case::unrendered(0.0, (0.0, 0.0), Some((0.0, 300.0)))]
    fn test_visible_range_without_overscan(
        #[case] scroll_top: f64,
        #[case] list_boundary: (f64, f64),
        #[case] expected: Option<(f64, f64)>,
    ) {
        assert_eq!(
            compute_visible_range(&inputs(scroll_top, list_boundary)),
            expected
        );
    }

    #[test]
    fn test_uniform_overscan_applies_at_leading_end() {
        let down = RangeInputs {
            overscan: Overscan::Uniform(50.0),
            ..inputs(500.0, (0.0, 600.0))
        };
        assert_eq!(compute_visible_range(&down), Some((500.0, 850.0)));

        let up = RangeInputs {
            overscan: Overscan::Uniform(50.0),
            ..inputs(300.0, (400.0, 900.0))
        };
        assert_eq!(compute_visible_range(&up), Some((250.0, 600.0)));
    }

    #[test]
    fn test_directional_overscan_and_increase() {
        let down = RangeInputs {
            overscan: Overscan::Directional {
                main: 40.0,
                reverse: 10.0,
            },
            increase_viewport_by: ViewportIncrease::Split {
                top: 5.0,
                bottom: 20.0,
            },
            ..inputs(500.0, (0.0, 600.0))
        };
        assert_eq!(compute_visible_range(&down), Some((485.0, 860.0)));
    }

    #[test]
    fn test_header_shifts_the_range() {
        let with_header = RangeInputs {
            header_height: 100.0,
            ..inputs(0.0, (0.0, 0.0))
        };
        assert_eq!(compute_visible_range(&with_header), Some((0.0, 200.0)));
    }

    #[test]
    fn test_visible_range_cell() {
        let realm = Realm::new();
        let io = DomIo::new(&realm);
        let size_range = SizeRange::new(&realm, &io);

        realm.publish(io.viewport_height, 300.0);
        realm.publish(size_range.list_boundary, (0.0, 0.0));
        realm.publish(
            io.scroll_container_state,
            ScrollContainerState {
                scroll_top: 0.0,
                scroll_height: 1000.0,
                viewport_height: 300.0,
            },
        );
        assert_eq!(realm.value(size_range.visible_range), (0.0, 300.0));

        realm.publish(size_range.list_boundary, (0.0, 600.0));
        assert_eq!(realm.value(size_range.visible_range), (0.0, 300.0));

        realm.publish(
            io.scroll_container_state,
            ScrollContainerState {
                scroll_top: 500.0,
                scroll_height: 1000.0,
                viewport_height: 300.0,
            },
        );
        assert_eq!(realm.value(size_range.visible_range), (500.0, 800.0));
    }
}
