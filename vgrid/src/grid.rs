//! The grid virtualization system.
//!
//! [`GridSystem`] wires the supporting subsystems together and derives the rendered
//! window from them. The host publishes measurements and scroll reports into its input
//! cells and renders whatever [`GridSystem::grid_state`] holds.
//!
//! # Initial scroll
//!
//! When an initial top-most item other than plain index zero is requested, the grid
//! renders nothing after mount until the scroll position caught up: once item and
//! viewport heights are known, the scroll command is issued on the next frame, and the
//! next scroll report settles it. [`GridSystem::initial_scroll_phase`] tracks progress.
//!
//! # Restore
//!
//! A [`GridSnapshot`] published into [`GridSystem::restore_state_from`] before mount is
//! applied at mount. While the restored scroll position is being reached,
//! [`GridSystem::state_restore_in_progress`] is raised and the grid state is frozen.

use vgrid_reactive::{Realm, Signal, Stream};

use crate::{
    dom_io::DomIo,
    geometry::{
        Dimensions, Gap, grid_layout, item_top, items_per_row, round_half_up, row_count,
        total_height,
    },
    props_ready::PropsReady,
    scroll_seek::ScrollSeek,
    size_range::SizeRange,
    state_flags::StateFlags,
    types::{
        Align, GridData, GridItem, GridSnapshot, GridState, IndexLocation, InitialScrollPhase,
        ListRange, ScrollToOptions,
    },
    window_scroller::WindowScroller,
};

/// Everything the grid state is derived from.
#[derive(Clone, Debug, PartialEq)]
pub struct GridInputs<D> {
    /// Number of items in the collection.
    pub total_count: usize,
    /// Pixel range to cover.
    pub visible_range: (f64, f64),
    /// Cell spacing.
    pub gap: Gap,
    /// Measured item size.
    pub item: Dimensions,
    /// Measured viewport size.
    pub viewport: Dimensions,
    /// Item payloads.
    pub data: Option<GridData<D>>,
    /// Items to render before anything is measured.
    pub initial_item_count: usize,
    /// Whether the initial scroll finished, or was never needed.
    pub scrolled_to_initial_item: bool,
    /// Item requested at the top on mount.
    pub initial_top_most_item_index: IndexLocation,
}

impl<D> Default for GridInputs<D> {
    fn default() -> Self {
        Self {
            total_count: 0,
            visible_range: (0.0, 0.0),
            gap: Gap::ZERO,
            item: Dimensions::ZERO,
            viewport: Dimensions::ZERO,
            data: None,
            initial_item_count: 0,
            scrolled_to_initial_item: true,
            initial_top_most_item_index: IndexLocation::default(),
        }
    }
}

fn build_items<D: Clone>(start: i64, end: i64, data: Option<&GridData<D>>) -> Vec<GridItem<D>> {
    if end < start || end < 0 {
        return Vec::new();
    }
    let start = usize::try_from(start).unwrap_or(0);
    let end = usize::try_from(end).unwrap_or(0);
    (start..=end)
        .map(|index| GridItem {
            index,
            data: data.and_then(|data| data.get(index)).cloned(),
        })
        .collect()
}

/// Row index for a pixel offset, or zero when rows have no height.
fn rows_to(offset: f64, row_height: f64, round: fn(f64) -> f64) -> i64 {
    let rows = round(offset / row_height);
    if rows.is_finite() { rows as i64 } else { 0 }
}

/// Derives the rendered window from its inputs.
#[tracing::instrument(level = "debug", skip_all, fields(total_count = inputs.total_count))]
pub fn compute_grid_state<D: Clone>(inputs: &GridInputs<D>) -> GridState<D> {
    let GridInputs {
        total_count,
        visible_range: (start_offset, end_offset),
        gap,
        item,
        viewport,
        ref data,
        initial_item_count,
        scrolled_to_initial_item,
        initial_top_most_item_index,
    } = *inputs;

    if initial_item_count == 0 && (total_count == 0 || viewport.width == 0.0) {
        return GridState::initial();
    }

    if item.width == 0.0 {
        let start = initial_top_most_item_index.resolve(total_count);
        let end = start + initial_item_count.saturating_sub(1);
        let end = match total_count {
            0 => end,
            total => end.min(total - 1),
        };
        return GridState::probe(build_items(start as i64, end as i64, data.as_ref()));
    }

    let per_row = items_per_row(viewport.width, item.width, gap.column);
    let per_row_i = per_row as i64;
    let total = total_count as i64;

    let (start_index, end_index) = if !scrolled_to_initial_item {
        (0, -1)
    } else if start_offset == 0.0 && end_offset == 0.0 && initial_item_count > 0 {
        (0, initial_item_count as i64 - 1)
    } else {
        let row_height = item.height + gap.row;
        let start = per_row_i * rows_to(start_offset + gap.row, row_height, f64::floor);
        let end = per_row_i * rows_to(end_offset + gap.row, row_height, f64::ceil) - 1;
        let end = (total - 1).min(end.max(per_row_i - 1));
        let start = end.min(start.max(0));
        (start, end)
    };

    let items = build_items(start_index, end_index, data.as_ref());
    let layout = grid_layout(viewport, gap, item, &items);
    let content_height = total_height(row_count(total_count, per_row), item.height, gap.row);

    GridState {
        items,
        top: layout.top,
        bottom: layout.bottom,
        offset_top: layout.top,
        offset_bottom: content_height - layout.bottom,
        item_height: item.height,
        item_width: item.width,
    }
}

/// Scroll command that brings `location` into view.
pub fn scroll_target(
    location: &IndexLocation,
    total_count: usize,
    viewport: Dimensions,
    item: Dimensions,
    gap: Gap,
) -> ScrollToOptions {
    let index = location.resolve(total_count);
    let top = item_top(viewport, gap, item, index);
    let top = match location.align {
        Align::Start => top,
        Align::Center => round_half_up(top - viewport.height / 2.0 + item.height / 2.0),
        Align::End => round_half_up(top - viewport.height + item.height),
    };
    ScrollToOptions {
        top: top + location.offset,
        behavior: location.behavior,
    }
}

/// Whether every item is rendered and nothing is left below the window.
fn fully_rendered<D>(state: &GridState<D>, total_count: usize) -> bool {
    state.bottom > 0.0
        && state.item_height > 0.0
        && state.offset_bottom == 0.0
        && state.items.len() == total_count
}

/// Virtualization state of a uniform grid.
///
/// Every field is a handle into the realm the system was built in.
pub struct GridSystem<D> {
    realm: Realm,

    /// Scroll inputs and commands.
    pub dom_io: DomIo,
    /// Visible pixel range.
    pub size_range: SizeRange,
    /// Scroll lifecycle flags.
    pub state_flags: StateFlags,
    /// Placeholder mode.
    pub scroll_seek: ScrollSeek,
    /// Mount gate.
    pub props_ready: PropsReady,
    /// Window scrolling adapter.
    pub window_scroller: WindowScroller,

    /// Number of items.
    pub total_count: Signal<usize>,
    /// Items to render before measurement.
    pub initial_item_count: Signal<usize>,
    /// Item payloads.
    pub data: Signal<Option<GridData<D>>>,
    /// Measured viewport size.
    pub viewport_dimensions: Signal<Dimensions>,
    /// Measured item size.
    pub item_dimensions: Signal<Dimensions>,
    /// Cell spacing.
    pub gap: Signal<Gap>,
    /// Item to show at the top on mount.
    pub initial_top_most_item_index: Signal<IndexLocation>,
    /// Snapshot to restore on mount.
    pub restore_state_from: Signal<Option<GridSnapshot>>,
    /// Command: scroll an item into view.
    pub scroll_to_index: Stream<IndexLocation>,

    /// The rendered window.
    pub grid_state: Signal<GridState<D>>,
    /// Height of the whole content.
    pub total_list_height: Signal<f64>,
    /// Capture of the current scroll position, for restoring later.
    pub state_changed: Signal<GridSnapshot>,
    /// Fires when the first item gets rendered.
    pub start_reached: Stream<usize>,
    /// Fires with the last index when the last item gets rendered.
    pub end_reached: Stream<usize>,
    /// Rendered range, at most once per tick.
    pub range_changed: Stream<ListRange>,
    /// Whether a snapshot restore is being applied.
    pub state_restore_in_progress: Signal<bool>,
    /// Whether a non-zero scroll position was ever seen.
    pub has_scrolled: Signal<bool>,
    /// Whether the initial top-most item was reached.
    pub scrolled_to_initial_item: Signal<bool>,
    /// Whether the initial scroll command is queued or done.
    pub scroll_scheduled: Signal<bool>,
    /// Progress of the initial scroll.
    pub initial_scroll_phase: Signal<InitialScrollPhase>,
}

impl<D> Clone for GridSystem<D> {
    fn clone(&self) -> Self {
        Self {
            realm: self.realm.clone(),
            dom_io: self.dom_io,
            size_range: self.size_range,
            state_flags: self.state_flags,
            scroll_seek: self.scroll_seek,
            props_ready: self.props_ready,
            window_scroller: self.window_scroller,
            total_count: self.total_count,
            initial_item_count: self.initial_item_count,
            data: self.data,
            viewport_dimensions: self.viewport_dimensions,
            item_dimensions: self.item_dimensions,
            gap: self.gap,
            initial_top_most_item_index: self.initial_top_most_item_index,
            restore_state_from: self.restore_state_from,
            scroll_to_index: self.scroll_to_index,
            grid_state: self.grid_state,
            total_list_height: self.total_list_height,
            state_changed: self.state_changed,
            start_reached: self.start_reached,
            end_reached: self.end_reached,
            range_changed: self.range_changed,
            state_restore_in_progress: self.state_restore_in_progress,
            has_scrolled: self.has_scrolled,
            scrolled_to_initial_item: self.scrolled_to_initial_item,
            scroll_scheduled: self.scroll_scheduled,
            initial_scroll_phase: self.initial_scroll_phase,
        }
    }
}

impl<D> GridSystem<D>
where
    D: Clone + Send + Sync + 'static,
{
    /// Builds the grid and its subsystems in `realm`.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn new(realm: &Realm) -> Self {
        let dom_io = DomIo::new(realm);
        let size_range = SizeRange::new(realm, &dom_io);
        let state_flags = StateFlags::new(realm, &dom_io);
        let scroll_seek = ScrollSeek::new(realm, &state_flags);
        let props_ready = PropsReady::new(realm);
        let window_scroller = WindowScroller::new(realm, &dom_io);

        let total_count = realm.signal(0_usize);
        let initial_item_count = realm.signal(0_usize);
        let data = realm.signal(None::<GridData<D>>);
        let viewport_dimensions = realm.signal(Dimensions::ZERO);
        let item_dimensions = realm.signal(Dimensions::ZERO);
        let gap = realm.signal(Gap::ZERO);
        let initial_top_most_item_index = realm.signal(IndexLocation::default());
        let restore_state_from = realm.signal(None::<GridSnapshot>);
        let scroll_to_index = realm.stream::<IndexLocation>();

        let state_restore_in_progress = realm.signal(false);
        let scrolled_to_initial_item = realm.signal(true);
        let scroll_scheduled = realm.signal(false);
        let grid_state = realm.signal(GridState::<D>::initial());
        realm.set_label(grid_state, "grid_state");

        realm
            .pipe(viewport_dimensions)
            .map(|viewport| viewport.height)
            .connect(dom_io.viewport_height);
        realm
            .pipe(window_scroller.window_viewport_rect)
            .map(|rect| Dimensions::new(rect.visible_width, rect.visible_height))
            .connect(viewport_dimensions);

        let effective_initial_count = realm
            .combine((initial_item_count, restore_state_from))
            .map(|(count, snapshot)| match snapshot {
                Some(snapshot) if snapshot.scroll_top > 0.0 => 0,
                _ => *count,
            })
            .signal(0);

        realm
            .combine((
                total_count,
                size_range.visible_range,
                gap,
                item_dimensions,
                viewport_dimensions,
                data,
                effective_initial_count,
                scrolled_to_initial_item,
                initial_top_most_item_index,
                state_restore_in_progress,
            ))
            .filter(|(.., restoring)| !*restoring)
            .map(
                |(
                    total_count,
                    visible_range,
                    gap,
                    item,
                    viewport,
                    data,
                    initial_item_count,
                    scrolled_to_initial_item,
                    initial_top_most_item_index,
                    _,
                )| {
                    compute_grid_state(&GridInputs {
                        total_count: *total_count,
                        visible_range: *visible_range,
                        gap: *gap,
                        item: *item,
                        viewport: *viewport,
                        data: data.clone(),
                        initial_item_count: *initial_item_count,
                        scrolled_to_initial_item: *scrolled_to_initial_item,
                        initial_top_most_item_index: *initial_top_most_item_index,
                    })
                },
            )
            .connect(grid_state);

        let total_list_height = realm
            .pipe(grid_state)
            .map(GridState::total_height)
            .signal(0.0);

        realm
            .combine((viewport_dimensions, item_dimensions, grid_state, gap))
            .filter(|(viewport, item, state, _)| {
                !state.items.is_empty() && item.height != 0.0 && viewport.height != 0.0
            })
            .map(|(viewport, item, state, gap)| {
                let layout = grid_layout(*viewport, *gap, *item, &state.items);
                (layout.top, layout.bottom)
            })
            .distinct()
            .connect(size_range.list_boundary);

        let has_scrolled = realm
            .pipe(dom_io.scroll_top)
            .scan(false, |scrolled, scroll_top| *scrolled || *scroll_top != 0.0)
            .distinct()
            .signal(false);

        let start_reached = realm
            .pipe(grid_state)
            .filter(|state| state.items.first().is_some_and(|item| item.index == 0))
            .map_to(0_usize)
            .distinct()
            .stream();

        let end_reached = realm
            .combine((grid_state, total_count))
            .filter(|(state, _)| !state.items.is_empty())
            .with_latest(has_scrolled)
            .filter_map(|((state, total_count), scrolled)| {
                let last = state.items.last()?.index;
                let last_rendered = last + 1 == *total_count;
                let reached = if *scrolled {
                    last_rendered
                } else {
                    last_rendered && fully_rendered(state, *total_count)
                };
                reached.then_some(last)
            })
            .distinct()
            .stream();

        let range_changed = realm
            .pipe(grid_state)
            .with_latest(state_restore_in_progress)
            .filter_map(|(state, restoring)| if *restoring { None } else { state.range() })
            .distinct()
            .debounce_tick()
            .stream();
        realm.connect(range_changed, scroll_seek.range_changed);

        let state_changed = realm
            .combine((
                viewport_dimensions,
                item_dimensions,
                gap,
                dom_io.stateful_scroll_top,
            ))
            .map(|(viewport, item, gap, scroll_top)| GridSnapshot {
                viewport: *viewport,
                item: *item,
                gap: *gap,
                scroll_top: *scroll_top,
            })
            .distinct()
            .signal(GridSnapshot::default());

        realm
            .pipe(scroll_to_index)
            .with_latest_all((total_count, viewport_dimensions, item_dimensions, gap))
            .map(|(location, (total_count, viewport, item, gap))| {
                let options = scroll_target(location, *total_count, *viewport, *item, *gap);
                tracing::debug!(?location, top = options.top, "scroll to index");
                options
            })
            .connect(dom_io.scroll_to);

        realm
            .pipe(props_ready.did_mount)
            .with_latest(initial_top_most_item_index)
            .filter(|(_, location)| !location.is_origin())
            .subscribe(move |realm, _| realm.publish(scrolled_to_initial_item, false));

        let list_boundary = size_range.list_boundary;
        let scroll_top = dom_io.scroll_top;
        realm
            .combine((
                props_ready.did_mount,
                scrolled_to_initial_item,
                item_dimensions,
                viewport_dimensions,
                initial_top_most_item_index,
                scroll_scheduled,
            ))
            .filter(|(_, scrolled, item, viewport, _, scheduled)| {
                !*scrolled && !*scheduled && item.height != 0.0 && viewport.height != 0.0
            })
            .map(|(_, _, _, _, location, _)| *location)
            .subscribe(move |realm, location| {
                realm.publish(scroll_scheduled, true);
                let location = *location;
                realm.schedule_frame(move |realm| {
                    tracing::debug!(?location, "initial scroll");
                    realm.publish(scroll_to_index, location);
                });
                realm.handle_next(scroll_top, move |realm, _| {
                    realm.publish(list_boundary, (0.0, 0.0));
                    realm.publish(scrolled_to_initial_item, true);
                });
            });

        let scroll_to = dom_io.scroll_to;
        realm
            .pipe(props_ready.did_mount)
            .with_latest(restore_state_from)
            .filter_map(|(_, snapshot)| *snapshot)
            .subscribe(move |realm, snapshot| {
                let restoring = snapshot.scroll_top > 0.0;
                tracing::debug!(scroll_top = snapshot.scroll_top, "restoring grid snapshot");
                realm.batch(|batch| {
                    batch.publish(viewport_dimensions, snapshot.viewport);
                    batch.publish(item_dimensions, snapshot.item);
                    batch.publish(gap, snapshot.gap);
                    if restoring {
                        batch.publish(state_restore_in_progress, true);
                    }
                });
                if restoring {
                    realm.handle_after(scroll_top, 1, move |realm, _| {
                        realm.publish(state_restore_in_progress, false);
                    });
                    realm.publish(scroll_to, ScrollToOptions::to(snapshot.scroll_top));
                }
            });

        let initial_scroll_phase = realm
            .combine((scrolled_to_initial_item, scroll_scheduled))
            .map(|(scrolled, scheduled)| InitialScrollPhase::from_flags(*scrolled, *scheduled))
            .distinct()
            .signal(InitialScrollPhase::NotStarted);

        Self {
            realm: realm.clone(),
            dom_io,
            size_range,
            state_flags,
            scroll_seek,
            props_ready,
            window_scroller,
            total_count,
            initial_item_count,
            data,
            viewport_dimensions,
            item_dimensions,
            gap,
            initial_top_most_item_index,
            restore_state_from,
            scroll_to_index,
            grid_state,
            total_list_height,
            state_changed,
            start_reached,
            end_reached,
            range_changed,
            state_restore_in_progress,
            has_scrolled,
            scrolled_to_initial_item,
            scroll_scheduled,
            initial_scroll_phase,
        }
    }

    /// The realm the grid lives in.
    pub fn realm(&self) -> &Realm {
        &self.realm
    }

    /// Current rendered window.
    pub fn state(&self) -> GridState<D> {
        self.realm.value(self.grid_state)
    }

    /// Current snapshot, for restoring the scroll position later.
    pub fn snapshot(&self) -> GridSnapshot {
        self.realm.value(self.state_changed)
    }

    /// Scrolls `location` into view.
    pub fn scroll_to_index(&self, location: impl Into<IndexLocation>) {
        self.realm.publish(self.scroll_to_index, location.into());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use parking_lot::Mutex;
    use rstest::rstest;

    use super::*;
    use crate::types::{ScrollContainerState, WindowViewportInfo};

    const VIEWPORT: Dimensions = Dimensions::new(400.0, 300.0);
    const ITEM: Dimensions = Dimensions::new(100.0, 50.0);

    fn report(grid: &GridSystem<()>, scroll_top: f64) {
        let content = grid.realm().value(grid.total_list_height);
        grid.realm().publish(
            grid.dom_io.scroll_container_state,
            ScrollContainerState {
                scroll_top,
                scroll_height: content,
                viewport_height: 300.0,
            },
        );
    }

    fn grid(total_count: usize, viewport: Dimensions, item: Dimensions) -> GridSystem<()> {
        let realm = Realm::new();
        let grid = GridSystem::new(&realm);
        realm.batch(|batch| {
            batch.publish(grid.total_count, total_count);
            batch.publish(grid.viewport_dimensions, viewport);
            batch.publish(grid.item_dimensions, item);
        });
        realm.publish(grid.props_ready.props_ready, true);
        grid
    }

    fn indices<D>(state: &GridState<D>) -> Vec<usize> {
        state.items.iter().map(|item| item.index).collect()
    }

    fn counter<T>(realm: &Realm, cell: Stream<T>) -> Arc<AtomicUsize>
    where
        T: Clone + Send + Sync + 'static,
    {
        let hits = Arc::new(AtomicUsize::new(0));
        let sink = hits.clone();
        realm.subscribe(cell, move |_, _| {
            sink.fetch_add(1, Ordering::SeqCst);
        });
        hits
    }

    #[test]
    fn test_empty_collection_yields_initial_state() {
        let grid = grid(0, VIEWPORT, ITEM);
        assert_eq!(grid.state(), GridState::initial());
        assert_eq!(grid.realm().value(grid.total_list_height), 0.0);
    }

    #[test]
    fn test_unmeasured_item_yields_probe() {
        let realm = Realm::new();
        let grid = GridSystem::<()>::new(&realm);
        realm.batch(|batch| {
            batch.publish(grid.total_count, 100);
            batch.publish(grid.initial_item_count, 5);
            batch.publish(grid.viewport_dimensions, VIEWPORT);
        });

        let state = grid.state();
        assert_eq!(indices(&state), vec![0, 1, 2, 3, 4]);
        assert_eq!(state, GridState::probe(state.items.clone()));
    }

    #[rstest]
    #[case(IndexLocation::new(40), 3, vec![40, 41, 42])]
    #[case(IndexLocation::new(98), 5, vec![98, 99])]
    #[case(IndexLocation::new(500), 2, vec![99])]
    #[case(IndexLocation::last(), 5, vec![99])]
    fn test_probe_starts_at_initial_top_most_item(
        #[case] location: IndexLocation,
        #[case] initial_item_count: usize,
        #[case] expected: Vec<usize>,
    ) {
        let inputs: GridInputs<()> = GridInputs {
            total_count: 100,
            viewport: VIEWPORT,
            initial_item_count,
            initial_top_most_item_index: location,
            ..GridInputs::default()
        };
        assert_eq!(indices(&compute_grid_state(&inputs)), expected);
    }

    #[rstest]
    fn test_rendered_range_is_ordered_and_in_bounds(
        #[values(1, 7, 100)] total_count: usize,
        #[values((0.0, 0.0), (100.0, 300.0), (125.0, 126.0), (4000.0, 4300.0))]
        visible_range: (f64, f64),
        #[values(Gap::ZERO, Gap::new(8.0, 12.0))] gap: Gap,
    ) {
        let inputs: GridInputs<()> = GridInputs {
            total_count,
            visible_range,
            gap,
            item: ITEM,
            viewport: VIEWPORT,
            ..GridInputs::default()
        };
        let range = compute_grid_state(&inputs)
            .range()
            .expect("a measured, non-empty grid renders items");
        assert!(range.start_index <= range.end_index);
        assert!(range.end_index < total_count);
    }

    #[test]
    fn test_visible_range_selects_rows() {
        let inputs = GridInputs {
            total_count: 100,
            visible_range: (100.0, 300.0),
            item: ITEM,
            viewport: VIEWPORT,
            data: Some(GridData::from((0..100).map(|index| index * 10).collect::<Vec<_>>())),
            ..GridInputs::default()
        };
        let state = compute_grid_state(&inputs);

        assert_eq!(indices(&state), (8..=23).collect::<Vec<_>>());
        assert_eq!(state.items[0].data, Some(80));
        assert_eq!(state.top, 100.0);
        assert_eq!(state.bottom, 300.0);
        assert_eq!(state.offset_top, 100.0);
        assert_eq!(state.offset_bottom, 950.0);
        assert_eq!(state.total_height(), 1250.0);

        // Pure: the same inputs give the same state.
        assert_eq!(compute_grid_state(&inputs), state);
    }

    #[test]
    fn test_range_clamps_to_collection() {
        let inputs: GridInputs<()> = GridInputs {
            total_count: 10,
            visible_range: (400.0, 900.0),
            gap: Gap::new(10.0, 0.0),
            item: ITEM,
            viewport: VIEWPORT,
            ..GridInputs::default()
        };
        let state = compute_grid_state(&inputs);
        let range = state.range();
        assert_eq!(
            range,
            Some(ListRange {
                start_index: 9,
                end_index: 9
            })
        );
    }

    #[test]
    fn test_pending_initial_scroll_renders_nothing() {
        let inputs: GridInputs<()> = GridInputs {
            total_count: 100,
            visible_range: (100.0, 300.0),
            item: ITEM,
            viewport: VIEWPORT,
            scrolled_to_initial_item: false,
            ..GridInputs::default()
        };
        let state = compute_grid_state(&inputs);
        assert!(state.items.is_empty());
        assert_eq!(state.offset_bottom, 1250.0);
    }

    #[test]
    fn test_scroll_target_alignment() {
        let end = IndexLocation::new(50).align(Align::End);
        assert_eq!(
            scroll_target(&end, 100, VIEWPORT, ITEM, Gap::ZERO).top,
            item_top(VIEWPORT, Gap::ZERO, ITEM, 50) - 300.0 + 50.0
        );

        let center = IndexLocation::new(50).align(Align::Center).offset(-7.0);
        assert_eq!(scroll_target(&center, 100, VIEWPORT, ITEM, Gap::ZERO).top, 468.0);

        let odd = Dimensions::new(400.0, 301.0);
        let rounded = IndexLocation::new(50).align(Align::Center);
        assert_eq!(scroll_target(&rounded, 100, odd, ITEM, Gap::ZERO).top, 475.0);

        assert_eq!(
            scroll_target(&IndexLocation::last(), 100, VIEWPORT, ITEM, Gap::ZERO).top,
            1200.0
        );
    }

    #[test]
    fn test_scroll_to_index_publishes_command() {
        let grid = grid(100, VIEWPORT, ITEM);
        grid.scroll_to_index(IndexLocation::new(50).align(Align::End));
        assert_eq!(
            grid.realm().last(grid.dom_io.scroll_to),
            Some(ScrollToOptions::to(350.0))
        );
    }

    #[test]
    fn test_scrolling_updates_state() {
        let grid = grid(100, VIEWPORT, ITEM);
        assert_eq!(indices(&grid.state()), vec![0, 1, 2, 3]);

        report(&grid, 500.0);
        let state = grid.state();
        assert_eq!(state.range(), Some(ListRange { start_index: 40, end_index: 63 }));
        assert_eq!(grid.realm().value(grid.total_list_height), 1250.0);
        assert!(grid.realm().value(grid.has_scrolled));
    }

    #[test]
    fn test_end_reached_fires_once() {
        let grid = grid(100, Dimensions::new(100.0, 300.0), ITEM);
        let realm = grid.realm().clone();
        let reached = Arc::new(Mutex::new(Vec::new()));
        let sink = reached.clone();
        realm.subscribe(grid.end_reached, move |_, index| sink.lock().push(*index));

        report(&grid, 4650.0);
        assert_eq!(grid.state().range().map(|range| range.end_index), Some(98));
        assert!(reached.lock().is_empty());

        report(&grid, 4700.0);
        assert_eq!(grid.state().range().map(|range| range.end_index), Some(99));
        report(&grid, 4699.0);
        report(&grid, 4700.0);
        assert_eq!(*reached.lock(), vec![99]);
    }

    #[test]
    fn test_end_reached_before_scrolling_needs_full_render() {
        let realm = Realm::new();
        let grid = GridSystem::<()>::new(&realm);
        let reached = Arc::new(Mutex::new(Vec::new()));
        let sink = reached.clone();
        realm.subscribe(grid.end_reached, move |_, index| sink.lock().push(*index));

        realm.batch(|batch| {
            batch.publish(grid.total_count, 100);
            batch.publish(grid.viewport_dimensions, VIEWPORT);
            batch.publish(grid.item_dimensions, ITEM);
        });
        realm.publish(grid.size_range.visible_range, (1000.0, 1250.0));
        assert_eq!(grid.state().range().map(|range| range.end_index), Some(99));
        assert!(reached.lock().is_empty());

        // Everything fits: one row and nothing below it.
        realm.batch(|batch| {
            batch.publish(grid.total_count, 4);
            batch.publish(grid.size_range.visible_range, (0.0, 300.0));
        });
        assert_eq!(indices(&grid.state()), vec![0, 1, 2, 3]);
        assert_eq!(*reached.lock(), vec![3]);
    }

    #[test]
    fn test_start_reached_and_range_changed() {
        let realm = Realm::new();
        let grid = GridSystem::<()>::new(&realm);
        let ranges = Arc::new(Mutex::new(Vec::new()));
        let sink = ranges.clone();
        realm.subscribe(grid.range_changed, move |_, range| sink.lock().push(*range));
        let starts = counter(&realm, grid.start_reached);

        realm.batch(|batch| {
            batch.publish(grid.total_count, 100);
            batch.publish(grid.viewport_dimensions, VIEWPORT);
            batch.publish(grid.item_dimensions, ITEM);
        });
        realm.publish(grid.props_ready.props_ready, true);
        realm.flush_ticks();
        assert_eq!(starts.load(Ordering::SeqCst), 1);

        report(&grid, 450.0);
        report(&grid, 500.0);
        assert_eq!(ranges.lock().len(), 1);
        realm.flush_ticks();
        assert_eq!(
            *ranges.lock(),
            vec![
                ListRange {
                    start_index: 0,
                    end_index: 3
                },
                ListRange {
                    start_index: 40,
                    end_index: 63
                }
            ]
        );

        report(&grid, 0.0);
        realm.flush_ticks();
        assert_eq!(grid.state().range().map(|range| range.start_index), Some(0));
        assert_eq!(starts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_initial_scroll_sequence() {
        let realm = Realm::new();
        let grid = GridSystem::<()>::new(&realm);
        realm.batch(|batch| {
            batch.publish(grid.total_count, 100);
            batch.publish(grid.viewport_dimensions, VIEWPORT);
            batch.publish(grid.item_dimensions, ITEM);
            batch.publish(grid.initial_top_most_item_index, IndexLocation::new(50));
        });
        assert_eq!(
            realm.value(grid.initial_scroll_phase),
            InitialScrollPhase::NotStarted
        );

        realm.publish(grid.props_ready.props_ready, true);
        assert_eq!(
            realm.value(grid.initial_scroll_phase),
            InitialScrollPhase::Scrolling
        );
        assert!(grid.state().items.is_empty());
        assert_eq!(realm.last(grid.dom_io.scroll_to), None);

        realm.advance_frame();
        assert_eq!(
            realm.last(grid.dom_io.scroll_to),
            Some(ScrollToOptions::to(600.0))
        );

        report(&grid, 600.0);
        assert_eq!(
            realm.value(grid.initial_scroll_phase),
            InitialScrollPhase::Settled
        );
        assert_eq!(
            grid.state().range(),
            Some(ListRange {
                start_index: 48,
                end_index: 71
            })
        );
    }

    #[test]
    fn test_initial_scroll_waits_for_dimensions() {
        let realm = Realm::new();
        let grid = GridSystem::<()>::new(&realm);
        realm.batch(|batch| {
            batch.publish(grid.total_count, 100);
            batch.publish(grid.initial_top_most_item_index, IndexLocation::new(50));
        });
        realm.publish(grid.props_ready.props_ready, true);
        assert_eq!(
            realm.value(grid.initial_scroll_phase),
            InitialScrollPhase::AwaitingDimensions
        );

        realm.batch(|batch| {
            batch.publish(grid.viewport_dimensions, VIEWPORT);
            batch.publish(grid.item_dimensions, ITEM);
        });
        assert_eq!(
            realm.value(grid.initial_scroll_phase),
            InitialScrollPhase::Scrolling
        );
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let original = grid(100, VIEWPORT, ITEM);
        report(&original, 500.0);
        let snapshot = original.snapshot();
        assert_eq!(
            snapshot,
            GridSnapshot {
                viewport: VIEWPORT,
                item: ITEM,
                gap: Gap::ZERO,
                scroll_top: 500.0
            }
        );
        let expected = original.state();
        assert_eq!(
            expected.range(),
            Some(ListRange {
                start_index: 40,
                end_index: 63
            })
        );

        let realm = Realm::new();
        let restored = GridSystem::<()>::new(&realm);
        realm.batch(|batch| {
            batch.publish(restored.total_count, 100);
            batch.publish(restored.initial_item_count, 8);
            batch.publish(restored.restore_state_from, Some(snapshot));
        });
        realm.publish(restored.props_ready.props_ready, true);
        assert!(realm.value(restored.state_restore_in_progress));
        assert_eq!(
            realm.last(restored.dom_io.scroll_to),
            Some(ScrollToOptions::to(500.0))
        );

        let states = Arc::new(AtomicUsize::new(0));
        let sink = states.clone();
        realm.handle_after(restored.grid_state, 0, move |_, _| {
            sink.fetch_add(1, Ordering::SeqCst);
        });
        let ranges = counter(&realm, restored.range_changed);

        // The first report reflects the jump itself.
        report(&restored, 500.0);
        realm.flush_ticks();
        assert!(realm.value(restored.state_restore_in_progress));
        assert_eq!(states.load(Ordering::SeqCst), 0);
        assert_eq!(ranges.load(Ordering::SeqCst), 0);

        report(&restored, 500.0);
        realm.flush_ticks();
        assert!(!realm.value(restored.state_restore_in_progress));
        assert!(states.load(Ordering::SeqCst) > 0);
        assert_eq!(ranges.load(Ordering::SeqCst), 1);
        assert_eq!(restored.state(), expected);
        assert_eq!(restored.snapshot(), snapshot);
    }

    #[test]
    fn test_window_rect_drives_viewport() {
        let grid = grid(100, Dimensions::ZERO, ITEM);
        let realm = grid.realm().clone();
        realm.publish(
            grid.window_scroller.window_viewport_rect,
            WindowViewportInfo {
                offset_top: 120.0,
                visible_width: 400.0,
                visible_height: 300.0,
            },
        );
        assert_eq!(realm.value(grid.viewport_dimensions), VIEWPORT);
        assert_eq!(indices(&grid.state()), vec![0, 1, 2, 3]);
    }
}
