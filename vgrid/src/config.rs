//! Host-facing grid configuration.

use derive_setters::Setters;

use crate::{
    error::GridError,
    geometry::{Dimensions, Gap},
    grid::GridSystem,
    scroll_seek::ScrollSeekConfiguration,
    size_range::{Overscan, ViewportIncrease},
    types::{GridData, GridSnapshot, IndexLocation, ScrollParent},
};

/// Configuration of a grid, applied with [`GridProps::apply`].
///
/// ```
/// use vgrid::{Gap, GridProps, GridSystem, IndexLocation, Overscan};
/// use vgrid_reactive::Realm;
///
/// let realm = Realm::new();
/// let grid = GridSystem::new(&realm);
/// GridProps::default()
///     .total_count(1_000)
///     .data(vec!["a"; 1_000])
///     .gap(Gap::new(8.0, 8.0))
///     .overscan(Overscan::Uniform(200.0))
///     .initial_top_most_item_index(IndexLocation::new(120))
///     .apply(&grid)
///     .unwrap();
/// assert!(realm.value(grid.props_ready.props_ready));
/// ```
#[derive(Clone, Setters)]
pub struct GridProps<D> {
    /// Number of items in the collection.
    pub total_count: usize,
    /// Items rendered before anything is measured. Useful for server-side first paint.
    pub initial_item_count: usize,
    /// Item payloads, attached to rendered items by index.
    #[setters(strip_option, into)]
    pub data: Option<GridData<D>>,
    /// Cell spacing.
    pub gap: Gap,
    /// Extra pixels rendered beyond the viewport.
    pub overscan: Overscan,
    /// Virtual viewport enlargement.
    pub increase_viewport_by: ViewportIncrease,
    /// Item shown at the top after mount.
    #[setters(into)]
    pub initial_top_most_item_index: IndexLocation,
    /// Snapshot restored at mount.
    #[setters(strip_option)]
    pub restore_state_from: Option<GridSnapshot>,
    /// Whether the window is the scroll container.
    pub use_window_scroll: bool,
    /// Scroll ancestor chosen by the host.
    #[setters(strip_option)]
    pub custom_scroll_parent: Option<ScrollParent>,
    /// Placeholder mode for fast scrolling.
    #[setters(skip)]
    pub scroll_seek_configuration: Option<ScrollSeekConfiguration>,
    /// Distance from the top that still counts as at the top.
    pub at_top_threshold: f64,
    /// Distance from the bottom that still counts as at the bottom.
    pub at_bottom_threshold: f64,
}

impl<D> GridProps<D> {
    /// Enables placeholder mode.
    pub fn scroll_seek_configuration(mut self, configuration: ScrollSeekConfiguration) -> Self {
        self.scroll_seek_configuration = Some(configuration);
        self
    }

    /// Checks every pixel length.
    ///
    /// # Errors
    ///
    /// Returns the first negative or non-finite length.
    pub fn validate(&self) -> Result<(), GridError> {
        check_gap("gap", self.gap)?;
        match self.overscan {
            Overscan::Uniform(px) => {
                GridError::check_length("overscan", px)?;
            }
            Overscan::Directional { main, reverse } => {
                GridError::check_length("overscan.main", main)?;
                GridError::check_length("overscan.reverse", reverse)?;
            }
        }
        match self.increase_viewport_by {
            ViewportIncrease::Uniform(px) => {
                GridError::check_length("increase_viewport_by", px)?;
            }
            ViewportIncrease::Split { top, bottom } => {
                GridError::check_length("increase_viewport_by.top", top)?;
                GridError::check_length("increase_viewport_by.bottom", bottom)?;
            }
        }
        GridError::check_length("at_top_threshold", self.at_top_threshold)?;
        GridError::check_length("at_bottom_threshold", self.at_bottom_threshold)?;
        GridError::check_length(
            "initial_top_most_item_index.offset",
            self.initial_top_most_item_index.offset.abs(),
        )?;
        if let Some(snapshot) = &self.restore_state_from {
            check_dimensions("restore_state_from.viewport", snapshot.viewport)?;
            check_dimensions("restore_state_from.item", snapshot.item)?;
            check_gap("restore_state_from.gap", snapshot.gap)?;
            GridError::check_length("restore_state_from.scroll_top", snapshot.scroll_top)?;
        }
        Ok(())
    }
}

fn check_gap(field: &'static str, gap: Gap) -> Result<(), GridError> {
    GridError::check_length(field, gap.row)?;
    GridError::check_length(field, gap.column)?;
    Ok(())
}

fn check_dimensions(field: &'static str, dimensions: Dimensions) -> Result<(), GridError> {
    GridError::check_length(field, dimensions.width)?;
    GridError::check_length(field, dimensions.height)?;
    Ok(())
}

impl<D> GridProps<D>
where
    D: Clone + Send + Sync + 'static,
{
    /// Publishes every prop into `grid` in one pass, then marks the props as ready.
    ///
    /// # Errors
    ///
    /// Nothing is published when [`validate`](Self::validate) fails.
    pub fn apply(&self, grid: &GridSystem<D>) -> Result<(), GridError> {
        self.validate()?;
        tracing::debug!(
            total_count = self.total_count,
            initial_item_count = self.initial_item_count,
            use_window_scroll = self.use_window_scroll,
            restore = self.restore_state_from.is_some(),
            "applying grid props"
        );
        let realm = grid.realm();
        realm.batch(|batch| {
            batch.publish(grid.total_count, self.total_count);
            batch.publish(grid.initial_item_count, self.initial_item_count);
            batch.publish(grid.data, self.data.clone());
            batch.publish(grid.gap, self.gap);
            batch.publish(grid.size_range.overscan, self.overscan);
            batch.publish(grid.size_range.increase_viewport_by, self.increase_viewport_by);
            batch.publish(
                grid.initial_top_most_item_index,
                self.initial_top_most_item_index,
            );
            batch.publish(grid.restore_state_from, self.restore_state_from);
            batch.publish(grid.window_scroller.use_window_scroll, self.use_window_scroll);
            batch.publish(
                grid.window_scroller.custom_scroll_parent,
                self.custom_scroll_parent,
            );
            batch.publish(
                grid.scroll_seek.configuration,
                self.scroll_seek_configuration.clone(),
            );
            batch.publish(grid.state_flags.at_top_threshold, self.at_top_threshold);
            batch.publish(
                grid.state_flags.at_bottom_threshold,
                self.at_bottom_threshold,
            );
        });
        realm.publish(grid.props_ready.props_ready, true);
        Ok(())
    }
}

impl<D> Default for GridProps<D> {
    fn default() -> Self {
        Self {
            total_count: 0,
            initial_item_count: 0,
            data: None,
            gap: Gap::ZERO,
            overscan: Overscan::default(),
            increase_viewport_by: ViewportIncrease::default(),
            initial_top_most_item_index: IndexLocation::default(),
            restore_state_from: None,
            use_window_scroll: false,
            custom_scroll_parent: None,
            scroll_seek_configuration: None,
            at_top_threshold: 0.0,
            at_bottom_threshold: 4.0,
        }
    }
}
