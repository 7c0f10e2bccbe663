//! Pixel arithmetic for grids of uniformly sized cells.
//!
//! Every function here is pure. Inputs are sanitized instead of rejected: negative or
//! non-finite lengths count as zero, and a row always holds at least one item.

use crate::types::GridItem;

/// Width and height of the viewport or of a single item.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dimensions {
    /// Horizontal extent in pixels.
    pub width: f64,
    /// Vertical extent in pixels.
    pub height: f64,
}

impl Dimensions {
    /// Both extents zero: nothing measured yet.
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Creates dimensions from a width and a height.
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Spacing between grid cells.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Gap {
    /// Vertical spacing between rows.
    pub row: f64,
    /// Horizontal spacing between columns.
    pub column: f64,
}

impl Gap {
    /// No spacing.
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Creates a gap from the row and column spacing.
    pub const fn new(row: f64, column: f64) -> Self {
        Self { row, column }
    }
}

/// Offsets of the rendered block, measured from the top of the scrollable content.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GridLayout {
    /// Top edge of the first rendered row.
    pub top: f64,
    /// Bottom edge of the last rendered row.
    pub bottom: f64,
}

fn sanitize(px: f64) -> f64 {
    if px.is_finite() && px > 0.0 { px } else { 0.0 }
}

/// Number of items that fit in one row. Never less than one.
///
/// The item width is floored first, matching how measured sizes get rounded to whole
/// pixels.
pub fn items_per_row(viewport_width: f64, item_width: f64, column_gap: f64) -> usize {
    let gap = sanitize(column_gap);
    let cell = sanitize(item_width).floor() + gap;
    if cell <= 0.0 {
        return 1;
    }
    let count = ((sanitize(viewport_width) + gap) / cell).floor();
    if count.is_finite() && count >= 1.0 {
        count as usize
    } else {
        1
    }
}

/// Offset of the row containing `index`. The row gap only separates rows, so the first
/// row starts at zero.
pub fn item_top(viewport: Dimensions, gap: Gap, item: Dimensions, index: usize) -> f64 {
    let per_row = items_per_row(viewport.width, item.width, gap.column);
    let row = (index / per_row) as f64;
    let row_gap = sanitize(gap.row);
    let top = row * sanitize(item.height) + (row - 1.0).max(0.0) * row_gap;
    if top > 0.0 { top + row_gap } else { top }
}

/// Top and bottom edges of the rows spanned by `items`. Zero when nothing is rendered
/// or the item height is unknown.
pub fn grid_layout<D>(
    viewport: Dimensions,
    gap: Gap,
    item: Dimensions,
    items: &[GridItem<D>],
) -> GridLayout {
    let (Some(first), Some(last)) = (items.first(), items.last()) else {
        return GridLayout::default();
    };
    if sanitize(item.height) == 0.0 {
        return GridLayout::default();
    }
    GridLayout {
        top: item_top(viewport, gap, item, first.index),
        bottom: item_top(viewport, gap, item, last.index) + item.height,
    }
}

/// Number of rows needed for `total_count` items.
pub fn row_count(total_count: usize, per_row: usize) -> usize {
    if total_count == 0 || per_row == 0 {
        0
    } else {
        total_count.div_ceil(per_row)
    }
}

/// Height of the whole content: every row plus the gaps between them.
pub fn total_height(rows: usize, item_height: f64, row_gap: f64) -> f64 {
    if rows == 0 {
        return 0.0;
    }
    let rows = rows as f64;
    rows * sanitize(item_height) + (rows - 1.0) * sanitize(row_gap)
}

/// Rounds halves towards positive infinity, the way scroll offsets are snapped.
pub(crate) fn round_half_up(px: f64) -> f64 {
    (px + 0.5).floor()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn items(indices: &[usize]) -> Vec<GridItem<()>> {
        indices
            .iter()
            .map(|index| GridItem {
                index: *index,
                data: None,
            })
            .collect()
    }

    #[rstest]
    #[case(400.0, 100.0, 0.0, 4)]
    #[case(400.0, 100.0, 10.0, 3)]
    #[case(400.0, 99.7, 0.0, 4)]
    #[case(50.0, 100.0, 0.0, 1)]
    #[case(0.0, 0.0, 0.0, 1)]
    #[case(-10.0, 100.0, 5.0, 1)]
    #[case(f64::NAN, 100.0, 0.0, 1)]
    #[case(400.0, f64::INFINITY, 0.0, 1)]
    #[case(1000.0, 0.4, 0.0, 1)]
    fn test_items_per_row(
        #[case] viewport_width: f64,
        #[case] item_width: f64,
        #[case] gap: f64,
        #[case] expected: usize,
    ) {
        assert_eq!(items_per_row(viewport_width, item_width, gap), expected);
    }

    #[rstest]
    fn test_items_per_row_is_at_least_one(
        #[values(0.0, 1.0, 33.3, 800.0, 1e9)] viewport_width: f64,
        #[values(0.0, 0.5, 1.0, 120.0, 1e12)] item_width: f64,
        #[values(0.0, 2.5, 40.0)] gap: f64,
    ) {
        assert!(items_per_row(viewport_width, item_width, gap) >= 1);
    }

    #[rstest]
    #[case(0, 0.0)]
    #[case(3, 0.0)]
    #[case(4, 60.0)]
    #[case(9, 120.0)]
    #[case(12, 180.0)]
    fn test_item_top_counts_gaps_between_rows(#[case] index: usize, #[case] expected: f64) {
        let viewport = Dimensions::new(400.0, 300.0);
        let item = Dimensions::new(100.0, 50.0);
        let gap = Gap::new(10.0, 0.0);
        assert_eq!(item_top(viewport, gap, item, index), expected);
    }

    #[test]
    fn test_grid_layout() {
        let viewport = Dimensions::new(400.0, 300.0);
        let item = Dimensions::new(100.0, 50.0);
        let layout = grid_layout(viewport, Gap::ZERO, item, &items(&[8, 9, 10, 11, 12]));
        assert_eq!(layout, GridLayout { top: 100.0, bottom: 200.0 });
    }

    #[test]
    fn test_grid_layout_degenerate_inputs() {
        let viewport = Dimensions::new(400.0, 300.0);
        let item = Dimensions::new(100.0, 50.0);
        assert_eq!(
            grid_layout(viewport, Gap::ZERO, item, &items(&[])),
            GridLayout::default()
        );
        assert_eq!(
            grid_layout(viewport, Gap::ZERO, Dimensions::new(100.0, 0.0), &items(&[4, 5])),
            GridLayout::default()
        );
    }

    #[test]
    fn test_row_count_and_total_height() {
        assert_eq!(row_count(0, 4), 0);
        assert_eq!(row_count(100, 4), 25);
        assert_eq!(row_count(101, 4), 26);
        assert_eq!(total_height(0, 50.0, 10.0), 0.0);
        assert_eq!(total_height(25, 50.0, 0.0), 1250.0);
        assert_eq!(total_height(3, 50.0, 10.0), 170.0);
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(-2.6), -3.0);
        assert_eq!(round_half_up(7.0), 7.0);
    }
}
