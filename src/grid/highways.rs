use crate::geom::Coordinate;

/// First highway column (for vertical stripes) / row (for horizontal ones).
pub const START_HIGHWAY: usize = 2;
/// The far-side highway sits at `dimension - END_REF`.
pub const END_REF: usize = 3;
/// Trimmed length: a stripe spans `dimension - GAP` cells.
pub const GAP: usize = 4;

/// Derives the vertical highway cells of an `n` × `m` grid.
///
/// Vertical highways occupy columns `START_HIGHWAY` and `m - END_REF`,
/// each a single-cell-wide stripe of `n - GAP` rows starting at row
/// `(n - 1) / 2`. Grids with `n ≤ GAP` or too few columns carry no
/// vertical highways.
///
/// # Example
/// ```
/// use traffic_phase_optim::geom::Coordinate;
/// use traffic_phase_optim::grid::vertical_highway_cells;
/// let cells = vertical_highway_cells(8, 8);
/// // Columns 2 and 5, rows 3..=6.
/// assert_eq!(cells.len(), 8);
/// assert!(cells.contains(&Coordinate::new(3, 2)));
/// assert!(cells.contains(&Coordinate::new(6, 5)));
/// ```
pub fn vertical_highway_cells(n: usize, m: usize) -> Vec<Coordinate> {
    let span = n.saturating_sub(GAP);
    if span == 0 || m <= END_REF || START_HIGHWAY >= m {
        return Vec::new();
    }

    let start_row = (n - 1) / 2;
    let end_row = (start_row + span).min(n);
    let mut columns = vec![START_HIGHWAY, m - END_REF];
    columns.dedup();

    let mut cells = Vec::new();
    for &column in &columns {
        for row in start_row..end_row {
            cells.push(Coordinate::new(row as i32, column as i32));
        }
    }
    cells
}

/// Derives the horizontal highway cells of an `n` × `m` grid.
///
/// The transpose of [`vertical_highway_cells`]: rows `START_HIGHWAY` and
/// `n - END_REF`, columns `(m - 1) / 2 ..` spanning `m - GAP` cells.
pub fn horizontal_highway_cells(n: usize, m: usize) -> Vec<Coordinate> {
    let span = m.saturating_sub(GAP);
    if span == 0 || n <= END_REF || START_HIGHWAY >= n {
        return Vec::new();
    }

    let start_column = (m - 1) / 2;
    let end_column = (start_column + span).min(m);
    let mut rows = vec![START_HIGHWAY, n - END_REF];
    rows.dedup();

    let mut cells = Vec::new();
    for &row in &rows {
        for column in start_column..end_column {
            cells.push(Coordinate::new(row as i32, column as i32));
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_grid_stripes() {
        let vertical = vertical_highway_cells(8, 8);
        let horizontal = horizontal_highway_cells(8, 8);

        // Two columns x four rows each.
        assert_eq!(vertical.len(), 8);
        assert_eq!(horizontal.len(), 8);
        for row in 3..=6 {
            assert!(vertical.contains(&Coordinate::new(row, 2)));
            assert!(vertical.contains(&Coordinate::new(row, 5)));
        }
        for column in 3..=6 {
            assert!(horizontal.contains(&Coordinate::new(2, column)));
            assert!(horizontal.contains(&Coordinate::new(5, column)));
        }
    }

    #[test]
    fn test_tiny_grid_has_no_stripes() {
        assert!(vertical_highway_cells(3, 3).is_empty());
        assert!(horizontal_highway_cells(4, 4).is_empty());
    }

    #[test]
    fn test_coinciding_columns_are_deduplicated() {
        // m = 5: START_HIGHWAY == m - END_REF == 2, one column only.
        let vertical = vertical_highway_cells(8, 5);
        let columns: std::collections::HashSet<i32> =
            vertical.iter().map(|c| c.y).collect();
        assert_eq!(columns.len(), 1);
        assert_eq!(vertical.len(), 4);
    }
}
