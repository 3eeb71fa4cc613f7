//! Separation of logical tables laid out as one visual table.
//!
//! Business documents often stack several small tables inside a single Word
//! table. A row with no numeric (or empty) cell is taken as a new header row
//! and starts a new sub-table.

use docmine_shared::TableContent;
use tracing::trace;

/// Whether a normalized cell counts as numeric: empty, or parses as a number.
pub fn is_numeric_cell(cell: &str) -> bool {
    cell.is_empty() || cell.parse::<f64>().is_ok()
}

fn is_numeric_row(row: &[String]) -> bool {
    row.iter().any(|cell| is_numeric_cell(cell))
}

/// Split a raw grid into row groups at every non-numeric row.
fn split_rows(grid: &[Vec<String>]) -> Vec<Vec<Vec<String>>> {
    let mut groups = Vec::new();
    let mut current: Vec<Vec<String>> = Vec::new();

    for row in grid {
        if !is_numeric_row(row) && !current.is_empty() {
            groups.push(std::mem::take(&mut current));
        }
        current.push(row.clone());
    }

    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

/// Split one table grid into its logical sub-tables.
///
/// Groups with fewer than two rows (a header with no data) are dropped. Row 0
/// of each retained group supplies the column names.
pub fn split_tables(grid: &[Vec<String>]) -> Vec<TableContent> {
    let groups = split_rows(grid);
    let total = groups.len();

    let tables: Vec<TableContent> = groups
        .iter()
        .filter(|group| group.len() >= 2)
        .map(|group| TableContent::from_grid(group))
        .collect();

    trace!(groups = total, retained = tables.len(), "split table grid");
    tables
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn numeric_cells() {
        assert!(is_numeric_cell(""));
        assert!(is_numeric_cell("42"));
        assert!(is_numeric_cell("-3.5"));
        assert!(is_numeric_cell("1e3"));
        assert!(!is_numeric_cell("north"));
        assert!(!is_numeric_cell("12%"));
    }

    #[test]
    fn stacked_tables_split_in_two() {
        let tables = split_tables(&grid(&[
            &["h1", "h2"],
            &["1", "2"],
            &["h3", "h4"],
            &["3", "4"],
        ]));
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].column("h1").unwrap(), ["1"]);
        assert_eq!(tables[0].row_count(), 1);
        assert_eq!(tables[1].column("h4").unwrap(), ["4"]);
        assert_eq!(tables[1].row_count(), 1);
    }

    #[test]
    fn lone_header_is_dropped() {
        assert!(split_tables(&grid(&[&["h1", "h2"]])).is_empty());
        assert!(split_tables(&[]).is_empty());
    }

    #[test]
    fn row_with_one_number_stays_in_table() {
        let tables = split_tables(&grid(&[
            &["region", "sales"],
            &["north", "10"],
            &["south", ""],
        ]));
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].column("region").unwrap(), ["north", "south"]);
    }

    #[test]
    fn header_only_group_between_tables_is_discarded() {
        let tables = split_tables(&grid(&[
            &["a", "b"],
            &["1", "2"],
            &["orphan", "header"],
            &["c", "d"],
            &["3", "4"],
        ]));
        assert_eq!(tables.len(), 2);
        assert!(tables[1].column("c").is_some());
        assert!(tables.iter().all(|t| t.column("orphan").is_none()));
    }

    #[test]
    fn leading_numeric_rows_form_their_own_group() {
        let tables = split_tables(&grid(&[&["1", "2"], &["3", "4"], &["x", "y"], &["5", "6"]]));
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].column("1").unwrap(), ["3"]);
    }
}
