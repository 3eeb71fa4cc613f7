//! Textual renderings of an Object.

use std::fmt::Write as _;

use docmine_shared::{Object, ObjectContent, TableContent};

/// Render an Object as the context block handed to a language model.
///
/// ```text
/// Filename: <stem>
/// Preceding: <above>
/// Succeeding: <below>
/// Date: <period,period>
/// Table Name: <title>        | Content:
/// Table Content:             | <text>
/// <column mapping as JSON>   |
/// ```
pub fn render_for_prompt(object: &Object) -> String {
    let mut out = String::new();
    let dates: Vec<&str> = object.date.iter().map(String::as_str).collect();

    let _ = writeln!(out, "Filename: {}", object.file_name);
    let _ = writeln!(out, "Preceding: {}", object.above);
    let _ = writeln!(out, "Succeeding: {}", object.below);
    let _ = writeln!(out, "Date: {}", dates.join(","));

    match &object.content {
        ObjectContent::Table(table) => {
            let mapping = serde_json::to_string(table).unwrap_or_default();
            let _ = writeln!(out, "Table Name: {}", object.title);
            let _ = writeln!(out, "Table Content:\n{mapping}");
        }
        ObjectContent::Text(text) => {
            let _ = writeln!(out, "Content:\n{text}");
        }
    }
    out
}

/// Render an Object for people: every field on its own line, tables drawn
/// as a bordered grid.
pub fn render_display(object: &Object) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Object ID: {}", object.object_id);
    let _ = writeln!(out, "File ID: {}", object.file_id);
    let _ = writeln!(out, "File Name: {}", object.file_name);
    let _ = writeln!(out, "Position: {}", object.position);
    let _ = writeln!(out, "Above: {}", object.above);
    let _ = writeln!(out, "Below: {}", object.below);
    let _ = writeln!(out, "Date: {}", join_set(&object.date));

    match &object.content {
        ObjectContent::Table(table) => {
            let _ = writeln!(out, "Title: {}", object.title);
            let _ = writeln!(out, "Content:\n{}", draw_table(table));
        }
        ObjectContent::Text(text) => {
            let _ = writeln!(out, "Content:\n{text}");
        }
    }
    let _ = writeln!(out, "Tags: {}", join_set(&object.tags));
    out
}

fn join_set(values: &std::collections::BTreeSet<String>) -> String {
    values.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// psql-style grid:
///
/// ```text
/// +--------+-------+
/// | region | sales |
/// |--------+-------|
/// | north  | 10    |
/// +--------+-------+
/// ```
pub fn draw_table(table: &TableContent) -> String {
    let headers: Vec<&str> = table.columns().map(|(name, _)| name).collect();
    let rows = table.rows();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            rows.iter()
                .map(|row| row[idx].chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let border = |left: char, joint: char, right: char| -> String {
        let mut line = String::new();
        line.push(left);
        for (idx, width) in widths.iter().enumerate() {
            if idx > 0 {
                line.push(joint);
            }
            line.push_str(&"-".repeat(width + 2));
        }
        line.push(right);
        line
    };
    let row_line = |cells: &[&str]| -> String {
        let mut line = String::from("|");
        for (cell, width) in cells.iter().zip(&widths) {
            let pad = width - cell.chars().count();
            let _ = write!(line, " {cell}{} |", " ".repeat(pad));
        }
        line
    };

    let mut lines = vec![
        border('+', '+', '+'),
        row_line(headers.as_slice()),
        border('|', '+', '|'),
    ];
    lines.extend(rows.iter().map(|row| row_line(row.as_slice())));
    lines.push(border('+', '+', '+'));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales_table() -> TableContent {
        TableContent::from_grid(&[
            vec!["region".into(), "sales".into()],
            vec!["north".into(), "10".into()],
            vec!["south".into(), "7".into()],
        ])
    }

    #[test]
    fn prompt_for_text() {
        let mut object = Object::text(3, 1, "Q1_report", 2, "Revenue rose.");
        object.above = "Intro".into();
        object.date.insert("March 2024".into());
        object.date.insert("April 2024".into());

        assert_eq!(
            render_for_prompt(&object),
            "Filename: Q1_report\nPreceding: Intro\nSucceeding: \nDate: April 2024,March 2024\nContent:\nRevenue rose.\n"
        );
    }

    #[test]
    fn prompt_for_table() {
        let mut object = Object::table(4, 1, "Q1_report", 3, "sales by region", sales_table());
        object.below = "Outro".into();

        assert_eq!(
            render_for_prompt(&object),
            "Filename: Q1_report\nPreceding: \nSucceeding: Outro\nDate: \nTable Name: sales by region\nTable Content:\n{\"region\":[\"north\",\"south\"],\"sales\":[\"10\",\"7\"]}\n"
        );
    }

    #[test]
    fn grid_is_aligned() {
        let drawn = draw_table(&sales_table());
        let expected = "\
+--------+-------+
| region | sales |
|--------+-------|
| north  | 10    |
| south  | 7     |
+--------+-------+";
        assert_eq!(drawn, expected);
    }

    #[test]
    fn display_lists_fields() {
        let mut object = Object::table(4, 1, "Q1_report", 3, "sales", sales_table());
        object.tags.insert("north".into());
        let shown = render_display(&object);
        assert!(shown.starts_with("Object ID: 4\nFile ID: 1\n"));
        assert!(shown.contains("Title: sales\n"));
        assert!(shown.contains("| north  | 10    |"));
        assert!(shown.ends_with("Tags: north\n"));
    }
}
