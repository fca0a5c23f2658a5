//! Terminal rendering of the student list.
//!
//! Pure functions over the in-memory list: no sorting, filtering or
//! pagination happens here.

use std::fmt::Write as _;

use crate::student::Student;

const HEADERS: [&str; 4] = ["Name", "Position", "Level", "Action"];

/// Navigation target for editing a record.
#[must_use]
pub fn edit_path(student: &Student) -> String {
    format!("/edit/{}", student.id)
}

/// The actions cell for a row: edit target and delete command.
#[must_use]
pub fn actions(student: &Student) -> String {
    format!("Edit {}  Delete", edit_path(student))
}

fn row(student: &Student) -> [String; 4] {
    [
        student.name.clone(),
        student.position.clone().unwrap_or_default(),
        student.level.clone(),
        actions(student),
    ]
}

/// Render the list as a table, one row per record.
///
/// An empty list renders the header only.
#[must_use]
pub fn render_table(students: &[Student]) -> String {
    let rows: Vec<[String; 4]> = students.iter().map(row).collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for r in &rows {
        for (width, cell) in widths.iter_mut().zip(r) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    write_line(&mut out, &HEADERS.map(str::to_string), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("-+-"));
    for r in &rows {
        write_line(&mut out, r, &widths);
    }
    out
}

fn write_line(out: &mut String, cells: &[String; 4], widths: &[usize; 4]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect();
    let _ = writeln!(out, "{}", padded.join(" | ").trim_end());
}

/// Render a single record as labelled lines.
#[must_use]
pub fn render_detail(student: &Student) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "ID:        {}", student.id);
    let _ = writeln!(out, "Name:      {}", student.name);
    let _ = writeln!(
        out,
        "Position:  {}",
        student.position.as_deref().unwrap_or("-")
    );
    let _ = writeln!(out, "Level:     {}", student.level);
    let _ = writeln!(out, "Created:   {}", student.created_at.to_rfc3339());
    let _ = writeln!(out, "Updated:   {}", student.updated_at.to_rfc3339());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::student::NewStudent;

    fn student(name: &str, position: Option<&str>, level: &str) -> Student {
        Student::new(
            NewStudent {
                name: Some(name.to_string()),
                position: position.map(str::to_string),
                level: Some(level.to_string()),
            }
            .validate()
            .unwrap(),
        )
    }

    #[test]
    fn test_empty_renders_header_only() {
        let table = render_table(&[]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Name | Position | Level | Action");
    }

    #[test]
    fn test_one_row_per_record() {
        let students = vec![
            student("Ana", Some("Captain"), "L1"),
            student("Bo", None, "L2"),
        ];
        let table = render_table(&students);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[2].starts_with("Ana"));
        assert!(lines[2].contains("Captain"));
        assert!(lines[3].starts_with("Bo "));
    }

    #[test]
    fn test_rows_keep_list_order() {
        let students = vec![student("Zed", None, "L1"), student("Amy", None, "L1")];
        let table = render_table(&students);
        let zed = table.find("Zed").unwrap();
        let amy = table.find("Amy").unwrap();
        assert!(zed < amy);
    }

    #[test]
    fn test_actions_link_to_edit_route() {
        let s = student("Ana", None, "L1");
        let table = render_table(std::slice::from_ref(&s));
        assert!(table.contains(&format!("/edit/{}", s.id)));
        assert!(table.contains("Delete"));
    }

    #[test]
    fn test_columns_aligned() {
        let students = vec![
            student("A", None, "L1"),
            student("A much longer name", None, "L1"),
        ];
        let table = render_table(&students);
        let positions: Vec<usize> = table
            .lines()
            .filter(|l| !l.starts_with('-'))
            .map(|l| l.find(" | ").unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_render_detail() {
        let s = student("Ana", None, "L1");
        let detail = render_detail(&s);
        assert!(detail.contains(&s.id.to_string()));
        assert!(detail.contains("Name:      Ana"));
        assert!(detail.contains("Position:  -"));
    }
}
