//! Terminal output - run events and query rows

use mdrun_core::{LogSource, QueryResult, RunEvent, RunState};
use serde_json::Value;

/// Column width cap for table output
const MAX_CELL_WIDTH: usize = 40;

/// Print one run event as it arrives
pub fn print_event(event: &RunEvent) {
    match event {
        RunEvent::State(state) => match state {
            RunState::Failed(reason) => eprintln!("{} {}", state.symbol(), reason),
            other => println!("{} {}", other.symbol(), other.display_name()),
        },
        RunEvent::Log(entry) => match entry.source {
            LogSource::Build => println!("  {}", entry.content),
            LogSource::Container => println!("{}", entry.content),
            LogSource::System => println!("[mdrun] {}", entry.content),
        },
    }
}

/// Print query rows as JSON records
pub fn print_json(result: &QueryResult) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&result.to_records())?);
    Ok(())
}

/// Print query rows as an aligned table
pub fn print_table(result: &QueryResult) {
    if result.columns.is_empty() {
        println!("(no rows)");
        return;
    }
    for line in render_table(result) {
        println!("{}", line);
    }
    println!(
        "({} row{})",
        result.rows.len(),
        if result.rows.len() == 1 { "" } else { "s" }
    );
}

fn render_table(result: &QueryResult) -> Vec<String> {
    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(cell).collect())
        .collect();

    let widths: Vec<usize> = result
        .columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            cells
                .iter()
                .filter_map(|row| row.get(i))
                .map(|c| c.chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_row = |values: &[String]| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = *w))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(cells.len() + 2);
    lines.push(format_row(&result.columns));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in &cells {
        lines.push(format_row(row));
    }
    lines
}

fn cell(value: &Value) -> String {
    let text = match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.chars().count() > MAX_CELL_WIDTH {
        let cut: String = text.chars().take(MAX_CELL_WIDTH - 3).collect();
        format!("{}...", cut)
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_table() {
        let result = QueryResult {
            columns: vec!["id".to_string(), "name".to_string()],
            rows: vec![vec![json!(1), json!("alice")], vec![json!(22), Value::Null]],
        };

        assert_eq!(
            render_table(&result),
            vec!["id | name", "---+------", "1  | alice", "22 | NULL"]
        );
    }

    #[test]
    fn test_long_cell_truncated() {
        let long = "x".repeat(100);
        let text = cell(&json!(long));
        assert_eq!(text.chars().count(), MAX_CELL_WIDTH);
        assert!(text.ends_with("..."));
    }
}
