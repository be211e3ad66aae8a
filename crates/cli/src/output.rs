//! Output formatting for CLI

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// Plain text format
    Plain,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

fn table<T: TableDisplay>(rows: impl IntoIterator<Item = Vec<String>>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(T::headers());
    for row in rows {
        table.add_row(row);
    }
    table
}

fn plain_lines<T: TableDisplay>(item: &T) -> Vec<String> {
    T::headers()
        .iter()
        .zip(item.row())
        .map(|(header, value)| format!("{}: {}", header, value))
        .collect()
}

/// Print a single item
pub fn print_item<T: Serialize + TableDisplay>(item: &T, format: OutputFormat) {
    match format {
        OutputFormat::Table => println!("{}", table::<T>([item.row()])),
        OutputFormat::Json => print_json(item),
        OutputFormat::Plain => {
            for line in plain_lines(item) {
                println!("{}", line);
            }
        }
    }
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    if items.is_empty() && format != OutputFormat::Json {
        println!("No items found.");
        return;
    }

    match format {
        OutputFormat::Table => println!("{}", table::<T>(items.iter().map(TableDisplay::row))),
        OutputFormat::Json => print_json(items),
        OutputFormat::Plain => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    println!("---");
                }
                for line in plain_lines(item) {
                    println!("{}", line);
                }
            }
        }
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => print_error(&format!("Failed to serialize output: {}", e)),
    }
}

/// Print a simple message
pub fn print_message(message: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "message": message })),
        _ => println!("{}", message),
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("✅ {}", message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("❌ {}", message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    eprintln!("⚠️  {}", message);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pair(&'static str, u32);

    impl TableDisplay for Pair {
        fn headers() -> Vec<&'static str> {
            vec!["Name", "Count"]
        }

        fn row(&self) -> Vec<String> {
            vec![self.0.to_string(), self.1.to_string()]
        }
    }

    #[test]
    fn test_plain_lines_pair_headers_with_values() {
        assert_eq!(plain_lines(&Pair("a", 2)), vec!["Name: a", "Count: 2"]);
    }

    #[test]
    fn test_table_contains_rows() {
        let rendered = table::<Pair>([Pair("first", 1).row(), Pair("second", 2).row()]).to_string();
        assert!(rendered.contains("Name"));
        assert!(rendered.contains("first"));
        assert!(rendered.contains("second"));
    }
}
