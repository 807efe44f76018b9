//! Terminal UI utilities.
//!
//! This module owns everything the tool prints: the [`Reporter`] sink the
//! walker and orchestrator log through, section separators, and a responsive
//! table with Unicode box-drawing characters used for the run summary.
//!
//! ## Components
//!
//! - `Reporter` - Severity-tagged logging sink (info, warn, error, success)
//! - `ConsoleReporter` - Colored, indented stdout rendering
//! - `BufferedReporter` - In-memory sink for tests and benchmarks
//! - `Table` - Auto-sizing table with headers and rows
//!
//! ## Example
//!
//! ```rust
//! use autobuild::ui::Table;
//!
//! let mut table = Table::new(&["Unit", "Build"]);
//! table.add_row(vec!["app1".to_string(), "ok".to_string()]);
//! table.print();
//! ```

use colored::*;
use std::cmp;
use std::sync::Mutex;

/// Severity of a reported line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
    Success,
}

/// Logging sink shared by the walker and every unit task.
///
/// Implementations must be safe to call from many threads at once; one
/// call produces one line.
pub trait Reporter: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
    fn success(&self, message: &str);

    /// Announces a unit of work that is about to start.
    fn step(&self, message: &str) {
        self.info(message);
    }
}

/// Renders reports on stdout with colored icons.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn info(&self, message: &str) {
        println!("    {}\t{}", "II".green(), message);
    }

    fn warn(&self, message: &str) {
        println!("    {}\t{}", "WA".yellow(), message);
    }

    fn error(&self, message: &str) {
        println!("    {}\t{}", "x".red().bold(), message);
    }

    fn success(&self, message: &str) {
        println!("    {}\t{}", "✓".green(), message);
    }

    fn step(&self, message: &str) {
        println!("    {}\t{}", "≫".yellow(), message);
    }
}

/// Collects reports in memory instead of printing them.
#[derive(Debug, Default)]
pub struct BufferedReporter {
    entries: Mutex<Vec<(Level, String)>>,
}

impl BufferedReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, level: Level, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((level, message.to_string()));
        }
    }

    /// Snapshot of every line reported so far, in call order.
    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Messages reported at `level`.
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message)
            .collect()
    }
}

impl Reporter for BufferedReporter {
    fn info(&self, message: &str) {
        self.push(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.push(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.push(Level::Error, message);
    }

    fn success(&self, message: &str) {
        self.push(Level::Success, message);
    }
}

const BANNER: &str = r"
    _       _        _         _ _    _
   /_\ _  _| |_ ___ | |__ _  _(_) |__| |
  / _ \ || |  _/ _ \| '_ \ || | | / _` |
 /_/ \_\_,_|\__\___/|_.__/\_,_|_|_\__,_|
";

pub fn print_banner() {
    println!("{}", BANNER.magenta());
    println!(
        "\t{} v{} - test, cross-compile and checksum every Go program in a tree\n",
        "autobuild".bold(),
        env!("CARGO_PKG_VERSION")
    );
}

/// Prints a section separator.
pub fn horizontal_line(title: &str) {
    println!(
        "{}",
        format!("============= {} =============", title).yellow()
    );
}

pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        if row.len() == self.headers.len() {
            self.rows.push(row);
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn print(&self) {
        if self.headers.is_empty() {
            return;
        }

        let term = console::Term::stdout();
        let (_term_height, term_width) = term.size();
        let col_widths = self.column_widths(term_width as usize);

        let make_sep = |left: &str, mid: &str, right: &str| -> String {
            let mut s = String::from("  ");
            s.push_str(left);
            for (i, width) in col_widths.iter().enumerate() {
                s.push_str(&"─".repeat(width + 2));
                if i < col_widths.len() - 1 {
                    s.push_str(mid);
                }
            }
            s.push_str(right);
            s
        };

        println!("{}", make_sep("┌", "┬", "┐"));

        print!("  │");
        for (i, header) in self.headers.iter().enumerate() {
            let width = col_widths[i];
            let truncated = console::truncate_str(header, width, "...");
            let padding = width.saturating_sub(cell_width(&truncated));
            print!(" {} {}│", truncated.bold(), " ".repeat(padding));
        }
        println!();

        println!("{}", make_sep("├", "┼", "┤"));

        for row in &self.rows {
            print!("  │");
            for (i, cell) in row.iter().enumerate() {
                let width = col_widths[i];
                let flat = single_line(cell);
                let truncated = console::truncate_str(&flat, width, "...");
                let padding = width.saturating_sub(cell_width(&truncated));
                print!(" {} {}│", truncated, " ".repeat(padding));
            }
            println!();
        }

        println!("{}", make_sep("└", "┴", "┘"));
    }

    /// Content width of every column, shrunk (widest first, never below 8)
    /// until the table fits in `max_width`.
    fn column_widths(&self, max_width: usize) -> Vec<usize> {
        let mut col_widths = vec![0; self.headers.len()];

        for (i, header) in self.headers.iter().enumerate() {
            col_widths[i] = cmp::max(col_widths[i], header.chars().count());
        }

        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                col_widths[i] = cmp::max(col_widths[i], cell_width(cell));
            }
        }

        let overhead = 3 + 3 * self.headers.len();
        let available = max_width.saturating_sub(overhead);
        let mut current_width: usize = col_widths.iter().sum();

        while current_width > available {
            let Some((max_idx, &max_val)) = col_widths
                .iter()
                .enumerate()
                .max_by_key(|(_, w)| **w)
            else {
                break;
            };
            if max_val <= 8 {
                break;
            }
            col_widths[max_idx] -= 1;
            current_width -= 1;
        }

        col_widths
    }
}

/// Cells are rendered on one line; control whitespace becomes a space.
fn single_line(cell: &str) -> String {
    cell.replace(['\n', '\r', '\t'], " ")
}

/// Columns a cell occupies on screen, ignoring color codes.
fn cell_width(cell: &str) -> usize {
    console::measure_text_width(&single_line(cell))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffered_reporter_keeps_order_and_levels() {
        let reporter = BufferedReporter::new();
        reporter.info("one");
        reporter.error("two");
        reporter.step("three");
        reporter.success("four");

        let entries = reporter.entries();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0], (Level::Info, "one".to_string()));
        // `step` falls back to `info` unless overridden
        assert_eq!(entries[2], (Level::Info, "three".to_string()));
        assert_eq!(reporter.messages(Level::Error), vec!["two".to_string()]);
    }

    #[test]
    fn test_table_rejects_mismatched_rows() {
        let mut table = Table::new(&["Unit", "Build"]);
        table.add_row(vec!["app".to_string()]);
        assert!(table.is_empty());
        table.add_row(vec!["app".to_string(), "ok".to_string()]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_column_widths_shrink_to_fit() {
        let mut table = Table::new(&["Unit", "Detail"]);
        table.add_row(vec!["a".repeat(40), "b".repeat(40)]);

        let wide = table.column_widths(200);
        assert_eq!(wide, vec![40, 40]);

        let narrow = table.column_widths(50);
        assert!(narrow.iter().sum::<usize>() <= 50 - 9);
        assert!(narrow.iter().all(|w| *w >= 8));
    }

    #[test]
    fn test_cell_width_ignores_color_and_newlines() {
        let passed = format!("{} 1.5s", "✓".green());
        assert_eq!(cell_width(&passed), 6);
        assert_eq!(single_line("error building\nlinux/arm64"), "error building linux/arm64");
    }
}
