//! Command output
//!
//! A command describes its result through [`Render`] and hands it to the
//! formatter picked by `--format`. The human formatter prints the lines and
//! the JSON formatter prints the value, so command bodies do not branch on
//! the format.

use serde_json::Value;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// A command result printable in either format
pub trait Render {
    /// Terminal lines
    fn lines(&self) -> Vec<String>;
    /// The `--format json` document
    fn json(&self) -> Value;
}

/// A list of results; `empty` is printed when there are none
pub struct Listing<'a, T> {
    items: &'a [T],
    empty: &'static str,
}

impl<'a, T> Listing<'a, T> {
    pub fn new(items: &'a [T], empty: &'static str) -> Self {
        Self { items, empty }
    }
}

impl<T: Render> Render for Listing<'_, T> {
    fn lines(&self) -> Vec<String> {
        if self.items.is_empty() {
            return vec![self.empty.to_string()];
        }
        self.items.iter().flat_map(Render::lines).collect()
    }

    fn json(&self) -> Value {
        Value::Array(self.items.iter().map(Render::json).collect())
    }
}

pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    /// Prints a result
    fn show(&self, item: &dyn Render);
    /// Prints a result, then confirms with `message` in human output
    fn done(&self, message: &str, item: &dyn Render);
}

/// Checkmarks for people; `quiet` keeps only the confirmation lines
pub struct HumanFormatter {
    quiet: bool,
}

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {}", message);
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {}", message);
    }
    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} Warning: {}", message);
    }
    fn info(&self, message: &str) {
        if !self.quiet {
            println!("  {}", message);
        }
    }
    fn show(&self, item: &dyn Render) {
        for line in item.lines() {
            println!("{line}");
        }
    }
    fn done(&self, message: &str, item: &dyn Render) {
        if !self.quiet {
            self.show(item);
        }
        self.success(message);
    }
}

/// One JSON document per result on stdout; problems go to stderr
pub struct JsonFormatter;

impl JsonFormatter {
    fn print(value: &Value) {
        println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
    }
}

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        Self::print(&serde_json::json!({"success": true, "message": message}));
    }
    fn error(&self, message: &str) {
        eprintln!("{}", serde_json::json!({"success": false, "error": message}));
    }
    fn warn(&self, message: &str) {
        eprintln!("{}", serde_json::json!({"level": "warning", "message": message}));
    }
    fn info(&self, _message: &str) {}
    fn show(&self, item: &dyn Render) {
        Self::print(&item.json());
    }
    fn done(&self, _message: &str, item: &dyn Render) {
        self.show(item);
    }
}

pub fn get_formatter(format: OutputFormat, quiet: bool) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Human => Box::new(HumanFormatter { quiet }),
    }
}
