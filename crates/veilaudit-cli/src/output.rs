use std::fmt::Display;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

/// Kind of status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Success,
    Error,
    Warn,
}

impl Tone {
    fn human(self, message: &str) -> String {
        match self {
            Tone::Success => format!("\u{2713} {message}"),
            Tone::Error => format!("\u{2717} Error: {message}"),
            Tone::Warn => format!("\u{26a0} Warning: {message}"),
        }
    }

    fn json(self, message: &str) -> serde_json::Value {
        match self {
            Tone::Success => serde_json::json!({"success": true, "message": message}),
            Tone::Error => serde_json::json!({"success": false, "error": message}),
            Tone::Warn => serde_json::json!({"level": "warning", "message": message}),
        }
    }
}

fn human_field(label: &str, value: &dyn Display) -> String {
    format!("  {:<18} {value}", format!("{label}:"))
}

/// Trait for formatting CLI output
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    /// Aligned `label: value` line
    fn field(&self, label: &str, value: &dyn Display);
    fn print_json(&self, value: &serde_json::Value);
}

/// Status marks on human lines, details indented below them
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("{}", Tone::Success.human(message));
    }
    fn error(&self, message: &str) {
        eprintln!("{}", Tone::Error.human(message));
    }
    fn warn(&self, message: &str) {
        eprintln!("{}", Tone::Warn.human(message));
    }
    fn info(&self, message: &str) {
        println!("  {message}");
    }
    fn field(&self, label: &str, value: &dyn Display) {
        println!("{}", human_field(label, value));
    }
    fn print_json(&self, _value: &serde_json::Value) {}
}

/// One JSON document per status line; detail lines are dropped
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!("{}", Tone::Success.json(message));
    }
    fn error(&self, message: &str) {
        eprintln!("{}", Tone::Error.json(message));
    }
    fn warn(&self, message: &str) {
        eprintln!("{}", Tone::Warn.json(message));
    }
    fn info(&self, _message: &str) {}
    fn field(&self, _label: &str, _value: &dyn Display) {}
    fn print_json(&self, value: &serde_json::Value) {
        println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Human => Box::new(HumanFormatter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_status_lines() {
        assert_eq!(Tone::Success.human("done"), "\u{2713} done");
        assert_eq!(Tone::Error.human("boom"), "\u{2717} Error: boom");
        assert_eq!(Tone::Warn.human("careful"), "\u{26a0} Warning: careful");
    }

    #[test]
    fn test_json_error_marks_failure() {
        let value = Tone::Error.json("boom");
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "boom");
    }

    #[test]
    fn test_fields_are_aligned() {
        let a = human_field("Risk tier", &"medium");
        let b = human_field("Refund withdrawn", &100);
        assert_eq!(a.find("medium"), b.find("100"));
    }
}
