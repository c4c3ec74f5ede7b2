//! Dispatch trace format module
//!
//! Supports two formats for the per-request `method:path` trace line:
//! - `text` (timestamped, optionally ANSI-colored)
//! - `json` (JSON structured logging)

use chrono::Local;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Trace entry written once per response
#[derive(Debug, Clone)]
pub struct DispatchTrace {
    /// Response timestamp
    pub time: chrono::DateTime<Local>,
    /// Serving process
    pub pid: u32,
    /// Lowercase request method
    pub method: String,
    /// Normalized request path
    pub path: String,
    /// Response status code
    pub status: u16,
}

impl DispatchTrace {
    /// Create a new trace entry with current timestamp
    pub fn new(method: &str, path: &str, status: u16) -> Self {
        Self {
            time: Local::now(),
            pid: std::process::id(),
            method: method.to_string(),
            path: path.to_string(),
            status,
        }
    }

    /// Only a plain 200 counts as success; everything else goes to the error channel
    pub const fn is_success(&self) -> bool {
        self.status == 200
    }

    /// `method:path` key identifying the route
    pub fn key(&self) -> String {
        format!("{}:{}", self.method, self.path)
    }

    /// Format the entry according to the configured format
    pub fn format(&self, format: &str, colored: bool) -> String {
        match format {
            "json" => self.format_json(),
            _ => self.format_text(colored),
        }
    }

    fn format_text(&self, colored: bool) -> String {
        let key = if colored {
            let color = if self.is_success() { GREEN } else { RED };
            format!("{color}{}{RESET}", self.key())
        } else {
            self.key()
        };
        format!(
            "[{}] [{}] {} {}",
            self.time.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.pid,
            key,
            self.status
        )
    }

    fn format_json(&self) -> String {
        serde_json::json!({
            "time": self.time.to_rfc3339(),
            "pid": self.pid,
            "route": self.key(),
            "status": self.status,
            "outcome": if self.is_success() { "success" } else { "error" },
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_text_plain() {
        let trace = DispatchTrace::new("post", "hello", 200);
        let line = trace.format("text", false);
        assert!(line.contains("post:hello 200"));
        assert!(line.contains(&format!("[{}]", std::process::id())));
        assert!(!line.contains('\x1b'));
    }

    #[test]
    fn test_format_text_colors_by_outcome() {
        let ok = DispatchTrace::new("post", "hello", 200).format("text", true);
        assert!(ok.contains("\x1b[32mpost:hello\x1b[0m"));

        let missing = DispatchTrace::new("get", "nope", 404).format("text", true);
        assert!(missing.contains("\x1b[31mget:nope\x1b[0m"));
    }

    #[test]
    fn test_format_json() {
        let trace = DispatchTrace::new("get", "hello", 405);
        let value: serde_json::Value = serde_json::from_str(&trace.format("json", true)).unwrap();
        assert_eq!(value["route"], "get:hello");
        assert_eq!(value["status"], 405);
        assert_eq!(value["outcome"], "error");
    }

    #[test]
    fn test_empty_path_key() {
        let trace = DispatchTrace::new("get", "", 404);
        assert_eq!(trace.key(), "get:");
        assert!(!trace.is_success());
    }
}
