use crate::domain::model::{DataSource, Fetched};
use crate::presentation::theme::Theme;
use serde_json::Value;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Warning,
    Error,
}

/// One-line user notification, the terminal counterpart of a toast.
pub fn notice(theme: &Theme, kind: NoticeKind, message: &str) -> String {
    let (icon, paint) = match kind {
        NoticeKind::Info => ("ℹ", theme.info),
        NoticeKind::Success => ("✔", theme.success),
        NoticeKind::Warning => ("⚠", theme.warning),
        NoticeKind::Error => ("✘", theme.error),
    };
    paint(&format!("{} {}", icon, message))
}

/// Human-readable size, e.g. `10 MB` or `1.5 KB`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    let rounded = (size * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

pub fn source_notice(theme: &Theme, source: DataSource) -> Option<String> {
    match source {
        DataSource::OfflineCache => Some(notice(
            theme,
            NoticeKind::Warning,
            "You are offline. Showing cached data.",
        )),
        DataSource::Cache | DataSource::Network => None,
    }
}

/// Render a fetched section as an indented tree.
pub fn format_section(theme: &Theme, title: &str, fetched: &Fetched) -> String {
    let mut output = String::new();
    let tag = match fetched.source {
        DataSource::Network => "[live]",
        DataSource::Cache => "[cached]",
        DataSource::OfflineCache => "[offline]",
    };
    writeln!(output, "{} {}", (theme.title)(title), (theme.line)(tag)).ok();

    // sections usually arrive as `{ "data": [...] }`
    let body = fetched.value.get("data").unwrap_or(&fetched.value);
    write_value(theme, &mut output, body, 1);
    output
}

fn write_value(theme: &Theme, output: &mut String, value: &Value, depth: usize) {
    let indent = "  ".repeat(depth);
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                if v.is_object() || v.is_array() {
                    writeln!(output, "{}{}:", indent, (theme.key)(k)).ok();
                    write_value(theme, output, v, depth + 1);
                } else {
                    writeln!(output, "{}{}: {}", indent, (theme.key)(k), (theme.value)(&scalar(v))).ok();
                }
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                if item.is_object() || item.is_array() {
                    if i > 0 {
                        writeln!(output, "{}{}", indent, (theme.line)("⸺⸺⸺")).ok();
                    }
                    write_value(theme, output, item, depth);
                } else {
                    writeln!(output, "{}• {}", indent, (theme.value)(&scalar(item))).ok();
                }
            }
        }
        other => {
            writeln!(output, "{}{}", indent, (theme.value)(&scalar(other))).ok();
        }
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}
