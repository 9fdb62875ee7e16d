//! Output helpers shared by all commands

use clap::ValueEnum;
use marina_api_client::Payload;
use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// One JSON document on stdout
    Json,
}

/// Print a serializable value as JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success line in text mode
pub fn success(message: impl std::fmt::Display) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a decoded payload
pub fn print_payload(payload: Option<&Payload>, status: u16, format: OutputFormat) -> anyhow::Result<()> {
    match (payload, format) {
        (Some(Payload::Json(value)), _) => print_json(value),
        (Some(Payload::Text(text)), OutputFormat::Text) => {
            println!("{text}");
            Ok(())
        }
        (Some(Payload::Text(text)), OutputFormat::Json) => print_json(&Value::String(text.clone())),
        (Some(Payload::Empty) | None, OutputFormat::Text) => {
            println!("{}", format!("(empty response, status {status})").dimmed());
            Ok(())
        }
        (Some(Payload::Empty) | None, OutputFormat::Json) => print_json(&Value::Null),
    }
}

/// Dump the session's request metrics to stderr
pub fn print_metrics() {
    let report = marina_telemetry::metrics().export_json();
    match serde_json::to_string_pretty(&report) {
        Ok(json) => eprintln!("{}\n{json}", "Session metrics:".dimmed()),
        Err(e) => eprintln!("{} {e}", "Could not export metrics:".yellow()),
    }
}

/// Where to save a download
///
/// An explicit path wins; otherwise the server's file name (reduced to its
/// last component), then the last segment of the request path.
pub fn download_target(explicit: Option<&Path>, server_name: Option<&str>, request_path: &str) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    server_name
        .and_then(|name| Path::new(name).file_name())
        .map(PathBuf::from)
        .or_else(|| {
            request_path
                .split('?')
                .next()
                .and_then(|p| p.trim_end_matches('/').rsplit('/').next())
                .filter(|segment| !segment.is_empty())
                .map(PathBuf::from)
        })
        .unwrap_or_else(|| PathBuf::from("download.bin"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_target() {
        assert_eq!(
            download_target(Some(Path::new("out.pdf")), Some("invoice.pdf"), "x"),
            PathBuf::from("out.pdf")
        );
        assert_eq!(
            download_target(None, Some("../../etc/invoice.pdf"), "x"),
            PathBuf::from("invoice.pdf")
        );
        assert_eq!(
            download_target(None, None, "bookings/12/invoice?lang=en"),
            PathBuf::from("invoice")
        );
        assert_eq!(download_target(None, None, "/"), PathBuf::from("download.bin"));
    }
}
