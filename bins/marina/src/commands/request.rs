//! Raw access: GET any path, download any path

use crate::output::{self, OutputFormat};
use anyhow::{Context, Result};
use marina_api_client::{ApiRequest, Download, MarinaClient};
use serde_json::json;
use std::path::Path;

/// GET `path` and print whatever comes back
pub async fn get(client: &MarinaClient, path: &str, format: OutputFormat) -> Result<()> {
    let envelope = client.send_raw(ApiRequest::get(path)).await;
    let status = envelope.status();
    let payload = envelope.into_result()?;
    output::print_payload(payload.as_ref(), status, format)
}

/// Download `path` to disk
pub async fn download(
    client: &MarinaClient,
    path: &str,
    target: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let download = client.download(path).await.into_data()?;
    save(&download, target, path, format)
}

/// Write a download and report where it went
pub fn save(download: &Download, target: Option<&Path>, request_path: &str, format: OutputFormat) -> Result<()> {
    let destination = output::download_target(target, download.filename.as_deref(), request_path);
    std::fs::write(&destination, &download.bytes)
        .with_context(|| format!("Failed to write {}", destination.display()))?;

    match format {
        OutputFormat::Json => output::print_json(&json!({
            "path": destination.display().to_string(),
            "bytes": download.len(),
            "contentType": download.content_type,
        })),
        OutputFormat::Text => {
            output::success(format!(
                "Saved {} bytes to {}",
                download.len(),
                destination.display()
            ));
            Ok(())
        }
    }
}
