//! Booking commands

use crate::commands::request;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use marina_api_client::endpoints::bookings::BookingFilters;
use marina_api_client::MarinaClient;
use owo_colors::OwoColorize;
use std::path::Path;

/// List bookings
pub async fn list(client: &MarinaClient, status: Option<String>, format: OutputFormat) -> Result<()> {
    let filters = BookingFilters {
        status,
        ..BookingFilters::default()
    };
    let page = client.bookings().list(&filters).await.into_data()?;

    if format == OutputFormat::Json {
        return output::print_json(&page);
    }

    if page.items.is_empty() {
        println!("{}", "No bookings".dimmed());
    }
    for booking in &page.items {
        println!(
            "{:>6}  boat {}  {} → {}  {}",
            booking.id.dimmed(),
            booking.boat_id,
            booking.start_date,
            booking.end_date,
            booking.status.as_deref().unwrap_or("-").yellow()
        );
    }
    Ok(())
}

/// Download an invoice
pub async fn invoice(client: &MarinaClient, id: &str, target: Option<&Path>, format: OutputFormat) -> Result<()> {
    let download = client.bookings().invoice(id).await.into_data()?;
    request::save(&download, target, &format!("invoice-{id}.pdf"), format)
}
