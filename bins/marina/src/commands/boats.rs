//! Boat listing commands

use crate::output::{self, OutputFormat};
use anyhow::Result;
use marina_api_client::endpoints::boats::{Boat, BoatFilters};
use marina_api_client::MarinaClient;
use owo_colors::OwoColorize;

/// Search listings
pub async fn list(
    client: &MarinaClient,
    location: Option<String>,
    capacity: Option<u32>,
    page: Option<u32>,
    format: OutputFormat,
) -> Result<()> {
    let filters = BoatFilters {
        location,
        capacity,
        page,
        ..BoatFilters::default()
    };
    let page = client.boats().list(&filters).await.into_data()?;

    if format == OutputFormat::Json {
        return output::print_json(&page);
    }

    if page.items.is_empty() {
        println!("{}", "No boats found".dimmed());
        return Ok(());
    }
    for boat in &page.items {
        print_summary(boat);
    }
    if let Some(total) = page.total {
        println!();
        println!("{}", format!("{} of {total} listings", page.items.len()).dimmed());
    }
    Ok(())
}

/// Show one listing
pub async fn get(client: &MarinaClient, id: &str, format: OutputFormat) -> Result<()> {
    let boat = client.boats().get(id).await.into_data()?;

    if format == OutputFormat::Json {
        return output::print_json(&boat);
    }

    print_summary(&boat);
    if let Some(description) = &boat.description {
        println!();
        println!("{description}");
    }
    for image in &boat.images {
        println!("  {}", image.dimmed());
    }
    Ok(())
}

fn print_summary(boat: &Boat) {
    let price = boat
        .price_per_day
        .map(|p| format!("{p:.0}/day"))
        .unwrap_or_default();
    let capacity = boat
        .capacity
        .map(|c| format!("{c} guests"))
        .unwrap_or_default();
    println!(
        "{:>6}  {}  {}  {}  {}",
        boat.id.dimmed(),
        boat.name.bold(),
        boat.location.as_deref().unwrap_or("-"),
        capacity,
        price.green()
    );
}
