//! Availability calendar endpoints

use super::{segment, with_query};
use crate::client::MarinaClient;
use crate::envelope::Envelope;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Availability API interface
#[derive(Clone, Debug)]
pub struct AvailabilityApi {
    client: MarinaClient,
}

impl AvailabilityApi {
    /// Create a new availability API interface
    pub(crate) fn new(client: MarinaClient) -> Self {
        Self { client }
    }

    /// Calendar for a date range (ISO dates, inclusive)
    ///
    /// GET /boats/{id}/availability?from=&to=
    pub async fn get(&self, boat_id: &str, from: &str, to: &str) -> Envelope<Vec<AvailabilityDay>> {
        let path = with_query(
            &format!("boats/{}/availability", segment(boat_id)),
            &[("from", Some(from.to_string())), ("to", Some(to.to_string()))],
        );
        self.client.get(&path).await
    }

    /// Replace availability for the given days
    ///
    /// PUT /boats/{id}/availability
    pub async fn set(&self, boat_id: &str, days: &[AvailabilityDay]) -> Envelope<Value> {
        self.client
            .put(
                &format!("boats/{}/availability", segment(boat_id)),
                &json!({ "days": days }),
            )
            .await
    }

    /// Block a date range
    ///
    /// POST /boats/{id}/availability/block
    pub async fn block(&self, boat_id: &str, block: &BlockDates) -> Envelope<Value> {
        self.client
            .post(&format!("boats/{}/availability/block", segment(boat_id)), block)
            .await
    }
}

/// One calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityDay {
    /// ISO date
    pub date: String,
    /// Bookable
    pub available: bool,
    /// Price override for this day
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

/// Dates withheld from booking
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDates {
    /// First day, ISO date
    pub start_date: String,
    /// Last day, ISO date
    pub end_date: String,
    /// Owner's note
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
