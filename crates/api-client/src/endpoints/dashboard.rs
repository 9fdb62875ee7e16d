//! Dashboard summaries

use super::bookings::Booking;
use crate::client::MarinaClient;
use crate::envelope::Envelope;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Dashboard API interface
#[derive(Clone, Debug)]
pub struct DashboardApi {
    client: MarinaClient,
}

impl DashboardApi {
    /// Create a new dashboard API interface
    pub(crate) fn new(client: MarinaClient) -> Self {
        Self { client }
    }

    /// Owner summary: fleet, earnings, upcoming bookings
    ///
    /// GET /dashboard/owner
    pub async fn owner(&self) -> Envelope<OwnerDashboard> {
        self.client.get("dashboard/owner").await
    }

    /// Renter summary: trips and favorites
    ///
    /// GET /dashboard/renter
    pub async fn renter(&self) -> Envelope<RenterDashboard> {
        self.client.get("dashboard/renter").await
    }
}

/// Owner dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OwnerDashboard {
    /// Listed boats
    pub total_boats: u32,
    /// Confirmed or pending bookings
    pub active_bookings: u32,
    /// Lifetime earnings
    pub total_earnings: f64,
    /// Next bookings across the fleet
    pub upcoming_bookings: Vec<Booking>,
    /// Any other fields the server sent
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Renter dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenterDashboard {
    /// Trips not yet started
    pub upcoming_trips: Vec<Booking>,
    /// Finished trips
    pub past_trips: Vec<Booking>,
    /// Saved boat IDs
    pub favorite_boat_ids: Vec<Value>,
    /// Any other fields the server sent
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
