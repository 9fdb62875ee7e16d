//! Booking endpoints

use super::{id_string, segment, with_query, Page};
use crate::client::MarinaClient;
use crate::decode::Download;
use crate::envelope::Envelope;
use crate::error::ApiResult;
use crate::request::ApiRequest;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Bookings API interface
#[derive(Clone, Debug)]
pub struct BookingsApi {
    client: MarinaClient,
}

impl BookingsApi {
    /// Create a new bookings API interface
    pub(crate) fn new(client: MarinaClient) -> Self {
        Self { client }
    }

    /// Bookings visible to the current user
    ///
    /// GET /bookings
    pub async fn list(&self, filters: &BookingFilters) -> Envelope<Page<Booking>> {
        let path = with_query(
            "bookings",
            &[
                ("status", filters.status.clone()),
                ("as", filters.role.clone()),
                ("page", filters.page.map(|p| p.to_string())),
            ],
        );
        self.client.get(&path).await
    }

    /// One booking
    ///
    /// GET /bookings/{id}
    pub async fn get(&self, id: &str) -> Envelope<Booking> {
        self.client.get(&format!("bookings/{}", segment(id))).await
    }

    /// Reserve a boat
    ///
    /// POST /bookings
    pub async fn create(&self, booking: &NewBooking) -> ApiResult<Booking> {
        self.client.post("bookings", booking).await.into_data()
    }

    /// Cancel a booking
    ///
    /// POST /bookings/{id}/cancel
    pub async fn cancel(&self, id: &str) -> Envelope<Booking> {
        self.client
            .send(ApiRequest::post(format!("bookings/{}/cancel", segment(id))))
            .await
    }

    /// Invoice document, usually a PDF
    ///
    /// GET /bookings/{id}/invoice
    pub async fn invoice(&self, id: &str) -> Envelope<Download> {
        self.client
            .download(&format!("bookings/{}/invoice", segment(id)))
            .await
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Booking list filters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingFilters {
    /// e.g. `pending`, `confirmed`, `cancelled`
    pub status: Option<String>,
    /// `owner` or `renter` perspective
    pub role: Option<String>,
    /// 1-based page
    pub page: Option<u32>,
}

/// A reservation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    /// Booking ID
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    /// Reserved boat
    #[serde(deserialize_with = "id_string")]
    pub boat_id: String,
    /// First day, ISO date
    pub start_date: String,
    /// Last day, ISO date
    pub end_date: String,
    /// Lifecycle status
    #[serde(default)]
    pub status: Option<String>,
    /// Total price
    #[serde(default)]
    pub total_price: Option<f64>,
    /// Any other fields the server sent
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// New reservation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    /// Boat to reserve
    pub boat_id: String,
    /// First day, ISO date
    pub start_date: String,
    /// Last day, ISO date
    pub end_date: String,
    /// Number of guests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guests: Option<u32>,
    /// Message to the owner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::error::{ApiError, ErrorKind};
    use marina_core::credentials::{CredentialPair, MemoryCredentialStore};
    use marina_core::retry::RetryConfig;
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> MarinaClient {
        let config = ClientConfig::default()
            .with_base_url(server.uri())
            .with_retry(RetryConfig::no_retry());
        let store = Arc::new(MemoryCredentialStore::with_pair(CredentialPair::new(
            "A1",
            Some("R1".into()),
        )));
        MarinaClient::with_store(config, store).unwrap()
    }

    #[test]
    fn test_booking_deserialize() {
        let booking: Booking = serde_json::from_value(json!({
            "id": "b-1",
            "boatId": 7,
            "startDate": "2026-07-01",
            "endDate": "2026-07-08",
            "status": "confirmed",
            "totalPrice": 2450.0
        }))
        .unwrap();

        assert_eq!(booking.boat_id, "7");
        assert_eq!(booking.status.as_deref(), Some("confirmed"));
    }

    #[tokio::test]
    async fn test_list_passes_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bookings"))
            .and(query_param("status", "pending"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let filters = BookingFilters {
            status: Some("pending".into()),
            ..BookingFilters::default()
        };
        let page = client.bookings().list(&filters).await.into_data().unwrap();

        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn test_missing_booking_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bookings/99"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let envelope = client.bookings().get("99").await;

        assert_eq!(envelope.status(), 404);
        let err = envelope.error().unwrap();
        assert_eq!(err.kind(), ErrorKind::Http);
        assert_eq!(err, &ApiError::http(404, "404 Not Found"));
    }

    #[tokio::test]
    async fn test_invoice_download() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bookings/12/invoice"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(b"%PDF".to_vec(), "application/pdf")
                    .insert_header(
                        "Content-Disposition",
                        r#"attachment; filename="invoice-12.pdf""#,
                    ),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let download = client.bookings().invoice("12").await.into_data().unwrap();

        assert_eq!(download.filename.as_deref(), Some("invoice-12.pdf"));
        assert_eq!(download.content_type.as_deref(), Some("application/pdf"));
    }

    #[tokio::test]
    async fn test_cancel() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bookings/b-1/cancel"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "b-1", "boatId": 7, "startDate": "2026-07-01",
                "endDate": "2026-07-08", "status": "cancelled"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let booking = client.bookings().cancel("b-1").await.into_data().unwrap();

        assert_eq!(booking.status.as_deref(), Some("cancelled"));
    }
}
