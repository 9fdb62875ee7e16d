//! Boat listing endpoints

use super::{id_string, opt_id_string, segment, with_query, Page};
use crate::client::MarinaClient;
use crate::envelope::Envelope;
use crate::error::ApiResult;
use crate::request::FormPayload;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Boats API interface
#[derive(Clone, Debug)]
pub struct BoatsApi {
    client: MarinaClient,
}

impl BoatsApi {
    /// Create a new boats API interface
    pub(crate) fn new(client: MarinaClient) -> Self {
        Self { client }
    }

    /// Search listings
    ///
    /// GET /boats
    pub async fn list(&self, filters: &BoatFilters) -> Envelope<Page<Boat>> {
        self.client.get(&filters.to_path()).await
    }

    /// One listing
    ///
    /// GET /boats/{id}
    pub async fn get(&self, id: &str) -> Envelope<Boat> {
        self.client.get(&format!("boats/{}", segment(id))).await
    }

    /// Create a listing
    ///
    /// POST /boats
    pub async fn create(&self, boat: &NewBoat) -> ApiResult<Boat> {
        self.client.post("boats", boat).await.into_data()
    }

    /// Update a listing
    ///
    /// PUT /boats/{id}
    pub async fn update(&self, id: &str, changes: &BoatUpdate) -> ApiResult<Boat> {
        self.client
            .put(&format!("boats/{}", segment(id)), changes)
            .await
            .into_data()
    }

    /// Remove a listing
    ///
    /// DELETE /boats/{id}
    pub async fn delete(&self, id: &str) -> Envelope<Value> {
        self.client.delete(&format!("boats/{}", segment(id))).await
    }

    /// Upload photos as one multipart request, one `images` part per file
    ///
    /// POST /boats/{id}/images
    pub async fn upload_images(&self, id: &str, images: Vec<ImageUpload>) -> Envelope<Value> {
        let form = images.into_iter().fold(FormPayload::new(), |form, image| {
            form.file("images", image.file_name, image.bytes, image.mime.as_deref())
        });
        self.client
            .upload(&format!("boats/{}/images", segment(id)), form)
            .await
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Listing search filters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoatFilters {
    /// Marina or city
    pub location: Option<String>,
    /// Boat type, e.g. `sailboat`
    pub boat_type: Option<String>,
    /// Minimum guests
    pub capacity: Option<u32>,
    /// Minimum daily price
    pub min_price: Option<f64>,
    /// Maximum daily price
    pub max_price: Option<f64>,
    /// 1-based page
    pub page: Option<u32>,
    /// Page size
    pub page_size: Option<u32>,
}

impl BoatFilters {
    /// Create empty filters
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by location
    #[must_use]
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Filter by boat type
    #[must_use]
    pub fn boat_type(mut self, boat_type: impl Into<String>) -> Self {
        self.boat_type = Some(boat_type.into());
        self
    }

    /// Minimum guest capacity
    #[must_use]
    pub fn capacity(mut self, capacity: u32) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Daily price range
    #[must_use]
    pub fn price_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    /// Page and page size
    #[must_use]
    pub fn page(mut self, page: u32, page_size: u32) -> Self {
        self.page = Some(page);
        self.page_size = Some(page_size);
        self
    }

    fn to_path(&self) -> String {
        with_query(
            "boats",
            &[
                ("location", self.location.clone()),
                ("type", self.boat_type.clone()),
                ("capacity", self.capacity.map(|c| c.to_string())),
                ("minPrice", self.min_price.map(|p| p.to_string())),
                ("maxPrice", self.max_price.map(|p| p.to_string())),
                ("page", self.page.map(|p| p.to_string())),
                ("pageSize", self.page_size.map(|p| p.to_string())),
            ],
        )
    }
}

/// A boat listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Boat {
    /// Listing ID
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    /// Display name
    pub name: String,
    /// Long description
    #[serde(default)]
    pub description: Option<String>,
    /// Boat type
    #[serde(default, rename = "type", alias = "boatType")]
    pub boat_type: Option<String>,
    /// Marina or city
    #[serde(default)]
    pub location: Option<String>,
    /// Maximum guests
    #[serde(default)]
    pub capacity: Option<u32>,
    /// Daily price
    #[serde(default)]
    pub price_per_day: Option<f64>,
    /// Photo URLs
    #[serde(default)]
    pub images: Vec<String>,
    /// Owner's user ID
    #[serde(default, deserialize_with = "opt_id_string")]
    pub owner_id: Option<String>,
    /// Any other fields the server sent
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// New listing
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBoat {
    /// Display name
    pub name: String,
    /// Long description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Boat type
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub boat_type: Option<String>,
    /// Marina or city
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Maximum guests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    /// Daily price
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_per_day: Option<f64>,
}

/// Partial update; unset fields are left alone
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoatUpdate {
    /// Display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Long description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Marina or city
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Maximum guests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    /// Daily price
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_per_day: Option<f64>,
}

/// A photo to upload
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// File name reported to the server
    pub file_name: String,
    /// Image bytes
    pub bytes: Bytes,
    /// MIME type, if known
    pub mime: Option<String>,
}

impl ImageUpload {
    /// Create an upload, guessing the MIME type from the extension
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let file_name = file_name.into();
        let mime = mime_for(&file_name).map(str::to_string);
        Self {
            file_name,
            bytes: bytes.into(),
            mime,
        }
    }
}

fn mime_for(file_name: &str) -> Option<&'static str> {
    let ext = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::error::ApiError;
    use marina_core::credentials::{CredentialPair, MemoryCredentialStore};
    use marina_core::retry::RetryConfig;
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{body_json, header, method, path, query_param};
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
    fn test_filters_to_path() {
        let filters = BoatFilters::new().location("Split").capacity(6).page(2, 20);
        assert_eq!(filters.to_path(), "boats?location=Split&capacity=6&page=2&pageSize=20");
        assert_eq!(BoatFilters::new().to_path(), "boats");
    }

    #[test]
    fn test_boat_deserialize() {
        let boat: Boat = serde_json::from_value(json!({
            "id": 7,
            "name": "Sea Breeze",
            "type": "sailboat",
            "pricePerDay": 350.0,
            "ownerId": 3,
            "rating": 4.8
        }))
        .unwrap();

        assert_eq!(boat.id, "7");
        assert_eq!(boat.boat_type.as_deref(), Some("sailboat"));
        assert_eq!(boat.price_per_day, Some(350.0));
        assert_eq!(boat.owner_id.as_deref(), Some("3"));
        assert!(boat.images.is_empty());
        assert_eq!(boat.extra["rating"], 4.8);
    }

    #[test]
    fn test_mime_guess() {
        assert_eq!(ImageUpload::new("deck.JPG", vec![0_u8]).mime.as_deref(), Some("image/jpeg"));
        assert!(ImageUpload::new("notes", vec![0_u8]).mime.is_none());
    }

    #[tokio::test]
    async fn test_list_with_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/boats"))
            .and(query_param("location", "Split"))
            .and(header("Authorization", "Bearer A1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": 1, "name": "Sea Breeze"}],
                "total": 1
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let page = client
            .boats()
            .list(&BoatFilters::new().location("Split"))
            .await
            .into_data()
            .unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "Sea Breeze");
        assert_eq!(page.total, Some(1));
    }

    #[tokio::test]
    async fn test_create_raises_on_error_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/boats"))
            .and(body_json(json!({"name": "Sea Breeze", "capacity": 8})))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "message": "Validation failed",
                "errors": {"pricePerDay": ["Price is required"]}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let new_boat = NewBoat {
            name: "Sea Breeze".into(),
            capacity: Some(8),
            ..NewBoat::default()
        };

        let err = client.boats().create(&new_boat).await.unwrap_err();

        match err {
            ApiError::Validation { status, message, errors } => {
                assert_eq!(status, 422);
                assert_eq!(message, "Validation failed");
                assert_eq!(errors[0].field, "pricePerDay");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_uses_put() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/boats/7"))
            .and(body_json(json!({"pricePerDay": 400.0})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7, "name": "Sea Breeze", "pricePerDay": 400.0})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let changes = BoatUpdate {
            price_per_day: Some(400.0),
            ..BoatUpdate::default()
        };

        let boat = client.boats().update("7", &changes).await.unwrap();
        assert_eq!(boat.price_per_day, Some(400.0));
    }

    #[tokio::test]
    async fn test_upload_images_is_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/boats/7/images"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"uploaded": 2})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let envelope = client
            .boats()
            .upload_images(
                "7",
                vec![
                    ImageUpload::new("deck.jpg", vec![1_u8, 2, 3]),
                    ImageUpload::new("cabin.png", vec![4_u8, 5]),
                ],
            )
            .await;

        assert_eq!(envelope.status(), 201);

        let requests = server.received_requests().await.unwrap();
        let content_type = requests[0].headers.get("content-type").unwrap().to_str().unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary="));
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains(r#"filename="deck.jpg""#));
        assert!(body.contains(r#"filename="cabin.png""#));
    }
}
