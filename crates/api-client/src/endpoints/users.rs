//! User profile endpoints

use super::auth::User;
use super::segment;
use crate::client::MarinaClient;
use crate::envelope::Envelope;
use crate::error::ApiResult;
use serde::Serialize;

/// Users API interface
#[derive(Clone, Debug)]
pub struct UsersApi {
    client: MarinaClient,
}

impl UsersApi {
    /// Create a new users API interface
    pub(crate) fn new(client: MarinaClient) -> Self {
        Self { client }
    }

    /// Public profile
    ///
    /// GET /users/{id}
    pub async fn get(&self, id: &str) -> Envelope<User> {
        self.client.get(&format!("users/{}", segment(id))).await
    }

    /// Update the current user's profile
    ///
    /// PUT /users/profile
    pub async fn update_profile(&self, changes: &ProfileUpdate) -> ApiResult<User> {
        self.client.put("users/profile", changes).await.into_data()
    }
}

/// Profile changes; unset fields are left alone
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    /// Given name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Family name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Contact phone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// Short bio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}
