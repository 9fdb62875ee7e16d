//! Session commands: login, logout, whoami

use crate::output::{self, OutputFormat};
use anyhow::Result;
use marina_api_client::endpoints::auth::LoginRequest;
use marina_api_client::MarinaClient;
use serde_json::json;

/// Log in and store the session
pub async fn login(client: &MarinaClient, email: &str, password: &str, format: OutputFormat) -> Result<()> {
    let user = client
        .auth()
        .login(&LoginRequest::new(email, password))
        .await
        .into_data()?;

    match format {
        OutputFormat::Json => output::print_json(&user),
        OutputFormat::Text => {
            output::success(format!("Logged in as {}", user.display_name()));
            Ok(())
        }
    }
}

/// End the session
pub async fn logout(client: &MarinaClient, format: OutputFormat) -> Result<()> {
    client.auth().logout().await?;

    match format {
        OutputFormat::Json => output::print_json(&json!({ "loggedOut": true })),
        OutputFormat::Text => {
            output::success("Logged out");
            Ok(())
        }
    }
}

/// Show the current user
pub async fn whoami(client: &MarinaClient, format: OutputFormat) -> Result<()> {
    let user = client.auth().me().await.into_data()?;

    match format {
        OutputFormat::Json => output::print_json(&user),
        OutputFormat::Text => {
            println!("{}", user.display_name());
            if let Some(email) = &user.email {
                println!("  email: {email}");
            }
            if let Some(role) = &user.role {
                println!("  role:  {role}");
            }
            Ok(())
        }
    }
}
