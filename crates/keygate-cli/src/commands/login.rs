//! Login command - obtain a token from a running gateway.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use super::endpoint;
use crate::ui;

#[derive(Debug, Deserialize)]
struct LoginReply {
    access_token: String,
    expires_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorReply {
    error: String,
}

/// Log in and print the access token.
///
/// # Errors
///
/// Returns error if the gateway is unreachable, rejects the login, or sends
/// a malformed reply.
pub async fn run_login(username: &str, password: Option<String>, url: Option<String>) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => ui::prompts::password("Password")?,
    };

    let target = endpoint(url.as_deref(), "/login");
    let response = reqwest::Client::new()
        .post(&target)
        .json(&json!({ "username": username, "password": password }))
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .with_context(|| format!("Failed to reach {target}"))?;

    let status = response.status();
    if status.is_success() {
        let reply: LoginReply = response.json().await.context("Malformed login reply")?;
        ui::success(&format!("Logged in as {username}"));
        if let Some(expires_at) = reply.expires_at {
            ui::kv("Expires", &expires_at);
        }
        println!("{}", reply.access_token);
    } else {
        let body = response.text().await.unwrap_or_default();
        bail!(rejection_message(status, &body));
    }

    Ok(())
}

fn rejection_message(status: StatusCode, body: &str) -> String {
    let message = serde_json::from_str::<ErrorReply>(body)
        .map_or_else(|_| status.to_string(), |reply| reply.error);
    format!("Login failed ({}): {message}", status.as_u16())
}
