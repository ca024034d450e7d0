//! HTTP client for the portfolio content API.
//!
//! This module provides the `ApiClient` struct for fetching project and
//! skill content. Every endpoint returns a `{ success, data, error? }`
//! envelope; the client unwraps it and surfaces failures as `ApiError`.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;

use crate::models::{Project, ProjectCategory, Skill, SkillCategory, SkillWithProjects};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 10s fails fast enough for the retry/backoff path to stay responsive.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Response envelope shared by every content endpoint.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

/// API client for the portfolio content backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client rooted at the given base URL
    /// (e.g. `http://localhost:3001/api`).
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "GET");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to send GET request to {}", url))?;

        let response = Self::check_response(response).await?;

        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))?;

        if !envelope.success {
            let message = envelope
                .error
                .unwrap_or_else(|| "unspecified error".to_string());
            return Err(ApiError::Api(message).into());
        }

        envelope
            .data
            .ok_or_else(|| ApiError::InvalidResponse(format!("Missing data field from {}", url)).into())
    }

    // ===== Data Fetching Methods =====

    /// Fetch the full project list
    pub async fn fetch_projects(&self) -> Result<Vec<Project>> {
        self.get("/projects").await
    }

    /// Fetch a single project by id
    pub async fn fetch_project(&self, id: i64) -> Result<Project> {
        self.get(&format!("/projects/{}", id)).await
    }

    /// Fetch the project category list
    pub async fn fetch_project_categories(&self) -> Result<Vec<ProjectCategory>> {
        self.get("/projects/categories").await
    }

    /// Fetch the full skill list
    pub async fn fetch_skills(&self) -> Result<Vec<Skill>> {
        self.get("/skills").await
    }

    /// Fetch a single skill by id
    pub async fn fetch_skill(&self, id: i64) -> Result<Skill> {
        self.get(&format!("/skills/{}", id)).await
    }

    /// Fetch the skill category list
    pub async fn fetch_skill_categories(&self) -> Result<Vec<SkillCategory>> {
        self.get("/skills/categories").await
    }

    /// Fetch skills joined with their related projects
    pub async fn fetch_skills_with_projects(&self) -> Result<Vec<SkillWithProjects>> {
        self.get("/skills/with-projects").await
    }
}
