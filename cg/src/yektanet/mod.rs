//! Yektanet ad platform integration
//!
//! The consumer publishes confirmed plans through the [`AdPlatform`]
//! trait; [`YektanetClient`] is the real implementation against the
//! panel's internal API.

use async_trait::async_trait;
use thiserror::Error;

mod client;
pub mod targeting;

pub use client::YektanetClient;
pub use targeting::{category_code, segment_id, CATEGORY_MAP, SEGMENT_MAP};

use crate::domain::{AdDescription, CampaignPlan};

/// Errors from ad platform operations
#[derive(Debug, Error)]
pub enum AdPlatformError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Ad has no image to upload: {0}")]
    MissingImage(String),
}

/// Ad platform operations the publication pipeline needs
#[async_trait]
pub trait AdPlatform: Send + Sync {
    /// Create a paused campaign shell; returns the server-assigned id
    async fn create_campaign(&self, plan: &CampaignPlan) -> Result<i64, AdPlatformError>;

    /// Generate a creative image from a prompt; returns the image URL
    async fn generate_ad_image(&self, prompt: &str) -> Result<String, AdPlatformError>;

    /// Create one ad inside a campaign; returns the server-assigned ad id.
    /// The ad's image URL must already be populated.
    async fn create_ad(&self, campaign_id: i64, ad: &AdDescription) -> Result<i64, AdPlatformError>;
}
