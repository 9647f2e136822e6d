//! CampaignPlan record
//!
//! The planner's structured proposal: targeting, budget and creative
//! descriptions, subject to human approval. A plan is created once per
//! session and revised in place across feedback rounds. During publication
//! each [`AdDescription`] records its server-assigned `created_ad_id` the
//! moment the ad exists - that marker is what makes retrying the
//! publication task safe.

use std::collections::HashMap;

use docstore::{IndexValue, Record, now_ms};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::id::generate_id;

/// Yektanet call-to-action length limit (characters, not bytes)
pub const MAX_CTA_CHARS: usize = 13;

/// Campaign format on the ad platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CampaignType {
    #[default]
    Native,
    Banner,
}

impl std::fmt::Display for CampaignType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Banner => write!(f, "banner"),
        }
    }
}

/// How the ad creative image is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSource {
    /// Generated from `prompt` via the platform's image facilitator
    Generate,
    /// Supplied by the advertiser as `url`
    UserAsset,
}

/// Ad creative image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdImage {
    pub source: ImageSource,
    /// Generation prompt (source = generate)
    #[serde(default)]
    pub prompt: Option<String>,
    /// Image location; for generated images this is persisted the moment
    /// generation succeeds, before the ad itself is created
    #[serde(default)]
    pub url: Option<String>,
}

/// One ad within a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdDescription {
    pub title: String,
    pub landing_url: String,
    pub image: AdImage,
    /// At most [`MAX_CTA_CHARS`] characters
    pub call_to_action: String,
    /// Idempotency marker: once non-null this ad is never recreated
    #[serde(default)]
    pub created_ad_id: Option<i64>,
}

/// Keyword / segment / category targeting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TargetingConfig {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub user_segments: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Plan content as produced by the planner - no identity, no publication
/// progress. Revision rounds replace the content wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDraft {
    #[serde(rename = "type")]
    pub campaign_type: CampaignType,
    pub name: String,
    pub business_description: String,
    pub description: String,
    pub target_audience_description: String,
    /// Daily budget in toman
    pub budget: i64,
    pub bidding_strategy: String,
    /// Bid per click in toman
    pub bid_toman: i64,
    pub targeting_config: TargetingConfig,
    pub ads_description: Vec<AdDescription>,
}

impl PlanDraft {
    /// Schema-level validation applied to every planner output
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("plan name must not be empty".to_string());
        }
        if self.budget <= 0 {
            return Err("budget must be positive".to_string());
        }
        if self.bid_toman <= 0 {
            return Err("bid must be positive".to_string());
        }
        if self.ads_description.is_empty() {
            return Err("plan must describe at least one ad".to_string());
        }
        for (i, ad) in self.ads_description.iter().enumerate() {
            if ad.call_to_action.chars().count() > MAX_CTA_CHARS {
                return Err(format!(
                    "ad #{}: call to action exceeds {} characters",
                    i + 1,
                    MAX_CTA_CHARS
                ));
            }
            if ad.created_ad_id.is_some() {
                return Err(format!("ad #{}: planner must not set created_ad_id", i + 1));
            }
            if ad.image.source == ImageSource::Generate && ad.image.prompt.is_none() {
                return Err(format!("ad #{}: generated image requires a prompt", i + 1));
            }
            if ad.image.source == ImageSource::UserAsset && ad.image.url.is_none() {
                return Err(format!("ad #{}: user asset image requires a url", i + 1));
            }
        }
        Ok(())
    }
}

/// A structured campaign proposal awaiting approval and publication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignPlan {
    /// Unique identifier; stable across feedback revisions
    pub id: String,

    /// Session of the originating CampaignRequest
    pub session_id: String,

    #[serde(rename = "type")]
    pub campaign_type: CampaignType,

    pub name: String,
    pub business_description: String,
    pub description: String,
    pub target_audience_description: String,

    /// Daily budget in toman
    pub budget: i64,
    pub bidding_strategy: String,
    /// Bid per click in toman
    pub bid_toman: i64,

    pub targeting_config: TargetingConfig,

    /// Ordered; publication processes these strictly in plan order
    pub ads_description: Vec<AdDescription>,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl CampaignPlan {
    /// Materialize a validated draft as a new plan
    pub fn from_draft(session_id: impl Into<String>, draft: PlanDraft) -> Result<Self, String> {
        draft.validate()?;
        let session_id = session_id.into();
        debug!(%session_id, plan_name = %draft.name, "CampaignPlan::from_draft: called");
        let now = now_ms();
        Ok(Self {
            id: generate_id("plan", &draft.name),
            session_id,
            campaign_type: draft.campaign_type,
            name: draft.name,
            business_description: draft.business_description,
            description: draft.description,
            target_audience_description: draft.target_audience_description,
            budget: draft.budget,
            bidding_strategy: draft.bidding_strategy,
            bid_toman: draft.bid_toman,
            targeting_config: draft.targeting_config,
            ads_description: draft.ads_description,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace the plan content with a revised draft, keeping identity.
    ///
    /// Only legal before publication starts (no ad may carry a
    /// created_ad_id yet).
    pub fn apply_draft(&mut self, draft: PlanDraft) -> Result<(), String> {
        draft.validate()?;
        if self.ads_description.iter().any(|ad| ad.created_ad_id.is_some()) {
            return Err("cannot revise a plan whose ads are already being published".to_string());
        }
        debug!(%self.id, plan_name = %draft.name, "CampaignPlan::apply_draft: called");
        self.campaign_type = draft.campaign_type;
        self.name = draft.name;
        self.business_description = draft.business_description;
        self.description = draft.description;
        self.target_audience_description = draft.target_audience_description;
        self.budget = draft.budget;
        self.bidding_strategy = draft.bidding_strategy;
        self.bid_toman = draft.bid_toman;
        self.targeting_config = draft.targeting_config;
        self.ads_description = draft.ads_description;
        self.updated_at = now_ms();
        Ok(())
    }

    /// Index of the first ad still missing its created_ad_id
    pub fn first_pending_ad(&self) -> Option<usize> {
        self.ads_description.iter().position(|ad| ad.created_ad_id.is_none())
    }

    /// True once every ad carries a created_ad_id
    pub fn all_ads_created(&self) -> bool {
        self.first_pending_ad().is_none()
    }

    /// Persist an image reference onto an ad
    pub fn set_ad_image_url(&mut self, index: usize, url: impl Into<String>) {
        if let Some(ad) = self.ads_description.get_mut(index) {
            ad.image.url = Some(url.into());
            self.updated_at = now_ms();
        }
    }

    /// Record the server-assigned id for an ad. The marker is write-once:
    /// a second call for the same ad is ignored.
    pub fn mark_ad_created(&mut self, index: usize, ad_id: i64) {
        if let Some(ad) = self.ads_description.get_mut(index) {
            if ad.created_ad_id.is_none() {
                ad.created_ad_id = Some(ad_id);
                self.updated_at = now_ms();
            }
        }
    }
}

impl Record for CampaignPlan {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn collection_name() -> &'static str {
        "campaign_plans"
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("session_id".to_string(), IndexValue::String(self.session_id.clone()));
        fields.insert(
            "type".to_string(),
            IndexValue::String(self.campaign_type.to_string()),
        );
        fields
    }
}

#[cfg(test)]
pub(crate) fn sample_draft(ad_count: usize) -> PlanDraft {
    let ads = (0..ad_count)
        .map(|i| AdDescription {
            title: format!("Ad {}", i + 1),
            landing_url: "https://example.ir".to_string(),
            image: AdImage {
                source: ImageSource::Generate,
                prompt: Some(format!("creative {}", i + 1)),
                url: None,
            },
            call_to_action: "خرید کنید".to_string(),
            created_ad_id: None,
        })
        .collect();
    PlanDraft {
        campaign_type: CampaignType::Native,
        name: "کمپین کافه".to_string(),
        business_description: "specialty coffee shop".to_string(),
        description: "drive walk-ins".to_string(),
        target_audience_description: "young professionals".to_string(),
        budget: 1_000_000,
        bidding_strategy: "cpc".to_string(),
        bid_toman: 2_200,
        targeting_config: TargetingConfig {
            keywords: vec!["قهوه".to_string()],
            user_segments: vec!["غذا و نوشیدنی".to_string()],
            categories: vec!["غذا و نوشیدنی".to_string()],
        },
        ads_description: ads,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_draft() {
        let plan = CampaignPlan::from_draft("sess-1", sample_draft(2)).unwrap();
        assert!(plan.id.contains("-plan-"));
        assert_eq!(plan.ads_description.len(), 2);
        assert!(plan.first_pending_ad() == Some(0));
        assert!(!plan.all_ads_created());
    }

    #[test]
    fn test_draft_rejects_long_cta() {
        let mut draft = sample_draft(1);
        draft.ads_description[0].call_to_action = "a".repeat(MAX_CTA_CHARS + 1);
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_draft_accepts_persian_cta_at_limit() {
        let mut draft = sample_draft(1);
        // 13 Persian characters are more than 13 bytes; the limit is chars
        draft.ads_description[0].call_to_action = "خ".repeat(MAX_CTA_CHARS);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_draft_rejects_no_ads() {
        let draft = sample_draft(0);
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_draft_rejects_generate_without_prompt() {
        let mut draft = sample_draft(1);
        draft.ads_description[0].image.prompt = None;
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_draft_rejects_preset_ad_id() {
        let mut draft = sample_draft(1);
        draft.ads_description[0].created_ad_id = Some(7);
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_apply_draft_keeps_identity() {
        let mut plan = CampaignPlan::from_draft("sess-1", sample_draft(1)).unwrap();
        let id = plan.id.clone();

        let mut revised = sample_draft(2);
        revised.name = "کمپین دوم".to_string();
        plan.apply_draft(revised).unwrap();

        assert_eq!(plan.id, id);
        assert_eq!(plan.session_id, "sess-1");
        assert_eq!(plan.name, "کمپین دوم");
        assert_eq!(plan.ads_description.len(), 2);
    }

    #[test]
    fn test_apply_draft_refused_once_publishing() {
        let mut plan = CampaignPlan::from_draft("sess-1", sample_draft(2)).unwrap();
        plan.mark_ad_created(0, 101);
        assert!(plan.apply_draft(sample_draft(1)).is_err());
    }

    #[test]
    fn test_mark_ad_created_is_write_once() {
        let mut plan = CampaignPlan::from_draft("sess-1", sample_draft(2)).unwrap();
        plan.mark_ad_created(0, 101);
        plan.mark_ad_created(0, 999);
        assert_eq!(plan.ads_description[0].created_ad_id, Some(101));
        assert_eq!(plan.first_pending_ad(), Some(1));

        plan.mark_ad_created(1, 102);
        assert!(plan.all_ads_created());
    }

    #[test]
    fn test_set_ad_image_url() {
        let mut plan = CampaignPlan::from_draft("sess-1", sample_draft(1)).unwrap();
        plan.set_ad_image_url(0, "https://cdn.example/img.png");
        assert_eq!(
            plan.ads_description[0].image.url.as_deref(),
            Some("https://cdn.example/img.png")
        );
    }
}
