//! CampaignRequest record
//!
//! The advertiser-facing intake: business profile, goal, audience, budget
//! and landing details. Requests are frozen after creation - only the
//! pipeline status field ever changes, via [`CampaignRequest::set_status`].

use std::collections::HashMap;

use docstore::{IndexValue, Record, now_ms};
use serde::{Deserialize, Serialize};

use super::id::generate_id;

/// Iranian provinces accepted as campaign locations
pub const IRAN_PROVINCES: &[&str] = &[
    "آذربایجان شرقی",
    "آذربایجان غربی",
    "اردبیل",
    "اصفهان",
    "البرز",
    "ایلام",
    "بوشهر",
    "تهران",
    "چهارمحال و بختیاری",
    "خراسان جنوبی",
    "خراسان رضوی",
    "خراسان شمالی",
    "خوزستان",
    "زنجان",
    "سمنان",
    "سیستان و بلوچستان",
    "فارس",
    "قزوین",
    "قم",
    "کردستان",
    "کرمان",
    "کرمانشاه",
    "کهگیلویه و بویراحمد",
    "گلستان",
    "گیلان",
    "لرستان",
    "مازندران",
    "مرکزی",
    "هرمزگان",
    "همدان",
    "یزد",
];

/// Where the campaign sends clicks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landing {
    /// Address of the landing (URL, phone number, channel handle)
    pub address: String,
    /// Kind of landing (webpage, telegram, instagram, ...)
    #[serde(rename = "type")]
    pub kind: String,
}

/// The advertiser's business
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Business {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A prior marketing effort, used to ground the planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketingExperience {
    pub is_traditional: bool,
    pub is_digital: bool,
    pub description: String,
    pub spent_budget: String,
    pub feedback: String,
}

/// Pipeline progress of a request, reflected for the advertiser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    New,
    /// A plan draft exists and awaits review
    Planned,
    /// The plan was approved; publication is underway or done
    Confirmed,
    /// Plan generation or publication failed terminally
    Failed,
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Planned => write!(f, "planned"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// An advertiser's campaign request - created once, read-only thereafter
/// except for `status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignRequest {
    /// Unique identifier
    pub id: String,

    /// Conversation / session this request came from
    pub session_id: String,

    /// Advertiser id on Yektanet
    pub advertiser_id: i64,

    pub business: Business,

    /// Advertising or marketing goal
    pub goal: String,

    pub target_audience: String,

    /// Province names; validated against [`IRAN_PROVINCES`]
    pub locations: Vec<String>,

    /// Daily budget in toman
    pub daily_budget: i64,

    /// Total budget in toman
    pub total_budget: i64,

    pub landing: Landing,

    #[serde(default)]
    pub experiences: Vec<MarketingExperience>,

    pub status: RequestStatus,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

/// Payload for creating a request: everything except identity and status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestIntake {
    pub advertiser_id: i64,
    pub business: Business,
    pub goal: String,
    pub target_audience: String,
    pub locations: Vec<String>,
    pub daily_budget: i64,
    pub total_budget: i64,
    pub landing: Landing,
    #[serde(default)]
    pub experiences: Vec<MarketingExperience>,
}

impl CampaignRequest {
    /// Build a new request from validated intake data
    pub fn new(session_id: impl Into<String>, intake: RequestIntake) -> Result<Self, String> {
        let session_id = session_id.into();
        validate_intake(&intake)?;
        let now = now_ms();
        Ok(Self {
            id: generate_id("req", &intake.business.name),
            session_id,
            advertiser_id: intake.advertiser_id,
            business: intake.business,
            goal: intake.goal,
            target_audience: intake.target_audience,
            locations: intake.locations,
            daily_budget: intake.daily_budget,
            total_budget: intake.total_budget,
            landing: intake.landing,
            experiences: intake.experiences,
            status: RequestStatus::New,
            created_at: now,
            updated_at: now,
        })
    }

    /// The one permitted mutation after creation
    pub fn set_status(&mut self, status: RequestStatus) {
        self.status = status;
        self.updated_at = now_ms();
    }
}

fn validate_intake(intake: &RequestIntake) -> Result<(), String> {
    if intake.business.name.trim().is_empty() {
        return Err("business name must not be empty".to_string());
    }
    if intake.daily_budget <= 0 {
        return Err("daily budget must be positive".to_string());
    }
    if intake.total_budget <= 0 {
        return Err("total budget must be positive".to_string());
    }
    if intake.total_budget < intake.daily_budget {
        return Err("total budget must be at least the daily budget".to_string());
    }
    for location in &intake.locations {
        if !IRAN_PROVINCES.contains(&location.as_str()) {
            return Err(format!("unknown province: {}", location));
        }
    }
    Ok(())
}

impl Record for CampaignRequest {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn collection_name() -> &'static str {
        "campaign_requests"
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("status".to_string(), IndexValue::String(self.status.to_string()));
        fields.insert("session_id".to_string(), IndexValue::String(self.session_id.clone()));
        fields.insert("advertiser_id".to_string(), IndexValue::Int(self.advertiser_id));
        fields
    }
}

#[cfg(test)]
pub(crate) fn sample_intake() -> RequestIntake {
    RequestIntake {
        advertiser_id: 42,
        business: Business {
            name: "کافه تهران".to_string(),
            kind: "کافه".to_string(),
            description: Some("specialty coffee".to_string()),
        },
        goal: "افزایش فروش".to_string(),
        target_audience: "جوانان تهرانی".to_string(),
        locations: vec!["تهران".to_string()],
        daily_budget: 1_000_000,
        total_budget: 10_000_000,
        landing: Landing {
            address: "https://example.ir".to_string(),
            kind: "webpage".to_string(),
        },
        experiences: vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_request_validates() {
        let req = CampaignRequest::new("sess-1", sample_intake()).unwrap();
        assert_eq!(req.status, RequestStatus::New);
        assert!(req.id.contains("-req-"));
    }

    #[test]
    fn test_rejects_nonpositive_budget() {
        let mut intake = sample_intake();
        intake.daily_budget = 0;
        assert!(CampaignRequest::new("s", intake).is_err());
    }

    #[test]
    fn test_rejects_total_below_daily() {
        let mut intake = sample_intake();
        intake.total_budget = 500;
        assert!(CampaignRequest::new("s", intake).is_err());
    }

    #[test]
    fn test_rejects_unknown_province() {
        let mut intake = sample_intake();
        intake.locations = vec!["Atlantis".to_string()];
        assert!(CampaignRequest::new("s", intake).is_err());
    }

    #[test]
    fn test_rejects_empty_business_name() {
        let mut intake = sample_intake();
        intake.business.name = "  ".to_string();
        assert!(CampaignRequest::new("s", intake).is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let req = CampaignRequest::new("sess-1", sample_intake()).unwrap();
        let json = serde_json::to_string(&req).unwrap();
        let back: CampaignRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, req);
    }
}
