//! Domain types for CampaignGenie
//!
//! Core records: Task, CampaignRequest, CampaignPlan, all persisted through
//! the docstore `Record` trait. Tasks carry their kind as a serialized
//! `type` tag so the consumer can dispatch without subclassing.

mod id;
mod plan;
mod request;
mod task;

pub use id::generate_id;
pub use plan::{
    AdDescription, AdImage, CampaignPlan, CampaignType, ImageSource, PlanDraft, TargetingConfig,
    MAX_CTA_CHARS,
};
pub use request::{
    Business, CampaignRequest, Landing, MarketingExperience, RequestIntake, RequestStatus,
    IRAN_PROVINCES,
};
pub use task::{Task, TaskKind, TaskStatus, TYPE_CREATE_YEKTANET_CAMPAIGN, TYPE_GENERATE_CAMPAIGN_PLAN};

#[cfg(test)]
pub(crate) use plan::sample_draft;
#[cfg(test)]
pub(crate) use request::sample_intake;
