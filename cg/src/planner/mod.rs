//! Campaign planner
//!
//! Turns a stored CampaignRequest into a [`PlanDraft`] via an LLM, and
//! revises an existing plan when the reviewer rejects it with feedback.
//! The planner is a trait so the consumer can be tested without network.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use std::sync::Arc;

use crate::domain::{CampaignPlan, CampaignRequest, PlanDraft};
use crate::llm::{CompletionRequest, LlmClient, LlmError, Message};

/// Errors that can occur while planning
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Planner returned no content")]
    EmptyResponse,

    #[error("Planner output is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),
}

/// Produces and revises campaign plan drafts
#[async_trait]
pub trait Planner: Send + Sync {
    /// Draft a plan for a request, grounded on reference documents
    async fn generate(
        &self,
        request: &CampaignRequest,
        reference_docs: &[String],
    ) -> Result<PlanDraft, PlannerError>;

    /// Revise an existing plan given the full feedback history
    async fn revise(
        &self,
        request: &CampaignRequest,
        current_plan: &CampaignPlan,
        feedbacks: &[String],
    ) -> Result<PlanDraft, PlannerError>;
}

const SYSTEM_PROMPT: &str = "\
You are a senior media planner for the Yektanet advertising network in Iran. \
Given an advertiser's campaign request, produce one native campaign plan as a \
single JSON object with exactly these fields:

{
  \"type\": \"native\",
  \"name\": string (Persian, include the business name),
  \"business_description\": string,
  \"description\": string (what the campaign does and why),
  \"target_audience_description\": string,
  \"budget\": integer (daily budget in toman, at most the advertiser's daily budget),
  \"bidding_strategy\": \"cpc\",
  \"bid_toman\": integer (cost per click in toman),
  \"targeting_config\": {
    \"keywords\": [string] (Persian keywords),
    \"user_segments\": [string] (Persian segment labels),
    \"categories\": [string] (Persian content category labels)
  },
  \"ads_description\": [
    {
      \"title\": string (Persian, engaging, no clickbait),
      \"landing_url\": string (the advertiser's landing address),
      \"image\": { \"source\": \"generate\", \"prompt\": string (English, photographic, no text in image) },
      \"call_to_action\": string (Persian, at most 13 characters)
    }
  ] (2 to 4 ads)
}

Respond with the JSON object only.";

/// LLM-backed planner
pub struct LlmPlanner {
    llm: Arc<dyn LlmClient>,
    max_tokens: u32,
}

impl LlmPlanner {
    pub fn new(llm: Arc<dyn LlmClient>, max_tokens: u32) -> Self {
        Self { llm, max_tokens }
    }

    /// Render the request (and its marketing history) for the model
    fn describe_request(request: &CampaignRequest, reference_docs: &[String]) -> String {
        let mut text = String::new();
        text.push_str(&format!(
            "Business: {} ({})\n",
            request.business.name, request.business.kind
        ));
        if let Some(desc) = &request.business.description {
            text.push_str(&format!("About the business: {}\n", desc));
        }
        text.push_str(&format!("Goal: {}\n", request.goal));
        text.push_str(&format!("Target audience: {}\n", request.target_audience));
        if !request.locations.is_empty() {
            text.push_str(&format!("Locations: {}\n", request.locations.join(", ")));
        }
        text.push_str(&format!(
            "Daily budget: {} toman, total budget: {} toman\n",
            request.daily_budget, request.total_budget
        ));
        text.push_str(&format!(
            "Landing: {} ({})\n",
            request.landing.address, request.landing.kind
        ));
        for exp in &request.experiences {
            text.push_str(&format!(
                "Past marketing: {} (spent {}): {}\n",
                exp.description, exp.spent_budget, exp.feedback
            ));
        }
        if !reference_docs.is_empty() {
            text.push_str("\nReference material:\n");
            for doc in reference_docs {
                text.push_str(&format!("---\n{}\n", doc));
            }
        }
        text
    }

    async fn complete_draft(&self, messages: Vec<Message>) -> Result<PlanDraft, PlannerError> {
        let response = self
            .llm
            .complete(CompletionRequest {
                system_prompt: SYSTEM_PROMPT.to_string(),
                messages,
                max_tokens: self.max_tokens,
                json_response: true,
            })
            .await?;

        let content = response.content.ok_or(PlannerError::EmptyResponse)?;
        let draft = parse_draft(&content)?;
        draft.validate().map_err(PlannerError::InvalidPlan)?;
        Ok(draft)
    }
}

/// Parse a draft out of model output, tolerating markdown code fences
fn parse_draft(content: &str) -> Result<PlanDraft, PlannerError> {
    let trimmed = content.trim();
    let stripped = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed);
    Ok(serde_json::from_str(stripped.trim())?)
}

#[async_trait]
impl Planner for LlmPlanner {
    async fn generate(
        &self,
        request: &CampaignRequest,
        reference_docs: &[String],
    ) -> Result<PlanDraft, PlannerError> {
        debug!(request_id = %request.id, doc_count = reference_docs.len(), "LlmPlanner::generate: called");
        let messages = vec![Message::user(Self::describe_request(request, reference_docs))];
        let draft = self.complete_draft(messages).await?;
        debug!(plan_name = %draft.name, ad_count = draft.ads_description.len(), "LlmPlanner::generate: drafted");
        Ok(draft)
    }

    async fn revise(
        &self,
        request: &CampaignRequest,
        current_plan: &CampaignPlan,
        feedbacks: &[String],
    ) -> Result<PlanDraft, PlannerError> {
        debug!(
            request_id = %request.id,
            plan_id = %current_plan.id,
            feedback_count = feedbacks.len(),
            "LlmPlanner::revise: called"
        );
        if feedbacks.is_empty() {
            warn!(plan_id = %current_plan.id, "LlmPlanner::revise: no feedback recorded");
        }

        // Replay the conversation: original request, the plan the model
        // produced, then every reviewer rejection in order.
        let mut messages = vec![Message::user(Self::describe_request(request, &[]))];
        let plan_json = serde_json::to_string_pretty(current_plan)?;
        messages.push(Message::assistant(plan_json));
        let feedback_text = feedbacks
            .iter()
            .enumerate()
            .map(|(i, f)| format!("{}. {}", i + 1, f))
            .collect::<Vec<_>>()
            .join("\n");
        messages.push(Message::user(format!(
            "The advertiser rejected this plan. Revise it to address all of the \
             following feedback, and respond with the full corrected JSON object:\n{}",
            feedback_text
        )));

        self.complete_draft(messages).await
    }
}
