// The Yektanet campaign payload is one large json! literal
#![recursion_limit = "256"]

//! CampaignGenie - campaign orchestration engine
//!
//! Turns an advertiser's campaign request into a live Yektanet campaign,
//! mediated by LLM-generated plans that require human approval. The heart of
//! the crate is a task-driven consumer loop that advances long-running,
//! externally-dependent work items through a well-defined state machine and
//! survives partial failures mid-step without duplicating side effects.
//!
//! # Pipeline
//!
//! 1. A `CampaignRequest` is submitted and a `generate_campaign_plan` task
//!    is enqueued.
//! 2. The consumer asks the [`planner`] to draft a `CampaignPlan`; the task
//!    parks in `pending_confirm` awaiting human review.
//! 3. On approval a `create_yektanet_campaign` task is enqueued; the
//!    consumer drives campaign creation and per-ad creation against the
//!    [`yektanet`] client, recording each server-assigned id the moment it
//!    is known so retries never repeat a completed sub-step.
//!
//! # Modules
//!
//! - [`domain`] - task, request and plan records
//! - [`consumer`] - the polling loop and task handlers
//! - [`planner`] - LLM-backed plan generation
//! - [`yektanet`] - ad platform client
//! - [`knowledge`] - case-study document store
//! - [`llm`] - low-level LLM client
//! - [`config`] / [`cli`] - configuration and command-line surface

pub mod cli;
pub mod config;
pub mod consumer;
pub mod domain;
pub mod knowledge;
pub mod llm;
pub mod planner;
pub mod yektanet;

pub use config::Config;
pub use consumer::{Consumer, PollPolicy, TickOutcome};
pub use domain::{AdDescription, CampaignPlan, CampaignRequest, Task, TaskKind, TaskStatus};
pub use planner::{Planner, PlannerError};
pub use yektanet::{AdPlatform, AdPlatformError};

// Re-export store types for convenience
pub use docstore::{Filter, FilterOp, IndexValue, Record, Store, now_ms};
