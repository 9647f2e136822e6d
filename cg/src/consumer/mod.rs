//! Task consumer loop
//!
//! Single-threaded poller: pick the oldest eligible task, advance it one
//! state step, repeat. Eligibility excludes terminal tasks and tasks
//! parked on human review. Documents whose type tag no handler knows are
//! logged and left untouched so they never block the queue.

use std::sync::Arc;
use std::time::Duration;

use docstore::{Record, Store};
use eyre::Result;
use tracing::{debug, error, info, warn};

mod create_campaign;
mod generate_plan;

use create_campaign::CreateCampaignHandler;
use generate_plan::GeneratePlanHandler;

use crate::domain::{Task, TaskKind};
use crate::knowledge::KnowledgeBase;
use crate::planner::Planner;
use crate::yektanet::AdPlatform;

/// Loop timing knobs
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    /// Sleep between polls when the queue is empty
    pub poll_interval: Duration,
    /// Sleep after an unexpected error before polling again
    pub error_backoff: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            error_backoff: Duration::from_secs(10),
        }
    }
}

/// What one poll accomplished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// A task was claimed and advanced one step
    Processed { task_id: String },
    /// No eligible tasks
    Idle,
    /// Eligible documents exist but none has a known type tag
    SkippedOnly,
}

/// The task consumer
pub struct Consumer {
    store: Arc<Store>,
    planner: Arc<dyn Planner>,
    platform: Arc<dyn AdPlatform>,
    knowledge: Arc<dyn KnowledgeBase>,
    policy: PollPolicy,
    max_ad_retries: u32,
}

impl Consumer {
    pub fn new(
        store: Arc<Store>,
        planner: Arc<dyn Planner>,
        platform: Arc<dyn AdPlatform>,
        knowledge: Arc<dyn KnowledgeBase>,
        policy: PollPolicy,
        max_ad_retries: u32,
    ) -> Self {
        Self {
            store,
            planner,
            platform,
            knowledge,
            policy,
            max_ad_retries,
        }
    }

    /// Run the polling loop forever.
    ///
    /// There is no claim/lease step: exactly one consumer may run against
    /// a given store, or external calls can double-fire.
    pub async fn run(&self) -> Result<()> {
        info!("Consumer::run: started");
        loop {
            match self.tick().await {
                Ok(TickOutcome::Processed { task_id }) => {
                    debug!(%task_id, "Consumer::run: processed, polling again");
                }
                Ok(TickOutcome::Idle) | Ok(TickOutcome::SkippedOnly) => {
                    tokio::time::sleep(self.policy.poll_interval).await;
                }
                Err(e) => {
                    // One bad tick must not kill the daemon
                    error!(error = %e, "Consumer::run: tick failed, backing off");
                    tokio::time::sleep(self.policy.error_backoff).await;
                }
            }
        }
    }

    /// One poll: claim the oldest eligible, deserializable task and
    /// advance it a single state step
    pub async fn tick(&self) -> Result<TickOutcome> {
        let rows = self
            .store
            .list_raw(Task::collection_name(), &[Task::eligibility_filter()])?;
        if rows.is_empty() {
            return Ok(TickOutcome::Idle);
        }

        // Oldest first; rows that fail to deserialize carry a type tag we
        // don't handle and are left for operator investigation
        for row in rows {
            let mut task: Task = match serde_json::from_value(row.data) {
                Ok(task) => task,
                Err(e) => {
                    warn!(task_id = %row.id, error = %e, "Consumer::tick: skipping document with unknown task type");
                    continue;
                }
            };

            debug!(task_id = %task.id, status = %task.status, "Consumer::tick: claimed");
            match &task.kind {
                TaskKind::GenerateCampaignPlan { .. } => {
                    GeneratePlanHandler {
                        store: &self.store,
                        planner: self.planner.as_ref(),
                        knowledge: self.knowledge.as_ref(),
                    }
                    .handle(&mut task)
                    .await?;
                }
                TaskKind::CreateYektanetCampaign { .. } => {
                    CreateCampaignHandler {
                        store: &self.store,
                        platform: self.platform.as_ref(),
                        max_ad_retries: self.max_ad_retries,
                    }
                    .handle(&mut task)
                    .await?;
                }
            }
            return Ok(TickOutcome::Processed { task_id: task.id });
        }

        Ok(TickOutcome::SkippedOnly)
    }
}
