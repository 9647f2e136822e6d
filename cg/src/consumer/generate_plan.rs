//! generate_campaign_plan task handler
//!
//! Drives one task through: draft a plan (new), revise it after rejection
//! (retry_with_feedback), and on approval (confirmed) enqueue publication
//! and archive the plan as a planning example.

use docstore::Store;
use eyre::Result;
use tracing::{debug, error, info, warn};

use crate::domain::{CampaignPlan, CampaignRequest, RequestStatus, Task, TaskKind, TaskStatus};
use crate::knowledge::{Document, KnowledgeBase, CONTENT_TYPE_CAMPAIGN_PLAN};
use crate::planner::Planner;

/// How many reference documents to ground each draft on
const REFERENCE_DOC_LIMIT: usize = 3;

pub(crate) struct GeneratePlanHandler<'a> {
    pub store: &'a Store,
    pub planner: &'a dyn Planner,
    pub knowledge: &'a dyn KnowledgeBase,
}

impl GeneratePlanHandler<'_> {
    /// Advance the task one step. Store errors bubble up; everything else
    /// resolves to a status transition on the task itself.
    pub async fn handle(&self, task: &mut Task) -> Result<()> {
        debug!(task_id = %task.id, status = %task.status, "GeneratePlanHandler::handle: called");

        let request_id = match &task.kind {
            TaskKind::GenerateCampaignPlan { campaign_request_id, .. } => campaign_request_id.clone(),
            _ => {
                error!(task_id = %task.id, "GeneratePlanHandler::handle: wrong task kind");
                return Ok(());
            }
        };

        let Some(mut request) = self.store.get::<CampaignRequest>(&request_id)? else {
            error!(task_id = %task.id, %request_id, "GeneratePlanHandler::handle: request not found");
            task.set_status(TaskStatus::Failed);
            self.store.update(task)?;
            return Ok(());
        };

        match task.status {
            TaskStatus::New => self.draft(task, &mut request).await,
            TaskStatus::RetryWithFeedback => self.revise(task, &mut request).await,
            TaskStatus::Confirmed => self.finish(task, &mut request).await,
            other => {
                warn!(task_id = %task.id, status = %other, "GeneratePlanHandler::handle: unexpected status");
                Ok(())
            }
        }
    }

    /// new -> pending_confirm (or failed)
    async fn draft(&self, task: &mut Task, request: &mut CampaignRequest) -> Result<()> {
        let query = format!(
            "{} {} {}",
            request.business.kind, request.goal, request.target_audience
        );
        let reference_docs = match self.knowledge.search(&query, None, REFERENCE_DOC_LIMIT).await {
            Ok(docs) => docs,
            Err(e) => {
                warn!(task_id = %task.id, error = %e, "GeneratePlanHandler::draft: knowledge search failed");
                vec![]
            }
        };

        // Transient LLM errors were already retried inside the client;
        // whatever surfaces here is terminal for the task
        let draft = match self.planner.generate(request, &reference_docs).await {
            Ok(draft) => draft,
            Err(e) => {
                error!(task_id = %task.id, error = %e, "GeneratePlanHandler::draft: planner failed");
                return self.fail(task, request);
            }
        };

        let plan = match CampaignPlan::from_draft(&task.session_id, draft) {
            Ok(plan) => plan,
            Err(e) => {
                error!(task_id = %task.id, error = %e, "GeneratePlanHandler::draft: invalid plan");
                return self.fail(task, request);
            }
        };

        self.store.create(&plan)?;
        if let TaskKind::GenerateCampaignPlan { campaign_plan_id, .. } = &mut task.kind {
            *campaign_plan_id = Some(plan.id.clone());
        }
        task.set_status(TaskStatus::PendingConfirm);
        self.store.update(task)?;

        request.set_status(RequestStatus::Planned);
        self.store.update(request)?;

        info!(task_id = %task.id, plan_id = %plan.id, "GeneratePlanHandler::draft: plan awaiting confirmation");
        Ok(())
    }

    /// retry_with_feedback -> pending_confirm (or failed)
    async fn revise(&self, task: &mut Task, request: &mut CampaignRequest) -> Result<()> {
        let (plan_id, feedbacks) = match &task.kind {
            TaskKind::GenerateCampaignPlan {
                campaign_plan_id,
                feedbacks,
                ..
            } => (campaign_plan_id.clone(), feedbacks.clone()),
            _ => return Ok(()),
        };

        let Some(plan_id) = plan_id else {
            error!(task_id = %task.id, "GeneratePlanHandler::revise: no plan recorded on task");
            return self.fail(task, request);
        };
        let Some(mut plan) = self.store.get::<CampaignPlan>(&plan_id)? else {
            error!(task_id = %task.id, %plan_id, "GeneratePlanHandler::revise: plan not found");
            return self.fail(task, request);
        };

        let draft = match self.planner.revise(request, &plan, &feedbacks).await {
            Ok(draft) => draft,
            Err(e) => {
                error!(task_id = %task.id, error = %e, "GeneratePlanHandler::revise: planner failed");
                return self.fail(task, request);
            }
        };

        if let Err(e) = plan.apply_draft(draft) {
            error!(task_id = %task.id, error = %e, "GeneratePlanHandler::revise: invalid revision");
            return self.fail(task, request);
        }
        self.store.update(&plan)?;

        task.set_status(TaskStatus::PendingConfirm);
        self.store.update(task)?;

        request.set_status(RequestStatus::Planned);
        self.store.update(request)?;

        info!(task_id = %task.id, plan_id = %plan.id, "GeneratePlanHandler::revise: revised plan awaiting confirmation");
        Ok(())
    }

    /// confirmed -> completed; the publication task is enqueued before
    /// anything else so an interruption can never lose the approval
    async fn finish(&self, task: &mut Task, request: &mut CampaignRequest) -> Result<()> {
        let plan_id = match &task.kind {
            TaskKind::GenerateCampaignPlan {
                campaign_plan_id: Some(id),
                ..
            } => id.clone(),
            _ => {
                error!(task_id = %task.id, "GeneratePlanHandler::finish: no plan recorded on task");
                return self.fail(task, request);
            }
        };

        let downstream = Task::create_yektanet_campaign(
            &task.session_id,
            &plan_id,
            &request.id,
            format!("publish campaign for {}", request.business.name),
        );
        self.store.create(&downstream)?;
        info!(task_id = %task.id, downstream_id = %downstream.id, "GeneratePlanHandler::finish: publication enqueued");

        // Archive the approved plan as a future planning example. Best
        // effort: a knowledge failure must not hold up the pipeline.
        match self.store.get::<CampaignPlan>(&plan_id)? {
            Some(plan) => match serde_json::to_string_pretty(&plan) {
                Ok(json) => {
                    let doc = Document::new(plan.name.clone(), json, CONTENT_TYPE_CAMPAIGN_PLAN);
                    if let Err(e) = self.knowledge.add_document(doc).await {
                        warn!(plan_id = %plan.id, error = %e, "GeneratePlanHandler::finish: archiving plan failed");
                    }
                }
                Err(e) => {
                    warn!(plan_id = %plan.id, error = %e, "GeneratePlanHandler::finish: serializing plan failed")
                }
            },
            None => warn!(%plan_id, "GeneratePlanHandler::finish: confirmed plan missing from store"),
        }

        task.set_status(TaskStatus::Completed);
        self.store.update(task)?;

        request.set_status(RequestStatus::Confirmed);
        self.store.update(request)?;
        Ok(())
    }

    fn fail(&self, task: &mut Task, request: &mut CampaignRequest) -> Result<()> {
        task.set_status(TaskStatus::Failed);
        self.store.update(task)?;
        request.set_status(RequestStatus::Failed);
        self.store.update(request)?;
        Ok(())
    }
}
