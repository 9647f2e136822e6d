//! create_yektanet_campaign task handler
//!
//! Publishes a confirmed plan: one campaign shell, then the plan's ads in
//! order. Progress is persisted after every platform mutation (image URL
//! before ad creation, ad id right after), so a crash or transient
//! failure resumes at the first incomplete step instead of duplicating
//! anything.
//!
//! Failure handling is asymmetric: a campaign-shell failure is fatal
//! immediately (nothing exists yet to resume), while ad failures are
//! retried across passes until the retry budget runs out.

use docstore::Store;
use eyre::Result;
use tracing::{debug, error, info, warn};

use crate::domain::{CampaignPlan, CampaignRequest, ImageSource, RequestStatus, Task, TaskKind, TaskStatus};
use crate::yektanet::AdPlatform;

pub(crate) struct CreateCampaignHandler<'a> {
    pub store: &'a Store,
    pub platform: &'a dyn AdPlatform,
    /// Failed create_ads passes beyond this count turn the task failed
    pub max_ad_retries: u32,
}

impl CreateCampaignHandler<'_> {
    /// Advance the task one state step per invocation
    pub async fn handle(&self, task: &mut Task) -> Result<()> {
        debug!(task_id = %task.id, status = %task.status, "CreateCampaignHandler::handle: called");

        let (plan_id, request_id) = match &task.kind {
            TaskKind::CreateYektanetCampaign {
                campaign_plan_id,
                campaign_request_id,
                ..
            } => (campaign_plan_id.clone(), campaign_request_id.clone()),
            _ => {
                error!(task_id = %task.id, "CreateCampaignHandler::handle: wrong task kind");
                return Ok(());
            }
        };

        let Some(mut request) = self.store.get::<CampaignRequest>(&request_id)? else {
            error!(task_id = %task.id, %request_id, "CreateCampaignHandler::handle: request not found");
            task.set_status(TaskStatus::Failed);
            self.store.update(task)?;
            return Ok(());
        };
        let Some(mut plan) = self.store.get::<CampaignPlan>(&plan_id)? else {
            error!(task_id = %task.id, %plan_id, "CreateCampaignHandler::handle: plan not found");
            return self.fail(task, &mut request);
        };

        match task.status {
            TaskStatus::New => self.create_campaign(task, &mut request, &plan).await,
            TaskStatus::CreateAds => self.create_ads(task, &mut request, &mut plan).await,
            other => {
                warn!(task_id = %task.id, status = %other, "CreateCampaignHandler::handle: unexpected status");
                Ok(())
            }
        }
    }

    /// new -> create_ads; a shell failure is fatal, no ads were attempted
    async fn create_campaign(
        &self,
        task: &mut Task,
        request: &mut CampaignRequest,
        plan: &CampaignPlan,
    ) -> Result<()> {
        match self.platform.create_campaign(plan).await {
            Ok(campaign_id) => {
                if let TaskKind::CreateYektanetCampaign {
                    created_campaign_id, ..
                } = &mut task.kind
                {
                    *created_campaign_id = Some(campaign_id);
                }
                task.set_status(TaskStatus::CreateAds);
                self.store.update(task)?;
                info!(task_id = %task.id, campaign_id, "CreateCampaignHandler::create_campaign: campaign created");
                Ok(())
            }
            Err(e) => {
                error!(task_id = %task.id, error = %e, "CreateCampaignHandler::create_campaign: failed");
                self.fail(task, request)
            }
        }
    }

    /// create_ads -> create_ads | completed | failed
    ///
    /// Processes pending ads in plan order; the pass stops at the first
    /// failure and counts against the retry budget.
    async fn create_ads(
        &self,
        task: &mut Task,
        request: &mut CampaignRequest,
        plan: &mut CampaignPlan,
    ) -> Result<()> {
        let campaign_id = match &task.kind {
            TaskKind::CreateYektanetCampaign {
                created_campaign_id: Some(id),
                ..
            } => *id,
            _ => {
                error!(task_id = %task.id, "CreateCampaignHandler::create_ads: no campaign id on task");
                return self.fail(task, request);
            }
        };

        while let Some(index) = plan.first_pending_ad() {
            // Generated images are persisted onto the plan before the ad
            // is created, so a retry reuses the same creative
            if plan.ads_description[index].image.url.is_none() {
                let prompt = match &plan.ads_description[index].image {
                    img if img.source == ImageSource::Generate => img.prompt.clone().unwrap_or_default(),
                    _ => {
                        error!(task_id = %task.id, index, "CreateCampaignHandler::create_ads: user asset without url");
                        return self.count_failure(task, request);
                    }
                };
                match self.platform.generate_ad_image(&prompt).await {
                    Ok(url) => {
                        plan.set_ad_image_url(index, url);
                        self.store.update(plan)?;
                    }
                    Err(e) => {
                        warn!(task_id = %task.id, index, error = %e, "CreateCampaignHandler::create_ads: image generation failed");
                        return self.count_failure(task, request);
                    }
                }
            }

            match self.platform.create_ad(campaign_id, &plan.ads_description[index]).await {
                Ok(ad_id) => {
                    plan.mark_ad_created(index, ad_id);
                    self.store.update(plan)?;
                    if let TaskKind::CreateYektanetCampaign { created_ads, .. } = &mut task.kind {
                        created_ads.push(ad_id);
                    }
                    self.store.update(task)?;
                    info!(task_id = %task.id, index, ad_id, "CreateCampaignHandler::create_ads: ad created");
                }
                Err(e) => {
                    warn!(task_id = %task.id, index, error = %e, "CreateCampaignHandler::create_ads: ad creation failed");
                    return self.count_failure(task, request);
                }
            }
        }

        task.set_status(TaskStatus::Completed);
        self.store.update(task)?;
        info!(task_id = %task.id, campaign_id, "CreateCampaignHandler::create_ads: all ads created");
        Ok(())
    }

    /// Count a failed pass; the task stays in create_ads until the
    /// budget runs out
    fn count_failure(&self, task: &mut Task, request: &mut CampaignRequest) -> Result<()> {
        let retries = match &mut task.kind {
            TaskKind::CreateYektanetCampaign { retry_count, .. } => {
                *retry_count += 1;
                *retry_count
            }
            _ => return Ok(()),
        };

        if retries > self.max_ad_retries {
            error!(task_id = %task.id, retries, "CreateCampaignHandler: retry budget exhausted");
            return self.fail(task, request);
        }

        self.store.update(task)?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AdDescription, sample_draft, sample_intake};
    use crate::yektanet::AdPlatformError;

    struct UnusedPlatform;

    #[async_trait::async_trait]
    impl AdPlatform for UnusedPlatform {
        async fn create_campaign(&self, _: &CampaignPlan) -> Result<i64, AdPlatformError> {
            panic!("platform must not run")
        }

        async fn generate_ad_image(&self, _: &str) -> Result<String, AdPlatformError> {
            panic!("platform must not run")
        }

        async fn create_ad(&self, _: i64, _: &AdDescription) -> Result<i64, AdPlatformError> {
            panic!("platform must not run")
        }
    }

    #[tokio::test]
    async fn test_terminal_task_left_unchanged() {
        let store = Store::in_memory().unwrap();

        for status in [TaskStatus::Completed, TaskStatus::Failed] {
            let request = CampaignRequest::new("sess-1", sample_intake()).unwrap();
            store.create(&request).unwrap();
            let plan = CampaignPlan::from_draft("sess-1", sample_draft(1)).unwrap();
            store.create(&plan).unwrap();
            let mut task = Task::create_yektanet_campaign("sess-1", &plan.id, &request.id, "publish");
            task.set_status(status);
            store.create(&task).unwrap();
            let before = store.get::<Task>(&task.id).unwrap().unwrap();

            let handler = CreateCampaignHandler {
                store: &store,
                platform: &UnusedPlatform,
                max_ad_retries: 5,
            };
            handler.handle(&mut task).await.unwrap();

            assert_eq!(task.status, status);
            let after = store.get::<Task>(&task.id).unwrap().unwrap();
            assert_eq!(after.status, before.status);
            assert_eq!(after.updated_at, before.updated_at);
        }
    }
}
