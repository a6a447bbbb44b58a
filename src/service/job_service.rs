// service/job_service.rs
use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::{
    db::{jobdb::JobExt, proposaldb::ProposalExt, Gateway},
    models::{
        jobmodel::{Job, JobStatus, JobUpdate, NewJob},
        usermodel::{User, UserRole},
    },
    service::error::{is_foreign_key_violation, ServiceError},
};

#[derive(Debug, Clone)]
pub struct JobService {
    db_client: Arc<dyn Gateway>,
}

impl JobService {
    pub fn new(db_client: Arc<dyn Gateway>) -> Self {
        Self { db_client }
    }

    fn check_budget(job: &NewJob) -> Result<(), ServiceError> {
        if let (Some(min), Some(max)) = (&job.budget_min, &job.budget_max) {
            if min > max {
                return Err(ServiceError::Validation(
                    "budget_min cannot be greater than budget_max".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub async fn create(&self, caller: &User, new_job: NewJob) -> Result<Job, ServiceError> {
        if caller.role != UserRole::Client {
            return Err(ServiceError::Forbidden("Only clients can post jobs".to_string()));
        }
        Self::check_budget(&new_job)?;

        let job = self
            .db_client
            .create_job(NewJob {
                client_id: caller.id,
                ..new_job
            })
            .await?;

        info!("Job {} posted by {}", job.id, caller.id);
        Ok(job)
    }

    pub async fn list_open(
        &self,
        category: Option<&str>,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Job>, ServiceError> {
        let limit = limit.clamp(1, 50) as i64;
        let offset = (page.max(1) as i64 - 1) * limit;
        Ok(self.db_client.get_open_jobs(category, limit, offset).await?)
    }

    pub async fn list_mine(&self, caller: &User) -> Result<Vec<Job>, ServiceError> {
        Ok(self.db_client.get_client_jobs(caller.id).await?)
    }

    pub async fn get(&self, job_id: Uuid) -> Result<Job, ServiceError> {
        self.db_client
            .get_job_by_id(job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))
    }

    async fn owned_open_job(&self, caller: &User, job_id: Uuid) -> Result<Job, ServiceError> {
        let job = self.get(job_id).await?;
        if !job.is_owned_by(caller.id) {
            return Err(ServiceError::forbidden());
        }
        if job.status != JobStatus::Open {
            return Err(ServiceError::InvalidJobStatus(job.id, job.status));
        }
        Ok(job)
    }

    pub async fn update(&self, caller: &User, job_id: Uuid, update: JobUpdate) -> Result<Job, ServiceError> {
        let job = self.owned_open_job(caller, job_id).await?;

        let budget_min = update.budget_min.as_ref().or(job.budget_min.as_ref());
        let budget_max = update.budget_max.as_ref().or(job.budget_max.as_ref());
        if let (Some(min), Some(max)) = (budget_min, budget_max) {
            if min > max {
                return Err(ServiceError::Validation(
                    "budget_min cannot be greater than budget_max".to_string(),
                ));
            }
        }

        Ok(self.db_client.update_job(job_id, update).await?)
    }

    /// Deletes an open job that nobody has applied to. Proposals, and the
    /// conversations anchored on them, are never removed along with a job.
    pub async fn delete(&self, caller: &User, job_id: Uuid) -> Result<(), ServiceError> {
        self.owned_open_job(caller, job_id).await?;
        if !self.db_client.get_job_proposals(job_id).await?.is_empty() {
            return Err(ServiceError::JobHasProposals(job_id));
        }

        match self.db_client.delete_job(job_id).await {
            Ok(()) => {}
            // a proposal landed after the check
            Err(e) if is_foreign_key_violation(&e) => return Err(ServiceError::JobHasProposals(job_id)),
            Err(e) => return Err(e.into()),
        }

        info!("Job {} deleted by {}", job_id, caller.id);
        Ok(())
    }
}
