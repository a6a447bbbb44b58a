// db/proposaldb.rs
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{types::Json, Error};
use uuid::Uuid;

use super::{contractdb::CONTRACT_COLUMNS, db::DBClient, jobdb::JOB_COLUMNS};
use crate::models::{jobmodel::*, proposalmodel::*};

pub(crate) const PROPOSAL_COLUMNS: &str = r#"
    id, job_id, employee_id, cover_letter,
    proposed_rate, estimated_duration, status, attachments,
    created_at, updated_at
"#;

#[async_trait]
pub trait ProposalExt {
    async fn create_proposal(&self, new_proposal: NewProposal) -> Result<Proposal, Error>;

    async fn get_proposal(&self, proposal_id: Uuid) -> Result<Option<Proposal>, Error>;

    async fn find_proposal(
        &self,
        job_id: Uuid,
        employee_id: Uuid,
    ) -> Result<Option<Proposal>, Error>;

    async fn get_job_proposals(&self, job_id: Uuid) -> Result<Vec<Proposal>, Error>;

    async fn get_employee_proposals(&self, employee_id: Uuid) -> Result<Vec<Proposal>, Error>;

    /// Moves a pending proposal to rejected. Returns `None` when the proposal
    /// was not pending, leaving it untouched.
    async fn reject_proposal(&self, proposal_id: Uuid) -> Result<Option<Proposal>, Error>;

    /// Accepts a proposal, creates its contract and moves the job to
    /// in_progress as one unit. Re-running it on an accepted proposal
    /// completes whatever step is missing and writes nothing otherwise.
    async fn accept_proposal(
        &self,
        proposal_id: Uuid,
        start_date: NaiveDate,
    ) -> Result<AcceptOutcome, Error>;
}

#[async_trait]
impl ProposalExt for DBClient {
    async fn create_proposal(&self, new_proposal: NewProposal) -> Result<Proposal, Error> {
        sqlx::query_as::<_, Proposal>(&format!(
            r#"
            INSERT INTO proposals
            (job_id, employee_id, cover_letter, proposed_rate, estimated_duration, attachments)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            PROPOSAL_COLUMNS
        ))
        .bind(new_proposal.job_id)
        .bind(new_proposal.employee_id)
        .bind(new_proposal.cover_letter)
        .bind(new_proposal.proposed_rate)
        .bind(new_proposal.estimated_duration)
        .bind(Json(new_proposal.attachments))
        .fetch_one(&self.pool)
        .await
    }

    async fn get_proposal(&self, proposal_id: Uuid) -> Result<Option<Proposal>, Error> {
        sqlx::query_as::<_, Proposal>(&format!(
            "SELECT {} FROM proposals WHERE id = $1",
            PROPOSAL_COLUMNS
        ))
        .bind(proposal_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_proposal(
        &self,
        job_id: Uuid,
        employee_id: Uuid,
    ) -> Result<Option<Proposal>, Error> {
        sqlx::query_as::<_, Proposal>(&format!(
            "SELECT {} FROM proposals WHERE job_id = $1 AND employee_id = $2",
            PROPOSAL_COLUMNS
        ))
        .bind(job_id)
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_job_proposals(&self, job_id: Uuid) -> Result<Vec<Proposal>, Error> {
        sqlx::query_as::<_, Proposal>(&format!(
            "SELECT {} FROM proposals WHERE job_id = $1 ORDER BY created_at DESC",
            PROPOSAL_COLUMNS
        ))
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_employee_proposals(&self, employee_id: Uuid) -> Result<Vec<Proposal>, Error> {
        sqlx::query_as::<_, Proposal>(&format!(
            "SELECT {} FROM proposals WHERE employee_id = $1 ORDER BY created_at DESC",
            PROPOSAL_COLUMNS
        ))
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn reject_proposal(&self, proposal_id: Uuid) -> Result<Option<Proposal>, Error> {
        sqlx::query_as::<_, Proposal>(&format!(
            r#"
            UPDATE proposals
            SET status = 'rejected'::proposal_status, updated_at = NOW()
            WHERE id = $1 AND status = 'pending'::proposal_status
            RETURNING {}
            "#,
            PROPOSAL_COLUMNS
        ))
        .bind(proposal_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn accept_proposal(
        &self,
        proposal_id: Uuid,
        start_date: NaiveDate,
    ) -> Result<AcceptOutcome, Error> {
        let mut tx = self.pool.begin().await?;

        // Lock order: proposal, then job. Concurrent accepts of the same
        // proposal serialise here.
        let proposal = sqlx::query_as::<_, Proposal>(&format!(
            "SELECT {} FROM proposals WHERE id = $1 FOR UPDATE",
            PROPOSAL_COLUMNS
        ))
        .bind(proposal_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::RowNotFound)?;

        let job = sqlx::query_as::<_, Job>(&format!(
            "SELECT {} FROM jobs WHERE id = $1 FOR UPDATE",
            JOB_COLUMNS
        ))
        .bind(proposal.job_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut wrote = false;

        let proposal = match proposal.status {
            ProposalStatus::Rejected => {
                tx.rollback().await?;
                return Ok(AcceptOutcome::AlreadyRejected(proposal));
            }
            ProposalStatus::Pending if job.status != JobStatus::Open => {
                tx.rollback().await?;
                return Ok(AcceptOutcome::JobNotOpen(job));
            }
            ProposalStatus::Pending => {
                wrote = true;
                tracing::info!("accept {}: marking proposal accepted", proposal_id);
                sqlx::query_as::<_, Proposal>(&format!(
                    r#"
                    UPDATE proposals
                    SET status = 'accepted'::proposal_status, updated_at = NOW()
                    WHERE id = $1
                    RETURNING {}
                    "#,
                    PROPOSAL_COLUMNS
                ))
                .bind(proposal_id)
                .fetch_one(&mut *tx)
                .await?
            }
            ProposalStatus::Accepted => {
                tracing::info!("accept {}: proposal already accepted, checking remaining steps", proposal_id);
                proposal
            }
        };

        let existing_contract = sqlx::query_as::<_, Contract>(&format!(
            "SELECT {} FROM contracts WHERE proposal_id = $1",
            CONTRACT_COLUMNS
        ))
        .bind(proposal_id)
        .fetch_optional(&mut *tx)
        .await?;

        let contract = match existing_contract {
            Some(contract) => contract,
            None => {
                wrote = true;
                tracing::info!("accept {}: creating contract", proposal_id);
                let new_contract = NewContract::from_acceptance(&job, &proposal, start_date);
                sqlx::query_as::<_, Contract>(&format!(
                    r#"
                    INSERT INTO contracts
                    (job_id, client_id, employee_id, proposal_id, agreed_rate, start_date)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    RETURNING {}
                    "#,
                    CONTRACT_COLUMNS
                ))
                .bind(new_contract.job_id)
                .bind(new_contract.client_id)
                .bind(new_contract.employee_id)
                .bind(new_contract.proposal_id)
                .bind(new_contract.agreed_rate)
                .bind(new_contract.start_date)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        let job = if job.status == JobStatus::Open {
            wrote = true;
            tracing::info!("accept {}: moving job {} to in_progress", proposal_id, job.id);
            sqlx::query_as::<_, Job>(&format!(
                r#"
                UPDATE jobs
                SET status = 'in_progress'::job_status, updated_at = NOW()
                WHERE id = $1
                RETURNING {}
                "#,
                JOB_COLUMNS
            ))
            .bind(job.id)
            .fetch_one(&mut *tx)
            .await?
        } else {
            job
        };

        tx.commit().await?;

        Ok(AcceptOutcome::Accepted(Acceptance {
            proposal,
            contract,
            job,
            already_applied: !wrote,
        }))
    }
}
