// service/proposal_service.rs
use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    db::{
        contractdb::ContractExt, jobdb::JobExt, proposaldb::ProposalExt, Gateway,
    },
    models::{
        jobmodel::{Job, JobStatus},
        proposalmodel::*,
        usermodel::{User, UserRole},
    },
    service::error::{is_unique_violation, ServiceError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    fn target(&self) -> ProposalStatus {
        match self {
            Decision::Accept => ProposalStatus::Accepted,
            Decision::Reject => ProposalStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProposalSubmission {
    pub job_id: Uuid,
    pub cover_letter: String,
    pub proposed_rate: Option<BigDecimal>,
    pub estimated_duration: Option<String>,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DecisionOutcome {
    Accepted(Acceptance),
    Rejected { proposal: Proposal },
}

impl DecisionOutcome {
    pub fn proposal(&self) -> &Proposal {
        match self {
            DecisionOutcome::Accepted(acceptance) => &acceptance.proposal,
            DecisionOutcome::Rejected { proposal } => proposal,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProposalService {
    db_client: Arc<dyn Gateway>,
}

impl ProposalService {
    pub fn new(db_client: Arc<dyn Gateway>) -> Self {
        Self { db_client }
    }

    async fn load_job(&self, job_id: Uuid) -> Result<Job, ServiceError> {
        self.db_client
            .get_job_by_id(job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))
    }

    async fn load_proposal(&self, proposal_id: Uuid) -> Result<Proposal, ServiceError> {
        self.db_client
            .get_proposal(proposal_id)
            .await?
            .ok_or(ServiceError::ProposalNotFound(proposal_id))
    }

    pub async fn submit(&self, caller: &User, submission: ProposalSubmission) -> Result<Proposal, ServiceError> {
        if caller.role != UserRole::Employee {
            return Err(ServiceError::Forbidden("Only employees can submit proposals".to_string()));
        }

        let job = self.load_job(submission.job_id).await?;
        if job.status != JobStatus::Open {
            return Err(ServiceError::InvalidJobStatus(job.id, job.status));
        }

        if self.db_client.find_proposal(job.id, caller.id).await?.is_some() {
            return Err(ServiceError::AlreadyApplied(job.id));
        }

        let result = self
            .db_client
            .create_proposal(NewProposal {
                job_id: job.id,
                employee_id: caller.id,
                cover_letter: submission.cover_letter,
                proposed_rate: submission.proposed_rate,
                estimated_duration: submission.estimated_duration,
                attachments: submission.attachments,
            })
            .await;

        match result {
            Ok(proposal) => {
                info!("Proposal {} submitted for job {} by {}", proposal.id, job.id, caller.id);
                Ok(proposal)
            }
            // lost a race with a concurrent submission
            Err(e) if is_unique_violation(&e) => Err(ServiceError::AlreadyApplied(job.id)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn decide(
        &self,
        caller: &User,
        proposal_id: Uuid,
        decision: Decision,
    ) -> Result<DecisionOutcome, ServiceError> {
        let proposal = self.load_proposal(proposal_id).await?;
        let job = self.load_job(proposal.job_id).await?;

        if !job.is_owned_by(caller.id) {
            return Err(ServiceError::forbidden());
        }

        if proposal.status.is_terminal() && proposal.status != decision.target() {
            return Err(ServiceError::InvalidProposalTransition {
                proposal_id,
                from: proposal.status,
                to: decision.target(),
            });
        }

        match decision {
            Decision::Accept => self.accept(proposal_id).await,
            Decision::Reject => self.reject(proposal).await,
        }
    }

    async fn accept(&self, proposal_id: Uuid) -> Result<DecisionOutcome, ServiceError> {
        let start_date = Utc::now().date_naive();
        let outcome = self.db_client.accept_proposal(proposal_id, start_date).await?;

        match outcome {
            AcceptOutcome::Accepted(acceptance) => {
                if acceptance.already_applied {
                    info!("Proposal {} was already accepted; returning contract {}", proposal_id, acceptance.contract.id);
                } else {
                    info!("Proposal {} accepted", proposal_id);
                    info!("Contract {} active for proposal {}", acceptance.contract.id, proposal_id);
                    info!("Job {} is {}", acceptance.job.id, acceptance.job.status.to_str());
                }
                Ok(DecisionOutcome::Accepted(acceptance))
            }
            AcceptOutcome::AlreadyRejected(proposal) => {
                warn!("Proposal {} was rejected before it could be accepted", proposal_id);
                Err(ServiceError::InvalidProposalTransition {
                    proposal_id,
                    from: proposal.status,
                    to: ProposalStatus::Accepted,
                })
            }
            AcceptOutcome::JobNotOpen(job) => Err(ServiceError::InvalidJobStatus(job.id, job.status)),
        }
    }

    async fn reject(&self, proposal: Proposal) -> Result<DecisionOutcome, ServiceError> {
        if proposal.status == ProposalStatus::Rejected {
            return Ok(DecisionOutcome::Rejected { proposal });
        }

        match self.db_client.reject_proposal(proposal.id).await? {
            Some(rejected) => {
                info!("Proposal {} rejected", rejected.id);
                Ok(DecisionOutcome::Rejected { proposal: rejected })
            }
            None => {
                // someone decided it first
                let current = self.load_proposal(proposal.id).await?;
                match current.status {
                    ProposalStatus::Rejected => Ok(DecisionOutcome::Rejected { proposal: current }),
                    status => Err(ServiceError::InvalidProposalTransition {
                        proposal_id: current.id,
                        from: status,
                        to: ProposalStatus::Rejected,
                    }),
                }
            }
        }
    }

    /// A proposal is visible to its author and to the owner of its job.
    pub async fn get(&self, caller: &User, proposal_id: Uuid) -> Result<Proposal, ServiceError> {
        let proposal = self.load_proposal(proposal_id).await?;
        if proposal.employee_id == caller.id {
            return Ok(proposal);
        }

        let job = self.load_job(proposal.job_id).await?;
        if job.is_owned_by(caller.id) {
            Ok(proposal)
        } else {
            Err(ServiceError::forbidden())
        }
    }

    pub async fn list_for_job(&self, caller: &User, job_id: Uuid) -> Result<Vec<Proposal>, ServiceError> {
        let job = self.load_job(job_id).await?;
        if !job.is_owned_by(caller.id) {
            return Err(ServiceError::forbidden());
        }

        Ok(self.db_client.get_job_proposals(job_id).await?)
    }

    pub async fn list_mine(&self, caller: &User) -> Result<Vec<Proposal>, ServiceError> {
        Ok(self.db_client.get_employee_proposals(caller.id).await?)
    }

    pub async fn contracts(&self, caller: &User) -> Result<Vec<Contract>, ServiceError> {
        Ok(self.db_client.get_user_contracts(caller.id).await?)
    }

    pub async fn contract(&self, caller: &User, contract_id: Uuid) -> Result<Contract, ServiceError> {
        let contract = self
            .db_client
            .get_contract(contract_id)
            .await?
            .ok_or(ServiceError::ContractNotFound(contract_id))?;

        if !contract.is_party(caller.id) {
            return Err(ServiceError::forbidden());
        }
        Ok(contract)
    }
}
