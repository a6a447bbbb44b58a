use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::{BigDecimal, Json};
use uuid::Uuid;

use super::jobmodel::Job;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "proposal_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ProposalStatus {
    pub fn to_str(&self) -> &str {
        match self {
            ProposalStatus::Pending => "pending",
            ProposalStatus::Accepted => "accepted",
            ProposalStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProposalStatus::Pending)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "contract_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Active,
    Completed,
    Cancelled,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub url: String,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Proposal {
    pub id: Uuid,
    pub job_id: Uuid,
    pub employee_id: Uuid,
    pub cover_letter: String,
    pub proposed_rate: Option<BigDecimal>,
    pub estimated_duration: Option<String>,
    pub status: ProposalStatus,
    pub attachments: Json<Vec<Attachment>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProposal {
    pub job_id: Uuid,
    pub employee_id: Uuid,
    pub cover_letter: String,
    pub proposed_rate: Option<BigDecimal>,
    pub estimated_duration: Option<String>,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Contract {
    pub id: Uuid,
    pub job_id: Uuid,
    pub client_id: Uuid,
    pub employee_id: Uuid,
    pub proposal_id: Uuid,
    pub agreed_rate: BigDecimal,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: ContractStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    pub fn is_party(&self, user_id: Uuid) -> bool {
        self.client_id == user_id || self.employee_id == user_id
    }
}

/// Contract row derived from an accepted proposal and its parent job.
#[derive(Debug, Clone)]
pub struct NewContract {
    pub job_id: Uuid,
    pub client_id: Uuid,
    pub employee_id: Uuid,
    pub proposal_id: Uuid,
    pub agreed_rate: BigDecimal,
    pub start_date: NaiveDate,
}

impl NewContract {
    pub fn from_acceptance(job: &Job, proposal: &Proposal, start_date: NaiveDate) -> Self {
        NewContract {
            job_id: job.id,
            client_id: job.client_id,
            employee_id: proposal.employee_id,
            proposal_id: proposal.id,
            agreed_rate: proposal
                .proposed_rate
                .clone()
                .unwrap_or_else(|| BigDecimal::from(0)),
            start_date,
        }
    }
}

/// Rows touched by an acceptance, whether freshly written or already in place.
#[derive(Debug, Clone, Serialize)]
pub struct Acceptance {
    pub proposal: Proposal,
    pub contract: Contract,
    pub job: Job,
    /// True when this call wrote nothing new.
    pub already_applied: bool,
}

#[derive(Debug, Clone)]
pub enum AcceptOutcome {
    Accepted(Acceptance),
    /// The proposal was rejected earlier; nothing was written.
    AlreadyRejected(Proposal),
    /// The proposal is pending but its job no longer takes proposals.
    JobNotOpen(Job),
}
