use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::userdtos::validate_non_negative;
use crate::{
    models::proposalmodel::Attachment,
    service::proposal_service::{Decision, ProposalSubmission},
};

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct SubmitProposalDto {
    #[validate(length(min = 10, max = 5000, message = "Cover letter must be 10-5000 characters"))]
    pub cover_letter: String,

    #[validate(custom = "validate_non_negative")]
    pub proposed_rate: Option<BigDecimal>,

    #[validate(length(max = 100))]
    pub estimated_duration: Option<String>,

    #[serde(default)]
    #[validate(length(max = 10, message = "At most 10 attachments"))]
    pub attachments: Vec<Attachment>,
}

impl SubmitProposalDto {
    pub fn into_submission(self, job_id: Uuid) -> ProposalSubmission {
        ProposalSubmission {
            job_id,
            cover_letter: self.cover_letter,
            proposed_rate: self.proposed_rate,
            estimated_duration: self.estimated_duration,
            attachments: self.attachments,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionDto {
    pub decision: Decision,
}
