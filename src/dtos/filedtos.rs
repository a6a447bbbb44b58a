use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{models::filemodel::UploadType, service::file_service::UploadRequest};

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct UploadFileDto {
    #[validate(length(min = 1, max = 255, message = "File name is required"))]
    pub file_name: String,

    #[validate(length(min = 1, max = 100, message = "Content type is required"))]
    pub content_type: String,

    /// Base64 content, plain or as a data URL.
    #[validate(length(min = 1, message = "File content is required"))]
    pub data: String,

    pub upload_type: UploadType,
    pub job_id: Option<Uuid>,
    pub proposal_id: Option<Uuid>,
    pub contract_id: Option<Uuid>,
}

impl From<UploadFileDto> for UploadRequest {
    fn from(dto: UploadFileDto) -> Self {
        UploadRequest {
            file_name: dto.file_name,
            content_type: dto.content_type,
            data: dto.data,
            upload_type: dto.upload_type,
            job_id: dto.job_id,
            proposal_id: dto.proposal_id,
            contract_id: dto.contract_id,
        }
    }
}
