use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "upload_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UploadType {
    JobAttachment,
    ProposalAttachment,
    Resume,
    ProfilePicture,
    MessageAttachment,
}

impl UploadType {
    pub fn to_str(&self) -> &str {
        match self {
            UploadType::JobAttachment => "job_attachment",
            UploadType::ProposalAttachment => "proposal_attachment",
            UploadType::Resume => "resume",
            UploadType::ProfilePicture => "profile_picture",
            UploadType::MessageAttachment => "message_attachment",
        }
    }

    /// Storage bucket the object lands in.
    pub fn bucket(&self) -> &'static str {
        match self {
            UploadType::ProfilePicture => "avatars",
            UploadType::Resume => "resumes",
            _ => "attachments",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FileUpload {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_id: Option<Uuid>,
    pub proposal_id: Option<Uuid>,
    pub contract_id: Option<Uuid>,
    pub file_name: String,
    pub file_url: String,
    pub file_type: String,
    pub file_size: i64,
    pub upload_type: UploadType,
    #[serde(skip_serializing)]
    pub storage_path: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFileUpload {
    pub user_id: Uuid,
    pub job_id: Option<Uuid>,
    pub proposal_id: Option<Uuid>,
    pub contract_id: Option<Uuid>,
    pub file_name: String,
    pub file_url: String,
    pub file_type: String,
    pub file_size: i64,
    pub upload_type: UploadType,
    pub storage_path: String,
}
