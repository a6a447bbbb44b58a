// service/file_service.rs
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    db::{
        contractdb::ContractExt, filedb::FileUploadExt, jobdb::JobExt, proposaldb::ProposalExt,
        userdb::UserExt, Gateway,
    },
    models::{
        filemodel::{FileUpload, NewFileUpload, UploadType},
        jobmodel::JobStatus,
        usermodel::ProfileUpdate,
    },
    service::error::ServiceError,
    storage::ObjectStorage,
    utils::sanitize::sanitize_file_name,
};

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub content_type: String,
    /// Base64 payload, optionally as a `data:` URL.
    pub data: String,
    pub upload_type: UploadType,
    pub job_id: Option<Uuid>,
    pub proposal_id: Option<Uuid>,
    pub contract_id: Option<Uuid>,
}

fn decode_payload(data: &str) -> Result<Vec<u8>, ServiceError> {
    let encoded = match data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    };
    let encoded: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();

    // base64 inflates by 4/3; skip decoding obviously oversized payloads
    if encoded.len() / 4 * 3 > MAX_UPLOAD_BYTES + 3 {
        return Err(ServiceError::PayloadTooLarge(MAX_UPLOAD_BYTES));
    }

    let bytes = STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| ServiceError::Validation(format!("Invalid base64 file content: {}", e)))?;

    if bytes.is_empty() {
        return Err(ServiceError::Validation("File is empty".to_string()));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ServiceError::PayloadTooLarge(MAX_UPLOAD_BYTES));
    }
    Ok(bytes)
}

#[derive(Debug, Clone)]
pub struct FileService {
    db_client: Arc<dyn Gateway>,
    storage: Arc<dyn ObjectStorage>,
}

impl FileService {
    pub fn new(db_client: Arc<dyn Gateway>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { db_client, storage }
    }

    /// A file may only be linked to records the uploader takes part in.
    /// Attachments for a proposal still being written may point at any
    /// open job.
    async fn check_links(&self, owner_id: Uuid, request: &UploadRequest) -> Result<(), ServiceError> {
        if let Some(job_id) = request.job_id {
            let job = self
                .db_client
                .get_job_by_id(job_id)
                .await?
                .ok_or(ServiceError::JobNotFound(job_id))?;
            let drafting = request.upload_type == UploadType::ProposalAttachment && job.status == JobStatus::Open;
            if !job.is_owned_by(owner_id)
                && !drafting
                && self.db_client.find_proposal(job_id, owner_id).await?.is_none()
            {
                return Err(ServiceError::forbidden());
            }
        }

        if let Some(proposal_id) = request.proposal_id {
            let proposal = self
                .db_client
                .get_proposal(proposal_id)
                .await?
                .ok_or(ServiceError::ProposalNotFound(proposal_id))?;
            if proposal.employee_id != owner_id {
                let job = self
                    .db_client
                    .get_job_by_id(proposal.job_id)
                    .await?
                    .ok_or(ServiceError::JobNotFound(proposal.job_id))?;
                if !job.is_owned_by(owner_id) {
                    return Err(ServiceError::forbidden());
                }
            }
        }

        if let Some(contract_id) = request.contract_id {
            let contract = self
                .db_client
                .get_contract(contract_id)
                .await?
                .ok_or(ServiceError::ContractNotFound(contract_id))?;
            if !contract.is_party(owner_id) {
                return Err(ServiceError::forbidden());
            }
        }

        Ok(())
    }

    pub async fn upload(&self, owner_id: Uuid, request: UploadRequest) -> Result<FileUpload, ServiceError> {
        let bytes = decode_payload(&request.data)?;
        self.check_links(owner_id, &request).await?;
        let file_size = bytes.len() as i64;
        let file_name = sanitize_file_name(&request.file_name);

        let bucket = request.upload_type.bucket();
        let path = format!("{}/{}-{}", owner_id, Uuid::new_v4(), file_name);

        self.storage.upload(bucket, &path, bytes).await?;
        let file_url = self.storage.public_url(bucket, &path);

        let saved = self
            .db_client
            .save_file_upload(NewFileUpload {
                user_id: owner_id,
                job_id: request.job_id,
                proposal_id: request.proposal_id,
                contract_id: request.contract_id,
                file_name,
                file_url: file_url.clone(),
                file_type: request.content_type,
                file_size,
                upload_type: request.upload_type,
                storage_path: path.clone(),
            })
            .await;

        let upload = match saved {
            Ok(upload) => upload,
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(bucket, &path).await {
                    warn!("Failed to remove orphaned object {}/{}: {}", bucket, path, cleanup);
                }
                return Err(e.into());
            }
        };

        let profile_update = match upload.upload_type {
            UploadType::Resume => Some(ProfileUpdate {
                resume_url: Some(file_url),
                ..Default::default()
            }),
            UploadType::ProfilePicture => Some(ProfileUpdate {
                avatar_url: Some(file_url),
                ..Default::default()
            }),
            _ => None,
        };
        if let Some(update) = profile_update {
            self.db_client.update_user_profile(owner_id, update).await?;
        }

        info!(
            "Stored {} ({} bytes) for user {}",
            upload.upload_type.to_str(),
            upload.file_size,
            owner_id
        );
        Ok(upload)
    }

    pub async fn list_mine(&self, owner_id: Uuid) -> Result<Vec<FileUpload>, ServiceError> {
        Ok(self.db_client.get_user_file_uploads(owner_id).await?)
    }

    pub async fn delete(&self, owner_id: Uuid, file_id: Uuid) -> Result<(), ServiceError> {
        let upload = self
            .db_client
            .get_file_upload(file_id)
            .await?
            .ok_or(ServiceError::FileNotFound(file_id))?;

        if upload.user_id != owner_id {
            return Err(ServiceError::forbidden());
        }

        self.storage
            .delete(upload.upload_type.bucket(), &upload.storage_path)
            .await?;
        self.db_client.delete_file_upload(file_id).await?;

        info!("Deleted file {} for user {}", file_id, owner_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::memory::MemoryGateway,
        models::usermodel::UserRole,
        service::proposal_service::{
            tests::{open_job, submission, user},
            Decision, DecisionOutcome, ProposalService,
        },
        storage::MemoryStorage,
    };

    fn request(upload_type: UploadType, data: &str) -> UploadRequest {
        UploadRequest {
            file_name: "My CV.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            data: data.to_string(),
            upload_type,
            job_id: None,
            proposal_id: None,
            contract_id: None,
        }
    }

    fn setup() -> (Arc<MemoryGateway>, Arc<MemoryStorage>, FileService) {
        let db = Arc::new(MemoryGateway::new());
        let storage = Arc::new(MemoryStorage::new());
        let service = FileService::new(db.clone(), storage.clone());
        (db, storage, service)
    }

    #[tokio::test]
    async fn resume_upload_updates_profile() {
        let (db, storage, service) = setup();
        let alice = user(&db, "Alice", UserRole::Employee).await;

        let encoded = STANDARD.encode(b"%PDF-1.4 resume");
        let upload = service
            .upload(alice.id, request(UploadType::Resume, &encoded))
            .await
            .unwrap();

        assert_eq!(upload.file_name, "My_CV.pdf");
        assert_eq!(upload.file_size, 15);
        assert_eq!(storage.get("resumes", &upload.storage_path).unwrap(), b"%PDF-1.4 resume");

        let profile = db.get_user(Some(alice.id), None).await.unwrap().unwrap();
        assert_eq!(profile.resume_url.as_deref(), Some(upload.file_url.as_str()));
    }

    #[tokio::test]
    async fn data_urls_are_accepted() {
        let (db, _, service) = setup();
        let alice = user(&db, "Alice", UserRole::Employee).await;

        let data = format!("data:image/png;base64,{}", STANDARD.encode(b"png-bytes"));
        let upload = service
            .upload(alice.id, request(UploadType::ProfilePicture, &data))
            .await
            .unwrap();

        let profile = db.get_user(Some(alice.id), None).await.unwrap().unwrap();
        assert_eq!(profile.avatar_url.as_deref(), Some(upload.file_url.as_str()));
    }

    #[tokio::test]
    async fn rejects_bad_payloads() {
        let (db, storage, service) = setup();
        let alice = user(&db, "Alice", UserRole::Employee).await;

        let err = service
            .upload(alice.id, request(UploadType::JobAttachment, "!!not base64!!"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let too_big = STANDARD.encode(vec![0u8; MAX_UPLOAD_BYTES + 1]);
        let err = service
            .upload(alice.id, request(UploadType::JobAttachment, &too_big))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::PayloadTooLarge(_)));
        assert_eq!(storage.len(), 0);
    }

    #[tokio::test]
    async fn failed_record_insert_removes_object() {
        let (db, storage, service) = setup();
        let alice = user(&db, "Alice", UserRole::Employee).await;

        db.fail_next("save_file_upload", 1);
        let encoded = STANDARD.encode(b"attachment");
        assert!(service
            .upload(alice.id, request(UploadType::ProposalAttachment, &encoded))
            .await
            .is_err());
        assert_eq!(storage.len(), 0);
    }

    #[tokio::test]
    async fn storage_failure_writes_no_record() {
        let (db, storage, service) = setup();
        let alice = user(&db, "Alice", UserRole::Employee).await;

        storage.fail_uploads(true);
        let encoded = STANDARD.encode(b"attachment");
        let err = service
            .upload(alice.id, request(UploadType::MessageAttachment, &encoded))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Storage(_)));
        assert!(service.list_mine(alice.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_owner_deletes() {
        let (db, storage, service) = setup();
        let alice = user(&db, "Alice", UserRole::Employee).await;
        let bob = user(&db, "Bob", UserRole::Client).await;

        let encoded = STANDARD.encode(b"attachment");
        let upload = service
            .upload(alice.id, request(UploadType::JobAttachment, &encoded))
            .await
            .unwrap();

        assert!(matches!(
            service.delete(bob.id, upload.id).await.unwrap_err(),
            ServiceError::Forbidden(_)
        ));

        service.delete(alice.id, upload.id).await.unwrap();
        assert_eq!(storage.len(), 0);
        assert!(service.list_mine(alice.id).await.unwrap().is_empty());
        assert!(matches!(
            service.delete(alice.id, upload.id).await.unwrap_err(),
            ServiceError::FileNotFound(_)
        ));
    }

    #[tokio::test]
    async fn links_must_involve_the_uploader() {
        let (db, storage, service) = setup();
        let bob = user(&db, "Bob", UserRole::Client).await;
        let alice = user(&db, "Alice", UserRole::Employee).await;
        let mallory = user(&db, "Mallory", UserRole::Employee).await;
        let job = open_job(&db, &bob).await;
        let encoded = STANDARD.encode(b"attachment");

        let linked = |upload_type, job_id, proposal_id, contract_id| UploadRequest {
            job_id,
            proposal_id,
            contract_id,
            ..request(upload_type, &encoded)
        };

        service
            .upload(bob.id, linked(UploadType::JobAttachment, Some(job.id), None, None))
            .await
            .unwrap();
        assert!(matches!(
            service
                .upload(mallory.id, linked(UploadType::JobAttachment, Some(job.id), None, None))
                .await
                .unwrap_err(),
            ServiceError::Forbidden(_)
        ));
        // drafting a proposal for an open job
        service
            .upload(alice.id, linked(UploadType::ProposalAttachment, Some(job.id), None, None))
            .await
            .unwrap();

        let proposals = ProposalService::new(db.clone());
        let proposal = proposals.submit(&alice, submission(job.id, Some(200))).await.unwrap();
        for uploader in [&alice, &bob] {
            service
                .upload(uploader.id, linked(UploadType::ProposalAttachment, None, Some(proposal.id), None))
                .await
                .unwrap();
        }
        assert!(matches!(
            service
                .upload(mallory.id, linked(UploadType::ProposalAttachment, None, Some(proposal.id), None))
                .await
                .unwrap_err(),
            ServiceError::Forbidden(_)
        ));

        let contract = match proposals.decide(&bob, proposal.id, Decision::Accept).await.unwrap() {
            DecisionOutcome::Accepted(acceptance) => acceptance.contract,
            other => panic!("unexpected outcome {:?}", other),
        };
        service
            .upload(alice.id, linked(UploadType::MessageAttachment, None, None, Some(contract.id)))
            .await
            .unwrap();
        assert!(matches!(
            service
                .upload(mallory.id, linked(UploadType::MessageAttachment, None, None, Some(contract.id)))
                .await
                .unwrap_err(),
            ServiceError::Forbidden(_)
        ));

        let missing = Uuid::new_v4();
        assert!(matches!(
            service
                .upload(bob.id, linked(UploadType::JobAttachment, Some(missing), None, None))
                .await
                .unwrap_err(),
            ServiceError::JobNotFound(_)
        ));
        assert!(matches!(
            service
                .upload(bob.id, linked(UploadType::MessageAttachment, None, None, Some(missing)))
                .await
                .unwrap_err(),
            ServiceError::ContractNotFound(_)
        ));

        // rejected uploads never reach storage
        assert_eq!(storage.len(), 5);
        assert!(service.list_mine(mallory.id).await.unwrap().is_empty());
    }
}
