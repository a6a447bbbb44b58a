// db/memory.rs
//! In-memory gateway used by the unit tests. Mirrors the Postgres
//! constraints the services rely on: unique email, one proposal per
//! employee per job, one contract per proposal, jobs with proposals are
//! not deletable, and the accept transaction.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::{
    error::{DatabaseError, ErrorKind},
    Error,
};
use uuid::Uuid;

use super::{
    contractdb::ContractExt, filedb::FileUploadExt, jobdb::JobExt, messagedb::MessageExt,
    proposaldb::ProposalExt, sessiondb::SessionExt, userdb::UserExt,
};
use crate::{
    models::{filemodel::*, jobmodel::*, messagemodel::*, proposalmodel::*, usermodel::*},
    realtime::{ChangeEvent, RealtimeHub},
};

#[derive(Debug)]
struct ConstraintViolation {
    constraint: &'static str,
    kind: ErrorKind,
}

impl std::fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} \"{}\"", self.message(), self.constraint)
    }
}

impl std::error::Error for ConstraintViolation {}

impl DatabaseError for ConstraintViolation {
    fn message(&self) -> &str {
        match self.kind {
            ErrorKind::ForeignKeyViolation => "update or delete violates foreign key constraint",
            _ => "duplicate key value violates unique constraint",
        }
    }

    fn constraint(&self) -> Option<&str> {
        Some(self.constraint)
    }

    fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self
    }

    fn kind(&self) -> ErrorKind {
        match self.kind {
            ErrorKind::ForeignKeyViolation => ErrorKind::ForeignKeyViolation,
            _ => ErrorKind::UniqueViolation,
        }
    }
}

fn unique_violation(constraint: &'static str) -> Error {
    Error::Database(Box::new(ConstraintViolation {
        constraint,
        kind: ErrorKind::UniqueViolation,
    }))
}

fn foreign_key_violation(constraint: &'static str) -> Error {
    Error::Database(Box::new(ConstraintViolation {
        constraint,
        kind: ErrorKind::ForeignKeyViolation,
    }))
}

#[derive(Debug, Default)]
struct State {
    users: Vec<User>,
    jobs: Vec<Job>,
    proposals: Vec<Proposal>,
    contracts: Vec<Contract>,
    messages: Vec<Message>,
    files: Vec<FileUpload>,
    /// Revoked token id -> token expiry.
    revoked: HashMap<Uuid, DateTime<Utc>>,
    /// Failure injection: operation name -> remaining failures.
    failures: HashMap<&'static str, usize>,
    /// Written right after the next conversation read returns its snapshot.
    insert_after_read: Option<NewMessage>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl State {
    /// Strictly increasing clock so ordering by timestamp is deterministic.
    fn now(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_timestamp {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_timestamp = Some(now);
        now
    }

    fn take_failure(&mut self, operation: &'static str) -> Result<(), Error> {
        if let Some(remaining) = self.failures.get_mut(operation) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(Error::Protocol(format!("injected failure: {}", operation)));
            }
        }
        Ok(())
    }

    fn sender_name(&self, sender_id: Uuid) -> Option<String> {
        self.users
            .iter()
            .find(|u| u.id == sender_id)
            .map(|u| u.full_name.clone())
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryGateway {
    state: Arc<Mutex<State>>,
    hub: Option<Arc<RealtimeHub>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserted messages are announced on `hub`, like the Postgres trigger does.
    pub fn with_hub(hub: Arc<RealtimeHub>) -> Self {
        MemoryGateway {
            state: Arc::default(),
            hub: Some(hub),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Makes the next `times` calls of `operation` fail with a protocol error.
    pub fn fail_next(&self, operation: &'static str, times: usize) {
        self.lock().failures.insert(operation, times);
    }

    pub fn contracts_for_proposal(&self, proposal_id: Uuid) -> usize {
        self.lock()
            .contracts
            .iter()
            .filter(|c| c.proposal_id == proposal_id)
            .count()
    }

    pub fn message_count(&self) -> usize {
        self.lock().messages.len()
    }

    /// Overwrites a proposal's status without side effects, to simulate
    /// rows left behind by an interrupted acceptance.
    pub fn force_proposal_status(&self, proposal_id: Uuid, status: ProposalStatus) {
        let mut state = self.lock();
        if let Some(p) = state.proposals.iter_mut().find(|p| p.id == proposal_id) {
            p.status = status;
        }
    }

    pub fn force_job_status(&self, job_id: Uuid, status: JobStatus) {
        let mut state = self.lock();
        if let Some(j) = state.jobs.iter_mut().find(|j| j.id == job_id) {
            j.status = status;
        }
    }

    /// Inserts `message` once the next `get_conversation_messages` has taken
    /// its snapshot, so the insert is missing from the returned history.
    pub fn insert_after_next_read(&self, message: NewMessage) {
        self.lock().insert_after_read = Some(message);
    }

    pub fn revoked_count(&self) -> usize {
        self.lock().revoked.len()
    }
}

#[async_trait]
impl UserExt for MemoryGateway {
    async fn get_user(&self, user_id: Option<Uuid>, email: Option<&str>) -> Result<Option<User>, Error> {
        let mut state = self.lock();
        state.take_failure("get_user")?;
        let found = if let Some(id) = user_id {
            state.users.iter().find(|u| u.id == id).cloned()
        } else if let Some(email) = email {
            state
                .users
                .iter()
                .find(|u| u.email.eq_ignore_ascii_case(email))
                .cloned()
        } else {
            None
        };
        Ok(found)
    }

    async fn save_user(&self, new_user: NewUser) -> Result<User, Error> {
        let mut state = self.lock();
        state.take_failure("save_user")?;
        if state.users.iter().any(|u| u.email.eq_ignore_ascii_case(&new_user.email)) {
            return Err(unique_violation("users_email_key"));
        }
        let now = state.now();
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            full_name: new_user.full_name,
            password: new_user.password_hash,
            role: new_user.role,
            phone: None,
            location: None,
            bio: None,
            skills: Vec::new(),
            hourly_rate: None,
            company_name: None,
            website: None,
            resume_url: None,
            avatar_url: None,
            created_at: now,
            updated_at: now,
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn update_user_profile(&self, user_id: Uuid, update: ProfileUpdate) -> Result<User, Error> {
        let mut state = self.lock();
        state.take_failure("update_user_profile")?;
        let now = state.now();
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(Error::RowNotFound)?;

        if let Some(v) = update.full_name { user.full_name = v; }
        if let Some(v) = update.phone { user.phone = Some(v); }
        if let Some(v) = update.location { user.location = Some(v); }
        if let Some(v) = update.bio { user.bio = Some(v); }
        if let Some(v) = update.skills { user.skills = v; }
        if let Some(v) = update.hourly_rate { user.hourly_rate = Some(v); }
        if let Some(v) = update.company_name { user.company_name = Some(v); }
        if let Some(v) = update.website { user.website = Some(v); }
        if let Some(v) = update.resume_url { user.resume_url = Some(v); }
        if let Some(v) = update.avatar_url { user.avatar_url = Some(v); }
        user.updated_at = now;

        Ok(user.clone())
    }
}

#[async_trait]
impl JobExt for MemoryGateway {
    async fn create_job(&self, new_job: NewJob) -> Result<Job, Error> {
        let mut state = self.lock();
        state.take_failure("create_job")?;
        let now = state.now();
        let job = Job {
            id: Uuid::new_v4(),
            client_id: new_job.client_id,
            title: new_job.title,
            description: new_job.description,
            budget_min: new_job.budget_min,
            budget_max: new_job.budget_max,
            timeline: new_job.timeline,
            category: new_job.category,
            required_skills: new_job.required_skills,
            status: JobStatus::Open,
            created_at: now,
            updated_at: now,
        };
        state.jobs.push(job.clone());
        Ok(job)
    }

    async fn get_job_by_id(&self, job_id: Uuid) -> Result<Option<Job>, Error> {
        let mut state = self.lock();
        state.take_failure("get_job_by_id")?;
        Ok(state.jobs.iter().find(|j| j.id == job_id).cloned())
    }

    async fn get_open_jobs(&self, category: Option<&str>, limit: i64, offset: i64) -> Result<Vec<Job>, Error> {
        let state = self.lock();
        let mut jobs: Vec<Job> = state
            .jobs
            .iter()
            .filter(|j| j.status == JobStatus::Open)
            .filter(|j| category.map_or(true, |c| j.category.as_deref() == Some(c)))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn get_client_jobs(&self, client_id: Uuid) -> Result<Vec<Job>, Error> {
        let state = self.lock();
        let mut jobs: Vec<Job> = state.jobs.iter().filter(|j| j.client_id == client_id).cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn update_job(&self, job_id: Uuid, update: JobUpdate) -> Result<Job, Error> {
        let mut state = self.lock();
        state.take_failure("update_job")?;
        let now = state.now();
        let job = state.jobs.iter_mut().find(|j| j.id == job_id).ok_or(Error::RowNotFound)?;
        if let Some(v) = update.title { job.title = v; }
        if let Some(v) = update.description { job.description = v; }
        if let Some(v) = update.budget_min { job.budget_min = Some(v); }
        if let Some(v) = update.budget_max { job.budget_max = Some(v); }
        if let Some(v) = update.timeline { job.timeline = Some(v); }
        if let Some(v) = update.category { job.category = Some(v); }
        if let Some(v) = update.required_skills { job.required_skills = v; }
        job.updated_at = now;
        Ok(job.clone())
    }

    async fn delete_job(&self, job_id: Uuid) -> Result<(), Error> {
        let mut state = self.lock();
        state.take_failure("delete_job")?;
        if state.proposals.iter().any(|p| p.job_id == job_id) {
            return Err(foreign_key_violation("proposals_job_id_fkey"));
        }
        let before = state.jobs.len();
        state.jobs.retain(|j| j.id != job_id);
        if state.jobs.len() == before {
            return Err(Error::RowNotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl ProposalExt for MemoryGateway {
    async fn create_proposal(&self, new_proposal: NewProposal) -> Result<Proposal, Error> {
        let mut state = self.lock();
        state.take_failure("create_proposal")?;
        if state
            .proposals
            .iter()
            .any(|p| p.job_id == new_proposal.job_id && p.employee_id == new_proposal.employee_id)
        {
            return Err(unique_violation("uq_proposals_job_employee"));
        }
        let now = state.now();
        let proposal = Proposal {
            id: Uuid::new_v4(),
            job_id: new_proposal.job_id,
            employee_id: new_proposal.employee_id,
            cover_letter: new_proposal.cover_letter,
            proposed_rate: new_proposal.proposed_rate,
            estimated_duration: new_proposal.estimated_duration,
            status: ProposalStatus::Pending,
            attachments: sqlx::types::Json(new_proposal.attachments),
            created_at: now,
            updated_at: now,
        };
        state.proposals.push(proposal.clone());
        Ok(proposal)
    }

    async fn get_proposal(&self, proposal_id: Uuid) -> Result<Option<Proposal>, Error> {
        let mut state = self.lock();
        state.take_failure("get_proposal")?;
        Ok(state.proposals.iter().find(|p| p.id == proposal_id).cloned())
    }

    async fn find_proposal(&self, job_id: Uuid, employee_id: Uuid) -> Result<Option<Proposal>, Error> {
        let mut state = self.lock();
        state.take_failure("find_proposal")?;
        Ok(state
            .proposals
            .iter()
            .find(|p| p.job_id == job_id && p.employee_id == employee_id)
            .cloned())
    }

    async fn get_job_proposals(&self, job_id: Uuid) -> Result<Vec<Proposal>, Error> {
        let state = self.lock();
        let mut proposals: Vec<Proposal> = state.proposals.iter().filter(|p| p.job_id == job_id).cloned().collect();
        proposals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(proposals)
    }

    async fn get_employee_proposals(&self, employee_id: Uuid) -> Result<Vec<Proposal>, Error> {
        let state = self.lock();
        let mut proposals: Vec<Proposal> =
            state.proposals.iter().filter(|p| p.employee_id == employee_id).cloned().collect();
        proposals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(proposals)
    }

    async fn reject_proposal(&self, proposal_id: Uuid) -> Result<Option<Proposal>, Error> {
        let mut state = self.lock();
        state.take_failure("reject_proposal")?;
        let now = state.now();
        match state
            .proposals
            .iter_mut()
            .find(|p| p.id == proposal_id && p.status == ProposalStatus::Pending)
        {
            Some(proposal) => {
                proposal.status = ProposalStatus::Rejected;
                proposal.updated_at = now;
                Ok(Some(proposal.clone()))
            }
            None => Ok(None),
        }
    }

    async fn accept_proposal(&self, proposal_id: Uuid, start_date: NaiveDate) -> Result<AcceptOutcome, Error> {
        // The whole sequence runs under one lock and only commits on success,
        // which is what the Postgres transaction gives us.
        let mut guard = self.lock();
        guard.take_failure("accept_proposal")?;
        let now = guard.now();

        let state = &mut *guard;
        let proposal_idx = state
            .proposals
            .iter()
            .position(|p| p.id == proposal_id)
            .ok_or(Error::RowNotFound)?;
        let proposal = state.proposals[proposal_idx].clone();

        let job_idx = state
            .jobs
            .iter()
            .position(|j| j.id == proposal.job_id)
            .ok_or(Error::RowNotFound)?;
        let job = state.jobs[job_idx].clone();

        let mut wrote = false;

        let proposal = match proposal.status {
            ProposalStatus::Rejected => return Ok(AcceptOutcome::AlreadyRejected(proposal)),
            ProposalStatus::Pending if job.status != JobStatus::Open => {
                return Ok(AcceptOutcome::JobNotOpen(job))
            }
            ProposalStatus::Pending => {
                wrote = true;
                let mut accepted = proposal;
                accepted.status = ProposalStatus::Accepted;
                accepted.updated_at = now;
                accepted
            }
            ProposalStatus::Accepted => proposal,
        };

        let contract = match state.contracts.iter().find(|c| c.proposal_id == proposal_id) {
            Some(contract) => contract.clone(),
            None => {
                wrote = true;
                let new_contract = NewContract::from_acceptance(&job, &proposal, start_date);
                Contract {
                    id: Uuid::new_v4(),
                    job_id: new_contract.job_id,
                    client_id: new_contract.client_id,
                    employee_id: new_contract.employee_id,
                    proposal_id: new_contract.proposal_id,
                    agreed_rate: new_contract.agreed_rate,
                    start_date: new_contract.start_date,
                    end_date: None,
                    status: ContractStatus::Active,
                    created_at: now,
                    updated_at: now,
                }
            }
        };

        let mut job = job;
        if job.status == JobStatus::Open {
            wrote = true;
            job.status = JobStatus::InProgress;
            job.updated_at = now;
        }

        // commit
        state.proposals[proposal_idx] = proposal.clone();
        if !state.contracts.iter().any(|c| c.id == contract.id) {
            state.contracts.push(contract.clone());
        }
        state.jobs[job_idx] = job.clone();

        Ok(AcceptOutcome::Accepted(Acceptance {
            proposal,
            contract,
            job,
            already_applied: !wrote,
        }))
    }
}

#[async_trait]
impl ContractExt for MemoryGateway {
    async fn get_contract(&self, contract_id: Uuid) -> Result<Option<Contract>, Error> {
        let mut state = self.lock();
        state.take_failure("get_contract")?;
        Ok(state.contracts.iter().find(|c| c.id == contract_id).cloned())
    }

    async fn get_user_contracts(&self, user_id: Uuid) -> Result<Vec<Contract>, Error> {
        let state = self.lock();
        let mut contracts: Vec<Contract> = state.contracts.iter().filter(|c| c.is_party(user_id)).cloned().collect();
        contracts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(contracts)
    }
}

#[async_trait]
impl MessageExt for MemoryGateway {
    async fn insert_message(&self, new_message: NewMessage) -> Result<Message, Error> {
        let message = {
            let mut state = self.lock();
            state.take_failure("insert_message")?;
            let now = state.now();
            let message = Message {
                id: Uuid::new_v4(),
                sender_id: new_message.sender_id,
                sender_name: state.sender_name(new_message.sender_id),
                content: new_message.content,
                conversation: new_message.conversation,
                created_at: now,
            };
            state.messages.push(message.clone());
            message
        };

        if let Some(hub) = &self.hub {
            hub.publish(ChangeEvent::MessageInserted {
                message_id: message.id,
                conversation: message.conversation,
            });
        }

        Ok(message)
    }

    async fn get_conversation_messages(&self, conversation: ConversationKey) -> Result<Vec<Message>, Error> {
        let (mut messages, pending) = {
            let mut state = self.lock();
            state.take_failure("get_conversation_messages")?;
            let messages: Vec<Message> = state
                .messages
                .iter()
                .filter(|m| m.conversation == conversation)
                .cloned()
                .collect();
            (messages, state.insert_after_read.take())
        };

        if let Some(pending) = pending {
            self.insert_message(pending).await?;
        }

        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(messages)
    }
}

#[async_trait]
impl FileUploadExt for MemoryGateway {
    async fn save_file_upload(&self, upload: NewFileUpload) -> Result<FileUpload, Error> {
        let mut state = self.lock();
        state.take_failure("save_file_upload")?;
        let now = state.now();
        let file = FileUpload {
            id: Uuid::new_v4(),
            user_id: upload.user_id,
            job_id: upload.job_id,
            proposal_id: upload.proposal_id,
            contract_id: upload.contract_id,
            file_name: upload.file_name,
            file_url: upload.file_url,
            file_type: upload.file_type,
            file_size: upload.file_size,
            upload_type: upload.upload_type,
            storage_path: upload.storage_path,
            created_at: now,
        };
        state.files.push(file.clone());
        Ok(file)
    }

    async fn get_file_upload(&self, file_id: Uuid) -> Result<Option<FileUpload>, Error> {
        let state = self.lock();
        Ok(state.files.iter().find(|f| f.id == file_id).cloned())
    }

    async fn get_user_file_uploads(&self, user_id: Uuid) -> Result<Vec<FileUpload>, Error> {
        let state = self.lock();
        let mut files: Vec<FileUpload> = state.files.iter().filter(|f| f.user_id == user_id).cloned().collect();
        files.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(files)
    }

    async fn delete_file_upload(&self, file_id: Uuid) -> Result<(), Error> {
        let mut state = self.lock();
        state.take_failure("delete_file_upload")?;
        let before = state.files.len();
        state.files.retain(|f| f.id != file_id);
        if state.files.len() == before {
            return Err(Error::RowNotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl SessionExt for MemoryGateway {
    async fn revoke_token(&self, jti: Uuid, expires_at: DateTime<Utc>) -> Result<(), Error> {
        let mut state = self.lock();
        let now = Utc::now();
        state.revoked.retain(|_, expiry| *expiry >= now);
        state.revoked.insert(jti, expires_at);
        Ok(())
    }

    async fn is_token_revoked(&self, jti: Uuid) -> Result<bool, Error> {
        Ok(self.lock().revoked.contains_key(&jti))
    }
}
