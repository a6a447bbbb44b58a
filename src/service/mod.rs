pub mod auth_service;
pub mod conversation_service;
pub mod error;
pub mod file_service;
pub mod job_service;
pub mod proposal_service;
