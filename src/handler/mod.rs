pub mod auth;
pub mod contracts;
pub mod conversations;
pub mod files;
pub mod jobs;
pub mod navigation;
pub mod pages;
pub mod proposals;
pub mod users;
