pub mod db;
pub mod cache;
pub mod userdb;
pub mod jobdb;
pub mod proposaldb;
pub mod contractdb;
pub mod messagedb;
pub mod filedb;
pub mod sessiondb;

#[cfg(test)]
pub mod memory;

pub use db::{DBClient, Gateway};
