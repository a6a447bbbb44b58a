pub mod usermodel;
pub mod jobmodel;
pub mod proposalmodel;
pub mod messagemodel;
pub mod filemodel;
