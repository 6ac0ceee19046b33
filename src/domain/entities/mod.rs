pub mod business;
pub mod domain_job;
pub mod domain_state;
