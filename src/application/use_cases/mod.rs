pub mod certificate_retry;
pub mod domain_monitoring;
pub mod domain_rebuild;
pub mod domain_verification;
pub mod job_runner;
