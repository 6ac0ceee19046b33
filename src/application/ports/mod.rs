pub mod domain_hosting;
pub mod health_check;
pub mod job_queue;
