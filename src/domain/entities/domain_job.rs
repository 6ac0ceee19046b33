use serde::{Deserialize, Serialize};

use crate::domain::entities::business::BusinessId;

/// Background work items for custom-domain provisioning.
///
/// Serialized into the `payload` column of `domain_jobs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainJob {
    DomainMonitoring {
        business_id: BusinessId,
    },
    CertificatePropagationRetry {
        business_id: BusinessId,
        retry_count: i32,
    },
    DomainRebuildContinue {
        business_id: BusinessId,
    },
    DomainVerification {
        business_id: BusinessId,
        domain_name: String,
    },
}

impl DomainJob {
    pub fn job_type(&self) -> &'static str {
        match self {
            DomainJob::DomainMonitoring { .. } => "domain_monitoring",
            DomainJob::CertificatePropagationRetry { .. } => "certificate_propagation_retry",
            DomainJob::DomainRebuildContinue { .. } => "domain_rebuild_continue",
            DomainJob::DomainVerification { .. } => "domain_verification",
        }
    }

    pub fn business_id(&self) -> BusinessId {
        match self {
            DomainJob::DomainMonitoring { business_id }
            | DomainJob::CertificatePropagationRetry { business_id, .. }
            | DomainJob::DomainRebuildContinue { business_id }
            | DomainJob::DomainVerification { business_id, .. } => *business_id,
        }
    }

    /// Key shared by every pending job of the same per-business chain.
    /// At most one pending job per key exists in the queue.
    pub fn dedupe_key(&self) -> Option<String> {
        match self {
            DomainJob::DomainMonitoring { business_id } => {
                Some(format!("domain_monitoring:{}", business_id))
            }
            DomainJob::CertificatePropagationRetry { business_id, .. } => {
                Some(format!("certificate_retry:{}", business_id))
            }
            DomainJob::DomainRebuildContinue { .. } | DomainJob::DomainVerification { .. } => None,
        }
    }

    /// Whether this job advances the chain of `pending` far enough to take
    /// its place in the queue. Only a later certificate retry of the same
    /// business does.
    pub fn supersedes(&self, pending: &DomainJob) -> bool {
        match (self, pending) {
            (
                DomainJob::CertificatePropagationRetry {
                    business_id,
                    retry_count,
                },
                DomainJob::CertificatePropagationRetry {
                    business_id: pending_business_id,
                    retry_count: pending_retry_count,
                },
            ) => business_id == pending_business_id && retry_count > pending_retry_count,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "running" => JobStatus::Running,
            "succeeded" => JobStatus::Succeeded,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Pending,
        }
    }
}
