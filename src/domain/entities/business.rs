use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub type BusinessId = i64;

/// Spacing between two health checks of the same business.
pub const CNAME_CHECK_INTERVAL_SECS: i64 = 300;

/// Slack applied to the spacing so a job rescheduled exactly one interval
/// later is not skipped because of queue latency.
const CNAME_CHECK_GRACE_SECS: i64 = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessStatus {
    #[default]
    Pending,
    Active,
    Inactive,
    Suspended,
    CnamePending,
    CnameMonitoring,
    CnameActive,
    CnameTimeout,
}

impl BusinessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessStatus::Pending => "pending",
            BusinessStatus::Active => "active",
            BusinessStatus::Inactive => "inactive",
            BusinessStatus::Suspended => "suspended",
            BusinessStatus::CnamePending => "cname_pending",
            BusinessStatus::CnameMonitoring => "cname_monitoring",
            BusinessStatus::CnameActive => "cname_active",
            BusinessStatus::CnameTimeout => "cname_timeout",
        }
    }
}

impl std::fmt::Display for BusinessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BusinessStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(BusinessStatus::Pending),
            "active" => Ok(BusinessStatus::Active),
            "inactive" => Ok(BusinessStatus::Inactive),
            "suspended" => Ok(BusinessStatus::Suspended),
            "cname_pending" => Ok(BusinessStatus::CnamePending),
            "cname_monitoring" => Ok(BusinessStatus::CnameMonitoring),
            "cname_active" => Ok(BusinessStatus::CnameActive),
            "cname_timeout" => Ok(BusinessStatus::CnameTimeout),
            _ => Err(format!("Invalid business status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostType {
    Subdomain,
    CustomDomain,
}

impl HostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HostType::Subdomain => "subdomain",
            HostType::CustomDomain => "custom_domain",
        }
    }

    /// Unknown values fall back to `Subdomain`, which keeps the business out
    /// of every custom-domain flow.
    pub fn from_str(s: &str) -> Self {
        match s {
            "custom_domain" => HostType::CustomDomain,
            _ => HostType::Subdomain,
        }
    }
}

/// Which variant of a custom domain is primary for redirects and certificates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalPreference {
    Apex,
    Www,
}

impl CanonicalPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalPreference::Apex => "apex",
            CanonicalPreference::Www => "www",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "apex" => Some(CanonicalPreference::Apex),
            "www" => Some(CanonicalPreference::Www),
            _ => None,
        }
    }
}

/// Row of the host application's `businesses` table, limited to the columns
/// domain monitoring reads or writes.
#[derive(Debug, Clone, Serialize)]
pub struct Business {
    pub id: BusinessId,
    pub name: String,
    pub hostname: Option<String>,
    pub host_type: HostType,
    pub status: BusinessStatus,
    pub canonical_preference: Option<CanonicalPreference>,
    pub cname_monitoring_active: bool,
    pub cname_check_attempts: i32,
    pub render_domain_added: bool,
    pub cname_last_checked_at: Option<NaiveDateTime>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl Business {
    pub fn is_custom_domain(&self) -> bool {
        self.host_type == HostType::CustomDomain
    }

    /// The stored hostname, if it is not blank.
    pub fn custom_hostname(&self) -> Option<&str> {
        self.hostname
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
    }

    pub fn cname_due_for_check(&self, now: NaiveDateTime) -> bool {
        self.next_check_due_in(now).is_none()
    }

    /// Time left until the business is due for another check, `None` when it
    /// is due already.
    pub fn next_check_due_in(&self, now: NaiveDateTime) -> Option<Duration> {
        let last_checked = self.cname_last_checked_at?;
        let spacing = Duration::seconds(CNAME_CHECK_INTERVAL_SECS - CNAME_CHECK_GRACE_SECS);
        let remaining = spacing - (now - last_checked);
        (remaining > Duration::zero()).then_some(remaining)
    }
}

/// Cutoff for the pending sweep: businesses last checked at or before this
/// instant are due.
pub fn cname_due_cutoff(now: NaiveDateTime) -> NaiveDateTime {
    now - Duration::seconds(CNAME_CHECK_INTERVAL_SECS - CNAME_CHECK_GRACE_SECS)
}
