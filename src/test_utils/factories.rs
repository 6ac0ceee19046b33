//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::entities::business::{Business, BusinessStatus, HostType};

/// Create a test business with a live custom domain.
pub fn create_test_business(overrides: impl FnOnce(&mut Business)) -> Business {
    let mut business = Business {
        id: 1,
        name: "Test Business".to_string(),
        hostname: Some("example.com".to_string()),
        host_type: HostType::CustomDomain,
        status: BusinessStatus::CnameActive,
        canonical_preference: None,
        cname_monitoring_active: false,
        cname_check_attempts: 0,
        render_domain_added: true,
        cname_last_checked_at: None,
        created_at: Some(test_datetime()),
        updated_at: Some(test_datetime()),
    };
    overrides(&mut business);
    business
}

/// Create a custom-domain business that is eligible for a monitoring run.
pub fn create_monitoring_business(overrides: impl FnOnce(&mut Business)) -> Business {
    create_test_business(|b| {
        b.status = BusinessStatus::CnameMonitoring;
        b.cname_monitoring_active = true;
        overrides(b);
    })
}

/// Fixed timestamp for deterministic tests.
pub fn test_datetime() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 15)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::domain_monitoring::should_continue_monitoring;

    #[test]
    fn test_monitoring_business_passes_gate() {
        let business = create_monitoring_business(|_| {});
        assert!(should_continue_monitoring(&business));
    }

    #[test]
    fn test_overrides_apply_last() {
        let business = create_monitoring_business(|b| b.status = BusinessStatus::Active);
        assert_eq!(business.status, BusinessStatus::Active);
        assert!(business.cname_monitoring_active);
    }
}
