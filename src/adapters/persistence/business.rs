use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::Row;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    domain::entities::business::{Business, BusinessId, CanonicalPreference, HostType},
    use_cases::domain_monitoring::{BusinessRepo, CheckUpdate},
};

const SELECT_COLS: &str = r#"
    id, name, hostname, host_type, status, canonical_preference,
    cname_monitoring_active, cname_check_attempts, render_domain_added,
    cname_last_checked_at, created_at, updated_at
"#;

fn row_to_business(row: sqlx::postgres::PgRow) -> Business {
    let status: String = row.get("status");
    let host_type: Option<String> = row.get("host_type");
    let canonical_preference: Option<String> = row.get("canonical_preference");

    Business {
        id: row.get("id"),
        name: row.get("name"),
        hostname: row.get("hostname"),
        host_type: HostType::from_str(host_type.as_deref().unwrap_or_default()),
        status: status.parse().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Unknown business status, treating as pending");
            Default::default()
        }),
        canonical_preference: canonical_preference
            .as_deref()
            .and_then(CanonicalPreference::parse),
        cname_monitoring_active: row.get("cname_monitoring_active"),
        cname_check_attempts: row.get("cname_check_attempts"),
        render_domain_added: row.get("render_domain_added"),
        cname_last_checked_at: row.get("cname_last_checked_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl BusinessRepo for PostgresPersistence {
    async fn get_by_id(&self, business_id: BusinessId) -> AppResult<Option<Business>> {
        let row = sqlx::query(&format!("SELECT {} FROM businesses WHERE id = $1", SELECT_COLS))
            .bind(business_id)
            .fetch_optional(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(row.map(row_to_business))
    }

    async fn record_check(&self, business_id: BusinessId, update: &CheckUpdate) -> AppResult<Business> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE businesses
            SET cname_check_attempts = $2,
                status = $3,
                cname_monitoring_active = $4,
                cname_last_checked_at = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(business_id)
        .bind(update.attempts)
        .bind(update.status.as_str())
        .bind(update.monitoring_active)
        .bind(update.checked_at)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row_to_business(row))
    }

    async fn set_monitoring_active(&self, business_id: BusinessId, active: bool) -> AppResult<Business> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE businesses
            SET cname_monitoring_active = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(business_id)
        .bind(active)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row_to_business(row))
    }

    async fn restart_monitoring(&self, business_id: BusinessId) -> AppResult<Business> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE businesses
            SET status = 'cname_monitoring',
                cname_check_attempts = 0,
                cname_monitoring_active = TRUE,
                cname_last_checked_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(business_id)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row_to_business(row))
    }

    async fn set_render_domain_added(&self, business_id: BusinessId, added: bool) -> AppResult<Business> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE businesses
            SET render_domain_added = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(business_id)
        .bind(added)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row_to_business(row))
    }

    async fn list_due_for_monitoring(
        &self,
        checked_before: NaiveDateTime,
        max_attempts: i32,
    ) -> AppResult<Vec<Business>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM businesses
            WHERE status = 'cname_monitoring'
              AND cname_monitoring_active
              AND cname_check_attempts < $2
              AND host_type = 'custom_domain'
              AND btrim(coalesce(hostname, '')) <> ''
              AND (cname_last_checked_at IS NULL OR cname_last_checked_at <= $1)
            ORDER BY id
            "#,
            SELECT_COLS
        ))
        .bind(checked_before)
        .bind(max_attempts)
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(rows.into_iter().map(row_to_business).collect())
    }
}
