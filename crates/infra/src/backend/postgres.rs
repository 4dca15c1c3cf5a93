//! Postgres-backed submission store.
//!
//! One row per wizard session in `intake_submissions`. A session with remote
//! drafts enabled inserts a `draft` row and keeps updating it; the final
//! submit flips the same row to `submitted`.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | BackendError |
//! |------------|----------------------|--------------|
//! | Database (unique / check / not-null violation) | `23505` / `23514` / `23502` | `Constraint` |
//! | Database (other) | Any other | `Storage` |
//! | PoolClosed / PoolTimedOut / Io / Tls | N/A | `Connection` |
//! | Other | N/A | `Storage` |

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::{Span, instrument};

use intake_core::{AdvisorId, SubmissionId};
use intake_wizard::{
    BackendError, StepNumber, StoredSubmission, SubmissionBackend, SubmissionRecord,
    SubmissionStatus,
};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS intake_submissions (
    id              UUID PRIMARY KEY,
    form_type       TEXT NOT NULL,
    status          TEXT NOT NULL CHECK (status IN ('draft', 'submitted', 'under_review', 'approved', 'declined')),
    advisor_id      UUID,
    advisor_name    TEXT,
    advisor_email   TEXT,
    applicant_name  TEXT,
    applicant_email TEXT,
    applicant_phone TEXT,
    form_data       JSONB NOT NULL,
    current_step    INTEGER NOT NULL CHECK (current_step >= 1),
    source_url      TEXT NOT NULL,
    submitted_at    TIMESTAMPTZ,
    created_at      TIMESTAMPTZ NOT NULL,
    updated_at      TIMESTAMPTZ NOT NULL
)
"#;

const CREATE_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS intake_submissions_advisor_idx
    ON intake_submissions (advisor_id, status)
"#;

#[derive(Debug, Clone)]
pub struct PostgresSubmissionBackend {
    pool: Arc<PgPool>,
}

impl PostgresSubmissionBackend {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect with a small pool sized for a single intake process.
    pub async fn connect(database_url: &str) -> Result<Self, BackendError> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the submissions table if it does not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), BackendError> {
        for statement in [CREATE_TABLE, CREATE_INDEX] {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SubmissionBackend for PostgresSubmissionBackend {
    #[instrument(
        skip(self, record),
        fields(form_type = %record.form_type, status = record.status.as_str(), submission_id = tracing::field::Empty),
        err
    )]
    async fn insert(&self, record: &SubmissionRecord) -> Result<SubmissionId, BackendError> {
        let id = SubmissionId::new();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO intake_submissions (
                id, form_type, status,
                advisor_id, advisor_name, advisor_email,
                applicant_name, applicant_email, applicant_phone,
                form_data, current_step, source_url, submitted_at,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $14)
            "#,
        )
        .bind(id.as_uuid())
        .bind(&record.form_type)
        .bind(record.status.as_str())
        .bind(record.advisor_id.map(uuid::Uuid::from))
        .bind(&record.advisor_name)
        .bind(&record.advisor_email)
        .bind(&record.applicant_name)
        .bind(&record.applicant_email)
        .bind(&record.applicant_phone)
        .bind(&record.form_data)
        .bind(i32::from(record.current_step.get()))
        .bind(&record.source_url)
        .bind(record.submitted_at)
        .bind(now)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert", e))?;

        Span::current().record("submission_id", tracing::field::display(id));
        Ok(id)
    }

    #[instrument(
        skip(self, record),
        fields(submission_id = %id, status = record.status.as_str()),
        err
    )]
    async fn update(&self, id: SubmissionId, record: &SubmissionRecord) -> Result<(), BackendError> {
        let result = sqlx::query(
            r#"
            UPDATE intake_submissions SET
                form_type = $2,
                status = $3,
                advisor_id = $4,
                advisor_name = $5,
                advisor_email = $6,
                applicant_name = $7,
                applicant_email = $8,
                applicant_phone = $9,
                form_data = $10,
                current_step = $11,
                source_url = $12,
                submitted_at = $13,
                updated_at = $14
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(&record.form_type)
        .bind(record.status.as_str())
        .bind(record.advisor_id.map(uuid::Uuid::from))
        .bind(&record.advisor_name)
        .bind(&record.advisor_email)
        .bind(&record.applicant_name)
        .bind(&record.applicant_email)
        .bind(&record.applicant_phone)
        .bind(&record.form_data)
        .bind(i32::from(record.current_step.get()))
        .bind(&record.source_url)
        .bind(record.submitted_at)
        .bind(Utc::now())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update", e))?;

        if result.rows_affected() == 0 {
            return Err(BackendError::NotFound(id));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(submission_id = %id), err)]
    async fn fetch(&self, id: SubmissionId) -> Result<Option<StoredSubmission>, BackendError> {
        let row = sqlx::query(
            r#"
            SELECT
                id, form_type, status,
                advisor_id, advisor_name, advisor_email,
                applicant_name, applicant_email, applicant_phone,
                form_data, current_step, source_url, submitted_at,
                created_at, updated_at
            FROM intake_submissions
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("fetch", e))?;

        row.map(|row| {
            SubmissionRow::from_row(&row)
                .map_err(|e| BackendError::Storage(format!("failed to decode submission row: {e}")))?
                .try_into()
        })
        .transpose()
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> BackendError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23514") | Some("23502") => BackendError::Constraint(msg),
                _ => BackendError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            BackendError::Connection(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::PoolTimedOut => {
            BackendError::Connection(format!("timed out acquiring a connection in {}", operation))
        }
        sqlx::Error::Io(e) => BackendError::Connection(format!("io error in {}: {}", operation, e)),
        sqlx::Error::Tls(e) => BackendError::Connection(format!("tls error in {}: {}", operation, e)),
        other => BackendError::Storage(format!("sqlx error in {}: {}", operation, other)),
    }
}

// SQLx row types

#[derive(Debug)]
struct SubmissionRow {
    id: uuid::Uuid,
    form_type: String,
    status: String,
    advisor_id: Option<uuid::Uuid>,
    advisor_name: Option<String>,
    advisor_email: Option<String>,
    applicant_name: Option<String>,
    applicant_email: Option<String>,
    applicant_phone: Option<String>,
    form_data: serde_json::Value,
    current_step: i32,
    source_url: String,
    submitted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SubmissionRow {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(SubmissionRow {
            id: row.try_get("id")?,
            form_type: row.try_get("form_type")?,
            status: row.try_get("status")?,
            advisor_id: row.try_get("advisor_id")?,
            advisor_name: row.try_get("advisor_name")?,
            advisor_email: row.try_get("advisor_email")?,
            applicant_name: row.try_get("applicant_name")?,
            applicant_email: row.try_get("applicant_email")?,
            applicant_phone: row.try_get("applicant_phone")?,
            form_data: row.try_get("form_data")?,
            current_step: row.try_get("current_step")?,
            source_url: row.try_get("source_url")?,
            submitted_at: row.try_get("submitted_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<SubmissionRow> for StoredSubmission {
    type Error = BackendError;

    fn try_from(row: SubmissionRow) -> Result<Self, Self::Error> {
        let status = SubmissionStatus::from_str(&row.status)
            .map_err(|e| BackendError::Storage(e.to_string()))?;
        let current_step = u8::try_from(row.current_step)
            .ok()
            .and_then(|n| StepNumber::new(n).ok())
            .ok_or_else(|| {
                BackendError::Storage(format!("invalid current_step {} in row {}", row.current_step, row.id))
            })?;

        Ok(StoredSubmission {
            id: SubmissionId::from_uuid(row.id),
            record: SubmissionRecord {
                form_type: row.form_type,
                status,
                advisor_id: row.advisor_id.map(AdvisorId::from_uuid),
                advisor_name: row.advisor_name,
                advisor_email: row.advisor_email,
                applicant_name: row.applicant_name,
                applicant_email: row.applicant_email,
                applicant_phone: row.applicant_phone,
                form_data: row.form_data,
                current_step,
                source_url: row.source_url,
                submitted_at: row.submitted_at,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
