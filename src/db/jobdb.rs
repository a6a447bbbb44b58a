// db/jobdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::jobmodel::*;

pub(crate) const JOB_COLUMNS: &str = r#"
    id, client_id, title, description,
    budget_min, budget_max, timeline, category,
    required_skills, status, created_at, updated_at
"#;

#[async_trait]
pub trait JobExt {
    async fn create_job(&self, new_job: NewJob) -> Result<Job, Error>;

    async fn get_job_by_id(&self, job_id: Uuid) -> Result<Option<Job>, Error>;

    async fn get_open_jobs(
        &self,
        category: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Job>, Error>;

    async fn get_client_jobs(&self, client_id: Uuid) -> Result<Vec<Job>, Error>;

    async fn update_job(&self, job_id: Uuid, update: JobUpdate) -> Result<Job, Error>;

    async fn delete_job(&self, job_id: Uuid) -> Result<(), Error>;
}

#[async_trait]
impl JobExt for DBClient {
    async fn create_job(&self, new_job: NewJob) -> Result<Job, Error> {
        sqlx::query_as::<_, Job>(&format!(
            r#"
            INSERT INTO jobs
            (client_id, title, description, budget_min, budget_max, timeline, category, required_skills)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(new_job.client_id)
        .bind(new_job.title)
        .bind(new_job.description)
        .bind(new_job.budget_min)
        .bind(new_job.budget_max)
        .bind(new_job.timeline)
        .bind(new_job.category)
        .bind(new_job.required_skills)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_job_by_id(&self, job_id: Uuid) -> Result<Option<Job>, Error> {
        sqlx::query_as::<_, Job>(&format!("SELECT {} FROM jobs WHERE id = $1", JOB_COLUMNS))
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_open_jobs(
        &self,
        category: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Job>, Error> {
        sqlx::query_as::<_, Job>(&format!(
            r#"
            SELECT {}
            FROM jobs
            WHERE status = 'open'::job_status
              AND ($1::text IS NULL OR category = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
            JOB_COLUMNS
        ))
        .bind(category)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_client_jobs(&self, client_id: Uuid) -> Result<Vec<Job>, Error> {
        sqlx::query_as::<_, Job>(&format!(
            "SELECT {} FROM jobs WHERE client_id = $1 ORDER BY created_at DESC",
            JOB_COLUMNS
        ))
        .bind(client_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn update_job(&self, job_id: Uuid, update: JobUpdate) -> Result<Job, Error> {
        sqlx::query_as::<_, Job>(&format!(
            r#"
            UPDATE jobs
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                budget_min = COALESCE($4, budget_min),
                budget_max = COALESCE($5, budget_max),
                timeline = COALESCE($6, timeline),
                category = COALESCE($7, category),
                required_skills = COALESCE($8, required_skills),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(job_id)
        .bind(update.title)
        .bind(update.description)
        .bind(update.budget_min)
        .bind(update.budget_max)
        .bind(update.timeline)
        .bind(update.category)
        .bind(update.required_skills)
        .fetch_one(&self.pool)
        .await
    }

    async fn delete_job(&self, job_id: Uuid) -> Result<(), Error> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::RowNotFound);
        }

        Ok(())
    }
}
