// db/filedb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::filemodel::*;

const FILE_COLUMNS: &str = r#"
    id, user_id, job_id, proposal_id, contract_id,
    file_name, file_url, file_type, file_size,
    upload_type, storage_path, created_at
"#;

#[async_trait]
pub trait FileUploadExt {
    async fn save_file_upload(&self, upload: NewFileUpload) -> Result<FileUpload, Error>;

    async fn get_file_upload(&self, file_id: Uuid) -> Result<Option<FileUpload>, Error>;

    async fn get_user_file_uploads(&self, user_id: Uuid) -> Result<Vec<FileUpload>, Error>;

    async fn delete_file_upload(&self, file_id: Uuid) -> Result<(), Error>;
}

#[async_trait]
impl FileUploadExt for DBClient {
    async fn save_file_upload(&self, upload: NewFileUpload) -> Result<FileUpload, Error> {
        sqlx::query_as::<_, FileUpload>(&format!(
            r#"
            INSERT INTO file_uploads
            (user_id, job_id, proposal_id, contract_id, file_name, file_url,
             file_type, file_size, upload_type, storage_path)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            FILE_COLUMNS
        ))
        .bind(upload.user_id)
        .bind(upload.job_id)
        .bind(upload.proposal_id)
        .bind(upload.contract_id)
        .bind(upload.file_name)
        .bind(upload.file_url)
        .bind(upload.file_type)
        .bind(upload.file_size)
        .bind(upload.upload_type)
        .bind(upload.storage_path)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_file_upload(&self, file_id: Uuid) -> Result<Option<FileUpload>, Error> {
        sqlx::query_as::<_, FileUpload>(&format!(
            "SELECT {} FROM file_uploads WHERE id = $1",
            FILE_COLUMNS
        ))
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_user_file_uploads(&self, user_id: Uuid) -> Result<Vec<FileUpload>, Error> {
        sqlx::query_as::<_, FileUpload>(&format!(
            "SELECT {} FROM file_uploads WHERE user_id = $1 ORDER BY created_at DESC",
            FILE_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn delete_file_upload(&self, file_id: Uuid) -> Result<(), Error> {
        let result = sqlx::query("DELETE FROM file_uploads WHERE id = $1")
            .bind(file_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::RowNotFound);
        }

        Ok(())
    }
}
