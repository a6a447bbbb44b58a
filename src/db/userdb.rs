// db/userdb.rs
use async_trait::async_trait;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::usermodel::{NewUser, ProfileUpdate, User};

const USER_COLUMNS: &str = r#"
    id, email, full_name, password, role,
    phone, location, bio, skills, hourly_rate,
    company_name, website, resume_url, avatar_url,
    created_at, updated_at
"#;

#[async_trait]
pub trait UserExt {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error>;

    async fn save_user(&self, new_user: NewUser) -> Result<User, sqlx::Error>;

    async fn update_user_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<User, sqlx::Error>;
}

#[async_trait]
impl UserExt for DBClient {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut user: Option<User> = None;

        if let Some(user_id) = user_id {
            user = sqlx::query_as::<_, User>(&format!(
                "SELECT {} FROM users WHERE id = $1",
                USER_COLUMNS
            ))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        } else if let Some(email) = email {
            user = sqlx::query_as::<_, User>(&format!(
                "SELECT {} FROM users WHERE LOWER(email) = LOWER($1)",
                USER_COLUMNS
            ))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        }

        Ok(user)
    }

    async fn save_user(&self, new_user: NewUser) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, full_name, password, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(new_user.email)
        .bind(new_user.full_name)
        .bind(new_user.password_hash)
        .bind(new_user.role)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_user_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET full_name = COALESCE($2, full_name),
                phone = COALESCE($3, phone),
                location = COALESCE($4, location),
                bio = COALESCE($5, bio),
                skills = COALESCE($6, skills),
                hourly_rate = COALESCE($7, hourly_rate),
                company_name = COALESCE($8, company_name),
                website = COALESCE($9, website),
                resume_url = COALESCE($10, resume_url),
                avatar_url = COALESCE($11, avatar_url),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(update.full_name)
        .bind(update.phone)
        .bind(update.location)
        .bind(update.bio)
        .bind(update.skills)
        .bind(update.hourly_rate)
        .bind(update.company_name)
        .bind(update.website)
        .bind(update.resume_url)
        .bind(update.avatar_url)
        .fetch_one(&self.pool)
        .await
    }
}
