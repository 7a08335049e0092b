use crate::structs::Error;
use poise::serenity_prelude::UserId;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

/// Read access to the registration dashboard's `users` table.
#[serenity::async_trait]
pub trait StatusStore: Send + Sync {
    /// The member's registration status, `None` if they never signed up.
    async fn fetch_status(&self, user: UserId) -> Result<Option<String>, Error>;

    async fn fetch_email(&self, user: UserId) -> Result<Option<String>, Error>;

    /// If anyone signed up under this Discord username.
    async fn has_username(&self, username: &str) -> Result<bool, Error>;
}

pub struct PgStatusStore {
    db: PgPool,
}

impl PgStatusStore {
    pub async fn connect(options: PgConnectOptions) -> Result<Self, sqlx::Error> {
        let db = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(10)
            .connect_with(options)
            .await?;

        Ok(PgStatusStore { db })
    }
}

#[serenity::async_trait]
impl StatusStore for PgStatusStore {
    async fn fetch_status(&self, user: UserId) -> Result<Option<String>, Error> {
        let status = sqlx::query_scalar::<_, String>(
            r#"
            SELECT status FROM users WHERE discord_id = $1
            "#,
        )
        .bind(user.to_string())
        .fetch_optional(&self.db)
        .await?;

        Ok(status)
    }

    async fn fetch_email(&self, user: UserId) -> Result<Option<String>, Error> {
        let email = sqlx::query_scalar::<_, String>(
            r#"
            SELECT email FROM users WHERE discord_id = $1
            "#,
        )
        .bind(user.to_string())
        .fetch_optional(&self.db)
        .await?;

        Ok(email)
    }

    async fn has_username(&self, username: &str) -> Result<bool, Error> {
        let found = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT 1 FROM users WHERE discord_username = $1 LIMIT 1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;

        Ok(found.is_some())
    }
}
