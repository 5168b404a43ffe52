use crate::core::error::{self, Error};
use crate::types::response;
use crate::types::user::AuthorizedUser;
use regex::Regex;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

#[derive(Clone)]
pub(crate) struct UserController {
    pool: PgPool,
    username_pattern: Regex,
}

impl std::fmt::Debug for UserController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserController")
            .field("username_pattern", &self.username_pattern.as_str())
            .finish()
    }
}

impl UserController {
    pub(crate) fn new(pool: PgPool) -> Result<Self, error::ConfigError> {
        Ok(Self {
            pool,
            username_pattern: Regex::new(r"^[a-zA-Z0-9_-]{3,20}$")?,
        })
    }

    pub(crate) async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AuthorizedUser>, Error> {
        match sqlx::query("SELECT id, username, password_hash FROM users WHERE username = $1;")
            .bind(username)
            .map(map_user)
            .fetch_one(&self.pool)
            .await
        {
            Ok(user) => Ok(Some(user)),
            Err(sqlx::Error::RowNotFound) => Ok(None),
            Err(e) => Err(Error::StoreUnavailable(e)),
        }
    }

    pub(crate) async fn list_users(&self) -> Result<Vec<response::User>, Error> {
        let users = sqlx::query("SELECT id, username FROM users ORDER BY id;")
            .map(|row: PgRow| response::User {
                id: row.get("id"),
                username: row.get("username"),
            })
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    pub(crate) async fn register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AuthorizedUser, Error> {
        self.validate(username, password)?;

        let password_hash = self.hash(password)?;

        let id: i64 = match sqlx::query(
            "INSERT INTO users (username, password_hash) VALUES ($1, $2) RETURNING id;",
        )
        .bind(username)
        .bind(&password_hash)
        .map(|row: PgRow| row.get("id"))
        .fetch_one(&self.pool)
        .await
        {
            Ok(id) => id,
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                return Err(Error::UserAlreadyExists);
            }
            Err(e) => return Err(Error::StoreUnavailable(e)),
        };

        tracing::info!(user_id = id, "registered user");

        Ok(AuthorizedUser {
            id,
            username: username.into(),
            password_hash,
        })
    }

    pub(crate) async fn login(&self, username: &str, password: &str) -> Result<AuthorizedUser, Error> {
        let user = self
            .get_user_by_username(username)
            .await?
            .ok_or(Error::Unauthorized)?;

        if let false = bcrypt::verify(password, &user.password_hash)? {
            return Err(Error::Unauthorized);
        };

        tracing::info!(user_id = user.id, username = %user.username, "user logged in");

        Ok(user)
    }

    fn validate(&self, username: &str, password: &str) -> Result<(), Error> {
        if !self.username_pattern.is_match(username) {
            return Err(Error::InvalidUsername);
        }

        if password.len() < 8 {
            return Err(Error::InvalidPassword(
                "Password must be at least 8 characters".to_owned(),
            ));
        }

        Ok(())
    }

    fn hash(&self, value: &str) -> Result<String, Error> {
        bcrypt::hash(value, 12).map_err(Error::Bcrypt)
    }
}

fn map_user(row: PgRow) -> AuthorizedUser {
    AuthorizedUser {
        id: row.get("id"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
    }
}
