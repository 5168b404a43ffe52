use crate::controllers::token::TokenController;
use crate::controllers::user::UserController;
use crate::core::config::Args;
use crate::core::error::ConfigError;
use crate::token::postgres::PgTokenStore;
use sqlx::postgres::PgPool;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) user_controller: UserController,
    pub(crate) token_controller: TokenController<PgTokenStore>,
}

impl AppState {
    pub(crate) fn new(pool: PgPool, args: &Args) -> Result<Self, ConfigError> {
        Ok(AppState {
            user_controller: UserController::new(pool.clone())?,
            token_controller: TokenController::new(args, PgTokenStore::new(pool)),
        })
    }
}
