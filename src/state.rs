use crate::auth::jwt::JwtKeys;
use crate::auth::repo::{PgUserStore, UserStore};
use crate::config::AppConfig;
use crate::db;
use crate::tickets::repo::{PgTicketStore, TicketStore};
use axum::extract::FromRef;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jwt: JwtKeys,
    pub users: Arc<dyn UserStore>,
    pub tickets: Arc<dyn TicketStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = db::connect(&config.db).await?;

        let users = Arc::new(PgUserStore::new(db.clone())) as Arc<dyn UserStore>;
        let tickets = Arc::new(PgTicketStore::new(db)) as Arc<dyn TicketStore>;
        Ok(Self::from_parts(config, users, tickets))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        tickets: Arc<dyn TicketStore>,
    ) -> Self {
        let jwt = JwtKeys::new(&config.jwt);
        Self {
            config,
            jwt,
            users,
            tickets,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        let store = Arc::new(crate::memory::MemoryStore::new());
        Self::from_parts(
            Arc::new(AppConfig::for_tests()),
            store.clone() as Arc<dyn UserStore>,
            store as Arc<dyn TicketStore>,
        )
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}
