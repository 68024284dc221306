use std::sync::Arc;

use anyhow::anyhow;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use diesel_async::AsyncPgConnection;
use rdkafka::producer::FutureProducer;

use crate::error::ApiError;
use crate::gateway::GatewayClient;

pub type DbPool = Pool<AsyncPgConnection>;
pub type DbConn<'a> = PooledConnection<'a, AsyncPgConnection>;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub gateway_webhook_secret: String,
    pub gateway_key_secret: String,
    pub currency: String,
}

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub producer: FutureProducer,
    pub config: Arc<AppConfig>,
    pub gateway: GatewayClient,
}

impl AppState {
    pub async fn conn(&self) -> Result<DbConn<'_>, ApiError> {
        self.pool
            .get()
            .await
            .map_err(|e| ApiError::Internal(anyhow!("db pool: {e}")))
    }
}
