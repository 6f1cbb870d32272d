//! 基础设施装配：连接数据库、跑迁移、创建广播总线与推送网关。

use std::sync::Arc;
use std::time::Duration;

use application::push::PushDispatcher;
use config::AppConfig;
use thiserror::Error;

use crate::{
    broadcast::LocalEventBroadcaster,
    migrations::MIGRATOR,
    push::HttpPushGateway,
    repository::{create_pg_pool, PgStorage},
};

#[derive(Debug, Error)]
pub enum InfrastructureError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("push gateway error: {0}")]
    PushGateway(#[from] reqwest::Error),
}

#[derive(Clone)]
pub struct Infrastructure {
    pub storage: Arc<PgStorage>,
    pub broadcaster: Arc<LocalEventBroadcaster>,
    pub push_gateway: Arc<HttpPushGateway>,
    /// 已按配置分块大小接好网关的分发器，直接交给扇出协调器。
    pub push_dispatcher: PushDispatcher,
}

impl Infrastructure {
    pub async fn connect(config: &AppConfig) -> Result<Self, InfrastructureError> {
        let pool = create_pg_pool(&config.database.url, config.database.max_connections).await?;
        MIGRATOR.run(&pool).await?;

        let storage = Arc::new(PgStorage::new(pool));
        let broadcaster = Arc::new(LocalEventBroadcaster::new(config.broadcast.capacity));
        let push_gateway = Arc::new(HttpPushGateway::new(
            config.push.endpoint.clone(),
            Duration::from_secs(config.push.timeout_secs),
        )?);
        let push_dispatcher = PushDispatcher::new(push_gateway.clone(), config.push.chunk_size);

        Ok(Self {
            storage,
            broadcaster,
            push_gateway,
            push_dispatcher,
        })
    }
}
