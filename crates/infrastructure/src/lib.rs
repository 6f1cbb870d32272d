//! 基础设施层实现。
//!
//! 提供进程内广播总线、推送供应商 HTTP 网关、通知/举报的 Postgres 仓储，
//! 实现应用层定义的接口。

pub mod broadcast;
pub mod builder;
pub mod migrations;
pub mod push;
pub mod repository;

pub use broadcast::LocalEventBroadcaster;
pub use builder::{Infrastructure, InfrastructureError};
pub use migrations::MIGRATOR;
pub use push::HttpPushGateway;
pub use repository::{create_pg_pool, PgNotificationRepository, PgReportRepository, PgStorage};
