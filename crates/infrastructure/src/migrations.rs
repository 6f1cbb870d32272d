//! 数据库迁移。SQL 文件位于工作区根目录的 migrations/ 下。

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");
