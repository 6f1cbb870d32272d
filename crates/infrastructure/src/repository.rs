//! 通知与举报两张表的 Postgres 仓储。
//!
//! 其余实体（用户/动态/评论）属于外部实体存储，应用层只依赖其接口。

use std::sync::Arc;

use application::repository::{NotificationRepository, ReportRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    Notification, NotificationId, NotificationKind, PostId, Report, ReportCategory, ReportId,
    ReportStatus, RepositoryError, UserId,
};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use uuid::Uuid;

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::conflict(db.to_string())
        }
        _ => RepositoryError::storage(err.to_string()),
    }
}

fn invalid_data(message: impl Into<String>) -> RepositoryError {
    RepositoryError::storage(message)
}

fn parse_kind(value: &str) -> Result<NotificationKind, RepositoryError> {
    match value {
        "new_post" => Ok(NotificationKind::NewPost),
        "new_follower" => Ok(NotificationKind::NewFollower),
        "like" => Ok(NotificationKind::Like),
        "comment" => Ok(NotificationKind::Comment),
        other => Err(invalid_data(format!("unknown notification kind: {other}"))),
    }
}

fn parse_category(value: &str) -> Result<ReportCategory, RepositoryError> {
    match value {
        "spam" => Ok(ReportCategory::Spam),
        "inappropriate" => Ok(ReportCategory::Inappropriate),
        "harassment" => Ok(ReportCategory::Harassment),
        "hate_speech" => Ok(ReportCategory::HateSpeech),
        "violence" => Ok(ReportCategory::Violence),
        "false_information" => Ok(ReportCategory::FalseInformation),
        "other" => Ok(ReportCategory::Other),
        other => Err(invalid_data(format!("unknown report category: {other}"))),
    }
}

fn parse_status(value: &str) -> Result<ReportStatus, RepositoryError> {
    match value {
        "pending" => Ok(ReportStatus::Pending),
        "reviewed" => Ok(ReportStatus::Reviewed),
        "resolved" => Ok(ReportStatus::Resolved),
        "dismissed" => Ok(ReportStatus::Dismissed),
        other => Err(invalid_data(format!("unknown report status: {other}"))),
    }
}

#[derive(Debug, FromRow)]
struct NotificationRecord {
    id: Uuid,
    recipient_id: Uuid,
    sender_id: Uuid,
    kind: String,
    post_id: Option<Uuid>,
    message: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRecord> for Notification {
    type Error = RepositoryError;

    fn try_from(value: NotificationRecord) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: NotificationId::from(value.id),
            recipient: UserId::from(value.recipient_id),
            sender: UserId::from(value.sender_id),
            kind: parse_kind(&value.kind)?,
            post: value.post_id.map(PostId::from),
            message: value.message,
            is_read: value.is_read,
            created_at: value.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ReportRecord {
    id: Uuid,
    reporter_id: Uuid,
    reported_post_id: Uuid,
    reported_user_id: Uuid,
    category: String,
    description: Option<String>,
    status: String,
    moderator_notes: Option<String>,
    resolved_by: Option<Uuid>,
    resolved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReportRecord> for Report {
    type Error = RepositoryError;

    fn try_from(value: ReportRecord) -> Result<Self, Self::Error> {
        Ok(Report {
            id: ReportId::from(value.id),
            reporter: UserId::from(value.reporter_id),
            reported_post: PostId::from(value.reported_post_id),
            reported_user: UserId::from(value.reported_user_id),
            category: parse_category(&value.category)?,
            description: value.description,
            status: parse_status(&value.status)?,
            moderator_notes: value.moderator_notes,
            resolved_by: value.resolved_by.map(UserId::from),
            resolved_at: value.resolved_at,
            created_at: value.created_at,
        })
    }
}

const NOTIFICATION_COLUMNS: &str =
    "id, recipient_id, sender_id, kind, post_id, message, is_read, created_at";
const REPORT_COLUMNS: &str = "id, reporter_id, reported_post_id, reported_user_id, category, \
     description, status, moderator_notes, resolved_by, resolved_at, created_at";

#[derive(Clone)]
pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn create_batch(
        &self,
        notifications: Vec<Notification>,
    ) -> Result<Vec<Notification>, RepositoryError> {
        if notifications.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::with_capacity(notifications.len());
        let mut recipients = Vec::with_capacity(notifications.len());
        let mut senders = Vec::with_capacity(notifications.len());
        let mut kinds = Vec::with_capacity(notifications.len());
        let mut posts: Vec<Option<Uuid>> = Vec::with_capacity(notifications.len());
        let mut messages = Vec::with_capacity(notifications.len());
        let mut created = Vec::with_capacity(notifications.len());
        for notification in &notifications {
            ids.push(Uuid::from(notification.id));
            recipients.push(Uuid::from(notification.recipient));
            senders.push(Uuid::from(notification.sender));
            kinds.push(notification.kind.as_str().to_owned());
            posts.push(notification.post.map(Uuid::from));
            messages.push(notification.message.clone());
            created.push(notification.created_at);
        }

        // 单条 INSERT，整批要么全部写入要么整体失败
        sqlx::query(
            r#"
            INSERT INTO notifications (id, recipient_id, sender_id, kind, post_id, message, is_read, created_at)
            SELECT id, recipient_id, sender_id, kind, post_id, message, FALSE, created_at
            FROM UNNEST($1::uuid[], $2::uuid[], $3::uuid[], $4::text[], $5::uuid[], $6::text[], $7::timestamptz[])
                AS t(id, recipient_id, sender_id, kind, post_id, message, created_at)
            "#,
        )
        .bind(&ids)
        .bind(&recipients)
        .bind(&senders)
        .bind(&kinds)
        .bind(&posts)
        .bind(&messages)
        .bind(&created)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(notifications)
    }

    async fn find_by_id(
        &self,
        id: NotificationId,
    ) -> Result<Option<Notification>, RepositoryError> {
        let record = sqlx::query_as::<_, NotificationRecord>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(Notification::try_from).transpose()
    }

    async fn list_for_recipient(
        &self,
        recipient: UserId,
        unread_only: bool,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let filter = if unread_only {
            "recipient_id = $1 AND is_read = FALSE"
        } else {
            "recipient_id = $1"
        };
        let records = sqlx::query_as::<_, NotificationRecord>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE {filter} \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(Uuid::from(recipient))
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(Notification::try_from).collect()
    }

    async fn mark_read(
        &self,
        id: NotificationId,
        recipient: UserId,
    ) -> Result<Option<Notification>, RepositoryError> {
        let record = sqlx::query_as::<_, NotificationRecord>(&format!(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND recipient_id = $2 \
             RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(Uuid::from(id))
        .bind(Uuid::from(recipient))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(Notification::try_from).transpose()
    }

    async fn mark_all_read(&self, recipient: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE recipient_id = $1 AND is_read = FALSE",
        )
        .bind(Uuid::from(recipient))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(result.rows_affected())
    }

    async fn delete(
        &self,
        id: NotificationId,
        recipient: UserId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND recipient_id = $2")
            .bind(Uuid::from(id))
            .bind(Uuid::from(recipient))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_unread(&self, recipient: UserId) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND is_read = FALSE",
        )
        .bind(Uuid::from(recipient))
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(count as u64)
    }
}

#[derive(Clone)]
pub struct PgReportRepository {
    pool: PgPool,
}

impl PgReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportRepository for PgReportRepository {
    async fn create(&self, report: Report) -> Result<Report, RepositoryError> {
        let record = sqlx::query_as::<_, ReportRecord>(&format!(
            "INSERT INTO reports (id, reporter_id, reported_post_id, reported_user_id, category, \
             description, status, moderator_notes, resolved_by, resolved_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {REPORT_COLUMNS}"
        ))
        .bind(Uuid::from(report.id))
        .bind(Uuid::from(report.reporter))
        .bind(Uuid::from(report.reported_post))
        .bind(Uuid::from(report.reported_user))
        .bind(report.category.as_str())
        .bind(&report.description)
        .bind(report.status.as_str())
        .bind(&report.moderator_notes)
        .bind(report.resolved_by.map(Uuid::from))
        .bind(report.resolved_at)
        .bind(report.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Report::try_from(record)
    }

    async fn update(&self, report: Report) -> Result<Report, RepositoryError> {
        let record = sqlx::query_as::<_, ReportRecord>(&format!(
            "UPDATE reports SET status = $2, moderator_notes = $3, resolved_by = $4, \
             resolved_at = $5 WHERE id = $1 RETURNING {REPORT_COLUMNS}"
        ))
        .bind(Uuid::from(report.id))
        .bind(report.status.as_str())
        .bind(&report.moderator_notes)
        .bind(report.resolved_by.map(Uuid::from))
        .bind(report.resolved_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .ok_or(RepositoryError::NotFound)?;

        Report::try_from(record)
    }

    async fn exists(&self, reporter: UserId, post: PostId) -> Result<bool, RepositoryError> {
        let found: Option<i32> = sqlx::query_scalar(
            "SELECT 1 FROM reports WHERE reporter_id = $1 AND reported_post_id = $2",
        )
        .bind(Uuid::from(reporter))
        .bind(Uuid::from(post))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(found.is_some())
    }

    async fn find_by_id(&self, id: ReportId) -> Result<Option<Report>, RepositoryError> {
        let record = sqlx::query_as::<_, ReportRecord>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(Report::try_from).transpose()
    }

    async fn list_by_status(
        &self,
        status: ReportStatus,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Report>, RepositoryError> {
        let records = sqlx::query_as::<_, ReportRecord>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE status = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(status.as_str())
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(Report::try_from).collect()
    }

    async fn hidden_post_ids(&self, reporter: UserId) -> Result<Vec<PostId>, RepositoryError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT reported_post_id FROM reports WHERE reporter_id = $1 \
             AND status IN ('pending', 'reviewed')",
        )
        .bind(Uuid::from(reporter))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(ids.into_iter().map(PostId::from).collect())
    }
}

#[derive(Clone)]
pub struct PgStorage {
    pub pool: PgPool,
    pub notification_repository: Arc<PgNotificationRepository>,
    pub report_repository: Arc<PgReportRepository>,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self {
            notification_repository: Arc::new(PgNotificationRepository::new(pool.clone())),
            report_repository: Arc::new(PgReportRepository::new(pool.clone())),
            pool,
        }
    }
}

pub async fn create_pg_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}
