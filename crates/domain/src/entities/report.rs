use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{PostId, ReportId, Timestamp, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportCategory {
    Spam,
    Inappropriate,
    Harassment,
    HateSpeech,
    Violence,
    FalseInformation,
    Other,
}

impl ReportCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportCategory::Spam => "spam",
            ReportCategory::Inappropriate => "inappropriate",
            ReportCategory::Harassment => "harassment",
            ReportCategory::HateSpeech => "hate_speech",
            ReportCategory::Violence => "violence",
            ReportCategory::FalseInformation => "false_information",
            ReportCategory::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Reviewed,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Reviewed => "reviewed",
            ReportStatus::Resolved => "resolved",
            ReportStatus::Dismissed => "dismissed",
        }
    }

    /// 仍会影响举报人动态流过滤的状态。
    pub fn hides_post_from_reporter(&self) -> bool {
        matches!(self, ReportStatus::Pending | ReportStatus::Reviewed)
    }
}

/// 针对动态的举报。(reporter, reported_post) 全局唯一。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub reporter: UserId,
    pub reported_post: PostId,
    pub reported_user: UserId,
    pub category: ReportCategory,
    pub description: Option<String>,
    pub status: ReportStatus,
    pub moderator_notes: Option<String>,
    pub resolved_by: Option<UserId>,
    pub resolved_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl Report {
    pub fn new(
        id: ReportId,
        reporter: UserId,
        reported_post: PostId,
        reported_user: UserId,
        category: ReportCategory,
        description: Option<String>,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        if let Some(text) = &description {
            if text.chars().count() > 500 {
                return Err(DomainError::invalid_argument("description", "too long"));
            }
        }
        Ok(Self {
            id,
            reporter,
            reported_post,
            reported_user,
            category,
            description,
            status: ReportStatus::Pending,
            moderator_notes: None,
            resolved_by: None,
            resolved_at: None,
            created_at: now,
        })
    }

    /// 审核流转。Resolved/Dismissed 终态记录审核人与时间。
    pub fn transition(
        &mut self,
        status: ReportStatus,
        moderator: UserId,
        notes: Option<String>,
        now: Timestamp,
    ) {
        self.status = status;
        if let Some(notes) = notes {
            self.moderator_notes = Some(notes);
        }
        if matches!(status, ReportStatus::Resolved | ReportStatus::Dismissed) {
            self.resolved_by = Some(moderator);
            self.resolved_at = Some(now);
        }
    }
}
