//! 推送分发器。
//!
//! 在供应商网关之上做令牌过滤与分块：畸形令牌静默丢弃（仅记日志），
//! 按供应商上限切块独立发送，单块失败不影响其余块。分发器从不向外
//! 抛出错误——所有供应商故障都被吸收为日志与汇总计数。

use std::sync::Arc;

use async_trait::async_trait;
use domain::DeviceToken;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// 供应商接受的单条推送消息。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    pub to: DeviceToken,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

/// 单条消息的投递回执。内容只用于聚合日志，协调器不做正确性判断。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushReceipt {
    pub status: String,
    pub message: Option<String>,
}

impl PushReceipt {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[derive(Debug, Error)]
pub enum PushGatewayError {
    #[error("push provider error: {0}")]
    Provider(String),
    #[error("push request timed out")]
    Timeout,
}

/// 推送供应商的最小接口。实现方自带有界超时，超时视作该块投递失败。
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send_chunk(
        &self,
        messages: &[PushMessage],
    ) -> Result<Vec<PushReceipt>, PushGatewayError>;
}

/// 一次分发的聚合结果。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// 通过形状校验、实际尝试发送的令牌数。
    pub attempted: usize,
    /// 回执为 ok 的条数。
    pub delivered: usize,
    /// 整块失败的块数。
    pub failed_chunks: usize,
}

/// Expo 风格的令牌形状校验。
fn is_valid_token(token: &DeviceToken) -> bool {
    let value = token.as_str();
    (value.starts_with("ExponentPushToken[") || value.starts_with("ExpoPushToken["))
        && value.ends_with(']')
}

#[derive(Clone)]
pub struct PushDispatcher {
    gateway: Arc<dyn PushGateway>,
    chunk_size: usize,
}

impl PushDispatcher {
    pub fn new(gateway: Arc<dyn PushGateway>, chunk_size: usize) -> Self {
        Self {
            gateway,
            chunk_size: chunk_size.max(1),
        }
    }

    /// 尽力投递。永不返回错误，永不越过自身边界抛出。
    pub async fn dispatch(
        &self,
        tokens: Vec<DeviceToken>,
        title: &str,
        body: &str,
        data: serde_json::Value,
    ) -> DispatchSummary {
        if tokens.is_empty() {
            debug!("no push tokens provided");
            return DispatchSummary::default();
        }

        let valid: Vec<DeviceToken> = tokens
            .into_iter()
            .filter(|token| {
                let ok = is_valid_token(token);
                if !ok {
                    debug!(token = %token, "dropping malformed push token");
                }
                ok
            })
            .collect();

        if valid.is_empty() {
            debug!("no valid push tokens found");
            return DispatchSummary::default();
        }

        let messages: Vec<PushMessage> = valid
            .iter()
            .map(|token| PushMessage {
                to: token.clone(),
                title: title.to_owned(),
                body: body.to_owned(),
                data: data.clone(),
            })
            .collect();

        let mut summary = DispatchSummary {
            attempted: messages.len(),
            ..DispatchSummary::default()
        };

        for chunk in messages.chunks(self.chunk_size) {
            match self.gateway.send_chunk(chunk).await {
                Ok(receipts) => {
                    summary.delivered += receipts.iter().filter(|r| r.is_ok()).count();
                }
                Err(err) => {
                    summary.failed_chunks += 1;
                    warn!(error = %err, chunk_size = chunk.len(), "push chunk failed");
                }
            }
        }

        info!(
            attempted = summary.attempted,
            delivered = summary.delivered,
            failed_chunks = summary.failed_chunks,
            "push dispatch finished"
        );
        summary
    }
}
