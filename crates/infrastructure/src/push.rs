//! Expo 风格推送供应商的 HTTP 适配。
//!
//! 每块消息一次 POST，响应里的 data 数组与请求消息一一对应。
//! 客户端带有界超时，超时折算为该块投递失败，由上层分发器吸收。

use std::time::Duration;

use application::push::{PushGateway, PushGatewayError, PushMessage, PushReceipt};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    data: Vec<ProviderTicket>,
}

#[derive(Debug, Deserialize)]
struct ProviderTicket {
    status: String,
    message: Option<String>,
}

pub struct HttpPushGateway {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPushGateway {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl PushGateway for HttpPushGateway {
    async fn send_chunk(
        &self,
        messages: &[PushMessage],
    ) -> Result<Vec<PushReceipt>, PushGatewayError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(messages)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    PushGatewayError::Timeout
                } else {
                    PushGatewayError::Provider(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PushGatewayError::Provider(format!(
                "provider returned {status}"
            )));
        }

        let body: ProviderResponse = response
            .json()
            .await
            .map_err(|err| PushGatewayError::Provider(err.to_string()))?;

        Ok(body
            .data
            .into_iter()
            .map(|ticket| PushReceipt {
                status: ticket.status,
                message: ticket.message,
            })
            .collect())
    }
}
