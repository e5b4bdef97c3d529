use std::time::Duration;

use axum::http::{
    HeaderMap, StatusCode,
    header::{ACCEPT, CONTENT_TYPE, USER_AGENT},
};

use crate::config::UpstreamConfig;
use crate::error::{RelayError, Result};
use crate::http_client::client_for_url_with_connect_timeout;
use crate::providers::streaming::{LineStream, line_stream};

use super::types::ChatPrompt;

/// 转发前无条件写入的模型名
pub const MODEL_OVERRIDE: &str = "solar";

/// 建连加响应头的总时限，不可配置
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

const UPSTREAM_USER_AGENT: &str = "M21";
const NDJSON: &str = "application/x-ndjson";

/// 单一上游的转发器。构造时注入 base_url，内部持有可复用连接池的 Client。
#[derive(Debug, Clone)]
pub struct OllamaForwarder {
    client: reqwest::Client,
    chat_url: String,
}

/// 尚未读取 body 的上游响应。
///
/// 所有权从转发器移交给调用方；body 流在被耗尽、出错或被丢弃（客户端断开）
/// 时随之释放上游连接。
#[derive(Debug)]
pub struct UpstreamResponse {
    inner: reqwest::Response,
}

impl UpstreamResponse {
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// 消费响应，得到按 `\n` 切分的 body 流
    pub fn into_line_stream(self) -> LineStream {
        line_stream(self.inner.bytes_stream())
    }
}

impl OllamaForwarder {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let base_url = config.base_url.trim();
        if base_url.is_empty() {
            return Err(RelayError::Config("upstream.base_url is empty".into()));
        }
        let client = client_for_url_with_connect_timeout(base_url, UPSTREAM_TIMEOUT)?;
        Ok(Self {
            client,
            chat_url: chat_url(base_url),
        })
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    pub async fn forward(&self, prompt: ChatPrompt) -> Result<UpstreamResponse> {
        let body = upstream_body(prompt)?;

        let request = self
            .client
            .post(&self.chat_url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, NDJSON)
            .header(USER_AGENT, UPSTREAM_USER_AGENT)
            .body(body);

        let inner = tokio::time::timeout(UPSTREAM_TIMEOUT, request.send())
            .await
            .map_err(|_| RelayError::UpstreamTimeout(UPSTREAM_TIMEOUT))??;

        tracing::debug!(
            url = %self.chat_url,
            status = %inner.status(),
            "upstream responded"
        );
        Ok(UpstreamResponse { inner })
    }
}

fn chat_url(base_url: &str) -> String {
    format!("{}/chat", base_url.trim_end_matches('/'))
}

fn upstream_body(mut prompt: ChatPrompt) -> Result<Vec<u8>> {
    prompt.model = MODEL_OVERRIDE.to_string();
    Ok(serde_json::to_vec(&prompt)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ollama::ChatMessage;

    fn prompt(model: &str) -> ChatPrompt {
        ChatPrompt {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user".into(),
                content: "hi".into(),
            }],
        }
    }

    #[test]
    fn model_is_always_overridden() {
        for model in ["", "llama3", "solar", "gpt-4o/with/slashes"] {
            let body = upstream_body(prompt(model)).unwrap();
            let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(v["model"], "solar");
            assert_eq!(v["messages"][0]["content"], "hi");
        }
    }

    #[test]
    fn chat_url_appends_path() {
        assert_eq!(chat_url("http://example.test/api"), "http://example.test/api/chat");
        assert_eq!(chat_url("http://example.test/api/"), "http://example.test/api/chat");
    }

    #[test]
    fn forwarder_uses_configured_base_url() {
        let f = OllamaForwarder::new(&UpstreamConfig::with_base_url("http://example.test/api"))
            .unwrap();
        assert_eq!(f.chat_url(), "http://example.test/api/chat");

        let f = OllamaForwarder::new(&UpstreamConfig::default()).unwrap();
        assert_eq!(f.chat_url(), "http://192.168.0.37:11434/api/chat");
    }

    #[test]
    fn empty_base_url_is_rejected() {
        let err = OllamaForwarder::new(&UpstreamConfig::with_base_url("  ")).unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));
    }

    #[tokio::test]
    async fn connection_refused_is_an_http_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let f = OllamaForwarder::new(&UpstreamConfig::with_base_url(format!("http://{addr}/api")))
            .unwrap();
        let err = f.forward(prompt("x")).await.unwrap_err();
        assert!(matches!(err, RelayError::Http(_)));
        assert_eq!(err.public_message(), "Error generating response");
    }
}
