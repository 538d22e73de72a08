use crate::config::{GatewayConfig, GatewayCredentials};
use crate::error::GatewayError;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs,
};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use std::time::Instant;
use tracing::debug;

const ACCESS_CLIENT_ID_HEADER: &str = "cf-access-client-id";
const ACCESS_CLIENT_SECRET_HEADER: &str = "cf-access-client-secret";

/// Text returned by one completion call plus its cost
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub content: String,
    pub latency_ms: f64,
    /// `usage.total_tokens`, or 0 when the gateway omits usage
    pub token_count: u64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    total_tokens: u64,
}

/// Build a system message
pub fn system_message(content: impl Into<String>) -> Result<ChatCompletionRequestMessage, OpenAIError> {
    let content: String = content.into();
    Ok(ChatCompletionRequestSystemMessageArgs::default()
        .content(content)
        .build()?
        .into())
}

/// Build a user message
pub fn user_message(content: impl Into<String>) -> Result<ChatCompletionRequestMessage, OpenAIError> {
    let content: String = content.into();
    Ok(ChatCompletionRequestUserMessageArgs::default()
        .content(content)
        .build()?
        .into())
}

/// Shared transport to the chat completion gateway.
///
/// Owns one pooled HTTP client for the lifetime of an experiment; the pool
/// is released when the gateway is dropped.
pub struct Gateway {
    http: reqwest::Client,
    completions_url: String,
    temperature: f32,
}

impl Gateway {
    /// Build the HTTP client with auth headers and the configured request timeout
    pub fn new(config: &GatewayConfig, credentials: &GatewayCredentials) -> Result<Self, GatewayError> {
        let headers = Self::default_headers(credentials)?;

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http,
            completions_url: format!("{}/chat/completions", config.api_endpoint.trim_end_matches('/')),
            temperature: config.temperature as f32,
        })
    }

    fn default_headers(credentials: &GatewayCredentials) -> Result<HeaderMap, GatewayError> {
        let mut headers = HeaderMap::new();

        let bearer = HeaderValue::from_str(&format!("Bearer {}", credentials.api_key))
            .map_err(|_| GatewayError::setup("API key is not a valid header value"))?;
        headers.insert(AUTHORIZATION, bearer);

        let access = [
            (ACCESS_CLIENT_ID_HEADER, &credentials.access_client_id),
            (ACCESS_CLIENT_SECRET_HEADER, &credentials.access_client_secret),
        ];
        for (name, value) in access {
            if let Some(value) = value {
                let value = HeaderValue::from_str(value)
                    .map_err(|_| GatewayError::setup(format!("{} is not a valid header value", name)))?;
                headers.insert(HeaderName::from_static(name), value);
            }
        }

        Ok(headers)
    }

    pub fn completions_url(&self) -> &str {
        &self.completions_url
    }

    /// Call `model` with `messages` and return the first choice's content
    pub async fn call_model(
        &self,
        model: &str,
        messages: Vec<ChatCompletionRequestMessage>,
        max_tokens: u32,
    ) -> Result<Completion, GatewayError> {
        let request = self.build_request(model, messages, max_tokens)?;

        let start = Instant::now();
        let response = self.http.post(&self.completions_url).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        debug!(model, status = status.as_u16(), latency_ms, "gateway call finished");

        if status != StatusCode::OK {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let (content, token_count) = Self::parse_response(&body)?;

        Ok(Completion {
            content,
            latency_ms,
            token_count,
        })
    }

    fn build_request(
        &self,
        model: &str,
        messages: Vec<ChatCompletionRequestMessage>,
        max_tokens: u32,
    ) -> Result<CreateChatCompletionRequest, GatewayError> {
        CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(max_tokens.min(u16::MAX as u32) as u16)
            .build()
            .map_err(GatewayError::from)
    }

    /// Extract `choices[0].message.content` and `usage.total_tokens`
    fn parse_response(body: &str) -> Result<(String, u64), GatewayError> {
        let parsed: ChatResponse = serde_json::from_str(body)
            .map_err(|e| GatewayError::malformed(format!("{}: {}", e, body)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GatewayError::malformed(format!("no message content in response: {}", body)))?;

        let token_count = parsed.usage.map(|usage| usage.total_tokens).unwrap_or(0);

        Ok((content, token_count))
    }
}


/// Local endpoint that accepts connections and never answers
#[cfg(test)]
pub(crate) async fn silent_gateway() -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    (format!("http://{}/v1", addr), handle)
}
