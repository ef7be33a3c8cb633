//! HTTP implementation of [`AgentRuntime`] for assistants-style REST APIs.
//!
//! # Example
//!
//! ```rust,ignore
//! use agent_client::{AgentClientConfig, EnvironmentCredential, HttpAgentClient};
//! use std::sync::Arc;
//!
//! let config = AgentClientConfig::new("https://my-project.services.ai.azure.com/api/projects/p1");
//! let client = HttpAgentClient::new(config, Arc::new(EnvironmentCredential::default()))?;
//! let thread = client.create_thread().await?;
//! ```

use crate::config::AgentClientConfig;
use crate::credential::CredentialProvider;
use crate::error::{AgentClientError, Result};
use crate::runtime::AgentRuntime;
use crate::types::{
    AgentDefinition, AgentHandle, MessageRole, Run, Thread, ThreadMessage, ToolDescriptor,
};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Handles report this version: the assistants surface does not version agents.
const UNVERSIONED: &str = "1";

/// Agent runtime client over HTTP.
#[derive(Clone)]
pub struct HttpAgentClient {
    config: AgentClientConfig,
    client: Client,
    credential: Arc<dyn CredentialProvider>,
}

impl HttpAgentClient {
    /// Create a new client with the given configuration and credential.
    pub fn new(config: AgentClientConfig, credential: Arc<dyn CredentialProvider>) -> Result<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(AgentClientError::ConfigError("endpoint is empty".to_string()));
        }

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            config,
            client,
            credential,
        })
    }

    pub fn config(&self) -> &AgentClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            path.trim_start_matches('/'),
            self.config.api_version
        )
    }

    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = self.credential.token().await?;
        Ok(self
            .client
            .request(method, self.url(path))
            .header("Authorization", format!("Bearer {}", token))
            .header("x-ms-client-request-id", uuid::Uuid::new_v4().to_string()))
    }

    /// Send with retries for transient failures, then decode the body.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let mut attempt = 0;
        loop {
            let result = match request.try_clone() {
                Some(copy) => self.send_once(copy).await,
                None => return self.send_once(request).await,
            };

            match result {
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.config.retry_delay(attempt);
                    warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient agent runtime error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn send_once<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, error_text));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            AgentClientError::InvalidResponse(format!("{}: {}", e, truncate(&body, 200)))
        })
    }
}

/// Map a non-success status to the matching error variant.
fn error_for_status(status: StatusCode, body: String) -> AgentClientError {
    match status.as_u16() {
        401 | 403 => AgentClientError::AuthenticationError(body),
        404 => AgentClientError::NotFound(body),
        429 => AgentClientError::RateLimitExceeded(body),
        code => AgentClientError::ApiError {
            status: code,
            message: body,
        },
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[async_trait]
impl AgentRuntime for HttpAgentClient {
    async fn get_agent(&self, agent_id: &str) -> Result<AgentHandle> {
        let request = self
            .request(Method::GET, &format!("assistants/{}", agent_id))
            .await?;
        let agent: WireAgent = self.send(request).await?;
        Ok(agent.into())
    }

    async fn create_agent(&self, name: &str, definition: &AgentDefinition) -> Result<AgentHandle> {
        let body = CreateAgentRequest {
            model: &definition.model,
            name,
            instructions: &definition.instructions,
            tools: &definition.tools,
            temperature: definition.temperature,
            top_p: definition.top_p,
        };

        let request = self.request(Method::POST, "assistants").await?.json(&body);
        let agent: WireAgent = self.send(request).await?;
        debug!(agent_id = %agent.id, name = name, "Created remote agent");
        Ok(agent.into())
    }

    async fn delete_agent(&self, agent: &AgentHandle) -> Result<()> {
        let request = self
            .request(Method::DELETE, &format!("assistants/{}", agent.agent_id))
            .await?;
        let _: DeletionStatus = self.send(request).await?;
        Ok(())
    }

    async fn create_thread(&self) -> Result<Thread> {
        let request = self
            .request(Method::POST, "threads")
            .await?
            .json(&serde_json::json!({}));
        self.send(request).await
    }

    async fn create_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ThreadMessage> {
        let request = self
            .request(Method::POST, &format!("threads/{}/messages", thread_id))
            .await?
            .json(&CreateMessageRequest { role, content });
        self.send(request).await
    }

    async fn create_run(&self, thread_id: &str, agent_id: &str) -> Result<Run> {
        let request = self
            .request(Method::POST, &format!("threads/{}/runs", thread_id))
            .await?
            .json(&CreateRunRequest {
                assistant_id: agent_id,
            });
        self.send(request).await
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        let request = self
            .request(Method::GET, &format!("threads/{}/runs/{}", thread_id, run_id))
            .await?;
        self.send(request).await
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>> {
        let request = self
            .request(Method::GET, &format!("threads/{}/messages", thread_id))
            .await?
            .query(&[("order", "desc")]);
        let page: ListResponse<ThreadMessage> = self.send(request).await?;
        Ok(page.data)
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let request = self
            .request(Method::DELETE, &format!("threads/{}", thread_id))
            .await?;
        let _: DeletionStatus = self.send(request).await?;
        Ok(())
    }
}

// Request/response wire types

#[derive(Debug, Serialize)]
struct CreateAgentRequest<'a> {
    model: &'a str,
    name: &'a str,
    instructions: &'a str,
    tools: &'a [ToolDescriptor],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Debug, Serialize)]
struct CreateMessageRequest<'a> {
    role: MessageRole,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateRunRequest<'a> {
    assistant_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct WireAgent {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

impl From<WireAgent> for AgentHandle {
    fn from(agent: WireAgent) -> Self {
        AgentHandle {
            name: agent.name.unwrap_or_default(),
            version: agent.version.unwrap_or_else(|| UNVERSIONED.to_string()),
            agent_id: agent.id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct DeletionStatus {
    #[serde(default)]
    #[allow(dead_code)]
    deleted: bool,
}
