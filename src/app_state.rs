use redis::aio::MultiplexedConnection;

use crate::llm_client::{LlmClient, LlmConfig};
use crate::queue::{JobQueue, RetryConfig};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub redis_url: String,
    pub chat_channel: String,
    pub queue_key: String,
    pub llm: LlmConfig,
    pub retry: RetryConfig,
}

/// Shared handles built once at startup: one multiplexed Redis connection,
/// the job queue riding on it, and the LLM client.
#[derive(Clone)]
pub struct AppState {
    pub redis: MultiplexedConnection,
    pub queue: JobQueue,
    pub llm: LlmClient,
}

impl AppState {
    pub async fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        let conn = client.get_multiplexed_async_connection().await?;
        let queue = JobQueue::new(conn.clone(), config.queue_key.clone());
        let llm = LlmClient::new(config.llm.clone())?;
        Ok(AppState {
            redis: conn,
            queue,
            llm,
        })
    }
}
