use std::future::Future;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;

use crate::io_struct::{ChatMessage, Message};
use crate::llm_client::LlmClient;
use crate::queue::{BackoffCalculator, JobConsumer, JobDelivery, RetryConfig};
use crate::skills;

pub const REPLY_TEMPERATURE: f32 = 0.8;
pub const REPLY_MAX_TOKENS: u32 = 80;

const EMPTY_REPLY: &str = "[imposter-bot] (empty reply)";
const POP_TIMEOUT: Duration = Duration::from_secs(5);

const ADJECTIVES: [&str; 6] = ["Curious", "Gentle", "Swift", "Witty", "Brave", "Sunny"];
const ANIMALS: [&str; 6] = ["Otter", "Fox", "Koala", "Panda", "Cat", "Turtle"];

/// Friendly bot display names in the style of frontend usernames, e.g.
/// `SwiftKoala42`. Seedable so tests get a deterministic sequence.
pub struct BotNameGenerator {
    rng: StdRng,
}

impl BotNameGenerator {
    pub fn new() -> Self {
        BotNameGenerator {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        BotNameGenerator {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn generate(&mut self) -> String {
        let adjective = ADJECTIVES[self.rng.random_range(0..ADJECTIVES.len())];
        let animal = ANIMALS[self.rng.random_range(0..ANIMALS.len())];
        let number = self.rng.random_range(0..100);
        format!("{adjective}{animal}{number}")
    }
}

impl Default for BotNameGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Seam between the worker and the pub/sub medium, so job processing can be
/// exercised without a live broker.
pub trait Publisher {
    fn publish(
        &mut self,
        message: &ChatMessage,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Publishes JSON-encoded messages to the configured Redis chat channel.
pub struct RedisPublisher {
    conn: MultiplexedConnection,
    channel: String,
}

impl RedisPublisher {
    pub fn new(conn: MultiplexedConnection, channel: impl Into<String>) -> Self {
        RedisPublisher {
            conn,
            channel: channel.into(),
        }
    }
}

impl Publisher for RedisPublisher {
    fn publish(
        &mut self,
        message: &ChatMessage,
    ) -> impl Future<Output = anyhow::Result<()>> + Send {
        async move {
            let payload = serde_json::to_string(message)?;
            let _: () = self.conn.publish(&self.channel, payload).await?;
            Ok(())
        }
    }
}

fn room_or_lobby(room: &str) -> String {
    if room.is_empty() {
        "lobby".to_string()
    } else {
        room.to_string()
    }
}

fn fallback_text(err: &str, user_prompt: &str) -> String {
    let detail = if !err.is_empty() {
        err
    } else if !user_prompt.is_empty() {
        user_prompt
    } else {
        "..."
    };
    format!("[imposter-bot] (fallback) {detail}")
}

fn finalize_reply(text: &str) -> String {
    let sanitized = skills::sanitize(text);
    let trimmed = sanitized.trim();
    if trimmed.is_empty() {
        EMPTY_REPLY.to_string()
    } else {
        trimmed.to_string()
    }
}

/// One attempt at a reply job: assemble prompts, call the LLM, sanitize, and
/// publish the resulting chat message. LLM errors are not failures; they feed
/// the fallback text. Returns the published text.
pub async fn handle_job<P: Publisher>(
    delivery: &JobDelivery,
    llm: &LlmClient,
    names: &mut BotNameGenerator,
    publisher: &mut P,
) -> anyhow::Result<String> {
    let job = &delivery.job;
    let system = skills::build_system(&job.bias);
    let user_prompt = skills::summarize_recent(&job.recent);

    let messages = [
        Message::system(system.as_str()),
        Message::user(user_prompt.as_str()),
    ];
    let text = match llm
        .chat_completions(&messages, REPLY_TEMPERATURE, REPLY_MAX_TOKENS)
        .await
    {
        Ok(text) => text,
        Err(err) => fallback_text(&err.to_string(), &user_prompt),
    };
    let text = finalize_reply(&text);

    let message = ChatMessage::bot(
        names.generate(),
        text.clone(),
        room_or_lobby(&job.room),
        Some(delivery.task_id.clone()),
    );
    publisher.publish(&message).await?;
    Ok(text)
}

/// Best-effort fallback publish so the chat does not stall silently. Its own
/// failure is swallowed; the original job error still drives the retry.
async fn publish_fallback<P: Publisher>(
    delivery: &JobDelivery,
    err: &anyhow::Error,
    names: &mut BotNameGenerator,
    publisher: &mut P,
) {
    let message = ChatMessage::bot(
        names.generate(),
        format!("(error handling reply: {err})"),
        room_or_lobby(&delivery.job.room),
        Some(delivery.task_id.clone()),
    );
    if let Err(e) = publisher.publish(&message).await {
        log::warn!("Fallback publish failed for job {}: {e}", delivery.task_id);
    }
}

/// Run one delivery through bounded retry with exponential backoff. Every
/// failed attempt triggers a fallback publish; after the retries are exhausted
/// the original error is returned to the caller.
pub async fn process_delivery<P: Publisher>(
    delivery: &JobDelivery,
    llm: &LlmClient,
    names: &mut BotNameGenerator,
    publisher: &mut P,
    retry: &RetryConfig,
) -> anyhow::Result<String> {
    let mut attempt: u32 = 0;
    loop {
        match handle_job(delivery, llm, names, publisher).await {
            Ok(text) => return Ok(text),
            Err(err) => {
                publish_fallback(delivery, &err, names, publisher).await;
                if attempt >= retry.max_retries {
                    return Err(err);
                }
                let delay = BackoffCalculator::calculate_delay(retry, attempt);
                log::warn!(
                    "Job {} attempt {} failed: {err}; retrying in {:?}",
                    delivery.task_id,
                    attempt + 1,
                    delay
                );
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Worker loop: pop deliveries off the queue and process them until shutdown.
/// The consumer blocks on `BRPOP`, so it rides its own Redis connection.
pub async fn run<P: Publisher>(
    consumer: JobConsumer,
    llm: LlmClient,
    mut publisher: P,
    retry: RetryConfig,
) {
    let mut names = BotNameGenerator::new();
    log::info!("Reply worker started");
    loop {
        let delivery = match consumer.pop(POP_TIMEOUT).await {
            Ok(Some(delivery)) => delivery,
            Ok(None) => continue,
            Err(e) => {
                log::error!("Failed to pop job from queue: {e}");
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };
        match process_delivery(&delivery, &llm, &mut names, &mut publisher, &retry).await {
            Ok(text) => log::info!(
                "Job {} published reply ({} chars)",
                delivery.task_id,
                text.len()
            ),
            Err(e) => log::error!("Job {} gave up after retries: {e}", delivery.task_id),
        }
    }
}
