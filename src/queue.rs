use std::time::Duration;

use rand::Rng;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use serde::{Deserialize, Serialize};

/// Fixed task identifier carried in every queue envelope.
pub const GENERATE_REPLY_TASK: &str = "worker.generate_reply";

/// Work order for one imposter reply. Immutable once enqueued.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplyJob {
    pub room: String,
    pub recent: Vec<String>,
    pub bias: String,
}

/// Queue envelope: the job plus its delivery identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDelivery {
    pub task: String,
    pub task_id: String,
    pub job: ReplyJob,
}

/// Producer side of the Redis-list job queue: `LPUSH` to dispatch.
/// Multi-producer/multi-consumer safety is the broker's concern.
#[derive(Clone)]
pub struct JobQueue {
    conn: MultiplexedConnection,
    queue_key: String,
}

impl JobQueue {
    pub fn new(conn: MultiplexedConnection, queue_key: impl Into<String>) -> Self {
        JobQueue {
            conn,
            queue_key: queue_key.into(),
        }
    }

    /// Enqueue a job and return its task id. Fire-and-forget: callers never
    /// wait on job completion.
    pub async fn dispatch(&self, job: ReplyJob) -> anyhow::Result<String> {
        let delivery = JobDelivery {
            task: GENERATE_REPLY_TASK.to_string(),
            task_id: uuid::Uuid::new_v4().to_string(),
            job,
        };
        let payload = serde_json::to_string(&delivery)?;
        let mut conn = self.conn.clone();
        let _: () = conn.lpush(&self.queue_key, payload).await?;
        Ok(delivery.task_id)
    }
}

/// Consumer side, on its own dedicated connection. `BRPOP` blocks the issuing
/// client until it delivers or times out, and Redis queues every other command
/// from that client behind it, so the consumer must never share a multiplexed
/// connection with dispatch, health, or publish traffic.
pub struct JobConsumer {
    conn: MultiplexedConnection,
    queue_key: String,
}

impl JobConsumer {
    pub async fn connect(redis_url: &str, queue_key: impl Into<String>) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(JobConsumer {
            conn,
            queue_key: queue_key.into(),
        })
    }

    /// Block up to `timeout` for the next delivery. `Ok(None)` means the wait
    /// timed out or an undecodable payload was dropped.
    pub async fn pop(&self, timeout: Duration) -> anyhow::Result<Option<JobDelivery>> {
        let mut conn = self.conn.clone();
        let reply: Option<(String, String)> =
            conn.brpop(&self.queue_key, timeout.as_secs_f64()).await?;
        let Some((_, payload)) = reply else {
            return Ok(None);
        };
        Ok(decode_delivery(&payload))
    }
}

fn decode_delivery(payload: &str) -> Option<JobDelivery> {
    match serde_json::from_str::<JobDelivery>(payload) {
        Ok(delivery) if delivery.task == GENERATE_REPLY_TASK => Some(delivery),
        Ok(delivery) => {
            log::warn!("Dropping job with unknown task name: {}", delivery.task);
            None
        }
        Err(e) => {
            log::warn!("Dropping undecodable job payload: {e}");
            None
        }
    }
}

/// Job-level retry policy. `max_retries` counts retries after the first
/// attempt, so a permanently failing job executes `max_retries + 1` times.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f32,
    pub jitter_factor: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_retries: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 30_000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.0,
        }
    }
}

/// Computes exponential backoff with optional jitter.
pub struct BackoffCalculator;

impl BackoffCalculator {
    /// Calculate backoff delay for a given attempt index (0-based).
    pub fn calculate_delay(config: &RetryConfig, attempt: u32) -> Duration {
        let scaled =
            config.initial_backoff_ms as f32 * config.backoff_multiplier.powi(attempt as i32);
        let base_ms = (scaled as u64).min(config.max_backoff_ms);

        let jitter = config.jitter_factor.clamp(0.0, 1.0);
        if jitter == 0.0 {
            return Duration::from_millis(base_ms);
        }
        let mut rng = rand::rng();
        let scale: f32 = rng.random_range(-jitter..=jitter);
        let offset = (base_ms as f32 * scale).round() as i64;
        Duration::from_millis((base_ms as i64 + offset).max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_envelope_round_trip() {
        let delivery = JobDelivery {
            task: GENERATE_REPLY_TASK.to_string(),
            task_id: "t-1".to_string(),
            job: ReplyJob {
                room: "lobby".to_string(),
                recent: vec!["hi".to_string()],
                bias: "the->cat".to_string(),
            },
        };
        let payload = serde_json::to_string(&delivery).unwrap();
        let decoded = decode_delivery(&payload).unwrap();
        assert_eq!(decoded.task_id, "t-1");
        assert_eq!(decoded.job, delivery.job);
    }

    #[test]
    fn test_unknown_task_name_is_dropped() {
        let payload = r#"{"task":"worker.other","task_id":"t","job":{"room":"r","recent":[],"bias":""}}"#;
        assert!(decode_delivery(payload).is_none());
    }

    #[test]
    fn test_garbage_payload_is_dropped() {
        assert!(decode_delivery("not json at all").is_none());
    }

    #[tokio::test]
    async fn test_consumer_requires_reachable_broker() {
        // Nothing listens on the discard port; connect must fail, not hang.
        let result = JobConsumer::connect("redis://127.0.0.1:9/0", "jobs").await;
        assert!(result.is_err());
    }

    #[test]
    fn test_backoff_grows_per_attempt_and_caps() {
        let cfg = RetryConfig {
            max_retries: 3,
            initial_backoff_ms: 50,
            max_backoff_ms: 180,
            backoff_multiplier: 2.0,
            jitter_factor: 0.0,
        };
        let delays: Vec<u64> = (0..4)
            .map(|attempt| BackoffCalculator::calculate_delay(&cfg, attempt).as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![50, 100, 180, 180]);
    }

    #[test]
    fn test_backoff_jitter_stays_near_base_delay() {
        let cfg = RetryConfig {
            max_retries: 3,
            initial_backoff_ms: 200,
            max_backoff_ms: 60_000,
            backoff_multiplier: 3.0,
            jitter_factor: 0.25,
        };
        // attempt 1: 600 ms base, jitter within +/-25%
        for _ in 0..32 {
            let delay = BackoffCalculator::calculate_delay(&cfg, 1).as_millis() as u64;
            assert!((450..=750).contains(&delay), "delay {delay} out of bounds");
        }
    }

    #[test]
    fn test_default_retry_matches_queue_contract() {
        // 1 initial execution + 3 retries, 1s doubling backoff.
        let cfg = RetryConfig::default();
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.initial_backoff_ms, 1000);
        assert_eq!(cfg.backoff_multiplier, 2.0);
        assert_eq!(cfg.jitter_factor, 0.0);
    }
}
