use clap::Parser;
use tokio::signal;

use imposter_mcp::app_state::{AppConfig, AppState};
use imposter_mcp::llm_client::LlmConfig;
use imposter_mcp::queue::{JobConsumer, RetryConfig};
use imposter_mcp::worker::RedisPublisher;
use imposter_mcp::{server, worker};

#[derive(Parser, Debug)]
#[command(
    name = "imposter-mcp",
    about = "Event intake plus background imposter-reply worker for the chat frontend"
)]
struct Cli {
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    #[arg(long, default_value_t = 8000)]
    port: u16,
    /// Overrides the REDIS_URL environment variable.
    #[arg(long)]
    redis_url: Option<String>,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig {
        host: cli.host,
        port: cli.port,
        redis_url: cli
            .redis_url
            .unwrap_or_else(|| env_or("REDIS_URL", "redis://redis:6379/0")),
        chat_channel: env_or("REDIS_CHAT_CHANNEL", "chat"),
        queue_key: env_or("REDIS_QUEUE_KEY", "mcp:jobs"),
        llm: LlmConfig::from_env(),
        retry: RetryConfig::default(),
    };

    server::init_logging();

    actix_web::rt::System::new().block_on(async move {
        let state = AppState::new(&config).await?;
        // BRPOP blocks its whole connection; the consumer gets a dedicated one.
        let consumer = JobConsumer::connect(&config.redis_url, config.queue_key.clone()).await?;
        let publisher = RedisPublisher::new(state.redis.clone(), config.chat_channel.clone());
        let worker_loop = worker::run(consumer, state.llm.clone(), publisher, config.retry.clone());

        tokio::select! {
            _ = worker_loop => {
                unreachable!()
            }
            res = server::startup(config, state) => {
                res?;
            }
            _ = signal::ctrl_c() => {
                log::info!("Received Ctrl+C, shutting down");
            }
        }
        Ok(())
    })
}
