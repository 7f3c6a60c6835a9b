use std::future::Future;
use std::io::Write;

use actix_web::{HttpResponse, HttpServer, web};
use serde_json::json;

use crate::app_state::{AppConfig, AppState};
use crate::bias::build_bias;
use crate::io_struct::{EventAck, McpEvent};
use crate::queue::ReplyJob;

/// Seam between the HTTP surface and the broker, so handlers can be exercised
/// without a live Redis.
pub trait Broker {
    fn ping(&self) -> impl Future<Output = anyhow::Result<()>> + Send;
    fn dispatch(&self, job: ReplyJob) -> impl Future<Output = anyhow::Result<String>> + Send;
}

impl Broker for AppState {
    fn ping(&self) -> impl Future<Output = anyhow::Result<()>> + Send {
        let mut conn = self.redis.clone();
        async move {
            redis::cmd("PING").query_async::<String>(&mut conn).await?;
            Ok(())
        }
    }

    fn dispatch(&self, job: ReplyJob) -> impl Future<Output = anyhow::Result<String>> + Send {
        self.queue.dispatch(job)
    }
}

pub async fn health<B: Broker>(state: web::Data<B>) -> HttpResponse {
    match state.ping().await {
        Ok(()) => HttpResponse::Ok().json(json!({ "ok": true })),
        Err(e) => HttpResponse::Ok().json(json!({ "ok": false, "error": e.to_string() })),
    }
}

pub async fn mcp_event<B: Broker>(
    ev: web::Json<McpEvent>,
    state: web::Data<B>,
) -> Result<HttpResponse, actix_web::Error> {
    let ev = ev.into_inner();
    let bias = build_bias(&ev.recent);
    let job = ReplyJob {
        room: ev.room.clone(),
        recent: ev.recent,
        bias: bias.clone(),
    };
    let task_id = state
        .dispatch(job)
        .await
        .map_err(actix_web::error::ErrorBadGateway)?;
    log::info!("Queued reply job {task_id} for room {}", ev.room);
    Ok(HttpResponse::Ok().json(EventAck {
        ok: true,
        queued: true,
        room: ev.room,
        bias,
    }))
}

pub fn init_logging() {
    // default level is info
    env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, log::LevelFilter::Info)
        .init();
}

pub async fn startup(config: AppConfig, app_state: AppState) -> std::io::Result<()> {
    let app_state = web::Data::new(app_state);

    log::info!("Starting server at {}:{}", config.host, config.port);

    HttpServer::new(move || {
        actix_web::App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(app_state.clone())
            .route("/health", web::get().to(health::<AppState>))
            .route("/mcp/event", web::post().to(mcp_event::<AppState>))
    })
    .bind((config.host, config.port))?
    .run()
    .await
}
