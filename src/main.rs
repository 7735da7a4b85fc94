use std::time::Duration;

use actix_web::middleware::NormalizePath;
use actix_web::web::{self, Data};
use actix_web::{App, HttpServer, Responder, get};
use dotenvy::dotenv;

mod admission;
mod api;
mod config;
mod db;
mod docs;
mod error;
mod leave_count;
mod model;
mod records;
mod routes;
mod store;
mod toggle;
mod utils;

use admission::AdmissionPolicy;
use config::Config;
use db::init_db;
use error::{json_error_handler, query_error_handler};
use leave_count::{LeaveCounts, SheetClient};

use crate::docs::ApiDoc;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Attendance API Running"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    let config = Config::from_env()?;
    info!(addr = %config.server_addr, "Server starting...");

    if config.enforce_ip_check {
        info!(exempt = config.admin_ips.len(), "One submission per IP per day is enforced");
    }
    if config.sheet_id.is_none() || config.google_api_key.is_none() {
        warn!("Roster sheet not configured, sync-from-sheet will fail");
    }

    let pool = init_db(&config.database_url).await?;

    let policy = Data::new(AdmissionPolicy::from_config(&config));
    let leave_counts = Data::new(LeaveCounts::new(Duration::from_secs(
        config.leave_cache_ttl_secs,
    )));
    let sheet = Data::new(SheetClient::from_config(&config));
    let submit_limiter = routes::build_limiter(config.rate_submit_per_min)?;

    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(web::QueryConfig::default().error_handler(query_error_handler))
            .app_data(Data::new(pool.clone()))
            .app_data(policy.clone())
            .app_data(leave_counts.clone())
            .app_data(sheet.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, &config, &submit_limiter))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
