use crate::configuration::{CommentSettings, Configuration, DatabaseConfigs, StorageBackend};
use crate::realtime::CommentHub;
use crate::repository::Repositories;
use crate::routes::{comment_routes, health_check};
use actix_web::dev::Server;
use actix_web::{App, HttpServer, web};
use anyhow::Context;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::time::Duration;
use tracing_actix_web::TracingLogger;

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub async fn build(config: Configuration) -> Result<Self, anyhow::Error> {
        let repositories = match config.database.backend {
            StorageBackend::Postgres => {
                Repositories::postgres(get_connection_pool(&config.database))
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory comment storage; data is lost on shutdown");
                Repositories::in_memory()
            }
        };

        Self::build_with_repositories(config, repositories).await
    }

    pub async fn build_with_repositories(
        config: Configuration,
        repositories: Repositories,
    ) -> Result<Self, anyhow::Error> {
        let address = format!("{}:{}", config.application.host, config.application.port);
        let listener = TcpListener::bind(address)
            .with_context(|| "Failed to bind TCP listener for application")?;
        let port = listener
            .local_addr()
            .with_context(|| "Failed to read local address of TCP listener")?
            .port();

        let sse = SseSettings {
            keep_alive: Duration::from_secs(config.application.sse_keep_alive_secs.max(1)),
        };
        let server = run(listener, repositories, config.comments, sse)
            .context("Failed to run Actix web server")?;

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), anyhow::Error> {
        self.server.await.context("Server stopped with an error")
    }
}

pub fn get_connection_pool(config: &DatabaseConfigs) -> PgPool {
    PgPoolOptions::new().connect_lazy_with(config.connect_options())
}

#[derive(Clone, Debug)]
pub struct SseSettings {
    pub keep_alive: Duration,
}

fn run(
    tcp_listener: TcpListener,
    repositories: Repositories,
    comment_settings: CommentSettings,
    sse: SseSettings,
) -> Result<Server, anyhow::Error> {
    let hub = web::Data::new(CommentHub::new(comment_settings.channel_capacity));
    let comment_store = web::Data::from(repositories.comments);
    let author_directory = web::Data::from(repositories.authors);
    let comment_settings = web::Data::new(comment_settings);
    let sse = web::Data::new(sse);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .configure(configure_routes)
            .app_data(comment_store.clone())
            .app_data(author_directory.clone())
            .app_data(hub.clone())
            .app_data(comment_settings.clone())
            .app_data(sse.clone())
    })
    .listen(tcp_listener)
    .with_context(|| "Failed to bind Actix server to TCP listener")?
    .run();

    Ok(server)
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health_check", web::get().to(health_check))
        .service(web::scope("/v1").service(web::scope("/comment").configure(comment_routes)));
}
