use std::path::PathBuf;
use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use clap::{Parser, Subcommand};
use sqlx::SqlitePool;
use tracing::{error, info, warn};
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, Layer};

mod api;
mod config;
mod db;
mod shutdown;
mod sync;
mod transfer;
#[cfg(test)]
mod test_support;

use crate::api::{
    dashboard::dashboard_config,
    health::health_config,
    job::{
        handlers::{job_config, UploadLimit},
        JobService,
    },
    settings::settings_config,
    validation,
};
use crate::config::Config;
use crate::db::Storage;
use crate::shutdown::ShutdownCoordinator;
use crate::sync::{HttpRemote, PullReport, SyncClient};

#[derive(Parser)]
#[command(name = "job-tracker", version, about = "Job tracking service with remote spreadsheet sync")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Import a delimited text file into a category pair
    Import {
        #[arg(long)]
        category: String,
        #[arg(long)]
        sub_category: String,
        file: PathBuf,
    },
    /// Export a category pair as CSV
    Export {
        #[arg(long)]
        category: String,
        #[arg(long)]
        sub_category: String,
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Replace local jobs with the remote dataset
    Pull,
    /// Replace the remote dataset with local jobs
    Push,
}

/// Console output plus daily rolling files per level under `log_dir`
///
/// Log files are created as: logs/info.log.2024-12-22, logs/error.log.2024-12-22, etc.
fn init_tracing(log_dir: &str) {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let info_file = tracing_appender::rolling::daily(log_dir, "info.log");
    let warn_file = tracing_appender::rolling::daily(log_dir, "warn.log");
    let error_file = tracing_appender::rolling::daily(log_dir, "error.log");

    let info_layer = tracing_subscriber::fmt::layer()
        .with_writer(info_file)
        .with_ansi(false)
        .with_filter(LevelFilter::INFO);

    let warn_layer = tracing_subscriber::fmt::layer()
        .with_writer(warn_file)
        .with_ansi(false)
        .with_filter(LevelFilter::WARN);

    let error_layer = tracing_subscriber::fmt::layer()
        .with_writer(error_file)
        .with_ansi(false)
        .with_filter(LevelFilter::ERROR);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(info_layer)
        .with(warn_layer)
        .with(error_layer)
        .init();
}

/// Open storage and build the job store with its remote sync client
async fn build_service(config: &Config) -> std::io::Result<(SqlitePool, JobService)> {
    let pool = db::connection::get_connection(&config.database_url, config.max_db_connections)
        .await
        .map_err(std::io::Error::other)?;
    info!("Database connection pool established");

    db::migrations::run_migrations(&pool)
        .await
        .map_err(std::io::Error::other)?;

    let storage = Storage::new(pool.clone());
    let script_url = match storage.load_script_url().await.map_err(std::io::Error::other)? {
        Some(url) => Some(url),
        None => config.remote_script_url.clone(),
    };

    let remote = HttpRemote::new(config.remote_timeout).map_err(std::io::Error::other)?;
    let sync_client = Arc::new(SyncClient::new(Arc::new(remote), script_url));

    let service = JobService::load(
        storage,
        sync_client,
        config.sync_debounce,
        config.activation_category.clone(),
    )
    .await
    .map_err(std::io::Error::other)?;

    Ok((pool, service))
}

fn log_pull(report: &PullReport) {
    match report {
        PullReport::Replaced { count } => info!("Loaded {} jobs from remote endpoint", count),
        PullReport::Ignored { reason } => info!("Remote dataset not applied: {}", reason),
        PullReport::Failed { reason } => warn!("Remote pull failed: {}", reason),
    }
}

async fn serve(config: Config, pool: SqlitePool, service: JobService) -> std::io::Result<()> {
    info!("Starting job-tracker server");
    info!("  - Max payload size: {} bytes", config.max_payload_size);
    info!("  - Max database connections: {}", config.max_db_connections);
    info!("  - Sync debounce: {:?}", config.sync_debounce);
    info!("  - Activation category: {}", config.activation_category);

    // Stored endpoint is pulled once at startup, same as saving it in settings
    if service.script_url().is_some() {
        match service.pull_remote().await {
            Ok(report) => log_pull(&report),
            Err(e) => error!("Initial remote pull failed: {}", e),
        }
    }

    let service = web::Data::new(service);
    let server_service = service.clone();
    let server_pool = pool.clone();
    let max_payload_size = config.max_payload_size;

    let server = HttpServer::new(move || {
        let payload_config = web::PayloadConfig::default().limit(max_payload_size);

        App::new()
            .app_data(web::Data::new(server_pool.clone()))
            .app_data(server_service.clone())
            .app_data(web::Data::new(UploadLimit(max_payload_size)))
            .app_data(payload_config)
            .app_data(validation::json_config())
            .configure(health_config)
            .configure(dashboard_config)
            .configure(settings_config)
            .configure(job_config)
    });

    info!("Server starting on http://{}", config.bind_addr);

    let server = server.bind(config.bind_addr.as_str())?.run();
    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    ShutdownCoordinator::new(server_handle, server_task, service, pool)
        .wait_for_shutdown()
        .await
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env().map_err(std::io::Error::other)?;

    std::fs::create_dir_all(&config.log_dir)?;
    init_tracing(&config.log_dir);

    let (pool, service) = build_service(&config).await?;

    let result = match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => return serve(config, pool, service).await,
        Command::Import {
            category,
            sub_category,
            file,
        } => {
            let raw = std::fs::read_to_string(&file)?;
            match service.import_from_text(&raw, &category, &sub_category).await {
                Ok(summary) => {
                    info!(
                        "Imported {} jobs from {} ({} lines rejected)",
                        summary.imported,
                        file.display(),
                        summary.rejected.len()
                    );
                    for rejected in &summary.rejected {
                        warn!("Line {}: {}", rejected.line, rejected.reason);
                    }
                    service.flush_sync().await;
                    Ok(())
                }
                Err(e) => Err(e),
            }
        }
        Command::Export {
            category,
            sub_category,
            search,
            out_dir,
        } => {
            let jobs = service.list(&category, &sub_category, &search).await;
            let export = service.export_to_text(&category, &sub_category, &jobs);
            let path = out_dir.join(&export.filename);
            std::fs::write(&path, export.content)?;
            info!("Exported {} jobs to {}", jobs.len(), path.display());
            Ok(())
        }
        Command::Pull => service.pull_remote().await.map(|report| log_pull(&report)),
        Command::Push => service
            .push_remote()
            .await
            .map(|count| info!("Pushed {} jobs to remote endpoint", count)),
    };

    pool.close().await;
    result.map_err(|e| {
        error!("{}", e);
        std::io::Error::other(e)
    })
}
