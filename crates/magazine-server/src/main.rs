use anyhow::Result;
use chrono::Utc;
use magazine_ai::{HttpRewriteService, ProcessScrapeLauncher};
use magazine_common::types::UserRole;
use magazine_storage::{ContentStore, NewUser};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use magazine_server::app;
use magazine_server::config::{self, ServerConfig};
use magazine_server::seed;
use magazine_server::state::AppState;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  magazine-server [config.toml]                                  Start the server");
    eprintln!("  magazine-server init-categories <config.toml> <seed.json>      Initialize categories from seed file");
}

#[tokio::main]
async fn main() -> Result<()> {
    magazine_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("magazine=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("init-categories") => {
            let config_path = args.get(2).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("init-categories requires <config.toml> and <seed.json> arguments")
            })?;
            let seed_path = args.get(3).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("init-categories requires <seed.json> argument")
            })?;
            run_init_categories(config_path, seed_path).await
        }
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        _ => {
            let config_path = args
                .get(1)
                .map(|s| s.as_str())
                .unwrap_or("config/server.toml");
            run_server(config_path).await
        }
    }
}

async fn open_store(config: &ServerConfig) -> Result<ContentStore> {
    let db_url = config.database.connection_url();
    Ok(ContentStore::new(&db_url, Path::new(&config.database.data_dir)).await?)
}

/// Initialize categories from a JSON seed file.
async fn run_init_categories(config_path: &str, seed_path: &str) -> Result<()> {
    let config = config::ServerConfig::load(config_path)?;
    let store = open_store(&config).await?;
    let seed_file = seed::load_seed_file(seed_path)?;
    let report = seed::init_categories(&store, &seed_file).await?;
    tracing::info!(
        created = report.created,
        skipped = report.skipped,
        "init-categories completed"
    );
    Ok(())
}

/// Create the default admin account when the users table is empty.
async fn ensure_default_admin(store: &ContentStore, config: &ServerConfig) -> Result<()> {
    match store.count_users().await {
        Ok(0) => {
            let (password, generated) = match &config.auth.default_admin_password {
                Some(p) if !p.is_empty() => (p.clone(), false),
                _ => (magazine_storage::auth::generate_password(), true),
            };
            let password_hash = magazine_storage::auth::hash_password(&password)?;
            let new = NewUser {
                name: config.auth.default_admin_name.clone(),
                email: config.auth.default_admin_email.clone(),
                password_hash,
                role: UserRole::Admin,
                is_active: true,
            };
            match store.create_user(new).await {
                Ok(user) => {
                    if generated {
                        tracing::warn!(
                            email = %user.email,
                            password = %password,
                            "Created default admin account with a generated password. Change it after first login."
                        );
                    } else {
                        tracing::info!(email = %user.email, "Created default admin account");
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create default admin account");
                }
            }
        }
        Ok(count) => {
            tracing::info!(
                count,
                "Users table already has accounts, skipping default admin creation"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to check users table");
        }
    }
    Ok(())
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = config::ServerConfig::load(config_path)?;

    tracing::info!(
        http_port = config.http_port,
        data_dir = %config.database.data_dir,
        db = %config.database.redacted_url(),
        ai_service = %config.ai_service.base_url,
        "magazine-server starting"
    );

    let store = Arc::new(open_store(&config).await?);

    // JWT secret: use configured value or generate random
    let jwt_secret = match &config.auth.jwt_secret {
        Some(secret) if !secret.is_empty() => Arc::new(secret.clone()),
        _ => {
            tracing::warn!("No jwt_secret configured. A random secret was generated and will change on restart. Set [auth].jwt_secret in config for production use.");
            Arc::new(magazine_storage::auth::generate_password())
        }
    };

    if config.ai_service.callback_secret.is_empty() {
        tracing::warn!("No [ai_service].callback_secret configured. Keyword rewrite callbacks will be rejected.");
    }
    if config.scraper.callback_secret.is_empty() {
        tracing::warn!("No [scraper].callback_secret configured. Scrape job callbacks will be rejected.");
    }

    ensure_default_admin(&store, &config).await?;

    tokio::fs::create_dir_all(&config.media.storage_dir).await?;

    let rewriter = Arc::new(HttpRewriteService::new(
        &config.ai_service.base_url,
        config.ai_service.dispatch_timeout_secs,
        config.ai_service.rewrite_timeout_secs,
    )?);
    let scraper = Arc::new(ProcessScrapeLauncher::new(
        &config.scraper.command,
        config.scraper.args.clone(),
    ));

    let state = AppState {
        store,
        rewriter,
        scraper,
        start_time: Utc::now(),
        jwt_secret,
        token_expire_secs: config.auth.token_expire_secs,
        config: Arc::new(config.clone()),
    };

    let http_addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let app = app::build_http_app(state);
    let http_listener = tokio::net::TcpListener::bind(http_addr).await?;

    tracing::info!(http = %http_addr, "Server started");

    axum::serve(
        http_listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        signal::ctrl_c().await.ok();
        tracing::info!("Shutting down gracefully");
    })
    .await?;

    Ok(())
}
