//! Element Labeler - annotation backend server.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use element_labeler::{
    config::{BackendArgs, CheckConfig, Cli, Command, ServeConfig},
    db::redact,
    store::{JsonFiles, DETAILED_LABELS_FILE, ELEMENTS_FILE, LABELS_FILE, SORTED_ELEMENTS_FILE},
    AnnotationStore, AppState, AuthService, Database, DatabaseUrl, MemoryDatabase, PgDatabase,
    RouterConfig, UpstreamClient,
};

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is not an error
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Check(config) => run_check(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.debug_logging());

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Element Labeler v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Environment: {:?}", config.environment);
    info!("  Upstream API: {}", config.backend.api_url);
    info!("  Database: {}", redact(&config.backend.database_url));
    info!("  Database name: {}", config.backend.database_name);
    info!("  Data directory: {}", config.backend.data_dir.display());
    info!("  Static directory: {}", config.static_dir.display());
    info!("  Session lifetime: {} day(s)", config.session_ttl_days);
    match &config.cors_origins {
        Some(origins) => info!("  CORS origins: {}", origins.join(", ")),
        None => warn!("  CORS: any origin allowed"),
    }

    let upstream = match UpstreamClient::new(&config.backend.api_url) {
        Ok(upstream) => upstream,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match config.backend.database() {
        Ok(DatabaseUrl::Memory) => {
            warn!("  Using in-memory database: users and tokens are lost on exit");
            serve(Arc::new(MemoryDatabase::new()), upstream, &config).await
        }
        Ok(DatabaseUrl::Postgres(url)) => {
            match PgDatabase::new(url, config.backend.database_name.clone()) {
                Ok(db) => serve(Arc::new(db), upstream, &config).await,
                Err(e) => {
                    error!("Configuration error: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Err(e) => {
            error!("Configuration error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Connect to the database, build the router and serve until shutdown.
async fn serve<D: Database>(db: Arc<D>, upstream: UpstreamClient, config: &ServeConfig) -> ExitCode {
    info!("Connecting to {} database...", db.backend());
    if let Err(e) = db.ensure_connected().await {
        error!("  Failed to connect to database: {}", e);
        error!("  Please check the database URL and that the server is reachable");
        return ExitCode::FAILURE;
    }
    info!("  Connected successfully");

    let auth = AuthService::new(db).with_session_ttl(config.session_ttl());
    let store = AnnotationStore::new(config.backend.data_dir.clone());
    let state = AppState::new(store, auth, upstream);

    let router = element_labeler::create_router(state, build_router_config(config));

    let addr = config.bind_address();

    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    curl http://{}/api/elements", addr);
    info!("────────────────────────────────────────────────────────────────");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(debug: bool) {
    let env_filter = if debug {
        "element_labeler=debug,tower_http=debug"
    } else {
        "element_labeler=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new(config.static_dir.clone());

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config.with_tracing(!config.no_tracing)
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: CheckConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    println!("Element Labeler Configuration Check");
    println!("═══════════════════════════════════");
    println!();

    if let Err(e) = config.backend.validate() {
        println!("✗ Configuration: {}", e);
        return ExitCode::FAILURE;
    }
    println!("✓ Upstream API: {}", config.backend.api_url);
    println!("✓ Database: {}", redact(&config.backend.database_url));
    println!("✓ Data directory: {}", config.backend.data_dir.display());
    println!();

    check_data_files(&config.backend).await;
    println!();

    if !check_database(&config.backend).await {
        return ExitCode::FAILURE;
    }

    if !check_upstream(&config.backend).await {
        return ExitCode::FAILURE;
    }

    println!();
    println!("═══════════════════════════════════");
    println!("✓ All checks passed!");

    ExitCode::SUCCESS
}

/// Report which collection files exist in the data directory.
async fn check_data_files(backend: &BackendArgs) {
    println!("Data files:");
    let files = JsonFiles::new(backend.data_dir.clone());

    for name in [ELEMENTS_FILE, SORTED_ELEMENTS_FILE, LABELS_FILE, DETAILED_LABELS_FILE] {
        match files.exists(name).await {
            Ok(true) => println!("  ✓ {}", name),
            Ok(false) => println!("  - {} (not created yet)", name),
            Err(e) => println!("  ✗ {}: {}", name, e),
        }
    }
}

async fn check_database(backend: &BackendArgs) -> bool {
    print!("Testing database connection... ");

    let result = match backend.database() {
        Ok(DatabaseUrl::Memory) => MemoryDatabase::new().ensure_connected().await,
        Ok(DatabaseUrl::Postgres(url)) => {
            match PgDatabase::new(url, backend.database_name.clone()) {
                Ok(db) => db.ensure_connected().await,
                Err(e) => Err(e),
            }
        }
        Err(e) => {
            println!("✗ failed");
            println!("  {}", e);
            return false;
        }
    };

    match result {
        Ok(()) => {
            println!("✓ success");
            true
        }
        Err(e) => {
            println!("✗ failed");
            println!();
            println!("Error: {}", e);
            println!();
            println!("Please check:");
            println!("  - The database server is running and reachable");
            println!("  - The credentials in the database URL are correct");
            false
        }
    }
}

async fn check_upstream(backend: &BackendArgs) -> bool {
    print!("Testing upstream API... ");

    let client = match UpstreamClient::new(&backend.api_url) {
        Ok(client) => client,
        Err(e) => {
            println!("✗ failed");
            println!("  {}", e);
            return false;
        }
    };

    match client.probe().await {
        Ok(status) => {
            println!("✓ reachable (HTTP {})", status.as_u16());
            true
        }
        Err(e) => {
            println!("✗ failed");
            println!();
            println!("Error: {}", e);
            println!();
            println!("  The upstream API at '{}' could not be reached.", backend.api_url);
            false
        }
    }
}
