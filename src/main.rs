mod config;
mod db;
mod dtos;
mod error;
mod feed;
mod guard;
mod handler;
mod middleware;
mod models;
mod realtime;
mod routes;
mod service;
mod session;
mod storage;
mod utils;

use std::sync::Arc;

use axum::http::{header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE}, HeaderValue, Method};
use config::Config;
use db::{DBClient, Gateway};
use dotenv::dotenv;
use realtime::{spawn_pg_bridge, RealtimeHub};
use routes::create_router;
use service::{
    auth_service::AuthService, conversation_service::ConversationService, file_service::FileService,
    job_service::JobService, proposal_service::ProposalService,
};
use sqlx::postgres::PgPoolOptions;
use storage::{LocalStorage, ObjectStorage};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, info, warn};
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<dyn Gateway>,
    pub realtime: Arc<RealtimeHub>,
    pub auth_service: Arc<AuthService>,
    pub job_service: Arc<JobService>,
    pub proposal_service: Arc<ProposalService>,
    pub conversation_service: Arc<ConversationService>,
    pub file_service: Arc<FileService>,
}

impl AppState {
    pub fn new(
        env: Config,
        db_client: Arc<dyn Gateway>,
        realtime: Arc<RealtimeHub>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        let auth_service = Arc::new(AuthService::new(
            db_client.clone(),
            env.jwt_secret.clone(),
            env.jwt_maxage,
        ));

        AppState {
            auth_service,
            job_service: Arc::new(JobService::new(db_client.clone())),
            proposal_service: Arc::new(ProposalService::new(db_client.clone())),
            conversation_service: Arc::new(ConversationService::new(db_client.clone(), realtime.clone())),
            file_service: Arc::new(FileService::new(db_client.clone(), storage)),
            env,
            db_client,
            realtime,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .init();

    dotenv().ok();

    let config = match Config::init() {
        Ok(config) => config,
        Err(err) => {
            error!("Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    let pool = match PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            info!("Connection to the database is successful");
            pool
        }
        Err(err) => {
            error!("Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = sqlx::migrate!().run(&pool).await {
        error!("Failed to run migrations: {}", err);
        std::process::exit(1);
    }

    let realtime = Arc::new(RealtimeHub::new());
    let _bridge = spawn_pg_bridge(pool.clone(), realtime.clone());

    let db_client = match config.redis_url.as_deref() {
        Some(redis_url) => DBClient::with_redis(pool, redis_url).await,
        None => DBClient::new(pool),
    };
    info!("Token revocation backend: {}", db_client.revocation_backend());

    let storage = Arc::new(LocalStorage::new(&config.storage_dir, &config.public_url));

    let allowed_origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid origin {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE]);

    let app_state = AppState::new(config.clone(), Arc::new(db_client), realtime, storage);

    let app = create_router(Arc::new(app_state)).layer(cors);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("Failed to bind port {}: {}", config.port, err);
            std::process::exit(1);
        }
    };

    info!("Server is running on http://localhost:{}", config.port);

    if let Err(err) = axum::serve(listener, app).await {
        error!("Server error: {}", err);
    }
}
