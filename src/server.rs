use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::anyhow;
use axum::{
    extract::FromRef,
    http::{header, HeaderValue, Method},
    Router,
};
use axum_extra::extract::cookie::Key;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{
    budgets::{changes::BudgetChanges, services::BudgetService},
    database::PostgresConnection,
    email::{
        self,
        clients::{ConsoleMailer, SendgridMailer},
    },
    identities::services::{DynEmailClient, DynRateLimiter, UserService},
    rate_limit::{NoopRateLimiter, RedisRateLimiter},
    repos::{DynBudgetRepo, DynCategoryRepo, DynEmailRepo, DynExpenseItemRepo, DynUserRepo},
};

pub struct Options {
    pub allowed_origins: Vec<String>,
    pub bind_address: SocketAddr,

    pub database_pool_size: u32,
    pub database_timeout_seconds: u8,
    pub database_url: String,

    pub email_from_address: String,
    pub email_from_name: String,

    pub redis_url: Option<String>,
    pub require_verified_email: bool,
    pub secret_key: String,
    pub sendgrid_key: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    budget_service: BudgetService,
    cookie_key: Key,
    user_service: UserService,
}

impl AppState {
    pub fn new(budget_service: BudgetService, cookie_key: Key, user_service: UserService) -> Self {
        Self {
            budget_service,
            cookie_key,
            user_service,
        }
    }
}

impl FromRef<AppState> for BudgetService {
    fn from_ref(state: &AppState) -> Self {
        state.budget_service.clone()
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

impl FromRef<AppState> for UserService {
    fn from_ref(state: &AppState) -> Self {
        state.user_service.clone()
    }
}

/// Build the application's router.
///
/// # Arguments
///
/// * `state` - Services shared by all handlers.
/// * `allowed_origins` - Origins allowed to make credentialed cross-origin
///   requests.
pub fn app(state: AppState, allowed_origins: Vec<HeaderValue>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_credentials(true)
        .allow_methods([Method::DELETE, Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE]);

    Router::new()
        .nest("/authentication", crate::authentication::http::routes())
        .nest("/identities", crate::identities::http::routes())
        .merge(crate::budgets::http::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cookie_key(secret_key: &str) -> anyhow::Result<Key> {
    let bytes = base64::decode(secret_key.trim())?;

    Key::try_from(&bytes[..]).map_err(|error| anyhow!("Invalid secret key: {}", error))
}

pub async fn serve(opts: Options) -> anyhow::Result<()> {
    let db = PostgresConnection::connect(
        &opts.database_url,
        opts.database_pool_size,
        Duration::from_secs(opts.database_timeout_seconds.into()),
    )
    .await?;

    let rate_limiter: DynRateLimiter = match &opts.redis_url {
        Some(redis_url) => Arc::new(RedisRateLimiter::new(redis_url)?),
        None => {
            warn!("No Redis URL provided. Requests will not be rate limited.");

            Arc::new(NoopRateLimiter)
        }
    };

    let email_client: DynEmailClient = match opts.sendgrid_key {
        Some(api_key) => Arc::new(SendgridMailer::new(
            api_key,
            opts.email_from_address,
            opts.email_from_name,
        )),
        None => {
            info!("No SendGrid key provided. Emails will be printed to stdout.");

            Arc::new(ConsoleMailer {
                from: format!("{} <{}>", opts.email_from_name, opts.email_from_address),
            })
        }
    };

    let budget_repo: DynBudgetRepo = Arc::new(db.clone());
    let category_repo: DynCategoryRepo = Arc::new(db.clone());
    let email_repo: DynEmailRepo = Arc::new(db.clone());
    let item_repo: DynExpenseItemRepo = Arc::new(db.clone());
    let user_repo: DynUserRepo = Arc::new(db);

    let budget_service = BudgetService::new(
        budget_repo,
        category_repo,
        BudgetChanges::default(),
        item_repo,
    );
    let user_service = UserService::new(
        email_client,
        email_repo,
        rate_limiter,
        opts.require_verified_email,
        email::templates()?,
        user_repo,
    );

    let state = AppState::new(budget_service, cookie_key(&opts.secret_key)?, user_service);

    let allowed_origins = opts
        .allowed_origins
        .iter()
        .map(|origin| HeaderValue::from_str(origin))
        .collect::<Result<Vec<_>, _>>()?;

    let app = app(state, allowed_origins);

    info!(address = %opts.bind_address, "Starting server.");

    axum::Server::bind(&opts.bind_address)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(?error, "Failed to listen for shutdown signal.");

        return;
    }

    info!("Shutting down.");
}
