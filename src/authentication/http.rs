use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use axum_extra::extract::PrivateCookieJar;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use uuid::Uuid;

use crate::{
    budgets::{
        domain::budgets::Budget,
        services::{BudgetAccessError, BudgetService},
    },
    client_ip::ClientIp,
    http_err::{ApiError, ApiResponse, ErrorRep},
    identities::services::{AuthenticationError, UserService},
    server::AppState,
};

use super::domain::session::Session;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(create_session).delete(delete_session))
        .route("/me", get(get_user_info))
        .route("/me/active-budget", put(set_active_budget))
}

#[derive(Deserialize)]
struct UsernamePasswordPair {
    username: String,
    password: String,
}

#[derive(Serialize)]
pub struct SessionUser {
    pub user_id: Uuid,
    pub username: String,
}

pub enum CreateSessionResponse {
    Created(PrivateCookieJar, SessionUser),
    BadRequest(ErrorRep),
}

impl IntoResponse for CreateSessionResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(cookie_jar, user) => {
                (StatusCode::CREATED, cookie_jar, Json(user)).into_response()
            }
            Self::BadRequest(error) => (StatusCode::BAD_REQUEST, Json(error)).into_response(),
        }
    }
}

async fn create_session(
    ClientIp(client_ip): ClientIp,
    cookies: PrivateCookieJar,
    State(user_service): State<UserService>,
    Json(credentials): Json<UsernamePasswordPair>,
) -> ApiResponse<CreateSessionResponse> {
    let user = match user_service
        .authenticate(
            &client_ip.to_string(),
            &credentials.username,
            &credentials.password,
        )
        .await
    {
        Ok(user) => user,
        Err(AuthenticationError::InvalidCredentials) => {
            return Ok(CreateSessionResponse::BadRequest(ErrorRep {
                message: "Invalid username or password.".to_owned(),
            }))
        }
        Err(AuthenticationError::EmailNotVerified) => {
            return Ok(CreateSessionResponse::BadRequest(ErrorRep {
                message: "Please verify your email address before logging in.".to_owned(),
            }))
        }
        Err(AuthenticationError::RateLimited(error)) => return Err(error.into()),
        Err(AuthenticationError::Other(error)) => {
            error!(?error, "Failed to authenticate user.");

            return Err(ApiError::InternalServerError);
        }
    };

    let session = Session::new_for_user(user.id, &user.username);
    let updated_cookies = session.store(cookies)?;

    Ok(CreateSessionResponse::Created(
        updated_cookies,
        SessionUser {
            user_id: user.id,
            username: user.username,
        },
    ))
}

async fn delete_session(cookies: PrivateCookieJar) -> (PrivateCookieJar, StatusCode) {
    (Session::clear(cookies), StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct ActiveBudget {
    pub id: i64,
    pub name: String,
    pub room_code: String,
}

impl From<&Budget> for ActiveBudget {
    fn from(budget: &Budget) -> Self {
        Self {
            id: budget.id,
            name: budget.name.clone(),
            room_code: budget.room_code.as_str().to_owned(),
        }
    }
}

#[derive(Serialize)]
pub struct UserInfo {
    pub user_id: Uuid,
    pub username: String,
    pub email_verified: bool,
    pub active_budget: Option<ActiveBudget>,
}

/// Describe the signed in user.
///
/// The active budget's room code is looked up on every request rather than
/// being kept in the session.
async fn get_user_info(
    session: Session,
    State(user_service): State<UserService>,
    State(budget_service): State<BudgetService>,
) -> ApiResponse<Json<UserInfo>> {
    let user = user_service
        .get_user(session.user_id())
        .await?
        .ok_or_else(|| {
            debug!(user_id = %session.user_id(), "Session belongs to a deleted user.");

            ApiError::Unauthorized
        })?;

    let active_budget = match session.active_budget_id() {
        Some(budget_id) => match budget_service.get_budget(user.id, budget_id).await {
            Ok(budget) => Some(ActiveBudget::from(&budget)),
            Err(BudgetAccessError::NotFound) => None,
            Err(BudgetAccessError::Other(error)) => return Err(error.into()),
        },
        None => None,
    };

    Ok(Json(UserInfo {
        user_id: user.id,
        username: user.username,
        email_verified: user.email_verified,
        active_budget,
    }))
}

#[derive(Deserialize)]
struct ActiveBudgetRequest {
    budget_id: Option<i64>,
}

/// Change the budget the user is currently viewing. A `null` budget clears
/// the selection.
async fn set_active_budget(
    mut session: Session,
    cookies: PrivateCookieJar,
    State(budget_service): State<BudgetService>,
    Json(request): Json<ActiveBudgetRequest>,
) -> ApiResponse<(PrivateCookieJar, Json<Option<ActiveBudget>>)> {
    let active_budget = match request.budget_id {
        Some(budget_id) => match budget_service.get_budget(session.user_id(), budget_id).await {
            Ok(budget) => Some(budget),
            Err(BudgetAccessError::NotFound) => {
                return Err(ApiError::NotFound("Budget not found.".to_owned()))
            }
            Err(BudgetAccessError::Other(error)) => return Err(error.into()),
        },
        None => None,
    };

    session.set_active_budget(active_budget.as_ref().map(|budget| budget.id));
    let updated_cookies = session.store(cookies)?;

    Ok((
        updated_cookies,
        Json(active_budget.as_ref().map(ActiveBudget::from)),
    ))
}
