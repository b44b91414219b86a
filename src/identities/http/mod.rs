use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use tracing::error;

use crate::{
    client_ip::ClientIp,
    http_err::{ApiError, ApiResponse},
    identities::services::{CreateUserError, UserService, VerificationError},
    server::AppState,
};

pub mod reps;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/email-verifications", post(create_email_verification))
        .route(
            "/email-verifications/confirm",
            post(confirm_email_verification),
        )
}

pub enum CreateUserResponse {
    Created(reps::NewUserResponse),
    BadRequest(reps::NewUserValidationError),
}

impl IntoResponse for CreateUserResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(user) => (StatusCode::CREATED, Json(user)).into_response(),
            Self::BadRequest(error) => (StatusCode::BAD_REQUEST, Json(error)).into_response(),
        }
    }
}

async fn create_user(
    ClientIp(client_ip): ClientIp,
    State(user_service): State<UserService>,
    Json(new_user): Json<reps::NewUserRequest>,
) -> ApiResponse<CreateUserResponse> {
    match user_service
        .create_user(&client_ip.to_string(), new_user.into())
        .await
    {
        Ok(user) => Ok(CreateUserResponse::Created((&user).into())),
        Err(CreateUserError::InvalidUser(context)) => {
            Ok(CreateUserResponse::BadRequest(context.into()))
        }
        Err(CreateUserError::DuplicateEmail) => Err(ApiError::Conflict(
            "An account with that email address already exists.".to_owned(),
        )),
        Err(CreateUserError::DuplicateUsername) => {
            Err(ApiError::Conflict("That username is taken.".to_owned()))
        }
        Err(CreateUserError::RateLimited(error)) => Err(error.into()),
        Err(CreateUserError::Other(error)) => {
            error!(?error, "Failed to create user.");

            Err(ApiError::InternalServerError)
        }
    }
}

/// Mail a new verification code. The response never reveals whether the
/// address belongs to an account.
async fn create_email_verification(
    ClientIp(client_ip): ClientIp,
    State(user_service): State<UserService>,
    Json(request): Json<reps::VerificationRequest>,
) -> ApiResponse<StatusCode> {
    match user_service
        .resend_verification(&client_ip.to_string(), &request.email)
        .await
    {
        Ok(()) | Err(VerificationError::InvalidCode) => Ok(StatusCode::ACCEPTED),
        Err(VerificationError::RateLimited(error)) => Err(error.into()),
        Err(VerificationError::Other(error)) => {
            error!(?error, "Failed to send verification code.");

            Err(ApiError::InternalServerError)
        }
    }
}

async fn confirm_email_verification(
    ClientIp(client_ip): ClientIp,
    State(user_service): State<UserService>,
    Json(confirmation): Json<reps::VerificationConfirmation>,
) -> ApiResponse<Json<reps::VerifiedEmail>> {
    match user_service
        .confirm_email(
            &client_ip.to_string(),
            &confirmation.email,
            &confirmation.code,
        )
        .await
    {
        Ok(()) => Ok(Json(reps::VerifiedEmail {
            email: confirmation.email.trim().to_owned(),
        })),
        Err(VerificationError::InvalidCode) => Err(ApiError::BadRequestReason(
            "Invalid or expired verification code.".to_owned(),
        )),
        Err(VerificationError::RateLimited(error)) => Err(error.into()),
        Err(VerificationError::Other(error)) => {
            error!(?error, "Failed to confirm email address.");

            Err(ApiError::InternalServerError)
        }
    }
}
