use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::PrivateCookieJar;
use tracing::{debug, error};

use crate::{
    authentication::domain::session::Session,
    budgets::services::{
        BudgetAccessError, BudgetService, CreateBudgetError, JoinBudgetError, SubmitExpenseError,
    },
    http_err::{ApiError, ApiResponse},
    server::AppState,
};

use super::reps;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/budgets", get(get_budgets).post(create_budget))
        .route("/budgets/join", post(join_budget))
        .route("/budgets/:budget_id", get(get_budget))
        .route("/budgets/:budget_id/members", get(get_members))
        .route(
            "/budgets/:budget_id/items",
            get(get_items).post(create_item),
        )
        .route("/budgets/:budget_id/summary", get(get_summary))
        .route("/budgets/:budget_id/changes", get(get_changes))
        .route("/categories", get(get_categories))
}

fn budget_not_found() -> ApiError {
    ApiError::NotFound("Budget not found.".to_owned())
}

impl From<BudgetAccessError> for ApiError {
    fn from(error: BudgetAccessError) -> Self {
        match error {
            BudgetAccessError::NotFound => budget_not_found(),
            BudgetAccessError::Other(error) => error.into(),
        }
    }
}

async fn get_budgets(
    session: Session,
    State(budget_service): State<BudgetService>,
) -> ApiResponse<Json<Vec<reps::BudgetRep>>> {
    let budgets = budget_service.list_budgets(session.user_id()).await?;

    Ok(Json(budgets.iter().map(reps::BudgetRep::from).collect()))
}

pub enum CreateBudgetResponse {
    Created(reps::BudgetRep),
    BadRequest(reps::BudgetValidationError),
}

impl IntoResponse for CreateBudgetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(budget) => (StatusCode::CREATED, Json(budget)).into_response(),
            Self::BadRequest(error) => (StatusCode::BAD_REQUEST, Json(error)).into_response(),
        }
    }
}

async fn create_budget(
    session: Session,
    State(budget_service): State<BudgetService>,
    Json(new_budget): Json<reps::NewBudget>,
) -> ApiResponse<CreateBudgetResponse> {
    match budget_service
        .create_budget(session.user_id(), new_budget.into())
        .await
    {
        Ok(budget) => Ok(CreateBudgetResponse::Created((&budget).into())),
        Err(CreateBudgetError::InvalidBudget(context)) => {
            Ok(CreateBudgetResponse::BadRequest(context.into()))
        }
        Err(CreateBudgetError::Other(error)) => {
            error!(?error, "Failed to create budget.");

            Err(ApiError::InternalServerError)
        }
    }
}

/// Join a budget by its room code and make it the session's active budget.
async fn join_budget(
    mut session: Session,
    cookies: PrivateCookieJar,
    State(budget_service): State<BudgetService>,
    Json(request): Json<reps::JoinRequest>,
) -> ApiResponse<(PrivateCookieJar, Json<reps::JoinResponse>)> {
    let joined = match budget_service
        .join_budget(session.user_id(), &request.room_code)
        .await
    {
        Ok(joined) => joined,
        Err(JoinBudgetError::NotFound) => {
            return Err(ApiError::NotFound(
                "No budget matches that room code.".to_owned(),
            ))
        }
        Err(JoinBudgetError::Other(error)) => {
            error!(?error, "Failed to join budget.");

            return Err(ApiError::InternalServerError);
        }
    };

    session.set_active_budget(Some(joined.budget.id));
    let updated_cookies = session.store(cookies)?;

    Ok((updated_cookies, Json((&joined).into())))
}

async fn get_budget(
    session: Session,
    State(budget_service): State<BudgetService>,
    Path(budget_id): Path<i64>,
) -> ApiResponse<Json<reps::BudgetRep>> {
    let budget = budget_service
        .get_budget(session.user_id(), budget_id)
        .await?;

    Ok(Json((&budget).into()))
}

async fn get_members(
    session: Session,
    State(budget_service): State<BudgetService>,
    Path(budget_id): Path<i64>,
) -> ApiResponse<Json<Vec<reps::MemberRep>>> {
    let members = budget_service
        .list_members(session.user_id(), budget_id)
        .await?;

    Ok(Json(members.iter().map(reps::MemberRep::from).collect()))
}

async fn get_categories(
    _session: Session,
    State(budget_service): State<BudgetService>,
) -> ApiResponse<Json<Vec<reps::CategoryRep>>> {
    let categories = budget_service.list_categories().await?;

    Ok(Json(categories.iter().map(reps::CategoryRep::from).collect()))
}

async fn get_items(
    session: Session,
    State(budget_service): State<BudgetService>,
    Path(budget_id): Path<i64>,
) -> ApiResponse<Json<reps::LedgerRep>> {
    let ledger = budget_service.ledger(session.user_id(), budget_id).await?;

    Ok(Json((&ledger).into()))
}

pub enum CreateItemResponse {
    Created(reps::ExpenseItemRep),
    BadRequest(reps::ExpenseValidationError),
}

impl IntoResponse for CreateItemResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(item) => (StatusCode::CREATED, Json(item)).into_response(),
            Self::BadRequest(error) => (StatusCode::BAD_REQUEST, Json(error)).into_response(),
        }
    }
}

async fn create_item(
    session: Session,
    State(budget_service): State<BudgetService>,
    Path(budget_id): Path<i64>,
    Json(new_item): Json<reps::NewExpenseItem>,
) -> ApiResponse<CreateItemResponse> {
    match budget_service
        .submit_expense(session.user_id(), budget_id, new_item.into())
        .await
    {
        Ok(item) => Ok(CreateItemResponse::Created((&item).into())),
        Err(SubmitExpenseError::InvalidExpense(context)) => {
            Ok(CreateItemResponse::BadRequest(context.into()))
        }
        Err(SubmitExpenseError::BudgetNotFound) => Err(budget_not_found()),
        Err(SubmitExpenseError::InvalidSelection) => Err(ApiError::BadRequestReason(
            "Invalid category or user selection.".to_owned(),
        )),
        Err(SubmitExpenseError::Other(error)) => {
            error!(?error, %budget_id, "Failed to save expense item.");

            Err(ApiError::InternalServerError)
        }
    }
}

async fn get_summary(
    session: Session,
    State(budget_service): State<BudgetService>,
    Path(budget_id): Path<i64>,
) -> ApiResponse<Json<reps::SummaryRep>> {
    let report = budget_service.report(session.user_id(), budget_id).await?;

    Ok(Json((&report).into()))
}

/// Long poll for changes to a budget.
///
/// Responds as soon as the budget's revision moves past `since`, or with the
/// current revision once the poll times out. Omitting `since` returns the
/// current revision immediately.
async fn get_changes(
    session: Session,
    State(budget_service): State<BudgetService>,
    Path(budget_id): Path<i64>,
    Query(params): Query<reps::ChangesParams>,
) -> ApiResponse<Json<reps::ChangesRep>> {
    let revision = match params.since {
        Some(since) => {
            debug!(%budget_id, since, "Waiting for budget changes.");

            budget_service
                .wait_for_change(session.user_id(), budget_id, since)
                .await?
        }
        None => budget_service.get_revision(session.user_id(), budget_id).await?,
    };

    Ok(Json(reps::ChangesRep { revision }))
}
