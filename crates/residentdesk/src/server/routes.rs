use axum::{
    extract::State,
    response::{Html, Redirect},
};

use super::error::AppError;
use super::form::FormFields;
use super::AppState;
use crate::desk::Desk;
use crate::validation::{FeedbackForm, TicketForm};

/// Run a store operation off the async runtime.
async fn with_desk<T, F>(desk: &Desk, f: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&Desk) -> crate::Result<T> + Send + 'static,
{
    let desk = desk.clone();
    Ok(tokio::task::spawn_blocking(move || f(&desk)).await??)
}

pub async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    Ok(Html(state.templates.index()?))
}

pub async fn feedback_page(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    with_desk(&state.desk, Desk::initialize).await?;
    Ok(Html(state.templates.feedback()?))
}

/// Accepted and rejected submissions redirect identically, including
/// bodies that are not forms at all.
pub async fn submit_feedback(
    State(state): State<AppState>,
    FormFields(fields): FormFields,
) -> Result<Redirect, AppError> {
    let form = FeedbackForm::from_pairs(&fields);
    with_desk(&state.desk, move |desk| desk.submit_feedback(&form)).await?;
    Ok(Redirect::to("/"))
}

pub async fn ticket_page(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let blocks = with_desk(&state.desk, Desk::housing_blocks).await?;
    Ok(Html(state.templates.ticket(&blocks)?))
}

pub async fn submit_ticket(
    State(state): State<AppState>,
    FormFields(fields): FormFields,
) -> Result<Redirect, AppError> {
    let form = TicketForm::from_pairs(&fields);
    with_desk(&state.desk, move |desk| desk.submit_ticket(&form)).await?;
    Ok(Redirect::to("/"))
}
