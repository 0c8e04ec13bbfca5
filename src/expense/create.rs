//! The page and endpoint for adding an expense to a category.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use axum::{
    Extension,
    extract::{FromRef, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::html;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    attachment::{delete_attachment, save_attachment},
    category::get_category,
    database_id::CategoryId,
    endpoints::{self, format_endpoint},
    expense::{
        NewExpense, create_expense,
        form::{ExpenseForm, ExpenseFormAction, expense_form_view},
    },
    html::{FORM_CONTAINER_STYLE, LINK_STYLE, base},
    navigation::NavBar,
    tag::get_all_tags,
    timezone::local_today,
    user::UserID,
};

/// The state needed for adding an expense.
#[derive(Debug, Clone)]
pub struct CreateExpenseState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub upload_dir: PathBuf,
    pub local_timezone: String,
}

impl FromRef<AppState> for CreateExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            upload_dir: state.upload_dir.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Render the page for adding an expense to a category.
pub async fn get_new_expense_page(
    Path(category_id): Path<CategoryId>,
    State(state): State<CreateExpenseState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let (category, tags) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        (
            get_category(category_id, user_id, &connection)?,
            get_all_tags(user_id, &connection)?,
        )
    };

    let create_endpoint = format_endpoint(endpoints::POST_EXPENSE, category_id);
    let values = ExpenseForm {
        date: local_today(&state.local_timezone).to_string(),
        ..Default::default()
    };

    let content = html! {
        (NavBar::new(endpoints::NEW_EXPENSE_VIEW).into_html())

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="mb-1 text-xl font-bold text-gray-900 dark:text-white" { "New Expense" }
            p class="mb-4 text-sm"
            {
                "in "
                a href=(format_endpoint(endpoints::CATEGORY_VIEW, category_id)) class=(LINK_STYLE)
                {
                    (category.name)
                }
            }

            (expense_form_view(
                ExpenseFormAction::Create { endpoint: &create_endpoint },
                &values,
                &tags,
                None,
                "",
            ))
        }
    };

    Ok(base("New Expense", &[], &content).into_response())
}

/// Handle the multipart expense form, saving the attachment if it has an
/// allowed file type.
pub async fn create_expense_endpoint(
    Path(category_id): Path<CategoryId>,
    State(state): State<CreateExpenseState>,
    Extension(user_id): Extension<UserID>,
    multipart: Multipart,
) -> Response {
    let form = match ExpenseForm::from_multipart(multipart).await {
        Ok(form) => form,
        Err(error) => return error.into_alert_response(),
    };

    let tags = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_alert_response();
            }
        };

        if let Err(error) = get_category(category_id, user_id, &connection) {
            return error.into_alert_response();
        }

        match get_all_tags(user_id, &connection) {
            Ok(tags) => tags,
            Err(error) => return error.into_alert_response(),
        }
    };

    let create_endpoint = format_endpoint(endpoints::POST_EXPENSE, category_id);

    let fields = match form.validate(local_today(&state.local_timezone)) {
        Ok(fields) => fields,
        Err(error) => {
            return expense_form_view(
                ExpenseFormAction::Create {
                    endpoint: &create_endpoint,
                },
                &form,
                &tags,
                None,
                &error.to_string(),
            )
            .into_response();
        }
    };

    let file_path = match &form.file {
        Some(file) => match save_attachment(&state.upload_dir, user_id, &file.file_name, &file.data)
            .await
        {
            Ok(file_path) => file_path,
            Err(error) => return error.into_alert_response(),
        },
        None => None,
    };

    let new_expense = NewExpense {
        description: fields.description,
        amount: fields.amount,
        date: fields.date,
        paid_by: fields.paid_by,
        tags: fields.tags,
        file_path: file_path.clone(),
        category_id,
        user_id,
    };

    let result = match state.db_connection.lock() {
        Ok(connection) => create_expense(new_expense, &connection),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            Err(Error::DatabaseLockError)
        }
    };

    match result {
        Ok(expense) => {
            tracing::info!("User {user_id} added expense {} to category {category_id}", expense.id);

            (
                HxRedirect(format_endpoint(endpoints::CATEGORY_VIEW, category_id)),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating an expense: {error}");

            if let Some(file_path) = file_path {
                delete_attachment(&state.upload_dir, &file_path);
            }

            error.into_alert_response()
        }
    }
}
