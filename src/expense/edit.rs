//! The page and endpoint for editing an expense.

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
    database_id::ExpenseId,
    endpoints::{self, format_endpoint},
    expense::{
        get_expense,
        form::{ExpenseForm, ExpenseFormAction, expense_form_view},
        update_expense,
    },
    html::{FORM_CONTAINER_STYLE, base},
    navigation::NavBar,
    tag::get_all_tags,
    timezone::local_today,
    user::UserID,
};

/// The state needed for editing an expense.
#[derive(Debug, Clone)]
pub struct EditExpenseState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub upload_dir: PathBuf,
    pub local_timezone: String,
}

impl FromRef<AppState> for EditExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            upload_dir: state.upload_dir.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Render the expense editing page.
pub async fn get_edit_expense_page(
    Path(expense_id): Path<ExpenseId>,
    State(state): State<EditExpenseState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let (expense, tags) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        (
            get_expense(expense_id, user_id, &connection)?,
            get_all_tags(user_id, &connection)?,
        )
    };

    let update_endpoint = format_endpoint(endpoints::PUT_EXPENSE, expense_id);

    let content = html! {
        (NavBar::new(endpoints::EDIT_EXPENSE_VIEW).into_html())

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="mb-4 text-xl font-bold text-gray-900 dark:text-white" { "Edit Expense" }

            (expense_form_view(
                ExpenseFormAction::Update { endpoint: &update_endpoint },
                &ExpenseForm::from(&expense),
                &tags,
                expense.file_path.as_deref(),
                "",
            ))
        }
    };

    Ok(base("Edit Expense", &[], &content).into_response())
}

/// Handle the multipart expense form for an existing expense.
///
/// A new attachment with an allowed file type replaces the old one, which is
/// deleted from disk.
pub async fn update_expense_endpoint(
    Path(expense_id): Path<ExpenseId>,
    State(state): State<EditExpenseState>,
    Extension(user_id): Extension<UserID>,
    multipart: Multipart,
) -> Response {
    let form = match ExpenseForm::from_multipart(multipart).await {
        Ok(form) => form,
        Err(error) => return error.into_alert_response(),
    };

    let (expense, tags) = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_alert_response();
            }
        };

        let expense = match get_expense(expense_id, user_id, &connection) {
            Ok(expense) => expense,
            Err(Error::NotFound) => return Error::UpdateMissingExpense.into_alert_response(),
            Err(error) => return error.into_alert_response(),
        };

        match get_all_tags(user_id, &connection) {
            Ok(tags) => (expense, tags),
            Err(error) => return error.into_alert_response(),
        }
    };

    let update_endpoint = format_endpoint(endpoints::PUT_EXPENSE, expense_id);

    let fields = match form.validate(local_today(&state.local_timezone)) {
        Ok(fields) => fields,
        Err(error) => {
            return expense_form_view(
                ExpenseFormAction::Update {
                    endpoint: &update_endpoint,
                },
                &form,
                &tags,
                expense.file_path.as_deref(),
                &error.to_string(),
            )
            .into_response();
        }
    };

    let new_file_path = match &form.file {
        Some(file) => match save_attachment(&state.upload_dir, user_id, &file.file_name, &file.data)
            .await
        {
            Ok(file_path) => file_path,
            Err(error) => return error.into_alert_response(),
        },
        None => None,
    };
    let file_path = new_file_path.as_deref().or(expense.file_path.as_deref());

    let result = match state.db_connection.lock() {
        Ok(connection) => update_expense(expense_id, user_id, &fields, file_path, &connection),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            Err(Error::DatabaseLockError)
        }
    };

    if let Err(error) = result {
        tracing::error!("Could not update expense {expense_id}: {error}");

        if let Some(new_file_path) = &new_file_path {
            delete_attachment(&state.upload_dir, new_file_path);
        }

        return error.into_alert_response();
    }

    if new_file_path.is_some() {
        if let Some(old_file_path) = &expense.file_path {
            delete_attachment(&state.upload_dir, old_file_path);
        }
    }

    (
        HxRedirect(format_endpoint(endpoints::CATEGORY_VIEW, expense.category_id)),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

#[cfg(test)]
mod edit_expense_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Path, State},
        http::StatusCode,
    };
    use time::macros::date;

    use crate::{
        Error,
        category::{CategoryName, NewCategory, create_category},
        color::HexColor,
        endpoints::{self, format_endpoint},
        expense::{Expense, NewExpense, create_expense, edit::EditExpenseState, get_expense},
        test_utils::{
            Part, assert_form_error_message, assert_form_input_with_value, assert_hx_endpoint,
            assert_hx_redirect, assert_valid_html, create_test_user, get_test_db_connection,
            get_test_upload_dir, must_get_form, must_make_multipart, parse_html_document,
            parse_html_fragment,
        },
        user::UserID,
    };

    use super::{get_edit_expense_page, update_expense_endpoint};

    const OLD_FILE: &str = "1_20240101_090000_old.png";

    fn get_state() -> (EditExpenseState, UserID, Expense, UserID) {
        let connection = get_test_db_connection();
        let owner = create_test_user("alice", &connection);
        let other = create_test_user("bob", &connection);
        let category = create_category(
            NewCategory {
                name: CategoryName::new_unchecked("Food"),
                description: None,
                color: HexColor::default(),
                user_id: owner.id,
            },
            &connection,
        )
        .unwrap();
        let expense = create_expense(
            NewExpense {
                description: "Pizza".to_owned(),
                amount: 15.0,
                date: date!(2024 - 01 - 01),
                paid_by: Some("Alice".to_owned()),
                tags: None,
                file_path: Some(OLD_FILE.to_owned()),
                category_id: category.id,
                user_id: owner.id,
            },
            &connection,
        )
        .unwrap();
        let upload_dir = get_test_upload_dir();
        std::fs::write(upload_dir.join(OLD_FILE), b"old").unwrap();

        let state = EditExpenseState {
            db_connection: Arc::new(Mutex::new(connection)),
            upload_dir,
            local_timezone: "Etc/UTC".to_owned(),
        };

        (state, owner.id, expense, other.id)
    }

    fn text_parts<'a>(description: &'a str, amount: &'a str) -> Vec<Part<'a>> {
        vec![
            Part::Text {
                name: "description",
                value: description,
            },
            Part::Text {
                name: "amount",
                value: amount,
            },
            Part::Text {
                name: "date",
                value: "2024-02-02",
            },
        ]
    }

    #[tokio::test]
    async fn edit_page_has_current_values() {
        let (state, owner, expense, _) = get_state();

        let response = get_edit_expense_page(Path(expense.id), State(state), Extension(owner))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let form = must_get_form(&html);
        assert_hx_endpoint(
            &form,
            &format_endpoint(endpoints::PUT_EXPENSE, expense.id),
            "hx-put",
        );
        assert_form_input_with_value(&form, "description", "text", "Pizza");
        assert_form_input_with_value(&form, "amount", "number", "15");
    }

    #[tokio::test]
    async fn edit_page_of_other_user_is_not_found() {
        let (state, _, expense, other) = get_state();

        let result = get_edit_expense_page(Path(expense.id), State(state), Extension(other)).await;

        assert_eq!(result.unwrap_err(), Error::NotFound);
    }

    #[tokio::test]
    async fn update_keeps_attachment_without_new_file() {
        let (state, owner, expense, _) = get_state();
        let multipart = must_make_multipart(
            &format_endpoint(endpoints::PUT_EXPENSE, expense.id),
            &text_parts("Pasta", "18.5"),
        )
        .await;

        let response =
            update_expense_endpoint(Path(expense.id), State(state.clone()), Extension(owner), multipart)
                .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(
            &response,
            &format_endpoint(endpoints::CATEGORY_VIEW, expense.category_id),
        );

        let updated = get_expense(expense.id, owner, &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(updated.description, "Pasta");
        assert_eq!(updated.amount, 18.5);
        assert_eq!(updated.date, date!(2024 - 02 - 02));
        assert_eq!(updated.paid_by, None);
        assert_eq!(updated.file_path.as_deref(), Some(OLD_FILE));
        assert!(state.upload_dir.join(OLD_FILE).exists());
    }

    #[tokio::test]
    async fn new_attachment_replaces_old_one() {
        let (state, owner, expense, _) = get_state();
        let mut parts = text_parts("Pizza", "15");
        parts.push(Part::File {
            name: "file",
            file_name: "new.jpg",
            content_type: "image/jpeg",
            data: b"new",
        });
        let multipart =
            must_make_multipart(&format_endpoint(endpoints::PUT_EXPENSE, expense.id), &parts).await;

        let response =
            update_expense_endpoint(Path(expense.id), State(state.clone()), Extension(owner), multipart)
                .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let updated = get_expense(expense.id, owner, &state.db_connection.lock().unwrap()).unwrap();
        let new_file = updated.file_path.expect("attachment should be kept");
        assert!(new_file.ends_with("_new.jpg"));
        assert!(state.upload_dir.join(&new_file).exists());
        assert!(!state.upload_dir.join(OLD_FILE).exists());
    }

    #[tokio::test]
    async fn missing_description_renders_form_error() {
        let (state, owner, expense, _) = get_state();
        let multipart = must_make_multipart(
            &format_endpoint(endpoints::PUT_EXPENSE, expense.id),
            &text_parts("", "15"),
        )
        .await;

        let response =
            update_expense_endpoint(Path(expense.id), State(state), Extension(owner), multipart)
                .await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        assert_form_error_message(&must_get_form(&html), "Description and amount are required");
    }

    #[tokio::test]
    async fn other_users_expense_is_not_updated() {
        let (state, owner, expense, other) = get_state();
        let multipart = must_make_multipart(
            &format_endpoint(endpoints::PUT_EXPENSE, expense.id),
            &text_parts("Stolen", "1"),
        )
        .await;

        let response =
            update_expense_endpoint(Path(expense.id), State(state.clone()), Extension(other), multipart)
                .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let unchanged = get_expense(expense.id, owner, &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(unchanged.description, "Pizza");
    }
}
