//! Category editing page and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::html;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    category::{
        CategoryFormData,
        create::{FormAction, category_form},
        get_category, update_category,
    },
    database_id::CategoryId,
    endpoints::{self, format_endpoint},
    html::{FORM_CONTAINER_STYLE, base},
    navigation::NavBar,
    user::UserID,
};

/// The state needed for the edit category page and for updating a category.
#[derive(Debug, Clone)]
pub struct EditCategoryState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditCategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the category editing page.
pub async fn get_edit_category_page(
    Path(category_id): Path<CategoryId>,
    State(state): State<EditCategoryState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let category = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_category(category_id, user_id, &connection)?
    };

    let update_endpoint = format_endpoint(endpoints::PUT_CATEGORY, category_id);
    let form_data = CategoryFormData {
        name: category.name.to_string(),
        description: category.description.unwrap_or_default(),
        color: category.color.to_string(),
    };

    let content = html! {
        (NavBar::new(endpoints::EDIT_CATEGORY_VIEW).into_html())

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="mb-4 text-xl font-bold text-gray-900 dark:text-white" { "Edit Category" }
            (category_form(FormAction::Update { endpoint: &update_endpoint }, &form_data, ""))
        }
    };

    Ok(base("Edit Category", &[], &content).into_response())
}

/// Handle category update form submission.
pub async fn update_category_endpoint(
    Path(category_id): Path<CategoryId>,
    State(state): State<EditCategoryState>,
    Extension(user_id): Extension<UserID>,
    Form(form_data): Form<CategoryFormData>,
) -> Response {
    let update_endpoint = format_endpoint(endpoints::PUT_CATEGORY, category_id);

    let fields = match form_data.validate() {
        Ok(fields) => fields,
        Err(error) => {
            return category_form(
                FormAction::Update {
                    endpoint: &update_endpoint,
                },
                &form_data,
                &error.to_string(),
            )
            .into_response();
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match update_category(
        category_id,
        user_id,
        &fields.name,
        fields.description.as_deref(),
        &fields.color,
        &connection,
    ) {
        Ok(()) => (
            HxRedirect(format_endpoint(endpoints::CATEGORY_VIEW, category_id)),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(Error::UpdateMissingCategory) => Error::UpdateMissingCategory.into_alert_response(),
        Err(error) => {
            tracing::error!(
                "An unexpected error occurred while updating category {category_id}: {error}"
            );
            error.into_alert_response()
        }
    }
}
