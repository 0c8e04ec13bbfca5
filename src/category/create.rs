//! Category creation page and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    category::{
        NewCategory, create_category,
        domain::{CATEGORY_NAME_MAX_LENGTH, CategoryFormData},
    },
    color::DEFAULT_COLOR,
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base,
        color_input, form_error,
    },
    navigation::NavBar,
    user::UserID,
};

/// The state needed for creating a category.
#[derive(Debug, Clone)]
pub struct CreateCategoryState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateCategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// How a category form is submitted.
pub(super) enum FormAction<'a> {
    Create,
    Update { endpoint: &'a str },
}

/// The form shared by the new and edit category pages.
pub(super) fn category_form(
    action: FormAction,
    form_data: &CategoryFormData,
    error_message: &str,
) -> Markup {
    let color = if form_data.color.is_empty() {
        DEFAULT_COLOR
    } else {
        &form_data.color
    };

    let (hx_post, hx_put, submit_text) = match action {
        FormAction::Create => (Some(endpoints::POST_CATEGORY), None, "Create Category"),
        FormAction::Update { endpoint } => (None, Some(endpoint), "Update Category"),
    };

    html! {
        form
            hx-post=[hx_post]
            hx-put=[hx_put]
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            class="w-full max-w-md space-y-4 md:space-y-6"
        {
            (form_error(error_message))

            div
            {
                label for="name" class=(FORM_LABEL_STYLE) { "Category Name" }

                input
                    id="name"
                    type="text"
                    name="name"
                    placeholder="e.g. Groceries"
                    value=(form_data.name)
                    maxlength=(CATEGORY_NAME_MAX_LENGTH)
                    required
                    autofocus
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="description" class=(FORM_LABEL_STYLE) { "Description" }

                textarea
                    id="description"
                    name="description"
                    rows="3"
                    placeholder="Optional"
                    class=(FORM_TEXT_INPUT_STYLE)
                {
                    (form_data.description)
                }
            }

            (color_input(color))

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { (submit_text) }
        }
    }
}

/// Render the category creation page.
pub async fn get_new_category_page() -> Response {
    let nav_bar = NavBar::new(endpoints::NEW_CATEGORY_VIEW).into_html();
    let form = category_form(
        FormAction::Create,
        &CategoryFormData {
            name: String::new(),
            description: String::new(),
            color: DEFAULT_COLOR.to_owned(),
        },
        "",
    );

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="mb-4 text-xl font-bold text-gray-900 dark:text-white" { "New Category" }
            (form)
        }
    };

    base("New Category", &[], &content).into_response()
}

/// Handle category creation form submission.
pub async fn create_category_endpoint(
    State(state): State<CreateCategoryState>,
    Extension(user_id): Extension<UserID>,
    Form(form_data): Form<CategoryFormData>,
) -> Response {
    let fields = match form_data.validate() {
        Ok(fields) => fields,
        Err(error) => {
            return category_form(FormAction::Create, &form_data, &error.to_string())
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

    let new_category = NewCategory {
        name: fields.name,
        description: fields.description,
        color: fields.color,
        user_id,
    };

    match create_category(new_category, &connection) {
        Ok(category) => {
            tracing::info!("User {user_id} created category {}", category.id);

            (
                HxRedirect(endpoints::DASHBOARD_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a category: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod new_category_page_tests {
    use axum::http::StatusCode;

    use crate::{
        category::get_new_category_page,
        endpoints,
        test_utils::{
            assert_content_type, assert_form_input, assert_form_submit_button_with_text,
            assert_hx_endpoint, assert_valid_html, must_get_form, parse_html_document,
        },
    };

    #[tokio::test]
    async fn render_page() {
        let response = get_new_category_page().await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_content_type(&response, "text/html; charset=utf-8");

        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let form = must_get_form(&html);
        assert_hx_endpoint(&form, endpoints::POST_CATEGORY, "hx-post");
        assert_form_input(&form, "name", "text");
        assert_form_submit_button_with_text(&form, "Create Category");
    }
}
