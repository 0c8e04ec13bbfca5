//! Tag creation page and endpoint.

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
    color::{DEFAULT_COLOR, HexColor},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base,
        color_input, form_error,
    },
    navigation::NavBar,
    tag::{
        TagName, create_tag,
        domain::{TAG_NAME_MAX_LENGTH, TagFormData},
    },
    user::UserID,
};

/// The state needed for creating a tag.
#[derive(Debug, Clone)]
pub struct CreateTagEndpointState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateTagEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the tag creation page.
pub async fn get_new_tag_page() -> Response {
    new_tag_view().into_response()
}

/// Handle tag creation form submission.
pub async fn create_tag_endpoint(
    State(state): State<CreateTagEndpointState>,
    Extension(user_id): Extension<UserID>,
    Form(new_tag): Form<TagFormData>,
) -> Response {
    let render_error = |error: &Error| {
        new_tag_form_view(&new_tag.name, &new_tag.color, &format!("Error: {error}")).into_response()
    };

    let name = match TagName::new(&new_tag.name) {
        Ok(name) => name,
        Err(error) => return render_error(&error),
    };

    let color = match HexColor::new(&new_tag.color) {
        Ok(color) => color,
        Err(error) => return render_error(&error),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match create_tag(name, color, user_id, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::SETTINGS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error @ Error::DuplicateTagName) => render_error(&error),
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a tag: {error}");

            error.into_alert_response()
        }
    }
}

fn new_tag_view() -> Markup {
    let nav_bar = NavBar::new(endpoints::NEW_TAG_VIEW).into_html();
    let form = new_tag_form_view("", DEFAULT_COLOR, "");

    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE) { (form) }
    };

    base("Create Tag", &[], &content)
}

fn new_tag_form_view(name: &str, color: &str, error_message: &str) -> Markup {
    let create_tag_endpoint = endpoints::POST_TAG;
    let color = if color.is_empty() { DEFAULT_COLOR } else { color };

    html! {
        form
            hx-post=(create_tag_endpoint)
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            class="w-full max-w-md space-y-4 md:space-y-6"
        {
            div
            {
                label
                    for="name"
                    class=(FORM_LABEL_STYLE)
                {
                    "Tag Name"
                }

                input
                    id="name"
                    type="text"
                    name="name"
                    placeholder="Tag Name"
                    value=(name)
                    maxlength=(TAG_NAME_MAX_LENGTH)
                    required
                    autofocus
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            (color_input(color))

            (form_error(error_message))

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Create Tag" }
        }
    }
}

#[cfg(test)]
mod new_tag_page_tests {
    use axum::http::StatusCode;

    use crate::{
        endpoints,
        tag::get_new_tag_page,
        test_utils::{
            assert_form_input, assert_form_submit_button, assert_hx_endpoint, assert_valid_html,
            must_get_form, parse_html_document,
        },
    };

    #[tokio::test]
    async fn render_page() {
        let response = get_new_tag_page().await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get("content-type")
                .expect("content-type header missing"),
            "text/html; charset=utf-8"
        );

        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let form = must_get_form(&html);
        assert_hx_endpoint(&form, endpoints::POST_TAG, "hx-post");
        assert_form_input(&form, "name", "text");
        assert_form_submit_button(&form);
    }
}

#[cfg(test)]
mod create_tag_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, Form, extract::State, http::StatusCode};

    use crate::{
        color::HexColor,
        endpoints,
        tag::{
            TagName, create::CreateTagEndpointState, create_tag, create_tag_endpoint,
            domain::TagFormData, get_all_tags,
        },
        test_utils::{
            assert_form_error_message, assert_hx_redirect, create_test_user,
            get_test_db_connection, must_get_form, parse_html_fragment,
        },
        user::UserID,
    };

    fn get_tag_state() -> (CreateTagEndpointState, UserID) {
        let connection = get_test_db_connection();
        let user = create_test_user("alice", &connection);

        let state = CreateTagEndpointState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        (state, user.id)
    }

    fn form(name: &str, color: &str) -> TagFormData {
        TagFormData {
            name: name.to_owned(),
            color: color.to_owned(),
        }
    }

    #[tokio::test]
    async fn can_create_tag() {
        let (state, user_id) = get_tag_state();

        let response = create_tag_endpoint(
            State(state.clone()),
            Extension(user_id),
            Form(form("Foo", "#22c55e")),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::SETTINGS_VIEW);

        let tags = get_all_tags(user_id, &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, TagName::new_unchecked("Foo"));
        assert_eq!(tags[0].color, HexColor::new_unchecked("#22c55e"));
    }

    #[tokio::test]
    async fn missing_color_uses_default() {
        let (state, user_id) = get_tag_state();

        create_tag_endpoint(State(state.clone()), Extension(user_id), Form(form("Foo", ""))).await;

        let tags = get_all_tags(user_id, &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(tags[0].color, HexColor::default());
    }

    #[tokio::test]
    async fn create_tag_fails_on_empty_name() {
        let (state, user_id) = get_tag_state();

        let response =
            create_tag_endpoint(State(state), Extension(user_id), Form(form("", "#22c55e"))).await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        assert_form_error_message(&must_get_form(&html), "Error: Tag name cannot be empty");
    }

    #[tokio::test]
    async fn create_tag_fails_on_duplicate_name() {
        let (state, user_id) = get_tag_state();
        create_tag(
            TagName::new_unchecked("Foo"),
            HexColor::default(),
            user_id,
            &state.db_connection.lock().unwrap(),
        )
        .unwrap();

        let response =
            create_tag_endpoint(State(state), Extension(user_id), Form(form("Foo", ""))).await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        assert_form_error_message(
            &must_get_form(&html),
            "Error: A tag with this name already exists",
        );
    }
}
