//! Tag editing page and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    color::HexColor,
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base,
        color_input, form_error,
    },
    navigation::NavBar,
    tag::{
        TagId, TagName,
        domain::{TAG_NAME_MAX_LENGTH, TagFormData},
        get_tag, update_tag,
    },
    user::UserID,
};

/// The state needed for the edit tag page and for updating a tag.
#[derive(Debug, Clone)]
pub struct EditTagState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditTagState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the tag editing page.
///
/// Tags that do not exist or belong to another user get the 404 page.
pub async fn get_edit_tag_page(
    Path(tag_id): Path<TagId>,
    State(state): State<EditTagState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let tag = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_tag(tag_id, user_id, &connection)?
    };

    let update_endpoint = endpoints::format_endpoint(endpoints::PUT_TAG, tag_id);

    Ok(edit_tag_view(
        &update_endpoint,
        tag.name.as_ref(),
        tag.color.as_ref(),
    )
    .into_response())
}

/// Handle tag update form submission.
pub async fn update_tag_endpoint(
    Path(tag_id): Path<TagId>,
    State(state): State<EditTagState>,
    Extension(user_id): Extension<UserID>,
    Form(form_data): Form<TagFormData>,
) -> Response {
    let update_endpoint = endpoints::format_endpoint(endpoints::PUT_TAG, tag_id);
    let render_error = |error: &Error| {
        edit_tag_form_view(
            &update_endpoint,
            &form_data.name,
            &form_data.color,
            &format!("Error: {error}"),
        )
        .into_response()
    };

    let name = match TagName::new(&form_data.name) {
        Ok(name) => name,
        Err(error) => return render_error(&error),
    };

    let color = match HexColor::new(&form_data.color) {
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

    match update_tag(tag_id, user_id, name, color, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::SETTINGS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error @ Error::DuplicateTagName) => render_error(&error),
        Err(Error::UpdateMissingTag) => Error::UpdateMissingTag.into_alert_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while updating tag {tag_id}: {error}");
            error.into_alert_response()
        }
    }
}

fn edit_tag_view(update_endpoint: &str, tag_name: &str, tag_color: &str) -> Markup {
    let nav_bar = NavBar::new(endpoints::SETTINGS_VIEW).into_html();
    let form = edit_tag_form_view(update_endpoint, tag_name, tag_color, "");

    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE) { (form) }
    };

    base("Edit Tag", &[], &content)
}

fn edit_tag_form_view(
    update_tag_endpoint: &str,
    tag_name: &str,
    tag_color: &str,
    error_message: &str,
) -> Markup {
    html! {
        form
            hx-put=(update_tag_endpoint)
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
                    value=(tag_name)
                    maxlength=(TAG_NAME_MAX_LENGTH)
                    required
                    autofocus
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            (color_input(tag_color))

            (form_error(error_message))

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Update Tag" }
        }
    }
}
