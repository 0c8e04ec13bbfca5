//! The page where users change their own username, email, currency and password.

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
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::{PASSWORD_INPUT_MIN_LENGTH, hash_new_password},
    currency::Currency,
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        base, form_error, password_input,
    },
    navigation::NavBar,
    user::{
        EMAIL_MAX_LENGTH, Email, USERNAME_MAX_LENGTH, UserID, Username, get_user_by_id,
        update_password, update_profile,
    },
};

/// The state needed for the profile page and endpoint.
#[derive(Debug, Clone)]
pub struct ProfileState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ProfileState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The data submitted with the profile form.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub username: String,
    pub email: String,
    pub currency: String,
    /// Left blank to keep the current password.
    #[serde(default)]
    pub new_password: String,
}

fn profile_form(username: &str, email: &str, currency: Currency, error_message: &str) -> Markup {
    html! {
        form
            hx-put=(endpoints::PUT_PROFILE)
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            (form_error(error_message))

            div
            {
                label for="username" class=(FORM_LABEL_STYLE) { "Username" }

                input
                    id="username"
                    type="text"
                    name="username"
                    value=(username)
                    maxlength=(USERNAME_MAX_LENGTH)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="email" class=(FORM_LABEL_STYLE) { "Email" }

                input
                    id="email"
                    type="email"
                    name="email"
                    value=(email)
                    maxlength=(EMAIL_MAX_LENGTH)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="currency" class=(FORM_LABEL_STYLE) { "Currency" }

                select id="currency" name="currency" class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for option in Currency::ALL {
                        option value=(option.code()) selected[option == currency]
                        {
                            (option.label())
                        }
                    }
                }
            }

            (password_input("new_password", "New Password (leave blank to keep)", PASSWORD_INPUT_MIN_LENGTH, false))

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Save Profile" }
        }
    }
}

/// Render the profile page for the logged in user.
pub async fn get_profile_page(
    State(state): State<ProfileState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let user = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_user_by_id(user_id, &connection)?
    };

    let nav_bar = NavBar::new(endpoints::SETTINGS_VIEW).into_html();
    let form = profile_form(user.username.as_ref(), user.email.as_ref(), user.currency, "");

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            div class="w-full max-w-md space-y-4"
            {
                h1 class="text-xl font-bold text-gray-900 dark:text-white" { "Edit Profile" }

                (form)
            }
        }
    };

    Ok(base("Profile", &[], &content).into_response())
}

/// Save the profile form and go back to the settings page.
pub async fn update_profile_endpoint(
    State(state): State<ProfileState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<ProfileForm>,
) -> Response {
    let currency = form.currency.parse().unwrap_or_default();
    let render_error =
        |message: &str| profile_form(&form.username, &form.email, currency, message).into_response();

    let username = match Username::new(&form.username) {
        Ok(username) => username,
        Err(error) => return render_error(&error.to_string()),
    };

    let email = match Email::new(&form.email) {
        Ok(email) => email,
        Err(error) => return render_error(&error.to_string()),
    };

    let currency = match form.currency.parse::<Currency>() {
        Ok(currency) => currency,
        Err(error) => return render_error(&error.to_string()),
    };

    let password_hash = if form.new_password.is_empty() {
        None
    } else {
        match hash_new_password(&form.new_password, &form.new_password) {
            Ok(hash) => Some(hash),
            Err(error) => return render_error(&error.to_string()),
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match update_profile(user_id, &username, &email, currency, &connection) {
        Ok(()) => {}
        Err(error @ (Error::DuplicateUsername | Error::DuplicateEmail)) => {
            return render_error(&error.to_string());
        }
        Err(error) => {
            tracing::error!("Could not update the profile of user {user_id}: {error}");
            return error.into_alert_response();
        }
    }

    if let Some(password_hash) = password_hash {
        if let Err(error) = update_password(user_id, &password_hash, &connection) {
            tracing::error!("Could not update the password of user {user_id}: {error}");
            return error.into_alert_response();
        }
    }

    tracing::info!("User {user_id} updated their profile");

    (
        HxRedirect(endpoints::SETTINGS_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}
