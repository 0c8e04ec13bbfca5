//! The registration page for creating a new account.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    auth::{
        middleware::is_logged_in,
        password::{PASSWORD_INPUT_MIN_LENGTH, hash_new_password},
    },
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE, base,
        form_error, loading_spinner, log_in_register, password_input,
    },
    user::{
        EMAIL_MAX_LENGTH, Email, NewUser, USERNAME_MAX_LENGTH, Username, count_users, create_user,
    },
};

fn registration_form(username: &str, email: &str, error_message: &str) -> Markup {
    html! {
        form
            hx-post=(endpoints::USERS)
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            hx-indicator="#indicator"
            hx-disabled-elt="#submit-button"
            class="space-y-4 md:space-y-6"
        {
            div
            {
                label for="username" class=(FORM_LABEL_STYLE) { "Username" }

                input
                    type="text"
                    name="username"
                    id="username"
                    value=(username)
                    maxlength=(USERNAME_MAX_LENGTH)
                    autocomplete="username"
                    class=(FORM_TEXT_INPUT_STYLE)
                    required
                    autofocus;
            }

            div
            {
                label for="email" class=(FORM_LABEL_STYLE) { "Email" }

                input
                    type="email"
                    name="email"
                    id="email"
                    value=(email)
                    maxlength=(EMAIL_MAX_LENGTH)
                    autocomplete="email"
                    class=(FORM_TEXT_INPUT_STYLE)
                    required;
            }

            (password_input("password", "Password", PASSWORD_INPUT_MIN_LENGTH, true))
            (password_input("confirm_password", "Confirm Password", PASSWORD_INPUT_MIN_LENGTH, true))

            (form_error(error_message))

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Create Account"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Already have an account? "
                a href=(endpoints::LOG_IN_VIEW) tabindex="0" class=(LINK_STYLE)
                {
                  "Log in here"
                }
            }
        }
    }
}

/// Display the registration page, or redirect to the dashboard if the user
/// is already logged in.
pub async fn get_register_page(
    State(state): State<RegistrationState>,
    jar: PrivateCookieJar,
) -> Response {
    if is_logged_in(&jar, &state.db_connection) {
        return Redirect::to(endpoints::DASHBOARD_VIEW).into_response();
    }

    let registration_form = registration_form("", "", "");
    let content = log_in_register("Create an account", &registration_form);
    base("Register", &[], &content).into_response()
}

/// The state needed for creating a new user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<RegistrationState> for Key {
    fn from_ref(state: &RegistrationState) -> Self {
        state.cookie_key.clone()
    }
}

/// The data entered in the registration form.
#[derive(Serialize, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Create a new user and send them to the log-in page.
///
/// The first user to register is made an admin.
pub async fn register_user(
    State(state): State<RegistrationState>,
    Form(user_data): Form<RegisterForm>,
) -> Response {
    let render_error = |message: &str| {
        registration_form(&user_data.username, &user_data.email, message).into_response()
    };

    let username = match Username::new(&user_data.username) {
        Ok(username) => username,
        Err(error) => return render_error(&error.to_string()),
    };

    let email = match Email::new(&user_data.email) {
        Ok(email) => email,
        Err(error) => return render_error(&error.to_string()),
    };

    let password_hash = match hash_new_password(&user_data.password, &user_data.confirm_password)
    {
        Ok(hash) => hash,
        Err(error) => return render_error(&error.to_string()),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let is_admin = match count_users(&connection) {
        Ok(count) => count == 0,
        Err(error) => return error.into_alert_response(),
    };

    let new_user = NewUser {
        username,
        email,
        password_hash,
        is_admin,
    };

    match create_user(new_user, &connection) {
        Ok(user) => {
            tracing::info!("Registered user {} (admin: {})", user.username, user.is_admin);

            (
                HxRedirect(endpoints::LOG_IN_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error @ (Error::DuplicateUsername | Error::DuplicateEmail)) => {
            render_error(&error.to_string())
        }
        Err(error) => {
            tracing::error!("An unhandled error occurred while inserting a new user: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod register_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, http::StatusCode};
    use axum_extra::extract::PrivateCookieJar;

    use crate::{
        auth::register_user::{RegistrationState, get_register_page},
        endpoints,
        test_utils::{
            assert_form_input, assert_hx_endpoint, assert_valid_html, get_test_cookie_key,
            get_test_db_connection, must_get_form, parse_html_document,
        },
    };

    #[tokio::test]
    async fn render_register_page() {
        let state = RegistrationState {
            cookie_key: get_test_cookie_key(),
            db_connection: Arc::new(Mutex::new(get_test_db_connection())),
        };
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = get_register_page(State(state), jar).await;

        assert_eq!(response.status(), StatusCode::OK);
        let document = parse_html_document(response).await;
        assert_valid_html(&document);
        let form = must_get_form(&document);
        assert_hx_endpoint(&form, endpoints::USERS, "hx-post");
        assert_form_input(&form, "username", "text");
        assert_form_input(&form, "email", "email");
        assert_form_input(&form, "password", "password");
        assert_form_input(&form, "confirm_password", "password");
    }
}
