//! This file defines the routes for displaying the log-in page and handling log-in requests.
//! The auth module handles the lower level authentication and cookie auth logic.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Error,
    auth::{
        cookie::{invalidate_auth_cookie, set_auth_cookie, set_pending_two_factor_cookie},
        middleware::is_logged_in,
        redirect::parse_redirect_url,
        two_factor::two_factor_form,
    },
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE, base,
        form_error, loading_spinner, log_in_register, password_input,
    },
    user::{User, UserID, get_user_by_username},
};

pub const INVALID_CREDENTIALS_ERROR_MSG: &str = "Invalid username or password.";
pub const SESSION_EXPIRED_MSG: &str = "Your session expired, please log in again.";
const INTERNAL_ERROR_MSG: &str = "An internal error occurred. Please try again later.";

/// How long the auth cookie should last if the user selects "remember me" at log-in.
pub(crate) const REMEMBER_ME_COOKIE_DURATION: Duration = Duration::days(7);

fn log_in_form(username: &str, error_message: &str, redirect_url: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::LOG_IN_API)
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            hx-indicator="#indicator"
            hx-disabled-elt="#username, #password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            @if let Some(redirect_url) = redirect_url {
                input type="hidden" name="redirect_url" value=(redirect_url);
            }

            div
            {
                label for="username" class=(FORM_LABEL_STYLE) { "Username" }

                input
                    type="text"
                    name="username"
                    id="username"
                    value=(username)
                    autocomplete="username"
                    class=(FORM_TEXT_INPUT_STYLE)
                    required
                    autofocus;
            }

            (password_input("password", "Password", 0, true))

            (form_error(error_message))

            div class="flex items-center gap-x-3"
            {
                input
                    type="checkbox"
                    name="remember_me"
                    id="remember_me"
                    tabindex="0"
                    class="rounded-xs";

                label
                    for="remember_me"
                    class="block text-sm font-medium text-gray-900 dark:text-white"
                {
                    "Keep me logged in for one week"
                }
            }

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Log in"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Don't have an account? "
                a href=(endpoints::REGISTER_VIEW) tabindex="0" class=(LINK_STYLE)
                {
                  "Register here"
                }
            }
        }
    }
}

/// The query parameters accepted by the log-in page.
#[derive(Default, Deserialize)]
pub struct LogInQuery {
    /// Where to send the user after they log in.
    pub redirect_url: Option<String>,
    /// Set when a pending two-factor log-in ran out of time.
    pub expired: Option<bool>,
}

/// Display the log-in page, or redirect to the dashboard if the user is
/// already logged in.
pub async fn get_log_in_page(
    State(state): State<LoginState>,
    jar: PrivateCookieJar,
    Query(query): Query<LogInQuery>,
) -> Response {
    if is_logged_in(&jar, &state.db_connection) {
        return Redirect::to(endpoints::DASHBOARD_VIEW).into_response();
    }

    let redirect_url = parse_redirect_url(query.redirect_url.as_deref(), "log-in query");
    let log_in_form = log_in_form("", "", redirect_url.as_deref());
    let content = html! {
        @if query.expired == Some(true) {
            div class="flex justify-center pt-8"
            {
                p class="text-sm text-amber-700 dark:text-amber-400" { (SESSION_EXPIRED_MSG) }
            }
        }

        (log_in_register("Log in to your account", &log_in_form))
    };

    (invalidate_auth_cookie(jar), base("Log In", &[], &content)).into_response()
}

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LoginState> for Key {
    fn from_ref(state: &LoginState) -> Self {
        state.cookie_key.clone()
    }
}

/// Set the auth cookie for `user_id` and tell HTMX to go to `redirect_url`.
pub(crate) fn complete_log_in(
    jar: PrivateCookieJar,
    user_id: UserID,
    cookie_duration: Duration,
    redirect_url: Option<&str>,
) -> Response {
    let redirect_url = redirect_url.unwrap_or(endpoints::DASHBOARD_VIEW);

    set_auth_cookie(jar.clone(), user_id, cookie_duration)
        .map(|updated_jar| {
            (
                StatusCode::SEE_OTHER,
                HxRedirect(redirect_url.to_owned()),
                updated_jar,
            )
        })
        .map_err(|err| {
            tracing::error!("Error setting auth cookie: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                HxRedirect(endpoints::INTERNAL_ERROR_VIEW.to_owned()),
                invalidate_auth_cookie(jar),
            )
        })
        .into_response()
}

/// Handler for log-in requests via the POST method.
///
/// On a successful log-in request, the auth cookie set and the client is redirected to the dashboard page.
/// Users with two-factor authentication are instead shown the two-factor form.
/// Otherwise, the form is returned with an error message explaining the problem.
pub async fn post_log_in(
    State(state): State<LoginState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<LogInData>,
) -> Response {
    let redirect_url = parse_redirect_url(user_data.redirect_url.as_deref(), "log-in form");
    let redirect_url = redirect_url.as_deref();
    let username = user_data.username.trim();

    let user: User = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_alert_response();
            }
        };

        match get_user_by_username(username, &connection) {
            Ok(user) => user,
            Err(Error::NotFound) => {
                tracing::info!("Log-in attempt for unknown user {username}");
                return log_in_form(username, INVALID_CREDENTIALS_ERROR_MSG, redirect_url)
                    .into_response();
            }
            Err(error) => {
                tracing::error!("Unhandled error while verifying credentials: {error}");
                return log_in_form(username, INTERNAL_ERROR_MSG, redirect_url).into_response();
            }
        }
    };

    match user.password_hash.verify(&user_data.password) {
        Ok(true) => {}
        Ok(false) => {
            tracing::info!("Wrong password for user {username}");
            return log_in_form(username, INVALID_CREDENTIALS_ERROR_MSG, redirect_url)
                .into_response();
        }
        Err(error) => {
            tracing::error!("Unhandled error while verifying credentials: {error}");
            return log_in_form(username, INTERNAL_ERROR_MSG, redirect_url).into_response();
        }
    }

    let remember_me = user_data.remember_me.is_some();

    if user.totp_enabled && user.totp_secret.is_some() {
        return match set_pending_two_factor_cookie(jar, user.id) {
            Ok(jar) => (jar, two_factor_form("", remember_me, redirect_url)).into_response(),
            Err(error) => error.into_alert_response(),
        };
    }

    let cookie_duration = if remember_me {
        REMEMBER_ME_COOKIE_DURATION
    } else {
        state.cookie_duration
    };

    complete_log_in(jar, user.id, cookie_duration, redirect_url)
}

/// The raw data entered by the user in the log-in form.
///
/// The password is stored as a plain string. There is no need for validation here since
/// it will be compared against the password in the database, which has been verified.
#[derive(Clone, Serialize, Deserialize)]
pub struct LogInData {
    /// The username entered during log-in.
    pub username: String,

    /// Password entered during log-in.
    pub password: String,

    /// Whether to extend the initial auth cookie duration.
    ///
    /// This value comes from a checkbox, so it either has a string value or is not set
    /// (see the [MDN docs](https://developer.mozilla.org/en-US/docs/Web/HTML/Element/input/checkbox#value_2)).
    /// The `Some` variant should be interpreted as `true` irregardless of the
    /// string value, and the `None` variant should be interpreted as `false`.
    pub remember_me: Option<String>,

    /// Optional URL to redirect to after logging in.
    /// Only accepted from the log-in form submission.
    pub redirect_url: Option<String>,
}

#[cfg(test)]
mod log_in_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Form,
        extract::{Query, State},
        http::StatusCode,
    };
    use axum_extra::extract::PrivateCookieJar;
    use scraper::Selector;
    use time::{Duration, OffsetDateTime};

    use crate::{
        auth::{
            DEFAULT_COOKIE_DURATION,
            cookie::{COOKIE_PENDING_TWO_FACTOR, COOKIE_TOKEN, set_auth_cookie},
            log_in::{
                INVALID_CREDENTIALS_ERROR_MSG, LogInData, LogInQuery, LoginState,
                get_log_in_page, post_log_in,
            },
        },
        endpoints,
        test_utils::{
            TEST_PASSWORD, assert_form_error_message, assert_form_input, assert_hx_endpoint,
            assert_hx_redirect, assert_valid_html, create_test_user, get_header,
            get_test_cookie_key, get_test_db_connection, must_get_form, parse_html_document,
            parse_html_fragment,
        },
        user::{get_user_by_username, update_two_factor},
    };

    fn get_test_state() -> LoginState {
        let connection = get_test_db_connection();
        create_test_user("alice", &connection);

        LoginState {
            cookie_key: get_test_cookie_key(),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    fn log_in_data(username: &str, password: &str) -> LogInData {
        LogInData {
            username: username.to_owned(),
            password: password.to_owned(),
            remember_me: None,
            redirect_url: None,
        }
    }

    #[tokio::test]
    async fn log_in_page_displays_form() {
        let state = get_test_state();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = get_log_in_page(State(state), jar, Query(LogInQuery::default())).await;

        assert_eq!(response.status(), StatusCode::OK);
        let document = parse_html_document(response).await;
        assert_valid_html(&document);
        let form = must_get_form(&document);
        assert_hx_endpoint(&form, endpoints::LOG_IN_API, "hx-post");
        assert_form_input(&form, "username", "text");
        assert_form_input(&form, "password", "password");

        let link = form
            .select(&Selector::parse("a[href]").unwrap())
            .next()
            .expect("No register link");
        assert_eq!(link.value().attr("href"), Some(endpoints::REGISTER_VIEW));
    }

    #[tokio::test]
    async fn log_in_page_preserves_redirect_url() {
        let state = get_test_state();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());
        let redirect_url = "/categories/1";

        let response = get_log_in_page(
            State(state),
            jar,
            Query(LogInQuery {
                redirect_url: Some(redirect_url.to_owned()),
                expired: None,
            }),
        )
        .await;

        let document = parse_html_document(response).await;
        let hidden = document
            .select(&Selector::parse("input[name=redirect_url]").unwrap())
            .next()
            .expect("No redirect input");
        assert_eq!(hidden.value().attr("value"), Some(redirect_url));
    }

    #[tokio::test]
    async fn log_in_page_drops_external_redirect_url() {
        let state = get_test_state();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = get_log_in_page(
            State(state),
            jar,
            Query(LogInQuery {
                redirect_url: Some("https://evil.example.com".to_owned()),
                expired: None,
            }),
        )
        .await;

        let document = parse_html_document(response).await;
        assert!(
            document
                .select(&Selector::parse("input[name=redirect_url]").unwrap())
                .next()
                .is_none()
        );
    }

    #[tokio::test]
    async fn log_in_page_redirects_logged_in_user() {
        let state = get_test_state();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());
        let user_id = {
            let connection = state.db_connection.lock().unwrap();
            get_user_by_username("alice", &connection)
                .unwrap()
                .id
        };
        let jar = set_auth_cookie(jar, user_id, DEFAULT_COOKIE_DURATION).unwrap();

        let response = get_log_in_page(State(state), jar, Query(LogInQuery::default())).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(get_header(&response, "location"), endpoints::DASHBOARD_VIEW);
    }

    #[tokio::test]
    async fn log_in_succeeds_with_valid_credentials() {
        let state = get_test_state();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = post_log_in(State(state), jar, Form(log_in_data("alice", TEST_PASSWORD))).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::DASHBOARD_VIEW);
        assert!(
            get_header(&response, "set-cookie").starts_with(&format!("{COOKIE_TOKEN}=")),
            "want auth cookie to be set"
        );
    }

    #[tokio::test]
    async fn log_in_redirects_to_redirect_url() {
        let state = get_test_state();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());
        let mut data = log_in_data("alice", TEST_PASSWORD);
        data.redirect_url = Some("/categories/2".to_owned());

        let response = post_log_in(State(state), jar, Form(data)).await;

        assert_hx_redirect(&response, "/categories/2");
    }

    #[tokio::test]
    async fn remember_me_extends_cookie() {
        let state = get_test_state();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());
        let mut data = log_in_data("alice", TEST_PASSWORD);
        data.remember_me = Some("on".to_owned());

        let response = post_log_in(State(state.clone()), jar, Form(data)).await;

        let cookie = axum_extra::extract::cookie::Cookie::parse(get_header(&response, "set-cookie"))
            .unwrap();
        let expires = cookie.expires_datetime().unwrap();
        assert!(expires > OffsetDateTime::now_utc() + Duration::days(6));
    }

    #[tokio::test]
    async fn log_in_fails_with_wrong_password() {
        let state = get_test_state();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response =
            post_log_in(State(state), jar, Form(log_in_data("alice", "wrongpassword"))).await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        assert_valid_html(&html);
        assert_form_error_message(&must_get_form(&html), INVALID_CREDENTIALS_ERROR_MSG);
    }

    #[tokio::test]
    async fn log_in_fails_with_unknown_user() {
        let state = get_test_state();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = post_log_in(State(state), jar, Form(log_in_data("bob", TEST_PASSWORD))).await;

        let html = parse_html_fragment(response).await;
        assert_form_error_message(&must_get_form(&html), INVALID_CREDENTIALS_ERROR_MSG);
    }

    #[tokio::test]
    async fn log_in_with_two_factor_shows_code_form() {
        let state = get_test_state();
        {
            let connection = state.db_connection.lock().unwrap();
            let user = get_user_by_username("alice", &connection).unwrap();
            update_two_factor(user.id, Some("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ"), true, &connection)
                .unwrap();
        }
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = post_log_in(State(state), jar, Form(log_in_data("alice", TEST_PASSWORD))).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            get_header(&response, "set-cookie")
                .starts_with(&format!("{COOKIE_PENDING_TWO_FACTOR}=")),
            "want pending two-factor cookie to be set"
        );
        let html = parse_html_fragment(response).await;
        let form = must_get_form(&html);
        assert_hx_endpoint(&form, endpoints::LOG_IN_TWO_FACTOR_API, "hx-post");
        assert_form_input(&form, "token", "text");
    }
}
