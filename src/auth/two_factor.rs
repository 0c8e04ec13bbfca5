//! The second step of logging in for users with two-factor authentication.

use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use serde::Deserialize;

use crate::{
    Error,
    auth::{
        cookie::{get_pending_two_factor_user, remove_pending_two_factor_cookie},
        log_in::{LoginState, REMEMBER_ME_COOKIE_DURATION, complete_log_in},
        redirect::parse_redirect_url,
        totp::{TOTP_DIGITS, verify_totp_now},
    },
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, form_error},
    user::get_user_by_id,
};

pub const INVALID_TWO_FACTOR_CODE_MSG: &str = "Invalid two-factor code. Please try again.";

/// The form asking for the code from the user's authenticator app.
///
/// `remember_me` and `redirect_url` are carried over from the log-in form.
pub(crate) fn two_factor_form(
    error_message: &str,
    remember_me: bool,
    redirect_url: Option<&str>,
) -> Markup {
    html! {
        form
            hx-post=(endpoints::LOG_IN_TWO_FACTOR_API)
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            class="space-y-4 md:space-y-6"
        {
            @if remember_me {
                input type="hidden" name="remember_me" value="on";
            }

            @if let Some(redirect_url) = redirect_url {
                input type="hidden" name="redirect_url" value=(redirect_url);
            }

            div
            {
                label for="token" class=(FORM_LABEL_STYLE) { "Two-factor code" }

                input
                    type="text"
                    name="token"
                    id="token"
                    inputmode="numeric"
                    pattern="[0-9]*"
                    maxlength=(TOTP_DIGITS)
                    autocomplete="one-time-code"
                    placeholder="123456"
                    class=(FORM_TEXT_INPUT_STYLE)
                    required
                    autofocus;
            }

            (form_error(error_message))

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                "Verify"
            }
        }
    }
}

/// The data submitted with the two-factor form.
#[derive(Deserialize)]
pub struct TwoFactorLogInData {
    /// The code from the user's authenticator app.
    pub token: String,
    /// Carried over from the log-in form.
    pub remember_me: Option<String>,
    /// Carried over from the log-in form.
    pub redirect_url: Option<String>,
}

fn session_expired_redirect(jar: PrivateCookieJar) -> Response {
    let url = format!("{}?expired=true", endpoints::LOG_IN_VIEW);

    (
        StatusCode::SEE_OTHER,
        HxRedirect(url),
        remove_pending_two_factor_cookie(jar),
    )
        .into_response()
}

/// Check the two-factor code of a user who has entered their password and
/// log them in.
pub async fn post_log_in_two_factor(
    State(state): State<LoginState>,
    jar: PrivateCookieJar,
    Form(form): Form<TwoFactorLogInData>,
) -> Response {
    let redirect_url = parse_redirect_url(form.redirect_url.as_deref(), "two-factor form");
    let redirect_url = redirect_url.as_deref();
    let remember_me = form.remember_me.is_some();

    let user_id = match get_pending_two_factor_user(&jar) {
        Ok(user_id) => user_id,
        Err(_) => {
            tracing::info!("Two-factor code submitted without a pending log-in.");
            return session_expired_redirect(jar);
        }
    };

    let user = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_alert_response();
            }
        };

        match get_user_by_id(user_id, &connection) {
            Ok(user) => user,
            Err(Error::NotFound) => return session_expired_redirect(jar),
            Err(error) => return error.into_alert_response(),
        }
    };

    let is_valid = user
        .totp_secret
        .as_deref()
        .is_some_and(|secret| verify_totp_now(secret, &form.token));

    if !is_valid {
        tracing::info!("Invalid two-factor code for user {user_id}");
        return two_factor_form(INVALID_TWO_FACTOR_CODE_MSG, remember_me, redirect_url)
            .into_response();
    }

    let cookie_duration = if remember_me {
        REMEMBER_ME_COOKIE_DURATION
    } else {
        state.cookie_duration
    };

    complete_log_in(
        remove_pending_two_factor_cookie(jar),
        user.id,
        cookie_duration,
        redirect_url,
    )
}

#[cfg(test)]
mod two_factor_log_in_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Form, extract::State, http::StatusCode};
    use axum_extra::extract::{PrivateCookieJar, cookie::Cookie};
    use time::OffsetDateTime;

    use crate::{
        auth::{
            DEFAULT_COOKIE_DURATION,
            cookie::{COOKIE_PENDING_TWO_FACTOR, COOKIE_TOKEN, set_pending_two_factor_cookie},
            log_in::LoginState,
            totp::totp_at,
            two_factor::{INVALID_TWO_FACTOR_CODE_MSG, TwoFactorLogInData, post_log_in_two_factor},
        },
        endpoints,
        test_utils::{
            assert_form_error_message, assert_hx_redirect, create_test_user,
            get_test_cookie_key, get_test_db_connection, must_get_form, parse_html_fragment,
        },
        user::{UserID, update_two_factor},
    };

    const SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    fn get_test_state() -> (LoginState, UserID) {
        let connection = get_test_db_connection();
        let user = create_test_user("alice", &connection);
        update_two_factor(user.id, Some(SECRET), true, &connection).unwrap();

        let state = LoginState {
            cookie_key: get_test_cookie_key(),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            db_connection: Arc::new(Mutex::new(connection)),
        };

        (state, user.id)
    }

    fn form(token: &str) -> TwoFactorLogInData {
        TwoFactorLogInData {
            token: token.to_owned(),
            remember_me: None,
            redirect_url: None,
        }
    }

    #[tokio::test]
    async fn valid_code_logs_in() {
        let (state, user_id) = get_test_state();
        let jar = set_pending_two_factor_cookie(
            PrivateCookieJar::new(state.cookie_key.clone()),
            user_id,
        )
        .unwrap();
        let code = totp_at(SECRET, OffsetDateTime::now_utc().unix_timestamp()).unwrap();

        let response = post_log_in_two_factor(State(state), jar, Form(form(&code))).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::DASHBOARD_VIEW);

        let cookie_names: Vec<String> = response
            .headers()
            .get_all("set-cookie")
            .iter()
            .filter_map(|header| Cookie::parse(header.to_str().ok()?.to_owned()).ok())
            .map(|cookie| cookie.name().to_owned())
            .collect();
        assert!(cookie_names.contains(&COOKIE_TOKEN.to_owned()));
        assert!(cookie_names.contains(&COOKIE_PENDING_TWO_FACTOR.to_owned()));
    }

    #[tokio::test]
    async fn invalid_code_shows_error() {
        let (state, user_id) = get_test_state();
        let jar = set_pending_two_factor_cookie(
            PrivateCookieJar::new(state.cookie_key.clone()),
            user_id,
        )
        .unwrap();

        let response = post_log_in_two_factor(State(state), jar, Form(form("abcdef"))).await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        assert_form_error_message(&must_get_form(&html), INVALID_TWO_FACTOR_CODE_MSG);
    }

    #[tokio::test]
    async fn missing_pending_log_in_redirects_to_log_in() {
        let (state, _) = get_test_state();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = post_log_in_two_factor(State(state), jar, Form(form("123456"))).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, &format!("{}?expired=true", endpoints::LOG_IN_VIEW));
    }
}
