//! Turning two-factor authentication on and off for the logged in user.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, PreEscaped, html};
use qrcode::{QrCode, render::svg};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::{generate_secret, provisioning_uri, verify_totp_now},
    endpoints,
    html::{
        BUTTON_DELETE_STYLE, BUTTON_PRIMARY_STYLE, CARD_STYLE, FORM_CONTAINER_STYLE,
        FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base, form_error,
    },
    navigation::NavBar,
    user::{User, UserID, get_user_by_id, update_two_factor},
};

/// The state needed for the two-factor pages and endpoints.
#[derive(Debug, Clone)]
pub struct TwoFactorState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TwoFactorState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The code from the user's authenticator app.
#[derive(Debug, Deserialize)]
pub struct EnableTwoFactorForm {
    pub token: String,
}

fn enable_form(error_message: &str) -> Markup {
    html! {
        form
            hx-post=(endpoints::ENABLE_TWO_FACTOR)
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            class="space-y-4"
        {
            (form_error(error_message))

            div
            {
                label for="token" class=(FORM_LABEL_STYLE) { "Code from your authenticator app" }

                input
                    id="token"
                    type="text"
                    name="token"
                    inputmode="numeric"
                    autocomplete="one-time-code"
                    pattern="[0-9]{6}"
                    maxlength="6"
                    required
                    autofocus
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Enable Two-Factor Authentication" }
        }
    }
}

fn disable_form() -> Markup {
    html! {
        form
            hx-post=(endpoints::DISABLE_TWO_FACTOR)
            hx-confirm="Turn off two-factor authentication?"
            hx-swap="none"
            hx-target-error="#alert-container"
        {
            button type="submit" class=(BUTTON_DELETE_STYLE) { "Disable Two-Factor Authentication" }
        }
    }
}

/// The provisioning URI drawn as an inline SVG QR code, or `None` if the URI
/// does not fit in a QR code.
fn qr_code_svg(uri: &str) -> Option<String> {
    let code = QrCode::new(uri.as_bytes())
        .inspect_err(|error| tracing::error!("Could not create QR code for {uri}: {error}"))
        .ok()?;

    let image = code
        .render::<svg::Color>()
        .min_dimensions(200, 200)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();

    // The XML declaration is not allowed inside an HTML document.
    image.find("<svg").map(|start| image[start..].to_owned())
}

fn two_factor_view(user: &User, secret: &str) -> Markup {
    let nav_bar = NavBar::new(endpoints::SETTINGS_VIEW).into_html();
    let uri = provisioning_uri(secret, user.email.as_ref());

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            div class="w-full max-w-md space-y-4 text-gray-900 dark:text-white"
            {
                h1 class="text-xl font-bold" { "Two-Factor Authentication" }

                @if user.totp_enabled {
                    p { "Two-factor authentication is on. A code is needed each time you log in." }

                    (disable_form())
                } @else {
                    p
                    {
                        "Scan the QR code with your authenticator app, or add the
                        secret key or setup link by hand, then enter the code it shows."
                    }

                    div class=(CARD_STYLE)
                    {
                        @if let Some(qr_code) = qr_code_svg(&uri) {
                            div id="totp-qr" class="mb-4 flex justify-center"
                            {
                                (PreEscaped(qr_code))
                            }
                        }

                        p class="text-sm font-medium" { "Secret key" }
                        code id="totp-secret" class="block break-all font-mono text-lg" { (secret) }

                        p class="mt-4 text-sm font-medium" { "Setup link" }
                        a id="totp-uri" href=(uri) class="block break-all text-sm text-blue-600 dark:text-blue-500"
                        {
                            (uri)
                        }
                    }

                    (enable_form(""))
                }
            }
        }
    };

    base("Two-Factor Authentication", &[], &content)
}

/// Show the two-factor setup page, creating a secret for users without one.
pub async fn get_two_factor_page(
    State(state): State<TwoFactorState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let (user, secret) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let user = get_user_by_id(user_id, &connection)?;
        let secret = match &user.totp_secret {
            Some(secret) => secret.clone(),
            None => {
                let secret = generate_secret();
                update_two_factor(user_id, Some(&secret), false, &connection)?;
                tracing::debug!("Started two-factor setup for user {user_id}");
                secret
            }
        };

        (user, secret)
    };

    Ok(two_factor_view(&user, &secret).into_response())
}

/// Turn on two-factor authentication if the code matches the user's secret.
pub async fn enable_two_factor_endpoint(
    State(state): State<TwoFactorState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<EnableTwoFactorForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let user = match get_user_by_id(user_id, &connection) {
        Ok(user) => user,
        Err(error) => {
            tracing::error!("Could not get user {user_id}: {error}");
            return error.into_alert_response();
        }
    };

    let Some(secret) = user.totp_secret else {
        return enable_form("Two-factor setup has not been started, reload the page and try again.")
            .into_response();
    };

    if !verify_totp_now(&secret, form.token.trim()) {
        return enable_form("Invalid code. Please try again.").into_response();
    }

    if let Err(error) = update_two_factor(user_id, Some(&secret), true, &connection) {
        tracing::error!("Could not enable two-factor authentication for user {user_id}: {error}");
        return error.into_alert_response();
    }

    tracing::info!("User {user_id} enabled two-factor authentication");

    (
        HxRedirect(endpoints::SETTINGS_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

/// Turn off two-factor authentication and forget the secret.
pub async fn disable_two_factor_endpoint(
    State(state): State<TwoFactorState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    if let Err(error) = update_two_factor(user_id, None, false, &connection) {
        tracing::error!("Could not disable two-factor authentication for user {user_id}: {error}");
        return error.into_alert_response();
    }

    tracing::info!("User {user_id} disabled two-factor authentication");

    (
        HxRedirect(endpoints::SETTINGS_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}
