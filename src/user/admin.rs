//! Admin pages and endpoints for creating, editing and deleting users.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use axum::{
    Extension, Form,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    attachment::delete_attachments,
    auth::{PASSWORD_INPUT_MIN_LENGTH, hash_new_password},
    endpoints,
    expense::get_file_paths_for_user,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        base, form_error, password_input,
    },
    navigation::NavBar,
    user::{
        EMAIL_MAX_LENGTH, Email, NewUser, USERNAME_MAX_LENGTH, User, UserID, Username,
        create_user, delete_user, get_user_by_id, update_password, update_user_details,
    },
};

/// The state needed for the admin user pages and endpoints.
#[derive(Debug, Clone)]
pub struct AdminState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// Where attachment files are stored, so they can be removed with their owner.
    pub upload_dir: PathBuf,
}

impl FromRef<AppState> for AdminState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            upload_dir: state.upload_dir.clone(),
        }
    }
}

/// The data submitted when an admin creates a user.
#[derive(Debug, Deserialize)]
pub struct NewUserForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub is_admin: Option<String>,
}

/// The data submitted when an admin edits a user.
#[derive(Debug, Deserialize)]
pub struct EditUserForm {
    pub username: String,
    pub email: String,
    pub is_admin: Option<String>,
    /// Left blank to keep the user's password.
    #[serde(default)]
    pub new_password: String,
}

/// Get the user making the request, failing unless they are an admin.
fn require_admin(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    let user = get_user_by_id(user_id, connection)?;

    if user.is_admin {
        Ok(user)
    } else {
        tracing::warn!("User {user_id} tried to access an admin-only route");
        Err(Error::AdminRequired)
    }
}

fn user_fields(username: &str, email: &str, is_admin: bool) -> Markup {
    html! {
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
                autofocus
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

        div class="flex items-center gap-2"
        {
            input id="is_admin" type="checkbox" name="is_admin" checked[is_admin];
            label for="is_admin" class="text-sm text-gray-900 dark:text-white" { "Admin" }
        }
    }
}

fn new_user_form(username: &str, email: &str, is_admin: bool, error_message: &str) -> Markup {
    html! {
        form
            hx-post=(endpoints::POST_USER_ADMIN)
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            (form_error(error_message))
            (user_fields(username, email, is_admin))
            (password_input("password", "Password", PASSWORD_INPUT_MIN_LENGTH, true))

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Create User" }
        }
    }
}

fn edit_user_form(
    user_id: UserID,
    username: &str,
    email: &str,
    is_admin: bool,
    error_message: &str,
) -> Markup {
    let update_endpoint = endpoints::format_endpoint(endpoints::PUT_USER_ADMIN, user_id.as_i64());

    html! {
        form
            hx-put=(update_endpoint)
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            (form_error(error_message))
            (user_fields(username, email, is_admin))
            (password_input("new_password", "New Password (leave blank to keep)", PASSWORD_INPUT_MIN_LENGTH, false))

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Update User" }
        }
    }
}

fn admin_page(title: &str, form: Markup) -> Markup {
    let nav_bar = NavBar::new(endpoints::SETTINGS_VIEW).into_html();

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            div class="w-full max-w-md space-y-4"
            {
                h1 class="text-xl font-bold text-gray-900 dark:text-white" { (title) }

                (form)
            }
        }
    };

    base(title, &[], &content)
}

fn redirect_to_settings() -> Response {
    (
        HxRedirect(endpoints::SETTINGS_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

/// Render the page for creating a user.
pub async fn get_new_user_page(
    State(state): State<AdminState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        require_admin(user_id, &connection)?;
    }

    Ok(admin_page("New User", new_user_form("", "", false, "")).into_response())
}

/// Create a user on behalf of an admin.
pub async fn create_user_endpoint(
    State(state): State<AdminState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<NewUserForm>,
) -> Response {
    let is_admin = form.is_admin.is_some();
    let render_error =
        |message: &str| new_user_form(&form.username, &form.email, is_admin, message).into_response();

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    if let Err(error) = require_admin(user_id, &connection) {
        return error.into_alert_response();
    }

    let username = match Username::new(&form.username) {
        Ok(username) => username,
        Err(error) => return render_error(&error.to_string()),
    };

    let email = match Email::new(&form.email) {
        Ok(email) => email,
        Err(error) => return render_error(&error.to_string()),
    };

    let password_hash = match hash_new_password(&form.password, &form.password) {
        Ok(hash) => hash,
        Err(error) => return render_error(&error.to_string()),
    };

    let new_user = NewUser {
        username,
        email,
        password_hash,
        is_admin,
    };

    match create_user(new_user, &connection) {
        Ok(user) => {
            tracing::info!("Admin {user_id} created user {}", user.username);
            redirect_to_settings()
        }
        Err(error @ (Error::DuplicateUsername | Error::DuplicateEmail)) => {
            render_error(&error.to_string())
        }
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a user: {error}");
            error.into_alert_response()
        }
    }
}

/// Render the page for editing another user.
pub async fn get_edit_user_page(
    State(state): State<AdminState>,
    Extension(user_id): Extension<UserID>,
    Path(target_id): Path<i64>,
) -> Result<Response, Error> {
    let target = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        require_admin(user_id, &connection)?;
        get_user_by_id(UserID::new(target_id), &connection)?
    };

    let form = edit_user_form(
        target.id,
        target.username.as_ref(),
        target.email.as_ref(),
        target.is_admin,
        "",
    );

    Ok(admin_page("Edit User", form).into_response())
}

/// Update another user's details on behalf of an admin.
pub async fn update_user_endpoint(
    State(state): State<AdminState>,
    Extension(user_id): Extension<UserID>,
    Path(target_id): Path<i64>,
    Form(form): Form<EditUserForm>,
) -> Response {
    let target_id = UserID::new(target_id);
    let is_admin = form.is_admin.is_some();
    let render_error = |message: &str| {
        edit_user_form(target_id, &form.username, &form.email, is_admin, message).into_response()
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    if let Err(error) = require_admin(user_id, &connection) {
        return error.into_alert_response();
    }

    let username = match Username::new(&form.username) {
        Ok(username) => username,
        Err(error) => return render_error(&error.to_string()),
    };

    let email = match Email::new(&form.email) {
        Ok(email) => email,
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

    match update_user_details(target_id, &username, &email, is_admin, &connection) {
        Ok(()) => {}
        Err(error @ (Error::DuplicateUsername | Error::DuplicateEmail)) => {
            return render_error(&error.to_string());
        }
        Err(error) => {
            tracing::error!("Could not update user {target_id}: {error}");
            return error.into_alert_response();
        }
    }

    if let Some(password_hash) = password_hash {
        if let Err(error) = update_password(target_id, &password_hash, &connection) {
            tracing::error!("Could not update the password of user {target_id}: {error}");
            return error.into_alert_response();
        }
    }

    tracing::info!("Admin {user_id} updated user {target_id}");

    redirect_to_settings()
}

/// Delete a user, their data and their attachment files.
///
/// Admins cannot delete themselves.
pub async fn delete_user_endpoint(
    State(state): State<AdminState>,
    Extension(user_id): Extension<UserID>,
    Path(target_id): Path<i64>,
) -> Response {
    let target_id = UserID::new(target_id);

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    if let Err(error) = require_admin(user_id, &connection) {
        return error.into_alert_response();
    }

    if target_id == user_id {
        return Error::CannotDeleteSelf.into_alert_response();
    }

    let file_paths = match get_file_paths_for_user(target_id, &connection) {
        Ok(file_paths) => file_paths,
        Err(error) => {
            tracing::error!("Could not get the attachments of user {target_id}: {error}");
            return error.into_alert_response();
        }
    };

    match delete_user(target_id, &connection) {
        Ok(()) => {
            delete_attachments(&state.upload_dir, &file_paths);
            tracing::info!("Admin {user_id} deleted user {target_id}");
            redirect_to_settings()
        }
        Err(error) => {
            tracing::error!("Could not delete user {target_id}: {error}");
            error.into_alert_response()
        }
    }
}
