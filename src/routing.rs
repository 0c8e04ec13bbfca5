//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    attachment::{download_attachment, get_attachment},
    auth::{
        auth_guard, auth_guard_hx, get_log_in_page, get_log_out, get_register_page, post_log_in,
        post_log_in_two_factor, register_user,
    },
    category::{
        create_category_endpoint, delete_category_endpoint, get_category_page,
        get_edit_category_page, get_new_category_page, update_category_endpoint,
    },
    csv_export::export_expenses,
    csv_import::{get_import_page, import_expenses},
    dashboard::{get_dashboard_page, get_index_page, get_metrics},
    endpoints,
    expense::{
        create_expense_endpoint, delete_expense_endpoint, get_edit_expense_page,
        get_new_expense_page, update_expense_endpoint,
    },
    internal_server_error::get_internal_server_error_page,
    not_found::get_404_not_found,
    security_headers::security_headers,
    settings::{
        disable_two_factor_endpoint, enable_two_factor_endpoint, get_settings_page,
        get_two_factor_page,
    },
    tag::{
        create_tag_endpoint, delete_tag_endpoint, get_edit_tag_page, get_new_tag_page,
        update_tag_endpoint,
    },
    user::{
        create_user_endpoint, delete_user_endpoint, get_edit_user_page, get_new_user_page,
        get_profile_page, update_profile_endpoint, update_user_endpoint,
    },
};

/// The largest request body the server accepts, in bytes.
pub const MAX_REQUEST_BODY_SIZE: usize = 16 * 1024 * 1024;

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_IN_TWO_FACTOR_API, post(post_log_in_two_factor))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::REGISTER_VIEW, get(get_register_page))
        .route(endpoints::USERS, post(register_user))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let protected_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::NEW_CATEGORY_VIEW, get(get_new_category_page))
        .route(endpoints::CATEGORY_VIEW, get(get_category_page))
        .route(endpoints::EDIT_CATEGORY_VIEW, get(get_edit_category_page))
        .route(endpoints::NEW_EXPENSE_VIEW, get(get_new_expense_page))
        .route(endpoints::EDIT_EXPENSE_VIEW, get(get_edit_expense_page))
        .route(endpoints::EXPENSE_ATTACHMENT, get(get_attachment))
        .route(
            endpoints::EXPENSE_ATTACHMENT_DOWNLOAD,
            get(download_attachment),
        )
        .route(endpoints::NEW_TAG_VIEW, get(get_new_tag_page))
        .route(endpoints::EDIT_TAG_VIEW, get(get_edit_tag_page))
        .route(endpoints::SETTINGS_VIEW, get(get_settings_page))
        .route(endpoints::PROFILE_VIEW, get(get_profile_page))
        .route(endpoints::TWO_FACTOR_VIEW, get(get_two_factor_page))
        .route(endpoints::NEW_USER_VIEW, get(get_new_user_page))
        .route(endpoints::EDIT_USER_VIEW, get(get_edit_user_page))
        .route(endpoints::IMPORT_VIEW, get(get_import_page))
        .route(endpoints::EXPORT, get(export_expenses))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // These routes need to use the HX-REDIRECT header for auth redirects to work properly for HTMX requests.
    let protected_routes = protected_routes.merge(
        Router::new()
            .route(endpoints::METRICS_API, get(get_metrics))
            .route(endpoints::POST_CATEGORY, post(create_category_endpoint))
            .route(endpoints::PUT_CATEGORY, put(update_category_endpoint))
            .route(endpoints::DELETE_CATEGORY, delete(delete_category_endpoint))
            .route(endpoints::POST_EXPENSE, post(create_expense_endpoint))
            .route(endpoints::PUT_EXPENSE, put(update_expense_endpoint))
            .route(endpoints::DELETE_EXPENSE, delete(delete_expense_endpoint))
            .route(endpoints::POST_TAG, post(create_tag_endpoint))
            .route(endpoints::PUT_TAG, put(update_tag_endpoint))
            .route(endpoints::DELETE_TAG, delete(delete_tag_endpoint))
            .route(endpoints::PUT_PROFILE, put(update_profile_endpoint))
            .route(endpoints::POST_USER_ADMIN, post(create_user_endpoint))
            .route(endpoints::PUT_USER_ADMIN, put(update_user_endpoint))
            .route(endpoints::DELETE_USER_ADMIN, delete(delete_user_endpoint))
            .route(
                endpoints::ENABLE_TWO_FACTOR,
                post(enable_two_factor_endpoint),
            )
            .route(
                endpoints::DISABLE_TWO_FACTOR,
                post(disable_two_factor_endpoint),
            )
            .route(endpoints::IMPORT, post(import_expenses))
            .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx)),
    );

    protected_routes
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_SIZE))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

#[cfg(test)]
mod routing_tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;

    use crate::{
        AppState, endpoints,
        security_headers::CONTENT_SECURITY_POLICY_VALUE,
        test_utils::{get_test_db_connection, get_test_upload_dir},
    };

    use super::build_router;

    fn get_test_server() -> TestServer {
        let state = AppState::new(
            get_test_db_connection(),
            "foobar",
            "Etc/UTC",
            get_test_upload_dir(),
        )
        .expect("Could not create app state.");

        TestServer::try_new(build_router(state)).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn root_redirects_to_log_in_when_logged_out() {
        let server = get_test_server();

        let response = server.get(endpoints::ROOT).await;

        response.assert_status(StatusCode::SEE_OTHER);
        let location = response.header("location");
        assert!(
            location.to_str().unwrap().starts_with(endpoints::LOG_IN_VIEW),
            "want redirect to log in page, got {location:?}"
        );
    }

    #[tokio::test]
    async fn log_in_page_is_public() {
        let server = get_test_server();

        let response = server.get(endpoints::LOG_IN_VIEW).await;

        response.assert_status_ok();
        assert_eq!(
            response.header("content-security-policy"),
            CONTENT_SECURITY_POLICY_VALUE
        );
    }

    #[tokio::test]
    async fn unknown_route_returns_not_found() {
        let server = get_test_server();

        let response = server.get("/does/not/exist").await;

        response.assert_status_not_found();
        assert_eq!(response.header("x-frame-options"), "DENY");
    }

    #[tokio::test]
    async fn api_routes_use_hx_redirect_when_logged_out() {
        let server = get_test_server();

        let response = server.get(endpoints::METRICS_API).await;

        let location = response.header("hx-redirect");
        assert!(
            location.to_str().unwrap().starts_with(endpoints::LOG_IN_VIEW),
            "want HTMX redirect to log in page, got {location:?}"
        );
    }
}
