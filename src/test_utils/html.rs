use axum::{body::Body, response::Response};
use scraper::{Html, Selector};

async fn body_text(response: Response<Body>) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Could not get response body");

    String::from_utf8_lossy(&body).into_owned()
}

/// Parse a full page, e.g. from a `GET` page handler.
pub(crate) async fn parse_html_document(response: Response<Body>) -> Html {
    Html::parse_document(&body_text(response).await)
}

/// Parse a fragment, e.g. a form re-rendered by an HTMX endpoint.
pub(crate) async fn parse_html_fragment(response: Response<Body>) -> Html {
    Html::parse_fragment(&body_text(response).await)
}

#[track_caller]
pub(crate) fn assert_valid_html(html: &Html) {
    assert!(
        html.errors.is_empty(),
        "Got HTML parsing errors: {:?}",
        html.errors
    );
}

#[track_caller]
fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|error| panic!("Invalid selector {css:?}: {error}"))
}

/// The number of elements matching the CSS selector `css`.
#[track_caller]
pub(crate) fn count_elements(html: &Html, css: &str) -> usize {
    html.select(&selector(css)).count()
}

/// The trimmed text of the first element matching `css`.
#[track_caller]
pub(crate) fn must_get_text(html: &Html, css: &str) -> String {
    html.select(&selector(css))
        .next()
        .unwrap_or_else(|| panic!("No element matching {css:?}"))
        .text()
        .collect::<String>()
        .trim()
        .to_owned()
}
