//! Dashboard HTTP handlers and view rendering.
//!
//! This module contains:
//! - The dashboard page with the category cards, charts and chart filters
//! - The JSON metrics endpoint the chart filters read from

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    category::{Category, get_category},
    color::DEFAULT_COLOR,
    currency::Currency,
    dashboard::{
        aggregation::{
            count_expenses, get_available_years, get_category_totals, get_monthly_totals,
            get_monthly_totals_for_user, get_yearly_totals,
        },
        charts::{
            CATEGORY_CHART_ID, DashboardChart, MONTHLY_CHART_ID, YEARLY_CHART_ID, category_chart,
            charts_script, charts_view, filter_script, monthly_chart, yearly_chart,
        },
    },
    database_id::CategoryId,
    endpoints::{self, format_endpoint},
    html::{
        BUTTON_SECONDARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, HeadElement,
        PAGE_CONTAINER_STYLE, base, link,
    },
    navigation::NavBar,
    timezone::local_today,
    user::{UserID, get_user_by_id},
};

/// The chart title used when no single category is selected.
const ALL_CATEGORIES_NAME: &str = "All Categories";

const ECHARTS_URL: &str = "https://cdn.jsdelivr.net/npm/echarts@6.0.0/dist/echarts.min.js";

/// The state needed for the dashboard page and the metrics endpoint.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for reading expenses.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The chart filters shared by the dashboard page and the metrics endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ChartFilter {
    /// The year to chart, defaults to the current local year.
    pub year: Option<i32>,
    /// Either "all" or a category ID, defaults to "all".
    pub category: Option<String>,
}

/// The chart data returned by the metrics endpoint.
#[derive(Debug, Serialize)]
pub struct Metrics {
    category_name: String,
    monthly_data: [f64; 12],
    color: String,
    pie_data: Vec<f64>,
    pie_labels: Vec<String>,
    pie_colors: Vec<String>,
}

/// The monthly totals of the selected category, or of all categories.
struct MonthlySelection {
    name: String,
    color: String,
    totals: [f64; 12],
}

/// Holds all the data needed to render the dashboard.
struct DashboardData {
    currency: Currency,
    year: i32,
    years: Vec<i32>,
    selected_category: Option<CategoryId>,
    expense_count: i64,
    category_totals: Vec<(Category, f64)>,
    yearly_totals: Vec<(Category, f64)>,
    monthly: MonthlySelection,
}

/// Redirect the root path to the dashboard.
pub async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}

/// Display a page with an overview of the user's spending.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
    Query(filter): Query<ChartFilter>,
) -> Result<Response, Error> {
    let current_year = local_today(&state.local_timezone).year();

    let data = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        build_dashboard_data(&filter, user_id, current_year, &connection)?
    };

    if data.category_totals.is_empty() {
        return Ok(dashboard_no_data_view().into_response());
    }

    Ok(dashboard_view(&data).into_response())
}

/// Return the monthly and yearly chart data for the selected year and category as JSON.
pub async fn get_metrics(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
    Query(filter): Query<ChartFilter>,
) -> Result<Response, Error> {
    let year = filter
        .year
        .unwrap_or_else(|| local_today(&state.local_timezone).year());
    let category_id = parse_category_filter(filter.category.as_deref())?;

    let (monthly, yearly_totals) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        (
            get_monthly_selection(category_id, user_id, year, &connection)?,
            get_yearly_totals(user_id, year, &connection)?,
        )
    };

    let metrics = Metrics {
        category_name: monthly.name,
        monthly_data: monthly.totals,
        color: monthly.color,
        pie_data: yearly_totals.iter().map(|(_, total)| *total).collect(),
        pie_labels: yearly_totals
            .iter()
            .map(|(category, _)| category.name.to_string())
            .collect(),
        pie_colors: yearly_totals
            .iter()
            .map(|(category, _)| category.color.to_string())
            .collect(),
    };

    Ok(Json(metrics).into_response())
}

/// Parse the category filter, where a missing value or "all" selects every category.
///
/// Anything else that is not an ID is treated as a category that does not exist.
fn parse_category_filter(category: Option<&str>) -> Result<Option<CategoryId>, Error> {
    match category.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(id) => id.parse().map(Some).map_err(|_| Error::NotFound),
    }
}

fn get_monthly_selection(
    category_id: Option<CategoryId>,
    user_id: UserID,
    year: i32,
    connection: &Connection,
) -> Result<MonthlySelection, Error> {
    match category_id {
        Some(category_id) => {
            let category = get_category(category_id, user_id, connection)?;
            let totals = get_monthly_totals(category_id, user_id, year, connection)?;

            Ok(MonthlySelection {
                name: category.name.to_string(),
                color: category.color.to_string(),
                totals,
            })
        }
        None => Ok(MonthlySelection {
            name: ALL_CATEGORIES_NAME.to_owned(),
            color: DEFAULT_COLOR.to_owned(),
            totals: get_monthly_totals_for_user(user_id, year, connection)?,
        }),
    }
}

fn build_dashboard_data(
    filter: &ChartFilter,
    user_id: UserID,
    current_year: i32,
    connection: &Connection,
) -> Result<DashboardData, Error> {
    let year = filter.year.unwrap_or(current_year);
    let selected_category = parse_category_filter(filter.category.as_deref())?;

    let mut years = get_available_years(user_id, connection)?;
    if years.is_empty() {
        years.push(current_year);
    }
    if !years.contains(&year) {
        years.push(year);
        years.sort_unstable_by(|a, b| b.cmp(a));
    }

    Ok(DashboardData {
        currency: get_user_by_id(user_id, connection)?.currency,
        year,
        years,
        selected_category,
        expense_count: count_expenses(user_id, connection)?,
        category_totals: get_category_totals(user_id, connection)?,
        yearly_totals: get_yearly_totals(user_id, year, connection)?,
        monthly: get_monthly_selection(selected_category, user_id, year, connection)?,
    })
}

fn build_dashboard_charts(data: &DashboardData) -> [DashboardChart; 3] {
    [
        DashboardChart {
            id: MONTHLY_CHART_ID,
            options: monthly_chart(
                &data.monthly.name,
                &data.monthly.color,
                &data.monthly.totals,
                data.year,
                data.currency,
            )
            .to_string(),
        },
        DashboardChart {
            id: YEARLY_CHART_ID,
            options: yearly_chart(&data.yearly_totals, data.year, data.currency).to_string(),
        },
        DashboardChart {
            id: CATEGORY_CHART_ID,
            options: category_chart(&data.category_totals, data.currency).to_string(),
        },
    ]
}

/// Renders the dashboard page when the user has no categories yet.
fn dashboard_no_data_view() -> Markup {
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW).into_html();
    let new_category_link = link(endpoints::NEW_CATEGORY_VIEW, "creating a category");
    let import_link = link(endpoints::IMPORT_VIEW, "importing a CSV file");

    let content = html!(
        (nav_bar)

        div class="flex flex-col items-center px-6 py-8 mx-auto text-gray-900 dark:text-white"
        {
            h2 class="text-xl font-bold"
            {
                "Nothing here yet..."
            }

            p
            {
                "Charts will show up here once you add some expenses.
                Get started by " (new_category_link) " or by " (import_link) "."
            }
        }
    );

    base("Dashboard", &[], &content)
}

fn dashboard_view(data: &DashboardData) -> Markup {
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW).into_html();
    let total_spent: f64 = data.category_totals.iter().map(|(_, total)| total).sum();
    let charts = build_dashboard_charts(data);

    let content = html!(
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            section class="grid grid-cols-1 sm:grid-cols-2 gap-4 w-full max-w-screen-xl mb-6"
            {
                div class=(CARD_STYLE)
                {
                    p class="text-sm text-gray-500 dark:text-gray-400" { "Total spent" }
                    p id="total-spent" class="text-2xl font-semibold"
                    {
                        (data.currency.format(total_spent))
                    }
                }

                div class=(CARD_STYLE)
                {
                    p class="text-sm text-gray-500 dark:text-gray-400" { "Expenses" }
                    p id="expense-count" class="text-2xl font-semibold" { (data.expense_count) }
                }
            }

            section id="categories" class="w-full max-w-screen-xl mb-6"
            {
                div class="flex justify-between items-center mb-4"
                {
                    h2 class="text-xl font-semibold" { "Categories" }
                    (link(endpoints::NEW_CATEGORY_VIEW, "New Category"))
                }

                div class="grid grid-cols-1 sm:grid-cols-2 lg:grid-cols-3 gap-4"
                {
                    @for (category, total) in &data.category_totals {
                        (category_card(category, *total, data.currency))
                    }
                }
            }

            (chart_filter_form(data))

            div class="w-full max-w-screen-xl"
            {
                (charts_view(&charts))
            }
        }
    );

    let scripts = [
        HeadElement::ScriptLink(ECHARTS_URL.to_owned()),
        charts_script(&charts),
        filter_script(),
    ];

    base("Dashboard", &scripts, &content)
}

fn category_card(category: &Category, total: f64, currency: Currency) -> Markup {
    html!(
        a
            href=(format_endpoint(endpoints::CATEGORY_VIEW, category.id))
            data-category-id=(category.id)
            class={ (CARD_STYLE) " border-l-8 hover:bg-gray-100 dark:hover:bg-gray-700" }
            style={ "border-left-color: " (category.color) }
        {
            h3 class="text-lg font-semibold" { (category.name) }

            @if let Some(description) = &category.description {
                p class="text-sm text-gray-600 dark:text-gray-400" { (description) }
            }

            p class="mt-2 text-xl font-semibold category-total" { (currency.format(total)) }
        }
    )
}

/// The year and category selectors for the monthly and yearly charts.
///
/// Without JavaScript the form reloads the page with the filters as query parameters.
fn chart_filter_form(data: &DashboardData) -> Markup {
    html!(
        form
            id="chart-filters"
            method="get"
            action=(endpoints::DASHBOARD_VIEW)
            class="flex flex-wrap items-end gap-4 w-full max-w-screen-xl mb-4"
        {
            div
            {
                label for="year" class=(FORM_LABEL_STYLE) { "Year" }
                select id="year" name="year" class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for year in &data.years {
                        option value=(year) selected[*year == data.year] { (year) }
                    }
                }
            }

            div
            {
                label for="category" class=(FORM_LABEL_STYLE) { "Category" }
                select id="category" name="category" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="all" selected[data.selected_category.is_none()]
                    {
                        (ALL_CATEGORIES_NAME)
                    }

                    @for (category, _) in &data.category_totals {
                        option
                            value=(category.id)
                            selected[data.selected_category == Some(category.id)]
                        {
                            (category.name)
                        }
                    }
                }
            }

            noscript
            {
                button type="submit" class={ (BUTTON_SECONDARY_STYLE) " max-w-xs" } { "Show" }
            }
        }
    )
}

#[cfg(test)]
mod dashboard_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Query, State},
        http::StatusCode,
    };
    use scraper::Selector;
    use time::macros::date;

    use crate::{
        Error,
        category::{Category, CategoryName, NewCategory, create_category},
        color::HexColor,
        dashboard::handlers::{ChartFilter, DashboardState},
        expense::{NewExpense, create_expense},
        test_utils::{
            assert_content_type, assert_valid_html, count_elements, create_test_user,
            get_test_db_connection, must_get_text, parse_html_document,
        },
        user::UserID,
    };

    use super::{get_dashboard_page, get_metrics, parse_category_filter};

    fn get_state() -> (DashboardState, UserID, UserID) {
        let connection = get_test_db_connection();
        let alice = create_test_user("alice", &connection).id;
        let bob = create_test_user("bob", &connection).id;

        let state = DashboardState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        (state, alice, bob)
    }

    fn add_category(state: &DashboardState, name: &str, color: &str, user_id: UserID) -> Category {
        create_category(
            NewCategory {
                name: CategoryName::new_unchecked(name),
                description: None,
                color: HexColor::new_unchecked(color),
                user_id,
            },
            &state.db_connection.lock().unwrap(),
        )
        .unwrap()
    }

    fn add_expense(state: &DashboardState, category: &Category, amount: f64, date: time::Date) {
        create_expense(
            NewExpense {
                description: "Thing".to_owned(),
                amount,
                date,
                paid_by: None,
                tags: None,
                file_path: None,
                category_id: category.id,
                user_id: category.user_id,
            },
            &state.db_connection.lock().unwrap(),
        )
        .unwrap();
    }

    fn filter(year: Option<i32>, category: Option<&str>) -> Query<ChartFilter> {
        Query(ChartFilter {
            year,
            category: category.map(str::to_owned),
        })
    }

    async fn metrics_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[test]
    fn category_filter_parsing() {
        assert_eq!(parse_category_filter(None), Ok(None));
        assert_eq!(parse_category_filter(Some("all")), Ok(None));
        assert_eq!(parse_category_filter(Some("")), Ok(None));
        assert_eq!(parse_category_filter(Some("42")), Ok(Some(42)));
        assert_eq!(parse_category_filter(Some("abc")), Err(Error::NotFound));
    }

    #[tokio::test]
    async fn shows_empty_state_without_categories() {
        let (state, alice, _) = get_state();

        let response = get_dashboard_page(State(state), Extension(alice), filter(None, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        assert_eq!(must_get_text(&html, "h2"), "Nothing here yet...");
    }

    #[tokio::test]
    async fn shows_totals_cards_and_charts() {
        let (state, alice, bob) = get_state();
        let food = add_category(&state, "Food", "#ff0000", alice);
        let rent = add_category(&state, "Rent", "#00ff00", alice);
        let bobs = add_category(&state, "Bob's", "#0000ff", bob);
        add_expense(&state, &food, 10.0, date!(2024 - 03 - 01));
        add_expense(&state, &food, 2.5, date!(2023 - 03 - 01));
        add_expense(&state, &rent, 1000.0, date!(2024 - 01 - 01));
        add_expense(&state, &bobs, 5.0, date!(2024 - 01 - 01));

        let response = get_dashboard_page(State(state), Extension(alice), filter(Some(2024), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_content_type(&response, "text/html; charset=utf-8");
        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        assert_eq!(must_get_text(&html, "#total-spent"), "$1,012.50");
        assert_eq!(must_get_text(&html, "#expense-count"), "3");

        assert_eq!(count_elements(&html, "#categories a[data-category-id]"), 2);

        for id in ["#monthly-chart", "#yearly-chart", "#category-chart"] {
            assert_eq!(count_elements(&html, id), 1, "{id}");
        }

        let years: Vec<String> = html
            .select(&Selector::parse("#year option").unwrap())
            .map(|option| option.value().attr("value").unwrap().to_owned())
            .collect();
        assert_eq!(years, vec!["2024", "2023"]);
        assert_eq!(must_get_text(&html, "#year option[selected]"), "2024");
        assert_eq!(must_get_text(&html, "#category option[selected]"), "All Categories");
    }

    #[tokio::test]
    async fn dashboard_with_other_users_category_is_not_found() {
        let (state, alice, bob) = get_state();
        add_category(&state, "Food", "#ff0000", alice);
        let bobs = add_category(&state, "Bob's", "#0000ff", bob);

        let result = get_dashboard_page(
            State(state),
            Extension(alice),
            filter(None, Some(&bobs.id.to_string())),
        )
        .await;

        assert_eq!(result.err(), Some(Error::NotFound));
    }

    #[tokio::test]
    async fn metrics_for_all_categories() {
        let (state, alice, _) = get_state();
        let food = add_category(&state, "Food", "#ff0000", alice);
        let rent = add_category(&state, "Rent", "#00ff00", alice);
        add_expense(&state, &food, 10.0, date!(2024 - 03 - 01));
        add_expense(&state, &rent, 20.0, date!(2024 - 03 - 15));

        let response = get_metrics(State(state), Extension(alice), filter(Some(2024), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_content_type(&response, "application/json");
        let metrics = metrics_json(response).await;
        assert_eq!(metrics["category_name"], "All Categories");
        assert_eq!(metrics["color"], "#6366f1");
        assert_eq!(metrics["monthly_data"][2], 30.0);
        assert_eq!(metrics["monthly_data"].as_array().unwrap().len(), 12);
        assert_eq!(metrics["pie_labels"], serde_json::json!(["Food", "Rent"]));
        assert_eq!(metrics["pie_data"], serde_json::json!([10.0, 20.0]));
        assert_eq!(
            metrics["pie_colors"],
            serde_json::json!(["#ff0000", "#00ff00"])
        );
    }

    #[tokio::test]
    async fn metrics_for_one_category() {
        let (state, alice, _) = get_state();
        let food = add_category(&state, "Food", "#ff0000", alice);
        let rent = add_category(&state, "Rent", "#00ff00", alice);
        add_expense(&state, &food, 10.0, date!(2024 - 03 - 01));
        add_expense(&state, &rent, 20.0, date!(2024 - 03 - 15));

        let response = get_metrics(
            State(state),
            Extension(alice),
            filter(Some(2024), Some(&food.id.to_string())),
        )
        .await
        .unwrap();

        let metrics = metrics_json(response).await;
        assert_eq!(metrics["category_name"], "Food");
        assert_eq!(metrics["color"], "#ff0000");
        assert_eq!(metrics["monthly_data"][2], 10.0);
    }

    #[tokio::test]
    async fn metrics_for_other_users_category_is_not_found() {
        let (state, alice, bob) = get_state();
        let bobs = add_category(&state, "Bob's", "#0000ff", bob);

        let result = get_metrics(
            State(state),
            Extension(alice),
            filter(Some(2024), Some(&bobs.id.to_string())),
        )
        .await;

        assert_eq!(result.err(), Some(Error::NotFound));
    }
}
