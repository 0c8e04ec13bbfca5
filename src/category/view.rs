//! The page listing the expenses in a category.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    category::{Category, get_category},
    currency::Currency,
    database_id::CategoryId,
    endpoints::{self, format_endpoint},
    expense::{Expense, get_expenses_for_category},
    html::{
        BUTTON_PRIMARY_STYLE, CARD_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, TAG_BADGE_STYLE, base, edit_delete_action_links,
    },
    navigation::NavBar,
    tag::get_all_tags,
    user::{UserID, get_user_by_id},
};

/// Badge colour for expense labels that do not match one of the user's tags.
const UNTAGGED_BADGE_COLOR: &str = "#6b7280";

/// The state needed for the category page.
#[derive(Debug, Clone)]
pub struct CategoryPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoryPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render a category with its expenses, newest first.
pub async fn get_category_page(
    Path(category_id): Path<CategoryId>,
    State(state): State<CategoryPageState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let (category, expenses, tag_colors, currency) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let category = get_category(category_id, user_id, &connection)?;
        let expenses = get_expenses_for_category(category_id, user_id, &connection)?;
        let tag_colors: HashMap<String, String> = get_all_tags(user_id, &connection)?
            .into_iter()
            .map(|tag| (tag.name.to_string(), tag.color.to_string()))
            .collect();
        let currency = get_user_by_id(user_id, &connection)?.currency;

        (category, expenses, tag_colors, currency)
    };

    Ok(category_view(&category, &expenses, &tag_colors, currency).into_response())
}

fn category_view(
    category: &Category,
    expenses: &[Expense],
    tag_colors: &HashMap<String, String>,
    currency: Currency,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::CATEGORY_VIEW).into_html();
    let total: f64 = expenses.iter().map(|expense| expense.amount).sum();
    let new_expense_url = format_endpoint(endpoints::NEW_EXPENSE_VIEW, category.id);
    let edit_url = format_endpoint(endpoints::EDIT_CATEGORY_VIEW, category.id);
    let delete_url = format_endpoint(endpoints::DELETE_CATEGORY, category.id);
    let confirm_message = format!(
        "Delete the category \"{}\" and all of its expenses?",
        category.name
    );

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class={ (CARD_STYLE) " w-full max-w-5xl mb-6 border-l-8" }
                style={ "border-left-color: " (category.color) }
            {
                div class="flex flex-wrap items-start justify-between gap-4"
                {
                    div
                    {
                        h1 class="text-2xl font-bold" { (category.name) }

                        @if let Some(description) = &category.description {
                            p class="text-gray-600 dark:text-gray-400" { (description) }
                        }
                    }

                    div class="text-right"
                    {
                        p class="text-sm text-gray-500 dark:text-gray-400" { "Total spent" }
                        p id="category-total" class="text-2xl font-semibold" {
                            (currency.format(total))
                        }
                    }
                }

                div class="flex gap-4 mt-4"
                {
                    (edit_delete_action_links(
                        &edit_url,
                        &delete_url,
                        &confirm_message,
                        "body",
                        "none",
                    ))
                }
            }

            div class="w-full max-w-5xl"
            {
                div class="flex justify-between items-center mb-4"
                {
                    h2 class="text-xl font-semibold" { "Expenses" }

                    a href=(new_expense_url) class={ (BUTTON_PRIMARY_STYLE) " max-w-xs text-center" }
                    {
                        "Add Expense"
                    }
                }

                @if expenses.is_empty() {
                    p class="text-gray-500 dark:text-gray-400" {
                        "No expenses yet. Add one to start tracking."
                    }
                } @else {
                    (expense_table(expenses, tag_colors, currency))
                }
            }
        }
    };

    base(category.name.as_ref(), &[], &content)
}

fn expense_table(
    expenses: &[Expense],
    tag_colors: &HashMap<String, String>,
    currency: Currency,
) -> Markup {
    html! {
        div class="relative overflow-x-auto shadow-md rounded-lg"
        {
            table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Paid By" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Tags" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Attachment" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                    }
                }

                tbody
                {
                    @for expense in expenses {
                        (expense_row(expense, tag_colors, currency))
                    }
                }
            }
        }
    }
}

fn expense_row(
    expense: &Expense,
    tag_colors: &HashMap<String, String>,
    currency: Currency,
) -> Markup {
    let edit_url = format_endpoint(endpoints::EDIT_EXPENSE_VIEW, expense.id);
    let delete_url = format_endpoint(endpoints::DELETE_EXPENSE, expense.id);
    let confirm_message = format!("Delete the expense \"{}\"?", expense.description);

    html! {
        tr class=(TABLE_ROW_STYLE) data-expense-id=(expense.id)
        {
            td class=(TABLE_CELL_STYLE) { (expense.date) }
            td class=(TABLE_CELL_STYLE) { (expense.description) }
            td class=(TABLE_CELL_STYLE) { (currency.format(expense.amount)) }
            td class=(TABLE_CELL_STYLE) { (expense.paid_by.as_deref().unwrap_or_default()) }
            td class=(TABLE_CELL_STYLE)
            {
                div class="flex flex-wrap gap-1"
                {
                    @for label in expense.tag_labels() {
                        span
                            class=(TAG_BADGE_STYLE)
                            style={
                                "background-color: "
                                (tag_colors.get(label).map_or(UNTAGGED_BADGE_COLOR, String::as_str))
                            }
                        {
                            (label)
                        }
                    }
                }
            }
            td class=(TABLE_CELL_STYLE)
            {
                @if expense.file_path.is_some() {
                    div class="flex gap-2"
                    {
                        a
                            href=(format_endpoint(endpoints::EXPENSE_ATTACHMENT, expense.id))
                            target="_blank"
                            class=(LINK_STYLE)
                        {
                            "View"
                        }
                        a
                            href=(format_endpoint(endpoints::EXPENSE_ATTACHMENT_DOWNLOAD, expense.id))
                            class=(LINK_STYLE)
                        {
                            "Download"
                        }
                    }
                }
            }
            td class=(TABLE_CELL_STYLE)
            {
                div class="flex gap-4"
                {
                    (edit_delete_action_links(
                        &edit_url,
                        &delete_url,
                        &confirm_message,
                        "closest tr",
                        "none",
                    ))
                }
            }
        }
    }
}
