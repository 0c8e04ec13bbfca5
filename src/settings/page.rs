//! The settings overview: profile, two-factor status, tags, users and data.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    endpoints::{self, format_endpoint},
    html::{
        CARD_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE,
        TABLE_ROW_STYLE, TAG_BADGE_STYLE, base, edit_delete_action_links, link,
    },
    navigation::NavBar,
    tag::{Tag, get_all_tags},
    user::{User, UserID, get_all_users, get_user_by_id},
};

/// The state needed for the settings page.
#[derive(Debug, Clone)]
pub struct SettingsState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SettingsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the settings page. Only admins see the list of users.
pub async fn get_settings_page(
    State(state): State<SettingsState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let (user, tags, users) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let user = get_user_by_id(user_id, &connection)?;
        let tags = get_all_tags(user_id, &connection)?;
        let users = if user.is_admin {
            get_all_users(&connection)?
        } else {
            Vec::new()
        };

        (user, tags, users)
    };

    Ok(settings_view(&user, &tags, &users).into_response())
}

fn settings_view(user: &User, tags: &[Tag], users: &[User]) -> Markup {
    let nav_bar = NavBar::new(endpoints::SETTINGS_VIEW).into_html();

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-5xl space-y-6"
            {
                h1 class="text-2xl font-bold" { "Settings" }

                (profile_section(user))
                (two_factor_section(user))
                (tags_section(tags))

                @if user.is_admin {
                    (users_section(user.id, users))
                }

                (data_section())
            }
        }
    };

    base("Settings", &[], &content)
}

fn section_header(title: &str, action: Option<Markup>) -> Markup {
    html! {
        div class="flex justify-between items-center mb-4"
        {
            h2 class="text-xl font-semibold" { (title) }

            @if let Some(action) = action {
                (action)
            }
        }
    }
}

fn profile_section(user: &User) -> Markup {
    html! {
        section id="profile" class=(CARD_STYLE)
        {
            (section_header("Profile", Some(link(endpoints::PROFILE_VIEW, "Edit Profile"))))

            dl class="grid grid-cols-[auto_1fr] gap-x-6 gap-y-2"
            {
                dt class="font-medium" { "Username" }
                dd { (user.username) }
                dt class="font-medium" { "Email" }
                dd { (user.email) }
                dt class="font-medium" { "Currency" }
                dd { (user.currency.label()) }
                dt class="font-medium" { "Role" }
                dd { @if user.is_admin { "Admin" } @else { "User" } }
            }
        }
    }
}

fn two_factor_section(user: &User) -> Markup {
    let (status, action) = if user.totp_enabled {
        ("Enabled", "Manage")
    } else {
        ("Disabled", "Set Up")
    };

    html! {
        section id="two-factor" class=(CARD_STYLE)
        {
            (section_header("Two-Factor Authentication", Some(link(endpoints::TWO_FACTOR_VIEW, action))))

            p
            {
                "Status: "
                span id="two-factor-status" class="font-semibold" { (status) }
            }
        }
    }
}

fn tags_section(tags: &[Tag]) -> Markup {
    html! {
        section id="tags" class=(CARD_STYLE)
        {
            (section_header("Tags", Some(link(endpoints::NEW_TAG_VIEW, "New Tag"))))

            @if tags.is_empty() {
                p class="text-gray-600 dark:text-gray-400"
                {
                    "No tags yet. Tags you create are suggested when adding expenses."
                }
            } @else {
                table class="w-full text-sm text-left"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Tag" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                        }
                    }

                    tbody
                    {
                        @for tag in tags {
                            (tag_row(tag))
                        }
                    }
                }
            }
        }
    }
}

fn tag_row(tag: &Tag) -> Markup {
    let edit_url = format_endpoint(endpoints::EDIT_TAG_VIEW, tag.id);
    let delete_url = format_endpoint(endpoints::DELETE_TAG, tag.id);
    let confirm_message = format!("Delete the tag \"{}\"?", tag.name);

    html! {
        tr class=(TABLE_ROW_STYLE) data-tag-id=(tag.id)
        {
            td class=(TABLE_CELL_STYLE)
            {
                span class=(TAG_BADGE_STYLE) style={ "background-color: " (tag.color) }
                {
                    (tag.name)
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
                        "delete",
                    ))
                }
            }
        }
    }
}

fn users_section(current_user_id: UserID, users: &[User]) -> Markup {
    html! {
        section id="users" class=(CARD_STYLE)
        {
            (section_header("Users", Some(link(endpoints::NEW_USER_VIEW, "New User"))))

            table class="w-full text-sm text-left"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Username" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Email" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Role" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                    }
                }

                tbody
                {
                    @for user in users {
                        tr class=(TABLE_ROW_STYLE) data-user-id=(user.id)
                        {
                            td class=(TABLE_CELL_STYLE) { (user.username) }
                            td class=(TABLE_CELL_STYLE) { (user.email) }
                            td class=(TABLE_CELL_STYLE)
                            {
                                @if user.is_admin { "Admin" } @else { "User" }
                            }
                            td class=(TABLE_CELL_STYLE)
                            {
                                div class="flex gap-4"
                                {
                                    @if user.id == current_user_id {
                                        a href=(endpoints::PROFILE_VIEW) class=(LINK_STYLE) { "Edit" }
                                    } @else {
                                        (edit_delete_action_links(
                                            &format_endpoint(endpoints::EDIT_USER_VIEW, user.id.as_i64()),
                                            &format_endpoint(endpoints::DELETE_USER_ADMIN, user.id.as_i64()),
                                            &format!("Delete the user \"{}\" and all of their data?", user.username),
                                            "body",
                                            "none",
                                        ))
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn data_section() -> Markup {
    html! {
        section id="data" class=(CARD_STYLE)
        {
            (section_header("Data", None))

            div class="flex gap-6"
            {
                a href=(endpoints::EXPORT) class=(LINK_STYLE) download { "Export Expenses (CSV)" }
                (link(endpoints::IMPORT_VIEW, "Import Expenses"))
            }
        }
    }
}
