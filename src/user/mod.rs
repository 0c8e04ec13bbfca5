//! Users, their profile page and the admin pages for managing other users.

mod admin;
mod db;
mod domain;
mod profile;

pub use admin::{
    create_user_endpoint, delete_user_endpoint, get_edit_user_page, get_new_user_page,
    update_user_endpoint,
};
pub use db::{
    count_users, create_user, create_user_table, delete_user, get_all_users, get_user_by_id,
    get_user_by_username, update_password, update_profile, update_two_factor,
    update_user_details,
};
pub use domain::{EMAIL_MAX_LENGTH, Email, NewUser, USERNAME_MAX_LENGTH, User, UserID, Username};
pub use profile::{get_profile_page, update_profile_endpoint};
