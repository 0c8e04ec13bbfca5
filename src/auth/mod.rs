//! User authentication: passwords, two-factor codes, auth cookies and the
//! log-in, log-out and registration pages.

mod cookie;
mod log_in;
mod log_out;
mod middleware;
mod password;
mod redirect;
mod register_user;
mod token;
mod totp;
mod two_factor;

pub use cookie::{DEFAULT_COOKIE_DURATION, set_auth_cookie};
pub use log_in::{get_log_in_page, post_log_in};
pub use log_out::get_log_out;
pub use middleware::{auth_guard, auth_guard_hx};
pub use password::{PasswordHash, ValidatedPassword};
pub(crate) use password::{PASSWORD_INPUT_MIN_LENGTH, hash_new_password};
pub use register_user::{get_register_page, register_user};
pub(super) use token::Token;
pub(crate) use totp::{generate_secret, provisioning_uri, verify_totp_now};
pub use two_factor::post_log_in_two_factor;

#[cfg(test)]
pub(crate) use cookie::COOKIE_TOKEN;
#[cfg(test)]
pub(crate) use middleware::AuthState;
#[cfg(test)]
pub(crate) use totp::totp_at;
