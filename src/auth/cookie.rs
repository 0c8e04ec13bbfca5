//! Defines functions for handling user authentication with cookies.
//!
//! A logged-in user carries a private (encrypted and signed) cookie holding
//! a JSON [Token]. Users with two-factor authentication get a short-lived
//! pending cookie between entering their password and their code.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime};

use crate::{Error, auth::Token, user::UserID};

/// The name of the cookie holding the auth token.
pub(crate) const COOKIE_TOKEN: &str = "token";
/// The name of the cookie holding the user waiting to enter a two-factor code.
pub(crate) const COOKIE_PENDING_TWO_FACTOR: &str = "pending_two_factor";
/// The default duration for which auth cookies are valid.
pub const DEFAULT_COOKIE_DURATION: Duration = Duration::minutes(5);
/// How long a user has to enter their two-factor code after their password.
pub(crate) const PENDING_TWO_FACTOR_DURATION: Duration = Duration::minutes(5);

fn build_cookie(name: &'static str, value: String, expiry: OffsetDateTime) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .expires(expiry)
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(true)
        .build()
}

fn expired_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, "deleted"))
        .path("/")
        .expires(OffsetDateTime::UNIX_EPOCH)
        .max_age(Duration::ZERO)
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(true)
        .build()
}

fn add_token_cookie(
    jar: PrivateCookieJar,
    name: &'static str,
    token: &Token,
) -> Result<PrivateCookieJar, Error> {
    let token_string =
        serde_json::to_string(token).map_err(|error| Error::SerializationError(error.to_string()))?;

    Ok(jar.add(build_cookie(name, token_string, token.expires_at)))
}

fn get_token(jar: &PrivateCookieJar, name: &str) -> Result<Token, Error> {
    let cookie = jar.get(name).ok_or(Error::CookieMissing)?;
    let token: Token =
        serde_json::from_str(cookie.value_trimmed()).map_err(|_| Error::InvalidToken)?;

    if token.is_expired_at(OffsetDateTime::now_utc()) {
        return Err(Error::InvalidToken);
    }

    Ok(token)
}

/// Add an auth cookie to the cookie jar, indicating that a user is logged in and authenticated.
///
/// Sets the initial expiry of the cookie to `duration` from the current time.
/// You can use [DEFAULT_COOKIE_DURATION] for the default duration.
///
/// Returns the cookie jar with the cookie added.
///
/// # Errors
///
/// Returns [Error::InvalidDateFormat] if the expiry would overflow, or
/// [Error::SerializationError] if the token could not be serialised.
pub fn set_auth_cookie(
    jar: PrivateCookieJar,
    user_id: UserID,
    duration: Duration,
) -> Result<PrivateCookieJar, Error> {
    add_token_cookie(jar, COOKIE_TOKEN, &Token::new(user_id, duration)?)
}

/// Get the auth token from the cookie jar.
///
/// # Errors
///
/// Returns [Error::CookieMissing] if there is no auth cookie, or
/// [Error::InvalidToken] if the token cannot be parsed or has expired.
pub fn get_token_from_cookies(jar: &PrivateCookieJar) -> Result<Token, Error> {
    get_token(jar, COOKIE_TOKEN)
}

/// Set the expiry of the auth cookie in `jar` to the latest of UTC now
/// plus `duration` and the cookie's expiry.
///
/// # Errors
///
/// The cookie jar is not modified if an error is returned.
///
/// Returns the errors of [get_token_from_cookies] and [set_auth_cookie].
pub(crate) fn extend_auth_cookie_duration_if_needed(
    jar: PrivateCookieJar,
    duration: Duration,
) -> Result<PrivateCookieJar, Error> {
    let token = get_token_from_cookies(&jar)?.extended_to(duration)?;

    add_token_cookie(jar, COOKIE_TOKEN, &token)
}

/// Set the auth cookie to an invalid value and set its max age to zero, which should delete the cookie on the client side.
pub fn invalidate_auth_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.add(expired_cookie(COOKIE_TOKEN))
}

/// Remember that `user_id` has entered the correct password and must now
/// enter a two-factor code.
///
/// # Errors
///
/// Returns [Error::InvalidDateFormat] if the expiry would overflow, or
/// [Error::SerializationError] if the token could not be serialised.
pub(crate) fn set_pending_two_factor_cookie(
    jar: PrivateCookieJar,
    user_id: UserID,
) -> Result<PrivateCookieJar, Error> {
    add_token_cookie(
        jar,
        COOKIE_PENDING_TWO_FACTOR,
        &Token::new(user_id, PENDING_TWO_FACTOR_DURATION)?,
    )
}

/// The user waiting to enter a two-factor code.
///
/// # Errors
///
/// Returns [Error::CookieMissing] or [Error::InvalidToken] if there is no
/// pending log-in or it has expired.
pub(crate) fn get_pending_two_factor_user(jar: &PrivateCookieJar) -> Result<UserID, Error> {
    get_token(jar, COOKIE_PENDING_TWO_FACTOR).map(|token| token.user_id)
}

/// Remove the pending two-factor cookie.
pub(crate) fn remove_pending_two_factor_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.add(expired_cookie(COOKIE_PENDING_TWO_FACTOR))
}

#[cfg(test)]
mod cookie_tests {
    use axum_extra::extract::{
        PrivateCookieJar,
        cookie::{Cookie, Key, SameSite},
    };
    use sha2::{Digest, Sha512};
    use time::{Duration, OffsetDateTime};

    use crate::{
        Error,
        auth::cookie::{
            COOKIE_PENDING_TWO_FACTOR, COOKIE_TOKEN, DEFAULT_COOKIE_DURATION,
            extend_auth_cookie_duration_if_needed, get_pending_two_factor_user,
            get_token_from_cookies, invalidate_auth_cookie, remove_pending_two_factor_cookie,
            set_auth_cookie, set_pending_two_factor_cookie,
        },
        user::UserID,
    };

    fn get_jar() -> PrivateCookieJar {
        let hash = Sha512::digest(b"foobar");
        let key = Key::from(&hash);

        PrivateCookieJar::new(key)
    }

    /// Test helper macro to assert that two date times are within one second
    /// of each other. Used instead of a function so that the file and line
    /// number of the caller is included in the error message instead of the
    /// helper.
    macro_rules! assert_date_time_close {
        ($left:expr, $right:expr) => {
            assert!(
                ($left - $right).abs() < Duration::seconds(1),
                "got date time {:?}, want {:?}",
                $left,
                $right
            );
        };
    }

    #[test]
    fn can_set_cookie() {
        let user_id = UserID::new(1);

        let jar = set_auth_cookie(get_jar(), user_id, DEFAULT_COOKIE_DURATION).unwrap();
        let token = get_token_from_cookies(&jar).unwrap();
        let cookie = jar.get(COOKIE_TOKEN).unwrap();

        assert_eq!(token.user_id, user_id);
        assert_date_time_close!(token.expires_at, OffsetDateTime::now_utc() + Duration::minutes(5));
        assert_eq!(cookie.expires_datetime(), Some(token.expires_at));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn missing_cookie_is_an_error() {
        assert_eq!(get_token_from_cookies(&get_jar()), Err(Error::CookieMissing));
    }

    #[test]
    fn garbage_token_is_invalid() {
        let jar = get_jar().add(Cookie::new(COOKIE_TOKEN, "FOOBAR"));

        assert_eq!(get_token_from_cookies(&jar), Err(Error::InvalidToken));
    }

    #[test]
    fn expired_token_is_invalid() {
        let jar = set_auth_cookie(get_jar(), UserID::new(1), Duration::seconds(-1)).unwrap();

        assert_eq!(get_token_from_cookies(&jar), Err(Error::InvalidToken));
    }

    #[test]
    fn can_extend_cookie_duration() {
        let jar = set_auth_cookie(get_jar(), UserID::new(1), Duration::seconds(5)).unwrap();

        let jar = extend_auth_cookie_duration_if_needed(jar, Duration::minutes(10)).unwrap();
        let token = get_token_from_cookies(&jar).unwrap();

        assert_date_time_close!(token.expires_at, OffsetDateTime::now_utc() + Duration::minutes(10));
        assert_eq!(
            jar.get(COOKIE_TOKEN).unwrap().expires_datetime(),
            Some(token.expires_at)
        );
    }

    #[test]
    fn cookie_duration_does_not_shrink() {
        let jar = set_auth_cookie(get_jar(), UserID::new(1), Duration::days(7)).unwrap();
        let want = get_token_from_cookies(&jar).unwrap().expires_at;

        let jar = extend_auth_cookie_duration_if_needed(jar, Duration::minutes(5)).unwrap();

        assert_eq!(get_token_from_cookies(&jar).unwrap().expires_at, want);
    }

    #[test]
    fn invalidate_auth_cookie_succeeds() {
        let jar = set_auth_cookie(get_jar(), UserID::new(1), DEFAULT_COOKIE_DURATION).unwrap();

        let jar = invalidate_auth_cookie(jar);
        let cookie = jar.get(COOKIE_TOKEN).unwrap();

        assert_eq!(cookie.value(), "deleted");
        assert_eq!(cookie.expires_datetime(), Some(OffsetDateTime::UNIX_EPOCH));
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        assert_eq!(get_token_from_cookies(&jar), Err(Error::InvalidToken));
    }

    #[test]
    fn pending_two_factor_cookie_round_trips() {
        let jar = set_pending_two_factor_cookie(get_jar(), UserID::new(3)).unwrap();

        assert_eq!(get_pending_two_factor_user(&jar), Ok(UserID::new(3)));
        assert!(jar.get(COOKIE_PENDING_TWO_FACTOR).is_some());
        assert_eq!(get_token_from_cookies(&jar), Err(Error::CookieMissing));

        let jar = remove_pending_two_factor_cookie(jar);

        assert!(get_pending_two_factor_user(&jar).is_err());
    }
}
