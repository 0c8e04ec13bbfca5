//! Time-based one-time passwords (RFC 6238) for two-factor authentication.
//!
//! Codes are six digits long, derived with HMAC-SHA1 from a 160 bit secret
//! and a 30 second time step. Secrets are shared with authenticator apps as
//! unpadded base32 strings.

use data_encoding::BASE32_NOPAD;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha1::Sha1;
use time::OffsetDateTime;

type HmacSha1 = Hmac<Sha1>;

/// The name shown for accounts in authenticator apps.
pub const TOTP_ISSUER: &str = "FINA";

/// The number of digits in a code.
pub const TOTP_DIGITS: u32 = 6;

const TIME_STEP_SECONDS: i64 = 30;

/// How many time steps either side of the current one are accepted.
const ALLOWED_DRIFT_STEPS: i64 = 1;

const SECRET_LENGTH_BYTES: usize = 20;

/// Generate a new random secret, encoded as 32 base32 characters.
pub fn generate_secret() -> String {
    let mut secret = [0u8; SECRET_LENGTH_BYTES];
    rand::thread_rng().fill_bytes(&mut secret);

    BASE32_NOPAD.encode(&secret)
}

/// The `otpauth://` URI that authenticator apps use to add `secret` for the
/// account `account_name`.
pub fn provisioning_uri(secret: &str, account_name: &str) -> String {
    let query = serde_urlencoded::to_string(&[("secret", secret), ("issuer", TOTP_ISSUER)])
        .unwrap_or_else(|_| format!("secret={secret}&issuer={TOTP_ISSUER}"));

    format!(
        "otpauth://totp/{TOTP_ISSUER}:{}?{query}",
        encode_label(account_name)
    )
}

fn encode_label(label: &str) -> String {
    serde_urlencoded::to_string(&[("", label)])
        .map(|encoded| encoded.trim_start_matches('=').replace('+', "%20"))
        .unwrap_or_else(|_| label.to_owned())
}

/// Check `token` against `secret` at the current time.
pub fn verify_totp_now(secret: &str, token: &str) -> bool {
    verify_totp(secret, token, OffsetDateTime::now_utc().unix_timestamp())
}

/// Check `token` against `secret` at `unix_time`, allowing for one time step
/// of clock drift in either direction.
///
/// Returns `false` if the token is not a six digit number or the secret is
/// not valid base32.
pub fn verify_totp(secret: &str, token: &str, unix_time: i64) -> bool {
    let token = token.trim();

    if token.len() != TOTP_DIGITS as usize || !token.bytes().all(|byte| byte.is_ascii_digit()) {
        return false;
    }

    let Some(key) = decode_secret(secret) else {
        tracing::warn!("Could not decode a stored TOTP secret.");
        return false;
    };

    let current_step = unix_time.div_euclid(TIME_STEP_SECONDS);

    (-ALLOWED_DRIFT_STEPS..=ALLOWED_DRIFT_STEPS)
        .filter_map(|offset| u64::try_from(current_step + offset).ok())
        .filter_map(|counter| hotp(&key, counter))
        .any(|code| format_code(code) == token)
}

/// The code for `secret` at `unix_time`, or `None` if the secret is not
/// valid base32.
pub fn totp_at(secret: &str, unix_time: i64) -> Option<String> {
    let key = decode_secret(secret)?;
    let counter = u64::try_from(unix_time.div_euclid(TIME_STEP_SECONDS)).ok()?;

    hotp(&key, counter).map(format_code)
}

fn format_code(code: u32) -> String {
    format!("{code:0width$}", width = TOTP_DIGITS as usize)
}

/// HOTP (RFC 4226) with dynamic truncation.
fn hotp(key: &[u8], counter: u64) -> Option<u32> {
    let mut mac = HmacSha1::new_from_slice(key).ok()?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);

    Some(binary % 10u32.pow(TOTP_DIGITS))
}

/// Decode a base32 secret, ignoring case, spaces and padding.
fn decode_secret(encoded: &str) -> Option<Vec<u8>> {
    let normalized: String = encoded
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .map(|c| c.to_ascii_uppercase())
        .collect();

    BASE32_NOPAD
        .decode(normalized.as_bytes())
        .ok()
        .filter(|decoded| !decoded.is_empty())
}
