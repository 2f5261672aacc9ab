use rand::Rng;
use rand::distributions::Alphanumeric;

/// Length of a session token in characters.
pub const TOKEN_LEN: usize = 32;

/// Generate a fresh opaque session token.
///
/// Tokens carry no structure; the `user.auth_token` column is the sole source
/// of truth for which token maps to which account.
#[must_use]
pub fn generate() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}
