//! Random identifiers: tags and Call-IDs

use rand::{Rng, distributions::Alphanumeric};
use uuid::Uuid;

/// Length of generated tags and branch suffixes
pub const TOKEN_LENGTH: usize = 7;

/// Random alphanumeric string of `len` characters
pub fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// A fresh From/To tag
pub fn generate_tag() -> String {
    random_token(TOKEN_LENGTH)
}

/// A fresh Call-ID, qualified with `host` when one is given
pub fn generate_call_id(host: Option<&str>) -> String {
    let id = Uuid::new_v4().simple().to_string();
    match host {
        Some(host) => format!("{}@{}", id, host),
        None => id,
    }
}
