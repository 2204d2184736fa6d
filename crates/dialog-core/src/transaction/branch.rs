use rand::{Rng, distributions::Alphanumeric};

/// RFC 3261 branch prefix
pub const MAGIC_COOKIE: &str = "z9hG4bK";

const BRANCH_SUFFIX_LENGTH: usize = 7;

/// A fresh Via branch: the magic cookie followed by a random suffix
pub fn generate_branch() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(BRANCH_SUFFIX_LENGTH)
        .map(char::from)
        .collect();
    format!("{}{}", MAGIC_COOKIE, suffix)
}

/// Whether `branch` was generated by an RFC 3261 compliant element
pub fn is_rfc3261_branch(branch: &str) -> bool {
    branch.len() > MAGIC_COOKIE.len() && branch.starts_with(MAGIC_COOKIE)
}
