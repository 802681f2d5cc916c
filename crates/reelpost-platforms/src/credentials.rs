//! Credential checks.

use reelpost_models::Platform;

use crate::error::{PlatformError, PlatformResult};

/// True for empty values and template placeholders such as `YOUR_TOKEN`,
/// `<token>` or `changeme`.
pub fn is_placeholder(value: &str) -> bool {
    let v = value.trim();
    v.is_empty()
        || v.to_ascii_uppercase().starts_with("YOUR_")
        || (v.starts_with('<') && v.ends_with('>'))
        || v.eq_ignore_ascii_case("changeme")
}

/// Return the credential value, or a config error naming the variable.
pub fn require<'a>(
    platform: Platform,
    name: &str,
    value: &'a Option<String>,
) -> PlatformResult<&'a str> {
    match value.as_deref() {
        Some(v) if !is_placeholder(v) => Ok(v.trim()),
        Some(_) => Err(PlatformError::missing_credentials(
            platform,
            format!("{} is a placeholder", name),
        )),
        None => Err(PlatformError::missing_credentials(platform, format!("{} not set", name))),
    }
}

/// Read an optional credential from the environment.
pub(crate) fn env_credential(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
