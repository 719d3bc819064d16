//! Shared User-Agent string for all mirror traffic.

/// Product token for User-Agent identification.
const PRODUCT: &str = env!("CARGO_PKG_NAME");

/// Default User-Agent for landing, resource, image and answer requests.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{PRODUCT}/{version} (research-tool)")
}
