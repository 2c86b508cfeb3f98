//! # Configuration reload on restart.

use async_trait::async_trait;

use crate::error::ReloadError;
use crate::settings::Settings;

/// Re-validates or reloads the configuration between two runs.
///
/// Called exactly once per restart, after every role of the previous run has
/// stopped. The returned settings drive the next run; an error terminates the
/// scheduler with [`Outcome::ReloadFailed`](crate::Outcome::ReloadFailed).
///
/// # Example
/// ```rust
/// use async_trait::async_trait;
/// use rolevisor::{AppReloader, ReloadError, Settings};
///
/// struct FromDisk;
///
/// #[async_trait]
/// impl AppReloader for FromDisk {
///     async fn reload(&self, current: &Settings) -> Result<Settings, ReloadError> {
///         // parse the configuration files again here
///         Ok(current.clone())
///     }
/// }
/// ```
#[async_trait]
pub trait AppReloader: Send + Sync + 'static {
    /// Produces the settings of the next run from the current ones.
    async fn reload(&self, current: &Settings) -> Result<Settings, ReloadError>;
}

/// Reloader keeping the current settings; the default of the builder.
pub(crate) struct KeepSettings;

#[async_trait]
impl AppReloader for KeepSettings {
    async fn reload(&self, current: &Settings) -> Result<Settings, ReloadError> {
        Ok(current.clone())
    }
}
