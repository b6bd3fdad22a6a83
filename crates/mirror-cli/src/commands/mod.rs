//! Command implementations for mirror-cli

pub mod plan;
pub mod reconcile;

pub use plan::run_plan;
pub use reconcile::run_reconcile;

use mirror_core::Settings;

/// Recognised settings from the process environment; non-UTF-8 values are skipped.
pub(crate) fn environment_settings() -> Settings {
    Settings::from_env(
        std::env::vars_os().filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))),
    )
}
