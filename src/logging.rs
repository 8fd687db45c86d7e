//! ## Logging Configuration
//!
//! A `tracing` subscriber is installed at program startup using the `ctor` crate.
//! Logging is controlled by the `DEBUG_TABPREP` environment variable:
//!
//! - **Disabled** (default): the variable is unset, empty, or set to `"0"` or `"false"`.
//! - **Enabled**: any other value installs a formatter with a maximum level of `DEBUG`.
//!
//! The transformers emit `debug` events with the parameters they learn (quartiles, bounds,
//! ranges) and with the number of rows they drop.
//!
//! ```sh
//! export DEBUG_TABPREP=true
//! ```

use ctor::ctor;
use tracing::Level;

/// Environment variable that turns debug logging on.
pub const DEBUG_ENV_VAR: &str = "DEBUG_TABPREP";

/// Returns true when the given value of [`DEBUG_ENV_VAR`] enables logging.
pub(crate) fn logging_enabled(value: Option<&str>) -> bool {
    value.is_some_and(|v| !(v == "0" || v == "false" || v.is_empty()))
}

#[ctor]
fn set_debug_level() {
    let value = std::env::var(DEBUG_ENV_VAR).ok();
    if logging_enabled(value.as_deref()) {
        // try_init: the host application may already own a global subscriber.
        let _ = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .try_init();
    }
}
