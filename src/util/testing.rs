//! Shared test setup: logging and in-memory service containers.

use std::env;
use std::path::PathBuf;
use std::sync::{Arc, Once};

use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::config::Settings;
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::sqlite::SqliteStore;
use crate::infrastructure::StoreResult;

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "debug");
        }
        // global logging subscriber, used by all tracing log macros
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    debug!("INIT: Attempting logger init from testing.rs");

    // skim's terminal backend is chatty at trace level
    let noisy_modules = ["skim", "tuikit"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_test_writer()
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// Settings for `actor`, superuser when `superuser` is set. The database
/// path is never opened by [`test_container`].
pub fn test_settings(actor: &str, superuser: bool) -> Settings {
    Settings {
        database: PathBuf::from(":memory:"),
        actor: actor.to_string(),
        superusers: if superuser {
            vec![actor.to_string()]
        } else {
            Vec::new()
        },
        busy_timeout_ms: 100,
    }
}

/// Service container over a fresh in-memory database, acting as a
/// superuser named "admin".
pub fn test_container() -> StoreResult<ServiceContainer> {
    let store = SqliteStore::open_in_memory()?;
    Ok(ServiceContainer::with_store(
        test_settings("admin", true),
        Arc::new(store),
    ))
}
