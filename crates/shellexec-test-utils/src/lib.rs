pub mod fixtures;
pub mod terminal;

pub use fixtures::TestFixtures;
pub use terminal::{normalize_output, output_lines};

use std::sync::Once;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Upper bound for any single wait in a test
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("shellexec=debug")),
            )
            .with_test_writer()
            .try_init();
    });
}
