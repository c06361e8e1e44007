//! Daemon bootstrap orchestration.
//!
//! Bootstrap is deliberately small: load configuration, install telemetry,
//! report each stage through the health observer. Listener construction
//! happens afterwards in the process supervisor, which owns the sockets.

use thiserror::Error;

use tether_config::{Config, ConfigError};

use crate::health::HealthReporter;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the configuration cannot be resolved.
    fn load(&self) -> Result<Config, ConfigError>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Config::load()
    }
}

/// Loader that returns a pre-resolved configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already-resolved configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        #[source]
        source: ConfigError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        #[source]
        source: TelemetryError,
    },
}

/// Result of a successful bootstrap invocation.
#[derive(Debug)]
pub struct Daemon {
    config: Config,
    telemetry: TelemetryHandle,
}

impl Daemon {
    fn new(config: Config, telemetry: TelemetryHandle) -> Self {
        Self { config, telemetry }
    }

    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// # Errors
///
/// Returns [`BootstrapError`] when configuration loading or telemetry
/// installation fails; the failure is also mirrored to the health reporter.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: &dyn HealthReporter,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    reporter.bootstrap_succeeded(&config);
    Ok(Daemon::new(config, telemetry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use tether_config::SocketEndpoint;

    #[derive(Default)]
    struct RecordingReporter {
        events: Mutex<Vec<&'static str>>,
    }

    impl RecordingReporter {
        fn events(&self) -> Vec<&'static str> {
            self.events.lock().expect("events lock").clone()
        }

        fn push(&self, event: &'static str) {
            self.events.lock().expect("events lock").push(event);
        }
    }

    impl HealthReporter for RecordingReporter {
        fn bootstrap_starting(&self) {
            self.push("starting");
        }

        fn bootstrap_succeeded(&self, _config: &Config) {
            self.push("succeeded");
        }

        fn bootstrap_failed(&self, _error: &BootstrapError) {
            self.push("failed");
        }
    }

    struct FailingLoader;

    impl ConfigLoader for FailingLoader {
        fn load(&self) -> Result<Config, ConfigError> {
            Config::load_from_iter(["tetherd", "--listen", "invalid://endpoint"])
        }
    }

    #[test]
    fn bootstrap_reports_success_in_order() {
        let loader = StaticConfigLoader::new(Config {
            listen: SocketEndpoint::new("127.0.0.1", 0),
            ..Config::default()
        });
        let reporter = RecordingReporter::default();

        let daemon = bootstrap_with(&loader, &reporter).expect("bootstrap");
        assert_eq!(daemon.config().listen, SocketEndpoint::new("127.0.0.1", 0));
        assert_eq!(reporter.events(), vec!["starting", "succeeded"]);
    }

    #[test]
    fn bootstrap_reports_configuration_failure() {
        let reporter = RecordingReporter::default();

        let error = bootstrap_with(&FailingLoader, &reporter).expect_err("should fail");
        assert!(matches!(error, BootstrapError::Configuration { .. }));
        assert_eq!(reporter.events(), vec!["starting", "failed"]);
    }
}
