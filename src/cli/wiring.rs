//! Demonstration service graph used by the CLI.
//!
//! Settings are registered twice (default and `dev`), the database is lazy
//! and depends on the default settings, the repository is built through
//! `FromContainer`, and the clock is a trait object set directly.

use std::sync::Arc;
use std::time::SystemTime;

use anyhow::bail;

use crate::container::Container;
use crate::{FromContainer, Inject};

/// Environment settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub environment: String,
    pub database_url: String,
}

impl Settings {
    pub fn new(environment: &str, database_url: &str) -> Self {
        Self {
            environment: environment.to_string(),
            database_url: database_url.to_string(),
        }
    }
}

/// Stand-in for a connection pool.
#[derive(Debug)]
pub struct Database {
    pub url: String,
}

impl Database {
    pub fn connect(settings: &Settings) -> anyhow::Result<Self> {
        if settings.database_url.is_empty() {
            bail!("no database url for {}", settings.environment);
        }
        tracing::debug!(url = %settings.database_url, "Opening database");
        Ok(Self {
            url: settings.database_url.clone(),
        })
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Repository built entirely from the container.
#[derive(FromContainer)]
pub struct UserRepository {
    pub db: Arc<Database>,
    #[from_container(name = "dev")]
    pub dev_settings: Option<Arc<Settings>>,
}

/// Handler populated after construction.
#[derive(Default, Inject)]
pub struct RequestHandler {
    #[inject]
    pub repository: Option<Arc<UserRepository>>,
    #[inject(name = "dev")]
    pub settings: Option<Settings>,
    #[inject]
    pub clock: Option<Arc<dyn Clock>>,
    pub handled: u64,
}

/// Register the demonstration services.
///
/// With `broken`, a `replica` database is added whose settings are never
/// registered, so building it fails.
pub fn wire(container: &Container, broken: bool) {
    container.set_value(Settings::new("production", "postgres://db.internal/app"));
    container.set_named_value("dev", Settings::new("development", "postgres://localhost/app"));
    container.register_lazy(|c| {
        let settings = c.resolve::<Settings>()?;
        Database::connect(&settings)
    });
    container.register_lazy_from::<UserRepository>();
    container.set_shared::<dyn Clock>(Arc::new(SystemClock));

    if broken {
        container.register_lazy_named("replica", |c| {
            let settings = c.resolve_named::<Settings>("replica")?;
            Database::connect(&settings)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_and_inject_handler() {
        let container = Container::new();
        wire(&container, false);

        let mut handler = RequestHandler::default();
        container.inject_struct(&mut handler).unwrap();

        let repository = handler.repository.unwrap();
        assert_eq!(repository.db.url, "postgres://db.internal/app");
        assert_eq!(
            repository.dev_settings.as_ref().unwrap().environment,
            "development"
        );
        assert_eq!(handler.settings.unwrap().environment, "development");
        assert!(handler.clock.is_some());
        assert_eq!(handler.handled, 0);
    }

    #[test]
    fn test_broken_wiring_fails_validation() {
        let container = Container::new();
        wire(&container, true);

        let err = container.validate_all().unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_database_requires_url() {
        assert!(Database::connect(&Settings::new("test", "")).is_err());
    }
}
