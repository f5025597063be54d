//! Startup integration support.

use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::conversion::TypeConversionRegistry;
use crate::database::Database;
use crate::dialect::Dialect;
use crate::driver::Driver;
use crate::error::DatabaseError;

/// Hook for wiring a [`Database`] from an application's configuration
/// layer, in the spirit of a dependency-injection configuration class:
/// override the pieces you need, then call
/// [`create_database`](Self::create_database) once during startup.
pub trait DatabaseSupport {
    /// Connection configuration for this application.
    fn config(&self) -> DatabaseConfig;

    /// Dialect override. The default auto-detects from the configured URL.
    fn dialect(&self) -> Option<Arc<dyn Dialect>> {
        None
    }

    /// Override to register custom type conversions.
    fn register_type_conversions(&self, registry: &mut TypeConversionRegistry) {
        let _ = registry;
    }

    /// Override to perform custom setup once the database exists.
    fn setup_database(&self, database: &Database) {
        let _ = database;
    }

    /// Assemble the database from the given driver.
    fn create_database(&self, driver: Arc<dyn Driver>) -> Result<Database, DatabaseError> {
        let config = self.config();
        let dialect = match self.dialect() {
            Some(dialect) => dialect,
            None => config.resolve_dialect()?,
        };
        let database = Database::builder(driver)
            .dialect(dialect)
            .configure_conversions(|registry| self.register_type_conversions(registry))
            .build();
        self.setup_database(&database);
        Ok(database)
    }
}
