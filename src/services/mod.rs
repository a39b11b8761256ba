//! Concrete collaborators for the file scanner

pub mod catalog;
pub mod checkpoints;
pub mod reporter;

use std::sync::Arc;

pub use catalog::SqliteCatalog;
pub use checkpoints::{CHECKPOINT_KEY, SettingsCheckpointStore};
pub use reporter::{FailureCounts, TracingFailureReporter};

use crate::db::Database;
use crate::media::LoftyTagReader;
use crate::scanner::Scanner;

/// Create the file scanner wired to the database and lofty
pub fn create_scanner(db: Database, reporter: Arc<TracingFailureReporter>) -> Arc<Scanner> {
    Arc::new(Scanner::new(
        Arc::new(SqliteCatalog::new(db.clone())),
        Arc::new(LoftyTagReader::new()),
        Arc::new(SettingsCheckpointStore::new(db)),
        reporter,
    ))
}
