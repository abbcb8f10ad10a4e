//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod alias;
pub mod import;
pub mod logging;
pub mod migration;
pub mod reconcile;
mod report;
pub mod resolve;
mod status;

pub use alias::{AliasResult, AliasService};
pub use import::{FileSummary, ImportBatch, ImportService};
pub use logging::{LogEntry, LogEvent, LogStats, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use reconcile::{BatchState, ReconcileBatch, ReconcileReport, ReconcileService};
pub use report::{write_records, ReportService};
pub use resolve::{
    parse_keep_response, prompt_text, AutomaticResolver, DuplicateResolver, InteractiveResolver,
    ResponseSource, ScriptedResponses,
};
pub use status::{DateRange, StatusService, StatusSummary};
