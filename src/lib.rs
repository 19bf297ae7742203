// Agency Consolidator - Core Library
// Exposes the reconciliation core for the binary and the integration tests

pub mod error;
pub mod config;
pub mod sheet;          // Tabular input: xlsx/xls/ods/csv → rows
pub mod columns;        // Column Resolver
pub mod normalize;      // Field Normalizer
pub mod schedule;       // Time slots, weekly hours, Schedule Formatter
pub mod reconciler;     // Agency Reconciler
pub mod services;       // Service Categorizer
pub mod document;       // Document Assembler + JSON writer
pub mod pipeline;       // Agencies and services runs

// Re-export commonly used types
pub use error::PipelineError;
pub use config::{PipelineConfig, InputFiles, OutputFiles};
pub use sheet::{CellValue, RawRow, Sheet, load_sheet};
pub use columns::{ColumnConcept, ColumnResolver};
pub use normalize::{
    AppointmentFlag, FlagKind, SlotTime, TimeFormat,
    clean_text, clean_json_text, format_time, normalize_flag, match_day,
};
pub use schedule::{DayLabel, TimeSlot, WeeklyHours, format_schedule};
pub use reconciler::{
    AgencyKey, AgencyRecord, HoursColumns, IngestOutcome, IngestStats,
    KeyingStrategy, Reconciler,
};
pub use services::{
    CategorizerStats, MembershipOutcome, ServiceAgency, ServiceCategorizer, ServiceEntry,
    SERVICE_TABLE, service_slug,
};
pub use document::{
    AgencyDocument, AgencyEntry, DocumentReport, HoursMode, SampleDocument, ServicesDocument,
    assemble_agencies, assemble_sample, assemble_services, to_ascii_json, write_document,
};
pub use pipeline::{
    AgencyRunSummary, ServicesRunSummary,
    build_agencies, build_services, run_agencies, run_services,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
