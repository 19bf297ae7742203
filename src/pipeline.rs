// 🚚 Pipelines - Spreadsheets in, JSON documents out
//
// Two runs share the same reconciliation core:
//   agencies: hours + cultures sheets → agencies.json (name-keyed)
//   services: wraparound-service sheets joined with hours → services.json
//             and services_sample.json (ID-and-name keyed)
// Each run starts from an empty reconciler and overwrites its outputs.

use crate::config::PipelineConfig;
use crate::document::{
    assemble_agencies, assemble_sample, assemble_services, write_document, AgencyDocument,
    DocumentReport, SampleDocument, ServicesDocument,
};
use crate::reconciler::{IngestStats, Reconciler};
use crate::services::{CategorizerStats, ServiceCategorizer};
use crate::sheet::{load_sheet, Sheet};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

fn load_required(path: &Path, what: &str) -> Result<Sheet> {
    let sheet = load_sheet(path).with_context(|| format!("Failed to load {} sheet", what))?;
    tracing::info!(source = %path.display(), rows = sheet.len(), "loaded {} sheet", what);
    Ok(sheet)
}

fn ensure_output_dir(config: &PipelineConfig) -> Result<()> {
    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output_dir.display()
        )
    })
}

// ============================================================================
// AGENCIES RUN
// ============================================================================

#[derive(Debug, Clone)]
pub struct AgencyBuild {
    pub document: AgencyDocument,
    pub hours_rows: usize,
    pub culture_rows: usize,
    pub stats: IngestStats,
}

/// Read and reconcile; no files are written
pub fn build_agencies(config: &PipelineConfig) -> Result<AgencyBuild> {
    let markets_hours = load_required(&config.input(&config.inputs.markets_hours), "markets hours")?;
    let shopping_hours =
        load_required(&config.input(&config.inputs.shopping_hours), "shopping partners hours")?;
    let markets_cultures =
        load_required(&config.input(&config.inputs.markets_cultures), "markets cultures")?;
    let shopping_cultures = load_required(
        &config.input(&config.inputs.shopping_cultures),
        "shopping partners cultures",
    )?;

    let mut reconciler = Reconciler::name_only();
    reconciler.ingest_sheet(&markets_hours);
    reconciler.ingest_sheet(&shopping_hours);
    reconciler.ingest_cultures_sheet(&markets_cultures);
    reconciler.ingest_cultures_sheet(&shopping_cultures);

    let document = assemble_agencies(reconciler.records(), config.hours_mode);
    Ok(AgencyBuild {
        document,
        hours_rows: markets_hours.len() + shopping_hours.len(),
        culture_rows: markets_cultures.len() + shopping_cultures.len(),
        stats: reconciler.stats().clone(),
    })
}

#[derive(Debug, Clone)]
pub struct AgencyRunSummary {
    pub hours_rows: usize,
    pub culture_rows: usize,
    pub agencies: usize,
    pub stats: IngestStats,
    pub report: DocumentReport,
}

pub fn run_agencies(config: &PipelineConfig) -> Result<AgencyRunSummary> {
    let build = build_agencies(config)?;
    ensure_output_dir(config)?;

    let path = config.output(&config.outputs.agencies);
    let report = write_document(&path, &build.document)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(AgencyRunSummary {
        hours_rows: build.hours_rows,
        culture_rows: build.culture_rows,
        agencies: build.document.agencies.len(),
        stats: build.stats,
        report,
    })
}

// ============================================================================
// SERVICES RUN
// ============================================================================

#[derive(Debug, Clone)]
pub struct ServicesBuild {
    pub document: ServicesDocument,
    pub sample: SampleDocument,
    pub membership_rows: usize,
    /// False when the hours sheets could not be read
    pub has_hours: bool,
    pub ingest: IngestStats,
    pub categorizer: CategorizerStats,
    /// (service label, agency count) for every service, empty ones included
    pub counts: Vec<(&'static str, usize)>,
}

/// The hours sheets are optional here: without them agencies are listed with
/// empty contact and schedule fields.
fn load_optional_hours(config: &PipelineConfig) -> Option<(Sheet, Sheet)> {
    let markets = load_sheet(&config.input(&config.inputs.markets_hours));
    let shopping = load_sheet(&config.input(&config.inputs.shopping_hours));
    match (markets, shopping) {
        (Ok(markets), Ok(shopping)) => {
            tracing::info!(
                markets_rows = markets.len(),
                shopping_rows = shopping.len(),
                "loaded hours of operation data"
            );
            Some((markets, shopping))
        }
        (Err(err), _) | (_, Err(err)) => {
            tracing::warn!(error = %err, "could not load hours of operation data, continuing without it");
            None
        }
    }
}

pub fn build_services(config: &PipelineConfig) -> Result<ServicesBuild> {
    let markets_services =
        load_required(&config.input(&config.inputs.markets_services), "markets services")?;
    let shopping_services = load_required(
        &config.input(&config.inputs.shopping_services),
        "shopping partners services",
    )?;

    let mut reconciler = Reconciler::dual();
    let hours = load_optional_hours(config);
    if let Some((markets, shopping)) = &hours {
        reconciler.ingest_sheet(markets);
        reconciler.ingest_sheet(shopping);
        tracing::info!(
            agencies = reconciler.len(),
            by_id = reconciler.id_count(),
            by_name = reconciler.name_count(),
            "agency details indexed"
        );
    }

    let mut categorizer = ServiceCategorizer::new();
    categorizer.add_sheet(&markets_services, &reconciler);
    categorizer.add_sheet(&shopping_services, &reconciler);

    Ok(ServicesBuild {
        document: assemble_services(&categorizer),
        sample: assemble_sample(&categorizer, config.sample_size),
        membership_rows: markets_services.len() + shopping_services.len(),
        has_hours: hours.is_some(),
        ingest: reconciler.stats().clone(),
        categorizer: categorizer.stats().clone(),
        counts: categorizer.counts(),
    })
}

#[derive(Debug, Clone)]
pub struct ServicesRunSummary {
    pub membership_rows: usize,
    pub has_hours: bool,
    pub services: usize,
    pub ingest: IngestStats,
    pub categorizer: CategorizerStats,
    pub counts: Vec<(&'static str, usize)>,
    pub report: DocumentReport,
    pub sample_report: DocumentReport,
}

pub fn run_services(config: &PipelineConfig) -> Result<ServicesRunSummary> {
    let build = build_services(config)?;
    ensure_output_dir(config)?;

    let path = config.output(&config.outputs.services);
    let report = write_document(&path, &build.document)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    let sample_path = config.output(&config.outputs.services_sample);
    let sample_report = write_document(&sample_path, &build.sample)
        .with_context(|| format!("Failed to write {}", sample_path.display()))?;

    Ok(ServicesRunSummary {
        membership_rows: build.membership_rows,
        has_hours: build.has_hours,
        services: build.document.services.len(),
        ingest: build.ingest,
        categorizer: build.categorizer,
        counts: build.counts,
        report,
        sample_report,
    })
}
