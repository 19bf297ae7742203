use anyhow::Result;
use tracing_subscriber::EnvFilter;

use agency_consolidator::{run_agencies, run_services, PipelineConfig, VERSION};

fn main() -> Result<()> {
    // RUST_LOG=debug shows per-row skips and column choices
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let config = PipelineConfig::load()?;
    tracing::info!(
        version = VERSION,
        data_dir = %config.data_dir.display(),
        output_dir = %config.output_dir.display(),
        hours_mode = ?config.hours_mode,
        "starting agency data processing"
    );

    agencies(&config)?;
    services(&config)?;

    Ok(())
}

fn agencies(config: &PipelineConfig) -> Result<()> {
    println!("🏪 Agencies - hours of operation + cultures served");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let summary = run_agencies(config)?;

    println!("✓ Loaded {} hours rows, {} cultures rows", summary.hours_rows, summary.culture_rows);
    println!("✓ Skipped {} rows without an agency name", summary.stats.rows_skipped);
    println!("✓ Attached {} cultures", summary.stats.cultures_added);
    println!("✓ Processed {} agencies", summary.agencies);
    println!(
        "💾 Saved {} ({} bytes, sha256 {})",
        summary.report.path.display(),
        summary.report.bytes,
        summary.report.sha256
    );
    if summary.report.used_fallback {
        println!("⚠️  Written with the fallback encoder");
    }
    println!();

    Ok(())
}

fn services(config: &PipelineConfig) -> Result<()> {
    println!("🧭 Services - wraparound services by agency");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let summary = run_services(config)?;

    if summary.has_hours {
        println!("Agency data summary:");
        println!("- Hours rows processed: {}", summary.ingest.rows_seen);
        println!("- Rows with missing address: {}", summary.ingest.missing_address);
        println!("- Rows with missing phone: {}", summary.ingest.missing_phone);
        println!("- Rows with missing hours: {}", summary.ingest.rows_without_hours);
    } else {
        println!("⚠️  No hours of operation data; agencies listed without details");
    }

    println!("Agency processing summary:");
    println!("- Total unique agencies processed: {}", summary.categorizer.agencies_processed);
    println!("- Agencies with details: {}", summary.categorizer.agencies_with_details);
    println!("- Rows with unmapped services: {}", summary.categorizer.rows_unmapped);

    println!("✓ Processed {} rows", summary.membership_rows);
    println!("✓ Created {} services", summary.services);
    for report in [&summary.report, &summary.sample_report] {
        println!(
            "💾 Saved {} ({} bytes, sha256 {})",
            report.path.display(),
            report.bytes,
            report.sha256
        );
        if report.used_fallback {
            println!("⚠️  Written with the fallback encoder");
        }
    }

    println!("\nAgencies per service:");
    for (service, count) in &summary.counts {
        println!("{}: {} agencies", service, count);
    }

    Ok(())
}
