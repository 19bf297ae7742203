// End-to-end runs over small CSV fixtures in a scratch directory

use agency_consolidator::{run_agencies, run_services, HoursMode, PipelineConfig};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const HOURS_HEADER: &str = "Agency ID,Agency Name,Shipping Address,Phone,Day or Week,Starting Time,Ending Time,By Appointment Only,Food Pantry Requirements,Distribution Model,Food Format,Additional Note,Notes";

fn write(dir: &Path, name: &str, lines: &[&str]) {
    fs::write(dir.join(name), lines.join("\n") + "\n").unwrap();
}

fn fixture() -> (TempDir, PipelineConfig) {
    let temp = tempfile::tempdir().unwrap();
    let data = temp.path().join("data");
    fs::create_dir_all(&data).unwrap();

    write(
        &data,
        "markets_hoo.csv",
        &[
            HOURS_HEADER,
            "101,Pantry A,1 Main St,555-0100,Monday,9:00 AM,12:00 PM,No,Photo ID,Choice,Fresh,Closed holidays,Walk-ins welcome",
            "101,Pantry A,,,Wednesday,9:00 AM,12:00 PM,Yes,,,,,",
        ],
    );
    write(
        &data,
        "shopping_hoo.csv",
        &[
            HOURS_HEADER,
            "202,Market B,2 Oak Ave,,Friday,1:00 PM,3:00 PM,,,,,,",
            ",,3 Elm St,,Monday,9:00 AM,10:00 AM,,,,,,",
        ],
    );
    write(
        &data,
        "markets_cultures.csv",
        &[
            "Agency Name,Cultural Populations Served",
            "Pantry A,Latin American",
            "Pantry A,Latin American",
            "Unknown Agency,East African",
        ],
    );
    write(
        &data,
        "shopping_cultures.csv",
        &["Company Name,Cultures Served", "Market B,West African"],
    );
    write(
        &data,
        "markets_services.csv",
        &[
            "Agency ID,Agency Name,Wraparound Service",
            "101,PANTRY A,Housing",
            "101,Pantry A,Housing",
            "303,Clinic C,Healthcare",
            "101,Pantry A,Space travel",
        ],
    );
    write(
        &data,
        "shopping_services.csv",
        &[
            "Agency ID,Agency Name,Wraparound Service",
            "202,Market B,Info on gov\u{2019}t benefits",
        ],
    );

    let mut config = PipelineConfig::default();
    config.data_dir = data;
    config.output_dir = temp.path().join("out");
    config.inputs.markets_hours = "markets_hoo.csv".to_string();
    config.inputs.shopping_hours = "shopping_hoo.csv".to_string();
    config.inputs.markets_cultures = "markets_cultures.csv".to_string();
    config.inputs.shopping_cultures = "shopping_cultures.csv".to_string();
    config.inputs.markets_services = "markets_services.csv".to_string();
    config.inputs.shopping_services = "shopping_services.csv".to_string();

    (temp, config)
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

// ============================================================================
// AGENCIES
// ============================================================================

#[test]
fn test_agencies_run_merges_rows_per_agency() {
    let (_temp, config) = fixture();
    let summary = run_agencies(&config).unwrap();

    assert_eq!(summary.hours_rows, 4);
    assert_eq!(summary.agencies, 2);
    assert_eq!(summary.stats.rows_skipped, 1);
    assert_eq!(summary.stats.cultures_added, 2);

    let doc = read_json(&config.output(&config.outputs.agencies));
    let agencies = doc["agencies"].as_array().unwrap();
    assert_eq!(agencies[0]["name"], "Market B");
    assert_eq!(agencies[1]["name"], "Pantry A");

    let pantry = &agencies[1];
    assert_eq!(pantry["address"], "1 Main St");
    assert_eq!(pantry["phone"], "555-0100");
    assert_eq!(pantry["appointment_needed"], "Yes");
    assert_eq!(pantry["requirements"], "Photo ID");
    assert_eq!(pantry["distribution_model"], "Choice");
    assert_eq!(pantry["food_format"], "Fresh");
    assert_eq!(pantry["notes"], "Hours Notes: Closed holidays. Walk-ins welcome");
    assert_eq!(pantry["cultures_served"], serde_json::json!(["Latin American"]));
    assert_eq!(
        pantry["hours"]["Monday"],
        serde_json::json!([{"start": "09:00:00", "end": "12:00:00"}])
    );
    assert_eq!(
        pantry["hours"]["Wednesday"],
        serde_json::json!([{"start": "09:00:00", "end": "12:00:00"}])
    );

    let market = &agencies[0];
    assert_eq!(market["appointment_needed"], "No");
    assert_eq!(market["cultures_served"], serde_json::json!(["West African"]));
    assert!(market.get("food_format").is_none());
}

#[test]
fn test_agencies_output_is_deterministic() {
    let (_temp, config) = fixture();
    let first = run_agencies(&config).unwrap();
    let bytes = fs::read(&first.report.path).unwrap();
    let second = run_agencies(&config).unwrap();

    assert_eq!(first.report.sha256, second.report.sha256);
    assert_eq!(bytes, fs::read(&second.report.path).unwrap());
    assert!(bytes.is_ascii());
}

#[test]
fn test_agencies_display_hours() {
    let (_temp, mut config) = fixture();
    config.hours_mode = HoursMode::Display;
    run_agencies(&config).unwrap();

    let doc = read_json(&config.output(&config.outputs.agencies));
    let pantry = &doc["agencies"][1];
    assert_eq!(pantry["hours"], "Monday, Wednesday: 9:00 AM to 12:00 PM");
}

#[test]
fn test_missing_required_sheet_is_fatal() {
    let (_temp, config) = fixture();
    fs::remove_file(config.input(&config.inputs.shopping_cultures)).unwrap();

    assert!(run_agencies(&config).is_err());
    assert!(!config.output(&config.outputs.agencies).exists());
}

// ============================================================================
// SERVICES
// ============================================================================

#[test]
fn test_services_run_joins_details() {
    let (_temp, config) = fixture();
    let summary = run_services(&config).unwrap();

    assert!(summary.has_hours);
    assert_eq!(summary.membership_rows, 5);
    assert_eq!(summary.categorizer.rows_unmapped, 1);
    assert_eq!(summary.categorizer.duplicate_memberships, 1);
    assert_eq!(summary.services, 3);

    let doc = read_json(&config.output(&config.outputs.services));
    let ids: Vec<&str> = doc["services"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["housing", "govt-benefits-info", "healthcare"]);

    let housing = doc["agencyData"]["housing"].as_array().unwrap();
    assert_eq!(housing.len(), 1);
    assert_eq!(housing[0]["id"], "101");
    assert_eq!(housing[0]["address"], "1 Main St");
    assert_eq!(housing[0]["days_open"], serde_json::json!(["Monday", "Wednesday"]));
    assert_eq!(housing[0]["hours"]["monday"], "9:00 AM - 12:00 PM");
    assert_eq!(housing[0]["appointment_needed"], "Yes");

    let clinic = &doc["agencyData"]["healthcare"][0];
    assert_eq!(clinic["name"], "Clinic C");
    assert_eq!(clinic["address"], "");
    assert_eq!(clinic["appointment_needed"], "Unknown");

    let market = &doc["agencyData"]["govt-benefits-info"][0];
    assert_eq!(market["appointment_needed"], "Unknown");
    assert_eq!(market["days_open"], serde_json::json!(["Friday"]));

    assert!(doc["agencyData"].get("childcare").is_none());
    assert!(config.output(&config.outputs.services_sample).exists());
}

#[test]
fn test_services_run_without_hours() {
    let (_temp, config) = fixture();
    fs::remove_file(config.input(&config.inputs.markets_hours)).unwrap();

    let summary = run_services(&config).unwrap();
    assert!(!summary.has_hours);
    assert_eq!(summary.categorizer.agencies_with_details, 0);

    let doc = read_json(&config.output(&config.outputs.services));
    let housing = &doc["agencyData"]["housing"][0];
    assert_eq!(housing["name"], "PANTRY A");
    assert_eq!(housing["days_open"], serde_json::json!([]));
    assert_eq!(housing["hours"], serde_json::json!({}));
}

#[test]
fn test_missing_membership_sheet_is_fatal() {
    let (_temp, config) = fixture();
    fs::remove_file(config.input(&config.inputs.markets_services)).unwrap();
    assert!(run_services(&config).is_err());
}
