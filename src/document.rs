// 📦 Document Assembler - Reconciled data → the JSON documents the site loads
//
// Output is pretty-printed (2-space indent) with every non-ASCII character
// escaped as \uXXXX, so the files are byte-stable across platforms and runs.

use crate::error::PipelineError;
use crate::normalize::{sanitize_json_str, AppointmentFlag, TimeFormat};
use crate::reconciler::AgencyRecord;
use crate::services::{ServiceAgency, ServiceCategorizer, ServiceEntry};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::ser::{Formatter, PrettyFormatter};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

// ============================================================================
// AGENCY DOCUMENT
// ============================================================================

/// How `hours` is emitted in the agencies document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HoursMode {
    /// {"Monday": [{"start": "09:00:00", "end": "12:00:00"}]}
    #[default]
    Structured,
    /// "Monday–Wednesday: 9:00 AM to 12:00 PM"
    Display,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotJson {
    pub start: String,
    pub end: String,
}

/// Day label → slots, in weekday order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredHours(pub Vec<(String, Vec<SlotJson>)>);

impl Serialize for StructuredHours {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (day, slots) in &self.0 {
            map.serialize_entry(day, slots)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HoursField {
    Structured(StructuredHours),
    Display(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgencyEntry {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub hours: HoursField,
    pub appointment_needed: AppointmentFlag,
    pub requirements: String,
    pub distribution_model: String,
    pub notes: String,
    pub cultures_served: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub food_format: Option<String>,
}

impl AgencyEntry {
    pub fn from_record(record: &AgencyRecord, mode: HoursMode) -> Self {
        let hours = match mode {
            HoursMode::Structured => HoursField::Structured(StructuredHours(
                record
                    .hours
                    .iter()
                    .map(|(day, slots)| {
                        let slots = slots
                            .iter()
                            .map(|slot| SlotJson {
                                start: slot.start.render(TimeFormat::TwentyFourHour),
                                end: slot.end.render(TimeFormat::TwentyFourHour),
                            })
                            .collect();
                        (day.label().to_string(), slots)
                    })
                    .collect(),
            )),
            HoursMode::Display => HoursField::Display(record.hours.to_display()),
        };

        AgencyEntry {
            name: record.name.clone(),
            address: record.address.clone(),
            phone: record.phone.clone(),
            hours,
            appointment_needed: record.appointment_needed,
            requirements: record.requirements.clone(),
            distribution_model: record.distribution_model.clone(),
            notes: record.notes(),
            cultures_served: record.cultures_served.clone(),
            food_format: if record.food_format.is_empty() {
                None
            } else {
                Some(record.food_format.clone())
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgencyDocument {
    pub agencies: Vec<AgencyEntry>,
}

/// Agencies sorted by name; ties keep ingestion order
pub fn assemble_agencies<'a, I>(records: I, mode: HoursMode) -> AgencyDocument
where
    I: IntoIterator<Item = &'a AgencyRecord>,
{
    let mut agencies: Vec<AgencyEntry> = records
        .into_iter()
        .map(|record| AgencyEntry::from_record(record, mode))
        .collect();
    agencies.sort_by(|a, b| a.name.cmp(&b.name));
    AgencyDocument { agencies }
}

// ============================================================================
// SERVICES DOCUMENT
// ============================================================================

/// slug → member agencies, in service table order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServiceAgencyMap(pub Vec<(&'static str, Vec<ServiceAgency>)>);

impl Serialize for ServiceAgencyMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (slug, agencies) in &self.0 {
            map.serialize_entry(slug, agencies)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServicesDocument {
    pub services: Vec<ServiceEntry>,
    #[serde(rename = "agencyData")]
    pub agency_data: ServiceAgencyMap,
}

pub fn assemble_services(categorizer: &ServiceCategorizer) -> ServicesDocument {
    let mut services = Vec::new();
    let mut agency_data = Vec::new();
    for (entry, agencies) in categorizer.populated() {
        agency_data.push((entry.id, agencies.to_vec()));
        services.push(entry);
    }
    ServicesDocument {
        services,
        agency_data: ServiceAgencyMap(agency_data),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleDocument {
    pub sample: ServiceAgencyMap,
}

/// Up to `per_service` agencies per service, preferring ones with details
pub fn assemble_sample(categorizer: &ServiceCategorizer, per_service: usize) -> SampleDocument {
    let sample = categorizer
        .populated()
        .map(|(entry, agencies)| {
            let mut picked: Vec<ServiceAgency> = agencies
                .iter()
                .filter(|a| a.has_details())
                .take(per_service)
                .cloned()
                .collect();
            if picked.is_empty() {
                picked = agencies.iter().take(per_service).cloned().collect();
            }
            (entry.id, picked)
        })
        .collect();
    SampleDocument {
        sample: ServiceAgencyMap(sample),
    }
}

// ============================================================================
// JSON ENCODING
// ============================================================================

/// PrettyFormatter that escapes everything outside ASCII
pub struct AsciiPrettyFormatter {
    inner: PrettyFormatter<'static>,
}

impl AsciiPrettyFormatter {
    pub fn new() -> Self {
        AsciiPrettyFormatter {
            inner: PrettyFormatter::with_indent(b"  "),
        }
    }
}

impl Default for AsciiPrettyFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for AsciiPrettyFormatter {
    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.inner.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_value(writer)
    }

    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut units = [0u16; 2];
        for c in fragment.chars() {
            if c.is_ascii() {
                writer.write_all(&[c as u8])?;
            } else {
                for unit in c.encode_utf16(&mut units).iter() {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

pub fn to_ascii_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, AsciiPrettyFormatter::new());
    value.serialize(&mut serializer)?;
    Ok(out)
}

/// Value-level re-encode used when the direct write fails: strips control
/// characters and curly quotes from every string and key
fn coerce_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_json_str(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(coerce_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (sanitize_json_str(&k), coerce_value(v)))
                .collect(),
        ),
        other => other,
    }
}

// ============================================================================
// WRITING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReport {
    pub path: PathBuf,
    pub bytes: usize,
    /// SHA-256 of the written bytes; equal across runs on equal input
    pub sha256: String,
    pub used_fallback: bool,
}

fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn write_direct<T: Serialize + ?Sized>(path: &Path, document: &T) -> Result<Vec<u8>, PipelineError> {
    let bytes = to_ascii_json(document)?;
    fs::write(path, &bytes)?;
    Ok(bytes)
}

/// Re-encode through `serde_json::Value`, write beside the target, then rename
fn write_fallback<T: Serialize + ?Sized>(path: &Path, document: &T) -> Result<Vec<u8>, PipelineError> {
    let value = coerce_value(serde_json::to_value(document)?);
    let bytes = to_ascii_json(&value)?;
    let staging = path.with_extension("json.partial");
    fs::write(&staging, &bytes)?;
    fs::rename(&staging, path)?;
    Ok(bytes)
}

/// Write a document; on failure retry once through the fallback encoder
pub fn write_document<T: Serialize + ?Sized>(
    path: &Path,
    document: &T,
) -> Result<DocumentReport, PipelineError> {
    let (bytes, used_fallback) = match write_direct(path, document) {
        Ok(bytes) => (bytes, false),
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "standard JSON write failed, retrying with fallback encoder"
            );
            let bytes = write_fallback(path, document).map_err(|fallback_err| {
                tracing::error!(
                    path = %path.display(),
                    error = %fallback_err,
                    "fallback JSON write failed"
                );
                fallback_err
            })?;
            (bytes, true)
        }
    };

    Ok(DocumentReport {
        path: path.to_path_buf(),
        bytes: bytes.len(),
        sha256: digest(&bytes),
        used_fallback,
    })
}

// ============================================================================
// TESTS
// ============================================================================
