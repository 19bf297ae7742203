// 🧭 Service Categorizer - Wraparound service labels → stable slugs
// Membership rows are grouped per service; each agency appears once per
// service, carrying whatever contact/schedule detail the reconciler holds.

use crate::normalize::{clean_json_text, day_key, day_name, AppointmentFlag, TimeFormat};
use crate::reconciler::{AgencyRecord, Reconciler, AGENCY_ID, AGENCY_NAME};
use crate::sheet::{RawRow, Sheet};
use chrono::Weekday;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

pub const WRAPAROUND_SERVICE: &str = "Wraparound Service";

/// Label as it appears in the sheets → slug used by the front end.
/// Order here is the order of the published services list.
pub const SERVICE_TABLE: [(&str, &str); 14] = [
    ("Housing", "housing"),
    ("Financial assistance", "financial-assistance"),
    ("Financial advising", "financial-advising"),
    ("Non-food items", "non-food-items"),
    ("Behavioral Healthcare", "behavioral-healthcare"),
    ("Job training/ workforce development", "job-training"),
    ("Programming/ support for older adults", "older-adults"),
    ("Case management", "case-management"),
    ("Info on gov't benefits", "govt-benefits-info"),
    ("Childcare", "childcare"),
    ("Gov't benefits enrollment", "govt-benefits-enrollment"),
    ("Healthcare", "healthcare"),
    ("ESL", "esl"),
    ("Legal services", "legal-services"),
];

fn service_index(label: &str) -> Option<usize> {
    SERVICE_TABLE.iter().position(|(l, _)| *l == label)
}

pub fn service_slug(label: &str) -> Option<&'static str> {
    service_index(label).map(|i| SERVICE_TABLE[i].1)
}

// ============================================================================
// OUTPUT TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceEntry {
    pub id: &'static str,
    pub name: &'static str,
}

/// Day key → slot text, serialized in weekday order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayTextMap(Vec<(&'static str, String)>);

impl DayTextMap {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl Serialize for DayTextMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// One agency as listed under a service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceAgency {
    pub id: String,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub days_open: Vec<String>,
    pub hours: DayTextMap,
    pub appointment_needed: AppointmentFlag,
    /// Not present in any source sheet yet
    pub website: String,
}

impl ServiceAgency {
    fn new(id: String, name: String, details: Option<&AgencyRecord>) -> Self {
        let (days_open, hours) = details.map(open_days).unwrap_or_default();
        ServiceAgency {
            id,
            name,
            address: details.map(|d| d.address.clone()).unwrap_or_default(),
            phone: details.map(|d| d.phone.clone()).unwrap_or_default(),
            days_open,
            hours,
            appointment_needed: details
                .map(|d| d.appointment_needed)
                .unwrap_or(AppointmentFlag::Unknown),
            website: String::new(),
        }
    }

    pub fn has_details(&self) -> bool {
        !self.address.is_empty()
            || !self.phone.is_empty()
            || !self.days_open.is_empty()
            || !self.hours.is_empty()
    }

    fn same_agency(&self, id: &str, name: &str) -> bool {
        (!id.is_empty() && self.id == id)
            || (!name.is_empty() && self.name.to_lowercase() == name.to_lowercase())
    }
}

/// Recognized weekdays only, as ("Monday", …) and {"monday": "9:00 AM - 12:00 PM"}
fn open_days(record: &AgencyRecord) -> (Vec<String>, DayTextMap) {
    let mut by_day: BTreeMap<u32, (Weekday, Vec<String>)> = BTreeMap::new();
    for (label, slots) in record.hours.iter() {
        let Some(day) = label.weekday() else {
            continue;
        };
        let texts = &mut by_day
            .entry(day.number_from_monday())
            .or_insert_with(|| (day, Vec::new()))
            .1;
        for slot in slots {
            let text = slot.render(TimeFormat::TwelveHour, " - ");
            if !texts.contains(&text) {
                texts.push(text);
            }
        }
    }

    let days_open = by_day
        .values()
        .map(|(day, _)| day_name(*day).to_string())
        .collect();
    let hours = DayTextMap(
        by_day
            .into_values()
            .map(|(day, texts)| (day_key(day), texts.join(", ")))
            .collect(),
    );
    (days_open, hours)
}

// ============================================================================
// CATEGORIZER
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategorizerStats {
    pub rows_seen: usize,
    pub rows_unmapped: usize,
    pub rows_without_agency: usize,
    pub duplicate_memberships: usize,
    pub agencies_processed: usize,
    pub agencies_with_details: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipOutcome {
    Added,
    Duplicate,
    UnmappedService,
    NoAgency,
}

pub struct ServiceCategorizer {
    /// Parallel to SERVICE_TABLE
    members: Vec<Vec<ServiceAgency>>,
    stats: CategorizerStats,
}

impl ServiceCategorizer {
    pub fn new() -> Self {
        ServiceCategorizer {
            members: vec![Vec::new(); SERVICE_TABLE.len()],
            stats: CategorizerStats::default(),
        }
    }

    pub fn stats(&self) -> &CategorizerStats {
        &self.stats
    }

    pub fn add_sheet(&mut self, sheet: &Sheet, details: &Reconciler) -> usize {
        sheet
            .rows
            .iter()
            .filter(|row| self.add_membership(row, details) == MembershipOutcome::Added)
            .count()
    }

    pub fn add_membership(&mut self, row: &RawRow, details: &Reconciler) -> MembershipOutcome {
        self.stats.rows_seen += 1;

        let id = clean_json_text(row.get(AGENCY_ID));
        let name = clean_json_text(row.get(AGENCY_NAME));
        let label = clean_json_text(row.get(WRAPAROUND_SERVICE));

        let Some(index) = service_index(&label) else {
            self.stats.rows_unmapped += 1;
            tracing::trace!(line = row.line_number, label = %label, "unmapped service label");
            return MembershipOutcome::UnmappedService;
        };

        if id.is_empty() && name.is_empty() {
            self.stats.rows_without_agency += 1;
            return MembershipOutcome::NoAgency;
        }

        if self.members[index].iter().any(|a| a.same_agency(&id, &name)) {
            self.stats.duplicate_memberships += 1;
            return MembershipOutcome::Duplicate;
        }

        let record = details.lookup(&id, &name);
        self.stats.agencies_processed += 1;
        if record.is_some() {
            self.stats.agencies_with_details += 1;
        }

        let agency = ServiceAgency::new(id, name, record);
        if agency.has_details() {
            tracing::debug!(
                agency = %agency.name,
                service = SERVICE_TABLE[index].1,
                days = ?agency.days_open,
                "found details"
            );
        }
        self.members[index].push(agency);
        MembershipOutcome::Added
    }

    pub fn members(&self, slug: &str) -> &[ServiceAgency] {
        SERVICE_TABLE
            .iter()
            .position(|(_, s)| *s == slug)
            .map(|i| self.members[i].as_slice())
            .unwrap_or(&[])
    }

    /// Services with at least one agency, in table order
    pub fn populated(&self) -> impl Iterator<Item = (ServiceEntry, &[ServiceAgency])> {
        SERVICE_TABLE
            .iter()
            .zip(self.members.iter())
            .filter(|(_, agencies)| !agencies.is_empty())
            .map(|(&(name, id), agencies)| (ServiceEntry { id, name }, agencies.as_slice()))
    }

    /// Every service with its count, empty ones included, for the run summary
    pub fn counts(&self) -> Vec<(&'static str, usize)> {
        SERVICE_TABLE
            .iter()
            .zip(self.members.iter())
            .map(|((name, _), agencies)| (*name, agencies.len()))
            .collect()
    }
}

impl Default for ServiceCategorizer {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
