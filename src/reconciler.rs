// 🔗 Agency Reconciler - Many spreadsheet rows → one record per agency
//
// Rows describing the same agency arrive from several sheets, keyed
// inconsistently (numeric ID on one sheet, name on another). The reconciler
// owns the lookup maps for one run and folds each row into its record with a
// back-fill-only merge: a filled field is never overwritten, an empty field is
// filled by the first row that has it, and "Yes" wins for appointments.

use crate::columns::{
    ColumnConcept, ColumnResolver, CULTURES_SERVED, CULTURE_AGENCY_NAME, DISTRIBUTION_MODEL,
    FOOD_FORMAT, HOURS_NOTES,
};
use crate::normalize::{clean_json_text, normalize_flag, AppointmentFlag, FlagKind, SlotTime};
use crate::schedule::{DayLabel, TimeSlot, WeeklyHours};
use crate::sheet::{RawRow, Sheet};
use serde::Serialize;
use std::collections::HashMap;

// ============================================================================
// FIXED COLUMNS
// ============================================================================

pub const AGENCY_NAME: &str = "Agency Name";
pub const AGENCY_ID: &str = "Agency ID";
pub const EXTERNAL_ID: &str = "External ID";
pub const SHIPPING_ADDRESS: &str = "Shipping Address";
pub const PHONE: &str = "Phone";
pub const DAY_OR_WEEK: &str = "Day or Week";
pub const STARTING_TIME: &str = "Starting Time";
pub const ENDING_TIME: &str = "Ending Time";
pub const BY_APPOINTMENT_ONLY: &str = "By Appointment Only";
pub const PANTRY_REQUIREMENTS: &str = "Food Pantry Requirements";
pub const NOTES: &str = "Notes";

/// Columns whose header text varies between exports, resolved once per sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoursColumns {
    pub distribution_model: String,
    pub food_format: String,
    pub hours_notes: String,
}

impl HoursColumns {
    pub fn resolve(headers: &[String]) -> Self {
        let resolver = ColumnResolver::new(headers);
        HoursColumns {
            distribution_model: resolver.resolve(&DISTRIBUTION_MODEL),
            food_format: resolver.resolve(&FOOD_FORMAT),
            hours_notes: resolver.resolve(&HOURS_NOTES),
        }
    }
}

impl Default for HoursColumns {
    fn default() -> Self {
        let default = |c: &ColumnConcept| c.default.to_string();
        HoursColumns {
            distribution_model: default(&DISTRIBUTION_MODEL),
            food_format: default(&FOOD_FORMAT),
            hours_notes: default(&HOURS_NOTES),
        }
    }
}

// ============================================================================
// KEYS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyingStrategy {
    /// One map keyed by the cleaned name
    NameOnly,
    /// By-ID and by-name (case-folded) maps, kept pointing at the same records
    Dual,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AgencyKey {
    Id(String),
    Name(String),
}

// ============================================================================
// AGENCY RECORD
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgencyRecord {
    /// First non-empty ID seen ("Agency ID" or "External ID")
    pub id: String,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub hours: WeeklyHours,
    pub appointment_needed: AppointmentFlag,
    pub requirements: String,
    pub distribution_model: String,
    pub general_notes: String,
    pub hours_notes: String,
    /// Unique, in first-seen order
    pub cultures_served: Vec<String>,
    pub food_format: String,
}

fn backfill(field: &mut String, candidate: &str) {
    if field.is_empty() && !candidate.is_empty() {
        *field = candidate.to_string();
    }
}

impl AgencyRecord {
    /// Field-wise join: empty ⊑ non-empty, Unknown ⊑ No ⊑ Yes, schedules and
    /// cultures union. `old` keeps every value it already has.
    pub fn merge(old: AgencyRecord, new: &AgencyRecord) -> AgencyRecord {
        let mut merged = old;
        backfill(&mut merged.id, &new.id);
        backfill(&mut merged.name, &new.name);
        backfill(&mut merged.address, &new.address);
        backfill(&mut merged.phone, &new.phone);
        backfill(&mut merged.requirements, &new.requirements);
        backfill(&mut merged.distribution_model, &new.distribution_model);
        backfill(&mut merged.general_notes, &new.general_notes);
        backfill(&mut merged.hours_notes, &new.hours_notes);
        backfill(&mut merged.food_format, &new.food_format);
        merged.hours.absorb(&new.hours);
        merged.appointment_needed = merged.appointment_needed.join(new.appointment_needed);
        for culture in &new.cultures_served {
            merged.add_culture(culture);
        }
        merged
    }

    pub fn add_culture(&mut self, culture: &str) -> bool {
        if culture.is_empty() || self.cultures_served.iter().any(|c| c == culture) {
            return false;
        }
        self.cultures_served.push(culture.to_string());
        true
    }

    /// Hours notes folded in front of the general notes
    pub fn notes(&self) -> String {
        match (self.hours_notes.is_empty(), self.general_notes.is_empty()) {
            (false, false) => format!("Hours Notes: {}. {}", self.hours_notes, self.general_notes),
            (false, true) => format!("Hours Notes: {}", self.hours_notes),
            _ => self.general_notes.clone(),
        }
    }

    pub fn has_details(&self) -> bool {
        !self.address.is_empty() || !self.phone.is_empty() || !self.hours.is_empty()
    }
}

// ============================================================================
// ROW OBSERVATION
// ============================================================================

/// What a single hours row says about an agency
#[derive(Debug, Clone)]
pub struct Observation {
    pub id: String,
    pub record: AgencyRecord,
    pub has_hours: bool,
}

/// ID from "Agency ID", else "External ID"
pub fn row_agency_id(row: &RawRow) -> String {
    [AGENCY_ID, EXTERNAL_ID]
        .iter()
        .map(|column| clean_json_text(row.get(column)))
        .find(|id| !id.is_empty())
        .unwrap_or_default()
}

pub fn observe(row: &RawRow, columns: &HoursColumns, flag_kind: FlagKind) -> Observation {
    let id = row_agency_id(row);

    let mut record = AgencyRecord {
        id: id.clone(),
        name: clean_json_text(row.get(AGENCY_NAME)),
        address: clean_json_text(row.get(SHIPPING_ADDRESS)),
        phone: clean_json_text(row.get(PHONE)),
        appointment_needed: normalize_flag(row.get(BY_APPOINTMENT_ONLY), flag_kind),
        requirements: clean_json_text(row.get(PANTRY_REQUIREMENTS)),
        distribution_model: clean_json_text(row.get(&columns.distribution_model)),
        general_notes: clean_json_text(row.get(NOTES)),
        food_format: clean_json_text(row.get(&columns.food_format)),
        ..AgencyRecord::default()
    };
    record.hours_notes = clean_json_text(row.get(&columns.hours_notes));

    // Day, start and end all present, or no hours at all
    let day = clean_json_text(row.get(DAY_OR_WEEK));
    let start = SlotTime::from_cell(row.get(STARTING_TIME));
    let end = SlotTime::from_cell(row.get(ENDING_TIME));
    let has_hours = match (day.is_empty(), start, end) {
        (false, Some(start), Some(end)) => {
            record
                .hours
                .add_slot(DayLabel::new(&day), TimeSlot::new(start, end));
            true
        }
        _ => false,
    };

    Observation {
        id,
        record,
        has_hours,
    }
}

// ============================================================================
// RECONCILER
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub rows_seen: usize,
    pub rows_skipped: usize,
    pub rows_without_hours: usize,
    pub missing_address: usize,
    pub missing_phone: usize,
    pub records_unified: usize,
    pub cultures_added: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Created,
    Merged,
    /// No usable key: no name, and no ID under dual keying
    Skipped,
}

pub struct Reconciler {
    strategy: KeyingStrategy,
    flag_kind: FlagKind,
    /// Slots are emptied when two records turn out to be one agency
    records: Vec<Option<AgencyRecord>>,
    by_id: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
    stats: IngestStats,
}

impl Reconciler {
    pub fn new(strategy: KeyingStrategy, flag_kind: FlagKind) -> Self {
        Reconciler {
            strategy,
            flag_kind,
            records: Vec::new(),
            by_id: HashMap::new(),
            by_name: HashMap::new(),
            stats: IngestStats::default(),
        }
    }

    /// Name-keyed, two-state appointment flag: the agencies document
    pub fn name_only() -> Self {
        Self::new(KeyingStrategy::NameOnly, FlagKind::TwoState)
    }

    /// ID-and-name keyed, three-state appointment flag: the services join
    pub fn dual() -> Self {
        Self::new(KeyingStrategy::Dual, FlagKind::ThreeState)
    }

    pub fn strategy(&self) -> KeyingStrategy {
        self.strategy
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    fn name_key(&self, name: &str) -> String {
        match self.strategy {
            KeyingStrategy::NameOnly => name.to_string(),
            KeyingStrategy::Dual => name.to_lowercase(),
        }
    }

    /// Ingest every row of an hours-of-operation sheet
    pub fn ingest_sheet(&mut self, sheet: &Sheet) -> usize {
        let columns = HoursColumns::resolve(&sheet.headers);
        tracing::info!(
            source = %sheet.source.display(),
            distribution = %columns.distribution_model,
            food_format = %columns.food_format,
            hours_notes = %columns.hours_notes,
            "resolved hours columns"
        );

        sheet
            .rows
            .iter()
            .filter(|row| self.ingest(row, &columns) != IngestOutcome::Skipped)
            .count()
    }

    pub fn ingest(&mut self, row: &RawRow, columns: &HoursColumns) -> IngestOutcome {
        let observation = observe(row, columns, self.flag_kind);
        self.stats.rows_seen += 1;
        let missing_address = observation.record.address.is_empty();
        let missing_phone = observation.record.phone.is_empty();
        let has_hours = observation.has_hours;

        let outcome = self.absorb(observation);
        if outcome == IngestOutcome::Skipped {
            self.stats.rows_skipped += 1;
            tracing::debug!(line = row.line_number, "row has no resolvable agency, skipping");
            return outcome;
        }

        // Gaps are counted for kept rows only
        self.stats.missing_address += usize::from(missing_address);
        self.stats.missing_phone += usize::from(missing_phone);
        self.stats.rows_without_hours += usize::from(!has_hours);
        outcome
    }

    fn absorb(&mut self, observation: Observation) -> IngestOutcome {
        let Observation { id, record, .. } = observation;
        let keys = self.keys_for(&id, &record.name);

        let mut id_hit = None;
        let mut name_hit = None;
        for key in &keys {
            match key {
                AgencyKey::Id(id) => id_hit = self.by_id.get(id).copied(),
                AgencyKey::Name(name) => name_hit = self.by_name.get(name).copied(),
            }
        }

        let (index, outcome) = match (id_hit, name_hit) {
            (Some(a), Some(b)) if a != b => (self.unify(a, b), IngestOutcome::Merged),
            (Some(a), _) => (a, IngestOutcome::Merged),
            (None, Some(b)) => (b, IngestOutcome::Merged),
            (None, None) => {
                // Dual keying opens a record from an ID alone; the name back-fills later
                if keys.is_empty() {
                    return IngestOutcome::Skipped;
                }
                self.records.push(None);
                (self.records.len() - 1, IngestOutcome::Created)
            }
        };

        let existing = self.records[index].take().unwrap_or_default();
        self.records[index] = Some(AgencyRecord::merge(existing, &record));

        // Both maps point at the record before the next row is read
        for key in keys {
            match key {
                AgencyKey::Id(id) => self.by_id.insert(id, index),
                AgencyKey::Name(name) => self.by_name.insert(name, index),
            };
        }

        outcome
    }

    /// Fold record `b` into `a` and repoint every key that named `b`
    fn unify(&mut self, a: usize, b: usize) -> usize {
        if let Some(absorbed) = self.records[b].take() {
            let kept = self.records[a].take().unwrap_or_default();
            self.records[a] = Some(AgencyRecord::merge(kept, &absorbed));
        }
        for index in self.by_id.values_mut().chain(self.by_name.values_mut()) {
            if *index == b {
                *index = a;
            }
        }
        self.stats.records_unified += 1;
        tracing::debug!(kept = a, absorbed = b, "ID and name pointed at different records, unified");
        a
    }

    /// Attach a culture to an already-known agency; unknown agencies are ignored
    pub fn ingest_culture(&mut self, name: &str, culture: &str) -> bool {
        if name.is_empty() || culture.is_empty() {
            return false;
        }
        let key = self.name_key(name);
        let Some(&index) = self.by_name.get(&key) else {
            return false;
        };
        let added = self.records[index]
            .as_mut()
            .map(|record| record.add_culture(culture))
            .unwrap_or(false);
        if added {
            self.stats.cultures_added += 1;
        }
        added
    }

    /// Ingest a cultures-served sheet ("Agency Name"/"Company Name" + cultures column)
    pub fn ingest_cultures_sheet(&mut self, sheet: &Sheet) -> usize {
        let resolver = ColumnResolver::new(&sheet.headers);
        let name_column = resolver.resolve(&CULTURE_AGENCY_NAME);
        let culture_column = resolver.resolve(&CULTURES_SERVED);
        tracing::info!(
            source = %sheet.source.display(),
            name = %name_column,
            cultures = %culture_column,
            "resolved cultures columns"
        );

        sheet
            .rows
            .iter()
            .filter(|row| {
                let name = clean_json_text(row.get(&name_column));
                let culture = clean_json_text(row.get(&culture_column));
                self.ingest_culture(&name, &culture)
            })
            .count()
    }

    /// Lookup keys for a row, ID first, then name
    pub fn keys_for(&self, id: &str, name: &str) -> Vec<AgencyKey> {
        let mut keys = Vec::with_capacity(2);
        let id = id.trim();
        if self.strategy == KeyingStrategy::Dual && !id.is_empty() {
            keys.push(AgencyKey::Id(id.to_string()));
        }
        let name_key = self.name_key(name.trim());
        if !name_key.is_empty() {
            keys.push(AgencyKey::Name(name_key));
        }
        keys
    }

    pub fn get(&self, key: &AgencyKey) -> Option<&AgencyRecord> {
        let index = match key {
            AgencyKey::Id(id) => self.by_id.get(id),
            AgencyKey::Name(name) => self.by_name.get(name),
        }?;
        self.records[*index].as_ref()
    }

    /// ID first, then name
    pub fn lookup(&self, id: &str, name: &str) -> Option<&AgencyRecord> {
        self.keys_for(id, name)
            .iter()
            .find_map(|key| self.get(key))
    }

    pub fn id_count(&self) -> usize {
        self.by_id.len()
    }

    pub fn name_count(&self) -> usize {
        self.by_name.len()
    }

    pub fn len(&self) -> usize {
        self.records.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records in creation order
    pub fn records(&self) -> impl Iterator<Item = &AgencyRecord> {
        self.records.iter().flatten()
    }

    pub fn into_records(self) -> Vec<AgencyRecord> {
        self.records.into_iter().flatten().collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
