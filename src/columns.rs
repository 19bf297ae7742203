// 🔎 Column Resolver - Find a concept among inconsistently named headers
// Headers differ between exports ("Distribution Model" vs "Distribution"),
// so columns are located by case-insensitive substring, in column order.

/// What to look for, and what to fall back to
#[derive(Debug, Clone, Copy)]
pub struct ColumnConcept {
    pub primary: &'static str,
    pub synonyms: &'static [&'static str],
    /// Used verbatim when nothing matches; may not exist in the sheet
    pub default: &'static str,
}

impl ColumnConcept {
    pub const fn new(
        primary: &'static str,
        synonyms: &'static [&'static str],
        default: &'static str,
    ) -> Self {
        ColumnConcept {
            primary,
            synonyms,
            default,
        }
    }
}

pub const DISTRIBUTION_MODEL: ColumnConcept =
    ColumnConcept::new("Distribution Model", &["Distribution"], "Distribution Model");

pub const FOOD_FORMAT: ColumnConcept = ColumnConcept::new("Food Format", &["Format"], "Food Format");

pub const HOURS_NOTES: ColumnConcept =
    ColumnConcept::new("Additional Note", &["Hours Notes", "Hours Note"], "Hours Notes");

pub const CULTURE_AGENCY_NAME: ColumnConcept =
    ColumnConcept::new("Agency Name", &["Company Name"], "Agency Name");

pub const CULTURES_SERVED: ColumnConcept = ColumnConcept::new(
    "Cultural Populations Served",
    &["Cultures Served"],
    "Cultural Populations Served",
);

pub struct ColumnResolver<'a> {
    headers: &'a [String],
}

impl<'a> ColumnResolver<'a> {
    pub fn new(headers: &'a [String]) -> Self {
        ColumnResolver { headers }
    }

    /// First header containing `needle` (case-insensitive), in column order
    pub fn find(&self, needle: &str) -> Option<&'a str> {
        let needle = needle.to_lowercase();
        self.headers
            .iter()
            .find(|h| h.to_lowercase().contains(&needle))
            .map(String::as_str)
    }

    /// Primary substring, then each synonym in order, then the literal default
    pub fn resolve(&self, concept: &ColumnConcept) -> String {
        std::iter::once(concept.primary)
            .chain(concept.synonyms.iter().copied())
            .find_map(|needle| self.find(needle))
            .unwrap_or(concept.default)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_primary_substring_match() {
        let h = headers(&["Agency Name", "Food Distribution Model (current)", "Phone"]);
        let resolver = ColumnResolver::new(&h);
        assert_eq!(
            resolver.resolve(&DISTRIBUTION_MODEL),
            "Food Distribution Model (current)"
        );
    }

    #[test]
    fn test_synonym_fallback() {
        let h = headers(&["Agency Name", "Hours Notes"]);
        let resolver = ColumnResolver::new(&h);
        assert_eq!(resolver.resolve(&HOURS_NOTES), "Hours Notes");

        let h = headers(&["Company Name", "Cultures Served"]);
        let resolver = ColumnResolver::new(&h);
        assert_eq!(resolver.resolve(&CULTURE_AGENCY_NAME), "Company Name");
        assert_eq!(resolver.resolve(&CULTURES_SERVED), "Cultures Served");
    }

    #[test]
    fn test_default_when_unresolved() {
        let h = headers(&["Agency Name", "Phone"]);
        let resolver = ColumnResolver::new(&h);
        assert_eq!(resolver.resolve(&FOOD_FORMAT), "Food Format");
    }

    #[test]
    fn test_first_match_in_column_order_wins() {
        // Primary beats synonym even when the synonym matches an earlier column
        let h = headers(&["Service Format", "Food Format Type"]);
        let resolver = ColumnResolver::new(&h);
        assert_eq!(resolver.resolve(&FOOD_FORMAT), "Food Format Type");

        // Two synonym hits: the earlier column
        let h = headers(&["Pickup Format", "Delivery Format"]);
        let resolver = ColumnResolver::new(&h);
        assert_eq!(resolver.resolve(&FOOD_FORMAT), "Pickup Format");
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let h = headers(&["ADDITIONAL NOTES ON HOURS"]);
        let resolver = ColumnResolver::new(&h);
        assert_eq!(resolver.find("additional note"), Some("ADDITIONAL NOTES ON HOURS"));
    }
}
