use std::collections::BTreeSet;

use super::walker::NameMappings;

/// Identifiers matching the keys a client actually sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceSets {
    /// Storage columns to write.
    pub columns: BTreeSet<String>,
    /// Structural field names to validate.
    pub fields: BTreeSet<String>,
}

impl PresenceSets {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.fields.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains(field)
    }
}

/// Translates payload keys into column and structural names.
///
/// Unknown keys are ignored. The two sets are filled independently: a key
/// backed by an excluded column still reports its structural name.
pub fn translate<'k, I>(keys: I, mappings: &NameMappings) -> PresenceSets
where
    I: IntoIterator<Item = &'k str>,
{
    let mut presence = PresenceSets::default();
    for key in keys {
        if let Some(column) = mappings.column(key) {
            if !column.is_empty() {
                presence.columns.insert(column.to_string());
            }
        }
        if let Some(field) = mappings.structural(key) {
            presence.fields.insert(field.to_string());
        }
    }
    presence
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mappings() -> NameMappings {
        let mut mappings = NameMappings::default();
        for (external, column, field) in [
            ("name", "user_name", "Name"),
            ("nickname", "", "Nickname"),
            ("email", "email", "Email"),
        ] {
            mappings.external_to_column.insert(external.to_string(), column.to_string());
            mappings.external_to_structural.insert(external.to_string(), field.to_string());
        }
        mappings
    }

    #[test]
    fn known_keys_map_to_both_sets() {
        let presence = translate(["name", "email"], &mappings());
        assert!(presence.has_column("user_name"));
        assert!(presence.has_column("email"));
        assert!(presence.has_field("Name"));
        assert!(presence.has_field("Email"));
        assert_eq!(presence.columns.len(), 2);
        assert_eq!(presence.fields.len(), 2);
    }

    #[test]
    fn excluded_column_still_reports_field() {
        let presence = translate(["nickname"], &mappings());
        assert!(presence.columns.is_empty());
        assert_eq!(presence.fields.iter().collect::<Vec<_>>(), vec!["Nickname"]);
        assert!(!presence.is_empty());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let presence = translate(["unknown", "NAME"], &mappings());
        assert!(presence.is_empty());
    }
}
