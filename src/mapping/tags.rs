//! Parsing of the per-field tag strings carried by [`FieldDescriptor`](super::FieldDescriptor).
//!
//! Three tag families are understood:
//!
//! - external name: `"name,omitempty"`, the first comma segment is the wire key
//! - storage column: xorm-style tokens, `"'user_name' index"`, `"-"`
//! - validation rules: `"required,min=2|zerotime"`

/// Separates rule groups in a validation tag.
pub const TAG_SEPARATOR: char = ',';
/// Separates alternatives inside one rule group.
pub const OR_SEPARATOR: char = '|';
/// Separates a rule key from its parameter.
pub const TAG_KEY_SEPARATOR: char = '=';

/// Rule markers that make a field immutable or server-derived.
pub const IMMUTABLE_MARKERS: [&str; 2] = ["fixed", "zerotime"];

/// Outcome of reading a storage-column tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnOverride {
    /// No explicit name; the column name mapper decides.
    Default,
    /// `"-"`: the field has no storage column.
    Excluded,
    /// A single-quoted literal column name.
    Named(String),
}

pub fn parse_column_tag(tag: &str) -> ColumnOverride {
    if tag == "-" {
        return ColumnOverride::Excluded;
    }

    for token in tag.split(TAG_SEPARATOR) {
        let token = token.trim();
        if token.len() >= 2 && token.starts_with('\'') && token.ends_with('\'') {
            return ColumnOverride::Named(token[1..token.len() - 1].to_string());
        }
    }

    ColumnOverride::Default
}

/// Wire name from an external-name tag, or `None` when the tag carries none.
pub fn external_name(tag: &str) -> Option<&str> {
    let name = tag.split(TAG_SEPARATOR).next().unwrap_or_default();
    if name.is_empty() || name == "-" {
        None
    } else {
        Some(name)
    }
}

/// True when any rule key in `tag` equals one of `markers`.
pub fn has_rule_marker(tag: &str, markers: &[&str]) -> bool {
    parse_rules(tag)
        .iter()
        .flat_map(|group| group.alternatives.iter())
        .any(|rule| markers.contains(&rule.key.as_str()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub key: String,
    pub param: Option<String>,
}

/// Alternatives joined by `|`; the group passes when any alternative passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleGroup {
    pub alternatives: Vec<Rule>,
}

pub fn parse_rules(tag: &str) -> Vec<RuleGroup> {
    tag.split(TAG_SEPARATOR)
        .filter_map(|group| {
            let alternatives: Vec<Rule> = group
                .split(OR_SEPARATOR)
                .filter_map(parse_rule)
                .collect();
            if alternatives.is_empty() {
                None
            } else {
                Some(RuleGroup { alternatives })
            }
        })
        .collect()
}

fn parse_rule(raw: &str) -> Option<Rule> {
    let (key, param) = match raw.split_once(TAG_KEY_SEPARATOR) {
        Some((key, param)) => (key, Some(param.trim().to_string())),
        None => (raw, None),
    };
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some(Rule {
        key: key.to_string(),
        param,
    })
}
