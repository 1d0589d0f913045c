//! Default storage-column naming strategies.
//!
//! A mapper turns a structural field name into the column name used when the
//! field carries no quoted override. One mapper is chosen at startup and shared
//! read-only by every request.

use std::str::FromStr;
use std::sync::Arc;

pub trait ColumnNameMapper: Send + Sync {
    fn translate(&self, name: &str) -> String;
}

/// `UserName -> user_name`, `ID -> i_d`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnakeMapper;

impl ColumnNameMapper for SnakeMapper {
    fn translate(&self, name: &str) -> String {
        let mut out = String::with_capacity(name.len() + 4);
        for (idx, ch) in name.chars().enumerate() {
            if ch.is_ascii_uppercase() {
                if idx > 0 {
                    out.push('_');
                }
                out.push(ch.to_ascii_lowercase());
            } else {
                out.push(ch);
            }
        }
        out
    }
}

/// Initialism-aware snake case: `UserID -> user_id`, `HTTPServer -> http_server`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GonicMapper;

impl ColumnNameMapper for GonicMapper {
    fn translate(&self, name: &str) -> String {
        let mut out: Vec<char> = Vec::with_capacity(name.len() + 4);
        for (idx, ch) in name.chars().enumerate() {
            if ch.is_ascii_uppercase() && idx > 0 {
                if let Some(&prev) = out.last() {
                    if !prev.is_ascii_uppercase() && prev != '_' {
                        out.push('_');
                    }
                }
            }
            // Closing an initialism: "HTTPS" + "e" splits as "HTTP_Se".
            if !ch.is_ascii_uppercase() && idx > 1 {
                let len = out.len();
                if len >= 2 && out[len - 1].is_ascii_uppercase() && out[len - 2].is_ascii_uppercase() {
                    let last = out[len - 1];
                    out[len - 1] = '_';
                    out.push(last);
                }
            }
            out.push(ch);
        }
        out.into_iter().collect::<String>().to_ascii_lowercase()
    }
}

/// Identity mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct SameMapper;

impl ColumnNameMapper for SameMapper {
    fn translate(&self, name: &str) -> String {
        name.to_string()
    }
}

pub struct PrefixMapper {
    prefix: String,
    inner: Arc<dyn ColumnNameMapper>,
}

impl PrefixMapper {
    pub fn new(prefix: impl Into<String>, inner: Arc<dyn ColumnNameMapper>) -> Self {
        Self {
            prefix: prefix.into(),
            inner,
        }
    }
}

impl ColumnNameMapper for PrefixMapper {
    fn translate(&self, name: &str) -> String {
        format!("{}{}", self.prefix, self.inner.translate(name))
    }
}

pub struct SuffixMapper {
    suffix: String,
    inner: Arc<dyn ColumnNameMapper>,
}

impl SuffixMapper {
    pub fn new(suffix: impl Into<String>, inner: Arc<dyn ColumnNameMapper>) -> Self {
        Self {
            suffix: suffix.into(),
            inner,
        }
    }
}

impl ColumnNameMapper for SuffixMapper {
    fn translate(&self, name: &str) -> String {
        format!("{}{}", self.inner.translate(name), self.suffix)
    }
}

/// Named mapper choice, as read from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapperKind {
    #[default]
    Snake,
    Gonic,
    Same,
}

impl MapperKind {
    pub fn build(self) -> Arc<dyn ColumnNameMapper> {
        match self {
            MapperKind::Snake => Arc::new(SnakeMapper),
            MapperKind::Gonic => Arc::new(GonicMapper),
            MapperKind::Same => Arc::new(SameMapper),
        }
    }
}

impl FromStr for MapperKind {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "snake" => Ok(MapperKind::Snake),
            "gonic" => Ok(MapperKind::Gonic),
            "same" => Ok(MapperKind::Same),
            other => Err(format!(
                "unknown column mapper '{}', expected one of: snake, gonic, same",
                other
            )),
        }
    }
}
