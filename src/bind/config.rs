use std::env;

/// Environment variable read by [`BindConfig::from_env`].
pub const MAX_BODY_BYTES_ENV: &str = "FIELDBIND_MAX_BODY_BYTES";

/// Binder configuration
///
/// The update path buffers the whole request body before decoding it. With
/// the default configuration that buffer is unbounded, so deployments should
/// either cap the body at the transport layer or set `max_body_bytes` here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindConfig {
    /// Largest accepted request body, in bytes (`None` = unbounded)
    pub max_body_bytes: Option<usize>,
}

impl BindConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the body size cap
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = Some(limit);
        self
    }

    /// Remove the body size cap
    pub fn unbounded(mut self) -> Self {
        self.max_body_bytes = None;
        self
    }

    /// Read configuration from the environment
    ///
    /// An unset or empty `FIELDBIND_MAX_BODY_BYTES` leaves the body unbounded.
    pub fn from_env() -> Result<Self, String> {
        match env::var(MAX_BODY_BYTES_ENV) {
            Ok(raw) if !raw.trim().is_empty() => {
                let limit = Self::parse_limit(&raw)?;
                Ok(Self::new().max_body_bytes(limit))
            }
            _ => Ok(Self::new()),
        }
    }

    fn parse_limit(raw: &str) -> Result<usize, String> {
        raw.trim()
            .parse::<usize>()
            .map_err(|_| {
                format!(
                    "{} must be a non-negative integer, got '{}'",
                    MAX_BODY_BYTES_ENV, raw
                )
            })
    }

    /// Limit handed to body collectors that require one
    pub fn effective_limit(&self) -> usize {
        self.max_body_bytes.unwrap_or(usize::MAX)
    }
}
