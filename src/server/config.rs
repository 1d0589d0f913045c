use clap::Parser;

use crate::bind::{BindConfig, Binder};
use crate::mapping::MapperKind;

#[derive(Debug, Clone, Parser)]
#[command(name = "fieldbind")]
#[command(about = "Reference users service with presence-aware partial updates")]
pub struct ServerArgs {
    #[arg(long, env = "FIELDBIND_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "FIELDBIND_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Default column naming: snake, gonic or same
    #[arg(long, env = "FIELDBIND_MAPPER", default_value = "snake")]
    pub mapper: MapperKind,

    /// Largest accepted request body in bytes; unbounded when unset
    #[arg(long, env = "FIELDBIND_MAX_BODY_BYTES")]
    pub max_body_bytes: Option<usize>,
}

impl ServerArgs {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn bind_config(&self) -> BindConfig {
        match self.max_body_bytes {
            Some(limit) => BindConfig::new().max_body_bytes(limit),
            None => BindConfig::new(),
        }
    }

    pub fn binder(&self) -> Binder {
        Binder::new(self.mapper.build()).with_config(self.bind_config())
    }
}

impl Default for ServerArgs {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            mapper: MapperKind::default(),
            max_body_bytes: None,
        }
    }
}
