// Service configuration
// Defaults, then an optional config.toml, then APP__* environment variables.

use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server_address: String,
    // Base URL of the car REST backend (filters, brands, cars)
    pub api_base_url: String,
    // Path the filter synchronizer pushes locations to
    pub listing_path: String,
    pub page_size: u32,
    pub lookup_cache_secs: u64,
    pub request_timeout_secs: u64,
    pub static_dir: String,
}

impl Settings {
    pub fn new() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if present

        let builder = Config::builder()
            .set_default("server_address", "127.0.0.1:3000")?
            .set_default("api_base_url", "http://127.0.0.1:8000")?
            .set_default("listing_path", "/cars")?
            .set_default("page_size", 20)?
            .set_default("lookup_cache_secs", 300)?
            .set_default("request_timeout_secs", 10)?
            .set_default("static_dir", "static")?
            .add_source(File::with_name("config").required(false))
            // Double underscore so that keys like api_base_url stay flat (APP__API_BASE_URL)
            .add_source(Environment::with_prefix("APP").prefix_separator("__").separator("__"));

        let settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }
}

#[cfg(test)]
impl Default for Settings {
    fn default() -> Self {
        Self {
            server_address: "127.0.0.1:0".to_string(),
            api_base_url: "http://127.0.0.1:8000".to_string(),
            listing_path: "/cars".to_string(),
            page_size: 20,
            lookup_cache_secs: 300,
            request_timeout_secs: 10,
            static_dir: "static".to_string(),
        }
    }
}
