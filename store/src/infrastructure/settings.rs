use std::env;

use anyhow::Context;
use config::{Config, Environment, File};
use dotenvy::dotenv;
use serde::Deserialize;

use crate::domain::session::AuthSession;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Base URL of the remote content API.
    pub api_base_url: String,
    /// Directory holding the local snapshot file.
    pub storage_dir: String,
    /// Acting session, as handed over by the identity layer.
    #[serde(default)]
    pub session: AuthSession,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        let run_mode = load_env("RUN_MODE", "development");

        let s = Config::builder()
            .add_source(File::with_name("./config/default"))
            .add_source(File::with_name(&format!("./config/{run_mode}")).required(false))
            .add_source(Environment::with_prefix("app").separator("_"))
            .build()?;

        s.try_deserialize().with_context(|| "failed to read config")
    }
}

fn load_env(key: &str, default_value: &'static str) -> String {
    env::var(key).unwrap_or_else(|_| default_value.into())
}
