use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: Service,
    #[serde(default)]
    pub form: Form,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub guards: Guards,
    #[serde(default)]
    pub appearance: Appearance,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub endpoint: String,
    /// Name of the environment variable holding a bearer token. Empty disables the header.
    pub bearer_token_env: String,
    /// 0 waits for the service indefinitely.
    pub timeout_seconds: u64,
    #[serde(default = "default_true")]
    pub use_system_proxy: bool,
}
impl Default for Service {
    fn default() -> Self {
        Self {
            endpoint: "https://pdf.rebelcolony.com/generate/ndt-report".into(),
            bearer_token_env: "".into(),
            timeout_seconds: 0,
            use_system_proxy: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form {
    pub date_field: String,
    pub default_date: bool,
    pub submit_label: String,
    pub busy_label: String,
}
impl Default for Form {
    fn default() -> Self {
        Self {
            date_field: "inspection_date".into(),
            default_date: true,
            submit_label: "Generate PDF Report".into(),
            busy_label: "Generating PDF...".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    pub out_dir: String,
    pub filename_prefix: String,
    pub fallback_stem: String,
    pub print_summary: bool,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            out_dir: ".".into(),
            filename_prefix: "NDT_Report_".into(),
            fallback_stem: "report".into(),
            print_summary: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guards {
    pub enabled: bool,
    pub min_interactions: u32,
    pub min_interval_seconds: u64,
    pub allowed_hosts: Vec<String>,
}
impl Default for Guards {
    fn default() -> Self {
        Self {
            enabled: false,
            min_interactions: 5,
            min_interval_seconds: 30,
            allowed_hosts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appearance {
    pub state_file: String,
    /// Overrides the operating system's colour-scheme preference when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prefers_dark: Option<bool>,
}
impl Default for Appearance {
    fn default() -> Self {
        Self {
            state_file: ".ndt-report-state.json".into(),
            system_prefers_dark: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}
