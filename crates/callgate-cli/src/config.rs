//! Configuration for the callgate CLI

use anyhow::{bail, Context};
use callgate_core::{DelegateGate, GateConfig, DEFAULT_MAX_CALL_DEPTH};
use callgate_types::{Address, Selector};
use serde::{Deserialize, Serialize};

/// Main CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Gate identity and limits
    #[serde(default)]
    pub gate: GateSettings,

    /// Pairs allowlisted when the gate is built
    #[serde(default)]
    pub allowlist: Vec<AllowlistEntry>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateSettings {
    /// Address of the gate
    #[serde(default = "default_gate_address")]
    pub address: Address,

    /// Initial owner
    #[serde(default = "default_owner")]
    pub owner: Address,

    /// Fallback target
    #[serde(default = "default_target")]
    pub default_target: Address,

    /// Maximum nesting of call frames
    #[serde(default = "default_max_call_depth")]
    pub max_call_depth: usize,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            address: default_gate_address(),
            owner: default_owner(),
            default_target: default_target(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl From<&GateSettings> for GateConfig {
    fn from(settings: &GateSettings) -> Self {
        GateConfig::new(settings.address, settings.owner, settings.default_target)
            .with_max_call_depth(settings.max_call_depth)
    }
}

/// One allowlisted pair. The selector is given either directly (hex) or as
/// an operation signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowlistEntry {
    pub target: Address,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<Selector>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl AllowlistEntry {
    pub fn resolve(&self) -> anyhow::Result<Selector> {
        match (&self.selector, &self.signature) {
            (Some(selector), None) => Ok(*selector),
            (None, Some(signature)) => Ok(Selector::from_signature(signature)),
            (Some(selector), Some(signature)) => {
                let derived = Selector::from_signature(signature);
                if derived != *selector {
                    bail!(
                        "allowlist entry for {}: selector {} does not match signature {} ({})",
                        self.target,
                        selector,
                        signature,
                        derived
                    );
                }
                Ok(derived)
            }
            (None, None) => bail!(
                "allowlist entry for {} needs a selector or a signature",
                self.target
            ),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_gate_address() -> Address {
    Address::derive("callgate")
}

fn default_owner() -> Address {
    Address::derive("owner")
}

fn default_target() -> Address {
    Address::derive("logic")
}

fn default_max_call_depth() -> usize {
    DEFAULT_MAX_CALL_DEPTH
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Settings {
    /// Load configuration: defaults, then the optional file, then
    /// `CALLGATE_*` environment variables (`__` separates nested keys, e.g.
    /// `CALLGATE_GATE__OWNER`).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&Settings::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("CALLGATE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Build an in-memory gate from these settings.
    pub fn build_gate(&self) -> anyhow::Result<DelegateGate> {
        let mut builder = DelegateGate::builder(GateConfig::from(&self.gate));
        for entry in &self.allowlist {
            builder = builder.allow(entry.target, entry.resolve()?);
        }
        builder.build().context("invalid gate configuration")
    }
}
