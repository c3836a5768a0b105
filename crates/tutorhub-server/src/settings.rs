//! Runtime configuration, read from `config.toml` and `TUTORHUB_*`
//! environment variables.

use std::{collections::HashMap, path::{Path, PathBuf}};

use serde::Deserialize;

/// Runtime server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:              String,
  #[serde(default = "default_port")]
  pub port:              u16,
  /// Externally visible base URL, e.g. `https://tutor.example.com`.
  pub public_url:        String,
  /// Where browsers land after logging in.
  #[serde(default = "default_app_root")]
  pub app_root:          String,
  #[serde(default = "default_store_path")]
  pub store_path:        PathBuf,
  pub session_secret:    String,
  #[serde(default = "default_session_ttl_hours")]
  pub session_ttl_hours: u32,
  #[serde(default)]
  pub cache_ttl_secs:    Option<u64>,
  #[serde(default)]
  pub sso:               SsoConfig,
  #[serde(default)]
  pub webhook_url:       Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SsoConfig {
  #[serde(default = "default_sso_base_url")]
  pub base_url:        String,
  #[serde(default)]
  pub allowed_faculty: Option<String>,
  #[serde(default)]
  pub org_faculties:   Vec<OrgFaculty>,
}

/// Maps an organisation code (`kd_org`) reported by the provider to a
/// faculty name.
#[derive(Debug, Clone, Deserialize)]
pub struct OrgFaculty {
  pub code:    String,
  pub faculty: String,
}

impl SsoConfig {
  pub fn faculty_table(&self) -> HashMap<String, String> {
    self
      .org_faculties
      .iter()
      .map(|o| (o.code.clone(), o.faculty.clone()))
      .collect()
  }
}

impl Default for SsoConfig {
  fn default() -> Self {
    Self {
      base_url:        default_sso_base_url(),
      allowed_faculty: None,
      org_faculties:   Vec::new(),
    }
  }
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 8000 }
fn default_app_root() -> String { "/".into() }
fn default_store_path() -> PathBuf { PathBuf::from("tutorhub.db") }
fn default_session_ttl_hours() -> u32 { 24 }
fn default_sso_base_url() -> String { "https://sso.ui.ac.id/cas2".into() }

impl ServerConfig {
  /// Layer the optional TOML file at `path` under the environment.
  ///
  /// Nested keys use a double underscore, e.g.
  /// `TUTORHUB_SSO__ALLOWED_FACULTY`.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("TUTORHUB")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()?
      .try_deserialize()
  }

  /// The URL the identity provider sends browsers back to.
  pub fn callback_url(&self) -> String {
    format!("{}/auth/callback", self.public_url.trim_end_matches('/'))
  }

  pub fn bind_address(&self) -> String { format!("{}:{}", self.host, self.port) }
}
