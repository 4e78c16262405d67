use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const TOKEN_VAR: &str = "CHESSCG_ACCESS_TOKEN";

/// Where `Config::access_token` found the token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenSource {
   Env,
   File,
   Prompt,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
   pub max_attempts: u32,
   pub base_delay_ms: u64,
   pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
   fn default() -> ReconnectConfig {
      ReconnectConfig {
         max_attempts: 5,
         base_delay_ms: 500,
         max_delay_ms: 10_000,
      }
   }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
   pub backend_url: String,
   pub websocket_url: String,
   pub access_token: Option<String>,
   pub reconnect: ReconnectConfig,
}

impl Default for Config {
   fn default() -> Config {
      Config {
         backend_url: "http://localhost:8000".to_string(),
         websocket_url: "ws://127.0.0.1:8000/ws".to_string(),
         access_token: None,
         reconnect: ReconnectConfig::default(),
      }
   }
}

impl Config {
   /// Reads the config file, or the defaults if there isn't one yet.
   pub fn load(path: &Path) -> Result<Config> {
      if !path.exists() {
         return Ok(Config::default());
      }
      let content = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
      serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
   }

   pub fn save(&self, path: &Path) -> Result<()> {
      if let Some(parent) = path.parent() {
         fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
      }
      let content = serde_json::to_string_pretty(self)?;
      fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
      Ok(())
   }

   pub fn default_path() -> Result<PathBuf> {
      let config_dir = dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;
      Ok(config_dir.join("chesscg").join("config.json"))
   }

   /// Command line (and their env fallbacks) win over the file.
   pub fn apply_overrides(&mut self, backend_url: Option<String>, websocket_url: Option<String>) {
      if let Some(url) = backend_url {
         self.backend_url = url;
      }
      if let Some(url) = websocket_url {
         self.websocket_url = url;
      }
   }

   /// Token from the environment, then the config file, then stdin.
   pub fn access_token(&self) -> Result<(String, TokenSource)> {
      if let Some(token) = env_token() {
         info!("Found access token in environment, using that.");
         return Ok((token, TokenSource::Env));
      }
      if let Some(token) = self.access_token.as_ref().filter(|t| !t.is_empty()) {
         return Ok((token.clone(), TokenSource::File));
      }
      Ok((read_access_token()?, TokenSource::Prompt))
   }

   /// Writes a typed-in token to the config file so the next run doesn't ask again.
   pub fn remember_token(&mut self, path: &Path, token: &str) -> Result<()> {
      self.access_token = Some(token.to_string());
      self.save(path)?;
      info!("Saved access token to {}", path.display());
      Ok(())
   }
}

fn env_token() -> Option<String> {
   match env::var(TOKEN_VAR) {
      Ok(token) if !token.is_empty() => Some(token),
      Ok(_) | Err(env::VarError::NotPresent) => None,
      Err(env::VarError::NotUnicode(_)) => {
         warn!("{} found, but with invalid unicode. Ignoring.", TOKEN_VAR);
         None
      }
   }
}

fn read_access_token() -> Result<String> {
   let mut line_buf = String::new();

   println!("chesscg access token: ");

   let _ = std::io::stdin().read_line(&mut line_buf).context("reading access token")?;
   let token = line_buf.trim().to_string();
   if token.is_empty() {
      return Err(anyhow!("No access token given"));
   }
   Ok(token)
}
