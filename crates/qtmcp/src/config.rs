/*!
Configuration (§6). A plain struct with a `Default` impl, built once from the
environment at deferred-init time and passed down instead of each component
reading `std::env` independently.
*/

use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VocabularyMode {
  Native,
  ComputerUse,
  Chrome,
  All,
}

impl VocabularyMode {
  pub const fn includes_native(self) -> bool {
    matches!(self, Self::Native | Self::All)
  }

  pub const fn includes_computer_use(self) -> bool {
    matches!(self, Self::ComputerUse | Self::All)
  }

  pub const fn includes_chrome(self) -> bool {
    matches!(self, Self::Chrome | Self::All)
  }

  fn parse(raw: &str) -> Option<Self> {
    match raw {
      "native" => Some(Self::Native),
      "computer_use" => Some(Self::ComputerUse),
      "chrome" => Some(Self::Chrome),
      "all" => Some(Self::All),
      _ => None,
    }
  }
}

#[derive(Debug, Clone)]
pub struct Config {
  /// `QTMCP_PORT`. 0 means let the OS pick an ephemeral port.
  pub ws_port: u16,
  /// `QTMCP_BIND`. Loopback-only is the documented recommendation.
  pub bind_addr: String,
  /// `QTMCP_MODE`.
  pub mode: VocabularyMode,
  /// `QTMCP_ENABLED`. `false` means skip initialization entirely.
  pub enabled: bool,
  /// `QTMCP_INJECT_CHILDREN`. Read here for completeness; acted on by the
  /// external launcher, not by this process.
  pub inject_children: bool,
  /// `QTMCP_NAME_MAP`, falling back to `qtmcp-names.json` in the working
  /// directory.
  pub name_map_path: PathBuf,
  /// `QTMCP_DISCOVERY_PORT`.
  pub discovery_port: u16,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      ws_port: 9222,
      bind_addr: "127.0.0.1".to_string(),
      mode: VocabularyMode::All,
      enabled: true,
      inject_children: false,
      name_map_path: PathBuf::from("qtmcp-names.json"),
      discovery_port: 9221,
    }
  }
}

impl Config {
  pub fn new() -> Self {
    Self::default()
  }

  /// Builds a `Config` from the process environment, falling back to the
  /// default (and logging a warning) for any variable that's set but fails
  /// to parse. A probe that starts in a degraded but known configuration is
  /// more useful than one that silently never starts.
  pub fn from_env() -> Self {
    let mut config = Self::default();

    if let Ok(raw) = env::var("QTMCP_PORT") {
      match raw.parse() {
        Ok(port) => config.ws_port = port,
        Err(_) => log::warn!("QTMCP_PORT={raw:?} is not a valid port; using default {}", config.ws_port),
      }
    }

    if let Ok(raw) = env::var("QTMCP_BIND") {
      config.bind_addr = raw;
    }

    if let Ok(raw) = env::var("QTMCP_MODE") {
      match VocabularyMode::parse(&raw) {
        Some(mode) => config.mode = mode,
        None => log::warn!("QTMCP_MODE={raw:?} is not recognized; using default (all vocabularies)"),
      }
    }

    if let Ok(raw) = env::var("QTMCP_ENABLED") {
      config.enabled = raw != "0";
    }

    config.inject_children = env::var("QTMCP_INJECT_CHILDREN").as_deref() == Ok("1");

    if let Ok(raw) = env::var("QTMCP_NAME_MAP") {
      config.name_map_path = PathBuf::from(raw);
    }

    if let Ok(raw) = env::var("QTMCP_DISCOVERY_PORT") {
      match raw.parse() {
        Ok(port) => config.discovery_port = port,
        Err(_) => log::warn!(
          "QTMCP_DISCOVERY_PORT={raw:?} is not a valid port; using default {}",
          config.discovery_port
        ),
      }
    }

    config
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_matches_documented_defaults() {
    let config = Config::default();
    assert_eq!(config.ws_port, 9222);
    assert_eq!(config.discovery_port, 9221);
    assert!(config.enabled);
    assert_eq!(config.mode, VocabularyMode::All);
  }

  #[test]
  fn vocabulary_mode_membership() {
    assert!(VocabularyMode::All.includes_native());
    assert!(VocabularyMode::All.includes_chrome());
    assert!(VocabularyMode::Native.includes_native());
    assert!(!VocabularyMode::Native.includes_chrome());
  }

  #[test]
  fn unknown_mode_string_fails_to_parse() {
    assert!(VocabularyMode::parse("browser").is_none());
  }
}
