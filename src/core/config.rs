use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    /// Base URL of the backend, e.g. "https://chat.example.com"
    pub server_url: Option<String>,
    /// UI theme name (e.g., "dark", "light")
    pub theme: Option<String>,
    /// Typewriter reveal for fresh assistant replies
    pub typewriter: Option<bool>,
    /// Transcript log file appended to while logging is active
    pub log_file: Option<String>,
    /// Name shown before your own messages in the transcript
    pub display_name: Option<String>,
    /// Stable per-install identity sent as `session_id` with every turn.
    /// Generated on first use; not meant to be edited by hand.
    pub session_id: Option<String>,
}

impl Config {
    pub fn load() -> Result<Config, Box<dyn std::error::Error>> {
        let config_path = Self::get_config_path();
        Self::load_from_path(&config_path)
    }

    pub fn load_from_path(config_path: &PathBuf) -> Result<Config, Box<dyn std::error::Error>> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let config_path = Self::get_config_path();
        self.save_to_path(&config_path)
    }

    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    fn get_config_path() -> PathBuf {
        let proj_dirs = ProjectDirs::from("eu", "plausch", "plausch")
            .expect("Failed to determine config directory");
        proj_dirs.config_dir().join("config.toml")
    }

    /// Return the persistent session id, minting and storing one on first
    /// use so the backend can correlate turns from this install.
    pub fn ensure_session_id(&mut self) -> Result<String, Box<dyn std::error::Error>> {
        if let Some(id) = &self.session_id {
            if !id.is_empty() {
                return Ok(id.clone());
            }
        }
        let id = generate_session_id()?;
        self.session_id = Some(id.clone());
        self.save()?;
        Ok(id)
    }

    pub fn typewriter_enabled(&self) -> bool {
        self.typewriter.unwrap_or(true)
    }

    pub fn print_all(&self) {
        println!("Current configuration:");
        match &self.server_url {
            Some(url) => println!("  server-url: {url}"),
            None => println!("  server-url: (unset)"),
        }
        match &self.theme {
            Some(theme) => println!("  theme: {theme}"),
            None => println!("  theme: (unset)"),
        }
        match self.typewriter_enabled() {
            true => println!("  typewriter: on"),
            false => println!("  typewriter: off"),
        }
        match &self.log_file {
            Some(path) => println!("  log-file: {path}"),
            None => println!("  log-file: (unset)"),
        }
        match &self.display_name {
            Some(name) => println!("  display-name: {name}"),
            None => println!("  display-name: (unset)"),
        }
        match &self.session_id {
            Some(id) => println!("  session-id: {id}"),
            None => println!("  session-id: (not yet generated)"),
        }
    }

    /// Apply a `set` from the CLI. Keys use the kebab-case names shown by
    /// `print_all`.
    pub fn apply_set(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "server-url" => self.server_url = Some(value.to_string()),
            "theme" => self.theme = Some(value.to_string()),
            "typewriter" => self.typewriter = Some(parse_bool(value)?),
            "log-file" => self.log_file = Some(value.to_string()),
            "display-name" => self.display_name = Some(value.to_string()),
            "session-id" => return Err("session-id is managed automatically".to_string()),
            other => return Err(format!("unknown config key: {other}")),
        }
        Ok(())
    }

    pub fn apply_unset(&mut self, key: &str) -> Result<(), String> {
        match key {
            "server-url" => self.server_url = None,
            "theme" => self.theme = None,
            "typewriter" => self.typewriter = None,
            "log-file" => self.log_file = None,
            "display-name" => self.display_name = None,
            "session-id" => return Err("session-id is managed automatically".to_string()),
            other => return Err(format!("unknown config key: {other}")),
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        other => Err(format!("expected on/off, got: {other}")),
    }
}

fn generate_session_id() -> Result<String, Box<dyn std::error::Error>> {
    let mut bytes = [0u8; 16];
    getrandom::fill(&mut bytes).map_err(|e| format!("system RNG unavailable: {e}"))?;
    Ok(bytes.iter().map(|b| format!("{b:02x}")).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_nonexistent_config_yields_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config_path = temp_dir.path().join("nonexistent_config.toml");

        let config = Config::load_from_path(&config_path).expect("Failed to load config");

        assert_eq!(config.server_url, None);
        assert!(config.typewriter_enabled());
    }

    #[test]
    fn save_and_load_round_trips_every_field() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config_path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config
            .apply_set("server-url", "https://chat.example.com")
            .unwrap();
        config.apply_set("theme", "light").unwrap();
        config.apply_set("typewriter", "off").unwrap();
        config.apply_set("display-name", "Rita").unwrap();
        config.session_id = Some("cafe0123".to_string());

        config
            .save_to_path(&config_path)
            .expect("Failed to save config");
        let loaded = Config::load_from_path(&config_path).expect("Failed to load config");

        assert_eq!(
            loaded.server_url.as_deref(),
            Some("https://chat.example.com")
        );
        assert_eq!(loaded.theme.as_deref(), Some("light"));
        assert_eq!(loaded.typewriter, Some(false));
        assert_eq!(loaded.display_name.as_deref(), Some("Rita"));
        assert_eq!(loaded.session_id.as_deref(), Some("cafe0123"));
    }

    #[test]
    fn unset_clears_individual_keys() {
        let mut config = Config::default();
        config.apply_set("theme", "dark").unwrap();
        config.apply_unset("theme").unwrap();
        assert_eq!(config.theme, None);

        assert!(config.apply_unset("no-such-key").is_err());
    }

    #[test]
    fn session_id_cannot_be_set_by_hand() {
        let mut config = Config::default();
        assert!(config.apply_set("session-id", "abc").is_err());
        assert!(config.apply_unset("session-id").is_err());
    }

    #[test]
    fn typewriter_accepts_onoff_spellings() {
        let mut config = Config::default();
        config.apply_set("typewriter", "ON").unwrap();
        assert_eq!(config.typewriter, Some(true));
        config.apply_set("typewriter", "no").unwrap();
        assert_eq!(config.typewriter, Some(false));
        assert!(config.apply_set("typewriter", "maybe").is_err());
    }

    #[test]
    fn generated_session_ids_are_32_hex_chars() {
        let id = generate_session_id().expect("generate id");
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
