//! Config manager for loading, saving, and atomic updates.
//!
//! Key features:
//! - Atomic writes (write to temp file, then rename)
//! - Section-level updates (only modified section is changed)
//! - Rewrites the file when keys are missing or unknown
//! - Preserves comments and formatting with toml_edit

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item};

use super::settings::{ConfigSection, Settings};

/// Errors that can occur during config operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Failed to parse config for editing: {0}")]
    EditParseError(#[from] toml_edit::TomlError),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Manages application configuration.
///
/// Handles loading, saving, and atomic section-level updates.
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Create a manager for `config_path`. Call `load()` or
    /// `load_or_create()` before reading settings.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Changes made here stay in memory until `save()` or
    /// `update_section()` is called.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Load config from file.
    ///
    /// Returns error if file doesn't exist.
    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }

        let content = fs::read_to_string(&self.config_path)?;
        self.settings = parse_and_validate(&content)?;
        Ok(())
    }

    /// Load config from file, creating it with defaults if it doesn't exist.
    ///
    /// Missing keys are filled in and unknown sections dropped; the file is
    /// rewritten when that changes anything.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)?;
            let (settings, was_modified) = parse_validate_and_clean(&content)?;
            self.settings = settings;

            if was_modified {
                tracing::debug!("Rewriting {} with defaults", self.config_path.display());
                self.save()?;
            }
        } else {
            self.settings = Settings::default();
            self.save()?;
        }
        Ok(())
    }

    /// Create the temp and logs directories.
    pub fn ensure_dirs_exist(&self) -> ConfigResult<()> {
        for dir in [&self.settings.paths.temp_root, &self.settings.paths.logs_folder] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn logs_folder(&self) -> PathBuf {
        PathBuf::from(&self.settings.paths.logs_folder)
    }

    /// Save the entire config atomically.
    pub fn save(&self) -> ConfigResult<()> {
        let content = self.generate_config_with_comments()?;
        self.atomic_write(&content)?;
        Ok(())
    }

    /// Update a specific section atomically.
    ///
    /// Re-reads the file from disk, replaces only the specified section,
    /// and writes back atomically. Comments elsewhere in the file survive.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        let current_content = if self.config_path.exists() {
            fs::read_to_string(&self.config_path)?
        } else {
            String::new()
        };

        let mut doc: DocumentMut = if current_content.is_empty() {
            DocumentMut::new()
        } else {
            current_content.parse()?
        };

        let table_name = section.table_name();
        match self.section_item(section)? {
            Some(item) => doc[table_name] = item,
            None => {
                doc.remove(table_name);
            }
        }

        self.atomic_write(&doc.to_string())?;
        Ok(())
    }

    /// Serialize one section as a standalone document.
    fn section_toml(&self, section: ConfigSection) -> ConfigResult<Option<String>> {
        let s = &self.settings;
        let value = match section {
            ConfigSection::Paths => toml::Value::try_from(&s.paths)?,
            ConfigSection::Logging => toml::Value::try_from(&s.logging)?,
            ConfigSection::Encoder => toml::Value::try_from(&s.encoder)?,
            ConfigSection::Loop => toml::Value::try_from(&s.loop_defaults)?,
            ConfigSection::Hdr => toml::Value::try_from(&s.hdr)?,
            ConfigSection::Frames => toml::Value::try_from(&s.frames)?,
            ConfigSection::Staging => toml::Value::try_from(&s.staging)?,
            ConfigSection::Channels => {
                if s.channels.is_empty() {
                    return Ok(None);
                }
                toml::Value::try_from(&s.channels)?
            }
        };

        let mut table = toml::Table::new();
        table.insert(section.table_name().to_string(), value);
        Ok(Some(toml::to_string_pretty(&table)?))
    }

    fn section_item(&self, section: ConfigSection) -> ConfigResult<Option<Item>> {
        let Some(content) = self.section_toml(section)? else {
            return Ok(None);
        };
        let mut section_doc: DocumentMut = content.parse()?;
        Ok(section_doc.remove(section.table_name()))
    }

    /// Generate config content with a comment above each section.
    fn generate_config_with_comments(&self) -> ConfigResult<String> {
        let mut output = String::new();

        output.push_str("# Multi-Channel Export Configuration\n");
        output.push_str(
            "# This file is auto-generated. Comments may be preserved on section updates.\n",
        );

        for section in ConfigSection::ALL {
            let Some(content) = self.section_toml(section)? else {
                continue;
            };
            output.push('\n');
            output.push_str(&format!("# {}\n", section.description()));
            output.push_str(content.trim_end());
            output.push('\n');
        }

        Ok(output)
    }

    /// Write content to the config file via a temp file and rename.
    fn atomic_write(&self, content: &str) -> io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.config_path.with_extension("toml.tmp");

        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }

        fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }
}

/// Parse settings and check values serde cannot.
fn parse_and_validate(content: &str) -> ConfigResult<Settings> {
    let settings: Settings = toml::from_str(content)?;

    settings
        .loop_defaults
        .loop_spec()
        .validate()
        .map_err(|e| ConfigError::Invalid(format!("[loop] {e}")))?;

    for channel in &settings.channels {
        if channel.fps == 0 {
            return Err(ConfigError::Invalid(format!(
                "channel '{}': fps must be positive",
                channel.name
            )));
        }
        channel
            .loop_spec
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("channel '{}': {e}", channel.name)))?;
    }

    Ok(settings)
}

/// Parse and validate, reporting whether the file needs rewriting.
fn parse_validate_and_clean(content: &str) -> ConfigResult<(Settings, bool)> {
    let doc: DocumentMut = content.parse()?;
    let settings = parse_and_validate(content)?;

    let has_unknown = doc.iter().any(|(key, _)| {
        !ConfigSection::ALL
            .iter()
            .any(|section| section.table_name() == key)
    });

    // Any key missing from the file shows up as a difference after a
    // round trip through the defaults
    let roundtrip: DocumentMut = toml::to_string_pretty(&settings)?.parse()?;
    let was_modified = has_unknown || !same_keys(doc.as_table(), roundtrip.as_table());

    Ok((settings, was_modified))
}

fn same_keys(a: &toml_edit::Table, b: &toml_edit::Table) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().all(|(key, item)| match (item, b.get(key)) {
        (Item::Table(ta), Some(Item::Table(tb))) => same_keys(ta, tb),
        (_, Some(_)) => true,
        (_, None) => false,
    })
}
