// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::config::validate::validate_config;
use crate::errors::{CoincflowError, Result};

/// Option name → value within one section.
pub type Section = BTreeMap<String, String>;

/// Configuration as read from a TOML file: every top-level table is a
/// section.
///
/// ```toml
/// [workflow]
/// start-time = 1000000000
/// end-time = 1000004000
/// ifos = ["H1", "L1"]
///
/// [inspiral]
/// low-frequency-cutoff = 20
///
/// [inspiral-h1]
/// channel-name = "H1:GDS-CALIB_STRAIN"
///
/// [workflow-injections-bnsinj]
/// compute-optimal-snr = ""
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct RawConfigFile {
    pub sections: BTreeMap<String, toml::Table>,
}

/// Validated configuration with string-valued options.
///
/// Section names are `"{stage}"`, `"{stage}-{detector}"` or
/// `"{stage}-{tag}"`, all lower case. An option whose value is the empty
/// string is a flag: its presence is what matters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    sections: BTreeMap<String, Section>,
    base_dir: Option<PathBuf>,
}

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = CoincflowError;

    fn try_from(raw: RawConfigFile) -> Result<Self> {
        let mut sections = BTreeMap::new();
        for (name, table) in raw.sections {
            let mut section = Section::new();
            for (option, value) in table {
                let value = value_to_string(&value).map_err(|reason| {
                    CoincflowError::ConfigError(format!("[{name}] {option}: {reason}"))
                })?;
                section.insert(option, value);
            }
            sections.insert(name.to_lowercase(), section);
        }

        let config = ConfigFile::from_sections(sections);
        validate_config(&config)?;
        Ok(config)
    }
}

fn value_to_string(value: &toml::Value) -> std::result::Result<String, String> {
    match value {
        toml::Value::String(s) => Ok(s.clone()),
        toml::Value::Integer(i) => Ok(i.to_string()),
        toml::Value::Float(f) => Ok(f.to_string()),
        toml::Value::Boolean(b) => Ok(b.to_string()),
        toml::Value::Datetime(d) => Ok(d.to_string()),
        toml::Value::Array(items) => {
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    toml::Value::Array(_) | toml::Value::Table(_) => {
                        return Err("nested arrays and tables are not supported".to_string());
                    }
                    scalar => parts.push(value_to_string(scalar)?),
                }
            }
            Ok(parts.join(","))
        }
        toml::Value::Table(_) => Err("nested tables are not supported".to_string()),
    }
}

impl ConfigFile {
    /// Build from already-converted sections, without validation.
    pub fn from_sections(sections: BTreeMap<String, Section>) -> Self {
        Self {
            sections,
            base_dir: None,
        }
    }

    /// Directory relative paths in the config are resolved against.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &Section)> {
        self.sections.iter().map(|(n, s)| (n.as_str(), s))
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    /// Mutable handle to a section, creating it empty if it is missing.
    ///
    /// Idempotent: asking twice returns the same section.
    pub fn get_or_create_section(&mut self, name: &str) -> &mut Section {
        self.sections.entry(name.to_lowercase()).or_default()
    }

    pub fn set(&mut self, section: &str, option: &str, value: impl Into<String>) {
        self.get_or_create_section(section)
            .insert(option.to_string(), value.into());
    }

    /// Apply a `SECTION:OPTION:VALUE` override. `VALUE` may be omitted to
    /// set a flag, and may itself contain `:`.
    pub fn apply_override(&mut self, spec: &str) -> Result<()> {
        let mut parts = spec.splitn(3, ':');
        let section = parts.next().unwrap_or_default().trim();
        let option = parts.next().unwrap_or_default().trim();
        let value = parts.next().unwrap_or_default();
        if section.is_empty() || option.is_empty() {
            return Err(CoincflowError::ConfigError(format!(
                "config override '{spec}' is not SECTION:OPTION:VALUE"
            )));
        }
        self.set(section, option, value);
        Ok(())
    }

    pub fn get(&self, section: &str, option: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|s| s.get(option))
            .map(|v| v.as_str())
    }

    pub fn has_option(&self, section: &str, option: &str) -> bool {
        self.get(section, option).is_some()
    }

    pub fn require(&self, section: &str, option: &str) -> Result<&str> {
        self.get(section, option).ok_or_else(|| {
            CoincflowError::ConfigError(format!("missing option '{option}' in [{section}]"))
        })
    }

    /// Parse an option, `Ok(None)` if it is absent.
    pub fn get_parsed<T>(&self, section: &str, option: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(section, option) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
                CoincflowError::ConfigError(format!(
                    "[{section}] {option} = '{raw}' is invalid: {e}"
                ))
            }),
        }
    }

    /// Comma-separated list option; absent or empty gives an empty list.
    pub fn list(&self, section: &str, option: &str) -> Vec<String> {
        self.get(section, option)
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Look an option up in `[{section}-{tag}]` for each tag, then `[{section}]`.
    pub fn get_option_tags(&self, section: &str, option: &str, tags: &[String]) -> Option<&str> {
        tags.iter()
            .find_map(|tag| self.get(&tagged_section(section, tag), option))
            .or_else(|| self.get(section, option))
    }

    pub fn has_option_tags(&self, section: &str, option: &str, tags: &[String]) -> bool {
        self.get_option_tags(section, option, tags).is_some()
    }

    /// Merged view of `[stage]` followed by `[stage-{scope}]` for each scope;
    /// later scopes override earlier ones.
    pub fn options_for(&self, stage: &str, scopes: &[String]) -> Section {
        let mut merged = self.sections.get(stage).cloned().unwrap_or_default();
        for scope in scopes {
            if let Some(section) = self.sections.get(&tagged_section(stage, scope)) {
                merged.extend(section.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        merged
    }

    /// Tags of every `[{section}-{tag}]` subsection, in sorted order.
    pub fn subsection_tags(&self, section: &str) -> Vec<String> {
        let prefix = format!("{section}-");
        self.sections
            .keys()
            .filter_map(|name| name.strip_prefix(&prefix))
            .filter(|tag| !tag.is_empty())
            .map(|tag| tag.to_string())
            .collect()
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(&self.sections)?)
    }
}

/// `"{section}-{tag}"`, lower-cased.
pub fn tagged_section(section: &str, tag: &str) -> String {
    format!("{section}-{}", tag.to_lowercase())
}
