use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "docbook.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to read template file at {template_path}: {source}")]
    TemplateReadError {
        template_path: PathBuf,
        source: std::io::Error,
    },
}

fn default_root_element() -> String {
    "section".to_string()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_root_element")]
    pub docbook_default_root_element: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docbook_template_file: Option<PathBuf>,

    #[serde(default)]
    pub docbook_use_xml_id_in_titles: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docbook_section_hierarchy: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            docbook_default_root_element: default_root_element(),
            docbook_template_file: None,
            docbook_use_xml_id_in_titles: false,
            docbook_section_hierarchy: None,
        }
    }
}

impl Config {
    /// Loads the config at `config_path`; a missing file is `Ok(None)`.
    ///
    /// A relative `docbook_template_file` is resolved against the config
    /// file's directory after `~` and `$VAR` expansion.
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        if let Some(template) = config.docbook_template_file.take() {
            let expanded = Self::expand_path(&template).unwrap_or(template);
            let base = config_path.parent().unwrap_or_else(|| Path::new(""));
            config.docbook_template_file = Some(base.join(expanded));
        }

        Ok(Some(config))
    }

    /// Reads the configured template text, if a template file is set.
    pub fn load_template(&self) -> Result<Option<String>, ConfigError> {
        let Some(template_path) = &self.docbook_template_file else {
            return Ok(None);
        };
        std::fs::read_to_string(template_path)
            .map(Some)
            .map_err(|source| ConfigError::TemplateReadError {
                template_path: template_path.clone(),
                source,
            })
    }

    /// Sectioning tags to use, or `None` for the built-in table.
    pub fn section_hierarchy(&self) -> Option<&[String]> {
        self.docbook_section_hierarchy
            .as_deref()
            .filter(|tags| !tags.is_empty())
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_host_conventions() {
        let config = Config::default();
        assert_eq!(config.docbook_default_root_element, "section");
        assert!(config.docbook_template_file.is_none());
        assert!(!config.docbook_use_xml_id_in_titles);
        assert!(config.section_hierarchy().is_none());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_load_full_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(
            &config_file,
            r#"
docbook_default_root_element = "chapter"
docbook_use_xml_id_in_titles = true
docbook_section_hierarchy = ["chapter", "sect1", "sect2"]
"#,
        )
        .unwrap();

        let config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(config.docbook_default_root_element, "chapter");
        assert!(config.docbook_use_xml_id_in_titles);
        assert_eq!(
            config.section_hierarchy(),
            Some(&["chapter".to_string(), "sect1".to_string(), "sect2".to_string()][..])
        );
    }

    #[test]
    fn test_template_path_is_relative_to_config_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&config_file, "docbook_template_file = \"shell.xml\"\n").unwrap();
        std::fs::write(
            temp_dir.path().join("shell.xml"),
            "<{{data.root_element}}>{{data.contents}}</{{data.root_element}}>",
        )
        .unwrap();

        let config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(
            config.docbook_template_file.as_deref(),
            Some(temp_dir.path().join("shell.xml").as_path())
        );
        let template = config.load_template().unwrap().unwrap();
        assert!(template.contains("{{data.contents}}"));
    }

    #[test]
    fn test_template_path_with_env_var() {
        unsafe {
            env::set_var("DOCBOOK_TEMPLATES", "/srv/templates");
        }

        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(
            &config_file,
            "docbook_template_file = \"$DOCBOOK_TEMPLATES/book.xml\"\n",
        )
        .unwrap();

        let config = Config::load_from_path(&config_file).unwrap().unwrap();
        assert_eq!(
            config.docbook_template_file,
            Some(PathBuf::from("/srv/templates/book.xml"))
        );

        unsafe {
            env::remove_var("DOCBOOK_TEMPLATES");
        }
    }

    #[test]
    fn test_missing_template_file_is_an_error() {
        let config = Config {
            docbook_template_file: Some(PathBuf::from("/definitely/not/here.xml")),
            ..Config::default()
        };
        assert!(matches!(
            config.load_template(),
            Err(ConfigError::TemplateReadError { .. })
        ));
    }

    #[test]
    fn test_malformed_config_is_a_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&config_file, "docbook_use_xml_id_in_titles = \"sometimes\"\n").unwrap();

        let err = Config::load_from_path(&config_file).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
    }
}
