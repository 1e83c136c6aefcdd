//! Configuration management for tabconv
//!
//! Settings come from, lowest precedence first: built-in defaults, the first
//! config file found in the standard locations, `TABCONV_*` environment
//! variables and finally command-line flags.

use crate::cli::CliConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tabconv_formats::{
    AvroCompression, ConvertOptions, CsvReadOptions, CsvWriteOptions, Error, JsonWriteOptions,
    ParquetCompression, ParquetWriteOptions, QuoteStyle, ReadOptions, Result, Scratch,
    WriteOptions, XmlWriteOptions,
};

const CONFIG_NAMES: [&str; 4] = ["tabconv.toml", ".tabconv.toml", "tabconv.yaml", ".tabconv.yaml"];

/// Main configuration structure for tabconv
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Input/output configuration
    pub io: IoConfig,
    /// Format-specific configurations
    pub formats: FormatConfigs,
    /// Debug and diagnostic configuration
    pub debug: DebugConfig,
}

/// Input/output configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    /// Directory for spooling binary inputs; in memory when unset
    pub scratch_dir: Option<PathBuf>,
    /// Largest accepted input, in bytes
    pub max_input_size: Option<u64>,
    /// Whether existing output files may be replaced
    pub overwrite: bool,
}

/// Per-format configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfigs {
    /// CSV configuration
    pub csv: CsvConfig,
    /// JSON configuration
    pub json: JsonConfig,
    /// XML configuration
    pub xml: XmlConfig,
    /// Parquet configuration
    pub parquet: ParquetConfig,
    /// Avro configuration
    pub avro: AvroConfig,
}

/// CSV format configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvConfig {
    /// Field separator
    pub separator: String,
    /// Quote character
    pub quote_char: String,
    /// When fields are quoted on output
    pub quote_style: String,
}

/// JSON format configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonConfig {
    /// Whether to pretty-print output
    pub pretty: bool,
}

/// XML format configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XmlConfig {
    /// Spaces per nesting level
    pub indent: usize,
}

/// Parquet format configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParquetConfig {
    /// Compression codec
    pub compression: String,
    /// Maximum rows per row group
    pub row_group_size: usize,
}

/// Avro format configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvroConfig {
    /// Block codec
    pub compression: String,
}

/// Debug and diagnostic configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Verbosity level: 0 warn, 1 info, 2 debug, 3 and up trace
    pub verbosity: u8,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            separator: ",".to_string(),
            quote_char: "\"".to_string(),
            quote_style: "necessary".to_string(),
        }
    }
}

impl Default for JsonConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl Default for XmlConfig {
    fn default() -> Self {
        Self {
            indent: XmlWriteOptions::default().indent,
        }
    }
}

impl Default for ParquetConfig {
    fn default() -> Self {
        Self {
            compression: "snappy".to_string(),
            row_group_size: ParquetWriteOptions::default().row_group_size,
        }
    }
}

impl Default for AvroConfig {
    fn default() -> Self {
        Self {
            compression: "snappy".to_string(),
        }
    }
}

impl Config {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let mut config = Self::default();
        config.merge_file(path)?;
        Ok(config)
    }

    /// Load configuration from the standard file locations and the environment
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(config_path) = Self::find_config_file(None) {
            log::debug!("loading config from {}", config_path.display());
            config.merge_file(&config_path)?;
        }

        config.merge_env()?;

        Ok(config)
    }

    /// Find the configuration file in standard locations
    pub(crate) fn find_config_file(current_dir: Option<&Path>) -> Option<PathBuf> {
        let current_dir = current_dir.map_or_else(
            || std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            Path::to_path_buf,
        );

        let mut candidates: Vec<PathBuf> =
            CONFIG_NAMES.iter().map(|name| current_dir.join(name)).collect();

        if let Ok(home) = std::env::var("HOME") {
            let home = PathBuf::from(home);
            for name in CONFIG_NAMES {
                candidates.push(home.join(".config").join("tabconv").join(name));
                candidates.push(home.join(name));
            }
        }

        candidates.extend(CONFIG_NAMES.iter().map(|name| Path::new("/etc/tabconv").join(name)));

        candidates
            .into_iter()
            .find(|path| path.exists())
            .map(|path| path.canonicalize().unwrap_or(path))
    }

    /// Merge configuration from a TOML or YAML file
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::config(format!("failed to read config file: {e}")))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        let file_config: Config = match extension {
            "toml" => toml::from_str(&content)
                .map_err(|e| Error::config(format!("invalid TOML config: {e}")))?,
            "yaml" | "yml" => serde_yaml::from_str(&content)
                .map_err(|e| Error::config(format!("invalid YAML config: {e}")))?,
            _ => return Err(Error::config("unsupported config file format")),
        };
        self.merge(file_config);

        Ok(())
    }

    fn merge_env(&mut self) -> Result<()> {
        self.merge_env_with_reader(|key| std::env::var(key).ok())
    }

    /// Merge `TABCONV_*` variables read through `env_reader`
    ///
    /// Unparseable values are ignored with a warning.
    fn merge_env_with_reader<F>(&mut self, env_reader: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = env_reader("TABCONV_SCRATCH_DIR") {
            self.io.scratch_dir = (!val.is_empty()).then(|| PathBuf::from(val));
        }

        if let Some(val) = env_reader("TABCONV_MAX_INPUT_SIZE") {
            match parse_size(&val) {
                Ok(size) => self.io.max_input_size = Some(size),
                Err(e) => log::warn!("ignoring TABCONV_MAX_INPUT_SIZE: {e}"),
            }
        }

        if let Some(val) = env_reader("TABCONV_VERBOSITY") {
            match val.parse() {
                Ok(level) => self.debug.verbosity = level,
                Err(_) => log::warn!("ignoring TABCONV_VERBOSITY: {val:?} is not a number"),
            }
        }

        if let Some(val) = env_reader("TABCONV_PARQUET_COMPRESSION") {
            self.formats.parquet.compression = val;
        }

        if let Some(val) = env_reader("TABCONV_JSON_PRETTY") {
            self.formats.json.pretty = val != "0" && !val.eq_ignore_ascii_case("false");
        }

        Ok(())
    }

    /// Merge another config into this one; only non-default values win
    fn merge(&mut self, other: Config) {
        if other.io.scratch_dir.is_some() {
            self.io.scratch_dir = other.io.scratch_dir;
        }
        if other.io.max_input_size.is_some() {
            self.io.max_input_size = other.io.max_input_size;
        }
        if other.io.overwrite {
            self.io.overwrite = true;
        }

        let csv = CsvConfig::default();
        if other.formats.csv.separator != csv.separator {
            self.formats.csv.separator = other.formats.csv.separator;
        }
        if other.formats.csv.quote_char != csv.quote_char {
            self.formats.csv.quote_char = other.formats.csv.quote_char;
        }
        if other.formats.csv.quote_style != csv.quote_style {
            self.formats.csv.quote_style = other.formats.csv.quote_style;
        }

        if !other.formats.json.pretty {
            self.formats.json.pretty = false;
        }

        if other.formats.xml.indent != XmlConfig::default().indent {
            self.formats.xml.indent = other.formats.xml.indent;
        }

        let parquet = ParquetConfig::default();
        if other.formats.parquet.compression != parquet.compression {
            self.formats.parquet.compression = other.formats.parquet.compression;
        }
        if other.formats.parquet.row_group_size != parquet.row_group_size {
            self.formats.parquet.row_group_size = other.formats.parquet.row_group_size;
        }

        if other.formats.avro.compression != AvroConfig::default().compression {
            self.formats.avro.compression = other.formats.avro.compression;
        }

        if other.debug.verbosity != DebugConfig::default().verbosity {
            self.debug.verbosity = other.debug.verbosity;
        }
    }

    /// Apply command-line overrides
    pub fn apply_cli(&mut self, cli_config: &CliConfig) {
        if let Some(dir) = &cli_config.scratch_dir {
            self.io.scratch_dir = Some(dir.clone());
        }
        if cli_config.overwrite {
            self.io.overwrite = true;
        }
        if let Some(sep) = &cli_config.separator {
            self.formats.csv.separator = sep.clone();
        }
        if cli_config.compact {
            self.formats.json.pretty = false;
        }
        if let Some(compression) = &cli_config.compression {
            self.formats.parquet.compression = compression.clone();
        }
        if cli_config.verbose > 0 {
            self.debug.verbosity = cli_config.verbose;
        }
    }

    /// Reader settings for the engine
    pub fn to_read_options(&self) -> Result<ReadOptions> {
        Ok(ReadOptions {
            csv: CsvReadOptions {
                separator: single_byte("CSV separator", &self.formats.csv.separator)?,
                quote_char: single_byte("CSV quote character", &self.formats.csv.quote_char)?,
            },
        })
    }

    /// Writer settings for the engine
    pub fn to_write_options(&self) -> Result<WriteOptions> {
        Ok(WriteOptions {
            csv: CsvWriteOptions {
                separator: single_byte("CSV separator", &self.formats.csv.separator)?,
                quote_char: single_byte("CSV quote character", &self.formats.csv.quote_char)?,
                quote_style: self
                    .formats
                    .csv
                    .quote_style
                    .parse::<QuoteStyle>()
                    .map_err(Error::config)?,
            },
            json: JsonWriteOptions {
                pretty: self.formats.json.pretty,
            },
            xml: XmlWriteOptions {
                indent: self.formats.xml.indent,
            },
            parquet: ParquetWriteOptions {
                compression: self
                    .formats
                    .parquet
                    .compression
                    .parse::<ParquetCompression>()
                    .map_err(Error::config)?,
                row_group_size: self.formats.parquet.row_group_size,
            },
            avro: tabconv_formats::AvroWriteOptions {
                compression: self
                    .formats
                    .avro
                    .compression
                    .parse::<AvroCompression>()
                    .map_err(Error::config)?,
            },
        })
    }

    /// Full engine settings, including scratch storage
    pub fn to_convert_options(&self) -> Result<ConvertOptions> {
        let scratch = match &self.io.scratch_dir {
            Some(dir) => Scratch::in_dir(dir),
            None => Scratch::in_memory(),
        };
        Ok(ConvertOptions {
            read: self.to_read_options()?,
            write: self.to_write_options()?,
            scratch,
        })
    }

    /// Save configuration to a TOML or YAML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("toml");

        let content = match extension {
            "toml" => toml::to_string_pretty(self)
                .map_err(|e| Error::config(format!("failed to serialize config: {e}")))?,
            "yaml" | "yml" => serde_yaml::to_string(self)
                .map_err(|e| Error::config(format!("failed to serialize config: {e}")))?,
            _ => return Err(Error::config("unsupported config file format")),
        };

        fs::write(path, content)
            .map_err(|e| Error::config(format!("failed to write config file: {e}")))?;

        Ok(())
    }
}

fn single_byte(what: &str, value: &str) -> Result<u8> {
    match value.as_bytes() {
        [byte] => Ok(*byte),
        _ => Err(Error::config(format!(
            "{what} must be a single ASCII character, got {value:?}"
        ))),
    }
}

/// Parse a size such as `512`, `64KB`, `10MB` or `1GB` into bytes
pub fn parse_size(size: &str) -> Result<u64> {
    let upper = size.trim().to_uppercase();
    let (digits, unit) = if let Some(n) = upper.strip_suffix("GB") {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = upper.strip_suffix("MB") {
        (n, 1024 * 1024)
    } else if let Some(n) = upper.strip_suffix("KB") {
        (n, 1024)
    } else if let Some(n) = upper.strip_suffix('B') {
        (n, 1)
    } else {
        (upper.as_str(), 1)
    };

    digits
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(unit))
        .ok_or_else(|| {
            Error::config(format!(
                "invalid size: {size} (use a form like '500MB' or '1GB')"
            ))
        })
}

/// Write the default configuration to `path`
pub fn create_default_config_file(path: &Path) -> Result<()> {
    Config::default().save(path)
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.formats.csv.separator.len() != 1 {
        return Err(Error::config("CSV separator must be a single character"));
    }

    if config.formats.csv.quote_char.len() != 1 {
        return Err(Error::config(
            "CSV quote character must be a single character",
        ));
    }

    if config.formats.parquet.row_group_size == 0 {
        return Err(Error::config("Parquet row group size must be greater than 0"));
    }

    if config.io.max_input_size == Some(0) {
        return Err(Error::config("maximum input size must be greater than 0"));
    }

    // Surfaces unknown quote styles and compression names
    config.to_write_options()?;

    if let Some(dir) = &config.io.scratch_dir {
        if !dir.is_dir() {
            log::warn!("scratch directory does not exist: {}", dir.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.formats.csv.separator, ",");
        assert!(config.formats.json.pretty);
        assert_eq!(config.formats.parquet.compression, "snappy");
        assert_eq!(config.debug.verbosity, 0);
        assert!(config.io.scratch_dir.is_none());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_find_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let temp_path = temp_dir.path();

        fs::write(temp_path.join("tabconv.yaml"), "io: {}").unwrap();
        assert_eq!(
            Config::find_config_file(Some(temp_path)).unwrap(),
            temp_path.join("tabconv.yaml").canonicalize().unwrap()
        );

        // toml comes before yaml
        fs::write(temp_path.join("tabconv.toml"), "").unwrap();
        assert_eq!(
            Config::find_config_file(Some(temp_path)).unwrap(),
            temp_path.join("tabconv.toml").canonicalize().unwrap()
        );

        // hidden toml comes before yaml
        fs::remove_file(temp_path.join("tabconv.toml")).unwrap();
        fs::write(temp_path.join(".tabconv.toml"), "").unwrap();
        assert_eq!(
            Config::find_config_file(Some(temp_path)).unwrap(),
            temp_path.join(".tabconv.toml").canonicalize().unwrap()
        );
    }

    #[test]
    fn test_merge_file_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[io]
max_input_size = 1048576

[formats.csv]
separator = "|"

[formats.parquet]
compression = "zstd"
row_group_size = 5000
"#;
        fs::write(&config_path, toml_content).unwrap();

        let mut config = Config::default();
        config.merge_file(&config_path).unwrap();

        assert_eq!(config.io.max_input_size, Some(1_048_576));
        assert_eq!(config.formats.csv.separator, "|");
        assert_eq!(config.formats.parquet.compression, "zstd");
        assert_eq!(config.formats.parquet.row_group_size, 5000);
        assert!(config.formats.json.pretty);
    }

    #[test]
    fn test_merge_file_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.yaml");

        let yaml_content = r#"
formats:
  json:
    pretty: false
  csv:
    quote_style: always
debug:
  verbosity: 2
"#;
        fs::write(&config_path, yaml_content).unwrap();

        let mut config = Config::default();
        config.merge_file(&config_path).unwrap();

        assert!(!config.formats.json.pretty);
        assert_eq!(config.formats.csv.quote_style, "always");
        assert_eq!(config.debug.verbosity, 2);
    }

    #[test]
    fn test_merge_file_errors() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");

        fs::write(&config_path, "invalid toml content [").unwrap();
        let mut config = Config::default();
        assert!(config.merge_file(&config_path).is_err());

        let config_path = temp_dir.path().join("config.json");
        fs::write(&config_path, "{}").unwrap();
        assert!(config.merge_file(&config_path).is_err());

        let config_path = temp_dir.path().join("nonexistent.toml");
        assert!(matches!(
            config.merge_file(&config_path),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_merge_env() {
        let mut config = Config::default();

        let env_reader = |key: &str| match key {
            "TABCONV_SCRATCH_DIR" => Some("/tmp/tabconv".to_string()),
            "TABCONV_MAX_INPUT_SIZE" => Some("10MB".to_string()),
            "TABCONV_VERBOSITY" => Some("2".to_string()),
            "TABCONV_PARQUET_COMPRESSION" => Some("gzip".to_string()),
            "TABCONV_JSON_PRETTY" => Some("false".to_string()),
            _ => None,
        };

        config.merge_env_with_reader(env_reader).unwrap();

        assert_eq!(config.io.scratch_dir, Some(PathBuf::from("/tmp/tabconv")));
        assert_eq!(config.io.max_input_size, Some(10 * 1024 * 1024));
        assert_eq!(config.debug.verbosity, 2);
        assert_eq!(config.formats.parquet.compression, "gzip");
        assert!(!config.formats.json.pretty);
    }

    #[test]
    fn test_merge_env_invalid_values() {
        let mut config = Config::default();

        let env_reader = |key: &str| match key {
            "TABCONV_MAX_INPUT_SIZE" => Some("lots".to_string()),
            "TABCONV_VERBOSITY" => Some("loud".to_string()),
            _ => None,
        };

        config.merge_env_with_reader(env_reader).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = Config::default();
        let cli_config = CliConfig {
            verbose: 3,
            scratch_dir: Some(PathBuf::from("/scratch")),
            separator: Some(";".to_string()),
            compression: Some("lz4".to_string()),
            compact: true,
            overwrite: true,
        };

        config.apply_cli(&cli_config);

        assert_eq!(config.debug.verbosity, 3);
        assert_eq!(config.io.scratch_dir, Some(PathBuf::from("/scratch")));
        assert_eq!(config.formats.csv.separator, ";");
        assert_eq!(config.formats.parquet.compression, "lz4");
        assert!(!config.formats.json.pretty);
        assert!(config.io.overwrite);
    }

    #[test]
    fn test_cli_without_flags_keeps_config() {
        let mut config = Config::default();
        config.debug.verbosity = 2;
        config.apply_cli(&CliConfig::default());
        assert_eq!(config.debug.verbosity, 2);
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("512").unwrap(), 512);
        assert_eq!(parse_size("512B").unwrap(), 512);
        assert_eq!(parse_size("64kb").unwrap(), 64 * 1024);
        assert_eq!(parse_size("10MB").unwrap(), 10 * 1024 * 1024);
        assert_eq!(parse_size("1GB").unwrap(), 1024 * 1024 * 1024);
        assert!(parse_size("ten").is_err());
        assert!(parse_size("").is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.formats.csv.separator = "::".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.formats.parquet.row_group_size = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.formats.parquet.compression = "bzip2".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.formats.avro.compression = "deflate".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.formats.csv.quote_style = "sometimes".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_to_convert_options() {
        let mut config = Config::default();
        config.formats.csv.separator = "\t".to_string();
        config.formats.parquet.compression = "none".to_string();
        config.io.scratch_dir = Some(PathBuf::from("/scratch"));

        let options = config.to_convert_options().unwrap();
        assert_eq!(options.read.csv.separator, b'\t');
        assert_eq!(options.write.csv.separator, b'\t');
        assert_eq!(
            options.write.parquet.compression,
            ParquetCompression::Uncompressed
        );
        assert_eq!(options.scratch, Scratch::in_dir("/scratch"));
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.formats.xml.indent = 4;
        config.io.overwrite = true;

        for name in ["saved.toml", "saved.yaml"] {
            let path = temp_dir.path().join(name);
            config.save(&path).unwrap();
            assert_eq!(Config::load_from_file(&path).unwrap(), config);
        }

        assert!(config.save(&temp_dir.path().join("saved.ini")).is_err());
    }

    #[test]
    fn test_create_default_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tabconv.toml");
        create_default_config_file(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("[formats.parquet]"));
        assert_eq!(Config::load_from_file(&path).unwrap(), Config::default());
    }
}
