use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get path to a specific config file or subdirectory
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    /// Ensure the config directory exists
    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Generate default configuration template as a string with comments.
    /// All fields are commented out so defaults are used, but users can uncomment to override.
    pub fn generate_default_config(&self) -> String {
        let config = ExplorerConfig::default();
        let toml_str = toml::to_string_pretty(&config)
            .unwrap_or_else(|e| panic!("Failed to serialize default config: {}", e));

        let mut comments: HashMap<String, &str> = HashMap::new();
        for (field, comment) in APP_COMMENTS {
            comments.insert(field.to_string(), *comment);
        }
        for (field, comment) in LOADING_COMMENTS {
            comments.insert(format!("loading.{}", field), *comment);
        }
        for (field, comment) in PREVIEW_COMMENTS {
            comments.insert(format!("preview.{}", field), *comment);
        }
        for (field, comment) in FORMAT_COMMENTS {
            comments.insert(format!("format.{}", field), *comment);
        }

        Self::comment_all_fields(&toml_str, &comments)
    }

    /// Comment out every field, prefix each with its description, and list
    /// unset `Option` fields as `# field = null` so they remain discoverable.
    fn comment_all_fields(toml: &str, comments: &HashMap<String, &str>) -> String {
        let mut result = String::new();
        result.push_str("# pivotchain configuration file\n");
        result
            .push_str("# This file uses TOML format. See https://toml.io/ for syntax reference.\n");
        result.push('\n');

        let mut current_section = String::new();
        let mut seen: HashSet<String> = HashSet::new();

        for line in toml.lines() {
            let trimmed = line.trim();
            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                current_section = trimmed[1..trimmed.len() - 1].to_string();
                if let Some((_, header)) = SECTION_HEADERS.iter().find(|(s, _)| *s == current_section)
                {
                    result.push_str(header);
                    result.push('\n');
                }
                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
                Self::push_missing_option_fields(&mut result, &current_section, comments, toml);
                continue;
            }

            if let Some(eq_pos) = trimmed.find('=') {
                let field = trimmed[..eq_pos].trim();
                let path = if current_section.is_empty() {
                    field.to_string()
                } else {
                    format!("{}.{}", current_section, field)
                };
                if let Some(comment) = comments.get(&path) {
                    for comment_line in comment.lines() {
                        result.push_str("# ");
                        result.push_str(comment_line);
                        result.push('\n');
                    }
                }
                seen.insert(path);
                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
            } else {
                result.push_str(line);
                result.push('\n');
            }
        }

        result
    }

    fn push_missing_option_fields(
        result: &mut String,
        section: &str,
        comments: &HashMap<String, &str>,
        toml: &str,
    ) {
        for field in OPTION_FIELDS {
            let Some(name) = field.strip_prefix(&format!("{}.", section)) else {
                continue;
            };
            if toml.contains(&format!("{} =", name)) {
                continue;
            }
            if let Some(comment) = comments.get(*field) {
                for comment_line in comment.lines() {
                    result.push_str("# ");
                    result.push_str(comment_line);
                    result.push('\n');
                }
            }
            result.push_str(&format!("# {} = null\n", name));
        }
    }

    /// Write default configuration to config file
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        let template = self.generate_default_config();
        std::fs::write(&config_path, template)?;

        Ok(config_path)
    }
}

/// Complete explorer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Configuration format version (for future compatibility)
    pub version: String,
    pub loading: LoadingConfig,
    pub preview: PreviewConfig,
    pub format: FormatConfig,
}

const APP_COMMENTS: &[(&str, &str)] = &[(
    "version",
    "Configuration format version (for future compatibility)",
)];

const SECTION_HEADERS: &[(&str, &str)] = &[
    (
        "loading",
        "# ============================================================================\n# File Loading Defaults\n# ============================================================================",
    ),
    (
        "preview",
        "# ============================================================================\n# Explore / Preview\n# ============================================================================",
    ),
    (
        "format",
        "# ============================================================================\n# Pivot Formatting\n# ============================================================================",
    ),
];

// Option fields that should appear in the template even when unset.
const OPTION_FIELDS: &[&str] = &[
    "loading.sheet",
    "loading.skip_rows",
    "loading.infer_schema_length",
    "loading.null_values",
    "loading.ignore_errors",
];

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct LoadingConfig {
    /// Excel sheet: 0-based index or sheet name.
    pub sheet: Option<String>,
    /// Leading spreadsheet rows to discard before the header row.
    pub skip_rows: Option<usize>,
    /// Rows sampled when inferring CSV column types.
    pub infer_schema_length: Option<usize>,
    /// CSV tokens read as null.
    pub null_values: Option<Vec<String>>,
    /// When true, the CSV reader skips unparsable fields instead of failing.
    pub ignore_errors: Option<bool>,
}

const LOADING_COMMENTS: &[(&str, &str)] = &[
    (
        "sheet",
        "Excel sheet to read: 0-based index (\"0\") or sheet name (\"Sales\")",
    ),
    (
        "skip_rows",
        "Number of leading rows to discard before the header row (Excel only)",
    ),
    (
        "infer_schema_length",
        "Rows sampled when inferring CSV column types (default 1000)",
    ),
    ("null_values", "CSV values to read as null, e.g. [\"NA\", \"-\"]"),
    (
        "ignore_errors",
        "When true, CSV fields that fail to parse become null instead of aborting the load",
    ),
];

impl LoadingConfig {
    pub fn merge(&mut self, other: Self) {
        if other.sheet.is_some() {
            self.sheet = other.sheet;
        }
        if other.skip_rows.is_some() {
            self.skip_rows = other.skip_rows;
        }
        if other.infer_schema_length.is_some() {
            self.infer_schema_length = other.infer_schema_length;
        }
        if other.null_values.is_some() {
            self.null_values = other.null_values;
        }
        if other.ignore_errors.is_some() {
            self.ignore_errors = other.ignore_errors;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PreviewConfig {
    /// Rows shown by explore()
    pub rows: usize,
}

const PREVIEW_COMMENTS: &[(&str, &str)] = &[("rows", "Rows shown in the explore() head preview")];

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            rows: crate::DEFAULT_PREVIEW_ROWS,
        }
    }
}

impl PreviewConfig {
    pub fn merge(&mut self, other: Self) {
        let default = PreviewConfig::default();
        if other.rows != default.rows {
            self.rows = other.rows;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FormatConfig {
    /// "currency" renders numbers as text with thousands separators; anything else leaves them numeric.
    pub style: String,
    pub decimals: usize,
    pub grand_total: bool,
    /// Value used for empty pivot cells. Unset leaves nulls in place.
    pub null_fill: Option<f64>,
}

const FORMAT_COMMENTS: &[(&str, &str)] = &[
    (
        "style",
        "\"currency\" turns numeric pivot cells into text like 1,234.50; any other value keeps numbers",
    ),
    ("decimals", "Fractional digits used by the currency style"),
    (
        "grand_total",
        "Append a \"Grand Total\" column (row sums) and row (column sums)",
    ),
    ("null_fill", "Replacement for empty pivot cells"),
];

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            style: "currency".to_string(),
            decimals: 0,
            grand_total: true,
            null_fill: Some(0.0),
        }
    }
}

impl FormatConfig {
    pub fn merge(&mut self, other: Self) {
        let default = FormatConfig::default();
        if other.style != default.style {
            self.style = other.style;
        }
        if other.decimals != default.decimals {
            self.decimals = other.decimals;
        }
        if other.grand_total != default.grand_total {
            self.grand_total = other.grand_total;
        }
        if other.null_fill != default.null_fill {
            self.null_fill = other.null_fill;
        }
    }
}

/// Upper bound on currency fractional digits.
pub const MAX_DECIMALS: usize = 12;

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            loading: LoadingConfig::default(),
            preview: PreviewConfig::default(),
            format: FormatConfig::default(),
        }
    }
}

impl ExplorerConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        let mut config = ExplorerConfig::default();

        let config_path = ConfigManager::new(app_name)
            .ok()
            .map(|m| m.config_path("config.toml"));
        if let Some(path) = config_path.as_ref() {
            config.merge(Self::load_file(path)?);
        }

        config.validate().map_err(|e| {
            let path_hint = config_path
                .as_ref()
                .map(|p| format!(" in {}", p.display()))
                .unwrap_or_default();
            eyre!("Invalid configuration{}: {}", path_hint, e)
        })?;

        Ok(config)
    }

    /// Read a single config file. A missing file yields the defaults.
    pub fn load_file(config_path: &Path) -> Result<ExplorerConfig> {
        if !config_path.exists() {
            return Ok(ExplorerConfig::default());
        }

        let content = std::fs::read_to_string(config_path).map_err(|e| {
            eyre!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        toml::from_str(&content).map_err(|e| {
            eyre!(
                "Failed to parse config file at {}: {}",
                config_path.display(),
                e
            )
        })
    }

    /// Parse and validate configuration text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config = ExplorerConfig::default();
        let parsed: ExplorerConfig =
            toml::from_str(content).map_err(|e| eyre!("Failed to parse config: {}", e))?;
        config.merge(parsed);
        config.validate()?;
        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: ExplorerConfig) {
        if other.version != ExplorerConfig::default().version {
            self.version = other.version;
        }
        self.loading.merge(other.loading);
        self.preview.merge(other.preview);
        self.format.merge(other.format);
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.1.x",
                self.version
            ));
        }

        if self.preview.rows == 0 {
            return Err(eyre!("preview.rows must be greater than 0"));
        }

        if self.format.decimals > MAX_DECIMALS {
            return Err(eyre!(
                "format.decimals must be at most {}, got {}",
                MAX_DECIMALS,
                self.format.decimals
            ));
        }

        if let Some(fill) = self.format.null_fill {
            if !fill.is_finite() {
                return Err(eyre!("format.null_fill must be a finite number"));
            }
        }

        Ok(())
    }
}
