use pivotchain::config::{ConfigManager, ExplorerConfig};
use pivotchain::{FormatOptions, FormatStyle, OpenOptions, SheetSelector};
use std::fs;
use tempfile::TempDir;

// Helper to create a temporary config directory for testing
fn setup_test_config_dir() -> (TempDir, ConfigManager) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_manager = ConfigManager::with_dir(temp_dir.path().to_path_buf());
    (temp_dir, config_manager)
}

#[test]
fn test_default_config() {
    let config = ExplorerConfig::default();

    assert_eq!(config.version, "0.1");

    // Loading defaults are all unset
    assert!(config.loading.sheet.is_none());
    assert!(config.loading.skip_rows.is_none());
    assert!(config.loading.null_values.is_none());

    assert_eq!(config.preview.rows, 5);

    assert_eq!(config.format.style, "currency");
    assert_eq!(config.format.decimals, 0);
    assert!(config.format.grand_total);
    assert_eq!(config.format.null_fill, Some(0.0));
}

#[test]
fn test_generate_default_config() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    let template = config_manager.generate_default_config();

    assert!(template.contains("# [preview]"));
    assert!(template.contains("# [format]"));
    assert!(template.contains("version = \"0.1\""));
    assert!(template.contains("Pivot Formatting"));

    // Every line is a comment or blank, so the template changes nothing
    for line in template.lines() {
        let line = line.trim();
        assert!(line.is_empty() || line.starts_with('#'), "live line: {}", line);
    }
}

#[test]
fn test_write_default_config() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    let config_path = config_manager
        .write_default_config(false)
        .expect("Failed to write config");
    assert!(config_path.exists());

    let content = fs::read_to_string(&config_path).expect("Failed to read config");
    assert!(content.contains("[format]"));

    // A second write without force refuses to overwrite
    assert!(config_manager.write_default_config(false).is_err());
    assert!(config_manager.write_default_config(true).is_ok());
}

#[test]
fn test_template_parses_to_defaults() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    let template = config_manager.generate_default_config();

    let config = ExplorerConfig::from_toml_str(&template).expect("template should parse");
    assert_eq!(config.preview, ExplorerConfig::default().preview);
    assert_eq!(config.format, ExplorerConfig::default().format);
}

#[test]
fn test_partial_config_merges_over_defaults() {
    let config = ExplorerConfig::from_toml_str(
        r#"
[loading]
sheet = "Q1"
skip_rows = 2
null_values = ["NA"]

[format]
style = "plain"
decimals = 2
"#,
    )
    .expect("config should parse");

    assert_eq!(config.loading.sheet.as_deref(), Some("Q1"));
    assert_eq!(config.preview.rows, 5);
    assert!(config.format.grand_total);

    let options = OpenOptions::from_config(&config.loading);
    assert_eq!(options.sheet, SheetSelector::Name("Q1".to_string()));
    assert_eq!(options.skip_rows, 2);
    assert_eq!(options.null_values, Some(vec!["NA".to_string()]));

    let format = FormatOptions::from_config(&config.format);
    assert_eq!(format.style, FormatStyle::Plain);
    assert_eq!(format.decimals, 2);
    assert_eq!(format.null_fill, Some(0.0));
}

#[test]
fn test_invalid_values_are_rejected() {
    assert!(ExplorerConfig::from_toml_str("version = \"2.0\"").is_err());
    assert!(ExplorerConfig::from_toml_str("[preview]\nrows = 0").is_err());
    assert!(ExplorerConfig::from_toml_str("[format]\ndecimals = 40").is_err());
    assert!(ExplorerConfig::from_toml_str("[format]\nnull_fill = nan").is_err());
    assert!(ExplorerConfig::from_toml_str("[format]\ndecimals = \"two\"").is_err());
}

#[test]
fn test_load_file() {
    let (temp_dir, config_manager) = setup_test_config_dir();

    let missing = ExplorerConfig::load_file(&temp_dir.path().join("absent.toml"))
        .expect("missing file yields defaults");
    assert_eq!(missing.preview.rows, 5);

    config_manager.ensure_config_dir().unwrap();
    let path = config_manager.config_path("config.toml");
    fs::write(&path, "[preview]\nrows = 12\n").unwrap();
    let config = ExplorerConfig::load_file(&path).expect("file should parse");
    assert_eq!(config.preview.rows, 12);

    fs::write(&path, "[preview\nrows = ").unwrap();
    let err = ExplorerConfig::load_file(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}
