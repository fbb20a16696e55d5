//! Extractor configuration.
//!
//! Loaded from one YAML file with `${VAR}` and `${VAR:-default}` substitution,
//! then overlaid with the pipeline's environment overrides.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use footprint::{PipelineConfig, ProductConfig};

/// Top-level extractor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Window, thresholds, tolerance and worker settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Basin boundary files
    pub basins: BasinPaths,

    /// Directory receiving every product's tables
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Products to extract, in run order
    pub products: Vec<ProductConfig>,
}

/// GeoJSON files holding the two watershed boundaries (lon/lat).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasinPaths {
    pub ca: PathBuf,
    pub ar: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl ExtractorConfig {
    /// Load, expand, override and validate a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read extractor config from {:?}", path))?;
        let mut config = Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse extractor config from {:?}", path))?;
        config.pipeline = config.pipeline.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML after environment substitution.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let expanded = shellexpand::env(content).context("Failed to substitute environment variables")?;
        let config: ExtractorConfig = serde_yaml::from_str(&expanded)?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate().map_err(anyhow::Error::msg)?;

        anyhow::ensure!(!self.products.is_empty(), "At least one product must be configured");

        let mut names = HashSet::new();
        for product in &self.products {
            product.validate().map_err(anyhow::Error::msg)?;
            anyhow::ensure!(
                names.insert(product.name.as_str()),
                "Product {} is configured more than once",
                product.name
            );
        }

        anyhow::ensure!(
            !self.basins.ca.as_os_str().is_empty() && !self.basins.ar.as_os_str().is_empty(),
            "Both basin boundary paths must be set"
        );
        anyhow::ensure!(
            !self.output_dir.as_os_str().is_empty(),
            "Output directory cannot be empty"
        );

        Ok(())
    }

    /// Products whose name matches `only`, or all of them.
    pub fn selected_products(&self, only: Option<&str>) -> Result<Vec<&ProductConfig>> {
        match only {
            None => Ok(self.products.iter().collect()),
            Some(name) => {
                let selected: Vec<_> = self
                    .products
                    .iter()
                    .filter(|p| p.name.eq_ignore_ascii_case(name))
                    .collect();
                anyhow::ensure!(!selected.is_empty(), "Product {} is not configured", name);
                Ok(selected)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
pipeline:
  start: 2017-01-01
  end: 2019-01-01
  buffer_m: 8000
  workers: 2
basins:
  ca: ${EXTRACTOR_TEST_BASINS:-basins}/ca.geojson
  ar: ${EXTRACTOR_TEST_BASINS:-basins}/ar.geojson
products:
  - name: DAYMET
    band: prcp
    crs: DAYMET
    source:
      kind: ascii_grid
      root: data/daymet
  - name: GRIDMET
    band: pr
    crs: EPSG:4326
    source:
      kind: ascii_grid
      root: data/gridmet
"#;

    #[test]
    fn test_parse_with_defaults_and_substitution() {
        std::env::remove_var("EXTRACTOR_TEST_BASINS");
        let config = ExtractorConfig::from_yaml_str(YAML).unwrap();
        assert_eq!(config.basins.ca, PathBuf::from("basins/ca.geojson"));
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.pipeline.buffer_m, 8000.0);
        assert_eq!(config.pipeline.min_area_m2, 1.0);
        assert_eq!(config.pipeline.workers, 2);
        assert_eq!(config.products.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_required_variable() {
        std::env::remove_var("EXTRACTOR_TEST_REQUIRED");
        let yaml = YAML.replace("${EXTRACTOR_TEST_BASINS:-basins}/ar", "${EXTRACTOR_TEST_REQUIRED}/ar");
        assert!(ExtractorConfig::from_yaml_str(&yaml).is_err());
    }

    #[test]
    fn test_duplicate_product_rejected() {
        let mut config = ExtractorConfig::from_yaml_str(YAML).unwrap();
        config.products[1].name = "DAYMET".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_invalid_window_rejected() {
        let yaml = YAML.replace("end: 2019-01-01", "end: 2016-01-01");
        let config = ExtractorConfig::from_yaml_str(&yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_selected_products() {
        let config = ExtractorConfig::from_yaml_str(YAML).unwrap();
        assert_eq!(config.selected_products(None).unwrap().len(), 2);
        let only = config.selected_products(Some("gridmet")).unwrap();
        assert_eq!(only[0].band, "pr");
        assert!(config.selected_products(Some("PRISM")).is_err());
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let config = ExtractorConfig::from_yaml_str(include_str!("../config/extractor.yaml")).unwrap();
        assert!(config.validate().is_ok());
        let names: Vec<&str> = config.products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["DAYMET", "PRISM", "GRIDMET"]);
        assert_eq!(config.pipeline.vectorize.tile_size, 256);
    }

    #[test]
    fn test_shipped_config_loads_without_environment() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/extractor.yaml");
        let config = ExtractorConfig::load(path).unwrap();
        assert_eq!(config.products.len(), 3);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extractor.yaml");
        fs::write(&path, YAML).unwrap();
        let config = ExtractorConfig::load(&path).unwrap();
        assert_eq!(config.products[0].name, "DAYMET");
        assert!(ExtractorConfig::load(dir.path().join("missing.yaml")).is_err());
    }
}
