use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    pub thread_count: Option<usize>,
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    pub seed_csv: Option<PathBuf>,
    pub basemap_path: Option<PathBuf>,
    pub font_path: Option<PathBuf>,
    #[serde(default = "default_map_width")]
    pub map_width: u32,
}

fn default_listen_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/citymap.db")
}

fn default_map_width() -> u32 {
    1000
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let path = if Path::new("citymap.toml").exists() {
            "citymap.toml"
        } else if Path::new("citymap.example.toml").exists() {
            "citymap.example.toml"
        } else {
            return Err(anyhow::anyhow!("Configuration file not found. Please create citymap.toml or provide citymap.example.toml."));
        };

        Self::from_path(Path::new(path))
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:3001");
        assert_eq!(config.database_path, PathBuf::from("data/citymap.db"));
        assert_eq!(config.map_width, 1000);
        assert!(config.seed_csv.is_none());
        assert!(config.font_path.is_none());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = Config::from_toml(
            r#"
            listen_addr = "127.0.0.1:8080"
            thread_count = 2
            map_width = 1600
            seed_csv = "data/cities.csv"
            "#,
        )
        .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.thread_count, Some(2));
        assert_eq!(config.map_width, 1600);
        assert_eq!(config.seed_csv, Some(PathBuf::from("data/cities.csv")));
    }

    #[test]
    fn bundled_example_parses() {
        let config = Config::from_toml(include_str!("../citymap.example.toml")).unwrap();
        assert!(config.seed_csv.is_some());
    }
}
