//! INI file configuration adapter.
//!
//! Section and key names are case-sensitive so custom ladder entries keep
//! the names they were given.

use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Ini::new_cs();
        config.load(path).map_err(std::io::Error::other)?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new_cs();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    /// Configuration with every key absent; all lookups return defaults.
    pub fn empty() -> Self {
        Self {
            config: Ini::new_cs(),
        }
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }

    /// Entries sorted by key; keys without a value are skipped.
    fn get_section(&self, section: &str) -> Vec<(String, String)> {
        let Some(entries) = self.config.get_map_ref().get(section) else {
            return Vec::new();
        };
        let mut pairs: Vec<(String, String)> = entries
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| (k.clone(), v.clone())))
            .collect();
        pairs.sort();
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[engine]
range_mode = n_day
n_days = 5

[levels]
profile = alternate
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("engine", "range_mode"),
            Some("n_day".to_string())
        );
        assert_eq!(adapter.get_int("engine", "n_days", 0), 5);
        assert_eq!(
            adapter.get_string("levels", "profile"),
            Some("alternate".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[engine]\nlookback = 20\n").unwrap();
        assert_eq!(adapter.get_string("engine", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_default_for_missing_or_non_numeric() {
        let adapter = FileConfigAdapter::from_string("[engine]\nlookback = abc\n").unwrap();
        assert_eq!(adapter.get_int("engine", "lookback", 42), 42);
        assert_eq!(adapter.get_int("engine", "missing", 7), 7);
    }

    #[test]
    fn get_double_returns_value() {
        let adapter = FileConfigAdapter::from_string("[levels]\ntick_size = 0.01\n").unwrap();
        assert_eq!(adapter.get_double("levels", "tick_size", 0.25), 0.01);
        assert_eq!(adapter.get_double("levels", "missing", 0.25), 0.25);
    }

    #[test]
    fn get_bool_accepts_common_spellings() {
        let adapter = FileConfigAdapter::from_string(
            "[session]\na = true\nb = yes\nc = 0\nd = maybe\n",
        )
        .unwrap();
        assert!(adapter.get_bool("session", "a", false));
        assert!(adapter.get_bool("session", "b", false));
        assert!(!adapter.get_bool("session", "c", true));
        assert!(adapter.get_bool("session", "d", true));
    }

    #[test]
    fn get_section_returns_sorted_entries() {
        let content = "[ladder]\nTop = Q1,+,0.5\nBottom = Q4,-,0.5\n";
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_section("ladder"),
            vec![
                ("Bottom".to_string(), "Q4,-,0.5".to_string()),
                ("Top".to_string(), "Q1,+,0.5".to_string()),
            ]
        );
        assert!(adapter.get_section("missing").is_empty());
    }

    #[test]
    fn empty_has_no_values() {
        let adapter = FileConfigAdapter::empty();
        assert_eq!(adapter.get_string("engine", "range_mode"), None);
        assert!(adapter.get_section("ladder").is_empty());
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[session]\nroll_time = 18:00\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("session", "roll_time"),
            Some("18:00".to_string())
        );
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(result.is_err());
    }
}
