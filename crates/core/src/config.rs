use std::path::PathBuf;

use crate::error::CoreError;

/// Default directory, relative to the working directory, that outputs
/// are written to.
pub const DEFAULT_OUTPUT_DIR: &str = "Output";

/// Default buffer capacity of the in-process progress bus.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Batch processing configuration loaded from environment variables.
///
/// All fields have defaults suitable for a desktop host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Directory every output file is written into.
    pub output_dir: PathBuf,
    /// Number of jobs allowed in `Processing` at once.
    pub max_parallel: usize,
    /// Buffer capacity for the progress broadcast channel.
    pub event_capacity: usize,
}

impl BatchConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                            |
    /// |---------------------------|------------------------------------|
    /// | `PIXBATCH_OUTPUT_DIR`     | `Output`                           |
    /// | `PIXBATCH_MAX_PARALLEL`   | logical core count                 |
    /// | `PIXBATCH_EVENT_CAPACITY` | `1024`                             |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let output_dir = lookup("PIXBATCH_OUTPUT_DIR")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

        let max_parallel = match lookup("PIXBATCH_MAX_PARALLEL") {
            Some(raw) => parse_positive("PIXBATCH_MAX_PARALLEL", &raw)?,
            None => default_parallelism(),
        };

        let event_capacity = match lookup("PIXBATCH_EVENT_CAPACITY") {
            Some(raw) => parse_positive("PIXBATCH_EVENT_CAPACITY", &raw)?,
            None => DEFAULT_EVENT_CAPACITY,
        };

        Ok(Self {
            output_dir,
            max_parallel,
            event_capacity,
        })
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            max_parallel: default_parallelism(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Logical core count, or 1 if the host cannot tell.
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn parse_positive(key: &str, raw: &str) -> Result<usize, CoreError> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(CoreError::Config(format!("{key} must be greater than zero"))),
        Ok(n) => Ok(n),
        Err(_) => Err(CoreError::Config(format!(
            "{key} must be a positive integer, got '{raw}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = BatchConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("Output"));
        assert_eq!(config.max_parallel, default_parallelism());
        assert_eq!(config.event_capacity, 1024);
        assert!(config.max_parallel >= 1);
    }

    #[test]
    fn overrides_are_applied() {
        let config = BatchConfig::from_lookup(lookup(&[
            ("PIXBATCH_OUTPUT_DIR", "/tmp/processed"),
            ("PIXBATCH_MAX_PARALLEL", " 3 "),
            ("PIXBATCH_EVENT_CAPACITY", "64"),
        ]))
        .unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/processed"));
        assert_eq!(config.max_parallel, 3);
        assert_eq!(config.event_capacity, 64);
    }

    #[test]
    fn blank_output_dir_falls_back_to_default() {
        let config = BatchConfig::from_lookup(lookup(&[("PIXBATCH_OUTPUT_DIR", "  ")])).unwrap();
        assert_eq!(config.output_dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
    }

    #[test]
    fn zero_parallelism_is_rejected() {
        assert_matches!(
            BatchConfig::from_lookup(lookup(&[("PIXBATCH_MAX_PARALLEL", "0")])),
            Err(CoreError::Config(_))
        );
    }

    #[test]
    fn non_numeric_capacity_is_rejected() {
        assert_matches!(
            BatchConfig::from_lookup(lookup(&[("PIXBATCH_EVENT_CAPACITY", "lots")])),
            Err(CoreError::Config(_))
        );
    }
}
