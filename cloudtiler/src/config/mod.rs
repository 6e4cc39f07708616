//! Run configuration files.
//!
//! Optional INI overlay for [`ProcessOptions`]: defaults come from the
//! library, a config file adjusts them, and CLI flags win over both. This
//! module is the single place where INI key names map onto option fields.
//!
//! ```ini
//! [process]
//! buffer = 30
//! cell_size = 500
//! resolution = 10
//! workers = 8
//! progress = true
//!
//! [memory]
//! threshold = 250000000
//!
//! [output]
//! spill = true
//! export_dir = /data/out
//! ```

use std::path::Path;

use ini::Ini;
use thiserror::Error;

use crate::process::ProcessOptions;

/// Errors produced while loading a config file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// The file could not be read
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The file is not valid INI
    #[error("config file is not valid INI: {0}")]
    Malformed(String),

    /// A key holds a value the engine cannot use
    #[error("invalid value for [{section}] {key} = '{value}': {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// Load a config file and overlay it onto the given options.
pub fn load(path: &Path, options: ProcessOptions) -> Result<ProcessOptions, ConfigFileError> {
    let content = std::fs::read_to_string(path)?;
    from_ini_str(&content, options)
}

/// Overlay an INI document onto the given options.
///
/// Unknown sections and keys are ignored so config files can be shared
/// with newer or older versions; invalid values for known keys are
/// errors.
pub fn from_ini_str(
    content: &str,
    mut options: ProcessOptions,
) -> Result<ProcessOptions, ConfigFileError> {
    let ini = Ini::load_from_str(content).map_err(|e| ConfigFileError::Malformed(e.to_string()))?;

    if let Some(section) = ini.section(Some("process")) {
        if let Some(v) = section.get("buffer") {
            options.buffer = parse_float("process", "buffer", v, 0.0)?;
        }
        if let Some(v) = section.get("cell_size") {
            let size = parse_float("process", "cell_size", v, f64::MIN_POSITIVE)?;
            options = options.with_cell_size(size);
        }
        if let Some(v) = section.get("resolution") {
            options.resolution = parse_float("process", "resolution", v, f64::MIN_POSITIVE)?;
        }
        if let Some(v) = section.get("workers") {
            options.workers = v.parse().map_err(|_| invalid("process", "workers", v,
                "must be a non-negative integer (0 = all cores)"))?;
        }
        if let Some(v) = section.get("progress") {
            options.progress = parse_bool("process", "progress", v)?;
        }
        if let Some(v) = section.get("origin_x") {
            options.origin.0 = parse_float("process", "origin_x", v, f64::NEG_INFINITY)?;
        }
        if let Some(v) = section.get("origin_y") {
            options.origin.1 = parse_float("process", "origin_y", v, f64::NEG_INFINITY)?;
        }
        if let Some(v) = section.get("filter") {
            let v = v.trim();
            if !v.is_empty() {
                options.filter = Some(v.to_string());
            }
        }
    }

    if let Some(section) = ini.section(Some("memory")) {
        if let Some(v) = section.get("threshold") {
            options.memory_threshold = match v.trim().to_lowercase().as_str() {
                "none" | "inf" | "infinite" => None,
                raw => Some(raw.parse().map_err(|_| invalid("memory", "threshold", v,
                    "must be a byte count, or 'none' to disable the guard"))?),
            };
        }
        if let Some(v) = section.get("bytes_per_cell") {
            options.bytes_per_cell =
                parse_float("memory", "bytes_per_cell", v, f64::MIN_POSITIVE)?;
        }
    }

    if let Some(section) = ini.section(Some("output")) {
        if let Some(v) = section.get("spill") {
            options.spill = parse_bool("output", "spill", v)?;
        }
        if let Some(v) = section.get("export_dir") {
            let v = v.trim();
            if !v.is_empty() {
                options = options.with_export_dir(v);
            }
        }
    }

    Ok(options)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_float(section: &str, key: &str, value: &str, min: f64) -> Result<f64, ConfigFileError> {
    let parsed: f64 = value
        .parse()
        .map_err(|_| invalid(section, key, value, "must be a number"))?;
    if !parsed.is_finite() || parsed < min {
        return Err(invalid(section, key, value, "out of range"));
    }
    Ok(parsed)
}

fn parse_bool(section: &str, key: &str, value: &str) -> Result<bool, ConfigFileError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid(section, key, value, "must be true or false")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::CellSizeSpec;

    #[test]
    fn test_empty_ini_keeps_defaults() {
        let options = from_ini_str("", ProcessOptions::default()).unwrap();
        assert_eq!(options.buffer, 15.0);
        assert_eq!(options.workers, 0);
    }

    #[test]
    fn test_overlay_process_section() {
        let content = "
[process]
buffer = 30
cell_size = 500
resolution = 10
workers = 8
progress = false
origin_x = 100
origin_y = -50
filter = classification != 7
";
        let options = from_ini_str(content, ProcessOptions::default()).unwrap();
        assert_eq!(options.buffer, 30.0);
        assert!(matches!(options.cell_spec, CellSizeSpec::Uniform(s) if s == 500.0));
        assert_eq!(options.resolution, 10.0);
        assert_eq!(options.workers, 8);
        assert!(!options.progress);
        assert_eq!(options.origin, (100.0, -50.0));
        assert_eq!(options.filter.as_deref(), Some("classification != 7"));
    }

    #[test]
    fn test_memory_threshold_none_disables_guard() {
        let options =
            from_ini_str("[memory]\nthreshold = none\n", ProcessOptions::default()).unwrap();
        assert_eq!(options.memory_threshold, None);
    }

    #[test]
    fn test_memory_threshold_bytes() {
        let options = from_ini_str(
            "[memory]\nthreshold = 250000000\nbytes_per_cell = 16\n",
            ProcessOptions::default(),
        )
        .unwrap();
        assert_eq!(options.memory_threshold, Some(250_000_000));
        assert_eq!(options.bytes_per_cell, 16.0);
    }

    #[test]
    fn test_output_section() {
        let options = from_ini_str(
            "[output]\nspill = true\nexport_dir = /data/out\n",
            ProcessOptions::default(),
        )
        .unwrap();
        assert!(options.spill);
        assert_eq!(
            options.export_dir.unwrap(),
            std::path::PathBuf::from("/data/out")
        );
    }

    #[test]
    fn test_invalid_value_reports_location() {
        let err = from_ini_str("[process]\nbuffer = lots\n", ProcessOptions::default())
            .unwrap_err();
        let ConfigFileError::InvalidValue { section, key, .. } = err else {
            panic!("expected InvalidValue");
        };
        assert_eq!(section, "process");
        assert_eq!(key, "buffer");
    }

    #[test]
    fn test_negative_buffer_rejected() {
        assert!(from_ini_str("[process]\nbuffer = -5\n", ProcessOptions::default()).is_err());
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let options = from_ini_str(
            "[process]\nfuture_knob = 1\n[plotting]\nenabled = true\n",
            ProcessOptions::default(),
        )
        .unwrap();
        assert_eq!(options.buffer, 15.0);
    }
}
