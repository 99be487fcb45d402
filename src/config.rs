//! Pipeline options.
//!
//! Options come from an optional `plum.toml` with an `[options]` table,
//! and command-line flags are OR-ed on top:
//!
//! ```toml
//! [options]
//! print_bytecode = true
//! trace_cpu = true
//! trace_format = "json"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::vm::TraceOptions;

/// Name of the options file looked up in the working directory.
pub const CONFIG_FILE: &str = "plum.toml";

/// Output format for VM traces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceFormat {
    #[default]
    Human,
    /// One JSON object per executed instruction.
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Keep scanning after a lexical error.
    pub skip_errors: bool,
    pub print_source: bool,
    pub print_lexeme_table: bool,
    pub print_lexeme_list: bool,
    pub print_symbol_table: bool,
    pub print_bytecode: bool,
    pub trace_cpu: bool,
    pub trace_records: bool,
    pub trace_registers: bool,
    pub trace_format: TraceFormat,
    /// Verify bytecode before executing it.
    pub verify: bool,
}

impl Options {
    /// OR every flag of `other` into `self`. A non-default trace format wins.
    pub fn merge(&mut self, other: &Options) {
        self.skip_errors |= other.skip_errors;
        self.print_source |= other.print_source;
        self.print_lexeme_table |= other.print_lexeme_table;
        self.print_lexeme_list |= other.print_lexeme_list;
        self.print_symbol_table |= other.print_symbol_table;
        self.print_bytecode |= other.print_bytecode;
        self.trace_cpu |= other.trace_cpu;
        self.trace_records |= other.trace_records;
        self.trace_registers |= other.trace_registers;
        self.verify |= other.verify;
        if other.trace_format != TraceFormat::default() {
            self.trace_format = other.trace_format;
        }
    }

    pub fn trace_options(&self) -> TraceOptions {
        TraceOptions {
            cpu: self.trace_cpu,
            records: self.trace_records,
            registers: self.trace_registers,
            format: self.trace_format,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    options: Options,
}

/// Parse options from TOML text.
pub fn parse(text: &str, path: &Path) -> Result<Options, ConfigError> {
    let file: ConfigFile = toml::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(file.options)
}

/// Load options from an explicit file.
pub fn load(path: &Path) -> Result<Options, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&text, path)
}

/// Load `plum.toml` from `dir` if it exists, defaults otherwise.
pub fn load_default(dir: &Path) -> Result<Options, ConfigError> {
    let path = dir.join(CONFIG_FILE);
    if path.is_file() {
        load(&path)
    } else {
        Ok(Options::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options_table() {
        let text = r#"
[options]
print_bytecode = true
trace_cpu = true
trace_format = "json"
"#;
        let options = parse(text, Path::new("plum.toml")).unwrap();
        assert!(options.print_bytecode);
        assert!(options.trace_cpu);
        assert!(!options.verify);
        assert_eq!(options.trace_format, TraceFormat::Json);
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        assert_eq!(parse("", Path::new("plum.toml")).unwrap(), Options::default());
    }

    #[test]
    fn test_unknown_format_rejected() {
        let err = parse("[options]\ntrace_format = \"xml\"\n", Path::new("plum.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_merge_ors_flags() {
        let mut options = Options {
            print_source: true,
            ..Default::default()
        };
        options.merge(&Options {
            verify: true,
            trace_format: TraceFormat::Json,
            ..Default::default()
        });
        assert!(options.print_source);
        assert!(options.verify);
        assert_eq!(options.trace_format, TraceFormat::Json);

        options.merge(&Options::default());
        assert_eq!(options.trace_format, TraceFormat::Json);
    }

    #[test]
    fn test_load_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_default(dir.path()).unwrap(), Options::default());
    }

    #[test]
    fn test_load_default_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[options]\nskip_errors = true\n").unwrap();
        assert!(load_default(dir.path()).unwrap().skip_errors);
    }

    #[test]
    fn test_trace_options() {
        let options = Options {
            trace_records: true,
            ..Default::default()
        };
        let trace = options.trace_options();
        assert!(trace.enabled());
        assert!(trace.records);
        assert!(!trace.cpu);
    }
}
