//! CLI error handling with user-friendly messages.

use std::fmt;
use std::process;

use cloudtiler::config::ConfigFileError;
use cloudtiler::process::ProcessError;

/// CLI-specific errors with consistent formatting and exit codes.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Config file could not be loaded
    Config(ConfigFileError),
    /// Building the demo catalog failed
    Catalog(String),
    /// The run itself failed
    Run(ProcessError),
}

impl CliError {
    /// Exit the process with an appropriate message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::Run(ProcessError::Dispatch(e)) = self {
            eprintln!();
            eprintln!("Details: {}", e);
            eprintln!("Successfully persisted tiles (if any) were left in place.");
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Failed to load config: {}", e),
            CliError::Catalog(msg) => write!(f, "Failed to build catalog: {}", msg),
            CliError::Run(e) => write!(f, "Run failed: {}", e),
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<ProcessError> for CliError {
    fn from(e: ProcessError) -> Self {
        CliError::Run(e)
    }
}
