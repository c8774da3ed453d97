use std::path::PathBuf;

/// CLI overrides fed into configuration discovery.
///
/// Every field is optional; `None` leaves the lower-precedence value alone.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Explicit config file; disables upward discovery
    pub config_path: Option<PathBuf>,
    pub model: Option<String>,
    pub max_attempts: Option<u32>,
    pub request_timeout: Option<u64>,
    pub verbose: Option<bool>,
}
