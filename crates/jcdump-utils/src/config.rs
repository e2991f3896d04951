//! # Configuration
//!
//! Runtime knobs read from the environment.
//!
//! | Variable | Values | Default |
//! |---|---|---|
//! | `JCDUMP_POINTER_BITS` | `32` or `64` | `64` |
//! | `JCDUMP_MAX_FRAMES` | any non-negative integer | unlimited |
//!
//! CLI flags override whatever the environment says; see
//! [`Settings::with_pointer_bits`].

use std::env;

/// Environment variable holding the pointer width of the dumped process.
pub const POINTER_BITS_VAR: &str = "JCDUMP_POINTER_BITS";

/// Environment variable capping the stack frames kept per thread.
pub const MAX_FRAMES_VAR: &str = "JCDUMP_MAX_FRAMES";

/// Configuration error
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError
{
    /// Pointer width other than 32 or 64
    #[error("unsupported pointer width {0}: use 32 or 64")]
    PointerBits(String),

    /// Variable that should hold a number but does not
    #[error("{name} must be a non-negative integer, got {value:?}")]
    NotANumber
    {
        /// Variable name
        name: &'static str,
        /// Offending value
        value: String,
    },
}

/// Settings shared by the CLI and the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings
{
    pointer_bits: u32,
    max_frames: Option<usize>,
}

impl Default for Settings
{
    fn default() -> Self
    {
        Self {
            pointer_bits: 64,
            max_frames: None,
        }
    }
}

impl Settings
{
    /// Read settings from the process environment.
    ///
    /// ## Errors
    ///
    /// Returns an error if a variable is set to a value it cannot hold.
    pub fn from_env() -> Result<Self, ConfigError>
    {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read settings through `lookup`, which maps a variable name to its
    /// value.
    ///
    /// ## Errors
    ///
    /// Returns an error if a variable is set to a value it cannot hold.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        if let Some(value) = lookup(POINTER_BITS_VAR) {
            settings = settings.with_pointer_bits(parse_pointer_bits(&value)?);
        }
        if let Some(value) = lookup(MAX_FRAMES_VAR) {
            let frames = value.trim().parse::<usize>().map_err(|_| ConfigError::NotANumber {
                name: MAX_FRAMES_VAR,
                value: value.clone(),
            })?;
            settings.max_frames = Some(frames);
        }
        Ok(settings)
    }

    /// Override the pointer width.
    ///
    /// Callers validate with [`parse_pointer_bits`] first; any width other
    /// than 32 is treated as 64.
    #[must_use]
    pub fn with_pointer_bits(mut self, bits: u32) -> Self
    {
        self.pointer_bits = if bits == 32 { 32 } else { 64 };
        self
    }

    #[must_use]
    pub fn with_max_frames(mut self, max_frames: Option<usize>) -> Self
    {
        self.max_frames = max_frames;
        self
    }

    pub fn pointer_bits(&self) -> u32
    {
        self.pointer_bits
    }

    /// Stack frames kept per thread, `None` for all of them.
    pub fn max_frames(&self) -> Option<usize>
    {
        self.max_frames
    }
}

/// Parse a pointer width.
///
/// ## Errors
///
/// Returns [`ConfigError::PointerBits`] for anything but `32` or `64`.
pub fn parse_pointer_bits(value: &str) -> Result<u32, ConfigError>
{
    match value.trim() {
        "32" => Ok(32),
        "64" => Ok(64),
        other => Err(ConfigError::PointerBits(other.to_string())),
    }
}

#[cfg(test)]
mod tests
{
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String>
    {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset()
    {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.pointer_bits(), 64);
        assert_eq!(settings.max_frames(), None);
    }

    #[test]
    fn test_reads_both_variables()
    {
        let settings = Settings::from_lookup(lookup(&[(POINTER_BITS_VAR, "32"), (MAX_FRAMES_VAR, " 20 ")])).unwrap();
        assert_eq!(settings.pointer_bits(), 32);
        assert_eq!(settings.max_frames(), Some(20));
    }

    #[test]
    fn test_rejects_bad_values()
    {
        assert_eq!(
            Settings::from_lookup(lookup(&[(POINTER_BITS_VAR, "48")])),
            Err(ConfigError::PointerBits("48".to_string()))
        );
        let err = Settings::from_lookup(lookup(&[(MAX_FRAMES_VAR, "-1")])).unwrap_err();
        assert!(err.to_string().contains(MAX_FRAMES_VAR));
    }

    #[test]
    fn test_cli_override()
    {
        let settings = Settings::default().with_pointer_bits(32).with_max_frames(Some(5));
        assert_eq!(settings.pointer_bits(), 32);
        assert_eq!(settings.max_frames(), Some(5));
    }
}
