//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg`, an optional YAML
//! configuration file, and the resolved configuration handed to the
//! conversation controller at construction time.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use arrrg_derive::CommandLine;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identity::default_identity_path;

/// Environment variable consulted when no endpoint is given any other way.
pub const ENDPOINT_ENV: &str = "PARLOR_API_URL";

/// Seeded assistant message shown when a conversation starts.
pub const DEFAULT_WELCOME_MESSAGE: &str =
    "¡Hola! Soy tu asistente UNSTA 🤖 estoy aquí para resolver tus dudas";

/// Shown when the assistant answered but every text segment was empty.
pub const DEFAULT_NO_ANSWER_MESSAGE: &str = "No tengo respuesta 😅";

/// Shown when the exchange failed for any reason.
pub const DEFAULT_CONNECTION_ERROR_MESSAGE: &str = "Hubo un error al conectar con el servidor 😔";

/// Command-line arguments for the parlor-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Assistant endpoint URL.
    #[arrrg(optional, "Assistant endpoint URL (default: $PARLOR_API_URL)", "URL")]
    pub endpoint: Option<String>,

    /// YAML configuration file.
    #[arrrg(optional, "YAML configuration file", "FILE")]
    pub config: Option<String>,

    /// Where the client identity is kept.
    #[arrrg(optional, "Identity file (default: <data dir>/parlor/identity.json)", "FILE")]
    pub identity_file: Option<String>,

    /// Keep the identity in memory only.
    #[arrrg(flag, "Do not persist the client identity")]
    pub ephemeral: bool,

    /// Request timeout in seconds.
    #[arrrg(optional, "Request timeout in seconds (default: none)", "SECONDS")]
    pub timeout_secs: Option<u64>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Contents of the optional YAML configuration file.
///
/// Every field is optional; command-line flags take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Assistant endpoint URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Identity file location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<PathBuf>,

    /// Replacement for the seeded welcome message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub welcome_message: Option<String>,

    /// Replacement for the no-answer fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_answer_message: Option<String>,

    /// Replacement for the connection-error fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_error_message: Option<String>,
}

impl ConfigFile {
    /// Parses a configuration file from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Reads and parses a configuration file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|err| Error::io("failed to read configuration file", err))?;
        Self::from_yaml(&content)
    }
}

/// Where the client identity lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityBackend {
    /// A JSON file on disk.
    File(PathBuf),
    /// Process memory only; a new identity every run.
    Memory,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved values after combining command-line
/// arguments, the configuration file, the environment, and defaults.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// The assistant endpoint, if one has been configured.
    pub endpoint: Option<String>,

    /// Request timeout.  `None` leaves the platform default in place.
    pub timeout: Option<Duration>,

    /// Where the client identity is persisted.
    pub identity: IdentityBackend,

    /// The seeded assistant message.
    pub welcome_message: String,

    /// Fallback shown when the reply carried no text.
    pub no_answer_message: String,

    /// Fallback shown when the exchange failed.
    pub connection_error_message: String,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Endpoint: unset
    /// - Timeout: none
    /// - Identity: `<data dir>/parlor/identity.json`
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            endpoint: None,
            timeout: None,
            identity: IdentityBackend::File(default_identity_path()),
            welcome_message: DEFAULT_WELCOME_MESSAGE.to_string(),
            no_answer_message: DEFAULT_NO_ANSWER_MESSAGE.to_string(),
            connection_error_message: DEFAULT_CONNECTION_ERROR_MESSAGE.to_string(),
            use_color: true,
        }
    }

    /// Sets the endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the identity backend.
    pub fn with_identity(mut self, identity: IdentityBackend) -> Self {
        self.identity = identity;
        self
    }

    /// Sets the welcome message.
    pub fn with_welcome_message(mut self, message: impl Into<String>) -> Self {
        self.welcome_message = message.into();
        self
    }

    /// Sets the no-answer fallback.
    pub fn with_no_answer_message(mut self, message: impl Into<String>) -> Self {
        self.no_answer_message = message.into();
        self
    }

    /// Sets the connection-error fallback.
    pub fn with_connection_error_message(mut self, message: impl Into<String>) -> Self {
        self.connection_error_message = message.into();
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Applies the values present in a configuration file.
    pub fn apply_file(mut self, file: ConfigFile) -> Self {
        if let Some(endpoint) = file.endpoint {
            self.endpoint = Some(endpoint);
        }
        if let Some(secs) = file.timeout_secs {
            self.timeout = Some(Duration::from_secs(secs));
        }
        if let Some(path) = file.identity_file {
            self.identity = IdentityBackend::File(path);
        }
        if let Some(message) = file.welcome_message {
            self.welcome_message = message;
        }
        if let Some(message) = file.no_answer_message {
            self.no_answer_message = message;
        }
        if let Some(message) = file.connection_error_message {
            self.connection_error_message = message;
        }
        self
    }

    /// Returns the endpoint or a validation error naming how to set one.
    pub fn require_endpoint(&self) -> Result<&str> {
        self.endpoint.as_deref().ok_or_else(|| {
            Error::validation(
                format!("no assistant endpoint; pass --endpoint or set {ENDPOINT_ENV}"),
                Some("endpoint".to_string()),
            )
        })
    }

    /// Checks that the user-visible strings are usable.
    ///
    /// Every message in the log must be non-empty, so blank fallbacks are
    /// rejected up front.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("welcome_message", &self.welcome_message),
            ("no_answer_message", &self.no_answer_message),
            ("connection_error_message", &self.connection_error_message),
        ] {
            if value.trim().is_empty() {
                return Err(Error::validation(
                    format!("{name} must not be blank"),
                    Some(name.to_string()),
                ));
            }
        }
        if let Some(timeout) = self.timeout
            && timeout.is_zero()
        {
            return Err(Error::validation(
                "timeout must be greater than zero",
                Some("timeout_secs".to_string()),
            ));
        }
        Ok(())
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ChatArgs> for ChatConfig {
    type Error = Error;

    fn try_from(args: ChatArgs) -> Result<Self> {
        let mut config = ChatConfig::new();
        if let Some(path) = args.config.as_deref() {
            config = config.apply_file(ConfigFile::load(path)?);
        }
        if let Some(endpoint) = args.endpoint {
            config.endpoint = Some(endpoint);
        }
        if config.endpoint.is_none() {
            config.endpoint = env::var(ENDPOINT_ENV).ok().filter(|s| !s.trim().is_empty());
        }
        if let Some(secs) = args.timeout_secs {
            config.timeout = Some(Duration::from_secs(secs));
        }
        if let Some(path) = args.identity_file {
            config.identity = IdentityBackend::File(PathBuf::from(path));
        }
        if args.ephemeral {
            config.identity = IdentityBackend::Memory;
        }
        config.use_color = !args.no_color;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert!(config.endpoint.is_none());
        assert!(config.timeout.is_none());
        assert!(matches!(config.identity, IdentityBackend::File(_)));
        assert_eq!(config.welcome_message, DEFAULT_WELCOME_MESSAGE);
        assert_eq!(config.no_answer_message, DEFAULT_NO_ANSWER_MESSAGE);
        assert_eq!(
            config.connection_error_message,
            DEFAULT_CONNECTION_ERROR_MESSAGE
        );
        assert!(config.use_color);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            endpoint: Some("http://localhost:8000/chat".to_string()),
            config: None,
            identity_file: Some("/tmp/parlor-id.json".to_string()),
            ephemeral: false,
            timeout_secs: Some(15),
            no_color: true,
        };
        let config = ChatConfig::try_from(args).unwrap();
        assert_eq!(config.require_endpoint().unwrap(), "http://localhost:8000/chat");
        assert_eq!(config.timeout, Some(Duration::from_secs(15)));
        assert_eq!(
            config.identity,
            IdentityBackend::File(PathBuf::from("/tmp/parlor-id.json"))
        );
        assert!(!config.use_color);
    }

    #[test]
    fn ephemeral_wins_over_identity_file() {
        let args = ChatArgs {
            endpoint: Some("http://localhost:8000/chat".to_string()),
            identity_file: Some("/tmp/parlor-id.json".to_string()),
            ephemeral: true,
            ..ChatArgs::default()
        };
        let config = ChatConfig::try_from(args).unwrap();
        assert_eq!(config.identity, IdentityBackend::Memory);
    }

    #[test]
    fn yaml_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parlor.yaml");
        fs::write(
            &path,
            "endpoint: http://from-file/chat\n\
             timeout_secs: 20\n\
             welcome_message: Bienvenido\n",
        )
        .unwrap();

        let args = ChatArgs {
            endpoint: Some("http://from-flag/chat".to_string()),
            config: Some(path.to_string_lossy().into_owned()),
            ..ChatArgs::default()
        };
        let config = ChatConfig::try_from(args).unwrap();
        assert_eq!(config.endpoint.as_deref(), Some("http://from-flag/chat"));
        assert_eq!(config.timeout, Some(Duration::from_secs(20)));
        assert_eq!(config.welcome_message, "Bienvenido");
        assert_eq!(config.no_answer_message, DEFAULT_NO_ANSWER_MESSAGE);
    }

    #[test]
    fn yaml_rejects_unknown_fields() {
        let err = ConfigFile::from_yaml("endpoint: http://x/\nmodel: gpt\n").unwrap_err();
        assert!(err.is_serialization());
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let args = ChatArgs {
            config: Some("/definitely/not/here.yaml".to_string()),
            ..ChatArgs::default()
        };
        let err = ChatConfig::try_from(args).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn missing_endpoint_is_reported() {
        let config = ChatConfig::new();
        let err = config.require_endpoint().unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains(ENDPOINT_ENV));
    }

    #[test]
    fn blank_fallbacks_are_rejected() {
        let config = ChatConfig::new().with_no_answer_message("   ");
        assert!(config.validate().is_err());

        let config = ChatConfig::new().with_timeout(Some(Duration::ZERO));
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_endpoint("https://assistant.example.com/chat")
            .with_timeout(Some(Duration::from_secs(5)))
            .with_identity(IdentityBackend::Memory)
            .with_welcome_message("Hi")
            .with_no_answer_message("Nothing")
            .with_connection_error_message("Offline")
            .without_color();

        assert_eq!(
            config.endpoint.as_deref(),
            Some("https://assistant.example.com/chat")
        );
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.identity, IdentityBackend::Memory);
        assert_eq!(config.welcome_message, "Hi");
        assert_eq!(config.no_answer_message, "Nothing");
        assert_eq!(config.connection_error_message, "Offline");
        assert!(!config.use_color);
    }
}
