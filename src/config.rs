use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Upper bound for TOKEN_REFRESH_MARGIN (one day)
pub const MAX_TOKEN_REFRESH_MARGIN: u64 = 86_400;

/// Paraphrase client - command line access to the paraphrasing API
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Base URL of the API
    #[arg(short = 'u', long, env = "PARAPHRASE_API_URL", default_value = "http://localhost:8080/api")]
    pub api_url: String,

    /// Path to the session database
    #[arg(short = 'd', long, env = "SESSION_DB_FILE", default_value = "~/.paraphrase/session.db")]
    pub session_db: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "60")]
    pub http_timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Log in and store the session
    Login {
        #[arg(short, long)]
        email: String,
        /// Prompted for when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Create an account
    Register {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Paraphrase text (reads stdin when TEXT is omitted)
    Paraphrase {
        text: Option<String>,
        #[arg(short, long, default_value = "auto")]
        language: String,
        #[arg(short, long, default_value = "standard")]
        style: String,
    },
    /// Show paraphrase history
    History {
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        style: Option<String>,
        #[arg(long, default_value = "1")]
        page: usize,
    },
    /// Show usage statistics
    Stats,
    /// List supported languages, ordered for your country
    Languages {
        /// List languages you have used instead
        #[arg(long)]
        used: bool,
    },
    /// Update account settings
    Settings {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Prompt for current and new password
        #[arg(long)]
        change_password: bool,
    },
    /// Show or change the subscription
    Subscription {
        #[command(subcommand)]
        action: Option<SubscriptionAction>,
    },
    /// Start a checkout for a plan
    Checkout {
        #[arg(default_value = "pro")]
        plan: String,
        #[arg(long)]
        ios: bool,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum SubscriptionAction {
    Show,
    Cancel,
    Trial,
}

#[derive(Clone, Debug)]
pub struct Config {
    // API
    pub api_url: String,

    // Session
    pub session_db_file: PathBuf,
    pub token_refresh_margin: u64,

    // HTTP client
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,

    // Display
    pub country_code: Option<String>,

    // Logging
    pub log_level: String,
}

impl Config {
    /// Build configuration with priority: CLI > ENV > defaults
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let config = Config {
            api_url: args.api_url.trim_end_matches('/').to_string(),

            session_db_file: expand_tilde(&args.session_db),

            token_refresh_margin: env_or("TOKEN_REFRESH_MARGIN", 300),

            http_connect_timeout: env_or("HTTP_CONNECT_TIMEOUT", 10),

            http_request_timeout: args.http_timeout,

            country_code: std::env::var("COUNTRY_CODE")
                .ok()
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty()),

            log_level: args.log_level.clone(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            anyhow::bail!(
                "PARAPHRASE_API_URL must start with http:// or https://: {}",
                self.api_url
            );
        }

        if self.http_request_timeout == 0 {
            anyhow::bail!("HTTP_REQUEST_TIMEOUT must be greater than zero");
        }

        if self.token_refresh_margin > MAX_TOKEN_REFRESH_MARGIN {
            anyhow::bail!(
                "TOKEN_REFRESH_MARGIN must be at most {} seconds, got {}",
                MAX_TOKEN_REFRESH_MARGIN,
                self.token_refresh_margin
            );
        }

        Ok(())
    }
}

fn env_or(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_expand_tilde() {
        let path = expand_tilde("~/test/file.txt");
        assert!(path.to_string_lossy().contains("test/file.txt"));
        assert!(!path.to_string_lossy().starts_with("~"));

        let path = expand_tilde("/absolute/path");
        assert_eq!(path, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_expand_tilde_just_tilde() {
        // Just "~" without slash should not expand
        let path = expand_tilde("~");
        assert_eq!(path, PathBuf::from("~"));
    }

    #[test]
    fn test_parse_paraphrase_command() {
        let args = parse(&[
            "paraphrase-client",
            "--api-url",
            "https://api.example.com/api/",
            "paraphrase",
            "Hello there",
            "-l",
            "French",
        ]);
        assert_eq!(
            args.command,
            Command::Paraphrase {
                text: Some("Hello there".to_string()),
                language: "French".to_string(),
                style: "standard".to_string(),
            }
        );

        let config = Config::from_args(&args).unwrap();
        assert_eq!(config.api_url, "https://api.example.com/api");
        assert_eq!(config.http_request_timeout, 60);
    }

    #[test]
    fn test_parse_subscription_actions() {
        let args = parse(&["paraphrase-client", "subscription", "cancel"]);
        assert_eq!(
            args.command,
            Command::Subscription {
                action: Some(SubscriptionAction::Cancel)
            }
        );

        let args = parse(&["paraphrase-client", "subscription"]);
        assert_eq!(args.command, Command::Subscription { action: None });
    }

    #[test]
    fn test_invalid_api_url_rejected() {
        let args = parse(&["paraphrase-client", "--api-url", "localhost:8080", "whoami"]);
        assert!(Config::from_args(&args).is_err());
    }

    #[test]
    fn test_refresh_margin_bounds() {
        let args = parse(&["paraphrase-client", "whoami"]);
        let mut config = Config::from_args(&args).unwrap();

        config.token_refresh_margin = MAX_TOKEN_REFRESH_MARGIN;
        assert!(config.validate().is_ok());

        config.token_refresh_margin = MAX_TOKEN_REFRESH_MARGIN + 1;
        assert!(config.validate().is_err());

        config.token_refresh_margin = u64::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let args = parse(&["paraphrase-client", "--http-timeout", "0", "stats"]);
        assert!(Config::from_args(&args).is_err());
    }
}
