use clap::{Parser, ValueEnum};
use sieve_query::Provider;
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors (default)
    Warn,
    /// Informational messages
    Info,
    /// Pipeline stage results
    Debug,
    /// Includes query text (most verbose)
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// How compiled output is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Fragment on the first line, one bound value per following line
    Text,
    /// A single JSON document
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "sieve")]
#[command(about = "sieve - compile Lucene-style filters into SQL and PartiQL fragments")]
#[command(version)]
pub struct Cli {
    /// Filter query, e.g. 'name:john* AND age:[25 TO *]'
    #[arg(required_unless_present = "show_config")]
    pub query: Option<String>,

    /// Target backend (postgresql, mysql, sqlite, dynamodb)
    #[arg(short, long, default_value = "postgresql")]
    pub provider: Provider,

    /// Config file path (defaults to ./sieve.toml when present)
    #[arg(short = 'C', long, env = "SIEVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Print the parsed expression tree instead of rendering it
    #[arg(long)]
    pub tree: bool,

    /// Print the effective configuration (file plus flag overrides) and exit
    #[arg(long, conflicts_with = "tree")]
    pub show_config: bool,

    /// Maximum query length in bytes (overrides config file)
    #[arg(long)]
    pub max_query_length: Option<usize>,

    /// Maximum bracket nesting depth (overrides config file)
    #[arg(long)]
    pub max_nesting_depth: Option<usize>,

    /// Maximum number of terms (overrides config file)
    #[arg(long)]
    pub max_term_count: Option<usize>,

    /// Set log level (off, error, warn, info, debug, trace)
    #[arg(short = 'l', long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Effective log level: explicit flag, then `--verbose`, then warnings only
    pub fn level_filter(&self) -> LevelFilter {
        match (self.log_level, self.verbose) {
            (Some(level), _) => level.into(),
            (None, true) => LevelFilter::DEBUG,
            (None, false) => LevelFilter::WARN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["sieve", "name:john"]).unwrap();
        assert_eq!(cli.query.as_deref(), Some("name:john"));
        assert!(!cli.show_config);
        assert_eq!(cli.provider, Provider::Postgresql);
        assert_eq!(cli.format, OutputFormat::Text);
        assert_eq!(cli.level_filter(), LevelFilter::WARN);
    }

    #[test]
    fn test_provider_aliases() {
        let cli = Cli::try_parse_from(["sieve", "-p", "postgres", "x"]).unwrap();
        assert_eq!(cli.provider, Provider::Postgresql);
        let cli = Cli::try_parse_from(["sieve", "--provider", "DynamoDB", "x"]).unwrap();
        assert_eq!(cli.provider, Provider::Dynamodb);
        assert!(Cli::try_parse_from(["sieve", "--provider", "oracle", "x"]).is_err());
    }

    #[test]
    fn test_log_level_precedence() {
        let cli = Cli::try_parse_from(["sieve", "-v", "x"]).unwrap();
        assert_eq!(cli.level_filter(), LevelFilter::DEBUG);
        let cli = Cli::try_parse_from(["sieve", "-v", "-l", "trace", "x"]).unwrap();
        assert_eq!(cli.level_filter(), LevelFilter::TRACE);
    }

    #[test]
    fn test_query_optional_only_with_show_config() {
        assert!(Cli::try_parse_from(["sieve"]).is_err());
        let cli = Cli::try_parse_from(["sieve", "--show-config"]).unwrap();
        assert!(cli.show_config);
        assert_eq!(cli.query, None);
        assert!(Cli::try_parse_from(["sieve", "--show-config", "--tree", "x"]).is_err());
    }

    #[test]
    fn test_limit_overrides() {
        let cli =
            Cli::try_parse_from(["sieve", "--max-term-count", "5", "--format", "json", "x"])
                .unwrap();
        assert_eq!(cli.max_term_count, Some(5));
        assert_eq!(cli.max_query_length, None);
        assert_eq!(cli.format, OutputFormat::Json);
    }
}
