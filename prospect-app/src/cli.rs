use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use prospect_common::SearchEngineKind;

/// Find public contact addresses for a profile keyword.
#[derive(Debug, Parser)]
#[command(name = "prospect", version)]
pub struct Cli {
    /// YAML configuration file.
    #[arg(long, global = true, env = "PROSPECT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Mirror log events to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run discovery for a profile keyword.
    Search(SearchArgs),
    /// Pull addresses out of an HTML or text document.
    Extract(ExtractArgs),
    /// Guess the person behind one or more addresses.
    Infer(InferArgs),
    /// Summarise stored results.
    Stats(StatsArgs),
    /// Print the effective configuration with secrets redacted.
    Config,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    pub profile: String,

    /// Maximum unique URLs to visit.
    #[arg(long)]
    pub limit: Option<usize>,

    /// google, bing, duckduckgo (ddg) or brave.
    #[arg(long)]
    pub engine: Option<SearchEngineKind>,

    /// Ask the configured LLM about low-confidence names.
    #[arg(long)]
    pub ai: bool,

    /// Substitute clearly tagged demo rows when nothing is found.
    #[arg(long)]
    pub demo: bool,

    /// Persist results to the configured database.
    #[arg(long)]
    pub save: bool,

    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ExtractArgs {
    /// Read from this file instead of stdin.
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Keep only addresses ending in this suffix, e.g. `@gmail.com`.
    #[arg(long)]
    pub provider: Option<String>,

    /// Treat input as plain text rather than HTML.
    #[arg(long)]
    pub text: bool,
}

#[derive(Debug, Args)]
pub struct InferArgs {
    #[arg(required = true)]
    pub emails: Vec<String>,

    #[arg(long)]
    pub ai: bool,

    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct StatsArgs {
    /// List stored results for one profile instead of totals.
    #[arg(long)]
    pub profile: Option<String>,

    #[arg(long, default_value_t = 20)]
    pub limit: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_flags_parse() {
        let cli = Cli::try_parse_from([
            "prospect", "search", "data engineer", "--limit", "5", "--engine", "ddg", "--demo",
            "--json",
        ])
        .unwrap();
        let Command::Search(args) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(args.profile, "data engineer");
        assert_eq!(args.limit, Some(5));
        assert_eq!(args.engine, Some(SearchEngineKind::DuckDuckGo));
        assert!(args.demo && args.json);
        assert!(!args.ai && !args.save);
    }

    #[test]
    fn unknown_engine_is_rejected() {
        let err = Cli::try_parse_from(["prospect", "search", "x", "--engine", "altavista"]);
        assert!(err.is_err());
    }

    #[test]
    fn infer_needs_at_least_one_email() {
        assert!(Cli::try_parse_from(["prospect", "infer"]).is_err());
        let cli = Cli::try_parse_from(["prospect", "infer", "a@b.io", "c@d.io", "--ai"]).unwrap();
        match cli.command {
            Command::Infer(args) => {
                assert_eq!(args.emails.len(), 2);
                assert!(args.ai);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["prospect", "stats", "--config", "/tmp/p.yaml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/p.yaml")));
        match cli.command {
            Command::Stats(args) => assert_eq!(args.limit, 20),
            other => panic!("unexpected {other:?}"),
        }
    }
}
