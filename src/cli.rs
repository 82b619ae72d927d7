use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use imgpro::codegen::Language;
use imgpro::config::Environment;
use imgpro::request::BodyFormat;

/// Img.pro API client and request playground
#[derive(Parser)]
#[command(name = "imgpro")]
#[command(about = "Explore, test and call the Img.pro media API", long_about = None)]
pub struct Cli {
    /// Log at debug level (RUST_LOG still wins when set)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// API base URL, overriding the environment
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Database URL for the local store
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Environment for this run only (production | test)
    #[arg(long = "env", global = true)]
    pub run_env: Option<Environment>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage the stored API token
    Auth {
        #[command(subcommand)]
        action: AuthCommand,
    },
    /// Show or persist the selected environment
    Env {
        /// New environment to save
        environment: Option<Environment>,
    },
    /// List the endpoint catalog
    Endpoints {
        /// Only endpoints that need a token
        #[arg(long, conflicts_with = "public")]
        auth: bool,
        /// Only endpoints callable without a token
        #[arg(long)]
        public: bool,
    },
    /// Describe one endpoint with its parameters and scenarios
    Show {
        endpoint: String,
    },
    /// Build and execute a request against an endpoint
    Send {
        #[command(flatten)]
        request: RequestArgs,
        /// Don't record this request in history
        #[arg(long)]
        no_history: bool,
        /// Randomly fail about half the requests before sending
        #[arg(long)]
        mock_errors: bool,
    },
    /// Print a code snippet reproducing a request
    Code {
        #[command(flatten)]
        request: RequestArgs,
        /// Target language
        #[arg(short, long, default_value_t = Language::Curl)]
        lang: Language,
    },
    /// Inspect and replay saved requests
    History {
        #[command(subcommand)]
        action: HistoryCommand,
    },
    /// Upload a local image
    Upload {
        file: PathBuf,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        public: Option<bool>,
    },
    /// Import an image from a URL
    Import {
        url: String,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        tags: Option<String>,
        /// Time to live, e.g. 1h or 7d
        #[arg(long)]
        ttl: Option<String>,
        #[arg(long)]
        public: Option<bool>,
    },
    /// List media items
    List {
        #[arg(short, long)]
        limit: Option<u32>,
        #[arg(short, long)]
        cursor: Option<String>,
    },
    /// Get one media item
    Get {
        id: String,
    },
    /// Update a media item's metadata
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        public: Option<bool>,
    },
    /// Delete a media item
    Delete {
        id: String,
    },
}

#[derive(Subcommand)]
pub enum AuthCommand {
    /// Check the stored token against the API
    Status,
    /// Show where to create an API key
    Login,
    /// Forget the stored token
    Logout,
    /// Store a token
    SetToken {
        token: String,
    },
    /// Print the id of the stored token
    Whoami,
}

#[derive(Subcommand)]
pub enum HistoryCommand {
    /// List saved requests, newest first
    List,
    /// Print one saved request and its response
    Show {
        /// Position in the list (0 = newest)
        index: usize,
    },
    /// Load a saved request and execute it again
    Replay {
        index: usize,
    },
    /// Delete all saved requests
    Clear {
        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

/// Everything needed to build a request in the playground.
#[derive(Args)]
pub struct RequestArgs {
    /// Endpoint id, e.g. list-media
    pub endpoint: String,

    /// Parameter as name=value (repeatable)
    #[arg(short = 'p', long = "param", value_parser = parse_key_val)]
    pub params: Vec<(String, String)>,

    /// Load a test scenario before applying --param values
    #[arg(short, long)]
    pub scenario: Option<String>,

    /// Raw JSON body
    #[arg(short, long, conflicts_with_all = ["body_file", "example"])]
    pub body: Option<String>,

    /// Read the JSON body from a file
    #[arg(long)]
    pub body_file: Option<PathBuf>,

    /// Use the endpoint's example body
    #[arg(long)]
    pub example: bool,

    /// Form field as name=value, for form-format bodies (repeatable)
    #[arg(long = "form", value_parser = parse_key_val)]
    pub form_fields: Vec<(String, String)>,

    /// Extra header as "Name: value" (repeatable)
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Body encoding for endpoints that take one
    #[arg(long, default_value_t = BodyFormat::Json)]
    pub format: BodyFormat,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .ok_or_else(|| format!("expected name=value, got `{s}`"))
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    s.split_once(':')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| format!("expected \"Name: value\", got `{s}`"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn send_parses_repeated_args() {
        let cli = Cli::parse_from([
            "imgpro", "send", "list-media", "-p", "limit=10", "-p", "cursor=a=b", "-H", "X-Trace: 1", "--format", "form",
        ]);
        let Commands::Send { request, no_history, .. } = cli.command else { panic!("expected send") };
        assert_eq!(request.endpoint, "list-media");
        assert_eq!(request.params, vec![("limit".into(), "10".into()), ("cursor".into(), "a=b".into())]);
        assert_eq!(request.headers, vec![("X-Trace".into(), "1".into())]);
        assert_eq!(request.format, BodyFormat::Form);
        assert!(!no_history);
    }

    #[test]
    fn language_and_environment_flags() {
        let cli = Cli::parse_from(["imgpro", "--env", "test", "code", "get-root", "--lang", "py"]);
        assert_eq!(cli.run_env, Some(Environment::Test));
        let Commands::Code { lang, .. } = cli.command else { panic!("expected code") };
        assert_eq!(lang, Language::Python);
    }

    #[test]
    fn bad_pairs_are_rejected() {
        assert!(parse_key_val("novalue").is_err());
        assert!(parse_header("X-Trace=1").is_err());
        assert!(Cli::try_parse_from(["imgpro", "endpoints", "--auth", "--public"]).is_err());
    }
}
