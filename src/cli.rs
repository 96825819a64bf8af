use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::{
    model_manager::{CACHE_DIR_ENV_VAR, MODEL_ENV_VAR},
    settings::{
        DEFAULT_DISPLAY_COUNT, DEFAULT_DOCS_DIR, DEFAULT_FETCH_K,
        DOCS_DIR_ENV_VAR,
    },
    walker::DEFAULT_GLOB,
    web::{BIND_ENV_VAR, DEFAULT_BIND},
};

#[derive(Debug, Parser)]
#[command(
    name = "infostream",
    version,
    about = "Semantic search over a categorized archive of text documents"
)]
pub struct Cli {
    /// Directory holding the archive documents
    #[arg(long, global = true, env = DOCS_DIR_ENV_VAR, default_value = DEFAULT_DOCS_DIR)]
    pub docs_dir: PathBuf,

    /// Glob selecting documents, relative to the docs directory
    #[arg(long, global = true, default_value = DEFAULT_GLOB)]
    pub glob: String,

    /// Embedding model ID, local model path, or "hash" for the offline embedder
    #[arg(long, global = true, env = MODEL_ENV_VAR)]
    pub model: Option<String>,

    /// JSON file replacing the built-in category taxonomy
    #[arg(long, global = true)]
    pub taxonomy: Option<PathBuf>,

    /// Override the model cache directory
    #[arg(long, global = true, env = CACHE_DIR_ENV_VAR)]
    pub cache_dir: Option<PathBuf>,

    /// Offer the default category as a filter
    #[arg(long, global = true)]
    pub show_uncategorized: bool,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the search page over HTTP
    Serve(ServeArgs),
    /// Search the archive from the terminal
    Search(SearchArgs),
    /// List categories and their document counts
    Categories(CategoriesArgs),
    /// Show archive and model status
    Status(StatusArgs),
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = BIND_ENV_VAR, default_value = DEFAULT_BIND)]
    pub bind: String,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Search query
    pub query: String,

    /// Only return results from this category
    #[arg(short, long)]
    pub category: Option<String>,

    /// Number of results to show
    #[arg(short = 'n', long, default_value_t = DEFAULT_DISPLAY_COUNT)]
    pub count: usize,

    /// Candidates fetched from the index before category filtering
    #[arg(long, default_value_t = DEFAULT_FETCH_K)]
    pub fetch_k: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct CategoriesArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "infostream",
            &mut std::io::stdout(),
        );
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parse_search_defaults() {
        let cli = Cli::parse_from(["infostream", "search", "hello"]);
        assert_eq!(cli.glob, "**/*.txt");
        assert!(!cli.show_uncategorized);
        match cli.command {
            Command::Search(args) => {
                assert_eq!(args.query, "hello");
                assert_eq!(args.category, None);
                assert_eq!(args.count, 5);
                assert_eq!(args.fetch_k, 20);
                assert!(!args.json);
            }
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn parse_search_with_category() {
        let cli = Cli::parse_from([
            "infostream",
            "search",
            "ledger",
            "-c",
            "FinTech & Economy",
            "-n",
            "3",
            "--json",
        ]);
        match cli.command {
            Command::Search(args) => {
                assert_eq!(args.category.as_deref(), Some("FinTech & Economy"));
                assert_eq!(args.count, 3);
                assert!(args.json);
            }
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "infostream",
            "categories",
            "--model",
            "hash",
            "--docs-dir",
            "/srv/archive",
            "-vv",
        ]);
        assert_eq!(cli.model.as_deref(), Some("hash"));
        assert_eq!(cli.docs_dir, PathBuf::from("/srv/archive"));
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::Categories(_)));
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(
            Cli::try_parse_from(["infostream", "-q", "-v", "status"]).is_err()
        );
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
