//! Command-line argument parsing for kb-retriever

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// kb-retriever - Query configured knowledge bases and answer questions from them
#[derive(Parser, Debug)]
#[command(name = "kb-retriever")]
#[command(version)]
#[command(about = "Search a knowledge base and answer questions grounded in it", long_about = None)]
pub struct Args {
    /// Configuration file path (~/.kb-retriever/config.toml by default)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Declaration manifest, overrides the one named in the config
    #[arg(short, long, global = true)]
    pub manifest: Option<PathBuf>,

    /// Verbosity level: -v (info), -vv (debug), -vvv (trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Print the documents a retriever finds for a query
    Search {
        /// Retriever name
        retriever: String,
        /// Query text
        query: String,
        /// Retriever namespace (application namespace by default)
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// Answer a question from the retriever's knowledge base
    Ask {
        /// Retriever name
        retriever: String,
        /// Question text
        question: String,
        /// Retriever namespace (application namespace by default)
        #[arg(short, long)]
        namespace: Option<String>,
        /// Print the answer and references as JSON
        #[arg(long)]
        json: bool,
    },

    /// Display current configuration
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search() {
        let args = Args::try_parse_from(["kb-retriever", "search", "hr-retriever", "leave policy"])
            .unwrap();
        assert_eq!(
            args.command,
            Commands::Search {
                retriever: "hr-retriever".to_string(),
                query: "leave policy".to_string(),
                namespace: None,
            }
        );
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
    }

    #[test]
    fn test_parse_ask_json_with_namespace() {
        let args = Args::try_parse_from([
            "kb-retriever",
            "-vv",
            "ask",
            "-n",
            "arcadia",
            "hr-retriever",
            "How many days of leave?",
            "--json",
        ])
        .unwrap();
        assert_eq!(args.verbose, 2);
        match args.command {
            Commands::Ask {
                namespace, json, ..
            } => {
                assert_eq!(namespace.as_deref(), Some("arcadia"));
                assert!(json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "kb-retriever",
            "config",
            "--config",
            "/tmp/kb.toml",
            "-q",
        ])
        .unwrap();
        assert_eq!(args.command, Commands::Config);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/kb.toml")));
        assert!(args.quiet);
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Args::try_parse_from(["kb-retriever"]).is_err());
        assert!(Args::try_parse_from(["kb-retriever", "search", "only-retriever"]).is_err());
    }
}
