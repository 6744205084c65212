//! CLI definitions for pagelink.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// pagelink CLI.
#[derive(Parser)]
#[command(name = "pagelink")]
#[command(about = "Observe, query and drive a host document from an isolated context")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/pagelink.toml", global = true, env = "PAGELINK_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Serve a document over stdin/stdout as newline-delimited JSON frames
    Serve {
        /// HTML file to load as the host document
        #[arg(long)]
        html: PathBuf,

        /// Document location
        #[arg(long, default_value = "about:blank")]
        url: String,

        /// Also answer relayed requests addressed to this peer name
        #[arg(long)]
        peer: Option<String>,
    },

    /// Host a document in-process and serve it through a relaying coordinator
    /// over stdin/stdout
    Coordinate {
        /// HTML file to load as the host document
        #[arg(long)]
        html: PathBuf,

        /// Document location
        #[arg(long, default_value = "about:blank")]
        url: String,
    },

    /// Evaluate a query or query map against an HTML file once
    Query {
        /// HTML file to evaluate against
        #[arg(long)]
        html: PathBuf,

        /// Document location
        #[arg(long, default_value = "about:blank")]
        url: String,

        /// Query JSON (inline)
        #[arg(long, conflicts_with = "query_file")]
        query: Option<String>,

        /// Query JSON file
        #[arg(long)]
        query_file: Option<PathBuf>,

        /// Treat the input as a query map
        #[arg(long)]
        map: bool,
    },

    /// List the functions the host exposes
    Catalog {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Table,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve() {
        let cli = Cli::parse_from(["pagelink", "serve", "--html", "page.html", "--url", "https://a.test/"]);
        match cli.command {
            Commands::Serve { html, url, peer } => {
                assert_eq!(html, PathBuf::from("page.html"));
                assert_eq!(url, "https://a.test/");
                assert!(peer.is_none());
            }
            _ => panic!("expected serve"),
        }
        assert_eq!(cli.config, PathBuf::from("config/pagelink.toml"));
    }

    #[test]
    fn test_parse_serve_as_peer() {
        let cli = Cli::parse_from(["pagelink", "serve", "--html", "p.html", "--peer", "west"]);
        assert!(matches!(cli.command, Commands::Serve { peer: Some(ref p), .. } if p == "west"));
    }

    #[test]
    fn test_parse_coordinate() {
        let cli = Cli::parse_from(["pagelink", "coordinate", "--html", "p.html"]);
        match cli.command {
            Commands::Coordinate { html, url } => {
                assert_eq!(html, PathBuf::from("p.html"));
                assert_eq!(url, "about:blank");
            }
            _ => panic!("expected coordinate"),
        }
    }

    #[test]
    fn test_parse_query_map() {
        let cli = Cli::parse_from([
            "pagelink", "-c", "other.toml", "query", "--html", "p.html", "--query", "{}", "--map",
        ]);
        assert_eq!(cli.config, PathBuf::from("other.toml"));
        assert!(matches!(cli.command, Commands::Query { map: true, .. }));
    }

    #[test]
    fn test_query_sources_conflict() {
        let result = Cli::try_parse_from([
            "pagelink", "query", "--html", "p.html", "--query", "{}", "--query-file", "q.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_catalog_format() {
        let cli = Cli::parse_from(["pagelink", "catalog", "--format", "json"]);
        assert!(matches!(cli.command, Commands::Catalog { format: OutputFormat::Json }));
    }
}
