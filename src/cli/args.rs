//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;
use waymark::core::RequestContext;

/// Resolve request paths and map content paths
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: waymark.toml)
    #[arg(short = 'C', long, default_value = "waymark.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Write a commented waymark.toml into the current directory
    #[command(visible_alias = "i")]
    Init {
        /// Print the config template instead of writing it
        #[arg(long)]
        dry: bool,
    },

    /// Resolve a request path to a resource
    #[command(visible_alias = "r")]
    Resolve {
        /// Request path, e.g. /content/page.html
        path: String,

        #[command(flatten)]
        request: RequestArgs,
    },

    /// Map a content path to the URL that reaches it
    #[command(visible_alias = "m")]
    Map {
        /// Content path, e.g. /content/page.html
        path: String,

        #[command(flatten)]
        request: RequestArgs,

        /// Prefix for every mapped path (e.g. /ctx)
        #[arg(long)]
        context_path: Option<String>,
    },

    /// Print the resolve and map rewrite tables
    Routes,

    /// Find resources with a store query
    #[command(visible_alias = "f")]
    Find {
        /// Query statement
        query: String,

        /// Query language (path, property)
        #[arg(short, long, default_value = "path")]
        language: String,
    },
}

/// Request the command is evaluated for.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RequestArgs {
    /// Request scheme (default: http)
    #[arg(long)]
    pub scheme: Option<String>,

    /// Request host (default: localhost)
    #[arg(long)]
    pub host: Option<String>,

    /// Request port (default: the scheme's)
    #[arg(long)]
    pub port: Option<u16>,

    /// Workspace hint
    #[arg(short, long)]
    pub workspace: Option<String>,

    /// Trace every resolution step
    #[arg(short = 'V', long)]
    pub verbose: bool,
}

impl RequestArgs {
    /// `None` when no request detail was given on the command line.
    pub fn to_request(&self, context_path: Option<&str>) -> Option<RequestContext> {
        if self.scheme.is_none()
            && self.host.is_none()
            && self.port.is_none()
            && self.workspace.is_none()
            && context_path.is_none()
        {
            return None;
        }

        let mut request = RequestContext::new(
            self.scheme.as_deref().unwrap_or("http"),
            self.host.as_deref().unwrap_or("localhost"),
        );
        if let Some(port) = self.port {
            request = request.with_port(port);
        }
        if let Some(ctx) = context_path {
            request = request.with_context_path(ctx);
        }
        if let Some(ws) = &self.workspace {
            request = request.with_workspace(ws.as_str());
        }
        Some(request)
    }
}

impl Cli {
    pub fn is_verbose(&self) -> bool {
        match &self.command {
            Commands::Resolve { request, .. } | Commands::Map { request, .. } => request.verbose,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolve() {
        let cli = Cli::try_parse_from([
            "waymark", "resolve", "/content/page.html", "--host", "example.com", "--port", "8080",
            "-V",
        ])
        .unwrap();

        assert!(cli.is_verbose());
        assert_eq!(cli.config, PathBuf::from("waymark.toml"));
        let Commands::Resolve { path, request } = cli.command else {
            panic!("expected resolve");
        };
        assert_eq!(path, "/content/page.html");

        let request = request.to_request(None).unwrap();
        assert_eq!(request.scheme, "http");
        assert_eq!(request.host, "example.com");
        assert_eq!(request.port, Some(8080));
    }

    #[test]
    fn test_no_request_details() {
        let cli = Cli::try_parse_from(["waymark", "-C", "other.toml", "m", "/content"]).unwrap();
        assert!(!cli.is_verbose());
        assert_eq!(cli.config, PathBuf::from("other.toml"));
        let Commands::Map {
            request,
            context_path,
            ..
        } = cli.command
        else {
            panic!("expected map");
        };
        assert!(context_path.is_none());
        assert!(request.to_request(None).is_none());
        assert_eq!(
            request.to_request(Some("/ctx")).map(|r| r.context_path),
            Some("/ctx".to_string())
        );
    }

    #[test]
    fn test_find_default_language() {
        let cli = Cli::try_parse_from(["waymark", "find", "/content/*"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Find { ref language, .. } if language == "path"
        ));
    }
}
