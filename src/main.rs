mod cli;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use waymark::config::{WaymarkConfig, init_config};
use waymark::logger::set_verbose;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {}
    }
    set_verbose(cli.is_verbose());

    if let Commands::Init { dry } = &cli.command {
        return cli::init::write_config(*dry);
    }

    let config = init_config(WaymarkConfig::load(&cli.config)?);

    match &cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Resolve { path, request, .. } => cli::inspect::resolve(&config, path, request),
        Commands::Map {
            path,
            request,
            context_path,
            ..
        } => cli::inspect::map(&config, path, request, context_path.as_deref()),
        Commands::Routes => cli::inspect::routes(&config),
        Commands::Find { query, language } => cli::inspect::find(&config, query, language),
    }
}
