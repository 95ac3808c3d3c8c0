use super::render::{print_config, print_history, print_masters, print_messages, print_versions};
use super::setup::{Cli, Commands};
use clap::Parser;
use colored::*;
use snapver::api::{base_for_argument, parse_version, ConfigAction, SnapverApi};
use snapver::error::Result;
use snapver::init::{backup_directory, config_dir, initialize};
use snapver::logging;
use snapver::store::FsAttributeStore;
use std::path::PathBuf;

struct AppContext {
    api: SnapverApi<FsAttributeStore>,
    backup_dir: PathBuf,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let ctx = init_context(&cli)?;

    match cli.command {
        Commands::Scan { file } => handle_scan(&ctx, &file),
        Commands::Tag {
            file,
            version,
            value,
        } => handle_tag(&ctx, &file, &version, value),
        Commands::History { file, version } => handle_history(&ctx, &file, &version),
        Commands::Refresh { file } => handle_refresh(&ctx, &file),
        Commands::Path { file, versions } => handle_paths(&ctx, &file, &versions),
        Commands::Masters => handle_masters(&ctx),
        Commands::Config { key, value } => handle_config(&ctx, key, value),
    }
}

fn init_context(cli: &Cli) -> Result<AppContext> {
    let cwd = std::env::current_dir()?;
    let ctx = initialize(config_dir()?)?;
    let backup_dir = backup_directory(ctx.api.config(), cli.dir.as_deref(), &cwd);

    Ok(AppContext {
        api: ctx.api,
        backup_dir,
    })
}

fn handle_scan(ctx: &AppContext, file: &str) -> Result<()> {
    let base = base_for_argument(file);
    let result = ctx.api.refresh_files(&ctx.backup_dir, &base)?;
    print_versions(&result.versions);
    print_messages(&result.messages);
    Ok(())
}

fn handle_tag(ctx: &AppContext, file: &str, version: &str, value: Vec<String>) -> Result<()> {
    let base = base_for_argument(file);
    let version = parse_version(version)?;

    if value.is_empty() {
        let result = ctx.api.view_tag(&ctx.backup_dir, &base, version)?;
        match result.tag.as_deref() {
            Some("") | None => println!("{}", "(no tag)".dimmed()),
            Some(tag) => println!("{}", tag),
        }
        print_messages(&result.messages);
        return Ok(());
    }

    let result = ctx
        .api
        .edit_tag(&ctx.backup_dir, &base, version, &value.join(" "))?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_history(ctx: &AppContext, file: &str, version: &str) -> Result<()> {
    let base = base_for_argument(file);
    let version = parse_version(version)?;
    let result = ctx.api.view_history(&ctx.backup_dir, &base, version)?;
    print_history(&result.history);
    print_messages(&result.messages);
    Ok(())
}

fn handle_refresh(ctx: &AppContext, file: &str) -> Result<()> {
    let base = base_for_argument(file);
    let result = ctx.api.refresh_metadata(&ctx.backup_dir, &base)?;
    print_versions(&result.versions);
    print_messages(&result.messages);
    Ok(())
}

fn handle_paths(ctx: &AppContext, file: &str, versions: &[String]) -> Result<()> {
    let base = base_for_argument(file);
    let versions = versions
        .iter()
        .map(|v| parse_version(v))
        .collect::<Result<Vec<_>>>()?;
    let result = ctx.api.version_paths(&ctx.backup_dir, &base, &versions)?;
    for path in &result.paths {
        println!("{}", path.display());
    }
    print_messages(&result.messages);
    Ok(())
}

fn handle_masters(ctx: &AppContext) -> Result<()> {
    let result = ctx.api.list_masters(&ctx.backup_dir)?;
    print_masters(&result.masters);
    print_messages(&result.messages);
    Ok(())
}

fn handle_config(ctx: &AppContext, key: Option<String>, value: Option<String>) -> Result<()> {
    let action = match (key, value) {
        (None, _) => ConfigAction::ShowAll,
        (Some(key), None) => ConfigAction::ShowKey(key),
        (Some(key), Some(value)) => ConfigAction::Set(key, value),
    };

    let result = ctx.api.config_action(action.clone())?;
    if let (ConfigAction::ShowAll, Some(config)) = (&action, &result.config) {
        print_config(config);
    }
    print_messages(&result.messages);
    Ok(())
}
