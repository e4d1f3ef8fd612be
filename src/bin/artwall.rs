use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "artwall", version, about = "Album-art wallpapers for MPRIS players")]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Reload configuration before every wallpaper update.
    #[arg(short, long, global = true)]
    reload: bool,

    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watch the player and update the wallpaper (default).
    Run,
    /// Generate a default config file.
    Gen,
    /// Show available processors and variables.
    Info(InfoArgs),
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Show available processors.
    #[arg(short, long)]
    processors: bool,

    /// Show current variables.
    #[arg(short, long)]
    vars: bool,
}

fn default_config_path() -> PathBuf {
    let home = std::env::var_os("HOME").unwrap_or_else(|| ".".into());
    PathBuf::from(home).join(".artwall.json")
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Some(Command::Gen) => cmd_gen(&cli.config),
        Some(Command::Info(args)) => cmd_info(&cli.config, args),
        Some(Command::Run) | None => cmd_run(&cli.config, cli.reload),
    }
}

fn cmd_gen(path: &PathBuf) -> anyhow::Result<()> {
    if path.exists() {
        eprintln!("config {} already exists", path.display());
        return Ok(());
    }
    artwall::Config::default().save(path)?;
    println!("config generated at {}", path.display());
    Ok(())
}

fn cmd_info(config_path: &PathBuf, args: InfoArgs) -> anyhow::Result<()> {
    let mut ctx = artwall::Context::new(config_path.clone())?;

    if args.processors {
        println!("{:#^80}", " processors ");
        for name in ctx.processors().names() {
            println!("{}", "-".repeat(80));
            println!("name: {name}");
            println!("type: processor");
        }
    }

    if args.vars {
        println!("{:#^80}", " variables ");
        ctx.update_variables()?;
        for (name, value) in &ctx.variables {
            println!("{}", "-".repeat(80));
            println!("name: {name}");
            println!("value: {value}");
        }
    }

    Ok(())
}

fn cmd_run(config_path: &PathBuf, reload: bool) -> anyhow::Result<()> {
    let mut ctx = artwall::Context::new(config_path.clone())?;
    ctx.reload_on_track = reload;

    tracing_subscriber::fmt()
        .with_max_level(ctx.config.log_level.as_tracing_level())
        .init();
    tracing::debug!(config = %config_path.display(), "using config");

    artwall::mpris::run_loop(&mut ctx)?;
    Ok(())
}
