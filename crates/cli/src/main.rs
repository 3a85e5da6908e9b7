mod fromfile;

use anyhow::{Context, Result, bail};
use argbind::{Bindings, ParseOutcome};
use argbind_schema::{DEFAULT_SCHEMA_NAME, ParserSchema};
use clap::{Parser, Subcommand};
use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "argbind")]
#[command(version, about = "Match tokens against a parser declaration", long_about = None)]
#[command(disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter argbind.json
    Init(InitArgs),

    /// Validate a declaration and summarize it
    Check(SchemaArgs),

    /// Match tokens against a declaration and print the bindings
    Parse(ParseArgs),

    /// Print the help text of a declaration or one of its subcommands
    Help(HelpArgs),

    /// Print the usage line of a declaration or one of its subcommands
    Usage(HelpArgs),
}

#[derive(Parser)]
struct InitArgs {
    /// Project directory (default: current directory)
    #[arg(value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Program name written into the declaration
    #[arg(short, long)]
    prog: Option<String>,
}

#[derive(Parser)]
struct SchemaArgs {
    /// Path to the parser declaration
    #[arg(short, long, default_value = DEFAULT_SCHEMA_NAME, value_name = "FILE")]
    schema: PathBuf,
}

#[derive(Parser)]
struct ParseArgs {
    #[command(flatten)]
    schema: SchemaArgs,

    /// Print bindings as JSON
    #[arg(long)]
    json: bool,

    /// Tokens to match, given after `--`
    #[arg(last = true, value_name = "TOKENS")]
    tokens: Vec<String>,
}

#[derive(Parser)]
struct HelpArgs {
    #[command(flatten)]
    schema: SchemaArgs,

    /// Subcommand path, outermost first
    #[arg(value_name = "COMMAND")]
    command: Vec<String>,
}

fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Init(args) => init(args).map(|()| ExitCode::SUCCESS),
        Commands::Check(args) => check(args).map(|()| ExitCode::SUCCESS),
        Commands::Parse(args) => parse(args),
        Commands::Help(args) => show(args, argbind::Parser::format_help),
        Commands::Usage(args) => show(args, |parser| parser.format_usage() + "\n"),
    }
}

fn load_schema(path: &Path) -> Result<ParserSchema> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read declaration {}", path.display()))?;
    ParserSchema::from_json_str(&json)
        .with_context(|| format!("invalid declaration {}", path.display()))
}

fn load_parser(path: &Path) -> Result<argbind::Parser> {
    let parser = load_schema(path)?
        .build()
        .with_context(|| format!("invalid declaration {}", path.display()))?;
    tracing::debug!(prog = parser.prog(), "loaded declaration");
    Ok(parser)
}

fn init(args: InitArgs) -> Result<()> {
    let dir = args.dir.unwrap_or_else(|| PathBuf::from("."));

    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create directory: {}", dir.display()))?;

    let schema_path = dir.join(DEFAULT_SCHEMA_NAME);
    if schema_path.exists() {
        bail!("{DEFAULT_SCHEMA_NAME} already exists in {}", dir.display());
    }

    let prog = args.prog.unwrap_or_else(|| {
        dir.canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "my-tool".to_string())
    });
    let json = ParserSchema::starter(prog).to_json_pretty()?;
    fs::write(&schema_path, json + "\n")
        .with_context(|| format!("failed to write {}", schema_path.display()))?;

    eprintln!("Created: {}", schema_path.display());
    eprintln!("\nNext steps:");
    eprintln!("  1. Edit {DEFAULT_SCHEMA_NAME} to declare your arguments");
    eprintln!("  2. Run: argbind check");
    eprintln!("  3. Run: argbind parse -- <tokens>");

    Ok(())
}

fn check(args: SchemaArgs) -> Result<()> {
    tracing::debug!("executing check command");
    let parser = load_parser(&args.schema)?;
    println!("{}: ok", args.schema.display());
    summarize(&parser, &mut |line| println!("{line}"));
    Ok(())
}

fn summarize(parser: &argbind::Parser, out: &mut impl FnMut(String)) {
    let mut line = format!(
        "  {}: {} positional, {} optional",
        parser.prog(),
        parser.positionals().len(),
        parser.optionals().len()
    );
    if let Some(group) = parser.subcommands() {
        line.push_str(&format!(", commands: {}", group.names().join(", ")));
    }
    out(line);
    if let Some(group) = parser.subcommands() {
        for (_, command) in group.commands() {
            summarize(command.parser(), out);
        }
    }
}

fn show(args: HelpArgs, render: impl Fn(&argbind::Parser) -> String) -> Result<ExitCode> {
    let parser = load_parser(&args.schema.schema)?;
    let mut level = &parser;
    for name in &args.command {
        level = level
            .subcommands()
            .and_then(|group| group.command(name))
            .map(|command| command.parser())
            .with_context(|| format!("{} has no subcommand '{name}'", level.prog()))?;
    }
    print!("{}", render(level));
    Ok(ExitCode::SUCCESS)
}

fn parse(args: ParseArgs) -> Result<ExitCode> {
    tracing::debug!("executing parse command");
    let parser = load_parser(&args.schema.schema)?;

    let tokens = match fromfile::expand(args.tokens, parser.fromfile_prefix_chars()) {
        Ok(tokens) => tokens,
        Err(err) => return Ok(usage_error(&parser, &format!("{err:#}"))),
    };

    match parser.parse_with_level(tokens) {
        Ok(ParseOutcome::Matches(bindings)) => {
            print_bindings(&bindings, args.json)?;
            Ok(ExitCode::SUCCESS)
        }
        Ok(ParseOutcome::Help(text)) => {
            print!("{text}");
            Ok(ExitCode::SUCCESS)
        }
        Ok(ParseOutcome::Version(text)) => {
            println!("{text}");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => Ok(usage_error(err.level(), &err.to_string())),
    }
}

fn usage_error(parser: &argbind::Parser, message: &str) -> ExitCode {
    eprintln!("{}", parser.format_usage());
    eprintln!("{}: error: {message}", parser.prog());
    ExitCode::from(2)
}

fn print_bindings(bindings: &Bindings, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(bindings)?);
        return Ok(());
    }
    for (key, _) in bindings.iter() {
        println!("{key} = {}", bindings.display(key)?);
    }
    if !bindings.subcommands().is_empty() {
        println!("# commands: {}", bindings.subcommands().join(" "));
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .init();
}
