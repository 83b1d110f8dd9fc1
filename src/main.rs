//! finrec CLI entry point.

use clap::Parser;
use finrec::cli::commands::{self, Output};
use finrec::cli::{Cli, Commands, OutputFormat};
use finrec::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    // Set up tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    // Resolve effective output: --json, --format, or non-TTY stdout
    let output = if cli.json || cli.format == OutputFormat::Json {
        Output::Json
    } else if cli.format == OutputFormat::Csv {
        Output::Csv
    } else if std::io::IsTerminal::is_terminal(&std::io::stdout()) {
        Output::Human
    } else {
        Output::Json
    };
    let json = output.is_machine();

    // Run the command and handle errors
    match run(&cli, output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,rusqlite=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli, output: Output) -> Result<(), Error> {
    let db = cli.db.as_deref();
    let home = cli.home.as_deref();
    let json = output.is_machine();

    match &cli.command {
        Commands::Init { force } => commands::init::execute(db, home, *force, json),
        Commands::Version => commands::version::execute(json),

        Commands::Record { command } => {
            commands::record::execute(command, db, home, cli.user, output)
        }
        Commands::Summary => commands::summary::execute(db, home, cli.user, output),

        // Interchange
        Commands::Export(args) => commands::interchange::export(args, db, home, cli.user, output),
        Commands::Import { file } => {
            commands::interchange::import(file, db, home, cli.user, output)
        }
        Commands::Validate { file } => commands::interchange::validate(file, output),
        Commands::Cleanup { max_age } => commands::interchange::cleanup(*max_age, db, home, output),

        // Shell completions
        Commands::Completions { shell } => commands::completions::execute(shell),
    }
}
