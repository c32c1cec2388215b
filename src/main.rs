use std::{
    fs,
    io::{self, Read},
    path::PathBuf,
};

use clap::{Parser as ClapParser, Subcommand};
use sift_lang::{
    CompileOptions,
    cli::{self, CheckOptions, CheckResult, CliError},
};

#[derive(ClapParser)]
#[command(name = "sift")]
#[command(about = "Sift - compile and run typed filter expressions")]
#[command(version)]
struct Cli {
    /// Log compilation details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a filter and run it against a JSON context
    Check {
        /// The filter expression
        expression: String,

        /// JSON schema file mapping field names to types
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// JSON context (reads from stdin if not provided)
        #[arg(short, long)]
        context: Option<String>,

        /// Deepest allowed expression nesting
        #[arg(long)]
        max_depth: Option<usize>,

        /// Only validate syntax and print the canonical expression
        #[arg(long)]
        syntax_only: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(io::stderr)
        .init();

    let result = match cli.command {
        Commands::Check {
            expression,
            schema,
            context,
            max_depth,
            syntax_only,
        } => run_check(expression, schema, context, max_depth, syntax_only),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run_check(
    expression: String,
    schema: Option<PathBuf>,
    context: Option<String>,
    max_depth: Option<usize>,
    syntax_only: bool,
) -> Result<(), CliError> {
    let schema = schema.map(fs::read_to_string).transpose()?;
    let context = match context {
        Some(s) => Some(s),
        None if !syntax_only && !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Some(buffer)
        }
        None => None,
    };

    let mut compile = CompileOptions::default();
    if let Some(depth) = max_depth {
        compile.max_depth = depth;
    }

    let options = CheckOptions {
        expression,
        schema,
        context,
        syntax_only,
        compile,
    };

    match cli::execute_check(&options)? {
        CheckResult::SyntaxValid(canonical) => println!("{}", canonical),
        CheckResult::Matched(matched) => println!("{}", matched),
    }
    Ok(())
}
