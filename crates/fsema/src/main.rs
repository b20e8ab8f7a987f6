//! fsema - report semantic queries over a program description
//!
//! Usage: fsema [OPTIONS] <input>

use std::fs;
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Parser as ClapParser, ValueEnum};
use fsema::common::DiagnosticReporter;
use fsema::loader;
use fsema::tools::ComponentKind;
use fsema::{Driver, DriverConfig, LanguageFeatures, Report};
use tracing_subscriber::EnvFilter;

/// Component traversal order
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
enum Components {
    /// Declaration order, parent type components first
    Ordered,
    /// Every component, descending into non-allocatable non-pointer ones
    Direct,
    /// Intrinsic, allocatable, pointer and procedure components
    Ultimate,
    /// Non-pointer components, descending into allocatables
    Potential,
    /// Symbols of each type scope in name order
    Scope,
    /// Potential components and pointers
    PotentialAndPointer,
}

impl From<Components> for ComponentKind {
    fn from(kind: Components) -> Self {
        match kind {
            Components::Ordered => ComponentKind::Ordered,
            Components::Direct => ComponentKind::Direct,
            Components::Ultimate => ComponentKind::Ultimate,
            Components::Potential => ComponentKind::Potential,
            Components::Scope => ComponentKind::Scope,
            Components::PotentialAndPointer => ComponentKind::PotentialAndPointer,
        }
    }
}

#[derive(ClapParser, Debug)]
#[command(name = "fsema")]
#[command(version)]
#[command(about = "Semantic queries over program descriptions", long_about = None)]
struct Args {
    /// Input description (.symtab)
    #[arg(required = true)]
    input: PathBuf,

    /// Print the scope tree
    #[arg(long)]
    scopes: bool,

    /// Classify every procedure
    #[arg(long)]
    classify: bool,

    /// List the components of every derived type
    #[arg(long, value_enum)]
    components: Option<Components>,

    /// List final subroutines of every derived type
    #[arg(long)]
    finals: bool,

    /// Print storage association groups
    #[arg(long)]
    storage: bool,

    /// Report PRIVATE entities referenced outside their module
    #[arg(long)]
    access: bool,

    /// List the names each generic may be declared under
    #[arg(long)]
    generics: bool,

    /// Print the CUDA data placement of main program variables
    #[arg(long)]
    placement: bool,

    /// Warn about variables reallocated differently under Fortran 202X
    #[arg(long)]
    reallocation: bool,

    /// Enable CUDA attributes
    #[arg(long)]
    cuda: bool,

    /// Accept .a. .o. .n. .x. as logical operators
    #[arg(long)]
    logical_abbreviations: bool,

    /// Accept .xor. as a logical operator
    #[arg(long)]
    xor_operator: bool,

    /// Warn about allocatable character scalars affected by Fortran 202X
    #[arg(long = "warn-f202x")]
    warn_f202x: bool,

    /// Dump tokens (for debugging)
    #[arg(long)]
    dump_tokens: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "fsema=debug" } else { "warn" }));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn reports(args: &Args) -> Vec<Report> {
    let mut reports = Vec::new();
    if args.scopes {
        reports.push(Report::Scopes);
    }
    if args.classify {
        reports.push(Report::Classify);
    }
    if let Some(kind) = args.components {
        reports.push(Report::Components(kind.into()));
    }
    if args.finals {
        reports.push(Report::Finals);
    }
    if args.storage {
        reports.push(Report::Storage);
    }
    if args.access {
        reports.push(Report::Access);
    }
    if args.generics {
        reports.push(Report::Generics);
    }
    if args.placement {
        reports.push(Report::Placement);
    }
    if args.reallocation {
        reports.push(Report::Reallocation);
    }
    reports
}

fn run(args: &Args) -> anyhow::Result<()> {
    let source =
        fs::read_to_string(&args.input).with_context(|| format!("cannot read {}", args.input.display()))?;
    let filename = args.input.display().to_string();

    let mut reporter = DiagnosticReporter::new();
    let file_id = reporter.add_file(&filename, &source);

    if args.dump_tokens {
        match loader::tokenize(&source) {
            Ok(tokens) => {
                eprintln!("=== Tokens ===");
                for token in &tokens {
                    eprintln!("{:?} {}", token.span, token.kind);
                }
                eprintln!("=== End Tokens ===\n");
            }
            Err(err) => {
                reporter.report_error(file_id, &err);
                anyhow::bail!("could not tokenize {filename}");
            }
        }
    }

    let config = DriverConfig {
        features: LanguageFeatures {
            cuda: args.cuda,
            logical_abbreviations: args.logical_abbreviations,
            xor_operator: args.xor_operator,
            warn_f202x_allocatable: args.warn_f202x,
        },
        reports: reports(args),
    };
    tracing::info!(input = %filename, reports = config.reports.len(), "analyzing");

    let analysis = match Driver::new(config).analyze(&source) {
        Ok(analysis) => analysis,
        Err(err) => {
            reporter.report_error(file_id, &err);
            anyhow::bail!("could not load {filename}");
        }
    };

    print!("{}", analysis.output);
    for message in analysis.messages() {
        reporter.report_message(file_id, message);
    }
    if analysis.context.any_fatal_error() {
        anyhow::bail!("{} message(s) reported", analysis.messages().len());
    }
    Ok(())
}
