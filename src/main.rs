use clap::{Parser as ClapParser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use vjass_parser::analysis::{self, SourceAnalysis};
use vjass_parser::config::{Config, OutputFormat};
use vjass_parser::diagnostics::DiagnosticPrinter;
use vjass_parser::error::VjassError;
use vjass_parser::lexer::Lexer;
use vjass_parser::printer;
use vjass_parser::Parse;

#[derive(ClapParser)]
#[command(author, version, about = "vJASS parser")]
struct Cli {
    /// Print per-file progress
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse files and print their syntax trees
    Parse {
        /// Files or directories to parse
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Output format, overriding the config file
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Dump the token stream of one file
    Tokens {
        path: PathBuf,
        /// Print tokens and scan errors as JSON
        #[arg(long)]
        json: bool,
    },
    /// Report syntax errors; exits with status 1 when any are found
    Check {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// List functions, structs, globals and declarations
    Outline {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Print outline items as JSON
        #[arg(long)]
        json: bool,
        /// Print collected names across all files instead of per-file items
        #[arg(long)]
        summary: bool,
    },
    /// Manage vjassc configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the configuration in effect
    Show,
    /// Write a default config file for the current user
    Init,
    /// Print which config file is in use
    Path,
}

fn get_source_files(paths: &[PathBuf], config: &Config) -> Result<Vec<PathBuf>, VjassError> {
    let mut found = Vec::new();

    for path in paths {
        if path.is_dir() {
            let before = found.len();
            walk_directory(path, config, &mut found)?;
            if found.len() == before {
                return Err(VjassError::FileNotFound(format!(
                    "No source files ({}) found in: {}",
                    config.extensions.join(", "),
                    path.display()
                )));
            }
        } else if path.is_file() {
            found.push(path.clone());
        } else {
            return Err(VjassError::FileNotFound(format!(
                "No such file or directory: {}",
                path.display()
            )));
        }
    }

    Ok(found)
}

fn walk_directory(dir: &Path, config: &Config, found: &mut Vec<PathBuf>) -> Result<(), VjassError> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            walk_directory(&path, config, found)?;
        } else if config.is_source_file(&path) {
            found.push(path);
        }
    }
    Ok(())
}

fn read_source(path: &Path) -> Result<String, VjassError> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => VjassError::FileNotFound(path.display().to_string()),
        _ => VjassError::IO(e),
    })?;
    String::from_utf8(bytes).map_err(|e| VjassError::Encoding {
        path: path.to_path_buf(),
        source: e.utf8_error(),
    })
}

/// Prints the diagnostics for one file and returns how many errors it had.
fn report_errors(path: &Path, source: &str, parse: &Parse, config: &Config) -> usize {
    let errors = parse.errors();
    let file_name = path.display().to_string();
    let printer = DiagnosticPrinter::new(&file_name, source);
    let limit = config.max_errors.unwrap_or(usize::MAX);

    for error in errors.iter().take(limit) {
        printer.print(error);
    }
    if errors.len() > limit {
        eprintln!("... {} more errors in {}", errors.len() - limit, file_name);
    }
    errors.len()
}

fn parse_files(paths: &[PathBuf], format: OutputFormat, config: &Config) -> Result<usize, Box<dyn std::error::Error>> {
    let mut total_errors = 0;

    for path in get_source_files(paths, config)? {
        if config.verbose {
            eprintln!("Parsing {}", path.display());
        }
        let source = read_source(&path)?;
        let parse = vjass_parser::parse(&source);

        match format {
            OutputFormat::Tree => print!("{}", printer::render_tree(&parse.tree, &source)),
            OutputFormat::Sexp => println!("{}", printer::to_sexp(&parse.tree)),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&parse)?),
        }
        total_errors += report_errors(&path, &source, &parse, config);
    }

    Ok(total_errors)
}

fn dump_tokens(path: &Path, json: bool) -> Result<usize, Box<dyn std::error::Error>> {
    let source = read_source(path)?;
    let (tokens, errors) = Lexer::new(&source).tokenize();

    if json {
        let dump = serde_json::json!({ "tokens": &tokens, "errors": &errors });
        println!("{}", serde_json::to_string_pretty(&dump)?);
    } else {
        for token in &tokens {
            println!(
                "{}:{} {:?} {:?}",
                token.line() + 1,
                token.column() + 1,
                token.kind,
                token.value
            );
        }
        let file_name = path.display().to_string();
        let printer = DiagnosticPrinter::new(&file_name, &source);
        for error in &errors {
            printer.print(&error.clone().into());
        }
    }

    Ok(errors.len())
}

fn check_files(paths: &[PathBuf], config: &Config) -> Result<usize, VjassError> {
    let files = get_source_files(paths, config)?;
    let mut total_errors = 0;
    let mut failed_files = 0;

    for path in &files {
        if config.verbose {
            eprintln!("Checking {}", path.display());
        }
        let source = read_source(path)?;
        let parse = vjass_parser::parse(&source);
        let count = report_errors(path, &source, &parse, config);
        if count > 0 {
            failed_files += 1;
        }
        total_errors += count;
    }

    println!(
        "Checked {} file(s): {} error(s) in {} file(s)",
        files.len(),
        total_errors,
        failed_files
    );
    Ok(total_errors)
}

fn outline_files(paths: &[PathBuf], json: bool, summary: bool, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut analyzer = SourceAnalysis::new();

    for path in get_source_files(paths, config)? {
        if config.verbose {
            eprintln!("Analyzing {}", path.display());
        }
        let source = read_source(&path)?;
        let parse = vjass_parser::parse(&source);

        if summary {
            analyzer.analyze(&parse.tree, &source);
            continue;
        }

        let items = analysis::outline(&parse.tree, &source);
        if json {
            let dump = serde_json::json!({ "file": path.display().to_string(), "items": items });
            println!("{}", serde_json::to_string_pretty(&dump)?);
        } else {
            println!("{}", path.display());
            for item in items {
                println!("  {}:{} {} {}", item.line, item.column, item.kind, item.name);
            }
        }
    }

    if summary {
        if json {
            println!("{}", serde_json::to_string_pretty(&analyzer)?);
        } else {
            analyzer.print_analysis();
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = Config::load()?;
    config.verbose |= cli.verbose;

    match cli.command {
        Commands::Parse { paths, format } => {
            let format = format.unwrap_or(config.format);
            parse_files(&paths, format, &config)?;
        }
        Commands::Tokens { path, json } => {
            if dump_tokens(&path, json)? > 0 {
                std::process::exit(1);
            }
        }
        Commands::Check { paths } => {
            if check_files(&paths, &config)? > 0 {
                std::process::exit(1);
            }
        }
        Commands::Outline { paths, json, summary } => {
            outline_files(&paths, json, summary, &config)?;
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            ConfigCommands::Init => {
                let path = Config::get_user_config_path();
                if path.exists() {
                    println!("Config file already exists at: {}", path.display());
                    println!("Remove it to reinitialize.");
                } else {
                    Config::default().save(&path)?;
                    println!("Initialized new config file at: {}", path.display());
                }
            }
            ConfigCommands::Path => match Config::find_config_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("No config file found; using defaults"),
            },
        },
    }

    Ok(())
}
