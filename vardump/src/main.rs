///
/// vardump CLI - Export values and closures as PHP source
///
/// Provides commands for inspecting what the exporter produces:
/// - vardump export <file|->: Export a JSON document as PHP source
/// - vardump closure <file> <line>: Print the closure declared on a line
/// - vardump uses <path>: Print the import alias table of PHP files
///

use clap::{ArgAction, Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::Level;
use walkdir::WalkDir;

use vardump::config::{CONFIG_FILE_NAME, load_config};
use vardump::uses::ImportKind;
use vardump::{
    AliasTable, DiagnosticReporter, DumperConfig, SourceFile, UseStatementParser, Value, VarDumper,
    closure_exporter,
};

#[derive(Parser)]
#[command(name = "vardump")]
#[command(author, version, about = "Export values as PHP source", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a JSON document as a PHP expression
    Export {
        /// JSON file to read, or `-` for stdin
        input: PathBuf,

        /// Maximum array nesting to expand
        #[arg(long)]
        depth: Option<i32>,

        /// Print arrays on a single line
        #[arg(long)]
        compact: bool,

        /// Decode JSON objects as stdClass instances instead of arrays
        #[arg(long)]
        objects: bool,

        /// Config file (defaults to ./vardump.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the source of the closure declared on a line
    Closure {
        /// PHP source file
        file: PathBuf,

        /// 1-based line of the declaration
        line: u32,

        /// 1-based column to start searching from
        #[arg(long, default_value_t = 1)]
        column: u32,
    },

    /// Print the import alias table of a file or of every .php file in a directory
    Uses {
        /// File or directory
        path: PathBuf,

        /// Report statements that stopped the import scan early
        #[arg(long)]
        check: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ok = match cli.command {
        Commands::Export {
            input,
            depth,
            compact,
            objects,
            config,
        } => export_json(&input, depth, compact, objects, config.as_deref()),
        Commands::Closure { file, line, column } => print_closure(&file, line, column),
        Commands::Uses { path, check } => print_uses(&path, check),
    };

    if !ok {
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_max_level(level)
        .init();
}

fn read_config(explicit: Option<&Path>) -> Option<DumperConfig> {
    let default_path = Path::new(CONFIG_FILE_NAME);
    let path = match explicit {
        Some(path) => path,
        None if default_path.is_file() => default_path,
        None => return Some(DumperConfig::default()),
    };

    match load_config(path) {
        Ok(config) => Some(config),
        Err(e) => {
            eprintln!("Error: {}", e);
            None
        }
    }
}

fn export_json(
    input: &Path,
    depth: Option<i32>,
    compact: bool,
    objects: bool,
    config: Option<&Path>,
) -> bool {
    let Some(config) = read_config(config) else {
        return false;
    };

    let mut text = String::new();
    let read = if input == Path::new("-") {
        std::io::stdin().read_to_string(&mut text).map(|_| ())
    } else {
        std::fs::read_to_string(input).map(|s| text = s)
    };
    if let Err(e) = read {
        eprintln!("Error reading {}: {}", input.display(), e);
        return false;
    }

    let json: serde_json::Value = match serde_json::from_str(&text) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Invalid JSON in {}: {}", input.display(), e);
            return false;
        }
    };

    let value = Value::from_json(json, objects);
    let depth = depth.unwrap_or(config.export.depth);
    let pretty = config.export.pretty && !compact;
    let text = VarDumper::create(&value)
        .with_grammar(config.export.grammar)
        .export_with_depth(depth, pretty);

    if config.dump.highlight.resolve() {
        println!("{}", vardump::highlight::highlight(&text));
    } else {
        println!("{}", text);
    }
    true
}

fn print_closure(file: &Path, line: u32, column: u32) -> bool {
    match closure_exporter().extract(file, line, column) {
        Ok(source) => {
            println!("{}", source);
            true
        }
        Err(e) => {
            match std::fs::read_to_string(file) {
                Ok(text) => {
                    let source_file = SourceFile::new(file.display().to_string(), text);
                    DiagnosticReporter::new(&source_file).report_closure_error(&e);
                }
                Err(_) => eprintln!("Error: {}", e),
            }
            false
        }
    }
}

fn print_uses(path: &Path, check: bool) -> bool {
    if !path.is_dir() {
        return print_file_uses(path, check);
    }

    let mut ok = true;
    for entry in WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "php"))
    {
        ok &= print_file_uses(entry.path(), check);
    }
    ok
}

fn print_file_uses(path: &Path, check: bool) -> bool {
    let table = match UseStatementParser::from_file(path) {
        Ok(table) => table,
        Err(e) => {
            eprintln!("Error: {}", e);
            return false;
        }
    };

    println!("{}", path.display());
    print_table(&table);

    if check {
        if let Ok(text) = std::fs::read_to_string(path) {
            let (_, errors) = UseStatementParser::parse(&text);
            let source_file = SourceFile::new(path.display().to_string(), text);
            DiagnosticReporter::new(&source_file).report_parse_errors(&errors);
        }
    }
    true
}

fn print_table(table: &AliasTable) {
    if let Some(namespace) = &table.namespace {
        println!("  namespace {}", namespace);
    }
    for (kind, label) in [
        (ImportKind::Class, "class"),
        (ImportKind::Function, "function"),
        (ImportKind::Constant, "const"),
    ] {
        for (alias, target) in table.iter(kind) {
            println!("  {:<8} {} => {}", label, alias, target);
        }
    }
}
