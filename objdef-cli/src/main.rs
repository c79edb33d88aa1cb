use clap::{Parser, Subcommand, ValueEnum};
use objdef::access::resolve_access_now;
use objdef::codeset::TableInObject;
use objdef::{
    parse_document, render, Compiler, CompilerConfig, DefinitionDocument, Dialect, TableSnapshot,
};
use std::path::{Path, PathBuf};
use std::process;

/// objdef: expand object definitions into canonical form, SQL DDL and migrations
#[derive(Parser)]
#[command(name = "objdef", version, about)]
struct Cli {
    /// YAML compiler config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQL dialect (overrides the config file)
    #[arg(long, global = true, value_parser = parse_dialect)]
    dialect: Option<Dialect>,

    /// Keep language-adaptive properties on their host table
    #[arg(long, global = true)]
    single_language: bool,

    /// Output format
    #[arg(long, global = true, default_value = "yaml")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Print the expanded definition of an identifier
    Expand {
        /// Definition document (.json, .yaml or .yml)
        file: PathBuf,
        /// Identifier to expand
        identifier: String,
        /// Human-readable rendering instead of compact text
        #[arg(long)]
        pretty: bool,
    },

    /// Expand an identifier and print its CREATE statements
    Sql {
        file: PathBuf,
        identifier: String,
        /// The document already holds expanded output
        #[arg(long)]
        expanded: bool,
    },

    /// Print the statements that bring recorded tables up to date
    Migrate {
        file: PathBuf,
        identifier: String,
        /// JSON snapshot of the live tables (missing file = empty database)
        #[arg(long)]
        snapshot: Option<PathBuf>,
        /// Write the migrated state back to the snapshot file
        #[arg(long, requires = "snapshot")]
        record: bool,
    },

    /// List the tables and codesets an identifier touches
    Tables {
        file: PathBuf,
        identifier: String,
        /// Show the properties referencing this codeset
        #[arg(long)]
        codeset: Option<String>,
    },

    /// Resolve the row access condition for a user type
    Access {
        /// JSON or YAML file holding the access rules array
        rules: PathBuf,
        /// User type to resolve for
        #[arg(long)]
        usertype: String,
    },

    /// Re-serialize a JSON definition without whitespace
    Compact {
        file: PathBuf,
    },
}

fn parse_dialect(s: &str) -> Result<Dialect, String> {
    Dialect::parse(s).ok_or_else(|| format!("Unknown dialect '{s}' (expected sqlite or mysql)"))
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("ERROR:{e}");
        process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<CompilerConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => CompilerConfig::from_file(path)?,
        None => CompilerConfig::default(),
    };
    if let Some(dialect) = cli.dialect {
        config.dialect = dialect;
    }
    if cli.single_language {
        config.multi_language = false;
    }
    log::debug!(
        "dialect={} multi_language={}",
        config.dialect.as_str(),
        config.multi_language
    );
    Ok(config)
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let compiler = Compiler::new(load_config(&cli)?);

    match &cli.command {
        Command::Expand {
            file,
            identifier,
            pretty,
        } => {
            let compiled = compiler.expand(&parse_document(file)?, identifier)?;
            if *pretty {
                println!("{}", compiled.pretty);
            } else {
                println!("{}", compiled.canonical);
            }
        }

        Command::Sql {
            file,
            identifier,
            expanded,
        } => {
            let document = parse_document(file)?;
            let statements = if *expanded {
                compiler.create_statements(&document, identifier)?
            } else {
                compiler.expand_to_sql(&document, identifier)?.1
            };
            print_statements(&statements);
        }

        Command::Migrate {
            file,
            identifier,
            snapshot,
            record,
        } => {
            let document = parse_document(file)?;
            let mut live = match snapshot {
                Some(path) => load_snapshot(path)?,
                None => TableSnapshot::new(),
            };
            let statements = compiler.migration_statements(&document, identifier, &live)?;
            print_statements(&statements);

            if let (true, Some(path)) = (*record, snapshot) {
                let compiled = compiler.expand(&document, identifier)?;
                live.record(&compiled.tree, &compiler.generator());
                std::fs::write(path, serde_json::to_string_pretty(&live)?)
                    .map_err(|e| format!("Failed to write snapshot '{}': {e}", path.display()))?;
            }
        }

        Command::Tables {
            file,
            identifier,
            codeset,
        } => {
            let document = parse_document(file)?;
            let tio = table_in_object(&document, identifier)?;
            let value = match codeset {
                Some(name) => serde_json::to_value(tio.related_tables(name))?,
                None => serde_json::json!({
                    "identifier": tio.identifier,
                    "objects": tio.objects,
                    "codesets": tio.codesets,
                }),
            };
            print_output(&value, &cli.format)?;
        }

        Command::Access { rules, usertype } => {
            let rules = read_value(rules)?;
            let condition = resolve_access_now(usertype, &rules);
            print_output(
                &serde_json::json!({
                    "usertype": usertype,
                    "unrestricted": condition.is_none(),
                    "condition": condition.unwrap_or_default(),
                }),
                &cli.format,
            )?;
        }

        Command::Compact { file } => {
            let text = std::fs::read_to_string(file)
                .map_err(|e| format!("Failed to read '{}': {e}", file.display()))?;
            println!("{}", render::compact(&text)?);
        }
    }

    Ok(())
}

fn table_in_object(
    document: &DefinitionDocument,
    identifier: &str,
) -> Result<TableInObject, Box<dyn std::error::Error>> {
    let raw = document
        .raw(identifier)
        .ok_or_else(|| objdef::ObjdefError::NotFound(identifier.to_string()))?;
    Ok(TableInObject::scan(identifier, raw))
}

fn load_snapshot(path: &Path) -> Result<TableSnapshot, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Ok(TableSnapshot::new());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read snapshot '{}': {e}", path.display()))?;
    Ok(serde_json::from_str(&content)?)
}

fn read_value(path: &Path) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {e}", path.display()))?;
    let yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    Ok(if yaml {
        serde_yaml::from_str(&content)?
    } else {
        serde_json::from_str(&content)?
    })
}

fn print_statements(statements: &[String]) {
    for statement in statements {
        println!("{statement};");
    }
}

fn print_output(
    value: &serde_json::Value,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}
