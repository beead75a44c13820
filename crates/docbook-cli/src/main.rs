//! docbook-cli - convert JSON document trees to DocBook XML

use std::collections::HashSet;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use docbook_config::{Config, DEFAULT_CONFIG_FILE};
use docbook_core::{
    BatchItem, ConvertOptions, Diagnostic, DiagnosticSeverity, EmitOptions, SectionHierarchy,
    Template, convert_batch, source_from_json,
};

#[derive(Parser)]
#[command(name = "docbook-cli")]
#[command(version, about = "Convert JSON document trees to DocBook XML", long_about = None)]
#[command(after_help = "EXAMPLES:
    docbook-cli intro.json                 Print intro.json as DocBook
    docbook-cli -o out/ a.json b.json      Convert a batch into out/a.xml, out/b.xml
    docbook-cli < tree.json                Convert a tree read from stdin")]
struct Cli {
    /// JSON source trees; stdin is read when none are given
    #[arg(value_name = "INPUT")]
    inputs: Vec<PathBuf>,

    /// Config file (defaults to ./docbook.toml when present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Root element tag, overriding the config
    #[arg(long, value_name = "TAG")]
    root_element: Option<String>,

    /// Template file, overriding the config
    #[arg(long, value_name = "FILE")]
    template: Option<PathBuf>,

    /// Give titles of elements with an id an id of their own
    #[arg(long)]
    use_ids_in_titles: bool,

    /// Write XML without indentation
    #[arg(long)]
    compact: bool,

    /// Print diagnostics to stderr in the given format
    #[arg(long, value_enum, value_name = "FORMAT")]
    diagnostics: Option<DiagnosticsMode>,

    /// Directory for `<name>.xml` outputs; required with more than one input
    #[arg(short, long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Exit with failure when any warning was recorded
    #[arg(long)]
    deny_warnings: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum DiagnosticsMode {
    Json,
    Pretty,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    if cli.inputs.len() > 1 && cli.out_dir.is_none() {
        eprintln!("error: --out-dir is required when converting more than one input");
        return ExitCode::from(2);
    }

    if cli.out_dir.is_some() {
        if let Some(stem) = duplicate_stem(&cli.inputs) {
            eprintln!("error: more than one input would be written to {stem}.xml");
            return ExitCode::from(2);
        }
    }

    let (options, template) = match build_options(&cli) {
        Ok(built) => built,
        Err(message) => {
            eprintln!("error: {message}");
            return ExitCode::from(2);
        }
    };

    let (items, mut failed) = load_inputs(&cli.inputs);
    let outcomes = convert_batch(&items, &options, template.as_ref());

    let mut reports = Vec::new();
    let mut warned = false;
    for outcome in outcomes {
        match outcome.result {
            Ok(result) => {
                warned |= result
                    .diagnostics
                    .iter()
                    .any(|diag| diag.severity == DiagnosticSeverity::Warning);
                if let Err(message) = write_output(&cli, &outcome.name, &result.xml) {
                    eprintln!("error: {message}");
                    failed += 1;
                }
                reports.push((outcome.name, result.diagnostics));
            }
            Err(err) => {
                eprintln!("error: {}: {}", outcome.name, err);
                failed += 1;
            }
        }
    }

    if let Some(mode) = cli.diagnostics {
        emit_diagnostics(&reports, mode);
    }

    if failed > 0 || (cli.deny_warnings && warned) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn build_options(cli: &Cli) -> Result<(ConvertOptions, Option<Template>), String> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = match Config::load_from_path(&config_path).map_err(|err| err.to_string())? {
        Some(config) => config,
        None if cli.config.is_some() => {
            return Err(format!("config file {} not found", config_path.display()));
        }
        None => Config::default(),
    };

    let template_text = match &cli.template {
        Some(path) => Some(
            fs::read_to_string(path)
                .map_err(|err| format!("failed to read template {}: {}", path.display(), err))?,
        ),
        None => config.load_template().map_err(|err| err.to_string())?,
    };
    let template = template_text
        .as_deref()
        .map(Template::parse)
        .transpose()
        .map_err(|err| format!("invalid template: {err}"))?;
    let hierarchy = config
        .section_hierarchy()
        .map(|tags| SectionHierarchy::new(tags.iter().cloned()))
        .unwrap_or_default();

    let options = ConvertOptions {
        root_element: cli
            .root_element
            .clone()
            .unwrap_or(config.docbook_default_root_element),
        document_id: None,
        use_ids_in_titles: cli.use_ids_in_titles || config.docbook_use_xml_id_in_titles,
        hierarchy,
        template: None,
        emit: EmitOptions {
            indent: !cli.compact,
        },
    };
    Ok((options, template))
}

/// Reads and parses every input. Inputs that fail to load are reported and
/// counted; the rest still convert.
fn load_inputs(inputs: &[PathBuf]) -> (Vec<BatchItem>, usize) {
    let mut items = Vec::new();
    let mut failed = 0;

    if inputs.is_empty() {
        let mut buffer = String::new();
        if let Err(err) = io::stdin().read_to_string(&mut buffer) {
            eprintln!("error: failed to read stdin: {err}");
            return (items, 1);
        }
        match source_from_json(&buffer) {
            Ok(document) => items.push(BatchItem::new("<stdin>", document)),
            Err(err) => {
                eprintln!("error: <stdin>: {err}");
                failed += 1;
            }
        }
        return (items, failed);
    }

    for path in inputs {
        let name = path.display().to_string();
        let loaded = fs::read_to_string(path)
            .map_err(|err| format!("failed to read {name}: {err}"))
            .and_then(|text| source_from_json(&text).map_err(|err| format!("{name}: {err}")));
        match loaded {
            Ok(document) => {
                let mut item = BatchItem::new(name, document);
                item.document_id = document_id(path);
                items.push(item);
            }
            Err(message) => {
                eprintln!("error: {message}");
                failed += 1;
            }
        }
    }
    (items, failed)
}

fn document_id(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
}

fn output_stem(path: &Path) -> String {
    document_id(path).unwrap_or_else(|| "stdin".to_string())
}

/// First output name claimed by more than one input.
fn duplicate_stem(inputs: &[PathBuf]) -> Option<String> {
    let mut seen = HashSet::new();
    inputs
        .iter()
        .map(|path| output_stem(path))
        .find(|stem| !seen.insert(stem.clone()))
}

fn write_output(cli: &Cli, name: &str, xml: &str) -> Result<(), String> {
    let Some(out_dir) = &cli.out_dir else {
        print!("{xml}");
        return Ok(());
    };
    fs::create_dir_all(out_dir)
        .map_err(|err| format!("failed to create {}: {}", out_dir.display(), err))?;
    let stem = output_stem(Path::new(name));
    let target = out_dir.join(format!("{stem}.xml"));
    fs::write(&target, xml).map_err(|err| format!("failed to write {}: {}", target.display(), err))
}

fn emit_diagnostics(reports: &[(String, Vec<Diagnostic>)], mode: DiagnosticsMode) {
    match mode {
        DiagnosticsMode::Json => eprintln!("{}", diagnostics_to_json(reports)),
        DiagnosticsMode::Pretty => {
            for (name, diagnostics) in reports {
                for diagnostic in diagnostics {
                    eprintln!("{}", diagnostic_to_pretty(name, diagnostic));
                }
            }
        }
    }
}

fn diagnostic_to_pretty(name: &str, diagnostic: &Diagnostic) -> String {
    format!(
        "{}:{} {} {} {}",
        name,
        diagnostic.path,
        diagnostic.severity.label(),
        diagnostic.code,
        diagnostic.message
    )
}

fn diagnostics_to_json(reports: &[(String, Vec<Diagnostic>)]) -> String {
    let entries: Vec<serde_json::Value> = reports
        .iter()
        .flat_map(|(name, diagnostics)| {
            diagnostics.iter().map(move |diagnostic| {
                let mut value = serde_json::to_value(diagnostic).unwrap_or_default();
                if let serde_json::Value::Object(map) = &mut value {
                    map.insert("document".to_string(), serde_json::Value::from(name.as_str()));
                }
                value
            })
        })
        .collect();
    serde_json::to_string_pretty(&entries).unwrap_or_else(|_| "[]".to_string())
}
