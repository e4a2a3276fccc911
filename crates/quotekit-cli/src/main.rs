use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use quotekit_core::extract::{ExtractConfig, ExtractStats};
use quotekit_core::model::{PricedMaterial, ProjectSpec};
use quotekit_core::report::{self, ComponentRow, MaterialVolumes, Warning};
use quotekit_core::store::{MemoryStore, PriceStore};
use quotekit_pricing::views::{self, ExternalQuote, InternalQuote, ProjectSummary};
use quotekit_pricing::{PricingEngine, SkippedItem};
use serde::Serialize;
use std::path::{Path, PathBuf};

const ARCHIVE_PREFIX: &str = "components_";

#[derive(Debug, Parser)]
#[command(name = "quotekit")]
#[command(about = "STEP geometry extraction and per-company cost quoting.")]
struct Cli {
    /// Log filter used when RUST_LOG is not set.
    #[arg(long, global = true, env = "QUOTEKIT_LOG", default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Extract the component table from a STEP file.
    Extract {
        input: PathBuf,
        /// Also write the table as a timestamped CSV into this directory.
        #[arg(long, env = "QUOTEKIT_ARCHIVE_DIR")]
        archive_dir: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// List the materials and finishes a company has active prices for.
    Materials {
        #[arg(long, env = "QUOTEKIT_CATALOG")]
        catalog: PathBuf,
        #[arg(long)]
        company: i64,
    },
    /// Price a project specification for a company.
    Price {
        #[arg(long, env = "QUOTEKIT_CATALOG")]
        catalog: PathBuf,
        #[arg(long)]
        company: i64,
        #[arg(long)]
        project: PathBuf,
        #[arg(long, value_enum, default_value_t = QuoteView::Both)]
        view: QuoteView,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum QuoteView {
    Internal,
    External,
    Both,
}

/// Settings resolved from arguments and environment, handed to each command.
#[derive(Debug, Clone)]
struct CliConfig {
    extract: ExtractConfig,
    archive_dir: Option<PathBuf>,
    catalog: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct ExtractOutput<'a> {
    components: &'a [ComponentRow],
    volume_by_material: MaterialVolumes,
    stats: ExtractStats,
    warnings: &'a [Warning],
    archived_to: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct MaterialsOutput {
    company: String,
    materials: Vec<PricedMaterial>,
    finishes: Vec<FinishOutput>,
}

#[derive(Debug, Serialize)]
struct FinishOutput {
    name: String,
    multiplier: f64,
}

#[derive(Debug, Serialize)]
struct PriceOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    internal: Option<InternalQuote>,
    #[serde(skip_serializing_if = "Option::is_none")]
    external: Option<ExternalQuote>,
    summary: ProjectSummary,
    skipped: Vec<SkippedItem>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.cmd {
        Command::Extract {
            input,
            archive_dir,
            format,
        } => {
            let cfg = CliConfig {
                extract: ExtractConfig::default(),
                archive_dir,
                catalog: None,
            };
            extract(&cfg, &input, format)
        }
        Command::Materials { catalog, company } => {
            let cfg = CliConfig {
                extract: ExtractConfig::default(),
                archive_dir: None,
                catalog: Some(catalog),
            };
            materials(&cfg, company)
        }
        Command::Price {
            catalog,
            company,
            project,
            view,
        } => {
            let cfg = CliConfig {
                extract: ExtractConfig::default(),
                archive_dir: None,
                catalog: Some(catalog),
            };
            price(&cfg, company, &project, view)
        }
    }
}

fn init_logging(default_filter: &str) {
    let env = env_logger::Env::default().default_filter_or(default_filter);
    env_logger::Builder::from_env(env).init();
}

fn extract(cfg: &CliConfig, input: &Path, format: OutputFormat) -> Result<()> {
    ensure_input_file(input)?;

    let ext = input
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if !matches!(ext.as_str(), "step" | "stp") {
        bail!("unsupported input extension: .{ext} (expected .step or .stp)");
    }

    let extraction = quotekit_import_step::import_step(input, &cfg.extract)
        .with_context(|| format!("extract components: {input:?}"))?;
    let rows = report::component_table(&extraction.components);

    let archived_to = match &cfg.archive_dir {
        Some(dir) => Some(archive_table(dir, &rows)?),
        None => None,
    };

    match format {
        OutputFormat::Json => {
            let output = ExtractOutput {
                components: &rows,
                volume_by_material: report::volume_by_material(&rows),
                stats: extraction.stats,
                warnings: &extraction.warnings,
                archived_to,
            };
            let json = serde_json::to_string_pretty(&output).context("serialize components")?;
            println!("{json}");
        }
        OutputFormat::Table => {
            print_table(&rows);
            for warning in &extraction.warnings {
                eprintln!("warning [{}]: {}", warning.code, warning.message);
            }
            if let Some(path) = archived_to {
                eprintln!("archived to {path:?}");
            }
        }
    }

    Ok(())
}

fn archive_table(dir: &Path, rows: &[ComponentRow]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("create archive dir: {dir:?}"))?;
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let path = dir.join(report::archive_file_name(ARCHIVE_PREFIX, &stamp));
    let file =
        std::fs::File::create(&path).with_context(|| format!("create archive: {path:?}"))?;
    report::write_csv(rows, file).with_context(|| format!("write archive: {path:?}"))?;
    log::info!("archived {} rows to {path:?}", rows.len());
    Ok(path)
}

fn print_table(rows: &[ComponentRow]) {
    let width = rows
        .iter()
        .map(|r| r.component.chars().count())
        .max()
        .unwrap_or(0)
        .max("Component".len());
    println!(
        "{:<width$}  {:>16}  {:<14}  {:>8}  {:>8}  {:>8}",
        "Component", "Volume (in³)", "Material", "Vertices", "Faces", "Quantity"
    );
    for r in rows {
        println!(
            "{:<width$}  {:>16.7}  {:<14}  {:>8}  {:>8}  {:>8}",
            r.component, r.volume, r.material, r.vertices, r.faces, r.quantity
        );
    }
}

fn load_store(cfg: &CliConfig) -> Result<MemoryStore> {
    let Some(path) = cfg.catalog.as_deref() else {
        bail!("no price catalog given (use --catalog or QUOTEKIT_CATALOG)");
    };
    ensure_input_file(path)?;
    MemoryStore::from_json_path(path).with_context(|| format!("load catalog: {path:?}"))
}

fn materials(cfg: &CliConfig, company_id: i64) -> Result<()> {
    let store = load_store(cfg)?;
    let company = store.company(company_id)?;
    let output = MaterialsOutput {
        company: company.name,
        materials: store.available_materials(company_id)?,
        finishes: store
            .available_finishes(company_id)?
            .into_iter()
            .map(|(name, multiplier)| FinishOutput { name, multiplier })
            .collect(),
    };
    let json = serde_json::to_string_pretty(&output).context("serialize materials")?;
    println!("{json}");
    Ok(())
}

fn price(cfg: &CliConfig, company_id: i64, project: &Path, view: QuoteView) -> Result<()> {
    ensure_input_file(project)?;
    let text =
        std::fs::read_to_string(project).with_context(|| format!("read project: {project:?}"))?;
    let spec: ProjectSpec =
        serde_json::from_str(&text).with_context(|| format!("parse project: {project:?}"))?;

    let engine = PricingEngine::new(load_store(cfg)?);
    let outcome = engine
        .quote(company_id, &spec)
        .with_context(|| format!("price project {:?}", spec.project_name))?;

    for item in &outcome.skipped {
        eprintln!(
            "skipped row {} ({}): {:?}",
            item.index, item.component, item.reason
        );
    }

    let output = PriceOutput {
        internal: matches!(view, QuoteView::Internal | QuoteView::Both)
            .then(|| views::internal_view(&spec, &outcome)),
        external: matches!(view, QuoteView::External | QuoteView::Both)
            .then(|| views::external_view(&spec, &outcome)),
        summary: views::summarize(&spec, &outcome),
        skipped: outcome.skipped.clone(),
    };
    let json = serde_json::to_string_pretty(&output).context("serialize quote")?;
    println!("{json}");
    Ok(())
}

fn ensure_input_file(input: &Path) -> Result<()> {
    match std::fs::metadata(input) {
        Ok(meta) => {
            if meta.is_file() {
                Ok(())
            } else {
                bail!("input is not a file: {input:?}");
            }
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            bail!("input not found: {input:?} (cwd: {cwd:?}).");
        }
        Err(err) => Err(err).with_context(|| format!("stat input: {input:?}")),
    }
}
