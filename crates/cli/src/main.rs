use anyhow::{bail, Context};
use base64::{engine::general_purpose, Engine as _};
use clap::{Args, Parser, Subcommand};
use ocorrencia_core::capture::{
    CaptureError, Coordinates, LocationCapture, PhotoCapture, SignatureCapture,
};
use ocorrencia_core::field_path::FieldInput;
use ocorrencia_core::wizard::{Notice, SubmitOutcome};
use ocorrencia_core::{
    CoreConfig, FileBackend, OccurrenceId, OccurrenceRecord, RecordStore, Wizard, WizardHost,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DATA_DIR_VAR: &str = "OCORRENCIA_DATA_DIR";
const NAMESPACE_VAR: &str = "OCORRENCIA_NAMESPACE";

#[derive(Parser)]
#[command(name = "ocorrencia")]
#[command(about = "Registro local de ocorrências do Corpo de Bombeiros")]
struct Cli {
    /// Storage directory (overrides OCORRENCIA_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<String>,
    /// Storage namespace (overrides OCORRENCIA_NAMESPACE)
    #[arg(long, global = true)]
    namespace: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List saved occurrences, newest first
    List,
    /// Print one occurrence
    Show {
        /// Occurrence id
        id: String,
        /// Print YAML instead of JSON
        #[arg(long)]
        yaml: bool,
    },
    /// Record a new occurrence
    New(WizardArgs),
    /// Edit an existing occurrence
    Edit {
        /// Occurrence id
        id: String,
        #[command(flatten)]
        args: WizardArgs,
    },
}

#[derive(Args)]
struct WizardArgs {
    /// Field change as dotted path and value, e.g. endereco.bairro=Boa Viagem
    #[arg(long = "field", value_name = "PATH=VALUE", value_parser = parse_assignment)]
    fields: Vec<(String, String)>,
    /// GPS position as "lat,lon"
    #[arg(long)]
    gps: Option<Coordinates>,
    /// Photo reference (path or URL)
    #[arg(long)]
    photo: Option<String>,
    /// Image file holding the signature
    #[arg(long)]
    signature: Option<PathBuf>,
    /// Also submit the nature detail step
    #[arg(long, conflicts_with = "dry_run")]
    finalize: bool,
    /// Print the resulting draft and discard it without saving
    #[arg(long)]
    dry_run: bool,
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (path, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected PATH=VALUE, got '{raw}'"))?;
    if path.trim().is_empty() {
        return Err(format!("missing field path in '{raw}'"));
    }
    Ok((path.trim().to_string(), value.to_string()))
}

/// `true`/`false` become checkbox values; anything else is text.
fn field_input(value: &str) -> FieldInput {
    match value {
        "true" => FieldInput::Bool(true),
        "false" => FieldInput::Bool(false),
        other => FieldInput::Text(other.to_string()),
    }
}

/// Host for a non-interactive run: notices go to stderr and the log.
#[derive(Default)]
struct CliHost {
    returned_to_listing: bool,
    discarded: bool,
}

impl WizardHost for CliHost {
    fn notify(&mut self, notice: Notice) {
        tracing::debug!(?notice, "wizard notice");
        eprintln!("{notice}");
    }

    /// Only `--dry-run` cancels, and it always means discard.
    fn confirm_cancel(&mut self) -> bool {
        self.discarded = true;
        true
    }

    fn navigate_to_listing(&mut self) {
        self.returned_to_listing = true;
    }
}

/// Position given on the command line.
struct FixedLocation(Option<Coordinates>);

impl LocationCapture for FixedLocation {
    fn capture_location(&mut self) -> Result<Option<Coordinates>, CaptureError> {
        Ok(self.0.take())
    }
}

struct PhotoReference(Option<String>);

impl PhotoCapture for PhotoReference {
    fn capture_photo(&mut self) -> Result<Option<String>, CaptureError> {
        Ok(self.0.take().filter(|r| !r.trim().is_empty()))
    }
}

/// Reads a signature image from disk and encodes it as a data URL.
struct SignatureFile(PathBuf);

impl SignatureCapture for SignatureFile {
    fn capture_signature(&mut self) -> Result<Option<String>, CaptureError> {
        let bytes = std::fs::read(&self.0).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => CaptureError::PermissionDenied,
            _ => CaptureError::Failed(format!("{}: {e}", self.0.display())),
        })?;
        signature_data_url(&bytes).map(Some)
    }
}

fn signature_data_url(bytes: &[u8]) -> Result<String, CaptureError> {
    let kind = infer::get(bytes)
        .filter(|k| k.matcher_type() == infer::MatcherType::Image)
        .ok_or_else(|| CaptureError::Failed("signature file is not an image".into()))?;
    Ok(format!(
        "data:{};base64,{}",
        kind.mime_type(),
        general_purpose::STANDARD.encode(bytes)
    ))
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ocorrencia_core=info".parse()?)
                .add_directive("ocorrencia=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cfg = CoreConfig::from_values(
        cli.data_dir.or_else(|| std::env::var(DATA_DIR_VAR).ok()),
        cli.namespace.or_else(|| std::env::var(NAMESPACE_VAR).ok()),
    )?;
    tracing::debug!(
        data_dir = %cfg.data_dir().display(),
        key = %cfg.records_key(),
        "configuration resolved"
    );
    let store = Arc::new(RecordStore::open(&cfg));

    match cli.command {
        Some(Commands::List) => {
            let records = store.list_newest_first()?;
            if records.is_empty() {
                println!("Nenhuma ocorrência registrada.");
            } else {
                for record in &records {
                    println!("{}", listing_line(record));
                }
            }
        }
        Some(Commands::Show { id, yaml }) => {
            let id = OccurrenceId::parse(&id)?;
            let Some(record) = store.find_by_id(&id)? else {
                bail!("occurrence {id} not found");
            };
            if yaml {
                print!("{}", serde_yaml::to_string(&record)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&record)?);
            }
        }
        Some(Commands::New(args)) => {
            let mut wizard = Wizard::create(Arc::clone(&store), CliHost::default());
            run_wizard(&mut wizard, args)?;
        }
        Some(Commands::Edit { id, args }) => {
            let id = OccurrenceId::parse(&id)?;
            let mut wizard = Wizard::edit(Arc::clone(&store), CliHost::default(), &id);
            run_wizard(&mut wizard, args)?;
        }
        None => {
            println!("Use 'ocorrencia --help' for commands");
        }
    }

    Ok(())
}

fn run_wizard(wizard: &mut Wizard<FileBackend, CliHost>, args: WizardArgs) -> anyhow::Result<()> {
    for (path, value) in &args.fields {
        wizard
            .set_field(path, field_input(value))
            .with_context(|| format!("--field {path}={value}"))?;
    }
    if let Some(coords) = args.gps {
        wizard.capture_location(&mut FixedLocation(Some(coords)))?;
    }
    if let Some(reference) = args.photo {
        wizard.capture_photo(&mut PhotoReference(Some(reference)))?;
    }
    if let Some(path) = args.signature {
        wizard.capture_signature(&mut SignatureFile(path))?;
    }

    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(wizard.draft())?);
        let outcome = wizard.cancel()?;
        tracing::info!(?outcome, "dry run, nothing saved");
        return Ok(());
    }

    match wizard.submit()? {
        SubmitOutcome::Invalid(err) => bail!("{err}"),
        SubmitOutcome::SaveFailed => bail!("occurrence was not saved"),
        SubmitOutcome::SavedDraft => {
            report_saved(wizard, "Rascunho salvo");
            if args.finalize {
                println!("Nenhuma natureza marcada; não há etapa de detalhes.");
            }
        }
        SubmitOutcome::AdvancedToNature(nature) => {
            report_saved(wizard, "Etapa básica salva");
            if !args.finalize {
                println!(
                    "Detalhes de {} pendentes; use 'edit --finalize' para concluir.",
                    nature.display_label()
                );
                return Ok(());
            }
            match wizard.submit()? {
                SubmitOutcome::Finalized(id) => {
                    report_saved(wizard, "Ocorrência finalizada");
                    tracing::debug!(%id, returned = wizard.host().returned_to_listing, "wizard closed");
                }
                SubmitOutcome::SaveFailed => bail!("occurrence details were not saved"),
                other => bail!("unexpected outcome on the detail step: {other:?}"),
            }
        }
        SubmitOutcome::Finalized(id) => bail!("occurrence {id} finalized before its basic step"),
    }

    Ok(())
}

fn report_saved(wizard: &Wizard<FileBackend, CliHost>, heading: &str) {
    if let Some(record) = wizard.last_saved() {
        println!("{heading}: {}", listing_line(record));
    }
}

fn listing_line(record: &OccurrenceRecord) -> String {
    let occurrence = &record.occurrence;
    format!(
        "{}  {}  {}  {}  {}  {}  {}",
        occurrence.id,
        occurrence.num_aviso,
        record.status,
        record.tipo,
        occurrence.prioridade,
        occurrence.endereco.bairro,
        record.data.format("%d/%m/%Y %H:%M")
    )
}
