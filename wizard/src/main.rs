// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Transaction Wizard
//!
//! Entry point for the `txn-wizard` binary. Parses CLI arguments, loads the
//! composer configuration, mounts the session stored under `--store`, and
//! applies one subcommand to it. Results go to stdout as JSON; logs go to
//! stderr.
//!
//! A typical session:
//!
//! ```text
//! txn-wizard new --kind pay
//! txn-wizard set snd=... rcv=... amt=1.5 fee=0.001 fv=100 lv=1100
//! txn-wizard submit
//! txn-wizard sign --key <hex>
//! txn-wizard send
//! ```

mod cli;
mod logging;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::collections::BTreeMap;

use txn_composer::controller::SignOutcome;
use txn_composer::validation::{FieldError, ValidationReport};
use txn_composer::{
    CanonicalEncoder, ComposerConfig, ComposerError, DraftController, FieldName, FieldValue,
    LocalKeyWallet, NetworkParams, PersistenceBridge, Preset, SledStore, StaticNetworkParams,
    TxnKind, WalletProvider, WizardStep,
};

use cli::{Commands, WizardCli};
use logging::LogFormat;

type Session = DraftController<SledStore, CanonicalEncoder>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = WizardCli::parse();
    logging::init_logging(&cli.log_level, LogFormat::from_str_lossy(&cli.log_format));

    // Listing presets needs no session.
    if let Commands::Presets = cli.command {
        return print_json(&preset_listing());
    }

    let config = load_config(&cli)?;
    let mut session = open_session(&cli, config)?;

    match cli.command {
        Commands::New(args) => {
            session.reset();
            if let Some(kind) = args.kind {
                session.set_kind(parse_kind(&kind)?)?;
            }
            print_json(&StatusView::of(&session))
        }
        Commands::Set(args) => set_fields(&mut session, args),
        Commands::Show => print_json(session.values()),
        Commands::Validate => print_json(&ValidateView {
            valid: session.report().is_valid(),
            report: session.report(),
        }),
        Commands::Submit => submit(&mut session),
        Commands::Sign(args) => sign(&mut session, args).await,
        Commands::Status => print_json(&StatusView::of(&session)),
        Commands::Send => send(&mut session),
        Commands::Reset => {
            session.reset();
            print_json(&StatusView::of(&session))
        }
        Commands::Presets => print_json(&preset_listing()),
    }?;

    if let Some(reason) = session.persistence_error() {
        tracing::warn!(%reason, "session state was not fully persisted");
    }
    Ok(())
}

/// Builds the composer configuration: defaults, then the config file, then
/// command-line overrides.
fn load_config(cli: &WizardCli) -> Result<ComposerConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            serde_json::from_str::<ComposerConfig>(&raw)
                .with_context(|| format!("invalid config file {}", path.display()))?
        }
        None => ComposerConfig::default(),
    };
    if let Some(min_fee) = cli.min_fee {
        config.min_fee = min_fee;
    }
    if let Some(params) = cli_network(cli) {
        config.network = params;
    }
    Ok(config)
}

fn cli_network(cli: &WizardCli) -> Option<NetworkParams> {
    match (&cli.genesis_id, &cli.genesis_hash) {
        (Some(id), Some(hash)) => Some(NetworkParams::new(id.clone(), hash.clone())),
        _ => None,
    }
}

/// Opens the sled store and mounts the session on it.
fn open_session(cli: &WizardCli, config: ComposerConfig) -> Result<Session> {
    std::fs::create_dir_all(&cli.store)
        .with_context(|| format!("failed to create store directory {}", cli.store.display()))?;
    let store = SledStore::open(&cli.store)
        .with_context(|| format!("failed to open session store at {}", cli.store.display()))?;
    tracing::debug!(path = %cli.store.display(), "session store opened");

    let mut session = DraftController::mount(
        PersistenceBridge::new(store),
        CanonicalEncoder,
        config,
        cli.preset.as_deref(),
    );
    // An explicit network on the command line wins over the one the draft
    // was saved for.
    if let Some(params) = cli_network(cli) {
        session.set_network_params(params);
    }
    Ok(session)
}

fn parse_kind(raw: &str) -> Result<TxnKind> {
    raw.parse::<TxnKind>()
        .with_context(|| format!("expected one of pay, axfer, acfg, afrz, keyreg, appl; got {raw:?}"))
}

fn set_fields(session: &mut Session, args: cli::SetArgs) -> Result<()> {
    if let Some(kind) = args.kind {
        session.set_kind(parse_kind(&kind)?)?;
    }

    let mut edited = Vec::with_capacity(args.assignments.len());
    for arg in &args.assignments {
        let (key, raw) = cli::split_assignment(arg)
            .with_context(|| format!("expected FIELD=VALUE, got {arg:?}"))?;
        let field: FieldName = key
            .parse()
            .with_context(|| format!("unknown field {key:?}"))?;
        if !field.belongs_to(session.values().kind()) {
            bail!(
                "field {field} does not belong to a {} draft",
                session.values().kind()
            );
        }
        session.handle_change(field, FieldValue::from_input(field, raw))?;
        session.handle_blur(field);
        edited.push(field);
    }

    let errors = session.visible_field_errors();
    let shown: BTreeMap<FieldName, &FieldError> = edited
        .iter()
        .filter_map(|f| errors.get(f).map(|e| (*f, e)))
        .collect();
    print_json(&SetView {
        step: session.step(),
        field_errors: shown,
    })
}

fn submit(session: &mut Session) -> Result<()> {
    match session.submit() {
        Ok(()) => print_json(&StatusView::of(session)),
        Err(ComposerError::ValidationFailed(report)) => {
            print_json(&ValidateView {
                valid: false,
                report: &report,
            })?;
            bail!(
                "draft is not valid: {} field error(s), {} broken rule(s)",
                report.field_errors.len(),
                report.broken_rules().count()
            )
        }
        Err(other) => Err(other.into()),
    }
}

async fn sign(session: &mut Session, args: cli::SignArgs) -> Result<()> {
    let sender = match session.values().get(FieldName::Sender) {
        FieldValue::Text(s) if !s.is_empty() => s,
        _ => bail!("the draft has no sender to sign for"),
    };
    let wallet = match args.key {
        Some(secret) => LocalKeyWallet::from_hex(&secret, sender)?,
        None => {
            tracing::warn!("no signing key given; using a throwaway key");
            LocalKeyWallet::generate(sender)
        }
    };
    wallet.connect().await?;

    let source = StaticNetworkParams::new(session.network_params().clone());
    let outcome = session.sign_with(&source, &wallet).await;
    wallet.disconnect().await?;

    match outcome? {
        SignOutcome::Accepted(txn_id) => print_json(&SignView {
            txn_id: txn_id.to_string(),
            public_key: hex::encode(wallet.verifying_key().as_bytes()),
        }),
        SignOutcome::Discarded(reason) => {
            bail!("signature discarded: draft changed while signing ({reason:?})")
        }
    }
}

fn send(session: &mut Session) -> Result<()> {
    let payload = session.signature().map(|record| hex::encode(&record.payload));
    let txn_id = session.mark_sent()?;
    tracing::info!(%txn_id, "transaction handed off");
    print_json(&SendView {
        txn_id: txn_id.to_string(),
        signed: payload.unwrap_or_default(),
    })
}

fn preset_listing() -> Vec<PresetView> {
    Preset::ALL
        .iter()
        .map(|preset| PresetView {
            token: preset.as_str(),
            kind: preset.kind(),
            required: preset.required_fields(),
        })
        .collect()
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{out}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Output documents
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct StatusView<'a> {
    step: WizardStep,
    kind: TxnKind,
    preset: Option<Preset>,
    network: &'a NetworkParams,
    valid: bool,
    can_sign: bool,
    can_send: bool,
    txn_id: Option<String>,
}

impl<'a> StatusView<'a> {
    fn of(session: &'a Session) -> Self {
        Self {
            step: session.step(),
            kind: session.values().kind(),
            preset: session.preset(),
            network: session.network_params(),
            valid: session.report().is_valid(),
            can_sign: session.can_sign(),
            can_send: session.can_send(),
            txn_id: session.signature().map(|r| r.txn_id.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ValidateView<'a> {
    valid: bool,
    #[serde(flatten)]
    report: &'a ValidationReport,
}

#[derive(Serialize)]
struct SetView<'a> {
    step: WizardStep,
    field_errors: BTreeMap<FieldName, &'a FieldError>,
}

#[derive(Serialize)]
struct SignView {
    txn_id: String,
    public_key: String,
}

#[derive(Serialize)]
struct SendView {
    txn_id: String,
    signed: String,
}

#[derive(Serialize)]
struct PresetView {
    token: &'static str,
    kind: TxnKind,
    required: &'static [FieldName],
}
