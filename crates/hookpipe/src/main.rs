use anyhow::{Context, Result};
use base64::Engine as _;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use hookpipe::core::{
    deliver, DeliveryReport, FailurePolicy, IdentityPolicy, MessagePayload, WebhookBackend,
    WebhookIdentity, WebhookInfo, WebhookUpdate, DEFAULT_API_BASE, MESSAGE_CHAR_LIMIT,
};
use hookpipe::input;
use hookpipe::local::{ClientConfig, HttpWebhookClient};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "hookpipe")]
#[command(
    about = "Pipe standard input into a Discord webhook, split into message-sized chunks",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// With no subcommand, behaves like `send`.
    #[command(flatten)]
    send: SendCmd,

    /// Log line format on stderr: text|json
    #[arg(
        long,
        env = "HOOKPIPE_LOG_FORMAT",
        default_value = "text",
        global = true
    )]
    log_format: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read stdin and post it in chunks (the default).
    Send(SendCmd),
    /// Post a single file attachment.
    Upload(UploadCmd),
    /// Print the webhook object (json; token omitted).
    Info(InfoCmd),
    /// Change the webhook's default name and/or avatar.
    Update(UpdateCmd),
    /// Delete the webhook. It stops accepting messages immediately.
    Delete(DeleteCmd),
    /// Print version info.
    Version(VersionCmd),
}

/// Where to deliver. An explicit `--id`/`--token` pair wins over the positional form.
#[derive(clap::Args, Debug)]
struct WebhookArgs {
    /// Webhook URL (`https://discord.com/api/webhooks/<id>/<token>`) or `<id>/<token>`.
    #[arg(env = "HOOKPIPE_WEBHOOK", hide_env_values = true)]
    webhook: Option<String>,
    /// Webhook id; requires --token.
    #[arg(long, env = "HOOKPIPE_WEBHOOK_ID")]
    id: Option<String>,
    /// Webhook token; requires --id.
    #[arg(long, env = "HOOKPIPE_WEBHOOK_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /// Accept an identity when either the id or the token looks valid.
    #[arg(long)]
    lenient_identity: bool,
    /// Per-request timeout in milliseconds (0 disables it).
    #[arg(long, env = "HOOKPIPE_TIMEOUT_MS", default_value_t = 30_000)]
    timeout_ms: u64,
    #[arg(long, env = "HOOKPIPE_API_BASE", default_value = DEFAULT_API_BASE, hide = true)]
    api_base: String,
}

#[derive(clap::Args, Debug)]
struct SendCmd {
    #[command(flatten)]
    webhook: WebhookArgs,
    /// Max characters per message.
    #[arg(
        long,
        default_value_t = MESSAGE_CHAR_LIMIT as u64,
        value_parser = clap::value_parser!(u64).range(1..=MESSAGE_CHAR_LIMIT as u64)
    )]
    limit: u64,
    /// Display name override for every message.
    #[arg(long)]
    username: Option<String>,
    /// Avatar URL override for every message.
    #[arg(long)]
    avatar_url: Option<String>,
    /// Ask clients to read the messages aloud.
    #[arg(long)]
    tts: bool,
    /// Stop at the first chunk that fails instead of attempting the rest.
    #[arg(long)]
    fail_fast: bool,
    /// Summary format: text|json
    #[arg(long = "output", alias = "format", default_value = "text")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct UploadCmd {
    #[command(flatten)]
    webhook: WebhookArgs,
    /// File to attach.
    #[arg(long)]
    file: PathBuf,
    /// Attachment name shown in the channel (default: the file's own name).
    #[arg(long)]
    filename: Option<String>,
    /// Message text to post alongside the file.
    #[arg(long)]
    content: Option<String>,
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    avatar_url: Option<String>,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "text")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct InfoCmd {
    #[command(flatten)]
    webhook: WebhookArgs,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct UpdateCmd {
    #[command(flatten)]
    webhook: WebhookArgs,
    /// New default display name.
    #[arg(long)]
    name: Option<String>,
    /// Image file (png, jpg, gif) to use as the new avatar.
    #[arg(long)]
    avatar: Option<PathBuf>,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct DeleteCmd {
    #[command(flatten)]
    webhook: WebhookArgs,
    /// Confirm deletion.
    #[arg(long)]
    yes: bool,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

/// Print a clap-style usage error and exit with status 2.
fn usage_error(kind: ErrorKind, msg: impl std::fmt::Display) -> ! {
    Cli::command().error(kind, msg).exit()
}

fn nonempty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl WebhookArgs {
    fn identity(&self) -> hookpipe::core::Result<WebhookIdentity> {
        let policy = if self.lenient_identity {
            IdentityPolicy::Lenient
        } else {
            IdentityPolicy::Strict
        };
        match (nonempty(&self.id), nonempty(&self.token)) {
            (Some(id), Some(token)) => WebhookIdentity::from_id_and_token_with(id, token, policy),
            (Some(_), None) | (None, Some(_)) => Err(hookpipe::core::Error::MalformedIdentity(
                "--id and --token must be given together".to_string(),
            )),
            (None, None) => match nonempty(&self.webhook) {
                Some(raw) => WebhookIdentity::resolve(raw, policy),
                None => Err(hookpipe::core::Error::MalformedIdentity(
                    "no webhook given; pass a URL, set HOOKPIPE_WEBHOOK, or use --id/--token"
                        .to_string(),
                )),
            },
        }
    }

    /// Resolve the identity and build the HTTP client, exiting with a usage error on a
    /// bad identity.
    fn client(&self) -> Result<HttpWebhookClient> {
        let identity = self
            .identity()
            .unwrap_or_else(|e| usage_error(ErrorKind::InvalidValue, e));
        let config = ClientConfig {
            api_base: self.api_base.trim().to_string(),
            timeout: (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms)),
            ..ClientConfig::default()
        };
        tracing::debug!(webhook_id = identity.id(), api_base = %config.api_base, "resolved webhook");
        Ok(HttpWebhookClient::new(identity, &config)?)
    }
}

fn wants_text(output: &str) -> bool {
    output.eq_ignore_ascii_case("text")
}

fn report_json(report: &DeliveryReport) -> serde_json::Value {
    let errors: Vec<serde_json::Value> = report
        .errors()
        .map(|(chunk, e)| {
            let mut v = serde_json::json!({
                "chunk": chunk,
                "error": e.to_string(),
            });
            if let Some(svc) = e.as_service() {
                v["http_status"] = serde_json::json!(svc.http_status);
                v["code"] = serde_json::json!(svc.code);
            }
            v
        })
        .collect();
    serde_json::json!({
        "schema_version": 1,
        "kind": "send",
        "ok": report.is_success(),
        "chunks": report.total,
        "sent": report.sent(),
        "failed": report.failed(),
        "skipped": report.skipped(),
        "errors": errors,
    })
}

async fn run_send(args: SendCmd) -> Result<()> {
    let client = args.webhook.client()?;
    let text = input::read_stdin()
        .await
        .unwrap_or_else(|e| usage_error(ErrorKind::Io, e));

    let template = MessagePayload {
        username: nonempty(&args.username).map(str::to_string),
        avatar_url: nonempty(&args.avatar_url).map(str::to_string),
        tts: args.tts,
        ..MessagePayload::default()
    };
    let policy = if args.fail_fast {
        FailurePolicy::Abort
    } else {
        FailurePolicy::Continue
    };
    let report = deliver(&client, &text, &template, args.limit as usize, policy).await;

    for (chunk, e) in report.errors() {
        tracing::warn!(chunk, error = %e, "chunk delivery failed");
    }
    tracing::info!(
        chunks = report.total,
        sent = report.sent(),
        failed = report.failed(),
        skipped = report.skipped(),
        "delivery finished"
    );

    if wants_text(&args.output) {
        println!("sent {}/{} chunks", report.sent(), report.total);
    } else {
        println!("{}", report_json(&report));
    }

    if !report.is_success() {
        anyhow::bail!(
            "{} of {} chunks were not delivered",
            report.total - report.sent(),
            report.total
        );
    }
    Ok(())
}

async fn run_upload(args: UploadCmd) -> Result<()> {
    let client = args.webhook.client()?;
    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("read {}", args.file.display()))?;
    let filename = match nonempty(&args.filename) {
        Some(n) => n.to_string(),
        None => args
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string()),
    };
    let payload = MessagePayload {
        content: args.content.unwrap_or_default(),
        username: nonempty(&args.username).map(str::to_string),
        avatar_url: nonempty(&args.avatar_url).map(str::to_string),
        ..MessagePayload::default()
    };
    client.send_file(&bytes, &filename, &payload).await?;

    if wants_text(&args.output) {
        println!("uploaded {filename} ({} bytes)", bytes.len());
    } else {
        let v = serde_json::json!({
            "schema_version": 1,
            "kind": "upload",
            "ok": true,
            "filename": filename,
            "bytes": bytes.len(),
        });
        println!("{v}");
    }
    Ok(())
}

fn print_info(mut info: WebhookInfo, output: &str) -> Result<()> {
    info.token = None;
    if wants_text(output) {
        println!(
            "{} ({}) channel={}",
            info.name.as_deref().unwrap_or("-"),
            info.id,
            info.channel_id.as_deref().unwrap_or("-")
        );
    } else {
        println!("{}", serde_json::to_string(&info)?);
    }
    Ok(())
}

fn avatar_data_uri(path: &Path, bytes: &[u8]) -> Result<String> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        other => anyhow::bail!("unsupported avatar type {other:?}; use png, jpg or gif"),
    };
    let data = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(format!("data:{mime};base64,{data}"))
}

async fn run_update(args: UpdateCmd) -> Result<()> {
    let client = args.webhook.client()?;
    let avatar = match &args.avatar {
        Some(path) => {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("read {}", path.display()))?;
            Some(avatar_data_uri(path, &bytes)?)
        }
        None => None,
    };
    let update = WebhookUpdate {
        name: nonempty(&args.name).map(str::to_string),
        avatar,
    };
    if update.is_empty() {
        usage_error(
            ErrorKind::MissingRequiredArgument,
            "nothing to update; pass --name and/or --avatar",
        );
    }
    let info = client.update(&update).await?;
    print_info(info, &args.output)
}

async fn run_delete(args: DeleteCmd) -> Result<()> {
    if !args.yes {
        usage_error(
            ErrorKind::MissingRequiredArgument,
            "deleting a webhook cannot be undone; pass --yes to confirm",
        );
    }
    let client = args.webhook.client()?;
    client.remove().await?;
    tracing::info!(webhook_id = client.identity().id(), "webhook deleted");
    Ok(())
}

fn init_tracing(format: &str) {
    let directives = ["HOOKPIPE_LOG", "RUST_LOG"]
        .into_iter()
        .find_map(|k| std::env::var(k).ok().filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| "warn".to_string());
    let filter = tracing_subscriber::EnvFilter::try_new(&directives)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let _ = if format.eq_ignore_ascii_case("json") {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

/// Set variables from `HOOKPIPE_ENV_FILE` (`KEY=VALUE` lines) that the process
/// environment does not already define. Values are never logged.
fn load_env_file() {
    let Some(p) = std::env::var("HOOKPIPE_ENV_FILE")
        .ok()
        .filter(|v| !v.trim().is_empty())
    else {
        return;
    };
    let Ok(txt) = std::fs::read_to_string(p.trim()) else {
        return;
    };
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        if k.is_empty() {
            continue;
        }
        // Explicit process env wins.
        if std::env::var_os(k).is_none() {
            std::env::set_var(k, v.trim());
        }
    }
}

// The env file is applied before the runtime spawns worker threads.
fn main() -> Result<()> {
    load_env_file();
    let cli = Cli::parse();
    init_tracing(&cli.log_format);
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start tokio runtime")?
        .block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        None => run_send(cli.send).await,
        Some(Commands::Send(args)) => run_send(args).await,
        Some(Commands::Upload(args)) => run_upload(args).await,
        Some(Commands::Info(args)) => {
            let client = args.webhook.client()?;
            let info = client.fetch().await?;
            print_info(info, &args.output)
        }
        Some(Commands::Update(args)) => run_update(args).await,
        Some(Commands::Delete(args)) => run_delete(args).await,
        Some(Commands::Version(args)) => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "version",
                "ok": true,
                "name": "hookpipe",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("hookpipe {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{}", v),
            }
            Ok(())
        }
    }
}
