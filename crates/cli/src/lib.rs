use anyhow::{bail, Context, Result};
use api_client::{ApiClient, ApiError, AuthSession, Credential};
use clap::{Args, Parser, Subcommand};
use doc_model::{AnnotationCollection, DocumentId, FontSize, ShareToken, SignerMetadata};
use session::{
    DocumentSession, FinalizeMode, Notice, Redirect, SessionError, SharedLinkSession, SharedOptions,
};
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;
use storage::{ClientConfig, SavedSession, Storage};
use tracing_subscriber::EnvFilter;

mod placement;

pub use placement::Placement;
use placement::place_all;

/// Filter directives for diagnostics on stderr, e.g. `SIGNDESK_LOG=debug`.
pub const LOG_ENV: &str = "SIGNDESK_LOG";

/// Slack on top of the HTTP finalize timeout before the session gives up.
const FINALIZE_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Parser)]
#[command(name = "signdesk-cli")]
#[command(about = "SignDesk CLI")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Sign in and remember the credential.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored credential.
    Logout,
    /// List your documents.
    Docs,
    /// Show the signature records of a document.
    Audit {
        #[arg(value_name = "DOC_ID")]
        document: String,
    },
    /// Email a signing link for a document.
    Share {
        #[arg(value_name = "DOC_ID")]
        document: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        link: String,
    },
    /// Delete one of your documents.
    Delete {
        #[arg(value_name = "DOC_ID")]
        document: String,
    },
    /// Print the signature records a placement produces, without contacting the server.
    Plan {
        #[arg(value_name = "DOC_ID")]
        document: String,
        #[command(flatten)]
        marks: MarkArgs,
        /// Attach guest signer metadata.
        #[arg(long)]
        guest: bool,
    },
    /// Place signatures on one of your documents, save them and optionally finalize.
    Sign {
        #[arg(value_name = "DOC_ID")]
        document: String,
        #[command(flatten)]
        marks: MarkArgs,
        /// Request the signed PDF once the signatures are saved.
        #[arg(long)]
        finalize: bool,
        /// Directory the signed PDF is written to.
        #[arg(long, default_value = ".")]
        output: PathBuf,
    },
    /// Sign a document shared with you through a link token.
    Guest {
        #[arg(value_name = "TOKEN")]
        token: String,
        #[command(flatten)]
        marks: MarkArgs,
        #[arg(long, default_value_t = FinalizeMode::PerAnnotation)]
        mode: FinalizeMode,
    },
    /// Inspect or change client settings.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Print the effective settings as JSON.
    Show,
    /// Point the client at another signing server.
    SetBaseUrl {
        #[arg(value_name = "URL")]
        url: String,
    },
}

#[derive(Debug, Args)]
struct MarkArgs {
    /// Signature mark, repeatable.
    #[arg(long = "place", value_name = "PAGE:X:Y[:TEXT]")]
    placements: Vec<Placement>,
    #[arg(long, value_parser = FontSize::parse_input)]
    font_size: Option<FontSize>,
    /// Document length, when the server does not report one.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pages: Option<u32>,
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Login { email, password } => App::load()?.login(email, &password),
        Commands::Logout => App::load()?.logout(),
        Commands::Docs => App::load()?.docs(),
        Commands::Audit { document } => App::load()?.audit(&document),
        Commands::Share { document, email, link } => App::load()?.share(&document, &email, &link),
        Commands::Delete { document } => App::load()?.delete(&document),
        Commands::Plan { document, marks, guest } => run_plan(&document, &marks, guest),
        Commands::Sign { document, marks, finalize, output } => {
            App::load()?.sign(&document, &marks, finalize, output)
        }
        Commands::Guest { token, marks, mode } => App::load()?.guest(token, &marks, mode),
        Commands::Config { command: ConfigCommand::Show } => App::load()?.show_config(),
        Commands::Config { command: ConfigCommand::SetBaseUrl { url } } => App::load()?.set_base_url(url),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_plan(document: &str, marks: &MarkArgs, guest: bool) -> Result<()> {
    if marks.placements.is_empty() {
        bail!("nothing to plan; pass at least one --place");
    }

    let mut collection = AnnotationCollection::new();
    for placement in &marks.placements {
        let id = collection.add(placement.page)?;
        collection.update(id, placement.update(marks.font_size))?;
    }
    if let Some(total) = marks.pages {
        collection.validate_pages(total)?;
    }

    let signer = guest.then(|| SignerMetadata::guest(ClientConfig::default().user_agent));
    let payloads = collection.to_persistable_payloads(&DocumentId::new(document), signer.as_ref());
    println!("{}", serde_json::to_string_pretty(&payloads)?);
    Ok(())
}

fn report(notices: Vec<Notice>) {
    for notice in notices {
        println!("{notice}");
    }
}

struct App {
    storage: Storage,
    config: ClientConfig,
    client: ApiClient,
}

impl App {
    fn load() -> Result<Self> {
        let storage = Storage::from_env().context("failed to locate data directory")?;
        let config = storage.load_config().context("failed to read client config")?;
        let client = ApiClient::new(config.to_api_config());
        Ok(Self { storage, config, client })
    }

    fn restore_login(&self) -> Result<AuthSession> {
        match self.storage.load_session().context("failed to read login")? {
            Some(saved) if saved.issued_by(&self.config) => Ok(AuthSession::restore(saved.credential)),
            Some(saved) => bail!(
                "not signed in to {} (login is for {}); run `signdesk-cli login`",
                self.config.base_url,
                saved.base_url
            ),
            None => bail!("not signed in; run `signdesk-cli login`"),
        }
    }

    /// Drop the stored login once the server stops honoring it.
    fn sync_login(&self, auth: &AuthSession) -> Result<()> {
        if !auth.is_active() && self.storage.clear_session()? {
            eprintln!("session expired; sign in again");
        }
        Ok(())
    }

    fn authorized<T>(&self, call: impl FnOnce(&ApiClient, &Credential) -> Result<T, ApiError>) -> Result<T> {
        let mut auth = self.restore_login()?;
        let result = auth.credential().and_then(|credential| call(&self.client, credential));
        let result = auth.observe(result);
        self.sync_login(&auth)?;
        Ok(result?)
    }

    fn login(&self, email: String, password: &str) -> Result<()> {
        let mut auth = AuthSession::new();
        let credential = auth
            .login(&self.client, &email, password)
            .context("login failed")?
            .clone();

        self.storage
            .save_session(&SavedSession { credential, email: email.clone(), base_url: self.config.base_url.clone() })
            .context("failed to store login")?;
        println!("signed in as {email}");
        Ok(())
    }

    fn logout(&self) -> Result<()> {
        if self.storage.clear_session()? {
            println!("signed out");
        } else {
            println!("not signed in");
        }
        Ok(())
    }

    fn docs(&self) -> Result<()> {
        let documents = self
            .authorized(|client, credential| client.list_documents(credential))
            .context("failed to list documents")?;

        for document in &documents {
            println!("{}\t{}\t{}", document.id, document.status, document.display_name());
        }
        Ok(())
    }

    fn audit(&self, document: &str) -> Result<()> {
        let id = DocumentId::new(document);
        let entries = self
            .authorized(|client, credential| client.audit_trail(credential, &id))
            .with_context(|| format!("failed to load audit trail for {document}"))?;

        for entry in &entries {
            println!(
                "{}\tpage {}\t{}\t{}\t{}",
                entry.id.as_deref().unwrap_or("-"),
                entry.page.map_or_else(|| "?".to_owned(), |page| page.to_string()),
                entry.status,
                entry.signed_by.as_deref().unwrap_or("-"),
                entry.timestamp.as_deref().unwrap_or("-"),
            );
        }
        Ok(())
    }

    fn share(&self, document: &str, email: &str, link: &str) -> Result<()> {
        let message = self
            .authorized(|client, credential| client.share_by_email(credential, email, link))
            .with_context(|| format!("failed to share {document}"))?;

        println!("{}", message.unwrap_or_else(|| format!("shared {document} with {email}")));
        Ok(())
    }

    fn delete(&self, document: &str) -> Result<()> {
        let id = DocumentId::new(document);
        self.authorized(|client, credential| client.delete_document(credential, &id))
            .with_context(|| format!("failed to delete {document}"))?;

        println!("deleted {document}");
        Ok(())
    }

    fn sign(&self, document: &str, marks: &MarkArgs, finalize: bool, output: PathBuf) -> Result<()> {
        let mut auth = self.restore_login()?;
        let credential = auth.credential()?.clone();
        let timeout = self.client.config().finalize_timeout + FINALIZE_GRACE;
        let mut session = DocumentSession::new(self.client.clone(), credential, DocumentId::new(document))
            .with_finalize_timeout(timeout);

        let result = sign_document(&mut session, marks, finalize);
        report(session.take_notices());
        if matches!(&result, Err(error) if error.is_unauthorized()) {
            auth.logout();
            self.sync_login(&auth)?;
        }
        result?;

        if let Some(artifact) = session.download() {
            let path = artifact
                .write_to(&output)
                .with_context(|| format!("failed to write signed PDF into {}", output.display()))?;
            println!("{}", path.display());
        }
        Ok(())
    }

    fn guest(&self, token: String, marks: &MarkArgs, mode: FinalizeMode) -> Result<()> {
        let options = SharedOptions { mode, user_agent: self.config.user_agent.clone(), ..SharedOptions::default() };
        let mut session = SharedLinkSession::new(self.client.clone(), ShareToken::new(token), options);

        let result = sign_shared(&mut session, marks);
        report(session.take_notices());
        let redirect = result?;
        tracing::debug!(to = redirect.to, after = ?redirect.after, "guest signing complete");
        Ok(())
    }

    fn show_config(&self) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(&self.config)?);
        Ok(())
    }

    fn set_base_url(&self, url: String) -> Result<()> {
        let url = url.trim().trim_end_matches('/').to_owned();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!("base URL must start with http:// or https://, got '{url}'");
        }

        let config = ClientConfig { base_url: url, ..self.config.clone() };
        self.storage.save_config(&config).context("failed to write client config")?;
        println!("base URL set to {}", config.base_url);
        Ok(())
    }
}

fn sign_document(
    session: &mut DocumentSession<ApiClient>,
    marks: &MarkArgs,
    finalize: bool,
) -> Result<(), SessionError> {
    session.load()?;
    place_all(session, &marks.placements, marks.pages, marks.font_size)?;

    if !marks.placements.is_empty() || !finalize {
        session.save_signatures()?;
    }
    if finalize {
        session.finalize()?;
    }
    Ok(())
}

fn sign_shared(
    session: &mut SharedLinkSession<ApiClient>,
    marks: &MarkArgs,
) -> Result<Redirect, SessionError> {
    session.open()?;
    place_all(session, &marks.placements, marks.pages, marks.font_size)?;
    session.finalize()
}
