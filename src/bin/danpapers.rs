// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use danpapers::{
    article::{split_tags, Draft},
    config::SiteConfig,
    path::{default_config_path, default_session_path},
    publish::{Failure, Publisher, Receipt},
    remote::{github::GitHub, memory::MemoryRemote, Credential, RemoteError, RemoteStore},
    render,
    session::{device::DeviceFlow, Session},
    store::ArticleStore,
};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{Confirm, Password};
use std::{
    fs,
    future::Future,
    io::ErrorKind,
    path::{Path, PathBuf},
    process::exit,
    time::Duration,
};
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "danpapers [options] <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to site configuration file.
    #[arg(short, long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    async fn run(self) -> Result<()> {
        let config_path = match self.config {
            Some(path) => path,
            None => default_config_path()?,
        };

        match self.command {
            Command::Init(opts) => run_init(&config_path, opts),
            Command::Preview(opts) => run_preview(opts),
            Command::Login(opts) => run_login(&Site::load(&config_path)?, opts).await,
            Command::Logout => run_logout(&Site::load(&config_path)?),
            Command::Whoami => run_whoami(&Site::load(&config_path)?).await,
            Command::List => run_list(&Site::load(&config_path)?).await,
            Command::Publish(opts) => run_publish(&Site::load(&config_path)?, opts).await,
            Command::Edit(opts) => run_edit(&Site::load(&config_path)?, opts).await,
            Command::Delete(opts) => run_delete(&Site::load(&config_path)?, opts).await,
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Write default site configuration.
    #[command(override_usage = "danpapers init [options]")]
    Init(InitOptions),

    /// Log in to GitHub through device flow or a personal access token.
    #[command(override_usage = "danpapers login [options]")]
    Login(LoginOptions),

    /// Discard stored session.
    Logout,

    /// Show who the stored session belongs to.
    Whoami,

    /// List published articles.
    List,

    /// Publish draft as a new article.
    #[command(override_usage = "danpapers publish [options] <draft>")]
    Publish(PublishOptions),

    /// Replace existing article with a draft.
    #[command(override_usage = "danpapers edit [options] <id> <draft>")]
    Edit(EditOptions),

    /// Delete existing article.
    #[command(override_usage = "danpapers delete [options] <id>")]
    Delete(DeleteOptions),

    /// Render draft body to the terminal.
    #[command(override_usage = "danpapers preview <draft>")]
    Preview(PreviewOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct InitOptions {
    /// Owner of the repository holding the source file.
    #[arg(short, long, value_name = "login")]
    pub owner: Option<String>,

    /// Repository holding the source file.
    #[arg(short, long, value_name = "name")]
    pub repository: Option<String>,

    /// Overwrite existing configuration.
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct LoginOptions {
    /// Use personal access token instead of device flow.
    #[arg(short, long, value_name = "token", num_args = 0..=1, default_missing_value = "")]
    pub token: Option<String>,
}

#[derive(Args, Clone, Debug)]
struct DraftOptions {
    /// Markdown draft with optional `+++` TOML front matter.
    #[arg(required = true, value_name = "draft")]
    pub draft: PathBuf,

    /// Title, overriding front matter.
    #[arg(short, long, value_name = "title")]
    pub title: Option<String>,

    /// Subtitle, overriding front matter.
    #[arg(short, long, value_name = "subtitle")]
    pub subtitle: Option<String>,

    /// Comma separated tags, overriding front matter.
    #[arg(long, value_name = "tags")]
    pub tags: Option<String>,

    /// Cover image URL, overriding front matter.
    #[arg(short, long, value_name = "url")]
    pub image: Option<String>,
}

impl DraftOptions {
    fn load(&self) -> Result<Draft> {
        let mut draft: Draft = read_draft(&self.draft)?;
        if let Some(title) = &self.title {
            draft.title = title.clone();
        }
        if let Some(subtitle) = &self.subtitle {
            draft.subtitle = subtitle.clone();
        }
        if let Some(tags) = &self.tags {
            draft.tags = split_tags(tags);
        }
        if let Some(image) = &self.image {
            draft.image = Some(image.clone());
        }

        Ok(draft)
    }
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct PublishOptions {
    #[command(flatten)]
    pub draft: DraftOptions,

    /// Print resulting source file instead of committing it.
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct EditOptions {
    /// Id of article to replace.
    #[arg(required = true, value_name = "id")]
    pub id: String,

    #[command(flatten)]
    pub draft: DraftOptions,

    /// Print resulting source file instead of committing it.
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct DeleteOptions {
    /// Id of article to delete.
    #[arg(required = true, value_name = "id")]
    pub id: String,

    /// Skip confirmation.
    #[arg(short, long)]
    pub yes: bool,

    /// Print resulting source file instead of committing it.
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct PreviewOptions {
    /// Markdown draft to render.
    #[arg(required = true, value_name = "draft")]
    pub draft: PathBuf,
}

/// Loaded site configuration and session.
struct Site {
    config: SiteConfig,
    session_path: PathBuf,
    session: Option<Session>,
}

impl Site {
    fn load(config_path: &Path) -> Result<Self> {
        let config = match fs::read_to_string(config_path) {
            Ok(data) => data
                .parse::<SiteConfig>()
                .with_context(|| format!("invalid configuration {config_path:?}"))?,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!("no configuration at {config_path:?}, using defaults");
                SiteConfig::default()
            }
            Err(error) => {
                return Err(error).with_context(|| format!("cannot read {config_path:?}"))
            }
        };

        let session_path = match config.auth.session_file() {
            Some(path) => path.to_path_buf(),
            None => default_session_path()?,
        };
        let session = Session::load(&session_path)?;

        Ok(Self {
            config,
            session_path,
            session,
        })
    }

    fn credential(&self) -> Option<Credential> {
        self.session.as_ref().map(Session::credential)
    }

    fn require_credential(&self) -> Result<Credential> {
        self.credential()
            .ok_or_else(|| anyhow!("not logged in, run `danpapers login` first"))
    }

    fn github(&self) -> Result<GitHub> {
        Ok(GitHub::new(&self.config.remote.api_url)?)
    }

    /// Copy the remote source file into memory for a dry run.
    async fn dry_run_remote(&self) -> Result<MemoryRemote> {
        let github = self.github()?;
        let credential = self.require_credential()?;
        let (identity, file) = with_spinner("fetching source file", async {
            let identity = github.identify(&credential).await?;
            let location = self.config.remote.location(&identity.login);
            let file = github.read(&credential, &location).await?;
            Ok::<_, RemoteError>((identity, file))
        })
        .await
        .inspect_err(|error| {
            if error.credential_rejected() {
                Session::revoke(&self.session_path);
            }
        })?;

        info!("dry run against {} at version {}", identity.login, file.version);
        Ok(MemoryRemote::new(file.content).with_identity(identity))
    }

    /// Discard session if the remote call failed on a rejected credential.
    fn settle<T>(&self, result: Result<T, Failure>) -> Result<T> {
        result.map_err(|failure| {
            if failure.error.credential_rejected() {
                Session::revoke(&self.session_path);
            }
            failure.into()
        })
    }
}

#[tokio::main]
async fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run().await {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

async fn run() -> Result<()> {
    Cli::parse().run().await
}

fn run_init(config_path: &Path, opts: InitOptions) -> Result<()> {
    if config_path.exists() && !opts.force {
        bail!("configuration {config_path:?} already exists, pass --force to overwrite");
    }

    let mut config = SiteConfig::default();
    config.remote.owner = opts.owner;
    if let Some(repository) = opts.repository {
        config.remote.repository = repository;
    }

    if let Some(parent) = config_path.parent() {
        mkdirp::mkdirp(parent)?;
    }
    fs::write(config_path, config.to_string())?;
    info!("wrote configuration to {}", config_path.display());

    Ok(())
}

async fn run_login(site: &Site, opts: LoginOptions) -> Result<()> {
    let credential = match (opts.token, &site.config.auth.client_id) {
        (Some(token), _) if !token.is_empty() => Credential::new(token),
        (None, Some(client_id)) => device_login(client_id, &site.config.auth.scope).await?,
        _ => Credential::new(
            Password::new("personal access token")
                .without_confirmation()
                .prompt()?,
        ),
    };

    let github = site.github()?;
    let identity = with_spinner("verifying credential", github.identify(&credential)).await?;
    Session::new(&identity.login, &credential).save(&site.session_path)?;
    info!("logged in as {} ({})", identity.login, identity.display_name);

    Ok(())
}

async fn device_login(client_id: &str, scope: &str) -> Result<Credential> {
    let flow = DeviceFlow::new(client_id)?;
    let code = flow.start(scope).await?;
    info!(
        "open {} and enter code {}",
        code.verification_uri, code.user_code
    );

    Ok(with_spinner("waiting for authorization", flow.await_token(&code)).await?)
}

fn run_logout(site: &Site) -> Result<()> {
    if !Session::discard(&site.session_path)? {
        info!("not logged in");
    }

    Ok(())
}

async fn run_whoami(site: &Site) -> Result<()> {
    let publisher = Publisher::new(site.github()?, &site.config)?;
    let credential = site.credential();
    let caller = with_spinner("verifying session", publisher.identify(credential.as_ref()))
        .await
        .inspect_err(|error| {
            if error.credential_rejected() {
                Session::revoke(&site.session_path);
            }
        })?;

    println!(
        "{} ({}){}",
        caller.login(),
        caller.display_name(),
        if caller.is_admin { " admin" } else { "" }
    );

    Ok(())
}

async fn run_list(site: &Site) -> Result<()> {
    let publisher = Publisher::new(site.github()?, &site.config)?;
    let credential = site.credential();
    let mut store = ArticleStore::new();
    let location = site.settle(
        with_spinner(
            "fetching articles",
            publisher.load(credential.as_ref(), &mut store),
        )
        .await,
    )?;

    info!("{} articles in {location}", store.len());
    for article in store.list() {
        println!(
            "{:<32} {:<14} {:<20} {}",
            article.id, article.date, article.author, article.title
        );
    }

    Ok(())
}

async fn run_publish(site: &Site, opts: PublishOptions) -> Result<()> {
    let draft = opts.draft.load()?;
    let mut store = ArticleStore::new();

    if opts.dry_run {
        let publisher = Publisher::new(site.dry_run_remote().await?, &site.config)?;
        let credential = site.require_credential()?;
        let receipt = site.settle(publisher.publish(Some(&credential), draft, &mut store).await)?;
        print!("{}", receipt.content);
        return Ok(());
    }

    let publisher = Publisher::new(site.github()?, &site.config)?;
    let credential = site.credential();
    let receipt = site.settle(publisher.publish(credential.as_ref(), draft, &mut store).await)?;
    report(&receipt);

    Ok(())
}

async fn run_edit(site: &Site, opts: EditOptions) -> Result<()> {
    let draft = opts.draft.load()?;
    let mut store = ArticleStore::new();

    if opts.dry_run {
        let publisher = Publisher::new(site.dry_run_remote().await?, &site.config)?;
        let credential = site.require_credential()?;
        let receipt = site.settle(
            publisher
                .update(Some(&credential), &opts.id, draft, &mut store)
                .await,
        )?;
        print!("{}", receipt.content);
        return Ok(());
    }

    let publisher = Publisher::new(site.github()?, &site.config)?;
    let credential = site.credential();
    let receipt = site.settle(
        publisher
            .update(credential.as_ref(), &opts.id, draft, &mut store)
            .await,
    )?;
    report(&receipt);

    Ok(())
}

async fn run_delete(site: &Site, opts: DeleteOptions) -> Result<()> {
    if !opts.yes
        && !Confirm::new(&format!("delete article {:?}?", opts.id))
            .with_default(false)
            .prompt()?
    {
        info!("nothing deleted");
        return Ok(());
    }

    let mut store = ArticleStore::new();
    if opts.dry_run {
        let publisher = Publisher::new(site.dry_run_remote().await?, &site.config)?;
        let credential = site.require_credential()?;
        let receipt =
            site.settle(publisher.delete(Some(&credential), &opts.id, &mut store).await)?;
        print!("{}", receipt.content);
        return Ok(());
    }

    let publisher = Publisher::new(site.github()?, &site.config)?;
    let credential = site.credential();
    let receipt = site.settle(
        publisher
            .delete(credential.as_ref(), &opts.id, &mut store)
            .await,
    )?;
    report(&receipt);

    Ok(())
}

fn run_preview(opts: PreviewOptions) -> Result<()> {
    let draft = read_draft(&opts.draft)?;
    if !draft.title.is_empty() {
        println!("{}\n", draft.title);
    }
    if !draft.subtitle.is_empty() {
        println!("{}\n", draft.subtitle);
    }

    for block in render::parse(&draft.content) {
        println!("{block}");
    }

    Ok(())
}

fn read_draft(path: &Path) -> Result<Draft> {
    let data =
        fs::read_to_string(path).with_context(|| format!("cannot read draft {path:?}"))?;
    Ok(data.parse::<Draft>()?)
}

fn report(receipt: &Receipt) {
    info!("SUCCESS: {} is live at version {}", receipt.id, receipt.version);
}

async fn with_spinner<T, E>(message: &str, task: impl Future<Output = Result<T, E>>) -> Result<T, E> {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));

    let result = task.await;
    bar.finish_and_clear();
    result
}
