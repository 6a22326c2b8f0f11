//! src/main.rs
//! Line-oriented Photo Drive explorer shell

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    signal,
};
use tracing::{info, warn};

use photo_core::{
    ExplorerController, ExplorerError, ExplorerResult, Logger,
    auth::{AuthSession, AuthState},
    cache::QueryCache,
    config::Config,
    controller::{CreateFolderModal, LoadOutcome, UploadImageModal},
    model::{MediaAsset, MediaFile},
    remote::{AuthClient, CloudinaryUploader, HttpClient, MediaUploader, ResourceClient},
    view::ExplorerSnapshot,
};

const HELP: &str = "\
commands:
  ls                      show the current folder
  open <folder name>      enter a child folder
  back                    go up one level
  search [text]           filter images by name (empty clears)
  mkdir <name>            create a folder here
  upload <path> [name]    upload an image file here
  refresh                 reload the current folder
  dismiss                 clear the error banner
  login <email> <pass>    log in
  signup <email> <pass>   create an account
  logout                  end the session
  stats                   log cache statistics
  quit                    exit";

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let config = Config::load().await.unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {e}");
        Config::default()
    });
    let _guard = Logger::init(&config.logging).context("Failed to initialize logging")?;
    info!("Starting Photo Drive shell");

    let shell = Shell::new(&config).context("Failed to initialize explorer")?;
    shell.run().await.context("Shell runtime error")?;

    info!("Photo Drive shell exited cleanly");
    Ok(())
}

/// Stand-in when no media host is configured; every upload fails cleanly.
struct UnconfiguredMedia;

#[async_trait]
impl MediaUploader for UnconfiguredMedia {
    async fn upload(&self, _file: &MediaFile) -> ExplorerResult<MediaAsset> {
        Err(ExplorerError::upload(
            "media host not configured (set media.cloud_name and media.upload_preset)",
        ))
    }
}

struct Shell {
    explorer: ExplorerController,
    auth: AuthSession,
}

impl Shell {
    fn new(config: &Config) -> Result<Self> {
        let http = Arc::new(HttpClient::new(&config.api)?);

        let media: Arc<dyn MediaUploader> = match CloudinaryUploader::new(&config.media) {
            Ok(uploader) => Arc::new(uploader),
            Err(e) => {
                warn!(error = %e, "Uploads disabled");
                Arc::new(UnconfiguredMedia)
            }
        };

        let client: Arc<dyn ResourceClient> = http.clone();
        let auth_client: Arc<dyn AuthClient> = http;
        let cache = Arc::new(QueryCache::new(Arc::clone(&client), config.cache.clone()));

        Ok(Self {
            explorer: ExplorerController::new(client, media, cache),
            auth: AuthSession::new(auth_client),
        })
    }

    async fn run(&self) -> Result<()> {
        if self.auth.restore().await.is_authenticated() {
            self.load_root().await;
        } else {
            println!("Not logged in. Use `login <email> <password>` or `signup`.");
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            prompt(&self.explorer.snapshot());

            let line = tokio::select! {
                line = lines.next_line() => line.context("Failed to read stdin")?,
                _ = signal::ctrl_c() => {
                    info!("Received Ctrl+C");
                    None
                }
            };

            let Some(line) = line else { break };
            if !self.dispatch(line.trim()).await {
                break;
            }
        }

        self.explorer.cache().log_stats();
        Ok(())
    }

    async fn load_root(&self) {
        match self.explorer.start().await {
            Ok(_) => render(&self.explorer.snapshot()),
            Err(e) => report(&e),
        }
    }

    /// Returns `false` when the shell should exit.
    async fn dispatch(&self, line: &str) -> bool {
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        let needs_session = !matches!(command, "" | "help" | "quit" | "exit" | "login" | "signup");
        if needs_session && !self.auth.is_authenticated() {
            println!("Log in first.");
            return true;
        }

        match command {
            "" => {}
            "help" => println!("{HELP}"),
            "quit" | "exit" => return false,
            "ls" => render(&self.explorer.snapshot()),
            "open" => self.open(rest).await,
            "back" => self.show_load(self.explorer.back().await),
            "refresh" => self.show_load(self.explorer.refresh().await),
            "search" => render(&self.explorer.search(rest)),
            "dismiss" => render(&self.explorer.dismiss_error()),
            "mkdir" => self.mkdir(rest).await,
            "upload" => self.upload(rest).await,
            "login" | "signup" => self.authenticate(command, rest).await,
            "logout" => {
                self.auth.logout().await;
                self.explorer.end_session();
                println!("Logged out.");
            }
            "stats" => {
                self.explorer.cache().log_stats();
                let stats = self.explorer.cache().stats();
                println!(
                    "hits {} / misses {} ({:.0}% hit rate), {} loads, {} invalidations",
                    stats.hits,
                    stats.misses,
                    stats.hit_rate() * 100.0,
                    stats.loads,
                    stats.invalidations
                );
            }
            other => println!("Unknown command `{other}`. Type `help`."),
        }
        true
    }

    fn show_load(&self, result: ExplorerResult<LoadOutcome>) {
        match result {
            Ok(LoadOutcome::Unchanged) => println!("Already at root."),
            Ok(_) => render(&self.explorer.snapshot()),
            Err(e) => report(&e),
        }
    }

    async fn open(&self, name: &str) {
        let snapshot = self.explorer.snapshot();
        let Some(folder) = snapshot.folders.iter().find(|f| f.name == name) else {
            println!("No folder named `{name}` here.");
            return;
        };

        let result = self.explorer.open(folder.id.clone(), &folder.name).await;
        self.show_load(result);
    }

    async fn mkdir(&self, name: &str) {
        let mut modal = CreateFolderModal::new();
        modal.name = name.to_string();
        if !modal.can_submit() {
            println!("usage: mkdir <name>");
            return;
        }

        match modal.submit(&self.explorer).await {
            Ok(folder) => {
                println!("Created `{}`.", folder.name);
                render(&self.explorer.snapshot());
            }
            Err(e) => report(&e),
        }
    }

    async fn upload(&self, args: &str) {
        let (path, name) = args.split_once(' ').unwrap_or((args, ""));
        if path.is_empty() {
            println!("usage: upload <path> [name]");
            return;
        }

        let path = Path::new(path);
        let file = match read_media(path).await {
            Ok(file) => file,
            Err(e) => {
                println!("Cannot read {}: {e:#}", path.display());
                return;
            }
        };

        let mut modal = UploadImageModal::new();
        modal.name = if name.trim().is_empty() {
            file.file_name.clone()
        } else {
            name.trim().to_string()
        };
        modal.file = Some(file);

        match modal.submit(&self.explorer).await {
            Ok(image) => {
                println!("Uploaded `{}`.", image.name);
                render(&self.explorer.snapshot());
            }
            Err(e) => report(&e),
        }
    }

    async fn authenticate(&self, command: &str, args: &str) {
        let Some((email, password)) = args.split_once(' ') else {
            println!("usage: {command} <email> <password>");
            return;
        };

        let result = if command == "signup" {
            self.auth.signup(email, password.trim()).await
        } else {
            self.auth.login(email, password.trim()).await
        };

        match result {
            Ok(()) => {
                if let AuthState::Authenticated { email: Some(email) } = self.auth.state() {
                    println!("Welcome, {email}.");
                }
                self.load_root().await;
            }
            Err(e) => report(&e),
        }
    }
}

async fn read_media(path: &Path) -> Result<MediaFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("path has no file name")?;

    let mut file = MediaFile::new(file_name, bytes);
    if let Some(mime) = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(image_mime)
    {
        file = file.with_content_type(mime);
    }
    Ok(file)
}

fn image_mime(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

fn prompt(snapshot: &ExplorerSnapshot) {
    use std::io::Write;

    print!("{}> ", snapshot.path());
    let _ = std::io::stdout().flush();
}

fn render(snapshot: &ExplorerSnapshot) {
    println!("[{}] {}", snapshot.status, snapshot.path());

    for folder in snapshot.folders.iter() {
        println!("  [dir] {}", folder.name);
    }

    if !snapshot.search.is_empty() {
        println!("  (images matching `{}`)", snapshot.search);
    }
    for image in snapshot.visible_images() {
        println!("  [img] {}  {}", image.name, image.url);
    }

    if snapshot.folders.is_empty() && snapshot.images.is_empty() {
        println!("  (empty)");
    }
}

fn report(error: &ExplorerError) {
    match error {
        ExplorerError::Registration { public_id, .. } => {
            println!("Error: {error}");
            println!("The file is stored at the media host as `{public_id}` but is not in your drive.");
        }
        _ if error.is_not_authenticated() => {
            println!("Session expired. Log in again.");
        }
        _ => println!("Error: {error}"),
    }
}
