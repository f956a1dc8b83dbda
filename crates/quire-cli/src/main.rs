use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use kdl::KdlDocument;
use miette::{IntoDiagnostic, Result};
use quire_app::auth::{self, AuthError};
use quire_app::guards::{Route, redirect_for};
use quire_app::views::{BlogCard, BlogView, Explore, MyBlogs, ViewState};
use quire_app::{
    AuthoringError, AuthoringSession, CoverImage, LoginForm, Notifier, RegisterForm, SessionStore,
};
use quire_common::telemetry::{self, TelemetryConfig};
use quire_common::{Config, FileSessionStore, HttpClient};

#[derive(Parser)]
#[command(version, about = "Quire - write and manage blog posts from the terminal", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Base URL of the blog server
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Path to session store file
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Path to KDL config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at the default level instead of warnings only
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Prompted for when absent
        #[arg(long, env = "QUIRE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Log in and keep the session
    Login {
        #[arg(long)]
        email: String,
        /// Prompted for when absent
        #[arg(long, env = "QUIRE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    Logout,
    /// Show who is logged in
    Whoami,
    /// List your blogs, newest first
    Mine,
    /// Browse everyone's blogs
    Explore {
        /// Only blogs whose title, text or author contains this
        #[arg(long)]
        search: Option<String>,
    },
    /// Read one blog
    Show { id: String },
    /// Write a new blog
    New {
        #[arg(long)]
        title: String,
        /// Up to five tags
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Cover image file
        #[arg(long)]
        cover: PathBuf,
        /// Body as HTML or plain text
        #[arg(long)]
        body: PathBuf,
        /// Show the preview instead of posting
        #[arg(long)]
        preview: bool,
    },
    /// Change an existing blog
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        /// Replaces all tags when given
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        cover: Option<PathBuf>,
        #[arg(long)]
        body: Option<PathBuf>,
    },
    Delete { id: String },
}

/// Whether a command did what it was asked. Failures have already been
/// shown to the user when this is `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Done,
    Failed,
}

struct CliNotifier;

impl Notifier for CliNotifier {
    fn success(&self, message: &str) {
        println!("✓ {message}");
    }

    fn error(&self, message: &str) {
        eprintln!("✗ {message}");
    }
}

struct App {
    api: HttpClient,
    store: SessionStore<FileSessionStore>,
    notifier: CliNotifier,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_miette()?;

    let cli = Cli::parse();

    let telemetry_config = TelemetryConfig::from_env("quire-cli");
    telemetry::init(if cli.verbose {
        telemetry_config
    } else {
        telemetry_config.quiet()
    });

    let config = load_config(cli.config.as_deref(), cli.api_url.clone())?;
    tracing::debug!(endpoint = %config.endpoint, "using blog server");
    let store_path = match cli.store {
        Some(path) => FileSessionStore::new(path),
        None => FileSessionStore::default_location().ok_or_else(|| {
            miette::miette!("Could not determine config directory, pass --store")
        })?,
    };

    let app = App {
        api: HttpClient::new(&config)?,
        store: SessionStore::new(store_path),
        notifier: CliNotifier,
    };
    let restored = app.store.restore(&app.api).await;
    tracing::debug!(?restored, "session restore");

    let status = run(&app, cli.command).await?;
    Ok(match status {
        Status::Done => ExitCode::SUCCESS,
        Status::Failed => ExitCode::FAILURE,
    })
}

async fn run(app: &App, command: Commands) -> Result<Status> {
    if let Some(route) = command_route(&command) {
        if let Some(to) = redirect_for(&route, &app.store.state()) {
            match to {
                Route::Login => eprintln!("Not logged in. Run 'quire login --email <EMAIL>' first."),
                _ => eprintln!("Already logged in. Run 'quire logout' first."),
            }
            return Ok(Status::Failed);
        }
    }

    match command {
        Commands::Register {
            name,
            email,
            password,
        } => {
            let password = match password {
                Some(password) => password,
                None => prompt("Password")?,
            };
            let confirm_password = prompt("Confirm password")?;
            let form = RegisterForm {
                name,
                email,
                password,
                confirm_password,
            };
            auth_outcome(auth::register(&app.api, &app.notifier, &form).await)
        }
        Commands::Login { email, password } => {
            let password = match password {
                Some(password) => password,
                None => prompt("Password")?,
            };
            let form = LoginForm::new(email, password);
            auth_outcome(auth::login(&app.api, &app.store, &app.notifier, &form).await)
        }
        Commands::Logout => {
            if !app.store.is_authenticated() {
                println!("Not logged in");
                return Ok(Status::Done);
            }
            auth_outcome(auth::logout(&app.api, &app.store, &app.notifier).await)
        }
        Commands::Whoami => {
            match app.store.current_user() {
                Some(user) => println!("{} <{}>", user.name, user.email),
                None => println!("Not logged in"),
            }
            Ok(Status::Done)
        }
        Commands::Mine => {
            let mut view = MyBlogs::new();
            view.load(&app.api, &app.store, &app.notifier).await;
            Ok(print_cards(&view.state, view.cards(), "You have not written any blogs yet."))
        }
        Commands::Explore { search } => {
            let mut view = Explore::new();
            view.load(&app.api, &app.store, &app.notifier).await;
            if let Some(term) = search {
                view.set_search(term);
            }
            Ok(print_cards(&view.state, view.cards(), "No blogs found."))
        }
        Commands::Show { id } => show_blog(app, id).await,
        Commands::New {
            title,
            tags,
            cover,
            body,
            preview,
        } => {
            let mut draft = AuthoringSession::new();
            draft.set_title(title);
            add_tags(&mut draft, &tags);
            draft.set_cover_image(read_cover(&cover)?);
            draft.load_body(&read_body(&body)?);
            if preview {
                draft.toggle_preview();
                print_preview(&draft);
                return Ok(Status::Done);
            }
            submit(app, &mut draft).await
        }
        Commands::Edit {
            id,
            title,
            tags,
            cover,
            body,
        } => {
            let mut draft =
                match AuthoringSession::load_existing(&app.api, &app.store, &app.notifier, &id).await {
                    ViewState::Ready(draft) => draft,
                    ViewState::Empty => {
                        println!("Blog not found");
                        return Ok(Status::Failed);
                    }
                    ViewState::Error(_) | ViewState::Loading => return Ok(Status::Failed),
                };
            if let Some(title) = title {
                draft.set_title(title);
            }
            if !tags.is_empty() {
                for tag in draft.tags().to_vec() {
                    draft.remove_tag(&tag);
                }
                add_tags(&mut draft, &tags);
            }
            if let Some(cover) = cover {
                draft.set_cover_image(read_cover(&cover)?);
            }
            if let Some(body) = body {
                draft.load_body(&read_body(&body)?);
            }
            submit(app, &mut draft).await
        }
        Commands::Delete { id } => {
            let mut view = MyBlogs::new();
            let deleted = view.delete(&app.api, &app.store, &app.notifier, &id).await;
            Ok(if deleted { Status::Done } else { Status::Failed })
        }
    }
}

/// The route a command stands in for, when it is gated.
fn command_route(command: &Commands) -> Option<Route> {
    match command {
        Commands::Register { .. } => Some(Route::Register),
        Commands::Login { .. } | Commands::Logout | Commands::Whoami => None,
        Commands::Mine | Commands::Delete { .. } => Some(Route::MyBlogs),
        Commands::Explore { .. } => Some(Route::Explore),
        Commands::Show { id } => Some(Route::Blog(id.clone())),
        Commands::New { .. } => Some(Route::CreateBlog),
        Commands::Edit { id, .. } => Some(Route::EditBlog(id.clone())),
    }
}

/// Server failures were already reported by the notifier; anything else
/// becomes a diagnostic.
fn auth_outcome(result: std::result::Result<Route, AuthError>) -> Result<Status> {
    match result {
        Ok(route) => {
            tracing::debug!(%route, "next");
            Ok(Status::Done)
        }
        Err(AuthError::Api(_)) => Ok(Status::Failed),
        Err(e) => Err(e.into()),
    }
}

async fn submit(app: &App, draft: &mut AuthoringSession) -> Result<Status> {
    match draft.submit(&app.api, &app.store, &app.notifier).await {
        Ok(_) => Ok(Status::Done),
        Err(AuthoringError::Api(_)) => Ok(Status::Failed),
        Err(e) => Err(e.into()),
    }
}

fn add_tags(draft: &mut AuthoringSession, tags: &[String]) {
    for tag in tags {
        if !draft.add_tag(tag) {
            eprintln!("ignoring tag {tag:?}: blank, repeated or over the limit of five");
        }
    }
}

async fn show_blog(app: &App, id: String) -> Result<Status> {
    let mut view = BlogView::new(id);
    view.load(&app.api, &app.store, &app.notifier).await;
    match &view.state {
        ViewState::Ready(detail) => {
            let blog = &detail.blog;
            println!("{}", blog.title);
            let mut meta = Vec::new();
            if let Some(author) = blog.author_name() {
                meta.push(format!("by {author}"));
            }
            if let Some(created) = blog.created_at {
                meta.push(created.format("%B %-d, %Y").to_string());
            }
            meta.push(format!("{} min read", detail.reading_minutes));
            println!("{}", meta.join(" · "));
            if !blog.tags.is_empty() {
                println!("tags: {}", blog.tags.join(", "));
            }
            if let Some(image) = &blog.image {
                println!("cover: {image}");
            }
            println!();
            println!("{}", quire_editor_core::parse(&blog.content).plain_text());
            Ok(Status::Done)
        }
        ViewState::Empty => {
            println!("Blog not found");
            Ok(Status::Failed)
        }
        ViewState::Error(_) | ViewState::Loading => Ok(Status::Failed),
    }
}

fn print_cards<T>(state: &ViewState<T>, cards: Vec<BlogCard>, empty: &str) -> Status {
    match state {
        ViewState::Error(_) | ViewState::Loading => return Status::Failed,
        ViewState::Empty => {
            println!("{empty}");
            return Status::Done;
        }
        ViewState::Ready(_) => {}
    }
    if cards.is_empty() {
        println!("{empty}");
    }
    for card in cards {
        let date = card
            .created_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "Unknown date".to_string());
        let id = card.id.as_deref().unwrap_or("-");
        match &card.author {
            Some(author) => println!("{id}  {}  ({author}, {date})", card.title),
            None => println!("{id}  {}  ({date})", card.title),
        }
        if !card.excerpt.is_empty() {
            println!("    {}", card.excerpt);
        }
    }
    Status::Done
}

fn print_preview(draft: &AuthoringSession) {
    let preview = draft.preview();
    println!("{}", preview.title);
    println!(
        "{} words · {} min read",
        preview.word_count, preview.reading_minutes
    );
    println!("tags: {}", preview.tags.join(", "));
    if let Some(cover) = draft.cover() {
        println!("cover: {}", cover.name());
    }
    println!();
    println!("{}", preview.body_html);
    let validation = draft.validate();
    if !validation.valid() {
        println!();
        for error in &validation.field_errors {
            println!("! {}: {}", error.field, error.message);
        }
    }
}

fn read_cover(path: &Path) -> Result<CoverImage> {
    let data = std::fs::read(path).into_diagnostic()?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cover".to_string());
    Ok(CoverImage::file(name, data))
}

fn read_body(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).into_diagnostic()
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}: ");
    std::io::stdout().flush().into_diagnostic()?;
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .into_diagnostic()?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Defaults, then `QUIRE_API_URL`, then the KDL file, then `--api-url`.
fn load_config(path: Option<&Path>, api_url: Option<String>) -> Result<Config> {
    let default_path = Config::default_dir().map(|dir| dir.join("config.kdl"));
    let file_endpoint = match path.or(default_path.as_deref()) {
        Some(path) => read_kdl_endpoint(path)?,
        None => None,
    };
    Ok(Config::from_env()
        .with_endpoint(file_endpoint)
        .with_endpoint(api_url))
}

fn read_kdl_endpoint(path: &Path) -> Result<Option<String>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).into_diagnostic(),
    };
    let doc: KdlDocument = content.parse().into_diagnostic()?;
    Ok(doc
        .get("api-url")
        .and_then(|node| node.entries().first())
        .and_then(|entry| entry.value().as_string())
        .map(str::to_string))
}

fn init_miette() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    miette::set_panic_hook();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_new_command() {
        let cli = Cli::try_parse_from([
            "quire", "new", "--title", "Hi", "--tag", "a", "--tag", "b", "--cover", "c.png",
            "--body", "b.html", "--preview",
        ])
        .unwrap();
        let Commands::New { tags, preview, .. } = cli.command else {
            panic!("expected new");
        };
        assert_eq!(tags, ["a", "b"]);
        assert!(preview);
    }

    #[test]
    fn test_kdl_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.kdl");
        std::fs::write(&path, "api-url \"https://blog.example\"\n").unwrap();
        assert_eq!(
            read_kdl_endpoint(&path).unwrap().as_deref(),
            Some("https://blog.example")
        );
        assert_eq!(read_kdl_endpoint(&dir.path().join("missing.kdl")).unwrap(), None);

        let config = load_config(Some(&path), Some("http://flag".into())).unwrap();
        assert_eq!(config.endpoint, "http://flag");
        let config = load_config(Some(&path), None).unwrap();
        assert_eq!(config.endpoint, "https://blog.example");
    }

    #[test]
    fn test_command_routes() {
        assert_eq!(command_route(&Commands::Whoami), None);
        assert_eq!(
            command_route(&Commands::Show { id: "b1".into() }),
            Some(Route::Blog("b1".into()))
        );
    }
}
