//! Keiro - draft, publish and schedule social posts from the terminal
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow};
use chrono::{Datelike, Utc};
use std::io::Write;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use keiro::api::{DraftStore, Library, ScheduleStore};
use keiro::auth::Vault;
use keiro::composer::normalize_hashtag;
use keiro::drafts::{DraftService, SaveDraft};
use keiro::guest::{self, FileStore, GuestSession, Session};
use keiro::narration::Narration;
use keiro::profile::PublishVariant;
use keiro::publish::{PublishDispatcher, PublishOrder, PublishOutcome, PublishPrompt};
use keiro::schedule::{ScheduleRequest, Scheduler, month_view, parse_schedule_time};
use keiro::{Config, Database, DraftStatus, FlowError, MediaItem, MediaKind, MediaType, Platform, PublishFlow, StudioClient};

/// Run the same code against either backend
macro_rules! with_store {
    ($backend:expr, $store:ident => $body:expr) => {
        match $backend {
            Backend::Local($store) => $body,
            Backend::Remote($store) => $body,
        }
    };
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (RUST_LOG=debug for verbose output)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let command = parse_args()?;
    match &command {
        Command::Help => {
            print_help();
            return Ok(());
        }
        Command::Version => {
            print_version();
            return Ok(());
        }
        Command::Login { token } => return login(token),
        Command::Logout => return logout(),
        Command::Guest { email } => return start_guest(email),
        _ => {}
    }

    let config = Config::load()?;
    let vault = Vault::open()?;
    let backend = Backend::connect(&config, &vault)?;
    let mut session = load_session(&vault)?;

    match command {
        Command::Drafts { platform } => {
            with_store!(&backend, store => list_drafts(store, &session, platform).await)
        }
        Command::Draft(request) => {
            with_store!(&backend, store => save_draft(store, &mut session, request).await)
        }
        Command::Publish { platform, id, variant, yes } => {
            publish(backend.remote()?, &session, platform, id, variant, yes).await
        }
        Command::Schedule(request) => {
            with_store!(&backend, store => schedule(store, &config, request).await)
        }
        Command::Calendar { month } => {
            with_store!(&backend, store => calendar(store, &config, month).await)
        }
        Command::Suggest { platform, media_url, title, angle } => {
            suggest(backend.remote()?, &config, platform, &media_url, title, angle.as_deref()).await
        }
        Command::Narrate { platform, video_url, script, style } => {
            narrate(backend.remote()?, &config, platform, &video_url, &script, style.as_deref()).await
        }
        Command::Help | Command::Version | Command::Login { .. } | Command::Logout | Command::Guest { .. } => {
            Ok(())
        }
    }
}

/// Where drafts and scheduled posts live
enum Backend {
    Local(Database),
    Remote(StudioClient),
}

impl Backend {
    fn connect(config: &Config, vault: &Vault) -> Result<Self> {
        if config.is_local_mode() {
            tracing::debug!("No api_base_url configured, using the local database");
            return Ok(Self::Local(Database::open()?));
        }
        let token = vault.session_token().unwrap_or_else(|e| {
            tracing::warn!("Could not read session token: {e:#}");
            None
        });
        Ok(Self::Remote(StudioClient::new(&config.api_base_url, token.as_deref())))
    }

    fn remote(&self) -> Result<&StudioClient> {
        match self {
            Self::Remote(client) => Ok(client),
            Self::Local(_) => Err(anyhow!(
                "This command needs the studio backend. Set api_base_url in {}",
                keiro::paths::config_path().map_or_else(|_| "config.toml".to_string(), |p| p.display().to_string())
            )),
        }
    }
}

fn load_session(vault: &Vault) -> Result<Session<FileStore>> {
    if vault.session_token().ok().flatten().is_some() {
        return Ok(Session::Authenticated);
    }
    Ok(match GuestSession::resume(FileStore::open()?)? {
        Some(guest) => {
            tracing::debug!("Running as guest {}", guest.email());
            Session::Guest(guest)
        }
        None => Session::Authenticated,
    })
}

/// CLI commands
enum Command {
    Drafts {
        platform: Platform,
    },
    Draft(SaveDraft),
    Publish {
        platform: Platform,
        id: Uuid,
        variant: PublishVariant,
        yes: bool,
    },
    Schedule(ScheduleArgs),
    Calendar {
        month: Option<(i32, u32)>,
    },
    Suggest {
        platform: Platform,
        media_url: String,
        title: Option<String>,
        angle: Option<String>,
    },
    Narrate {
        platform: Platform,
        video_url: String,
        script: String,
        style: Option<String>,
    },
    Login {
        token: String,
    },
    Logout,
    Guest {
        email: String,
    },
    Help,
    Version,
}

struct ScheduleArgs {
    caption: String,
    platforms: Vec<Platform>,
    at: String,
    tags: Vec<String>,
    media: Option<String>,
}

fn parse_args() -> Result<Command> {
    let args: Vec<String> = std::env::args().collect();

    let Some(command) = args.get(1) else {
        return Ok(Command::Help);
    };
    let rest = &args[2..];

    match command.as_str() {
        "-h" | "--help" | "help" => Ok(Command::Help),
        "-v" | "--version" | "version" => Ok(Command::Version),

        "drafts" => Ok(Command::Drafts {
            platform: platform_arg(positional(rest, 0))?,
        }),

        "draft" => {
            let platform = platform_arg(positional(rest, 0))?;
            let caption = positional(rest, 1)
                .ok_or_else(|| anyhow!("Missing caption"))?
                .to_string();
            let media = flag_value(rest, &["--media", "-m"]);
            let media_type = match (&media, has_flag(rest, "--video")) {
                (None, _) => MediaType::TextOnly,
                (Some(_), true) => MediaType::Video,
                (Some(_), false) => MediaType::Image,
            };
            let mut request = SaveDraft::new(platform, media_type, caption);
            if let Some(url) = media {
                request = request.with_media(None, &url);
            }
            request.hashtags = flag_values(rest, &["--tag", "-t"]);
            if has_flag(rest, "--ready") {
                request.status = DraftStatus::Ready;
            }
            if let Some(id) = flag_value(rest, &["--id"]) {
                request.id = Some(Uuid::parse_str(&id).map_err(|_| anyhow!("Invalid draft id: {id}"))?);
            }
            Ok(Command::Draft(request))
        }

        "publish" => {
            let platform = platform_arg(positional(rest, 0))?;
            let id = positional(rest, 1).ok_or_else(|| anyhow!("Missing draft id"))?;
            let variant = match flag_value(rest, &["--as"]).as_deref() {
                None | Some("feed") => PublishVariant::Feed,
                Some("story") => PublishVariant::Story,
                Some(other) => return Err(anyhow!("Unknown publish variant: {other} (feed or story)")),
            };
            Ok(Command::Publish {
                platform,
                id: Uuid::parse_str(id).map_err(|_| anyhow!("Invalid draft id: {id}"))?,
                variant,
                yes: has_flag(rest, "--yes") || has_flag(rest, "-y"),
            })
        }

        "schedule" => {
            let caption = positional(rest, 0)
                .ok_or_else(|| anyhow!("Missing caption"))?
                .to_string();
            let at = flag_value(rest, &["--at"])
                .ok_or_else(|| anyhow!("Missing --at <time> (e.g. 'in 2h', '18:30', '2026-11-02 09:00')"))?;
            let platforms = flag_value(rest, &["--to"])
                .map(|list| Platform::list_from_str(&list))
                .unwrap_or_default();
            Ok(Command::Schedule(ScheduleArgs {
                caption,
                platforms,
                at,
                tags: flag_values(rest, &["--tag", "-t"]),
                media: flag_value(rest, &["--media", "-m"]),
            }))
        }

        "calendar" | "cal" => {
            let month = positional(rest, 0)
                .map(|value| {
                    value
                        .split_once('-')
                        .and_then(|(y, m)| Some((y.parse().ok()?, m.parse().ok()?)))
                        .ok_or_else(|| anyhow!("Invalid month '{value}', expected YYYY-MM"))
                })
                .transpose()?;
            Ok(Command::Calendar { month })
        }

        "suggest" => Ok(Command::Suggest {
            platform: platform_arg(positional(rest, 0))?,
            media_url: positional(rest, 1)
                .ok_or_else(|| anyhow!("Missing media URL"))?
                .to_string(),
            title: flag_value(rest, &["--title"]),
            angle: flag_value(rest, &["--angle"]),
        }),

        "narrate" => Ok(Command::Narrate {
            platform: flag_value(rest, &["--platform", "-p"])
                .map(|p| platform_arg(Some(&p)))
                .transpose()?
                .unwrap_or(Platform::Tiktok),
            video_url: positional(rest, 0)
                .ok_or_else(|| anyhow!("Missing video URL"))?
                .to_string(),
            script: positional(rest, 1)
                .ok_or_else(|| anyhow!("Missing narration script"))?
                .to_string(),
            style: flag_value(rest, &["--style"]),
        }),

        "login" => Ok(Command::Login {
            token: positional(rest, 0)
                .ok_or_else(|| anyhow!("Missing session token"))?
                .to_string(),
        }),
        "logout" => Ok(Command::Logout),

        "guest" => Ok(Command::Guest {
            email: positional(rest, 0)
                .ok_or_else(|| anyhow!("Missing e-mail"))?
                .to_string(),
        }),

        other => Err(anyhow!("Unknown command: {other}\nRun 'keiro --help' for usage")),
    }
}

const VALUE_FLAGS: &[&str] = &[
    "--media", "-m", "--tag", "-t", "--id", "--as", "--at", "--to", "--title", "--angle", "--platform", "-p",
    "--style",
];

/// Nth argument that is neither a flag nor a flag's value
fn positional(args: &[String], n: usize) -> Option<&str> {
    let mut skip_next = false;
    args.iter()
        .filter(|arg| {
            if skip_next {
                skip_next = false;
                return false;
            }
            if arg.starts_with('-') {
                skip_next = VALUE_FLAGS.contains(&arg.as_str());
                return false;
            }
            true
        })
        .nth(n)
        .map(String::as_str)
}

fn flag_value(args: &[String], names: &[&str]) -> Option<String> {
    args.iter()
        .position(|a| names.contains(&a.as_str()))
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn flag_values(args: &[String], names: &[&str]) -> Vec<String> {
    args.windows(2)
        .filter(|pair| names.contains(&pair[0].as_str()))
        .map(|pair| pair[1].clone())
        .collect()
}

fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|a| a == name)
}

fn platform_arg(value: Option<&str>) -> Result<Platform> {
    let value = value.ok_or_else(|| anyhow!("Missing platform (instagram, tiktok, linkedin, x)"))?;
    Platform::from_str(value).ok_or_else(|| anyhow!("Unknown platform: {value}"))
}

fn ask(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes" | "o" | "oui"))
}

fn media_kind(url: &str) -> MediaKind {
    let path = url.split('?').next().unwrap_or(url).to_lowercase();
    if [".mp4", ".mov", ".webm", ".m4v"].iter().any(|ext| path.ends_with(ext)) {
        MediaKind::Video
    } else {
        MediaKind::Image
    }
}

fn print_help() {
    let config_path = keiro::paths::config_path()
        .map_or_else(|_| "Unknown".to_string(), |p| p.display().to_string());

    println!(
        r#"{}
Keiro - draft, publish and schedule social posts

USAGE:
    keiro [COMMAND]

COMMANDS:
    drafts <platform>                  List drafts of a platform
    draft <platform> <caption> [OPTIONS]
                                       Save a draft
      Options:
        -m, --media <url>              Image or video URL
        --video                        The media is a video
        -t, --tag <tag>                Hashtag (repeatable)
        --ready                        Mark ready to publish
        --id <draft-id>                Update an existing draft

    publish <platform> <draft-id> [--as feed|story] [-y]
                                       Publish a draft (asks for confirmation)

    schedule <caption> --to <platforms> --at <time> [OPTIONS]
                                       Schedule a post on several platforms
      Examples:
        keiro schedule "Soirée jazz" --to instagram,tiktok --at "2026-11-02 19:00"
        keiro schedule "Happy hour" --to linkedin --at "in 2h" -t afterwork

    calendar [YYYY-MM]                 Show scheduled posts by day
    suggest <platform> <media-url> [--title <t>] [--angle <a>]
                                       AI caption and hashtags
    narrate <video-url> <script> [--platform tiktok|instagram] [--style <id>]
                                       Narrate a video and merge the audio
    login <token>                      Store the studio session token
    logout                             Forget the session token
    guest <email>                      Try Keiro as a guest (one Instagram draft)

PLATFORMS:
    instagram (ig), tiktok (tt), linkedin (li), x (twitter)

OPTIONS:
    -h, --help                         Show this help message
    -v, --version                      Show version information

CONFIG:
    {}
"#,
        keiro::LOGO,
        config_path
    );
}

fn print_version() {
    println!("keiro {}", keiro::VERSION);
}

fn login(token: &str) -> Result<()> {
    Vault::open()?.store_session_token(token)?;
    println!("✓ Session token saved");
    Ok(())
}

fn logout() -> Result<()> {
    Vault::open()?.clear_session_token()?;
    println!("✓ Signed out");
    Ok(())
}

fn start_guest(email: &str) -> Result<()> {
    let guest = GuestSession::start(FileStore::open()?, email)?;
    println!("✓ Guest session for {} (since {})", guest.email(), guest.started_at().format("%Y-%m-%d"));
    println!("  Guests can keep one Instagram draft. Sign up to unlock every platform.");
    Ok(())
}

async fn list_drafts(store: &impl DraftStore, session: &Session<FileStore>, platform: Platform) -> Result<()> {
    let drafts = DraftService::new(store).list(session, platform).await?;

    if drafts.is_empty() {
        println!("No {} drafts.", platform.name());
        return Ok(());
    }

    println!("{} {} drafts\n", platform.emoji(), platform.name());
    for draft in drafts {
        println!(
            "  {}  [{}] {}  {}",
            draft.id,
            draft.status.as_str(),
            draft.media_type.as_str(),
            draft.preview(60)
        );
        if !draft.hashtags.is_empty() {
            println!("      {}", draft.hashtags.join(" "));
        }
    }
    Ok(())
}

async fn save_draft(store: &impl DraftStore, session: &mut Session<FileStore>, request: SaveDraft) -> Result<()> {
    let mut request = request;
    request.hashtags = request.hashtags.iter().filter_map(|t| normalize_hashtag(t)).collect();

    match DraftService::new(store).save_draft(session, request).await {
        Ok(draft) => {
            println!("✓ Draft saved: {} ({})", draft.id, draft.status.as_str());
            if session.is_guest() {
                println!("  Kept on this machine until you sign in.");
            }
            Ok(())
        }
        Err(FlowError::GuestUpsell { message, .. }) => {
            println!("{message}");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn publish(
    client: &StudioClient,
    session: &Session<FileStore>,
    platform: Platform,
    id: Uuid,
    variant: PublishVariant,
    yes: bool,
) -> Result<()> {
    let drafts = DraftService::new(client);
    let draft = drafts
        .list(session, platform)
        .await?
        .into_iter()
        .find(|d| d.id == id)
        .ok_or_else(|| anyhow!("No {} draft with id {id}", platform.name()))?;

    let order = PublishOrder {
        variant,
        ..PublishOrder::from_draft(&draft)
    };
    let confirm = |prompt: &PublishPrompt| yes || ask(&prompt.message).unwrap_or(false);

    match PublishDispatcher::new(client, client).publish(&order, &confirm).await {
        Ok(PublishOutcome::WebIntent { url, .. }) => {
            println!("Opening the share page: {url}");
            if let Err(e) = open::that(&url) {
                tracing::warn!("Could not open browser: {e}");
            }
            Ok(())
        }
        Ok(PublishOutcome::Published { permalink, .. }) => {
            drafts.record_published(&draft, permalink.as_deref()).await;
            match permalink {
                Some(link) => {
                    println!("✓ Published: {link}");
                    if !yes && ask("Open it in the browser?").unwrap_or(false)
                        && let Err(e) = open::that(&link)
                    {
                        tracing::warn!("Could not open browser: {e}");
                    }
                }
                None => println!("✓ Published"),
            }
            Ok(())
        }
        Err(FlowError::Cancelled) => {
            println!("Cancelled.");
            Ok(())
        }
        Err(FlowError::NotConnected { platform, connect_url }) => {
            println!("{}", FlowError::NotConnected { platform, connect_url: connect_url.clone() });
            if let Some(url) = connect_url {
                println!("Connect here: {url}");
            }
            Ok(())
        }
        Err(FlowError::Support(ticket)) => {
            eprintln!("{}", FlowError::Support(ticket.clone()));
            eprintln!("\nTechnical details:\n{}", ticket.technical_details());
            Err(anyhow!("Publish to {} failed", ticket.platform))
        }
        Err(e) => Err(e.into()),
    }
}

async fn schedule(store: &impl ScheduleStore, config: &Config, args: ScheduleArgs) -> Result<()> {
    let mut local = FileStore::open()?;
    let platforms = if args.platforms.is_empty() {
        let remembered = guest::selected_networks(&local)?;
        if remembered.is_empty() { config.default_platforms() } else { remembered }
    } else {
        args.platforms
    };

    let request = ScheduleRequest {
        platforms,
        scheduled_for: parse_schedule_time(&args.at)?,
        caption: args.caption,
        hashtags: args.tags.iter().filter_map(|t| normalize_hashtag(t)).collect(),
        media_url: args.media.clone(),
        media_ref: args.media,
    };

    let report = Scheduler::new(store).schedule(&request, Utc::now()).await?;
    guest::save_selected_networks(&mut local, &request.platforms)?;

    println!("{}", report.summary());
    for post in &report.succeeded {
        println!("  ✓ {} {} · {}", post.platform.emoji(), post.platform.name(), post.scheduled_time_display());
    }
    for (platform, error) in &report.failed {
        println!("  ✗ {} {}: {error}", platform.emoji(), platform.name());
    }
    Ok(())
}

async fn calendar(store: &impl ScheduleStore, config: &Config, month: Option<(i32, u32)>) -> Result<()> {
    let posts = Scheduler::new(store).list().await?;
    let tz = config.calendar_offset();
    let (year, month) = month.unwrap_or_else(|| {
        let now = Utc::now().with_timezone(&tz);
        (now.year(), now.month())
    });

    let days = month_view(&posts, year, month, &tz).ok_or_else(|| anyhow!("Invalid month {year}-{month}"))?;
    println!("📅 {year}-{month:02}\n");

    let mut empty = true;
    for day in days.iter().filter(|d| !d.posts.is_empty()) {
        empty = false;
        println!("{}", day.date.format("%a %d"));
        for post in day.visible() {
            println!(
                "  {} {} {} {}",
                post.status.emoji(),
                post.scheduled_for.with_timezone(&tz).format("%H:%M"),
                post.platform.emoji(),
                post.caption.chars().take(50).collect::<String>()
            );
        }
        if day.overflow() > 0 {
            println!("  +{}", day.overflow());
        }
    }
    if empty {
        println!("Nothing scheduled this month.");
    }
    Ok(())
}

async fn suggest(
    client: &StudioClient,
    config: &Config,
    platform: Platform,
    media_url: &str,
    title: Option<String>,
    angle: Option<&str>,
) -> Result<()> {
    let mut flow = PublishFlow::new(platform, config.page_size, client.is_authenticated(), config.voice());
    let mut item = MediaItem::new(media_url, media_url, media_kind(media_url));
    item.title = title;
    flow.select_item(item);

    let brand = match client.brand().await {
        Ok(brand) => Some(brand),
        Err(e) => {
            tracing::warn!("Brand profile unavailable: {e:#}");
            None
        }
    };
    flow.suggest(client, brand.as_ref(), angle).await?;

    let composer = flow.composer();
    println!("{}\n", composer.caption());
    println!("{}", composer.hashtags().join(" "));
    println!("\n{} characters left", composer.remaining());
    Ok(())
}

async fn narrate(
    client: &StudioClient,
    config: &Config,
    platform: Platform,
    video_url: &str,
    script: &str,
    style: Option<&str>,
) -> Result<()> {
    let mut narration = Narration::new(platform, config.voice());
    narration.set_video(Some(video_url));
    narration.edit_script(script)?;
    narration.set_subtitle_style(style)?;

    println!("Generating audio...");
    narration.generate_audio(client).await?;
    if narration.script() != script {
        println!("Script condensed to: {}", narration.script());
    }

    println!("Merging audio and video...");
    match narration.merge(client).await {
        Ok(url) => {
            println!("✓ Narrated video: {url}");
            Ok(())
        }
        Err(e) => {
            eprintln!("{e}");
            Err(anyhow!("Merge failed; run the command again to relaunch it"))
        }
    }
}
