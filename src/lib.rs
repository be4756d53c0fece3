pub mod invidious;
pub mod playback;
pub mod player;
pub mod selection;
pub mod settings;

use std::error::Error;

use invidious::{InvidiousClient, VideoItem};
use settings::{AppSettings, NetworkConfig, HOST_PRESETS, QUALITY_CHOICES};
use tracing::debug;

pub use player::{prepare_playback, request_for, request_for_index, PlaybackRequest, PrepareError};

const USAGE: &str = "usage: boxytube [--proxy <url>] <command>

commands:
  video <id> [height]        rank qualities and show what would play
  search <query...>          search videos
  trending [region]          trending videos (default US)
  channel <id>               channel summary and latest uploads
  comments <id> [token]      one page of comments
  settings                   show the active settings
  settings set <key> <value> change host, https or quality and save
  settings preset <name>     switch to a known instance and save
  settings test              check that the instance answers

options:
  --proxy <url>              route requests through a proxy (http, socks5, socks5h)";

/// Split a leading `--proxy <url>` off the arguments
fn split_proxy(args: &[String]) -> Result<(Option<String>, &[String]), Box<dyn Error>> {
    match args {
        [flag, url, rest @ ..] if flag == "--proxy" => Ok((Some(url.clone()), rest)),
        [flag] if flag == "--proxy" => Err("--proxy needs a url".into()),
        _ => Ok((None, args)),
    }
}

fn print_videos(videos: &[VideoItem]) {
    for video in videos {
        println!(
            "{:<12} {:>8}  {}  ({}, {})",
            video.id, video.duration, video.title, video.channel, video.views
        );
    }
}

async fn show_video(client: &InvidiousClient, id: &str, preferred_px: u32) -> Result<(), Box<dyn Error>> {
    let (video, request) = prepare_playback(client, id, preferred_px).await?;

    println!("{}", video.title);
    println!("{} | {} | {}", video.channel, video.views, video.duration);
    if !video.channel_thumbnail_url.is_empty() {
        println!("avatar: {}", video.channel_thumbnail_url);
    }
    println!();

    for (idx, option) in video.available_qualities.iter().enumerate() {
        let marker = if request.quality_index == idx { "*" } else { " " };
        let audio = if option.has_separate_audio { "+audio" } else { "" };
        println!("{} {:>2}. {:<12} {}", marker, idx, option.label, audio);
    }

    println!();
    println!("video: {}", request.video_url);
    if let Some(audio_url) = &request.audio_url {
        println!("audio: {}", audio_url);
    }
    Ok(())
}

fn print_settings(settings: &AppSettings) -> Result<(), Box<dyn Error>> {
    if let Ok(path) = AppSettings::default_path() {
        println!("file: {}", path.display());
    }
    println!("{}", serde_json::to_string_pretty(settings)?);
    println!("api: {}", settings.api_base_url());
    Ok(())
}

async fn dispatch(args: &[String]) -> Result<(), Box<dyn Error>> {
    let (proxy, args) = split_proxy(args)?;
    let mut settings = AppSettings::load();
    let network = NetworkConfig::default().with_proxy(proxy);
    let client = InvidiousClient::from_settings(&settings, &network)?;
    debug!(base_url = client.base_url(), "Client ready");

    let command = args.first().map(String::as_str).unwrap_or("");
    let rest = &args[args.len().min(1)..];

    match (command, rest) {
        ("video", [id]) => show_video(&client, id, settings.default_quality).await?,
        ("video", [id, height]) => show_video(&client, id, height.parse()?).await?,
        ("search", query) if !query.is_empty() => print_videos(&client.search(&query.join(" ")).await?),
        ("trending", []) => print_videos(&client.trending("US").await?),
        ("trending", [region]) => print_videos(&client.trending(region).await?),
        ("channel", [id]) => {
            let channel = client.channel(id).await?;
            println!("{}{}", channel.name, if channel.verified { " ✓" } else { "" });
            println!(
                "{} | {}",
                channel.subscriber_count_text(),
                channel.video_count_text()
            );
            println!();
            print_videos(&channel.latest_videos);
        }
        ("comments", [id, tail @ ..]) if tail.len() <= 1 => {
            let page = client.comments(id, tail.first().map(String::as_str)).await?;
            for comment in &page.comments {
                let pin = if comment.is_pinned { "[pinned] " } else { "" };
                println!(
                    "{}{} · {} · {}",
                    pin,
                    comment.author,
                    comment.published_text,
                    comment.like_count_text()
                );
                println!("  {}", comment.content);
            }
            if let Some(token) = page.continuation {
                println!();
                println!("next page: {}", token);
            }
        }
        ("settings", []) => print_settings(&settings)?,
        ("settings", [action, key, value]) if action == "set" => {
            settings.set(key, value)?;
            settings.save()?;
            print_settings(&settings)?;
        }
        ("settings", [action, name]) if action == "preset" => {
            settings.apply_preset(name)?;
            settings.save()?;
            print_settings(&settings)?;
        }
        ("settings", [action]) if action == "test" => {
            println!("Testing {} ...", client.base_url());
            client.check_connection().await?;
            println!("✓ Connection successful");
        }
        _ => {
            println!("{}", USAGE);
            let presets: Vec<&str> = HOST_PRESETS.iter().map(|(name, _, _)| *name).collect();
            let qualities: Vec<String> = QUALITY_CHOICES.iter().map(u32::to_string).collect();
            println!();
            println!("settings keys: host, https (on/off), quality ({})", qualities.join(", "));
            println!("presets: {}", presets.join(", "));
        }
    }
    Ok(())
}

/// Entry point for the command line client
pub fn run() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(dispatch(&args))
}
