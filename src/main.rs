use std::sync::Arc;

use color_eyre::eyre::eyre;
use melodeck::{
    audio::{
        commands::AudioCommand, playback::RodioSink, state::PlaybackStatus, system::AudioSystem,
    },
    config::Config,
    event::events::Event,
    http::{ApiService, StaticCredentials},
    lyrics::LyricTrack,
    model::LIKED_SONGS_PLAYLIST_ID,
    util::{
        hook::set_panic_hook,
        log::initialize_logging,
        track::{describe, format_duration},
    },
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

const HELP: &str = "commands: next | prev | pause | resume | toggle | play <n> | mode | \
vol <0..1> | seek <secs> | quality <standard|higher|exhigh|lossless> | \
comments | sort <recommended|hot|latest> | like <comment-id> | quit";

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() -> color_eyre::Result<()> {
    setup()?;

    let config = Config::from_env();
    let playlist_id = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse::<i64>()
            .map_err(|_| eyre!("playlist id must be a number, got {arg}"))?,
        None => LIKED_SONGS_PLAYLIST_ID,
    };

    let api = Arc::new(ApiService::new(&config.api)?);
    let credentials = Arc::new(StaticCredentials::new(config.api.cookie.clone()));

    let (event_tx, event_rx) = flume::unbounded();
    let (sink_tx, sink_rx) = flume::unbounded();
    let (command_tx, command_rx) = flume::unbounded();

    let sink = RodioSink::new(sink_tx)?;
    let system = AudioSystem::new(api, credentials, Box::new(sink), &config, event_tx);

    info!(playlist_id, "melodeck_started");
    let _ = command_tx.send(AudioCommand::OpenPlaylist {
        id: playlist_id,
        autoplay: true,
    });

    tokio::spawn(print_events(event_rx));
    tokio::spawn(read_commands(command_tx));

    println!("{HELP}");
    system.run(command_rx, sink_rx).await;
    Ok(())
}

fn setup() -> color_eyre::Result<()> {
    color_eyre::install()?;
    dotenv::dotenv().ok();
    set_panic_hook();
    initialize_logging()
}

async fn read_commands(tx: flume::Sender<AudioCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_command(line) {
            Some(command) => {
                let quit = matches!(command, AudioCommand::Shutdown);
                if tx.send(command).is_err() || quit {
                    break;
                }
            }
            None => println!("{HELP}"),
        }
    }
    let _ = tx.send(AudioCommand::Shutdown);
}

fn parse_command(line: &str) -> Option<AudioCommand> {
    let mut parts = line.split_whitespace();
    let verb = parts.next()?;
    let arg = parts.next();

    let command = match (verb, arg) {
        ("next" | "n", None) => AudioCommand::Next,
        ("prev" | "p", None) => AudioCommand::Previous,
        ("pause", None) => AudioCommand::Pause,
        ("resume", None) => AudioCommand::Resume,
        ("toggle" | "t", None) => AudioCommand::TogglePlayPause,
        ("mode" | "m", None) => AudioCommand::CyclePlayMode,
        ("play", Some(n)) => AudioCommand::PlayIndex(n.parse::<usize>().ok()?.checked_sub(1)?),
        ("vol", Some("+")) => AudioCommand::VolumeUp,
        ("vol", Some("-")) => AudioCommand::VolumeDown,
        ("vol", Some(v)) => AudioCommand::SetVolume(v.parse().ok()?),
        ("seek", Some("+")) => AudioCommand::SeekForward,
        ("seek", Some("-")) => AudioCommand::SeekBackward,
        ("seek", Some(s)) => AudioCommand::Seek(s.parse().ok()?),
        ("quality", Some(q)) => AudioCommand::SetQuality(q.parse().ok()?),
        ("comments" | "c", None) => AudioCommand::FetchComments,
        ("sort", Some(s)) => AudioCommand::SetCommentSort(s.parse().ok()?),
        ("like", Some(id)) => AudioCommand::LikeComment {
            comment_id: id.parse().ok()?,
            liked: true,
        },
        ("unlike", Some(id)) => AudioCommand::LikeComment {
            comment_id: id.parse().ok()?,
            liked: false,
        },
        ("quit" | "q", None) => AudioCommand::Shutdown,
        _ => return None,
    };
    Some(command)
}

async fn print_events(rx: flume::Receiver<Event>) {
    let mut lyrics: Option<LyricTrack> = None;

    while let Ok(event) = rx.recv_async().await {
        match event {
            Event::TrackStarted(track) => {
                println!("▶ {} [{}]", describe(&track), format_duration(track.duration_secs()))
            }
            Event::TrackUnavailable(track) => println!("✗ no rights: {}", describe(&track)),
            Event::NothingPlayable => println!("nothing in the queue can be played"),
            Event::StatusChanged(PlaybackStatus::Paused) => println!("paused"),
            Event::QueueLoaded(n) => println!("{n} tracks queued"),
            Event::PlayModeChanged(mode) => println!("mode: {mode:?}"),
            Event::QualityChanged(quality) => println!("quality: {quality}"),
            Event::VolumeChanged(volume) => println!("volume: {:.0}%", volume * 100.0),
            Event::LyricsLoaded(_, track) => lyrics = Some(track),
            Event::LyricLineChanged(Some(index)) => {
                if let Some(line) = lyrics.as_ref().and_then(|l| l.lines().get(index)) {
                    println!("  {}", line.text);
                }
            }
            Event::CommentsFetched {
                loaded,
                total,
                has_more,
                ..
            } => println!(
                "comments: {loaded}/{total}{}",
                if has_more { " (more: `comments`)" } else { "" }
            ),
            Event::CommentLiked { comment_id, liked } => {
                println!("comment {comment_id} {}", if liked { "liked" } else { "unliked" })
            }
            Event::OperationFailed(e) => println!("error: {e}"),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use melodeck::{audio::enums::Quality, model::CommentSortType};

    #[test]
    fn test_parse_command() {
        assert!(matches!(parse_command("next"), Some(AudioCommand::Next)));
        assert!(matches!(parse_command("play 1"), Some(AudioCommand::PlayIndex(0))));
        assert!(parse_command("play 0").is_none());
        assert!(matches!(parse_command("vol 0.3"), Some(AudioCommand::SetVolume(v)) if v == 0.3));
        assert!(matches!(parse_command("vol +"), Some(AudioCommand::VolumeUp)));
        assert!(matches!(
            parse_command("quality lossless"),
            Some(AudioCommand::SetQuality(Quality::Lossless))
        ));
        assert!(matches!(
            parse_command("sort hot"),
            Some(AudioCommand::SetCommentSort(CommentSortType::Hot))
        ));
        assert!(matches!(
            parse_command("like 42"),
            Some(AudioCommand::LikeComment {
                comment_id: 42,
                liked: true
            })
        ));
        assert!(parse_command("seek abc").is_none());
        assert!(parse_command("dance").is_none());
    }
}
