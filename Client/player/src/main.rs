mod args;

use abr_player::clock::WallClock;
use abr_player::sink::NullSink;
use abr_player::transport::HttpTransport;
use abr_player::{Player, PlayerEvent, PlayerOptions};
use args::{get_log_level_filter, parse_args};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, Layer};

#[tokio::main]
async fn main() {
    let args = parse_args();

    // Build the FmtSubscriber layer
    let fmt_layer = tracing_subscriber::fmt::layer()
        .pretty()
        .compact()
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_filter(get_log_level_filter(&args));

    let subscriber = tracing_subscriber::registry().with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default subscriber");

    info!("Starting ABR client (headless)");
    info!("{:?}", args);

    let options = PlayerOptions {
        update_interval: Duration::from_millis(args.interval_ms),
        lookahead_secs: args.lookahead,
        history_window: args.window,
        ..PlayerOptions::default()
    };

    let callback = Arc::new(|event: PlayerEvent| match event {
        PlayerEvent::SegmentAppended {
            content_type,
            representation_id,
            segment_index,
            size,
            ..
        } => {
            info!(
                "Appended {} segment {} from {} ({} bytes)",
                content_type, segment_index, representation_id, size
            );
        }
        PlayerEvent::RepresentationSwitched {
            content_type,
            from,
            to,
        } => {
            info!("{} representation switched: {} -> {}", content_type, from, to);
        }
        PlayerEvent::DownloadError { url, reason } => {
            error!("Error downloading {}: {}", url, reason);
        }
        PlayerEvent::TrackFailed {
            content_type,
            reason,
        } => {
            error!("{} track failed: {}", content_type, reason);
        }
        PlayerEvent::Warning(msg) => {
            warn!("Warning: {}", msg);
        }
        PlayerEvent::EndOfStream => {
            info!("End of stream");
        }
    });

    let clock = Arc::new(WallClock::new());
    let mut player = match Player::load(
        &args.manifest_url,
        Arc::new(HttpTransport::default()),
        clock.clone(),
        callback,
        options,
    )
    .await
    {
        Ok(player) => player,
        Err(e) => {
            error!("Failed to load manifest: {e}");
            return;
        }
    };
    info!("Player initialized");

    if let Err(e) = player.start(|_| Box::new(NullSink::new())).await {
        error!("Failed to start playback: {e}");
        return;
    }
    clock.play();
    info!("Player started");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            _ = tokio::time::sleep(Duration::from_secs(1)) => {
                if player.has_ended() {
                    info!("Playback finished");
                    break;
                }
            }
        }
    }

    player.stop();
}
