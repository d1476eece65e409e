use anyhow::Context;
use common::telemetry::TelemetryGuard;
use common::{RetryPolicy, retry_with_backoff, setup_logging};
use playback::{BagReader, PlaybackConfig, PlaybackPacing, RecordingOpener};
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    flag,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

const STATUS_INTERVAL: u64 = 30;

fn main() -> anyhow::Result<()> {
    let config = PlaybackConfig::from_env()?;

    // The OTLP exporters need a Tokio runtime alive for as long as the guard.
    let (_runtime, _telemetry) = match config.otlp_endpoint.as_deref() {
        Some(endpoint) => {
            let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
            let guard = rt
                .block_on(async { TelemetryGuard::init("playback", endpoint, config.environment) })
                .context("Failed to initialise OpenTelemetry")?;
            (Some(rt), Some(guard))
        }
        None => {
            setup_logging(config.environment);
            (None, None)
        }
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    flag::register(SIGTERM, Arc::clone(&shutdown))?;
    flag::register(SIGINT, Arc::clone(&shutdown))?;

    tracing::info!("Signal handlers registered (SIGTERM, SIGINT)");

    let mut reader = BagReader::new(RecordingOpener, config.reader.clone())
        .context("Invalid reader configuration")?;

    let open_span = common::span!("open_recording");
    retry_with_backoff(
        || reader.open(&config.recording_path, config.start_offset_us),
        &RetryPolicy::attempts(config.open_attempts),
        "Recording open",
    )
    .with_context(|| format!("Failed to open {}", config.recording_path.display()))?;
    drop(open_span);

    if let Some(metadata) = reader.metadata_json() {
        println!("{}", serde_json::to_string_pretty(&metadata)?);
    }

    let mut pacing = PlaybackPacing::new(config.realtime);
    let mut frames: u64 = 0;
    let mut bytes: u64 = 0;

    tracing::info!(
        capacity = reader.capacity(),
        realtime = pacing.is_enabled(),
        "Playback starting"
    );

    let _playback_span = common::span_debug!("playback");
    while !shutdown.load(Ordering::Relaxed) {
        let Some(frame) = reader.next_frame()? else {
            break;
        };
        pacing.wait(frame.timestamp_us);

        frames += 1;
        bytes += frame.payload.len() as u64;

        if frames.is_multiple_of(STATUS_INTERVAL) {
            tracing::debug!(
                "Status: [Frames: {}] [Position: {}us] [Buffered: {}/{}]",
                frames,
                reader.current_timestamp_us(),
                reader.buffered(),
                reader.capacity()
            );
        }
    }

    tracing::info!(
        frames,
        bytes,
        end_of_stream = reader.is_end_of_stream(),
        "Playback stopped"
    );
    reader.close();
    Ok(())
}
