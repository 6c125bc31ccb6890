//! Sync session: pull records from a Stripe resource, write them to a sink
//! and checkpoint the position as they go.

use anyhow::Context;
use checkpoint::{Checkpoint, CheckpointStore, FilesystemStore, SyncManager};
use stripe_sync_source::{
    ChangeIterator, IntervalTimer, Next, PollTimer, Position, RemoteDataSource, SourceOpts,
    StripeClient,
};
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::{RunLimits, RunOpts};
use crate::sink::{JsonlSink, RecordSink};

/// Why a session ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    MaxRecords,
    Timeout,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    pub records: u64,
    pub stop: StopReason,
    /// Last stored position.
    pub position: Position,
}

/// Run a sync session for one resource until it is interrupted, times out or
/// reaches `--max-records`.
pub async fn sync(source_opts: SourceOpts, run_opts: RunOpts) -> anyhow::Result<()> {
    let limits = run_opts.limits()?;
    let poll_interval = run_opts.poll_interval()?;

    let client = StripeClient::new(&source_opts).context("Invalid source options")?;
    let iterator_opts = source_opts.iterator_opts()?;
    let stream = source_opts.resource_name.clone();

    let manager = SyncManager::new(FilesystemStore::new(&run_opts.checkpoint_dir));
    let position = resolve_start_position(run_opts.position.as_deref(), &manager, &stream).await?;

    info!("Starting sync of '{}' from {}", stream, position);
    info!("Waiting for changes... (Press Ctrl+C to stop)");

    let mut iter = ChangeIterator::new(
        client,
        position,
        iterator_opts,
        IntervalTimer::new(poll_interval),
    );
    let shutdown = setup_shutdown_handler();

    let summary = match &run_opts.output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?;
            let mut sink = JsonlSink::new(std::io::BufWriter::new(file));
            run_sync(&mut iter, &mut sink, &manager, &stream, limits, shutdown).await?
        }
        None => {
            let mut sink = JsonlSink::new(std::io::stdout());
            run_sync(&mut iter, &mut sink, &manager, &stream, limits, shutdown).await?
        }
    };

    info!(
        "Sync of '{}' stopped ({:?}) after {} records at {}",
        stream, summary.stop, summary.records, summary.position
    );
    Ok(())
}

/// Position to start from: an explicit token wins over the stored
/// checkpoint, and without either a new session starts now.
pub async fn resolve_start_position<S: CheckpointStore>(
    explicit: Option<&str>,
    manager: &SyncManager<S>,
    stream: &str,
) -> anyhow::Result<Position> {
    if let Some(token) = explicit {
        let position = Position::from_cli_string(token)
            .with_context(|| format!("Invalid position token: {token}"))?;
        info!("Using position from the command line: {}", position);
        return Ok(position);
    }

    match manager
        .read_checkpoint::<Position>(stream)
        .await
        .with_context(|| format!("Failed to read checkpoint for '{stream}'"))?
    {
        Some(position) => {
            info!("Resuming '{}' from stored checkpoint", stream);
            Ok(position)
        }
        None => {
            let position = Position::decode(None)?;
            info!(
                "No checkpoint for '{}', starting a new session with watermark {}",
                stream, position.watermark
            );
            Ok(position)
        }
    }
}

/// Drive `iter` into `sink` until one of the limits is hit or `shutdown`
/// fires.
///
/// The position is stored after every `checkpoint_every` records and once
/// more when the session stops. A remote error ends the session without
/// storing anything further, leaving the last checkpoint in place.
pub async fn run_sync<S, T, K, C>(
    iter: &mut ChangeIterator<S, T>,
    sink: &mut K,
    manager: &SyncManager<C>,
    stream: &str,
    limits: RunLimits,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<SyncSummary>
where
    S: RemoteDataSource,
    T: PollTimer,
    K: RecordSink,
    C: CheckpointStore,
{
    let deadline = limits.timeout.map(|t| Instant::now() + t);
    let mut records = 0u64;
    let mut unsaved = 0u64;

    let stop = loop {
        if limits.max_records.is_some_and(|max| records >= max) {
            info!("Reached the maximum of {} records", records);
            break StopReason::MaxRecords;
        }

        let next = tokio::select! {
            _ = shutdown.recv() => {
                info!("Received shutdown signal");
                break StopReason::Shutdown;
            }
            _ = wait_for_deadline(deadline) => {
                info!("Timeout reached, stopping sync of '{}'", stream);
                break StopReason::Timeout;
            }
            next = iter.next() => next.with_context(|| format!("Failed to read changes for '{stream}'"))?,
        };

        match next {
            Next::Record(record) => {
                sink.write(&record).await?;
                records += 1;
                unsaved += 1;

                if unsaved >= limits.checkpoint_every {
                    store_position(sink, manager, stream, &record.position).await?;
                    unsaved = 0;
                }
            }
            Next::RetryLater => {
                debug!("No new changes for '{}'", stream);
            }
        }
    };

    let position = iter.position().clone();
    store_position(sink, manager, stream, &position).await?;

    Ok(SyncSummary {
        records,
        stop,
        position,
    })
}

async fn store_position<K: RecordSink, C: CheckpointStore>(
    sink: &mut K,
    manager: &SyncManager<C>,
    stream: &str,
    position: &Position,
) -> anyhow::Result<()> {
    // Records must be durable before the position that skips them is.
    sink.flush().await?;
    manager
        .save_checkpoint(stream, position)
        .await
        .with_context(|| format!("Failed to store checkpoint for '{stream}'"))
}

async fn wait_for_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Sets up a shutdown signal handler
fn setup_shutdown_handler() -> broadcast::Receiver<()> {
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install CTRL+C signal handler: {e}");
            return;
        }

        info!("Received interrupt signal (Ctrl+C)");
        let _ = shutdown_tx.send(());
    });

    shutdown_rx
}
