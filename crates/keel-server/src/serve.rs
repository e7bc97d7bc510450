//! The command loop.
//!
//! Each input line is one JSON [`Command`]. Commands run concurrently, up
//! to a fixed limit; replies are written one JSON object per line in
//! completion order. Lines that are not valid commands carry no id to
//! reply to, so they are logged and skipped.

use std::collections::HashMap;
use std::sync::Arc;

use keel_command::{Command, Dispatcher, Reply};
use keel_core::repository::Store;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{self, JoinError, JoinSet};
use tracing::{debug, error, info, warn};

/// What one run of [`serve`] processed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ServeSummary {
    pub dispatched: usize,
    pub skipped: usize,
}

/// Read commands from `input` until EOF and write their replies to
/// `output`. Returns once every dispatched command has replied.
///
/// A command whose task panics still gets an `ERROR` reply.
pub async fn serve<S, R, W>(
    dispatcher: Arc<Dispatcher<S>>,
    input: R,
    output: W,
    max_concurrency: usize,
) -> anyhow::Result<ServeSummary>
where
    S: Store,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let permits = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let (tx, rx) = mpsc::channel::<Reply>(max_concurrency.max(1));
    let writer = tokio::spawn(write_replies(rx, output));

    let mut summary = ServeSummary::default();
    let mut in_flight = JoinSet::new();
    // Id and type of every running command, without its payload.
    let mut pending: HashMap<task::Id, Command> = HashMap::new();
    let mut lines = input.lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => line,
                None => break,
            },
            Some(joined) = in_flight.join_next_with_id(), if !in_flight.is_empty() => {
                settle(joined, &mut pending, &tx).await;
                continue;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let command: Command = match serde_json::from_str(line) {
            Ok(command) => command,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable command line");
                summary.skipped += 1;
                continue;
            }
        };

        let permit = permits.clone().acquire_owned().await?;
        let header = Command {
            id: command.id.clone(),
            command_type: command.command_type,
            payload: serde_json::Value::Null,
        };
        let dispatcher = dispatcher.clone();
        let reply_tx = tx.clone();
        summary.dispatched += 1;
        let handle = in_flight.spawn(async move {
            let reply = dispatcher.dispatch(command).await;
            if reply_tx.send(reply).await.is_err() {
                error!("Reply writer stopped; dropping reply");
            }
            drop(permit);
        });
        pending.insert(handle.id(), header);
    }

    while let Some(joined) = in_flight.join_next_with_id().await {
        settle(joined, &mut pending, &tx).await;
    }
    drop(tx);
    writer.await??;

    info!(
        dispatched = summary.dispatched,
        skipped = summary.skipped,
        "Input exhausted"
    );
    Ok(summary)
}

/// Forget a finished task. A task that died before replying gets its
/// `ERROR` reply here.
async fn settle(
    joined: Result<(task::Id, ()), JoinError>,
    pending: &mut HashMap<task::Id, Command>,
    tx: &mpsc::Sender<Reply>,
) {
    let (id, failure) = match joined {
        Ok((id, ())) => (id, None),
        Err(e) => (e.id(), Some(e)),
    };
    let Some(command) = pending.remove(&id) else {
        return;
    };
    let Some(failure) = failure else {
        return;
    };

    error!(
        command_id = %command.id,
        command_type = %command.command_type,
        error = %failure,
        "Command task panicked"
    );
    let reply = Reply::error(&command, "Command processing aborted unexpectedly");
    if tx.send(reply).await.is_err() {
        error!("Reply writer stopped; dropping reply");
    }
}

async fn write_replies<W>(mut rx: mpsc::Receiver<Reply>, mut output: W) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(reply) = rx.recv().await {
        let mut line = serde_json::to_vec(&reply)?;
        line.push(b'\n');
        output.write_all(&line).await?;
        output.flush().await?;
        debug!(command_id = %reply.command_id, status = ?reply.status, "Reply written");
    }
    Ok(())
}
