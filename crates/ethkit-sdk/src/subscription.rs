//! Historical-then-live event subscriptions

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ethkit_types::{Log, LogFilter};
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::abi::{EventDef, Token};
use crate::node::{LogFeed, NodeFacade};
use crate::{PipelineConfig, SdkError};

/// Maps a raw log onto a typed event
pub trait EventDecoder: Send + Sync {
    type Event: Send;

    fn decode(&self, log: &Log) -> Result<Self::Event, SdkError>;
}

impl EventDecoder for EventDef {
    type Event = Vec<Token>;

    fn decode(&self, log: &Log) -> Result<Vec<Token>, SdkError> {
        self.decode_log(log)
    }
}

impl<E, F> EventDecoder for F
where
    F: Fn(&Log) -> Result<E, SdkError> + Send + Sync,
    E: Send,
{
    type Event = E;

    fn decode(&self, log: &Log) -> Result<E, SdkError> {
        self(log)
    }
}

/// A decoded event together with the log it came from
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent<E> {
    pub log: Log,
    pub event: E,
}

impl<E> LogEvent<E> {
    /// `(block_number, log_index)`
    pub fn position(&self) -> (u64, u64) {
        self.log.position()
    }
}

/// Lifecycle of an [`EventSubscription`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Waiting on buffered and live entries
    Streaming,
    /// Feed ended; handing out what is left in the buffer
    Draining,
    /// Feed ended cleanly and the buffer is empty
    Exhausted,
    /// Feed or decoder failed; see [`EventSubscription::error`]
    Failed,
}

#[derive(Debug)]
struct Shared {
    closed: AtomicBool,
    cancel: watch::Sender<bool>,
}

/// Cloneable handle that closes a subscription from any task
#[derive(Debug, Clone)]
pub struct CloseHandle {
    shared: Arc<Shared>,
}

impl CloseHandle {
    fn new() -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                closed: AtomicBool::new(false),
                cancel,
            }),
        }
    }

    /// Close the subscription. Returns `false` if it was already closed.
    pub fn close(&self) -> bool {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.shared.cancel.send_replace(true);
        true
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.shared.cancel.subscribe()
    }
}

/// Stream of decoded logs: everything already on chain that matches the filter,
/// in `(block, log index)` order, followed by new entries as they arrive.
///
/// Logs the node marks as `removed` (retracted by a reorg) are not delivered.
pub struct EventSubscription<D: EventDecoder> {
    decoder: D,
    buffer: mpsc::Receiver<Log>,
    errors: mpsc::Receiver<SdkError>,
    state: SubscriptionState,
    error: Option<SdkError>,
    handle: CloseHandle,
    closed: watch::Receiver<bool>,
}

impl<D: EventDecoder> EventSubscription<D> {
    /// Open with the default buffer size
    pub async fn open(
        node: &dyn NodeFacade,
        filter: LogFilter,
        decoder: D,
    ) -> Result<Self, SdkError> {
        Self::open_with_config(node, filter, decoder, &PipelineConfig::default()).await
    }

    pub async fn open_with_config(
        node: &dyn NodeFacade,
        filter: LogFilter,
        decoder: D,
        config: &PipelineConfig,
    ) -> Result<Self, SdkError> {
        // Subscribe before querying so nothing mined in between is missed
        let feed = node.subscribe_logs(&filter).await.map_err(|e| match e {
            SdkError::Subscription(_) => e,
            other => SdkError::Subscription(format!("cannot open log feed: {other}")),
        })?;

        let mut history = node.get_logs(&filter).await?;
        history.sort_by_key(Log::position);
        debug!(historical = history.len(), "subscription opened");

        let (buffer_tx, buffer) = mpsc::channel(config.log_buffer.max(1));
        let (errors_tx, errors) = mpsc::channel(1);
        let handle = CloseHandle::new();

        tokio::spawn(pump(feed, history, buffer_tx, errors_tx, handle.subscribe()));

        Ok(Self {
            decoder,
            buffer,
            errors,
            state: SubscriptionState::Streaming,
            error: None,
            closed: handle.subscribe(),
            handle,
        })
    }

    /// Next event, or `None` once the subscription is closed, exhausted or failed
    pub async fn next(&mut self) -> Option<LogEvent<D::Event>> {
        loop {
            if self.handle.is_closed() {
                return None;
            }
            match self.state {
                SubscriptionState::Exhausted | SubscriptionState::Failed => return None,
                SubscriptionState::Draining => match self.buffer.try_recv() {
                    Ok(log) => return self.deliver(log),
                    Err(_) => {
                        self.finish();
                        return None;
                    }
                },
                SubscriptionState::Streaming => {
                    tokio::select! {
                        log = self.buffer.recv() => match log {
                            Some(log) => return self.deliver(log),
                            None => {
                                let err = self.errors.try_recv().ok();
                                self.terminated(err);
                            }
                        },
                        err = self.errors.recv() => self.terminated(err),
                        _ = cancelled(&mut self.closed) => return None,
                    }
                }
            }
        }
    }

    /// Forward events into `sink` until `cancel` flips, the sink goes away or the
    /// feed ends. A feed failure is returned. The subscription is closed on exit.
    pub async fn watch(
        &mut self,
        sink: mpsc::Sender<LogEvent<D::Event>>,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<(), SdkError> {
        let result = self.forward(&sink, &mut cancel).await;
        self.close();
        result
    }

    async fn forward(
        &mut self,
        sink: &mpsc::Sender<LogEvent<D::Event>>,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<(), SdkError> {
        while self.state == SubscriptionState::Streaming && !self.handle.is_closed() {
            // Cancellation wins over a busy feed
            tokio::select! {
                biased;
                _ = cancelled(cancel) => return Ok(()),
                _ = cancelled(&mut self.closed) => return Ok(()),
                log = self.buffer.recv() => match log {
                    Some(log) => {
                        let event = self.decode(log)?;
                        tokio::select! {
                            sent = sink.send(event) => if sent.is_err() { return Ok(()) },
                            _ = cancelled(cancel) => return Ok(()),
                        }
                    }
                    None => {
                        if let Ok(e) = self.errors.try_recv() {
                            return Err(self.feed_failed(e));
                        }
                        self.state = SubscriptionState::Draining;
                    }
                },
                err = self.errors.recv() => match err {
                    Some(e) => return Err(self.feed_failed(e)),
                    None => self.state = SubscriptionState::Draining,
                },
            }
        }

        if self.state == SubscriptionState::Draining {
            while let Ok(log) = self.buffer.try_recv() {
                let event = self.decode(log)?;
                tokio::select! {
                    sent = sink.send(event) => if sent.is_err() { return Ok(()) },
                    _ = cancelled(cancel) => return Ok(()),
                }
            }
            self.finish();
        }

        match (&self.state, &self.error) {
            (SubscriptionState::Failed, Some(e)) => Err(e.clone()),
            _ => Ok(()),
        }
    }

    /// Error that moved the subscription to [`SubscriptionState::Failed`]
    pub fn error(&self) -> Option<&SdkError> {
        self.error.as_ref()
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    /// Handle for closing from another task
    pub fn close_handle(&self) -> CloseHandle {
        self.handle.clone()
    }

    /// Stop the pump and release the node-side feed. Safe to call repeatedly.
    pub fn close(&self) {
        if self.handle.close() {
            debug!("subscription closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }

    fn terminated(&mut self, err: Option<SdkError>) {
        if let Some(e) = err {
            warn!(error = %e, "log feed failed");
            self.error = Some(e);
        } else {
            debug!("log feed ended");
        }
        self.state = SubscriptionState::Draining;
    }

    fn feed_failed(&mut self, e: SdkError) -> SdkError {
        warn!(error = %e, "log feed failed");
        self.error = Some(e.clone());
        self.state = SubscriptionState::Failed;
        e
    }

    fn finish(&mut self) {
        self.state = if self.error.is_some() {
            SubscriptionState::Failed
        } else {
            SubscriptionState::Exhausted
        };
        self.close();
    }

    fn decode(&mut self, log: Log) -> Result<LogEvent<D::Event>, SdkError> {
        match self.decoder.decode(&log) {
            Ok(event) => Ok(LogEvent { log, event }),
            Err(e) => {
                let e = match e {
                    SdkError::Decode(_) => e,
                    other => SdkError::Decode(other.to_string()),
                };
                warn!(
                    block = log.block_number,
                    log_index = log.log_index,
                    error = %e,
                    "undecodable log, subscription failed"
                );
                self.error = Some(e.clone());
                self.state = SubscriptionState::Failed;
                self.close();
                Err(e)
            }
        }
    }

    fn deliver(&mut self, log: Log) -> Option<LogEvent<D::Event>> {
        self.decode(log).ok()
    }
}

impl<D: EventDecoder> Drop for EventSubscription<D> {
    fn drop(&mut self) {
        self.handle.close();
    }
}

impl<D: EventDecoder> fmt::Debug for EventSubscription<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSubscription")
            .field("state", &self.state)
            .field("error", &self.error)
            .field("closed", &self.handle.is_closed())
            .finish_non_exhaustive()
    }
}

/// Resolves once `rx` reads `true`; never resolves if the sender is gone without it.
pub(crate) async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Moves history then live entries into the buffer. Dropping `feed` on return
/// releases the node-side subscription.
async fn pump(
    mut feed: LogFeed,
    history: Vec<Log>,
    buffer: mpsc::Sender<Log>,
    errors: mpsc::Sender<SdkError>,
    mut cancel: watch::Receiver<bool>,
) {
    let last_historical = history.last().map(Log::position);

    for log in history {
        if !push(&buffer, log, &mut cancel).await {
            return;
        }
    }

    loop {
        tokio::select! {
            log = feed.logs.recv() => match log {
                Some(log) => {
                    if last_historical.is_some_and(|last| log.position() <= last) {
                        continue;
                    }
                    if !push(&buffer, log, &mut cancel).await {
                        return;
                    }
                }
                None => {
                    tokio::select! {
                        err = feed.errors.recv() => {
                            if let Some(e) = err {
                                forward_error(&errors, e).await;
                            }
                        }
                        _ = cancelled(&mut cancel) => {}
                    }
                    return;
                }
            },
            err = feed.errors.recv() => {
                // Entries the feed produced before failing still go out first
                while let Ok(log) = feed.logs.try_recv() {
                    if last_historical.is_some_and(|last| log.position() <= last) {
                        continue;
                    }
                    if !push(&buffer, log, &mut cancel).await {
                        return;
                    }
                }
                if let Some(e) = err {
                    forward_error(&errors, e).await;
                }
                return;
            }
            _ = cancelled(&mut cancel) => return,
        }
    }
}

async fn forward_error(errors: &mpsc::Sender<SdkError>, e: SdkError) {
    if let Err(dropped) = errors.send(e).await {
        debug!(error = %dropped.0, "feed error dropped, subscription gone");
    }
}

async fn push(buffer: &mpsc::Sender<Log>, log: Log, cancel: &mut watch::Receiver<bool>) -> bool {
    if log.removed {
        debug!(block = log.block_number, index = log.log_index, "skipping retracted log");
        return true;
    }
    tokio::select! {
        sent = buffer.send(log) => sent.is_ok(),
        _ = cancelled(cancel) => false,
    }
}
