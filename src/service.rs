//! ReceiverService - owns one adapter and serializes polls and host requests
//!
//! The adapter is not reentrant, so everything that touches it (the periodic
//! refresh, commands, browsing) runs inside this one task. Hosts talk to it
//! through a cloneable [`ServiceHandle`].

use anyhow::Result;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::adapters::receiver::{BrowseMedia, ReceiverAdapter, ReceiverSnapshot};
use crate::adapters::{AdapterCommand, AdapterCommandResponse, AdapterContext};
use crate::bus::{BusEvent, SharedBus};

/// Consecutive failed polls before the receiver is reported unreachable
pub const MAX_CONSECUTIVE_POLL_FAILURES: u32 = 3;

const REQUEST_QUEUE_DEPTH: usize = 32;

const ADAPTER_NAME: &str = "receiver";

enum Request {
    Command(AdapterCommand, oneshot::Sender<AdapterCommandResponse>),
    Browse(Option<String>, oneshot::Sender<Option<BrowseMedia>>),
    Snapshot(oneshot::Sender<ReceiverSnapshot>),
}

pub struct ReceiverService {
    adapter: ReceiverAdapter,
    poll_interval: Duration,
    requests: mpsc::Receiver<Request>,
    last_published: Option<ReceiverSnapshot>,
    consecutive_failures: u32,
}

/// Cloneable handle for sending requests to a running service
#[derive(Clone)]
pub struct ServiceHandle {
    requests: mpsc::Sender<Request>,
    shutdown: CancellationToken,
}

impl ReceiverService {
    pub fn new(
        adapter: ReceiverAdapter,
        poll_interval: Duration,
        shutdown: CancellationToken,
    ) -> (Self, ServiceHandle) {
        let (tx, rx) = mpsc::channel(REQUEST_QUEUE_DEPTH);
        let service = Self {
            adapter,
            poll_interval,
            requests: rx,
            last_published: None,
            consecutive_failures: 0,
        };
        let handle = ServiceHandle {
            requests: tx,
            shutdown,
        };
        (service, handle)
    }

    /// Spawn the service loop on the current runtime.
    pub fn spawn(
        adapter: ReceiverAdapter,
        poll_interval: Duration,
        bus: SharedBus,
    ) -> (ServiceHandle, JoinHandle<Result<()>>) {
        let shutdown = CancellationToken::new();
        let (service, handle) = Self::new(adapter, poll_interval, shutdown.clone());
        let task = tokio::spawn(service.run(AdapterContext { bus, shutdown }));
        (handle, task)
    }

    /// Run until shutdown is triggered or every handle is dropped.
    /// Publishes AdapterStopped on exit.
    pub async fn run(mut self, ctx: AdapterContext) -> Result<()> {
        info!(
            "Receiver service started for {} (poll every {:?})",
            self.adapter.endpoint().host(),
            self.poll_interval
        );

        let mut poll_timer = interval(self.poll_interval);
        poll_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ctx.shutdown.cancelled() => {
                    info!("Receiver service shutting down");
                    break;
                }
                _ = poll_timer.tick() => {
                    self.poll(&ctx.bus).await;
                }
                request = self.requests.recv() => match request {
                    Some(request) => self.handle_request(request, &ctx.bus).await,
                    None => {
                        info!("All receiver handles dropped, stopping service");
                        break;
                    }
                },
            }
        }

        ctx.bus.publish(BusEvent::AdapterStopped {
            adapter: ADAPTER_NAME.to_string(),
        });
        info!("Receiver service stopped");
        Ok(())
    }

    async fn poll(&mut self, bus: &SharedBus) {
        let host = self.adapter.endpoint().host().to_string();
        match self.adapter.refresh().await {
            Ok(()) => {
                if self.consecutive_failures >= MAX_CONSECUTIVE_POLL_FAILURES {
                    info!("Receiver {} reachable again", host);
                    bus.publish(BusEvent::ReceiverRecovered { host });
                } else if self.consecutive_failures > 0 {
                    debug!("Receiver poll succeeded, resetting failure counter");
                }
                self.consecutive_failures = 0;
            }
            Err(e) => {
                self.consecutive_failures += 1;
                match self.consecutive_failures.cmp(&MAX_CONSECUTIVE_POLL_FAILURES) {
                    std::cmp::Ordering::Less => warn!(
                        "Receiver poll failed ({}/{}): {}",
                        self.consecutive_failures, MAX_CONSECUTIVE_POLL_FAILURES, e
                    ),
                    std::cmp::Ordering::Equal => {
                        error!(
                            "Receiver {} unreachable after {} consecutive poll failures: {}",
                            host, self.consecutive_failures, e
                        );
                        bus.publish(BusEvent::ReceiverUnreachable {
                            host,
                            consecutive_failures: self.consecutive_failures,
                        });
                    }
                    std::cmp::Ordering::Greater => debug!("Receiver poll failed: {}", e),
                }
            }
        }
        self.publish_changes(bus);
    }

    async fn handle_request(&mut self, request: Request, bus: &SharedBus) {
        match request {
            Request::Command(command, reply) => {
                let description = format!("{:?}", command);
                let response = self.adapter.handle_command(command).await;
                if let Some(error) = response.error.clone() {
                    bus.publish(BusEvent::CommandFailed {
                        host: self.adapter.endpoint().host().to_string(),
                        command: description,
                        error,
                    });
                }
                let _ = reply.send(response);
            }
            Request::Browse(path, reply) => {
                let media = self.adapter.browse(path.as_deref()).await;
                let _ = reply.send(media);
            }
            Request::Snapshot(reply) => {
                let _ = reply.send(self.adapter.snapshot());
            }
        }
        self.publish_changes(bus);
    }

    /// Diff against the last published snapshot and announce what changed.
    fn publish_changes(&mut self, bus: &SharedBus) {
        let snapshot = self.adapter.snapshot();
        if self.last_published.as_ref() == Some(&snapshot) {
            return;
        }
        let previous = self.last_published.replace(snapshot.clone());
        let host = snapshot.host.clone();

        let volume_changed = previous
            .as_ref()
            .map_or(true, |p| p.volume_level != snapshot.volume_level || p.muted != snapshot.muted);
        if volume_changed {
            bus.publish(BusEvent::VolumeChanged {
                host: host.clone(),
                value: snapshot.volume_level,
                is_muted: snapshot.muted,
            });
        }

        let now_playing_changed = previous
            .as_ref()
            .map_or(true, |p| p.source != snapshot.source || p.media_meta != snapshot.media_meta);
        if now_playing_changed {
            bus.publish(BusEvent::NowPlayingChanged {
                host: host.clone(),
                source: snapshot.source,
                title: snapshot.media_title.clone(),
                artist: snapshot.artist().map(str::to_string),
                album: snapshot.album().map(str::to_string),
            });
        }

        bus.publish(BusEvent::ReceiverUpdated {
            host,
            snapshot: Box::new(snapshot),
        });
    }
}

impl ServiceHandle {
    pub async fn command(&self, command: AdapterCommand) -> AdapterCommandResponse {
        let (tx, rx) = oneshot::channel();
        if self.requests.send(Request::Command(command, tx)).await.is_err() {
            return AdapterCommandResponse::failed("receiver service stopped");
        }
        rx.await
            .unwrap_or_else(|_| AdapterCommandResponse::failed("receiver service stopped"))
    }

    pub async fn browse(&self, path: Option<&str>) -> Option<BrowseMedia> {
        let (tx, rx) = oneshot::channel();
        self.requests
            .send(Request::Browse(path.map(str::to_string), tx))
            .await
            .ok()?;
        rx.await.ok().flatten()
    }

    pub async fn snapshot(&self) -> Option<ReceiverSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.requests.send(Request::Snapshot(tx)).await.ok()?;
        rx.await.ok()
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
