// SPDX-License-Identifier: MIT

//! The capture framework: command dispatch, the outbound frame ring, and
//! the channel-hop timer.
//!
//! One bounded channel feeds a single writer task that owns the out-fd;
//! its capacity is the ring buffer the capture thread pushes against. The
//! command reader runs as its own task so a slow hop tick can never tear a
//! frame in half.

pub mod proto;

use std::os::fd::{FromRawFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::channel::ChannelDescriptor;

use self::proto::{
    ConfigureCommand, ConfigureResponse, DeviceRecord, Frame, FrameKind,
    ListResponse, MessageLevel, OpenCommand, OpenResponse, ProbeCommand,
    ProbeResponse,
};

/// Outbound ring capacity, in frames.
const RING_FRAMES: usize = 1024;

/// Visit every 4th channel while hopping so consecutive tunes land in
/// different parts of the 2.4 GHz overlap. Harmless on 5 GHz.
pub const HOP_SHUFFLE_SPACING: usize = 4;

#[derive(Clone, Default)]
pub(crate) struct Shutdown(Arc<ShutdownState>);

#[derive(Default)]
struct ShutdownState {
    flag: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    fn trigger(&self) {
        self.0.flag.store(true, Ordering::SeqCst);
        self.0.notify.notify_waiters();
    }

    fn is_set(&self) -> bool {
        self.0.flag.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        loop {
            let notified = self.0.notify.notified();
            if self.is_set() {
                return;
            }
            notified.await;
        }
    }
}

/// Outcome of a non-blocking data send from the capture thread.
pub enum SendOutcome {
    Sent,
    /// The ring is full; the frame comes back so the caller can park in
    /// [`FrameworkHandle::wait_ring`] and retry it.
    BufferFull(Frame),
    /// The protocol channel is gone.
    Failed,
}

/// Outcome of a channel-set callback, as seen by the event loop.
#[derive(Debug, PartialEq, Eq)]
pub enum ChannelSetOutcome {
    Continue,
    Fatal(String),
}

/// The capture callbacks a datasource provides.
///
/// `open` hands back a ready [`OpenResponse`]; the framework then asks for
/// the capture worker via `start_capture`. All methods run on the event
/// loop except the thread `start_capture` spawns.
#[allow(async_fn_in_trait)]
pub trait DataSource {
    async fn list(
        &mut self,
        fw: &FrameworkHandle,
    ) -> Result<Vec<DeviceRecord>, String>;

    async fn probe(
        &mut self,
        fw: &FrameworkHandle,
        definition: &str,
    ) -> Result<Vec<String>, String>;

    async fn open(
        &mut self,
        fw: &FrameworkHandle,
        definition: &str,
    ) -> Result<OpenResponse, String>;

    /// Pure translation of a channel string; informational notes are
    /// surfaced by the framework.
    fn translate_channel(
        &self,
        chanstr: &str,
    ) -> Result<(ChannelDescriptor, Vec<String>), String>;

    async fn set_channel(
        &mut self,
        fw: &FrameworkHandle,
        channel: &ChannelDescriptor,
        seqno: u32,
    ) -> ChannelSetOutcome;

    fn start_capture(
        &mut self,
        fw: FrameworkHandle,
    ) -> Result<std::thread::JoinHandle<()>, String>;
}

/// Cloneable handle for pushing frames at the parent.
#[derive(Clone)]
pub struct FrameworkHandle {
    tx: mpsc::Sender<Frame>,
    shutdown: Shutdown,
}

impl FrameworkHandle {
    pub async fn send_frame(&self, frame: Frame) {
        if self.tx.send(frame).await.is_err() {
            self.shutdown.trigger();
        }
    }

    pub async fn send_message(&self, level: MessageLevel, msg: impl Into<String>) {
        let msg = msg.into();
        match level {
            MessageLevel::Info => info!("{msg}"),
            MessageLevel::Error => error!("{msg}"),
        }
        if let Ok(frame) = Frame::message(level, msg) {
            self.send_frame(frame).await;
        }
    }

    /// Unsolicited fatal error frame.
    pub async fn send_error(&self, msg: impl Into<String>) {
        let msg = msg.into();
        error!("{msg}");
        if let Ok(frame) = Frame::fatal_error(msg) {
            self.send_frame(frame).await;
        }
    }

    /// Blocking variant of [`Self::send_error`] for the capture thread.
    pub fn blocking_error(&self, msg: impl Into<String>) {
        let msg = msg.into();
        error!("{msg}");
        if let Ok(frame) = Frame::fatal_error(msg) {
            let _ = self.tx.blocking_send(frame);
        }
    }

    /// Try to queue a data frame without blocking.
    pub fn try_send_data(&self, frame: Frame) -> SendOutcome {
        match self.tx.try_send(frame) {
            Ok(()) => SendOutcome::Sent,
            Err(TrySendError::Full(frame)) => SendOutcome::BufferFull(frame),
            Err(TrySendError::Closed(_)) => SendOutcome::Failed,
        }
    }

    /// Park until the writer has drained enough of the ring to accept the
    /// frame, then deliver it. The frame is sent exactly once.
    pub fn wait_ring(&self, frame: Frame) -> Result<(), ()> {
        self.tx.blocking_send(frame).map_err(|_| ())
    }

    /// Begin an orderly shutdown of the whole process.
    pub fn spindown(&self) {
        self.shutdown.trigger();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_set()
    }
}

struct HopState {
    channels: Vec<ChannelDescriptor>,
    order: Vec<usize>,
    pos: usize,
    period: Duration,
    next_at: Instant,
}

impl HopState {
    fn new(channels: Vec<ChannelDescriptor>, rate: f64, spacing: usize) -> Self {
        let period = if rate > 0.0 {
            Duration::from_secs_f64((1.0 / rate).clamp(0.01, 60.0))
        } else {
            Duration::from_secs(1)
        };
        let order = hop_order(channels.len(), spacing);
        HopState {
            channels,
            order,
            pos: 0,
            period,
            next_at: Instant::now() + period,
        }
    }

    fn advance(&mut self) -> ChannelDescriptor {
        let chan = self.channels[self.order[self.pos]];
        self.pos = (self.pos + 1) % self.order.len();
        self.next_at = Instant::now() + self.period;
        chan
    }
}

/// Visit order for hopping: stride through the list so neighbouring tunes
/// are spaced apart, degrading to a plain walk whenever the stride would
/// not cover every channel.
fn hop_order(len: usize, spacing: usize) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }
    let stride = if spacing > 1 && gcd(len, spacing) == 1 {
        spacing
    } else {
        1
    };
    (0..len).map(|i| (i * stride) % len).collect()
}

fn gcd(a: usize, b: usize) -> usize {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

enum LoopEvent {
    Command(Option<Frame>),
    HopTick,
}

pub struct CaptureFramework<S> {
    source: S,
    handle: FrameworkHandle,
    frames: mpsc::Receiver<Frame>,
    in_fd: RawFd,
    out_fd: RawFd,
    hop_shuffle_spacing: usize,
}

impl<S: DataSource> CaptureFramework<S> {
    pub fn new(in_fd: RawFd, out_fd: RawFd, source: S) -> Self {
        let (tx, frames) = mpsc::channel(RING_FRAMES);
        CaptureFramework {
            source,
            handle: FrameworkHandle {
                tx,
                shutdown: Shutdown::default(),
            },
            frames,
            in_fd,
            out_fd,
            hop_shuffle_spacing: HOP_SHUFFLE_SPACING,
        }
    }

    pub fn set_hop_shuffle_spacing(&mut self, spacing: usize) {
        self.hop_shuffle_spacing = spacing.max(1);
    }

    /// Run the command loop until spin-down, returning the datasource so
    /// the caller can finish teardown.
    pub async fn run(self) -> S {
        let CaptureFramework {
            mut source,
            handle,
            frames,
            in_fd,
            out_fd,
            hop_shuffle_spacing,
        } = self;

        // The parent hands these descriptors to us on exec; they are ours
        // from here on.
        let in_file = unsafe { std::fs::File::from_raw_fd(in_fd) };
        let out_file = unsafe { std::fs::File::from_raw_fd(out_fd) };

        let writer = tokio::spawn(write_frames(
            frames,
            tokio::fs::File::from_std(out_file),
            handle.shutdown.clone(),
        ));

        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
        let reader_shutdown = handle.shutdown.clone();
        let reader = tokio::spawn(async move {
            let mut in_file = tokio::fs::File::from_std(in_file);
            loop {
                match Frame::read_from(&mut in_file).await {
                    Ok(Some(frame)) => {
                        if cmd_tx.send(frame).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        debug!("command channel closed by parent");
                        reader_shutdown.trigger();
                        break;
                    }
                    Err(e) => {
                        error!("failed reading the command channel: {e}");
                        reader_shutdown.trigger();
                        break;
                    }
                }
            }
        });

        let mut hop: Option<HopState> = None;
        let mut capture_thread: Option<std::thread::JoinHandle<()>> = None;

        loop {
            let deadline = hop.as_ref().map(|h| h.next_at);
            let event = tokio::select! {
                _ = handle.shutdown.wait() => break,
                event = next_event(&mut cmd_rx, deadline) => event,
            };

            match event {
                LoopEvent::Command(None) => {
                    handle.shutdown.trigger();
                    break;
                }
                LoopEvent::Command(Some(frame)) => {
                    dispatch(
                        &mut source,
                        &handle,
                        frame,
                        &mut hop,
                        &mut capture_thread,
                        hop_shuffle_spacing,
                    )
                    .await;
                }
                LoopEvent::HopTick => {
                    if let Some(state) = hop.as_mut() {
                        let chan = state.advance();
                        if let ChannelSetOutcome::Fatal(msg) =
                            source.set_channel(&handle, &chan, 0).await
                        {
                            handle.send_error(msg).await;
                            handle.spindown();
                        }
                    }
                }
            }

            if handle.shutdown.is_set() {
                break;
            }
        }

        reader.abort();
        if let Some(thread) = capture_thread {
            // Unblocks within one pcap read timeout.
            let _ = thread.join();
        }
        // Closing our sender lets the writer drain and exit; the capture
        // thread's clone is already gone.
        drop(handle);
        let _ = writer.await;
        source
    }
}

async fn next_event(
    cmd_rx: &mut mpsc::UnboundedReceiver<Frame>,
    deadline: Option<Instant>,
) -> LoopEvent {
    match deadline {
        Some(deadline) => {
            match tokio::time::timeout_at(deadline, cmd_rx.recv()).await {
                Ok(cmd) => LoopEvent::Command(cmd),
                Err(_) => LoopEvent::HopTick,
            }
        }
        None => LoopEvent::Command(cmd_rx.recv().await),
    }
}

async fn write_frames(
    mut frames: mpsc::Receiver<Frame>,
    mut out: tokio::fs::File,
    shutdown: Shutdown,
) {
    while let Some(frame) = frames.recv().await {
        if let Err(e) = out.write_all(&frame.encode()).await {
            error!("failed writing to the data channel: {e}");
            shutdown.trigger();
            break;
        }
    }
    let _ = out.flush().await;
}

async fn dispatch<S: DataSource>(
    source: &mut S,
    handle: &FrameworkHandle,
    frame: Frame,
    hop: &mut Option<HopState>,
    capture_thread: &mut Option<std::thread::JoinHandle<()>>,
    hop_shuffle_spacing: usize,
) {
    let seqno = frame.seqno;
    match frame.kind {
        FrameKind::List => {
            let resp = match source.list(handle).await {
                Ok(devices) => ListResponse {
                    success: true,
                    msg: format!("{} interfaces found", devices.len()),
                    devices,
                },
                Err(msg) => ListResponse {
                    success: false,
                    msg,
                    devices: vec![],
                },
            };
            respond(handle, FrameKind::ListResp, seqno, &resp).await;
        }
        FrameKind::Probe => {
            let resp = match frame
                .decode_json::<ProbeCommand>()
                .map_err(|e| e.to_string())
            {
                Ok(cmd) => match source.probe(handle, &cmd.definition).await {
                    Ok(channels) => ProbeResponse {
                        success: true,
                        msg: format!("{} channels", channels.len()),
                        channels,
                    },
                    Err(msg) => ProbeResponse {
                        success: false,
                        msg,
                        channels: vec![],
                    },
                },
                Err(msg) => ProbeResponse {
                    success: false,
                    msg,
                    channels: vec![],
                },
            };
            respond(handle, FrameKind::ProbeResp, seqno, &resp).await;
        }
        FrameKind::Open => {
            let cmd = match frame.decode_json::<OpenCommand>() {
                Ok(cmd) => cmd,
                Err(e) => {
                    let resp = OpenResponse {
                        success: false,
                        msg: e.to_string(),
                        ..Default::default()
                    };
                    respond(handle, FrameKind::OpenResp, seqno, &resp).await;
                    return;
                }
            };
            match source.open(handle, &cmd.definition).await {
                Ok(resp) => {
                    respond(handle, FrameKind::OpenResp, seqno, &resp).await;
                    match source.start_capture(handle.clone()) {
                        Ok(thread) => *capture_thread = Some(thread),
                        Err(msg) => {
                            handle.send_error(msg).await;
                            handle.spindown();
                        }
                    }
                }
                Err(msg) => {
                    let resp = OpenResponse {
                        success: false,
                        msg,
                        ..Default::default()
                    };
                    respond(handle, FrameKind::OpenResp, seqno, &resp).await;
                }
            }
        }
        FrameKind::Configure => {
            let cmd = match frame.decode_json::<ConfigureCommand>() {
                Ok(cmd) => cmd,
                Err(e) => {
                    let resp = ConfigureResponse {
                        success: false,
                        msg: e.to_string(),
                        channel: String::new(),
                    };
                    respond(handle, FrameKind::ConfigureResp, seqno, &resp)
                        .await;
                    return;
                }
            };
            configure(source, handle, cmd, seqno, hop, hop_shuffle_spacing)
                .await;
        }
        other => {
            handle
                .send_message(
                    MessageLevel::Error,
                    format!("unexpected {other:?} frame from parent"),
                )
                .await;
        }
    }
}

async fn configure<S: DataSource>(
    source: &mut S,
    handle: &FrameworkHandle,
    cmd: ConfigureCommand,
    seqno: u32,
    hop: &mut Option<HopState>,
    hop_shuffle_spacing: usize,
) {
    if let Some(chanstr) = cmd.channel {
        // An explicit channel cancels hopping.
        *hop = None;
        match source.translate_channel(&chanstr) {
            Ok((chan, notes)) => {
                for note in notes {
                    handle.send_message(MessageLevel::Info, note).await;
                }
                // Success responses are emitted by the channel controller
                // itself, carrying the serialized channel.
                if let ChannelSetOutcome::Fatal(msg) =
                    source.set_channel(handle, &chan, seqno).await
                {
                    let resp = ConfigureResponse {
                        success: false,
                        msg: msg.clone(),
                        channel: chanstr,
                    };
                    respond(handle, FrameKind::ConfigureResp, seqno, &resp)
                        .await;
                    handle.send_error(msg).await;
                    handle.spindown();
                }
            }
            Err(msg) => {
                let resp = ConfigureResponse {
                    success: false,
                    msg,
                    channel: chanstr,
                };
                respond(handle, FrameKind::ConfigureResp, seqno, &resp).await;
            }
        }
        return;
    }

    let Some(block) = cmd.hop else {
        let resp = ConfigureResponse {
            success: false,
            msg: "configure carried neither a channel nor a hop block"
                .to_string(),
            channel: String::new(),
        };
        respond(handle, FrameKind::ConfigureResp, seqno, &resp).await;
        return;
    };

    let mut channels = Vec::with_capacity(block.channels.len());
    for chanstr in &block.channels {
        match source.translate_channel(chanstr) {
            Ok((chan, notes)) => {
                for note in notes {
                    handle.send_message(MessageLevel::Info, note).await;
                }
                channels.push(chan);
            }
            Err(msg) => {
                handle.send_message(MessageLevel::Error, msg).await;
            }
        }
    }

    if channels.is_empty() {
        let resp = ConfigureResponse {
            success: false,
            msg: "no usable channels in hop list".to_string(),
            channel: String::new(),
        };
        respond(handle, FrameKind::ConfigureResp, seqno, &resp).await;
        return;
    }

    let count = channels.len();
    let spacing = if block.shuffle { hop_shuffle_spacing } else { 1 };
    *hop = Some(HopState::new(channels, block.rate, spacing));

    let resp = ConfigureResponse {
        success: true,
        msg: format!("hopping over {count} channels"),
        channel: String::new(),
    };
    respond(handle, FrameKind::ConfigureResp, seqno, &resp).await;
}

async fn respond<T: serde::Serialize>(
    handle: &FrameworkHandle,
    kind: FrameKind,
    seqno: u32,
    payload: &T,
) {
    match Frame::control(kind, seqno, payload) {
        Ok(frame) => handle.send_frame(frame).await,
        Err(e) => error!("failed to encode {kind:?} response: {e}"),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hop_order_covers_every_channel() {
        for len in 1..40 {
            for spacing in [1, 4] {
                let mut order = hop_order(len, spacing);
                order.sort_unstable();
                let expected: Vec<usize> = (0..len).collect();
                assert_eq!(order, expected, "len={len} spacing={spacing}");
            }
        }
    }

    #[test]
    fn hop_order_strides_when_coprime() {
        // 11 channels, spacing 4: neighbours are 4 apart.
        let order = hop_order(11, 4);
        assert_eq!(order[0], 0);
        assert_eq!(order[1], 4);
        assert_eq!(order[2], 8);
    }

    #[test]
    fn hop_order_degrades_to_walk() {
        // 12 shares a factor with 4; a stride would skip channels.
        let order = hop_order(12, 4);
        assert_eq!(order, (0..12).collect::<Vec<_>>());
    }
}
