// ── Controller abstraction ──
//
// Full session lifecycle for one RepRapFirmware board: connect, poll,
// reconcile, recover, disconnect. Collaborators observe it through the
// event broadcast, the connection-state watch and the snapshot watch.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Local;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use duetlink_api::{DEFAULT_SESSION_TIMEOUT, RetryPolicy, RrfClient, StatusLevel, TlsMode, TransportConfig};

use crate::config::{ControllerConfig, DEFAULT_PASSWORD, TlsVerification};
use crate::console::{self, ReplyContext};
use crate::error::CoreError;
use crate::event::ControllerEvent;
use crate::model::{FileInfo, MachineInfo, StatusSnapshot};
use crate::poller::{self, PollCycle, PollGate, PollOutcome};
use crate::reconciler::{Reconciler, Reconciliation};
use crate::recovery::{
    ConfirmationKind, ReconnectDelays, ReconnectReason, ReconnectTask, RecoveryAction,
    RecoveryController, UploadTarget,
};

const EVENT_CHANNEL_SIZE: usize = 256;
const CONNECT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const FIRMWARE_RESET_GCODE: &str = "M999";
/// Upper bound on waiting for the board to acknowledge `rr_disconnect`.
const DISCONNECT_NOTICE_TIMEOUT: Duration = Duration::from_secs(1);

// ── ConnectionState ──────────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Polling stopped; a reconnect timer is armed.
    Reconnecting { reason: ReconnectReason },
}

/// Who asked for a connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectMode {
    User,
    /// The reconnect timer. Only valid while `Reconnecting`.
    Recovery,
}

// ── Controller ───────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Does not connect on
/// construction; call [`connect()`](Self::connect).
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    client: RrfClient,
    connection_state: watch::Sender<ConnectionState>,
    event_tx: broadcast::Sender<Arc<ControllerEvent>>,
    snapshot: watch::Sender<Option<Arc<StatusSnapshot>>>,
    cancel: CancellationToken,
    /// Child token for the current session, cancelled on disconnect or
    /// when recovery takes over, replaced on every connect.
    cancel_child: Mutex<CancellationToken>,
    /// Last password the board accepted.
    password: Mutex<SecretString>,
    board_type: Mutex<Option<String>>,
    reconciler: Mutex<Reconciler>,
    recovery: Mutex<RecoveryController>,
    cycle: Mutex<PollCycle>,
    gate: PollGate,
    machine_page_visible: AtomicBool,
    last_sent_gcode: Mutex<Option<String>>,
    /// Volume a mount was requested for and not yet confirmed.
    pending_mount: Mutex<Option<u32>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
    reconnect_timer: Mutex<Option<JoinHandle<()>>>,
}

impl Controller {
    /// Create a new Controller from configuration. Only fails if the HTTP
    /// client cannot be built.
    pub fn new(config: ControllerConfig) -> Result<Self, CoreError> {
        let client = RrfClient::new(config.url.clone(), &build_transport(&config))?;
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let (snapshot, _) = watch::channel(None);
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();
        let recovery = RecoveryController::new(ReconnectDelays::from(&config));
        let cycle = PollCycle::new(config.extended_status_interval);
        let password = config.password.clone();

        Ok(Self {
            inner: Arc::new(ControllerInner {
                config,
                client,
                connection_state,
                event_tx,
                snapshot,
                cancel,
                cancel_child: Mutex::new(cancel_child),
                password: Mutex::new(password),
                board_type: Mutex::new(None),
                reconciler: Mutex::new(Reconciler::new()),
                recovery: Mutex::new(recovery),
                cycle: Mutex::new(cycle),
                gate: PollGate::new(),
                machine_page_visible: AtomicBool::new(false),
                last_sent_gcode: Mutex::new(None),
                pending_mount: Mutex::new(None),
                task_handles: Mutex::new(Vec::new()),
                reconnect_timer: Mutex::new(None),
            }),
        })
    }

    /// Access the controller configuration.
    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    /// The underlying HTTP client.
    pub fn client(&self) -> &RrfClient {
        &self.inner.client
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    /// Open a session.
    ///
    /// `password` replaces the last accepted one for this attempt; `None`
    /// reuses it. A no-op while connecting or connected.
    pub async fn connect(&self, password: Option<SecretString>) -> Result<(), CoreError> {
        self.connect_with(password, ConnectMode::User).await
    }

    #[allow(clippy::too_many_lines)]
    async fn connect_with(&self, password: Option<SecretString>, mode: ConnectMode) -> Result<(), CoreError> {
        let claimed = self.inner.connection_state.send_if_modified(|state| {
            let allowed = match mode {
                ConnectMode::User => matches!(
                    state,
                    ConnectionState::Disconnected | ConnectionState::Reconnecting { .. }
                ),
                ConnectMode::Recovery => matches!(state, ConnectionState::Reconnecting { .. }),
            };
            if allowed {
                *state = ConnectionState::Connecting;
            }
            allowed
        });
        if !claimed {
            debug!(?mode, "connect ignored in current state");
            return Ok(());
        }

        if mode == ConnectMode::User {
            if let Some(timer) = self.inner.reconnect_timer.lock().await.take() {
                debug!("manual connect supersedes pending reconnect");
                timer.abort();
            }
            self.inner.recovery.lock().await.timer_fired();
        }

        let password = match password {
            Some(password) => password,
            None => self.inner.password.lock().await.clone(),
        };
        let time = Local::now().format(CONNECT_TIME_FORMAT).to_string();
        let url = self.inner.config.url.to_string();
        info!(%url, ?mode, "connecting");

        let response = match self.inner.client.connect(&password, &time).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "rr_connect failed");
                self.connect_failed(mode).await;
                return Err(CoreError::ConnectionFailed {
                    url,
                    reason: e.to_string(),
                });
            }
        };

        match response.err {
            0 => {}
            1 => {
                warn!("controller rejected the password");
                self.connect_failed(mode).await;
                self.emit(ControllerEvent::PasswordRequired);
                return Err(CoreError::PasswordRequired);
            }
            2 => {
                warn!("controller has no free session");
                self.connect_failed(mode).await;
                self.emit(ControllerEvent::SessionCapacityExceeded);
                return Err(CoreError::CapacityExceeded);
            }
            code => {
                self.connect_failed(mode).await;
                return Err(CoreError::ConnectionFailed {
                    url,
                    reason: format!("rr_connect returned code {code}"),
                });
            }
        }

        let session_timeout = response
            .session_timeout
            .map_or(DEFAULT_SESSION_TIMEOUT, Duration::from_millis);
        self.inner.client.set_retry_policy(RetryPolicy::from_session_timeout(
            session_timeout,
            self.inner.config.max_retries,
        ));
        let default_password = password.expose_secret() == DEFAULT_PASSWORD;
        *self.inner.password.lock().await = password;
        self.inner.board_type.lock().await.clone_from(&response.board_type);

        // Fresh child token for this session (supports reconnect).
        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        self.inner.reconciler.lock().await.reset();
        self.inner.cycle.lock().await.prime();
        let confirmation = self.inner.recovery.lock().await.on_reconnected();

        self.inner.connection_state.send_replace(ConnectionState::Connected);
        info!(board_type = ?response.board_type, ?session_timeout, "connected");
        self.emit(ControllerEvent::ConnectionEstablished {
            board_type: response.board_type,
        });

        self.spawn_task(probe_oem_features(self.clone())).await;
        self.emit(ControllerEvent::FilamentListRequested);

        if self.inner.config.polling {
            let interval = self.inner.config.update_interval;
            self.spawn_task(poller::run(self.clone(), interval, child)).await;
        }

        if confirmation == Some(ConfirmationKind::ReloadPage) {
            if default_password {
                self.inner
                    .recovery
                    .lock()
                    .await
                    .take_confirmation(ConfirmationKind::ReloadPage);
                self.emit(ControllerEvent::ReloadRequested);
            } else {
                self.emit(ControllerEvent::ConfirmationRequested {
                    kind: ConfirmationKind::ReloadPage,
                });
            }
        }

        Ok(())
    }

    async fn connect_failed(&self, mode: ConnectMode) {
        if mode == ConnectMode::Recovery {
            self.clear_session().await;
        }
        self.inner
            .connection_state
            .send_replace(ConnectionState::Disconnected);
    }

    /// Close the session.
    ///
    /// Aborts in-flight requests, stops the poller and any reconnect timer,
    /// and forgets all session state. Then, when `notify_server` is set and
    /// a session was open, sends a best-effort `rr_disconnect` whose outcome
    /// is ignored.
    pub async fn disconnect(&self, notify_server: bool) {
        let state = *self.inner.connection_state.borrow();

        // Cancel the child token (not the parent, so reconnects work).
        self.inner.cancel_child.lock().await.cancel();
        self.inner.client.cancel_all();

        if let Some(timer) = self.inner.reconnect_timer.lock().await.take() {
            timer.abort();
        }

        // Not joined: the poll task itself may be the caller. Every task
        // ends on the cancelled token or its aborted request.
        let handles: Vec<_> = self.inner.task_handles.lock().await.drain(..).collect();
        trace!(tasks = handles.len(), "detaching session tasks");
        drop(handles);

        self.clear_session().await;
        self.inner
            .connection_state
            .send_replace(ConnectionState::Disconnected);
        info!("disconnected");

        if notify_server && state == ConnectionState::Connected {
            match tokio::time::timeout(DISCONNECT_NOTICE_TIMEOUT, self.inner.client.disconnect()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!(error = %e, "rr_disconnect failed (ignored)"),
                Err(_) => debug!("rr_disconnect not acknowledged (ignored)"),
            }
        }
    }

    /// Tear the session down after a failure.
    pub(crate) async fn connection_lost(&self, reason: String) {
        if *self.inner.connection_state.borrow() == ConnectionState::Disconnected {
            return;
        }
        warn!(%reason, "connection lost");
        self.emit(ControllerEvent::ConnectionLost { reason });
        self.disconnect(false).await;
    }

    async fn clear_session(&self) {
        self.inner.snapshot.send_replace(None);
        self.inner.reconciler.lock().await.reset();
        self.inner.cycle.lock().await.reset();
        self.inner.recovery.lock().await.reset();
        *self.inner.last_sent_gcode.lock().await = None;
        *self.inner.pending_mount.lock().await = None;
        *self.inner.board_type.lock().await = None;
    }

    /// Connect, run `f`, disconnect. No poller is started.
    pub async fn oneshot<F, Fut, T>(config: ControllerConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.polling = false;

        let controller = Controller::new(cfg)?;
        controller.connect(None).await?;
        let result = f(controller.clone()).await;
        controller.disconnect(true).await;
        result
    }

    // ── Polling ──────────────────────────────────────────────────────

    /// One poll cycle: request, reconcile, act on the result.
    pub(crate) async fn poll_once(&self) -> PollOutcome {
        let Some(_permit) = self.inner.gate.try_acquire() else {
            trace!("status poll already in flight");
            return PollOutcome::Continue;
        };

        let printing = self.inner.reconciler.lock().await.is_printing();
        let page_visible = self.inner.machine_page_visible.load(Ordering::Relaxed);
        let level = self.inner.cycle.lock().await.next_level(printing, page_visible);

        let response = match self.inner.client.status(level).await {
            Ok(response) => response,
            Err(e) if e.is_aborted() => return PollOutcome::Stop,
            Err(e) => return PollOutcome::Failed(e.to_string()),
        };

        if !self.is_connected() {
            debug!("discarding status received after disconnect");
            return PollOutcome::Stop;
        }

        let result = self
            .inner
            .reconciler
            .lock()
            .await
            .reconcile(StatusSnapshot::from(response));
        self.apply(result).await
    }

    async fn apply(&self, result: Reconciliation) -> PollOutcome {
        let Reconciliation {
            snapshot,
            events,
            gcode,
            fetch_reply,
            request_file_info,
            firmware,
        } = result;

        self.inner.snapshot.send_replace(Some(snapshot));
        for event in events {
            self.emit(event);
        }

        for code in gcode {
            match self.send_gcode(&code).await {
                Ok(()) => {}
                Err(CoreError::ControllerDisconnected) => return PollOutcome::Stop,
                Err(e) => warn!(error = %e, gcode = %code, "failed to send fan override"),
            }
        }

        if request_file_info {
            self.spawn_task(load_file_info(self.clone())).await;
        }
        if fetch_reply {
            self.spawn_task(fetch_console_reply(self.clone())).await;
        }

        let action = self.inner.recovery.lock().await.on_status(firmware);
        match action {
            RecoveryAction::None => PollOutcome::Continue,
            RecoveryAction::Schedule(task) => {
                self.schedule_reconnect(task).await;
                PollOutcome::Stop
            }
            RecoveryAction::Confirm(kind) => {
                self.emit(ControllerEvent::ConfirmationRequested { kind });
                PollOutcome::Continue
            }
            RecoveryAction::Abandon => {
                self.connection_lost("firmware update in progress".into()).await;
                PollOutcome::Stop
            }
        }
    }

    // ── Recovery ─────────────────────────────────────────────────────

    async fn schedule_reconnect(&self, task: ReconnectTask) {
        self.inner.cancel_child.lock().await.cancel();
        self.inner.client.cancel_all();
        self.inner
            .connection_state
            .send_replace(ConnectionState::Reconnecting { reason: task.reason });
        info!(reason = %task.reason, delay = ?task.delay, "reconnect scheduled");
        self.emit(ControllerEvent::ReconnectScheduled {
            reason: task.reason,
            delay: task.delay,
        });

        let timer = tokio::spawn(reconnect_after(self.clone(), task.delay));
        if let Some(previous) = self.inner.reconnect_timer.lock().await.replace(timer) {
            previous.abort();
        }
    }

    /// Answer a [`ControllerEvent::ConfirmationRequested`].
    ///
    /// Ignored unless the session is still open and `kind` is the
    /// confirmation it is waiting for.
    pub async fn respond_to_confirmation(&self, kind: ConfirmationKind, accepted: bool) -> Result<(), CoreError> {
        let outstanding = self.is_connected() && self.inner.recovery.lock().await.take_confirmation(kind);
        if !outstanding {
            debug!(%kind, "stale confirmation answer ignored");
            return Ok(());
        }
        if !accepted {
            debug!(%kind, "confirmation declined");
            return Ok(());
        }
        match kind {
            ConfirmationKind::FirmwareReset => {
                self.send_gcode(FIRMWARE_RESET_GCODE).await?;
                let task = self.inner.recovery.lock().await.confirm_reset();
                if let Some(task) = task {
                    self.schedule_reconnect(task).await;
                }
            }
            ConfirmationKind::ReloadPage => self.emit(ControllerEvent::ReloadRequested),
        }
        Ok(())
    }

    // ── One-shot commands ────────────────────────────────────────────

    /// Send a line of G-code. Empty input is ignored.
    pub async fn send_gcode(&self, gcode: &str) -> Result<(), CoreError> {
        if gcode.is_empty() {
            return Ok(());
        }
        let gcode = if self.inner.config.uppercase_gcode {
            gcode.to_uppercase()
        } else {
            gcode.to_owned()
        };
        debug!(%gcode, "sending G-code");
        *self.inner.last_sent_gcode.lock().await = Some(gcode.clone());
        self.inner.client.gcode(&gcode).await?;
        Ok(())
    }

    /// Fetch metadata of the file being printed.
    ///
    /// Waits `file_info_retry_delay` between attempts while the firmware is
    /// still parsing the file. The result is kept for progress tracking.
    pub async fn request_file_info(&self) -> Result<FileInfo, CoreError> {
        loop {
            let response = self.inner.client.file_info().await?;
            match response.err {
                0 => {
                    let info = FileInfo::from(response);
                    debug!(file = ?info.file_name, "file info loaded");
                    self.inner
                        .reconciler
                        .lock()
                        .await
                        .set_file_info(Some(info.clone()));
                    return Ok(info);
                }
                2 => {
                    trace!("firmware still parsing the file");
                    tokio::time::sleep(self.inner.config.file_info_retry_delay).await;
                    if !self.is_connected() {
                        return Err(CoreError::ControllerDisconnected);
                    }
                }
                code => return Err(CoreError::FileInfoUnavailable { code }),
            }
        }
    }

    /// The board's configuration (`rr_config`).
    pub async fn machine_config(&self) -> Result<serde_json::Value, CoreError> {
        Ok(self.inner.client.config().await?)
    }

    /// Request one status outside the poll loop. Not reconciled.
    pub async fn fetch_status(&self, level: StatusLevel) -> Result<StatusSnapshot, CoreError> {
        let response = self.inner.client.status(level).await?;
        Ok(StatusSnapshot::from(response))
    }

    /// Pending console output (`rr_reply`), untouched.
    pub async fn fetch_reply(&self) -> Result<String, CoreError> {
        Ok(self.inner.client.reply().await?)
    }

    /// Pin fan `fan` to `value` (0..=1) or release it. Reasserted on the
    /// next poll whenever the firmware reports something else.
    pub async fn set_fan_override(&self, fan: usize, value: Option<f64>) {
        self.inner.reconciler.lock().await.set_fan_override(fan, value);
    }

    pub async fn set_upload_in_progress(&self, target: UploadTarget, active: bool) {
        debug!(%target, active, "upload state changed");
        self.inner
            .recovery
            .lock()
            .await
            .set_upload_in_progress(target, active);
    }

    /// Extended status is requested more often while machine properties
    /// are on screen.
    pub fn set_machine_page_visible(&self, visible: bool) {
        self.inner
            .machine_page_visible
            .store(visible, Ordering::Relaxed);
    }

    pub async fn set_mount_requested(&self, volume: Option<u32>) {
        *self.inner.pending_mount.lock().await = volume;
    }

    // ── State observation ────────────────────────────────────────────

    /// Subscribe to connection state changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        *self.inner.connection_state.borrow() == ConnectionState::Connected
    }

    /// Subscribe to the event broadcast stream.
    pub fn events(&self) -> broadcast::Receiver<Arc<ControllerEvent>> {
        self.inner.event_tx.subscribe()
    }

    /// Subscribe to snapshot updates. `None` while disconnected.
    pub fn snapshots(&self) -> watch::Receiver<Option<Arc<StatusSnapshot>>> {
        self.inner.snapshot.subscribe()
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Option<Arc<StatusSnapshot>> {
        self.inner.snapshot.borrow().clone()
    }

    pub async fn machine_info(&self) -> MachineInfo {
        self.inner.reconciler.lock().await.machine().clone()
    }

    pub async fn board_type(&self) -> Option<String> {
        self.inner.board_type.lock().await.clone()
    }

    // ── Internals ────────────────────────────────────────────────────

    fn emit(&self, event: ControllerEvent) {
        // No subscribers is fine.
        let _ = self.inner.event_tx.send(Arc::new(event));
    }

    async fn spawn_task<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut handles = self.inner.task_handles.lock().await;
        handles.retain(|handle| !handle.is_finished());
        handles.push(tokio::spawn(task));
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// The reconnect timer. Boxed so the poll task and the connect it spawns
/// do not form a recursive future type.
fn reconnect_after(controller: Controller, delay: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(async move {
        tokio::time::sleep(delay).await;
        controller.inner.recovery.lock().await.timer_fired();
        if let Err(e) = controller.connect_with(None, ConnectMode::Recovery).await {
            warn!(error = %e, "reconnect failed");
            controller.emit(ControllerEvent::ConnectionLost {
                reason: e.to_string(),
            });
        }
    })
}

/// Vendor customizations live in `0:/sys/oem.json`. Most boards have none.
async fn probe_oem_features(controller: Controller) {
    match controller.inner.client.oem_features().await {
        Ok(oem) => {
            debug!(vendor = ?oem.vendor, "OEM features found");
            controller.inner.reconciler.lock().await.set_vendor(oem.vendor);
        }
        Err(e) => trace!(error = %e, "no OEM features"),
    }
}

async fn load_file_info(controller: Controller) {
    match controller.request_file_info().await {
        Ok(_) | Err(CoreError::ControllerDisconnected) => {}
        Err(CoreError::ConnectionLost { reason }) => controller.connection_lost(reason).await,
        Err(e) => warn!(error = %e, "could not load file info"),
    }
}

async fn fetch_console_reply(controller: Controller) {
    let reply = match controller.inner.client.reply().await {
        Ok(reply) => reply,
        Err(e) if e.is_aborted() => return,
        Err(e) => {
            controller.connection_lost(e.to_string()).await;
            return;
        }
    };
    if !controller.is_connected() {
        return;
    }

    let inner = &controller.inner;
    let printing = inner.reconciler.lock().await.is_printing();
    let last_gcode = inner.last_sent_gcode.lock().await.take();
    let outcome = {
        let mut pending_mount = inner.pending_mount.lock().await;
        let outcome = console::interpret(
            &reply,
            &ReplyContext {
                printing,
                last_gcode: last_gcode.as_deref(),
                pending_mount: *pending_mount,
                log_success: inner.config.log_success,
            },
        );
        if outcome.mount_retry.is_some() {
            *pending_mount = None;
        }
        outcome
    };

    if let Some(entry) = outcome.entry {
        controller.emit(ControllerEvent::ConsoleReply { entry });
    }
    if let Some(points) = outcome.bed_points {
        controller.emit(ControllerEvent::BedCompensation { points });
    }
    if outcome.heightmap_ready {
        controller.emit(ControllerEvent::HeightmapReady);
    }
    if outcome.bed_points_cleared {
        controller.emit(ControllerEvent::BedPointsCleared);
    }
    if let Some(volume) = outcome.mount_retry {
        controller.emit(ControllerEvent::MountRetryRequested { volume });
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn build_transport(config: &ControllerConfig) -> TransportConfig {
    let tls = match config.tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    };
    TransportConfig {
        tls,
        connect_timeout: config.connect_timeout,
        retry: RetryPolicy::from_session_timeout(DEFAULT_SESSION_TIMEOUT, config.max_retries),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn config() -> ControllerConfig {
        ControllerConfig::new(Url::parse("http://printer.local").expect("valid URL"))
    }

    #[test]
    fn transport_follows_config() {
        let mut cfg = config();
        cfg.max_retries = 3;
        cfg.tls = TlsVerification::DangerAcceptInvalid;

        let transport = build_transport(&cfg);
        assert!(matches!(transport.tls, TlsMode::DangerAcceptInvalid));
        assert_eq!(transport.retry.attempts(), 4);
        assert_eq!(transport.retry.request_timeout, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn new_controller_starts_disconnected() {
        let controller = Controller::new(config()).expect("controller");
        assert_eq!(*controller.connection_state().borrow(), ConnectionState::Disconnected);
        assert!(controller.snapshot().is_none());
        assert!(!controller.is_connected());
    }

    #[tokio::test]
    async fn empty_gcode_is_not_sent() {
        let controller = Controller::new(config()).expect("controller");
        controller.send_gcode("").await.expect("no-op");
        assert!(controller.inner.last_sent_gcode.lock().await.is_none());
    }
}
