//! The single execution context. UI gestures, timer expiries and remote
//! completions all arrive as [`Event`]s on one channel and are applied one
//! at a time, so the store, the notification queue and the pending
//! deletions never need a lock.
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::api::JobsApi;
use crate::coordinator::{Intent, RemoteOutcome};
use crate::deletion::{DeleteScheduler, DeleteTicket};
use crate::drag::{DragEvent, DragSession};
use crate::model::JobId;
use crate::notify::{
    ActionCommand, Notification, NotificationAction, NotificationId, NotificationKind,
    NotificationQueue, NOTIFICATION_TTL,
};
use crate::store::{JobStore, StoreSnapshot};
use crate::timer::Timers;

#[derive(Debug)]
pub enum Event {
    Intent(Intent),
    Drag(DragEvent),
    /// Close a notification without running its action.
    Dismiss(NotificationId),
    /// Close a notification, then run its action.
    InvokeAction(NotificationId),
    NotificationExpired(NotificationId),
    DeleteGraceElapsed { id: JobId, ticket: DeleteTicket },
    Remote(RemoteOutcome),
    Shutdown,
}

/// Cheap, cloneable way for front-ends to feed the engine.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<Event>,
}

impl EngineHandle {
    /// Returns false once the engine has stopped.
    pub fn send(&self, event: Event) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn intent(&self, intent: Intent) -> bool {
        self.send(Event::Intent(intent))
    }

    pub fn drag(&self, event: DragEvent) -> bool {
        self.send(Event::Drag(event))
    }

    pub fn dismiss(&self, id: NotificationId) -> bool {
        self.send(Event::Dismiss(id))
    }

    pub fn invoke_action(&self, id: NotificationId) -> bool {
        self.send(Event::InvokeAction(id))
    }

    pub fn shutdown(&self) -> bool {
        self.send(Event::Shutdown)
    }
}

pub struct Engine {
    pub(crate) api: Arc<dyn JobsApi>,
    pub(crate) store: JobStore,
    pub(crate) notifications: NotificationQueue,
    pub(crate) drag: DragSession,
    pub(crate) deletes: DeleteScheduler,
    pub(crate) timers: Timers<Event>,
    tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
    in_flight: usize,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("jobs", &self.store.len())
            .field("notifications", &self.notifications.len())
            .field("pending_deletes", &self.deletes.len())
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Must be called inside a tokio runtime: timers and remote calls are
    /// spawned onto it.
    pub fn new(api: Arc<dyn JobsApi>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            api,
            store: JobStore::new(),
            notifications: NotificationQueue::new(),
            drag: DragSession::new(),
            deletes: DeleteScheduler::new(),
            timers: Timers::new(tx.clone()),
            tx,
            rx,
            in_flight: 0,
        }
    }

    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            tx: self.tx.clone(),
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    pub fn deletes(&self) -> &DeleteScheduler {
        &self.deletes
    }

    pub fn subscribe_jobs(&self) -> watch::Receiver<StoreSnapshot> {
        self.store.subscribe()
    }

    pub fn subscribe_notifications(&self) -> watch::Receiver<Vec<Notification>> {
        self.notifications.subscribe()
    }

    /// Remote calls issued but not yet reconciled.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Apply one event. Never blocks; anything asynchronous is spawned and
    /// reports back through the channel.
    pub fn dispatch(&mut self, event: Event) {
        match event {
            Event::Intent(intent) => self.apply_intent(intent),
            Event::Drag(drag) => self.apply_drag(drag),
            Event::Dismiss(id) => {
                self.notifications.dismiss(id);
            }
            Event::InvokeAction(id) => self.invoke_action(id),
            Event::NotificationExpired(id) => {
                if self.notifications.dismiss(id).is_some() {
                    debug!(id, "notification expired");
                }
            }
            Event::DeleteGraceElapsed { id, ticket } => self.commit_delete(id, ticket),
            Event::Remote(outcome) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                self.reconcile(outcome);
            }
            Event::Shutdown => debug!("shutdown event outside run loop ignored"),
        }
    }

    /// Apply everything already queued without waiting. Returns how many
    /// events were handled.
    pub fn drain(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.dispatch(event);
            handled += 1;
        }
        handled
    }

    /// Wait for the next event and apply it.
    pub async fn step(&mut self) -> bool {
        match self.rx.recv().await {
            Some(event) => {
                self.dispatch(event);
                true
            }
            None => false,
        }
    }

    /// Apply events until no remote call is outstanding. Timer events that
    /// arrive in the meantime are applied too.
    pub async fn settle(&mut self) {
        self.drain();
        while self.in_flight > 0 {
            if !self.step().await {
                break;
            }
        }
    }

    /// Serve events until `Event::Shutdown`.
    pub async fn run(mut self) {
        info!("board engine running");
        while let Some(event) = self.rx.recv().await {
            if matches!(event, Event::Shutdown) {
                break;
            }
            self.dispatch(event);
        }
        info!(
            in_flight = self.in_flight,
            pending_deletes = self.deletes.len(),
            "board engine stopped"
        );
    }

    fn apply_drag(&mut self, event: DragEvent) {
        match event {
            DragEvent::Start { active } => self.drag.start(&self.store, active),
            DragEvent::Over { active, over } => {
                self.drag.over(&mut self.store, active, over);
            }
            DragEvent::End { active, over } => {
                if let Some(change) = self.drag.end(&self.store, active, over) {
                    self.update_status(change.id, change.status);
                }
            }
        }
    }

    fn invoke_action(&mut self, id: NotificationId) {
        // Dismiss first so the action's effects land after the notification is gone.
        let Some(notification) = self.notifications.dismiss(id) else {
            debug!(id, "action on a dismissed notification ignored");
            return;
        };
        let Some(action) = notification.action else {
            return;
        };
        match action.command {
            ActionCommand::UndoDelete(job_id) => self.undo_delete(job_id),
        }
    }

    /// Raise a notification and arm its auto-expiry.
    pub(crate) fn notify(
        &mut self,
        message: impl Into<String>,
        kind: NotificationKind,
        action: Option<NotificationAction>,
    ) -> NotificationId {
        let id = self.notifications.push(message, kind, action);
        let expiry = self.timers.after(NOTIFICATION_TTL, Event::NotificationExpired(id));
        self.notifications.arm(id, expiry);
        id
    }

    /// Run `call` off the loop; its outcome comes back as `Event::Remote`.
    /// Nothing cancels it once issued.
    pub(crate) fn spawn_remote<F>(&mut self, call: F)
    where
        F: Future<Output = RemoteOutcome> + Send + 'static,
    {
        self.in_flight += 1;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = call.await;
            if tx.send(Event::Remote(outcome)).is_err() {
                warn!("remote call finished after the engine stopped");
            }
        });
    }
}
