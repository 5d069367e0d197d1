//! Appointment store: sign-in, live subscription, create and delete.
//!
//! Startup is two explicit steps. `authenticate` resolves an identity, and
//! `subscribe` takes that identity, so a live query can never open before
//! sign-in has finished.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::appointment::{Appointment, NewAppointment};
use crate::backend::{ChangeKind, Identity, Snapshot};
use crate::context::ServiceContext;
use crate::error::{ExecSyncError, ExecSyncResult};

/// A decoded change entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentChange {
    pub kind: ChangeKind,
    pub appointment: Appointment,
}

/// One delivery from a live subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreUpdate {
    /// Every appointment of the subscribed office. Replaces any earlier list.
    pub appointments: Vec<Appointment>,
    /// What changed in the shared collection, for any office.
    pub changes: Vec<AppointmentChange>,
    /// Set on the first delivery of a subscription only.
    pub initial: bool,
}

/// Per-subscription delivery state.
#[derive(Debug, Default)]
pub struct SubscriptionState {
    has_delivered_first_snapshot: bool,
}

impl SubscriptionState {
    pub fn has_delivered_first_snapshot(&self) -> bool {
        self.has_delivered_first_snapshot
    }

    /// Record a delivery. Returns true exactly once, for the first one.
    fn record_delivery(&mut self) -> bool {
        let first = !self.has_delivered_first_snapshot;
        self.has_delivered_first_snapshot = true;
        first
    }
}

/// Handle to a live subscription. Dropping it unsubscribes.
pub struct Subscription {
    active: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Stop all future callbacks.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
        self.task.abort();
    }
}

pub struct AppointmentStore {
    context: ServiceContext,
}

impl AppointmentStore {
    pub fn new(context: ServiceContext) -> Self {
        AppointmentStore { context }
    }

    pub fn context(&self) -> &ServiceContext {
        &self.context
    }

    /// Sign in with the configured token, or anonymously without one.
    pub async fn authenticate(&self) -> ExecSyncResult<Identity> {
        let result = match self.context.auth_token.as_deref() {
            Some(token) => self.context.auth.sign_in_with_custom_token(token).await,
            None => self.context.auth.sign_in_anonymously().await,
        };

        match result {
            Ok(identity) => {
                tracing::debug!(uid = %identity.uid, anonymous = identity.anonymous, "signed in");
                Ok(identity)
            }
            Err(e) => {
                tracing::error!(error = %e, "sign-in failed");
                Err(match e {
                    ExecSyncError::Auth(_) => e,
                    other => ExecSyncError::Auth(other.to_string()),
                })
            }
        }
    }

    /// Open a live subscription for `office_id`.
    ///
    /// `on_change` receives the office's full appointment list on every
    /// change to the shared collection. `on_error` receives a transport
    /// failure, after which the subscription is finished; there is no retry.
    pub async fn subscribe<C, E>(
        &self,
        identity: &Identity,
        office_id: &str,
        mut on_change: C,
        mut on_error: E,
    ) -> ExecSyncResult<Subscription>
    where
        C: FnMut(StoreUpdate) + Send + 'static,
        E: FnMut(ExecSyncError) + Send + 'static,
    {
        let mut feed = self
            .context
            .documents
            .subscribe_to_collection(&self.context.collection)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "could not open appointment subscription"))?;

        tracing::debug!(
            uid = %identity.uid,
            collection = %self.context.collection,
            office = office_id,
            "subscribed to appointments"
        );

        let active = Arc::new(AtomicBool::new(true));
        let office_id = office_id.to_string();
        let task = tokio::spawn({
            let active = Arc::clone(&active);
            async move {
                let mut state = SubscriptionState::default();
                while let Some(item) = feed.recv().await {
                    if !active.load(Ordering::Acquire) {
                        break;
                    }
                    match item {
                        Ok(snapshot) => {
                            let initial = state.record_delivery();
                            on_change(decode_snapshot(&snapshot, &office_id, initial));
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "appointment subscription failed");
                            on_error(e);
                            break;
                        }
                    }
                }
            }
        });

        Ok(Subscription { active, task })
    }

    /// The office's appointments as of now, without staying subscribed.
    pub async fn fetch(&self, identity: &Identity) -> ExecSyncResult<Vec<Appointment>> {
        let mut feed = self
            .context
            .documents
            .subscribe_to_collection(&self.context.collection)
            .await?;
        tracing::debug!(uid = %identity.uid, "fetching appointments");

        match feed.recv().await {
            Some(Ok(snapshot)) => {
                Ok(decode_snapshot(&snapshot, &self.context.office_id, true).appointments)
            }
            Some(Err(e)) => Err(e),
            None => Err(ExecSyncError::Persistence(
                "live query closed before delivering a snapshot".into(),
            )),
        }
    }

    /// Store a new appointment. A draft without a title is silently ignored
    /// and yields `Ok(None)`.
    pub async fn create(&self, draft: &NewAppointment) -> ExecSyncResult<Option<String>> {
        if !draft.has_title() {
            tracing::debug!("ignoring appointment without a title");
            return Ok(None);
        }

        let fields = draft.to_fields(&self.context.office_id, &self.context.username, Utc::now())?;
        match self
            .context
            .documents
            .add_document(&self.context.collection, fields)
            .await
        {
            Ok(id) => {
                tracing::info!(id = %id, date = %draft.date, "appointment created");
                Ok(Some(id))
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to create appointment");
                Err(persistence(e))
            }
        }
    }

    /// Delete an appointment. Callers confirm with the user first.
    pub async fn remove(&self, id: &str) -> ExecSyncResult<()> {
        match self
            .context
            .documents
            .delete_document(&self.context.collection, id)
            .await
        {
            Ok(()) => {
                tracing::info!(id = %id, "appointment deleted");
                Ok(())
            }
            Err(e) => {
                tracing::error!(id = %id, error = %e, "failed to delete appointment");
                Err(persistence(e))
            }
        }
    }
}

fn persistence(e: ExecSyncError) -> ExecSyncError {
    match e {
        ExecSyncError::Persistence(_) => e,
        other => ExecSyncError::Persistence(other.to_string()),
    }
}

fn decode_snapshot(snapshot: &Snapshot, office_id: &str, initial: bool) -> StoreUpdate {
    let appointments = snapshot
        .documents
        .iter()
        .filter_map(|doc| match Appointment::from_document(doc) {
            Ok(appointment) => Some(appointment),
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed appointment");
                None
            }
        })
        .filter(|a| a.office_id == office_id)
        .collect();

    let changes = snapshot
        .changes
        .iter()
        .filter_map(|change| {
            Appointment::from_document(&change.document)
                .ok()
                .map(|appointment| AppointmentChange {
                    kind: change.kind,
                    appointment,
                })
        })
        .collect();

    StoreUpdate {
        appointments,
        changes,
        initial,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::backend::{
        CollectionPath, DocumentStore, Fields, LocalAuth, LocalDocumentStore, SnapshotReceiver,
    };
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    pub(crate) const WAIT: Duration = Duration::from_secs(2);

    pub(crate) fn test_store(documents: Arc<dyn DocumentStore>) -> AppointmentStore {
        let context = ServiceContext::new(
            Arc::new(LocalAuth::new()),
            documents,
            "test-app",
            "exec-office",
            "Secretary",
        )
        .unwrap();
        AppointmentStore::new(context)
    }

    pub(crate) fn draft(title: &str, day: u32, time: &str) -> NewAppointment {
        let mut draft = NewAppointment::for_date(NaiveDate::from_ymd_opt(2025, 6, day).unwrap());
        draft.title = title.to_string();
        draft.time = crate::date::parse_time(time).unwrap();
        draft
    }

    pub(crate) async fn collect_updates(
        store: &AppointmentStore,
        identity: &Identity,
    ) -> (Subscription, mpsc::UnboundedReceiver<StoreUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = store
            .subscribe(identity, "exec-office", move |update| {
                let _ = tx.send(update);
            }, |_| {})
            .await
            .unwrap();
        (subscription, rx)
    }

    pub(crate) async fn next_update(rx: &mut mpsc::UnboundedReceiver<StoreUpdate>) -> StoreUpdate {
        timeout(WAIT, rx.recv()).await.expect("timeout").expect("subscription ended")
    }

    fn foreign_fields() -> Fields {
        let serde_json::Value::Object(fields) = json!({
            "officeId": "other-office",
            "date": "2025-06-12",
            "time": "11:00",
            "title": "Not ours",
            "type": "work",
            "createdBy": "Someone",
            "createdAt": "2025-06-01T00:00:00Z"
        }) else {
            unreachable!()
        };
        fields
    }

    #[tokio::test]
    async fn empty_title_leaves_collection_unchanged() {
        let store = test_store(Arc::new(LocalDocumentStore::in_memory()));
        let identity = store.authenticate().await.unwrap();

        assert_eq!(store.create(&draft("   ", 10, "09:00")).await.unwrap(), None);
        assert!(store.fetch(&identity).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_records_office_and_creator() {
        let store = test_store(Arc::new(LocalDocumentStore::in_memory()));
        let identity = store.authenticate().await.unwrap();

        let id = store.create(&draft("Budget review", 10, "09:00")).await.unwrap().unwrap();
        let appointments = store.fetch(&identity).await.unwrap();

        assert_eq!(appointments.len(), 1);
        assert_eq!(appointments[0].id, id);
        assert_eq!(appointments[0].office_id, "exec-office");
        assert_eq!(appointments[0].created_by, "Secretary");
    }

    #[tokio::test]
    async fn only_first_delivery_is_initial() {
        let store = test_store(Arc::new(LocalDocumentStore::in_memory()));
        store.create(&draft("Existing", 9, "10:00")).await.unwrap();
        let identity = store.authenticate().await.unwrap();

        let (_subscription, mut rx) = collect_updates(&store, &identity).await;
        let first = next_update(&mut rx).await;
        assert!(first.initial);
        assert_eq!(first.appointments.len(), 1);
        assert_eq!(first.changes[0].kind, ChangeKind::Added);

        store.create(&draft("New arrival", 10, "14:30")).await.unwrap();
        let second = next_update(&mut rx).await;
        assert!(!second.initial);
        assert_eq!(second.appointments.len(), 2);
        assert_eq!(second.changes.len(), 1);
        assert_eq!(second.changes[0].appointment.title, "New arrival");
    }

    #[tokio::test]
    async fn other_offices_and_malformed_documents_are_filtered() {
        let documents = Arc::new(LocalDocumentStore::in_memory());
        let store = test_store(documents.clone());
        let path = CollectionPath::appointments("test-app").unwrap();
        documents.add_document(&path, foreign_fields()).await.unwrap();
        documents.add_document(&path, Fields::new()).await.unwrap();
        store.create(&draft("Ours", 10, "09:00")).await.unwrap();

        let identity = store.authenticate().await.unwrap();
        let (_subscription, mut rx) = collect_updates(&store, &identity).await;
        let update = next_update(&mut rx).await;

        assert_eq!(update.appointments.len(), 1);
        assert_eq!(update.appointments[0].title, "Ours");
        // Changes keep every decodable document so observers can apply their own filter.
        assert_eq!(update.changes.len(), 2);
    }

    #[tokio::test]
    async fn unsubscribe_stops_callbacks() {
        let store = test_store(Arc::new(LocalDocumentStore::in_memory()));
        let identity = store.authenticate().await.unwrap();
        let (subscription, mut rx) = collect_updates(&store, &identity).await;
        next_update(&mut rx).await;

        subscription.unsubscribe();
        store.create(&draft("After teardown", 10, "09:00")).await.unwrap();

        let late = timeout(Duration::from_millis(200), rx.recv()).await;
        assert!(!matches!(late, Ok(Some(_))));
    }

    /// Document store whose every operation fails.
    pub(crate) struct Unreachable;

    #[async_trait]
    impl DocumentStore for Unreachable {
        async fn add_document(&self, _: &CollectionPath, _: Fields) -> ExecSyncResult<String> {
            Err(ExecSyncError::Persistence("permission denied".into()))
        }

        async fn delete_document(&self, _: &CollectionPath, _: &str) -> ExecSyncResult<()> {
            Err(ExecSyncError::Io(std::io::Error::other("network down")))
        }

        async fn subscribe_to_collection(&self, _: &CollectionPath) -> ExecSyncResult<SnapshotReceiver> {
            let (tx, rx) = mpsc::unbounded_channel();
            let _ = tx.send(Err(ExecSyncError::Persistence("connection reset".into())));
            Ok(rx)
        }
    }

    #[tokio::test]
    async fn write_failures_surface_as_persistence_errors() {
        let store = test_store(Arc::new(Unreachable));

        let err = store.create(&draft("Lunch", 10, "12:00")).await.unwrap_err();
        assert!(matches!(err, ExecSyncError::Persistence(ref m) if m.contains("permission denied")));

        let err = store.remove("abc").await.unwrap_err();
        assert!(matches!(err, ExecSyncError::Persistence(_)));
    }

    #[tokio::test]
    async fn transport_failure_reaches_on_error_once() {
        let store = test_store(Arc::new(Unreachable));
        let identity = store.authenticate().await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _subscription = store
            .subscribe(&identity, "exec-office", |_| panic!("no snapshot expected"), move |e| {
                let _ = tx.send(e);
            })
            .await
            .unwrap();

        let err = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert!(matches!(err, ExecSyncError::Persistence(_)));
        assert!(timeout(WAIT, rx.recv()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn token_sign_in_and_failure() {
        let mut store = test_store(Arc::new(LocalDocumentStore::in_memory()));
        store.context.auth_token = Some("office-token".into());
        assert!(!store.authenticate().await.unwrap().anonymous);

        store.context.auth_token = Some(" ".into());
        assert!(matches!(store.authenticate().await, Err(ExecSyncError::Auth(_))));
    }
}
