use std::{sync::Arc, time::Duration};

use anyflow_cli_common::logger;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use super::{Event, EventPayload};
use crate::{
    api::BackendApi,
    messages::{msg_event_failed, MSG_WAITING_FOR_EVENTS},
};

/// Fire-and-forget submission of telemetry events.
///
/// Every submitted event is sent on its own task. [`EventDispatcher::drain`] waits
/// for the outstanding ones before the process exits.
pub struct EventDispatcher {
    api: Arc<dyn BackendApi>,
    session_id: Uuid,
    enabled: bool,
    debug: bool,
    tracker: TaskTracker,
}

impl EventDispatcher {
    pub fn new(api: Arc<dyn BackendApi>, enabled: bool, debug: bool) -> Self {
        Self {
            api,
            session_id: Uuid::new_v4(),
            enabled,
            debug,
            tracker: TaskTracker::new(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Must be called from within the tokio runtime. Failures are only visible in
    /// debug mode.
    pub fn submit(&self, payload: EventPayload) {
        if !self.enabled {
            return;
        }
        let event = Event::new(self.session_id, payload);
        let api = self.api.clone();
        let debug = self.debug;
        self.tracker.spawn(async move {
            if let Err(err) = api.send_event(&event).await {
                if debug {
                    logger::debug(msg_event_failed(&event.event_type, &err));
                }
            }
        });
    }

    /// Waits up to `timeout` for submitted events. Returns `false` when some were
    /// still in flight at the deadline.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.tracker.close();
        if self.tracker.is_empty() {
            return true;
        }
        logger::info(MSG_WAITING_FOR_EVENTS);
        tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use anyflow_cli_types::{ChainEntry, Deployment, DeploymentStatus, NewDeployment};
    use async_trait::async_trait;

    use super::*;
    use crate::api::{testonly::FakeBackend, ApiError, User};

    #[tokio::test]
    async fn submitted_events_share_the_session() {
        let backend = Arc::new(FakeBackend::offline());
        let dispatcher = EventDispatcher::new(backend.clone(), true, false);

        dispatcher.submit(EventPayload::program_started(&["deploy".to_owned()]));
        dispatcher.submit(EventPayload::program_ended(0, Duration::from_secs(1)));
        assert!(dispatcher.drain(Duration::from_secs(5)).await);

        let events = backend.events.lock().unwrap().clone();
        assert_eq!(events.len(), 2);
        assert!(events
            .iter()
            .all(|event| event.session_id == dispatcher.session_id()));
        assert_ne!(events[0].event_id, events[1].event_id);
    }

    #[tokio::test]
    async fn disabled_dispatcher_sends_nothing() {
        let backend = Arc::new(FakeBackend::offline());
        let dispatcher = EventDispatcher::new(backend.clone(), false, true);

        dispatcher.submit(EventPayload::program_ended(1, Duration::ZERO));
        assert!(dispatcher.drain(Duration::from_secs(1)).await);

        assert!(backend.events.lock().unwrap().is_empty());
    }

    struct StalledBackend;

    #[async_trait]
    impl BackendApi for StalledBackend {
        async fn get_chains(&self) -> Result<Vec<ChainEntry>, ApiError> {
            unimplemented!()
        }

        async fn get_user(&self) -> Result<User, ApiError> {
            unimplemented!()
        }

        async fn create_deployment(&self, _: &NewDeployment) -> Result<Deployment, ApiError> {
            unimplemented!()
        }

        async fn get_deployment(&self, _: u64) -> Result<Deployment, ApiError> {
            unimplemented!()
        }

        async fn update_chain_deployment_status(
            &self,
            _: u64,
            _: DeploymentStatus,
        ) -> Result<(), ApiError> {
            unimplemented!()
        }

        async fn upload_artifacts(&self, _: u64, _: &Path) -> Result<(), ApiError> {
            unimplemented!()
        }

        async fn send_event(&self, _: &Event) -> Result<(), ApiError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn drain_gives_up_after_timeout() {
        let dispatcher = EventDispatcher::new(Arc::new(StalledBackend), true, false);

        dispatcher.submit(EventPayload::program_ended(0, Duration::ZERO));

        assert!(!dispatcher.drain(Duration::from_secs(60)).await);
    }
}
