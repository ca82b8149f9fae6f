//! Platform id to bridge controller ownership, with registration reservations.

use crate::control_plane::bridge_controller::BridgeController;
use crate::error::MiddlewareError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

enum Slot {
    /// Registration in progress; the controller is being constructed.
    Reserved,
    Active(Arc<BridgeController>),
    /// Teardown in progress; the id stays claimed until its resources are released.
    Unregistering,
}

#[derive(Default)]
struct Slots {
    by_platform: HashMap<String, Slot>,
    closed: bool,
}

/// At most one slot per platform id. Reservation happens before any broker
/// work so concurrent registrations of one platform cannot both proceed.
pub(crate) struct PlatformRegistry {
    slots: Mutex<Slots>,
}

impl PlatformRegistry {
    pub(crate) fn new() -> Self {
        Self {
            slots: Mutex::new(Slots::default()),
        }
    }

    /// Claims `platform_id`. Fails when it is claimed in any state, or once closed.
    pub(crate) async fn reserve(&self, platform_id: &str) -> Result<(), MiddlewareError> {
        let mut slots = self.slots.lock().await;
        if slots.closed {
            return Err(MiddlewareError::ResourceCacheClosed);
        }
        if slots.by_platform.contains_key(platform_id) {
            return Err(MiddlewareError::AlreadyRegistered(platform_id.to_string()));
        }
        slots
            .by_platform
            .insert(platform_id.to_string(), Slot::Reserved);
        Ok(())
    }

    /// Turns a reservation into an active registration.
    ///
    /// After [`Self::close`] the reservation is dropped instead and the
    /// controller is handed back for teardown.
    pub(crate) async fn activate(
        &self,
        platform_id: &str,
        controller: Arc<BridgeController>,
    ) -> Result<(), Arc<BridgeController>> {
        let mut slots = self.slots.lock().await;
        if slots.closed {
            slots.by_platform.remove(platform_id);
            return Err(controller);
        }
        slots
            .by_platform
            .insert(platform_id.to_string(), Slot::Active(controller));
        Ok(())
    }

    /// Drops a reservation after a failed registration. Other slots are left alone.
    pub(crate) async fn cancel(&self, platform_id: &str) {
        let mut slots = self.slots.lock().await;
        if matches!(slots.by_platform.get(platform_id), Some(Slot::Reserved)) {
            slots.by_platform.remove(platform_id);
        }
    }

    /// Hands out the active controller of `platform_id` for teardown.
    ///
    /// The id stays claimed until [`Self::finish_unregister`].
    pub(crate) async fn begin_unregister(
        &self,
        platform_id: &str,
    ) -> Result<Arc<BridgeController>, MiddlewareError> {
        let mut slots = self.slots.lock().await;
        let Some(slot) = slots.by_platform.get_mut(platform_id) else {
            return Err(MiddlewareError::NotRegistered(platform_id.to_string()));
        };
        if !matches!(slot, Slot::Active(_)) {
            return Err(MiddlewareError::NotRegistered(platform_id.to_string()));
        }

        match std::mem::replace(slot, Slot::Unregistering) {
            Slot::Active(controller) => Ok(controller),
            _ => Err(MiddlewareError::NotRegistered(platform_id.to_string())),
        }
    }

    /// Releases the claim left by [`Self::begin_unregister`].
    pub(crate) async fn finish_unregister(&self, platform_id: &str) {
        let mut slots = self.slots.lock().await;
        if matches!(slots.by_platform.get(platform_id), Some(Slot::Unregistering)) {
            slots.by_platform.remove(platform_id);
        }
    }

    /// Whether `platform_id` has a slot at all, in any state.
    pub(crate) async fn is_claimed(&self, platform_id: &str) -> bool {
        self.slots.lock().await.by_platform.contains_key(platform_id)
    }

    pub(crate) async fn is_active(&self, platform_id: &str) -> bool {
        matches!(
            self.slots.lock().await.by_platform.get(platform_id),
            Some(Slot::Active(_))
        )
    }

    pub(crate) async fn active_platform_ids(&self) -> Vec<String> {
        let mut platform_ids: Vec<String> = self
            .slots
            .lock()
            .await
            .by_platform
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Active(_)))
            .map(|(platform_id, _)| platform_id.clone())
            .collect();
        platform_ids.sort();
        platform_ids
    }

    /// Closes the registry and removes every active controller.
    ///
    /// Reservations still in flight are rejected when they try to activate.
    pub(crate) async fn close(&self) -> Vec<Arc<BridgeController>> {
        let mut slots = self.slots.lock().await;
        slots.closed = true;

        let active_ids: Vec<String> = slots
            .by_platform
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Active(_)))
            .map(|(platform_id, _)| platform_id.clone())
            .collect();

        active_ids
            .into_iter()
            .filter_map(|platform_id| match slots.by_platform.remove(&platform_id) {
                Some(Slot::Active(controller)) => Some(controller),
                _ => None,
            })
            .collect()
    }
}
