//! Process-wide store of EIP-6963 announced wallets.
//!
//! The store only grows: the discovery standard has no removal message. Consumers
//! either poll [`ProviderRegistry::snapshot`] and compare with [`Arc::ptr_eq`], or
//! [`ProviderRegistry::subscribe`] to be told about every mutation.
//!
//! Notifications are queued under the lock and delivered outside it by a single
//! drainer, so listeners see snapshots in mutation order even when announcements
//! race across threads or come from inside a listener.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, info};

use crate::domain::WalletProviderInfo;
use crate::ports::{DiscoveryPort, PortError};

pub type ProvidersSnapshot<P> = Arc<[WalletProviderInfo<P>]>;

type Listener<P> = Arc<dyn Fn(&ProvidersSnapshot<P>) + Send + Sync>;

struct RegistryInner<P> {
    providers: ProvidersSnapshot<P>,
    listeners: Vec<(u64, Listener<P>)>,
    next_listener_id: u64,
    listening: bool,
    pending: VecDeque<ProvidersSnapshot<P>>,
    draining: bool,
}

pub struct ProviderRegistry<P> {
    inner: Arc<Mutex<RegistryInner<P>>>,
}

impl<P> Clone for ProviderRegistry<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P> std::fmt::Debug for ProviderRegistry<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let g = lock(&self.inner);
        f.debug_struct("ProviderRegistry")
            .field("providers", &g.providers.len())
            .field("listeners", &g.listeners.len())
            .field("listening", &g.listening)
            .finish()
    }
}

impl<P> Default for ProviderRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> ProviderRegistry<P> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegistryInner {
                providers: Arc::from(Vec::new()),
                listeners: Vec::new(),
                next_listener_id: 0,
                listening: false,
                pending: VecDeque::new(),
                draining: false,
            })),
        }
    }

    /// Attaches the announcement listener once, then asks wallets to (re-)announce.
    ///
    /// Repeated calls only re-broadcast the request; uuid de-duplication keeps the
    /// snapshot unchanged for wallets that were already recorded.
    pub fn initialize<D: DiscoveryPort<P>>(&self, discovery: &D) -> Result<(), PortError> {
        let first = {
            let mut g = lock(&self.inner);
            !std::mem::replace(&mut g.listening, true)
        };
        if first {
            if let Err(e) = discovery.listen(self) {
                lock(&self.inner).listening = false;
                return Err(e);
            }
            info!("listening for wallet provider announcements");
        }
        discovery.request_providers()
    }

    pub fn snapshot(&self) -> ProvidersSnapshot<P> {
        Arc::clone(&lock(&self.inner).providers)
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registers `listener`; it runs after each mutation, outside the registry lock.
    ///
    /// The listener stays registered until the returned handle is dropped or
    /// [`Subscription::unsubscribe`] is called.
    pub fn subscribe<F>(&self, listener: F) -> Subscription<P>
    where
        F: Fn(&ProvidersSnapshot<P>) + Send + Sync + 'static,
    {
        let mut g = lock(&self.inner);
        let id = g.next_listener_id;
        g.next_listener_id = g.next_listener_id.saturating_add(1);
        g.listeners.push((id, Arc::new(listener)));
        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }
}

impl<P: Clone> ProviderRegistry<P> {
    /// Records an announced wallet. First-seen wins per uuid.
    ///
    /// Returns whether the snapshot changed.
    pub fn announce(&self, provider: WalletProviderInfo<P>) -> bool {
        {
            let mut g = lock(&self.inner);
            if g.providers.iter().any(|p| p.uuid == provider.uuid) {
                debug!(uuid = %provider.uuid, "ignoring repeated provider announcement");
                return false;
            }
            info!(uuid = %provider.uuid, name = %provider.name, "wallet provider announced");
            let mut next = Vec::with_capacity(g.providers.len() + 1);
            next.extend(g.providers.iter().cloned());
            next.push(provider);
            g.providers = Arc::from(next);
            let snapshot = Arc::clone(&g.providers);
            g.pending.push_back(snapshot);
            if g.draining {
                // The active drainer delivers this snapshot after the earlier ones.
                return true;
            }
            g.draining = true;
        }
        self.drain_notifications();
        true
    }

    fn drain_notifications(&self) {
        let _reset = DrainReset(&self.inner);
        loop {
            let (snapshot, listeners) = {
                let mut g = lock(&self.inner);
                let Some(snapshot) = g.pending.pop_front() else {
                    g.draining = false;
                    return;
                };
                let listeners: Vec<Listener<P>> =
                    g.listeners.iter().map(|(_, l)| Arc::clone(l)).collect();
                (snapshot, listeners)
            };
            for listener in listeners {
                listener(&snapshot);
            }
        }
    }

    pub fn find(&self, uuid: &str) -> Option<WalletProviderInfo<P>> {
        lock(&self.inner)
            .providers
            .iter()
            .find(|p| p.uuid == uuid)
            .cloned()
    }
}

/// Clears the drainer flag if a listener panics; the next mutation delivers what is left.
struct DrainReset<'a, P>(&'a Mutex<RegistryInner<P>>);

impl<P> Drop for DrainReset<'_, P> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            lock(self.0).draining = false;
        }
    }
}

/// Handle returned by [`ProviderRegistry::subscribe`]. Dropping it removes the listener.
#[must_use = "dropping a Subscription removes its listener"]
pub struct Subscription<P> {
    id: u64,
    registry: Weak<Mutex<RegistryInner<P>>>,
}

impl<P> std::fmt::Debug for Subscription<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl<P> Subscription<P> {
    /// Removes the listener. Returns `false` if it was already gone.
    pub fn unsubscribe(self) -> bool {
        self.remove()
    }

    fn remove(&self) -> bool {
        let Some(inner) = self.registry.upgrade() else {
            return false;
        };
        let mut g = lock(&inner);
        let before = g.listeners.len();
        g.listeners.retain(|(id, _)| *id != self.id);
        g.listeners.len() != before
    }
}

impl<P> Drop for Subscription<P> {
    fn drop(&mut self) {
        self.remove();
    }
}

fn lock<P>(inner: &Mutex<RegistryInner<P>>) -> MutexGuard<'_, RegistryInner<P>> {
    // Listeners never run under the lock, so a poisoned guard still holds consistent data.
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}
