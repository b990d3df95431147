//! Top-level real-time engine that ties together all subsystems.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use memberhub_core::config::AppConfig;
use memberhub_core::result::AppResult;
use memberhub_core::traits::Clock;
use memberhub_core::types::UserId;
use memberhub_database::Stores;
use memberhub_entity::presence::{PresenceSnapshot, PresenceStatus};
use memberhub_service::{
    ConversationLedger, NotificationService, ReferenceResolver, RetentionPolicy, StoreGuard,
};

use crate::bridge::chat::MessagingBridge;
use crate::connection::authenticator::CredentialVerifier;
use crate::connection::gateway::ConnectionGateway;
use crate::notification::dispatcher::NotificationDispatcher;
use crate::presence::registry::PresenceRegistry;
use crate::presence::sweeper::IdleSweeper;
use crate::room::access::ConversationRoomAccess;

/// Central real-time engine that coordinates all subsystems.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Presence registry.
    pub presence: Arc<PresenceRegistry>,
    /// Connection gateway.
    pub gateway: Arc<ConnectionGateway>,
    /// Conversation ledger.
    pub ledger: Arc<ConversationLedger>,
    /// Notification persistence.
    pub notifications: Arc<NotificationService>,
    /// Notification fan-out.
    pub dispatcher: Arc<NotificationDispatcher>,
    /// Send and mark-read flows.
    pub bridge: Arc<MessagingBridge>,
    /// Eager idle sweep.
    pub sweeper: Arc<IdleSweeper>,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine")
            .field("presence", &self.presence)
            .field("gateway", &self.gateway)
            .finish()
    }
}

impl RealtimeEngine {
    /// Wires every subsystem over `stores`.
    pub fn new(
        config: &AppConfig,
        stores: &Stores,
        clock: Arc<dyn Clock>,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> AppResult<Self> {
        let (shutdown_tx, _) = broadcast::channel(1);
        let guard = StoreGuard::new(config.database.store_timeout());

        let presence = Arc::new(
            PresenceRegistry::new(clock.clone(), config.presence.idle_timeout())
                .with_detached_timeout(config.presence.detached_timeout()),
        );
        let ledger = Arc::new(ConversationLedger::new(
            stores.conversations.clone(),
            guard.clone(),
            clock.clone(),
        ));
        let gateway = Arc::new(ConnectionGateway::new(
            config.realtime.clone(),
            presence.clone(),
            verifier,
            Arc::new(ConversationRoomAccess::new(ledger.clone())),
            clock.clone(),
        ));
        let notifications = Arc::new(NotificationService::new(
            stores.notifications.clone(),
            guard.clone(),
            clock,
            RetentionPolicy::from_config(&config.notifications)?,
        ));
        let dispatcher = Arc::new(NotificationDispatcher::new(
            notifications.clone(),
            gateway.clone(),
            stores.directory.clone(),
            ReferenceResolver::with_defaults(),
            guard.clone(),
        ));
        let bridge = Arc::new(MessagingBridge::new(
            ledger.clone(),
            gateway.clone(),
            dispatcher.clone(),
            stores.directory.clone(),
            guard,
        ));
        let sweeper = Arc::new(IdleSweeper::new(
            presence.clone(),
            gateway.clone(),
            config.presence.offline_retention(),
        ));

        info!(
            idle_timeout_seconds = config.presence.idle_timeout_seconds,
            max_connections_per_user = config.realtime.max_connections_per_user,
            "Real-time engine initialized"
        );

        Ok(Self {
            presence,
            gateway,
            ledger,
            notifications,
            dispatcher,
            bridge,
            sweeper,
            shutdown_tx,
        })
    }

    /// Presence of one member; a lazy idle transition is broadcast.
    pub fn presence_of(&self, user: UserId) -> PresenceSnapshot {
        let (snapshot, change) = self.presence.query_reconciled(user);
        if let Some(change) = change {
            self.gateway.broadcast_presence(change);
        }
        snapshot
    }

    /// Presence of several members; lazy transitions are broadcast.
    pub fn presence_bulk(&self, users: &[UserId]) -> HashMap<UserId, PresenceStatus> {
        let (statuses, changes) = self.presence.bulk_query_reconciled(users);
        for change in changes {
            self.gateway.broadcast_presence(change);
        }
        statuses
    }

    /// Returns a shutdown receiver for graceful shutdown coordination.
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Initiates a graceful shutdown of the real-time engine.
    pub fn shutdown(&self) {
        info!("Shutting down real-time engine");
        let _ = self.shutdown_tx.send(());
        self.gateway.close_all();
        info!("Real-time engine shut down");
    }
}
