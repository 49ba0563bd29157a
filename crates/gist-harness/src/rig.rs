//! A full client wired to scripted seams.

use std::{sync::Arc, time::Duration};

use gist_client::{ConnectionManager, ConnectionStatus, GatewayConfig};
use gist_store::{Action, GistEnvironment, InAppMessageState, InAppPipeline, Store};

use crate::{Recorder, ScriptedPolling, ScriptedTransport, SimEnv};

/// Pause that lets every runnable task finish before the clock moves.
///
/// Under a paused runtime the clock only auto-advances once nothing else can
/// run, so this returns after all pending commands and reader events have
/// been handled, having advanced time by one millisecond.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// Store, manager and scripted network, sharing one [`SimEnv`].
pub struct Rig {
    /// The store the manager feeds.
    pub store: Arc<Store>,
    /// Manager handle.
    pub manager: ConnectionManager,
    /// Scripted SSE transport.
    pub transport: Arc<ScriptedTransport>,
    /// Scripted queue API.
    pub polling: Arc<ScriptedPolling>,
    /// Collaborator recording store side effects.
    pub recorder: Arc<Recorder>,
}

impl Rig {
    /// Rig with the default gateway configuration.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(transport: ScriptedTransport, polling: ScriptedPolling) -> Self {
        Self::with_config(GatewayConfig::default(), transport, polling)
    }

    /// Rig with `config`.
    pub fn with_config(config: GatewayConfig, transport: ScriptedTransport, polling: ScriptedPolling) -> Self {
        let recorder = Recorder::new();
        let store = Arc::new(Store::new(InAppPipeline::standard(Recorder::collaborators(&recorder))));
        let transport = Arc::new(transport);
        let polling = Arc::new(polling);

        let manager = ConnectionManager::spawn(
            SimEnv::with_seed(0),
            config,
            Arc::clone(&store),
            Arc::clone(&transport) as _,
            Arc::clone(&polling) as _,
        );

        Self { store, manager, transport, polling, recorder }
    }

    /// Configure the workspace and identify `user_id`.
    pub async fn identify(&self, user_id: &str) {
        let actions = [
            Action::Initialize {
                site_id: "site-1".into(),
                data_center: "us".into(),
                environment: GistEnvironment::Production,
            },
            Action::SetUserIdentifier(user_id.into()),
        ];
        for action in actions {
            if let Err(error) = self.store.dispatch(action).await {
                tracing::warn!(%error, "rig dispatch failed");
            }
        }
    }

    /// Current store snapshot.
    pub fn state(&self) -> Arc<InAppMessageState> {
        self.store.state()
    }

    /// Manager status after letting pending work finish.
    ///
    /// # Panics
    ///
    /// If the manager task has exited.
    #[allow(clippy::expect_used)]
    pub async fn status(&self) -> ConnectionStatus {
        settle().await;
        self.manager.status().await.expect("manager is running")
    }
}
