//! Adapter runtime integration.
//!
//! Bridges the synchronous game loop with the async TCP server. The game loop
//! owns the engine; the server only sees commands going in and observations,
//! acks, and errors coming out.

use std::sync::Arc;

use anyhow::Context;
use arrayvec::ArrayVec;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::engine::{GameEngine, GameSnapshot};
use crate::protocol::{
    build_observation, create_ack, AckMessage, ErrorMessage, ObservationMessage, MAX_ACTIONS,
};
use crate::server::{run_server, AdapterStatus, ServerConfig};
use crate::types::GameAction;

/// Command delivered to the game loop.
#[derive(Debug, Clone)]
pub struct InboundCommand {
    pub client_id: usize,
    pub seq: u64,
    pub payload: InboundPayload,
}

#[derive(Debug, Clone)]
pub enum InboundPayload {
    Command(ClientCommand),
    /// A streaming client just said hello and wants the current state
    SnapshotRequest,
}

/// Engine actions from one command message, applied in order within one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCommand {
    pub actions: ArrayVec<GameAction, MAX_ACTIONS>,
}

/// Outbound message to be delivered by the server.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    ToClientObservation { client_id: usize, obs: ObservationMessage },
    BroadcastObservation { obs: ObservationMessage },
    ToClientAck { client_id: usize, ack: AckMessage },
    ToClientError { client_id: usize, err: ErrorMessage },
}

/// Game-loop side of the adapter channels.
///
/// Call [`Bridge::pump`] once per tick after advancing the engine.
pub struct Bridge {
    cmd_rx: mpsc::Receiver<InboundCommand>,
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
    obs_seq: u64,
    last_broadcast_hash: Option<u64>,
}

impl Bridge {
    pub fn new(
        cmd_rx: mpsc::Receiver<InboundCommand>,
        out_tx: mpsc::UnboundedSender<OutboundMessage>,
    ) -> Self {
        Self {
            cmd_rx,
            out_tx,
            obs_seq: 0,
            last_broadcast_hash: None,
        }
    }

    /// Apply pending commands, answer snapshot requests, and broadcast an
    /// observation when the discrete state changed.
    ///
    /// `snap` is refreshed from the engine. Returns the number of commands applied.
    pub fn pump(&mut self, engine: &mut GameEngine, snap: &mut GameSnapshot) -> usize {
        let mut applied = 0;
        engine.snapshot_into(snap);

        while let Ok(cmd) = self.cmd_rx.try_recv() {
            match cmd.payload {
                InboundPayload::Command(command) => {
                    let accepted = command
                        .actions
                        .iter()
                        .filter(|a| engine.apply_action(**a))
                        .count() as u32;
                    debug!(
                        client_id = cmd.client_id,
                        seq = cmd.seq,
                        accepted,
                        "remote command applied"
                    );
                    engine.snapshot_into(snap);
                    applied += 1;
                    self.send(OutboundMessage::ToClientAck {
                        client_id: cmd.client_id,
                        ack: create_ack(cmd.seq, accepted),
                    });
                }
                InboundPayload::SnapshotRequest => {
                    let obs = self.observation(snap);
                    self.send(OutboundMessage::ToClientObservation {
                        client_id: cmd.client_id,
                        obs,
                    });
                }
            }
        }

        let hash = snap.state_hash();
        if self.last_broadcast_hash != Some(hash) {
            self.last_broadcast_hash = Some(hash);
            let obs = self.observation(snap);
            self.send(OutboundMessage::BroadcastObservation { obs });
        }
        applied
    }

    pub fn send(&self, msg: OutboundMessage) {
        let _ = self.out_tx.send(msg);
    }

    fn observation(&mut self, snap: &GameSnapshot) -> ObservationMessage {
        self.obs_seq += 1;
        build_observation(snap, self.obs_seq)
    }
}

/// Running adapter instance with its own tokio runtime.
pub struct Adapter {
    _rt: Runtime,
    bridge: Bridge,
    status: Arc<AdapterStatus>,
}

impl Adapter {
    /// Start the adapter from environment variables.
    ///
    /// Returns `Ok(None)` if `MERGE_DROP_AI_DISABLED` is set.
    pub fn start_from_env() -> anyhow::Result<Option<Self>> {
        if ServerConfig::is_disabled() {
            info!("adapter disabled via MERGE_DROP_AI_DISABLED");
            return Ok(None);
        }
        Self::start(ServerConfig::from_env()).map(Some)
    }

    pub fn start(config: ServerConfig) -> anyhow::Result<Self> {
        let max_pending = config.max_pending_commands.max(1);
        let (cmd_tx, cmd_rx) = mpsc::channel::<InboundCommand>(max_pending);
        let (out_tx, out_rx) = mpsc::unbounded_channel::<OutboundMessage>();
        let status = Arc::new(AdapterStatus::default());

        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("merge-drop-adapter")
            .enable_all()
            .build()
            .context("create adapter runtime")?;
        let server_status = Arc::clone(&status);
        rt.spawn(async move {
            if let Err(e) = run_server(config, cmd_tx, out_rx, None, server_status).await {
                error!(error = %e, "adapter server stopped");
            }
        });

        Ok(Self {
            _rt: rt,
            bridge: Bridge::new(cmd_rx, out_tx),
            status,
        })
    }

    pub fn pump(&mut self, engine: &mut GameEngine, snap: &mut GameSnapshot) -> usize {
        self.bridge.pump(engine, snap)
    }

    pub fn status(&self) -> &AdapterStatus {
        &self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::types::Lifecycle;

    fn bridge() -> (
        Bridge,
        mpsc::Sender<InboundCommand>,
        mpsc::UnboundedReceiver<OutboundMessage>,
    ) {
        let (cmd_tx, cmd_rx) = mpsc::channel(4);
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        (Bridge::new(cmd_rx, out_tx), cmd_tx, out_rx)
    }

    #[test]
    fn commands_are_applied_then_acked() {
        let (mut bridge, cmd_tx, mut out_rx) = bridge();
        let mut engine = GameEngine::new(EngineConfig::headless());
        let mut snap = GameSnapshot::default();

        let mut actions = ArrayVec::new();
        actions.push(GameAction::Start);
        actions.push(GameAction::Start);
        cmd_tx
            .try_send(InboundCommand {
                client_id: 1,
                seq: 5,
                payload: InboundPayload::Command(ClientCommand { actions }),
            })
            .unwrap();

        assert_eq!(bridge.pump(&mut engine, &mut snap), 1);
        assert_eq!(snap.lifecycle, Lifecycle::Playing);

        match out_rx.try_recv().unwrap() {
            OutboundMessage::ToClientAck { client_id, ack } => {
                assert_eq!(client_id, 1);
                assert_eq!(ack.seq, 5);
                // The second start is a no-op.
                assert_eq!(ack.applied, 1);
            }
            other => panic!("expected ack, got {other:?}"),
        }
        assert!(matches!(
            out_rx.try_recv().unwrap(),
            OutboundMessage::BroadcastObservation { .. }
        ));
    }

    #[test]
    fn unchanged_state_is_broadcast_once() {
        let (mut bridge, _cmd_tx, mut out_rx) = bridge();
        let mut engine = GameEngine::new(EngineConfig::headless());
        let mut snap = GameSnapshot::default();

        bridge.pump(&mut engine, &mut snap);
        bridge.pump(&mut engine, &mut snap);
        assert!(out_rx.try_recv().is_ok());
        assert!(out_rx.try_recv().is_err());
    }

    #[test]
    fn snapshot_requests_get_a_direct_observation() {
        let (mut bridge, cmd_tx, mut out_rx) = bridge();
        let mut engine = GameEngine::new(EngineConfig::headless());
        let mut snap = GameSnapshot::default();

        cmd_tx
            .try_send(InboundCommand {
                client_id: 2,
                seq: 1,
                payload: InboundPayload::SnapshotRequest,
            })
            .unwrap();
        bridge.pump(&mut engine, &mut snap);

        match out_rx.try_recv().unwrap() {
            OutboundMessage::ToClientObservation { client_id, obs } => {
                assert_eq!(client_id, 2);
                assert_eq!(obs.seq, 1);
            }
            other => panic!("expected observation, got {other:?}"),
        }
    }
}
