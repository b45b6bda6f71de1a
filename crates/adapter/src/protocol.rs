//! Protocol module - JSON message types for the remote adapter
//!
//! Every message is one JSON object per line with `type`, `seq` (sender sequence number)
//! and `ts` (milliseconds since the Unix epoch).

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use crate::engine::GameSnapshot;
use crate::types::{
    CyclePhase, GameAction, GameOverCause, Lifecycle, GRID_HEIGHT, GRID_WIDTH, MAX_ACTIVE_VALUES,
    QUEUE_LEN,
};

/// Protocol version spoken by this server; clients must share the major version
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Most actions accepted in one command message
pub const MAX_ACTIONS: usize = 16;

// ============== Client -> Game Messages ==============

/// Client hello message (first message to establish connection)
#[derive(Debug, Clone, Deserialize)]
pub struct HelloMessage {
    pub seq: u64,
    #[serde(default)]
    pub ts: u64,
    pub client: ClientInfo,
    pub protocol_version: String,
    #[serde(default)]
    pub requested: RequestedCapabilities,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestedCapabilities {
    #[serde(default)]
    pub stream_observations: bool,
}

/// One engine action as sent on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum CommandAction {
    /// Any integer parses; columns off the grid become a rejected action
    SelectColumn { column: i64 },
    TogglePause,
    Restart,
    Start,
}

impl From<CommandAction> for GameAction {
    fn from(value: CommandAction) -> Self {
        match value {
            CommandAction::SelectColumn { column } => GameAction::SelectColumn(
                u8::try_from(column)
                    .ok()
                    .filter(|c| *c < GRID_WIDTH)
                    .unwrap_or(GRID_WIDTH),
            ),
            CommandAction::TogglePause => GameAction::TogglePause,
            CommandAction::Restart => GameAction::Restart,
            CommandAction::Start => GameAction::Start,
        }
    }
}

/// Command message (controller only)
#[derive(Debug, Clone, Deserialize)]
pub struct CommandMessage {
    pub seq: u64,
    #[serde(default)]
    pub ts: u64,
    pub actions: Vec<CommandAction>,
}

impl CommandMessage {
    /// Engine actions, or `None` when the list is empty or too long
    pub fn game_actions(&self) -> Option<ArrayVec<GameAction, MAX_ACTIONS>> {
        if self.actions.is_empty() {
            return None;
        }
        let mut out = ArrayVec::new();
        for a in &self.actions {
            out.try_push(GameAction::from(*a)).ok()?;
        }
        Some(out)
    }
}

/// Control message (claim/release controller status)
#[derive(Debug, Clone, Deserialize)]
pub struct ControlMessage {
    pub seq: u64,
    #[serde(default)]
    pub ts: u64,
    pub action: ControlAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    Claim,
    Release,
}

// ============== Game -> Client Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WelcomeType {
    #[serde(rename = "welcome")]
    Welcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckType {
    #[serde(rename = "ack")]
    Ack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckStatus {
    #[serde(rename = "ok")]
    Ok,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    #[serde(rename = "error")]
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    HandshakeRequired,
    ProtocolMismatch,
    NotController,
    ControllerActive,
    InvalidCommand,
    Backpressure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignedRole {
    Controller,
    Observer,
}

/// Welcome message (response to hello)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeMessage {
    #[serde(rename = "type")]
    pub msg_type: WelcomeType,
    pub seq: u64,
    pub ts: u64,
    pub protocol_version: String,
    pub client_id: u64,
    pub role: AssignedRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_id: Option<u64>,
    pub game_id: String,
    pub grid: GridSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub width: u8,
    pub height: u8,
}

/// Acknowledgment, sent after the command was applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckMessage {
    #[serde(rename = "type")]
    pub msg_type: AckType,
    pub seq: u64,
    pub ts: u64,
    pub status: AckStatus,
    /// Number of actions the engine accepted
    pub applied: u32,
}

/// Error message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    #[serde(rename = "type")]
    pub msg_type: ErrorType,
    pub seq: u64,
    pub ts: u64,
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObservationType {
    #[serde(rename = "observation")]
    Observation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleName {
    AwaitingStart,
    Playing,
    Paused,
    GameOver,
}

impl From<Lifecycle> for LifecycleName {
    fn from(value: Lifecycle) -> Self {
        match value {
            Lifecycle::AwaitingStart => Self::AwaitingStart,
            Lifecycle::Playing => Self::Playing,
            Lifecycle::Paused => Self::Paused,
            Lifecycle::GameOver => Self::GameOver,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PhaseName {
    Idle,
    Sliding,
    Falling,
    Resolving,
}

impl From<CyclePhase> for PhaseName {
    fn from(value: CyclePhase) -> Self {
        match value {
            CyclePhase::Idle => Self::Idle,
            CyclePhase::Sliding => Self::Sliding,
            CyclePhase::Falling => Self::Falling,
            CyclePhase::Resolving => Self::Resolving,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GameOverCauseWire {
    ColumnBlocked { column: u8 },
    DeathRowLanding { column: u8 },
    GravityOverflow { column: u8 },
    NoDropColumn,
}

impl From<GameOverCause> for GameOverCauseWire {
    fn from(value: GameOverCause) -> Self {
        match value {
            GameOverCause::ColumnBlocked { column } => Self::ColumnBlocked { column },
            GameOverCause::DeathRowLanding { column } => Self::DeathRowLanding { column },
            GameOverCause::GravityOverflow { column } => Self::GravityOverflow { column },
            GameOverCause::NoDropColumn => Self::NoDropColumn,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridCells {
    pub width: u8,
    pub height: u8,
    /// Row 0 is the slide lane, row 1 the death row; 0 = empty
    pub cells: [[u64; GRID_WIDTH as usize]; GRID_HEIGHT as usize],
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SlidingWire {
    pub value: u64,
    pub source_column: u8,
    pub target_column: u8,
    pub progress: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FallingWire {
    pub value: u64,
    pub column: u8,
    pub target_row: u8,
    pub progress: f32,
}

/// Game state observation (sent to streaming clients)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationMessage {
    #[serde(rename = "type")]
    pub msg_type: ObservationType,
    pub seq: u64,
    pub ts: u64,
    pub playable: bool,
    pub accepts_selection: bool,
    pub lifecycle: LifecycleName,
    pub phase: PhaseName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_over_cause: Option<GameOverCauseWire>,
    pub episode_id: u32,
    pub seed: u32,
    pub tile_id: u32,
    pub grid: GridCells,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sliding: Option<SlidingWire>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub falling: Option<FallingWire>,
    pub dangerous_columns: [bool; GRID_WIDTH as usize],
    pub next_queue: [u64; QUEUE_LEN],
    pub available_values: ArrayVec<u64, MAX_ACTIVE_VALUES>,
    pub last_drop_column: u8,
    pub pass_count: u32,
    pub score: u64,
    pub best_score: u64,
    pub coins: u64,
    pub current_goal: u64,
    pub level: u32,
    pub state_hash: StateHash,
}

/// Build observation message from an engine snapshot
pub fn build_observation(snap: &GameSnapshot, seq: u64) -> ObservationMessage {
    ObservationMessage {
        msg_type: ObservationType::Observation,
        seq,
        ts: current_timestamp_ms(),
        playable: snap.playable(),
        accepts_selection: snap.accepts_selection(),
        lifecycle: snap.lifecycle.into(),
        phase: snap.phase.into(),
        game_over_cause: snap.game_over_cause.map(GameOverCauseWire::from),
        episode_id: snap.episode_id,
        seed: snap.seed,
        tile_id: snap.tile_id,
        grid: GridCells {
            width: GRID_WIDTH,
            height: GRID_HEIGHT,
            cells: snap.grid,
        },
        sliding: snap.sliding.map(|t| SlidingWire {
            value: t.value,
            source_column: t.source_column,
            target_column: t.target_column,
            progress: t.progress,
        }),
        falling: snap.falling.map(|t| FallingWire {
            value: t.value,
            column: t.column,
            target_row: t.target_row,
            progress: t.progress,
        }),
        dangerous_columns: snap.dangerous_columns,
        next_queue: snap.next_queue,
        available_values: snap.available_values.clone(),
        last_drop_column: snap.last_drop_column,
        pass_count: snap.pass_count,
        score: snap.score,
        best_score: snap.best_score,
        coins: snap.coins,
        current_goal: snap.current_goal,
        level: snap.level,
        state_hash: StateHash(snap.state_hash()),
    }
}

/// Deterministic state hash serialized as lowercase hex (without heap allocation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateHash(pub u64);

impl Serialize for StateHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let mut buf = [0u8; 16];
        let mut v = self.0;
        for i in 0..16 {
            buf[15 - i] = HEX[(v & 0x0f) as usize];
            v >>= 4;
        }
        match std::str::from_utf8(&buf) {
            Ok(s) => serializer.serialize_str(s),
            Err(e) => Err(serde::ser::Error::custom(e)),
        }
    }
}

impl<'de> Deserialize<'de> for StateHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        u64::from_str_radix(s.trim(), 16)
            .map(StateHash)
            .map_err(|_| serde::de::Error::custom("invalid hex"))
    }
}

// ============== Message Parsing ==============

/// Parsed incoming message
#[derive(Debug, Clone)]
pub enum ParsedMessage {
    Hello(HelloMessage),
    Command(CommandMessage),
    Control(ControlMessage),
    Unknown(UnknownMessage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownMessage {
    pub seq: u64,
}

/// Parse a JSON message from a string
pub fn parse_message(json: &str) -> Result<ParsedMessage, serde_json::Error> {
    #[derive(Debug, Deserialize)]
    #[serde(tag = "type", rename_all = "lowercase")]
    enum InboundMessage {
        Hello(HelloMessage),
        Command(CommandMessage),
        Control(ControlMessage),
    }

    match serde_json::from_str::<InboundMessage>(json) {
        Ok(InboundMessage::Hello(m)) => Ok(ParsedMessage::Hello(m)),
        Ok(InboundMessage::Command(m)) => Ok(ParsedMessage::Command(m)),
        Ok(InboundMessage::Control(m)) => Ok(ParsedMessage::Control(m)),
        Err(e) => {
            // An unknown message type is answered, not treated as malformed JSON.
            #[derive(Debug, Deserialize)]
            struct Envelope {
                #[serde(rename = "type")]
                msg_type: Option<String>,
                seq: Option<u64>,
            }
            let envelope = serde_json::from_str::<Envelope>(json)?;
            match envelope.msg_type.as_deref() {
                Some("hello" | "command" | "control") => Err(e),
                _ => Ok(ParsedMessage::Unknown(UnknownMessage {
                    seq: envelope.seq.unwrap_or(0),
                })),
            }
        }
    }
}

/// Best-effort `seq` extraction from a line that failed to parse.
pub fn extract_seq_best_effort(s: &str) -> Option<u64> {
    let start = s.find("\"seq\"")?;
    let after_key = &s[start + 5..];
    let colon = after_key.find(':')?;
    let rest = after_key[colon + 1..].trim_start();
    let end = rest.bytes().take_while(u8::is_ascii_digit).count();
    rest[..end].parse::<u64>().ok()
}

// ============== Utility Functions ==============

/// Create a welcome message
pub fn create_welcome(
    seq: u64,
    client_id: u64,
    role: AssignedRole,
    controller_id: Option<u64>,
) -> WelcomeMessage {
    WelcomeMessage {
        msg_type: WelcomeType::Welcome,
        seq,
        ts: current_timestamp_ms(),
        protocol_version: PROTOCOL_VERSION.to_string(),
        client_id,
        role,
        controller_id,
        game_id: "merge-drop".to_string(),
        grid: GridSize {
            width: GRID_WIDTH,
            height: GRID_HEIGHT,
        },
    }
}

/// Create an acknowledgment
pub fn create_ack(seq: u64, applied: u32) -> AckMessage {
    AckMessage {
        msg_type: AckType::Ack,
        seq,
        ts: current_timestamp_ms(),
        status: AckStatus::Ok,
        applied,
    }
}

/// Create an error message
pub fn create_error(seq: u64, code: ErrorCode, message: &str) -> ErrorMessage {
    ErrorMessage {
        msg_type: ErrorType::Error,
        seq,
        ts: current_timestamp_ms(),
        code,
        message: message.to_string(),
    }
}

/// Protocol versions are compatible when the major versions match
pub fn is_compatible_version(version: &str) -> bool {
    let major = |v: &str| v.split('.').next().map(str::trim).map(str::to_owned);
    major(version).is_some_and(|m| Some(m) == major(PROTOCOL_VERSION))
}

/// Get current timestamp in milliseconds
fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineConfig, GameEngine};

    #[test]
    fn test_parse_hello() {
        let json = r#"{"type":"hello","seq":1,"ts":1234567890,"client":{"name":"test-ai","version":"1.0.0"},"protocol_version":"1.0.0","requested":{"stream_observations":true}}"#;

        match parse_message(json).unwrap() {
            ParsedMessage::Hello(msg) => {
                assert_eq!(msg.seq, 1);
                assert_eq!(msg.client.name, "test-ai");
                assert!(msg.requested.stream_observations);
            }
            other => panic!("Expected Hello message, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_command_actions() {
        let json = r#"{"type":"command","seq":2,"ts":1,"actions":[{"action":"selectColumn","column":4},{"action":"togglePause"},{"action":"start"}]}"#;

        match parse_message(json).unwrap() {
            ParsedMessage::Command(msg) => {
                let actions = msg.game_actions().unwrap();
                assert_eq!(
                    actions.as_slice(),
                    &[
                        GameAction::SelectColumn(4),
                        GameAction::TogglePause,
                        GameAction::Start
                    ]
                );
            }
            other => panic!("Expected Command message, got {other:?}"),
        }
    }

    #[test]
    fn test_off_grid_columns_parse_as_rejected_selections() {
        let json = r#"{"type":"command","seq":1,"ts":1,"actions":[{"action":"selectColumn","column":300},{"action":"selectColumn","column":-1},{"action":"selectColumn","column":6}]}"#;

        match parse_message(json).unwrap() {
            ParsedMessage::Command(msg) => {
                let actions = msg.game_actions().unwrap();
                assert_eq!(actions.len(), 3);
                assert!(actions
                    .iter()
                    .all(|a| matches!(a, GameAction::SelectColumn(c) if *c >= GRID_WIDTH)));

                let mut engine = GameEngine::new(EngineConfig::headless());
                assert!(engine.start());
                assert!(actions.iter().all(|a| !engine.apply_action(*a)));
                assert_eq!(engine.phase(), CyclePhase::Idle);
            }
            other => panic!("Expected Command message, got {other:?}"),
        }
    }

    #[test]
    fn test_command_with_unknown_action_is_rejected() {
        let json = r#"{"type":"command","seq":2,"ts":1,"actions":[{"action":"hardDrop"}]}"#;
        assert!(parse_message(json).is_err());
    }

    #[test]
    fn test_oversized_or_empty_command_has_no_actions() {
        let many = CommandMessage {
            seq: 1,
            ts: 0,
            actions: vec![CommandAction::Restart; MAX_ACTIONS + 1],
        };
        assert!(many.game_actions().is_none());
        let none = CommandMessage {
            seq: 1,
            ts: 0,
            actions: Vec::new(),
        };
        assert!(none.game_actions().is_none());
    }

    #[test]
    fn test_parse_control_and_unknown() {
        let json = r#"{"type":"control","seq":3,"ts":1,"action":"release"}"#;
        match parse_message(json).unwrap() {
            ParsedMessage::Control(msg) => assert_eq!(msg.action, ControlAction::Release),
            other => panic!("Expected Control message, got {other:?}"),
        }

        let json = r#"{"type":"ping","seq":9}"#;
        match parse_message(json).unwrap() {
            ParsedMessage::Unknown(u) => assert_eq!(u.seq, 9),
            other => panic!("Expected Unknown message, got {other:?}"),
        }
    }

    #[test]
    fn test_error_code_wire_names() {
        let err = create_error(5, ErrorCode::NotController, "Only controller may send commands");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains(r#""type":"error""#));
        assert!(json.contains(r#""code":"not_controller""#));
    }

    #[test]
    fn test_state_hash_is_fixed_width_hex() {
        let json = serde_json::to_string(&StateHash(0xabc)).unwrap();
        assert_eq!(json, r#""0000000000000abc""#);
        let back: StateHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, StateHash(0xabc));
    }

    #[test]
    fn test_observation_mirrors_snapshot() {
        let mut snap = GameSnapshot::default();
        snap.grid[7][2] = 16;
        snap.game_over_cause = Some(GameOverCause::ColumnBlocked { column: 3 });
        snap.lifecycle = Lifecycle::GameOver;

        let obs = build_observation(&snap, 4);
        assert_eq!(obs.grid.cells[7][2], 16);
        assert_eq!(obs.lifecycle, LifecycleName::GameOver);
        assert!(!obs.playable);
        assert_eq!(obs.state_hash, StateHash(snap.state_hash()));

        let json = serde_json::to_string(&obs).unwrap();
        assert!(json.contains(r#""game_over_cause":{"kind":"columnBlocked","column":3}"#));
        assert!(json.contains(r#""lifecycle":"gameOver""#));
    }

    #[test]
    fn test_version_compatibility() {
        assert!(is_compatible_version("1.0.0"));
        assert!(is_compatible_version("1.4"));
        assert!(!is_compatible_version("2.0.0"));
        assert!(!is_compatible_version(""));
    }

    #[test]
    fn test_seq_extraction() {
        assert_eq!(extract_seq_best_effort(r#"{"seq": 42, "type":"#), Some(42));
        assert_eq!(extract_seq_best_effort("garbage"), None);
    }
}
