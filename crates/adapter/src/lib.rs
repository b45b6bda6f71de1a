//! Adapter module - remote control via TCP socket with a JSON protocol
//!
//! External agents (bots, test harnesses, training loops) drive the game through
//! the same input sink the keyboard uses and receive the same snapshot the
//! terminal renders.
//!
//! # Protocol Overview
//!
//! The adapter implements a **line-delimited JSON protocol** over TCP:
//!
//! 1. **Connection**: Client connects to TCP socket (default: 127.0.0.1:7878)
//! 2. **Handshake**: Client sends `hello`, server responds with `welcome`
//! 3. **Controller Assignment**: First client to hello becomes the controller
//! 4. **Observation Streaming**: Server sends an observation whenever the state changes
//! 5. **Commanding**: Controller sends commands; each is acked after it is applied
//!
//! # Message Types
//!
//! ## Client → Server
//!
//! - **hello**: client info, protocol version, `requested.stream_observations`
//! - **command**: a list of actions: `selectColumn` (with `column`), `togglePause`, `restart`, `start`
//! - **control**: `claim` or `release` controller status
//!
//! ## Server → Client
//!
//! - **welcome**: assigned client id and role
//! - **observation**: grid, tiles in play, counters, and a stable `state_hash`
//! - **ack**: command applied, with the number of accepted actions
//! - **error**: `code` and `message`
//!
//! # Environment Variables
//!
//! - `MERGE_DROP_AI_HOST`: Bind address (default: "127.0.0.1")
//! - `MERGE_DROP_AI_PORT`: Port number (default: 7878)
//! - `MERGE_DROP_AI_MAX_PENDING`: Command queue bound (default: 10)
//! - `MERGE_DROP_AI_LOG_PATH`: Append raw wire lines to this file
//! - `MERGE_DROP_AI_DISABLED`: Set to "1" or "true" to disable the adapter
//!
//! # Example Protocol Flow
//!
//! ```text
//! Client -> Server: {"type":"hello","seq":1,"ts":0,"client":{"name":"bot","version":"0.1"},"protocol_version":"1.0.0","requested":{"stream_observations":true}}
//! Server -> Client: {"type":"welcome","seq":1,"ts":...,"protocol_version":"1.0.0","client_id":1,"role":"controller",...}
//! Server -> Client: {"type":"observation","seq":1,"ts":...,"lifecycle":"awaitingStart",...}
//! Client -> Server: {"type":"command","seq":2,"ts":0,"actions":[{"action":"start"},{"action":"selectColumn","column":2}]}
//! Server -> Client: {"type":"ack","seq":2,"ts":...,"status":"ok","applied":2}
//! ```

pub mod protocol;
pub mod runtime;
pub mod server;

pub use merge_drop_engine as engine;
pub use merge_drop_types as types;

pub use protocol::*;
pub use runtime::{Adapter, Bridge, ClientCommand, InboundCommand, InboundPayload, OutboundMessage};
pub use server::{run_server, AdapterStatus, ClientOutbound, ServerConfig};
