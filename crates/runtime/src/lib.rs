//! dashcheck runtime - Chromium process, DevTools transport and connection
//!
//! This crate owns everything below the page abstraction:
//!
//! - **Driver**: locating and launching a headless Chromium with remote debugging
//! - **Transport**: JSON frames over the DevTools WebSocket
//! - **Connection**: request/response correlation and event broadcast
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  dashcheck-core  │  Browser / Page / Locator / expect
//! └────────┬─────────┘
//!          │ Connection::call / subscribe
//! ┌────────▼─────────┐
//! │ dashcheck-runtime│  This crate
//! │  ┌────────────┐  │
//! │  │ Connection │  │  id correlation, event fan-out
//! │  └────────────┘  │
//! │  ┌────────────┐  │
//! │  │ Transport  │  │  WebSocket frames
//! │  └────────────┘  │
//! │  ┌────────────┐  │
//! │  │ Driver     │  │  Chromium process
//! │  └────────────┘  │
//! └──────────────────┘
//! ```

pub mod connection;
pub mod driver;
pub mod error;
pub mod protocol;
pub mod transport;

pub use connection::Connection;
pub use driver::{BrowserProcess, LaunchOptions, find_chromium_executable, launch};
pub use error::{Error, Result};
pub use protocol::{CdpEvent, Message, RemoteError, Request, Response};
pub use transport::{
	Transport, TransportParts, TransportReceiver, WebSocketTransport, WebSocketTransportReceiver,
	WebSocketTransportSender,
};
