//! # Readmark Protocols
//!
//! Shared vocabulary for the readmark background core: bookmark and session
//! records, the closed set of inbound duplex-channel events, the internal
//! message bus request/response pairs, and the narrow capability traits
//! through which browser primitives (tabs, scripting, badge, panel) are
//! consumed.

pub mod bus;
pub mod error;
pub mod event;
pub mod surface;
pub mod types;
pub mod url;

pub use bus::{Bus, BusEnvelope, BusRequest, BusResponse, PanelNotice};
pub use error::{BusError, SurfaceError};
pub use event::{ChannelEvent, OutboundFrame};
pub use surface::{BadgeSurface, PageScripting, PanelPort, TabHost};
pub use types::{BookmarkRecord, SessionUser, TabInfo};
pub use url::normalize_url;
