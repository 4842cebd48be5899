//! decibel_router - route host audio by remote sound level
//!
//! A sensor connects over TCP and writes one short ASCII decibel reading. The
//! listener parses it and hands it to the actuator, which decides between the
//! front and headphone outputs and sets the host mixer accordingly.

pub mod actuator;
pub mod config;
pub mod error;
pub mod listener;
pub mod mixer;
pub mod reading;

pub use actuator::{ActuationState, Actuator, ChannelLevels, Policy};
pub use config::{Config, MixerBackend, MixerConfig, ServerConfig};
pub use error::{ListenerError, ParseError, SessionError};
pub use listener::Listener;
pub use mixer::{Channel, Mixer};
pub use reading::{PAYLOAD_LEN, Reading};

/// 读数通道容量
pub const READING_QUEUE: usize = 16;
