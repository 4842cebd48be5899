//! mixer - host audio mixer backends
//!
//! The actuator only talks to the `Mixer` trait. Which backend sits behind it is
//! chosen at build time through `config.toml`.

mod alsa_mixer;
mod amixer;
mod memory;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::config::{MixerBackend, MixerConfig};

pub use alsa_mixer::AlsaMixer;
pub use amixer::{AmixerCommand, COMMAND_TIMEOUT};
pub use memory::MemoryMixer;

/// The two mutually exclusive output routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Front,
    Headphone,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Front => write!(f, "front"),
            Channel::Headphone => write!(f, "headphone"),
        }
    }
}

#[async_trait]
pub trait Mixer: Send + Sync {
    fn name(&self) -> &str;

    /// Set `channel` to `percent` (0..=100) of its playback range.
    async fn set_level(&self, channel: Channel, percent: u8) -> anyhow::Result<()>;
}

/// Control names of the two channels on one sound card.
#[derive(Debug, Clone)]
pub(crate) struct Controls {
    pub card: String,
    pub front: String,
    pub headphone: String,
}

impl Controls {
    pub fn new(config: &MixerConfig) -> Self {
        Self {
            card: config.card.to_string(),
            front: config.front_control.to_string(),
            headphone: config.headphone_control.to_string(),
        }
    }

    pub fn control(&self, channel: Channel) -> &str {
        match channel {
            Channel::Front => &self.front,
            Channel::Headphone => &self.headphone,
        }
    }
}

pub fn from_config(config: &MixerConfig) -> Arc<dyn Mixer> {
    let mixer: Arc<dyn Mixer> = match config.backend {
        MixerBackend::Alsa => Arc::new(AlsaMixer::new(config)),
        MixerBackend::Amixer => Arc::new(AmixerCommand::new(config)),
        MixerBackend::Memory => Arc::new(MemoryMixer::new()),
    };
    log::info!(
        "Mixer backend: {} (card={}, front={}, headphone={})",
        mixer.name(),
        config.card,
        config.front_control,
        config.headphone_control,
    );
    mixer
}
