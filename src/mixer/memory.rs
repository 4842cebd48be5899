use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{Channel, Mixer};

/// Dry-run mixer: remembers the levels it was given instead of touching hardware.
#[derive(Default)]
pub struct MemoryMixer {
    levels: Mutex<HashMap<Channel, u8>>,
    history: Mutex<Vec<(Channel, u8)>>,
}

impl MemoryMixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last level set on `channel`, `None` if it was never touched.
    pub fn level(&self, channel: Channel) -> Option<u8> {
        self.levels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&channel)
            .copied()
    }

    /// Every `set_level` call in order.
    pub fn history(&self) -> Vec<(Channel, u8)> {
        self.history.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Mixer for MemoryMixer {
    fn name(&self) -> &str {
        "memory"
    }

    async fn set_level(&self, channel: Channel, percent: u8) -> anyhow::Result<()> {
        let percent = percent.min(100);
        log::info!("[memory mixer] {} -> {}%", channel, percent);
        self.levels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(channel, percent);
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((channel, percent));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_levels_and_history() {
        let mixer = MemoryMixer::new();
        assert_eq!(mixer.level(Channel::Front), None);

        mixer.set_level(Channel::Front, 100).await.unwrap();
        mixer.set_level(Channel::Headphone, 0).await.unwrap();
        mixer.set_level(Channel::Front, 0).await.unwrap();

        assert_eq!(mixer.level(Channel::Front), Some(0));
        assert_eq!(mixer.level(Channel::Headphone), Some(0));
        assert_eq!(
            mixer.history(),
            vec![
                (Channel::Front, 100),
                (Channel::Headphone, 0),
                (Channel::Front, 0)
            ]
        );
    }
}
