//! Native ALSA backend using the simple mixer element API.

use alsa::mixer::{Mixer as AlsaHandle, SelemId};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;

use super::{Channel, Controls, Mixer};
use crate::config::MixerConfig;

/// Sets playback volume on a named simple element of an ALSA card.
///
/// The card is opened for every call. An ALSA mixer handle is not `Send`, and
/// readings arrive seconds apart, so there is nothing to gain from keeping it.
pub struct AlsaMixer {
    controls: Controls,
}

impl AlsaMixer {
    pub fn new(config: &MixerConfig) -> Self {
        Self {
            controls: Controls::new(config),
        }
    }
}

#[async_trait]
impl Mixer for AlsaMixer {
    fn name(&self) -> &str {
        "alsa"
    }

    async fn set_level(&self, channel: Channel, percent: u8) -> Result<()> {
        let card = self.controls.card.clone();
        let control = self.controls.control(channel).to_string();

        // ALSA 调用是阻塞的，放到 blocking 线程池
        tokio::task::spawn_blocking(move || set_selem_volume(&card, &control, percent))
            .await
            .context("ALSA mixer task panicked")?
    }
}

fn set_selem_volume(card: &str, control: &str, percent: u8) -> Result<()> {
    let mixer = AlsaHandle::new(card, false)
        .with_context(|| format!("Failed to open mixer for card '{}'", card))?;
    let selem = mixer
        .find_selem(&SelemId::new(control, 0))
        .ok_or_else(|| anyhow!("Mixer control '{}' not found on card '{}'", control, card))?;

    let (min, max) = selem.get_playback_volume_range();
    let volume = scale_volume(min, max, percent);
    selem
        .set_playback_volume_all(volume)
        .with_context(|| format!("Failed to set '{}' volume to {}", control, volume))?;

    // 有开关的控件在 0% 时直接静音
    if selem.has_playback_switch() {
        selem
            .set_playback_switch_all(if percent > 0 { 1 } else { 0 })
            .with_context(|| format!("Failed to toggle '{}' switch", control))?;
    }

    log::debug!(
        "ALSA {}: {}% -> raw {} (range {}..={})",
        control,
        percent,
        volume,
        min,
        max
    );
    Ok(())
}

fn scale_volume(min: i64, max: i64, percent: u8) -> i64 {
    let percent = i64::from(percent.min(100));
    min + (max - min) * percent / 100
}
