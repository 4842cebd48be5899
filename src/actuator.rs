//! Threshold policy and the actuation task.
//!
//! Every reading ends up here through one channel, so the host mixer only ever
//! sees one writer no matter how many sensor sessions run at once.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::READING_QUEUE;
use crate::mixer::{COMMAND_TIMEOUT, Channel, Mixer};
use crate::reading::Reading;

/// How long shutdown may wait for the actuator to empty its queue.
///
/// Covers a session still reading, the reading being applied, and a full queue
/// behind it, each taking two mixer calls at the slowest backend's limit.
pub fn drain_timeout(read_timeout: Duration) -> Duration {
    let pending = READING_QUEUE as u32 + 1;
    read_timeout + COMMAND_TIMEOUT * 2 * pending
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuationState {
    /// Front full, headphone silent
    FrontChannelDominant,
    /// Front silent, headphone full
    HeadphoneChannelDominant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelLevels {
    pub front: u8,
    pub headphone: u8,
}

/// Decibel threshold and the two discrete output levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Policy {
    /// Readings strictly above this go to the headphone channel
    pub threshold: i32,
    pub full_level: u8,
    pub silent_level: u8,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            threshold: -42,
            full_level: 100,
            silent_level: 0,
        }
    }
}

impl Policy {
    pub fn decide(&self, value: i32) -> ActuationState {
        if value > self.threshold {
            ActuationState::HeadphoneChannelDominant
        } else {
            ActuationState::FrontChannelDominant
        }
    }

    pub fn levels(&self, state: ActuationState) -> ChannelLevels {
        match state {
            ActuationState::HeadphoneChannelDominant => ChannelLevels {
                front: self.silent_level,
                headphone: self.full_level,
            },
            ActuationState::FrontChannelDominant => ChannelLevels {
                front: self.full_level,
                headphone: self.silent_level,
            },
        }
    }
}

pub struct Actuator {
    policy: Policy,
    mixer: Arc<dyn Mixer>,
}

impl Actuator {
    pub fn new(policy: Policy, mixer: Arc<dyn Mixer>) -> Self {
        Self { policy, mixer }
    }

    pub fn decide(&self, value: i32) -> ActuationState {
        self.policy.decide(value)
    }

    /// Push the levels for `state` to the mixer.
    ///
    /// Failures are logged per channel and otherwise ignored; whatever was
    /// already applied stays applied.
    pub async fn apply(&self, state: ActuationState) {
        let levels = self.policy.levels(state);
        for (channel, percent) in [
            (Channel::Front, levels.front),
            (Channel::Headphone, levels.headphone),
        ] {
            if let Err(e) = self.mixer.set_level(channel, percent).await {
                log::warn!(
                    "Failed to set {} to {}% via {}: {:#}",
                    channel,
                    percent,
                    self.mixer.name(),
                    e
                );
            }
        }
        log::info!(
            "Applied {:?}: front={}%, headphone={}%",
            state,
            levels.front,
            levels.headphone
        );
    }

    pub async fn handle(&self, reading: &Reading) -> ActuationState {
        let state = self.decide(reading.value);
        log::debug!(
            "{} dB from {} (threshold {}) -> {:?}",
            reading.value,
            reading.peer,
            self.policy.threshold,
            state
        );
        self.apply(state).await;
        state
    }

    /// 串行消费所有会话送来的读数，直到所有发送端关闭
    pub async fn run(self, mut rx: mpsc::Receiver<Reading>) {
        log::info!(
            "Actuator started: threshold={} dB, levels={}/{}",
            self.policy.threshold,
            self.policy.full_level,
            self.policy.silent_level
        );
        while let Some(reading) = rx.recv().await {
            self.handle(&reading).await;
        }
        log::info!("Actuator stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::MemoryMixer;
    use async_trait::async_trait;

    fn actuator() -> (Actuator, Arc<MemoryMixer>) {
        let mixer = Arc::new(MemoryMixer::new());
        (Actuator::new(Policy::default(), mixer.clone()), mixer)
    }

    #[test]
    fn drain_timeout_covers_full_queue() {
        let read_timeout = Duration::from_secs(5);
        let worst_case = COMMAND_TIMEOUT * 2 * (READING_QUEUE as u32 + 1);
        assert_eq!(drain_timeout(read_timeout), read_timeout + worst_case);
        // 16 条排队读数 + 1 条正在执行，每条两次 amixer
        assert!(drain_timeout(Duration::ZERO) >= Duration::from_secs(64));
    }

    #[test]
    fn threshold_boundary() {
        let policy = Policy::default();
        assert_eq!(policy.decide(-42), ActuationState::FrontChannelDominant);
        assert_eq!(policy.decide(-41), ActuationState::HeadphoneChannelDominant);
    }

    #[test]
    fn decide_over_full_payload_range() {
        let policy = Policy::default();
        // 6 字节 ASCII 能表示的范围
        for v in -99999..=999999 {
            let expected = if v > -42 {
                ActuationState::HeadphoneChannelDominant
            } else {
                ActuationState::FrontChannelDominant
            };
            assert_eq!(policy.decide(v), expected, "value {}", v);
        }
    }

    #[test]
    fn levels_are_mutually_exclusive() {
        let policy = Policy::default();
        assert_eq!(
            policy.levels(ActuationState::FrontChannelDominant),
            ChannelLevels { front: 100, headphone: 0 }
        );
        assert_eq!(
            policy.levels(ActuationState::HeadphoneChannelDominant),
            ChannelLevels { front: 0, headphone: 100 }
        );
    }

    #[test]
    fn custom_policy() {
        let policy = Policy {
            threshold: -60,
            full_level: 80,
            silent_level: 10,
        };
        assert_eq!(policy.decide(-50), ActuationState::HeadphoneChannelDominant);
        assert_eq!(
            policy.levels(ActuationState::FrontChannelDominant),
            ChannelLevels { front: 80, headphone: 10 }
        );
    }

    #[tokio::test]
    async fn apply_is_idempotent() {
        let (actuator, mixer) = actuator();
        actuator.apply(ActuationState::HeadphoneChannelDominant).await;
        let once = (mixer.level(Channel::Front), mixer.level(Channel::Headphone));
        actuator.apply(ActuationState::HeadphoneChannelDominant).await;
        let twice = (mixer.level(Channel::Front), mixer.level(Channel::Headphone));
        assert_eq!(once, (Some(0), Some(100)));
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn handle_reading() {
        let (actuator, mixer) = actuator();
        let reading = Reading::from_payload("10.0.0.2:5000".parse().unwrap(), b"-100\0\0").unwrap();
        assert_eq!(
            actuator.handle(&reading).await,
            ActuationState::FrontChannelDominant
        );
        assert_eq!(mixer.level(Channel::Front), Some(100));
        assert_eq!(mixer.level(Channel::Headphone), Some(0));
    }

    struct BrokenFront {
        inner: MemoryMixer,
    }

    #[async_trait]
    impl Mixer for BrokenFront {
        fn name(&self) -> &str {
            "broken-front"
        }

        async fn set_level(&self, channel: Channel, percent: u8) -> anyhow::Result<()> {
            if channel == Channel::Front {
                anyhow::bail!("simple control 'Front' not found");
            }
            self.inner.set_level(channel, percent).await
        }
    }

    #[tokio::test]
    async fn mixer_failure_does_not_stop_other_channel() {
        let mixer = Arc::new(BrokenFront {
            inner: MemoryMixer::new(),
        });
        let actuator = Actuator::new(Policy::default(), mixer.clone());
        actuator.apply(ActuationState::HeadphoneChannelDominant).await;
        assert_eq!(mixer.inner.level(Channel::Front), None);
        assert_eq!(mixer.inner.level(Channel::Headphone), Some(100));
    }

    #[tokio::test]
    async fn run_drains_channel_in_order() {
        let (actuator, mixer) = actuator();
        let (tx, rx) = mpsc::channel(4);
        let peer = "10.0.0.2:5000".parse().unwrap();
        tx.send(Reading::from_payload(peer, b"-50").unwrap()).await.unwrap();
        tx.send(Reading::from_payload(peer, b"10").unwrap()).await.unwrap();
        drop(tx);

        actuator.run(rx).await;

        assert_eq!(
            mixer.history(),
            vec![
                (Channel::Front, 100),
                (Channel::Headphone, 0),
                (Channel::Front, 0),
                (Channel::Headphone, 100),
            ]
        );
    }
}
