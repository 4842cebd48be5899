use anyhow::{Context, bail};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{Duration, timeout};

use super::{Channel, Controls, Mixer};
use crate::config::MixerConfig;

/// Upper bound for one `amixer` invocation.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// Drives the mixer through the `amixer` command line tool.
pub struct AmixerCommand {
    controls: Controls,
    program: String,
}

impl AmixerCommand {
    pub fn new(config: &MixerConfig) -> Self {
        Self {
            controls: Controls::new(config),
            program: "amixer".to_string(),
        }
    }

    /// 使用其他可执行文件代替 amixer（例如包装脚本）
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn args(&self, channel: Channel, percent: u8) -> Vec<String> {
        vec![
            "-q".to_string(),
            "-D".to_string(),
            self.controls.card.clone(),
            "sset".to_string(),
            self.controls.control(channel).to_string(),
            format!("{}%", percent.min(100)),
            // 与 ALSA 后端一致：0% 时同时关闭播放开关
            if percent == 0 { "mute" } else { "unmute" }.to_string(),
        ]
    }
}

#[async_trait]
impl Mixer for AmixerCommand {
    fn name(&self) -> &str {
        "amixer"
    }

    async fn set_level(&self, channel: Channel, percent: u8) -> anyhow::Result<()> {
        let args = self.args(channel, percent);
        log::debug!("Executing {} {}", self.program, args.join(" "));

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn {}", self.program))?;

        let output = timeout(COMMAND_TIMEOUT, child.wait_with_output())
            .await
            .with_context(|| format!("{} timed out after {:?}", self.program, COMMAND_TIMEOUT))?
            .with_context(|| format!("Failed to wait for {}", self.program))?;

        if !output.status.success() {
            bail!(
                "{} sset {} failed ({}): {}",
                self.program,
                self.controls.control(channel),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}
