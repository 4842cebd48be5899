use serde::Serialize;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::str::FromStr;
use std::time::Duration;

use crate::actuator::Policy;

/// 传感器监听配置，启动后不可变
#[derive(Debug, Serialize, Clone)]
pub struct ServerConfig {
    pub listen_ip: Ipv4Addr,
    pub listen_port: u16,
    /// 等待 accept 的连接队列长度
    pub backlog: u32,
    /// 单个连接读取负载的最长等待时间
    pub read_timeout: Duration,
    /// 同时服务的连接数上限，1 表示逐个处理
    pub max_sessions: usize,
}

impl ServerConfig {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.listen_ip, self.listen_port))
    }

    /// 拒绝会让服务永远无法执行的配置
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.backlog == 0 {
            return Err("backlog must be at least 1");
        }
        if self.read_timeout.is_zero() {
            return Err("read timeout must be greater than zero");
        }
        if self.max_sessions == 0 {
            return Err("max_sessions must be at least 1");
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_ip: Ipv4Addr::UNSPECIFIED,
            listen_port: 25000,
            backlog: 5,
            read_timeout: Duration::from_millis(5000),
            max_sessions: 1,
        }
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MixerBackend {
    /// ALSA simple mixer element API
    Alsa,
    /// `amixer sset` subprocess
    Amixer,
    /// 不操作硬件，仅记录和打印音量
    Memory,
}

impl FromStr for MixerBackend {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "alsa" => Ok(Self::Alsa),
            "amixer" => Ok(Self::Amixer),
            "memory" => Ok(Self::Memory),
            _ => Err("Unknown MIXER_BACKEND, expected alsa, amixer or memory"),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct MixerConfig {
    pub backend: MixerBackend,
    pub card: &'static str,
    pub front_control: &'static str,
    pub headphone_control: &'static str,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            backend: MixerBackend::Amixer,
            card: "default",
            front_control: "Front",
            headphone_control: "Headphone",
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct Config {
    pub app_name: &'static str,
    pub app_version: &'static str,
    pub server: ServerConfig,
    pub policy: Policy,
    pub mixer: MixerConfig,
}

impl Config {
    /// 从编译时设置的环境变量创建配置
    /// 所有参数都在编译时从 config.toml 中读取
    pub fn new() -> Result<Self, &'static str> {
        let config = Self {
            app_name: env!("APP_NAME"),
            app_version: env!("APP_VERSION"),

            // 监听配置
            server: ServerConfig {
                listen_ip: env!("LISTEN_IP").parse()
                    .map_err(|_| "Failed to parse LISTEN_IP")?,
                listen_port: env!("LISTEN_PORT").parse()
                    .map_err(|_| "Failed to parse LISTEN_PORT")?,
                backlog: env!("LISTEN_BACKLOG").parse()
                    .map_err(|_| "Failed to parse LISTEN_BACKLOG")?,
                read_timeout: Duration::from_millis(
                    env!("READ_TIMEOUT_MS").parse()
                        .map_err(|_| "Failed to parse READ_TIMEOUT_MS")?,
                ),
                max_sessions: env!("MAX_SESSIONS").parse()
                    .map_err(|_| "Failed to parse MAX_SESSIONS")?,
            },

            // 阈值策略
            policy: Policy {
                threshold: env!("POLICY_THRESHOLD").parse()
                    .map_err(|_| "Failed to parse POLICY_THRESHOLD")?,
                full_level: env!("POLICY_FULL_LEVEL").parse()
                    .map_err(|_| "Failed to parse POLICY_FULL_LEVEL")?,
                silent_level: env!("POLICY_SILENT_LEVEL").parse()
                    .map_err(|_| "Failed to parse POLICY_SILENT_LEVEL")?,
            },

            // 混音器
            mixer: MixerConfig {
                backend: env!("MIXER_BACKEND").parse()?,
                card: env!("MIXER_CARD"),
                front_control: env!("MIXER_FRONT_CONTROL"),
                headphone_control: env!("MIXER_HEADPHONE_CONTROL"),
            },
        };
        config.server.validate()?;
        Ok(config)
    }
}
