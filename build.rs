use std::fs;
use std::path::Path;
use serde::Deserialize;

#[derive(Deserialize)]
struct Config {
    application: Application,
    server: Server,
    policy: Policy,
    mixer: Mixer,
}

#[derive(Deserialize)]
struct Application {
    name: String,
    version: String,
}

#[derive(Deserialize)]
struct Server {
    listen_ip: String,
    listen_port: u16,
    backlog: u32,
    read_timeout_ms: u64,
    max_sessions: usize,
}

#[derive(Deserialize)]
struct Policy {
    threshold: i32,
    full_level: u8,
    silent_level: u8,
}

#[derive(Deserialize)]
struct Mixer {
    backend: String,
    card: String,
    front_control: String,
    headphone_control: String,
}

// 在编译时读取 config.toml 并设置环境变量
fn main() {
    println!("cargo:rerun-if-changed=config.toml");

    let config_path = Path::new("config.toml");
    if !config_path.exists() {
        panic!("config.toml not found!");
    }

    let config_str = fs::read_to_string(config_path).expect("Failed to read config.toml");
    let config: Config = toml::from_str(&config_str).expect("Failed to parse config.toml");

    if config.policy.full_level > 100 || config.policy.silent_level > 100 {
        panic!("policy levels must be percentages in 0..=100");
    }
    if config.server.max_sessions == 0 {
        panic!("server.max_sessions must be at least 1");
    }
    if config.server.backlog == 0 {
        panic!("server.backlog must be at least 1");
    }
    if config.server.read_timeout_ms == 0 {
        panic!("server.read_timeout_ms must be greater than zero");
    }

    // 应用信息
    println!("cargo:rustc-env=APP_NAME={}", config.application.name);
    println!("cargo:rustc-env=APP_VERSION={}", config.application.version);

    // 监听配置
    println!("cargo:rustc-env=LISTEN_IP={}", config.server.listen_ip);
    println!("cargo:rustc-env=LISTEN_PORT={}", config.server.listen_port);
    println!("cargo:rustc-env=LISTEN_BACKLOG={}", config.server.backlog);
    println!("cargo:rustc-env=READ_TIMEOUT_MS={}", config.server.read_timeout_ms);
    println!("cargo:rustc-env=MAX_SESSIONS={}", config.server.max_sessions);

    // 策略配置
    println!("cargo:rustc-env=POLICY_THRESHOLD={}", config.policy.threshold);
    println!("cargo:rustc-env=POLICY_FULL_LEVEL={}", config.policy.full_level);
    println!("cargo:rustc-env=POLICY_SILENT_LEVEL={}", config.policy.silent_level);

    // 混音器配置
    println!("cargo:rustc-env=MIXER_BACKEND={}", config.mixer.backend);
    println!("cargo:rustc-env=MIXER_CARD={}", config.mixer.card);
    println!("cargo:rustc-env=MIXER_FRONT_CONTROL={}", config.mixer.front_control);
    println!("cargo:rustc-env=MIXER_HEADPHONE_CONTROL={}", config.mixer.headphone_control);
}
