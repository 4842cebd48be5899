use decibel_router::actuator::drain_timeout;
use decibel_router::{Actuator, Config, Listener, READING_QUEUE, Reading, mixer};
use tokio::signal;
use tokio::sync::mpsc;
use tokio::time::timeout;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志，未设置 RUST_LOG 时默认 info
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 加载编译期配置
    let config = Config::new().map_err(anyhow::Error::msg)?;
    log::info!("{} {} starting", config.app_name, config.app_version);
    log::debug!("Config: {:?}", config);

    // 读数通道：多个会话写入，执行器单独消费
    let (tx_reading, rx_reading) = mpsc::channel::<Reading>(READING_QUEUE);

    let actuator = Actuator::new(config.policy, mixer::from_config(&config.mixer));
    let actuator_handle = tokio::spawn(actuator.run(rx_reading));

    // socket/bind/listen 失败直接退出，由运维处理（例如端口被占用）
    let listener = match Listener::bind(&config.server) {
        Ok(listener) => listener,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("Received Ctrl+C, shutting down...");
        }
        result = listener.run(tx_reading) => {
            if let Err(e) = result {
                log::error!("Listener stopped: {}", e);
                std::process::exit(1);
            }
        }
    }

    // 等待执行器处理完已排队的读数，超时后剩余读数被丢弃
    let grace = drain_timeout(config.server.read_timeout);
    if timeout(grace, actuator_handle).await.is_err() {
        log::warn!("Actuator did not drain within {:?}, queued readings dropped", grace);
    }
    Ok(())
}
