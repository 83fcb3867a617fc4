use tuya2mqtt::{ConfigHolder, MqttManager, TuyaManager};
use tokio::task::JoinHandle;
use std::time::Duration;
use log::{error, info};


#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize logging
    let default_filter = std::env::var("T2M_LOG_LEVEL").unwrap_or("info".to_string());
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(default_filter));

    let config = match ConfigHolder::load() {
        Ok(c) => c.get_complete_config(),
        Err(e) => {
            error!("{e}");
            return Err(std::io::Error::new(std::io::ErrorKind::NotFound, e.to_string()));
        }
    };

    // we need a channel for the subparts to send metering data to the handler
    let (mut mqtt, tx) = MqttManager::new(&config.mqtt);

    let mut threads: Vec<JoinHandle<()>> = Vec::new();
    threads.push(tokio::spawn(async move {
        mqtt.start_thread().await;
    }));

    let mut tuya = TuyaManager::new(tx, config);
    threads.push(tokio::spawn(async move {
        tuya.start_thread().await;
    }));

    info!("All modules started, now waiting for a signal to exit");
    loop {
        tokio::time::sleep(Duration::from_secs(10)).await;
        if threads.iter().any(|t| t.is_finished()) {
            for task in threads.iter_mut() {
                task.abort();
            }
            break;
        }
    }
    Ok(())
}
