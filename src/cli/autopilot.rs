use std::time::Duration;

use tokio::sync::watch;

use crate::{
    autopilot::{Autopilot, AutopilotConfig, DEFAULT_OVERFETCH},
    cli::{connect, resolve_mood},
    clock::SystemClock,
    config::Settings,
};

pub async fn autopilot(
    settings: &Settings,
    threshold: usize,
    mood: &str,
    interval_secs: u64,
    dedup_window_mins: Option<u64>,
) {
    let config = AutopilotConfig {
        threshold,
        mood: resolve_mood(mood),
        interval: Duration::from_secs(interval_secs),
        overfetch: DEFAULT_OVERFETCH,
        dedup_window: dedup_window(dedup_window_mins),
    };

    let client = connect(settings).await;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                println!();
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                log::warn!("cannot listen for Ctrl+C: {e}");
                // dropping the sender would stop the loop
                std::future::pending::<()>().await;
            }
        }
    });

    Autopilot::new(&client, config, SystemClock)
        .run(shutdown_rx)
        .await;
}

fn dedup_window(minutes: Option<u64>) -> Option<Duration> {
    minutes.map(|m| Duration::from_secs(m.saturating_mul(60)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_window_converts_minutes() {
        assert_eq!(dedup_window(None), None);
        assert_eq!(dedup_window(Some(30)), Some(Duration::from_secs(1_800)));
    }

    #[test]
    fn huge_dedup_window_saturates() {
        assert_eq!(
            dedup_window(Some(u64::MAX)),
            Some(Duration::from_secs(u64::MAX))
        );
    }
}
