use tabled::Table;

use crate::{
    cli::connect,
    config::Settings,
    error, info,
    spotify::MusicApi,
    success,
    types::DeviceTableRow,
    utils, warning,
};

pub async fn now_playing(settings: &Settings) {
    let client = connect(settings).await;
    let playback = match client.playback().await {
        Ok(playback) => playback,
        Err(e) => error!("Cannot read playback state: {}", e),
    };

    let Some(p) = playback else {
        warning!("Nothing playing");
        return;
    };

    info!("{} by {}", p.track_name, p.artist_name);
    info!(
        "{} {} / {}",
        if p.is_playing { "Playing" } else { "Paused" },
        utils::format_duration_ms(p.progress_ms),
        utils::format_duration_ms(p.duration_ms)
    );
    info!(
        "Shuffle: {}, repeat: {}",
        if p.shuffle_state { "on" } else { "off" },
        p.repeat_state
    );
}

pub async fn devices(settings: &Settings) {
    let client = connect(settings).await;
    let devices = match client.get_devices().await {
        Ok(devices) => devices,
        Err(e) => error!("Cannot list devices: {}", e),
    };

    if devices.is_empty() {
        warning!("No devices available. Open Spotify on a device first.");
        return;
    }

    let rows: Vec<DeviceTableRow> = devices
        .into_iter()
        .map(|d| DeviceTableRow {
            name: d.name,
            kind: d.kind,
            active: if d.is_active { "yes".into() } else { String::new() },
            volume: d
                .volume_percent
                .map(|v| format!("{}%", v))
                .unwrap_or_default(),
        })
        .collect();

    println!("{}", Table::new(rows));
}

pub async fn pause(settings: &Settings) {
    let client = connect(settings).await;
    match client.pause().await {
        Ok(()) => success!("Paused"),
        Err(e) => error!("Cannot pause: {}", e),
    }
}

pub async fn resume(settings: &Settings) {
    let client = connect(settings).await;
    match client.resume().await {
        Ok(()) => success!("Resumed"),
        Err(e) => error!("Cannot resume: {}", e),
    }
}

pub async fn next(settings: &Settings) {
    let client = connect(settings).await;
    match client.next().await {
        Ok(()) => success!("Skipped to next track"),
        Err(e) => error!("Cannot skip: {}", e),
    }
}

pub async fn previous(settings: &Settings) {
    let client = connect(settings).await;
    match client.previous().await {
        Ok(()) => success!("Back to previous track"),
        Err(e) => error!("Cannot go back: {}", e),
    }
}
