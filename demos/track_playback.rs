use anyhow::Result;
use mapshim::prelude::*;
use std::time::Duration;

/// Walkthrough of the service layer: pick a backend, initialize a map, drop
/// some overlays on it and play a track back step by step.
#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let options = ServiceOptions {
        key: "demo-key".to_string(),
        ..Default::default()
    };
    let mut service = MapServiceFactory::create_service("amap", options)?;

    let config = MapConfig {
        center: Some(LngLat::new(116.397, 39.908)),
        zoom: Some(13.0),
        ..Default::default()
    };
    service.init_map("demo-map", config).await?;
    println!("map ready on provider '{}'", service.provider());

    service.add_marker(MarkerOptions::at(LngLat::new(116.397, 39.908)));

    let path: Vec<LngLat> = (0..8)
        .map(|i| LngLat::new(116.39 + 0.01 * i as f64, 39.90 + 0.005 * i as f64))
        .collect();
    service.add_track(&path);
    println!("static track drawn with {} points", path.len());

    let controller = service
        .create_track_step_by_step(
            &path,
            StepTrackOptions {
                interval: Duration::from_millis(100),
                on_progress: Some(Box::new(|index, position, fraction| {
                    println!(
                        "  step {:>2}  ({:.3}, {:.3})  {:>5.1}%",
                        index,
                        position.lng,
                        position.lat,
                        fraction * 100.0
                    );
                })),
                on_finish: Some(Box::new(|| {
                    println!("playback finished");
                })),
            },
        )
        .expect("path has enough points");

    controller.start();
    tokio::time::sleep(Duration::from_millis(900)).await;

    service.destroy_map();
    println!("map torn down");
    Ok(())
}
