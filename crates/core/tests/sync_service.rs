use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use huesync_core::bridge::{Device, Event, Room};
use huesync_core::light::{Metadata, ResourceRef};
use huesync_core::{
    BackendError, BridgeApi, BridgeError, ColorState, Dimming, HueSync, LightState, OnState,
    OutputBackend, OutputDevice, RgbColor, Settings, ZoneInfo,
};
use parking_lot::Mutex;

/// Bridge with one fully red light in room "Office" and no events
struct QuietBridge;

fn resource(rid: &str, rtype: &str) -> ResourceRef {
    ResourceRef {
        rid: rid.to_string(),
        rtype: rtype.to_string(),
    }
}

#[async_trait]
impl BridgeApi for QuietBridge {
    async fn devices(&self) -> Result<Vec<Device>, BridgeError> {
        Ok(vec![Device {
            id: "d1".to_string(),
            metadata: Metadata {
                name: "Lamp".to_string(),
            },
            services: vec![resource("l1", "light")],
        }])
    }

    async fn rooms(&self) -> Result<Vec<Room>, BridgeError> {
        Ok(vec![Room {
            id: "r1".to_string(),
            metadata: Metadata {
                name: "Office".to_string(),
            },
            children: vec![resource("d1", "device")],
        }])
    }

    async fn light(&self, light_id: &str) -> Result<LightState, BridgeError> {
        Ok(LightState {
            id: light_id.to_string(),
            owner: resource("d1", "device"),
            metadata: Metadata {
                name: "Lamp".to_string(),
            },
            on: OnState { on: true },
            dimming: Some(Dimming { brightness: 100.0 }),
            color: Some(ColorState {
                hue: Some(0),
                sat: Some(255),
                ..Default::default()
            }),
        })
    }

    async fn events(&self, timeout: Duration) -> Result<Vec<Event>, BridgeError> {
        tokio::time::sleep(timeout).await;
        Err(BridgeError::Timeout)
    }
}

struct StripBackend {
    shown: Arc<Mutex<Vec<RgbColor>>>,
}

struct Strip {
    zones: Vec<ZoneInfo>,
    shown: Arc<Mutex<Vec<RgbColor>>>,
}

#[async_trait]
impl OutputBackend for StripBackend {
    fn name(&self) -> String {
        "strip".to_string()
    }

    async fn connect(&self) -> Result<Box<dyn OutputDevice>, BackendError> {
        let zones = (0..2)
            .map(|i| ZoneInfo {
                device: 0,
                index: i,
                name: format!("zone {}", i),
                led_count: 30,
            })
            .collect();
        *self.shown.lock() = vec![RgbColor::BLACK; 2];
        Ok(Box::new(Strip {
            zones,
            shown: Arc::clone(&self.shown),
        }))
    }
}

#[async_trait]
impl OutputDevice for Strip {
    fn zones(&self) -> &[ZoneInfo] {
        &self.zones
    }

    fn set_zone_color(&mut self, zone: usize, color: RgbColor) {
        self.shown.lock()[zone] = color;
    }

    async fn show_zone(&mut self, _zone: usize) -> Result<(), BackendError> {
        Ok(())
    }
}

fn sync_for(room: &str) -> (HueSync, Arc<Mutex<Vec<RgbColor>>>) {
    let mut settings = Settings::default();
    settings.bridge.room = room.to_string();
    settings.render.transition_speed = 10.0;

    let shown = Arc::new(Mutex::new(Vec::new()));
    let backend = StripBackend {
        shown: Arc::clone(&shown),
    };
    let sync =
        HueSync::with_backends(settings, Arc::new(QuietBridge), Box::new(backend)).unwrap();
    (sync, shown)
}

#[tokio::test(start_paused = true)]
async fn test_mirrors_room_then_fades_out_on_shutdown() {
    let (mut sync, shown) = sync_for("Office");
    sync.start().await.unwrap();
    assert!(sync.is_running());

    sync.run_until(tokio::time::sleep(Duration::from_secs(1)))
        .await
        .unwrap();
    let red = RgbColor::new(255, 0, 0);
    assert_eq!(*shown.lock(), vec![red, red]);
    assert_eq!(sync.render_handle().current(), vec![red]);

    sync.shutdown().await.unwrap();
    assert!(!sync.is_running());
    assert_eq!(*shown.lock(), vec![RgbColor::BLACK, RgbColor::BLACK]);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_room_ends_run() {
    let (mut sync, _shown) = sync_for("Attic");
    sync.start().await.unwrap();

    let result = sync
        .run_until(tokio::time::sleep(Duration::from_secs(60)))
        .await;
    let message = result.unwrap_err().to_string();
    assert!(message.contains("room 'Attic' not found"), "{}", message);

    sync.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_run_before_start_is_an_error() {
    let (mut sync, _shown) = sync_for("Office");
    assert!(sync.run_until(async {}).await.is_err());
    assert!(sync.shutdown().await.is_ok());
}

#[test]
fn test_out_of_range_settings_are_rejected() {
    let backend = |shown: &Arc<Mutex<Vec<RgbColor>>>| {
        Box::new(StripBackend {
            shown: Arc::clone(shown),
        })
    };
    let shown = Arc::new(Mutex::new(Vec::new()));

    let mut settings = Settings::default();
    settings.render.update_rate = 0.0;
    let result = HueSync::with_backends(settings, Arc::new(QuietBridge), backend(&shown));
    let message = result.err().unwrap().to_string();
    assert!(message.contains("update_rate"), "{}", message);

    let mut settings = Settings::default();
    settings.bridge.error_cooldown_secs = -1.0;
    let result = HueSync::with_backends(settings, Arc::new(QuietBridge), backend(&shown));
    assert!(result.is_err());
}
