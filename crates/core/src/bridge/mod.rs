pub mod client;
pub mod table;

pub use client::{parse_event_body, BridgeApi, BridgeError, Device, Event, HueClient, Room};
pub use table::{LightTable, RoomLight};

/// Resolve the lights of the room named `room_name`, in the room's child order.
///
/// A missing room or a room without any light-capable device is a
/// configuration error.
pub async fn discover_room_lights(
    api: &dyn BridgeApi,
    room_name: &str,
) -> Result<Vec<RoomLight>, BridgeError> {
    log::debug!("Getting device info...");
    let devices = api.devices().await?;

    log::debug!("Getting room info...");
    let rooms = api.rooms().await?;

    let room = rooms
        .iter()
        .find(|r| r.metadata.name == room_name)
        .ok_or_else(|| BridgeError::RoomNotFound(room_name.to_string()))?;

    let lights: Vec<RoomLight> = room
        .children
        .iter()
        .filter_map(|child| {
            let device = devices.iter().find(|d| d.id == child.rid)?;
            let light_id = device.light_service()?;
            log::info!("Found light: {}", device.metadata.name);
            Some(RoomLight {
                device_id: device.id.clone(),
                light_id: light_id.to_string(),
                name: device.metadata.name.clone(),
            })
        })
        .collect();

    if lights.is_empty() {
        return Err(BridgeError::NoLightsInRoom(room_name.to_string()));
    }
    Ok(lights)
}
