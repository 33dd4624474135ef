//! Minimal OpenRGB SDK client (protocol version 0).

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::{BackendError, OutputBackend, OutputDevice, ZoneInfo};
use crate::color::RgbColor;

const MAGIC: &[u8; 4] = b"ORGB";
const HEADER_LEN: usize = 16;

const REQUEST_CONTROLLER_COUNT: u32 = 0;
const REQUEST_CONTROLLER_DATA: u32 = 1;
const SET_CLIENT_NAME: u32 = 50;
const UPDATE_ZONE_LEDS: u32 = 1051;
const SET_CUSTOM_MODE: u32 = 1100;

/// Mode name of controllers that accept per-LED colors from the SDK
const DIRECT_MODE: &str = "Direct";

pub struct OpenRgbBackend {
    host: String,
    port: u16,
    client_name: String,
}

impl OpenRgbBackend {
    pub fn new(host: &str, port: u16, client_name: &str) -> Self {
        Self {
            host: host.to_string(),
            port,
            client_name: client_name.to_string(),
        }
    }
}

#[async_trait]
impl OutputBackend for OpenRgbBackend {
    fn name(&self) -> String {
        format!("OpenRGB at {}:{}", self.host, self.port)
    }

    async fn connect(&self) -> Result<Box<dyn OutputDevice>, BackendError> {
        let stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
        stream.set_nodelay(true)?;
        let mut conn = Connection { stream };

        let mut name = self.client_name.clone().into_bytes();
        name.push(0);
        conn.send(0, SET_CLIENT_NAME, &name).await?;

        let count_data = conn.request(0, REQUEST_CONTROLLER_COUNT).await?;
        let count = Reader::new(&count_data).u32()?;

        let mut zones = Vec::new();
        for device in 0..count {
            let data = conn.request(device, REQUEST_CONTROLLER_DATA).await?;
            let controller = parse_controller(&data)?;

            if !controller.modes.iter().any(|m| m == DIRECT_MODE) {
                log::debug!("Skipping '{}': no direct mode", controller.name);
                continue;
            }

            conn.send(device, SET_CUSTOM_MODE, &[]).await?;
            for (index, zone) in controller.zones.into_iter().enumerate() {
                log::info!("Found zone: {} / {} ({} LEDs)", controller.name, zone.0, zone.1);
                zones.push(ZoneInfo {
                    device,
                    index: index as u32,
                    name: zone.0,
                    led_count: zone.1,
                });
            }
        }

        let pending = vec![RgbColor::BLACK; zones.len()];
        Ok(Box::new(OpenRgbDevice {
            conn,
            zones,
            pending,
        }))
    }
}

struct OpenRgbDevice {
    conn: Connection,
    zones: Vec<ZoneInfo>,
    pending: Vec<RgbColor>,
}

#[async_trait]
impl OutputDevice for OpenRgbDevice {
    fn zones(&self) -> &[ZoneInfo] {
        &self.zones
    }

    fn set_zone_color(&mut self, zone: usize, color: RgbColor) {
        if let Some(slot) = self.pending.get_mut(zone) {
            *slot = color;
        }
    }

    async fn show_zone(&mut self, zone: usize) -> Result<(), BackendError> {
        let (Some(info), Some(color)) = (self.zones.get(zone), self.pending.get(zone)) else {
            return Err(BackendError::Protocol(format!("no zone {}", zone)));
        };

        let payload = zone_leds_payload(info.index, info.led_count, *color);
        self.conn.send(info.device, UPDATE_ZONE_LEDS, &payload).await
    }
}

struct Connection {
    stream: TcpStream,
}

impl Connection {
    async fn send(&mut self, device: u32, packet_id: u32, payload: &[u8]) -> Result<(), BackendError> {
        let mut packet = Vec::with_capacity(HEADER_LEN + payload.len());
        packet.extend_from_slice(MAGIC);
        packet.extend_from_slice(&device.to_le_bytes());
        packet.extend_from_slice(&packet_id.to_le_bytes());
        packet.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        packet.extend_from_slice(payload);
        self.stream.write_all(&packet).await?;
        Ok(())
    }

    /// Send an empty request and wait for the reply with the same packet id.
    /// Unrelated notifications from the server are skipped.
    async fn request(&mut self, device: u32, packet_id: u32) -> Result<Vec<u8>, BackendError> {
        self.send(device, packet_id, &[]).await?;

        loop {
            let mut header = [0u8; HEADER_LEN];
            self.stream.read_exact(&mut header).await?;
            if &header[0..4] != MAGIC {
                return Err(BackendError::Protocol("bad packet magic".to_string()));
            }

            let mut reader = Reader::new(&header[4..]);
            let _device = reader.u32()?;
            let reply_id = reader.u32()?;
            let size = reader.u32()? as usize;

            let mut payload = vec![0u8; size];
            self.stream.read_exact(&mut payload).await?;

            if reply_id == packet_id {
                return Ok(payload);
            }
            log::debug!("Ignoring OpenRGB packet {}", reply_id);
        }
    }
}

fn zone_leds_payload(zone_index: u32, led_count: u32, color: RgbColor) -> Vec<u8> {
    let count = led_count.min(u16::MAX as u32) as u16;
    let size = 4 + 4 + 2 + 4 * count as u32;

    let mut payload = Vec::with_capacity(size as usize);
    payload.extend_from_slice(&size.to_le_bytes());
    payload.extend_from_slice(&zone_index.to_le_bytes());
    payload.extend_from_slice(&count.to_le_bytes());
    for _ in 0..count {
        payload.extend_from_slice(&[color.r, color.g, color.b, 0]);
    }
    payload
}

/// The parts of a controller description needed to drive it
#[derive(Debug, PartialEq)]
struct Controller {
    name: String,
    modes: Vec<String>,
    /// (name, LED count)
    zones: Vec<(String, u32)>,
}

fn parse_controller(data: &[u8]) -> Result<Controller, BackendError> {
    let mut r = Reader::new(data);
    let _data_size = r.u32()?;
    let _device_type = r.i32()?;
    let name = r.string()?;
    let _description = r.string()?;
    let _version = r.string()?;
    let _serial = r.string()?;
    let _location = r.string()?;

    let mode_count = r.u16()?;
    let _active_mode = r.i32()?;
    let mut modes = Vec::with_capacity(mode_count as usize);
    for _ in 0..mode_count {
        modes.push(r.string()?);
        // value, flags, speed min/max, colors min/max, speed, direction, color mode
        r.skip(9 * 4)?;
        let colors = r.u16()?;
        r.skip(colors as usize * 4)?;
    }

    let zone_count = r.u16()?;
    let mut zones = Vec::with_capacity(zone_count as usize);
    for _ in 0..zone_count {
        let zone_name = r.string()?;
        let _zone_type = r.i32()?;
        let _leds_min = r.u32()?;
        let _leds_max = r.u32()?;
        let leds = r.u32()?;
        let matrix_len = r.u16()?;
        r.skip(matrix_len as usize)?;
        zones.push((zone_name, leds));
    }

    Ok(Controller { name, modes, zones })
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], BackendError> {
        let end = self.pos + len;
        let bytes = self
            .data
            .get(self.pos..end)
            .ok_or_else(|| BackendError::Protocol("truncated packet".to_string()))?;
        self.pos = end;
        Ok(bytes)
    }

    fn skip(&mut self, len: usize) -> Result<(), BackendError> {
        self.take(len).map(|_| ())
    }

    fn u16(&mut self) -> Result<u16, BackendError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self) -> Result<u32, BackendError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn i32(&mut self) -> Result<i32, BackendError> {
        self.u32().map(|v| v as i32)
    }

    /// Length-prefixed, NUL-terminated string
    fn string(&mut self) -> Result<String, BackendError> {
        let len = self.u16()? as usize;
        let bytes = self.take(len)?;
        let text = bytes.strip_suffix(&[0]).unwrap_or(bytes);
        Ok(String::from_utf8_lossy(text).into_owned())
    }
}
