use super::client::Event;
use crate::light::LightState;

/// A light belonging to the synced room
#[derive(Debug, Clone, PartialEq)]
pub struct RoomLight {
    pub device_id: String,
    pub light_id: String,
    pub name: String,
}

/// Current state of every tracked light, keyed by owning device and kept in
/// room order
#[derive(Debug, Clone, Default)]
pub struct LightTable {
    device_ids: Vec<String>,
    states: Vec<LightState>,
}

impl LightTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the state of a device's light
    pub fn insert(&mut self, device_id: &str, state: LightState) {
        match self.device_ids.iter().position(|id| id == device_id) {
            Some(index) => self.states[index] = state,
            None => {
                self.device_ids.push(device_id.to_string());
                self.states.push(state);
            }
        }
    }

    pub fn get(&self, device_id: &str) -> Option<&LightState> {
        self.device_ids
            .iter()
            .position(|id| id == device_id)
            .map(|index| &self.states[index])
    }

    pub fn states(&self) -> &[LightState] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn clear(&mut self) {
        self.device_ids.clear();
        self.states.clear();
    }

    /// Merge every light update in the batch into the table. Returns whether
    /// any tracked light changed.
    pub fn apply_events(&mut self, events: &[Event]) -> bool {
        let mut updated = false;

        for event in events.iter().filter(|e| e.is_update()) {
            for update in event.data.iter().filter(|u| u.is_light()) {
                let Some(index) = self.device_ids.iter().position(|id| *id == update.owner.rid)
                else {
                    continue;
                };

                log::debug!("Light '{}' changed", self.states[index].name());
                self.states[index] = self.states[index].merge(update);
                updated = true;
            }
        }

        updated
    }
}
