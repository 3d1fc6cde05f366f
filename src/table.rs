//! Message id -> extra-CRC table shared by the generator output and the packet checksum.

use crate::error::SchemaError;
use crate::types::MessageSpec;

/// Highest message id a one-byte header can carry that still has a table slot.
pub const MAX_MESSAGE_ID: u8 = 254;

/// Number of slots (ids 0..=MAX_MESSAGE_ID).
pub const TABLE_SLOTS: usize = MAX_MESSAGE_ID as usize + 1;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Slot {
    name: String,
    crc_extra: u8,
}

/// Fixed-size table indexed by message id. Each slot is written once; unset slots read 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibilityTable {
    slots: Vec<Option<Slot>>,
}

impl Default for CompatibilityTable {
    fn default() -> Self {
        CompatibilityTable {
            slots: vec![None; TABLE_SLOTS],
        }
    }
}

impl CompatibilityTable {
    pub fn new() -> Self {
        CompatibilityTable::default()
    }

    /// Record `crc_extra` for `id`. A populated slot is never overwritten.
    pub fn register(&mut self, id: u8, name: &str, crc_extra: u8) -> Result<(), SchemaError> {
        let slot = self
            .slots
            .get_mut(id as usize)
            .ok_or_else(|| SchemaError::InvalidMessageId {
                message: name.to_string(),
                value: id.to_string(),
                max: MAX_MESSAGE_ID,
            })?;
        if let Some(existing) = slot.as_ref() {
            return Err(SchemaError::DuplicateMessageId {
                id,
                message: name.to_string(),
                existing: existing.name.clone(),
            });
        }
        *slot = Some(Slot {
            name: name.to_string(),
            crc_extra,
        });
        Ok(())
    }

    pub fn register_message(&mut self, message: &MessageSpec) -> Result<(), SchemaError> {
        self.register(message.id(), message.name(), message.crc_extra())
    }

    /// Extra-CRC for `id`, 0 if unset.
    pub fn crc_extra(&self, id: u8) -> u8 {
        self.slots
            .get(id as usize)
            .and_then(|s| s.as_ref())
            .map_or(0, |s| s.crc_extra)
    }

    pub fn is_set(&self, id: u8) -> bool {
        matches!(self.slots.get(id as usize), Some(Some(_)))
    }

    pub fn message_name(&self, id: u8) -> Option<&str> {
        self.slots
            .get(id as usize)
            .and_then(|s| s.as_ref())
            .map(|s| s.name.as_str())
    }

    /// All slots as codes, unset slots as 0.
    pub fn codes(&self) -> Vec<u8> {
        (0..TABLE_SLOTS).map(|i| self.crc_extra(i as u8)).collect()
    }

    /// Populated slots in id order: (id, name, crc_extra).
    pub fn entries(&self) -> impl Iterator<Item = (u8, &str, u8)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.as_ref().map(|s| (i as u8, s.name.as_str(), s.crc_extra))
        })
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
