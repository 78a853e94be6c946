//! Settings Record Wire Format
//!
//! One record per filter unit: two little-endian signed 32-bit integers,
//! filter id then queue depth budget.
//!
//! ```text
//! +------------------+----------------------------+
//! | filter_id (4 LE) | queue_depth_budget (4 LE)  |
//! +------------------+----------------------------+
//! ```

use thiserror::Error;

/// Size in bytes of one encoded settings record
pub const SETTINGS_MSG_SIZE: usize = 8;

/// Queue depth budget handed to every filter unit
pub const QUEUE_DEPTH_BUDGET: i32 = 10;

/// Decode failures for settings records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WireError {
    /// Record length did not match the fixed layout
    #[error("settings record is {len} bytes, expected exactly 8")]
    BadLength {
        /// Length of the rejected buffer
        len: usize,
    },
}

/// Runtime configuration for one filter unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSettings {
    /// Index of the filter unit in `[0, filter_count)`
    pub filter_id: i32,
    /// Bounded depth the unit may queue internally
    pub queue_depth_budget: i32,
}

impl FilterSettings {
    /// Settings for one filter unit with the standard depth budget
    pub fn for_unit(filter_id: i32) -> Self {
        Self {
            filter_id,
            queue_depth_budget: QUEUE_DEPTH_BUDGET,
        }
    }

    /// Encode into the fixed 8-byte wire layout
    pub fn encode(&self) -> [u8; SETTINGS_MSG_SIZE] {
        let mut buf = [0u8; SETTINGS_MSG_SIZE];
        buf[..4].copy_from_slice(&self.filter_id.to_le_bytes());
        buf[4..].copy_from_slice(&self.queue_depth_budget.to_le_bytes());
        buf
    }

    /// Decode from the fixed 8-byte wire layout
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() != SETTINGS_MSG_SIZE {
            return Err(WireError::BadLength { len: buf.len() });
        }
        let filter_id = i32::from_le_bytes(buf[..4].try_into().expect("length checked"));
        let queue_depth_budget = i32::from_le_bytes(buf[4..].try_into().expect("length checked"));
        Ok(Self {
            filter_id,
            queue_depth_budget,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let settings = FilterSettings::for_unit(7);
        let decoded = FilterSettings::decode(&settings.encode()).unwrap();
        assert_eq!(decoded, settings);
        assert_eq!(decoded.queue_depth_budget, 10);
    }

    #[test]
    fn test_wire_layout_is_little_endian() {
        let settings = FilterSettings {
            filter_id: 1,
            queue_depth_budget: 10,
        };
        assert_eq!(settings.encode(), [1, 0, 0, 0, 10, 0, 0, 0]);
    }

    #[test]
    fn test_negative_id_roundtrip() {
        let settings = FilterSettings {
            filter_id: -1,
            queue_depth_budget: 10,
        };
        let decoded = FilterSettings::decode(&settings.encode()).unwrap();
        assert_eq!(decoded.filter_id, -1);
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        assert_eq!(
            FilterSettings::decode(&[0u8; 4]),
            Err(WireError::BadLength { len: 4 })
        );
        assert_eq!(
            FilterSettings::decode(&[0u8; 12]),
            Err(WireError::BadLength { len: 12 })
        );
    }
}
