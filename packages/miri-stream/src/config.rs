// Stream configuration
//
// Buffer geometry is fixed when a stream is set up. Values come from the
// key-value stream arguments supplied by the host application; anything
// missing or unusable falls back to the defaults below.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default slot capacity in bytes.
pub const DEFAULT_BUFFER_LENGTH: usize = 2304 * 8 * 2;

/// Default number of slots in the ring.
pub const DEFAULT_NUM_BUFFERS: usize = 15;

/// Bytes per raw sample component (12-bit values carried in 16-bit words).
pub const BYTES_PER_SAMPLE: usize = 2;

pub const KEY_BUFFER_LENGTH: &str = "bufflen";
pub const KEY_NUM_BUFFERS: &str = "buffers";
pub const KEY_ASYNC_BUFFERS: &str = "asyncBuffs";

/// Buffer geometry for a receive stream
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamConfig {
    /// Capacity of each ring slot in bytes
    pub buffer_length: usize,

    /// Number of slots in the ring
    pub num_buffers: usize,

    /// Number of USB transfer buffers requested from the transport (0 = transport default)
    pub async_buffers: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer_length: DEFAULT_BUFFER_LENGTH,
            num_buffers: DEFAULT_NUM_BUFFERS,
            async_buffers: 0,
        }
    }
}

impl StreamConfig {
    /// Build a configuration from stream arguments.
    ///
    /// Never fails: these are tuning hints, so a bad value is replaced by
    /// its default.
    pub fn from_args(args: &HashMap<String, String>) -> Self {
        let mut config = Self::default();

        if let Some(len) = args.get(KEY_BUFFER_LENGTH).and_then(|v| parse_positive(v)) {
            config.buffer_length = len;
        }
        log::debug!("Using buffer length {}", config.buffer_length);

        if let Some(count) = args.get(KEY_NUM_BUFFERS).and_then(|v| parse_positive(v)) {
            config.num_buffers = count;
        }
        log::debug!("Using {} buffers", config.num_buffers);

        if let Some(count) = args
            .get(KEY_ASYNC_BUFFERS)
            .and_then(|v| v.trim().parse::<usize>().ok())
        {
            config.async_buffers = count;
        }

        config
    }

    /// Replace zero-sized geometry with defaults.
    pub fn sanitized(mut self) -> Self {
        if self.buffer_length == 0 {
            self.buffer_length = DEFAULT_BUFFER_LENGTH;
        }
        if self.num_buffers == 0 {
            self.num_buffers = DEFAULT_NUM_BUFFERS;
        }
        self
    }

    /// Largest number of I/Q elements a single read can return.
    pub fn mtu(&self) -> usize {
        self.buffer_length / BYTES_PER_SAMPLE
    }

    /// Descriptors for the accepted stream arguments.
    pub fn arg_info() -> Vec<ArgInfo> {
        vec![
            ArgInfo {
                key: KEY_BUFFER_LENGTH.to_string(),
                value: DEFAULT_BUFFER_LENGTH.to_string(),
                name: "Buffer Size".to_string(),
                description: "Number of bytes per buffer, multiples of 512 only.".to_string(),
                units: "bytes".to_string(),
                arg_type: ArgType::Int,
            },
            ArgInfo {
                key: KEY_NUM_BUFFERS.to_string(),
                value: DEFAULT_NUM_BUFFERS.to_string(),
                name: "Ring buffers".to_string(),
                description: "Number of buffers in the ring.".to_string(),
                units: "buffers".to_string(),
                arg_type: ArgType::Int,
            },
            ArgInfo {
                key: KEY_ASYNC_BUFFERS.to_string(),
                value: "0".to_string(),
                name: "Async buffers".to_string(),
                description: "Number of async usb buffers (advanced).".to_string(),
                units: "buffers".to_string(),
                arg_type: ArgType::Int,
            },
        ]
    }
}

fn parse_positive(value: &str) -> Option<usize> {
    value.trim().parse::<i64>().ok().filter(|v| *v > 0).map(|v| v as usize)
}

/// Value type of a stream argument
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArgType {
    Bool,
    Int,
    Float,
    String,
}

/// Description of one accepted stream argument
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArgInfo {
    pub key: String,
    /// Default value, rendered as text
    pub value: String,
    pub name: String,
    pub description: String,
    pub units: String,
    #[serde(rename = "type")]
    pub arg_type: ArgType,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_when_absent() {
        let config = StreamConfig::from_args(&HashMap::new());
        assert_eq!(config, StreamConfig::default());
        assert_eq!(config.buffer_length, 36864);
        assert_eq!(config.num_buffers, 15);
    }

    #[test]
    fn test_valid_values_are_used() {
        let config = StreamConfig::from_args(&args(&[
            ("bufflen", "16384"),
            ("buffers", "4"),
            ("asyncBuffs", "8"),
        ]));
        assert_eq!(config.buffer_length, 16384);
        assert_eq!(config.num_buffers, 4);
        assert_eq!(config.async_buffers, 8);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = StreamConfig::from_args(&args(&[
            ("bufflen", "-512"),
            ("buffers", "lots"),
            ("asyncBuffs", "-1"),
        ]));
        assert_eq!(config, StreamConfig::default());

        let config = StreamConfig::from_args(&args(&[("bufflen", "0"), ("buffers", "0")]));
        assert_eq!(config, StreamConfig::default());
    }

    #[test]
    fn test_sanitized_replaces_zero() {
        let config = StreamConfig {
            buffer_length: 0,
            num_buffers: 0,
            async_buffers: 2,
        }
        .sanitized();
        assert_eq!(config.buffer_length, DEFAULT_BUFFER_LENGTH);
        assert_eq!(config.num_buffers, DEFAULT_NUM_BUFFERS);
        assert_eq!(config.async_buffers, 2);
    }

    #[test]
    fn test_mtu() {
        assert_eq!(StreamConfig::default().mtu(), DEFAULT_BUFFER_LENGTH / 2);
    }

    #[test]
    fn test_arg_info_keys() {
        let info = StreamConfig::arg_info();
        let keys: Vec<&str> = info.iter().map(|a| a.key.as_str()).collect();
        assert_eq!(keys, vec!["bufflen", "buffers", "asyncBuffs"]);
        assert_eq!(info[0].value, "36864");

        let json = serde_json::to_value(&info[1]).unwrap();
        assert_eq!(json["type"], "int");
    }
}
