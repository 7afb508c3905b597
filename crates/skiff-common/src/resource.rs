//! Resource quantity parsing and representation.
//!
//! Configured capacity limits travel as human-readable strings:
//! - CPU: "1500MHz", "2GHz", "1.5GHz"
//! - Memory: "512Mi", "4Gi", "1048576" (plain bytes)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{SkiffError, SkiffResult};

/// A resource quantity with a value and unit.
///
/// Serializes to the string form it parses from, so configured limits stay
/// readable on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceQuantity {
    /// The raw value in the smallest unit (MHz for CPU, bytes for memory).
    value: u64,
    /// The type of resource.
    kind: ResourceKind,
}

/// The type of resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// CPU in MHz.
    Cpu,
    /// Memory in bytes.
    Memory,
}

impl ResourceQuantity {
    /// Create a CPU quantity from MHz.
    #[must_use]
    pub const fn cpu_mhz(mhz: u64) -> Self {
        Self {
            value: mhz,
            kind: ResourceKind::Cpu,
        }
    }

    /// Create a memory quantity from bytes.
    #[must_use]
    pub const fn memory_bytes(bytes: u64) -> Self {
        Self {
            value: bytes,
            kind: ResourceKind::Memory,
        }
    }

    /// Get the raw value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.value
    }

    /// Get the resource kind.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Convert CPU to MHz.
    #[must_use]
    pub const fn as_mhz(&self) -> u64 {
        self.value
    }

    /// Convert memory to bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> u64 {
        self.value
    }

    /// Parse a CPU quantity string.
    ///
    /// Formats:
    /// - "1500MHz" -> 1500 MHz
    /// - "2GHz" -> 2000 MHz
    /// - "1.5GHz" -> 1500 MHz
    pub fn parse_cpu(s: &str) -> SkiffResult<Self> {
        let s = s.trim();

        if let Some(stripped) = s.strip_suffix("MHz") {
            let mhz: u64 = stripped
                .parse()
                .map_err(|_| SkiffError::InvalidResourceQuantity {
                    value: s.to_string(),
                })?;
            return Ok(Self::cpu_mhz(mhz));
        }

        if let Some(stripped) = s.strip_suffix("GHz") {
            let ghz: f64 = stripped
                .parse()
                .map_err(|_| SkiffError::InvalidResourceQuantity {
                    value: s.to_string(),
                })?;
            if ghz >= 0.0 {
                return Ok(Self::cpu_mhz((ghz * 1000.0) as u64));
            }
        }

        Err(SkiffError::InvalidResourceQuantity {
            value: s.to_string(),
        })
    }

    /// Parse a memory quantity string.
    ///
    /// Formats (binary, powers of 1024):
    /// - "128Ki" -> 128 * 1024 bytes
    /// - "512Mi" -> 512 * 1024^2 bytes
    /// - "4Gi" -> 4 * 1024^3 bytes
    ///
    /// Plain number is bytes.
    pub fn parse_memory(s: &str) -> SkiffResult<Self> {
        let s = s.trim();

        let suffixes = [
            ("Ki", 1024u64),
            ("Mi", 1024 * 1024),
            ("Gi", 1024 * 1024 * 1024),
            ("Ti", 1024 * 1024 * 1024 * 1024),
        ];

        for (suffix, multiplier) in suffixes {
            if let Some(stripped) = s.strip_suffix(suffix) {
                let value: u64 =
                    stripped
                        .parse()
                        .map_err(|_| SkiffError::InvalidResourceQuantity {
                            value: s.to_string(),
                        })?;
                return Ok(Self::memory_bytes(value * multiplier));
            }
        }

        // Plain bytes
        let bytes: u64 = s.parse().map_err(|_| SkiffError::InvalidResourceQuantity {
            value: s.to_string(),
        })?;
        Ok(Self::memory_bytes(bytes))
    }
}

impl fmt::Display for ResourceQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ResourceKind::Cpu => {
                if self.value >= 1000 && self.value % 1000 == 0 {
                    write!(f, "{}GHz", self.value / 1000)
                } else {
                    write!(f, "{}MHz", self.value)
                }
            }
            ResourceKind::Memory => {
                const GI: u64 = 1024 * 1024 * 1024;
                const MI: u64 = 1024 * 1024;
                const KI: u64 = 1024;

                if self.value >= GI && self.value % GI == 0 {
                    write!(f, "{}Gi", self.value / GI)
                } else if self.value >= MI && self.value % MI == 0 {
                    write!(f, "{}Mi", self.value / MI)
                } else if self.value >= KI && self.value % KI == 0 {
                    write!(f, "{}Ki", self.value / KI)
                } else {
                    write!(f, "{}", self.value)
                }
            }
        }
    }
}

impl FromStr for ResourceQuantity {
    type Err = SkiffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.ends_with("MHz") || s.ends_with("GHz") {
            Self::parse_cpu(s)
        } else {
            Self::parse_memory(s)
        }
    }
}

impl Serialize for ResourceQuantity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResourceQuantity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
