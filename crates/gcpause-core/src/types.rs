//! Core type definitions for collector pause events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Collector kind reported by the host
///
/// The value is host-defined and passed through unchanged. The associated
/// constants cover the values common hosts use; anything else is still a
/// valid `GcType`, it just has no [`name`](GcType::name).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GcType(pub u32);

impl GcType {
    /// Minor collection of the young generation
    pub const SCAVENGE: GcType = GcType(1);
    /// Full mark-sweep-compact of the old generation
    pub const MARK_SWEEP_COMPACT: GcType = GcType(2);
    /// Incremental marking step
    pub const INCREMENTAL_MARKING: GcType = GcType(4);
    /// Weak reference callback processing
    pub const PROCESS_WEAK_CALLBACKS: GcType = GcType(8);
    /// Union of all of the above
    pub const ALL: GcType = GcType(15);

    /// Every kind with a known name, in code order
    pub const KNOWN: [GcType; 5] = [
        Self::SCAVENGE,
        Self::MARK_SWEEP_COMPACT,
        Self::INCREMENTAL_MARKING,
        Self::PROCESS_WEAK_CALLBACKS,
        Self::ALL,
    ];

    pub fn code(self) -> u32 {
        self.0
    }

    pub fn name(self) -> Option<&'static str> {
        match self.0 {
            1 => Some("Scavenge"),
            2 => Some("MarkSweepCompact"),
            4 => Some("IncrementalMarking"),
            8 => Some("ProcessWeakCallbacks"),
            15 => Some("All"),
            _ => None,
        }
    }
}

impl From<u32> for GcType {
    fn from(code: u32) -> Self {
        Self(code)
    }
}

impl std::fmt::Display for GcType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "{}", self.0),
        }
    }
}

impl std::str::FromStr for GcType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scavenge" | "minor" => Ok(Self::SCAVENGE),
            "marksweepcompact" | "mark_sweep_compact" | "major" => Ok(Self::MARK_SWEEP_COMPACT),
            "incrementalmarking" | "incremental_marking" => Ok(Self::INCREMENTAL_MARKING),
            "processweakcallbacks" | "process_weak_callbacks" | "weak" => {
                Ok(Self::PROCESS_WEAK_CALLBACKS)
            }
            "all" => Ok(Self::ALL),
            other => other
                .parse::<u32>()
                .map(Self)
                .map_err(|_| format!("Invalid gc type: {}", s)),
        }
    }
}

/// Opaque collector callback flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GcFlags(pub u32);

impl GcFlags {
    pub const NONE: GcFlags = GcFlags(0);
    pub const COMPACTED: GcFlags = GcFlags(1 << 0);
    pub const CONSTRUCT_RETAINED_OBJECT_INFOS: GcFlags = GcFlags(1 << 1);
    pub const FORCED: GcFlags = GcFlags(1 << 2);

    pub fn bits(self) -> u32 {
        self.0
    }

    /// True when every bit of `other` is set
    pub fn contains(self, other: GcFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_forced(self) -> bool {
        self.contains(Self::FORCED)
    }

    pub fn is_compacted(self) -> bool {
        self.contains(Self::COMPACTED)
    }
}

impl std::ops::BitOr for GcFlags {
    type Output = GcFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        GcFlags(self.0 | rhs.0)
    }
}

impl From<u32> for GcFlags {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

/// One completed collector pause
///
/// Built by the after-collection hook and never mutated afterwards.
/// `duration_ms` comes from the monotonic clock only; `start_timestamp` is
/// informational and plays no part in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GcEvent {
    /// Wall-clock time the pause started
    pub start_timestamp: DateTime<Utc>,
    /// Pause length in milliseconds, never negative
    pub duration_ms: f64,
    /// Collector kind
    pub gc_type: GcType,
    /// Collector flags
    pub gc_flags: GcFlags,
}

impl GcEvent {
    pub fn new(
        start_timestamp: DateTime<Utc>,
        duration_ms: f64,
        gc_type: GcType,
        gc_flags: GcFlags,
    ) -> Self {
        Self {
            start_timestamp,
            duration_ms: duration_ms.max(0.0),
            gc_type,
            gc_flags,
        }
    }

    /// Start time as fractional seconds since the Unix epoch
    pub fn start_epoch_seconds(&self) -> f64 {
        epoch_seconds(self.start_timestamp)
    }
}

/// Fractional seconds since the Unix epoch, microsecond precision
pub fn epoch_seconds(ts: DateTime<Utc>) -> f64 {
    ts.timestamp_micros() as f64 / 1_000_000.0
}

/// Decoded view of a [`GcEvent`] for consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GcInfo {
    pub date: DateTime<Utc>,
    pub duration_ms: f64,
    /// Kind name, `None` for kinds this build does not know
    pub kind: Option<String>,
    pub forced: bool,
    pub flags: u32,
}

impl From<&GcEvent> for GcInfo {
    fn from(event: &GcEvent) -> Self {
        Self {
            date: event.start_timestamp,
            duration_ms: event.duration_ms,
            kind: event.gc_type.name().map(str::to_string),
            forced: event.gc_flags.is_forced(),
            flags: event.gc_flags.bits(),
        }
    }
}
