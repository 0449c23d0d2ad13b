//! Relative volume.
//!
//! Each time-of-day slot keeps a ring of the volumes seen at that time on
//! previous sessions. A bar's relative volume is its volume as a percentage of
//! the slot average; the cumulated ratio compares session-to-date volume with
//! the session-to-date sum of slot averages.

use crate::domain::error::EngineError;
use chrono::NaiveTime;
use std::collections::HashMap;
use std::str::FromStr;

/// Fixed-capacity ring with a running sum. Insert and evict are O(1).
#[derive(Debug, Clone)]
pub struct VolumeSlot {
    buffer: Vec<f64>,
    capacity: usize,
    next: usize,
    sum: f64,
}

impl VolumeSlot {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: Vec::with_capacity(capacity),
            capacity,
            next: 0,
            sum: 0.0,
        }
    }

    pub fn push(&mut self, volume: f64) {
        if self.buffer.len() < self.capacity {
            self.buffer.push(volume);
        } else {
            self.sum -= self.buffer[self.next];
            self.buffer[self.next] = volume;
        }
        self.sum += volume;
        self.next = (self.next + 1) % self.capacity;
        // Exact sum once per lap.
        if self.next == 0 {
            self.sum = self.buffer.iter().sum();
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// 0 when empty.
    pub fn average(&self) -> f64 {
        if self.buffer.is_empty() {
            0.0
        } else {
            self.sum / self.buffer.len() as f64
        }
    }

    /// Oldest first.
    pub fn values(&self) -> Vec<f64> {
        if self.buffer.len() < self.capacity {
            return self.buffer.clone();
        }
        let (newer, older) = self.buffer.split_at(self.next);
        older.iter().chain(newer).copied().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VolumeResolution {
    /// One slot per bar time of day.
    #[default]
    Intraday,
    /// A single slot; every bar is its own session.
    Daily,
}

impl FromStr for VolumeResolution {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "intraday" => Ok(VolumeResolution::Intraday),
            "daily" => Ok(VolumeResolution::Daily),
            other => Err(EngineError::configuration(
                "resolution",
                format!("unknown volume resolution '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RelativeVolumeReading {
    pub average_volume: f64,
    pub relative_volume: Option<f64>,
    pub cumulated_ratio: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct RelativeVolumeAggregator {
    reference_period: usize,
    resolution: VolumeResolution,
    slots: HashMap<NaiveTime, VolumeSlot>,
    cumul_volume: f64,
    cumul_reference: f64,
}

impl RelativeVolumeAggregator {
    pub fn new(reference_period: usize, resolution: VolumeResolution) -> Self {
        Self {
            reference_period: reference_period.max(1),
            resolution,
            slots: HashMap::new(),
            cumul_volume: 0.0,
            cumul_reference: 0.0,
        }
    }

    fn slot_key(&self, time: NaiveTime) -> NaiveTime {
        match self.resolution {
            VolumeResolution::Intraday => time,
            VolumeResolution::Daily => NaiveTime::MIN,
        }
    }

    /// The slot average is taken over earlier sessions only; the bar's
    /// volume joins the slot afterwards.
    pub fn on_bar(&mut self, time: NaiveTime, volume: f64, session_start: bool) -> RelativeVolumeReading {
        let key = self.slot_key(time);
        let capacity = self.reference_period;
        let slot = self
            .slots
            .entry(key)
            .or_insert_with(|| VolumeSlot::new(capacity));

        let average_volume = slot.average();
        slot.push(volume);

        let relative_volume = (average_volume > 0.0).then(|| 100.0 * volume / average_volume);

        let session_start = session_start || self.resolution == VolumeResolution::Daily;
        if session_start {
            self.cumul_volume = volume;
            self.cumul_reference = average_volume;
        } else {
            self.cumul_volume += volume;
            self.cumul_reference += average_volume;
        }
        let cumulated_ratio =
            (self.cumul_reference > 0.0).then(|| 100.0 * self.cumul_volume / self.cumul_reference);

        RelativeVolumeReading {
            average_volume,
            relative_volume,
            cumulated_ratio,
        }
    }

    pub fn slot(&self, time: NaiveTime) -> Option<&VolumeSlot> {
        self.slots.get(&self.slot_key(time))
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.cumul_volume = 0.0;
        self.cumul_reference = 0.0;
    }
}
