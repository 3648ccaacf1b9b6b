//! Volume and mute state
//!
//! Volume is a linear level in `0.0..=1.0` handed straight to the host engine.
//! Muting forces the applied level to zero but keeps the requested level, and
//! unmuting restores the last audible level.

/// Volume controller with mute
#[derive(Debug, Clone)]
pub struct Volume {
    /// Requested level (0.0-1.0)
    level: f32,

    /// Mute state (preserves level)
    muted: bool,

    /// Last non-zero level, restored when unmuting from zero
    last_audible: f32,
}

impl Volume {
    /// Create new volume controller
    ///
    /// # Arguments
    /// * `level` - Initial volume, clamped to 0.0-1.0
    pub fn new(level: f32) -> Self {
        let level = Self::clamp(level);
        Self {
            level,
            muted: false,
            last_audible: if level > 0.0 { level } else { 1.0 },
        }
    }

    /// Set volume level, clamped to 0.0-1.0
    ///
    /// NaN is treated as silence.
    pub fn set_level(&mut self, level: f32) {
        self.level = Self::clamp(level);
        if self.level > 0.0 {
            self.last_audible = self.level;
        }
    }

    /// Requested level (0.0-1.0), independent of mute
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Flip mute; unmuting a zero level brings back the last audible one
    pub fn toggle_mute(&mut self) {
        if self.muted {
            self.unmute();
        } else {
            self.muted = true;
        }
    }

    /// Unmute and restore the last audible level if the current one is zero
    pub fn unmute(&mut self) {
        self.muted = false;
        if self.level == 0.0 {
            self.level = self.last_audible;
        }
    }

    pub fn mute(&mut self) {
        self.muted = true;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Level the engine should be driven at (0.0 when muted)
    pub fn effective(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.level
        }
    }

    fn clamp(level: f32) -> f32 {
        if level.is_nan() {
            0.0
        } else {
            level.clamp(0.0, 1.0)
        }
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new(1.0)
    }
}
