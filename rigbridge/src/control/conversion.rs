//! Every transport delivers values normalized to `[0, 1]`. Before any action
//! consumes them they are mapped onto the signed canonical range
//! `[-100, 100]`. Gesture checks (button press/release, speed buttons)
//! compare against the canonical bounds, which correspond to raw `1.0` and
//! `0.0`.

use crate::core::prelude::*;

pub const CANONICAL_MIN: f32 = -100.0;
pub const CANONICAL_MAX: f32 = 100.0;

const MIDI_MAX: u8 = 127;

/// `clamp(raw * 200 - 100, -100, 100)`, with the bounds returned exactly and
/// non-finite input mapped to `0.0`.
pub fn to_canonical(raw: f32) -> f32 {
    if !raw.is_finite() {
        return 0.0;
    }
    if raw >= 1.0 {
        return CANONICAL_MAX;
    }
    if raw <= 0.0 {
        return CANONICAL_MIN;
    }
    clamp(raw * 200.0 - 100.0, CANONICAL_MIN, CANONICAL_MAX)
}

/// MIDI CC values `0..=127` onto `[0, 1]`.
pub fn normalize_midi(value: u8) -> f32 {
    f32::from(value.min(MIDI_MAX)) / f32::from(MIDI_MAX)
}

pub fn is_upper_bound(canonical: f32) -> bool {
    canonical == CANONICAL_MAX
}

pub fn is_lower_bound(canonical: f32) -> bool {
    canonical == CANONICAL_MIN
}

pub fn is_at_bound(canonical: f32) -> bool {
    is_upper_bound(canonical) || is_lower_bound(canonical)
}
