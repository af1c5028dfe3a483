/*! Error-correction blend curve.

When a fresh snapshot arrives, the newly rooted prediction usually disagrees
with the one the receiver was showing. Snapping would pop; instead the two
predicted trajectories are blended over the correction window with a
smoothstep curve, whose zero slope at both ends removes the velocity
discontinuity that a plain lerp would show.
*/

/// `3x^2 - 2x^3`, clamped to the unit interval. Monotonic, maps 0 to 0 and
/// 1 to 1 with zero first derivative at both ends.
pub fn smoothstep(x: f32) -> f32 {
    let x = x.clamp(0.0, 1.0);
    x * x * (3.0 - 2.0 * x)
}

/// Eased blend factor for a normalized `progress`.
///
/// `softness` (0-1) is an exponent applied before easing; zero softness
/// leaves the raw progress untouched.
pub fn blend_factor(progress: f32, softness: f32) -> f32 {
    let progress = progress.clamp(0.0, 1.0);
    let raw = if softness == 0.0 {
        progress
    } else {
        progress.powf(softness.clamp(0.0, 1.0))
    };
    smoothstep(raw)
}

/// Normalized progress through the correction window that started at
/// `receive_time`. A zero-length window means no smoothing: progress is
/// complete immediately.
pub fn blend_progress(now: f64, receive_time: f64, correction_duration: f32) -> f32 {
    if correction_duration <= 0.0 {
        return 1.0;
    }
    ((now - receive_time) / correction_duration as f64).clamp(0.0, 1.0) as f32
}
