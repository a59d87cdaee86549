/// Clamp a confidence or effectiveness score into `[0.0, 1.0]`.
///
/// NaN collapses to 0.0 so a degenerate computation never propagates.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}
