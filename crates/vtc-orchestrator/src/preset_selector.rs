//! Local preset heuristic.

use vtc_models::{QualityLevel, WEB_1080P, WEB_2K, WEB_720P};

/// Pick a web preset from source size, duration and detected quality.
///
/// `Unknown` quality is treated the same as no analysis.
pub fn select_preset(
    size_mb: f64,
    duration_minutes: f64,
    detected_quality: Option<QualityLevel>,
) -> &'static str {
    let quality = detected_quality.and_then(QualityLevel::detected);

    if quality == Some(QualityLevel::High) {
        if size_mb > 1000.0 || duration_minutes > 60.0 {
            return WEB_2K;
        }
        return WEB_1080P;
    }

    // Long-form content gets more size headroom before stepping up
    if duration_minutes > 30.0 {
        return if size_mb > 3000.0 {
            WEB_2K
        } else if size_mb > 1500.0 {
            WEB_1080P
        } else {
            WEB_720P
        };
    }

    if size_mb > 1000.0 || duration_minutes > 60.0 {
        WEB_2K
    } else if size_mb > 500.0 || duration_minutes > 30.0 {
        WEB_1080P
    } else {
        WEB_720P
    }
}
