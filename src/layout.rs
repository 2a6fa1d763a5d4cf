use crate::error::{ResizeError, Result};

/// Where the scaled source lands inside the target canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Scale `src` uniformly to the largest size that fits inside `target` and
/// center it. The limiting axis always matches the target exactly.
pub fn fit(src: (u32, u32), target: (u32, u32)) -> Result<Placement> {
    let (src_w, src_h) = src;
    let (target_w, target_h) = target;

    if target_w == 0 || target_h == 0 {
        return Err(ResizeError::InvalidSize {
            width: target_w,
            height: target_h,
            reason: "target must be non-zero",
        });
    }
    if src_w == 0 || src_h == 0 {
        return Err(ResizeError::InvalidSize {
            width: src_w,
            height: src_h,
            reason: "source image is empty",
        });
    }

    // target_w / src_w <= target_h / src_h, cross-multiplied to stay exact.
    let width_limited = target_w as u64 * src_h as u64 <= target_h as u64 * src_w as u64;

    let (width, height) = if width_limited {
        let scale = target_w as f64 / src_w as f64;
        (target_w, scaled(src_h, scale, target_h))
    } else {
        let scale = target_h as f64 / src_h as f64;
        (scaled(src_w, scale, target_w), target_h)
    };

    Ok(Placement {
        x: (target_w - width) / 2,
        y: (target_h - height) / 2,
        width,
        height,
    })
}

fn scaled(side: u32, scale: f64, bound: u32) -> u32 {
    ((side as f64 * scale).round() as u32).clamp(1, bound)
}
