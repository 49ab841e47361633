use thumbkit_core::TargetSize;

/// Resize-then-crop plan that fills a target box completely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropGeometry {
    /// Intermediate size after the aspect-preserving resize
    pub scaled_width: u32,
    pub scaled_height: u32,
    /// Top-left corner of the crop window inside the scaled image
    pub crop_x: u32,
    pub crop_y: u32,
    /// Final size, always the target size
    pub width: u32,
    pub height: u32,
}

/// Compute the cover-crop geometry of a `src_width x src_height` image.
///
/// Sources that are wider than the target (relative to its aspect ratio) are
/// scaled to the target height and cropped around the horizontal center.
/// Everything else is scaled to the target width and keeps its top rows, so
/// portrait pages keep their heading.
pub fn cover_crop_geometry(src_width: u32, src_height: u32, target: TargetSize) -> CropGeometry {
    let src_w = u64::from(src_width.max(1));
    let src_h = u64::from(src_height.max(1));
    let tw = u64::from(target.width);
    let th = u64::from(target.height);

    if src_w * th > src_h * tw {
        let scaled_w = div_round(src_w * th, src_h).max(tw);
        CropGeometry {
            scaled_width: clamp_u32(scaled_w),
            scaled_height: target.height,
            crop_x: clamp_u32((scaled_w - tw) / 2),
            crop_y: 0,
            width: target.width,
            height: target.height,
        }
    } else {
        let scaled_h = div_round(src_h * tw, src_w).max(th);
        CropGeometry {
            scaled_width: target.width,
            scaled_height: clamp_u32(scaled_h),
            crop_x: 0,
            crop_y: 0,
            width: target.width,
            height: target.height,
        }
    }
}

fn div_round(numerator: u64, denominator: u64) -> u64 {
    (numerator * 2 + denominator) / (denominator * 2)
}

fn clamp_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
