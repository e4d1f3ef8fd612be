use image::{Rgba, RgbaImage};

use crate::color::{Rgb, colorstr_to_tuple};
use crate::error::{ArtwallError, ArtwallResult};
use crate::processors::ProcessorArgs;

/// Radial two-color gradient. Dimensions default to the source image's.
///
/// The interpolation weight is the distance from the pixel to the center,
/// normalized by `sqrt(2) * width / 2`; only the low quadrant is computed
/// and the other three are mirrored from it.
pub fn radial_gradient(image: RgbaImage, args: &ProcessorArgs) -> ArtwallResult<RgbaImage> {
    let (ow, oh) = image.dimensions();
    let inner = colorstr_to_tuple(args.require_str("inner_color")?)?;
    let outer = colorstr_to_tuple(args.require_str("outer_color")?)?;
    let width = args.u32_or("width", ow)?;
    let height = args.u32_or("height", oh)?;
    if width == 0 || height == 0 {
        return Err(ArtwallError::argument(format!(
            "gradient size {width}x{height} must be positive"
        )));
    }

    let half_w = f64::from(width) / 2.0;
    let half_h = f64::from(height) / 2.0;
    let norm = std::f64::consts::SQRT_2 * half_w;

    let mut out = RgbaImage::new(width, height);
    for y in 0..height.div_ceil(2) {
        for x in 0..width.div_ceil(2) {
            let dx = f64::from(x) - half_w;
            let dy = f64::from(y) - half_h;
            let t = (dx * dx + dy * dy).sqrt() / norm;
            let px = Rgba([
                mix(inner.0, outer.0, t),
                mix(inner.1, outer.1, t),
                mix(inner.2, outer.2, t),
                255,
            ]);

            out.put_pixel(x, y, px);
            out.put_pixel(width - 1 - x, y, px);
            out.put_pixel(x, height - 1 - y, px);
            out.put_pixel(width - 1 - x, height - 1 - y, px);
        }
    }
    Ok(out)
}

fn mix(inner: u8, outer: u8, t: f64) -> u8 {
    let v = f64::from(outer) * t + f64::from(inner) * (1.0 - t);
    v.clamp(0.0, 255.0) as u8
}
