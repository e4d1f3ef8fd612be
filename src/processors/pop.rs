use image::{Rgba, RgbaImage};

use crate::composite::composite_at;
use crate::error::{ArtwallError, ArtwallResult};
use crate::processors::ProcessorArgs;

/// Chromatic "pop" effect: the image is split into three copies, each with
/// one channel boosted and the others damped, composited diagonally offset
/// onto an enlarged transparent canvas in R, G, B order.
pub fn pop_filter(image: RgbaImage, args: &ProcessorArgs) -> ArtwallResult<RgbaImage> {
    let offset_x = args.i64_or("offset_x", 60)?;
    let offset_y = args.i64_or("offset_y", 60)?;
    if offset_x < 0 || offset_y < 0 {
        return Err(ArtwallError::argument(
            "arguments 'offset_x'/'offset_y' can't be less than zero",
        ));
    }

    let increase = args.f64_or("increase_factor", 1.4)?;
    let decrease = args.f64_or("decrease_factor", 0.8)?;
    if increase <= 1.0 {
        return Err(ArtwallError::argument(
            "argument 'increase_factor' must be greater than one",
        ));
    }
    if decrease >= 1.0 {
        return Err(ArtwallError::argument(
            "argument 'decrease_factor' must be less than one",
        ));
    }

    let (ox, oy) = (offset_x as u32, offset_y as u32);
    let (w, h) = image.dimensions();

    let recolored = |boost: usize| -> RgbaImage {
        let mut copy = RgbaImage::new(w, h);
        for (src, dst) in image.pixels().zip(copy.pixels_mut()) {
            let mut px = [0u8; 4];
            for c in 0..3 {
                let f = if c == boost { increase } else { decrease };
                px[c] = scale_channel(src.0[c], f);
            }
            px[3] = src.0[3];
            *dst = Rgba(px);
        }
        copy
    };

    let mut canvas = RgbaImage::new(w + 2 * ox, h + 2 * oy);
    composite_at(&mut canvas, &recolored(0), 0, 0)?;
    composite_at(&mut canvas, &recolored(1), ox, oy)?;
    composite_at(&mut canvas, &recolored(2), 2 * ox, 2 * oy)?;
    Ok(canvas)
}

fn scale_channel(v: u8, factor: f64) -> u8 {
    (f64::from(v) * factor).clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opaque(w: u32, h: u32, rgb: [u8; 3]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([rgb[0], rgb[1], rgb[2], 255]))
    }

    #[test]
    fn output_grows_by_twice_each_offset() {
        let out = pop_filter(
            opaque(10, 8, [100, 100, 100]),
            &ProcessorArgs::from_pairs(&[("offset_x", "3"), ("offset_y", "2")]),
        )
        .unwrap();
        assert_eq!(out.dimensions(), (16, 12));
    }

    #[test]
    fn copies_land_in_rgb_z_order() {
        let out = pop_filter(
            opaque(10, 10, [100, 100, 100]),
            &ProcessorArgs::from_pairs(&[
                ("offset_x", "2"),
                ("offset_y", "2"),
                ("increase_factor", "2.0"),
                ("decrease_factor", "0.5"),
            ]),
        )
        .unwrap();

        // Top-left corner only holds the red-boosted copy.
        assert_eq!(out.get_pixel(0, 0).0, [200, 50, 50, 255]);
        // The blue-boosted copy composites last and covers its region.
        assert_eq!(out.get_pixel(4, 4).0, [50, 50, 200, 255]);
        // Outside every copy: transparent.
        assert_eq!(out.get_pixel(13, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn strict_factor_boundaries_are_rejected() {
        let img = opaque(4, 4, [1, 2, 3]);
        let err = pop_filter(
            img.clone(),
            &ProcessorArgs::from_pairs(&[("increase_factor", "1.0")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("increase_factor"));

        let err = pop_filter(
            img,
            &ProcessorArgs::from_pairs(&[("decrease_factor", "1.0")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("decrease_factor"));
    }

    #[test]
    fn negative_offsets_are_rejected() {
        let err = pop_filter(
            opaque(4, 4, [1, 2, 3]),
            &ProcessorArgs::from_pairs(&[("offset_x", "-1")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("less than zero"));
    }
}
