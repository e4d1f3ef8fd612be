use image::RgbaImage;

use crate::error::{ArtwallError, ArtwallResult};

pub type Rgba8 = [u8; 4];

/// Straight-alpha source-over. Inputs and output are non-premultiplied.
pub fn over(dst: Rgba8, src: Rgba8) -> Rgba8 {
    let sa = u16::from(src[3]);
    if sa == 255 {
        return src;
    }
    if sa == 0 {
        return dst;
    }

    let src_w = sa;
    let dst_w = mul_div255(u16::from(dst[3]), 255 - sa);
    let out_a = src_w + dst_w;
    if out_a == 0 {
        return [0, 0, 0, 0];
    }

    let mut out = [0u8; 4];
    out[3] = out_a as u8;
    for i in 0..3 {
        let num = u32::from(src[i]) * u32::from(src_w) + u32::from(dst[i]) * u32::from(dst_w);
        out[i] = ((num + u32::from(out_a) / 2) / u32::from(out_a)) as u8;
    }
    out
}

/// Composite `overlay` onto `canvas` with its top-left corner at `(x, y)`.
/// The overlay must fit entirely inside the canvas.
pub fn composite_at(canvas: &mut RgbaImage, overlay: &RgbaImage, x: u32, y: u32) -> ArtwallResult<()> {
    let (cw, ch) = canvas.dimensions();
    let (ow, oh) = overlay.dimensions();
    if x.checked_add(ow).is_none_or(|right| right > cw)
        || y.checked_add(oh).is_none_or(|bottom| bottom > ch)
    {
        return Err(ArtwallError::resource(format!(
            "overlay {ow}x{oh} at ({x},{y}) does not fit canvas {cw}x{ch}"
        )));
    }

    for (oy, row) in overlay.rows().enumerate() {
        for (ox, px) in row.enumerate() {
            let cx = x + ox as u32;
            let cy = y + oy as u32;
            let dst = canvas.get_pixel(cx, cy).0;
            canvas.put_pixel(cx, cy, image::Rgba(over(dst, px.0)));
        }
    }
    Ok(())
}

/// Top-left offset that centers `inner` inside `outer` (integer floor).
pub fn centered_offset(outer: (u32, u32), inner: (u32, u32)) -> (u32, u32) {
    ((outer.0 - inner.0) / 2, (outer.1 - inner.1) / 2)
}

fn mul_div255(x: u16, y: u16) -> u16 {
    ((u32::from(x) * u32::from(y) + 127) / 255) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn over_transparent_src_is_noop() {
        let dst = [10, 20, 30, 40];
        assert_eq!(over(dst, [255, 255, 255, 0]), dst);
    }

    #[test]
    fn over_opaque_src_replaces_dst() {
        let src = [255, 0, 0, 255];
        assert_eq!(over([0, 0, 0, 255], src), src);
    }

    #[test]
    fn over_transparent_dst_yields_src() {
        let src = [100, 110, 120, 200];
        assert_eq!(over([0, 0, 0, 0], src), src);
    }

    #[test]
    fn over_half_alpha_blends_toward_src() {
        let out = over([0, 0, 0, 255], [255, 255, 255, 128]);
        assert_eq!(out[3], 255);
        assert!(out[0] > 110 && out[0] < 140);
    }

    #[test]
    fn composite_at_rejects_overflow() {
        let mut canvas = RgbaImage::new(10, 10);
        let overlay = RgbaImage::new(8, 8);
        assert!(composite_at(&mut canvas, &overlay, 4, 0).is_err());
        assert!(composite_at(&mut canvas, &overlay, 0, 0).is_ok());
    }

    #[test]
    fn composite_at_writes_only_the_target_rect() {
        let mut canvas = RgbaImage::new(4, 4);
        let overlay = RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 255]));
        composite_at(&mut canvas, &overlay, 1, 1).unwrap();

        assert_eq!(canvas.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(canvas.get_pixel(1, 1).0, [9, 9, 9, 255]);
        assert_eq!(canvas.get_pixel(2, 2).0, [9, 9, 9, 255]);
        assert_eq!(canvas.get_pixel(3, 3).0, [0, 0, 0, 0]);
    }

    #[test]
    fn centered_offset_floors() {
        assert_eq!(centered_offset((200, 200), (100, 100)), (50, 50));
        assert_eq!(centered_offset((5, 5), (2, 2)), (1, 1));
    }
}
