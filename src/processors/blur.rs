use image::RgbaImage;

use crate::error::{ArtwallError, ArtwallResult};
use crate::processors::ProcessorArgs;

/// Box blur with the given `strength` (kernel radius in pixels).
pub fn box_blur(image: RgbaImage, args: &ProcessorArgs) -> ArtwallResult<RgbaImage> {
    let strength = args.u32_or("strength", 5)?;
    if strength == 0 {
        return Ok(image);
    }
    let kernel = box_kernel_q16(strength);
    Ok(convolve_separable(image, &kernel))
}

/// Gaussian blur; `radius` is the standard deviation in pixels.
pub fn gaussian_blur(image: RgbaImage, args: &ProcessorArgs) -> ArtwallResult<RgbaImage> {
    let radius = args.f64_or("radius", 5.0)?;
    if !radius.is_finite() || radius < 0.0 {
        return Err(ArtwallError::argument(format!(
            "argument 'radius' must be a non-negative number, got '{radius}'"
        )));
    }
    if radius == 0.0 {
        return Ok(image);
    }

    let extent = ((radius * 3.0).ceil() as u32).clamp(1, 256);
    let kernel = gaussian_kernel_q16(extent, radius);
    Ok(convolve_separable(image, &kernel))
}

/// Two-pass convolution with a symmetric Q16 fixed-point kernel, clamping at
/// the image edges. Operates on all four channels.
fn convolve_separable(image: RgbaImage, kernel: &[u32]) -> RgbaImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image;
    }

    let src = image.into_raw();
    let mut tmp = vec![0u8; src.len()];
    let mut out = vec![0u8; src.len()];

    horizontal_pass(&src, &mut tmp, width, height, kernel);
    vertical_pass(&tmp, &mut out, width, height, kernel);

    RgbaImage::from_raw(width, height, out).expect("blur preserves buffer size")
}

/// Uniform kernel of `2*radius + 1` taps summing to one in Q16.
fn box_kernel_q16(radius: u32) -> Vec<u32> {
    let taps = (2 * radius + 1) as usize;
    let weight = 65536 / taps as u32;
    let mut kernel = vec![weight; taps];
    // Pin the residue on the center tap so the kernel sums to exactly 1.0.
    kernel[taps / 2] += 65536 - weight * taps as u32;
    kernel
}

fn gaussian_kernel_q16(radius: u32, sigma: f64) -> Vec<u32> {
    let r = radius as i32;
    let denom = 2.0 * sigma * sigma;
    let mut weights_f = Vec::with_capacity((2 * r + 1) as usize);
    let mut sum = 0.0f64;
    for i in -r..=r {
        let x = f64::from(i);
        let w = (-x * x / denom).exp();
        weights_f.push(w);
        sum += w;
    }

    let mut weights = Vec::with_capacity(weights_f.len());
    let mut acc: i64 = 0;
    for &wf in &weights_f {
        let q = ((wf / sum) * 65536.0).round() as i64;
        let q = q.clamp(0, 65536);
        weights.push(q as u32);
        acc += q;
    }
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        let new_mid = (i64::from(weights[mid]) + delta).clamp(0, 65536);
        weights[mid] = new_mid as u32;
    }
    weights
}

fn horizontal_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    for y in 0..height as i32 {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let dx = ki as i32 - radius;
                let sx = (x + dx).clamp(0, w - 1);
                let idx = ((y * w + sx) as usize) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out_idx = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn vertical_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let h = height as i32;
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let dy = ki as i32 - radius;
                let sy = (y + dy).clamp(0, h - 1);
                let idx = ((sy * w + x) as usize) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out_idx = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn q16_to_u8(acc: u64) -> u8 {
    let v = (acc + 32768) >> 16;
    v.min(255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn zero_strength_box_blur_is_identity() {
        let img = RgbaImage::from_pixel(3, 3, Rgba([9, 8, 7, 255]));
        let out = box_blur(img.clone(), &ProcessorArgs::from_pairs(&[("strength", "0")])).unwrap();
        assert_eq!(out.as_raw(), img.as_raw());
    }

    #[test]
    fn blurring_a_constant_image_changes_nothing() {
        let img = RgbaImage::from_pixel(6, 5, Rgba([10, 20, 30, 40]));
        let boxed = box_blur(img.clone(), &ProcessorArgs::from_pairs(&[("strength", "2")])).unwrap();
        assert_eq!(boxed.as_raw(), img.as_raw());

        let gauss =
            gaussian_blur(img.clone(), &ProcessorArgs::from_pairs(&[("radius", "1.5")])).unwrap();
        assert_eq!(gauss.as_raw(), img.as_raw());
    }

    #[test]
    fn blur_spreads_energy_from_a_single_pixel() {
        let mut img = RgbaImage::new(5, 5);
        img.put_pixel(2, 2, Rgba([255, 255, 255, 255]));

        let out = gaussian_blur(img, &ProcessorArgs::from_pairs(&[("radius", "1.0")])).unwrap();
        let nonzero = out.pixels().filter(|p| p.0[3] != 0).count();
        assert!(nonzero > 1);

        let sum_a: u32 = out.pixels().map(|p| u32::from(p.0[3])).sum();
        assert!((sum_a as i32 - 255).abs() <= 8);
    }

    #[test]
    fn negative_strength_is_an_argument_error() {
        let img = RgbaImage::new(2, 2);
        let err = box_blur(img, &ProcessorArgs::from_pairs(&[("strength", "-3")])).unwrap_err();
        assert!(err.to_string().contains("'strength'"));
    }

    #[test]
    fn negative_radius_is_an_argument_error() {
        let img = RgbaImage::new(2, 2);
        let err = gaussian_blur(img, &ProcessorArgs::from_pairs(&[("radius", "-1")])).unwrap_err();
        assert!(err.to_string().contains("'radius'"));
    }
}
