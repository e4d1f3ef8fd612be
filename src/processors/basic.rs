use anyhow::Context as _;
use image::imageops::{self, FilterType};
use image::{GrayImage, Rgba, RgbaImage};

use crate::color::colorstr_to_tuple;
use crate::error::{ArtwallError, ArtwallResult};
use crate::processors::ProcessorArgs;

/// Identity processor.
pub fn noop(image: RgbaImage, _args: &ProcessorArgs) -> ArtwallResult<RgbaImage> {
    Ok(image)
}

/// Replace the running image with a file loaded from `path`.
pub fn load_img(_image: RgbaImage, args: &ProcessorArgs) -> ArtwallResult<RgbaImage> {
    let path = args.require_str("path")?;
    let img = image::open(path)
        .with_context(|| format!("load image '{path}'"))?
        .to_rgba8();
    Ok(img)
}

/// Replace the running image with a solid-color canvas.
pub fn blank_img(_image: RgbaImage, args: &ProcessorArgs) -> ArtwallResult<RgbaImage> {
    let width = args.require_u32("width")?;
    let height = args.require_u32("height")?;
    let color = args.get("color").unwrap_or("#000000");
    let (r, g, b) = colorstr_to_tuple(color)?;
    Ok(RgbaImage::from_pixel(width, height, Rgba([r, g, b, 255])))
}

/// Resize to explicit dimensions, or scale both axes by `factor`.
///
/// `factor` wins over `width`/`height`; new dimensions are rounded.
pub fn resize(image: RgbaImage, args: &ProcessorArgs) -> ArtwallResult<RgbaImage> {
    let (ow, oh) = image.dimensions();
    let mut new_w = args.u32_or("width", ow)?;
    let mut new_h = args.u32_or("height", oh)?;

    if let Some(factor) = args.opt_f64("factor")? {
        new_w = (f64::from(ow) * factor).round() as u32;
        new_h = (f64::from(oh) * factor).round() as u32;
    }

    if new_w == 0 || new_h == 0 {
        return Err(ArtwallError::argument(format!(
            "resize target {new_w}x{new_h} must be positive"
        )));
    }
    if (new_w, new_h) == (ow, oh) {
        return Ok(image);
    }
    Ok(imageops::resize(&image, new_w, new_h, FilterType::CatmullRom))
}

/// Scale uniformly so the image covers `width`x`height`, then center-crop to
/// exactly that size. The scale factor is the integer ceiling of the larger
/// axis ratio, so the scaled image never leaves a gap for the crop.
pub fn fit(image: RgbaImage, args: &ProcessorArgs) -> ArtwallResult<RgbaImage> {
    let width = args.require_u32("width")?;
    let height = args.require_u32("height")?;
    if width == 0 || height == 0 {
        return Err(ArtwallError::argument(format!(
            "fit target {width}x{height} must be positive"
        )));
    }

    let (ow, oh) = image.dimensions();
    if ow == 0 || oh == 0 {
        return Err(ArtwallError::resource("cannot fit an empty image"));
    }

    let factor = width.div_ceil(ow).max(height.div_ceil(oh)).max(1);
    let scaled = if factor == 1 {
        image
    } else {
        imageops::resize(&image, ow * factor, oh * factor, FilterType::CatmullRom)
    };

    let (sw, sh) = scaled.dimensions();
    let x = (sw - width) / 2;
    let y = (sh - height) / 2;
    Ok(imageops::crop_imm(&scaled, x, y, width, height).to_image())
}

/// Apply a circular alpha mask. The mask is rasterized at double resolution
/// and downsampled so the edge stays anti-aliased.
pub fn circle(mut image: RgbaImage, _args: &ProcessorArgs) -> ArtwallResult<RgbaImage> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Ok(image);
    }

    let (mw, mh) = (w * 2, h * 2);
    let a = f64::from(mw) / 2.0;
    let b = f64::from(mh) / 2.0;
    let mut mask = GrayImage::new(mw, mh);
    for (x, y, px) in mask.enumerate_pixels_mut() {
        let nx = (f64::from(x) + 0.5 - a) / a;
        let ny = (f64::from(y) + 0.5 - b) / b;
        if nx * nx + ny * ny <= 1.0 {
            px.0[0] = 255;
        }
    }

    let mask = imageops::resize(&mask, w, h, FilterType::Triangle);
    for (img_px, mask_px) in image.pixels_mut().zip(mask.pixels()) {
        img_px.0[3] = mask_px.0[0];
    }
    Ok(image)
}
