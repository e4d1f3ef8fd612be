use image::RgbaImage;

use crate::color::{Rgb, color_to_hexstr, colorstr_to_tuple, invert_color, most_frequent_color};
use crate::composite::over;
use crate::error::{ArtwallError, ArtwallResult};
use crate::processors::ProcessorArgs;

/// Draw `text` on the image.
///
/// Without an explicit `color` the fill is the inverse of the image's most
/// frequent color; without `start_x`/`start_y` the text is centered using
/// its measured bounding box. Rendering goes through an SVG `<text>` node so
/// font lookup uses the system font database.
pub fn img_print(mut image: RgbaImage, args: &ProcessorArgs) -> ArtwallResult<RgbaImage> {
    let text = args.require_str("text")?;
    let font = args.get("font").unwrap_or("DejaVuSans");
    let font_size = args.u32_or("font_size", 30)?;
    let start_x = args.opt_i64("start_x")?;
    let start_y = args.opt_i64("start_y")?;
    let color = match args.get("color") {
        Some(c) => colorstr_to_tuple(c)?,
        None => invert_color(most_frequent_color(&image)),
    };

    if text.is_empty() || font_size == 0 {
        return Ok(image);
    }

    let rendered = render_text(text, font, font_size, color)?;
    let (tw, th) = rendered.dimensions();
    if tw == 0 || th == 0 {
        return Ok(image);
    }

    let (w, h) = image.dimensions();
    let sx = start_x.unwrap_or((i64::from(w) - i64::from(tw)) / 2);
    let sy = start_y.unwrap_or((i64::from(h) - i64::from(th)) / 2);

    // Clipping blend: text may start off-canvas when placed explicitly.
    for (x, y, px) in rendered.enumerate_pixels() {
        let cx = sx + i64::from(x);
        let cy = sy + i64::from(y);
        if cx < 0 || cy < 0 || cx >= i64::from(w) || cy >= i64::from(h) {
            continue;
        }
        let (cx, cy) = (cx as u32, cy as u32);
        let dst = image.get_pixel(cx, cy).0;
        image.put_pixel(cx, cy, image::Rgba(over(dst, px.0)));
    }
    Ok(image)
}

/// Rasterize `text` to a tight RGBA bitmap via usvg/resvg.
fn render_text(text: &str, family: &str, font_size: u32, color: Rgb) -> ArtwallResult<RgbaImage> {
    // Generous staging canvas; the result is cropped to the glyph bbox.
    let est_w = (font_size * 2).saturating_mul(text.chars().count() as u32 + 2).max(1);
    let est_h = (font_size * 4).max(1);
    let baseline = font_size * 2;

    let svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{est_w}" height="{est_h}"><text x="0" y="{baseline}" font-family="{}" font-size="{font_size}" fill="{}">{}</text></svg>"#,
        escape_xml(family),
        color_to_hexstr(color),
        escape_xml(text),
    );

    let mut opts = usvg::Options::default();
    opts.fontdb_mut().load_system_fonts();
    let tree = usvg::Tree::from_str(&svg, &opts)
        .map_err(|e| ArtwallError::resource(format!("text svg parse failed: {e}")))?;

    let bbox = tree.root().abs_bounding_box();
    if bbox.width() <= 0.0 || bbox.height() <= 0.0 {
        // No glyphs resolved (unknown font family, whitespace-only text).
        return Ok(RgbaImage::new(0, 0));
    }

    let mut pixmap = resvg::tiny_skia::Pixmap::new(est_w, est_h)
        .ok_or_else(|| ArtwallError::resource("text staging canvas allocation failed"))?;
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::identity(),
        &mut pixmap.as_mut(),
    );

    let left = (bbox.x().floor().max(0.0)) as u32;
    let top = (bbox.y().floor().max(0.0)) as u32;
    let right = (bbox.x() + bbox.width()).ceil().min(est_w as f32) as u32;
    let bottom = (bbox.y() + bbox.height()).ceil().min(est_h as f32) as u32;
    if right <= left || bottom <= top {
        return Ok(RgbaImage::new(0, 0));
    }

    let mut out = RgbaImage::new(right - left, bottom - top);
    let pixels = pixmap.pixels();
    for (x, y, px) in out.enumerate_pixels_mut() {
        let src = pixels[((top + y) * est_w + left + x) as usize].demultiply();
        px.0 = [src.red(), src.green(), src.blue(), src.alpha()];
    }
    Ok(out)
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn text_argument_is_required() {
        let err = img_print(RgbaImage::new(4, 4), &ProcessorArgs::empty()).unwrap_err();
        assert!(err.to_string().contains("'text'"));
    }

    #[test]
    fn empty_text_leaves_the_image_unchanged() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255]));
        let out = img_print(img.clone(), &ProcessorArgs::from_pairs(&[("text", "")])).unwrap();
        assert_eq!(out.as_raw(), img.as_raw());
    }

    #[test]
    fn explicit_color_must_be_valid_hex() {
        let err = img_print(
            RgbaImage::new(4, 4),
            &ProcessorArgs::from_pairs(&[("text", "hi"), ("color", "#zzz")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("argument error"));
    }

    #[test]
    fn xml_metacharacters_are_escaped() {
        assert_eq!(escape_xml("a<b&c>\"d'"), "a&lt;b&amp;c&gt;&quot;d&apos;");
        assert_eq!(escape_xml("plain"), "plain");
    }
}
