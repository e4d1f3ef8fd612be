use image::RgbaImage;
use image::imageops::{self, FilterType};

use crate::error::{ArtwallError, ArtwallResult};

pub type Rgb = (u8, u8, u8);

/// Analysis runs on a thumbnail no larger than this on either axis.
const ANALYSIS_MAX_DIM: u32 = 100;

/// Maximum refinement rounds for k-means clustering.
const KMEANS_MAX_ROUNDS: usize = 10;

/// The most common color of an image, via a 16-entry adaptive palette.
pub fn most_frequent_color(image: &RgbaImage) -> Rgb {
    most_frequent_color_n(image, 16)
}

/// The most common color after median-cut quantization to `palette_size`
/// entries. Smaller palettes merge close shades more aggressively.
pub fn most_frequent_color_n(image: &RgbaImage, palette_size: usize) -> Rgb {
    let pixels = analysis_pixels(image);
    if pixels.is_empty() {
        return (0, 0, 0);
    }

    let buckets = median_cut(pixels, palette_size.max(1));
    let densest = buckets
        .iter()
        .max_by_key(|b| b.len())
        .expect("median_cut returns at least one bucket");
    average_color(densest)
}

/// `k` accent colors as k-means centroids over the thumbnail's RGB pixels,
/// most populous cluster first. Initialization is deterministic (evenly
/// spaced samples), so repeated calls on the same image agree.
pub fn get_accent_colors(image: &RgbaImage, k: usize) -> Vec<Rgb> {
    let pixels = analysis_pixels(image);
    if pixels.is_empty() || k == 0 {
        return Vec::new();
    }

    let k = k.min(pixels.len());
    let mut centroids: Vec<[f64; 3]> = (0..k)
        .map(|i| {
            let px = pixels[i * pixels.len() / k];
            [f64::from(px[0]), f64::from(px[1]), f64::from(px[2])]
        })
        .collect();

    let mut assignment = vec![0usize; pixels.len()];
    for _ in 0..KMEANS_MAX_ROUNDS {
        let mut changed = false;
        for (pi, px) in pixels.iter().enumerate() {
            let nearest = nearest_centroid(px, &centroids);
            if assignment[pi] != nearest {
                assignment[pi] = nearest;
                changed = true;
            }
        }

        let mut sums = vec![[0.0f64; 3]; k];
        let mut counts = vec![0usize; k];
        for (pi, px) in pixels.iter().enumerate() {
            let c = assignment[pi];
            counts[c] += 1;
            for ch in 0..3 {
                sums[c][ch] += f64::from(px[ch]);
            }
        }
        for c in 0..k {
            if counts[c] > 0 {
                for ch in 0..3 {
                    centroids[c][ch] = sums[c][ch] / counts[c] as f64;
                }
            }
        }

        if !changed {
            break;
        }
    }

    let mut counts = vec![0usize; k];
    for &a in &assignment {
        counts[a] += 1;
    }
    let mut order: Vec<usize> = (0..k).collect();
    order.sort_by(|&a, &b| counts[b].cmp(&counts[a]));

    order
        .into_iter()
        .map(|c| {
            (
                centroids[c][0].round() as u8,
                centroids[c][1].round() as u8,
                centroids[c][2].round() as u8,
            )
        })
        .collect()
}

/// Contrast ratio on raw 0-255 channel luminance. This intentionally skips
/// sRGB gamma linearization; callers depend on these exact numbers.
pub fn contrast_ratio(c1: Rgb, c2: Rgb) -> f64 {
    let l1 = luminance(c1);
    let l2 = luminance(c2);
    (l1.max(l2) + 0.05) / (l1.min(l2) + 0.05)
}

fn luminance(c: Rgb) -> f64 {
    0.2126 * f64::from(c.0) + 0.7152 * f64::from(c.1) + 0.0722 * f64::from(c.2)
}

/// Pick a `(background, foreground)` accent pair.
///
/// The foreground is the dominant accent; the background is the first later
/// accent whose contrast ratio against the foreground reaches `min_ratio`.
/// If none qualifies, the background falls back to an inversion of the
/// foreground (blue taken from the green channel's inverse).
pub fn get_contrasting_accent_colors(image: &RgbaImage, min_ratio: f64, k: usize) -> (Rgb, Rgb) {
    let accents = get_accent_colors(image, k);
    let Some(&foreground) = accents.first() else {
        return ((255, 255, 255), (0, 0, 0));
    };

    let background = accents[1..]
        .iter()
        .copied()
        .find(|&c| contrast_ratio(foreground, c) >= min_ratio)
        .unwrap_or((
            255 - foreground.0,
            255 - foreground.1,
            255 - foreground.1,
        ));

    (background, foreground)
}

pub fn invert_color(c: Rgb) -> Rgb {
    (255 - c.0, 255 - c.1, 255 - c.2)
}

pub fn color_to_hexstr(c: Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", c.0, c.1, c.2)
}

/// Parse `#rrggbb` (leading `#` optional). Anything but exactly six hex
/// digits is an argument error.
pub fn colorstr_to_tuple(s: &str) -> ArtwallResult<Rgb> {
    let body = s.strip_prefix('#').unwrap_or(s);
    if body.len() != 6 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ArtwallError::argument(format!(
            "invalid color '{s}': expected 6 hex digits"
        )));
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&body[range], 16).expect("validated hex digits")
    };
    Ok((channel(0..2), channel(2..4), channel(4..6)))
}

/// Thumbnail the image to the analysis size and strip alpha.
fn analysis_pixels(image: &RgbaImage) -> Vec<[u8; 3]> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Vec::new();
    }

    let small = if w > ANALYSIS_MAX_DIM || h > ANALYSIS_MAX_DIM {
        let scale = f64::from(ANALYSIS_MAX_DIM) / f64::from(w.max(h));
        let nw = ((f64::from(w) * scale).round() as u32).max(1);
        let nh = ((f64::from(h) * scale).round() as u32).max(1);
        imageops::resize(image, nw, nh, FilterType::Triangle)
    } else {
        image.clone()
    };

    small.pixels().map(|p| [p.0[0], p.0[1], p.0[2]]).collect()
}

fn nearest_centroid(px: &[u8; 3], centroids: &[[f64; 3]]) -> usize {
    let mut best = 0usize;
    let mut best_dist = f64::INFINITY;
    for (ci, c) in centroids.iter().enumerate() {
        let mut dist = 0.0;
        for ch in 0..3 {
            let d = f64::from(px[ch]) - c[ch];
            dist += d * d;
        }
        if dist < best_dist {
            best_dist = dist;
            best = ci;
        }
    }
    best
}

/// Classic median-cut: repeatedly split the bucket with the widest channel
/// range at its median until `palette_size` buckets exist.
fn median_cut(pixels: Vec<[u8; 3]>, palette_size: usize) -> Vec<Vec<[u8; 3]>> {
    let mut buckets = vec![pixels];

    while buckets.len() < palette_size {
        let Some((bi, channel)) = widest_bucket(&buckets) else {
            break;
        };
        let mut bucket = buckets.swap_remove(bi);
        bucket.sort_by_key(|px| px[channel]);
        let right = bucket.split_off(bucket.len() / 2);
        buckets.push(bucket);
        buckets.push(right);
    }

    buckets
}

/// Index and channel of the splittable bucket with the widest channel range.
fn widest_bucket(buckets: &[Vec<[u8; 3]>]) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize, u8)> = None;
    for (bi, bucket) in buckets.iter().enumerate() {
        if bucket.len() < 2 {
            continue;
        }
        for channel in 0..3 {
            let lo = bucket.iter().map(|px| px[channel]).min().unwrap_or(0);
            let hi = bucket.iter().map(|px| px[channel]).max().unwrap_or(0);
            let range = hi - lo;
            if range > 0 && best.is_none_or(|(_, _, r)| range > r) {
                best = Some((bi, channel, range));
            }
        }
    }
    best.map(|(bi, channel, _)| (bi, channel))
}

fn average_color(pixels: &[[u8; 3]]) -> Rgb {
    if pixels.is_empty() {
        return (0, 0, 0);
    }
    let mut sums = [0u64; 3];
    for px in pixels {
        for ch in 0..3 {
            sums[ch] += u64::from(px[ch]);
        }
    }
    let n = pixels.len() as u64;
    (
        ((sums[0] + n / 2) / n) as u8,
        ((sums[1] + n / 2) / n) as u8,
        ((sums[2] + n / 2) / n) as u8,
    )
}
