use std::time::Duration;

use anyhow::Context as _;
use image::RgbaImage;

use crate::error::{ArtwallError, ArtwallResult};

/// Bound on the whole cover-art request. A hung CDN must not stall the
/// event loop forever.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetch cover art from an MPRIS `artUrl` and decode it to RGBA.
///
/// Supports `http(s)://`, `file://` (with percent-encoding) and bare paths.
/// Any failure aborts the caller's cycle; the previous wallpaper stays.
pub fn fetch_art(url: &str) -> ArtwallResult<RgbaImage> {
    let bytes = fetch_bytes(url)?;
    let img = image::load_from_memory(&bytes)
        .map_err(|e| ArtwallError::resource(format!("decode cover art from '{url}': {e}")))?;
    Ok(img.to_rgba8())
}

fn fetch_bytes(url: &str) -> ArtwallResult<Vec<u8>> {
    if let Some(rest) = url.strip_prefix("file://") {
        let path = percent_decode(rest);
        return Ok(std::fs::read(&path).with_context(|| format!("read cover art '{path}'"))?);
    }

    if url.starts_with("http://") || url.starts_with("https://") {
        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .context("build http client")?;
        let response = client
            .get(url)
            .send()
            .map_err(|e| ArtwallError::resource(format!("request '{url}' failed: {e}")))?;
        if !response.status().is_success() {
            return Err(ArtwallError::resource(format!(
                "cover art request '{url}' returned status {}",
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .map_err(|e| ArtwallError::resource(format!("read response body of '{url}': {e}")))?;
        return Ok(bytes.to_vec());
    }

    Ok(std::fs::read(url).with_context(|| format!("read cover art '{url}'"))?)
}

/// Minimal `%XX` decoding for file URLs; invalid escapes pass through.
fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 3 <= bytes.len() {
            let hi = (bytes[i + 1] as char).to_digit(16);
            let lo = (bytes[i + 2] as char).to_digit(16);
            if let (Some(hi), Some(lo)) = (hi, lo) {
                out.push((hi * 16 + lo) as u8);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::io::Write as _;

    #[test]
    fn percent_decoding_handles_escapes_and_passthrough() {
        assert_eq!(percent_decode("/a%20b/c"), "/a b/c");
        assert_eq!(percent_decode("/plain/path"), "/plain/path");
        assert_eq!(percent_decode("/bad%zzescape"), "/bad%zzescape");
        assert_eq!(percent_decode("trailing%2"), "trailing%2");
    }

    #[test]
    fn file_url_roundtrips_through_decode() {
        let img = RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255]));
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        file.write_all(&buf).unwrap();

        let url = format!("file://{}", file.path().display());
        let fetched = fetch_art(&url).unwrap();
        assert_eq!(fetched.dimensions(), (3, 2));
        assert_eq!(fetched.get_pixel(0, 0).0, [1, 2, 3, 255]);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(fetch_art("file:///no/such/artwall/file.png").is_err());
        assert!(fetch_art("/no/such/artwall/file.png").is_err());
    }

    #[test]
    fn undecodable_bytes_are_a_resource_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not an image").unwrap();
        let err = fetch_art(&format!("file://{}", file.path().display())).unwrap_err();
        assert!(err.to_string().contains("decode cover art"));
    }
}
