use std::path::Path;

use image::RgbImage;
use tracing::info;

use crate::error::Result;

/// Mean colour of an empty-scene reference image.
pub fn background_color(image: &RgbImage) -> Option<[u8; 3]> {
    let n = u64::from(image.width()) * u64::from(image.height());
    if n == 0 {
        return None;
    }
    let mut acc = [0u64; 3];
    for p in image.pixels() {
        for c in 0..3 {
            acc[c] += u64::from(p.0[c]);
        }
    }
    Some(acc.map(|v| (v / n) as u8))
}

/// Load a reference image and learn its background colour.
pub fn learn_background_color(path: impl AsRef<Path>) -> Result<Option<[u8; 3]>> {
    let image = image::open(path.as_ref())?.to_rgb8();
    let color = background_color(&image);
    info!(path = %path.as_ref().display(), ?color, "background colour learned");
    Ok(color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_mean_colour() {
        let img = RgbImage::from_fn(4, 2, |x, _| {
            if x < 2 { Rgb([100, 0, 50]) } else { Rgb([200, 10, 51]) }
        });
        assert_eq!(background_color(&img), Some([150, 5, 50]));
    }

    #[test]
    fn test_empty_image() {
        assert_eq!(background_color(&RgbImage::new(0, 0)), None);
    }

    #[test]
    fn test_missing_file() {
        assert!(learn_background_color("/nonexistent/background.png").is_err());
    }
}
