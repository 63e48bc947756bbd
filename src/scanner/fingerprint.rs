use anyhow::{anyhow, Result};
use image::{DynamicImage, RgbaImage};
use image_hasher::{HashAlg, HasherConfig, ImageHash};

/// Frames within this distance of the last reported frame are treated as the
/// same static code still held in front of the camera.
pub(crate) const FRAME_CHANGE_THRESHOLD: u32 = 8;

pub(crate) fn frame_fingerprint(pixels: &[u8], width: u32, height: u32) -> Result<String> {
    let buffer = RgbaImage::from_raw(width, height, pixels.to_vec())
        .ok_or_else(|| anyhow!("pixel buffer does not match {width}x{height} RGBA frame"))?;
    let image = DynamicImage::ImageRgba8(buffer);
    let hasher = HasherConfig::new()
        .hash_alg(HashAlg::DoubleGradient)
        .hash_size(8, 8)
        .to_hasher();

    Ok(hasher.hash_image(&image).to_base64())
}

pub(crate) fn hamming_distance(lhs: &str, rhs: &str) -> u32 {
    let Ok(h1) = ImageHash::<Vec<u8>>::from_base64(lhs) else {
        return u32::MAX;
    };
    let Ok(h2) = ImageHash::<Vec<u8>>::from_base64(rhs) else {
        return u32::MAX;
    };
    h1.dist(&h2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_frame(width: u32, height: u32, reversed: bool) -> Vec<u8> {
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..height {
            for x in 0..width {
                let step = if reversed { width - 1 - x } else { x };
                let level = (step * 255 / width.max(1)) as u8;
                pixels.extend_from_slice(&[level, level, level, 255]);
            }
        }
        pixels
    }

    #[test]
    fn identical_frames_have_zero_distance() {
        let frame = ramp_frame(32, 32, false);
        let a = frame_fingerprint(&frame, 32, 32).unwrap();
        let b = frame_fingerprint(&frame, 32, 32).unwrap();
        assert_eq!(hamming_distance(&a, &b), 0);
    }

    #[test]
    fn different_frames_differ() {
        let a = frame_fingerprint(&ramp_frame(32, 32, false), 32, 32).unwrap();
        let b = frame_fingerprint(&ramp_frame(32, 32, true), 32, 32).unwrap();
        assert!(hamming_distance(&a, &b) > 0);
    }

    #[test]
    fn mismatched_buffer_is_an_error() {
        assert!(frame_fingerprint(&[0u8; 8], 32, 32).is_err());
    }

    #[test]
    fn malformed_hash_maxes_distance() {
        assert_eq!(hamming_distance("not-base64!", "also bad"), u32::MAX);
    }
}
