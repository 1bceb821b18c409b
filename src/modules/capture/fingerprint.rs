use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use image::DynamicImage;
use std::path::Path;

const HASH_WIDTH: u32 = 9;
const HASH_HEIGHT: u32 = 8;

/// 64-bit perceptual hash of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    /// Hamming distance; 0 means structurally identical.
    pub fn distance(&self, other: &Fingerprint) -> u32 {
        (self.0 ^ other.0).count_ones()
    }
}

pub trait Fingerprinter: Send + Sync {
    fn fingerprint(&self, path: &Path) -> Result<Fingerprint>;
}

/// Difference hash: shrink to 9x8 grayscale, one bit per horizontal
/// neighbour comparison. Survives re-encoding noise, not layout changes.
#[derive(Debug, Default, Clone, Copy)]
pub struct DHash;

impl DHash {
    pub fn of_image(img: &DynamicImage) -> Fingerprint {
        let thumb = imageops::resize(&img.to_luma8(), HASH_WIDTH, HASH_HEIGHT, FilterType::Triangle);

        let mut bits = 0u64;
        for y in 0..HASH_HEIGHT {
            for x in 0..HASH_WIDTH - 1 {
                let left = thumb.get_pixel(x, y)[0];
                let right = thumb.get_pixel(x + 1, y)[0];
                bits = (bits << 1) | u64::from(left < right);
            }
        }
        Fingerprint(bits)
    }
}

impl Fingerprinter for DHash {
    fn fingerprint(&self, path: &Path) -> Result<Fingerprint> {
        let img = image::open(path).with_context(|| format!("Unable to decode {}", path.display()))?;
        Ok(Self::of_image(&img))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_support::temp_dir;
    use image::{GrayImage, Luma};

    fn gradient(invert: bool) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(64, 48, |x, _| {
            let v = (x * 4) as u8;
            Luma([if invert { 255 - v } else { v }])
        }))
    }

    #[test]
    fn distance_is_hamming() {
        assert_eq!(Fingerprint(0).distance(&Fingerprint(0)), 0);
        assert_eq!(Fingerprint(0b1011).distance(&Fingerprint(0b0001)), 2);
        assert_eq!(Fingerprint(0).distance(&Fingerprint(u64::MAX)), 64);
    }

    #[test]
    fn encoding_noise_barely_moves_the_hash() {
        let clean = DHash::of_image(&gradient(false));
        let noisy = DynamicImage::ImageLuma8(GrayImage::from_fn(64, 48, |x, y| {
            let v = (x * 4) as u8;
            let jitter = ((x * 7 + y * 13) % 3) as u8;
            Luma([v.saturating_add(jitter)])
        }));

        assert!(clean.distance(&DHash::of_image(&noisy)) <= 5);
    }

    #[test]
    fn different_structure_is_far_apart() {
        let a = DHash::of_image(&gradient(false));
        let b = DHash::of_image(&gradient(true));
        assert!(a.distance(&b) > 5);
    }

    #[test]
    fn fingerprints_files_on_disk() {
        let dir = temp_dir("dhash");
        let path = dir.join("frame.png");
        gradient(false).save(&path).unwrap();

        let from_disk = DHash.fingerprint(&path).unwrap();
        assert_eq!(from_disk, DHash::of_image(&gradient(false)));
        assert!(DHash.fingerprint(&dir.join("missing.png")).is_err());
    }
}
