// src/images/crop.rs
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

/// Crops an image to exactly `width × height`.
pub trait Cropper: Send + Sync {
    fn crop(&self, img: &DynamicImage, width: u32, height: u32) -> DynamicImage;
}

/// Scale to cover, keep the middle.
#[derive(Debug, Default, Clone, Copy)]
pub struct CenterCropper;

impl Cropper for CenterCropper {
    fn crop(&self, img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        if img.width() == 0 || img.height() == 0 {
            return DynamicImage::new_rgba8(width, height);
        }
        img.resize_to_fill(width.max(1), height.max(1), FilterType::Lanczos3)
    }
}

/// Scale to cover, then slide the window along the overflowing axis and keep
/// the position with the most luminance-gradient energy.
#[derive(Debug, Default, Clone, Copy)]
pub struct SalienceCropper;

impl Cropper for SalienceCropper {
    fn crop(&self, img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        let (width, height) = (width.max(1), height.max(1));
        if img.width() == 0 || img.height() == 0 {
            return DynamicImage::new_rgba8(width, height);
        }
        let scaled = cover(img, width, height);
        let (sw, sh) = scaled.dimensions();
        if sw == width && sh == height {
            return scaled;
        }

        let luma = scaled.to_luma8();
        let horizontal = sw > width;
        let axis_len = if horizontal { sw } else { sh };
        let mut profile = vec![0u64; axis_len as usize];
        for y in 0..sh {
            for x in 0..sw {
                let here = i32::from(luma.get_pixel(x, y)[0]);
                let mut e = 0u64;
                if x + 1 < sw {
                    e += (i32::from(luma.get_pixel(x + 1, y)[0]) - here).unsigned_abs() as u64;
                }
                if y + 1 < sh {
                    e += (i32::from(luma.get_pixel(x, y + 1)[0]) - here).unsigned_abs() as u64;
                }
                let slot = if horizontal { x } else { y };
                profile[slot as usize] += e;
            }
        }

        if horizontal {
            let x = best_window(&profile, width as usize) as u32;
            scaled.crop_imm(x, 0, width, height)
        } else {
            let y = best_window(&profile, height as usize) as u32;
            scaled.crop_imm(0, y, width, height)
        }
    }
}

/// Resize preserving aspect ratio so both sides are at least the target.
fn cover(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let (iw, ih) = img.dimensions();
    let scale = f64::max(
        f64::from(width) / f64::from(iw),
        f64::from(height) / f64::from(ih),
    );
    let nw = ((f64::from(iw) * scale).round() as u32).max(width);
    let nh = ((f64::from(ih) * scale).round() as u32).max(height);
    if (nw, nh) == (iw, ih) {
        return img.clone();
    }
    img.resize_exact(nw, nh, FilterType::Lanczos3)
}

/// Start offset of the `window`-long run with the largest sum. Ties go to
/// the offset closest to the centre.
pub fn best_window(profile: &[u64], window: usize) -> usize {
    if window >= profile.len() {
        return 0;
    }
    let last = profile.len() - window;
    let centre = last / 2;
    let mut sum: u64 = profile[..window].iter().sum();
    let (mut best, mut best_sum) = (0usize, sum);
    for start in 1..=last {
        sum = sum + profile[start + window - 1] - profile[start - 1];
        let closer = start.abs_diff(centre) < best.abs_diff(centre);
        if sum > best_sum || (sum == best_sum && closer) {
            best = start;
            best_sum = sum;
        }
    }
    best
}
