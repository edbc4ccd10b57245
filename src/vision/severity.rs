/// Geometric crack severity estimation
///
/// Independent of the learned classifier, this runs a deterministic
/// edge/contour pipeline over the photo:
///
/// 1. Luminance conversion (BT.601 weights)
/// 2. 5x5 Gaussian blur (binomial kernel, the auto-sigma kernel for size 5)
/// 3. Canny edges on the blurred luma (3x3 Sobel, L1 magnitude), thresholds 50 / 150
/// 4. One 3x3 dilation to close small gaps
/// 5. External contours, thickness = min(width, height) of each bounding box
/// 6. Largest thickness is bucketed into a severity label
///
/// The dilated edge map is also rendered through the jet ramp and blended
/// over the source to build the overlay.

use image::{DynamicImage, GrayImage, Luma, RgbImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::distance_transform::Norm;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use imageproc::morphology::dilate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use super::colormap::apply_jet;
use super::preprocess::load_image;
use crate::error::Result;

/// Canny hysteresis thresholds
const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 150.0;

/// Blend weights for flagged pixels
const SOURCE_WEIGHT: f32 = 0.2;
const HEATMAP_WEIGHT: f32 = 0.8;

/// tan(22.5°) in Q15, for gradient direction binning
const TAN_22_5_Q15: i64 = 13573;

/// Normalized 5-tap Gaussian, scaled by 16
const BLUR_KERNEL: [u32; 5] = [1, 4, 6, 4, 1];

/// Text shown when no severity could be measured
pub const SEVERITY_NOT_AVAILABLE: &str = "N/A";

/// Severity bucket derived from the widest detected feature
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SeverityLabel {
    Micro,
    Hairline,
    Moderate,
    Severe,
}

impl SeverityLabel {
    /// Bucket a width in pixels. Thresholds are strict and checked in
    /// ascending order, so the last one exceeded wins; 0 has no label.
    pub fn from_width(width_px: u32) -> Option<Self> {
        let mut label = None;
        if width_px > 0 {
            label = Some(SeverityLabel::Micro);
        }
        if width_px > 10 {
            label = Some(SeverityLabel::Hairline);
        }
        if width_px > 30 {
            label = Some(SeverityLabel::Moderate);
        }
        if width_px > 80 {
            label = Some(SeverityLabel::Severe);
        }
        label
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityLabel::Micro => "Micro",
            SeverityLabel::Hairline => "Hairline",
            SeverityLabel::Moderate => "Moderate",
            SeverityLabel::Severe => "Severe",
        }
    }
}

impl fmt::Display for SeverityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of the geometric pipeline for one photo
#[derive(Debug, Clone, PartialEq)]
pub struct SeverityAnalysis {
    /// Largest bounding-box thickness among external contours
    pub max_feature_width_px: u32,
    pub label: Option<SeverityLabel>,
    /// Number of external contours found
    pub contour_count: usize,
    /// Source photo with edge pixels blended towards the jet heatmap
    pub overlay: RgbImage,
}

impl SeverityAnalysis {
    /// Display string, e.g. `"42px (Moderate)"`, or `"N/A"` when nothing was found
    pub fn description(&self) -> String {
        match self.label {
            Some(label) => format!("{}px ({})", self.max_feature_width_px, label),
            None => SEVERITY_NOT_AVAILABLE.to_string(),
        }
    }
}

/// Run the severity pipeline on a photo file
pub fn analyze_severity(path: &Path) -> Result<SeverityAnalysis> {
    let img = load_image(path)?;
    Ok(analyze_severity_image(&img))
}

/// Run the severity pipeline on a decoded photo
pub fn analyze_severity_image(img: &DynamicImage) -> SeverityAnalysis {
    let source = img.to_rgb8();

    let gray = luminance(&source);
    let blurred = gaussian_blur_5x5(&gray);
    let edges = canny_l1(&blurred, CANNY_LOW, CANNY_HIGH);
    let dilated = dilate(&edges, Norm::LInf, 1);

    let contours = external_contours(&dilated);
    let max_feature_width_px = contours
        .iter()
        .map(contour_thickness)
        .max()
        .unwrap_or(0);

    let overlay = blend_overlay(&source, &dilated);

    SeverityAnalysis {
        max_feature_width_px,
        label: SeverityLabel::from_width(max_feature_width_px),
        contour_count: contours.len(),
        overlay,
    }
}

/// BT.601 luminance with 14-bit fixed point rounding
fn luminance(rgb: &RgbImage) -> GrayImage {
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let p = rgb.get_pixel(x, y);
        let luma = (p[0] as u32 * 4899 + p[1] as u32 * 9617 + p[2] as u32 * 1868 + (1 << 13)) >> 14;
        Luma([luma.min(255) as u8])
    })
}

/// Separable 5x5 binomial blur with reflect-101 borders
fn gaussian_blur_5x5(gray: &GrayImage) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray.clone();
    }

    let w = width as usize;
    let h = height as usize;
    let src = gray.as_raw();

    // Horizontal pass keeps the x16 scale
    let mut horizontal = vec![0u32; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0u32;
            for (k, weight) in BLUR_KERNEL.iter().enumerate() {
                let sx = reflect_101(x as isize + k as isize - 2, w);
                acc += weight * src[y * w + sx] as u32;
            }
            horizontal[y * w + x] = acc;
        }
    }

    // Vertical pass brings the scale to x256
    let mut out = GrayImage::new(width, height);
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0u32;
            for (k, weight) in BLUR_KERNEL.iter().enumerate() {
                let sy = reflect_101(y as isize + k as isize - 2, h);
                acc += weight * horizontal[sy * w + x];
            }
            out.put_pixel(x as u32, y as u32, Luma([((acc + 128) >> 8).min(255) as u8]));
        }
    }

    out
}

/// Mirror an index into `0..len` without repeating the edge sample
fn reflect_101(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    let mut i = i;
    while i < 0 || i > last {
        if i < 0 {
            i = -i;
        }
        if i > last {
            i = 2 * last - i;
        }
    }
    i as usize
}

/// Canny without extra smoothing: 3x3 Sobel, L1 magnitude, non-maximum
/// suppression over four direction bins, then 8-connected hysteresis.
/// Magnitudes must be strictly above a threshold to count.
fn canny_l1(gray: &GrayImage, low: f32, high: f32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let mut edges = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return edges;
    }

    let w = width as usize;
    let h = height as usize;
    let dx: Vec<i32> = horizontal_sobel(gray).as_raw().iter().map(|&v| v as i32).collect();
    let dy: Vec<i32> = vertical_sobel(gray).as_raw().iter().map(|&v| v as i32).collect();
    let mag: Vec<i32> = dx.iter().zip(&dy).map(|(gx, gy)| gx.abs() + gy.abs()).collect();

    // Outside the image the magnitude is 0
    let mag_at = |x: isize, y: isize| -> i32 {
        if x < 0 || y < 0 || x >= w as isize || y >= h as isize {
            0
        } else {
            mag[y as usize * w + x as usize]
        }
    };

    let low = low.floor() as i32;
    let high = high.floor() as i32;

    // 0 = not an edge, 1 = weak candidate, 2 = edge
    let mut class = vec![0u8; w * h];
    let mut stack = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            let m = mag[i];
            if m <= low {
                continue;
            }

            let (xi, yi) = (x as isize, y as isize);
            let xs = dx[i].abs() as i64;
            let ys = (dy[i].abs() as i64) << 15;
            let tg22 = xs * TAN_22_5_Q15;

            let is_max = if ys < tg22 {
                m > mag_at(xi - 1, yi) && m >= mag_at(xi + 1, yi)
            } else if ys > tg22 + (xs << 16) {
                m > mag_at(xi, yi - 1) && m >= mag_at(xi, yi + 1)
            } else {
                let s = if (dx[i] ^ dy[i]) < 0 { -1 } else { 1 };
                m > mag_at(xi - s, yi - 1) && m > mag_at(xi + s, yi + 1)
            };
            if !is_max {
                continue;
            }

            if m > high {
                class[i] = 2;
                stack.push(i);
            } else {
                class[i] = 1;
            }
        }
    }

    while let Some(i) = stack.pop() {
        let (x, y) = ((i % w) as isize, (i / w) as isize);
        edges.put_pixel(x as u32, y as u32, Luma([255]));

        for ny in y - 1..=y + 1 {
            for nx in x - 1..=x + 1 {
                if nx < 0 || ny < 0 || nx >= w as isize || ny >= h as isize {
                    continue;
                }
                let j = ny as usize * w + nx as usize;
                if class[j] == 1 {
                    class[j] = 2;
                    stack.push(j);
                }
            }
        }
    }

    edges
}

/// Outer borders that are not nested inside another component
fn external_contours(binary: &GrayImage) -> Vec<Contour<u32>> {
    find_contours::<u32>(binary)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .collect()
}

/// min(width, height) of the contour's axis-aligned bounding box
fn contour_thickness(contour: &Contour<u32>) -> u32 {
    let mut points = contour.points.iter();
    let Some(first) = points.next() else {
        return 0;
    };

    let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
    for p in points {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }

    let width = max_x - min_x + 1;
    let height = max_y - min_y + 1;
    width.min(height)
}

/// Blend flagged pixels 0.2 source / 0.8 heatmap, leave the rest untouched
fn blend_overlay(source: &RgbImage, mask: &GrayImage) -> RgbImage {
    let heatmap = apply_jet(mask);
    let mut overlay = source.clone();

    for (x, y, pixel) in overlay.enumerate_pixels_mut() {
        if mask.get_pixel(x, y)[0] == 0 {
            continue;
        }
        let heat = heatmap.get_pixel(x, y);
        for c in 0..3 {
            let blended = pixel[c] as f32 * SOURCE_WEIGHT + heat[c] as f32 * HEATMAP_WEIGHT;
            pixel[c] = blended.round().clamp(0.0, 255.0) as u8;
        }
    }

    overlay
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn rectangle_image(x0: u32, y0: u32, w: u32, h: u32) -> DynamicImage {
        let mut img = RgbImage::from_pixel(224, 224, Rgb([0, 0, 0]));
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                img.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        DynamicImage::ImageRgb8(img)
    }

    fn disk_image(cx: i32, cy: i32, radius: i32) -> DynamicImage {
        let img = RgbImage::from_fn(224, 224, |x, y| {
            let dx = x as i32 - cx;
            let dy = y as i32 - cy;
            if dx * dx + dy * dy <= radius * radius {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_severity_thresholds() {
        assert_eq!(SeverityLabel::from_width(0), None);
        assert_eq!(SeverityLabel::from_width(1), Some(SeverityLabel::Micro));
        assert_eq!(SeverityLabel::from_width(5), Some(SeverityLabel::Micro));
        assert_eq!(SeverityLabel::from_width(10), Some(SeverityLabel::Micro));
        assert_eq!(SeverityLabel::from_width(11), Some(SeverityLabel::Hairline));
        assert_eq!(SeverityLabel::from_width(15), Some(SeverityLabel::Hairline));
        assert_eq!(SeverityLabel::from_width(30), Some(SeverityLabel::Hairline));
        assert_eq!(SeverityLabel::from_width(31), Some(SeverityLabel::Moderate));
        assert_eq!(SeverityLabel::from_width(50), Some(SeverityLabel::Moderate));
        assert_eq!(SeverityLabel::from_width(80), Some(SeverityLabel::Moderate));
        assert_eq!(SeverityLabel::from_width(81), Some(SeverityLabel::Severe));
        assert_eq!(SeverityLabel::from_width(100), Some(SeverityLabel::Severe));
    }

    #[test]
    fn test_severity_is_monotonic() {
        let mut previous = None;
        for width in 0..200 {
            let label = SeverityLabel::from_width(width);
            assert!(label >= previous, "label decreased at width {}", width);
            previous = label;
        }
    }

    #[test]
    fn test_solid_gray_has_no_features() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(224, 224, Rgb([128, 128, 128])));
        let analysis = analyze_severity_image(&img);

        assert_eq!(analysis.max_feature_width_px, 0);
        assert_eq!(analysis.label, None);
        assert_eq!(analysis.contour_count, 0);
        assert_eq!(analysis.description(), "N/A");
        assert_eq!(analysis.overlay, img.to_rgb8());
    }

    #[test]
    fn test_blob_is_measured_by_its_extent() {
        let analysis = analyze_severity_image(&disk_image(112, 112, 20));

        assert!(
            (38..=50).contains(&analysis.max_feature_width_px),
            "unexpected width {}",
            analysis.max_feature_width_px
        );
        assert_eq!(analysis.label, Some(SeverityLabel::Moderate));
        assert!(analysis.description().ends_with("px (Moderate)"));
    }

    #[test]
    fn test_thin_line_is_minor() {
        let analysis = analyze_severity_image(&rectangle_image(100, 30, 3, 160));

        assert!(analysis.max_feature_width_px > 0);
        assert!(analysis.max_feature_width_px < 30);
        assert!(matches!(
            analysis.label,
            Some(SeverityLabel::Micro) | Some(SeverityLabel::Hairline)
        ));
    }

    fn dark_line_image(x0: u32, line_width: u32, level: u8) -> DynamicImage {
        let img = RgbImage::from_fn(224, 224, |x, _| {
            if (x0..x0 + line_width).contains(&x) {
                Rgb([level, level, level])
            } else {
                Rgb([230, 230, 230])
            }
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_one_pixel_cracks_are_detected() {
        for (line_width, level) in [(1, 0), (1, 60), (2, 120), (3, 120)] {
            let analysis = analyze_severity_image(&dark_line_image(112, line_width, level));
            assert!(
                analysis.max_feature_width_px > 0,
                "{}px line at level {} was missed",
                line_width,
                level
            );
            assert!(analysis.max_feature_width_px <= 10);
            assert_eq!(analysis.label, Some(SeverityLabel::Micro));
        }
    }

    #[test]
    fn test_canny_marks_both_sides_of_a_line() {
        let gray = luminance(&dark_line_image(112, 1, 0).to_rgb8());
        let edges = canny_l1(&gaussian_blur_5x5(&gray), CANNY_LOW, CANNY_HIGH);

        assert_eq!(edges.get_pixel(111, 100)[0], 255);
        assert_eq!(edges.get_pixel(113, 100)[0], 255);
        assert_eq!(edges.get_pixel(112, 100)[0], 0);
        assert_eq!(edges.get_pixel(40, 100)[0], 0);
    }

    #[test]
    fn test_canny_ignores_weak_gradients() {
        // Step of 10 gives an L1 magnitude of at most 40, below the low threshold
        let gray = GrayImage::from_fn(64, 64, |x, _| Luma([if x < 32 { 100 } else { 110 }]));
        let edges = canny_l1(&gray, CANNY_LOW, CANNY_HIGH);
        assert!(edges.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_overlay_only_touches_edge_pixels() {
        let img = disk_image(112, 112, 20);
        let analysis = analyze_severity_image(&img);
        let source = img.to_rgb8();

        assert_eq!(analysis.overlay.dimensions(), source.dimensions());
        // Far from the disk nothing changes
        assert_eq!(analysis.overlay.get_pixel(5, 5), source.get_pixel(5, 5));
        assert_eq!(analysis.overlay.get_pixel(200, 200), source.get_pixel(200, 200));
        // Somewhere along the blob border the heatmap shows through
        assert_ne!(analysis.overlay, source);
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let img = rectangle_image(30, 30, 90, 120);
        let first = analyze_severity_image(&img);
        let second = analyze_severity_image(&img);
        assert_eq!(first, second);
    }

    #[test]
    fn test_undecodable_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.png");
        std::fs::write(&path, [0u8, 1, 2, 3]).unwrap();
        assert!(analyze_severity(&path).is_err());
    }

    #[test]
    fn test_blur_preserves_constant_image() {
        let gray = GrayImage::from_pixel(9, 4, Luma([200]));
        assert_eq!(gaussian_blur_5x5(&gray), gray);
    }

    #[test]
    fn test_reflect_101() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(-2, 5), 2);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(6, 5), 2);
        assert_eq!(reflect_101(-2, 2), 0);
        assert_eq!(reflect_101(3, 1), 0);
    }
}
