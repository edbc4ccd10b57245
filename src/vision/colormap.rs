/// Jet colour ramp
///
/// Maps 0 to dark blue, through cyan, yellow and red, to dark red at 255.

use image::{GrayImage, Rgb, RgbImage};

/// Colour of a single intensity on the jet ramp
pub fn jet(value: u8) -> Rgb<u8> {
    let v = value as f32 / 255.0;
    Rgb([ramp(v, 3.0), ramp(v, 2.0), ramp(v, 1.0)])
}

/// Each channel is a clipped triangle centred at `center / 4`
fn ramp(v: f32, center: f32) -> u8 {
    let level = (1.5 - (4.0 * v - center).abs()).clamp(0.0, 1.0);
    (level * 255.0).round() as u8
}

/// Render a single-channel map through the jet ramp
pub fn apply_jet(map: &GrayImage) -> RgbImage {
    let lut: Vec<Rgb<u8>> = (0..=255u8).map(jet).collect();
    RgbImage::from_fn(map.width(), map.height(), |x, y| {
        lut[map.get_pixel(x, y)[0] as usize]
    })
}
