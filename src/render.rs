//! Gradient frame renderer
//!
//! Blue ramps with the horizontal position, green with the vertical one, red
//! stays at zero and every pixel is opaque. Both ramps repeat with a period of
//! one buffer extent.

use crate::buffer::{BufferLayout, BYTES_PER_PIXEL};

const B: usize = 0;
const G: usize = 1;
const R: usize = 2;
const A: usize = 3;

/// `lerp(0, 255, frac(pos / extent))`, computed exactly in integers.
pub fn ramp(pos: u64, extent: u64) -> u8 {
    if extent == 0 {
        return 0;
    }
    ((pos % extent) * 255 / extent) as u8
}

/// Fill `pixels` with the gradient for `layout`.
///
/// `pixels` must hold at least `layout.size()` bytes; anything past that is
/// left alone.
pub fn draw_gradient(pixels: &mut [u8], layout: &BufferLayout) {
    let width = layout.width as u64;
    let height = layout.height as u64;
    let row_bytes = layout.width as usize * BYTES_PER_PIXEL as usize;

    for (y, row) in pixels
        .chunks_exact_mut(layout.stride as usize)
        .take(layout.height as usize)
        .enumerate()
    {
        let green = ramp(y as u64, height);
        for (x, px) in row[..row_bytes]
            .chunks_exact_mut(BYTES_PER_PIXEL as usize)
            .enumerate()
        {
            px[B] = ramp(x as u64, width);
            px[G] = green;
            px[R] = 0;
            px[A] = 0xFF;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn render(width: u32, height: u32) -> (BufferLayout, Vec<u8>) {
        let layout = BufferLayout::new(width, height).unwrap();
        let mut pixels = vec![0u8; layout.size()];
        draw_gradient(&mut pixels, &layout);
        (layout, pixels)
    }

    #[test]
    fn test_ramp_endpoints() {
        assert_eq!(ramp(0, 100), 0);
        assert_eq!(ramp(50, 100), 127);
        assert_eq!(ramp(99, 100), 252);
        assert_eq!(ramp(100, 100), 0);
        assert_eq!(ramp(7, 0), 0);
    }

    #[test]
    fn test_corner_pixels() {
        let (layout, pixels) = render(256, 256);

        let origin = layout.offset(0, 0);
        assert_eq!(&pixels[origin..origin + 4], &[0, 0, 0, 255]);

        let last = layout.offset(255, 255);
        assert_eq!(&pixels[last..last + 4], &[254, 254, 0, 255]);
    }

    #[test]
    fn test_single_pixel_buffer() {
        let (_, pixels) = render(1, 1);
        assert_eq!(pixels, vec![0, 0, 0, 255]);
    }

    #[test]
    fn test_leaves_bytes_past_layout_untouched() {
        let layout = BufferLayout::new(2, 2).unwrap();
        let mut pixels = vec![0x11u8; layout.size() + 8];
        draw_gradient(&mut pixels, &layout);
        assert!(pixels[layout.size()..].iter().all(|&b| b == 0x11));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_every_pixel_is_opaque_with_no_red(width in 1u32..200, height in 1u32..200) {
            let (layout, pixels) = render(width, height);
            for y in 0..height {
                for x in 0..width {
                    let o = layout.offset(x, y);
                    prop_assert_eq!(pixels[o + A], 255);
                    prop_assert_eq!(pixels[o + R], 0);
                }
            }
        }

        #[test]
        fn prop_ramp_is_periodic(pos in 0u64..1_000_000, extent in 1u64..100_000) {
            prop_assert_eq!(ramp(pos, extent), ramp(pos + extent, extent));
        }

        #[test]
        fn prop_channels_follow_position(width in 1u32..120, height in 1u32..120) {
            let (layout, pixels) = render(width, height);
            for y in 0..height {
                for x in 0..width {
                    let o = layout.offset(x, y);
                    prop_assert_eq!(pixels[o + B], ramp(x as u64, width as u64));
                    prop_assert_eq!(pixels[o + G], ramp(y as u64, height as u64));
                }
            }
        }

        #[test]
        fn prop_redraw_is_identical(width in 1u32..150, height in 1u32..150) {
            let layout = BufferLayout::new(width, height).unwrap();
            let mut pixels = vec![0u8; layout.size()];
            draw_gradient(&mut pixels, &layout);
            let first = pixels.clone();
            draw_gradient(&mut pixels, &layout);
            prop_assert_eq!(first, pixels);
        }
    }
}
