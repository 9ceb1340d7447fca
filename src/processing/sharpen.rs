use image::RgbaImage;

/// Unsharp-mask style kernel; weights sum to 1 so flat regions are unchanged.
pub const SHARPEN_KERNEL: [[f32; 3]; 3] = [
    [0.0, -0.2, 0.0],
    [-0.2, 1.8, -0.2],
    [0.0, -0.2, 0.0],
];

/// Crisps character edges left jagged by binarization.
pub struct SharpeningFilter {
    kernel: [[f32; 3]; 3],
}

impl Default for SharpeningFilter {
    fn default() -> Self {
        SharpeningFilter {
            kernel: SHARPEN_KERNEL,
        }
    }
}

impl SharpeningFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kernel(kernel: [[f32; 3]; 3]) -> Self {
        SharpeningFilter { kernel }
    }

    /// Convolve R, G and B independently.
    ///
    /// Alpha and the one-pixel border are copied from the input.
    pub fn apply(&self, img: &RgbaImage) -> RgbaImage {
        let (width, height) = img.dimensions();
        let mut output = img.clone();
        if width < 3 || height < 3 {
            return output;
        }

        for y in 1..height - 1 {
            for x in 1..width - 1 {
                let mut sums = [0.0f32; 3];
                for (ky, row) in self.kernel.iter().enumerate() {
                    for (kx, &weight) in row.iter().enumerate() {
                        if weight == 0.0 {
                            continue;
                        }
                        let neighbour = img.get_pixel(x + kx as u32 - 1, y + ky as u32 - 1);
                        for (channel, sum) in sums.iter_mut().enumerate() {
                            *sum += neighbour[channel] as f32 * weight;
                        }
                    }
                }

                let pixel = output.get_pixel_mut(x, y);
                for (channel, sum) in sums.iter().enumerate() {
                    pixel[channel] = sum.round().clamp(0.0, 255.0) as u8;
                }
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_flat_image_is_unchanged() {
        let img = RgbaImage::from_pixel(5, 5, Rgba([90, 90, 90, 255]));
        assert_eq!(SharpeningFilter::new().apply(&img), img);
    }

    #[test]
    fn test_dimensions_are_preserved() {
        let img = RgbaImage::from_pixel(17, 9, Rgba([255, 255, 255, 255]));
        assert_eq!(SharpeningFilter::new().apply(&img).dimensions(), (17, 9));
    }

    #[test]
    fn test_isolated_dark_pixel_is_emphasized() {
        let mut img = RgbaImage::from_pixel(3, 3, Rgba([200, 200, 200, 255]));
        img.put_pixel(1, 1, Rgba([100, 100, 100, 255]));
        let out = SharpeningFilter::new().apply(&img);
        // 1.8 * 100 - 0.8 * 200 = 20
        assert_eq!(out.get_pixel(1, 1), &Rgba([20, 20, 20, 255]));
    }

    #[test]
    fn test_output_is_clamped() {
        let mut img = RgbaImage::from_pixel(3, 3, Rgba([0, 0, 0, 255]));
        img.put_pixel(1, 1, Rgba([255, 255, 255, 255]));
        let out = SharpeningFilter::new().apply(&img);
        assert_eq!(out.get_pixel(1, 1), &Rgba([255, 255, 255, 255]));

        let mut img = RgbaImage::from_pixel(3, 3, Rgba([255, 255, 255, 255]));
        img.put_pixel(1, 1, Rgba([0, 0, 0, 255]));
        let out = SharpeningFilter::new().apply(&img);
        assert_eq!(out.get_pixel(1, 1), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_border_and_alpha_are_copied() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 77]));
        img.put_pixel(0, 0, Rgba([0, 0, 0, 10]));
        img.put_pixel(1, 1, Rgba([0, 0, 0, 33]));
        let out = SharpeningFilter::new().apply(&img);
        assert_eq!(out.get_pixel(0, 0), &Rgba([0, 0, 0, 10]));
        for x in 0..4 {
            assert_eq!(out.get_pixel(x, 3), img.get_pixel(x, 3));
        }
        assert_eq!(out.get_pixel(1, 1)[3], 33);
        assert_eq!(out.get_pixel(2, 2)[3], 77);
    }

    #[test]
    fn test_tiny_images_pass_through() {
        let img = RgbaImage::from_pixel(2, 8, Rgba([10, 20, 30, 255]));
        assert_eq!(SharpeningFilter::new().apply(&img), img);
    }

    #[test]
    fn test_custom_kernel_is_used() {
        let identity = [[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]];
        let mut img = RgbaImage::from_pixel(3, 3, Rgba([200, 200, 200, 255]));
        img.put_pixel(1, 1, Rgba([100, 100, 100, 255]));
        assert_eq!(SharpeningFilter::with_kernel(identity).apply(&img), img);
    }
}
