//! 32-bit bitmap view over a locked surface

/// Byte order of a 4-byte pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    /// R, G, B, A in memory (host order)
    Rgba,
    /// B, G, R, A in memory
    Bgra,
}

impl ChannelOrder {
    pub fn swapped(self) -> Self {
        match self {
            ChannelOrder::Rgba => ChannelOrder::Bgra,
            ChannelOrder::Bgra => ChannelOrder::Rgba,
        }
    }
}

/// Straight-alpha color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgba(0xFF, 0xFF, 0xFF, 0xFF);
    pub const GRAY: Color = Color::rgba(0x84, 0x84, 0x84, 0xFF);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }

    /// From `0xRRGGBBAA`
    pub const fn from_u32(value: u32) -> Self {
        Color {
            r: (value >> 24) as u8,
            g: (value >> 16) as u8,
            b: (value >> 8) as u8,
            a: value as u8,
        }
    }

    fn to_bytes(self, order: ChannelOrder) -> [u8; 4] {
        match order {
            ChannelOrder::Rgba => [self.r, self.g, self.b, self.a],
            ChannelOrder::Bgra => [self.b, self.g, self.r, self.a],
        }
    }

    fn from_bytes(bytes: &[u8], order: ChannelOrder) -> Self {
        match order {
            ChannelOrder::Rgba => Color::rgba(bytes[0], bytes[1], bytes[2], bytes[3]),
            ChannelOrder::Bgra => Color::rgba(bytes[2], bytes[1], bytes[0], bytes[3]),
        }
    }

    /// Pack to 5-6-5 (alpha dropped)
    pub fn to_rgb565(self) -> u16 {
        ((self.r as u16 >> 3) << 11) | ((self.g as u16 >> 2) << 5) | (self.b as u16 >> 3)
    }
}

/// Mutable 4-byte-per-pixel view with an explicit stride
pub struct Bitmap<'a> {
    data: &'a mut [u8],
    width: u32,
    height: u32,
    stride: usize,
    order: ChannelOrder,
}

impl<'a> Bitmap<'a> {
    /// `None` when `data` cannot hold `height` rows of `stride` bytes
    pub fn new(
        data: &'a mut [u8],
        width: u32,
        height: u32,
        stride: usize,
        order: ChannelOrder,
    ) -> Option<Self> {
        let row_bytes = width as usize * 4;
        if stride < row_bytes {
            return None;
        }
        let needed = match height {
            0 => 0,
            h => stride * (h as usize - 1) + row_bytes,
        };
        if data.len() < needed {
            return None;
        }
        Some(Self {
            data,
            width,
            height,
            stride,
            order,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    pub fn data(&self) -> &[u8] {
        &self.data[..]
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.stride + x as usize * 4
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let at = self.offset(x, y);
        Some(Color::from_bytes(&self.data[at..at + 4], self.order))
    }

    /// Overwrite a rectangle, clipped to the bitmap
    pub fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: Color) {
        let x0 = x.max(0) as i64;
        let y0 = y.max(0) as i64;
        let x1 = (x as i64 + width as i64).min(self.width as i64);
        let y1 = (y as i64 + height as i64).min(self.height as i64);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let bytes = color.to_bytes(self.order);
        for row in y0..y1 {
            let start = self.offset(x0 as u32, row as u32);
            let end = self.offset(x1 as u32, row as u32);
            for px in self.data[start..end].chunks_exact_mut(4) {
                px.copy_from_slice(&bytes);
            }
        }
    }

    pub fn fill(&mut self, color: Color) {
        self.fill_rect(0, 0, self.width as i32, self.height as i32, color);
    }

    /// Exchange the first and third byte of every pixel
    pub fn swap_red_blue(&mut self) {
        let row_bytes = self.width as usize * 4;
        for row in 0..self.height as usize {
            let start = row * self.stride;
            for px in self.data[start..start + row_bytes].chunks_exact_mut(4) {
                px.swap(0, 2);
            }
        }
        self.order = self.order.swapped();
    }

    /// Blend a premultiplied RGBA image over the bitmap with its top-left
    /// corner at (`x`, `y`), clipped to the bitmap
    pub fn composite_premultiplied(
        &mut self,
        src: &[u8],
        src_width: u32,
        src_height: u32,
        src_stride: usize,
        x: i32,
        y: i32,
    ) {
        let x0 = x.max(0) as i64;
        let y0 = y.max(0) as i64;
        let x1 = (x as i64 + src_width as i64).min(self.width as i64);
        let y1 = (y as i64 + src_height as i64).min(self.height as i64);
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        let order = self.order;
        let span = (x1 - x0) as usize * 4;

        for row in y0..y1 {
            let src_start = (row - y as i64) as usize * src_stride + (x0 - x as i64) as usize * 4;
            let Some(src_row) = src.get(src_start..src_start + span) else {
                return;
            };
            let dst_start = self.offset(x0 as u32, row as u32);
            let dst_row = &mut self.data[dst_start..dst_start + span];

            for (s, d) in src_row.chunks_exact(4).zip(dst_row.chunks_exact_mut(4)) {
                let alpha = s[3] as u32;
                if alpha == 0 {
                    continue;
                }
                let under = Color::from_bytes(d, order);
                let blend = |src: u8, dst: u8| -> u8 {
                    (src as u32 + (dst as u32 * (255 - alpha) + 127) / 255).min(255) as u8
                };
                let out = Color::rgba(
                    blend(s[0], under.r),
                    blend(s[1], under.g),
                    blend(s[2], under.b),
                    blend(s[3], under.a),
                );
                d.copy_from_slice(&out.to_bytes(order));
            }
        }
    }

    /// Write the bitmap as native-endian 5-6-5 pixels into `dst`
    pub fn pack_rgb565(&self, dst: &mut [u8], dst_stride: usize) {
        for y in 0..self.height {
            let row = y as usize * dst_stride;
            for x in 0..self.width {
                let at = self.offset(x, y);
                let color = Color::from_bytes(&self.data[at..at + 4], self.order);
                let out = row + x as usize * 2;
                dst[out..out + 2].copy_from_slice(&color.to_rgb565().to_ne_bytes());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_buffer_size() {
        let mut data = vec![0u8; 4 * 4 * 2];
        assert!(Bitmap::new(&mut data, 4, 2, 16, ChannelOrder::Rgba).is_some());
        assert!(Bitmap::new(&mut data, 5, 2, 16, ChannelOrder::Rgba).is_none());
        assert!(Bitmap::new(&mut data, 4, 3, 16, ChannelOrder::Rgba).is_none());
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut data = vec![0u8; 4 * 4 * 4];
        let mut bitmap = Bitmap::new(&mut data, 4, 4, 16, ChannelOrder::Rgba).unwrap();
        bitmap.fill_rect(-2, 2, 4, 10, Color::WHITE);

        assert_eq!(bitmap.pixel(0, 2), Some(Color::WHITE));
        assert_eq!(bitmap.pixel(1, 3), Some(Color::WHITE));
        assert_eq!(bitmap.pixel(2, 2), Some(Color::rgba(0, 0, 0, 0)));
        assert_eq!(bitmap.pixel(0, 1), Some(Color::rgba(0, 0, 0, 0)));
    }

    #[test]
    fn test_stride_padding_untouched() {
        let mut data = vec![7u8; 12 * 2];
        {
            let mut bitmap = Bitmap::new(&mut data, 2, 2, 12, ChannelOrder::Rgba).unwrap();
            bitmap.fill(Color::GRAY);
            bitmap.swap_red_blue();
        }
        assert_eq!(&data[8..12], &[7, 7, 7, 7]);
        assert_eq!(&data[20..24], &[7, 7, 7, 7]);
    }

    #[test]
    fn test_swap_red_blue_keeps_logical_color() {
        let mut data = vec![0u8; 4];
        let mut bitmap = Bitmap::new(&mut data, 1, 1, 4, ChannelOrder::Rgba).unwrap();
        let color = Color::rgba(1, 2, 3, 4);
        bitmap.fill(color);
        bitmap.swap_red_blue();

        assert_eq!(bitmap.order(), ChannelOrder::Bgra);
        assert_eq!(bitmap.pixel(0, 0), Some(color));
        assert_eq!(bitmap.data(), &[3, 2, 1, 4]);
    }

    #[test]
    fn test_composite_premultiplied() {
        let mut data = vec![0u8; 8];
        let mut bitmap = Bitmap::new(&mut data, 2, 1, 8, ChannelOrder::Rgba).unwrap();
        bitmap.fill(Color::WHITE);

        // Opaque red, then fully transparent
        let src = [255, 0, 0, 255, 0, 0, 0, 0];
        bitmap.composite_premultiplied(&src, 2, 1, 8, 0, 0);

        assert_eq!(bitmap.pixel(0, 0), Some(Color::rgba(255, 0, 0, 255)));
        assert_eq!(bitmap.pixel(1, 0), Some(Color::WHITE));
    }

    #[test]
    fn test_composite_offset_is_clipped() {
        let mut data = vec![0u8; 3 * 4];
        let mut bitmap = Bitmap::new(&mut data, 3, 1, 12, ChannelOrder::Bgra).unwrap();

        // Two opaque blue pixels placed one pixel left of the bitmap
        let src = [0, 0, 255, 255, 0, 0, 255, 255];
        bitmap.composite_premultiplied(&src, 2, 1, 8, -1, 0);

        assert_eq!(bitmap.pixel(0, 0), Some(Color::rgba(0, 0, 255, 255)));
        assert_eq!(bitmap.pixel(1, 0), Some(Color::rgba(0, 0, 0, 0)));
        assert_eq!(bitmap.data()[0..4], [255, 0, 0, 255]);
    }

    #[test]
    fn test_rgb565_packing() {
        assert_eq!(Color::WHITE.to_rgb565(), 0xFFFF);
        assert_eq!(Color::rgba(255, 0, 0, 255).to_rgb565(), 0xF800);
        assert_eq!(Color::rgba(0, 255, 0, 255).to_rgb565(), 0x07E0);
        assert_eq!(Color::GRAY.to_rgb565(), 0x8430);
    }
}
