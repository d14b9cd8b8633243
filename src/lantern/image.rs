use bytemuck::cast_slice;

// 화면에 띄울 최종 결과물. 픽셀 하나가 (a << 24) | (b << 16) | (g << 8) | r
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl Image {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width as usize) * (height as usize)],
        }
    }

    pub(crate) fn resize(&mut self, width: u32, height: u32) {
        if self.size() == (width, height) {
            return;
        }

        *self = Self::new(width, height);
    }

    // 렌더러만 부름. Lantern::resize가 final_image_data와 크기를 항상 맞춰두기 때문에
    // 길이가 다르면 렌더러 쪽 버그라서 바로 멈춤
    pub(crate) fn set_data(&mut self, data: &[u32]) {
        assert_eq!(self.pixels.len(), data.len(), "image data does not match image size");
        self.pixels.copy_from_slice(data);
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((x + y * self.width) as usize).copied()
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    // 리틀 엔디언이면 R, G, B, A 순서의 바이트 배열이 됨. 텍스쳐에 바로 올릴 수 있음
    pub fn as_bytes(&self) -> &[u8] {
        cast_slice(&self.pixels)
    }
}
