use crate::config::DEFAULT_INPUT_SIZE;
use crate::processing::post::TransformParams;
use common::span;
use fast_image_resize::{
    FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer,
    images::{Image, ImageRef},
};
use image::RgbImage;
use ndarray::{Array, IxDyn};

const LETTERBOX_COLOR: u8 = 114;

pub struct PreProcessor {
    pub input_size: (u32, u32),
    letterboxed_buffer: Vec<u8>,
}

impl PreProcessor {
    pub fn new(input_size: (u32, u32)) -> Self {
        Self {
            input_size,
            letterboxed_buffer: vec![LETTERBOX_COLOR; (input_size.0 * input_size.1 * 3) as usize],
        }
    }

    /// Letterbox `image` into the model input and return the NCHW tensor
    /// together with the parameters needed to map boxes back.
    pub fn preprocess(
        &mut self,
        image: &RgbImage,
    ) -> anyhow::Result<(Array<f32, IxDyn>, TransformParams)> {
        let _s = span!("preprocess_image");

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            anyhow::bail!("Image has no pixels ({}x{})", width, height);
        }

        tracing::trace!(width, height, "Preprocessing image dimensions");

        let (scale, offset_x, offset_y) = self.resize_and_letterbox(image)?;

        let input = self.normalize()?;

        let transform = TransformParams {
            orig_width: width,
            orig_height: height,
            input_width: self.input_size.0,
            input_height: self.input_size.1,
            scale,
            offset_x,
            offset_y,
        };

        Ok((input, transform))
    }

    fn resize_and_letterbox(&mut self, image: &RgbImage) -> anyhow::Result<(f32, f32, f32)> {
        let _s = span!("resize_and_letterbox");

        let (width, height) = image.dimensions();
        let scale =
            (self.input_size.0 as f32 / width as f32).min(self.input_size.1 as f32 / height as f32);
        let new_width = ((width as f32 * scale) as u32).clamp(1, self.input_size.0);
        let new_height = ((height as f32 * scale) as u32).clamp(1, self.input_size.1);

        let offset_x = (self.input_size.0 - new_width) / 2;
        let offset_y = (self.input_size.1 - new_height) / 2;

        let src = ImageRef::new(width, height, image.as_raw(), PixelType::U8x3)?;

        let mut resized = Image::new(new_width, new_height, PixelType::U8x3);

        Resizer::new().resize(
            &src,
            &mut resized,
            &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
        )?;

        self.letterboxed_buffer.fill(LETTERBOX_COLOR);

        let resized_data = resized.buffer();
        let stride = self.input_size.0 * 3;
        let row_bytes = (new_width * 3) as usize;

        for y in 0..new_height {
            let src_row = (y * new_width * 3) as usize;
            let dst_row = ((y + offset_y) * stride + offset_x * 3) as usize;

            self.letterboxed_buffer[dst_row..dst_row + row_bytes]
                .copy_from_slice(&resized_data[src_row..src_row + row_bytes]);
        }

        Ok((scale, offset_x as f32, offset_y as f32))
    }

    /// HWC u8 to NCHW f32 in 0-1; YOLO exports expect no mean/std shift.
    fn normalize(&self) -> anyhow::Result<Array<f32, IxDyn>> {
        let _s = span!("normalize");

        let width = self.input_size.0 as usize;
        let height = self.input_size.1 as usize;
        let spatial = width * height;

        let mut output = vec![0.0f32; 3 * spatial];

        for (i, px) in self.letterboxed_buffer.chunks_exact(3).enumerate() {
            output[i] = px[0] as f32 / 255.0;
            output[i + spatial] = px[1] as f32 / 255.0;
            output[i + 2 * spatial] = px[2] as f32 / 255.0;
        }

        Ok(Array::from_shape_vec(IxDyn(&[1, 3, height, width]), output)?)
    }
}

impl Default for PreProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_SIZE)
    }
}
