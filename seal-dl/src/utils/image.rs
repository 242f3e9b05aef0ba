//! Pixel operations on CHW float image tensors.

use crate::common::*;

// padding and interpolation modes of the aten grid sampler
const GRID_PADDING_ZEROS: i64 = 0;
const GRID_INTERPOLATION_BICUBIC: i64 = 2;

/// Load an image file into a CHW float tensor with values in `[0, 1]`.
pub fn load_image_file(path: impl AsRef<Path>) -> Result<Tensor> {
    let path = path.as_ref();
    let image = vision::image::load(path)
        .with_context(|| format!("failed to load image file '{}'", path.display()))?;
    let image = tch::no_grad(|| image.to_kind(Kind::Float) / 255.0);
    Ok(image)
}

pub trait ImageExt {
    fn f_image_hw(&self) -> Result<HW<i64>>;

    fn f_resize_to(&self, height: i64, width: i64) -> Result<Tensor>;

    fn f_resize_scale(&self, scale: f64) -> Result<Tensor>;

    fn f_flip_horizontal(&self) -> Result<Tensor>;

    fn f_flip_vertical(&self) -> Result<Tensor>;

    fn f_transpose_hw(&self) -> Result<Tensor>;

    /// Resample the image through an axis-aligned transform mapping source
    /// pixel coordinates to output pixel coordinates.
    ///
    /// Output pixels without a source are zero.
    fn f_warp_affine(&self, transform: &RectTransform<f64>, output_size: &HW<i64>)
        -> Result<Tensor>;

    fn f_rgb_to_hsv(&self) -> Result<Tensor>;

    fn f_hsv_to_rgb(&self) -> Result<Tensor>;

    fn rgb_to_hsv(&self) -> Tensor {
        self.f_rgb_to_hsv().unwrap()
    }

    fn hsv_to_rgb(&self) -> Tensor {
        self.f_hsv_to_rgb().unwrap()
    }
}

impl ImageExt for Tensor {
    fn f_image_hw(&self) -> Result<HW<i64>> {
        let (_channels, height, width) = self.size3()?;
        HW::try_from_hw([height, width])
    }

    fn f_resize_to(&self, height: i64, width: i64) -> Result<Tensor> {
        ensure!(
            height > 0 && width > 0,
            "the output size must be positive, but get {}x{}",
            height,
            width
        );
        let _ = self.size3()?;

        tch::no_grad(|| -> Result<_> {
            let resized = self
                .to_kind(Kind::Float)
                .unsqueeze(0)
                .f_upsample_bilinear2d(&[height, width], false, None, None)?
                .select(0, 0)
                .clamp(0.0, 1.0);
            Ok(resized)
        })
    }

    fn f_resize_scale(&self, scale: f64) -> Result<Tensor> {
        ensure!(scale > 0.0, "scale must be positive, but get {}", scale);
        let (_channels, height, width) = self.size3()?;
        let new_h = ((height as f64 * scale).round() as i64).max(1);
        let new_w = ((width as f64 * scale).round() as i64).max(1);
        self.f_resize_to(new_h, new_w)
    }

    fn f_flip_horizontal(&self) -> Result<Tensor> {
        let _ = self.size3()?;
        Ok(self.flip(&[2]))
    }

    fn f_flip_vertical(&self) -> Result<Tensor> {
        let _ = self.size3()?;
        Ok(self.flip(&[1]))
    }

    fn f_transpose_hw(&self) -> Result<Tensor> {
        let _ = self.size3()?;
        Ok(self.transpose(1, 2).contiguous())
    }

    fn f_warp_affine(
        &self,
        transform: &RectTransform<f64>,
        output_size: &HW<i64>,
    ) -> Result<Tensor> {
        let (channels, in_h, in_w) = self.size3()?;
        let [out_h, out_w] = output_size.hw();
        ensure!(
            out_h > 0 && out_w > 0,
            "the output size must be positive, but get {}x{}",
            out_h,
            out_w
        );
        ensure!(
            transform.sx > 0.0 && transform.sy > 0.0,
            "the scaling factors must be positive"
        );

        // The grid maps normalized output coordinates to normalized input
        // coordinates, so the inverse transform is used.
        let inverse = transform.inverse();
        let (in_h, in_w) = (in_h as f64, in_w as f64);
        let (out_hf, out_wf) = (out_h as f64, out_w as f64);
        let ax = out_wf * inverse.sx / in_w;
        let bx = (out_wf * inverse.sx + 2.0 * inverse.tx) / in_w - 1.0;
        let ay = out_hf * inverse.sy / in_h;
        let by = (out_hf * inverse.sy + 2.0 * inverse.ty) / in_h - 1.0;

        tch::no_grad(|| -> Result<_> {
            let device = self.device();
            let theta = Tensor::of_slice(&[ax, 0.0, bx, 0.0, ay, by])
                .view([1, 2, 3])
                .to_kind(Kind::Float)
                .to_device(device);
            let grid = Tensor::f_affine_grid_generator(&theta, &[1, channels, out_h, out_w], false)?;
            let warped = self
                .to_kind(Kind::Float)
                .unsqueeze(0)
                .f_grid_sampler(
                    &grid,
                    GRID_INTERPOLATION_BICUBIC,
                    GRID_PADDING_ZEROS,
                    false,
                )?
                .select(0, 0)
                .clamp(0.0, 1.0);
            Ok(warped)
        })
    }

    fn f_rgb_to_hsv(&self) -> Result<Tensor> {
        let eps = 1e-6;
        let rgb = self;
        let (channels, _height, _width) = rgb.size3()?;
        ensure!(
            channels == 3,
            "channel size must be 3, but get {}",
            channels
        );

        let hsv = tch::no_grad(|| {
            let red = rgb.select(0, 0);
            let green = rgb.select(0, 1);
            let blue = rgb.select(0, 2);

            let max = red.maximum(&green).maximum(&blue);
            let min = red.minimum(&green).minimum(&blue);
            let diff = &max - &min;

            let value = max.shallow_clone();
            let saturation = &diff / &max.clamp_min(eps);

            // one-hot masks of the channel holding the maximum, red first
            let red_mask = (&max - &red).le(0.0).to_kind(Kind::Float);
            let green_mask = (&max - &green).le(0.0).to_kind(Kind::Float) * (-&red_mask + 1.0);
            let blue_mask = -&red_mask - &green_mask + 1.0;

            let denom = diff.clamp_min(eps);
            let red_hue = (&green - &blue) / &denom;
            let green_hue = (&blue - &red) / &denom + 2.0;
            let blue_hue = (&red - &green) / &denom + 4.0;

            let hue = (red_hue * &red_mask + green_hue * &green_mask + blue_hue * &blue_mask) / 6.0;
            let hue = &hue - hue.floor();

            Tensor::stack(&[hue, saturation, value], 0)
        });

        Ok(hsv)
    }

    fn f_hsv_to_rgb(&self) -> Result<Tensor> {
        let hsv = self;
        let (channels, _height, _width) = hsv.size3()?;
        ensure!(
            channels == 3,
            "channel size must be 3, but get {}",
            channels
        );

        let rgb = tch::no_grad(|| {
            let hue = hsv.select(0, 0);
            let saturation = hsv.select(0, 1);
            let value = hsv.select(0, 2);

            let component = |n: f64| {
                let k = (&hue * 6.0 + n).fmod(6.0);
                let ramp = k.minimum(&(-&k + 4.0)).clamp(0.0, 1.0);
                &value - &value * &saturation * ramp
            };

            let red = component(5.0);
            let green = component(3.0);
            let blue = component(1.0);
            Tensor::stack(&[red, green, blue], 0)
        });

        Ok(rgb)
    }
}
