// Copyright (C) 2023 Dheatly23
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::io::Reader as ImageReader;
use image::{ColorType, DynamicImage, ImageEncoder};
use ndarray::prelude::*;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Decoded 8-bit page, shaped `(height, width, channels)`.
///
/// Channels are 1 (gray), 2 (gray + alpha), 3 (RGB) or 4 (RGBA).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterBuffer {
    pixels: Array3<u8>,
}

impl RasterBuffer {
    pub fn new(pixels: Array3<u8>) -> Result<Self> {
        match pixels.len_of(Axis(2)) {
            1..=4 => Ok(Self { pixels }),
            c => Err(Error::UnsupportedChannels(c)),
        }
    }

    pub fn from_raw(width: usize, height: usize, channels: usize, data: Vec<u8>) -> Result<Self> {
        Self::new(Array3::from_shape_vec((height, width, channels), data)?)
    }

    pub fn width(&self) -> usize {
        self.pixels.len_of(Axis(1))
    }

    pub fn height(&self) -> usize {
        self.pixels.len_of(Axis(0))
    }

    pub fn channels(&self) -> usize {
        self.pixels.len_of(Axis(2))
    }

    pub fn view(&self) -> ArrayView3<'_, u8> {
        self.pixels.view()
    }

    pub fn into_array(self) -> Array3<u8> {
        self.pixels
    }

    fn color_type(&self) -> ColorType {
        match self.channels() {
            1 => ColorType::L8,
            2 => ColorType::La8,
            3 => ColorType::Rgb8,
            _ => ColorType::Rgba8,
        }
    }

    /// Row-major bytes, dropping alpha when `opaque` is set.
    fn to_bytes(&self, opaque: bool) -> (Vec<u8>, ColorType) {
        let (view, color) = match (opaque, self.channels()) {
            (true, 2) => (self.pixels.slice(s![.., .., ..1]), ColorType::L8),
            (true, 4) => (self.pixels.slice(s![.., .., ..3]), ColorType::Rgb8),
            _ => (self.pixels.view(), self.color_type()),
        };
        (
            view.as_standard_layout().into_owned().into_raw_vec(),
            color,
        )
    }
}

impl TryFrom<DynamicImage> for RasterBuffer {
    type Error = Error;

    fn try_from(im: DynamicImage) -> Result<Self> {
        let (w, h) = (im.width() as usize, im.height() as usize);
        let (channels, data) = match im {
            DynamicImage::ImageLuma8(b) => (1, b.into_raw()),
            DynamicImage::ImageLumaA8(b) => (2, b.into_raw()),
            DynamicImage::ImageRgb8(b) => (3, b.into_raw()),
            DynamicImage::ImageRgba8(b) => (4, b.into_raw()),
            im if im.color().has_alpha() => (4, im.into_rgba8().into_raw()),
            im => (3, im.into_rgb8().into_raw()),
        };
        Self::from_raw(w, h, channels, data)
    }
}

/// Encoded output container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }
}

/// Decode page bytes, guessing the format from content.
///
/// Images deeper than 8 bits per channel are reduced to 8 bits.
pub fn decode(bytes: &[u8]) -> Result<RasterBuffer> {
    let im = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| Error::Decode(e.into()))?
        .decode()
        .map_err(Error::Decode)?;

    RasterBuffer::try_from(im)
}

/// Map quality in `[0.0, 1.0]` to the JPEG scale `1..=100`.
pub fn jpeg_quality(quality: f32) -> u8 {
    (quality.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8
}

/// Encode a raster. `quality` only affects JPEG, which also drops alpha.
pub fn encode(raster: &RasterBuffer, format: OutputFormat, quality: f32) -> Result<Vec<u8>> {
    let (w, h) = (raster.width() as u32, raster.height() as u32);
    let mut out = Vec::new();

    match format {
        OutputFormat::Jpeg => {
            let (data, color) = raster.to_bytes(true);
            JpegEncoder::new_with_quality(&mut out, jpeg_quality(quality))
                .encode(&data, w, h, color)
                .map_err(Error::Encode)?;
        }
        OutputFormat::Png => {
            let (data, color) = raster.to_bytes(false);
            PngEncoder::new(&mut out)
                .write_image(&data, w, h, color)
                .map_err(Error::Encode)?;
        }
    }

    Ok(out)
}
