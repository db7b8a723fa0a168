//! # Texture — Image Loading and Render Target Textures
//!
//! Loads 2D textures and cubemaps from image files and creates the color and
//! depth textures the main render target is built from.
//!
//! ## Pixel Formats
//!
//! Both loaders go through one table instead of branching on channel count
//! in two places:
//!
//! ```text
//!  channels │ linearize = false │ linearize = true
//!  ─────────┼───────────────────┼─────────────────
//!      1    │ R8                │ R8
//!      3    │ Rgb8              │ Rgb8Srgb
//!      4    │ Rgba8             │ Rgba8Srgb
//! ```
//!
//! "Linearize" means the file holds sRGB-encoded color that the GPU should
//! convert to linear on sampling. Other channel counts (grey + alpha) are
//! rejected.
//!
//! 2D textures are flipped vertically on load so UV (0, 0) addresses the
//! bottom-left of the image. Cubemap faces are not flipped: cubemap
//! addressing already expects the first row at the top.
//!
//! ## Failure
//!
//! [`load_texture`] never fails the caller. A missing or undecodable file is
//! logged and [`TextureId::INVALID`] comes back; binding that id leaves the
//! unit empty, which programs read as their fallback color.
//!
//! ## Comparison
//!
//! - **Bevy**: `Image` assets with an explicit `is_srgb` flag chosen by the
//!   loader from the material slot.
//! - **stb_image + GL**: Same channel-count switch, usually copy-pasted per
//!   loader.

use std::path::{Path, PathBuf};

use image::GenericImageView;

use crate::error::RenderError;
use crate::gpu::{
    Filter, GraphicsDevice, PixelFormat, Sampling, TextureDesc, TextureDimension, TextureId, Wrap,
};

/// Cubemap face file stems, in `+X -X +Y -Y +Z -Z` order.
pub const CUBEMAP_FACES: [&str; 6] = ["right", "left", "top", "bottom", "front", "back"];

// ── Format table ───────────────────────────────────────────────────────────

/// Channel count → pixel format mapping shared by every loader.
pub struct PixelFormatTable;

impl PixelFormatTable {
    const ENTRIES: [(u8, PixelFormat, PixelFormat); 3] = [
        (1, PixelFormat::R8, PixelFormat::R8),
        (3, PixelFormat::Rgb8, PixelFormat::Rgb8Srgb),
        (4, PixelFormat::Rgba8, PixelFormat::Rgba8Srgb),
    ];

    /// Format for an image with `channels` channels, `None` if unsupported.
    pub fn lookup(channels: u8, linearize: bool) -> Option<PixelFormat> {
        Self::ENTRIES
            .iter()
            .find(|(c, _, _)| *c == channels)
            .map(|&(_, linear, srgb)| if linearize { srgb } else { linear })
    }
}

// ── Decoding ───────────────────────────────────────────────────────────────

/// A decoded image, tightly packed in `format`.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

/// Decode an image file into the format the table picks for it.
pub fn decode_image(path: &Path, linearize: bool, flip: bool) -> Result<DecodedImage, RenderError> {
    let img = image::open(path).map_err(|source| RenderError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    let img = if flip { img.flipv() } else { img };

    let channels = img.color().channel_count();
    let format =
        PixelFormatTable::lookup(channels, linearize).ok_or_else(|| RenderError::UnsupportedChannels {
            path: path.to_path_buf(),
            channels,
        })?;

    let (width, height) = img.dimensions();
    let data = match channels {
        1 => img.into_luma8().into_raw(),
        3 => img.into_rgb8().into_raw(),
        _ => img.into_rgba8().into_raw(),
    };
    Ok(DecodedImage {
        width,
        height,
        format,
        data,
    })
}

// ── Loading ────────────────────────────────────────────────────────────────

fn sampled(label: String, image: &DecodedImage, dimension: TextureDimension, sampling: Sampling) -> TextureDesc {
    TextureDesc {
        label,
        dimension,
        format: image.format,
        width: image.width,
        height: image.height,
        samples: 1,
        sampling,
        render_target: false,
    }
}

/// Upload an already decoded image as a repeating, linearly filtered 2D texture.
pub fn upload_image(dev: &mut dyn GraphicsDevice, label: &str, image: &DecodedImage) -> TextureId {
    let desc = sampled(
        label.to_owned(),
        image,
        TextureDimension::D2,
        Sampling {
            wrap: Wrap::Repeat,
            filter: Filter::Linear,
            border: None,
            compare: false,
        },
    );
    let id = dev.create_texture(&desc, Some(&image.data));
    log::info!(
        "loaded texture {label} ({}x{}, {:?}) as {id}",
        image.width,
        image.height,
        image.format
    );
    id
}

/// Load a 2D texture, propagating failures.
pub fn try_load_texture(
    dev: &mut dyn GraphicsDevice,
    path: impl AsRef<Path>,
    linearize: bool,
) -> Result<TextureId, RenderError> {
    let path = path.as_ref();
    let image = decode_image(path, linearize, true)?;
    Ok(upload_image(dev, &path.display().to_string(), &image))
}

/// Load a 2D texture. Failures are logged and return [`TextureId::INVALID`].
///
/// The caller owns the returned id; wrap it in
/// [`Owned`](crate::gpu::Owned) to release it on drop.
pub fn load_texture(dev: &mut dyn GraphicsDevice, path: impl AsRef<Path>, linearize: bool) -> TextureId {
    let path = path.as_ref();
    match try_load_texture(dev, path, linearize) {
        Ok(id) => id,
        Err(e) => {
            log::error!("texture failed to load at {}: {e}", path.display());
            TextureId::INVALID
        }
    }
}

/// Load six images as one cubemap, faces in `+X -X +Y -Y +Z -Z` order.
///
/// The first face that decodes fixes size and format. Faces that fail or
/// disagree are logged and left black. Returns [`TextureId::INVALID`] only
/// when no face loads at all.
///
/// Four-channel faces are uploaded as RGBA through [`PixelFormatTable`],
/// the same as 2D textures.
pub fn load_cubemap(dev: &mut dyn GraphicsDevice, faces: &[PathBuf; 6], linearize: bool) -> TextureId {
    let decoded: Vec<Option<DecodedImage>> = faces
        .iter()
        .map(|path| match decode_image(path, linearize, false) {
            Ok(image) => Some(image),
            Err(e) => {
                log::error!("cubemap face failed to load at {}: {e}", path.display());
                None
            }
        })
        .collect();

    let Some(first) = decoded.iter().flatten().next() else {
        log::error!("cubemap has no loadable faces");
        return TextureId::INVALID;
    };
    let (width, height, format) = (first.width, first.height, first.format);
    let face_len = first.data.len();

    let mut data = Vec::with_capacity(face_len * 6);
    for (path, face) in faces.iter().zip(&decoded) {
        match face {
            Some(image) if (image.width, image.height, image.format) == (width, height, format) => {
                data.extend_from_slice(&image.data);
            }
            Some(image) => {
                log::error!(
                    "cubemap face {} is {}x{} {:?}, expected {width}x{height} {format:?}",
                    path.display(),
                    image.width,
                    image.height,
                    image.format
                );
                data.resize(data.len() + face_len, 0);
            }
            None => data.resize(data.len() + face_len, 0),
        }
    }

    let label = faces[0]
        .parent()
        .map(|dir| dir.display().to_string())
        .unwrap_or_else(|| "cubemap".into());
    let desc = TextureDesc {
        label,
        dimension: TextureDimension::Cube,
        format,
        width,
        height,
        samples: 1,
        sampling: Sampling {
            wrap: Wrap::ClampToEdge,
            filter: Filter::Linear,
            border: None,
            compare: false,
        },
        render_target: false,
    };
    let id = dev.create_texture(&desc, Some(&data));
    log::info!("loaded cubemap {} ({width}x{height}, {format:?}) as {id}", desc.label);
    id
}

/// Load `<dir>/<face>.<extension>` for each of [`CUBEMAP_FACES`].
pub fn load_skybox(
    dev: &mut dyn GraphicsDevice,
    dir: impl AsRef<Path>,
    extension: &str,
    linearize: bool,
) -> TextureId {
    let dir = dir.as_ref();
    let faces = CUBEMAP_FACES.map(|face| dir.join(format!("{face}.{extension}")));
    load_cubemap(dev, &faces, linearize)
}

// ── Render target textures ─────────────────────────────────────────────────

/// Color attachment, optionally multisampled.
pub fn create_color_target(dev: &mut dyn GraphicsDevice, label: &str, width: u32, height: u32, samples: u32) -> TextureId {
    dev.create_texture(
        &TextureDesc {
            label: label.into(),
            dimension: TextureDimension::D2,
            format: PixelFormat::Rgba8,
            width,
            height,
            samples,
            sampling: Sampling {
                wrap: Wrap::ClampToEdge,
                filter: Filter::Linear,
                border: None,
                compare: false,
            },
            render_target: true,
        },
        None,
    )
}

/// Depth attachment matching a color target.
pub fn create_depth_target(dev: &mut dyn GraphicsDevice, label: &str, width: u32, height: u32, samples: u32) -> TextureId {
    dev.create_texture(
        &TextureDesc {
            label: label.into(),
            dimension: TextureDimension::D2,
            format: PixelFormat::Depth32,
            width,
            height,
            samples,
            sampling: Sampling {
                wrap: Wrap::ClampToEdge,
                filter: Filter::Nearest,
                border: None,
                compare: false,
            },
            render_target: true,
        },
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::headless::HeadlessDevice;

    fn write_rgb(dir: &Path, name: &str, pixels: &[[u8; 3]], width: u32) -> PathBuf {
        let height = pixels.len() as u32 / width;
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb(pixels[(y * width + x) as usize])
        });
        let path = dir.join(name);
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn table_maps_channel_counts() {
        assert_eq!(PixelFormatTable::lookup(1, true), Some(PixelFormat::R8));
        assert_eq!(PixelFormatTable::lookup(3, false), Some(PixelFormat::Rgb8));
        assert_eq!(PixelFormatTable::lookup(3, true), Some(PixelFormat::Rgb8Srgb));
        assert_eq!(PixelFormatTable::lookup(4, false), Some(PixelFormat::Rgba8));
        assert_eq!(PixelFormatTable::lookup(4, true), Some(PixelFormat::Rgba8Srgb));
        assert_eq!(PixelFormatTable::lookup(2, true), None);
    }

    #[test]
    fn missing_file_returns_invalid_without_upload() {
        let mut dev = HeadlessDevice::default();
        let id = load_texture(&mut dev, "/definitely/not/here.png", true);
        assert_eq!(id, TextureId::INVALID);
        assert_eq!(dev.texture_uploads(), 0);
    }

    #[test]
    fn loads_rgb_png_as_srgb_when_linearized() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_rgb(dir.path(), "brick.png", &[[10, 20, 30]; 4], 2);
        let mut dev = HeadlessDevice::default();
        let id = load_texture(&mut dev, &path, true);
        assert!(id.is_valid());
        let desc = dev.texture_desc(id).unwrap();
        assert_eq!(desc.format, PixelFormat::Rgb8Srgb);
        assert_eq!((desc.width, desc.height), (2, 2));
        assert_eq!(desc.sampling.wrap, Wrap::Repeat);
    }

    #[test]
    fn grayscale_maps_to_red_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.png");
        image::GrayImage::from_pixel(3, 3, image::Luma([128])).save(&path).unwrap();
        let decoded = decode_image(&path, true, true).unwrap();
        assert_eq!(decoded.format, PixelFormat::R8);
        assert_eq!(decoded.data.len(), 9);
    }

    #[test]
    fn textures_are_flipped_vertically() {
        let dir = tempfile::tempdir().unwrap();
        // Top row red, bottom row blue.
        let path = write_rgb(dir.path(), "stripes.png", &[[255, 0, 0], [0, 0, 255]], 1);
        let flipped = decode_image(&path, false, true).unwrap();
        assert_eq!(&flipped.data[..3], &[0, 0, 255], "first row should be the bottom of the file");
        let unflipped = decode_image(&path, false, false).unwrap();
        assert_eq!(&unflipped.data[..3], &[255, 0, 0]);
    }

    #[test]
    fn cubemap_tolerates_a_missing_face() {
        let dir = tempfile::tempdir().unwrap();
        for face in &CUBEMAP_FACES[..5] {
            write_rgb(dir.path(), &format!("{face}.png"), &[[1, 2, 3]; 4], 2);
        }
        let mut dev = HeadlessDevice::default();
        let id = load_skybox(&mut dev, dir.path(), "png", false);
        assert!(id.is_valid());
        let desc = dev.texture_desc(id).unwrap();
        assert_eq!(desc.dimension, TextureDimension::Cube);
        assert_eq!(desc.sampling.wrap, Wrap::ClampToEdge);
        assert_eq!(dev.texture_uploads(), 1);
    }

    #[test]
    fn cubemap_without_faces_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let mut dev = HeadlessDevice::default();
        assert_eq!(load_skybox(&mut dev, dir.path(), "jpg", true), TextureId::INVALID);
    }
}
