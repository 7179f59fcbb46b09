//! JPEG 2000 encoding through OpenJPEG.
//!
//! The `image` crate has no JPEG 2000 encoder, so RGBA bitmaps are handed to
//! OpenJPEG directly. Output is a JP2 container, lossless, one quality layer.
//! OpenJPEG writes through a file stream; the bytes are staged in a scratch
//! file and read back.

use image::RgbaImage;
use openjpeg_sys as opj;
use std::ffi::CString;

use super::codec::CodecError;

/// OpenJPEG's default resolution count.
const DEFAULT_RESOLUTIONS: u32 = 6;

struct Codec(*mut opj::opj_codec_t);

impl Drop for Codec {
    fn drop(&mut self) {
        if !self.0.is_null() {
            unsafe { opj::opj_destroy_codec(self.0) }
        }
    }
}

struct Image(*mut opj::opj_image_t);

impl Drop for Image {
    fn drop(&mut self) {
        if !self.0.is_null() {
            unsafe { opj::opj_image_destroy(self.0) }
        }
    }
}

struct Stream(*mut opj::opj_stream_t);

impl Drop for Stream {
    fn drop(&mut self) {
        if !self.0.is_null() {
            unsafe { opj::opj_stream_destroy(self.0) }
        }
    }
}

fn failed(what: &str) -> CodecError {
    CodecError::Encode(format!("JPEG2000 encode failed: {what}"))
}

/// Number of resolution levels for a `width`×`height` image.
///
/// OpenJPEG rejects `2^(levels - 1)` larger than the short side.
pub(crate) fn resolution_levels(width: u32, height: u32) -> u32 {
    let short_side = width.min(height).max(1);
    let levels = u32::BITS - short_side.leading_zeros();
    levels.min(DEFAULT_RESOLUTIONS)
}

/// Copy an RGBA bitmap into a freshly allocated four-component OpenJPEG image.
fn planar_image(rgba: &RgbaImage) -> Result<Image, CodecError> {
    let (width, height) = rgba.dimensions();

    let mut params: [opj::opj_image_cmptparm_t; 4] = unsafe { std::mem::zeroed() };
    for param in &mut params {
        param.dx = 1;
        param.dy = 1;
        param.w = width;
        param.h = height;
        param.prec = 8;
        param.sgnd = 0;
    }

    let image = Image(unsafe {
        opj::opj_image_create(4, params.as_mut_ptr(), opj::COLOR_SPACE::OPJ_CLRSPC_SRGB)
    });
    if image.0.is_null() {
        return Err(failed("could not allocate image"));
    }

    let raw = unsafe { &mut *image.0 };
    raw.x0 = 0;
    raw.y0 = 0;
    raw.x1 = width;
    raw.y1 = height;

    let len = rgba.pixels().len();
    let comps = unsafe { std::slice::from_raw_parts_mut(raw.comps, 4) };
    comps[3].alpha = 1;
    let mut planes: Vec<&mut [i32]> = comps
        .iter()
        .map(|comp| unsafe { std::slice::from_raw_parts_mut(comp.data, len) })
        .collect();

    for (i, pixel) in rgba.pixels().enumerate() {
        for (plane, value) in planes.iter_mut().zip(pixel.0) {
            plane[i] = i32::from(value);
        }
    }

    Ok(image)
}

/// Encode an RGBA bitmap as a lossless JP2 file.
pub(crate) fn encode_rgba(rgba: &RgbaImage) -> Result<Vec<u8>, CodecError> {
    let (width, height) = rgba.dimensions();
    let image = planar_image(rgba)?;

    let mut params: opj::opj_cparameters_t = unsafe { std::mem::zeroed() };
    unsafe { opj::opj_set_default_encoder_parameters(&mut params) };
    params.tcp_numlayers = 1;
    params.tcp_rates[0] = 0.0;
    params.cp_disto_alloc = 1;
    params.numresolution = resolution_levels(width, height) as i32;

    let codec = Codec(unsafe { opj::opj_create_compress(opj::CODEC_FORMAT::OPJ_CODEC_JP2) });
    if codec.0.is_null() {
        return Err(failed("could not create codec"));
    }
    if unsafe { opj::opj_setup_encoder(codec.0, &mut params, image.0) } == 0 {
        return Err(failed("encoder rejected parameters"));
    }

    let scratch = tempfile::NamedTempFile::new().map_err(|e| failed(&e.to_string()))?;
    let path = CString::new(scratch.path().to_string_lossy().into_owned())
        .map_err(|e| failed(&e.to_string()))?;

    let stream = Stream(unsafe { opj::opj_stream_create_default_file_stream(path.as_ptr(), 0) });
    if stream.0.is_null() {
        return Err(failed("could not open output stream"));
    }

    let encoded = unsafe {
        opj::opj_start_compress(codec.0, image.0, stream.0) != 0
            && opj::opj_encode(codec.0, stream.0) != 0
            && opj::opj_end_compress(codec.0, stream.0) != 0
    };
    // Destroying the stream flushes and closes the scratch file.
    drop(stream);
    if !encoded {
        return Err(failed("codestream could not be written"));
    }

    std::fs::read(scratch.path()).map_err(|e| failed(&e.to_string()))
}
