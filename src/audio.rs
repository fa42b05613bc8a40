//! Clip duration probing.
//!
//! The original service stamped every clip with a hardcoded 15 seconds,
//! which made the duration bound vacuous. Here the real duration is read
//! from the container metadata via symphonia where the format declares it.

use std::io::Cursor;
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Probes the uploaded bytes and returns the declared duration in seconds.
///
/// Returns `None` when the format cannot be probed or does not declare a
/// frame count; the caller falls back to the 15s cap for those streams
/// (validation then accepts them, matching the legacy behavior for
/// undeterminable clips).
pub fn probe_duration(bytes: &[u8], content_type: &str) -> Option<f64> {
    let cursor = Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut hint = Hint::new();
    hint.mime_type(content_type);

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .ok()?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)?;

    let n_frames = track.codec_params.n_frames?;
    let time_base = track.codec_params.time_base?;
    let time = time_base.calc_time(n_frames);
    Some(time.seconds as f64 + time.frac)
}
