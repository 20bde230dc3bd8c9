// Raw sample conversion
//
// The receiver delivers interleaved I/Q components as 12-bit signed values
// carried in little-endian 16-bit words.

use crate::config::BYTES_PER_SAMPLE;

/// Scale applied to each raw component (12-bit ADC range).
pub const SAMPLE_SCALE: f32 = 1.0 / 4096.0;

/// Bytes occupied by one I/Q pair.
pub const BYTES_PER_ELEMENT: usize = BYTES_PER_SAMPLE * 2;

/// Number of complete I/Q pairs in `len` raw bytes.
pub fn elements_in(len: usize) -> usize {
    len / BYTES_PER_ELEMENT
}

/// Convert raw I/Q pairs into interleaved normalized floats.
///
/// Converts as many pairs as both buffers allow and returns that count.
/// `dst` holds two floats (I then Q) per pair.
pub fn convert_cf32(raw: &[u8], dst: &mut [f32]) -> usize {
    let elements = elements_in(raw.len()).min(dst.len() / 2);

    for (pair, out) in raw
        .chunks_exact(BYTES_PER_ELEMENT)
        .zip(dst.chunks_exact_mut(2))
        .take(elements)
    {
        let i = i16::from_le_bytes([pair[0], pair[1]]);
        let q = i16::from_le_bytes([pair[2], pair[3]]);
        out[0] = i as f32 * SAMPLE_SCALE;
        out[1] = q as f32 * SAMPLE_SCALE;
    }

    elements
}
