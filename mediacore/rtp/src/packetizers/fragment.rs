//! Fair-rounding fragment size distribution shared by the H.264 and H.265
//! packetizers' FU fragmentation path.
//!
//! Splitting a payload into `N = ceil(len / max_fragment_size)` fragments by
//! naive fixed-size chunking (`payload.chunks(max_fragment_size)`) leaves
//! every fragment but the last at the maximum size and the last one
//! potentially tiny. Fair rounding instead keeps every fragment within one
//! byte of every other: base size `len / N`, with the first `len % N`
//! fragments getting one extra byte.

/// Splits `payload` into the fewest fragments whose size never exceeds
/// `max_fragment_size`, distributing the remainder across the first
/// fragments instead of leaving it all in the last one.
pub fn fair_split(payload: &[u8], max_fragment_size: usize) -> Vec<&[u8]> {
    if payload.is_empty() {
        return Vec::new();
    }
    let count = payload.len().div_ceil(max_fragment_size);
    let base_len = payload.len() / count;
    let remainder = payload.len() % count;

    let mut fragments = Vec::with_capacity(count);
    let mut offset = 0;
    for i in 0..count {
        let len = if i < remainder { base_len + 1 } else { base_len };
        fragments.push(&payload[offset..offset + len]);
        offset += len;
    }
    fragments
}
