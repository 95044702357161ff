//! Golomb-Rice coding of sorted integer sequences.
//!
//! Each value is stored as the gap to its predecessor. A gap `d` is split into
//! a quotient `d >> k`, written in unary as that many one bits followed by a
//! zero, and a remainder of `k` bits. Bits are written most significant first.

use bitreader::BitReader;

use crate::error::{PsiError, Result};

/// Largest Rice parameter we accept; keeps `1 << k` well inside a u64.
pub const MAX_RICE_PARAMETER: u8 = 62;

#[derive(Debug, Default)]
pub(crate) struct BitWriter {
    bytes: Vec<u8>,
    bit_len: usize,
}

impl BitWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn write_bit(&mut self, bit: bool) {
        let offset = self.bit_len % 8;
        if offset == 0 {
            self.bytes.push(0);
        }
        if bit {
            let last = self.bytes.len() - 1;
            self.bytes[last] |= 0x80 >> offset;
        }
        self.bit_len += 1;
    }

    /// Writes the low `count` bits of `value`, most significant first.
    pub(crate) fn write_bits(&mut self, value: u64, count: u8) {
        for shift in (0..count).rev() {
            self.write_bit((value >> shift) & 1 == 1);
        }
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

/// Rice-code a non-decreasing sequence with parameter `k`.
pub(crate) fn encode(sorted: &[u64], k: u8) -> Vec<u8> {
    debug_assert!(k <= MAX_RICE_PARAMETER);
    debug_assert!(sorted.windows(2).all(|w| w[0] <= w[1]));

    let mut writer = BitWriter::new();
    let mut prev = 0u64;
    for &value in sorted {
        let delta = value - prev;
        prev = value;

        let quotient = delta >> k;
        for _ in 0..quotient {
            writer.write_bit(true);
        }
        writer.write_bit(false);
        writer.write_bits(delta, k);
    }
    writer.finish()
}

/// Decode `count` values from a Rice-coded stream.
///
/// The scan is monotone: each value is its predecessor plus the decoded gap.
///
/// # Errors
/// Returns `PsiError::MalformedMessage` if the stream ends early, a value
/// overflows, or anything but zero padding follows the last value.
pub(crate) fn decode(bytes: &[u8], count: usize, k: u8) -> Result<Vec<u64>> {
    if k > MAX_RICE_PARAMETER {
        return Err(PsiError::malformed(format!("Rice parameter {} too large", k)));
    }
    // Every value costs at least one bit, so a larger count cannot be valid.
    if count > bytes.len().saturating_mul(8) {
        return Err(PsiError::malformed(format!(
            "{} values cannot fit in {} bytes",
            count,
            bytes.len()
        )));
    }

    let truncated = |e: bitreader::BitReaderError| PsiError::malformed(format!("GCS stream: {:?}", e));
    let overflow = || PsiError::malformed("GCS value overflows");

    let mut reader = BitReader::new(bytes);
    let mut values = Vec::with_capacity(count);
    let mut prev = 0u64;
    for _ in 0..count {
        let mut quotient = 0u64;
        while reader.read_bool().map_err(truncated)? {
            quotient += 1;
        }
        let remainder = if k > 0 {
            reader.read_u64(k).map_err(truncated)?
        } else {
            0
        };
        let delta = quotient
            .checked_mul(1u64 << k)
            .and_then(|q| q.checked_add(remainder))
            .ok_or_else(overflow)?;
        prev = prev.checked_add(delta).ok_or_else(overflow)?;
        values.push(prev);
    }

    // Only the zero padding of the final byte may follow the last value.
    let remaining = (bytes.len() as u64 * 8).saturating_sub(reader.position());
    if remaining >= 8 {
        return Err(PsiError::malformed(format!(
            "{} trailing bits after {} values",
            remaining, count
        )));
    }
    if remaining > 0 && reader.read_u8(remaining as u8).map_err(truncated)? != 0 {
        return Err(PsiError::malformed("GCS stream padding is not zero"));
    }
    Ok(values)
}
