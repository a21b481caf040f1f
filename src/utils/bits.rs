use crate::error::{DemuxError, Result};
use bytes::Bytes;

/// A bit-level reader over a borrowed byte slice, MSB first.
///
/// Two families of reads are offered:
/// - `read_*` methods return `Err` when the data runs out and are meant for
///   syntax where a short read is an error (SPS, AudioSpecificConfig).
/// - `get_*`/`peek_*`/`skip_*` methods never fail: reading past the end
///   returns 0 and pins the cursor at the end, which suits header probing
///   where the caller checks lengths up front.
///
/// Example:
/// ```
/// use tsdemux::utils::BitReader;
///
/// let data = [0b10110011];
/// let mut reader = BitReader::new(&data);
///
/// assert_eq!(reader.read_bit().unwrap(), true);   // 1
/// assert_eq!(reader.read_bits(3).unwrap(), 0b011); // 011
/// assert_eq!(reader.get_bits(8), 0);               // overrun
/// assert_eq!(reader.remaining_bits(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    byte_offset: usize,
    bit_offset: u8,
}

impl<'a> BitReader<'a> {
    /// Creates a new BitReader from a byte slice
    pub fn new(data: &'a [u8]) -> Self {
        BitReader {
            data,
            byte_offset: 0,
            bit_offset: 0,
        }
    }

    /// Number of bits left to read.
    pub fn remaining_bits(&self) -> usize {
        (self.data.len().saturating_sub(self.byte_offset) * 8)
            .saturating_sub(self.bit_offset as usize)
    }

    /// Number of whole bytes left to read.
    pub fn remaining_bytes(&self) -> usize {
        self.remaining_bits() / 8
    }

    /// Current position in bytes, rounded down.
    pub fn byte_position(&self) -> usize {
        self.byte_offset
    }

    /// Current position in bits.
    pub fn bit_position(&self) -> usize {
        self.byte_offset * 8 + self.bit_offset as usize
    }

    /// Returns true when the cursor sits on a byte boundary.
    pub fn is_byte_aligned(&self) -> bool {
        self.bit_offset == 0
    }

    /// The unread bytes when the cursor is byte aligned; includes the partial
    /// byte otherwise.
    pub fn remaining_data(&self) -> &'a [u8] {
        self.data.get(self.byte_offset..).unwrap_or(&[])
    }

    fn seek_end(&mut self) {
        self.byte_offset = self.data.len();
        self.bit_offset = 0;
    }

    // Caller guarantees n <= 64 and n <= remaining_bits().
    fn take(&mut self, n: u32) -> u64 {
        let mut value = 0u64;
        let mut left = n;
        while left > 0 {
            let avail = 8 - self.bit_offset as u32;
            let take = left.min(avail);
            let byte = self.data[self.byte_offset] as u32;
            let bits = (byte >> (avail - take)) & ((1u32 << take) - 1);
            value = (value << take) | bits as u64;
            self.bit_offset += take as u8;
            if self.bit_offset == 8 {
                self.bit_offset = 0;
                self.byte_offset += 1;
            }
            left -= take;
        }
        value
    }

    /// Reads a single bit from the stream.
    /// Returns true for 1, false for 0.
    ///
    /// Returns error if end of data is reached.
    pub fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    /// Reads n bits and returns them as a number.
    /// The bits are interpreted as big-endian.
    ///
    /// Returns error if n > 32 or end of data is reached.
    pub fn read_bits(&mut self, n: u32) -> Result<u32> {
        if n > 32 {
            return Err(DemuxError::Codec("Too many bits requested".into()));
        }
        Ok(self.read_bits64(n)? as u32)
    }

    /// Reads up to 64 bits as a big-endian number.
    pub fn read_bits64(&mut self, n: u32) -> Result<u64> {
        if n > 64 {
            return Err(DemuxError::Codec("Too many bits requested".into()));
        }
        if n as usize > self.remaining_bits() {
            return Err(DemuxError::Codec("Reached end of data".into()));
        }
        Ok(self.take(n))
    }

    /// Reads an unsigned exponential Golomb code (ue(v)) as specified in H.264/H.265.
    ///
    /// Format:
    /// 1. M leading zeros followed by a 1
    /// 2. M more INFO bits
    /// 3. Value = 2^M + INFO - 1
    pub fn read_golomb(&mut self) -> Result<u32> {
        let mut leading_zeros = 0;
        while !self.read_bit()? {
            leading_zeros += 1;
            if leading_zeros > 31 {
                return Err(DemuxError::Codec("Invalid Golomb code".into()));
            }
        }

        if leading_zeros == 0 {
            return Ok(0);
        }

        let info = self.read_bits(leading_zeros)? as u64;
        Ok(((1u64 << leading_zeros) + info - 1) as u32)
    }

    /// Reads a signed exponential Golomb code (se(v)) as specified in H.264/H.265.
    ///
    /// k=0 maps to 0, odd k to +(k+1)/2, even k to -(k/2).
    pub fn read_signed_golomb(&mut self) -> Result<i32> {
        let k = self.read_golomb()?;
        if k == 0 {
            return Ok(0);
        }

        let magnitude = ((k as i64 + 1) >> 1) as i32;
        let sign = if k & 1 == 1 { 1 } else { -1 };
        Ok(sign * magnitude)
    }

    /// Skips n bits in the stream, failing if fewer remain.
    pub fn skip_bits(&mut self, n: u32) -> Result<()> {
        if n as usize > self.remaining_bits() {
            return Err(DemuxError::Codec("Reached end of data".into()));
        }
        let pos = self.bit_position() + n as usize;
        self.byte_offset = pos / 8;
        self.bit_offset = (pos % 8) as u8;
        Ok(())
    }

    /// Aligns reader to next byte boundary by skipping remaining bits in current byte.
    pub fn align_byte(&mut self) {
        if self.bit_offset != 0 {
            self.bit_offset = 0;
            self.byte_offset += 1;
        }
    }

    /// Reads `n <= 32` bits; returns 0 and moves to the end when fewer remain.
    pub fn get_bits(&mut self, n: u32) -> u32 {
        self.get_bits64(n.min(32)) as u32
    }

    /// Reads `n <= 64` bits; returns 0 and moves to the end when fewer remain.
    pub fn get_bits64(&mut self, n: u32) -> u64 {
        if n > 64 || n as usize > self.remaining_bits() {
            self.seek_end();
            return 0;
        }
        self.take(n)
    }

    /// Returns the next `n <= 32` bits without consuming them, or 0 when fewer remain.
    pub fn peek_bits(&self, n: u32) -> u32 {
        let mut probe = self.clone();
        if n > 32 || n as usize > probe.remaining_bits() {
            return 0;
        }
        probe.take(n) as u32
    }

    /// Skips `n` bits, stopping at the end of the data.
    pub fn skip_bits_lenient(&mut self, n: usize) {
        if n > self.remaining_bits() {
            self.seek_end();
            return;
        }
        let pos = self.bit_position() + n;
        self.byte_offset = pos / 8;
        self.bit_offset = (pos % 8) as u8;
    }

    /// Skips `n` bytes, stopping at the end of the data.
    pub fn skip_bytes(&mut self, n: usize) {
        self.skip_bits_lenient(n.saturating_mul(8));
    }

    /// Borrows the next `n` bytes. Fails unless the cursor is byte aligned and
    /// enough bytes remain; the cursor is left untouched on failure.
    pub fn get_aligned_bytes(&mut self, n: usize) -> Option<&'a [u8]> {
        if !self.is_byte_aligned() || n > self.remaining_bytes() {
            return None;
        }
        let start = self.byte_offset;
        self.byte_offset += n;
        Some(&self.data[start..start + n])
    }
}

const BIT_WRITER_GROW_BY: usize = 256;

/// MSB-first bit writer with an internally growing buffer.
///
/// ```
/// use tsdemux::utils::BitWriter;
///
/// let mut writer = BitWriter::new();
/// writer.put_bits(0b101, 3);
/// writer.align_to_bytes(0);
/// assert_eq!(&writer.finish()[..], &[0b1010_0000]);
/// ```
#[derive(Debug, Default)]
pub struct BitWriter {
    buffer: Vec<u8>,
    bit_count: usize,
}

impl BitWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bits written so far.
    pub fn bit_count(&self) -> usize {
        self.bit_count
    }

    /// Returns true when the write position is on a byte boundary.
    pub fn is_byte_aligned(&self) -> bool {
        self.bit_count % 8 == 0
    }

    fn ensure_room(&mut self, bits: usize) {
        let needed = (self.bit_count + bits).div_ceil(8);
        while self.buffer.capacity() < needed {
            self.buffer.reserve_exact(BIT_WRITER_GROW_BY);
        }
        if self.buffer.len() < needed {
            self.buffer.resize(needed, 0);
        }
    }

    /// Appends the low `n <= 32` bits of `value`.
    pub fn put_bits(&mut self, value: u32, n: u32) {
        self.put_bits64(value as u64, n.min(32));
    }

    /// Appends the low `n <= 64` bits of `value`.
    pub fn put_bits64(&mut self, value: u64, n: u32) {
        let n = n.min(64);
        self.ensure_room(n as usize);
        for i in (0..n).rev() {
            if (value >> i) & 1 == 1 {
                self.buffer[self.bit_count / 8] |= 0x80 >> (self.bit_count % 8);
            }
            self.bit_count += 1;
        }
    }

    /// Pads with `fill_bit` (0 or 1) up to the next byte boundary.
    pub fn align_to_bytes(&mut self, fill_bit: u8) {
        while !self.is_byte_aligned() {
            self.put_bits((fill_bit & 1) as u32, 1);
        }
    }

    /// Returns the written bytes (a trailing partial byte is zero padded) and
    /// resets the writer.
    pub fn finish(&mut self) -> Bytes {
        let bytes_used = self.bit_count.div_ceil(8);
        self.buffer.truncate(bytes_used);
        self.bit_count = 0;
        Bytes::from(std::mem::take(&mut self.buffer))
    }
}


#[cfg(test)]
mod tests {
    use super::test_utils::*;
    use super::*;
    use pretty_assertions::assert_eq;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_read_bits() {
        let data = [0b10110011];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(3).unwrap(), 0b101);
        assert_eq!(reader.read_bits(5).unwrap(), 0b10011);

        // Cross-byte boundary
        let data = [0b10110011, 0b01011010];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(3).unwrap(), 0b101);
        assert_eq!(reader.read_bits(8).unwrap(), 0b10011010);

        let data = [0b10101010];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(0).unwrap(), 0);

        let data = [0xFF];
        let mut reader = BitReader::new(&data);
        assert!(reader.read_bits(33).is_err());

        let data = [0b10110011, 0b11001100, 0b10101010];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(20).unwrap(), 0b10110011110011001010);
    }

    #[test]
    fn test_read_golomb() {
        let test_cases = [
            ([0b10000000], 0, "1"),
            ([0b01000000], 1, "010"),
            ([0b01100000], 2, "011"),
            ([0b00100000], 3, "00100"),
            ([0b00110000], 5, "00110"),
            ([0b00101000], 4, "00101"),
            ([0b00111000], 6, "00111"),
            ([0b00010000], 7, "0001000"),
            ([0b00010010], 8, "0001001"),
        ];

        for (input, expected, pattern) in test_cases.iter() {
            let mut reader = BitReader::new(input);
            let result = reader.read_golomb().unwrap();
            assert_eq!(result, *expected, "Failed for pattern {}", pattern);
        }

        let data = [0x00];
        let mut reader = BitReader::new(&data);
        assert!(reader.read_golomb().is_err());
    }

    #[test]
    fn test_signed_golomb() {
        let test_cases = [
            ([0b10000000], 0),
            ([0b01000000], 1),
            ([0b01100000], -1),
            ([0b00100000], 2),
            ([0b00101000], -2),
            ([0b00110000], 3),
            ([0b00111000], -3),
        ];

        for (input, expected) in test_cases.iter() {
            let mut reader = BitReader::new(input);
            assert_eq!(reader.read_signed_golomb().unwrap(), *expected);
        }
    }

    #[test]
    fn test_consecutive_golomb() {
        let values = [3, 5, 1, 0, 4];
        let encoded = encode_multiple_golomb(&values);
        let mut reader = BitReader::new(&encoded);

        for &expected in &values {
            assert_eq!(reader.read_golomb().unwrap(), expected);
        }
    }

    #[test]
    fn test_get_bits_overrun_pins_to_end() {
        let data = [0xAB, 0xCD];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.get_bits(4), 0xA);
        assert_eq!(reader.get_bits(16), 0);
        assert_eq!(reader.remaining_bits(), 0);
        assert_eq!(reader.byte_position(), 2);
        assert_eq!(reader.get_bits(1), 0);
    }

    #[test]
    fn test_peek_does_not_advance() {
        let data = [0x47, 0x1F, 0xFF];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.peek_bits(8), 0x47);
        assert_eq!(reader.peek_bits(8), 0x47);
        assert_eq!(reader.get_bits(8), 0x47);
        assert_eq!(reader.peek_bits(32), 0);
        assert_eq!(reader.get_bits(3), 0);
        assert_eq!(reader.get_bits(13), 0x1FFF);
    }

    #[test]
    fn test_get_bits64() {
        let data = [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0, 0x11];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.get_bits64(64), 0x123456789ABCDEF0);
        assert_eq!(reader.get_bits64(33), 0);
        assert_eq!(reader.remaining_bits(), 0);
    }

    #[test]
    fn test_aligned_bytes() {
        let data = [1, 2, 3, 4];
        let mut reader = BitReader::new(&data);
        reader.get_bits(4);
        assert!(reader.get_aligned_bytes(1).is_none());
        reader.align_byte();
        assert_eq!(reader.get_aligned_bytes(2), Some(&data[1..3]));
        assert!(reader.get_aligned_bytes(2).is_none());
        assert_eq!(reader.remaining_bytes(), 1);
        reader.skip_bytes(10);
        assert_eq!(reader.remaining_bits(), 0);
    }

    #[test]
    fn test_error_cases() {
        let data = [0xFF];
        let mut reader = BitReader::new(&data);
        reader.read_bits(8).unwrap();
        assert!(reader.read_bit().is_err());

        let data = vec![0; 5];
        let mut reader = BitReader::new(&data);
        assert!(reader.read_golomb().is_err());

        let data = [0xFF, 0x00];
        let mut reader = BitReader::new(&data);
        reader.read_bits(3).unwrap();
        assert_eq!(reader.bit_offset, 3);
        reader.align_byte();
        assert_eq!(reader.bit_offset, 0);
        assert_eq!(reader.byte_offset, 1);
        assert!(reader.skip_bits(9).is_err());
    }

    #[test]
    fn test_writer_grows_and_resets() {
        let mut writer = BitWriter::new();
        for i in 0..300u32 {
            writer.put_bits(i & 0xff, 8);
        }
        assert!(writer.buffer.capacity() >= 300);
        let out = writer.finish();
        assert_eq!(out.len(), 300);
        assert_eq!(out[299], (299 & 0xff) as u8);
        assert_eq!(writer.bit_count(), 0);
        assert!(writer.finish().is_empty());
    }

    #[test]
    fn test_writer_align_fill() {
        let mut writer = BitWriter::new();
        writer.put_bits(0, 3);
        writer.align_to_bytes(1);
        writer.put_bits(0xABC, 12);
        assert_eq!(&writer.finish()[..], &[0b0001_1111, 0xAB, 0xC0]);
    }

    #[quickcheck]
    fn prop_read_bits_matches_manual(data: Vec<u8>, n: u8) -> bool {
        let n = (n % 33) as u32;
        let mut reader = BitReader::new(&data);
        match reader.read_bits(n) {
            Ok(result) => {
                let mut expected = 0u64;
                for i in 0..n as usize {
                    let bit = (data[i / 8] >> (7 - (i % 8))) & 1;
                    expected = (expected << 1) | bit as u64;
                }
                result as u64 == expected
            }
            Err(_) => (n as usize) > data.len() * 8,
        }
    }

    #[quickcheck]
    fn prop_writer_reader_agree(fields: Vec<(u32, u8)>) -> bool {
        let fields: Vec<(u32, u32)> = fields
            .into_iter()
            .map(|(v, n)| {
                let n = (n % 32) as u32 + 1;
                (v & (u32::MAX >> (32 - n)), n)
            })
            .collect();
        let mut writer = BitWriter::new();
        for &(value, n) in &fields {
            writer.put_bits(value, n);
        }
        let bytes = writer.finish();
        let mut reader = BitReader::new(&bytes);
        fields.iter().all(|&(value, n)| reader.get_bits(n) == value)
    }

    #[quickcheck]
    fn prop_golomb_sequence(values: Vec<u16>) -> bool {
        let values: Vec<u32> = values.into_iter().map(u32::from).collect();
        let encoded = encode_multiple_golomb(&values);
        let mut reader = BitReader::new(&encoded);
        values.iter().all(|&v| reader.read_golomb().ok() == Some(v))
    }
}
