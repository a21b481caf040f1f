/// CRC32 as used by MPEG-2 TS PSI sections (ITU-T H.222.0 Annex A).
/// Polynomial: x32 + x26 + x23 + x22 + x16 + x12 + x11 + x10 + x8 + x7 + x5 + x4 + x2 + x + 1
/// Initial value: 0xFFFFFFFF, no final XOR, MSB first.
const CRC32_MPEG2: u32 = 0x04C11DB7;

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u32) << 24;
        let mut bit = 0;
        while bit < 8 {
            crc = if (crc & 0x80000000) != 0 {
                (crc << 1) ^ CRC32_MPEG2
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

static CRC_TABLE: [u32; 256] = build_table();

/// MPEG-2 CRC32 calculator used for PSI section validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc32Mpeg2;

impl Crc32Mpeg2 {
    /// Creates a calculator. The lookup table is built at compile time.
    pub fn new() -> Self {
        Self
    }

    /// Calculates the CRC32 checksum for the given data using the MPEG-2 algorithm
    ///
    /// # Examples
    ///
    /// ```
    /// use tsdemux::utils::Crc32Mpeg2;
    ///
    /// let crc = Crc32Mpeg2::new();
    /// assert_eq!(crc.calculate(&[0x01, 0x01]), 0xD66FB816);
    /// ```
    pub fn calculate(&self, data: &[u8]) -> u32 {
        let mut crc = 0xFFFFFFFF;
        for &byte in data {
            let index = ((crc >> 24) ^ (byte as u32)) & 0xFF;
            crc = (crc << 8) ^ CRC_TABLE[index as usize];
        }
        crc
    }

    /// A section whose trailing CRC_32 field is correct checksums to zero
    /// when the field itself is included.
    pub fn verify_section(&self, section_with_crc: &[u8]) -> bool {
        section_with_crc.len() >= 4 && self.calculate(section_with_crc) == 0
    }
}
