//! Annex-B byte stream framing shared by H.264 and H.265.

/// Location of one NAL unit inside an Annex-B buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NaluInfo {
    /// Offset of the start code.
    pub offset: usize,
    /// Start code length, 3 or 4.
    pub unit_length: usize,
    /// NAL unit size in bytes, header included, start code and trailing
    /// zero bytes excluded.
    pub size: usize,
}

impl NaluInfo {
    /// Offset of the NAL unit header.
    pub fn payload_start(&self) -> usize {
        self.offset + self.unit_length
    }

    pub fn payload_end(&self) -> usize {
        self.payload_start() + self.size
    }

    /// The NAL unit bytes in `data`.
    pub fn payload<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        data.get(self.payload_start()..self.payload_end())
            .unwrap_or(&[])
    }

    /// First byte of the NAL unit header, if the unit is not empty.
    pub fn header_byte(&self, data: &[u8]) -> Option<u8> {
        self.payload(data).first().copied()
    }
}

fn find_start_code(data: &[u8], from: usize) -> Option<usize> {
    data.get(from..)?
        .windows(3)
        .position(|w| w == [0, 0, 1])
        .map(|pos| pos + from)
}

/// Splits an Annex-B buffer into NAL units.
///
/// Returns `None` when the buffer holds anything but zero bytes before the
/// first start code. An empty buffer yields an empty list.
pub fn parse_bitstream_for_nalus(data: &[u8]) -> Option<Vec<NaluInfo>> {
    let mut nalus: Vec<NaluInfo> = Vec::new();
    let Some(first) = find_start_code(data, 0) else {
        return data.iter().all(|&b| b == 0).then(Vec::new);
    };
    if data[..first].iter().any(|&b| b != 0) {
        return None;
    }

    let mut code_pos = first;
    loop {
        let (offset, unit_length) = if code_pos > 0 && data[code_pos - 1] == 0 {
            (code_pos - 1, 4)
        } else {
            (code_pos, 3)
        };
        let start = code_pos + 3;
        let next = find_start_code(data, start);
        let mut end = next.unwrap_or(data.len());
        while end > start && data[end - 1] == 0 {
            end -= 1;
        }
        nalus.push(NaluInfo {
            offset,
            unit_length,
            size: end - start,
        });
        match next {
            Some(pos) => code_pos = pos,
            None => break,
        }
    }
    Some(nalus)
}

/// Drops the 0x03 in every `00 00 03` sequence.
pub fn remove_emulation_prevention(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut zeros = 0;
    for &byte in data {
        if zeros >= 2 && byte == 0x03 {
            zeros = 0;
            continue;
        }
        zeros = if byte == 0 { zeros + 1 } else { 0 };
        out.push(byte);
    }
    out
}
