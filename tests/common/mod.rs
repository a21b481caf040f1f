//! Helpers for building transport streams in tests.

#![allow(dead_code)]

use std::collections::HashMap;
use tsdemux::av::EsPacket;
use tsdemux::format::reader::DataReader;
use tsdemux::format::ts::{
    ParseState, PesData, PesPacketResult, TsDemuxer, SYNC_BYTE, TABLE_ID_PAT, TABLE_ID_PMT,
    TS_PACKET_SIZE,
};
use tsdemux::utils::Crc32Mpeg2;

pub const PMT_PID: u16 = 0x100;
pub const AUDIO_PID: u16 = 0x101;
pub const VIDEO_PID: u16 = 0x102;

const TS_PAYLOAD_SIZE: usize = TS_PACKET_SIZE - 4;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Writes 188-byte packets with per-PID continuity counters.
#[derive(Debug, Default)]
pub struct Packetizer {
    counters: HashMap<u16, u8>,
    pub scrambling_control: u8,
    out: Vec<u8>,
}

impl Packetizer {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_counter(&mut self, pid: u16) -> u8 {
        let counter = self.counters.entry(pid).or_insert(0);
        let value = *counter;
        *counter = (value + 1) & 0x0f;
        value
    }

    /// One packet. Short payloads are padded with adaptation field stuffing.
    pub fn packet(
        &mut self,
        pid: u16,
        start: bool,
        random_access: bool,
        pcr: Option<u64>,
        payload: &[u8],
    ) {
        let flags_len = match (random_access, pcr) {
            (_, Some(_)) => 7,
            (true, None) => 1,
            (false, None) => 0,
        };
        let has_adaptation = flags_len > 0 || payload.len() < TS_PAYLOAD_SIZE;
        if has_adaptation {
            assert!(payload.len() + 1 + flags_len <= TS_PAYLOAD_SIZE);
        }

        let cc = self.next_counter(pid);
        let mut packet = vec![
            SYNC_BYTE,
            ((start as u8) << 6) | ((pid >> 8) as u8 & 0x1f),
            pid as u8,
            (self.scrambling_control << 6) | ((has_adaptation as u8) << 5) | 0x10 | cc,
        ];
        if has_adaptation {
            let field_length = TS_PAYLOAD_SIZE - 1 - payload.len();
            packet.push(field_length as u8);
            if field_length > 0 {
                let mut flags = 0u8;
                if random_access {
                    flags |= 0x40;
                }
                if pcr.is_some() {
                    flags |= 0x10;
                }
                packet.push(flags);
                if let Some(pcr) = pcr {
                    let base = pcr / 300;
                    let ext = pcr % 300;
                    packet.extend_from_slice(&[
                        (base >> 25) as u8,
                        (base >> 17) as u8,
                        (base >> 9) as u8,
                        (base >> 1) as u8,
                        (((base & 1) << 7) as u8) | 0x7e | (ext >> 8) as u8,
                        ext as u8,
                    ]);
                }
                packet.resize(5 + field_length, 0xff);
            }
        }
        packet.extend_from_slice(payload);
        assert_eq!(packet.len(), TS_PACKET_SIZE);
        self.out.extend(packet);
    }

    /// A PSI section behind a zero pointer_field, 0xff stuffed.
    pub fn section(&mut self, pid: u16, section: &[u8]) {
        let mut data = vec![0x00];
        data.extend_from_slice(section);
        for (i, chunk) in data.chunks(TS_PAYLOAD_SIZE).enumerate() {
            let mut payload = chunk.to_vec();
            payload.resize(TS_PAYLOAD_SIZE, 0xff);
            self.packet(pid, i == 0, false, None, &payload);
        }
    }

    /// A PES packet split over as many packets as needed.
    pub fn pes(&mut self, pid: u16, pes: &[u8], random_access: bool, pcr: Option<u64>) {
        let mut rest = pes;
        let mut first = true;
        while first || !rest.is_empty() {
            let overhead = match (first, random_access, pcr) {
                (true, _, Some(_)) => 8,
                (true, true, None) => 2,
                _ => 0,
            };
            let take = rest.len().min(TS_PAYLOAD_SIZE - overhead);
            self.packet(
                pid,
                first,
                first && random_access,
                if first { pcr } else { None },
                &rest[..take],
            );
            rest = &rest[take..];
            first = false;
        }
    }

    pub fn packet_count(&self) -> usize {
        self.out.len() / TS_PACKET_SIZE
    }

    /// Removes the packet at `index`, as if it was lost.
    pub fn drop_packet(&mut self, index: usize) {
        let start = index * TS_PACKET_SIZE;
        self.out.drain(start..start + TS_PACKET_SIZE);
    }

    /// Hands out what was written so far; counters carry on.
    pub fn take_bytes(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.out)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.out
    }
}

/// A long-form section with CRC_32.
pub fn psi_section(table_id: u8, extension: u16, version: u8, body: &[u8]) -> Vec<u8> {
    let length = 5 + body.len() + 4;
    let mut section = vec![table_id, 0xB0 | (length >> 8) as u8, length as u8];
    section.extend_from_slice(&extension.to_be_bytes());
    section.extend_from_slice(&[0xC1 | (version << 1), 0x00, 0x00]);
    section.extend_from_slice(body);
    let crc = Crc32Mpeg2::new().calculate(&section);
    section.extend_from_slice(&crc.to_be_bytes());
    section
}

/// PAT for `(program_number, pmt_pid)` pairs.
pub fn pat_section(version: u8, programs: &[(u16, u16)]) -> Vec<u8> {
    let mut body = Vec::new();
    for &(program_number, pid) in programs {
        body.extend_from_slice(&program_number.to_be_bytes());
        body.extend_from_slice(&[0xE0 | (pid >> 8) as u8, pid as u8]);
    }
    psi_section(TABLE_ID_PAT, 1, version, &body)
}

/// PMT for `(stream_type, elementary_pid)` pairs, no descriptors.
pub fn pmt_section(program_number: u16, version: u8, pcr_pid: u16, streams: &[(u8, u16)]) -> Vec<u8> {
    let mut body = vec![0xE0 | (pcr_pid >> 8) as u8, pcr_pid as u8, 0xF0, 0x00];
    for &(stream_type, pid) in streams {
        body.extend_from_slice(&[stream_type, 0xE0 | (pid >> 8) as u8, pid as u8, 0xF0, 0x00]);
    }
    psi_section(TABLE_ID_PMT, program_number, version, &body)
}

/// AAC-LC, 44.1 kHz, stereo ADTS frame without CRC.
pub fn adts_frame(payload_len: usize, fill: u8) -> Vec<u8> {
    let frame_length = 7 + payload_len;
    let mut frame = vec![
        0xFF,
        0xF1,
        0x50,
        0x80 | ((frame_length >> 11) & 0x03) as u8,
        (frame_length >> 3) as u8,
        (((frame_length & 0x07) << 5) | 0x1F) as u8,
        0xFC,
    ];
    frame.resize(frame_length, fill);
    frame
}

/// AudioSpecificConfig matching `adts_frame`.
pub const ADTS_CSD: [u8; 2] = [0x12, 0x10];

/// H.264 Constrained Baseline 1280x720 SPS, level 3.1.
pub const H264_SPS: [u8; 9] = [0x67, 0x42, 0x00, 0x1F, 0xDA, 0x01, 0x40, 0x16, 0xE4];
pub const H264_PPS: [u8; 4] = [0x68, 0xCE, 0x38, 0x80];
pub const H264_AUD: [u8; 2] = [0x09, 0xF0];
pub const H264_IDR: [u8; 5] = [0x65, 0x88, 0x84, 0x21, 0xA0];
pub const H264_SLICE: [u8; 4] = [0x41, 0x9A, 0x02, 0x03];

/// Annex-B byte stream of the given NAL units.
pub fn annexb(nalus: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for nalu in nalus {
        out.extend_from_slice(&[0, 0, 0, 1]);
        out.extend_from_slice(nalu);
    }
    out
}

/// Everything the demuxer produced for one stream.
#[derive(Debug, Default)]
pub struct Demuxed {
    pub new_programs: usize,
    pub pes: Vec<PesData>,
    pub results: Vec<PesPacketResult>,
    pub frames: Vec<EsPacket>,
    pub final_state: Option<ParseState>,
}

/// Runs `demuxer` to completion, selecting `pids` of the first program
/// whenever a program is announced.
pub fn demux_all<R: DataReader + ?Sized>(
    demuxer: &mut TsDemuxer,
    reader: &mut R,
    pids: &[u16],
) -> Demuxed {
    let mut demuxed = Demuxed::default();
    loop {
        match demuxer.parse(reader) {
            ParseState::Continue => {}
            ParseState::NewProgram => {
                demuxed.new_programs += 1;
                let program = demuxer
                    .current_program_table()
                    .and_then(|table| table.keys().next().copied());
                demuxer.select_program_streams(program, pids);
            }
            ParseState::HavePESPacket => {
                while let Some(pes) = demuxer.get_pes_packet() {
                    let result = demuxer.parse_pes_packet(&mut demuxed.frames, &pes);
                    demuxed.results.push(result);
                    demuxed.pes.push(pes);
                }
            }
            state => {
                demuxed.final_state = Some(state);
                return demuxed;
            }
        }
    }
}
