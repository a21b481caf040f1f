//! Splitting PES payloads into elementary stream access units.
//!
//! Every extractor looks at the unconsumed bytes of a PID (leftover from
//! earlier PES packets followed by the new payload) and cuts one access unit
//! at a time from the front. Bytes that do not yet form a complete unit stay
//! behind as the PID's residual.

use super::pes::PesPacketResult;
use crate::av::{DtsPts, EsPacket};
use crate::codec::aac::parse_adts_header;
use crate::codec::aac::types::ADTS_HEADER_SIZE;
use crate::codec::annexb::parse_bitstream_for_nalus;
use crate::codec::{h264, h265, mpeg_audio};
use bytes::{BufMut, BytesMut};
use log::{debug, warn};

/// Annex-B start code prepended to parameter sets in the CSD.
const START_CODE: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

/// Bytes of one PID not yet turned into access units.
#[derive(Debug, Clone, Default)]
pub struct ResidualPesData {
    /// Timestamps of the PES packet the residual bytes started in.
    pub dts_pts: DtsPts,
    pub data: BytesMut,
}

/// Outcome of cutting one access unit from the front of a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameResult {
    Frame { packet: EsPacket, consumed: usize },
    Truncated,
    Invalid,
}

/// Cuts access units of one elementary stream format.
pub trait FrameExtractor {
    /// Extracts the first access unit in `data`. `flush` is set at end of
    /// stream, when no more bytes will follow.
    fn next_frame(&mut self, data: &[u8], flush: bool) -> FrameResult;
}

/// Timestamps for the access units of one call: the first unit belongs to
/// the PES the residual started in, the rest to the current PES.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameTiming {
    pub first: DtsPts,
    pub current: DtsPts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractSummary {
    /// `Ok` when every byte was consumed.
    pub result: PesPacketResult,
    pub consumed: usize,
    pub frames: u32,
}

/// Runs `extractor` over `data` until it is used up or needs more bytes,
/// appending access units to `out`.
pub fn extract_frames<E: FrameExtractor + ?Sized>(
    extractor: &mut E,
    data: &[u8],
    timing: FrameTiming,
    flush: bool,
    out: &mut Vec<EsPacket>,
) -> ExtractSummary {
    let mut consumed = 0;
    let mut frames = 0u32;
    let result = loop {
        if consumed == data.len() {
            break PesPacketResult::Ok;
        }
        match extractor.next_frame(&data[consumed..], flush) {
            FrameResult::Frame {
                packet,
                consumed: used,
            } => {
                let dts_pts = if frames == 0 {
                    timing.first
                } else {
                    timing.current
                };
                out.push(
                    packet
                        .with_timestamps(dts_pts)
                        .with_sub_packet_num(frames),
                );
                frames += 1;
                consumed += used.max(1);
            }
            FrameResult::Truncated => break PesPacketResult::Truncated,
            FrameResult::Invalid => break PesPacketResult::Invalid,
        }
    };
    ExtractSummary {
        result,
        consumed: consumed.min(data.len()),
        frames,
    }
}

/// AAC in ADTS framing, one raw data block per frame.
#[derive(Debug, Default)]
pub struct AdtsExtractor;

impl FrameExtractor for AdtsExtractor {
    fn next_frame(&mut self, data: &[u8], _flush: bool) -> FrameResult {
        let header = match parse_adts_header(data) {
            Ok(header) => header,
            Err(_) if data.len() < ADTS_HEADER_SIZE => {
                return FrameResult::Truncated
            }
            Err(e) => {
                debug!("ADTS: {}", e);
                return FrameResult::Invalid;
            }
        };

        if header.payload_size() < 0 {
            warn!("ADTS: frame_length {} below header size", header.frame_length);
            return FrameResult::Invalid;
        }
        if header.number_of_raw_blocks > 0 {
            warn!(
                "ADTS: {} raw data blocks per frame not supported",
                header.number_of_raw_blocks + 1
            );
            return FrameResult::Invalid;
        }
        if header.channel_configuration == 0 {
            warn!("ADTS: channel configuration in program config element not supported");
            return FrameResult::Invalid;
        }

        let frame_length = header.frame_length as usize;
        if data.len() < frame_length {
            return FrameResult::Truncated;
        }

        let packet = EsPacket::new(data[header.header_size()..frame_length].to_vec())
            .with_csd(header.audio_specific_config())
            .with_sync_flag(true);
        FrameResult::Frame {
            packet,
            consumed: frame_length,
        }
    }
}

/// MPEG-1/2 audio. Frames of one stream must share version, layer and
/// sampling rate with the first frame seen.
#[derive(Debug)]
pub struct MpegAudioExtractor<'a> {
    pub expected_header: &'a mut Option<u32>,
}

impl FrameExtractor for MpegAudioExtractor<'_> {
    fn next_frame(&mut self, data: &[u8], _flush: bool) -> FrameResult {
        let Some(bytes) = data.get(..mpeg_audio::HEADER_SIZE) else {
            return FrameResult::Truncated;
        };
        let header = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if !mpeg_audio::is_supported_header(header) {
            debug!("MPEG audio: bad frame header 0x{:08x}", header);
            return FrameResult::Invalid;
        }

        let masked = header & mpeg_audio::HEADER_SYNC_MASK;
        match *self.expected_header {
            Some(expected) if expected != masked => {
                warn!(
                    "MPEG audio: header 0x{:08x} does not match stream 0x{:08x}",
                    masked, expected
                );
                return FrameResult::Invalid;
            }
            Some(_) => {}
            None => *self.expected_header = Some(masked),
        }

        let Some(frame_size) = mpeg_audio::frame_size(header) else {
            debug!("MPEG audio: free format frames not supported");
            return FrameResult::Invalid;
        };
        if data.len() < frame_size {
            return FrameResult::Truncated;
        }

        let packet = EsPacket::new(data[..frame_size].to_vec())
            .with_csd(header.to_be_bytes().to_vec())
            .with_sync_flag(true);
        FrameResult::Frame {
            packet,
            consumed: frame_size,
        }
    }
}

/// How an Annex-B video format marks access units and parameter sets.
#[derive(Debug, Clone, Copy)]
pub struct NaluRules {
    pub name: &'static str,
    pub nal_unit_type: fn(u8) -> u8,
    pub access_unit_delimiter: u8,
    pub filler_data: u8,
    pub parameter_sets: &'static [u8],
    pub is_sync: fn(u8) -> bool,
}

pub const AVC_RULES: NaluRules = NaluRules {
    name: "AVC",
    nal_unit_type: h264::nal_unit_type,
    access_unit_delimiter: h264::NAL_AUD,
    filler_data: h264::NAL_FILLER,
    parameter_sets: &[h264::NAL_SPS, h264::NAL_PPS],
    is_sync: is_avc_idr,
};

fn is_avc_idr(nal_type: u8) -> bool {
    nal_type == h264::NAL_SLICE_IDR
}

pub const HEVC_RULES: NaluRules = NaluRules {
    name: "HEVC",
    nal_unit_type: h265::nal_unit_type,
    access_unit_delimiter: h265::NAL_AUD,
    filler_data: h265::NAL_FILLER,
    parameter_sets: &[h265::NAL_VPS, h265::NAL_SPS, h265::NAL_PPS],
    is_sync: h265::is_irap,
};

/// AVC or HEVC byte stream with access unit delimiters. An access unit
/// runs from one AUD to the next, or to the end of data when flushing.
///
/// Parameter sets go to the CSD in Annex-B form; the remaining NAL units
/// are written with 4-byte big-endian sizes.
#[derive(Debug, Clone, Copy)]
pub struct AnnexBExtractor {
    pub rules: NaluRules,
}

impl AnnexBExtractor {
    pub fn avc() -> Self {
        Self { rules: AVC_RULES }
    }

    pub fn hevc() -> Self {
        Self { rules: HEVC_RULES }
    }
}

impl FrameExtractor for AnnexBExtractor {
    fn next_frame(&mut self, data: &[u8], flush: bool) -> FrameResult {
        let rules = &self.rules;
        let Some(nalus) = parse_bitstream_for_nalus(data) else {
            warn!("{}: data does not start with a NAL unit", rules.name);
            return FrameResult::Invalid;
        };

        let nal_type = |index: usize| nalus[index].header_byte(data).map(rules.nal_unit_type);
        let mut delimiters = (0..nalus.len())
            .filter(|&i| nal_type(i) == Some(rules.access_unit_delimiter));

        let Some(first) = delimiters.next() else {
            return FrameResult::Truncated;
        };
        let end = match delimiters.next() {
            Some(second) => second,
            None if flush => nalus.len(),
            None => return FrameResult::Truncated,
        };
        if first > 0 {
            warn!(
                "{}: skipping {} NAL units before access unit delimiter",
                rules.name, first
            );
        }

        let mut csd = BytesMut::new();
        let mut frame = BytesMut::new();
        let mut is_sync_frame = false;
        for nalu in &nalus[first + 1..end] {
            let payload = nalu.payload(data);
            let Some(&header) = payload.first() else {
                continue;
            };
            let nal_type = (rules.nal_unit_type)(header);
            if nal_type == rules.access_unit_delimiter || nal_type == rules.filler_data {
                continue;
            }
            if rules.parameter_sets.contains(&nal_type) {
                csd.put_slice(&START_CODE);
                csd.put_slice(payload);
                continue;
            }
            is_sync_frame |= (rules.is_sync)(nal_type);
            frame.put_u32(payload.len() as u32);
            frame.put_slice(payload);
        }

        let consumed = nalus.get(end).map_or(data.len(), |nalu| nalu.offset);
        FrameResult::Frame {
            packet: EsPacket::new(frame.freeze())
                .with_csd(csd.freeze())
                .with_sync_flag(is_sync_frame),
            consumed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// One mono AAC-LC ADTS frame at 48 kHz.
    fn adts_frame(payload: &[u8]) -> Vec<u8> {
        let frame_length = 7 + payload.len();
        let mut frame = vec![
            0xFF,
            0xF1,
            0x4C, // LC, 48 kHz
            0x40 | ((frame_length >> 11) & 0x03) as u8,
            (frame_length >> 3) as u8,
            (((frame_length & 0x07) << 5) | 0x1F) as u8,
            0xFC,
        ];
        frame.extend_from_slice(payload);
        frame
    }

    fn timing() -> FrameTiming {
        FrameTiming {
            first: DtsPts::new(None, Some(1000)),
            current: DtsPts::new(None, Some(3000)),
        }
    }

    #[test]
    fn test_two_adts_frames() {
        let mut data = adts_frame(&[0x21; 20]);
        data.extend(adts_frame(&[0x42; 30]));
        let mut out = Vec::new();
        let summary = extract_frames(&mut AdtsExtractor, &data, timing(), false, &mut out);
        assert_eq!(summary.result, PesPacketResult::Ok);
        assert_eq!(summary.consumed, data.len());
        assert_eq!(out.len(), 2);
        assert_eq!(&out[0].csd[..], &[0x11, 0x88]);
        assert_eq!(out[0].data.len(), 20);
        assert_eq!(out[0].sub_packet_num, 0);
        assert_eq!(out[0].pts, Some(1000));
        assert_eq!(out[1].data.len(), 30);
        assert_eq!(out[1].sub_packet_num, 1);
        assert_eq!(out[1].pts, Some(3000));
        assert!(out.iter().all(|p| p.is_sync_frame));
    }

    #[test]
    fn test_adts_truncated_and_invalid() {
        let frame = adts_frame(&[0x21; 20]);
        let mut out = Vec::new();
        let summary = extract_frames(&mut AdtsExtractor, &frame[..15], timing(), false, &mut out);
        assert_eq!(summary.result, PesPacketResult::Truncated);
        assert_eq!(summary.consumed, 0);
        assert_eq!(AdtsExtractor.next_frame(&frame[..3], false), FrameResult::Truncated);

        let mut bad = frame.clone();
        bad[1] = 0x0F;
        assert_eq!(AdtsExtractor.next_frame(&bad, false), FrameResult::Invalid);

        // channel configuration 0
        let mut pce = frame.clone();
        pce[2] &= !0x01;
        pce[3] &= 0x3F;
        assert_eq!(AdtsExtractor.next_frame(&pce, false), FrameResult::Invalid);

        // two raw data blocks
        let mut blocks = frame;
        blocks[6] |= 0x01;
        assert_eq!(AdtsExtractor.next_frame(&blocks, false), FrameResult::Invalid);
    }

    fn mpeg_audio_frame(header: u32) -> Vec<u8> {
        let size = mpeg_audio::frame_size(header).unwrap();
        let mut frame = header.to_be_bytes().to_vec();
        frame.resize(size, 0x55);
        frame
    }

    #[test]
    fn test_mpeg_audio_frames() {
        // MPEG-1 layer II, 128 kbps, 48 kHz, stereo
        let header = 0xFFFD_8400;
        let mut data = mpeg_audio_frame(header);
        data.extend(mpeg_audio_frame(header));
        data.extend_from_slice(&[0xFF, 0xFD]);

        let mut expected = None;
        let mut extractor = MpegAudioExtractor {
            expected_header: &mut expected,
        };
        let mut out = Vec::new();
        let summary = extract_frames(&mut extractor, &data, timing(), false, &mut out);
        assert_eq!(summary.result, PesPacketResult::Truncated);
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.consumed, data.len() - 2);
        assert_eq!(out[0].data.len(), 384);
        assert_eq!(&out[0].csd[..], &header.to_be_bytes());
        assert_eq!(expected, Some(header & mpeg_audio::HEADER_SYNC_MASK));
    }

    #[test]
    fn test_mpeg_audio_header_change_rejected() {
        let mut expected = Some(0xFFFD_8400 & mpeg_audio::HEADER_SYNC_MASK);
        let mut extractor = MpegAudioExtractor {
            expected_header: &mut expected,
        };
        // same layer, 44.1 kHz
        let frame = mpeg_audio_frame(0xFFFD_8000);
        assert_eq!(extractor.next_frame(&frame, false), FrameResult::Invalid);
        assert_eq!(
            extractor.next_frame(&[0x12, 0x34, 0x56, 0x78], false),
            FrameResult::Invalid
        );
    }

    fn annexb(nalus: &[&[u8]]) -> Vec<u8> {
        let mut data = Vec::new();
        for nalu in nalus {
            data.extend_from_slice(&START_CODE);
            data.extend_from_slice(nalu);
        }
        data
    }

    #[test]
    fn test_avc_access_units() {
        let data = annexb(&[
            &[0x09, 0xF0],
            &[0x67, 0x42, 0x00, 0x1E],
            &[0x68, 0xCE],
            &[0x65, 0x88, 0x84],
            &[0x0C, 0xFF, 0xFF],
            &[0x09, 0xF0],
            &[0x41, 0x9A],
        ]);
        let mut out = Vec::new();
        let summary = extract_frames(&mut AnnexBExtractor::avc(), &data, timing(), false, &mut out);
        assert_eq!(summary.result, PesPacketResult::Truncated);
        assert_eq!(out.len(), 1);
        assert_eq!(
            &out[0].csd[..],
            &[0, 0, 0, 1, 0x67, 0x42, 0x00, 0x1E, 0, 0, 0, 1, 0x68, 0xCE]
        );
        assert_eq!(&out[0].data[..], &[0, 0, 0, 3, 0x65, 0x88, 0x84]);
        assert!(out[0].is_sync_frame);

        // the second access unit completes only when flushing
        let rest = &data[summary.consumed..];
        assert_eq!(&rest[..6], &[0, 0, 0, 1, 0x09, 0xF0]);
        let mut flushed = Vec::new();
        let summary = extract_frames(&mut AnnexBExtractor::avc(), rest, timing(), true, &mut flushed);
        assert_eq!(summary.result, PesPacketResult::Ok);
        assert_eq!(flushed.len(), 1);
        assert_eq!(&flushed[0].data[..], &[0, 0, 0, 2, 0x41, 0x9A]);
        assert!(flushed[0].csd.is_empty());
        assert!(!flushed[0].is_sync_frame);
    }

    #[test]
    fn test_avc_single_delimiter_waits_for_flush() {
        let data = annexb(&[
            &[0x09, 0xF0],
            &[0x67, 0x42, 0x00, 0x1E],
            &[0x68, 0xCE],
            &[0x65, 0x88, 0x84],
        ]);
        let mut out = Vec::new();
        let summary = extract_frames(&mut AnnexBExtractor::avc(), &data, timing(), false, &mut out);
        assert_eq!(summary.result, PesPacketResult::Truncated);
        assert_eq!(summary.consumed, 0);
        assert!(out.is_empty());

        let summary = extract_frames(&mut AnnexBExtractor::avc(), &data, timing(), true, &mut out);
        assert_eq!(summary.result, PesPacketResult::Ok);
        assert_eq!(out.len(), 1);
        assert_eq!(&out[0].data[..], &[0, 0, 0, 3, 0x65, 0x88, 0x84]);
        assert!(out[0].is_sync_frame);
    }

    #[test]
    fn test_hevc_irap_and_leading_nalus() {
        let data = annexb(&[
            &[0x02, 0x01, 0xAA], // TRAIL_R before the first AUD
            &[0x46, 0x01, 0x50],
            &[0x40, 0x01, 0x0C],
            &[0x42, 0x01, 0x01],
            &[0x44, 0x01, 0xC1],
            &[0x26, 0x01, 0xAF],
        ]);
        let mut out = Vec::new();
        let summary = extract_frames(&mut AnnexBExtractor::hevc(), &data, timing(), true, &mut out);
        assert_eq!(summary.result, PesPacketResult::Ok);
        assert_eq!(out.len(), 1);
        assert!(out[0].is_sync_frame);
        assert_eq!(out[0].csd.len(), 3 * 7);
        assert_eq!(&out[0].data[..], &[0, 0, 0, 3, 0x26, 0x01, 0xAF]);
    }

    #[test]
    fn test_annexb_without_delimiter() {
        let data = annexb(&[&[0x65, 0x88]]);
        assert_eq!(
            AnnexBExtractor::avc().next_frame(&data, true),
            FrameResult::Truncated
        );
        assert_eq!(
            AnnexBExtractor::avc().next_frame(&[0x12, 0, 0, 1, 0x09], false),
            FrameResult::Invalid
        );
    }
}
