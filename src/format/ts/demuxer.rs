use super::extract::*;
use super::parser::TSPacket;
use super::pes::{apply_timestamp_offset, PESHeader, PesData, PesPacketResult};
use super::pid_stream::{Continuity, PacketContext, PidOutput, PidStream, PidStreamKind};
use super::psi::*;
use super::types::*;
use crate::av::{make_4cc, CodecType, DtsPts, EsPacket, Resolution, StreamCodecInformation};
use crate::codec::aac::parse_audio_specific_config;
use crate::codec::annexb::parse_bitstream_for_nalus;
use crate::codec::{h264, h265, mpeg_audio};
use crate::config::{ParserConfig, SourceInfo};
use crate::error::{DemuxError, Result};
use crate::format::reader::{DataReader, SliceReader};
use bytes::{Buf, BytesMut};
use log::{debug, error, info, trace, warn};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Programs announced so far: program_number to its PMT.
pub type ProgramTable = BTreeMap<u16, ProgramMap>;

/// What `parse` stopped for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    Continue,
    /// A PMT was activated. Select streams, then call `parse` again.
    NewProgram,
    /// PES packets are waiting in `get_pes_packet`.
    HavePESPacket,
    /// The source is exhausted and everything has been flushed.
    EOS,
    /// Unrecoverable stream error, see `last_error`.
    Failed,
    /// The byte source failed, see `last_error`.
    ReadError,
}

#[derive(Debug, Clone, Default)]
struct StreamSelection {
    program_number: Option<u16>,
    pids: Vec<u16>,
}

/// MPEG transport stream demuxer.
///
/// The demuxer is driven by the caller: `parse` reads 188-byte packets from a
/// [`DataReader`] until something happens, reassembles PSI sections and PES
/// packets per PID, and hands PES packets out through `get_pes_packet`.
/// `parse_pes_packet` then cuts them into access units.
///
/// ```rust
/// use tsdemux::config::SourceInfo;
/// use tsdemux::format::reader::SliceReader;
/// use tsdemux::format::ts::{ParseState, TsDemuxer};
///
/// let mut demuxer = TsDemuxer::new();
/// assert_eq!(demuxer.begin_parsing(SourceInfo::default()), ParseState::Continue);
///
/// // two null packets and nothing else
/// let mut data = vec![0u8; 376];
/// for packet in data.chunks_mut(188) {
///     packet[..4].copy_from_slice(&[0x47, 0x1f, 0xff, 0x10]);
/// }
/// let mut reader = SliceReader::new(data);
/// let mut state = demuxer.parse(&mut reader);
/// while state == ParseState::Continue {
///     state = demuxer.parse(&mut reader);
/// }
/// assert_eq!(state, ParseState::EOS);
/// ```
#[derive(Debug)]
pub struct TsDemuxer {
    state: ParseState,
    config: ParserConfig,
    init_reader: Option<SliceReader>,
    init_offset: u64,
    init_segment_consumed: bool,
    source_offset: u64,
    reached_eos: bool,
    pid_streams: BTreeMap<u16, PidStream>,
    program_association: Option<ProgramAssociation>,
    program_table: ProgramTable,
    services: Vec<ServiceDescription>,
    pending_selection: Option<StreamSelection>,
    available_pes_packets: VecDeque<PesData>,
    residuals: BTreeMap<u16, ResidualPesData>,
    expected_mpeg_headers: BTreeMap<u16, u32>,
    flushed_pids: BTreeSet<u16>,
    last_error: Option<DemuxError>,
}

impl Default for TsDemuxer {
    fn default() -> Self {
        Self::new()
    }
}

impl TsDemuxer {
    /// Creates a demuxer ready to parse with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ParserConfig::default())
    }

    fn with_config(config: ParserConfig) -> Self {
        Self {
            state: ParseState::Continue,
            config,
            init_reader: None,
            init_offset: 0,
            init_segment_consumed: false,
            source_offset: 0,
            reached_eos: false,
            pid_streams: BTreeMap::new(),
            program_association: None,
            program_table: ProgramTable::new(),
            services: Vec::new(),
            pending_selection: None,
            available_pes_packets: VecDeque::new(),
            residuals: BTreeMap::new(),
            expected_mpeg_headers: BTreeMap::new(),
            flushed_pids: BTreeSet::new(),
            last_error: None,
        }
    }

    /// Resets all state and starts a new session.
    ///
    /// An init segment, when given, is parsed before the first byte of the
    /// main source. It must hold whole transport packets.
    pub fn begin_parsing(&mut self, source: SourceInfo) -> ParseState {
        *self = Self::with_config(source.config);
        if let Some(init) = source.init_segment.filter(|init| !init.is_empty()) {
            if init.len() % TS_PACKET_SIZE != 0 || init[0] != SYNC_BYTE {
                self.state = self.fail(DemuxError::InvalidData(format!(
                    "init segment of {} bytes is not a sequence of transport packets",
                    init.len()
                )));
                return self.state;
            }
            debug!("priming with {} byte init segment", init.len());
            self.init_reader = Some(SliceReader::new(init));
        }
        self.state
    }

    /// Runs the parser until it has something to report.
    pub fn parse<R: DataReader + ?Sized>(&mut self, reader: &mut R) -> ParseState {
        loop {
            match self.state {
                ParseState::Continue => match self.parse_next_packet(reader) {
                    ParseState::Continue => continue,
                    ParseState::EOS => {
                        self.state = ParseState::EOS;
                        return ParseState::Continue;
                    }
                    other => {
                        self.state = other;
                        return other;
                    }
                },
                ParseState::NewProgram => {
                    self.activate_user_stream_selection();
                    self.state = ParseState::Continue;
                }
                ParseState::HavePESPacket => {
                    if !self.available_pes_packets.is_empty() {
                        return ParseState::HavePESPacket;
                    }
                    self.state = ParseState::Continue;
                }
                ParseState::EOS => return self.flush_at_end_of_stream(),
                ParseState::Failed | ParseState::ReadError => return self.state,
            }
        }
    }

    /// Queues the streams to enable; applied when the next `NewProgram` is
    /// acknowledged by calling `parse`. `None` disables all streams.
    pub fn select_program_streams(&mut self, program_number: Option<u16>, pids: &[u16]) {
        self.pending_selection = Some(StreamSelection {
            program_number,
            pids: pids.to_vec(),
        });
    }

    /// Takes the oldest reassembled PES packet.
    pub fn get_pes_packet(&mut self) -> Option<PesData> {
        self.available_pes_packets.pop_front()
    }

    /// Programs whose PMT has been activated, if any.
    pub fn current_program_table(&self) -> Option<&ProgramTable> {
        (!self.program_table.is_empty()).then_some(&self.program_table)
    }

    /// The active program association, once a PAT has been seen.
    pub fn program_association(&self) -> Option<&ProgramAssociation> {
        self.program_association.as_ref()
    }

    /// Services from the DVB service description table.
    pub fn services(&self) -> &[ServiceDescription] {
        &self.services
    }

    pub fn last_error(&self) -> Option<&DemuxError> {
        self.last_error.as_ref()
    }

    pub fn has_reached_eos(&self) -> bool {
        self.reached_eos
    }

    /// Returns true when PES data of `pid` is currently delivered.
    pub fn is_stream_enabled(&self, pid: u16) -> bool {
        self.pid_streams.get(&pid).map_or(false, PidStream::is_enabled)
    }

    fn fail(&mut self, err: DemuxError) -> ParseState {
        error!("demuxing failed: {}", err);
        self.last_error = Some(err);
        ParseState::Failed
    }

    fn read_packet<R: DataReader + ?Sized>(
        &mut self,
        reader: &mut R,
        packet: &mut [u8],
    ) -> Result<usize> {
        if let Some(init) = self.init_reader.as_mut() {
            let read = init.read_data(packet, self.init_offset)?;
            if read > 0 {
                self.init_offset += read as u64;
                return Ok(read);
            }
            debug!("init segment consumed after {} bytes", self.init_offset);
            self.init_reader = None;
            self.init_segment_consumed = true;
        }
        let read = reader.read_data(packet, self.source_offset)?;
        self.source_offset += read as u64;
        Ok(read)
    }

    fn parse_next_packet<R: DataReader + ?Sized>(&mut self, reader: &mut R) -> ParseState {
        let mut packet = [0u8; TS_PACKET_SIZE];
        let read = match self.read_packet(reader, &mut packet) {
            Ok(read) => read,
            Err(e) => {
                warn!("reading transport packet failed: {}", e);
                self.last_error = Some(e);
                return ParseState::ReadError;
            }
        };
        if read == 0 {
            debug!("end of stream after {} bytes", self.source_offset);
            self.reached_eos = true;
            return ParseState::EOS;
        }
        if read != TS_PACKET_SIZE {
            let err = DemuxError::ReadError(format!(
                "short read of {} bytes at offset {}",
                read,
                self.source_offset - read as u64
            ));
            warn!("{}", err);
            self.last_error = Some(err);
            return ParseState::ReadError;
        }
        self.process_packet(&packet)
    }

    fn process_packet(&mut self, data: &[u8]) -> ParseState {
        if data[0] != SYNC_BYTE {
            return self.fail(DemuxError::InvalidData(format!(
                "lost sync at offset {}: 0x{:02x}",
                self.source_offset.saturating_sub(TS_PACKET_SIZE as u64),
                data[0]
            )));
        }
        let packet = match TSPacket::parse(data) {
            Ok(packet) => packet,
            Err(e) => {
                debug!("dropping transport packet: {}", e);
                return ParseState::Continue;
            }
        };
        let header = &packet.header;
        if header.is_discardable() {
            trace!("PID {}: adaptation_field_control 0, discarded", header.pid);
            return ParseState::Continue;
        }
        if header.is_scrambled() {
            return self.fail(DemuxError::Unsupported(format!(
                "PID {} is scrambled (transport_scrambling_control {})",
                header.pid, header.scrambling_control
            )));
        }
        let pid = header.pid;
        if is_reserved_pid(pid) {
            return ParseState::Continue;
        }
        if !self.pid_streams.contains_key(&pid) {
            if !is_implicit_section_pid(pid) {
                return ParseState::Continue;
            }
            self.pid_streams.insert(pid, PidStream::new_section(pid, None));
        }
        if !header.contains_payload {
            return ParseState::Continue;
        }

        let mut units = Vec::new();
        if let Some(stream) = self.pid_streams.get_mut(&pid) {
            let continuity =
                stream.check_continuity(header.continuity_counter, packet.discontinuity());
            match continuity {
                Continuity::Duplicate => {
                    trace!("PID {}: duplicate packet dropped", pid);
                    return ParseState::Continue;
                }
                Continuity::Error => {
                    debug!(
                        "PID {}: continuity error at counter {}",
                        pid, header.continuity_counter
                    );
                }
                Continuity::InOrder => {}
            }
            let ctx = PacketContext {
                is_start: header.payload_unit_start,
                transport_error: header.transport_error,
                random_access: packet.random_access(),
                pcr: packet.pcr(),
                continuity_error: continuity == Continuity::Error,
            };
            if !stream.process_payload(packet.payload, &ctx, &mut units) {
                trace!("PID {}: dropped {} payload bytes", pid, packet.payload.len());
            }
        }

        let mut new_program = false;
        for unit in units {
            match unit {
                PidOutput::Section(section) => match self.handle_psi_table(pid, &section) {
                    Ok(activated) => new_program |= activated,
                    Err(e) => debug!("PID {}: section rejected: {}", pid, e),
                },
                PidOutput::Pes(pes) => self.available_pes_packets.push_back(pes),
            }
        }

        if new_program {
            ParseState::NewProgram
        } else if !self.available_pes_packets.is_empty() {
            ParseState::HavePESPacket
        } else {
            ParseState::Continue
        }
    }

    /// Program tables from the main source are ignored when configured and
    /// the init segment already established them.
    fn ignores_program_stream(&self) -> bool {
        self.config.ignore_program_stream
            && self.init_segment_consumed
            && self.program_association.is_some()
    }

    /// Returns true when a program was activated.
    fn handle_psi_table(&mut self, pid: u16, section: &[u8]) -> Result<bool> {
        let header = parse_section_header(section)?;
        if header.table_id <= TABLE_ID_TSDT && self.ignores_program_stream() {
            trace!("PID {}: ignoring table_id {}", pid, header.table_id);
            return Ok(false);
        }

        match header.table_id {
            TABLE_ID_PAT if pid == PID_PAT => {
                let (table, body) = split_long_section(section)?;
                self.process_pat(&table, body)
            }
            TABLE_ID_PMT => {
                let (table, body) = split_long_section(section)?;
                self.process_pmt(pid, &table, body)
            }
            TABLE_ID_SDT if pid == PID_SDT => {
                let (table, body) = split_long_section(section)?;
                if table.current_next {
                    let sdt = parse_sdt(&table, body)?;
                    debug!(
                        "SDT version {} with {} services",
                        sdt.version_number,
                        sdt.services.len()
                    );
                    for service in sdt.services {
                        match self
                            .services
                            .iter_mut()
                            .find(|s| s.service_id == service.service_id)
                        {
                            Some(existing) => *existing = service,
                            None => self.services.push(service),
                        }
                    }
                }
                Ok(false)
            }
            table_id => {
                trace!("PID {}: table_id 0x{:02x} not handled", pid, table_id);
                Ok(false)
            }
        }
    }

    fn process_pat(&mut self, table: &TableHeader, body: &[u8]) -> Result<bool> {
        if !table.current_next {
            return Ok(false);
        }
        if let Some(current) = &self.program_association {
            if current.version_number != table.version_number {
                warn!(
                    "PAT version change {} -> {} not supported, ignored",
                    current.version_number, table.version_number
                );
            }
            return Ok(false);
        }

        let pat = parse_pat(table, body)?;
        info!(
            "PAT version {} with {} programs",
            pat.version_number,
            pat.programs.len()
        );
        if let Some(network_pid) = pat.network_pid {
            debug!("network information on PID {}", network_pid);
        }
        for (&program_number, &pmt_pid) in &pat.programs {
            self.pid_streams
                .entry(pmt_pid)
                .or_insert_with(|| PidStream::new_section(pmt_pid, Some(program_number)));
        }
        self.program_association = Some(pat);
        Ok(false)
    }

    fn process_pmt(&mut self, pid: u16, table: &TableHeader, body: &[u8]) -> Result<bool> {
        if !table.current_next {
            return Ok(false);
        }
        let program_number = table.table_id_extension;
        let Some(pat) = &self.program_association else {
            debug!("PMT for program {} before any PAT, ignored", program_number);
            return Ok(false);
        };
        match pat.programs.get(&program_number) {
            Some(&pmt_pid) if pmt_pid == pid => {}
            Some(&pmt_pid) => warn!(
                "PMT of program {} on PID {}, PAT announced PID {}",
                program_number, pid, pmt_pid
            ),
            None => warn!("PMT for program {} not listed in the PAT", program_number),
        }

        if let Some(current) = self.program_table.get(&program_number) {
            if current.version_number != table.version_number {
                warn!(
                    "PMT version change {} -> {} for program {} not supported, ignored",
                    current.version_number, table.version_number, program_number
                );
            }
            return Ok(false);
        }

        let pmt = parse_pmt(table, body, pid)?;
        for (&es_pid, stream) in &pmt.streams {
            if es_pid < FIRST_ELEMENTARY_PID || is_reserved_pid(es_pid) {
                warn!("program {}: PID {} cannot carry a stream", program_number, es_pid);
                continue;
            }
            if self.pid_streams.contains_key(&es_pid) {
                warn!(
                    "program {}: PID {} is already in use, stream not added",
                    program_number, es_pid
                );
                continue;
            }
            debug!(
                "program {}: PID {} stream_type 0x{:02x} ({:?})",
                program_number, es_pid, stream.stream_type, stream.codec_info.codec
            );
            self.pid_streams.insert(
                es_pid,
                PidStream::new_pes(es_pid, program_number, stream.stream_type),
            );
        }
        info!(
            "program {} activated: PCR PID {}, {} streams",
            program_number,
            pmt.pcr_pid,
            pmt.streams.len()
        );
        self.program_table.insert(program_number, pmt);
        Ok(true)
    }

    fn activate_user_stream_selection(&mut self) {
        let Some(selection) = self.pending_selection.take() else {
            info!("new program available, no stream selection pending");
            return;
        };

        for stream in self.pid_streams.values_mut() {
            if stream.kind == PidStreamKind::Pes {
                stream.disable();
            }
        }
        self.residuals.clear();
        self.expected_mpeg_headers.clear();
        self.flushed_pids.clear();

        let Some(program_number) = selection.program_number else {
            debug!("all streams deselected");
            return;
        };
        let Some(program) = self.program_table.get(&program_number) else {
            info!("selected program {} is not available", program_number);
            return;
        };
        for pid in selection.pids {
            if pid < FIRST_ELEMENTARY_PID {
                warn!("PID {} cannot be selected as an elementary stream", pid);
                continue;
            }
            if !program.streams.contains_key(&pid) {
                info!("PID {} is not part of program {}", pid, program_number);
                continue;
            }
            match self.pid_streams.get_mut(&pid) {
                Some(stream) if stream.kind == PidStreamKind::Pes => {
                    debug!("PID {} enabled", pid);
                    stream.enable();
                }
                _ => warn!("no elementary stream for PID {}", pid),
            }
        }
    }

    /// Closes open PES packets, then asks for a flush of every residual.
    /// Stays in `EOS` while handing those out.
    fn flush_at_end_of_stream(&mut self) -> ParseState {
        for (&pid, stream) in self.pid_streams.iter_mut() {
            if let Some(pes) = stream.finish_current_pes_packet() {
                debug!("PID {}: closing PES packet at end of stream", pid);
                self.available_pes_packets.push_back(pes);
                return ParseState::HavePESPacket;
            }
            if self.residuals.contains_key(&pid) && self.flushed_pids.insert(pid) {
                self.available_pes_packets.push_back(PesData {
                    pid,
                    stream_type: stream.stream_type,
                    packet_data: None,
                    random_access: false,
                    pcr: None,
                });
                return ParseState::HavePESPacket;
            }
        }
        if !self.available_pes_packets.is_empty() {
            return ParseState::HavePESPacket;
        }
        self.residuals.clear();
        ParseState::EOS
    }

    fn timestamps(&self, header: &PESHeader) -> DtsPts {
        let offset = self.config.timestamp_offset;
        DtsPts::new(
            header.dts.map(|ts| apply_timestamp_offset(ts, offset)),
            header.pts.map(|ts| apply_timestamp_offset(ts, offset)),
        )
    }

    /// Cuts a PES packet into access units appended to `out`.
    ///
    /// Bytes that do not complete an access unit are kept for the next PES
    /// packet of the same PID, and the result is `Ok`. After end of stream the
    /// kept bytes are flushed instead.
    pub fn parse_pes_packet(&mut self, out: &mut Vec<EsPacket>, pes: &PesData) -> PesPacketResult {
        let flush = self.state == ParseState::EOS;

        let (current, payload): (DtsPts, &[u8]) = match &pes.packet_data {
            Some(data) => match PESHeader::parse(data) {
                Ok(header) => (self.timestamps(&header), &data[header.payload_offset..]),
                Err(result) => {
                    debug!("PID {}: PES packet rejected: {:?}", pes.pid, result);
                    return result;
                }
            },
            None if flush => (DtsPts::default(), &[]),
            None => return PesPacketResult::Invalid,
        };

        let kind = ElementaryStreamKind::from_stream_type(pes.stream_type);
        if kind == ElementaryStreamKind::Unknown {
            return PesPacketResult::NotSupported;
        }

        let (first, mut data) = match self.residuals.remove(&pes.pid) {
            Some(residual) => (residual.dts_pts, residual.data),
            None => (current, BytesMut::new()),
        };
        data.extend_from_slice(payload);
        let timing = FrameTiming { first, current };

        let mut frames = Vec::new();
        let summary = match kind {
            ElementaryStreamKind::AACADTS => {
                extract_frames(&mut AdtsExtractor, &data, timing, flush, &mut frames)
            }
            ElementaryStreamKind::MPEG1Audio => {
                let mut expected = self.expected_mpeg_headers.get(&pes.pid).copied();
                let mut extractor = MpegAudioExtractor {
                    expected_header: &mut expected,
                };
                let summary = extract_frames(&mut extractor, &data, timing, flush, &mut frames);
                if let Some(header) = expected {
                    self.expected_mpeg_headers.insert(pes.pid, header);
                }
                summary
            }
            ElementaryStreamKind::AVC => {
                extract_frames(&mut AnnexBExtractor::avc(), &data, timing, flush, &mut frames)
            }
            ElementaryStreamKind::HEVC => {
                extract_frames(&mut AnnexBExtractor::hevc(), &data, timing, flush, &mut frames)
            }
            ElementaryStreamKind::Unknown => return PesPacketResult::NotSupported,
        };

        let result = match summary.result {
            PesPacketResult::Invalid => {
                warn!(
                    "PID {}: incorrect multiplex, dropping {} bytes",
                    pes.pid,
                    data.len()
                );
                return PesPacketResult::Invalid;
            }
            PesPacketResult::Truncated if !flush => {
                data.advance(summary.consumed);
                let dts_pts = if summary.frames > 0 { current } else { first };
                self.residuals
                    .insert(pes.pid, ResidualPesData { dts_pts, data });
                PesPacketResult::Ok
            }
            PesPacketResult::Truncated => {
                debug!(
                    "PID {}: {} trailing bytes dropped at end of stream",
                    pes.pid,
                    data.len() - summary.consumed
                );
                PesPacketResult::Truncated
            }
            result => result,
        };

        out.extend(frames.into_iter().map(|mut frame| {
            frame.stream_type = pes.stream_type;
            frame
        }));
        result
    }

    /// Decoder configuration described by an access unit's CSD.
    pub fn parse_csd(packet: &EsPacket) -> Option<StreamCodecInformation> {
        match ElementaryStreamKind::from_stream_type(packet.stream_type) {
            ElementaryStreamKind::MPEG1Audio => parse_mpeg_audio_csd(packet),
            ElementaryStreamKind::AACADTS => parse_aac_csd(packet),
            ElementaryStreamKind::AVC => parse_avc_csd(packet),
            ElementaryStreamKind::HEVC => parse_hevc_csd(packet),
            ElementaryStreamKind::Unknown => None,
        }
    }
}

fn parse_mpeg_audio_csd(packet: &EsPacket) -> Option<StreamCodecInformation> {
    let csd: [u8; 4] = packet.csd.as_ref().try_into().ok()?;
    let header = u32::from_be_bytes(csd);
    if !mpeg_audio::is_supported_header(header) {
        return None;
    }
    let mut info = StreamCodecInformation::for_codec(CodecType::MPEGAudio);
    info.mime_type = "audio/mpeg".into();
    info.codec_4cc = make_4cc(b"mpga");
    info.profile = mpeg_audio::version(header)?.number();
    info.profile_level = mpeg_audio::layer(header)?;
    info.codec_specifier_rfc6381 = "mp4a.6b".into();
    info.sampling_rate = mpeg_audio::sampling_rate(header)?;
    info.num_channels = mpeg_audio::channel_count(header);
    info.samples_per_block = mpeg_audio::samples_per_frame(header)?;
    info.codec_specific_data = packet.csd.clone();
    Some(info)
}

fn parse_aac_csd(packet: &EsPacket) -> Option<StreamCodecInformation> {
    let config = match parse_audio_specific_config(&packet.csd) {
        Ok(config) => config,
        Err(e) => {
            debug!("AudioSpecificConfig not usable: {}", e);
            return None;
        }
    };
    let mut info = StreamCodecInformation::for_codec(CodecType::AAC);
    info.mime_type = "audio/mp4".into();
    info.codec_4cc = make_4cc(b"mp4a");
    info.codec_specifier_rfc6381 = config.rfc6381_codec();
    info.profile = config.audio_object_type;
    info.sampling_rate = config.output_sampling_rate();
    info.channel_configuration = config.channel_configuration;
    info.num_channels = config.num_channels();
    info.samples_per_block = config.samples_per_block();
    info.codec_specific_data = packet.csd.clone();
    Some(info)
}

/// Payloads of the NAL units in an Annex-B CSD whose type is `sps_type`.
fn sps_candidates<'a>(
    csd: &'a [u8],
    nal_unit_type: fn(u8) -> u8,
    sps_type: u8,
) -> Vec<&'a [u8]> {
    parse_bitstream_for_nalus(csd)
        .unwrap_or_default()
        .iter()
        .map(|nalu| nalu.payload(csd))
        .filter(|payload| payload.first().map(|&b| nal_unit_type(b)) == Some(sps_type))
        .collect()
}

fn parse_avc_csd(packet: &EsPacket) -> Option<StreamCodecInformation> {
    let sps = sps_candidates(&packet.csd, h264::nal_unit_type, h264::NAL_SPS)
        .into_iter()
        .find_map(|nalu| h264::parse_sps(nalu).ok())?;
    let mut info = StreamCodecInformation::for_codec(CodecType::H264);
    info.mime_type = "video/mp4".into();
    info.codec_4cc = make_4cc(b"avc1");
    info.resolution = Resolution {
        width: sps.width(),
        height: sps.height(),
    };
    info.crop = sps.crop();
    info.aspect_ratio = sps.aspect_ratio();
    info.frame_rate = sps.frame_rate();
    info.profile = sps.profile_idc as u32;
    info.profile_level = sps.level_idc as u32;
    info.profile_constraints = sps.constraint_flags as u64;
    info.codec_specifier_rfc6381 = sps.rfc6381_codec();
    info.codec_specific_data = packet.csd.clone();
    Some(info)
}

fn parse_hevc_csd(packet: &EsPacket) -> Option<StreamCodecInformation> {
    let sps = sps_candidates(&packet.csd, h265::nal_unit_type, h265::NAL_SPS)
        .into_iter()
        .find_map(|nalu| h265::parse_sps(nalu).ok())?;
    let ptl = &sps.profile_tier_level;
    let mut info = StreamCodecInformation::for_codec(CodecType::H265);
    info.mime_type = "video/mp4".into();
    info.codec_4cc = make_4cc(b"hvc1");
    info.resolution = Resolution {
        width: sps.width(),
        height: sps.height(),
    };
    info.crop = sps.crop();
    info.aspect_ratio = sps.aspect_ratio();
    info.frame_rate = sps.frame_rate();
    info.profile_space = ptl.general_profile_space as u32;
    info.profile_tier = ptl.general_tier_flag as u32;
    info.profile = ptl.general_profile_idc as u32;
    info.profile_level = ptl.general_level_idc as u32;
    info.profile_constraints = ptl.general_constraint_indicator_flags;
    info.profile_compatibility_flags = ptl.general_profile_compatibility_flags;
    info.codec_specifier_rfc6381 = sps.rfc6381_codec();
    info.codec_specific_data = packet.csd.clone();
    Some(info)
}
