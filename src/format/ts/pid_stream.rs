//! Per-PID reassembly of sections and PES packets from transport packet
//! payloads.

use super::pes::{allows_unbounded_length, has_start_code, PesData, PES_FIXED_HEADER_SIZE};
use super::types::*;
use crate::utils::Crc32Mpeg2;
use bytes::{Bytes, BytesMut};
use log::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PidStreamKind {
    /// PSI or private sections.
    Section,
    /// Packetized elementary stream.
    Pes,
}

/// What the transport layer knows about the packet whose payload is being
/// processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketContext {
    pub is_start: bool,
    pub transport_error: bool,
    pub random_access: bool,
    pub pcr: Option<u64>,
    pub continuity_error: bool,
}

/// Result of comparing a packet's continuity_counter with the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuity {
    InOrder,
    /// Same counter as the previous payload packet; the packet is a
    /// retransmission and must be ignored.
    Duplicate,
    /// A gap. Whatever was being gathered is lost.
    Error,
}

/// Complete units produced by a PID stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PidOutput {
    /// One section, header to CRC.
    Section(Bytes),
    Pes(PesData),
}

#[derive(Debug, Clone, Copy, Default)]
struct Gathering {
    open: bool,
    random_access: bool,
    pcr: Option<u64>,
}

#[derive(Debug)]
pub struct PidStream {
    pub pid: u16,
    pub kind: PidStreamKind,
    /// Program the stream belongs to, for PMT and elementary PIDs.
    pub program_number: Option<u16>,
    /// PMT stream_type; 0 for section streams.
    pub stream_type: u8,
    enabled: bool,
    continuity_counter: Option<u8>,
    buffer: BytesMut,
    gathering: Gathering,
}

impl PidStream {
    /// Section streams are always enabled.
    pub fn new_section(pid: u16, program_number: Option<u16>) -> Self {
        Self::new(pid, PidStreamKind::Section, program_number, 0, true)
    }

    /// PES streams start disabled until a program selection enables them.
    pub fn new_pes(pid: u16, program_number: u16, stream_type: u8) -> Self {
        Self::new(pid, PidStreamKind::Pes, Some(program_number), stream_type, false)
    }

    fn new(
        pid: u16,
        kind: PidStreamKind,
        program_number: Option<u16>,
        stream_type: u8,
        enabled: bool,
    ) -> Self {
        Self {
            pid,
            kind,
            program_number,
            stream_type,
            enabled,
            continuity_counter: None,
            buffer: BytesMut::new(),
            gathering: Gathering::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Disables the stream and drops anything gathered so far.
    pub fn disable(&mut self) {
        self.enabled = false;
        self.reset();
    }

    /// Number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Drops the unit being gathered.
    pub fn reset(&mut self) {
        self.gathering = Gathering::default();
        self.buffer.clear();
    }

    /// Tracks continuity_counter for packets carrying payload.
    ///
    /// A set discontinuity_indicator accepts any new counter value but still
    /// flags an exact repeat as a duplicate.
    pub fn check_continuity(&mut self, counter: u8, discontinuity: bool) -> Continuity {
        let result = match self.continuity_counter {
            None => Continuity::InOrder,
            Some(previous) if previous == counter => Continuity::Duplicate,
            Some(previous) if discontinuity || (previous + 1) & 0x0f == counter => {
                Continuity::InOrder
            }
            Some(_) => Continuity::Error,
        };
        if result != Continuity::Duplicate {
            self.continuity_counter = Some(counter);
        }
        result
    }

    /// Feeds one packet payload, pushing every unit it completes to `out`.
    /// Returns false when the payload was rejected.
    pub fn process_payload(
        &mut self,
        payload: &[u8],
        ctx: &PacketContext,
        out: &mut Vec<PidOutput>,
    ) -> bool {
        match self.kind {
            PidStreamKind::Section => self.process_section_payload(payload, ctx, out),
            PidStreamKind::Pes => self.process_pes_payload(payload, ctx, out),
        }
    }

    fn process_section_payload(
        &mut self,
        payload: &[u8],
        ctx: &PacketContext,
        out: &mut Vec<PidOutput>,
    ) -> bool {
        if ctx.continuity_error || ctx.transport_error {
            self.reset();
            return false;
        }

        if ctx.is_start {
            let Some((&pointer_field, rest)) = payload.split_first() else {
                self.reset();
                return false;
            };
            let pointer_field = pointer_field as usize;
            if pointer_field > rest.len() {
                debug!("PID {}: pointer_field {} past payload", self.pid, pointer_field);
                self.reset();
                return false;
            }
            // Bytes before the pointer finish an open section.
            let data = if self.gathering.open {
                rest
            } else {
                &rest[pointer_field..]
            };
            self.gathering.open = true;
            self.buffer.extend_from_slice(data);
        } else if self.gathering.open {
            self.buffer.extend_from_slice(payload);
        } else {
            return false;
        }

        self.extract_valid_sections(out);
        true
    }

    fn crc_required(&self, table_id: u8) -> bool {
        table_id <= TABLE_ID_TSDT || (self.pid == PID_SDT && table_id == TABLE_ID_SDT)
    }

    fn extract_valid_sections(&mut self, out: &mut Vec<PidOutput>) {
        while self.gathering.open {
            if self.buffer.len() < 3 {
                return;
            }
            let total =
                ((((self.buffer[1] & 0x0f) as usize) << 8) | self.buffer[2] as usize) + 3;
            if self.buffer.len() < total {
                return;
            }

            let section = self.buffer.split_to(total).freeze();
            if !self.crc_required(section[0]) || Crc32Mpeg2::new().verify_section(&section) {
                out.push(PidOutput::Section(section));
            } else {
                warn!(
                    "PID {}: CRC mismatch in section with table_id 0x{:02x}",
                    self.pid, section[0]
                );
            }

            // 0xff after a section is stuffing up to the end of the packet
            if self.buffer.first().map_or(true, |&b| b == 0xff) {
                self.reset();
            }
        }
    }

    fn process_pes_payload(
        &mut self,
        payload: &[u8],
        ctx: &PacketContext,
        out: &mut Vec<PidOutput>,
    ) -> bool {
        if !self.enabled {
            return false;
        }
        if ctx.continuity_error || ctx.transport_error {
            if self.gathering.open {
                debug!("PID {}: dropping {} gathered PES bytes", self.pid, self.buffer.len());
            }
            self.reset();
            return false;
        }

        if ctx.is_start {
            if self.gathering.open && self.holds_incomplete_bounded_pes() {
                warn!(
                    "PID {}: PES packet ended early, dropping {} bytes",
                    self.pid,
                    self.buffer.len()
                );
                self.reset();
            }
            if !self.gathering.open {
                self.gathering.random_access = ctx.random_access;
                self.gathering.pcr = ctx.pcr;
            }
            self.gathering.open = true;
        }

        let mut added_now = 0;
        if self.gathering.open {
            self.buffer.extend_from_slice(payload);
            added_now = payload.len();
        }

        self.extract_valid_pes_packets(ctx, added_now, out);
        true
    }

    /// True when the buffer holds the start of a PES whose length is either
    /// unknown yet or declared and not reached.
    fn holds_incomplete_bounded_pes(&self) -> bool {
        if self.buffer.len() < PES_FIXED_HEADER_SIZE {
            return !self.buffer.is_empty();
        }
        let length = u16::from_be_bytes([self.buffer[4], self.buffer[5]]) as usize;
        length != 0 && self.buffer.len() < length + PES_FIXED_HEADER_SIZE
    }

    fn emit_pes(&self, data: Bytes, out: &mut Vec<PidOutput>) {
        trace!("PID {}: PES packet of {} bytes", self.pid, data.len());
        out.push(PidOutput::Pes(PesData {
            pid: self.pid,
            stream_type: self.stream_type,
            packet_data: Some(data),
            random_access: self.gathering.random_access,
            pcr: self.gathering.pcr,
        }));
    }

    fn extract_valid_pes_packets(
        &mut self,
        ctx: &PacketContext,
        mut added_now: usize,
        out: &mut Vec<PidOutput>,
    ) {
        while self.gathering.open && self.buffer.len() >= PES_FIXED_HEADER_SIZE {
            if !has_start_code(&self.buffer) {
                warn!("PID {}: PES start code missing", self.pid);
                self.reset();
                return;
            }

            let stream_id = self.buffer[3];
            let length = u16::from_be_bytes([self.buffer[4], self.buffer[5]]) as usize;
            if length == 0 {
                if !allows_unbounded_length(stream_id) {
                    warn!(
                        "PID {}: PES_packet_length 0 not allowed for stream_id 0x{:02x}",
                        self.pid, stream_id
                    );
                    self.reset();
                    return;
                }
                // An unbounded PES ends where the next one starts.
                if !ctx.is_start || self.buffer.len() <= added_now {
                    return;
                }
                let data = self.buffer.split_to(self.buffer.len() - added_now).freeze();
                self.emit_pes(data, out);
                self.gathering.random_access = ctx.random_access;
                self.gathering.pcr = ctx.pcr;
                continue;
            }

            let total = length + PES_FIXED_HEADER_SIZE;
            if self.buffer.len() < total {
                return;
            }
            let data = self.buffer.split_to(total).freeze();
            self.emit_pes(data, out);
            added_now = added_now.min(self.buffer.len());

            if self.buffer.is_empty() {
                self.reset();
            } else if !has_start_code(&self.buffer) {
                debug!(
                    "PID {}: discarding {} bytes after PES packet",
                    self.pid,
                    self.buffer.len()
                );
                self.reset();
            }
        }
    }

    /// Hands out whatever PES data is still gathered, used at end of stream.
    pub fn finish_current_pes_packet(&mut self) -> Option<PesData> {
        if self.kind != PidStreamKind::Pes || !self.gathering.open || self.buffer.is_empty() {
            return None;
        }
        let data = self.buffer.split().freeze();
        let pes = PesData {
            pid: self.pid,
            stream_type: self.stream_type,
            packet_data: Some(data),
            random_access: self.gathering.random_access,
            pcr: self.gathering.pcr,
        };
        self.reset();
        Some(pes)
    }
}
