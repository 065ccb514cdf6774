/// PMS5003 particulate frame decoder
///
/// The sensor free-runs on its serial line, so frames never align with the
/// sampling cadence: a tick may deliver no frame, a partial frame, or a
/// backlog of several. The decoder buffers the stream, resynchronizes on
/// the two-byte header, and only hands out frames whose declared length
/// and 16-bit sum check out.
use std::collections::VecDeque;

use thiserror::Error;

use crate::bus::ByteSource;
use crate::checksum::sum16;
use crate::models::ParticulateReading;
use crate::sensors::SensorError;

pub const PMS5003_BAUD: u32 = 9600;

const FRAME_START_1: u8 = 0x42;
const FRAME_START_2: u8 = 0x4D;
// Declared length covers the 26 data bytes plus the 2-byte checksum
const EXPECTED_FRAME_LEN: u16 = 28;
const DATA_LEN: usize = 26;
// Header + length field + data + checksum
const FRAME_TOTAL_LEN: usize = 32;

/// A frame that found its header but failed validation
///
/// Never sticky: the scan resumes one byte past the bad header, so a
/// corrupted stream costs at most the affected frames.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("declared frame length {0}, expected 28")]
    Length(u16),
    #[error("frame checksum mismatch: computed {computed:#06x}, received {received:#06x}")]
    Checksum { computed: u16, received: u16 },
}

/// Resynchronizing decoder over a fed byte buffer
#[derive(Default)]
pub struct FrameDecoder {
    buf: VecDeque<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw serial bytes to the scan buffer
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend(bytes.iter().copied());
    }

    /// Scan for the next frame
    ///
    /// `Ok(None)` means the buffer holds no complete frame yet; retry
    /// after feeding more bytes. A validation error consumes one byte of
    /// the bad header so the next call rescans from the following byte.
    pub fn try_read_frame(&mut self) -> Result<Option<ParticulateReading>, FrameError> {
        // discard garbage until a header is at the front
        loop {
            match (self.buf.front().copied(), self.buf.get(1).copied()) {
                (None, _) => return Ok(None),
                (Some(FRAME_START_1), None) => return Ok(None),
                (Some(FRAME_START_1), Some(FRAME_START_2)) => break,
                _ => {
                    self.buf.pop_front();
                }
            }
        }

        if self.buf.len() < FRAME_TOTAL_LEN {
            return Ok(None);
        }

        let frame: Vec<u8> = self.buf.iter().take(FRAME_TOTAL_LEN).copied().collect();

        let declared = u16::from_be_bytes([frame[2], frame[3]]);
        if declared != EXPECTED_FRAME_LEN {
            self.buf.pop_front();
            return Err(FrameError::Length(declared));
        }

        // sum spans header, length field and data; the trailing word is
        // the transmitted sum
        let computed = sum16(&[&frame[..4 + DATA_LEN]]);
        let received = u16::from_be_bytes([frame[30], frame[31]]);
        if computed != received {
            self.buf.pop_front();
            return Err(FrameError::Checksum { computed, received });
        }

        self.buf.drain(..FRAME_TOTAL_LEN);

        // atmospheric PM triple; the "standard particle" triple at data
        // offsets 0..6 is a different calibration and is ignored
        let data = &frame[4..4 + DATA_LEN];
        Ok(Some(ParticulateReading {
            pm1_0: u16::from_be_bytes([data[6], data[7]]),
            pm2_5: u16::from_be_bytes([data[8], data[9]]),
            pm10: u16::from_be_bytes([data[10], data[11]]),
        }))
    }
}

/// Particulate reader pumping a non-blocking serial line into the decoder
pub struct Pms5003Reader<S> {
    port: S,
    decoder: FrameDecoder,
}

impl<S: ByteSource> Pms5003Reader<S> {
    pub fn new(port: S) -> Self {
        Pms5003Reader {
            port,
            decoder: FrameDecoder::new(),
        }
    }

    /// Pump available bytes and return the newest complete valid frame
    ///
    /// Backlogged frames from a slow polling cadence are drained in one
    /// call; only the most recent survives. `Ok(None)` when the stream
    /// produced nothing decodable this tick.
    pub fn poll(&mut self) -> Result<Option<ParticulateReading>, SensorError> {
        let mut chunk = [0u8; 256];
        loop {
            let n = self.port.read_available(&mut chunk)?;
            if n == 0 {
                break;
            }
            self.decoder.feed(&chunk[..n]);
            if n < chunk.len() {
                break;
            }
        }

        let mut newest = None;
        let mut last_error = None;
        loop {
            match self.decoder.try_read_frame() {
                Ok(Some(reading)) => newest = Some(reading),
                Ok(None) => break,
                Err(e) => last_error = Some(e),
            }
        }

        match (newest, last_error) {
            (Some(reading), _) => Ok(Some(reading)),
            (None, Some(e)) => Err(e.into()),
            (None, None) => Ok(None),
        }
    }
}

impl<S: ByteSource> super::ParticulateSensor for Pms5003Reader<S> {
    fn poll(&mut self) -> Result<Option<ParticulateReading>, SensorError> {
        Pms5003Reader::poll(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::testing::ScriptedSource;

    /// Build a valid 32-byte frame from the 13 data words
    fn frame_for(words: [u16; 13]) -> Vec<u8> {
        let mut frame = vec![FRAME_START_1, FRAME_START_2];
        frame.extend_from_slice(&EXPECTED_FRAME_LEN.to_be_bytes());
        for word in words {
            frame.extend_from_slice(&word.to_be_bytes());
        }
        let checksum = sum16(&[&frame]);
        frame.extend_from_slice(&checksum.to_be_bytes());
        frame
    }

    /// std PM triple differs from the atm triple so extraction offsets are
    /// distinguishable
    fn sample_frame() -> Vec<u8> {
        frame_for([99, 98, 97, 3, 8, 12, 450, 130, 25, 10, 4, 2, 0])
    }

    #[test]
    fn decodes_atmospheric_fields_not_standard() {
        let mut decoder = FrameDecoder::new();
        decoder.feed(&sample_frame());

        let reading = decoder.try_read_frame().unwrap().unwrap();
        assert_eq!(
            reading,
            ParticulateReading {
                pm1_0: 3,
                pm2_5: 8,
                pm10: 12,
            }
        );
    }

    #[test]
    fn header_is_found_inside_garbage() {
        let mut decoder = FrameDecoder::new();
        decoder.feed(&[0x00, 0x42, 0x13, 0xFF, 0x4D]);
        decoder.feed(&sample_frame());
        decoder.feed(&[0xAA]);

        assert!(decoder.try_read_frame().unwrap().is_some());
    }

    #[test]
    fn partial_frame_is_not_ready_not_an_error() {
        let frame = sample_frame();
        let mut decoder = FrameDecoder::new();

        decoder.feed(&frame[..10]);
        assert_eq!(decoder.try_read_frame(), Ok(None));

        decoder.feed(&frame[10..]);
        assert!(decoder.try_read_frame().unwrap().is_some());
    }

    #[test]
    fn checksum_mutation_rejects_the_frame() {
        let mut frame = sample_frame();
        frame[30] ^= 0x01;
        let mut decoder = FrameDecoder::new();
        decoder.feed(&frame);

        assert!(matches!(
            decoder.try_read_frame(),
            Err(FrameError::Checksum { .. })
        ));
    }

    #[test]
    fn wrong_declared_length_rejects_the_frame() {
        let mut frame = sample_frame();
        frame[2..4].copy_from_slice(&30u16.to_be_bytes());
        let mut decoder = FrameDecoder::new();
        decoder.feed(&frame);

        assert_eq!(decoder.try_read_frame(), Err(FrameError::Length(30)));
    }

    #[test]
    fn scan_self_heals_past_a_corrupt_frame() {
        let mut bad = sample_frame();
        bad[31] ^= 0xFF;
        let good = frame_for([0, 0, 0, 7, 21, 33, 0, 0, 0, 0, 0, 0, 0]);

        let mut decoder = FrameDecoder::new();
        decoder.feed(&bad);
        decoder.feed(&good);

        assert!(decoder.try_read_frame().is_err());
        // rescanning walks past the corrupt bytes to the next header
        let mut recovered = None;
        for _ in 0..FRAME_TOTAL_LEN {
            match decoder.try_read_frame() {
                Ok(Some(reading)) => {
                    recovered = Some(reading);
                    break;
                }
                Ok(None) => break,
                Err(_) => continue,
            }
        }
        assert_eq!(
            recovered,
            Some(ParticulateReading {
                pm1_0: 7,
                pm2_5: 21,
                pm10: 33,
            })
        );
    }

    #[test]
    fn reader_keeps_newest_of_a_backlog() {
        let older = frame_for([0, 0, 0, 1, 2, 3, 0, 0, 0, 0, 0, 0, 0]);
        let newer = frame_for([0, 0, 0, 4, 5, 6, 0, 0, 0, 0, 0, 0, 0]);
        let mut both = older;
        both.extend_from_slice(&newer);

        let mut reader = Pms5003Reader::new(ScriptedSource::new(&[&both]));
        let reading = reader.poll().unwrap().unwrap();
        assert_eq!(
            reading,
            ParticulateReading {
                pm1_0: 4,
                pm2_5: 5,
                pm10: 6,
            }
        );

        // stream quiet on the next tick
        assert_eq!(reader.poll().unwrap(), None);
    }

    #[test]
    fn quiet_stream_polls_to_none() {
        let mut reader = Pms5003Reader::new(ScriptedSource::new(&[]));
        assert_eq!(reader.poll().unwrap(), None);
    }
}
