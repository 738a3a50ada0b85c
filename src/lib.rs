use bitstream_io::{BigEndian, BitReader};

use std::io::{self, Read, Seek, SeekFrom};
use std::time::Duration;

mod error;
pub use error::Error;

mod bitstream;
mod config;
mod data;
mod header;
mod huffman;
mod hybrid;
mod layer1;
mod layer2;
mod layer3;
mod synth;
mod xing;

pub use config::{Channels, DecoderConfig, DownSample, Resolution};
pub use header::{ChannelMode, Header, Layer, Version};
pub use synth::PcmBuffer;
pub use xing::XingHeader;

use bitstream::BitStream;
use layer3::Layer3;
use synth::{Layout, Synth};

/// Bytes scanned for a frame header before giving up on a stream.
const RESYNC_LIMIT: usize = 256 * 1024;
/// `ID3` in the upper three bytes of a header word.
const ID3_MAGIC: u32 = 0x0049_4433;
const ID3V1_LEN: u64 = 128;
/// Frames muted after a decode failure while the reservoir and overlap
/// state recover.
const MUTE_FRAMES: u32 = 2;

/// Parameters of an opened stream, taken from its first frame.
#[derive(Debug, Clone)]
pub struct StreamInfo {
    pub version: Version,
    pub layer: Layer,
    pub mode: ChannelMode,
    pub sample_rate: u32,
    /// kbit/s of the first frame.
    pub bitrate: u32,
    pub channels: usize,
    pub output_channels: usize,
    pub output_rate: u32,
    pub frames: u64,
    pub duration: Duration,
    pub xing: Option<XingHeader>,
}

/// Byte level access to the stream: sync, tags and frame bodies.
struct FrameReader<R: Read + Seek> {
    bit_reader: BitReader<R, BigEndian>,
    /// Frame bodies and the bit reservoir.
    bs: BitStream,
    /// Byte position of the reader.
    offset: u64,
    /// Stream length without a trailing ID3v1 tag.
    stream_len: u64,
    /// Header word position of the last frame read.
    frame_start: u64,
}

/// Where the audio of a stream starts.
struct StreamStart {
    header: Header,
    xing: Option<XingHeader>,
    /// First frame, the Xing frame if there is one.
    audio_start: u64,
    /// First decoded frame.
    data_start: u64,
}

impl<R: Read + Seek> FrameReader<R> {
    fn new(mut reader: R) -> Result<FrameReader<R>, Error> {
        let stream_len = stream_length(&mut reader)?;

        Ok(FrameReader {
            bit_reader: BitReader::new(reader),
            bs: BitStream::new(),
            offset: 0,
            stream_len,
            frame_start: 0,
        })
    }

    /// Finds the first frame whose successor agrees with it, records a
    /// Xing header if present and rewinds to the first audio frame.
    fn open(&mut self) -> Result<StreamStart, Error> {
        loop {
            let (word, header) = self.read_frame()?;
            let start = self.frame_start;

            let confirmed = match self.read_header_word() {
                Ok(next) => match Header::decode(next) {
                    Ok(next) => header.is_compatible(&next),
                    Err(_) => false,
                },
                // a single frame stream
                Err(Error::IOError(ref e)) if e.kind() == io::ErrorKind::UnexpectedEof => true,
                Err(e) => return Err(e),
            };

            if !confirmed {
                log::warn!("false sync at byte {}", start);
                if start >= RESYNC_LIMIT as u64 {
                    return Err(Error::SyncLost(start as usize));
                }
                self.seek_to(start + 1)?;
                continue;
            }

            let mut frame = word.to_be_bytes().to_vec();
            frame.extend_from_slice(self.bs.body());
            let xing = match header.layer {
                Layer::Three => XingHeader::parse(&frame),
                _ => None,
            };

            let data_start = match xing {
                Some(_) => start + 4 + header.framesize as u64,
                None => start,
            };

            log::debug!("first frame at byte {}: {:?}", start, header);

            self.seek_to(data_start)?;
            self.bs.invalidate();

            return Ok(StreamStart {
                header,
                xing,
                audio_start: start,
                data_start,
            });
        }
    }

    fn seek_to(&mut self, position: u64) -> Result<(), Error> {
        let mut result = Ok(0);

        take_mut::take(&mut self.bit_reader, |bit_reader| {
            let mut reader = bit_reader.into_reader();
            result = reader.seek(SeekFrom::Start(position));
            BitReader::new(reader)
        });

        self.offset = result?;
        Ok(())
    }

    fn read_u8(&mut self) -> Result<u8, Error> {
        if self.offset >= self.stream_len {
            return Err(end_of_stream());
        }

        let byte = self.bit_reader.read::<u8>(8)?;
        self.offset += 1;
        Ok(byte)
    }

    fn read_header_word(&mut self) -> Result<u32, Error> {
        let mut word = 0;
        for _ in 0..4 {
            word = (word << 8) | u32::from(self.read_u8()?);
        }
        Ok(word)
    }

    /// Reads header words until one passes the header check, shifting in
    /// one byte per failed attempt.
    fn read_header(&mut self) -> Result<(u32, Header), Error> {
        let mut word = self.read_header_word()?;
        let mut skipped = 0;

        loop {
            if word >> 8 == ID3_MAGIC {
                self.skip_id3v2()?;
                word = self.read_header_word()?;
                continue;
            }

            if header::head_check(word) {
                match Header::decode(word) {
                    Ok(header) => {
                        if skipped > 0 {
                            log::warn!("skipped {} bytes to find a frame header", skipped);
                        }
                        self.frame_start = self.offset - 4;
                        return Ok((word, header));
                    }
                    Err(e) => log::debug!("rejected header {:#010x}: {}", word, e),
                }
            }

            if skipped >= RESYNC_LIMIT {
                return Err(Error::SyncLost(skipped));
            }

            word = (word << 8) | u32::from(self.read_u8()?);
            skipped += 1;
        }
    }

    /// Skips an ID3v2 tag whose `ID3` signature and major version were
    /// just read.
    fn skip_id3v2(&mut self) -> Result<(), Error> {
        let _minor = self.read_u8()?;
        let flags = self.read_u8()?;

        let mut size = 0u64;
        for _ in 0..4 {
            size = (size << 7) | u64::from(self.read_u8()? & 0x7f);
        }
        if flags & 0x10 != 0 {
            size += 10;
        }

        log::debug!("skipping {} byte ID3v2 tag", size);
        self.seek_to(self.offset + size)
    }

    /// Reads the next frame header and its body into the reservoir.
    fn read_frame(&mut self) -> Result<(u32, Header), Error> {
        let (word, header) = self.read_header()?;

        let body = self.bs.next_frame(header.framesize)?;
        let mut read = 0;
        for byte in body.iter_mut() {
            if self.offset >= self.stream_len {
                break;
            }
            match self.bit_reader.read::<u8>(8) {
                Ok(b) => {
                    *byte = b;
                    read += 1;
                    self.offset += 1;
                }
                Err(ref e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }
        }

        if read == 0 && header.framesize > 0 {
            return Err(end_of_stream());
        }
        if read < header.framesize {
            log::warn!("truncated frame, {} of {} bytes", read, header.framesize);
        }

        Ok((word, header))
    }
}

pub struct Decoder<R: Read + Seek> {
    reader: FrameReader<R>,
    config: DecoderConfig,
    synth: Synth,
    layer3: Layer3,
    audio_start: u64,
    data_start: u64,
    xing: Option<XingHeader>,
    first_header: Header,
    header: Option<Header>,
    frame_number: u64,
    mute_frames: u32,
    sample_index: usize,
}

impl<R: Read + Seek> Decoder<R> {
    pub fn new(reader: R) -> Result<Decoder<R>, Error> {
        Decoder::with_config(reader, DecoderConfig::default())
    }

    pub fn with_config(reader: R, config: DecoderConfig) -> Result<Decoder<R>, Error> {
        init_static();

        let mut reader = FrameReader::new(reader)?;
        let start = reader.open()?;

        Ok(Decoder {
            reader,
            config,
            synth: Synth::new(&config),
            layer3: Layer3::new(),
            audio_start: start.audio_start,
            data_start: start.data_start,
            xing: start.xing,
            first_header: start.header,
            header: None,
            frame_number: 0,
            mute_frames: 0,
            sample_index: 0,
        })
    }

    fn current_header(&self) -> Header {
        self.header.unwrap_or(self.first_header)
    }

    fn decode_next(&mut self) -> Result<(), Error> {
        self.sample_index = 0;

        let (_, header) = self.reader.read_frame()?;
        if let Some(previous) = self.header {
            if previous.sample_rate() != header.sample_rate()
                || previous.channels() != header.channels()
            {
                log::warn!(
                    "stream parameters changed at frame {}: {} Hz {} ch",
                    self.frame_number,
                    header.sample_rate(),
                    header.channels()
                );
            }
        }
        self.header = Some(header);
        self.frame_number += 1;

        let channels = header.channels();
        self.synth.begin_frame(
            Layout::new(&self.config, channels),
            self.config.single(channels),
        );

        let bs = &mut self.reader.bs;
        if header.error_protection {
            let crc = u16::from(bs.get_byte()) << 8 | u16::from(bs.get_byte());
            log::trace!("frame {} crc {:#06x} not checked", self.frame_number, crc);
        }

        let result = match header.layer {
            Layer::One => layer1::decode_frame(&header, bs, &mut self.synth),
            Layer::Two => layer2::decode_frame(&header, bs, &mut self.synth),
            Layer::Three => self.layer3.decode_frame(&header, bs, &mut self.synth),
        };

        if let Err(e) = result {
            self.synth.pcm_mut().clear();
            self.mute_frames = MUTE_FRAMES;
            return Err(e);
        }

        if self.mute_frames > 0 {
            self.mute_frames -= 1;
            self.synth.pcm_mut().mute();
        }

        Ok(())
    }

    /// Decodes the next frame and returns its interleaved PCM.
    pub fn next_frame(&mut self) -> Result<&PcmBuffer, Error> {
        self.decode_next()?;
        Ok(self.synth.pcm())
    }

    /// Seeks to frame `n` assuming a constant frame size. The frame there
    /// only refills the reservoir, decoding resumes with the one after it.
    pub fn jump_to_frame(&mut self, n: u64) -> Result<(), Error> {
        let framesize = self.current_header().framesize as u64;

        self.reader.seek_to(self.data_start + n * (framesize + 4))?;
        self.reader.bs.invalidate();
        self.frame_number = n;
        self.discard_frame()
    }

    /// Seeks to an absolute byte position, resynchronizing on the next
    /// frame header.
    pub fn jump_to_byte(&mut self, position: u64) -> Result<(), Error> {
        self.reader.seek_to(position.min(self.reader.stream_len))?;
        self.reader.bs.invalidate();
        self.discard_frame()
    }

    fn discard_frame(&mut self) -> Result<(), Error> {
        self.synth.pcm_mut().clear();
        self.sample_index = 0;
        self.reader.read_frame().map(|_| ())
    }

    /// Seeks to `time`, through the Xing table of contents when the stream
    /// has one.
    pub fn seek(&mut self, time: Duration) -> Result<(), Error> {
        let tpf = self.compute_tpf();
        let secs = time.as_secs_f64();

        match self.xing.clone() {
            Some(ref xing) if xing.frames > 0 => {
                let total = f64::from(xing.frames) * tpf;
                let percent = secs / total * 100.0;
                let byte = xing.seek_point(percent, self.reader.stream_len - self.audio_start);

                self.jump_to_byte(self.audio_start + byte)?;
                self.frame_number = (secs / tpf) as u64;
                Ok(())
            }
            _ => self.jump_to_frame((secs / tpf) as u64),
        }
    }

    /// Average bytes per frame of the current stream parameters.
    pub fn compute_bpf(&self) -> f64 {
        self.current_header().bytes_per_frame()
    }

    /// Seconds per frame.
    pub fn compute_tpf(&self) -> f64 {
        self.current_header().time_per_frame()
    }

    /// Frame count estimated from the stream length.
    pub fn calc_numframes(&self) -> u64 {
        let bpf = self.compute_bpf();
        if bpf <= 0.0 {
            return 0;
        }
        ((self.reader.stream_len - self.data_start) as f64 / bpf) as u64
    }

    /// Position of the reader as a fraction of the stream length.
    pub fn relative_pos(&self) -> f64 {
        if self.reader.stream_len == 0 {
            return 0.0;
        }
        self.reader.offset as f64 / self.reader.stream_len as f64
    }

    pub fn total_duration(&self) -> Duration {
        Duration::from_secs_f64(self.total_frames() as f64 * self.compute_tpf())
    }

    fn total_frames(&self) -> u64 {
        match &self.xing {
            Some(xing) => u64::from(xing.frames),
            None => self.calc_numframes(),
        }
    }

    /// Samples saturated by the synthesis filter so far.
    pub fn clip_count(&self) -> u64 {
        self.synth.clip_count()
    }

    /// Frames read since the start of the stream or the last seek target.
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Header of the last decoded frame.
    pub fn header(&self) -> Option<Header> {
        self.header
    }

    pub fn xing(&self) -> Option<&XingHeader> {
        self.xing.as_ref()
    }

    pub fn config(&self) -> DecoderConfig {
        self.config
    }

    pub fn stream_info(&self) -> StreamInfo {
        let header = self.first_header;

        StreamInfo {
            version: header.version,
            layer: header.layer,
            mode: header.mode,
            sample_rate: header.sample_rate(),
            bitrate: header.bitrate(),
            channels: header.channels(),
            output_channels: self.config.output_channels(header.channels()),
            output_rate: header.sample_rate() >> self.config.down_sample.shift(),
            frames: self.total_frames(),
            duration: self.total_duration(),
            xing: self.xing.clone(),
        }
    }
}

impl<R: Read + Seek> Iterator for Decoder<R> {
    type Item = i16;

    fn next(&mut self) -> Option<i16> {
        loop {
            if let Some(sample) = self.synth.pcm().get(self.sample_index) {
                self.sample_index += 1;
                return Some(sample);
            }

            match self.decode_next() {
                Ok(()) => {}
                Err(Error::IOError(e)) => {
                    if e.kind() == io::ErrorKind::UnexpectedEof {
                        log::info!("END OF SONG, {} frames processed", self.frame_number);
                        if self.clip_count() > 0 {
                            log::warn!("{} samples clipped", self.clip_count());
                        }
                    } else {
                        log::error!("IO ERROR: {:?}", e.kind());
                    }
                    return None;
                }
                Err(e @ Error::SyncLost(_)) | Err(e @ Error::FrameTooLarge(_)) => {
                    log::error!("{}", e);
                    return None;
                }
                Err(e) => log::error!("ERROR frame {}: {}", self.frame_number, e),
            }
        }
    }
}

impl<R: Read + Seek> rodio::Source for Decoder<R> {
    fn current_frame_len(&self) -> Option<usize> {
        let buffered = self.synth.pcm().len() - self.sample_index;
        if buffered > 0 {
            return Some(buffered);
        }

        // between frames, the length the next frame will have
        let header = self.current_header();
        let channels = Layout::new(&self.config, header.channels()).channels();
        Some((header.samples_per_frame() >> self.config.down_sample.shift()) * channels)
    }

    fn channels(&self) -> u16 {
        let header = self.current_header();
        Layout::new(&self.config, header.channels()).channels() as u16
    }

    fn sample_rate(&self) -> u32 {
        self.current_header().sample_rate() >> self.config.down_sample.shift()
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Decoder::total_duration(self))
    }
}

/// Stream length without a trailing ID3v1 tag. Leaves the reader at the
/// start.
fn stream_length<R: Read + Seek>(reader: &mut R) -> Result<u64, Error> {
    let mut len = reader.seek(SeekFrom::End(0))?;

    if len >= ID3V1_LEN {
        reader.seek(SeekFrom::End(-(ID3V1_LEN as i64)))?;
        let mut tag = [0u8; 3];
        reader.read_exact(&mut tag)?;
        if &tag == b"TAG" {
            log::debug!("ID3v1 tag at end of stream");
            len -= ID3V1_LEN;
        }
    }

    reader.seek(SeekFrom::Start(0))?;
    Ok(len)
}

fn end_of_stream() -> Error {
    Error::IOError(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        "end of stream",
    ))
}

fn init_static() {
    huffman::init_static();
    synth::init_static();
    layer2::init_static();
    layer3::init_static();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn silent_layer3(frames: usize) -> Vec<u8> {
        let mut data = Vec::new();
        for _ in 0..frames {
            data.extend_from_slice(&0xfffb_9064u32.to_be_bytes());
            data.resize(data.len() + 413, 0);
        }
        data
    }

    #[test]
    fn id3v1_tag_is_excluded() {
        let mut data = silent_layer3(2);
        let audio = data.len() as u64;
        data.extend_from_slice(b"TAG");
        data.resize(data.len() + 125, b' ');

        let mut cursor = Cursor::new(data);
        assert_eq!(stream_length(&mut cursor).unwrap(), audio);
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn id3v2_tag_is_skipped() {
        // syncsafe size 0x81 = 129 bytes of tag body
        let mut data = b"ID3\x04\x00\x00\x00\x00\x01\x01".to_vec();
        data.resize(data.len() + 129, 0xff);
        let start = data.len() as u64;
        data.extend(silent_layer3(2));

        let decoder = Decoder::new(Cursor::new(data)).unwrap();
        assert_eq!(decoder.data_start, start);
    }

    #[test]
    fn false_sync_is_rejected() {
        // a plausible header followed by garbage
        let mut data = vec![0xff, 0xfb, 0x90, 0x64, 0x12, 0x34];
        data.extend(silent_layer3(2));

        let decoder = Decoder::new(Cursor::new(data)).unwrap();
        assert_eq!(decoder.data_start, 6);
    }

    #[test]
    fn garbage_only_reaches_end_of_stream() {
        let data = vec![0x55u8; 1000];
        match Decoder::new(Cursor::new(data)) {
            Err(Error::IOError(e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            _ => panic!("expected end of stream"),
        }
    }
}
