use crate::bitstream::MAX_FRAME_SIZE;
use crate::data::{BITRATES, SAMPLE_RATES};
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Mpeg1,
    Mpeg2,
    Mpeg25,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    One,
    Two,
    Three,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    Stereo,
    JointStereo,
    DualChannel,
    Mono,
}

/// Decoded 32 bit frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: Version,
    pub layer: Layer,
    pub error_protection: bool,
    pub bitrate_index: usize,
    /// Index into the nine supported sample rates, 44100 Hz first.
    pub sampling_frequency: usize,
    pub padding: bool,
    pub private: bool,
    pub mode: ChannelMode,
    pub mode_extension: u32,
    pub copyright: bool,
    pub original: bool,
    pub emphasis: u32,
    /// Bytes following the 4 byte header word.
    pub framesize: usize,
}

/// Cheap plausibility test run on every candidate word while scanning for
/// sync.
pub fn head_check(head: u32) -> bool {
    if head & 0xffe0_0000 != 0xffe0_0000 {
        return false;
    }
    // reserved version
    if (head >> 19) & 3 == 1 {
        return false;
    }
    // reserved layer
    if (head >> 17) & 3 == 0 {
        return false;
    }
    // free format and reserved bitrate
    let bitrate_index = (head >> 12) & 0xf;
    if bitrate_index == 0 || bitrate_index == 0xf {
        return false;
    }
    if (head >> 10) & 3 == 3 {
        return false;
    }

    true
}

impl Header {
    pub fn decode(head: u32) -> Result<Header, Error> {
        if !head_check(head) {
            return Err(Error::InvalidHeader(head));
        }

        let version = if head & (1 << 20) != 0 {
            if head & (1 << 19) != 0 {
                Version::Mpeg1
            } else {
                Version::Mpeg2
            }
        } else {
            Version::Mpeg25
        };

        let layer = match (head >> 17) & 3 {
            3 => Layer::One,
            2 => Layer::Two,
            _ => Layer::Three,
        };

        let freq_bits = ((head >> 10) & 3) as usize;
        let sampling_frequency = match version {
            Version::Mpeg1 => freq_bits,
            Version::Mpeg2 => freq_bits + 3,
            Version::Mpeg25 => freq_bits + 6,
        };

        let mode = match (head >> 6) & 3 {
            0 => ChannelMode::Stereo,
            1 => ChannelMode::JointStereo,
            2 => ChannelMode::DualChannel,
            _ => ChannelMode::Mono,
        };

        let mut header = Header {
            version,
            layer,
            error_protection: (head >> 16) & 1 == 0,
            bitrate_index: ((head >> 12) & 0xf) as usize,
            sampling_frequency,
            padding: (head >> 9) & 1 == 1,
            private: (head >> 8) & 1 == 1,
            mode,
            mode_extension: (head >> 4) & 3,
            copyright: (head >> 3) & 1 == 1,
            original: (head >> 2) & 1 == 1,
            emphasis: head & 3,
            framesize: 0,
        };

        header.framesize = header.compute_framesize();
        if header.framesize > MAX_FRAME_SIZE {
            return Err(Error::FrameTooLarge(header.framesize));
        }

        log::trace!("header {:#010x}: {:?}", head, header);

        Ok(header)
    }

    fn compute_framesize(&self) -> usize {
        let bitrate = self.bitrate() as usize;
        let freq = self.sample_rate() as usize;
        let padding = self.padding as usize;

        match self.layer {
            Layer::One => ((bitrate * 12000 / freq + padding) << 2) - 4,
            Layer::Two => bitrate * 144_000 / freq + padding - 4,
            Layer::Three => bitrate * 144_000 / (freq << self.lsf()) + padding - 4,
        }
    }

    /// 1 for the low sampling frequency extensions (MPEG-2 and 2.5).
    pub fn lsf(&self) -> usize {
        match self.version {
            Version::Mpeg1 => 0,
            _ => 1,
        }
    }

    pub fn layer_number(&self) -> u32 {
        match self.layer {
            Layer::One => 1,
            Layer::Two => 2,
            Layer::Three => 3,
        }
    }

    pub fn channels(&self) -> usize {
        match self.mode {
            ChannelMode::Mono => 1,
            _ => 2,
        }
    }

    /// Bitrate in kbit/s.
    pub fn bitrate(&self) -> u32 {
        BITRATES[self.lsf()][self.layer_number() as usize - 1][self.bitrate_index]
    }

    pub fn sample_rate(&self) -> u32 {
        SAMPLE_RATES[self.sampling_frequency]
    }

    pub fn is_ms_stereo(&self) -> bool {
        self.mode == ChannelMode::JointStereo && self.mode_extension & 0x2 != 0
    }

    pub fn is_intensity_stereo(&self) -> bool {
        self.mode == ChannelMode::JointStereo && self.mode_extension & 0x1 != 0
    }

    /// Layer III side information size in bytes, CRC included.
    pub fn side_info_size(&self) -> usize {
        let size = match (self.lsf(), self.channels()) {
            (0, 1) => 17,
            (0, _) => 32,
            (_, 1) => 9,
            (_, _) => 17,
        };

        if self.error_protection {
            size + 2
        } else {
            size
        }
    }

    pub fn samples_per_frame(&self) -> usize {
        match self.layer {
            Layer::One => 384,
            Layer::Two => 1152,
            Layer::Three => 1152 >> self.lsf(),
        }
    }

    /// Average bytes per frame, header included and padding excluded.
    pub fn bytes_per_frame(&self) -> f64 {
        let bitrate = f64::from(self.bitrate());
        let freq = f64::from(self.sample_rate());

        match self.layer {
            Layer::One => bitrate * 48000.0 / freq,
            Layer::Two => bitrate * 144_000.0 / freq,
            Layer::Three => bitrate * 144_000.0 / (freq * (1 << self.lsf()) as f64),
        }
    }

    /// Seconds of audio per frame.
    pub fn time_per_frame(&self) -> f64 {
        self.samples_per_frame() as f64 / f64::from(self.sample_rate())
    }

    /// Whether `other` can follow this header in the same stream.
    pub fn is_compatible(&self, other: &Header) -> bool {
        self.layer == other.layer
            && self.version == other.version
            && self.sampling_frequency == other.sampling_frequency
            && self.channels() == other.channels()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mpeg1_layer3() {
        let header = Header::decode(0xfffb_9064).unwrap();

        assert_eq!(header.version, Version::Mpeg1);
        assert_eq!(header.layer, Layer::Three);
        assert!(!header.error_protection);
        assert_eq!(header.bitrate(), 128);
        assert_eq!(header.sample_rate(), 44100);
        assert_eq!(header.mode, ChannelMode::JointStereo);
        assert!(header.is_ms_stereo());
        assert!(!header.is_intensity_stereo());
        assert!(header.original);
        assert_eq!(header.framesize, 413);
        assert_eq!(header.side_info_size(), 32);
        assert_eq!(header.samples_per_frame(), 1152);

        let padded = Header::decode(0xfffb_9264).unwrap();
        assert_eq!(padded.framesize, 414);
    }

    #[test]
    fn decoding_is_idempotent() {
        let head = 0xfffb_9064;
        assert_eq!(Header::decode(head).unwrap(), Header::decode(head).unwrap());
    }

    #[test]
    fn mpeg1_layer1() {
        let header = Header::decode(0xffff_c000).unwrap();
        assert_eq!(header.layer, Layer::One);
        assert_eq!(header.bitrate(), 384);
        assert_eq!(header.framesize, 412);
        assert_eq!(header.samples_per_frame(), 384);
    }

    #[test]
    fn mpeg2_layer2_has_no_lsf_shift() {
        let header = Header::decode(0xfff5_80c0).unwrap();
        assert_eq!(header.version, Version::Mpeg2);
        assert_eq!(header.layer, Layer::Two);
        assert_eq!(header.sample_rate(), 22050);
        assert_eq!(header.bitrate(), 64);
        assert_eq!(header.channels(), 1);
        assert_eq!(header.framesize, 413);
    }

    #[test]
    fn mpeg25_layer3() {
        let header = Header::decode(0xffe3_8800).unwrap();
        assert_eq!(header.version, Version::Mpeg25);
        assert_eq!(header.sample_rate(), 8000);
        assert_eq!(header.framesize, 572);
        assert_eq!(header.side_info_size(), 17);
        assert_eq!(header.samples_per_frame(), 576);
    }

    #[test]
    fn crc_extends_side_info() {
        let header = Header::decode(0xfffa_90c4).unwrap();
        assert!(header.error_protection);
        assert_eq!(header.channels(), 1);
        assert_eq!(header.side_info_size(), 19);
    }

    #[test]
    fn rejects_malformed_words() {
        for &head in &[
            0x7ffb_9064u32, // sync
            0xfffb_f064,    // bitrate 15
            0xfffb_0064,    // free format
            0xfffb_9c64,    // sample rate 3
            0xfff9_9064,    // layer 0
            0xffeb_9064,    // version 1
        ] {
            assert!(!head_check(head));
            match Header::decode(head) {
                Err(Error::InvalidHeader(h)) => assert_eq!(h, head),
                other => panic!("{:#010x} decoded to {:?}", head, other),
            }
        }
    }

    #[test]
    fn compatibility() {
        let a = Header::decode(0xfffb_9064).unwrap();
        let b = Header::decode(0xfffb_a064).unwrap();
        let mono = Header::decode(0xfffb_90c4).unwrap();
        assert!(a.is_compatible(&b));
        assert!(!a.is_compatible(&mono));
    }
}
