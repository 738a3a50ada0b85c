use bitstream_io::{BigEndian, BitReader};

use std::io::{self, Cursor};

const FRAMES_FLAG: u32 = 0x1;
const BYTES_FLAG: u32 = 0x2;
const TOC_FLAG: u32 = 0x4;
const VBR_SCALE_FLAG: u32 = 0x8;

/// VBR summary stored by encoders in place of the first frame's audio.
#[derive(Debug, Clone, PartialEq)]
pub struct XingHeader {
    pub frames: u32,
    pub bytes: Option<u32>,
    /// Byte position of each percent of playback, in 1/256ths of the
    /// stream length.
    pub toc: [u8; 100],
    pub has_toc: bool,
    pub vbr_scale: Option<u32>,
}

impl XingHeader {
    /// Looks for a `Xing` or `Info` tag in `frame`, which starts with the
    /// 4 byte header word. A tag without a frame count is ignored.
    pub fn parse(frame: &[u8]) -> Option<XingHeader> {
        if frame.len() < 4 {
            return None;
        }

        let mpeg1 = (frame[1] >> 3) & 1 == 1;
        let mono = (frame[3] >> 6) & 3 == 3;
        let side_info = match (mpeg1, mono) {
            (true, false) => 32,
            (true, true) => 17,
            (false, false) => 17,
            (false, true) => 9,
        };

        let data = frame.get(4 + side_info..)?;
        match read_tag(data) {
            Ok(xing) => xing,
            Err(e) => {
                log::debug!("truncated Xing header: {}", e);
                None
            }
        }
    }

    /// Byte offset at which playback reaches `percent` (0 to 100).
    /// `stream_len` stands in for a missing byte count.
    pub fn seek_point(&self, percent: f64, stream_len: u64) -> u64 {
        let percent = percent.max(0.0).min(100.0);
        let a = (percent as usize).min(99);

        let fa = f64::from(self.toc[a]);
        let fb = if a < 99 {
            f64::from(self.toc[a + 1])
        } else {
            256.0
        };
        let fx = fa + (fb - fa) * (percent - a as f64);

        let bytes = self.bytes.map(u64::from).unwrap_or(stream_len);
        (fx / 256.0 * bytes as f64) as u64
    }
}

fn read_tag(data: &[u8]) -> io::Result<Option<XingHeader>> {
    let mut reader = BitReader::<_, BigEndian>::new(Cursor::new(data));

    let tag = reader.read::<u32>(32)?;
    if tag != u32::from_be_bytes(*b"Xing") && tag != u32::from_be_bytes(*b"Info") {
        return Ok(None);
    }

    let flags = reader.read::<u32>(32)?;
    if flags & FRAMES_FLAG == 0 {
        log::debug!("Xing header without frame count, flags {:#x}", flags);
        return Ok(None);
    }

    let frames = reader.read::<u32>(32)?;
    let bytes = if flags & BYTES_FLAG != 0 {
        Some(reader.read::<u32>(32)?)
    } else {
        None
    };

    let mut toc = [0u8; 100];
    let has_toc = flags & TOC_FLAG != 0;
    if has_toc {
        for entry in toc.iter_mut() {
            *entry = reader.read::<u8>(8)?;
        }
    } else {
        for (i, entry) in toc.iter_mut().enumerate() {
            *entry = (i * 256 / 100) as u8;
        }
    }

    let vbr_scale = if flags & VBR_SCALE_FLAG != 0 {
        Some(reader.read::<u32>(32)?)
    } else {
        None
    };

    let xing = XingHeader {
        frames,
        bytes,
        toc,
        has_toc,
        vbr_scale,
    };
    log::debug!("{:?}", xing);

    Ok(Some(xing))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(
        header: [u8; 4],
        side_info: usize,
        tag: &[u8; 4],
        flags: u32,
        fields: &[u8],
    ) -> Vec<u8> {
        let mut data = header.to_vec();
        data.resize(4 + side_info, 0);
        data.extend_from_slice(tag);
        data.extend_from_slice(&flags.to_be_bytes());
        data.extend_from_slice(fields);
        data.resize(data.len() + 16, 0);
        data
    }

    #[test]
    fn mpeg1_stereo_full() {
        let mut fields = Vec::new();
        fields.extend_from_slice(&1000u32.to_be_bytes());
        fields.extend_from_slice(&400_000u32.to_be_bytes());
        fields.extend((0..100).map(|i| (i * 2) as u8));
        fields.extend_from_slice(&77u32.to_be_bytes());

        let data = frame([0xff, 0xfb, 0x90, 0x64], 32, b"Xing", 0xf, &fields);
        let xing = XingHeader::parse(&data).unwrap();

        assert_eq!(xing.frames, 1000);
        assert_eq!(xing.bytes, Some(400_000));
        assert!(xing.has_toc);
        assert_eq!(xing.toc[10], 20);
        assert_eq!(xing.vbr_scale, Some(77));
    }

    #[test]
    fn info_tag_mpeg2_mono() {
        let fields = 12u32.to_be_bytes();
        let data = frame([0xff, 0xf3, 0x80, 0xc0], 9, b"Info", FRAMES_FLAG, &fields);
        let xing = XingHeader::parse(&data).unwrap();

        assert_eq!(xing.frames, 12);
        assert_eq!(xing.bytes, None);
        assert!(!xing.has_toc);
        assert_eq!(xing.toc[50], 128);
    }

    #[test]
    fn rejects_missing_tag_or_frames() {
        let data = frame([0xff, 0xfb, 0x90, 0x64], 32, b"Lame", 0xf, &[]);
        assert_eq!(XingHeader::parse(&data), None);

        let data = frame([0xff, 0xfb, 0x90, 0x64], 32, b"Xing", BYTES_FLAG, &[0, 0, 1, 0]);
        assert_eq!(XingHeader::parse(&data), None);

        // tag at the mono offset of a stereo frame
        let data = frame([0xff, 0xfb, 0x90, 0x64], 17, b"Xing", 0x1, &[0, 0, 0, 5]);
        assert_eq!(XingHeader::parse(&data), None);

        assert_eq!(XingHeader::parse(&[0xff, 0xfb]), None);
    }

    #[test]
    fn seek_points() {
        let mut toc = [0u8; 100];
        for (i, entry) in toc.iter_mut().enumerate() {
            *entry = (i * 2) as u8;
        }
        let xing = XingHeader {
            frames: 100,
            bytes: Some(256_000),
            toc,
            has_toc: true,
            vbr_scale: None,
        };

        assert_eq!(xing.seek_point(0.0, 0), 0);
        assert_eq!(xing.seek_point(10.0, 0), 20_000);
        // halfway between entries 10 and 11
        assert_eq!(xing.seek_point(10.5, 0), 21_000);
        // past the last entry the table ends at 256
        assert_eq!(xing.seek_point(99.5, 0), (198.0 + 58.0 * 0.5) as u64 * 1000);
        assert_eq!(xing.seek_point(150.0, 0), 256_000);

        let xing = XingHeader { bytes: None, ..xing };
        assert_eq!(xing.seek_point(10.0, 512_000), 40_000);
    }
}
