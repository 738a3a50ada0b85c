use crate::bitstream::BitStream;
use crate::config::Single;
use crate::data::{
    AllocTable, ALLOC_TABLES, ALLOC_TRANSLATE, GROUPED_3, GROUPED_5, GROUPED_9, SBLIMIT,
    SCALE_BLOCK,
};
use crate::header::{ChannelMode, Header};
use crate::synth::Synth;
use crate::Error;

use lazy_static::lazy_static;

lazy_static! {
    /// Dequantization multipliers by quantizer row and 6 bit scalefactor.
    /// Rows 3..=16 belong to ungrouped samples of that width, the others
    /// are the grouped levels.
    pub static ref MULS: Vec<[f32; 64]> = {
        let mulmul: [f64; 27] = [
            0.0,
            -2.0 / 3.0,
            2.0 / 3.0,
            2.0 / 7.0,
            2.0 / 15.0,
            2.0 / 31.0,
            2.0 / 63.0,
            2.0 / 127.0,
            2.0 / 255.0,
            2.0 / 511.0,
            2.0 / 1023.0,
            2.0 / 2047.0,
            2.0 / 4095.0,
            2.0 / 8191.0,
            2.0 / 16383.0,
            2.0 / 32767.0,
            2.0 / 65535.0,
            -4.0 / 5.0,
            -2.0 / 5.0,
            2.0 / 5.0,
            4.0 / 5.0,
            -8.0 / 9.0,
            -4.0 / 9.0,
            -2.0 / 9.0,
            2.0 / 9.0,
            4.0 / 9.0,
            8.0 / 9.0,
        ];

        mulmul
            .iter()
            .map(|&m| {
                let mut row = [0.0f32; 64];
                for (i, value) in row.iter_mut().take(63).enumerate() {
                    *value = (m * 2f64.powf((3.0 - i as f64) / 3.0)) as f32;
                }
                row
            })
            .collect()
    };

    /// Grouped codes split into three `MULS` rows, for 3, 5 and 9 levels.
    static ref GROUPS: [Vec<[u8; 3]>; 3] = {
        let base: [&[u8]; 3] = [
            &[1, 0, 2],
            &[17, 18, 0, 19, 20],
            &[21, 1, 22, 23, 0, 24, 25, 2, 26],
        ];
        let sizes = [32, 128, 1024];

        let mut groups: [Vec<[u8; 3]>; 3] = [Vec::new(), Vec::new(), Vec::new()];
        for (i, levels) in base.iter().enumerate() {
            let len = levels.len();
            groups[i] = (0..sizes[i])
                .map(|code| {
                    if code < len * len * len {
                        [
                            levels[code % len],
                            levels[(code / len) % len],
                            levels[code / (len * len)],
                        ]
                    } else {
                        [0, 0, 0]
                    }
                })
                .collect();
        }
        groups
    };
}

pub(crate) fn init_static() {
    lazy_static::initialize(&MULS);
    lazy_static::initialize(&GROUPS);
}

/// How the samples of one allocated subband are coded.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Quantizer {
    /// One codeword of `bits` carrying three samples.
    Grouped { bits: u32, group: usize },
    /// Three samples of `bits` each, offset by `offset`.
    Plain { bits: u32, offset: i32 },
}

impl Quantizer {
    fn from_code(code: u8) -> Option<Quantizer> {
        match code {
            0 => None,
            GROUPED_3 => Some(Quantizer::Grouped { bits: 5, group: 0 }),
            GROUPED_5 => Some(Quantizer::Grouped { bits: 7, group: 1 }),
            GROUPED_9 => Some(Quantizer::Grouped { bits: 10, group: 2 }),
            bits => Some(Quantizer::Plain {
                bits: u32::from(bits),
                offset: -((1 << (bits - 1)) - 1),
            }),
        }
    }

    /// Reads three samples and scales them with `scale`.
    fn read(self, bs: &mut BitStream, scale: usize, out: &mut [f32; 3]) {
        match self {
            Quantizer::Grouped { bits, group } => {
                let code = bs.get_bits(bits) as usize;
                let rows = GROUPS[group][code];
                for (value, &row) in out.iter_mut().zip(rows.iter()) {
                    *value = MULS[row as usize][scale];
                }
            }
            Quantizer::Plain { bits, offset } => {
                let m = MULS[bits as usize][scale];
                for value in out.iter_mut() {
                    *value = (bs.get_bits(bits) as i32 + offset) as f32 * m;
                }
            }
        }
    }

    /// Reads three samples shared by both channels, scaling them with each
    /// channel's scalefactor.
    fn read_joint(self, bs: &mut BitStream, scales: [usize; 2], out: [&mut [f32; 3]; 2]) {
        let [left, right] = out;

        match self {
            Quantizer::Grouped { bits, group } => {
                let code = bs.get_bits(bits) as usize;
                let rows = GROUPS[group][code];
                for (j, &row) in rows.iter().enumerate() {
                    left[j] = MULS[row as usize][scales[0]];
                    right[j] = MULS[row as usize][scales[1]];
                }
            }
            Quantizer::Plain { bits, offset } => {
                for j in 0..3 {
                    let raw = (bs.get_bits(bits) as i32 + offset) as f32;
                    left[j] = raw * MULS[bits as usize][scales[0]];
                    right[j] = raw * MULS[bits as usize][scales[1]];
                }
            }
        }
    }
}

/// Allocation table, coded subband count and joint stereo bound of a frame.
pub struct FrameLayout {
    pub table: &'static AllocTable,
    pub sblimit: usize,
    pub jsbound: usize,
}

impl FrameLayout {
    pub fn new(header: &Header) -> FrameLayout {
        let index = if header.lsf() == 1 {
            4
        } else {
            let mono = (header.channels() == 1) as usize;
            ALLOC_TRANSLATE[header.sampling_frequency][mono][header.bitrate_index]
        };

        let table = &ALLOC_TABLES[index];
        let sblimit = table.sblimit;

        let jsbound = match header.mode {
            ChannelMode::JointStereo => ((header.mode_extension as usize) << 2) + 4,
            _ => sblimit,
        }
        .min(sblimit);

        FrameLayout {
            table,
            sblimit,
            jsbound,
        }
    }

    /// Allocation field width and quantizer list of subband `sb`.
    fn class(&self, sb: usize) -> (u32, &'static [u8]) {
        let mut first = 0;
        for &(count, nbal, codes) in self.table.runs {
            if sb < first + count {
                return (nbal, codes);
            }
            first += count;
        }
        (0, &[0])
    }
}

struct Allocation {
    quantizers: [[Option<Quantizer>; SBLIMIT]; 2],
    scales: [[[usize; 3]; SBLIMIT]; 2],
}

/// Bit allocation, scalefactor selection and scalefactors.
fn step_one(bs: &mut BitStream, layout: &FrameLayout, channels: usize) -> Allocation {
    let mut alloc = Allocation {
        quantizers: [[None; SBLIMIT]; 2],
        scales: [[[0; 3]; SBLIMIT]; 2],
    };

    for sb in 0..layout.sblimit {
        let (nbal, codes) = layout.class(sb);
        let read = |bs: &mut BitStream| {
            let index = bs.get_bits(nbal) as usize;
            Quantizer::from_code(codes.get(index).copied().unwrap_or(0))
        };

        if sb < layout.jsbound {
            for ch in 0..channels {
                alloc.quantizers[ch][sb] = read(bs);
            }
        } else {
            let quantizer = read(bs);
            for ch in 0..channels {
                alloc.quantizers[ch][sb] = quantizer;
            }
        }
    }

    let mut scfsi = [[0; SBLIMIT]; 2];
    for sb in 0..layout.sblimit {
        for ch in 0..channels {
            if alloc.quantizers[ch][sb].is_some() {
                scfsi[ch][sb] = bs.get_bits_fast(2);
            }
        }
    }

    for sb in 0..layout.sblimit {
        for ch in 0..channels {
            if alloc.quantizers[ch][sb].is_none() {
                continue;
            }

            let scale = &mut alloc.scales[ch][sb];
            match scfsi[ch][sb] {
                0 => {
                    scale[0] = bs.get_bits_fast(6) as usize;
                    scale[1] = bs.get_bits_fast(6) as usize;
                    scale[2] = bs.get_bits_fast(6) as usize;
                }
                1 => {
                    scale[0] = bs.get_bits_fast(6) as usize;
                    scale[1] = scale[0];
                    scale[2] = bs.get_bits_fast(6) as usize;
                }
                2 => {
                    scale[0] = bs.get_bits_fast(6) as usize;
                    scale[1] = scale[0];
                    scale[2] = scale[0];
                }
                _ => {
                    scale[0] = bs.get_bits_fast(6) as usize;
                    scale[1] = bs.get_bits_fast(6) as usize;
                    scale[2] = scale[1];
                }
            }
        }
    }

    alloc
}

/// Samples of one of the 12 scale blocks, three per subband and channel.
fn step_two(
    bs: &mut BitStream,
    layout: &FrameLayout,
    alloc: &Allocation,
    channels: usize,
    part: usize,
    sblimit: usize,
    fraction: &mut [[[f32; SBLIMIT]; 3]; 2],
) {
    *fraction = [[[0.0; SBLIMIT]; 3]; 2];

    let mut samples = [[0.0f32; 3]; 2];

    for sb in 0..layout.sblimit {
        if sb < layout.jsbound || channels == 1 {
            for ch in 0..channels {
                samples[ch] = [0.0; 3];
                if let Some(quantizer) = alloc.quantizers[ch][sb] {
                    quantizer.read(bs, alloc.scales[ch][sb][part], &mut samples[ch]);
                }
            }
        } else {
            samples = [[0.0; 3]; 2];
            if let Some(quantizer) = alloc.quantizers[0][sb] {
                let scales = [alloc.scales[0][sb][part], alloc.scales[1][sb][part]];
                let (left, right) = samples.split_at_mut(1);
                quantizer.read_joint(bs, scales, [&mut left[0], &mut right[0]]);
            }
        }

        for ch in 0..channels {
            for j in 0..3 {
                fraction[ch][j][sb] = samples[ch][j];
            }
        }
    }

    for ch in fraction.iter_mut() {
        for vector in ch.iter_mut() {
            for value in vector[sblimit.min(layout.sblimit)..].iter_mut() {
                *value = 0.0;
            }
        }
    }
}

/// Picks or mixes the channel synthesized by a mono layout.
pub(crate) fn select_single(
    single: Single,
    left: &[f32; SBLIMIT],
    right: &[f32; SBLIMIT],
) -> [f32; SBLIMIT] {
    match single {
        Single::Left => *left,
        Single::Right => *right,
        Single::Mix => {
            let mut mixed = [0.0; SBLIMIT];
            for (sb, value) in mixed.iter_mut().enumerate() {
                *value = (left[sb] + right[sb]) * 0.5;
            }
            mixed
        }
    }
}

/// Decodes a Layer II frame body and feeds the 36 subband vectors of each
/// channel to `synth`.
pub fn decode_frame(header: &Header, bs: &mut BitStream, synth: &mut Synth) -> Result<(), Error> {
    let layout = FrameLayout::new(header);
    let channels = header.channels();
    let sblimit = synth.sblimit();

    let alloc = step_one(bs, &layout, channels);

    let mut fraction = [[[0.0f32; SBLIMIT]; 3]; 2];
    for i in 0..SCALE_BLOCK {
        step_two(bs, &layout, &alloc, channels, i >> 2, sblimit, &mut fraction);

        for j in 0..3 {
            match synth.single() {
                Some(single) => {
                    let mono = select_single(single, &fraction[0][j], &fraction[1][j]);
                    synth.output(&mono, &mono);
                }
                None => synth.output(&fraction[0][j], &fraction[1][j]),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitstream_io::{BigEndian, BitWriter};

    fn stream(fields: &[(u32, u32)]) -> BitStream {
        let mut data = Vec::new();
        {
            let mut writer = BitWriter::<_, BigEndian>::new(&mut data);
            for &(len, value) in fields {
                writer.write(len, value).unwrap();
            }
            writer.byte_align().unwrap();
        }

        let mut bs = BitStream::new();
        bs.next_frame(data.len()).unwrap().copy_from_slice(&data);
        bs
    }

    #[test]
    fn muls_table() {
        assert_eq!(MULS.len(), 27);
        assert!((MULS[2][3] - 2.0 / 3.0).abs() < 1e-6);
        assert!((MULS[3][0] - 4.0 / 7.0).abs() < 1e-6);
        assert_eq!(MULS[5][63], 0.0);
        assert_eq!(MULS[0][10], 0.0);
    }

    #[test]
    fn grouped_codes() {
        // 3 levels: code = a + 3b + 9c
        assert_eq!(GROUPS[0][0], [1, 1, 1]);
        assert_eq!(GROUPS[0][1 + 3 * 2], [0, 2, 1]);
        assert_eq!(GROUPS[0][26], [2, 2, 2]);
        assert_eq!(GROUPS[0][27], [0, 0, 0]);
        assert_eq!(GROUPS[1][124], [20, 20, 20]);
        assert_eq!(GROUPS[2][4 + 9 * 4 + 81 * 4], [0, 0, 0]);
    }

    #[test]
    fn table_selection() {
        // 160 kbit/s joint stereo at 44.1 kHz
        let header = Header::decode(0xfffd_9044).unwrap();
        let layout = FrameLayout::new(&header);
        assert_eq!(layout.sblimit, 27);
        assert_eq!(layout.jsbound, 4);
        assert_eq!(layout.class(0).0, 4);
        assert_eq!(layout.class(3).1[2], GROUPED_5);
        assert_eq!(layout.class(11).0, 3);
        assert_eq!(layout.class(26).0, 2);

        // 32 kbit/s stereo at 32 kHz
        let header = Header::decode(0xfffd_1800).unwrap();
        let layout = FrameLayout::new(&header);
        assert_eq!(layout.sblimit, 12);
        assert_eq!(layout.jsbound, 12);

        // MPEG-2
        let header = Header::decode(0xfff5_8000).unwrap();
        let layout = FrameLayout::new(&header);
        assert_eq!(layout.sblimit, 30);
        assert_eq!(layout.class(10).0, 3);
        assert_eq!(layout.class(11).0, 2);
    }

    #[test]
    fn quantizer_codes() {
        assert_eq!(Quantizer::from_code(0), None);
        assert_eq!(
            Quantizer::from_code(GROUPED_9),
            Some(Quantizer::Grouped { bits: 10, group: 2 })
        );
        assert_eq!(
            Quantizer::from_code(4),
            Some(Quantizer::Plain { bits: 4, offset: -7 })
        );
    }

    #[test]
    fn scalefactor_selection() {
        // mono 32 kbit/s at 48 kHz: 8 subbands with 4 then 3 bit allocations
        let header = Header::decode(0xfffd_14c0).unwrap();
        let layout = FrameLayout::new(&header);
        assert_eq!(layout.sblimit, 8);

        let mut fields = vec![(4, 4), (4, 0)];
        fields.extend(std::iter::repeat((3, 0)).take(6));
        // scfsi 2: one scalefactor for all three parts
        fields.push((2, 2));
        fields.push((6, 9));
        // part 0 samples of subband 0, 15 levels in 4 bits
        fields.extend(vec![(4, 0), (4, 7), (4, 14)]);

        let mut bs = stream(&fields);
        let alloc = step_one(&mut bs, &layout, 1);
        assert_eq!(
            alloc.quantizers[0][0],
            Some(Quantizer::Plain { bits: 4, offset: -7 })
        );
        assert_eq!(alloc.quantizers[0][1], None);
        assert_eq!(alloc.scales[0][0], [9, 9, 9]);

        let mut fraction = [[[1.0; SBLIMIT]; 3]; 2];
        step_two(&mut bs, &layout, &alloc, 1, 0, 32, &mut fraction);

        let m = MULS[4][9];
        assert_eq!(fraction[0][0][0], -7.0 * m);
        assert_eq!(fraction[0][1][0], 0.0);
        assert_eq!(fraction[0][2][0], 7.0 * m);
        assert_eq!(fraction[0][0][1], 0.0);
    }

    #[test]
    fn mixing() {
        let mut left = [0.0; SBLIMIT];
        let mut right = [0.0; SBLIMIT];
        left[0] = 1.0;
        right[0] = 0.5;
        assert_eq!(select_single(Single::Mix, &left, &right)[0], 0.75);
        assert_eq!(select_single(Single::Right, &left, &right)[0], 0.5);
    }
}
