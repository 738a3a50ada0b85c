use crate::bitstream::BitStream;
use crate::config::Single;
use crate::data::{BandInfo, AA_CI, BAND_INFO, PRETAB, SBLIMIT, SLEN, SSLIMIT, STAB};
use crate::header::Header;
use crate::huffman::{big_value_table, count1_codebook, MainData};
use crate::hybrid::Hybrid;
use crate::synth::Synth;
use crate::Error;

use lazy_static::lazy_static;

const GRANULE_LINES: usize = SBLIMIT * SSLIMIT;

/// Largest scalefactor count of a granule (13 short bands of 3 windows).
const MAX_SCALEFACTORS: usize = 39;

type Spectrum = [f32; GRANULE_LINES];
type Scalefactors = [u32; MAX_SCALEFACTORS];

lazy_static! {
    /// `2^(-(i + 210) / 4)` for `i` in `-256..122`.
    static ref GAIN_POW2: Vec<f32> = (-256..122)
        .map(|i| 2f64.powf(-0.25 * f64::from(i + 210)) as f32)
        .collect();

    /// `i^(4/3)`, large enough for a 15 escape plus 13 linbits.
    static ref ISPOW: Vec<f32> = (0..8207)
        .map(|i| f64::from(i).powf(4.0 / 3.0) as f32)
        .collect();

    /// Butterfly coefficients `(cs, ca)` of the alias reduction.
    static ref ANTIALIAS: Vec<(f32, f32)> = AA_CI
        .iter()
        .map(|&c| {
            let sq = (1.0 + c * c).sqrt();
            ((1.0 / sq) as f32, (c / sq) as f32)
        })
        .collect();

    /// Intensity stereo ratios by table (MPEG-1 tangents, then the two
    /// MPEG-2 power series) and by whether mid/side is active.
    static ref INTENSITY: Vec<[IntensityRatios; 2]> = {
        let sqrt2 = std::f64::consts::SQRT_2;

        let tangents = |scale: f64| {
            let mut ratios = IntensityRatios::default();
            for i in 0..16 {
                let t = (i as f64 * std::f64::consts::PI / 12.0).tan();
                ratios.left[i] = (scale * t / (1.0 + t)) as f32;
                ratios.right[i] = (scale / (1.0 + t)) as f32;
            }
            ratios
        };

        let powers = |j: usize, scale: f64| {
            let base = 2f64.powf(-0.25 * (j as f64 + 1.0));
            let mut ratios = IntensityRatios::default();
            for i in 0..16 {
                let (mut p1, mut p2) = (1.0, 1.0);
                if i > 0 {
                    if i & 1 == 1 {
                        p1 = base.powf((i as f64 + 1.0) * 0.5);
                    } else {
                        p2 = base.powf(i as f64 * 0.5);
                    }
                }
                ratios.left[i] = (scale * p1) as f32;
                ratios.right[i] = (scale * p2) as f32;
            }
            ratios
        };

        vec![
            [tangents(1.0), tangents(sqrt2)],
            [powers(0, 1.0), powers(0, sqrt2)],
            [powers(1, 1.0), powers(1, sqrt2)],
        ]
    };

    /// MPEG-2 scalefactor lengths packed as four 3 bit fields, the `STAB`
    /// column in bits 12..15 and the preflag in bit 15.
    static ref N_SLEN2: Vec<u32> = {
        let mut table = vec![0; 512];
        for i in 0..5 {
            for j in 0..5 {
                for k in 0..4 {
                    for l in 0..4 {
                        table[l + k * 4 + j * 16 + i * 80] =
                            i as u32 | (j << 3) as u32 | (k << 6) as u32 | (l << 9) as u32;
                    }
                }
            }
        }
        for i in 0..5 {
            for j in 0..5 {
                for k in 0..4 {
                    table[k + j * 4 + i * 20 + 400] =
                        i as u32 | (j << 3) as u32 | (k << 6) as u32 | (1 << 12);
                }
            }
        }
        for i in 0..4 {
            for j in 0..3 {
                table[j + i * 3 + 500] = i as u32 | (j << 3) as u32 | (2 << 12) | (1 << 15);
            }
        }
        table
    };

    /// Scalefactor lengths of the intensity coded second channel.
    static ref I_SLEN2: Vec<u32> = {
        let mut table = vec![0; 256];
        for i in 0..5 {
            for j in 0..6 {
                for k in 0..6 {
                    table[k + j * 6 + i * 36] =
                        i as u32 | (j << 3) as u32 | (k << 6) as u32 | (3 << 12);
                }
            }
        }
        for i in 0..4 {
            for j in 0..4 {
                for k in 0..4 {
                    table[k + j * 4 + i * 16 + 180] =
                        i as u32 | (j << 3) as u32 | (k << 6) as u32 | (4 << 12);
                }
            }
        }
        for i in 0..4 {
            for j in 0..3 {
                table[j + i * 3 + 244] = i as u32 | (j << 3) as u32 | (5 << 12);
            }
        }
        table
    };

    /// Scalefactor band runs of each sample rate, for mixed, short and
    /// long blocks.
    static ref BAND_RUNS: Vec<[Vec<BandRun>; 3]> = BAND_INFO
        .iter()
        .map(|bi| {
            let mut mixed = Vec::new();
            let mut pos = 0;
            for band in 0..8 {
                mixed.push(BandRun {
                    pairs: bi.long_diff[band] >> 1,
                    pos,
                    window: 3,
                    band,
                });
                pos += bi.long_diff[band];
            }
            push_short_runs(&mut mixed, bi, 3, pos);

            let mut short = Vec::new();
            push_short_runs(&mut short, bi, 0, 0);

            let mut long = Vec::new();
            let mut pos = 0;
            for band in 0..22 {
                long.push(BandRun {
                    pairs: bi.long_diff[band] >> 1,
                    pos,
                    window: 3,
                    band,
                });
                pos += bi.long_diff[band];
            }

            [mixed, short, long]
        })
        .collect();
}

pub(crate) fn init_static() {
    lazy_static::initialize(&GAIN_POW2);
    lazy_static::initialize(&ISPOW);
    lazy_static::initialize(&ANTIALIAS);
    lazy_static::initialize(&INTENSITY);
    lazy_static::initialize(&N_SLEN2);
    lazy_static::initialize(&I_SLEN2);
    lazy_static::initialize(&BAND_RUNS);
}

#[derive(Default)]
struct IntensityRatios {
    left: [f32; 16],
    right: [f32; 16],
}

/// Frequency lines sharing one scalefactor. Window 3 marks a long band.
#[derive(Debug, Clone, Copy)]
struct BandRun {
    pairs: usize,
    pos: usize,
    window: usize,
    band: usize,
}

fn push_short_runs(runs: &mut Vec<BandRun>, bi: &BandInfo, first: usize, mut pos: usize) {
    for band in first..13 {
        let pairs = bi.short_diff[band] >> 1;
        for window in 0..3 {
            runs.push(BandRun {
                pairs,
                pos: pos + window,
                window,
                band,
            });
        }
        pos += 6 * pairs;
    }
}

/// Gain of a scalefactor band. Exponents past either end of the table
/// saturate.
fn gain(exponent: i32) -> f32 {
    let index = (exponent + 256).max(0) as usize;
    GAIN_POW2[index.min(GAIN_POW2.len() - 1)]
}

fn long_limit(bi: &BandInfo, band: usize, sblimit: usize) -> usize {
    let limit = (bi.long_idx[band] as i32 - 1 + 8) / 18 + 1;
    (limit as usize).min(sblimit)
}

fn short_limit(bi: &BandInfo, band: usize, sblimit: usize) -> usize {
    let limit = (bi.short_idx[band] as i32 - 1) / 18 + 1;
    (limit as usize).min(sblimit)
}

/// Side information of one granule of one channel, plus the band limits
/// found while dequantizing it.
#[derive(Debug, Clone, Copy, Default)]
struct GranuleInfo {
    part2_3_length: u32,
    /// Number of big value pairs.
    big_values: usize,
    global_gain: i32,
    scalefac_compress: u32,
    block_type: u32,
    mixed: bool,
    table_select: [u32; 3],
    subblock_gain: [i32; 3],
    /// Region boundaries in pairs.
    region1start: usize,
    region2start: usize,
    preflag: bool,
    scalefac_scale: bool,
    count1table_select: bool,
    /// Reuse flags of MPEG-1 second granules.
    scfsi: Option<u32>,

    maxband: [usize; 3],
    maxbandl: usize,
    maxb: usize,
}

impl GranuleInfo {
    fn is_short(&self) -> bool {
        self.block_type == 2
    }
}

struct SideInfo {
    main_data_begin: usize,
    /// Indexed by channel, then granule.
    granules: [[GranuleInfo; 2]; 2],
}

fn read_side_info(bs: &mut BitStream, header: &Header) -> Result<SideInfo, Error> {
    let lsf = header.lsf();
    let channels = header.channels();

    let main_data_begin = bs.get_bits(if lsf == 0 { 9 } else { 8 }) as usize;
    let private_bits = match (lsf, channels) {
        (0, 1) => 5,
        (0, _) => 3,
        (_, 1) => 1,
        _ => 2,
    };
    bs.skip_bits(private_bits);

    let mut side = SideInfo {
        main_data_begin,
        granules: [[GranuleInfo::default(); 2]; 2],
    };

    if lsf == 0 {
        for ch in 0..channels {
            side.granules[ch][1].scfsi = Some(bs.get_bits_fast(4));
        }
    }

    for gr in 0..(2 >> lsf) {
        for ch in 0..channels {
            read_granule(bs, &mut side.granules[ch][gr], header)?;
        }
    }

    Ok(side)
}

fn read_granule(bs: &mut BitStream, info: &mut GranuleInfo, header: &Header) -> Result<(), Error> {
    let lsf = header.lsf();
    let bi = &BAND_INFO[header.sampling_frequency];

    info.part2_3_length = bs.get_bits(12);

    let big_values = bs.get_bits(9);
    if big_values > 288 {
        return Err(Error::BigValuesTooLarge(big_values));
    }
    info.big_values = big_values as usize;

    info.global_gain = bs.get_bits_fast(8) as i32;
    info.scalefac_compress = bs.get_bits(if lsf == 0 { 4 } else { 9 });

    if bs.get1bit() == 1 {
        info.block_type = bs.get_bits_fast(2);
        info.mixed = bs.get1bit() == 1;
        info.table_select[0] = bs.get_bits_fast(5);
        info.table_select[1] = bs.get_bits_fast(5);
        info.table_select[2] = 0;
        for gain in info.subblock_gain.iter_mut() {
            *gain = bs.get_bits_fast(3) as i32;
        }

        if info.block_type == 0 {
            return Err(Error::InvalidBlockType);
        }

        info.region1start = if lsf == 0 || info.block_type == 2 {
            36 >> 1
        } else if header.sampling_frequency == 8 {
            108 >> 1
        } else {
            54 >> 1
        };
        info.region2start = 576 >> 1;
    } else {
        for select in info.table_select.iter_mut() {
            *select = bs.get_bits_fast(5);
        }
        let r0c = bs.get_bits_fast(4) as usize;
        let r1c = bs.get_bits_fast(3) as usize;

        info.region1start = bi.long_idx[r0c + 1] >> 1;
        info.region2start = if r0c + r1c + 2 > 22 {
            576 >> 1
        } else {
            bi.long_idx[r0c + r1c + 2] >> 1
        };
        info.block_type = 0;
        info.mixed = false;
    }

    if lsf == 0 {
        info.preflag = bs.get1bit() == 1;
    }
    info.scalefac_scale = bs.get1bit() == 1;
    info.count1table_select = bs.get1bit() == 1;

    Ok(())
}

/// MPEG-1 scalefactors. Returns the number of bits read.
fn scale_factors_1(bs: &mut BitStream, scf: &mut Scalefactors, info: &GranuleInfo) -> u32 {
    let num0 = SLEN[0][info.scalefac_compress as usize];
    let num1 = SLEN[1][info.scalefac_compress as usize];

    if info.is_short() {
        let mut n = 0;
        let mut read = |count: usize, bits: u32, bs: &mut BitStream| {
            for _ in 0..count {
                scf[n] = bs.get_bits_fast(bits);
                n += 1;
            }
        };

        let bits = if info.mixed {
            read(8, num0, bs);
            read(9, num0, bs);
            num0 * 17 + num1 * 18
        } else {
            read(18, num0, bs);
            (num0 + num1) * 18
        };
        read(18, num1, bs);
        read(3, 0, bs);

        return bits;
    }

    match info.scfsi {
        None => {
            for (i, value) in scf.iter_mut().take(21).enumerate() {
                *value = bs.get_bits_fast(if i < 11 { num0 } else { num1 });
            }
            scf[21] = 0;
            (num0 + num1) * 10 + num0
        }
        Some(scfsi) => {
            let groups = [
                (0, 6, num0, 0x8),
                (6, 5, num0, 0x4),
                (11, 5, num1, 0x2),
                (16, 5, num1, 0x1),
            ];

            let mut bits = 0;
            for &(first, count, num, flag) in groups.iter() {
                // a set flag keeps the first granule's values
                if scfsi & flag == 0 {
                    for value in scf[first..first + count].iter_mut() {
                        *value = bs.get_bits_fast(num);
                    }
                    bits += num * count as u32;
                }
            }
            scf[21] = 0;
            bits
        }
    }
}

/// MPEG-2 scalefactors. `intensity_channel` selects the lengths of an
/// intensity coded second channel. Returns the number of bits read.
fn scale_factors_2(
    bs: &mut BitStream,
    scf: &mut Scalefactors,
    info: &mut GranuleInfo,
    intensity_channel: bool,
) -> u32 {
    let mut slen = if intensity_channel {
        I_SLEN2[(info.scalefac_compress >> 1) as usize]
    } else {
        N_SLEN2[info.scalefac_compress as usize]
    };

    info.preflag = (slen >> 15) & 1 == 1;

    let n = match (info.is_short(), info.mixed) {
        (false, _) => 0,
        (true, false) => 1,
        (true, true) => 2,
    };
    let counts = STAB[n][((slen >> 12) & 7) as usize];

    let mut index = 0;
    let mut bits = 0;
    for &count in counts.iter() {
        let num = slen & 7;
        slen >>= 3;

        for _ in 0..count {
            scf[index] = if num > 0 { bs.get_bits_fast(num) } else { 0 };
            index += 1;
        }
        bits += count as u32 * num;
    }

    for value in scf[index..].iter_mut().take((n << 1) + 1) {
        *value = 0;
    }

    bits
}

/// Walks the band runs of a granule, tracking the output position and the
/// gain of the current scalefactor band.
struct Cursor<'a> {
    runs: std::slice::Iter<'a, BandRun>,
    scf: std::slice::Iter<'a, u32>,
    pretab: bool,
    /// Gain exponent base of the three short windows and of long bands.
    base: [i32; 4],
    shift: u32,

    left: usize,
    pos: usize,
    step: usize,
    window: usize,
    band: usize,
    gain: f32,
}

impl<'a> Cursor<'a> {
    fn next_pair(&mut self) {
        if self.left == 0 {
            self.open_run();
        }
        self.left = self.left.saturating_sub(1);
    }

    fn open_run(&mut self) {
        match self.runs.next() {
            Some(run) => {
                self.left = run.pairs;
                self.pos = run.pos;
                self.window = run.window;
                self.band = run.band;
                self.step = if run.window == 3 { 1 } else { 3 };

                let mut scf = self.scf.next().copied().unwrap_or(0);
                if self.pretab && run.window == 3 {
                    scf += PRETAB[run.band];
                }
                self.gain = gain(self.base[run.window] + ((scf as i32) << self.shift));
            }
            None => {
                self.left = usize::MAX;
                self.pos = GRANULE_LINES;
                self.gain = 0.0;
            }
        }
    }

    fn write(&mut self, xr: &mut Spectrum, value: f32) {
        if let Some(line) = xr.get_mut(self.pos) {
            *line = value;
        }
        self.pos += self.step;
    }
}

/// Magnitude and sign of one big value component.
fn big_value(
    reader: &mut MainData,
    mut x: u32,
    linbits: u32,
    gain: f32,
) -> Result<Option<f32>, Error> {
    if x == 15 && linbits > 0 {
        x += reader.read(linbits)?;
    }
    if x == 0 {
        return Ok(None);
    }

    let magnitude = ISPOW.get(x as usize).copied().unwrap_or(0.0) * gain;
    Ok(Some(if reader.read_bit()? {
        -magnitude
    } else {
        magnitude
    }))
}

/// Huffman decodes and requantizes the spectrum of one granule. The
/// bitstream is left at the end of the granule's part 3 data.
#[allow(clippy::too_many_arguments)]
fn dequantize(
    bs: &mut BitStream,
    xr: &mut Spectrum,
    scf: &Scalefactors,
    info: &mut GranuleInfo,
    sfreq: usize,
    part2_bits: u32,
    granule_start: usize,
    gain_offset: i32,
    sblimit: usize,
) -> Result<(), Error> {
    if info.part2_3_length < part2_bits {
        return Err(Error::NegativePart3Length {
            part2_3_length: info.part2_3_length,
            part2_bits,
        });
    }

    let bi = &BAND_INFO[sfreq];
    let part3_end = granule_start + info.part2_3_length as usize;
    let huffman_start = bs.bit_position();
    let remaining =
        |reader: &MainData| part3_end as isize - (huffman_start + reader.position()) as isize;

    let bv = info.big_values;
    let mut regions = [0; 3];
    if bv <= info.region1start {
        regions[0] = bv;
    } else {
        regions[0] = info.region1start;
        if bv <= info.region2start {
            regions[1] = bv - regions[0];
        } else {
            regions[1] = info.region2start - regions[0];
            regions[2] = bv - info.region2start;
        }
    }

    let base = gain_offset - info.global_gain;
    let runs = match (info.is_short(), info.mixed) {
        (true, true) => &BAND_RUNS[sfreq][0],
        (true, false) => &BAND_RUNS[sfreq][1],
        (false, _) => &BAND_RUNS[sfreq][2],
    };

    let mut cursor = Cursor {
        runs: runs.iter(),
        scf: scf.iter(),
        pretab: info.preflag && !info.is_short(),
        base: [
            base + 8 * info.subblock_gain[0],
            base + 8 * info.subblock_gain[1],
            base + 8 * info.subblock_gain[2],
            base,
        ],
        shift: 1 + info.scalefac_scale as u32,
        left: 0,
        pos: 0,
        step: 1,
        window: 3,
        band: 0,
        gain: 0.0,
    };

    // last band holding a nonzero value, per window
    let mut max: [i32; 4] = if info.is_short() && info.mixed {
        [2, 2, 2, -1]
    } else {
        [-1; 4]
    };

    let (bytes, offset) = bs.tail();
    let mut reader = MainData::new(bytes, offset)?;

    // short blocks carry no third region
    let region_count = if info.is_short() { 2 } else { 3 };
    for (region, &pairs) in regions.iter().enumerate().take(region_count) {
        if pairs == 0 {
            continue;
        }
        let table = big_value_table(info.table_select[region])?;

        for _ in 0..pairs {
            cursor.next_pair();
            let value = match table.codebook {
                Some(codebook) => reader.read_huffman(codebook)?,
                None => 0,
            };

            for &x in [u32::from(value >> 4), u32::from(value & 0xf)].iter() {
                let sample = big_value(&mut reader, x, table.linbits, cursor.gain)?;
                if sample.is_some() {
                    max[cursor.window] = cursor.band as i32;
                }
                cursor.write(xr, sample.unwrap_or(0.0));
            }
        }
    }

    let codebook = count1_codebook(info.count1table_select)?;
    let mut quads = (288 - bv) >> 1;
    while quads > 0 && remaining(&reader) > 0 {
        quads -= 1;

        let code = reader.read_huffman(codebook)?;
        // a quadruple running past part 3 is discarded whole
        let nonzero = code.count_ones();
        if remaining(&reader) <= 0 || remaining(&reader) < nonzero as isize {
            break;
        }
        let signs = reader.read(nonzero)?;

        let mut sign = nonzero;
        for i in 0..4 {
            if i & 1 == 0 {
                cursor.next_pair();
            }

            if code & (0x8 >> i) != 0 {
                max[cursor.window] = cursor.band as i32;
                sign -= 1;
                let value = if (signs >> sign) & 1 == 1 {
                    -cursor.gain
                } else {
                    cursor.gain
                };
                cursor.write(xr, value);
            } else {
                cursor.write(xr, 0.0);
            }
        }
    }

    if info.is_short() {
        for (w, band) in info.maxband.iter_mut().enumerate() {
            *band = (max[w] + 1) as usize;
        }
        info.maxbandl = (max[3] + 1) as usize;

        let rmax = max[0].max(max[1]).max(max[2]) + 1;
        info.maxb = if rmax > 0 {
            short_limit(bi, rmax as usize, sblimit)
        } else {
            long_limit(bi, info.maxbandl, sblimit)
        };
    } else {
        info.maxbandl = (max[3] + 1) as usize;
        info.maxb = long_limit(bi, info.maxbandl, sblimit);
    }

    // skip stuffing up to the granule end, or hand back an overrun
    let consumed = reader.position();
    let left = remaining(&reader);
    bs.skip_bits(consumed);
    if left >= 0 {
        bs.skip_bits(left as usize);
    } else {
        bs.back_bits((-left) as usize);
    }

    Ok(())
}

fn mid_side(xr: &mut [Spectrum; 2], lines: usize) {
    let (left, right) = xr.split_at_mut(1);
    for (l, r) in left[0].iter_mut().zip(right[0].iter_mut()).take(lines) {
        let (mid, side) = (*l, *r);
        *l = mid + side;
        *r = mid - side;
    }
}

/// Rebuilds the second channel of intensity coded bands from the first,
/// above the last nonzero band of the second channel.
fn intensity_stereo(
    xr: &mut [Spectrum; 2],
    scf: &Scalefactors,
    info: &GranuleInfo,
    bi: &BandInfo,
    ms: bool,
    lsf: usize,
) {
    let table = lsf + (info.scalefac_compress as usize & lsf);
    let ratios = &INTENSITY[table][ms as usize];

    let (left, right) = xr.split_at_mut(1);
    let (left, right) = (&mut left[0], &mut right[0]);

    let mut apply = |is_pos: u32, start: usize, count: usize, step: usize| {
        if is_pos == 7 {
            return;
        }
        let t1 = ratios.left.get(is_pos as usize).copied().unwrap_or(0.0);
        let t2 = ratios.right.get(is_pos as usize).copied().unwrap_or(0.0);

        for idx in (start..).step_by(step).take(count) {
            if idx >= GRANULE_LINES {
                break;
            }
            let v = left[idx];
            left[idx] = v * t1;
            right[idx] = v * t2;
        }
    };

    if info.is_short() {
        let mixed = info.mixed as usize;
        let mut do_long = info.mixed;

        for window in 0..3 {
            let first = info.maxband[window];
            if first > 3 {
                do_long = false;
            }

            for sfb in first..12 {
                let is_pos = scf[(sfb * 3 + window).saturating_sub(mixed)];
                apply(is_pos, bi.short_idx[sfb] + window, bi.short_diff[sfb], 3);
            }

            // band 12 reads the zero filled slot after band 11
            if first <= 12 {
                let is_pos = scf[36 + window - mixed];
                apply(is_pos, bi.short_idx[12] + window, bi.short_diff[12], 3);
            }
        }

        if do_long {
            for sfb in info.maxbandl..8 {
                apply(scf[sfb], bi.long_idx[sfb], bi.long_diff[sfb], 1);
            }
        }
    } else if info.maxbandl <= 21 {
        for sfb in info.maxbandl..21 {
            apply(scf[sfb], bi.long_idx[sfb], bi.long_diff[sfb], 1);
        }
        // band 21 has no scalefactor of its own
        apply(scf[20], bi.long_idx[21], bi.long_diff[21], 1);
    }
}

fn antialias(xr: &mut Spectrum, info: &GranuleInfo) {
    let sblim = if info.is_short() {
        if !info.mixed {
            return;
        }
        1
    } else {
        info.maxb.saturating_sub(1)
    };

    for sb in 0..sblim {
        let upper = sb * SSLIMIT + SSLIMIT - 1;
        let lower = (sb + 1) * SSLIMIT;

        for (i, &(cs, ca)) in ANTIALIAS.iter().enumerate() {
            let bu = xr[upper - i];
            let bd = xr[lower + i];
            xr[upper - i] = bu * cs - bd * ca;
            xr[lower + i] = bd * cs + bu * ca;
        }
    }
}

fn to_subbands(xr: &Spectrum) -> [[f32; SSLIMIT]; SBLIMIT] {
    let mut bands = [[0.0; SSLIMIT]; SBLIMIT];
    for (band, lines) in bands.iter_mut().zip(xr.chunks_exact(SSLIMIT)) {
        band.copy_from_slice(lines);
    }
    bands
}

/// Layer III decoder state carried between frames: the hybrid filter
/// overlap. The bit reservoir lives in the `BitStream`.
pub struct Layer3 {
    hybrid: Hybrid,
}

impl Default for Layer3 {
    fn default() -> Self {
        Layer3::new()
    }
}

impl Layer3 {
    pub fn new() -> Self {
        Layer3 {
            hybrid: Hybrid::new(),
        }
    }

    /// Decodes the granules of one frame. The cursor of `bs` must sit at
    /// the side information.
    pub fn decode_frame(
        &mut self,
        header: &Header,
        bs: &mut BitStream,
        synth: &mut Synth,
    ) -> Result<(), Error> {
        let stereo = header.channels();
        let single = synth.single();
        let ms = header.is_ms_stereo();
        let intensity = header.is_intensity_stereo();
        let lsf = header.lsf();
        let sfreq = header.sampling_frequency;
        let bi = &BAND_INFO[sfreq];
        let sblimit = synth.sblimit();

        let mix = stereo == 2 && single == Some(Single::Mix);
        // mixing halves through the gain, mid/side scales by 1/sqrt(2)
        let gain_offset = if mix { 4 } else { 0 } + if ms { 2 } else { 0 };

        let mut side = read_side_info(bs, header)?;
        bs.set_pointer(header.side_info_size(), side.main_data_begin)?;

        let mut scalefacs: [Scalefactors; 2] = [[0; MAX_SCALEFACTORS]; 2];

        for gr in 0..(2 >> lsf) {
            let mut xr: [Spectrum; 2] = [[0.0; GRANULE_LINES]; 2];

            for ch in 0..stereo {
                let info = &mut side.granules[ch][gr];
                let start = bs.bit_position();

                let part2_bits = if lsf == 1 {
                    scale_factors_2(bs, &mut scalefacs[ch], info, intensity && ch == 1)
                } else {
                    scale_factors_1(bs, &mut scalefacs[ch], info)
                };

                dequantize(
                    bs,
                    &mut xr[ch],
                    &scalefacs[ch],
                    info,
                    sfreq,
                    part2_bits,
                    start,
                    gain_offset,
                    sblimit,
                )?;
            }

            // granule info driving the first output channel
            let mut source = 0;

            if stereo == 2 {
                if ms {
                    let maxb = side.granules[0][gr].maxb.max(side.granules[1][gr].maxb);
                    mid_side(&mut xr, SSLIMIT * maxb);
                }

                if intensity {
                    intensity_stereo(&mut xr, &scalefacs[1], &side.granules[1][gr], bi, ms, lsf);
                }

                if ms || intensity || mix {
                    let maxb = side.granules[0][gr].maxb.max(side.granules[1][gr].maxb);
                    side.granules[0][gr].maxb = maxb;
                    side.granules[1][gr].maxb = maxb;
                }

                match single {
                    Some(Single::Mix) => {
                        let lines = SSLIMIT * side.granules[1][gr].maxb;
                        let (left, right) = xr.split_at_mut(1);
                        for (l, r) in left[0].iter_mut().zip(right[0].iter()).take(lines) {
                            *l += *r;
                        }
                    }
                    Some(Single::Right) => {
                        xr[0] = xr[1];
                        source = 1;
                    }
                    _ => {}
                }
            }

            let channels = if single.is_some() { 1 } else { stereo };
            let mut out = [[[0.0f32; SBLIMIT]; SSLIMIT]; 2];

            for ch in 0..channels {
                let info = side.granules[if ch == 0 { source } else { ch }][gr];
                if info.maxb == 0 || info.maxb > SBLIMIT {
                    return Err(Error::InvalidSubbandLimit(info.maxb));
                }

                antialias(&mut xr[ch], &info);
                let bands = to_subbands(&xr[ch]);
                self.hybrid
                    .process(&bands, &mut out[ch], ch, info.block_type, info.mixed, info.maxb)?;
            }

            for ss in 0..SSLIMIT {
                if channels == 1 {
                    synth.output(&out[0][ss], &out[0][ss]);
                } else {
                    synth.output(&out[0][ss], &out[1][ss]);
                }
            }
        }

        Ok(())
    }
}
