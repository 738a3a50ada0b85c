use crate::config::{DecoderConfig, DownSample, Resolution, Single};
use crate::data::{SBLIMIT, SYNTH_WINDOW_BASE};

use lazy_static::lazy_static;

/// History slots per half buffer: 17 matrixed values for each of 16 offsets.
const HISTORY_LEN: usize = 0x110;

/// Interleaved PCM produced by one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum PcmBuffer {
    S16(Vec<i16>),
    /// Unsigned 8 bit samples biased by 128.
    U8(Vec<u8>),
}

impl PcmBuffer {
    pub fn new(resolution: Resolution) -> PcmBuffer {
        match resolution {
            Resolution::Bits16 => PcmBuffer::S16(Vec::with_capacity(2304)),
            Resolution::Bits8 => PcmBuffer::U8(Vec::with_capacity(2304)),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PcmBuffer::S16(samples) => samples.len(),
            PcmBuffer::U8(samples) => samples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        match self {
            PcmBuffer::S16(samples) => samples.clear(),
            PcmBuffer::U8(samples) => samples.clear(),
        }
    }

    /// Overwrites every sample with silence.
    pub fn mute(&mut self) {
        match self {
            PcmBuffer::S16(samples) => samples.iter_mut().for_each(|s| *s = 0),
            PcmBuffer::U8(samples) => samples.iter_mut().for_each(|s| *s = 128),
        }
    }

    /// Sample at `index` widened to 16 bits.
    pub fn get(&self, index: usize) -> Option<i16> {
        match self {
            PcmBuffer::S16(samples) => samples.get(index).copied(),
            PcmBuffer::U8(samples) => samples
                .get(index)
                .map(|&s| ((i16::from(s) - 128) << 8)),
        }
    }

    fn put(&mut self, index: usize, sample: i16) {
        match self {
            PcmBuffer::S16(samples) => {
                if index >= samples.len() {
                    samples.resize(index + 1, 0);
                }
                samples[index] = sample;
            }
            PcmBuffer::U8(samples) => {
                if index >= samples.len() {
                    samples.resize(index + 1, 128);
                }
                samples[index] = CONV16TO8[((sample >> 3) + 4096) as usize];
            }
        }
    }
}

/// How the synthesized channels are laid out in the PCM buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Two channels, interleaved.
    Stereo,
    /// One channel, contiguous.
    Mono,
    /// One synthesized channel written to both interleaved slots.
    Mono2Stereo,
}

impl Layout {
    pub fn new(config: &DecoderConfig, stream_channels: usize) -> Layout {
        match config.single(stream_channels) {
            None => Layout::Stereo,
            Some(_) if stream_channels == 1 && config.force_stereo => Layout::Mono2Stereo,
            Some(_) => Layout::Mono,
        }
    }

    pub fn channels(self) -> usize {
        match self {
            Layout::Mono => 1,
            _ => 2,
        }
    }
}

/// 32 band polyphase synthesis filter with the history of both channels.
pub struct SynthesisFilter {
    buffs: [[[f32; HISTORY_LEN]; 2]; 2],
    bo: usize,
    down_sample: DownSample,
}

impl SynthesisFilter {
    pub fn new(down_sample: DownSample) -> SynthesisFilter {
        SynthesisFilter {
            buffs: [[[0.0; HISTORY_LEN]; 2]; 2],
            bo: 1,
            down_sample,
        }
    }

    /// Samples produced per call and channel.
    pub fn samples_per_call(&self) -> usize {
        SBLIMIT >> self.down_sample.shift()
    }

    /// Matrixes one subband vector into the history of `channel` and
    /// returns the unclipped window sums.
    fn window(&mut self, bands: &[f32; SBLIMIT], channel: usize, sums: &mut [f32; SBLIMIT]) {
        if channel == 0 {
            self.bo = self.bo.wrapping_sub(1) & 0xf;
        }
        let bo = self.bo;

        let mut d = [0.0f32; SBLIMIT];
        dct(&bands[..], &mut d[..]);

        let half = bo & 1;
        {
            let (fresh, other) = if half == 0 {
                let (a, b) = self.buffs[channel].split_at_mut(1);
                (&mut a[0], &mut b[0])
            } else {
                let (a, b) = self.buffs[channel].split_at_mut(1);
                (&mut b[0], &mut a[0])
            };

            for k in 0..16 {
                fresh[k * 16 + bo] = d[16 + k];
                other[k * 16 + bo] = -d[16 - k];
            }
            fresh[16 * 16 + bo] = 0.0;
            other[16 * 16 + bo] = -d[0];
        }

        let history = &self.buffs[channel][half];
        let step = 1 << self.down_sample.shift();

        for (k, j) in (0..SBLIMIT).step_by(step).enumerate() {
            let col = if j <= 16 { j } else { 32 - j };
            let window = &SYNTH_WINDOW[j][16 - bo..32 - bo];
            let taps = &history[col * 16..col * 16 + 16];

            sums[k] = window.iter().zip(taps).map(|(w, v)| w * v).sum();
        }
    }

    /// Interleaved synthesis: writes `channel` at every other slot from
    /// `point` and advances `point` past both channels.
    pub fn synth(
        &mut self,
        bands: &[f32; SBLIMIT],
        channel: usize,
        out: &mut PcmBuffer,
        point: &mut usize,
    ) -> u32 {
        let mut sums = [0.0; SBLIMIT];
        self.window(bands, channel, &mut sums);

        let count = self.samples_per_call();
        let mut clips = 0;
        for (j, &sum) in sums[..count].iter().enumerate() {
            let (sample, clipped) = write_sample(sum);
            clips += clipped as u32;
            out.put(*point + channel + 2 * j, sample);
        }

        *point += 2 * count;
        clips
    }

    pub fn synth_mono(&mut self, bands: &[f32; SBLIMIT], out: &mut PcmBuffer, point: &mut usize) -> u32 {
        let mut sums = [0.0; SBLIMIT];
        self.window(bands, 0, &mut sums);

        let count = self.samples_per_call();
        let mut clips = 0;
        for (j, &sum) in sums[..count].iter().enumerate() {
            let (sample, clipped) = write_sample(sum);
            clips += clipped as u32;
            out.put(*point + j, sample);
        }

        *point += count;
        clips
    }

    pub fn synth_mono2stereo(
        &mut self,
        bands: &[f32; SBLIMIT],
        out: &mut PcmBuffer,
        point: &mut usize,
    ) -> u32 {
        let mut sums = [0.0; SBLIMIT];
        self.window(bands, 0, &mut sums);

        let count = self.samples_per_call();
        let mut clips = 0;
        for (j, &sum) in sums[..count].iter().enumerate() {
            let (sample, clipped) = write_sample(sum);
            clips += clipped as u32;
            out.put(*point + 2 * j, sample);
            out.put(*point + 2 * j + 1, sample);
        }

        *point += 2 * count;
        clips
    }
}

/// Rounds to the nearest sample and saturates. The flag reports clipping.
#[inline]
fn write_sample(sum: f32) -> (i16, bool) {
    if sum > 32767.0 {
        (i16::max_value(), true)
    } else if sum < -32768.0 {
        (i16::min_value(), true)
    } else {
        (sum.round() as i16, false)
    }
}

/// Synthesis filter plus the PCM buffer and write position of the frame
/// being decoded.
pub struct Synth {
    filter: SynthesisFilter,
    pcm: PcmBuffer,
    point: usize,
    layout: Layout,
    single: Option<Single>,
    sblimit: usize,
    clip_count: u64,
}

impl Synth {
    pub fn new(config: &DecoderConfig) -> Synth {
        Synth {
            filter: SynthesisFilter::new(config.down_sample),
            pcm: PcmBuffer::new(config.resolution),
            point: 0,
            layout: Layout::Stereo,
            single: None,
            sblimit: config.down_sample.sblimit(),
            clip_count: 0,
        }
    }

    /// Channel fed to a mono layout, `None` for stereo output.
    pub fn single(&self) -> Option<Single> {
        self.single
    }

    /// Subbands kept after down sampling.
    pub fn sblimit(&self) -> usize {
        self.sblimit
    }

    pub fn begin_frame(&mut self, layout: Layout, single: Option<Single>) {
        self.layout = layout;
        self.single = match layout {
            Layout::Stereo => None,
            _ => single,
        };
        self.pcm.clear();
        self.point = 0;
    }

    /// Synthesizes one subband vector per channel. Mono layouts only use
    /// `left`.
    pub fn output(&mut self, left: &[f32; SBLIMIT], right: &[f32; SBLIMIT]) {
        let clips = match self.layout {
            Layout::Stereo => {
                let mut p1 = self.point;
                self.filter.synth(left, 0, &mut self.pcm, &mut p1)
                    + self.filter.synth(right, 1, &mut self.pcm, &mut self.point)
            }
            Layout::Mono => self.filter.synth_mono(left, &mut self.pcm, &mut self.point),
            Layout::Mono2Stereo => {
                self.filter
                    .synth_mono2stereo(left, &mut self.pcm, &mut self.point)
            }
        };

        self.clip_count += u64::from(clips);
    }

    pub fn pcm(&self) -> &PcmBuffer {
        &self.pcm
    }

    pub fn pcm_mut(&mut self) -> &mut PcmBuffer {
        &mut self.pcm
    }

    pub fn clip_count(&self) -> u64 {
        self.clip_count
    }
}

/// Type-II DCT of a power of two length, `out[k] = sum x[n] cos((2n+1)k pi/2N)`,
/// split recursively into even and odd halves.
fn dct(input: &[f32], output: &mut [f32]) {
    let n = input.len();
    if n == 1 {
        output[0] = input[0];
        return;
    }

    let half = n / 2;
    let pnts = &DCT_PNTS[half.trailing_zeros() as usize];

    let mut even = [0.0f32; 16];
    let mut odd = [0.0f32; 16];
    for i in 0..half {
        even[i] = input[i] + input[n - 1 - i];
        odd[i] = (input[i] - input[n - 1 - i]) * pnts[i];
    }

    let mut even_out = [0.0f32; 16];
    let mut odd_out = [0.0f32; 16];
    dct(&even[..half], &mut even_out[..half]);
    dct(&odd[..half], &mut odd_out[..half]);

    for i in 0..half {
        output[2 * i] = even_out[i];
    }
    for i in 0..half - 1 {
        output[2 * i + 1] = odd_out[i] + odd_out[i + 1];
    }
    output[n - 1] = odd_out[half - 1];
}

/// Window tap `i` of the 512 tap synthesis window.
fn window_tap(i: usize) -> f64 {
    let value = if i <= 256 {
        SYNTH_WINDOW_BASE[i]
    } else if (512 - i) % 64 == 0 {
        SYNTH_WINDOW_BASE[512 - i]
    } else {
        -SYNTH_WINDOW_BASE[512 - i]
    };

    f64::from(value) / 65536.0
}

lazy_static! {
    static ref DCT_PNTS: Vec<Vec<f32>> = (0..5)
        .map(|t| {
            let half = 1usize << t;
            (0..half)
                .map(|i| {
                    let angle = std::f64::consts::PI * (2 * i + 1) as f64 / (4 * half) as f64;
                    (0.5 / angle.cos()) as f32
                })
                .collect()
        })
        .collect();

    /// Per output sample, the 16 window taps applied to the history, stored
    /// twice so a rotated run of 16 can be sliced out.
    static ref SYNTH_WINDOW: Vec<[f32; 32]> = (0..SBLIMIT)
        .map(|j| {
            let mut row = [0.0f32; 32];
            for a in 0..16 {
                let tap = window_tap(j + 32 * a) * 32768.0;
                let tap = if j > 16 && a % 2 == 0 { -tap } else { tap };
                row[a] = tap as f32;
                row[a + 16] = tap as f32;
            }
            row
        })
        .collect();

    static ref CONV16TO8: Vec<u8> = (-4096i32..4096).map(|i| ((i >> 5) + 128) as u8).collect();
}

pub(crate) fn init_static() {
    lazy_static::initialize(&DCT_PNTS);
    lazy_static::initialize(&SYNTH_WINDOW);
    lazy_static::initialize(&CONV16TO8);
}
