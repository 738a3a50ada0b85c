use crate::data::{SBLIMIT, SSLIMIT};
use crate::Error;

use rustdct::mdct::{MDCTNaive, MDCTViaDCT4, MDCT};
use rustdct::DCTplanner;

use std::f32::consts::PI;

/// Long block window shapes, indexed by block type.
fn long_window(block_type: u32, len: usize) -> Vec<f32> {
    let normal = |i: usize| (PI / 36.0 * (i as f32 + 0.5)).sin();
    let short = |i: usize| (PI / 12.0 * (i as f32 + 0.5)).sin();

    (0..len)
        .map(|i| match block_type {
            1 => match i {
                0..=17 => normal(i),
                18..=23 => 1.0,
                24..=29 => short(i - 18),
                _ => 0.0,
            },
            3 => match i {
                0..=5 => 0.0,
                6..=11 => short(i - 6),
                12..=17 => 1.0,
                _ => normal(i),
            },
            _ => normal(i),
        })
        .collect()
}

fn short_window(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| (PI / 12.0 * (i as f32 + 0.5)).sin())
        .collect()
}

/// Inverse MDCT with overlap-add from the frequency lines of each subband
/// to time samples, including the frequency inversion of odd subbands.
pub struct Hybrid {
    /// Normal, start and stop windows.
    long: [MDCTViaDCT4<f32>; 3],
    short: MDCTNaive<f32>,
    overlap: [[[f32; SSLIMIT]; SBLIMIT]; 2],
}

unsafe impl Send for Hybrid {}

impl Default for Hybrid {
    fn default() -> Self {
        Hybrid::new()
    }
}

impl Hybrid {
    pub fn new() -> Self {
        let mut planner = DCTplanner::new();
        let dct4 = planner.plan_dct4(SSLIMIT);

        let long = [
            MDCTViaDCT4::new(dct4.clone(), |len| long_window(0, len)),
            MDCTViaDCT4::new(dct4.clone(), |len| long_window(1, len)),
            MDCTViaDCT4::new(dct4, |len| long_window(3, len)),
        ];

        Hybrid {
            long,
            short: MDCTNaive::new(6, short_window),
            overlap: [[[0.0; SSLIMIT]; SBLIMIT]; 2],
        }
    }

    /// 36 windowed samples of one subband. Short blocks overlap their three
    /// 12 sample windows in the middle of the buffer.
    fn imdct(&self, input: &[f32; SSLIMIT], block_type: u32, out: &mut [f32; 2 * SSLIMIT]) {
        // rustdct accumulates into the output
        *out = [0.0; 2 * SSLIMIT];

        match block_type {
            2 => {
                let mut lines = [0.0f32; 6];
                for window in 0..3 {
                    for (k, line) in lines.iter_mut().enumerate() {
                        *line = input[window + 3 * k];
                    }
                    let start = 6 + 6 * window;
                    self.short
                        .process_imdct(&lines, &mut out[start..start + 12]);
                }
            }
            1 => self.long[1].process_imdct(input, out),
            3 => self.long[2].process_imdct(input, out),
            _ => self.long[0].process_imdct(input, out),
        }
    }

    /// Transforms one granule of channel `ch`. `input` holds the 18
    /// frequency lines of each subband; `output` receives 18 time slots of
    /// 32 subband samples. Subbands from `maxb` up only flush the overlap.
    pub fn process(
        &mut self,
        input: &[[f32; SSLIMIT]; SBLIMIT],
        output: &mut [[f32; SBLIMIT]; SSLIMIT],
        ch: usize,
        block_type: u32,
        mixed: bool,
        maxb: usize,
    ) -> Result<(), Error> {
        if maxb == 0 || maxb > SBLIMIT {
            return Err(Error::InvalidSubbandLimit(maxb));
        }
        // subbands are transformed in pairs
        let limit = ((maxb + 1) & !1).min(SBLIMIT);

        let mut raw = [0.0f32; 2 * SSLIMIT];

        for sb in 0..SBLIMIT {
            if sb < limit {
                let window = if mixed && sb < 2 { 0 } else { block_type };
                self.imdct(&input[sb], window, &mut raw);

                let overlap = &mut self.overlap[ch][sb];
                for i in 0..SSLIMIT {
                    output[i][sb] = raw[i] + overlap[i];
                    overlap[i] = raw[SSLIMIT + i];
                }
            } else {
                let overlap = &mut self.overlap[ch][sb];
                for i in 0..SSLIMIT {
                    output[i][sb] = overlap[i];
                    overlap[i] = 0.0;
                }
            }

            if sb & 1 == 1 {
                for slot in output.iter_mut().skip(1).step_by(2) {
                    slot[sb] = -slot[sb];
                }
            }
        }

        Ok(())
    }
}
