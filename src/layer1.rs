use crate::bitstream::BitStream;
use crate::data::{SBLIMIT, SCALE_BLOCK};
use crate::header::{ChannelMode, Header};
use crate::layer2::{select_single, MULS};
use crate::synth::Synth;
use crate::Error;

struct Allocation {
    bits: [[u32; SBLIMIT]; 2],
    scales: [[usize; SBLIMIT]; 2],
}

fn jsbound(header: &Header) -> usize {
    match header.mode {
        ChannelMode::JointStereo => (((header.mode_extension as usize) << 2) + 4).min(SBLIMIT),
        _ => SBLIMIT,
    }
}

fn step_one(bs: &mut BitStream, channels: usize, jsbound: usize) -> Result<Allocation, Error> {
    let mut alloc = Allocation {
        bits: [[0; SBLIMIT]; 2],
        scales: [[0; SBLIMIT]; 2],
    };

    for sb in 0..SBLIMIT {
        if sb < jsbound {
            for ch in 0..channels {
                alloc.bits[ch][sb] = bs.get_bits_fast(4);
            }
        } else {
            let bits = bs.get_bits_fast(4);
            for ch in 0..channels {
                alloc.bits[ch][sb] = bits;
            }
        }
    }

    if alloc.bits.iter().flatten().any(|&b| b == 15) {
        return Err(Error::InvalidBitAllocation);
    }

    for sb in 0..SBLIMIT {
        for ch in 0..channels {
            if alloc.bits[ch][sb] != 0 {
                alloc.scales[ch][sb] = bs.get_bits_fast(6) as usize;
            }
        }
    }

    Ok(alloc)
}

#[inline]
fn dequantize(raw: u32, n: u32, scale: usize) -> f32 {
    ((-1i32 << n) + raw as i32 + 1) as f32 * MULS[n as usize + 1][scale]
}

fn step_two(
    bs: &mut BitStream,
    alloc: &Allocation,
    channels: usize,
    jsbound: usize,
    sblimit: usize,
    fraction: &mut [[f32; SBLIMIT]; 2],
) {
    *fraction = [[0.0; SBLIMIT]; 2];

    for sb in 0..SBLIMIT {
        if sb < jsbound || channels == 1 {
            for ch in 0..channels {
                let n = alloc.bits[ch][sb];
                if n != 0 {
                    let raw = bs.get_bits(n + 1);
                    fraction[ch][sb] = dequantize(raw, n, alloc.scales[ch][sb]);
                }
            }
        } else {
            let n = alloc.bits[0][sb];
            if n != 0 {
                let raw = bs.get_bits(n + 1);
                for ch in 0..2 {
                    fraction[ch][sb] = dequantize(raw, n, alloc.scales[ch][sb]);
                }
            }
        }
    }

    for ch in fraction.iter_mut() {
        for value in ch[sblimit..].iter_mut() {
            *value = 0.0;
        }
    }
}

/// Decodes a Layer I frame body: 12 vectors of 32 subband samples per
/// channel.
pub fn decode_frame(header: &Header, bs: &mut BitStream, synth: &mut Synth) -> Result<(), Error> {
    let channels = header.channels();
    let jsbound = jsbound(header);
    let sblimit = synth.sblimit();

    let alloc = step_one(bs, channels, jsbound)?;

    let mut fraction = [[0.0f32; SBLIMIT]; 2];
    for _ in 0..SCALE_BLOCK {
        step_two(bs, &alloc, channels, jsbound, sblimit, &mut fraction);

        match synth.single() {
            Some(single) => {
                let mono = select_single(single, &fraction[0], &fraction[1]);
                synth.output(&mono, &mono);
            }
            None => synth.output(&fraction[0], &fraction[1]),
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
    fn joint_bound() {
        let stereo = Header::decode(0xffff_c000).unwrap();
        assert_eq!(jsbound(&stereo), 32);

        let joint = Header::decode(0xffff_c060).unwrap();
        assert_eq!(joint.mode_extension, 2);
        assert_eq!(jsbound(&joint), 12);
    }

    #[test]
    fn rejects_allocation_15() {
        let mut fields = vec![(4, 15)];
        fields.extend(std::iter::repeat((4, 0)).take(31));
        let mut bs = stream(&fields);

        match step_one(&mut bs, 1, 32) {
            Err(Error::InvalidBitAllocation) => {}
            _ => panic!("expected an allocation error"),
        }
    }

    #[test]
    fn samples_are_centered() {
        // subband 0 with 3 bit samples, the rest unallocated
        let mut fields = vec![(4, 2)];
        fields.extend(std::iter::repeat((4, 0)).take(31));
        fields.push((6, 3));
        fields.push((3, 0));

        let mut bs = stream(&fields);
        let alloc = step_one(&mut bs, 1, 32).unwrap();
        assert_eq!(alloc.bits[0][0], 2);
        assert_eq!(alloc.scales[0][0], 3);

        let mut fraction = [[0.0; SBLIMIT]; 2];
        step_two(&mut bs, &alloc, 1, 32, 32, &mut fraction);

        // (-4 + 0 + 1) * 2/7
        assert!((fraction[0][0] - (-3.0 * 2.0 / 7.0)).abs() < 1e-6);
        assert!(fraction[0][1..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn shared_samples_above_bound() {
        let mut fields = Vec::new();
        // below the bound, per channel
        for _ in 0..4 {
            fields.push((4, 0));
            fields.push((4, 0));
        }
        // above the bound, one allocation for both
        fields.push((4, 1));
        fields.extend(std::iter::repeat((4, 0)).take(27));
        fields.push((6, 3));
        fields.push((6, 6));
        fields.push((2, 3));

        let mut bs = stream(&fields);
        let alloc = step_one(&mut bs, 2, 4).unwrap();
        assert_eq!(alloc.bits[1][4], 1);

        let mut fraction = [[0.0; SBLIMIT]; 2];
        step_two(&mut bs, &alloc, 2, 4, 32, &mut fraction);

        let value = (-2 + 3 + 1) as f32;
        assert_eq!(fraction[0][4], value * MULS[2][3]);
        assert_eq!(fraction[1][4], value * MULS[2][6]);
    }

    #[test]
    fn down_sampling_zeroes_upper_bands() {
        let mut fields = Vec::new();
        fields.extend(std::iter::repeat((4, 1)).take(32));
        fields.extend(std::iter::repeat((6, 0)).take(32));
        fields.extend(std::iter::repeat((2, 3)).take(32));

        let mut bs = stream(&fields);
        let alloc = step_one(&mut bs, 1, 32).unwrap();

        let mut fraction = [[0.0; SBLIMIT]; 2];
        step_two(&mut bs, &alloc, 1, 32, 16, &mut fraction);
        assert!(fraction[0][..16].iter().all(|&v| v != 0.0));
        assert!(fraction[0][16..].iter().all(|&v| v == 0.0));
    }
}
