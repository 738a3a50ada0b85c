use crate::Error;

/// Largest frame body accepted by the header parser.
pub const MAX_FRAME_SIZE: usize = 4096;

/// Bytes kept in front of every frame body for bit reservoir data.
const RESERVOIR_SIZE: usize = 512;

/// Zeroed tail so multi-byte peeks near the end of a body stay in range.
const SLACK: usize = 8;

const BUFFER_SIZE: usize = RESERVOIR_SIZE + MAX_FRAME_SIZE + SLACK;

/// Bit cursor over the body of the current frame.
///
/// Two owned buffers alternate between frames. The body of frame `n` lands
/// at offset `RESERVOIR_SIZE` of one buffer while frame `n - 1` is still
/// available in the other, so `set_pointer` can carry the previous frame's
/// trailing bytes in front of the new body.
pub struct BitStream {
    current: Vec<u8>,
    previous: Vec<u8>,
    frame_size: usize,
    previous_frame_size: Option<usize>,
    invalidated: bool,
    byte_pos: usize,
    bit_index: usize,
}

impl Default for BitStream {
    fn default() -> Self {
        BitStream::new()
    }
}

impl BitStream {
    pub fn new() -> Self {
        BitStream {
            current: vec![0; BUFFER_SIZE],
            previous: vec![0; BUFFER_SIZE],
            frame_size: 0,
            previous_frame_size: None,
            invalidated: true,
            byte_pos: RESERVOIR_SIZE,
            bit_index: 0,
        }
    }

    /// Rotates the buffers and returns the zeroed body area for a frame of
    /// `frame_size` bytes. The cursor is placed at the start of the body.
    pub fn next_frame(&mut self, frame_size: usize) -> Result<&mut [u8], Error> {
        if frame_size > MAX_FRAME_SIZE {
            return Err(Error::FrameTooLarge(frame_size));
        }

        std::mem::swap(&mut self.current, &mut self.previous);
        self.previous_frame_size = if self.invalidated {
            None
        } else {
            Some(self.frame_size)
        };
        self.invalidated = false;

        self.frame_size = frame_size;
        self.byte_pos = RESERVOIR_SIZE;
        self.bit_index = 0;

        let body = &mut self.current[RESERVOIR_SIZE..];
        for byte in body.iter_mut() {
            *byte = 0;
        }

        Ok(&mut body[..frame_size])
    }

    /// Forgets the previous frame. The next frame cannot borrow reservoir
    /// bytes and its `set_pointer` with a non zero backstep fails.
    pub fn invalidate(&mut self) {
        self.previous_frame_size = None;
        self.invalidated = true;
    }

    /// Body bytes of the current frame.
    pub fn body(&self) -> &[u8] {
        &self.current[RESERVOIR_SIZE..RESERVOIR_SIZE + self.frame_size]
    }

    /// Places the cursor `backstep` bytes before the main data of the
    /// current frame, which starts `side_info_size` bytes into the body.
    /// The last `backstep` bytes of the previous body are copied there.
    pub fn set_pointer(&mut self, side_info_size: usize, backstep: usize) -> Result<(), Error> {
        let start = RESERVOIR_SIZE + side_info_size;

        if backstep > 0 {
            let available = self.previous_frame_size.unwrap_or(0);
            if backstep > available || backstep > start {
                return Err(Error::ReservoirUnderflow {
                    needed: backstep,
                    available,
                });
            }

            let old_end = RESERVOIR_SIZE + available;
            self.current[start - backstep..start]
                .copy_from_slice(&self.previous[old_end - backstep..old_end]);
        }

        self.byte_pos = start - backstep;
        self.bit_index = 0;

        Ok(())
    }

    #[inline]
    fn byte_at(&self, pos: usize) -> u8 {
        self.current.get(pos).copied().unwrap_or(0)
    }

    #[inline]
    fn advance(&mut self, n: usize) {
        let total = self.bit_index + n;
        self.byte_pos += total >> 3;
        self.bit_index = total & 7;
    }

    /// Reads `n` bits, MSB first. `n` may be up to 32, zero reads nothing.
    pub fn get_bits(&mut self, n: u32) -> u32 {
        if n == 0 {
            return 0;
        }
        debug_assert!(n <= 32);

        let mut acc = 0u64;
        for i in 0..5 {
            acc = (acc << 8) | u64::from(self.byte_at(self.byte_pos + i));
        }

        let shift = 40 - self.bit_index as u32 - n;
        let value = (acc >> shift) & ((1u64 << n) - 1);

        self.advance(n as usize);

        value as u32
    }

    /// Reads up to 16 bits from a three byte window.
    pub fn get_bits_fast(&mut self, n: u32) -> u32 {
        debug_assert!(n <= 16);

        let acc = (u32::from(self.byte_at(self.byte_pos)) << 16)
            | (u32::from(self.byte_at(self.byte_pos + 1)) << 8)
            | u32::from(self.byte_at(self.byte_pos + 2));

        let value = ((acc << self.bit_index) & 0xff_ffff) >> (24 - n);

        self.advance(n as usize);

        value
    }

    #[inline]
    pub fn get1bit(&mut self) -> u32 {
        let bit = (self.byte_at(self.byte_pos) >> (7 - self.bit_index)) & 1;
        self.advance(1);
        u32::from(bit)
    }

    /// Reads the byte at the cursor. The cursor is expected to be byte
    /// aligned; a pending bit offset is dropped.
    pub fn get_byte(&mut self) -> u8 {
        if self.bit_index != 0 {
            log::warn!("get_byte called {} bits into a byte", self.bit_index);
        }

        let byte = self.byte_at(self.byte_pos);
        self.byte_pos += 1;
        self.bit_index = 0;
        byte
    }

    pub fn back_bits(&mut self, n: usize) {
        let pos = self.bit_position().saturating_sub(n);
        self.set_bit_position(pos);
    }

    pub fn skip_bits(&mut self, n: usize) {
        self.advance(n);
    }

    /// Absolute bit position of the cursor inside the current buffer.
    pub fn bit_position(&self) -> usize {
        self.byte_pos * 8 + self.bit_index
    }

    pub fn set_bit_position(&mut self, pos: usize) {
        self.byte_pos = pos >> 3;
        self.bit_index = pos & 7;
    }

    /// Buffer bytes from the cursor on, with the bit offset of the cursor
    /// inside the first of them.
    pub fn tail(&self) -> (&[u8], u32) {
        let bytes = self.current.get(self.byte_pos..).unwrap_or(&[]);
        (bytes, self.bit_index as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_with(body: &[u8]) -> BitStream {
        let mut bs = BitStream::new();
        bs.next_frame(body.len()).unwrap().copy_from_slice(body);
        bs
    }

    #[test]
    fn reads_msb_first() {
        let mut bs = stream_with(&[0b1011_0011, 0xf0, 0x0f, 0xaa, 0x55, 0x12]);

        assert_eq!(bs.get1bit(), 1);
        assert_eq!(bs.get_bits(3), 0b011);
        assert_eq!(bs.get_bits_fast(8), 0b0011_1111);
        assert_eq!(bs.get_bits(0), 0);
        assert_eq!(bs.get_bits(32), 0x00fa_a551);
    }

    #[test]
    fn full_width_read() {
        let mut bs = stream_with(&[0xde, 0xad, 0xbe, 0xef, 0x01]);
        bs.skip_bits(0);
        assert_eq!(bs.get_bits(32), 0xdead_beef);
        assert_eq!(bs.get_bits(8), 0x01);
    }

    #[test]
    fn set_bit_position_rewinds() {
        let mut bs = stream_with(&[0xc3, 0x3c]);
        assert_eq!(bs.get_bits(6), 0b110000);
        bs.set_bit_position(bs.bit_position() - 4);
        assert_eq!(bs.get_bits(4), 0b0000);
        assert_eq!(bs.get_bits(6), 0b11_0011);
    }

    #[test]
    fn back_bits_rewinds() {
        let mut bs = stream_with(&[0xc3, 0x3c]);
        bs.get_bits(10);
        bs.back_bits(6);
        assert_eq!(bs.get_bits(6), 0b00_1100);
    }

    #[test]
    fn get_byte_when_aligned() {
        let mut bs = stream_with(&[0x12, 0x34, 0x56]);
        assert_eq!(bs.get_byte(), 0x12);
        assert_eq!(bs.get_bits(8), 0x34);
        // a pending bit offset is dropped
        bs.get1bit();
        assert_eq!(bs.get_byte(), 0x56);
    }

    #[test]
    fn tail_follows_the_cursor() {
        let mut bs = stream_with(&[0x12, 0x34, 0x56]);
        bs.get_bits(12);

        let (bytes, offset) = bs.tail();
        assert_eq!(offset, 4);
        assert_eq!(&bytes[..2], &[0x34, 0x56]);
        // zeroed slack after the body
        assert_eq!(bytes[2], 0);
    }

    #[test]
    fn reads_past_the_body_are_zero() {
        let mut bs = stream_with(&[0xff]);
        assert_eq!(bs.get_bits(8), 0xff);
        assert_eq!(bs.get_bits(16), 0);
    }

    #[test]
    fn set_pointer_carries_previous_tail() {
        let mut bs = stream_with(&[1, 2, 3, 4, 5, 6]);
        bs.get_bits(8);

        let body = bs.next_frame(4).unwrap();
        body.copy_from_slice(&[0xa0, 0xb0, 0xc0, 0xd0]);

        // one byte of side info, main data starts three bytes back
        bs.set_pointer(1, 3).unwrap();
        assert_eq!(bs.get_bits(24), 0x04_0506);
        assert_eq!(bs.get_bits(8), 0xb0);
    }

    #[test]
    fn set_pointer_underflow() {
        let mut bs = stream_with(&[1, 2]);
        bs.next_frame(4).unwrap();
        match bs.set_pointer(0, 3) {
            Err(Error::ReservoirUnderflow { needed, available }) => {
                assert_eq!(needed, 3);
                assert_eq!(available, 2);
            }
            _ => panic!("expected underflow"),
        }

        bs.invalidate();
        bs.next_frame(4).unwrap();
        assert!(bs.set_pointer(0, 1).is_err());
        assert!(bs.set_pointer(2, 0).is_ok());
    }
}
