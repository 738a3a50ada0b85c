// MPEG Audio Decoder
//
// Copyright (c) 2020 Cory Forsstrom <cforsstrom18@gmail.com>
//
// This code is licensed under the terms of the GNU Lesser General Public License,
// version 2.1.

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error reading stream: {0}")]
    IOError(io::Error),
    #[error("No valid frame header found after {0} bytes")]
    SyncLost(usize),
    #[error("Invalid frame header {0:#010x}")]
    InvalidHeader(u32),
    #[error("Frame size {0} exceeds the maximum frame size")]
    FrameTooLarge(usize),
    #[error("Bit reservoir underflow: need {needed} bytes, {available} available")]
    ReservoirUnderflow { needed: usize, available: usize },
    #[error("Granule big_values {0} larger than 288")]
    BigValuesTooLarge(u32),
    #[error("Window switching with block type 0")]
    InvalidBlockType,
    #[error("Huffman table {0} is reserved")]
    InvalidHuffmanTable(u32),
    #[error("Huffman data runs past the end of the frame")]
    HuffmanOverrun,
    #[error("part2_3_length {part2_3_length} shorter than scalefactors ({part2_bits} bits)")]
    NegativePart3Length { part2_3_length: u32, part2_bits: u32 },
    #[error("Layer I bit allocation 15 is reserved")]
    InvalidBitAllocation,
    #[error("Subband limit {0} out of range")]
    InvalidSubbandLimit(usize),
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::IOError(error)
    }
}
