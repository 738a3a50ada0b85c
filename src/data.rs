/// Bitrates in kbit/s by `[lsf][layer - 1][bitrate_index]`.
pub const BITRATES: [[[u32; 16]; 3]; 2] = [
    [
        [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448, 0],
        [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384, 0],
        [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 0],
    ],
    [
        [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256, 0],
        [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0],
        [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0],
    ],
];

pub const SAMPLE_RATES: [u32; 9] = [44100, 48000, 32000, 22050, 24000, 16000, 11025, 12000, 8000];

pub const SBLIMIT: usize = 32;
pub const SSLIMIT: usize = 18;
pub const SCALE_BLOCK: usize = 12;

/// Scalefactor band boundaries of one sample rate. Short block indices
/// count lines of all three windows.
pub struct BandInfo {
    pub long_idx: [usize; 23],
    pub long_diff: [usize; 22],
    pub short_idx: [usize; 14],
    pub short_diff: [usize; 13],
}

pub const BAND_INFO: [BandInfo; 9] = [
    // 44100
    BandInfo {
        long_idx: [
            0, 4, 8, 12, 16, 20, 24, 30, 36, 44, 52, 62, 74, 90, 110, 134, 162, 196, 238, 288, 342,
            418, 576,
        ],
        long_diff: [
            4, 4, 4, 4, 4, 4, 6, 6, 8, 8, 10, 12, 16, 20, 24, 28, 34, 42, 50, 54, 76, 158,
        ],
        short_idx: [0, 12, 24, 36, 48, 66, 90, 120, 156, 198, 252, 318, 408, 576],
        short_diff: [4, 4, 4, 4, 6, 8, 10, 12, 14, 18, 22, 30, 56],
    },
    // 48000
    BandInfo {
        long_idx: [
            0, 4, 8, 12, 16, 20, 24, 30, 36, 42, 50, 60, 72, 88, 106, 128, 156, 190, 230, 276, 330,
            384, 576,
        ],
        long_diff: [
            4, 4, 4, 4, 4, 4, 6, 6, 6, 8, 10, 12, 16, 18, 22, 28, 34, 40, 46, 54, 54, 192,
        ],
        short_idx: [0, 12, 24, 36, 48, 66, 84, 114, 150, 192, 240, 300, 378, 576],
        short_diff: [4, 4, 4, 4, 6, 6, 10, 12, 14, 16, 20, 26, 66],
    },
    // 32000
    BandInfo {
        long_idx: [
            0, 4, 8, 12, 16, 20, 24, 30, 36, 44, 54, 66, 82, 102, 126, 156, 194, 240, 296, 364,
            448, 550, 576,
        ],
        long_diff: [
            4, 4, 4, 4, 4, 4, 6, 6, 8, 10, 12, 16, 20, 24, 30, 38, 46, 56, 68, 84, 102, 26,
        ],
        short_idx: [0, 12, 24, 36, 48, 66, 90, 126, 174, 234, 312, 414, 540, 576],
        short_diff: [4, 4, 4, 4, 6, 8, 12, 16, 20, 26, 34, 42, 12],
    },
    // 22050
    BandInfo {
        long_idx: [
            0, 6, 12, 18, 24, 30, 36, 44, 54, 66, 80, 96, 116, 140, 168, 200, 238, 284, 336, 396,
            464, 522, 576,
        ],
        long_diff: [
            6, 6, 6, 6, 6, 6, 8, 10, 12, 14, 16, 20, 24, 28, 32, 38, 46, 52, 60, 68, 58, 54,
        ],
        short_idx: [0, 12, 24, 36, 54, 72, 96, 126, 168, 222, 300, 396, 522, 576],
        short_diff: [4, 4, 4, 6, 6, 8, 10, 14, 18, 26, 32, 42, 18],
    },
    // 24000
    BandInfo {
        long_idx: [
            0, 6, 12, 18, 24, 30, 36, 44, 54, 66, 80, 96, 114, 136, 162, 194, 232, 278, 332, 394,
            464, 540, 576,
        ],
        long_diff: [
            6, 6, 6, 6, 6, 6, 8, 10, 12, 14, 16, 18, 22, 26, 32, 38, 46, 54, 62, 70, 76, 36,
        ],
        short_idx: [0, 12, 24, 36, 54, 78, 108, 144, 186, 240, 312, 408, 540, 576],
        short_diff: [4, 4, 4, 6, 8, 10, 12, 14, 18, 24, 32, 44, 12],
    },
    // 16000
    BandInfo {
        long_idx: [
            0, 6, 12, 18, 24, 30, 36, 44, 54, 66, 80, 96, 116, 140, 168, 200, 238, 284, 336, 396,
            464, 522, 576,
        ],
        long_diff: [
            6, 6, 6, 6, 6, 6, 8, 10, 12, 14, 16, 20, 24, 28, 32, 38, 46, 52, 60, 68, 58, 54,
        ],
        short_idx: [0, 12, 24, 36, 54, 78, 108, 144, 186, 240, 312, 402, 522, 576],
        short_diff: [4, 4, 4, 6, 8, 10, 12, 14, 18, 24, 30, 40, 18],
    },
    // 11025
    BandInfo {
        long_idx: [
            0, 6, 12, 18, 24, 30, 36, 44, 54, 66, 80, 96, 116, 140, 168, 200, 238, 284, 336, 396,
            464, 522, 576,
        ],
        long_diff: [
            6, 6, 6, 6, 6, 6, 8, 10, 12, 14, 16, 20, 24, 28, 32, 38, 46, 52, 60, 68, 58, 54,
        ],
        short_idx: [0, 12, 24, 36, 54, 78, 108, 144, 186, 240, 312, 402, 522, 576],
        short_diff: [4, 4, 4, 6, 8, 10, 12, 14, 18, 24, 30, 40, 18],
    },
    // 12000
    BandInfo {
        long_idx: [
            0, 6, 12, 18, 24, 30, 36, 44, 54, 66, 80, 96, 116, 140, 168, 200, 238, 284, 336, 396,
            464, 522, 576,
        ],
        long_diff: [
            6, 6, 6, 6, 6, 6, 8, 10, 12, 14, 16, 20, 24, 28, 32, 38, 46, 52, 60, 68, 58, 54,
        ],
        short_idx: [0, 12, 24, 36, 54, 78, 108, 144, 186, 240, 312, 402, 522, 576],
        short_diff: [4, 4, 4, 6, 8, 10, 12, 14, 18, 24, 30, 40, 18],
    },
    // 8000
    BandInfo {
        long_idx: [
            0, 12, 24, 36, 48, 60, 72, 88, 108, 132, 160, 192, 232, 280, 336, 400, 476, 566, 568,
            570, 572, 574, 576,
        ],
        long_diff: [
            12, 12, 12, 12, 12, 12, 16, 20, 24, 28, 32, 40, 48, 56, 64, 76, 90, 2, 2, 2, 2, 2,
        ],
        short_idx: [0, 24, 48, 72, 108, 156, 216, 288, 372, 480, 486, 492, 498, 576],
        short_diff: [8, 8, 8, 12, 16, 20, 24, 28, 36, 2, 2, 2, 26],
    },
];

/// Long block scalefactor boost applied when `preflag` is set.
pub const PRETAB: [u32; 22] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 3, 3, 3, 2, 0,
];

/// MPEG-1 scalefactor widths `[slen1, slen2]` by `scalefac_compress`.
pub const SLEN: [[u32; 16]; 2] = [
    [0, 0, 0, 0, 3, 1, 1, 1, 2, 2, 2, 3, 3, 3, 4, 4],
    [0, 1, 2, 3, 0, 1, 2, 3, 1, 2, 3, 1, 2, 3, 2, 3],
];

/// MPEG-2 scalefactor counts of the four partitions, by block kind (long,
/// short, mixed) and partition layout.
pub const STAB: [[[usize; 4]; 6]; 3] = [
    [
        [6, 5, 5, 5],
        [6, 5, 7, 3],
        [11, 10, 0, 0],
        [7, 7, 7, 0],
        [6, 6, 6, 3],
        [8, 8, 5, 0],
    ],
    [
        [9, 9, 9, 9],
        [9, 9, 12, 6],
        [18, 18, 0, 0],
        [12, 12, 12, 0],
        [12, 9, 9, 6],
        [15, 12, 9, 0],
    ],
    [
        [6, 9, 9, 9],
        [6, 9, 12, 6],
        [15, 18, 0, 0],
        [6, 15, 12, 0],
        [6, 12, 9, 6],
        [6, 18, 9, 0],
    ],
];

/// Alias reduction butterfly coefficients.
pub const AA_CI: [f64; 8] = [
    -0.6, -0.535, -0.33, -0.185, -0.095, -0.041, -0.0142, -0.0037,
];

// Layer II quantizer codes: 0 means no allocation, GROUPED_* are the 3, 5
// and 9 level grouped quantizers, anything else is the width in bits of an
// ungrouped sample.
pub const GROUPED_3: u8 = 17;
pub const GROUPED_5: u8 = 18;
pub const GROUPED_9: u8 = 19;

const Q_HIGH_LOW: [u8; 16] = [0, 17, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16];
const Q_HIGH_MID: [u8; 16] = [0, 17, 18, 3, 19, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 16];
const Q_HIGH_TOP: [u8; 8] = [0, 17, 18, 3, 19, 4, 5, 16];
const Q_HIGH_END: [u8; 4] = [0, 17, 18, 16];
const Q_LOW_RATE: [u8; 16] = [0, 17, 18, 19, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];
const Q_LSF_LOW: [u8; 16] = [0, 17, 18, 3, 19, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14];

/// Layer II allocation table: runs of subbands sharing the width of their
/// allocation field and the quantizer list it indexes.
pub struct AllocTable {
    pub sblimit: usize,
    pub runs: &'static [(usize, u32, &'static [u8])],
}

pub const ALLOC_TABLES: [AllocTable; 5] = [
    AllocTable {
        sblimit: 27,
        runs: &[
            (3, 4, &Q_HIGH_LOW),
            (8, 4, &Q_HIGH_MID),
            (12, 3, &Q_HIGH_TOP),
            (4, 2, &Q_HIGH_END),
        ],
    },
    AllocTable {
        sblimit: 30,
        runs: &[
            (3, 4, &Q_HIGH_LOW),
            (8, 4, &Q_HIGH_MID),
            (12, 3, &Q_HIGH_TOP),
            (7, 2, &Q_HIGH_END),
        ],
    },
    AllocTable {
        sblimit: 8,
        runs: &[(2, 4, &Q_LOW_RATE), (6, 3, &Q_LOW_RATE)],
    },
    AllocTable {
        sblimit: 12,
        runs: &[(2, 4, &Q_LOW_RATE), (10, 3, &Q_LOW_RATE)],
    },
    AllocTable {
        sblimit: 30,
        runs: &[(4, 4, &Q_LSF_LOW), (7, 3, &Q_LOW_RATE), (19, 2, &Q_LOW_RATE)],
    },
];

/// MPEG-1 Layer II table choice by `[sampling_frequency][mono][bitrate_index]`.
pub const ALLOC_TRANSLATE: [[[usize; 16]; 2]; 3] = [
    [
        [0, 2, 2, 2, 2, 2, 2, 0, 0, 0, 1, 1, 1, 1, 1, 0],
        [0, 2, 2, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0],
    ],
    [
        [0, 2, 2, 2, 2, 2, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        [0, 2, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    ],
    [
        [0, 3, 3, 3, 3, 3, 3, 0, 0, 0, 1, 1, 1, 1, 1, 0],
        [0, 3, 3, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0],
    ],
];

/// First half of the polyphase synthesis window scaled by 65536. The
/// remaining taps mirror these with a sign flip, except every 64th.
pub const SYNTH_WINDOW_BASE: [i32; 257] = [
    0, -1, -1, -1, -1, -1, -1, -2, -2, -2,
    -2, -3, -3, -4, -4, -5, -5, -6, -7, -7,
    -8, -9, -10, -11, -13, -14, -16, -17, -19, -21,
    -24, -26, -29, -31, -35, -38, -41, -45, -49, -53,
    -58, -63, -68, -73, -79, -85, -91, -97, -104, -111,
    -117, -125, -132, -139, -147, -154, -161, -169, -176, -183,
    -190, -196, -202, -208, 213, 218, 222, 225, 227, 228,
    228, 227, 224, 221, 215, 208, 200, 189, 177, 163,
    146, 127, 106, 83, 57, 29, -2, -36, -72, -111,
    -153, -197, -244, -294, -347, -401, -459, -519, -581, -645,
    -711, -779, -848, -919, -991, -1064, -1137, -1210, -1283, -1356,
    -1428, -1498, -1567, -1634, -1698, -1759, -1817, -1870, -1919, -1962,
    -2001, -2032, -2057, -2075, -2085, -2087, -2080, -2063, 2037, 2000,
    1952, 1893, 1822, 1739, 1644, 1535, 1414, 1280, 1131, 970,
    794, 605, 402, 185, -45, -288, -545, -814, -1095, -1388,
    -1692, -2006, -2330, -2663, -3004, -3351, -3705, -4063, -4425, -4788,
    -5153, -5517, -5879, -6237, -6589, -6935, -7271, -7597, -7910, -8209,
    -8491, -8755, -8998, -9219, -9416, -9585, -9727, -9838, -9916, -9959,
    -9966, -9935, -9863, -9750, -9592, -9389, -9139, -8840, -8492, -8092,
    -7640, -7134, 6574, 5959, 5288, 4561, 3776, 2935, 2037, 1082,
    70, -998, -2122, -3300, -4533, -5818, -7154, -8540, -9975, -11455,
    -12980, -14548, -16155, -17799, -19478, -21189, -22929, -24694, -26482, -28289,
    -30112, -31947, -33791, -35640, -37489, -39336, -41176, -43006, -44821, -46617,
    -48390, -50137, -51853, -53534, -55178, -56778, -58333, -59838, -61289, -62684,
    -64019, -65290, -66494, -67629, -68692, -69679, -70590, -71420, -72169, -72835,
    -73415, -73908, -74313, -74630, -74856, -74992, 75038,
];
