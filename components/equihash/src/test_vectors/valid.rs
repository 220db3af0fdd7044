use super::REFERENCE_INPUT;
use crate::params::Params;

pub(crate) struct TestVector {
    pub(crate) params: Params,
    pub(crate) input: &'static [u8],
    pub(crate) nonce: u32,
    pub(crate) solutions: &'static [&'static [u32]],
    /// The minimal encoding of the first solution.
    pub(crate) minimal: &'static [u8],
}

pub(crate) const VALID_TEST_VECTORS: &[TestVector] = &[TestVector {
    params: Params { n: 96, k: 5 },
    input: REFERENCE_INPUT,
    nonce: 1,
    solutions: &[&[
        2261, 15185, 36112, 104243, 23779, 118390, 118332, 130041, 32642, 69878, 76925, 80080,
        45858, 116805, 92842, 111026, 15972, 115059, 85191, 90330, 68190, 122819, 81830, 91132,
        23460, 49807, 52426, 80391, 69567, 114474, 104973, 122568,
    ]],
    minimal: &[
        0x04, 0x6a, 0x8e, 0xd4, 0x51, 0xa2, 0x19, 0x73, 0x32, 0xe7, 0x1f, 0x39, 0xdb, 0x9c, 0x79,
        0xfb, 0xf9, 0x3f, 0xc1, 0x44, 0x3d, 0xa5, 0x8f, 0xb3, 0x8d, 0x05, 0x99, 0x17, 0x21, 0x16,
        0xd5, 0x55, 0xb1, 0xb2, 0x1f, 0x32, 0x70, 0x5c, 0xe9, 0x98, 0xf6, 0x0d, 0xa8, 0x52, 0xf7,
        0x7f, 0x0e, 0x7f, 0x4d, 0x63, 0xfc, 0x2d, 0xd2, 0x30, 0xa3, 0xd9, 0x99, 0x53, 0xa0, 0x78,
        0x7d, 0xfe, 0xfc, 0xab, 0x34, 0x1b, 0xde, 0xc8,
    ],
}];
