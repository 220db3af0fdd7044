mod invalid;
mod valid;

pub(crate) use invalid::INVALID_TEST_VECTORS;
pub(crate) use valid::VALID_TEST_VECTORS;

/// The input used by the Zcash reference test vectors.
pub(crate) const REFERENCE_INPUT: &[u8] =
    b"Equihash is an asymmetric PoW based on the Generalised Birthday problem.";
