//! Equihash proofs.

use alloc::vec::Vec;
use core::ops::Deref;

#[cfg(feature = "std")]
use {
    byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt},
    std::io::{self, Read, Write},
};

use crate::{
    minimal::{indices_from_minimal, minimal_from_indices},
    params::Params,
    verify::{self, Error, Kind},
};

#[cfg(feature = "std")]
use crate::digest::FORMAT_VERSION;

/// A candidate Equihash proof: a seed, a nonce, and an ordered sequence of `2^k`
/// leaf indices.
///
/// A `Proof` has not necessarily been checked; use [`Proof::into_verified`] to
/// obtain a [`VerifiedProof`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proof {
    params: Params,
    seed: Vec<u8>,
    nonce: u32,
    indices: Vec<u32>,
}

impl Proof {
    /// Constructs a proof from its parts.
    ///
    /// Returns an error if the parameters are invalid. The indices are not checked
    /// until the proof is verified.
    pub fn new(n: u32, k: u32, seed: &[u8], nonce: u32, indices: Vec<u32>) -> Result<Self, Error> {
        Ok(Self::from_parts(Params::new(n, k)?, seed.to_vec(), nonce, indices))
    }

    /// Constructs a proof from a minimal-encoded solution.
    pub fn from_minimal(
        n: u32,
        k: u32,
        seed: &[u8],
        nonce: u32,
        minimal: &[u8],
    ) -> Result<Self, Error> {
        let params = Params::new(n, k)?;
        let indices = indices_from_minimal(params, minimal).ok_or(Error(Kind::MalformedProof))?;
        Ok(Self::from_parts(params, seed.to_vec(), nonce, indices))
    }

    pub(crate) fn from_parts(params: Params, seed: Vec<u8>, nonce: u32, indices: Vec<u32>) -> Self {
        Proof {
            params,
            seed,
            nonce,
            indices,
        }
    }

    /// Returns the parameters this proof is for.
    pub fn params(&self) -> Params {
        self.params
    }

    /// Returns the seed this proof commits to.
    pub fn seed(&self) -> &[u8] {
        &self.seed
    }

    /// Returns the nonce this proof commits to.
    pub fn nonce(&self) -> u32 {
        self.nonce
    }

    /// Returns the leaf indices, in tree order.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Returns the minimal encoding of the indices.
    pub fn to_minimal(&self) -> Result<Vec<u8>, Error> {
        minimal_from_indices(self.params, &self.indices)
    }

    /// Checks this proof, returning the reason it is invalid if it is.
    pub fn verify(&self) -> Result<(), Error> {
        verify::is_valid_solution_recursive(self.params, &self.seed, self.nonce, &self.indices)
    }

    /// Returns `true` if this proof is valid.
    pub fn is_valid(&self) -> bool {
        match self.verify() {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(params = %self.params, nonce = self.nonce, "Rejected proof: {}", e);
                false
            }
        }
    }

    /// Checks this proof, and marks it as verified if it is valid.
    pub fn into_verified(self) -> Result<VerifiedProof, Error> {
        self.verify()?;
        Ok(VerifiedProof(self))
    }

    /// Reads a serialized proof.
    ///
    /// The proof is not verified.
    #[cfg(feature = "std")]
    pub fn read<R: Read>(mut reader: R) -> io::Result<Self> {
        let invalid = |kind| io::Error::new(io::ErrorKind::InvalidData, Error(kind));

        let version = reader.read_u8()?;
        if version != FORMAT_VERSION {
            return Err(invalid(Kind::UnsupportedVersion(version)));
        }

        let n = reader.read_u32::<LittleEndian>()?;
        let k = reader.read_u32::<LittleEndian>()?;
        let params = Params::new(n, k).map_err(|_| invalid(Kind::InvalidParams))?;
        let nonce = reader.read_u32::<LittleEndian>()?;

        let seed_len = reader.read_u32::<LittleEndian>()?;
        let mut seed = Vec::new();
        reader.by_ref().take(u64::from(seed_len)).read_to_end(&mut seed)?;
        if seed.len() != seed_len as usize {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "proof seed is truncated",
            ));
        }

        // The buffer grows with the bytes actually read, not with the declared length.
        let mut minimal = Vec::new();
        reader
            .take(params.minimal_len() as u64)
            .read_to_end(&mut minimal)?;
        if minimal.len() != params.minimal_len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "proof solution is truncated",
            ));
        }
        let indices =
            indices_from_minimal(params, &minimal).ok_or_else(|| invalid(Kind::MalformedProof))?;

        Ok(Self::from_parts(params, seed, nonce, indices))
    }

    /// Writes this proof as `version || n || k || nonce || seed length || seed ||
    /// minimal solution`, with integers in little-endian order.
    #[cfg(feature = "std")]
    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        let minimal = self
            .to_minimal()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let seed_len = u32::try_from(self.seed.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "proof seed is too long"))?;

        writer.write_u8(FORMAT_VERSION)?;
        writer.write_u32::<LittleEndian>(self.params.n)?;
        writer.write_u32::<LittleEndian>(self.params.k)?;
        writer.write_u32::<LittleEndian>(self.nonce)?;
        writer.write_u32::<LittleEndian>(seed_len)?;
        writer.write_all(&self.seed)?;
        writer.write_all(&minimal)
    }
}

/// A proof that has passed verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedProof(Proof);

impl VerifiedProof {
    /// Discards the verification marker.
    pub fn into_inner(self) -> Proof {
        self.0
    }
}

impl Deref for VerifiedProof {
    type Target = Proof;

    fn deref(&self) -> &Proof {
        &self.0
    }
}
