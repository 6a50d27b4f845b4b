//! Variable-width byte chunks with XOR helpers for striping and parity.

use std::ops::{BitXor, BitXorAssign};

use crate::error::{RaidError, Result};


#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
/// Chunk is one member's share of a stripe.
pub struct Chunk(pub Vec<u8>);

impl Chunk {
    #[inline]
    #[must_use]
    /// `zero` returns a zero-filled chunk of `len` bytes.
    pub fn zero(len: usize) -> Self {
        Self(vec![0u8; len])
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[inline]
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    /// `xor_in_place` XORs `rhs` into this chunk byte by byte.
    ///
    /// A shorter chunk is zero-extended first, so XOR-ing members of uneven length
    /// behaves as if the missing tail were zeros.
    ///
    /// # Arguments
    /// * `rhs` - The bytes to XOR into this chunk.
    pub fn xor_in_place(&mut self, rhs: &[u8]) {
        if self.0.len() < rhs.len() {
            self.0.resize(rhs.len(), 0);
        }
        for (a, b) in self.0.iter_mut().zip(rhs) {
            *a ^= *b;
        }
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl BitXor<&Self> for Chunk {
    type Output = Self;
    #[inline]
    fn bitxor(mut self, rhs: &Self) -> Self::Output {
        self.xor_in_place(&rhs.0);
        self
    }
}

impl BitXorAssign<&Self> for Chunk {
    #[inline]
    fn bitxor_assign(&mut self, rhs: &Self) {
        self.xor_in_place(&rhs.0);
    }
}

impl BitXorAssign<&[u8]> for Chunk {
    #[inline]
    fn bitxor_assign(&mut self, rhs: &[u8]) {
        self.xor_in_place(rhs);
    }
}

/// `split_even` cuts `payload` into `parts` contiguous chunks of equal length.
///
/// # Errors
/// Returns `InvalidArgument` when the payload is empty or its length is not a multiple
/// of `parts`.
pub fn split_even(payload: &[u8], parts: usize) -> Result<Vec<&[u8]>> {
    if parts == 0 || payload.is_empty() || payload.len() % parts != 0 {
        return Err(RaidError::InvalidArgument(format!(
            "payload of {} bytes does not split into {parts} equal chunks",
            payload.len()
        )));
    }
    let width = payload.len() / parts;
    Ok(payload.chunks_exact(width).collect())
}

/// `parity_of` folds the given chunks together with byte-wise XOR.
#[must_use]
pub fn parity_of<'a, I>(chunks: I) -> Chunk
where
    I: IntoIterator<Item = &'a [u8]>,
{
    chunks.into_iter().fold(Chunk::default(), |mut acc, c| {
        acc ^= c;
        acc
    })
}
