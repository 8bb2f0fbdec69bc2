//! Bridges `rand` 0.9 generators to the `rand_core` 0.6 traits expected by `curve25519-dalek`.
use rand::{CryptoRng, RngCore};

/// Wraps a `rand` 0.9 RNG so that it can be passed to [`curve25519_dalek::Scalar::random`].
pub(crate) struct RngCompat<R>(pub(crate) R);

impl<R: RngCore> rand_core_0_6::RngCore for RngCompat<R> {
    #[inline]
    fn next_u32(&mut self) -> u32 {
        self.0.next_u32()
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }

    #[inline]
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.fill_bytes(dest);
    }

    #[inline]
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core_0_6::Error> {
        self.0.fill_bytes(dest);
        Ok(())
    }
}

// dalek only accepts generators marked as cryptographically secure
impl<R: CryptoRng> rand_core_0_6::CryptoRng for RngCompat<R> {}
