//! Interoperability with the [RustCrypto](https://github.com/RustCrypto/traits) `digest` traits.
//!
//! [`Sm3`] implements [`Digest`] and any [`Digest`] can back a hash tree through [`DigestHasher`].

use digest::{consts::U32, FixedOutput, FixedOutputReset, HashMarker, OutputSizeUser, Reset, Update};

use crate::{Hasher, Sm3};

pub use digest::{Digest, Output};

impl HashMarker for Sm3 {}

impl OutputSizeUser for Sm3 {
    type OutputSize = U32;
}

impl Update for Sm3 {
    fn update(&mut self, data: &[u8]) {
        Sm3::update(self, data);
    }
}

impl FixedOutput for Sm3 {
    fn finalize_into(self, out: &mut Output<Self>) {
        out.copy_from_slice(&Sm3::finalize(self));
    }
}

impl Reset for Sm3 {
    fn reset(&mut self) {
        Sm3::reset(self);
    }
}

impl FixedOutputReset for Sm3 {
    fn finalize_into_reset(&mut self, out: &mut Output<Self>) {
        out.copy_from_slice(&std::mem::take(self).finalize());
    }
}

/// A [`Hasher`] backed by any [`Digest`].
#[derive(Debug, Default, Clone)]
pub struct DigestHasher<D>(D);

impl<D: Digest + Default> Hasher for DigestHasher<D> {
    type Hash = Output<D>;

    fn write(&mut self, bytes: &[u8]) {
        Digest::update(&mut self.0, bytes);
    }

    fn finish(self) -> Self::Hash {
        self.0.finalize()
    }
}
