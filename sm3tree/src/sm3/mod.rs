//! The SM3 hash function, as a streaming hasher.
//!
//! Besides the usual `new` / `update` / `finalize` cycle, the chaining value and the number of
//! absorbed bits can be exported and imported back with [`Sm3::state`], [`Sm3::bit_count`] and
//! [`Sm3::from_state`]. Resuming a hash from an exported state is equivalent to carrying on the
//! original stream, which is exactly what makes Merkle–Damgård constructions open to
//! length-extension: see [`padding`].

mod compress;
pub use compress::{compress, Block, State, BLOCK_LEN, IV};

/// Size of a SM3 digest in bytes.
pub const DIGEST_LEN: usize = 32;

/// A SM3 digest.
pub type Sm3Output = [u8; DIGEST_LEN];

/// Offset of the 64-bit length field within the last padded block.
const LENGTH_OFFSET: usize = BLOCK_LEN - 8;

/// A streaming SM3 hasher.
#[derive(Debug, Clone)]
pub struct Sm3 {
    state: State,
    bit_count: u64,
    buffer: Block,
    buffered: usize,
}

impl Default for Sm3 {
    fn default() -> Self {
        Self::new()
    }
}

impl Sm3 {
    /// Create a hasher starting from the standard initial value.
    pub fn new() -> Self {
        Self::from_state(IV, 0)
    }

    /// Create a hasher resuming from the given chaining value, as if `bit_count` bits had already been
    /// absorbed.
    ///
    /// No check is made on `bit_count`: it is only used for the length field of the final padding.
    pub fn from_state(state: State, bit_count: u64) -> Self {
        Self {
            state,
            bit_count,
            buffer: [0; BLOCK_LEN],
            buffered: 0,
        }
    }

    /// Current chaining value (bytes still sitting in the block buffer are not part of it).
    pub fn state(&self) -> State {
        self.state
    }

    /// Number of bits absorbed so far.
    pub fn bit_count(&self) -> u64 {
        self.bit_count
    }

    /// Reset the hasher to its initial state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Absorb some bytes.
    pub fn update(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }

        self.bit_count = self.bit_count.wrapping_add((data.len() as u64).wrapping_mul(8));

        let mut data = data;

        if self.buffered > 0 {
            let (head, tail) = data.split_at(usize::min(BLOCK_LEN - self.buffered, data.len()));
            self.buffer[self.buffered..self.buffered + head.len()].copy_from_slice(head);
            self.buffered += head.len();

            if self.buffered < BLOCK_LEN {
                return;
            }

            self.state = compress(self.state, &self.buffer);
            self.buffered = 0;
            data = tail;
        }

        let mut blocks = data.chunks_exact(BLOCK_LEN);
        for block in &mut blocks {
            // `.unwrap()` is safe here: `chunks_exact` only yields full blocks
            self.state = compress(self.state, block.try_into().unwrap());
        }

        let remainder = blocks.remainder();
        self.buffer[..remainder.len()].copy_from_slice(remainder);
        self.buffered = remainder.len();
    }

    /// Pad the buffered bytes, compress the last block(s) and return the digest.
    pub fn finalize(mut self) -> Sm3Output {
        let mut block = [0u8; BLOCK_LEN];
        block[..self.buffered].copy_from_slice(&self.buffer[..self.buffered]);
        block[self.buffered] = 0x80;

        // no room left for the length field, spill into an extra block
        if self.buffered + 1 > LENGTH_OFFSET {
            self.state = compress(self.state, &block);
            block = [0; BLOCK_LEN];
        }

        block[LENGTH_OFFSET..].copy_from_slice(&self.bit_count.to_be_bytes());
        self.state = compress(self.state, &block);

        digest_from_state(&self.state)
    }

    /// Hash the given data at once.
    pub fn digest(data: impl AsRef<[u8]>) -> Sm3Output {
        let mut hasher = Self::new();
        hasher.update(data.as_ref());
        hasher.finalize()
    }
}

/// Serialize a chaining value as a digest (big-endian words).
pub fn digest_from_state(state: &State) -> Sm3Output {
    let mut digest = [0u8; DIGEST_LEN];
    for (bytes, word) in digest.chunks_exact_mut(4).zip(state) {
        bytes.copy_from_slice(&word.to_be_bytes());
    }
    digest
}

/// Read a digest back as a chaining value, eg. to resume hashing with [`Sm3::from_state`].
pub fn state_from_digest(digest: &Sm3Output) -> State {
    let mut state = [0u32; 8];
    for (word, bytes) in state.iter_mut().zip(digest.chunks_exact(4)) {
        *word = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    }
    state
}

/// The padding appended by [`Sm3::finalize`] to a message of `message_len` bytes.
///
/// `message || padding(message.len())` always spans a whole number of blocks.
pub fn padding(message_len: u64) -> Vec<u8> {
    let offset = (message_len % BLOCK_LEN as u64) as usize;
    let zeros = (LENGTH_OFFSET + BLOCK_LEN - offset - 1) % BLOCK_LEN;

    let mut padding = Vec::with_capacity(1 + zeros + 8);
    padding.push(0x80);
    padding.resize(1 + zeros, 0);
    padding.extend_from_slice(&message_len.wrapping_mul(8).to_be_bytes());
    padding
}

/// Check the digest of the given data.
pub fn verify(data: impl AsRef<[u8]>, expected: &Sm3Output) -> bool {
    Sm3::digest(data) == *expected
}

#[cfg(test)]
mod tests {
    use super::*;

    use hex_literal::hex;
    use proptest::prelude::*;

    fn chunked(data: &[u8], cuts: &[usize]) -> Sm3Output {
        let mut hasher = Sm3::new();
        let mut start = 0;

        for &cut in cuts {
            let cut = cut.clamp(start, data.len());
            hasher.update(&data[start..cut]);
            start = cut;
        }
        hasher.update(&data[start..]);

        hasher.finalize()
    }

    #[test]
    fn known_vectors() {
        for (data, digest) in [
            (&b""[..], hex!("1ab21d8355cfa17f8e61194831e81a8f22bec8c728fefb747ed035eb5082aa2b")),
            (&b"abc"[..], hex!("66c7f0f462eeedd9d1f2d46bdc10e4e24167c4875cf2f7a2297da02b8f4ba8e0")),
            (
                &b"abcdabcdabcdabcdabcdabcdabcdabcdabcdabcdabcdabcdabcdabcdabcdabcd"[..],
                hex!("debe9ff92275b8a138604889c18e5a4d6fdb70e5387e5765293dcba39c0c5732"),
            ),
            (
                &b"abcdefghijklmnopqrstuvwxyz"[..],
                hex!("b80fe97a4da24afc277564f66a359ef440462ad28dcc6d63adb24d5c20a61595"),
            ),
        ] {
            assert_eq!(Sm3::digest(data), digest, "{:?}", String::from_utf8_lossy(data));
            assert!(verify(data, &digest));
        }
    }

    #[test]
    fn million_a() {
        let mut hasher = Sm3::new();
        for _ in 0..1000 {
            hasher.update(&[b'a'; 1000]);
        }

        assert_eq!(hasher.finalize(), hex!("c8aaf89429554029e231941a2acc0ad61ff2a5acd8fadd25847a3a732b3b02c3"));
    }

    #[test]
    fn padding_spill() {
        // 55 bytes still fit with the length field, 56 need an extra block
        for (len, digest) in [
            (55, hex!("5953830d3f55b72a9425c1f4545c66fe6208dfaa88ea24bddb982bdefc3c0229")),
            (56, hex!("a2556ac9a6c548a74eb710498c5bdf079ba244f7930931862ca29bf4fd945ad7")),
            (63, hex!("beb7b1a82c0dc38fc921c2fd9bdb266565b385c867ad3f8becf27a89a41ee000")),
            (64, hex!("6e6dad0825f2b02b85bc50252db0e73eea98548037d1df7d8056f5001517c24a")),
        ] {
            let data = vec![0x5a; len];
            assert_eq!(Sm3::digest(&data), digest, "len {len}");
            assert_eq!(chunked(&data, &[len / 2]), digest, "len {len}");
        }

        let data: Vec<u8> = (0..=255).cycle().take(1024).collect();
        assert_eq!(Sm3::digest(&data), hex!("1f00bad6a72e851e0f6e94fd317f97b74d5fbc4c090aefb91e7554e3f9c8c7fb"));
    }

    #[test]
    fn chunk_boundaries() {
        let data: Vec<u8> = (0..=255).cycle().take(200).collect();
        let expected = Sm3::digest(&data);

        for cuts in [
            vec![0],
            vec![1],
            vec![63],
            vec![64],
            vec![65],
            vec![0, 1, 63, 64, 65],
            vec![1, 64, 65, 128, 129],
            vec![63, 127, 191],
        ] {
            assert_eq!(chunked(&data, &cuts), expected, "cuts {cuts:?}");
        }

        let mut hasher = Sm3::new();
        data.iter().for_each(|byte| hasher.update(std::slice::from_ref(byte)));
        assert_eq!(hasher.finalize(), expected);
    }

    #[test]
    fn empty_updates() {
        let mut hasher = Sm3::new();
        hasher.update(b"");
        hasher.update(b"ab");
        hasher.update(b"");
        hasher.update(b"c");
        hasher.update(b"");

        assert_eq!(hasher.bit_count(), 24);
        assert_eq!(hasher.finalize(), Sm3::digest(b"abc"));
    }

    #[test]
    fn deterministic() {
        let data = b"the quick brown fox jumps over the lazy dog".to_vec();
        let copy = data.clone();

        assert_eq!(Sm3::digest(&data), Sm3::digest(&data));
        assert_eq!(data, copy);
    }

    #[test]
    fn export_state() {
        let data: Vec<u8> = (0..=255).cycle().take(300).collect();
        let (head, tail) = data.split_at(2 * BLOCK_LEN);

        let mut hasher = Sm3::new();
        hasher.update(head);
        assert_eq!(hasher.bit_count(), 2 * BLOCK_LEN as u64 * 8);

        let mut resumed = Sm3::from_state(hasher.state(), hasher.bit_count());
        resumed.update(tail);
        hasher.update(tail);

        assert_eq!(resumed.finalize(), Sm3::digest(&data));
        assert_eq!(hasher.finalize(), Sm3::digest(&data));
    }

    #[test]
    fn state_digest_conversions() {
        let digest = Sm3::digest(b"abc");
        assert_eq!(digest_from_state(&state_from_digest(&digest)), digest);
        assert_eq!(state_from_digest(&digest)[0], 0x66c7_f0f4);
        assert_eq!(digest_from_state(&IV)[..4], hex!("7380166f"));
    }

    #[test]
    fn padding_lengths() {
        for len in [0u64, 1, 55, 56, 63, 64, 65, 119, 120, 1000] {
            let padding = padding(len);

            assert_eq!((len + padding.len() as u64) % BLOCK_LEN as u64, 0, "len {len}");
            assert_eq!(padding[0], 0x80);
            assert_eq!(padding[padding.len() - 8..], (len * 8).to_be_bytes());
            assert!(padding[1..padding.len() - 8].iter().all(|&b| b == 0));
        }

        assert_eq!(padding(55).len(), 9);
        assert_eq!(padding(56).len(), 72);
    }

    #[test]
    fn length_extension() {
        let message = b"original_message";
        let suffix = b"_attack";

        let digest = Sm3::digest(message);
        assert_eq!(digest, hex!("6a8f5855e9b4407d07b8c7bfb3f647b259f10b0c832568b70f35d367486e3726"));

        let glue = padding(message.len() as u64);
        let mut forged = Sm3::from_state(state_from_digest(&digest), (message.len() + glue.len()) as u64 * 8);
        forged.update(suffix);

        let extended = [&message[..], &glue[..], &suffix[..]].concat();
        assert_eq!(forged.finalize(), Sm3::digest(extended));
    }

    #[test]
    fn reset() {
        let mut hasher = Sm3::new();
        hasher.update(b"some garbage");
        hasher.reset();
        hasher.update(b"abc");

        assert_eq!(hasher.finalize(), Sm3::digest(b"abc"));
    }

    proptest! {
        #[test]
        fn chunking_invariance(
            data in proptest::collection::vec(any::<u8>(), 0..400),
            mut cuts in proptest::collection::vec(0usize..400, 0..10),
        ) {
            cuts.sort_unstable();
            prop_assert_eq!(chunked(&data, &cuts), Sm3::digest(&data));
        }
    }
}
