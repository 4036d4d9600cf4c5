//! The SM3 compression function (GB/T 32905-2016).

/// Size of a message block in bytes.
pub const BLOCK_LEN: usize = 64;

/// Chaining value words.
pub type State = [u32; 8];

/// A single message block.
pub type Block = [u8; BLOCK_LEN];

/// Initial chaining value.
pub const IV: State = [
    0x7380_166f, 0x4914_b2b9, 0x1724_42d7, 0xda8a_0600, 0xa96f_30bc, 0x1631_38aa, 0xe38d_ee4d, 0xb0fb_0e4e,
];

/// Rounds below this index mix with plain XOR, the others with majority / selection.
const XOR_ROUNDS: usize = 16;

const ROUNDS: usize = 64;

/// Round constants `T_j <<< j`, the rotation being taken mod 32.
const T: [u32; ROUNDS] = {
    let mut t = [0; ROUNDS];
    let mut j = 0;
    while j < ROUNDS {
        let base: u32 = if j < XOR_ROUNDS { 0x79cc_4519 } else { 0x7a87_9d8a };
        t[j] = base.rotate_left((j % 32) as u32);
        j += 1;
    }
    t
};

#[inline(always)]
fn p0(x: u32) -> u32 {
    x ^ x.rotate_left(9) ^ x.rotate_left(17)
}

#[inline(always)]
fn p1(x: u32) -> u32 {
    x ^ x.rotate_left(15) ^ x.rotate_left(23)
}

#[inline(always)]
fn xor(x: u32, y: u32, z: u32) -> u32 {
    x ^ y ^ z
}

#[inline(always)]
fn majority(x: u32, y: u32, z: u32) -> u32 {
    (x & y) | (x & z) | (y & z)
}

#[inline(always)]
fn choose(x: u32, y: u32, z: u32) -> u32 {
    (x & y) | (!x & z)
}

/// Message expansion: 68 words `W` and the 64 derived words `W' = W[j] ^ W[j + 4]`.
fn expand(block: &Block) -> ([u32; 68], [u32; ROUNDS]) {
    let mut w = [0u32; 68];

    for (word, bytes) in w.iter_mut().zip(block.chunks_exact(4)) {
        *word = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    }

    for i in 16..68 {
        w[i] = p1(w[i - 16] ^ w[i - 9] ^ w[i - 3].rotate_left(15)) ^ w[i - 13].rotate_left(7) ^ w[i - 6];
    }

    let mut w1 = [0u32; ROUNDS];
    for (j, word) in w1.iter_mut().enumerate() {
        *word = w[j] ^ w[j + 4];
    }

    (w, w1)
}

/// One round over the working variables `[A, B, C, D, E, F, G, H]`.
#[inline(always)]
fn round(
    v: &mut State,
    j: usize,
    w: u32,
    w1: u32,
    ff: fn(u32, u32, u32) -> u32,
    gg: fn(u32, u32, u32) -> u32,
) {
    let [a, b, c, d, e, f, g, h] = *v;

    let a12 = a.rotate_left(12);
    let ss1 = a12.wrapping_add(e).wrapping_add(T[j]).rotate_left(7);
    let ss2 = ss1 ^ a12;
    let tt1 = ff(a, b, c).wrapping_add(d).wrapping_add(ss2).wrapping_add(w1);
    let tt2 = gg(e, f, g).wrapping_add(h).wrapping_add(ss1).wrapping_add(w);

    *v = [tt1, a, b.rotate_left(9), c, p0(tt2), e, f.rotate_left(19), g];
}

/// Compress a single block into the given chaining value.
pub fn compress(state: State, block: &Block) -> State {
    let (w, w1) = expand(block);
    let mut v = state;

    for j in 0..XOR_ROUNDS {
        round(&mut v, j, w[j], w1[j], xor, xor);
    }
    for j in XOR_ROUNDS..ROUNDS {
        round(&mut v, j, w[j], w1[j], majority, choose);
    }

    let mut next = state;
    next.iter_mut().zip(v).for_each(|(s, v)| *s ^= v);
    next
}
