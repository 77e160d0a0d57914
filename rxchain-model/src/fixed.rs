//! Fixed-point helpers.
//!
//! Samples are carried in `i32` and every intermediate sum, product and shift
//! is done in `i64`, so that nothing overflows before the explicit clip at a
//! stage output register. Right shifts of signed values are arithmetic (they
//! round toward negative infinity), while [`trunc_div`] rounds toward zero, as
//! the signed division operator of the hardware description does.

/// Returns the unsigned mask for a word of `bits` bits.
///
/// # Panics
///
/// Panics if `bits` is not in `1..=32`.
pub fn mask(bits: u32) -> u32 {
    assert!((1..=32).contains(&bits), "invalid sample width {bits}");
    if bits == 32 {
        u32::MAX
    } else {
        (1u32 << bits) - 1
    }
}

/// Saturates `value` to the signed range of a `bits`-wide word.
///
/// The result lies in `[-(2^(bits-1)), 2^(bits-1) - 1]`.
///
/// # Panics
///
/// Panics if `bits` is not in `1..=32`.
pub fn sign_clip(value: i64, bits: u32) -> i32 {
    assert!((1..=32).contains(&bits), "invalid sample width {bits}");
    let max = (1i64 << (bits - 1)) - 1;
    let min = -(1i64 << (bits - 1));
    // the clamped value fits in i32 for any width up to 32
    value.clamp(min, max) as i32
}

/// Integer division truncating toward zero.
///
/// Division by zero yields zero.
pub fn trunc_div(a: i64, b: i64) -> i64 {
    if b == 0 {
        0
    } else {
        a.wrapping_div(b)
    }
}

/// Interprets the `bits` least significant bits of `raw` as a two's
/// complement number.
pub fn sign_extend(raw: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    let raw = raw & mask(bits);
    ((raw << shift) as i32) >> shift
}

/// Masks a signed value to `bits` bits, giving the unsigned bus word that
/// represents it.
pub fn to_unsigned(value: i32, bits: u32) -> u32 {
    (value as u32) & mask(bits)
}
