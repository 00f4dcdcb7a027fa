//! Fast Modulo - Division by a runtime constant without a hardware divide.
//!
//! The book converts every incoming price into a tick count, which is a
//! division by the tick size. The tick size is fixed for the life of a book,
//! so we precompute a multiplicative inverse once and turn every subsequent
//! division and modulo into a multiply and a shift.
//!
//! Two strategies are provided:
//!
//! - [`GranlundFastMod`]: 64-bit magic number with a power-of-two fast path.
//! - [`LemireFastMod`]: 128-bit magic number, no special cases beyond 1.
//!
//! Both are exact for every `u64` numerator.

/// A divisor that has been preprocessed for repeated division.
pub trait FastDivisor {
    /// `numerator / divisor`
    fn div(&self, numerator: u64) -> u64;

    /// `numerator % divisor`
    fn rem(&self, numerator: u64) -> u64;

    /// The divisor this evaluator was built from.
    fn denominator(&self) -> u64;
}

#[inline(always)]
fn mulhi(a: u64, b: u64) -> u64 {
    ((a as u128 * b as u128) >> 64) as u64
}

// ============================================================================
// Granlund-Montgomery
// ============================================================================

const SHIFT_MASK: u8 = 0x3F;
const POW2_MARKER: u8 = 0x40;

/// Round-up multiplier with the "add" correction, plus a shift-only path
/// when the divisor is a power of two.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GranlundFastMod {
    denominator: u64,
    magic: u64,
    /// Low six bits hold the shift; `POW2_MARKER` flags the shift-only path.
    more: u8,
}

impl GranlundFastMod {
    /// Precompute the magic number for `denominator`.
    ///
    /// # Panics
    /// Panics if `denominator` is zero.
    #[cold]
    #[inline(never)]
    pub fn new(denominator: u64) -> Self {
        assert!(
            denominator != 0,
            "Attempting to use fastmod optimisation with denominator of 0"
        );

        let floor_log2 = (63 - denominator.leading_zeros()) as u8;

        if denominator.is_power_of_two() {
            return Self {
                denominator,
                magic: 0,
                more: floor_log2 | POW2_MARKER,
            };
        }

        // 2^(64 + floor_log2) / d always fits in 64 bits for a non power of two
        let scaled = 1u128 << (64 + floor_log2 as u32);
        let quotient = (scaled / denominator as u128) as u64;
        let rem = (scaled - quotient as u128 * denominator as u128) as u64;

        let twice_rem = rem.wrapping_add(rem);
        let round_up = (twice_rem >= denominator || twice_rem < rem) as u64;

        // The true multiplier is 65 bits wide; the implicit top bit is
        // restored by the add step in `div`.
        let magic = quotient
            .wrapping_add(quotient)
            .wrapping_add(round_up)
            .wrapping_add(1);

        Self {
            denominator,
            magic,
            more: floor_log2 & SHIFT_MASK,
        }
    }

    /// Whether this divisor takes the shift-only path.
    #[inline]
    pub fn is_power_of_two(&self) -> bool {
        self.more & POW2_MARKER != 0
    }
}

impl FastDivisor for GranlundFastMod {
    #[inline(always)]
    fn div(&self, numerator: u64) -> u64 {
        let shift = (self.more & SHIFT_MASK) as u32;
        if self.more & POW2_MARKER != 0 {
            return numerator >> shift;
        }
        let q = mulhi(numerator, self.magic);
        (((numerator - q) >> 1) + q) >> shift
    }

    #[inline(always)]
    fn rem(&self, numerator: u64) -> u64 {
        numerator - self.denominator * self.div(numerator)
    }

    #[inline]
    fn denominator(&self) -> u64 {
        self.denominator
    }
}

// ============================================================================
// Lemire
// ============================================================================

/// `M = ceil(2^128 / d)`; the remainder is read straight out of the
/// fractional bits of `M * n`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LemireFastMod {
    magic: u128,
    denominator: u64,
}

impl LemireFastMod {
    /// Precompute the magic number for `denominator`.
    ///
    /// # Panics
    /// Panics if `denominator` is zero.
    #[cold]
    #[inline(never)]
    pub fn new(denominator: u64) -> Self {
        assert!(
            denominator != 0,
            "Attempting to use fastmod optimisation with denominator of 0"
        );

        // ceil(2^128 / 1) does not fit; magic 0 marks the identity divisor.
        let magic = if denominator == 1 {
            0
        } else {
            u128::MAX / denominator as u128 + 1
        };

        Self { magic, denominator }
    }
}

/// High 128 bits of the 192-bit product `a * b`.
#[inline(always)]
fn mul128_u64(a: u128, b: u64) -> u64 {
    let lo = (a as u64 as u128 * b as u128) >> 64;
    let hi = (a >> 64) * b as u128;
    ((lo + hi) >> 64) as u64
}

impl FastDivisor for LemireFastMod {
    #[inline(always)]
    fn div(&self, numerator: u64) -> u64 {
        if self.magic == 0 {
            return numerator;
        }
        mul128_u64(self.magic, numerator)
    }

    #[inline(always)]
    fn rem(&self, numerator: u64) -> u64 {
        if self.magic == 0 {
            return 0;
        }
        let lowbits = self.magic.wrapping_mul(numerator as u128);
        mul128_u64(lowbits, self.denominator)
    }

    #[inline]
    fn denominator(&self) -> u64 {
        self.denominator
    }
}
