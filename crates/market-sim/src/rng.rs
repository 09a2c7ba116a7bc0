/// Seeded 32-bit generator (mulberry32 mixing).
///
/// The sequence is fully determined by the seed and must stay bit-identical
/// across platforms, so every step is plain wrapping `u32` arithmetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededRng {
    state: u32,
}

const GOLDEN_INCREMENT: u32 = 0x6D2B_79F5;
const UNIT_SCALE: f64 = 4_294_967_296.0;

impl SeededRng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Seeds from a signed integer the way the seed formulas produce them,
    /// reducing modulo 2^32.
    pub fn from_signed_seed(seed: i64) -> Self {
        Self::new(seed as u32)
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(GOLDEN_INCREMENT);
        let t = self.state;
        let mut r = (t ^ (t >> 15)).wrapping_mul(1 | t);
        r ^= r.wrapping_add((r ^ (r >> 7)).wrapping_mul(61 | r));
        r ^ (r >> 14)
    }

    /// Next value in `[0, 1)`.
    pub fn next_unit(&mut self) -> f64 {
        f64::from(self.next_u32()) / UNIT_SCALE
    }

    /// Symmetric draw in `[-half_width, half_width)`.
    pub fn next_symmetric(&mut self, half_width: f64) -> f64 {
        (self.next_unit() - 0.5) * 2.0 * half_width
    }
}

impl Iterator for SeededRng {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        Some(self.next_unit())
    }
}

/// Round-half-up, matching how seed formulas round slider values.
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}
