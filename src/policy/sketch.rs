//! Popularity estimation for W-TinyLFU admission.
//!
//! [`FrequencySketch`] is a count-min sketch of 4-bit counters, packed
//! sixteen to a `u64`, that ages itself by halving every counter once the
//! number of increments reaches ten times its width.
//!
//! [`Doorkeeper`] is a Bloom filter in front of the sketch.  A key's first
//! sighting only sets its doorkeeper bits; later sightings reach the sketch.
//! One-hit wonders therefore never consume sketch counters.  The estimate
//! adds one for a doorkeeper hit so that a key seen once still beats a key
//! never seen.
//!
//! [`Popularity`] bundles the two and clears the doorkeeper whenever the
//! sketch ages, keeping both views of history the same length.

/// Multiplicative seeds for the four sketch rows.
const ROW_SEEDS: [u64; 4] = [
    0xABC9_DEFD_ABCD_EF01,
    0xFEDC_BA98_7654_3210,
    0x0F1E_2D3C_4B5A_6978,
    0x9876_5432_10AB_CDEF,
];

/// Multiplicative seeds for the doorkeeper's four probes.
const PROBE_SEEDS: [u64; 4] = [
    0xF135_7AEA_2E62_A9C5,
    0x0A3F_29B9_C7E4_A1D3,
    0x9C3D_2F1A_5B7E_4C8D,
    0x2B5E_7A1C_4F9D_3E6B,
];

/// Clears the top bit of every nibble so a right shift cannot carry
/// between neighbouring counters.
const HALVE_MASK: u64 = 0x7777_7777_7777_7777;

const COUNTER_MAX: u64 = 15;

/// Largest key population either structure is sized for.
pub(crate) const MAX_TRACKED_ENTRIES: usize = 1 << 22;

pub struct FrequencySketch {
    table: Vec<u64>,
    /// `table.len() - 1`; the length is a power of two.
    mask: usize,
    additions: u64,
    sample_size: u64,
}

impl FrequencySketch {
    /// Sizes the sketch for roughly `expected_entries` distinct keys.
    pub fn new(expected_entries: usize) -> Self {
        let width = expected_entries.min(MAX_TRACKED_ENTRIES).next_power_of_two().max(8);
        FrequencySketch {
            table: vec![0; width],
            mask: width - 1,
            additions: 0,
            sample_size: width as u64 * 10,
        }
    }

    /// Count-min estimate for `h`, in `[0, 15]`.
    #[inline]
    pub fn frequency(&self, h: u64) -> u8 {
        (0..ROW_SEEDS.len())
            .map(|row| {
                let (idx, shift) = self.slot(h, row);
                (self.table[idx] >> shift) & COUNTER_MAX
            })
            .min()
            .unwrap_or(0) as u8
    }

    /// Bumps every row's counter for `h`.  Returns `true` when this
    /// increment triggered an aging pass.
    #[inline]
    pub fn increment(&mut self, h: u64) -> bool {
        let mut added = false;
        for row in 0..ROW_SEEDS.len() {
            let (idx, shift) = self.slot(h, row);
            if (self.table[idx] >> shift) & COUNTER_MAX < COUNTER_MAX {
                self.table[idx] += 1 << shift;
                added = true;
            }
        }
        if !added {
            return false;
        }
        self.additions += 1;
        if self.additions < self.sample_size {
            return false;
        }
        self.halve();
        true
    }

    /// Halves every counter and the addition count.
    pub fn halve(&mut self) {
        for word in &mut self.table {
            *word = (*word >> 1) & HALVE_MASK;
        }
        self.additions /= 2;
    }

    /// Word index and bit shift of `h`'s counter in `row`.
    #[inline]
    fn slot(&self, h: u64, row: usize) -> (usize, u32) {
        let mixed = h.wrapping_mul(ROW_SEEDS[row]);
        let idx = (mixed >> 32) as usize & self.mask;
        let shift = ((mixed >> 28) & 0xF) as u32 * 4;
        (idx, shift)
    }
}

pub struct Doorkeeper {
    bits: Vec<u64>,
    /// Bit count minus one; the bit count is a power of two.
    mask: usize,
}

impl Doorkeeper {
    /// About ten bits per expected key, four probes: ~1 % false positives.
    pub fn new(expected_entries: usize) -> Self {
        let bits = (expected_entries.min(MAX_TRACKED_ENTRIES) * 10).next_power_of_two().max(64);
        Doorkeeper {
            bits: vec![0; bits / 64],
            mask: bits - 1,
        }
    }

    #[inline]
    pub fn contains(&self, h: u64) -> bool {
        PROBE_SEEDS.iter().all(|&seed| {
            let bit = self.bit(h, seed);
            self.bits[bit >> 6] & (1 << (bit & 63)) != 0
        })
    }

    /// Sets `h`'s bits.  Returns `true` if they were all set already.
    #[inline]
    pub fn insert(&mut self, h: u64) -> bool {
        if self.contains(h) {
            return true;
        }
        for &seed in &PROBE_SEEDS {
            let bit = self.bit(h, seed);
            self.bits[bit >> 6] |= 1 << (bit & 63);
        }
        false
    }

    pub fn clear(&mut self) {
        self.bits.fill(0);
    }

    #[inline]
    fn bit(&self, h: u64, seed: u64) -> usize {
        (h.wrapping_mul(seed) >> 32) as usize & self.mask
    }
}

/// Doorkeeper-gated frequency sketch.
pub struct Popularity {
    sketch: FrequencySketch,
    doorkeeper: Doorkeeper,
}

impl Popularity {
    pub fn new(expected_entries: usize) -> Self {
        Popularity {
            sketch: FrequencySketch::new(expected_entries),
            doorkeeper: Doorkeeper::new(expected_entries),
        }
    }

    /// Records one access to the key hashing to `h`.
    #[inline]
    pub fn record(&mut self, h: u64) {
        if self.doorkeeper.insert(h) && self.sketch.increment(h) {
            self.doorkeeper.clear();
        }
    }

    /// Estimated access count of `h`, in `[0, 16]`.
    #[inline]
    pub fn estimate(&self, h: u64) -> u8 {
        self.sketch.frequency(h) + u8::from(self.doorkeeper.contains(h))
    }
}
