// File: testing-framework/src/orchestrator/rng.rs
//
// Deterministic RNG
//
// Every random value a harness produces (validator keys, funded accounts,
// generated transactions) is drawn from one seeded generator. The seed is
// logged so a failing run can be replayed with BLOCKSIM_TEST_SEED.

use parking_lot::Mutex;
use rand::{
    distributions::{uniform::SampleRange, Distribution, Standard},
    rngs::StdRng,
    CryptoRng, Rng, RngCore, SeedableRng,
};

/// Environment variable holding the replay seed, hex (`0x..`) or decimal
pub const SEED_ENV_VAR: &str = "BLOCKSIM_TEST_SEED";

/// Seeded random number generator for reproducible tests
///
/// The generator sits behind a mutex so that shared references can draw
/// values; `RngCore` is implemented on `&mut TestRng` access without
/// locking.
pub struct TestRng {
    seed: u64,
    rng: Mutex<StdRng>,
}

impl TestRng {
    /// Seed from `BLOCKSIM_TEST_SEED` when set and parseable, otherwise from
    /// the OS. The seed is always logged.
    pub fn new_from_env_or_random() -> Self {
        let seed = match std::env::var(SEED_ENV_VAR) {
            Ok(value) => match parse_seed(&value) {
                Some(seed) => {
                    log::info!("TestRng seed from {}: 0x{:016x}", SEED_ENV_VAR, seed);
                    seed
                }
                None => {
                    log::warn!("Ignoring unparseable {}={:?}", SEED_ENV_VAR, value);
                    rand::thread_rng().gen()
                }
            },
            Err(_) => rand::thread_rng().gen(),
        };
        Self::with_seed(seed)
    }

    /// Use `seed` when given, otherwise fall back to
    /// [`TestRng::new_from_env_or_random`].
    pub fn from_option(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::with_seed(seed),
            None => Self::new_from_env_or_random(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        log::info!("TestRng seed: 0x{:016x}", seed);
        log::info!("   Replay: {}=0x{:016x} cargo test ...", SEED_ENV_VAR, seed);
        Self {
            seed,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Shell prefix that reproduces this run
    pub fn replay_hint(&self) -> String {
        format!("{}=0x{:016x}", SEED_ENV_VAR, self.seed)
    }

    pub fn gen<T>(&self) -> T
    where
        Standard: Distribution<T>,
    {
        self.rng.lock().gen()
    }

    pub fn gen_range<T, R>(&self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: SampleRange<T>,
    {
        self.rng.lock().gen_range(range)
    }

    pub fn fill(&self, dest: &mut [u8]) {
        self.rng.lock().fill_bytes(dest);
    }

    /// Random byte string of `len` bytes
    pub fn bytes(&self, len: usize) -> Vec<u8> {
        let mut out = vec![0u8; len];
        self.fill(&mut out);
        out
    }

    /// Child generator seeded from this one, for components that need their
    /// own stream without disturbing the parent sequence length.
    pub fn fork(&self) -> Self {
        let seed = self.gen();
        Self {
            seed,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Run `f` with exclusive access to the underlying generator.
    pub fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        f(&mut self.rng.lock())
    }
}

impl RngCore for TestRng {
    fn next_u32(&mut self) -> u32 {
        self.rng.get_mut().next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.get_mut().next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.get_mut().fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.get_mut().try_fill_bytes(dest)
    }
}

// StdRng is a CSPRNG; seeding it deterministically is what tests want.
impl CryptoRng for TestRng {}

fn parse_seed(value: &str) -> Option<u64> {
    let value = value.trim();
    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let a = TestRng::with_seed(0xa3f5c8e1b2d94706);
        let b = TestRng::with_seed(0xa3f5c8e1b2d94706);
        let xs: Vec<u64> = (0..8).map(|_| a.gen()).collect();
        let ys: Vec<u64> = (0..8).map(|_| b.gen()).collect();
        assert_eq!(xs, ys);
        assert_eq!(a.seed(), 0xa3f5c8e1b2d94706);
    }

    #[test]
    fn test_gen_range_bounds() {
        let rng = TestRng::with_seed(1);
        for _ in 0..100 {
            let value: u64 = rng.gen_range(1..1000);
            assert!((1..1000).contains(&value));
        }
    }

    #[test]
    fn test_fork_is_deterministic() {
        let a = TestRng::with_seed(42);
        let b = TestRng::with_seed(42);
        assert_eq!(a.fork().seed(), b.fork().seed());
        assert_eq!(a.bytes(16), b.bytes(16));
    }

    #[test]
    fn test_rng_core_matches_shared_access() {
        let mut a = TestRng::with_seed(7);
        let b = TestRng::with_seed(7);
        assert_eq!(a.next_u64(), b.gen::<u64>());
    }

    #[test]
    fn test_parse_seed() {
        assert_eq!(parse_seed("0xdeadbeefcafebabe"), Some(0xdeadbeefcafebabe));
        assert_eq!(parse_seed("0XFF"), Some(255));
        assert_eq!(parse_seed(" 12345 "), Some(12345));
        assert_eq!(parse_seed("not-a-seed"), None);
        assert_eq!(
            TestRng::with_seed(0xdeadbeefcafebabe).replay_hint(),
            "BLOCKSIM_TEST_SEED=0xdeadbeefcafebabe"
        );
    }
}
