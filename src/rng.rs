//! Deterministic RNG streams segregated by generation domain.
//!
//! Each session seed fans out into independent streams so that, for example,
//! extra distractor redraws never shift which operands later problems get.

use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use sha2::Sha256;
use std::cell::{RefCell, RefMut};

/// Generation concerns that consume randomness. Every domain draws from its
/// own stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamDomain {
    /// Operand sampling for generated problems.
    Operand,
    /// Distractor picks around the answer.
    Distractor,
    /// Option-order shuffles.
    Shuffle,
    /// Classify subset picks and presentation order.
    Classify,
}

impl StreamDomain {
    pub const ALL: [Self; 4] = [
        Self::Operand,
        Self::Distractor,
        Self::Shuffle,
        Self::Classify,
    ];

    const fn tag(self) -> &'static [u8] {
        match self {
            Self::Operand => b"operand",
            Self::Distractor => b"distractor",
            Self::Shuffle => b"shuffle",
            Self::Classify => b"classify",
        }
    }

    const fn slot(self) -> usize {
        match self {
            Self::Operand => 0,
            Self::Distractor => 1,
            Self::Shuffle => 2,
            Self::Classify => 3,
        }
    }
}

fn stream_seed(user_seed: u64, domain: StreamDomain) -> u64 {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()).expect("64-bit seed is valid key");
    mac.update(domain.tag());
    let digest = mac.finalize().into_bytes();
    let seed_bytes: [u8; 8] = digest[..8].try_into().expect("digest slice length");
    u64::from_le_bytes(seed_bytes)
}

/// One domain's stream, tracking how many draws it has served.
///
/// The draw counter lets tests assert that bounded-retry sampling stays
/// bounded instead of trusting rejection loops to converge.
#[derive(Debug, Clone)]
pub struct TracedRng {
    rng: SmallRng,
    draws: u64,
}

impl TracedRng {
    fn for_domain(user_seed: u64, domain: StreamDomain) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(stream_seed(user_seed, domain)),
            draws: 0,
        }
    }

    /// Number of draw calls served by this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }

    fn trace(&mut self) {
        self.draws = self.draws.saturating_add(1);
    }
}

impl rand::RngCore for TracedRng {
    fn next_u32(&mut self) -> u32 {
        self.trace();
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.trace();
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.trace();
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.trace();
        self.rng.try_fill_bytes(dest)
    }
}

/// Deterministic bundle of per-domain RNG streams.
#[derive(Debug, Clone)]
pub struct RngBundle {
    streams: [RefCell<TracedRng>; 4],
}

impl RngBundle {
    /// Construct the bundle from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            streams: StreamDomain::ALL
                .map(|domain| RefCell::new(TracedRng::for_domain(seed, domain))),
        }
    }

    /// Borrow a domain's stream.
    #[must_use]
    pub fn stream(&self, domain: StreamDomain) -> RefMut<'_, TracedRng> {
        self.streams[domain.slot()].borrow_mut()
    }

    #[must_use]
    pub fn operand(&self) -> RefMut<'_, TracedRng> {
        self.stream(StreamDomain::Operand)
    }

    #[must_use]
    pub fn distractor(&self) -> RefMut<'_, TracedRng> {
        self.stream(StreamDomain::Distractor)
    }

    #[must_use]
    pub fn shuffle(&self) -> RefMut<'_, TracedRng> {
        self.stream(StreamDomain::Shuffle)
    }

    #[must_use]
    pub fn classify(&self) -> RefMut<'_, TracedRng> {
        self.stream(StreamDomain::Classify)
    }

    /// Total draws across every stream.
    #[must_use]
    pub fn total_draws(&self) -> u64 {
        self.streams.iter().map(|s| s.borrow().draws()).sum()
    }
}
