//! Chronologically ordered child keys.
//!
//! A push key is 20 characters: 8 encode the creation time in milliseconds,
//! 12 are random. Keys created within the same millisecond reuse the
//! previous random part incremented by one, so keys always sort in creation
//! order under plain string comparison.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

/// Alphabet in ASCII order so that string order matches numeric order.
const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

const TIME_CHARS: usize = 8;
const RANDOM_CHARS: usize = 12;

/// Generates push keys. Not thread-safe on its own; callers serialize
/// access.
#[derive(Debug, Default)]
pub struct PushIdGenerator {
    last_ms: u64,
    last_random: [u8; RANDOM_CHARS],
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a key stamped with the current wall-clock time.
    pub fn next_id(&mut self) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        self.next_at(now)
    }

    /// Generate a key stamped with `now_ms`.
    pub fn next_at(&mut self, now_ms: u64) -> String {
        // A clock that moves backwards keeps the previous timestamp so
        // ordering holds.
        if self.last_ms != 0 && now_ms <= self.last_ms {
            increment(&mut self.last_random);
        } else {
            let mut rng = rand::thread_rng();
            for digit in self.last_random.iter_mut() {
                *digit = rng.gen_range(0..64);
            }
            self.last_ms = now_ms;
        }

        let mut id = Vec::with_capacity(TIME_CHARS + RANDOM_CHARS);
        let mut ts = self.last_ms;
        let mut time_part = [0u8; TIME_CHARS];
        for slot in time_part.iter_mut().rev() {
            *slot = PUSH_CHARS[(ts % 64) as usize];
            ts /= 64;
        }
        id.extend_from_slice(&time_part);
        id.extend(self.last_random.iter().map(|d| PUSH_CHARS[*d as usize]));
        String::from_utf8_lossy(&id).into_owned()
    }
}

fn increment(digits: &mut [u8; RANDOM_CHARS]) {
    for digit in digits.iter_mut().rev() {
        if *digit == 63 {
            *digit = 0;
        } else {
            *digit += 1;
            return;
        }
    }
}
