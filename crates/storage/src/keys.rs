//! Chronologically ordered record keys.
//!
//! A key is 20 characters: 8 encode the millisecond timestamp, 12 are random.
//! Keys generated within the same millisecond reuse the previous random part
//! incremented by one, so lexicographic order is generation order.

use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";
const TIMESTAMP_LEN: usize = 8;
const RANDOM_LEN: usize = 12;
pub const KEY_LEN: usize = TIMESTAMP_LEN + RANDOM_LEN;

#[derive(Debug, Default)]
struct KeyState {
    last_ms: i64,
    last_random: [u8; RANDOM_LEN],
}

#[derive(Debug, Default)]
pub struct PushKeyGenerator {
    state: Mutex<KeyState>,
}

impl PushKeyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_key(&self) -> String {
        self.next_key_at(Utc::now().timestamp_millis())
    }

    pub fn next_key_at(&self, now_ms: i64) -> String {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };

        // A clock step backwards is treated like a repeat of the last instant.
        let mut now_ms = now_ms.max(state.last_ms);
        if now_ms == state.last_ms && state.last_ms != 0 {
            if !increment(&mut state.last_random) {
                now_ms += 1;
                state.last_random = random_part();
            }
        } else {
            state.last_random = random_part();
        }
        state.last_ms = now_ms;

        let mut key = String::with_capacity(KEY_LEN);
        key.push_str(&encode_timestamp(now_ms));
        key.extend(state.last_random.iter().map(|v| PUSH_CHARS[*v as usize] as char));
        key
    }
}

fn encode_timestamp(mut ms: i64) -> String {
    let mut chars = [b'-'; TIMESTAMP_LEN];
    for slot in chars.iter_mut().rev() {
        *slot = PUSH_CHARS[(ms.rem_euclid(64)) as usize];
        ms = ms.div_euclid(64);
    }
    chars.iter().map(|c| *c as char).collect()
}

fn random_part() -> [u8; RANDOM_LEN] {
    let bytes = Uuid::new_v4().into_bytes();
    let mut out = [0u8; RANDOM_LEN];
    for (slot, byte) in out.iter_mut().zip(bytes.iter()) {
        *slot = byte % 64;
    }
    out
}

/// Adds one to the base-64 digits. Returns false on overflow.
fn increment(digits: &mut [u8; RANDOM_LEN]) -> bool {
    for digit in digits.iter_mut().rev() {
        if *digit == 63 {
            *digit = 0;
        } else {
            *digit += 1;
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_have_fixed_length_and_alphabet() {
        let generator = PushKeyGenerator::new();
        let key = generator.next_key();
        assert_eq!(key.len(), KEY_LEN);
        assert!(key.bytes().all(|b| PUSH_CHARS.contains(&b)));
    }

    #[test]
    fn keys_within_one_millisecond_strictly_increase() {
        let generator = PushKeyGenerator::new();
        let keys: Vec<_> = (0..200).map(|_| generator.next_key_at(1_700_000_000_000)).collect();
        for pair in keys.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn later_timestamps_sort_after_earlier_ones() {
        let generator = PushKeyGenerator::new();
        let early = generator.next_key_at(1_000);
        let late = generator.next_key_at(1_000_000);
        assert!(early < late);
    }

    #[test]
    fn clock_going_backwards_keeps_order() {
        let generator = PushKeyGenerator::new();
        let first = generator.next_key_at(5_000);
        let second = generator.next_key_at(4_000);
        assert!(first < second);
    }

    #[test]
    fn increment_carries_and_reports_overflow() {
        let mut digits = [63u8; RANDOM_LEN];
        digits[0] = 1;
        assert!(increment(&mut digits));
        assert_eq!(digits[0], 2);
        assert!(digits[1..].iter().all(|d| *d == 0));

        let mut full = [63u8; RANDOM_LEN];
        assert!(!increment(&mut full));
    }
}
