use rand::Rng;
use time::OffsetDateTime;

const SUFFIX_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SUFFIX_LEN: usize = 4;

/// How many fresh numbers are tried before giving up on an insert.
pub const MAX_ATTEMPTS: usize = 5;

/// `BK` + last 8 digits of the unix time in milliseconds + 4 random `[A-Z0-9]`.
pub fn generate_booking_number<R: Rng>(now: OffsetDateTime, rng: &mut R) -> String {
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    let segment = millis.rem_euclid(100_000_000);
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
        .collect();
    format!("BK{segment:08}{suffix}")
}

pub fn next_booking_number() -> String {
    generate_booking_number(OffsetDateTime::now_utc(), &mut rand::thread_rng())
}
