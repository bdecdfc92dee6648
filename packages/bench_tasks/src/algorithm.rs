//! Scalar kernels used by the CPU payloads.
//!
//! These are deliberately naive. The goal is a stable amount of work per call, not the fastest
//! possible answer.

#![allow(
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::indexing_slicing,
    reason = "numeric kernels with bounds established by the loop ranges"
)]

/// Seed of every xorshift sequence used by the payloads.
pub const XORSHIFT_SEED: u64 = 8_675_728_858_075_378_228;

/// Counts the primes in `1..=max` by trial division.
///
/// # Examples
///
/// ```
/// assert_eq!(bench_tasks::prime_count(100), 25);
/// ```
#[must_use]
pub fn prime_count(max: u32) -> u32 {
    let mut count = 0;

    for candidate in 1..=max {
        if is_prime(candidate) {
            count += 1;
        }
    }

    count
}

fn is_prime(n: u32) -> bool {
    if n < 2 {
        return false;
    }

    let n = u64::from(n);
    let mut divisor: u64 = 2;

    while divisor * divisor <= n {
        if n % divisor == 0 {
            return false;
        }

        divisor += 1;
    }

    true
}

/// The `n`-th Fibonacci number modulo 2^64.
#[must_use]
pub fn fib_value(n: u64) -> u64 {
    let mut a: u64 = 0;
    let mut b: u64 = 1;

    for _ in 0..n {
        let next = a.wrapping_add(b);
        a = b;
        b = next;
    }

    a
}

/// One step of the 64-bit xorshift generator with shifts (13, 7, 17).
#[inline]
#[must_use]
pub fn xorshift_next(mut x: u64) -> u64 {
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x
}

/// Applies [`xorshift_next()`] `steps` times.
#[must_use]
pub fn xorshift_nstep(mut x: u64, steps: u64) -> u64 {
    for _ in 0..steps {
        x = xorshift_next(x);
    }

    x
}

const LEFT_TOP_COLOR: u32 = 0x00ff_0000;
const RIGHT_TOP_COLOR: u32 = 0x0000_ff00;
const LEFT_BOTTOM_COLOR: u32 = 0x0000_00ff;
const RIGHT_BOTTOM_COLOR: u32 = 0x00ff_ffff;

/// Renders a circle into a row-major ARGB buffer of `width * height` pixels.
///
/// Every quadrant of the circle has its own base color, shaded by a ripple that depends on the
/// distance from the center. Pixels outside the circle are cleared.
///
/// # Panics
///
/// Panics if `buffer` holds fewer than `width * height` pixels or `radius` is zero.
pub fn render_circle(
    buffer: &mut [u32],
    width: u32,
    height: u32,
    center: (u32, u32),
    radius: u32,
) {
    assert!(radius > 0, "circle radius must be positive");

    let pixels = width as usize * height as usize;
    let buffer = &mut buffer[..pixels];
    buffer.fill(0);

    let (cx, cy) = center;

    let left = cx.saturating_sub(radius);
    let right = cx.saturating_add(radius).min(width - 1);
    let top = cy.saturating_sub(radius);
    let bottom = cy.saturating_add(radius).min(height - 1);

    for y in top..=bottom {
        for x in left..=right {
            let dx = x as i32 - cx as i32;
            let dy = y as i32 - cy as i32;

            let distance = f64::from(dx * dx + dy * dy).sqrt() as u32;

            if distance > radius {
                continue;
            }

            let normalized = distance as f32 / radius as f32;
            let ripple = (normalized * 10.0).sin().abs();

            let base = match (dx < 0, dy < 0) {
                (true, true) => LEFT_TOP_COLOR,
                (false, true) => RIGHT_TOP_COLOR,
                (true, false) => LEFT_BOTTOM_COLOR,
                (false, false) => RIGHT_BOTTOM_COLOR,
            };

            buffer[(y * width + x) as usize] = shade(base, normalized * ripple);
        }
    }
}

fn shade(color: u32, factor: f32) -> u32 {
    let channels = color
        .to_le_bytes()
        .map(|channel| (f32::from(channel) * factor) as u8);

    u32::from_le_bytes(channels)
}
