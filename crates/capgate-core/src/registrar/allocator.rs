//! Request-code allocation.
//!
//! Codes are drawn from a caller-supplied bitmask: a random seed masked
//! into range, then a linear probe until a free code is found. The
//! randomness only shortens the probe under load; it is not a security
//! property.

/// Allocates a free code in `[0, mask]`.
///
/// `is_taken` is consulted for each candidate; the first free one wins.
/// Terminates whenever at least one code in the mask range is free. A
/// fully saturated mask space makes this loop forever, so callers must
/// size the mask well above their plausible concurrent-request count
/// (`0xFF` for constrained owner kinds is ample for the handful of
/// prompts that can be in flight at once).
pub fn allocate<F>(mask: u32, is_taken: F) -> u32
where
    F: Fn(u32) -> bool,
{
    allocate_from(rand::random::<u32>(), mask, is_taken)
}

/// [`allocate`] with an explicit probe seed.
pub fn allocate_from<F>(seed: u32, mask: u32, is_taken: F) -> u32
where
    F: Fn(u32) -> bool,
{
    let mut code = seed & mask;
    while is_taken(code) {
        code = code.wrapping_add(1) & mask;
    }
    code
}
