//! Debug assertion macros for the ring buffer's slot-sequence protocol.
//!
//! Active only in debug builds (`#[cfg(debug_assertions)]`), so there is
//! zero overhead in release builds. Naming follows the teacher's
//! `INV-SEQ-*` convention.

// =============================================================================
// INV-SEQ-01: Slot readable only at the expected sequence
// =============================================================================

/// Assert a slot is only consumed when its sequence marks it ready.
///
/// **Invariant**: a slot with sequence `s` is readable by the consumer
/// only when `s == expected_read_seq + 1`.
///
/// Used in: `Ring::try_consume()` just before `assume_init_read()`.
macro_rules! debug_assert_slot_ready {
    ($seq:expr, $cursor:expr) => {
        debug_assert!(
            $seq == $cursor.wrapping_add(1),
            "INV-SEQ-01 violated: slot sequence {} does not match expected {}",
            $seq,
            $cursor.wrapping_add(1)
        )
    };
}

// =============================================================================
// INV-SEQ-02: Slot writable only at the expected sequence
// =============================================================================

/// Assert a slot is only claimed when its sequence marks it free.
///
/// **Invariant**: a slot with sequence `s` is writable by a producer only
/// when `s == expected_write_seq`.
///
/// Used in: `Ring::try_claim()` before the CAS on the producer cursor.
macro_rules! debug_assert_slot_writable {
    ($seq:expr, $cursor:expr) => {
        debug_assert!(
            $seq == $cursor,
            "INV-SEQ-02 violated: slot sequence {} does not match expected write seq {}",
            $seq,
            $cursor
        )
    };
}

// =============================================================================
// INV-SEQ-03: Monotonic progress
// =============================================================================

/// Assert that a cursor only increases (using wrapping comparison).
///
/// Used in: `Ring::try_claim()` after a successful CAS, `Ring::try_consume()`
/// after advancing the consumer cursor.
macro_rules! debug_assert_monotonic {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new == $old.wrapping_add(1),
            "INV-SEQ-03 violated: {} did not advance by exactly one, {} -> {}",
            $name,
            $old,
            $new
        )
    };
}

// =============================================================================
// INV-SEQ-04: No spurious wrap-around
// =============================================================================

/// Assert we haven't wrapped around u64 cursor space unexpectedly.
///
/// At any realistic publish rate, wrap takes decades; this only catches
/// bugs where a cursor jumps backwards.
///
/// Used in: `Ring::try_claim()`/`Ring::try_consume()` after advancing.
macro_rules! debug_assert_no_wrap {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new > $old || $old.wrapping_sub($new) > (1u64 << 32),
            "INV-SEQ-04 potential wrap detected: {} went from {} to {}",
            $name,
            $old,
            $new
        )
    };
}

// =============================================================================
// INV-INIT-01: Field count bound
// =============================================================================

/// Assert the record field count invariant `0 <= n <= MAX_FIELDS`.
///
/// Used in: `Record::add_field()`, `Record::reset()`.
macro_rules! debug_assert_field_count_bounded {
    ($count:expr, $max:expr) => {
        debug_assert!(
            $count <= $max,
            "INV-INIT-01 violated: field count {} exceeds max {}",
            $count,
            $max
        )
    };
}

pub(crate) use debug_assert_field_count_bounded;
pub(crate) use debug_assert_monotonic;
pub(crate) use debug_assert_no_wrap;
pub(crate) use debug_assert_slot_ready;
pub(crate) use debug_assert_slot_writable;
