//! Stride-slot access for the transport buffer.
//!
//! The transport buffer stores particle `i` at `i * STRIDE .. i * STRIDE + STRIDE`.
//! `slot!` hides the offset arithmetic and picks the access flavour by build:
//!
//! - Debug: normal indexing, out-of-range slots panic with the index.
//! - Release: `get_unchecked`, callers have already bounded `i` by the
//!   buffer's particle count.
//!
//! ```rust
//! use bouncebox_engine::slot;
//! use bouncebox_engine::domain::particle::{FIELD_VX, FIELD_X};
//!
//! let mut slots = vec![0.0f32; 10];
//! slot!(slots, 1, FIELD_X = 3.5);
//! assert_eq!(*slot!(slots, 1, FIELD_X), 3.5);
//! assert_eq!(*slot!(slots, 1, FIELD_VX), 0.0);
//! ```

/// Read or write one field of one particle slot.
///
/// - Read: `slot!(slots, index, FIELD)` yields `&f32`
/// - Write: `slot!(slots, index, FIELD = value)`
#[macro_export]
macro_rules! slot {
    ($slots:expr, $index:expr, $field:ident = $val:expr) => {{
        let at = ($index) * $crate::domain::particle::STRIDE + $field;
        #[cfg(debug_assertions)]
        {
            $slots[at] = $val;
        }
        #[cfg(not(debug_assertions))]
        unsafe {
            *$slots.get_unchecked_mut(at) = $val;
        }
        ()
    }};

    ($slots:expr, $index:expr, $field:ident) => {{
        let at = ($index) * $crate::domain::particle::STRIDE + $field;
        #[cfg(debug_assertions)]
        let r = &$slots[at];
        #[cfg(not(debug_assertions))]
        let r = unsafe { $slots.get_unchecked(at) };
        r
    }};
}

#[cfg(test)]
mod tests {
    use crate::domain::particle::{FIELD_SIZE, FIELD_VY, FIELD_X, FIELD_Y, STRIDE};

    #[test]
    fn reads_use_stride_offsets() {
        let slots: Vec<f32> = (0..(STRIDE * 3)).map(|v| v as f32).collect();
        assert_eq!(*slot!(slots, 2, FIELD_X), 10.0);
        assert_eq!(*slot!(slots, 2, FIELD_Y), 11.0);
        assert_eq!(*slot!(slots, 0, FIELD_SIZE), 4.0);
    }

    #[test]
    fn writes_touch_one_field_only() {
        let mut slots = vec![1.0f32; STRIDE * 2];
        slot!(slots, 1, FIELD_VY = -2.0);
        assert_eq!(slots.iter().filter(|&&v| v != 1.0).count(), 1);
        assert_eq!(slots[STRIDE + FIELD_VY], -2.0);
    }

    #[test]
    #[should_panic]
    #[cfg(debug_assertions)]
    fn out_of_range_slot_panics_in_debug() {
        let slots = vec![0.0f32; STRIDE];
        let _ = *slot!(slots, 1, FIELD_X);
    }
}
