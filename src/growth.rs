//! Growable lists for the schema and row parsers.
//!
//! Column and cell lists start at [`INITIAL_CAPACITY`] and double whenever
//! they fill up. Reservation is fallible so an allocation failure surfaces
//! as an error value instead of aborting the process.

use std::collections::TryReserveError;

pub const INITIAL_CAPACITY: usize = 10;

/// Allocates an empty list with room for [`INITIAL_CAPACITY`] items.
pub fn with_initial_capacity<T>() -> Result<Vec<T>, TryReserveError> {
    let mut items = Vec::new();
    items.try_reserve_exact(INITIAL_CAPACITY)?;
    Ok(items)
}

/// Pushes `item`, doubling the capacity first when the list is full.
pub fn push_doubling<T>(items: &mut Vec<T>, item: T) -> Result<(), TryReserveError> {
    if items.len() == items.capacity() {
        let additional = items.capacity().max(INITIAL_CAPACITY);
        items.try_reserve_exact(additional)?;
    }
    items.push(item);
    Ok(())
}
