//! Scans `/proc` for the bereavement-survival exit path.
//!
//! Counts entries under `/proc` whose names are entirely ASCII digits (i.e.
//! process directories), stopping as soon as more than one is found since
//! the handler only cares whether the supervisor is alone.

use crate::debug;

/// Returns the number of processes visible in `/proc`, capped at 2 (early
/// exit once we know the supervisor isn't alone). Returns `2` on
/// enumeration failure too, so the handler's "alive" default falls out of
/// the normal `<= 1` comparison without a separate error branch.
pub fn process_count() -> i32 {
    let entries = match std::fs::read_dir("/proc") {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Could not open /proc: {e}.");
            return 2;
        }
    };

    let mut count = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()) {
            count += 1;
            if count > 1 {
                return count;
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supervisor_process_is_at_least_one() {
        // This process itself has a /proc/<pid> entry, so the count can
        // never come back as zero on a system with /proc.
        assert!(process_count() >= 1);
    }
}
