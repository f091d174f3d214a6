use std::sync::atomic::{AtomicU64, Ordering};

use crate::errors::{FeeError, Result};
use crate::types::ReceiptNumber;

const SEQ_BITS: u32 = 40;
const SEQ_MASK: u64 = (1u64 << SEQ_BITS) - 1;
const MAX_CAS_ATTEMPTS: u32 = 64;

/// issues strictly increasing, collision-free receipt numbers for one tenant
///
/// year and sequence are packed into a single atomic word advanced by
/// compare-and-swap, so concurrent issuers can never observe a duplicate.
/// a number consumed by a transaction that later fails is never reissued;
/// gaps are acceptable, duplicates are not.
#[derive(Debug, Default)]
pub struct ReceiptSequencer {
    state: AtomicU64,
}

impl ReceiptSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// resume issuing after the given watermark (state restore)
    pub fn resume_from(watermark: ReceiptNumber) -> Self {
        Self {
            state: AtomicU64::new(Self::pack(watermark.year, watermark.sequence)),
        }
    }

    /// next receipt number for the given calendar year; the sequence restarts
    /// at 1 when the year advances, and the year never moves backwards even
    /// if the caller's clock regresses
    pub fn next(&self, year: i32) -> Result<ReceiptNumber> {
        for _ in 0..MAX_CAS_ATTEMPTS {
            let current = self.state.load(Ordering::Acquire);
            let (cur_year, cur_seq) = Self::unpack(current);

            let (next_year, next_seq) = if year > cur_year {
                (year, 1)
            } else {
                (cur_year, cur_seq + 1)
            };

            let packed = Self::pack(next_year, next_seq);
            if self
                .state
                .compare_exchange(current, packed, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return Ok(ReceiptNumber {
                    year: next_year,
                    sequence: next_seq,
                });
            }
            std::hint::spin_loop();
        }

        Err(FeeError::SequenceConflict {
            attempts: MAX_CAS_ATTEMPTS,
        })
    }

    /// last issued number (state export)
    pub fn watermark(&self) -> ReceiptNumber {
        let (year, sequence) = Self::unpack(self.state.load(Ordering::Acquire));
        ReceiptNumber { year, sequence }
    }

    fn pack(year: i32, sequence: u64) -> u64 {
        ((year as u64) << SEQ_BITS) | (sequence & SEQ_MASK)
    }

    fn unpack(packed: u64) -> (i32, u64) {
        ((packed >> SEQ_BITS) as i32, packed & SEQ_MASK)
    }
}
