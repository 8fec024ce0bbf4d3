//! Domain-level result types.
//! These are returned by services inside the domain layer and are **not**
//! exposed over the public API. The REST layer maps them to the DTOs in the
//! `shared` crate.

pub mod transactions {
    use tokio::task::JoinHandle;

    /// Counts describing one bulk replace.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct ReplaceSummary {
        /// Items in the submitted list
        pub received: usize,
        /// Rows actually stored
        pub inserted: usize,
        /// Items that failed validation
        pub skipped_invalid: usize,
        /// Valid items that collided with an earlier item on the dedup tuple
        pub dropped_duplicates: usize,
    }

    /// Result of a successful bulk replace.
    #[derive(Debug)]
    pub struct SaveReceipt {
        pub summary: ReplaceSummary,
        /// Snapshot regeneration scheduled after the commit
        pub snapshot: JoinHandle<()>,
    }
}

pub mod import {
    /// Result of one import attempt.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ImportOutcome {
        Imported { imported: usize },
        Skipped { reason: String },
    }
}
