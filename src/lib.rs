pub mod allocation;
pub mod config;
pub mod decimal;
pub mod dues;
pub mod errors;
pub mod events;
pub mod fines;
pub mod ledger;
pub mod records;
pub mod schedule;
pub mod types;
pub mod view;

// re-export key types
pub use allocation::{allocate, CashAllocation};
pub use config::GroupConfig;
pub use decimal::{Money, Rate};
pub use dues::{compute_due, expected_interest, reconcile_status, DueInputs, MemberDue};
pub use errors::{LedgerError, Result};
pub use events::{Event, EventStore};
pub use fines::{fine_for, FineTier, LateFineKind, LateFineRule};
pub use ledger::{GroupLedger, PeriodCloseOutcome};
pub use records::{Group, Member, MemberContribution, Membership, Period};
pub use schedule::{days_late, CollectionSchedule};
pub use types::{
    AllocationPolicy, CollectionFrequency, ContributionId, ContributionStatus, GroupId, MemberId,
    Payment, PeriodId,
};
pub use view::{ContributionView, GroupSummaryView, PeriodView};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
