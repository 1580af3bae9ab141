// [libs/core/quota-distributor/src/lib.rs]
//! The autogrow quota distribution algorithm. Starting from usage,
//! commitments and historical envelopes, it builds up each project's
//! `Allocated` quota per AZ in four ordered phases — hard minimum, soft
//! minimum, growth, and base quota — each phase raising `Allocated` a
//! little further and never lowering what an earlier phase already
//! granted.

mod distribute;
mod overcommit;

pub use distribute::{distribute_quota, QuotaDistributionResult, ResourceQuotaInfo};
pub use overcommit::OvercommitPermission;
