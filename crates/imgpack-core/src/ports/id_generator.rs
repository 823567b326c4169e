//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use crate::domain::ids::{ArtifactId, BatchId};
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は調整不要で一意な ID を生成
///
/// # ULID の特性
/// - 先頭 48-bit: Clock から取ったミリ秒タイムスタンプ
/// - 後続 80-bit: ランダム（同一ミリ秒の並行リクエストでも衝突しない）
pub trait IdGenerator: Send + Sync {
    fn generate_artifact_id(&self) -> ArtifactId;

    fn generate_batch_id(&self) -> BatchId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
/// テストでは FixedClock を渡すと timestamp 部分が決定的になります。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_artifact_id(&self) -> ArtifactId {
        ArtifactId::from(self.next_ulid())
    }

    fn generate_batch_id(&self) -> BatchId {
        BatchId::from(self.next_ulid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};
    use std::collections::HashSet;

    #[test]
    fn ulid_generator_generates_unique_ids() {
        let id_gen = UlidGenerator::new(SystemClock);

        let ids: HashSet<_> = (0..1_000).map(|_| id_gen.generate_artifact_id()).collect();
        assert_eq!(ids.len(), 1_000);
    }

    #[test]
    fn same_millisecond_ids_differ_but_share_timestamp() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));

        let id1 = id_gen.generate_artifact_id();
        let id2 = id_gen.generate_artifact_id();

        // ランダム部分があるので ID は異なる
        assert_ne!(id1, id2);

        // timestamp 部分は同じ
        assert_eq!(id1.as_ulid().timestamp_ms(), id2.as_ulid().timestamp_ms());
        assert_eq!(id1.created_at(), fixed_time);
    }

    #[test]
    fn different_id_types_are_generated() {
        let id_gen = UlidGenerator::new(SystemClock);

        assert!(id_gen.generate_artifact_id().to_string().starts_with("images-"));
        assert!(id_gen.generate_batch_id().to_string().starts_with("batch-"));
    }
}
