use crate::config::{BuildConfig, ExperimentCell, RunConfig, SweepSpec};
use itertools::{iproduct, Itertools};

/// Expand a sweep into the full cartesian product of every build-time
/// and run-time dimension.
///
/// The nesting order is fixed (protocol outermost, reps innermost), so
/// the same spec always yields the same cell list in the same order.
pub fn cells(spec: &SweepSpec) -> Vec<ExperimentCell> {
    iproduct!(
        spec.protocols.iter(),
        spec.payloads.iter(),
        spec.buffer_slots.iter(),
        spec.txs_in_epoch.iter(),
        spec.batch_bitmap_updates.iter(),
        spec.workloads.iter(),
        spec.records.iter(),
        spec.threads.iter(),
        spec.skews.iter(),
        spec.reps.iter()
    )
    .map(
        |(protocol, payload, slots, epoch, bitmap, workload, records, threads, skew, reps)| {
            ExperimentCell {
                build: BuildConfig {
                    protocol: protocol.clone(),
                    payload: *payload,
                    buffer_slots: *slots,
                    txs_in_epoch: *epoch,
                    batch_bitmap_update: *bitmap,
                },
                run: RunConfig {
                    workload: workload.clone(),
                    records: *records,
                    threads: *threads,
                    skew: *skew,
                    reps: *reps,
                },
            }
        },
    )
    .collect()
}

/// The builds required by a cell list: first occurrence order, each
/// distinct build config exactly once.
pub fn distinct_builds(cells: &[ExperimentCell]) -> Vec<BuildConfig> {
    cells.iter().map(|cell| &cell.build).unique().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> SweepSpec {
        SweepSpec {
            protocols: vec!["caracal".to_string(), "serval".to_string()],
            payloads: vec![4],
            buffer_slots: vec![4],
            txs_in_epoch: vec![4096],
            batch_bitmap_updates: vec![false],
            workloads: vec!["X".to_string()],
            records: vec![1000],
            threads: vec![8],
            skews: vec![0.0, 0.5, 0.9],
            reps: vec![10],
        }
    }

    #[test]
    fn cell_count_is_dimension_product() {
        assert_eq!(cells(&spec()).len(), 2 * 3);

        let mut wide = spec();
        wide.payloads = vec![4, 8];
        wide.reps = vec![1, 10];
        assert_eq!(cells(&wide).len(), 2 * 2 * 3 * 2);
    }

    #[test]
    fn empty_dimension_yields_empty_matrix() {
        let mut empty = spec();
        empty.skews.clear();

        assert!(cells(&empty).is_empty());
    }

    #[test]
    fn generation_is_deterministic() {
        assert_eq!(cells(&spec()), cells(&spec()));
    }

    #[test]
    fn one_build_per_distinct_config() {
        let cells = cells(&spec());
        let builds = distinct_builds(&cells);

        // three run configs share each build, it still shows up once
        assert_eq!(builds.len(), 2);
        assert_eq!(builds[0].protocol, "caracal");
        assert_eq!(builds[1].protocol, "serval");
    }

    #[test]
    fn protocol_varies_outermost() {
        let cells = cells(&spec());

        assert!(cells[..3].iter().all(|cell| cell.build.protocol == "caracal"));
        assert!(cells[3..].iter().all(|cell| cell.build.protocol == "serval"));
        assert_eq!(cells[0].run.skew, 0.0);
        assert_eq!(cells[2].run.skew, 0.9);
    }
}
