use std::num::NonZeroUsize;

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

/// Slack applied before rounding the item count up, so that an exact multiple
/// such as `9.0 / 3.0` never produces a trailing entry of a few ulps.
const COUNT_EPSILON: f64 = 1e-9;

/// Upper bound on the number of entries a single schedule may hold.
pub(crate) const MAX_ENTRIES: usize = 100_000;

#[derive(Debug, Error, PartialEq)]
pub(crate) enum ScheduleError {
    #[error("media pool is empty")]
    EmptyPool,
    #[error("{name} must be a positive number of seconds, got {value}")]
    InvalidDuration { name: &'static str, value: f64 },
    #[error("schedule would need {count} entries, more than the limit of {MAX_ENTRIES}")]
    TooManyEntries { count: f64 },
}

/// How the requested length is spread over the selected items.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ScheduleMode {
    /// Every item shows for the nominal duration; the last one may overshoot.
    FixedPerItem,
    /// `ceil(total / per_item)` items share the total evenly.
    ExactFill,
    /// A fixed number of items share the total evenly.
    FixedCount(NonZeroUsize),
    /// Nominal duration for full items; a shorter remainder entry repeats the
    /// last full item.
    TrimLast,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScheduleEntry<T> {
    pub item: T,
    pub display_duration: f64,
    pub is_final: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct ScheduleOptions {
    pub per_item_duration: f64,
    pub mode: ScheduleMode,
    pub shuffle: bool,
    pub hold_last: bool,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            per_item_duration: 30.0,
            mode: ScheduleMode::FixedPerItem,
            shuffle: false,
            hold_last: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Schedule<T> {
    entries: Vec<ScheduleEntry<T>>,
}

impl<T> Schedule<T> {
    pub(crate) fn entries(&self) -> &[ScheduleEntry<T>] {
        &self.entries
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Seconds covered by the regular entries, leaving out a hold frame.
    pub(crate) fn covered_duration(&self) -> f64 {
        self.entries
            .iter()
            .filter(|entry| !entry.is_final)
            .map(|entry| entry.display_duration)
            .sum()
    }

    pub(crate) fn total_duration(&self) -> f64 {
        self.entries.iter().map(|entry| entry.display_duration).sum()
    }
}

fn check_duration(name: &'static str, value: f64) -> Result<f64, ScheduleError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ScheduleError::InvalidDuration { name, value })
    }
}

fn summed(count: usize, per_item: f64) -> f64 {
    std::iter::repeat(per_item).take(count).sum()
}

fn item_count(total: f64, per_item: f64) -> Result<usize, ScheduleError> {
    let ratio = total / per_item;
    if ratio > MAX_ENTRIES as f64 {
        return Err(ScheduleError::TooManyEntries { count: ratio.ceil() });
    }
    let count = ((ratio - COUNT_EPSILON).ceil() as usize).max(1);
    // the slack may never leave part of the total uncovered
    if summed(count, per_item) < total {
        Ok(count + 1)
    } else {
        Ok(count)
    }
}

/// Lays `pool` out in order (or one shuffled order) and repeats it until enough
/// entries exist to cover `total_duration` seconds.
pub(crate) fn build_schedule<T, R>(
    pool: &[T],
    total_duration: f64,
    options: &ScheduleOptions,
    rng: &mut R,
) -> Result<Schedule<T>, ScheduleError>
where
    T: Clone,
    R: Rng + ?Sized,
{
    if pool.is_empty() {
        return Err(ScheduleError::EmptyPool);
    }
    let total = check_duration("total_duration", total_duration)?;
    let per_item = check_duration("per_item_duration", options.per_item_duration)?;

    let count = match options.mode {
        ScheduleMode::FixedCount(n) if n.get() > MAX_ENTRIES => {
            return Err(ScheduleError::TooManyEntries {
                count: n.get() as f64,
            })
        }
        ScheduleMode::FixedCount(n) => n.get(),
        _ => item_count(total, per_item)?,
    };

    let mut order: Vec<&T> = pool.iter().collect();
    if options.shuffle {
        order.shuffle(rng);
    }

    let mut entries: Vec<ScheduleEntry<T>> = order
        .iter()
        .cycle()
        .take(count)
        .map(|item| ScheduleEntry {
            item: (*item).clone(),
            display_duration: per_item,
            is_final: false,
        })
        .collect();

    match options.mode {
        ScheduleMode::FixedPerItem => {}
        ScheduleMode::ExactFill | ScheduleMode::FixedCount(_) => {
            let share = total / count as f64;
            entries
                .iter_mut()
                .for_each(|entry| entry.display_duration = share);
        }
        ScheduleMode::TrimLast => {
            let remainder = total - summed(count - 1, per_item);
            let partial = remainder < per_item * (1.0 - COUNT_EPSILON);
            if partial && count > 1 {
                let previous = entries[count - 2].item.clone();
                entries[count - 1].item = previous;
            }
            if let Some(last) = entries.last_mut() {
                last.display_duration = remainder.min(per_item);
            }
        }
    }

    if options.hold_last {
        if let Some(last) = entries.last() {
            let item = last.item.clone();
            entries.push(ScheduleEntry {
                item,
                display_duration: per_item,
                is_final: true,
            });
        }
    }

    Ok(Schedule { entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn options(per_item: f64, mode: ScheduleMode) -> ScheduleOptions {
        ScheduleOptions {
            per_item_duration: per_item,
            mode,
            shuffle: false,
            hold_last: false,
        }
    }

    fn items<T: Clone>(schedule: &Schedule<T>) -> Vec<T> {
        schedule.entries().iter().map(|entry| entry.item.clone()).collect()
    }

    fn pairs(schedule: &Schedule<&'static str>) -> Vec<(&'static str, f64)> {
        schedule
            .entries()
            .iter()
            .map(|entry| (entry.item, entry.display_duration))
            .collect()
    }

    #[test]
    fn fixed_per_item_rounds_up() {
        let mut rng = StdRng::seed_from_u64(0);
        let schedule = build_schedule(
            &["A", "B", "C"],
            10.0,
            &options(4.0, ScheduleMode::FixedPerItem),
            &mut rng,
        )
        .unwrap();
        assert_eq!(pairs(&schedule), vec![("A", 4.0), ("B", 4.0), ("C", 4.0)]);
        assert_eq!(schedule.covered_duration(), 12.0);
    }

    #[test]
    fn exact_fill_splits_evenly() {
        let mut rng = StdRng::seed_from_u64(0);
        let schedule = build_schedule(
            &["A", "B"],
            9.0,
            &options(3.0, ScheduleMode::ExactFill),
            &mut rng,
        )
        .unwrap();
        assert_eq!(pairs(&schedule), vec![("A", 3.0), ("B", 3.0), ("A", 3.0)]);
        assert_eq!(schedule.covered_duration(), 9.0);
    }

    #[test]
    fn exact_fill_matches_total_for_uneven_ratio() {
        let mut rng = StdRng::seed_from_u64(0);
        let schedule = build_schedule(
            &["A", "B", "C"],
            100.0,
            &options(30.0, ScheduleMode::ExactFill),
            &mut rng,
        )
        .unwrap();
        assert_eq!(schedule.len(), 4);
        assert!((schedule.covered_duration() - 100.0).abs() < 1e-9);
        assert!(schedule
            .entries()
            .iter()
            .all(|entry| (entry.display_duration - 25.0).abs() < 1e-9));
    }

    #[test]
    fn hold_last_appends_final_entry() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut opts = options(2.0, ScheduleMode::FixedPerItem);
        opts.hold_last = true;
        let schedule = build_schedule(&["A"], 5.0, &opts, &mut rng).unwrap();

        assert_eq!(schedule.len(), 4);
        let entries = schedule.entries();
        assert!(entries[..3]
            .iter()
            .all(|entry| entry.item == "A" && entry.display_duration == 2.0 && !entry.is_final));
        assert_eq!(
            entries[3],
            ScheduleEntry {
                item: "A",
                display_duration: 2.0,
                is_final: true
            }
        );
        assert_eq!(schedule.covered_duration(), 6.0);
        assert_eq!(schedule.total_duration(), 8.0);
    }

    #[test]
    fn hold_references_last_selected_item() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut opts = options(1.0, ScheduleMode::FixedPerItem);
        opts.hold_last = true;
        let schedule = build_schedule(&["A", "B", "C"], 5.0, &opts, &mut rng).unwrap();
        assert_eq!(items(&schedule), vec!["A", "B", "C", "A", "B", "B"]);
    }

    #[test]
    fn unshuffled_order_cycles_through_pool() {
        let mut rng = StdRng::seed_from_u64(0);
        let pool = ["A", "B", "C", "D"];
        let schedule = build_schedule(
            &pool,
            37.0,
            &options(2.5, ScheduleMode::FixedPerItem),
            &mut rng,
        )
        .unwrap();
        assert_eq!(schedule.len(), 15);
        for (i, item) in items(&schedule).into_iter().enumerate() {
            assert_eq!(item, pool[i % pool.len()]);
        }
    }

    #[test]
    fn fixed_per_item_overshoot_is_bounded() {
        let mut rng = StdRng::seed_from_u64(0);
        for (total, per_item) in [(1.0, 1.0), (7.3, 2.0), (120.0, 7.0), (0.5, 30.0), (61.0, 60.0)] {
            let schedule = build_schedule(
                &["A", "B"],
                total,
                &options(per_item, ScheduleMode::FixedPerItem),
                &mut rng,
            )
            .unwrap();
            let covered = schedule.covered_duration();
            assert!(covered >= total, "{covered} < {total}");
            assert!(covered < total + per_item, "{covered} >= {total} + {per_item}");
            assert_eq!(schedule.len(), (total / per_item).ceil() as usize);
        }
    }

    #[test]
    fn exact_multiple_does_not_add_an_entry() {
        let mut rng = StdRng::seed_from_u64(0);
        let schedule = build_schedule(
            &["A"],
            0.3,
            &options(0.1, ScheduleMode::TrimLast),
            &mut rng,
        )
        .unwrap();
        assert_eq!(schedule.len(), 3);
        assert!(schedule
            .entries()
            .iter()
            .all(|entry| entry.display_duration > 0.05));
    }

    #[test]
    fn trim_last_repeats_last_full_item_for_remainder() {
        let mut rng = StdRng::seed_from_u64(0);
        let schedule = build_schedule(
            &["A", "B", "C"],
            70.0,
            &options(30.0, ScheduleMode::TrimLast),
            &mut rng,
        )
        .unwrap();
        let durations: Vec<f64> = schedule
            .entries()
            .iter()
            .map(|entry| entry.display_duration)
            .collect();
        assert_eq!(items(&schedule), vec!["A", "B", "B"]);
        assert_eq!(durations[0], 30.0);
        assert_eq!(durations[1], 30.0);
        assert!((durations[2] - 10.0).abs() < 1e-9);
        assert!((schedule.covered_duration() - 70.0).abs() < 1e-9);
    }

    #[test]
    fn trim_last_on_exact_multiple_keeps_cycling() {
        let mut rng = StdRng::seed_from_u64(0);
        let schedule = build_schedule(
            &["A", "B", "C"],
            90.0,
            &options(30.0, ScheduleMode::TrimLast),
            &mut rng,
        )
        .unwrap();
        assert_eq!(pairs(&schedule), vec![("A", 30.0), ("B", 30.0), ("C", 30.0)]);
    }

    #[test]
    fn trim_last_shorter_than_one_item() {
        let mut rng = StdRng::seed_from_u64(0);
        let schedule = build_schedule(
            &["A", "B"],
            12.0,
            &options(30.0, ScheduleMode::TrimLast),
            &mut rng,
        )
        .unwrap();
        assert_eq!(pairs(&schedule), vec![("A", 12.0)]);
    }

    #[test]
    fn tiny_fraction_above_a_multiple_still_gets_covered() {
        let mut rng = StdRng::seed_from_u64(0);
        let total = 3.0000000001;
        let schedule = build_schedule(
            &["A"],
            total,
            &options(1.0, ScheduleMode::FixedPerItem),
            &mut rng,
        )
        .unwrap();
        assert_eq!(schedule.len(), 4);
        assert!(schedule.covered_duration() >= total);

        let sums = build_schedule(
            &["A"],
            1.1,
            &options(0.1, ScheduleMode::FixedPerItem),
            &mut rng,
        )
        .unwrap();
        assert!(sums.covered_duration() >= 1.1);
    }

    #[test]
    fn hold_after_even_split_uses_nominal_duration() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut opts = options(30.0, ScheduleMode::ExactFill);
        opts.hold_last = true;
        let schedule = build_schedule(&["A", "B"], 100.0, &opts, &mut rng).unwrap();

        assert_eq!(schedule.len(), 5);
        let hold = &schedule.entries()[4];
        assert!(hold.is_final);
        assert_eq!(hold.item, "B");
        assert_eq!(hold.display_duration, 30.0);
        assert!((schedule.covered_duration() - 100.0).abs() < 1e-9);
        assert!((schedule.total_duration() - 130.0).abs() < 1e-9);

        opts.mode = ScheduleMode::FixedCount(NonZeroUsize::new(13).unwrap());
        opts.per_item_duration = 60.0;
        let schedule = build_schedule(&["A", "B", "C"], 780.0, &opts, &mut rng).unwrap();
        assert_eq!(schedule.len(), 14);
        assert_eq!(schedule.entries().iter().filter(|entry| entry.is_final).count(), 1);
        assert_eq!(schedule.entries()[13].display_duration, 60.0);
        assert!((schedule.covered_duration() - 780.0).abs() < 1e-9);
    }

    #[test]
    fn oversized_schedules_are_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = build_schedule(
            &["A"],
            3600.0,
            &options(1e-12, ScheduleMode::FixedPerItem),
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(err, ScheduleError::TooManyEntries { .. }));

        let huge = NonZeroUsize::new(MAX_ENTRIES + 1).unwrap();
        let err = build_schedule(
            &["A"],
            10.0,
            &options(1.0, ScheduleMode::FixedCount(huge)),
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(err, ScheduleError::TooManyEntries { .. }));

        let at_limit = build_schedule(
            &["A"],
            MAX_ENTRIES as f64,
            &options(1.0, ScheduleMode::FixedPerItem),
            &mut rng,
        )
        .unwrap();
        assert_eq!(at_limit.len(), MAX_ENTRIES);
    }

    #[test]
    fn fixed_count_ignores_nominal_duration() {
        let mut rng = StdRng::seed_from_u64(0);
        let count = NonZeroUsize::new(13).unwrap();
        let schedule = build_schedule(
            &["A", "B", "C"],
            780.0,
            &options(60.0, ScheduleMode::FixedCount(count)),
            &mut rng,
        )
        .unwrap();
        assert_eq!(schedule.len(), 13);
        assert!((schedule.covered_duration() - 780.0).abs() < 1e-9);

        let short = build_schedule(
            &["A"],
            10.0,
            &options(60.0, ScheduleMode::FixedCount(NonZeroUsize::new(4).unwrap())),
            &mut rng,
        )
        .unwrap();
        assert_eq!(short.len(), 4);
        assert!(short
            .entries()
            .iter()
            .all(|entry| entry.display_duration == 2.5));
    }

    #[test]
    fn shuffle_is_deterministic_for_a_seed() {
        let pool: Vec<u32> = (0..20).collect();
        let mut opts = options(1.0, ScheduleMode::FixedPerItem);
        opts.shuffle = true;

        let first = build_schedule(&pool, 50.0, &opts, &mut StdRng::seed_from_u64(42)).unwrap();
        let second = build_schedule(&pool, 50.0, &opts, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn shuffle_repeats_one_permutation() {
        let pool: Vec<u32> = (0..6).collect();
        let mut opts = options(1.0, ScheduleMode::FixedPerItem);
        opts.shuffle = true;
        let schedule = build_schedule(&pool, 18.0, &opts, &mut StdRng::seed_from_u64(7)).unwrap();

        let picked = items(&schedule);
        let mut first_pass = picked[..6].to_vec();
        assert_eq!(&picked[6..12], first_pass.as_slice());
        assert_eq!(&picked[12..18], first_pass.as_slice());
        first_pass.sort_unstable();
        assert_eq!(first_pass, pool);
    }

    #[test]
    fn empty_pool_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let pool: [&str; 0] = [];
        let err = build_schedule(&pool, 10.0, &ScheduleOptions::default(), &mut rng).unwrap_err();
        assert_eq!(err, ScheduleError::EmptyPool);
    }

    #[test]
    fn non_positive_durations_are_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = build_schedule(&["A"], 0.0, &ScheduleOptions::default(), &mut rng).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::InvalidDuration {
                name: "total_duration",
                ..
            }
        ));

        let err = build_schedule(
            &["A"],
            10.0,
            &options(-1.0, ScheduleMode::FixedPerItem),
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::InvalidDuration {
                name: "per_item_duration",
                ..
            }
        ));

        let err = build_schedule(&["A"], f64::NAN, &ScheduleOptions::default(), &mut rng)
            .unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidDuration { .. }));
    }
}
