//! Overall progress across tasks.

/// Last known range and value of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressSample {
    pub min: i64,
    pub max: i64,
    pub value: i64,
}

impl ProgressSample {
    pub fn new(min: i64, max: i64, value: i64) -> Self {
        Self { min, max, value }
    }

    /// `None` when the range is unset (`min == max`).
    ///
    /// Evaluated in `i128`, so any pair of `i64` bounds is valid. A value far
    /// outside its range saturates at the `i64` limits.
    pub fn percent(&self) -> Option<i64> {
        let denom = i128::from(self.max) - i128::from(self.min);
        if denom == 0 {
            return None;
        }
        let percent = 100 * (i128::from(self.value) - i128::from(self.min)) / denom;
        Some(saturate(percent))
    }
}

fn saturate(v: i128) -> i64 {
    i64::try_from(v).unwrap_or(if v < 0 { i64::MIN } else { i64::MAX })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverallProgress {
    /// At least one task has no bounded range, so no percentage is meaningful.
    Indeterminate,
    Percent(i64),
}

impl OverallProgress {
    pub fn percent(&self) -> Option<i64> {
        match self {
            OverallProgress::Indeterminate => None,
            OverallProgress::Percent(p) => Some(*p),
        }
    }

    pub fn is_indeterminate(&self) -> bool {
        matches!(self, OverallProgress::Indeterminate)
    }
}

/// Plain mean of per-task percentages, every task weighted equally and
/// integer division throughout. A single task with an unset range makes the
/// whole aggregate indeterminate, as does an empty task list.
pub fn aggregate<I>(samples: I) -> OverallProgress
where
    I: IntoIterator<Item = ProgressSample>,
{
    let mut sum = 0i128;
    let mut count = 0i128;
    for sample in samples {
        match sample.percent() {
            Some(percent) => sum += i128::from(percent),
            None => return OverallProgress::Indeterminate,
        }
        count += 1;
    }

    if count == 0 {
        return OverallProgress::Indeterminate;
    }
    OverallProgress::Percent(saturate(sum / count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_task_matches_formula() {
        for (min, max, value) in [(0, 10, 3), (5, 15, 15), (-10, 10, 0), (0, 3, 1), (100, 200, 100)] {
            let expected = 100 * (value - min) / (max - min);
            assert_eq!(
                aggregate([ProgressSample::new(min, max, value)]),
                OverallProgress::Percent(expected)
            );
        }
    }

    #[test]
    fn test_equal_weight_mean() {
        let overall = aggregate([ProgressSample::new(0, 10, 5), ProgressSample::new(0, 100, 20)]);
        assert_eq!(overall, OverallProgress::Percent(35));
    }

    #[test]
    fn test_integer_division() {
        // 33 + 66 + 100 = 199, / 3 = 66
        let overall = aggregate([
            ProgressSample::new(0, 3, 1),
            ProgressSample::new(0, 3, 2),
            ProgressSample::new(0, 3, 3),
        ]);
        assert_eq!(overall.percent(), Some(66));
    }

    #[test]
    fn test_any_unset_range_is_indeterminate() {
        let overall = aggregate([
            ProgressSample::new(0, 10, 10),
            ProgressSample::new(4, 4, 4),
            ProgressSample::new(0, 100, 50),
        ]);
        assert!(overall.is_indeterminate());
        assert_eq!(ProgressSample::default().percent(), None);
    }

    #[test]
    fn test_wide_ranges_do_not_overflow() {
        let near_max = ProgressSample::new(0, 200_000_000_000_000_000, 100_000_000_000_000_000);
        assert_eq!(near_max.percent(), Some(50));

        assert_eq!(ProgressSample::new(i64::MIN, i64::MAX, i64::MIN).percent(), Some(0));
        assert_eq!(ProgressSample::new(i64::MIN, i64::MAX, 0).percent(), Some(50));
        assert_eq!(ProgressSample::new(i64::MIN, i64::MAX, i64::MAX).percent(), Some(100));
        assert_eq!(ProgressSample::new(i64::MAX - 10, i64::MAX, i64::MAX - 5).percent(), Some(50));

        let overall = aggregate([
            ProgressSample::new(i64::MIN, i64::MAX, i64::MAX),
            ProgressSample::new(0, i64::MAX, 0),
        ]);
        assert_eq!(overall, OverallProgress::Percent(50));
    }

    #[test]
    fn test_out_of_range_value_saturates() {
        let sample = ProgressSample::new(0, 1, i64::MAX);
        assert_eq!(sample.percent(), Some(i64::MAX));
        assert_eq!(ProgressSample::new(0, 1, i64::MIN).percent(), Some(i64::MIN));

        let overall = aggregate([sample, sample]);
        assert_eq!(overall, OverallProgress::Percent(i64::MAX));
    }

    #[test]
    fn test_empty_is_indeterminate() {
        assert_eq!(aggregate(std::iter::empty()), OverallProgress::Indeterminate);
    }
}
