//! Repetition count sets
//!
//! A repetition carries the full set of counts its child may be matched,
//! which generalizes fixed counts, ranges and strided ranges. Sets that form
//! an arithmetic progression are stored as one, so `between(0, 1_000_000)`
//! stays small.

use crate::error::BuildError;

/// One entry of a repetition count list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Count {
    /// Exactly this many repetitions
    Finite(u32),
    /// Sentinel: the counts continue without limit
    Unbounded,
}

impl From<u32> for Count {
    fn from(n: u32) -> Self {
        Count::Finite(n)
    }
}

/// A validated, ascending set of allowed repetition counts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatCounts(Repr);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Repr {
    /// `start, start + step, ...` up to `last` (inclusive) or forever
    Progression {
        start: u32,
        step: u32,
        last: Option<u32>,
    },
    /// Irregular counts; when `unbounded`, every count past the last is allowed
    Set { counts: Vec<u32>, unbounded: bool },
}

/// How a count set is spelled with the quantifiers an engine offers
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RepeatPlan {
    /// A single `{min,max}` quantifier
    Range { min: u32, max: Option<u32> },
    /// `X{head}` followed by up to `blocks` `X{step}` blocks, or any number
    /// of them when `blocks` is `None`
    Stride {
        head: u32,
        step: u32,
        blocks: Option<u32>,
    },
    /// One fixed-count branch per entry, largest first, after an optional
    /// open-ended `X{tail,}` branch
    Choice { counts: Vec<u32>, tail: Option<u32> },
}

impl RepeatCounts {
    /// Build a count set from an explicit list
    ///
    /// The list must be non-empty and strictly ascending. [`Count::Unbounded`]
    /// may only appear last and must follow at least one finite count.
    ///
    /// # Errors
    /// Returns [`BuildError::InvalidRange`] when the list breaks those rules.
    pub fn new<I, C>(counts: I) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = C>,
        C: Into<Count>,
    {
        let mut finite: Vec<u32> = Vec::new();
        let mut unbounded = false;

        for count in counts {
            if unbounded {
                return Err(BuildError::InvalidRange(
                    "the unbounded sentinel must be the last count".to_string(),
                ));
            }
            match count.into() {
                Count::Unbounded => unbounded = true,
                Count::Finite(n) => {
                    if let Some(&prev) = finite.last() {
                        if n <= prev {
                            return Err(BuildError::InvalidRange(format!(
                                "repetition counts must be strictly ascending; got {n} after {prev}"
                            )));
                        }
                    }
                    finite.push(n);
                }
            }
        }

        if finite.is_empty() {
            return Err(BuildError::InvalidRange(
                "repetition needs at least one finite count".to_string(),
            ));
        }

        Ok(Self::normalize(finite, unbounded))
    }

    /// Exactly `n` repetitions
    pub fn exactly(n: u32) -> Self {
        RepeatCounts(Repr::Progression {
            start: n,
            step: 1,
            last: Some(n),
        })
    }

    /// Any count from `min` to `max`, inclusive
    pub fn between(min: u32, max: u32) -> Result<Self, BuildError> {
        if min > max {
            return Err(BuildError::InvalidRange(format!(
                "minimum count {min} is greater than maximum {max}"
            )));
        }
        Ok(RepeatCounts(Repr::Progression {
            start: min,
            step: 1,
            last: Some(max),
        }))
    }

    /// Any count from zero to `max`, inclusive
    pub fn up_to(max: u32) -> Self {
        RepeatCounts(Repr::Progression {
            start: 0,
            step: 1,
            last: Some(max),
        })
    }

    /// `min` or more repetitions
    pub fn at_least(min: u32) -> Self {
        RepeatCounts(Repr::Progression {
            start: min,
            step: 1,
            last: None,
        })
    }

    /// `start, start + step, ...` while not exceeding `stop` (if any)
    pub fn stepped(start: u32, stop: Option<u32>, step: u32) -> Result<Self, BuildError> {
        if step == 0 {
            return Err(BuildError::InvalidRange(
                "repetition step must be positive".to_string(),
            ));
        }
        let last = match stop {
            Some(stop) if stop < start => {
                return Err(BuildError::InvalidRange(format!(
                    "stop count {stop} is less than start count {start}"
                )));
            }
            Some(stop) => Some(start + (stop - start) / step * step),
            None => None,
        };
        let step = if last == Some(start) { 1 } else { step };
        Ok(RepeatCounts(Repr::Progression { start, step, last }))
    }

    fn normalize(finite: Vec<u32>, unbounded: bool) -> Self {
        let start = finite[0];
        let step = match finite.get(1) {
            Some(&second) => second - start,
            None => 1,
        };
        let is_progression = finite.windows(2).all(|w| w[1] - w[0] == step);
        if is_progression {
            let last = if unbounded {
                None
            } else {
                finite.last().copied()
            };
            RepeatCounts(Repr::Progression { start, step, last })
        } else {
            RepeatCounts(Repr::Set {
                counts: finite,
                unbounded,
            })
        }
    }

    /// The smallest allowed count
    pub fn min(&self) -> u32 {
        match &self.0 {
            Repr::Progression { start, .. } => *start,
            Repr::Set { counts, .. } => counts.first().copied().unwrap_or_default(),
        }
    }

    /// The largest allowed count, or `None` when unbounded
    pub fn max(&self) -> Option<u32> {
        match &self.0 {
            Repr::Progression { last, .. } => *last,
            Repr::Set {
                unbounded: true, ..
            } => None,
            Repr::Set { counts, .. } => counts.last().copied(),
        }
    }

    /// Whether the set has no upper limit
    pub fn is_unbounded(&self) -> bool {
        self.max().is_none()
    }

    /// Whether the set is a gap-free run of counts
    pub fn is_contiguous(&self) -> bool {
        matches!(self.0, Repr::Progression { step: 1, .. })
    }

    /// Whether `n` repetitions are allowed
    pub fn contains(&self, n: u32) -> bool {
        match &self.0 {
            Repr::Progression { start, step, last } => {
                n >= *start && (n - start) % step == 0 && last.is_none_or(|last| n <= last)
            }
            Repr::Set { counts, unbounded } => {
                counts.contains(&n) || (*unbounded && counts.last().is_some_and(|&l| n > l))
            }
        }
    }

    pub(crate) fn plan(&self) -> RepeatPlan {
        match &self.0 {
            Repr::Progression { start, step: 1, last } => RepeatPlan::Range {
                min: *start,
                max: *last,
            },
            Repr::Progression { start, step, last } => RepeatPlan::Stride {
                head: *start,
                step: *step,
                blocks: last.map(|last| (last - start) / step),
            },
            Repr::Set { counts, unbounded } => {
                let mut counts = counts.clone();
                let tail = if *unbounded { counts.pop() } else { None };
                counts.reverse();
                RepeatPlan::Choice { counts, tail }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_counts_progression() {
        let counts = RepeatCounts::new([1u32, 3, 5]).unwrap();
        assert_eq!(counts.min(), 1);
        assert_eq!(counts.max(), Some(5));
        assert!(!counts.is_contiguous());
        assert!(counts.contains(3));
        assert!(!counts.contains(4));
        assert!(!counts.contains(7));
    }

    #[test]
    fn test_explicit_counts_contiguous() {
        let counts = RepeatCounts::new([2u32, 3, 4]).unwrap();
        assert!(counts.is_contiguous());
        assert_eq!(counts.plan(), RepeatPlan::Range { min: 2, max: Some(4) });
    }

    #[test]
    fn test_unbounded_sentinel() {
        let counts = RepeatCounts::new([Count::Finite(2), Count::Unbounded]).unwrap();
        assert_eq!(counts.max(), None);
        assert_eq!(counts.plan(), RepeatPlan::Range { min: 2, max: None });
    }

    #[test]
    fn test_rejects_empty() {
        let err = RepeatCounts::new(Vec::<u32>::new()).unwrap_err();
        assert!(matches!(err, BuildError::InvalidRange(_)));
    }

    #[test]
    fn test_rejects_unsorted_and_duplicates() {
        assert!(RepeatCounts::new([3u32, 1]).is_err());
        assert!(RepeatCounts::new([1u32, 1]).is_err());
    }

    #[test]
    fn test_rejects_misplaced_sentinel() {
        assert!(RepeatCounts::new([Count::Unbounded, Count::Finite(1)]).is_err());
        assert!(RepeatCounts::new([Count::Unbounded]).is_err());
    }

    #[test]
    fn test_between_rejects_inverted() {
        assert!(RepeatCounts::between(4, 2).is_err());
        assert!(RepeatCounts::between(2, 2).unwrap().is_contiguous());
    }

    #[test]
    fn test_stepped_truncates_stop() {
        let counts = RepeatCounts::stepped(1, Some(6), 2).unwrap();
        assert_eq!(counts.max(), Some(5));
        assert_eq!(
            counts.plan(),
            RepeatPlan::Stride {
                head: 1,
                step: 2,
                blocks: Some(2)
            }
        );
    }

    #[test]
    fn test_stepped_unbounded_is_stride() {
        let counts = RepeatCounts::stepped(1, None, 2).unwrap();
        assert_eq!(
            counts.plan(),
            RepeatPlan::Stride {
                head: 1,
                step: 2,
                blocks: None
            }
        );
        assert!(counts.contains(101));
        assert!(!counts.contains(100));
    }

    #[test]
    fn test_large_finite_progression_stays_one_stride() {
        let counts = RepeatCounts::stepped(0, Some(20_000), 2).unwrap();
        assert_eq!(
            counts.plan(),
            RepeatPlan::Stride {
                head: 0,
                step: 2,
                blocks: Some(10_000)
            }
        );
        let explicit = RepeatCounts::new([3u32, 7, 11]).unwrap();
        assert_eq!(
            explicit.plan(),
            RepeatPlan::Stride {
                head: 3,
                step: 4,
                blocks: Some(2)
            }
        );
    }

    #[test]
    fn test_stepped_rejects_zero_step() {
        assert!(RepeatCounts::stepped(0, Some(4), 0).is_err());
    }

    #[test]
    fn test_irregular_set_with_tail() {
        let counts =
            RepeatCounts::new([Count::Finite(1), 2.into(), 5.into(), Count::Unbounded]).unwrap();
        assert_eq!(
            counts.plan(),
            RepeatPlan::Choice {
                counts: vec![2, 1],
                tail: Some(5)
            }
        );
        assert!(counts.contains(9));
        assert!(!counts.contains(3));
    }
}
