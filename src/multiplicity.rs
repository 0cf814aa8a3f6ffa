use std::{fmt, slice, str::FromStr};

use crate::error::ParseError;

/// An accepted repetition count range, `max == None` meaning unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountRange {
    pub min: usize,
    pub max: Option<usize>,
}

impl CountRange {
    pub const fn new(min: usize, max: Option<usize>) -> Self {
        Self { min, max }
    }

    pub const fn exactly(n: usize) -> Self {
        Self::new(n, Some(n))
    }

    pub fn contains(&self, n: usize) -> bool {
        n >= self.min && self.max.map_or(true, |max| n <= max)
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        let below = |a: &Self, b: &Self| a.max.map_or(true, |max| b.min <= max);
        below(self, other) && below(other, self)
    }

    fn validate(self) -> Result<Self, ParseError> {
        if self.min == 0 {
            return Err(ParseError::Multiplicity(format!("{self}: counts start at 1")));
        }
        if matches!(self.max, Some(max) if max < self.min) {
            return Err(ParseError::Multiplicity(format!("{self}: min > max")));
        }
        Ok(self)
    }
}

impl fmt::Display for CountRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{}", self.min),
            Some(max) => write!(f, "{}-{}", self.min, max),
            None => write!(f, "{}+", self.min),
        }
    }
}

impl FromStr for CountRange {
    type Err = ParseError;

    /// `"3"` exactly 3, `"1-3"` between 1 and 3, `"4+"` 4 or more, `"5-"` 1 to 5
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let num = |t: &str| {
            t.trim()
                .parse::<usize>()
                .map_err(|_| ParseError::Multiplicity(format!("'{s}' is not a count")))
        };
        let range = if let Some(min) = s.strip_suffix('+') {
            Self::new(num(min)?, None)
        } else if let Some(max) = s.strip_suffix('-') {
            Self::new(1, Some(num(max)?))
        } else if let Some((min, max)) = s.split_once('-') {
            Self::new(num(min)?, Some(num(max)?))
        } else {
            Self::exactly(num(s)?)
        };
        range.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Counts {
    Listed(Vec<CountRange>),
    // start, start + step, start + 2 * step, ...
    Every { start: usize, step: usize },
}

/// The counts a repetition accepts: a sorted list of non-overlapping ranges,
/// or an unbounded arithmetic progression that is only ever walked lazily.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Multiplicity {
    counts: Counts,
    zero: bool,
}

impl Multiplicity {
    pub fn from_ranges<I>(ranges: I) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = CountRange>,
    {
        let mut ranges = ranges
            .into_iter()
            .map(CountRange::validate)
            .collect::<Result<Vec<_>, _>>()?;
        if ranges.is_empty() {
            return Err(ParseError::Multiplicity("no count ranges given".into()));
        }
        ranges.sort_by_key(|r| r.min);
        for (i, a) in ranges.iter().enumerate() {
            for b in &ranges[i + 1..] {
                if a.overlaps(b) {
                    return Err(ParseError::Multiplicity(format!(
                        "overlapping multiplicities {a} and {b}"
                    )));
                }
            }
        }
        Ok(Self {
            counts: Counts::Listed(ranges),
            zero: false,
        })
    }

    pub fn exactly(n: usize) -> Result<Self, ParseError> {
        Self::from_ranges([CountRange::exactly(n)])
    }

    pub fn between(min: usize, max: usize) -> Result<Self, ParseError> {
        Self::from_ranges([CountRange::new(min, Some(max))])
    }

    pub fn at_least(min: usize) -> Result<Self, ParseError> {
        Self::from_ranges([CountRange::new(min, None)])
    }

    /// 1 to `max`
    pub fn at_most(max: usize) -> Result<Self, ParseError> {
        Self::from_ranges([CountRange::new(1, Some(max))])
    }

    /// exact counts `start`, `start + step`, ... without end
    pub fn every(start: usize, step: usize) -> Result<Self, ParseError> {
        if start == 0 || step == 0 {
            return Err(ParseError::Multiplicity(format!(
                "progression {start}+{step}n: start and step must be positive"
            )));
        }
        Ok(Self {
            counts: Counts::Every { start, step },
            zero: false,
        })
    }

    /// 0 or 1
    pub fn optional() -> Self {
        Self::preset(CountRange::exactly(1))
    }

    pub fn zero_or_more() -> Self {
        Self::preset(CountRange::new(1, None))
    }

    pub fn one_or_more() -> Self {
        Self {
            zero: false,
            ..Self::zero_or_more()
        }
    }

    pub fn two_or_more() -> Self {
        Self {
            counts: Counts::Listed(vec![CountRange::new(2, None)]),
            zero: false,
        }
    }

    fn preset(range: CountRange) -> Self {
        Self {
            counts: Counts::Listed(vec![range]),
            zero: true,
        }
    }

    pub fn accepts_zero(&self) -> bool {
        self.zero
    }

    /// The accepted ranges in ascending order. Unbounded for progressions.
    pub fn ranges(&self) -> Ranges<'_> {
        match &self.counts {
            Counts::Listed(v) => Ranges::Listed(v.iter()),
            Counts::Every { start, step } => Ranges::Every {
                next: *start,
                step: *step,
            },
        }
    }

    pub fn accepts(&self, n: usize) -> bool {
        if n == 0 {
            return self.zero;
        }
        self.ranges()
            .take_while(|r| r.min <= n)
            .any(|r| r.contains(n))
    }

    pub fn lower_bound(&self) -> usize {
        if self.zero {
            return 0;
        }
        self.ranges().next().map_or(0, |r| r.min)
    }

    /// largest accepted count, `None` when unbounded
    pub fn upper_bound(&self) -> Option<usize> {
        match &self.counts {
            Counts::Listed(v) => v.last().and_then(|r| r.max),
            Counts::Every { .. } => None,
        }
    }
}

impl FromStr for Multiplicity {
    type Err = ParseError;

    /// comma separated list of [`CountRange`]s, e.g. `"1,3-4,7+"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ranges = s
            .split(',')
            .map(str::parse)
            .collect::<Result<Vec<CountRange>, _>>()?;
        Self::from_ranges(ranges)
    }
}

impl TryFrom<usize> for Multiplicity {
    type Error = ParseError;

    fn try_from(n: usize) -> Result<Self, Self::Error> {
        Self::exactly(n)
    }
}

impl TryFrom<(usize, usize)> for Multiplicity {
    type Error = ParseError;

    fn try_from((min, max): (usize, usize)) -> Result<Self, Self::Error> {
        Self::between(min, max)
    }
}

impl TryFrom<&str> for Multiplicity {
    type Error = ParseError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.zero {
            write!(f, "0,")?;
        }
        match &self.counts {
            Counts::Listed(v) => {
                let parts: Vec<String> = v.iter().map(|r| r.to_string()).collect();
                write!(f, "{}", parts.join(","))
            }
            Counts::Every { start, step } => write!(f, "{start}+{step}n"),
        }
    }
}

pub enum Ranges<'a> {
    Listed(slice::Iter<'a, CountRange>),
    Every { next: usize, step: usize },
}

impl<'a> Iterator for Ranges<'a> {
    type Item = CountRange;

    fn next(&mut self) -> Option<CountRange> {
        match self {
            Self::Listed(it) => it.next().copied(),
            Self::Every { next, step } => {
                let n = *next;
                *next = n.checked_add(*step)?;
                Some(CountRange::exactly(n))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_parse() -> Result<(), ParseError> {
        let m: Multiplicity = "2-3".parse()?;
        assert_eq!(m.ranges().collect::<Vec<_>>(), vec![CountRange::new(2, Some(3))]);
        assert_eq!(m.upper_bound(), Some(3));
        assert_eq!(m.lower_bound(), 2);

        let m: Multiplicity = "7+, 1, 3-4".parse()?;
        assert_eq!(
            m.ranges().collect::<Vec<_>>(),
            vec![
                CountRange::exactly(1),
                CountRange::new(3, Some(4)),
                CountRange::new(7, None)
            ]
        );
        assert_eq!(m.upper_bound(), None);
        assert_eq!(m.to_string(), "1,3-4,7+");

        let m: Multiplicity = "5-".parse()?;
        assert_eq!(m.ranges().next(), Some(CountRange::new(1, Some(5))));
        Ok(())
    }

    #[test]
    fn test_invalid() {
        assert!("0".parse::<Multiplicity>().is_err());
        assert!("0-2".parse::<Multiplicity>().is_err());
        assert!("3-2".parse::<Multiplicity>().is_err());
        assert!("1-3,3-4".parse::<Multiplicity>().is_err());
        assert!("2+,5".parse::<Multiplicity>().is_err());
        assert!("x".parse::<Multiplicity>().is_err());
        assert!("".parse::<Multiplicity>().is_err());
        assert!(Multiplicity::every(0, 2).is_err());
        assert!(Multiplicity::try_from((4, 1)).is_err());
    }

    #[test]
    fn test_accepts() -> Result<(), ParseError> {
        let m = Multiplicity::from_ranges([CountRange::exactly(1), CountRange::new(4, Some(5))])?;
        let accepted: Vec<usize> = (0..8).filter(|&n| m.accepts(n)).collect();
        assert_eq!(accepted, vec![1, 4, 5]);

        assert!(Multiplicity::optional().accepts(0));
        assert!(Multiplicity::optional().accepts(1));
        assert!(!Multiplicity::optional().accepts(2));
        assert!(Multiplicity::zero_or_more().accepts(0));
        assert!(Multiplicity::zero_or_more().accepts(1000));
        assert!(!Multiplicity::one_or_more().accepts(0));
        assert!(!Multiplicity::two_or_more().accepts(1));
        Ok(())
    }

    #[test]
    fn test_progression() -> Result<(), ParseError> {
        let odd = Multiplicity::every(1, 2)?;
        assert_eq!(
            odd.ranges().take(3).collect::<Vec<_>>(),
            vec![CountRange::exactly(1), CountRange::exactly(3), CountRange::exactly(5)]
        );
        assert!(odd.accepts(99));
        assert!(!odd.accepts(100));
        assert_eq!(odd.upper_bound(), None);
        assert_eq!(odd.to_string(), "1+2n");
        Ok(())
    }
}
