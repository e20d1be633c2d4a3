use std::fmt;

const LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Calendar month, always within 1..=12.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month(u8);

impl Month {
    pub const JANUARY: Month = Month(1);
    pub const FEBRUARY: Month = Month(2);
    pub const MARCH: Month = Month(3);
    pub const APRIL: Month = Month(4);
    pub const MAY: Month = Month(5);
    pub const JUNE: Month = Month(6);
    pub const JULY: Month = Month(7);
    pub const AUGUST: Month = Month(8);
    pub const SEPTEMBER: Month = Month(9);
    pub const OCTOBER: Month = Month(10);
    pub const NOVEMBER: Month = Month(11);
    pub const DECEMBER: Month = Month(12);

    pub fn new(number: u32) -> Option<Self> {
        (1..=12).contains(&number).then(|| Self(number as u8))
    }

    pub fn number(self) -> u8 {
        self.0
    }

    /// Zero-based position, for indexing per-month arrays.
    pub fn index(self) -> usize {
        usize::from(self.0 - 1)
    }

    pub fn label(self) -> &'static str {
        LABELS[self.index()]
    }

    /// Moves by `delta` months, clamped to the year.
    pub fn offset(self, delta: i32) -> Self {
        let n = (i32::from(self.0) + delta).clamp(1, 12);
        Self(n as u8)
    }

    /// Inclusive range `self..=end`; empty when `end` precedes `self`.
    pub fn through(self, end: Month) -> impl Iterator<Item = Month> {
        (self.0..=end.0).map(Month)
    }

    pub fn all() -> impl Iterator<Item = Month> {
        Self::JANUARY.through(Self::DECEMBER)
    }
}

impl Default for Month {
    fn default() -> Self {
        Self::JANUARY
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
