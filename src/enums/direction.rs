/// Orientation of a traded pair relative to the hop that uses it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// The pair is quoted FROM-TO, the hop sells base at the bid
    Forward,
    /// The pair is quoted TO-FROM, the hop buys base at the ask
    Inverse,
}

impl Direction {
    /// Short tag used in path descriptions
    #[inline]
    pub fn tag(&self) -> &'static str {
        match self {
            Direction::Forward => "num",
            Direction::Inverse => "den",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}
