use std::fmt;

pub type Rank = u32;
pub type Tick = u64;
pub type Tag = i32;

/// The source a receive asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Source {
    Rank(Rank),
    /// Wildcard receive, satisfied by a message from any process
    Any,
}

impl Source {
    /// Whether a message from `rank` could satisfy a receive posted for this source
    pub fn admits(&self, rank: Rank) -> bool {
        match self {
            Source::Rank(expected) => *expected == rank,
            Source::Any => true,
        }
    }

    /// Whether this source names exactly `rank`, wildcards excluded
    pub fn is_exactly(&self, rank: Rank) -> bool {
        *self == Source::Rank(rank)
    }
}

impl From<Rank> for Source {
    fn from(rank: Rank) -> Self {
        Source::Rank(rank)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Rank(rank) => write!(f, "{}", rank),
            Source::Any => write!(f, "*"),
        }
    }
}

/// The tag a receive asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TagFilter {
    Exact(Tag),
    Any,
}

impl TagFilter {
    pub fn admits(&self, tag: Tag) -> bool {
        match self {
            TagFilter::Exact(expected) => *expected == tag,
            TagFilter::Any => true,
        }
    }
}

impl From<Tag> for TagFilter {
    fn from(tag: Tag) -> Self {
        TagFilter::Exact(tag)
    }
}
