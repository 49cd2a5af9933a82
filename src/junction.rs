use std::fmt;
use std::str::FromStr;

use crate::errors::Error;

/// Side of the junction position that belongs to the rearranged sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    /// Bases at or after the junction position are past the breakpoint.
    Forward,
    /// Bases at or before the junction position are past the breakpoint.
    Reverse,
}

impl Orientation {
    pub fn opposite(self) -> Self {
        match self {
            Orientation::Forward => Orientation::Reverse,
            Orientation::Reverse => Orientation::Forward,
        }
    }
}

impl FromStr for Orientation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" | "F" | "f" | "forward" => Ok(Orientation::Forward),
            "-" | "R" | "r" | "reverse" => Ok(Orientation::Reverse),
            _ => Err(Error::InvalidOrientation {
                value: s.to_owned(),
            }),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Orientation::Forward => write!(f, "+"),
            Orientation::Reverse => write!(f, "-"),
        }
    }
}

/// A candidate breakpoint on one contig.
#[derive(new, Debug, Clone, PartialEq, Eq, Hash, Getters, CopyGetters, Serialize, Deserialize)]
pub struct Junction {
    #[getset(get = "pub")]
    contig: String,
    /// 0-based reference position.
    #[getset(get_copy = "pub")]
    position: i64,
    #[getset(get_copy = "pub")]
    orientation: Orientation,
}

impl fmt::Display for Junction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}{}", self.contig, self.position, self.orientation)
    }
}
