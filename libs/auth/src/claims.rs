use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Session id the token is scoped to, `*` for any
    pub id: String,
    pub exp: u64,
    pub mode: Mode,
}

impl Display for Claims {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "id: {}, expire: {}, mode: {}",
            self.id,
            self.exp,
            Access::from(self.mode)
        )
    }
}

/// Look like Linux File-system permissions
/// 4: read, allow watching a live session
/// 2: write, allow pushing media to a session's ingest endpoint
/// 1: execute, allow operating sessions and the archive
pub type Mode = u8;

pub const MODE_ALL: Mode = 7;

impl From<Mode> for Access {
    fn from(mask: Mode) -> Access {
        Access {
            r: mask & 4 != 0,
            w: mask & 2 != 0,
            x: mask & 1 != 0,
        }
    }
}

impl From<Access> for Mode {
    fn from(access: Access) -> Mode {
        let mut mode = 0;
        if access.r {
            mode |= 4;
        }
        if access.w {
            mode |= 2;
        }
        if access.x {
            mode |= 1;
        }
        mode
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Access {
    pub r: bool,
    pub w: bool,
    pub x: bool,
}

impl Access {
    pub fn publish() -> Self {
        Self {
            r: false,
            w: true,
            x: false,
        }
    }
}

impl Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}{}",
            if self.r { "r" } else { "-" },
            if self.w { "w" } else { "-" },
            if self.x { "x" } else { "-" },
        )
    }
}
