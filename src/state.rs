use std::fmt;

/// HolderState: the two states every holder moves between
///
/// `Empty -> Owning` on construction with a resource or on assignment from a
/// non-empty source; `Owning -> Empty` on dispose, on the last decrement, or
/// when ownership is moved out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HolderState {
    Empty,
    Owning,
}

impl HolderState {
    pub fn from_present(present: bool) -> Self {
        if present {
            HolderState::Owning
        } else {
            HolderState::Empty
        }
    }

    pub fn status_string(&self) -> &'static str {
        match self {
            HolderState::Empty => "Empty",
            HolderState::Owning => "Owning",
        }
    }
}

impl fmt::Display for HolderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status_string())
    }
}
