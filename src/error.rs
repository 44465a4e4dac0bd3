use thiserror::Error;

/// HolderError: contract violations reported by the ownership holders
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HolderError {
    #[error("null dereference: {holder} holder is empty")]
    NullDereference { holder: &'static str },

    #[error("double release: reference count of {holder} holder is already zero")]
    DoubleRelease { holder: &'static str },

    #[error("resource is shared by {count} holders, mutable access needs a sole owner")]
    Aliased { count: usize },
}

impl HolderError {
    pub fn null_dereference(holder: &'static str) -> Self {
        Self::NullDereference { holder }
    }

    pub fn double_release(holder: &'static str) -> Self {
        Self::DoubleRelease { holder }
    }
}
