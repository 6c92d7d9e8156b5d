/// Coarse failure category a transport layer maps onto its status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Unknown version, or an operation forbidden on the named version.
    NotFound,
    /// The model for a version cannot be loaded.
    Unavailable,
    /// The caller supplied features or labels outside the accepted ranges.
    Invalid,
    Internal,
}

impl ErrorClass {
    pub fn status_code(self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::Unavailable => 503,
            Self::Invalid => 422,
            Self::Internal => 500,
        }
    }
}
