use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum RedBlackTreeError {
    #[error("Cannot store an absent value")]
    NullValue = 0,
    #[error("Tree already contains that value")]
    DuplicateValue = 1,
    #[error("Child and parent are not directly related")]
    InvalidRotation = 2,
    #[error("Node arena cannot address another node")]
    ArenaFull = 3,
}

impl From<RedBlackTreeError> for u32 {
    fn from(e: RedBlackTreeError) -> Self {
        e as u32
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(u32::from(RedBlackTreeError::NullValue), 0);
        assert_eq!(u32::from(RedBlackTreeError::DuplicateValue), 1);
        assert_eq!(u32::from(RedBlackTreeError::InvalidRotation), 2);
        assert_eq!(u32::from(RedBlackTreeError::ArenaFull), 3);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            RedBlackTreeError::DuplicateValue.to_string(),
            "Tree already contains that value"
        );
    }
}
