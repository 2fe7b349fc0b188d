use thiserror::Error;

/// Input rejected before any store call was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Task name cannot be empty.")]
    EmptyName,
}

pub fn validate_task_name(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        Err(ValidationError::EmptyName)
    } else {
        Ok(())
    }
}
