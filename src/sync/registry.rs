//! Read-through cache of the backend gesture registry
//!
//! The cache is only ever replaced wholesale by a fresh list response;
//! mutations go to the backend and are followed by a reload.

use crate::api::{Gesture, GestureAction, NewGesture};

use super::ValidationError;

#[derive(Debug, Default)]
pub struct GestureRegistry {
    gestures: Vec<Gesture>,
    issued: u64,
    applied: u64,
}

impl GestureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gestures(&self) -> &[Gesture] {
        &self.gestures
    }

    pub fn total(&self) -> usize {
        self.gestures.len()
    }

    /// Sequence number for the next list request
    pub fn next_sequence(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Replace the cached list with the response to request `sequence`.
    /// Returns false when a newer list has already been applied.
    pub fn replace(&mut self, sequence: u64, gestures: Vec<Gesture>) -> bool {
        if sequence <= self.applied {
            return false;
        }
        self.applied = sequence;
        self.gestures = gestures;
        true
    }
}

/// Check user input for a new gesture before anything is sent
pub fn validate_new_gesture(
    name: &str,
    action: &str,
    description: &str,
    fingers: Option<u8>,
) -> Result<NewGesture, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }

    let action: GestureAction = action.parse().map_err(ValidationError::UnknownAction)?;

    Ok(NewGesture {
        name: name.to_string(),
        action,
        description: description.trim().to_string(),
        fingers,
    })
}
