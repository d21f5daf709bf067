use crate::grid::ScalarField;

/// Append-only sequence of fields, one per recorded instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory {
    frames: Vec<ScalarField>,
}

impl Trajectory {
    /// Starts a trajectory at `initial`.
    pub fn new(initial: ScalarField) -> Self {
        Self { frames: vec![initial] }
    }

    /// Appends the field for the next fine instant.
    pub fn record(&mut self, field: ScalarField) {
        self.frames.push(field);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[ScalarField] {
        &self.frames
    }

    pub fn last(&self) -> Option<&ScalarField> {
        self.frames.last()
    }

    pub fn into_frames(self) -> Vec<ScalarField> {
        self.frames
    }
}
