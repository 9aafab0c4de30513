/// Highlighted row of a list overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub selected_idx: Option<usize>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highlight the first row, or nothing when the list is empty.
    pub fn reset(&mut self, len: usize) {
        self.selected_idx = (len > 0).then_some(0);
    }

    pub fn move_up_wrap(&mut self, len: usize) {
        if len == 0 {
            self.selected_idx = None;
            return;
        }
        self.selected_idx = Some(match self.selected_idx {
            Some(idx) if idx > 0 => idx - 1,
            _ => len - 1,
        });
    }

    pub fn move_down_wrap(&mut self, len: usize) {
        if len == 0 {
            self.selected_idx = None;
            return;
        }
        self.selected_idx = Some(match self.selected_idx {
            Some(idx) if idx + 1 < len => idx + 1,
            _ => 0,
        });
    }
}
