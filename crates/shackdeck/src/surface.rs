use std::sync::{Mutex, MutexGuard, PoisonError};

use shackdeck_deck::{ButtonFace, ButtonSurface, DeckError};

/// A [`ButtonSurface`] rendered into the terminal.
///
/// Pages draw into an in-memory grid; the render loop picks it up whenever
/// the grid has changed since the last frame.
pub struct TerminalSurface {
    grid: Mutex<Grid>,
}

struct Grid {
    faces: Vec<Option<ButtonFace>>,
    dirty: bool,
}

impl TerminalSurface {
    pub fn new(buttons: usize) -> Self {
        Self {
            grid: Mutex::new(Grid {
                faces: vec![None; buttons],
                dirty: true,
            }),
        }
    }

    fn grid(&self) -> MutexGuard<'_, Grid> {
        self.grid.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current faces if anything changed since the previous call.
    pub fn take_frame(&self) -> Option<Vec<Option<ButtonFace>>> {
        let mut grid = self.grid();
        if !grid.dirty {
            return None;
        }
        grid.dirty = false;
        Some(grid.faces.clone())
    }

    pub fn snapshot(&self) -> Vec<Option<ButtonFace>> {
        self.grid().faces.clone()
    }

    /// Force a full redraw on the next frame.
    pub fn invalidate(&self) {
        self.grid().dirty = true;
    }
}

impl ButtonSurface for TerminalSurface {
    fn button_count(&self) -> usize {
        self.grid().faces.len()
    }

    fn draw(&self, position: usize, face: &ButtonFace) -> Result<(), DeckError> {
        let mut grid = self.grid();
        let buttons = grid.faces.len();
        let slot = grid
            .faces
            .get_mut(position)
            .ok_or_else(|| DeckError::Surface {
                message: format!("no button {position} on a surface of {buttons}"),
            })?;
        *slot = Some(face.clone());
        grid.dirty = true;
        Ok(())
    }

    fn clear_all(&self) -> Result<(), DeckError> {
        let mut grid = self.grid();
        grid.faces.iter_mut().for_each(|f| *f = None);
        grid.dirty = true;
        Ok(())
    }
}
