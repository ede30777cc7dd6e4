use std::io::{self, Stdout};

use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use ratatui::backend::CrosstermBackend;
use ratatui::{Frame, Terminal};

use crate::error::Result;

/// Alternate screen in raw mode with a hidden cursor, left again on drop.
pub(crate) struct ScreenSession {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    active: bool,
}

impl ScreenSession {
    pub(crate) fn enter() -> Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        let terminal = execute!(stdout, EnterAlternateScreen, cursor::Hide)
            .and_then(|_| Terminal::new(CrosstermBackend::new(stdout)));
        match terminal {
            Ok(terminal) => Ok(Self {
                terminal,
                active: true,
            }),
            Err(err) => {
                let _ = execute!(io::stdout(), LeaveAlternateScreen, cursor::Show);
                let _ = terminal::disable_raw_mode();
                Err(err.into())
            }
        }
    }

    pub(crate) fn draw<F>(&mut self, render: F) -> Result<()>
    where
        F: FnOnce(&mut Frame),
    {
        self.terminal.draw(render)?;
        Ok(())
    }

    pub(crate) fn leave(&mut self) -> Result<()> {
        if std::mem::replace(&mut self.active, false) {
            execute!(
                self.terminal.backend_mut(),
                LeaveAlternateScreen,
                cursor::Show
            )?;
            terminal::disable_raw_mode()?;
        }
        Ok(())
    }
}

impl Drop for ScreenSession {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}
