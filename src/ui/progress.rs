use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use ratatui::{prelude::*, widgets::*};

use crate::acquire::{
    update_channel, AcquisitionProgress, BoundedRetryAcquirer, RunOutcome, RunTracker,
    UpdateReceiver,
};
use crate::error::Result;
use crate::fetch::RecordSource;
use crate::records::StreamerRecord;

use super::terminal::ScreenSession;

const PANEL_WIDTH: u16 = 56;
const PANEL_HEIGHT: u16 = 7;

/// What the screen shows for the run being watched.
#[derive(Default)]
struct ScreenState {
    tracker: RunTracker,
    progress: AcquisitionProgress,
    loaded: Arc<Vec<StreamerRecord>>,
}

impl ScreenState {
    /// Take every queued update. Keeps the last live counters once the run
    /// resets them, so the final frame still reads "N / N".
    fn absorb(&mut self, rx: &mut UpdateReceiver) {
        while let Ok(update) = rx.try_recv() {
            let Some(update) = self.tracker.accept(update) else {
                continue;
            };
            if !update.progress.is_idle() {
                self.progress = update.progress;
            }
            self.loaded = update.records;
        }
    }
}

/// Run one acquisition while drawing its progress. Esc or Ctrl-C aborts the run.
pub async fn run_acquisition_progress<S: RecordSource + 'static>(
    acquirer: &Arc<BoundedRetryAcquirer<S>>,
    candidates: Vec<String>,
) -> Result<RunOutcome> {
    let max_rounds = acquirer.policy().max_retry_rounds;
    let (tx, mut rx) = update_channel();
    let handle = Arc::clone(acquirer).spawn_run(candidates, tx);

    let mut state = ScreenState::default();
    state.tracker.begin(handle.run());
    let mut screen = ScreenSession::enter()?;

    loop {
        // checked before draining: a finished run has sent everything it will send
        let finished = handle.is_finished();
        state.absorb(&mut rx);
        screen.draw(|f| draw_progress(f, &state.progress, &state.loaded, max_rounds))?;

        if finished {
            break;
        }

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if matches!(key.code, KeyCode::Esc)
                    || (key.code == KeyCode::Char('c')
                        && key.modifiers.contains(KeyModifiers::CONTROL))
                {
                    handle.abort();
                    break;
                }
            }
        }

        tokio::time::sleep(Duration::from_millis(120)).await;
    }

    screen.leave()?;
    handle.join().await
}

fn draw_progress(
    f: &mut Frame,
    progress: &AcquisitionProgress,
    loaded: &[StreamerRecord],
    max_rounds: u32,
) {
    let area = panel_area(f.size());
    f.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Loading channels...");
    f.render_widget(block.clone(), area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(block.inner(area));

    let label = format!(
        "Loaded {} / {} ({:.0}%)",
        progress.succeeded,
        progress.total_planned,
        progress.ratio() * 100.0
    );
    f.render_widget(
        Paragraph::new(label).alignment(Alignment::Center),
        chunks[0],
    );
    f.render_widget(
        Gauge::default()
            .gauge_style(Style::default().fg(Color::Green))
            .ratio(progress.ratio()),
        chunks[1],
    );

    if progress.failed_pending > 0 || progress.abandoned > 0 {
        let status = if progress.round > 0 {
            format!(
                "{} failed, retrying {} (round {}/{})",
                progress.failed_pending, progress.retrying_now, progress.round, max_rounds
            )
        } else {
            format!("{} failed, will retry", progress.failed_pending)
        };
        f.render_widget(
            Paragraph::new(status)
                .style(Style::default().fg(Color::Yellow))
                .alignment(Alignment::Center),
            chunks[2],
        );
    }

    if let Some(latest) = loaded.last() {
        f.render_widget(
            Paragraph::new(format!("Latest: {}", latest.label())).alignment(Alignment::Center),
            chunks[3],
        );
    }

    f.render_widget(
        Paragraph::new("Esc to cancel")
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center),
        chunks[4],
    );
}

fn panel_area(screen: Rect) -> Rect {
    let width = PANEL_WIDTH.min(screen.width);
    let height = PANEL_HEIGHT.min(screen.height);
    Rect::new(
        screen.x + (screen.width - width) / 2,
        screen.y + (screen.height - height) / 2,
        width,
        height,
    )
}
