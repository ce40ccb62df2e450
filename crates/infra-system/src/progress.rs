// Progress rendering with indicatif
// Bars draw through the operator's Output instead of stderr, so the bar,
// log lines and prompt share one stream.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle, TermLike};
use migrator_core::port::{Output, ProgressFactory, ProgressReporter};
use std::io;
use std::sync::Arc;
use tracing::warn;

const DEFAULT_WIDTH: u16 = 80;
const BAR_TEMPLATE: &str = "{prefix}: [{bar:40}] {pos}/{len} ({percent}%) [{elapsed_precise}]";
const SPINNER_TEMPLATE: &str = "{prefix}: {spinner} {pos} [{elapsed_precise}]";

/// indicatif terminal backed by an `Output`
#[derive(Debug)]
struct OutputTerm {
    output: Output,
    width: u16,
}

impl TermLike for OutputTerm {
    fn width(&self) -> u16 {
        self.width
    }

    fn move_cursor_up(&self, n: usize) -> io::Result<()> {
        if n > 0 {
            self.output.write_str(&format!("\x1b[{}A", n))?;
        }
        Ok(())
    }

    fn move_cursor_down(&self, n: usize) -> io::Result<()> {
        if n > 0 {
            self.output.write_str(&format!("\x1b[{}B", n))?;
        }
        Ok(())
    }

    fn move_cursor_right(&self, n: usize) -> io::Result<()> {
        if n > 0 {
            self.output.write_str(&format!("\x1b[{}C", n))?;
        }
        Ok(())
    }

    fn move_cursor_left(&self, n: usize) -> io::Result<()> {
        if n > 0 {
            self.output.write_str(&format!("\x1b[{}D", n))?;
        }
        Ok(())
    }

    fn write_line(&self, s: &str) -> io::Result<()> {
        self.output.write_line(s)
    }

    fn write_str(&self, s: &str) -> io::Result<()> {
        self.output.write_str(s)
    }

    fn clear_line(&self) -> io::Result<()> {
        self.output.write_str("\r\x1b[2K")
    }

    fn flush(&self) -> io::Result<()> {
        self.output.flush()
    }
}

/// Creates indicatif bars (known total) or spinners (unknown total)
#[derive(Debug, Clone)]
pub struct IndicatifProgressFactory {
    width: u16,
}

impl Default for IndicatifProgressFactory {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
        }
    }
}

impl IndicatifProgressFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressFactory for IndicatifProgressFactory {
    fn create(
        &self,
        title: &str,
        total: Option<u64>,
        output: &Output,
    ) -> Arc<dyn ProgressReporter> {
        let target = ProgressDrawTarget::term_like(Box::new(OutputTerm {
            output: output.clone(),
            width: self.width,
        }));

        let bar = match total {
            Some(total) => ProgressBar::with_draw_target(Some(total), target)
                .with_style(style(BAR_TEMPLATE, ProgressStyle::default_bar)),
            None => ProgressBar::with_draw_target(None, target)
                .with_style(style(SPINNER_TEMPLATE, ProgressStyle::default_spinner)),
        };
        bar.set_prefix(title.to_string());
        bar.tick();

        Arc::new(IndicatifProgress {
            bar,
            output: output.clone(),
        })
    }
}

fn style(template: &str, fallback: fn() -> ProgressStyle) -> ProgressStyle {
    match ProgressStyle::with_template(template) {
        Ok(style) => style.progress_chars("=> "),
        Err(e) => {
            warn!(error = %e, template, "Invalid progress template, using default style");
            fallback()
        }
    }
}

struct IndicatifProgress {
    bar: ProgressBar,
    output: Output,
}

impl ProgressReporter for IndicatifProgress {
    fn increment(&self) {
        self.bar.inc(1);
    }

    fn log(&self, message: &str) {
        // Clear the bar, print above it, redraw
        self.bar.suspend(|| {
            if let Err(e) = self.output.write_line(message) {
                warn!(error = %e, "Failed to write log line");
            }
        });
    }

    fn is_finished(&self) -> bool {
        self.bar.is_finished()
    }

    fn finish(&self) {
        self.bar.finish();
        if let Err(e) = self.output.write_line("") {
            warn!(error = %e, "Failed to terminate progress line");
        }
    }
}
