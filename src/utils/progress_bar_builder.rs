use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub(crate) struct ProgressBarBuilder {
    style_template: &'static str,
    message: String,
    length: Option<u64>,
    enable_tick: bool,
}

impl ProgressBarBuilder {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            style_template: "{spinner:.green} {msg}",
            message: message.into(),
            length: None,
            enable_tick: false,
        }
    }

    pub(crate) fn with_template(mut self, template: &'static str) -> Self {
        self.style_template = template;
        self
    }

    /// Switches from a spinner to a bar of `length` steps.
    pub(crate) fn with_progress_bar(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }

    pub(crate) fn with_tick(mut self) -> Self {
        self.enable_tick = true;
        self
    }

    pub(crate) fn build(self) -> Result<ProgressBar> {
        let (pb, style) = match self.length {
            Some(len) => (
                ProgressBar::new(len),
                ProgressStyle::default_bar()
                    .template(self.style_template)?
                    .progress_chars("#>-"),
            ),
            None => (
                ProgressBar::new_spinner(),
                ProgressStyle::default_spinner().template(self.style_template)?,
            ),
        };

        pb.set_style(style);
        pb.set_message(self.message);

        if self.enable_tick {
            pb.enable_steady_tick(Duration::from_millis(120));
        }

        Ok(pb)
    }
}
