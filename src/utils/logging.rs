use std::fmt::Display;

use tracing::span::Span;

pub trait LogError {
    fn log_error<E: Display>(&self, error: E);
}

impl LogError for Span {
    fn log_error<E: Display>(&self, error: E) {
        self.in_scope(|| {
            tracing::error!("Error: {error}");
        });
    }
}
