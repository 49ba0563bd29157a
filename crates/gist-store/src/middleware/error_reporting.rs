//! Final stage: log domain errors.

use tracing::error;

use super::{Context, Middleware, Next};
use crate::Action;

/// Logs `ReportError` actions at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorReporting;

impl Middleware for ErrorReporting {
    fn process(&self, ctx: &mut Context<'_>, action: Action, next: Next<'_>) {
        if let Action::ReportError(message) = &action {
            error!(error = %message, "in-app messaging error");
        }
        next.run(ctx, action);
    }
}
