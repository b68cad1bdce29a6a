use tracing::warn;

use super::CommandError;
use crate::transport::Command;

/// Numeric parameter; missing, unparsable or non-finite values fall back to
/// `0.0`. Only `.` is accepted as the decimal separator.
pub fn number_or_zero(command: &Command, name: &str) -> f64 {
    optional_number(command, name).unwrap_or_else(|| {
        warn!(task_id = %command.task_id, param = name, "missing numeric parameter, using 0");
        0.0
    })
}

/// Numeric parameter if present. Present but unparsable values are logged
/// and read as `0.0`.
pub fn optional_number(command: &Command, name: &str) -> Option<f64> {
    let raw = command.param(name)?;
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            warn!(task_id = %command.task_id, param = name, value = raw, "unparsable numeric parameter, using 0");
            Some(0.0)
        }
    }
}

pub fn required<'a>(command: &'a Command, name: &'static str) -> Result<&'a str, CommandError> {
    command
        .param(name)
        .ok_or(CommandError::MissingParameter(name))
}
