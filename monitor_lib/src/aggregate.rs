//! Reduction and rendering of check results

use axum::http::StatusCode;

use crate::check::CheckResult;

/// One `<name> <value>\n` line per result, in the order given.
pub fn render(results: &[CheckResult]) -> String {
    results.iter().fold(String::new(), |mut body, result| {
        body.push_str(&result.name);
        body.push(' ');
        body.push_str(&result.value().to_string());
        body.push('\n');
        body
    })
}

/// 200 when every result is ok, 500 when any is not. Severity does not
/// matter: a warning fails liveness as much as a critical.
pub fn liveness_status(results: &[CheckResult]) -> StatusCode {
    if results.iter().all(|result| result.status.is_ok()) {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}
