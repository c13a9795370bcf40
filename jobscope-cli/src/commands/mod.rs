pub mod ls;
pub mod purge;
pub mod sweep;

use jobscope::ExecutionId;

/// Parse every id, reporting the bad ones on stderr.
pub(crate) fn parse_ids(raw: &[String]) -> (Vec<ExecutionId>, Vec<String>) {
    let mut ids = Vec::new();
    let mut errors = Vec::new();
    for value in raw {
        match value.parse::<ExecutionId>() {
            Ok(id) => ids.push(id),
            Err(e) => {
                eprintln!("Error: {}", e);
                errors.push(format!("{}: {}", value, e));
            }
        }
    }
    (ids, errors)
}
