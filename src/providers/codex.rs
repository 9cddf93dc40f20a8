use crate::config::ResumeConfig;
use crate::providers::ResumePlan;

/// Build the `codex resume <id>` invocation for a selected session.
///
/// Configured arguments come first, then anything passed after `--` on the
/// command line. `bin_override` wins over the configured binary.
#[must_use]
pub fn resume_plan(
    session_id: &str,
    config: &ResumeConfig,
    bin_override: Option<&str>,
    extra_args: &[String],
) -> ResumePlan {
    let mut args = Vec::with_capacity(2 + config.args.len() + extra_args.len());
    args.push("resume".to_string());
    args.push(session_id.to_string());
    args.extend(config.args.iter().cloned());
    args.extend(extra_args.iter().cloned());

    ResumePlan {
        program: bin_override.unwrap_or(&config.bin).to_string(),
        args,
    }
}
