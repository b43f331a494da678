use crate::{
    types::{error::Result, pipewire::Target},
    utils::{
        command::{Mode, build_list_targets_command},
        runner::Runner,
    },
};
use tracing::debug;

pub async fn list_targets(runner: &dyn Runner, program: &str, mode: Mode) -> Result<Vec<Target>> {
    let command = build_list_targets_command(program, mode);
    let output = runner.run(&command).await?.into_result()?;
    Ok(parse_targets(&output.stdout))
}

/// Parses lines like `*\t63: description="Analog Stereo" prio=1009`.
/// Lines that do not start with a numeric id (the banner, for one) are
/// ignored.
pub fn parse_targets(output: &str) -> Vec<Target> {
    output.lines().filter_map(parse_target_line).collect()
}

fn parse_target_line(line: &str) -> Option<Target> {
    let line = line.trim();
    let (is_default, line) = match line.strip_prefix('*') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, line),
    };

    let (id, rest) = line.split_once(':')?;
    let Ok(id) = id.trim().parse::<u32>() else {
        debug!("Ignoring target line: {:?}", line);
        return None;
    };

    let description = rest
        .split_once("description=\"")
        .and_then(|(_, tail)| tail.split_once('"'))
        .map(|(description, _)| description.to_string())
        .unwrap_or_default();

    let priority = rest
        .split_once("prio=")
        .and_then(|(_, tail)| tail.split_whitespace().next())
        .and_then(|prio| prio.parse::<i32>().ok());

    Some(Target {
        id,
        description,
        priority,
        is_default,
    })
}
