use crate::{
    types::{
        error::Result,
        pipewire::{Channel, Direction, Link, LinkStatus, Port},
        process::{CommandLine, CommandOutput},
    },
    utils::runner::Runner,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lists ports and links through `pw-link` and wires them together.
///
/// Nothing about the graph is cached: every call asks pw-link again, and a
/// connection only exists in PipeWire itself.
#[derive(Clone)]
pub struct LinkManager {
    runner: Arc<dyn Runner>,
    program: String,
}

impl LinkManager {
    pub fn new(runner: Arc<dyn Runner>, program: impl Into<String>) -> Self {
        LinkManager {
            runner,
            program: program.into(),
        }
    }

    pub async fn list_outputs(&self) -> Result<Vec<Port>> {
        self.list_ports(Direction::Output).await
    }

    pub async fn list_inputs(&self) -> Result<Vec<Port>> {
        self.list_ports(Direction::Input).await
    }

    async fn list_ports(&self, direction: Direction) -> Result<Vec<Port>> {
        let flag = match direction {
            Direction::Output => "--output",
            Direction::Input => "--input",
        };
        let command = CommandLine::new(&self.program).args([flag, "--id"]);
        let output = self.runner.run(&command).await?.into_result()?;

        Ok(parse_ports(&output.stdout, direction))
    }

    pub async fn list_links(&self) -> Result<Vec<Link>> {
        let command = CommandLine::new(&self.program).arg("--links");
        let output = self.runner.run(&command).await?.into_result()?;

        Ok(parse_links(&output.stdout))
    }

    /// Links every channel of `a` to the matching channel of `b`. Argument
    /// order does not matter.
    ///
    /// Stereo ports are wired left to left and right to right, a port with a
    /// single channel is fanned out to every channel of the other, anything
    /// else is paired in listing order.
    pub async fn connect(&self, a: &Port, b: &Port) -> Result<LinkStatus> {
        let mut statuses = Vec::new();
        for (x, y) in channel_pairs(a, b) {
            statuses.push(self.connect_channels(x, y).await?);
        }

        Ok(combine(
            &statuses,
            LinkStatus::Connected,
            LinkStatus::AlreadyConnected,
        ))
    }

    pub async fn disconnect(&self, a: &Port, b: &Port) -> Result<LinkStatus> {
        let mut statuses = Vec::new();
        for (x, y) in channel_pairs(a, b) {
            statuses.push(self.disconnect_channels(x, y).await?);
        }

        Ok(combine(
            &statuses,
            LinkStatus::Disconnected,
            LinkStatus::NotConnected,
        ))
    }

    pub async fn connect_channels(&self, a: &Channel, b: &Channel) -> Result<LinkStatus> {
        let (output, input) = output_first(a, b);
        let command = CommandLine::new(&self.program)
            .args([output.qualified_name(), input.qualified_name()]);

        let result = self.runner.run(&command).await?;
        if result.success() {
            info!(
                "Linked {} -> {}",
                output.qualified_name(),
                input.qualified_name()
            );
            return Ok(LinkStatus::Connected);
        }

        if reports_existing_link(&result) {
            debug!(
                "{} -> {} is already linked",
                output.qualified_name(),
                input.qualified_name()
            );
            return Ok(LinkStatus::AlreadyConnected);
        }

        Err(result.into_error())
    }

    pub async fn disconnect_channels(&self, a: &Channel, b: &Channel) -> Result<LinkStatus> {
        let (output, input) = output_first(a, b);
        self.unlink(&output.qualified_name(), &input.qualified_name())
            .await
    }

    /// Removes a link as reported by [`LinkManager::list_links`].
    pub async fn disconnect_link(&self, link: &Link) -> Result<LinkStatus> {
        self.unlink(&link.output, &link.input).await
    }

    async fn unlink(&self, output: &str, input: &str) -> Result<LinkStatus> {
        let command = CommandLine::new(&self.program).args(["--disconnect", output, input]);

        let result = self.runner.run(&command).await?;
        if result.success() {
            info!("Unlinked {} -> {}", output, input);
            return Ok(LinkStatus::Disconnected);
        }

        if reports_missing_link(&result) {
            debug!("{} -> {} was not linked", output, input);
            return Ok(LinkStatus::NotConnected);
        }

        Err(result.into_error())
    }
}

/// pw-link wants the output port first. Two ports of the same direction are
/// passed through untouched and pw-link decides.
fn output_first<'a>(a: &'a Channel, b: &'a Channel) -> (&'a Channel, &'a Channel) {
    if a.direction == Direction::Input && b.direction == Direction::Output {
        (b, a)
    } else {
        (a, b)
    }
}

fn channel_pairs<'a>(a: &'a Port, b: &'a Port) -> Vec<(&'a Channel, &'a Channel)> {
    if let (Ok(a_left), Ok(a_right), Ok(b_left), Ok(b_right)) =
        (a.left(), a.right(), b.left(), b.right())
    {
        return vec![(a_left, b_left), (a_right, b_right)];
    }

    match (a.channels(), b.channels()) {
        ([single], many) => many.iter().map(|channel| (single, channel)).collect(),
        (many, [single]) => many.iter().map(|channel| (channel, single)).collect(),
        (left, right) => left.iter().zip(right).collect(),
    }
}

/// `unchanged` only when no channel pair reported `changed`.
fn combine(statuses: &[LinkStatus], changed: LinkStatus, unchanged: LinkStatus) -> LinkStatus {
    if statuses.contains(&changed) {
        changed
    } else {
        unchanged
    }
}

fn reports_existing_link(output: &CommandOutput) -> bool {
    let stderr = output.stderr.to_ascii_lowercase();
    stderr.contains("file exists") || stderr.contains("already linked")
}

fn reports_missing_link(output: &CommandOutput) -> bool {
    let stderr = output.stderr.to_ascii_lowercase();
    stderr.contains("no such file") || stderr.contains("not found") || stderr.contains("no link")
}

/// Parses `pw-link --output --id` / `--input --id` lines such as
/// `  55 alsa_output.pci-0000_00_1f.3.analog-stereo:monitor_FL` and groups
/// the channels per node, keeping the listing order.
pub fn parse_ports(output: &str, direction: Direction) -> Vec<Port> {
    let mut ports: Vec<Port> = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some(channel) = parse_channel(line, direction) else {
            warn!("Skipping malformed port line: {:?}", line);
            continue;
        };

        match ports.iter_mut().find(|port| port.node == channel.node) {
            Some(port) => port.channels.push(channel),
            None => ports.push(Port {
                node: channel.node.clone(),
                direction,
                channels: vec![channel],
            }),
        }
    }

    ports
}

fn parse_channel(line: &str, direction: Direction) -> Option<Channel> {
    let (id, qualified) = match line.split_once(char::is_whitespace) {
        Some((id, rest)) => match id.parse::<u32>() {
            Ok(id) => (Some(id), rest.trim()),
            Err(_) => (None, line),
        },
        None => (None, line),
    };

    let (node, name) = qualified.split_once(':')?;
    if node.is_empty() || name.is_empty() {
        return None;
    }

    Some(Channel {
        id,
        node: node.to_string(),
        name: name.to_string(),
        direction,
    })
}

/// Parses `pw-link --links`:
///
/// ```text
/// alsa_input.usb-mic:capture_FL
///   |-> obs:input_FL
/// obs:input_FL
///   |<- alsa_input.usb-mic:capture_FL
/// ```
///
/// Only the `|->` lines are read, so each link shows up once.
pub fn parse_links(output: &str) -> Vec<Link> {
    let mut links = Vec::new();
    let mut current_port: Option<&str> = None;

    for raw_line in output.lines() {
        let line = strip_id(raw_line.trim());
        if line.is_empty() {
            continue;
        }

        if let Some(input) = line.strip_prefix("|->") {
            match current_port {
                Some(output) => links.push(Link {
                    output: output.to_string(),
                    input: strip_id(input.trim()).to_string(),
                }),
                None => warn!("Skipping link without a source port: {:?}", line),
            }
        } else if !line.starts_with("|<-") {
            current_port = Some(line);
        }
    }

    links
}

/// `--links --id` prefixes ports and links with ids; drop them.
fn strip_id(port: &str) -> &str {
    match port.split_once(char::is_whitespace) {
        Some((id, rest)) if id.parse::<u32>().is_ok() => rest.trim(),
        _ => port,
    }
}
