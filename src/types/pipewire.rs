use crate::types::error::{Error, Result};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize)]
pub enum Direction {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize)]
pub enum ChannelPosition {
    Left,
    Right,
    Mono,
    Other,
}

impl ChannelPosition {
    /// Identifies the channel from the last token of a port name such as
    /// `playback_FL`, `capture_MONO` or `out_R`. Surround positions like
    /// `TFL` or `RL` are [`ChannelPosition::Other`].
    pub fn from_port_name(name: &str) -> Self {
        let token = name
            .rsplit(['_', '-', ' ', ':'])
            .next()
            .unwrap_or(name)
            .to_ascii_uppercase();

        match token.as_str() {
            "FL" | "L" | "LEFT" => ChannelPosition::Left,
            "FR" | "R" | "RIGHT" => ChannelPosition::Right,
            "MONO" => ChannelPosition::Mono,
            _ => ChannelPosition::Other,
        }
    }
}

impl fmt::Display for ChannelPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelPosition::Left => "left",
            ChannelPosition::Right => "right",
            ChannelPosition::Mono => "mono",
            ChannelPosition::Other => "other",
        };
        f.write_str(name)
    }
}

/// A single pw-link port, e.g. `alsa_output.pci-0000_00_1f.3:playback_FL`.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize)]
pub struct Channel {
    pub id: Option<u32>,
    pub node: String,
    pub name: String,
    pub direction: Direction,
}

impl Channel {
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.node, self.name)
    }

    pub fn position(&self) -> ChannelPosition {
        ChannelPosition::from_port_name(&self.name)
    }
}

/// All ports of one node that share a direction. This is a snapshot of the
/// live graph taken when it was listed.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Port {
    pub node: String,
    pub direction: Direction,
    pub channels: Vec<Channel>,
}

impl Port {
    pub fn left(&self) -> Result<&Channel> {
        self.channel(ChannelPosition::Left)
    }

    pub fn right(&self) -> Result<&Channel> {
        self.channel(ChannelPosition::Right)
    }

    pub fn is_stereo(&self) -> bool {
        self.left().is_ok() && self.right().is_ok()
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    fn channel(&self, position: ChannelPosition) -> Result<&Channel> {
        self.channels
            .iter()
            .find(|channel| channel.position() == position)
            .ok_or_else(|| Error::ChannelNotFound {
                node: self.node.clone(),
                channel: position,
            })
    }
}

/// An edge between an output port and an input port, both qualified names.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize)]
pub struct Link {
    pub output: String,
    pub input: String,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub enum LinkStatus {
    Connected,
    AlreadyConnected,
    Disconnected,
    NotConnected,
}

/// A node pw-cat can play to or record from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub id: u32,
    pub description: String,
    pub priority: Option<i32>,
    pub is_default: bool,
}
