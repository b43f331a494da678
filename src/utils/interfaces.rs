//! Best-effort parser for `pw-cli ls` output.
//!
//! The listing looks like
//!
//! ```text
//! 	id 31, type PipeWire:Interface:Client/3
//!  		object.serial = "31"
//!  		application.name = "pw-cli"
//! ```
//!
//! Tolerance rules: whitespace around every token is ignored, blank lines and
//! anything before the first `id` line are skipped, a malformed `id` line is
//! logged and dropped together with its properties, a property line without
//! `=` is logged and dropped, and a record without any name property is
//! logged and dropped. Nothing in the text aborts the whole listing.

use crate::{
    types::{
        error::Result,
        interface::{Interface, InterfaceListing},
        process::CommandLine,
    },
    utils::runner::Runner,
};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Property keys that can name an interface, most specific first.
const NAME_KEYS: [&str; 10] = [
    "node.name",
    "device.name",
    "application.name",
    "client.name",
    "module.name",
    "factory.name",
    "metadata.name",
    "core.name",
    "port.name",
    "object.path",
];

struct PendingRecord {
    id: u32,
    interface_type: String,
    properties: HashMap<String, String>,
}

pub async fn list_interfaces(
    runner: &dyn Runner,
    program: &str,
    type_filter: Option<&str>,
) -> Result<InterfaceListing> {
    let mut command = CommandLine::new(program).arg("ls");
    if let Some(interface_type) = type_filter {
        command = command.arg(interface_type);
    }

    let output = runner.run(&command).await?.into_result()?;
    let mut listing = parse_interfaces(&output.stdout);

    if let Some(interface_type) = type_filter {
        listing.retain_type(interface_type);
    }

    Ok(listing)
}

pub fn parse_interfaces(output: &str) -> InterfaceListing {
    let mut listing = InterfaceListing::default();
    let mut current: Option<PendingRecord> = None;
    // Set after a malformed `id` line so its properties are dropped quietly.
    let mut in_broken_record = false;

    for raw_line in output.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        let line = line.strip_prefix('*').map(str::trim).unwrap_or(line);

        if let Some(header) = header_body(line) {
            if let Some(record) = current.take() {
                finish_record(record, &mut listing);
            }

            match parse_header(header) {
                Some((id, interface_type)) => {
                    in_broken_record = false;
                    current = Some(PendingRecord {
                        id,
                        interface_type,
                        properties: HashMap::new(),
                    });
                }
                None => {
                    warn!("Skipping malformed interface line: {:?}", line);
                    listing.skipped.push(line.to_string());
                    in_broken_record = true;
                }
            }
            continue;
        }

        let Some(record) = current.as_mut() else {
            if !in_broken_record {
                debug!("Skipping listing header: {:?}", line);
            }
            continue;
        };

        match line.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                record
                    .properties
                    .insert(key.trim().to_string(), unquote(value.trim()).to_string());
            }
            _ => {
                warn!(
                    "Skipping malformed property line in interface {}: {:?}",
                    record.id, line
                );
                listing.skipped.push(line.to_string());
            }
        }
    }

    if let Some(record) = current.take() {
        finish_record(record, &mut listing);
    }

    listing
}

/// Everything after the leading `id` word of a header line, whatever the
/// spacing or case. Property lines always carry a `=`, headers never do.
fn header_body(line: &str) -> Option<&str> {
    if line.contains('=') {
        return None;
    }

    let word = line
        .split(|c: char| c.is_whitespace() || c == ',')
        .next()?;
    if !word.eq_ignore_ascii_case("id") {
        return None;
    }

    line.get(word.len()..)
}

/// `31, type PipeWire:Interface:Client/3` -> `(31, "Client")`
fn parse_header(header: &str) -> Option<(u32, String)> {
    let (id, kind) = header.split_once(',')?;
    let id = id.trim().parse::<u32>().ok()?;

    let kind = kind.trim();
    let (word, kind) = kind.split_once(char::is_whitespace)?;
    if !word.eq_ignore_ascii_case("type") {
        return None;
    }
    let kind = kind.trim();
    let tag = kind.rsplit(':').next()?.split('/').next()?.trim();
    if tag.is_empty() {
        return None;
    }

    Some((id, tag.to_string()))
}

fn finish_record(record: PendingRecord, listing: &mut InterfaceListing) {
    let name = NAME_KEYS
        .iter()
        .find_map(|key| record.properties.get(*key))
        .filter(|name| !name.is_empty())
        .cloned();

    let Some(name) = name else {
        warn!(
            "Skipping {} interface {}: no name property",
            record.interface_type, record.id
        );
        listing
            .skipped
            .push(format!("id {}, type {}", record.id, record.interface_type));
        return;
    };

    listing.interfaces.insert(
        record.id,
        Interface {
            id: record.id,
            interface_type: record.interface_type,
            name,
            properties: record.properties,
        },
    );
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        types::error::Error,
        utils::testing::{SpyRunner, capture_warnings},
    };

    const LISTING: &str = "\
\tid 0, type PipeWire:Interface:Core/4
 \t\tobject.serial = \"0\"
 \t\tcore.name = \"pipewire-0\"
\tid 31, type PipeWire:Interface:Client/3
 \t\tobject.serial = \"31\"
 \t\tmodule.id = \"2\"
 \t\tapplication.name = \"WirePlumber\"

\tid 42, type PipeWire:Interface:Node/3
 \t\tobject.serial = \"42\"
 \t\tnode.description = \"Built-in Audio Analog Stereo\"
 \t\tnode.name = \"alsa_output.pci-0000_00_1f.3.analog-stereo\"
 \t\tmedia.class = \"Audio/Sink\"
";

    #[test]
    fn parses_every_record_into_the_map() {
        let listing = parse_interfaces(LISTING);

        assert_eq!(listing.interfaces.len(), 3);
        assert!(listing.skipped.is_empty());

        let node = &listing.interfaces[&42];
        assert_eq!(node.interface_type, "Node");
        assert_eq!(node.name, "alsa_output.pci-0000_00_1f.3.analog-stereo");
        assert_eq!(node.properties["media.class"], "Audio/Sink");
        assert_eq!(listing.interfaces[&31].name, "WirePlumber");
        assert_eq!(listing.interfaces[&0].interface_type, "Core");
    }

    #[test]
    fn malformed_line_is_skipped_not_fatal() {
        let output = "\
\tid 7, type PipeWire:Interface:Device/3
\t\tdevice.name = \"alsa_card.pci-0000_00_1f.3\"
\tid seven, type ???
\t\tdevice.name = \"ghost\"
";
        let (listing, logs) = capture_warnings(|| parse_interfaces(output));

        assert_eq!(listing.interfaces.len(), 1);
        assert_eq!(listing.interfaces[&7].name, "alsa_card.pci-0000_00_1f.3");
        assert_eq!(listing.skipped, vec!["id seven, type ???".to_string()]);
        assert!(logs.contains("WARN"), "logs were {logs:?}");
        assert!(logs.contains("id seven, type ???"), "logs were {logs:?}");
    }

    #[test]
    fn headers_with_tabs_or_upper_case_start_a_new_record() {
        let output = "\
id 1, type PipeWire:Interface:Node/3
\tnode.name = \"first\"
id\t2,\ttype\tPipeWire:Interface:Node/3
\tnode.name = \"second\"
ID 3, TYPE PipeWire:Interface:Node/3
\tnode.name = \"third\"
";
        let listing = parse_interfaces(output);

        assert!(listing.skipped.is_empty());
        assert_eq!(listing.interfaces.len(), 3);
        assert_eq!(listing.interfaces[&1].name, "first");
        assert_eq!(listing.interfaces[&2].name, "second");
        assert_eq!(listing.interfaces[&3].name, "third");
    }

    #[test]
    fn properties_under_a_broken_header_never_reach_the_previous_record() {
        let output = "\
id 1, type PipeWire:Interface:Node/3
\tnode.name = \"first\"
id\tbogus
\tnode.name = \"intruder\"
";
        let listing = parse_interfaces(output);

        assert_eq!(listing.interfaces.len(), 1);
        assert_eq!(listing.interfaces[&1].name, "first");
        assert_eq!(listing.skipped, vec!["id\tbogus".to_string()]);
    }

    #[test]
    fn tolerates_odd_whitespace_and_unquoted_values() {
        let output =
            "id   9 ,   type   PipeWire:Interface:Module/3\n   module.name=libpipewire-module-rt  \n";
        let listing = parse_interfaces(output);

        assert_eq!(listing.interfaces[&9].interface_type, "Module");
        assert_eq!(listing.interfaces[&9].name, "libpipewire-module-rt");
    }

    #[test]
    fn record_without_name_is_dropped() {
        let output = "id 80, type PipeWire:Interface:Link/3\n\tlink.output.port = \"61\"\n";
        let listing = parse_interfaces(output);

        assert!(listing.interfaces.is_empty());
        assert_eq!(listing.skipped.len(), 1);
    }

    #[test]
    fn property_line_without_equals_is_skipped() {
        let output =
            "id 3, type PipeWire:Interface:Factory/3\n\tfactory.name = \"adapter\"\n\tgarbage\n";
        let listing = parse_interfaces(output);

        assert_eq!(listing.interfaces.len(), 1);
        assert_eq!(listing.skipped, vec!["garbage".to_string()]);
    }

    #[tokio::test]
    async fn filter_is_passed_to_pw_cli_and_applied_to_the_result() {
        let runner = SpyRunner::new().respond(0, LISTING, "");
        let listing = list_interfaces(&runner, "pw-cli", Some("Client"))
            .await
            .unwrap();

        assert_eq!(runner.call_strings(), vec!["pw-cli ls Client"]);
        assert_eq!(listing.interfaces.keys().copied().collect::<Vec<_>>(), vec![31]);
    }

    #[tokio::test]
    async fn unfiltered_listing_keeps_everything() {
        let runner = SpyRunner::new().respond(0, LISTING, "");
        let listing = list_interfaces(&runner, "pw-cli", None).await.unwrap();

        assert_eq!(runner.call_strings(), vec!["pw-cli ls"]);
        assert_eq!(listing.interfaces.len(), 3);
    }

    #[tokio::test]
    async fn failing_pw_cli_is_process_failed() {
        let runner = SpyRunner::new().respond(1, "", "Error: failed to connect\n");
        let err = list_interfaces(&runner, "pw-cli", None).await.unwrap_err();

        assert!(matches!(err, Error::ProcessFailed { code: Some(1), .. }));
    }
}
