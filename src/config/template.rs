//! Typed command templates.
//!
//! A template is parsed once, at load time, into literal text and named
//! slots such as `{bssid}`. Rendering substitutes each slot exactly once,
//! left to right, without re-scanning substituted text. `${NAME}` is left
//! untouched for the shell, as is any brace group that is not a plain
//! identifier (`awk '{print $1}'`).

use std::collections::HashMap;
use std::fmt;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// A named placeholder in a command template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Wireless interface name.
    WifiCard,
    /// Target access point MAC.
    Bssid,
    /// Target channel.
    Channel,
    /// Deauthentication burst count.
    DeauthCount,
    /// Target station MAC.
    ClientMac,
    /// Capture file prefix handed to the scanner.
    CapturePrefix,
}

impl Slot {
    /// Every slot, in declaration order.
    pub const ALL: [Slot; 6] = [
        Slot::WifiCard,
        Slot::Bssid,
        Slot::Channel,
        Slot::DeauthCount,
        Slot::ClientMac,
        Slot::CapturePrefix,
    ];

    /// Name as written between braces.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Slot::WifiCard => "wifi_card",
            Slot::Bssid => "bssid",
            Slot::Channel => "channel",
            Slot::DeauthCount => "deauth_count",
            Slot::ClientMac => "client_mac",
            Slot::CapturePrefix => "capture_prefix",
        }
    }

    /// Look up a slot by its brace name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Slot> {
        Slot::ALL.into_iter().find(|slot| slot.name() == name)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.name())
    }
}

/// The command templates the attack loop issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Switch the interface into monitor mode.
    EnableMonitor,
    /// Return the interface to managed mode.
    DisableMonitor,
    /// Tune the interface to a channel.
    SetChannel,
    /// Run the capture tool.
    Scan,
    /// Broadcast deauthentication against an access point.
    DeauthBroadcast,
    /// Targeted deauthentication of one station.
    DeauthClient,
}

impl CommandKind {
    /// Configuration key holding this template.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            CommandKind::EnableMonitor => "enable_monitor_cmds",
            CommandKind::DisableMonitor => "disable_monitor_cmds",
            CommandKind::SetChannel => "set_channel_cmd",
            CommandKind::Scan => "scan_cmd",
            CommandKind::DeauthBroadcast => "deauth_broadcast_cmd",
            CommandKind::DeauthClient => "deauth_client_cmd",
        }
    }

    /// Slots this kind of command can be rendered with.
    #[must_use]
    pub fn allowed_slots(self) -> &'static [Slot] {
        match self {
            CommandKind::EnableMonitor | CommandKind::DisableMonitor => &[Slot::WifiCard],
            CommandKind::SetChannel => &[Slot::WifiCard, Slot::Channel],
            CommandKind::Scan => &[Slot::WifiCard, Slot::CapturePrefix],
            CommandKind::DeauthBroadcast => &[Slot::WifiCard, Slot::Bssid, Slot::DeauthCount],
            CommandKind::DeauthClient => &[
                Slot::WifiCard,
                Slot::Bssid,
                Slot::DeauthCount,
                Slot::ClientMac,
            ],
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Errors from parsing or rendering a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// `{name}` does not name any slot.
    #[error("unknown placeholder {{{name}}} at byte {position}")]
    UnknownSlot {
        /// Name between the braces.
        name: String,
        /// Byte offset of the opening brace.
        position: usize,
    },

    /// The slot exists but this command kind cannot supply it.
    #[error("placeholder {slot} is not available in {kind}")]
    DisallowedSlot {
        /// Offending slot.
        slot: Slot,
        /// Template kind.
        kind: CommandKind,
    },

    /// An opening brace has no matching close.
    #[error("unclosed '{{' at byte {0}")]
    Unclosed(usize),

    /// Rendering was attempted without a value for a slot.
    #[error("no value for placeholder {0}")]
    Unbound(Slot),

    /// The template is blank.
    #[error("template is empty")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(Slot),
}

/// A parsed command template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl CommandTemplate {
    /// Parse `source`, accepting any known slot.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        if source.trim().is_empty() {
            return Err(TemplateError::Empty);
        }

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(idx) = rest.find('{') {
            let position = offset + idx;
            let escaped_for_shell = rest[..idx].ends_with('$');
            let Some(close) = rest[idx..].find('}') else {
                if escaped_for_shell {
                    literal.push_str(rest);
                    rest = "";
                    break;
                }
                return Err(TemplateError::Unclosed(position));
            };
            let name = &rest[idx + 1..idx + close];
            let end = idx + close + 1;

            if escaped_for_shell || !is_identifier(name) {
                literal.push_str(&rest[..end]);
            } else {
                let slot = Slot::from_name(name).ok_or_else(|| TemplateError::UnknownSlot {
                    name: name.to_string(),
                    position,
                })?;
                literal.push_str(&rest[..idx]);
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Slot(slot));
            }

            offset += end;
            rest = &rest[end..];
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// Parse `source` and reject slots `kind` cannot supply.
    pub fn parse_for(kind: CommandKind, source: &str) -> Result<Self, TemplateError> {
        let template = Self::parse(source)?;
        let allowed = kind.allowed_slots();
        if let Some(slot) = template.slots().find(|slot| !allowed.contains(slot)) {
            return Err(TemplateError::DisallowedSlot { slot, kind });
        }
        Ok(template)
    }

    /// Template text as configured.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Slots referenced, in order of appearance.
    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Slot(slot) => Some(*slot),
            Segment::Literal(_) => None,
        })
    }

    /// Substitute every slot from `values`.
    pub fn render(&self, values: &SlotValues) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.source.len() + 32);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot(slot) => {
                    out.push_str(values.get(*slot).ok_or(TemplateError::Unbound(*slot))?)
                }
            }
        }
        Ok(out)
    }
}

impl Serialize for CommandTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Values available when rendering a template.
#[derive(Debug, Clone, Default)]
pub struct SlotValues {
    values: HashMap<Slot, String>,
}

impl SlotValues {
    /// Empty value set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `slot` to `value`.
    pub fn with(mut self, slot: Slot, value: impl ToString) -> Self {
        self.values.insert(slot, value.to_string());
        self
    }

    /// Value bound to `slot`.
    #[must_use]
    pub fn get(&self, slot: Slot) -> Option<&str> {
        self.values.get(&slot).map(String::as_str)
    }
}
