//! Turns command templates into supervised process requests.
//!
//! Three rewrites happen after the template is rendered:
//!
//! - whitespace-delimited words naming an elevated tool are replaced with
//!   the tool's absolute path, resolved once per builder
//! - scans and deauthentication bursts are wrapped in `timeout` so a tool
//!   that ignores its own stop condition still ends
//! - the request is elevated with the configured method and credential

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::config::{CommandKind, Settings, Slot, SlotValues, TemplateError};
use crate::supervisor::{OutputMode, ProcessRequest};

/// Shortest hard time box for a deauthentication burst, in seconds.
pub const ATTACK_TIMEOUT_FLOOR_SECS: u64 = 5;

/// Grace period between SIGTERM and SIGKILL for time-boxed commands.
const KILL_AFTER_SECS: u64 = 2;

type Resolver = Box<dyn Fn(&str) -> Option<PathBuf> + Send>;

/// Renders [`CommandKind`]s for the current settings.
pub struct CommandBuilder {
    settings: Settings,
    resolver: Resolver,
    resolved: HashMap<String, Option<String>>,
}

impl CommandBuilder {
    /// Builder that resolves tools on `PATH`.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self {
            settings: settings.clone(),
            resolver: Box::new(|tool| which::which(tool).ok()),
            resolved: HashMap::new(),
        }
    }

    /// Replace the tool lookup.
    #[must_use]
    pub fn with_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&str) -> Option<PathBuf> + Send + 'static,
    {
        self.resolver = Box::new(resolver);
        self.resolved.clear();
        self
    }

    /// Swap in reloaded settings. Tool paths are looked up again.
    pub fn update(&mut self, settings: &Settings) {
        self.settings = settings.clone();
        self.resolved.clear();
    }

    /// Slot values every command shares.
    #[must_use]
    pub fn base_values(&self) -> SlotValues {
        SlotValues::new()
            .with(Slot::WifiCard, &self.settings.wifi_card)
            .with(Slot::DeauthCount, self.settings.deauth_count)
            .with(Slot::CapturePrefix, &self.settings.capture_prefix)
    }

    /// Hard time box for `kind`, if it gets one.
    #[must_use]
    pub fn time_box(&self, kind: CommandKind) -> Option<u64> {
        match kind {
            CommandKind::Scan => Some(self.settings.scan_time),
            CommandKind::DeauthBroadcast | CommandKind::DeauthClient => {
                Some(self.settings.deauth_count.max(ATTACK_TIMEOUT_FLOOR_SECS))
            }
            _ => None,
        }
    }

    /// The shell command line for `kind`.
    pub fn render(&mut self, kind: CommandKind, values: &SlotValues) -> Result<String, TemplateError> {
        let rendered = self.settings.templates.get(kind).render(values)?;
        let rewritten = self.rewrite_tools(&rendered);
        Ok(match self.time_box(kind) {
            Some(secs) => time_boxed(&rewritten, secs),
            None => rewritten,
        })
    }

    /// A merged-output, elevated request for `kind`.
    pub fn build(
        &mut self,
        kind: CommandKind,
        values: &SlotValues,
    ) -> Result<ProcessRequest, TemplateError> {
        let command = self.render(kind, values)?;
        debug!("Built {} command: {}", kind, command);

        let mut request = ProcessRequest::new(command)
            .elevate(self.settings.elevation)
            .output_mode(OutputMode::Merged);
        if let Some(ref secret) = self.settings.credential {
            request = request.credential(secret.clone());
        }
        Ok(request)
    }

    fn rewrite_tools(&mut self, command: &str) -> String {
        let mut out = String::with_capacity(command.len());
        let mut word = String::new();
        for c in command.chars() {
            if c.is_whitespace() {
                self.flush_word(&mut word, &mut out);
                out.push(c);
            } else {
                word.push(c);
            }
        }
        self.flush_word(&mut word, &mut out);
        out
    }

    fn flush_word(&mut self, word: &mut String, out: &mut String) {
        if word.is_empty() {
            return;
        }
        match self.resolve(word) {
            Some(path) => out.push_str(&path),
            None => out.push_str(word),
        }
        word.clear();
    }

    fn resolve(&mut self, word: &str) -> Option<String> {
        if !self.settings.elevated_tools.iter().any(|tool| tool == word) {
            return None;
        }
        if let Some(cached) = self.resolved.get(word) {
            return cached.clone();
        }
        let found = (self.resolver)(word).map(|p| p.to_string_lossy().into_owned());
        if found.is_none() {
            warn!("Tool '{}' not found on PATH; leaving it unresolved", word);
        }
        self.resolved.insert(word.to_string(), found.clone());
        found
    }
}

/// Prefix `command` with `timeout`, through a subshell when it is a list.
fn time_boxed(command: &str, secs: u64) -> String {
    // --foreground keeps the tool in our process group so killpg reaches it
    let prefix = format!("timeout --foreground --kill-after={} {}", KILL_AFTER_SECS, secs);
    if command.contains(['\n', ';', '&', '|']) {
        let quoted = shlex::try_quote(command)
            .map(|q| q.into_owned())
            .unwrap_or_else(|_| format!("'{}'", command.replace('\'', r"'\''")));
        format!("{} bash -c {}", prefix, quoted)
    } else {
        format!("{} {}", prefix, command)
    }
}
