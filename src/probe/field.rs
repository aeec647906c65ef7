//! Table-driven probes.
//!
//! A scalar fact is a list of [`FieldProbe`]s tried in order with a default;
//! a presence flag is a list of [`Evidence`] OR-combined. Failures of any
//! single probe only mean "no value" or "no evidence".

use crate::probe::host::Host;

/// Where a probe reads its raw text from.
#[derive(Debug, Clone, Copy)]
pub enum Source {
    /// Standard output of a command, regardless of its exit status
    Command {
        program: &'static str,
        args: &'static [&'static str],
    },
    /// Contents of a file
    File(&'static str),
}

impl Source {
    /// Fetch the raw text; `None` when there is nothing to parse.
    pub async fn read(&self, host: &dyn Host) -> Option<String> {
        let text = match self {
            Source::Command { program, args } => host.run(program, args).await.stdout,
            Source::File(path) => host.read_file(path).await?,
        };
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

/// A raw source paired with the parser that turns it into a field value.
#[derive(Debug, Clone, Copy)]
pub struct FieldProbe {
    pub source: Source,
    pub parse: fn(&str) -> Option<String>,
}

impl FieldProbe {
    /// A probe reading command output.
    pub const fn command(
        program: &'static str,
        args: &'static [&'static str],
        parse: fn(&str) -> Option<String>,
    ) -> Self {
        Self {
            source: Source::Command { program, args },
            parse,
        }
    }

    /// A probe reading a file.
    pub const fn file(path: &'static str, parse: fn(&str) -> Option<String>) -> Self {
        Self {
            source: Source::File(path),
            parse,
        }
    }

    /// Read and parse, `None` if either step yields nothing.
    pub async fn read(&self, host: &dyn Host) -> Option<String> {
        let raw = self.source.read(host).await?;
        (self.parse)(&raw).filter(|value| !value.is_empty())
    }
}

/// First value produced by `probes`, in order, or `default`.
pub async fn first_of(host: &dyn Host, probes: &[FieldProbe], default: &str) -> String {
    for probe in probes {
        if let Some(value) = probe.read(host).await {
            return value;
        }
    }
    default.to_string()
}

/// Identity parser for sources whose trimmed text is the value.
pub fn verbatim(raw: &str) -> Option<String> {
    Some(raw.to_string())
}

/// One heuristic contributing to a presence flag.
#[derive(Debug, Clone, Copy)]
pub enum Evidence {
    /// Command output mentions any keyword, case-insensitively
    CommandMentions {
        program: &'static str,
        args: &'static [&'static str],
        keywords: &'static [&'static str],
    },
    /// Command output equals `expected` once trimmed
    CommandPrints {
        program: &'static str,
        args: &'static [&'static str],
        expected: &'static str,
    },
    /// Command printed anything at all
    CommandHasOutput {
        program: &'static str,
        args: &'static [&'static str],
    },
    /// A directory has an entry whose name starts with `prefix`
    DirHasEntry {
        dir: &'static str,
        prefix: &'static str,
    },
    /// `dir/<prefix>*/file` mentions `keyword` for some entry
    DirEntryFileMentions {
        dir: &'static str,
        prefix: &'static str,
        file: &'static str,
        keyword: &'static str,
    },
}

impl Evidence {
    /// Whether this heuristic finds evidence on `host`.
    pub async fn observe(&self, host: &dyn Host) -> bool {
        match *self {
            Evidence::CommandMentions {
                program,
                args,
                keywords,
            } => mentions_any(&host.run(program, args).await.stdout, keywords),
            Evidence::CommandPrints {
                program,
                args,
                expected,
            } => host.run(program, args).await.text() == expected,
            Evidence::CommandHasOutput { program, args } => {
                !host.run(program, args).await.text().is_empty()
            }
            Evidence::DirHasEntry { dir, prefix } => host
                .list_dir(dir)
                .await
                .iter()
                .any(|name| name.starts_with(prefix)),
            Evidence::DirEntryFileMentions {
                dir,
                prefix,
                file,
                keyword,
            } => {
                for entry in host.list_dir(dir).await {
                    if !entry.starts_with(prefix) {
                        continue;
                    }
                    let path = format!("{dir}/{entry}/{file}");
                    if let Some(content) = host.read_file(&path).await {
                        if mentions_any(&content, &[keyword]) {
                            return true;
                        }
                    }
                }
                false
            }
        }
    }
}

/// True if any piece of evidence is observed.
pub async fn any_evidence(host: &dyn Host, evidence: &[Evidence]) -> bool {
    for item in evidence {
        if item.observe(host).await {
            return true;
        }
    }
    false
}

/// Case-insensitive substring match against a keyword list.
pub fn mentions_any(text: &str, keywords: &[&str]) -> bool {
    let lower = text.to_lowercase();
    keywords
        .iter()
        .any(|keyword| lower.contains(&keyword.to_lowercase()))
}

/// Lines of `text` mentioning any keyword, keeping only the last `limit`.
pub fn grep_tail(text: &str, keywords: &[&str], limit: usize) -> Vec<String> {
    let matches: Vec<&str> = text
        .lines()
        .filter(|line| mentions_any(line, keywords))
        .collect();
    let skip = matches.len().saturating_sub(limit);
    matches[skip..].iter().map(|line| line.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::host::{CommandOutput, ScriptedHost};

    fn first_word(raw: &str) -> Option<String> {
        raw.split_whitespace().next().map(str::to_string)
    }

    const PROBES: &[FieldProbe] = &[
        FieldProbe::command("primary", &[], first_word),
        FieldProbe::file("/fallback", first_word),
    ];

    #[tokio::test]
    async fn test_first_of_prefers_earlier_probe() {
        let host = ScriptedHost::new()
            .with_command("primary", "one two")
            .with_file("/fallback", "three");
        assert_eq!(first_of(&host, PROBES, "N/A").await, "one");
    }

    #[tokio::test]
    async fn test_first_of_falls_back_then_defaults() {
        let host = ScriptedHost::new().with_file("/fallback", "three");
        assert_eq!(first_of(&host, PROBES, "N/A").await, "three");
        assert_eq!(first_of(&ScriptedHost::new(), PROBES, "N/A").await, "N/A");
    }

    #[tokio::test]
    async fn test_blank_output_is_no_value() {
        let host = ScriptedHost::new().with_command("primary", "   \n");
        assert_eq!(first_of(&host, PROBES, "N/A").await, "N/A");
    }

    #[tokio::test]
    async fn test_evidence_variants() {
        let host = ScriptedHost::new()
            .with_command("lsusb", "Bus 001 Device 002: ID 1a6e:089a Global Unichip Corp. CORAL")
            .with_output("systemctl is-active fancontrol", CommandOutput::failed(3, "inactive\n"))
            .with_dir("/dev", &["i2c-1", "null"])
            .with_dir("/sys/class/thermal", &["cooling_device0", "thermal_zone0"])
            .with_file("/sys/class/thermal/cooling_device0/type", "pwm-fan\n");

        let usb = Evidence::CommandMentions {
            program: "lsusb",
            args: &[],
            keywords: &["coral"],
        };
        let service = Evidence::CommandPrints {
            program: "systemctl",
            args: &["is-active", "fancontrol"],
            expected: "active",
        };
        let node = Evidence::DirHasEntry {
            dir: "/dev",
            prefix: "i2c-",
        };
        let fan = Evidence::DirEntryFileMentions {
            dir: "/sys/class/thermal",
            prefix: "cooling_device",
            file: "type",
            keyword: "fan",
        };

        assert!(usb.observe(&host).await);
        assert!(!service.observe(&host).await);
        assert!(node.observe(&host).await);
        assert!(fan.observe(&host).await);
        assert!(any_evidence(&host, &[service, fan]).await);
        assert!(!any_evidence(&host, &[service]).await);
    }

    #[test]
    fn test_grep_tail_keeps_last_matches() {
        let text = "usb 1\nfoo\nUSB 2\nusb 3\n";
        assert_eq!(grep_tail(text, &["usb"], 2), vec!["USB 2", "usb 3"]);
        assert!(grep_tail("", &["usb"], 5).is_empty());
    }
}
