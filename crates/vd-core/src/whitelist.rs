use crate::error::DiagnosticsError;
use regex::Regex;

/// Network probes the agent is willing to run. Anything else is rejected
/// before a process is spawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandType {
    Ping,
    Traceroute,
    Arping,
}

impl CommandType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PING" => Some(CommandType::Ping),
            "TRACEROUTE" => Some(CommandType::Traceroute),
            "ARPING" => Some(CommandType::Arping),
            _ => None,
        }
    }

    pub fn spec(self) -> CommandSpec {
        match self {
            CommandType::Ping => CommandSpec {
                executable: "ping",
                default_flag: "-c",
                default_value: "4",
                requires_address: true,
            },
            CommandType::Traceroute => CommandSpec {
                executable: "traceroute",
                default_flag: "-m",
                default_value: "20",
                requires_address: true,
            },
            CommandType::Arping => CommandSpec {
                executable: "arping",
                default_flag: "-c",
                default_value: "4",
                requires_address: true,
            },
        }
    }
}

/// Immutable description of one permitted command: the executable and the
/// default flag injected when the caller did not supply its own.
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub executable: &'static str,
    pub default_flag: &'static str,
    pub default_value: &'static str,
    pub requires_address: bool,
}

/// Assembles argument vectors for whitelisted commands.
///
/// The output is always a vector of separate tokens, never a shell string,
/// so caller input cannot smuggle metacharacters past the allowlist.
pub struct CommandWhitelist {
    valid_args: Regex,
}

impl CommandWhitelist {
    pub fn new() -> Self {
        Self {
            valid_args: Regex::new(r"^[\w\-\s.]+$").expect("hard-coded allowlist regex"),
        }
    }

    /// Build the argv for `command_type` against `address`.
    ///
    /// `extra_args` is the caller's explicit argument string; it must match
    /// the safe-character allowlist and suppresses the default flag when it
    /// already carries an equivalent one.
    pub fn resolve(
        &self,
        command_type: CommandType,
        address: &str,
        extra_args: Option<&str>,
    ) -> Result<Vec<String>, DiagnosticsError> {
        let spec = command_type.spec();

        if spec.requires_address && address.trim().is_empty() {
            return Err(DiagnosticsError::InvalidParameters);
        }

        let mut argv = vec![spec.executable.to_string()];
        if spec.requires_address {
            // Address goes in as its own token; it is never concatenated
            // into a shell string.
            argv.push(address.trim().to_string());
        }

        let mut has_default_flag = false;
        if let Some(extra) = extra_args {
            let extra = extra.trim();
            if !extra.is_empty() {
                if !self.valid_args.is_match(extra) {
                    return Err(DiagnosticsError::InvalidParameters);
                }
                for token in extra.split_whitespace() {
                    if token == spec.default_flag {
                        has_default_flag = true;
                    }
                    argv.push(token.to_string());
                }
            }
        }

        if !has_default_flag {
            argv.push(spec.default_flag.to_string());
            argv.push(spec.default_value.to_string());
        }

        Ok(argv)
    }
}

impl Default for CommandWhitelist {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_token(argv: &[String], token: &str) -> usize {
        argv.iter().filter(|t| t.as_str() == token).count()
    }

    #[test]
    fn unknown_command_type_is_rejected() {
        assert!(CommandType::parse("PING").is_some());
        assert!(CommandType::parse("traceroute").is_some());
        assert!(CommandType::parse("NETSTAT").is_none());
        assert!(CommandType::parse("").is_none());
    }

    #[test]
    fn ping_gets_default_count_exactly_once() {
        let whitelist = CommandWhitelist::new();
        let argv = whitelist
            .resolve(CommandType::Ping, "192.0.2.1", None)
            .unwrap();
        assert_eq!(argv, vec!["ping", "192.0.2.1", "-c", "4"]);
        assert_eq!(count_token(&argv, "-c"), 1);
    }

    #[test]
    fn explicit_count_suppresses_default() {
        let whitelist = CommandWhitelist::new();
        let argv = whitelist
            .resolve(CommandType::Ping, "192.0.2.1", Some("-c 2"))
            .unwrap();
        assert_eq!(argv, vec!["ping", "192.0.2.1", "-c", "2"]);
        assert_eq!(count_token(&argv, "-c"), 1);
        assert!(!argv.contains(&"4".to_string()));
    }

    #[test]
    fn traceroute_gets_default_hop_limit() {
        let whitelist = CommandWhitelist::new();
        let argv = whitelist
            .resolve(CommandType::Traceroute, "192.0.2.1", None)
            .unwrap();
        assert_eq!(argv, vec!["traceroute", "192.0.2.1", "-m", "20"]);
    }

    #[test]
    fn traceroute_keeps_caller_hop_limit() {
        let whitelist = CommandWhitelist::new();
        let argv = whitelist
            .resolve(CommandType::Traceroute, "192.0.2.1", Some("-m 10"))
            .unwrap();
        assert_eq!(count_token(&argv, "-m"), 1);
        assert!(argv.contains(&"10".to_string()));
        assert!(!argv.contains(&"20".to_string()));
    }

    #[test]
    fn extra_args_are_split_into_tokens() {
        let whitelist = CommandWhitelist::new();
        let argv = whitelist
            .resolve(CommandType::Ping, "192.0.2.1", Some("-I eth0 -c 4"))
            .unwrap();
        assert_eq!(argv, vec!["ping", "192.0.2.1", "-I", "eth0", "-c", "4"]);
    }

    #[test]
    fn shell_metacharacters_are_rejected() {
        let whitelist = CommandWhitelist::new();
        for bad in ["; reboot", "-c 4 && rm x", "$(id)", "-c `id`", "a|b"] {
            let err = whitelist
                .resolve(CommandType::Ping, "192.0.2.1", Some(bad))
                .unwrap_err();
            assert!(matches!(err, DiagnosticsError::InvalidParameters), "{bad}");
        }
    }

    #[test]
    fn empty_address_is_rejected() {
        let whitelist = CommandWhitelist::new();
        let err = whitelist
            .resolve(CommandType::Arping, "  ", None)
            .unwrap_err();
        assert!(matches!(err, DiagnosticsError::InvalidParameters));
    }
}
