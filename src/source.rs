// SPDX-License-Identifier: MIT

//! Source definition strings.
//!
//! The parent names a capture source as `interface` or
//! `interface:key=value,key=value`. The helper cares about a small set of
//! keys; everything else is kept verbatim for diagnostics but otherwise
//! ignored.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SourceParseError {
    #[error("Unable to find interface in definition")]
    NoInterface,
}

#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct SourceDefinition {
    interface: String,
    options: Vec<(String, String)>,
}

impl SourceDefinition {
    pub fn parse(definition: &str) -> Result<Self, SourceParseError> {
        let definition = definition.trim();
        let (interface, rest) = match definition.split_once(':') {
            Some((interface, rest)) => (interface, rest),
            None => (definition, ""),
        };
        if interface.is_empty() {
            return Err(SourceParseError::NoInterface);
        }

        let options = rest
            .split(',')
            .filter(|kv| !kv.is_empty())
            .map(|kv| match kv.split_once('=') {
                Some((k, v)) => (k.to_string(), v.to_string()),
                None => (kv.to_string(), String::new()),
            })
            .collect();

        Ok(SourceDefinition {
            interface: interface.to_string(),
            options,
        })
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Value of the first `key=value` option matching `key`, if any.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// True when `key=true` is present (value compared case-insensitively).
    pub fn flag_enabled(&self, key: &str) -> bool {
        self.option(key)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bare_interface() {
        let def = SourceDefinition::parse("wlan0").unwrap();
        assert_eq!(def.interface(), "wlan0");
        assert_eq!(def.option("vif"), None);
    }

    #[test]
    fn interface_with_options() {
        let def = SourceDefinition::parse("wlan0:vif=wlan0mon,fcsfail=true").unwrap();
        assert_eq!(def.interface(), "wlan0");
        assert_eq!(def.option("vif"), Some("wlan0mon"));
        assert!(def.flag_enabled("fcsfail"));
        assert!(!def.flag_enabled("plcpfail"));
    }

    #[test]
    fn flag_values_are_case_insensitive() {
        let def = SourceDefinition::parse("wlan0:IgnorePrimary=TRUE").unwrap();
        assert!(def.flag_enabled("ignoreprimary"));

        let def = SourceDefinition::parse("wlan0:ignoreprimary=false").unwrap();
        assert!(!def.flag_enabled("ignoreprimary"));
    }

    #[test]
    fn empty_definition_is_error() {
        assert_eq!(
            SourceDefinition::parse(""),
            Err(SourceParseError::NoInterface)
        );
        assert_eq!(
            SourceDefinition::parse(":vif=x"),
            Err(SourceParseError::NoInterface)
        );
    }
}
