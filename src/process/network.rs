//! Per-process network protocol counters.
//!
//! Counters come from `/proc/<pid>/net/snmp` and `/proc/<pid>/net/netstat`,
//! which describe the network namespace the process lives in. Both files use
//! pairs of lines sharing a prefix: a header line with counter names and a
//! value line with the numbers.
//!
//! The sampler only filters these counters by name; it computes nothing
//! from them.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::process::matcher::Matcher;

/// Protocol section (e.g. `ip`, `tcp_ext`) to counter name to value.
pub type NetworkCounters = BTreeMap<String, BTreeMap<String, i64>>;

/// Converts a section prefix like `IcmpMsg` or `TcpExt` to `icmp_msg` / `tcp_ext`.
fn section_key(prefix: &str) -> String {
    let mut out = String::with_capacity(prefix.len() + 4);
    let mut prev_lower = false;
    for c in prefix.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

/// Parses the header/value line pairs of an snmp or netstat file into `out`.
pub fn parse_counter_pairs(content: &str, out: &mut NetworkCounters) {
    let mut lines = content.lines();
    while let (Some(header), Some(values)) = (lines.next(), lines.next()) {
        let Some((prefix, names)) = header.split_once(':') else {
            continue;
        };
        let Some((value_prefix, numbers)) = values.split_once(':') else {
            continue;
        };
        if prefix != value_prefix {
            continue;
        }

        let section = out.entry(section_key(prefix.trim())).or_default();
        for (name, value) in names.split_whitespace().zip(numbers.split_whitespace()) {
            if let Ok(v) = value.parse::<i64>() {
                section.insert(name.to_string(), v);
            }
        }
    }
}

/// Reads snmp and netstat counters from a `/proc/<pid>` directory.
///
/// Fails only if neither file can be read.
pub fn read_network_counters(proc_path: &Path) -> Result<NetworkCounters, std::io::Error> {
    let mut counters = NetworkCounters::new();
    let mut last_err = None;
    let mut read_any = false;

    for file in ["net/snmp", "net/netstat"] {
        match fs::read_to_string(proc_path.join(file)) {
            Ok(content) => {
                parse_counter_pairs(&content, &mut counters);
                read_any = true;
            }
            Err(e) => last_err = Some(e),
        }
    }

    match (read_any, last_err) {
        (false, Some(e)) => Err(e),
        _ => Ok(counters),
    }
}

/// Keeps only counters whose name matches `whitelist`; sections left empty
/// are removed entirely.
pub fn filter_network_counters(counters: &mut NetworkCounters, whitelist: &Matcher) {
    for section in counters.values_mut() {
        section.retain(|name, _| whitelist.matches(name));
    }
    counters.retain(|_, section| !section.is_empty());
}
