use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;

const CPUINFO_PATH: &str = "/proc/cpuinfo";

static SERIAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^Serial\s+:\s+([0-9a-f]+)$").expect("valid serial regex")
});

/// Extrait le numéro de série d'un contenu au format `/proc/cpuinfo`.
///
/// Retourne `None` si aucune ligne `Serial` n'est présente ou si le
/// serial vaut uniquement des zéros (machines virtuelles, Pi mal flashés).
pub fn parse_cpuinfo_serial(cpuinfo: &str) -> Option<String> {
    let serial = SERIAL_RE.captures(cpuinfo)?.get(1)?.as_str();
    if serial.chars().all(|c| c == '0') {
        return None;
    }
    Some(serial.to_string())
}

/// Lit le numéro de série matériel du Raspberry Pi.
///
/// Retourne `None` hors Raspberry Pi (fichier absent ou sans ligne `Serial`).
pub fn device_serial() -> Option<String> {
    match fs::read_to_string(CPUINFO_PATH) {
        Ok(content) => {
            let serial = parse_cpuinfo_serial(&content);
            if serial.is_none() {
                tracing::debug!("No hardware serial found in {}", CPUINFO_PATH);
            }
            serial
        }
        Err(e) => {
            tracing::debug!("Cannot read {}: {}", CPUINFO_PATH, e);
            None
        }
    }
}
