//! Utilitaires système pour les players InfoBerry.
//!
//! - [`device_serial`] : numéro de série matériel du Raspberry Pi
//! - [`get_os_string`] : description du système d'exploitation
mod serial;

pub use serial::{device_serial, parse_cpuinfo_serial};

/// Retourne une chaîne décrivant le système d'exploitation et sa version.
///
/// Utilise la crate `os_info` pour obtenir de manière portable les
/// informations sur le système courant. Envoyée au serveur comme
/// description par défaut d'un player.
///
/// # Format
/// - Linux: "Linux/6.5.0" ou "Raspbian/12"
/// - Autre: "{OS}/Unknown"
///
/// # Exemples
///
/// ```
/// use ibutils::get_os_string;
///
/// let os = get_os_string();
/// println!("OS: {}", os); // Ex: "Debian/12"
/// ```
pub fn get_os_string() -> String {
    let info = os_info::get();
    let os_type = format!("{:?}", info.os_type());

    let version = info.version();
    if version != &os_info::Version::Unknown {
        format!("{}/{}", os_type, version)
    } else {
        format!("{}/Unknown", os_type)
    }
}
