use std::process::{Child, Command, Stdio};

use ibconfig::Config;
use ibengine::{DisplayDriver, DisplayError, MediaItem};
use tracing::{debug, info, warn};

/// Commandes shell utilisées par [`KioskDisplay`].
///
/// Dans `browser`, `{url}` est remplacé par l'URL à afficher ; sans
/// marqueur, l'URL est ajoutée en dernier argument. `setup` est lancée une
/// seule fois, à la création du pilote (économiseur d'écran, DPMS).
#[derive(Debug, Clone, Default)]
pub struct KioskCommands {
    pub setup: Option<String>,
    pub browser: Option<String>,
    pub power_on: Option<String>,
    pub power_off: Option<String>,
}

impl KioskCommands {
    pub fn from_config(config: &Config) -> Self {
        Self {
            setup: config.get_setup_command(),
            browser: config.get_browser_command(),
            power_on: config.get_power_on_command(),
            power_off: config.get_power_off_command(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Power {
    Unknown,
    On,
    Off,
}

#[derive(Debug)]
struct BrowserProcess {
    url: String,
    child: Child,
}

/// Affiche chaque média dans un navigateur plein écran.
///
/// Un seul navigateur tourne à la fois : afficher une autre URL tue le
/// précédent. Les commandes d'alimentation sont lancées sans attendre leur
/// fin, le moteur n'est jamais bloqué.
#[derive(Debug)]
pub struct KioskDisplay {
    commands: KioskCommands,
    browser: Option<BrowserProcess>,
    helpers: Vec<Child>,
    power: Power,
}

impl KioskDisplay {
    pub fn new(commands: KioskCommands) -> Self {
        let setup = commands.setup.clone();
        let mut display = Self {
            commands,
            browser: None,
            helpers: Vec::new(),
            power: Power::Unknown,
        };
        // Sans setup, l'écran peut se mettre en veille pendant l'affichage
        if let Err(e) = display.run_helper("setup_command", setup) {
            warn!("Display setup failed: {}", e);
        }
        display
    }

    /// URL actuellement affichée, si le navigateur tourne toujours.
    pub fn showing(&mut self) -> Option<&str> {
        let running = match self.browser.as_mut() {
            Some(browser) => matches!(browser.child.try_wait(), Ok(None)),
            None => false,
        };
        if !running {
            self.browser = None;
        }
        self.browser.as_ref().map(|browser| browser.url.as_str())
    }

    /// PID du navigateur en cours.
    pub fn browser_pid(&self) -> Option<u32> {
        self.browser.as_ref().map(|browser| browser.child.id())
    }

    fn stop_browser(&mut self) {
        if let Some(mut browser) = self.browser.take() {
            debug!(pid = browser.child.id(), url = %browser.url, "Stopping browser");
            if let Err(e) = browser.child.kill() {
                debug!("Browser already exited: {}", e);
            }
            // Après SIGKILL l'attente est immédiate
            if let Err(e) = browser.child.wait() {
                warn!("Failed to reap browser process: {}", e);
            }
        }
    }

    fn reap_helpers(&mut self) {
        self.helpers
            .retain_mut(|child| matches!(child.try_wait(), Ok(None)));
    }

    fn run_helper(&mut self, name: &'static str, command: Option<String>) -> Result<(), DisplayError> {
        let Some(command) = command else {
            debug!("No {} configured", name);
            return Ok(());
        };
        let child = shell(&command)
            .spawn()
            .map_err(|source| DisplayError::Command {
                command: command.clone(),
                source,
            })?;
        debug!(pid = child.id(), command = %command, "Started {}", name);
        self.helpers.push(child);
        Ok(())
    }

    fn launch(&mut self, item: &MediaItem) -> Result<(), DisplayError> {
        let browser = self
            .commands
            .browser
            .clone()
            .ok_or(DisplayError::NotConfigured("browser_command"))?;

        self.stop_browser();

        if self.power != Power::On {
            self.run_helper("power_on_command", self.commands.power_on.clone())?;
            self.power = Power::On;
        }

        let child = shell(&browser_script(&browser))
            .arg(&item.url)
            .spawn()
            .map_err(|source| DisplayError::Command {
                command: browser.clone(),
                source,
            })?;

        info!(pid = child.id(), media_id = item.id, url = %item.url, "Browser launched");
        self.browser = Some(BrowserProcess {
            url: item.url.clone(),
            child,
        });
        Ok(())
    }
}

impl DisplayDriver for KioskDisplay {
    fn show(&mut self, item: &MediaItem) -> Result<(), DisplayError> {
        self.reap_helpers();

        if self.showing() == Some(item.url.as_str()) {
            return Ok(());
        }
        self.launch(item)
    }

    // Relance le navigateur même si l'URL est déjà affichée
    fn reload(&mut self, item: &MediaItem) -> Result<(), DisplayError> {
        self.reap_helpers();
        self.launch(item)
    }

    fn blank(&mut self) -> Result<(), DisplayError> {
        self.reap_helpers();
        self.stop_browser();

        if self.power != Power::Off {
            self.run_helper("power_off_command", self.commands.power_off.clone())?;
            self.power = Power::Off;
            info!("Screen powered off");
        }
        Ok(())
    }
}

impl Drop for KioskDisplay {
    fn drop(&mut self) {
        self.stop_browser();
    }
}

// L'URL est passée en $1 pour ne jamais être interprétée par le shell
fn browser_script(browser: &str) -> String {
    if browser.contains("{url}") {
        format!("exec {}", browser.replace("{url}", "\"$1\""))
    } else {
        format!("exec {} \"$1\"", browser)
    }
}

fn shell(script: &str) -> Command {
    let mut command = Command::new("sh");
    command
        .arg("-c")
        .arg(script)
        .arg("infoberry")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    command
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use std::thread::sleep;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn wait_for(path: &Path) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if path.exists() {
                return true;
            }
            sleep(Duration::from_millis(20));
        }
        false
    }

    fn commands(dir: &TempDir) -> KioskCommands {
        KioskCommands {
            setup: Some(format!("touch {}", dir.path().join("setup").display())),
            browser: Some("sleep 30 # {url}".into()),
            power_on: Some(format!("touch {}", dir.path().join("on").display())),
            power_off: Some(format!("touch {}", dir.path().join("off").display())),
        }
    }

    #[test]
    fn test_browser_script() {
        assert_eq!(browser_script("chromium --kiosk"), "exec chromium --kiosk \"$1\"");
        assert_eq!(
            browser_script("firefox --kiosk {url} --private"),
            "exec firefox --kiosk \"$1\" --private"
        );
    }

    #[test]
    fn test_show_launches_browser_and_powers_on() {
        let dir = TempDir::new().unwrap();
        let mut display = KioskDisplay::new(commands(&dir));

        display.show(&MediaItem::new(1, "https://example.org/a")).unwrap();
        assert_eq!(display.showing(), Some("https://example.org/a"));
        assert!(wait_for(&dir.path().join("on")));
    }

    #[test]
    fn test_same_url_keeps_browser() {
        let dir = TempDir::new().unwrap();
        let mut display = KioskDisplay::new(commands(&dir));

        display.show(&MediaItem::new(1, "https://example.org/a")).unwrap();
        let pid = display.browser_pid();
        display.show(&MediaItem::new(1, "https://example.org/a")).unwrap();
        assert_eq!(display.browser_pid(), pid);

        display.show(&MediaItem::new(2, "https://example.org/b")).unwrap();
        assert_ne!(display.browser_pid(), pid);
        assert_eq!(display.showing(), Some("https://example.org/b"));
    }

    #[test]
    fn test_setup_runs_once_at_creation() {
        let dir = TempDir::new().unwrap();
        let mut display = KioskDisplay::new(commands(&dir));
        assert!(wait_for(&dir.path().join("setup")));

        fs::remove_file(dir.path().join("setup")).unwrap();
        display.show(&MediaItem::new(1, "https://example.org/a")).unwrap();
        display.blank().unwrap();
        display.show(&MediaItem::new(1, "https://example.org/a")).unwrap();
        sleep(Duration::from_millis(200));
        assert!(!dir.path().join("setup").exists());
    }

    #[test]
    fn test_reload_restarts_browser_on_same_url() {
        let dir = TempDir::new().unwrap();
        let mut display = KioskDisplay::new(commands(&dir));
        let item = MediaItem::new(1, "https://example.org/a");

        display.show(&item).unwrap();
        let pid = display.browser_pid();
        display.reload(&item).unwrap();

        assert_ne!(display.browser_pid(), pid);
        assert_eq!(display.showing(), Some("https://example.org/a"));
    }

    #[test]
    fn test_blank_stops_browser_and_powers_off() {
        let dir = TempDir::new().unwrap();
        let mut display = KioskDisplay::new(commands(&dir));

        display.show(&MediaItem::new(1, "https://example.org/a")).unwrap();
        display.blank().unwrap();

        assert_eq!(display.showing(), None);
        assert!(wait_for(&dir.path().join("off")));
    }

    #[test]
    fn test_missing_browser_command() {
        let mut display = KioskDisplay::new(KioskCommands::default());
        let err = display
            .show(&MediaItem::new(1, "https://example.org/a"))
            .unwrap_err();
        assert!(matches!(err, DisplayError::NotConfigured("browser_command")));
        // Sans commande d'extinction, blank reste possible
        display.blank().unwrap();
    }
}
